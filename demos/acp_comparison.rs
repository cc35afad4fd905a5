use acp_simulation::analysis::ExperimentAnalysis;
use acp_simulation::core::VulnerabilityDistribution;
use acp_simulation::{run_experiment_parallel, SimulationConfig};
use colored::*;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    println!("{}", "=".repeat(80).bright_blue());
    println!("{}", "    🛡️  ACTIVE CYBER PROTECTION vs TRADITIONAL REMEDIATION".bright_white().bold());
    println!("{}", "    Cognitive attacker against two defense philosophies".bright_cyan());
    println!("{}", "=".repeat(80).bright_blue());

    let config = SimulationConfig {
        num_nodes: 50,
        connectivity: 0.6,
        vulnerability_distribution: VulnerabilityDistribution::Bimodal,
        num_episodes: 400,
        ..SimulationConfig::default()
    };

    let (acp, traditional, analysis) = match run_experiment_parallel(&config, None, true) {
        Ok(output) => output,
        Err(err) => {
            eprintln!("{} {}", "Experiment failed:".red().bold(), err);
            std::process::exit(1);
        }
    };

    println!("\n📈 {}", "Reward samples:".bright_white().bold());
    println!("   ACP episodes: {}", acp.len());
    println!("   Traditional episodes: {}", traditional.len());

    analysis.print_summary();
    print_verdict(&analysis);

    match analysis.export_json() {
        Ok(json) => println!("\n{} {} bytes of JSON", "Exported".green(), json.len()),
        Err(err) => eprintln!("{} {}", "JSON export failed:".red(), err),
    }
}

fn print_verdict(analysis: &ExperimentAnalysis) {
    let gap = analysis.acp_mean - analysis.traditional_mean;
    let overlap = gap.abs() <= analysis.acp_ci + analysis.traditional_ci;

    println!("\n🎯 {}", "Verdict".bright_white().bold());
    if overlap {
        println!("   {}", "Confidence intervals overlap; no clear winner".yellow());
    } else if gap > 0.0 {
        println!(
            "   {} ({:+.1}%)",
            "ACP outperforms traditional remediation".green().bold(),
            analysis.improvement_pct
        );
    } else {
        println!(
            "   {} ({:+.1}%)",
            "Traditional remediation outperforms ACP".red().bold(),
            analysis.improvement_pct
        );
    }
}
