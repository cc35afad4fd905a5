use crate::core::{frequencies, ActionType, EpisodeResult, SimulationConfig};
use crate::defender::DeceptionStats;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tabled::{Table, Tabled};

/// An episode that ended in a fatal error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeFailure {
    pub episode_id: usize,
    pub use_acp: bool,
    pub reason: String,
}

/// Aggregate comparison of the two defender philosophies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentAnalysis {
    pub acp_mean: f64,
    pub traditional_mean: f64,
    pub acp_std: f64,
    pub traditional_std: f64,
    /// Half-width of the confidence interval around `acp_mean`
    pub acp_ci: f64,
    pub traditional_ci: f64,
    /// ACP gain relative to the magnitude of the traditional mean
    pub improvement_pct: f64,
    pub acp_episodes: Vec<EpisodeResult>,
    pub traditional_episodes: Vec<EpisodeResult>,
    pub acp_action_distribution: BTreeMap<ActionType, f64>,
    pub traditional_action_distribution: BTreeMap<ActionType, f64>,
    pub acp_attacker_confidence: f64,
    pub traditional_attacker_confidence: f64,
    pub total_deception_attempts: u64,
    pub total_deception_successes: u64,
    pub acp_latency_exploitations: u64,
    pub traditional_latency_exploitations: u64,
    pub failed_episodes: Vec<EpisodeFailure>,
    pub aborted: bool,
    pub config: SimulationConfig,
}

impl ExperimentAnalysis {
    pub fn new(
        config: SimulationConfig,
        acp_episodes: Vec<EpisodeResult>,
        traditional_episodes: Vec<EpisodeResult>,
        failed_episodes: Vec<EpisodeFailure>,
        aborted: bool,
    ) -> Self {
        let z = z_score(config.confidence_level);
        let acp = RewardStats::of(&acp_episodes, z);
        let traditional = RewardStats::of(&traditional_episodes, z);

        let improvement_pct = if traditional.mean.abs() > f64::EPSILON {
            (acp.mean - traditional.mean) / traditional.mean.abs() * 100.0
        } else {
            0.0
        };

        Self {
            acp_mean: acp.mean,
            traditional_mean: traditional.mean,
            acp_std: acp.std,
            traditional_std: traditional.std,
            acp_ci: acp.ci,
            traditional_ci: traditional.ci,
            improvement_pct,
            acp_action_distribution: action_distribution(&acp_episodes),
            traditional_action_distribution: action_distribution(&traditional_episodes),
            acp_attacker_confidence: mean_confidence(&acp_episodes),
            traditional_attacker_confidence: mean_confidence(&traditional_episodes),
            total_deception_attempts: acp_episodes.iter().filter_map(|e| e.deception_attempts).sum(),
            total_deception_successes: acp_episodes.iter().filter_map(|e| e.deception_successes).sum(),
            acp_latency_exploitations: acp_episodes.iter().map(|e| e.cognitive_latency_exploitations).sum(),
            traditional_latency_exploitations: traditional_episodes
                .iter()
                .map(|e| e.cognitive_latency_exploitations)
                .sum(),
            acp_episodes,
            traditional_episodes,
            failed_episodes,
            aborted,
            config,
        }
    }

    /// Episodes that produced a result
    pub fn completed_episodes(&self) -> usize {
        self.acp_episodes.len() + self.traditional_episodes.len()
    }

    /// Deception counters pooled over the ACP episodes
    pub fn deception_totals(&self) -> DeceptionStats {
        DeceptionStats {
            attempts: self.total_deception_attempts,
            successes: self.total_deception_successes,
        }
    }

    pub fn deception_success_rate(&self) -> f64 {
        self.deception_totals().success_rate()
    }

    pub fn display_table(&self) -> String {
        let rows = vec![
            ComparisonRow::new("Episodes", self.acp_episodes.len(), self.traditional_episodes.len()),
            ComparisonRow {
                metric: "Mean reward".to_string(),
                acp: format!("{:.2} ± {:.2}", self.acp_mean, self.acp_ci),
                traditional: format!("{:.2} ± {:.2}", self.traditional_mean, self.traditional_ci),
            },
            ComparisonRow {
                metric: "Std deviation".to_string(),
                acp: format!("{:.2}", self.acp_std),
                traditional: format!("{:.2}", self.traditional_std),
            },
            ComparisonRow {
                metric: "Attacker confidence".to_string(),
                acp: format!("{:.3}", self.acp_attacker_confidence),
                traditional: format!("{:.3}", self.traditional_attacker_confidence),
            },
            ComparisonRow::new(
                "Latency exploitations",
                self.acp_latency_exploitations,
                self.traditional_latency_exploitations,
            ),
            ComparisonRow {
                metric: "Restore share".to_string(),
                acp: share(&self.acp_action_distribution, ActionType::RestoreNode),
                traditional: share(&self.traditional_action_distribution, ActionType::RestoreNode),
            },
        ];

        Table::new(rows).to_string()
    }

    pub fn print_summary(&self) {
        println!("\n{}", "=".repeat(80));
        println!("ACP vs TRADITIONAL DEFENSE - ANALYSIS REPORT");
        println!("{}", "=".repeat(80));

        println!("\n{}", self.display_table());

        println!("\nImprovement: {:+.1}%", self.improvement_pct);
        println!(
            "Deception: {}/{} attempts succeeded ({:.1}%)",
            self.total_deception_successes,
            self.total_deception_attempts,
            self.deception_success_rate() * 100.0
        );

        println!("\nACP action distribution:");
        for (action, freq) in &self.acp_action_distribution {
            println!("  • {}: {:.1}%", action, freq * 100.0);
        }
        println!("Traditional action distribution:");
        for (action, freq) in &self.traditional_action_distribution {
            println!("  • {}: {:.1}%", action, freq * 100.0);
        }

        if !self.failed_episodes.is_empty() {
            println!("\nFailed episodes:");
            for failure in &self.failed_episodes {
                println!("  • {}: {}", failure.episode_id, failure.reason);
            }
        }
        if self.aborted {
            println!("\nExperiment was aborted; unscheduled episodes were discarded");
        }

        println!("\n{}", "=".repeat(80));
    }

    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Tabled)]
pub struct ComparisonRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "ACP")]
    pub acp: String,
    #[tabled(rename = "Traditional")]
    pub traditional: String,
}

impl ComparisonRow {
    fn new<T: ToString>(metric: &str, acp: T, traditional: T) -> Self {
        Self {
            metric: metric.to_string(),
            acp: acp.to_string(),
            traditional: traditional.to_string(),
        }
    }
}

struct RewardStats {
    mean: f64,
    std: f64,
    ci: f64,
}

impl RewardStats {
    fn of(episodes: &[EpisodeResult], z: f64) -> Self {
        let rewards: Array1<f64> = episodes.iter().map(|e| e.total_reward).collect();
        let n = rewards.len();

        let mean = rewards.mean().unwrap_or(0.0);
        let std = if n > 1 { rewards.std(1.0) } else { 0.0 };
        let ci = if n > 1 { z * std / (n as f64).sqrt() } else { 0.0 };

        Self { mean, std, ci }
    }
}

/// Pooled defender action frequencies over a group of episodes
fn action_distribution(episodes: &[EpisodeResult]) -> BTreeMap<ActionType, f64> {
    let mut counts = BTreeMap::new();
    for episode in episodes {
        for (action, count) in &episode.action_counts {
            *counts.entry(*action).or_insert(0) += count;
        }
    }
    frequencies(&counts)
}

fn mean_confidence(episodes: &[EpisodeResult]) -> f64 {
    if episodes.is_empty() {
        return 0.0;
    }
    let total: f64 = episodes.iter().map(|e| e.final_attacker_confidence).sum();
    (total / episodes.len() as f64).clamp(0.0, 1.0)
}

fn share(distribution: &BTreeMap<ActionType, f64>, action: ActionType) -> String {
    format!("{:.1}%", distribution.get(&action).copied().unwrap_or(0.0) * 100.0)
}

/// Two-sided standard normal quantile for `level`, via Acklam's
/// rational approximation of the inverse CDF
pub fn z_score(level: f64) -> f64 {
    let p = 1.0 - (1.0 - level.clamp(1e-9, 1.0 - 1e-9)) / 2.0;
    inverse_normal_cdf(p)
}

fn inverse_normal_cdf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e1,
        2.209460984245205e2,
        -2.759285104469687e2,
        1.383577518672690e2,
        -3.066479806614716e1,
        2.506628277459239,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e1,
        1.615858368580409e2,
        -1.556989798598866e2,
        6.680131188771972e1,
        -1.328068155288572e1,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-3,
        -3.223964580411365e-1,
        -2.400758277161838,
        -2.549732539343734,
        4.374664141464968,
        2.938163982698783,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-3,
        3.224671290700398e-1,
        2.445134137142996,
        3.754408661907416,
    ];
    const P_LOW: f64 = 0.02425;

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}
