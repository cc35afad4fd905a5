use crate::analysis::{EpisodeFailure, ExperimentAnalysis};
use crate::attacker::{Attacker, CognitiveAttacker};
use crate::core::{
    ActionType, EnvironmentConfig, EpisodeResult, NodeState, SimulationConfig, TerminationReason,
};
use crate::defender::{Defender, OptimisticAcpDefender, PessimisticDefender};
use crate::environment::{ActionRequest, NetworkEnvironment, StepOutcome};
use crate::error::{Result, SimulationError};
use ndarray::Array1;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Per-episode rewards in episode-id order
pub type RewardArray = Array1<f64>;

/// `(acp_rewards, traditional_rewards, analysis)`
pub type ExperimentOutput = (RewardArray, RewardArray, ExperimentAnalysis);

/// Upper bound on the default worker count
pub const MAX_WORKERS: usize = 16;

/// Progress is reported at episode 0 and every this many episodes
pub const PROGRESS_INTERVAL: usize = 50;

// Offsets separating the attacker and defender random streams from the
// environment stream of the same episode
const ATTACKER_STREAM: u64 = 0x9E37_79B9_7F4A_7C15;
const DEFENDER_STREAM: u64 = 0xD1B5_4A32_D192_ED03;

/// Cooperative stop signal checked between episodes
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// In-flight episodes finish; unscheduled ones are discarded
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// `min(available_parallelism, 16)`
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(MAX_WORKERS)
}

/// Even ids run the ACP defender, odd ids the traditional one
pub fn uses_acp(episode_id: usize) -> bool {
    episode_id % 2 == 0
}

/// Run one complete episode with seed `random_seed + episode_id`
pub fn run_single_episode(episode_id: usize, use_acp: bool, config: &SimulationConfig) -> Result<EpisodeResult> {
    config.validate()?;

    let seed = config.episode_seed(episode_id);
    let mut env = NetworkEnvironment::new(EnvironmentConfig::from(config), seed)?;
    let network = env.network();
    let mut attacker = CognitiveAttacker::from_config(Arc::clone(&network), config, seed.wrapping_add(ATTACKER_STREAM));

    let defender_seed = seed.wrapping_add(DEFENDER_STREAM);
    let mut defender: Box<dyn Defender> = if use_acp {
        Box::new(OptimisticAcpDefender::from_config(network, config, defender_seed))
    } else {
        Box::new(PessimisticDefender::from_config(network, config, defender_seed))
    };

    let mut episode = Episode {
        config,
        env: &mut env,
        attacker: &mut attacker,
        defender: defender.as_mut(),
        total_reward: 0.0,
    };
    let termination = episode.play()?;
    let total_reward = episode.total_reward;

    let metrics = env.metrics();
    let mut action_counts = BTreeMap::new();
    for action in defender.action_history() {
        *action_counts.entry(*action).or_insert(0) += 1;
    }
    let stats = defender.deception_stats();

    let result = EpisodeResult {
        episode_id,
        use_acp,
        defender: defender.kind(),
        seed,
        total_reward,
        steps: env.current_time(),
        action_counts,
        final_attacker_confidence: attacker.profile().overall_confidence,
        termination,
        compromised_nodes: env.compromised_count(),
        cognitive_latency_exploitations: metrics.cognitive_latency_exploitations,
        deception_events: metrics.acp_deceptions.len(),
        expensive_actions: metrics.expensive_actions.len(),
        deception_attempts: stats.map(|s| s.attempts),
        deception_successes: stats.map(|s| s.successes),
    };

    tracing::debug!(
        episode_id,
        defender = result.defender.label(),
        reward = result.total_reward,
        steps = result.steps,
        termination = ?result.termination,
        "episode finished"
    );

    Ok(result)
}

/// Turn loop of one episode: attacker then defender each round
struct Episode<'a> {
    config: &'a SimulationConfig,
    env: &'a mut NetworkEnvironment,
    attacker: &'a mut dyn Attacker,
    defender: &'a mut dyn Defender,
    /// Defender-side cumulative reward
    total_reward: f64,
}

impl Episode<'_> {
    fn play(&mut self) -> Result<TerminationReason> {
        while self.env.current_time() < self.config.max_steps {
            self.attacker_turn()?;
            self.defender_turn()?;
            self.env.advance_time();

            if self.env.all_compromised() {
                return Ok(TerminationReason::NetworkCompromised);
            }
            if self.threat_contained() {
                return Ok(TerminationReason::ThreatContained);
            }
        }

        Ok(TerminationReason::TimeHorizon)
    }

    fn attacker_turn(&mut self) -> Result<()> {
        let time = self.env.current_time();
        let view = self.env.observe_attacker();
        let action = self.attacker.select_action(&view, time);
        let situation = self.attacker.encode_situation(&view);

        let Some(target) = self.attacker.select_target(action, &view) else {
            tracing::trace!(time, action = %action, "attacker has no target");
            return Ok(());
        };

        if let Some(outcome) = self.execute(&ActionRequest::attacker(action, Some(target)))? {
            self.total_reward += outcome.defender_reward;

            let feedback = outcome.attacker_feedback();
            self.attacker.observe(&feedback);
            let confidence = self.attacker.profile().overall_confidence;
            self.attacker.learn(situation, action, feedback.reward, time, confidence);
        }

        Ok(())
    }

    fn defender_turn(&mut self) -> Result<()> {
        let time = self.env.current_time();
        let truth = self.env.observe_defender();
        let knowledge = self.attacker.profile().known_nodes.clone();
        let action = self.defender.select_action(&truth, &knowledge);

        let request = if action == ActionType::AcpDeception {
            let targets = self.defender.deception_targets(&truth, &knowledge);
            ActionRequest::deception(self.defender.deploy_acp_deception(&targets, time, &knowledge))
        } else {
            let target = self.defender.select_target(action, &truth, &knowledge);
            ActionRequest::defender(action, target)
        };

        if let Some(outcome) = self.execute(&request)? {
            self.total_reward += outcome.defender_reward;
        }

        Ok(())
    }

    /// Rejected actions credit nothing and the episode goes on
    fn execute(&mut self, request: &ActionRequest) -> Result<Option<StepOutcome>> {
        match self.env.execute(request) {
            Ok(outcome) => Ok(Some(outcome)),
            Err(err) if err.is_recoverable() => {
                tracing::warn!(time = self.env.current_time(), action = %request.action, %err, "action rejected");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Nothing compromised, and an attacker that has mapped the whole
    /// network believes it holds nothing
    fn threat_contained(&self) -> bool {
        let profile = self.attacker.profile();
        self.env.node_states().iter().all(|s| *s != NodeState::Compromised)
            && profile.known_nodes.len() >= self.env.num_nodes()
            && profile.compromised_nodes.is_empty()
    }
}

/// Run every episode in order on the calling thread
pub fn run_experiment(config: &SimulationConfig, verbose: bool) -> Result<ExperimentOutput> {
    run_episodes_with(config, 1, verbose, "ACP EXPERIMENT", &AbortHandle::new(), run_single_episode)
}

/// Run episodes on a pool of `n_workers` threads (default
/// `min(available_parallelism, 16)`); results match `run_experiment`
pub fn run_experiment_parallel(
    config: &SimulationConfig,
    n_workers: Option<usize>,
    verbose: bool,
) -> Result<ExperimentOutput> {
    run_experiment_parallel_with_abort(config, n_workers, verbose, &AbortHandle::new())
}

pub fn run_experiment_parallel_with_abort(
    config: &SimulationConfig,
    n_workers: Option<usize>,
    verbose: bool,
    abort: &AbortHandle,
) -> Result<ExperimentOutput> {
    let workers = match n_workers {
        Some(0) => {
            return Err(SimulationError::InvalidConfiguration(
                "n_workers must be positive".to_string(),
            ))
        }
        Some(n) => n,
        None => default_worker_count(),
    };

    run_episodes_with(config, workers, verbose, "PARALLEL ACP EXPERIMENT", abort, run_single_episode)
}

/// Shared driver of both runners. A single worker runs on the calling
/// thread; a failed episode is recorded and its siblings keep going.
fn run_episodes_with<F>(
    config: &SimulationConfig,
    workers: usize,
    verbose: bool,
    title: &str,
    abort: &AbortHandle,
    run_episode: F,
) -> Result<ExperimentOutput>
where
    F: Fn(usize, bool, &SimulationConfig) -> Result<EpisodeResult> + Sync,
{
    config.validate()?;
    let total = config.num_episodes;
    if verbose {
        print_banner(title, config);
        if workers > 1 {
            println!("Workers: {}", workers);
        }
    }
    tracing::info!(episodes = total, workers, "starting experiment");

    let play = |episode_id: usize| {
        report_progress(episode_id, total, verbose);
        run_episode(episode_id, uses_acp(episode_id), config)
    };

    let outcomes: Vec<(usize, Option<Result<EpisodeResult>>)> = if workers == 1 {
        let mut outcomes = Vec::with_capacity(total);
        for episode_id in 0..total {
            if abort.is_aborted() {
                outcomes.push((episode_id, None));
                break;
            }
            outcomes.push((episode_id, Some(play(episode_id))));
        }
        outcomes
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| SimulationError::WorkerPool(e.to_string()))?;

        pool.install(|| {
            (0..total)
                .into_par_iter()
                .map(|episode_id| {
                    if abort.is_aborted() {
                        return (episode_id, None);
                    }
                    (episode_id, Some(play(episode_id)))
                })
                .collect()
        })
    };

    let mut results = Vec::with_capacity(total);
    let mut failures = Vec::new();
    let mut aborted = false;
    for (episode_id, outcome) in outcomes {
        match outcome {
            Some(Ok(result)) => results.push(result),
            Some(Err(err)) => failures.push(record_failure(episode_id, err)),
            None => aborted = true,
        }
    }

    finish(config, results, failures, aborted, verbose)
}

fn finish(
    config: &SimulationConfig,
    results: Vec<EpisodeResult>,
    failures: Vec<EpisodeFailure>,
    aborted: bool,
    verbose: bool,
) -> Result<ExperimentOutput> {
    let completed = results.len();
    let (acp, traditional): (Vec<EpisodeResult>, Vec<EpisodeResult>) =
        results.into_iter().partition(|r| r.use_acp);

    let acp_rewards: RewardArray = acp.iter().map(|r| r.total_reward).collect();
    let traditional_rewards: RewardArray = traditional.iter().map(|r| r.total_reward).collect();
    let analysis = ExperimentAnalysis::new(config.clone(), acp, traditional, failures, aborted);

    if verbose {
        println!("Completed {} episodes", completed);
        if aborted {
            println!("Aborted before all episodes were scheduled");
        }
    }
    tracing::info!(
        completed,
        failed = analysis.failed_episodes.len(),
        aborted,
        acp_mean = analysis.acp_mean,
        traditional_mean = analysis.traditional_mean,
        "experiment finished"
    );

    Ok((acp_rewards, traditional_rewards, analysis))
}

fn record_failure(episode_id: usize, err: SimulationError) -> EpisodeFailure {
    tracing::warn!(episode_id, %err, "episode failed");
    EpisodeFailure {
        episode_id,
        use_acp: uses_acp(episode_id),
        reason: err.to_string(),
    }
}

/// Progress is reported at episode 0 and every `PROGRESS_INTERVAL` after
fn should_report(episode_id: usize) -> bool {
    episode_id % PROGRESS_INTERVAL == 0
}

fn report_progress(episode_id: usize, total: usize, verbose: bool) {
    if !should_report(episode_id) {
        return;
    }
    tracing::info!("Episode {}/{}", episode_id, total);
    if verbose {
        println!("Episode {}/{}", episode_id, total);
    }
}

fn print_banner(title: &str, config: &SimulationConfig) {
    println!("\n{}", "=".repeat(80));
    println!("{}", title);
    println!("{}", "=".repeat(80));
    println!(
        "Episodes: {} ({} ACP / {} traditional)",
        config.num_episodes,
        config.acp_episode_count(),
        config.traditional_episode_count()
    );
    println!("Configuration:");
    println!("  Nodes: {}", config.num_nodes);
    println!("  Connectivity: {:.2}", config.connectivity);
    println!("  Vulnerability distribution: {}", config.vulnerability_distribution);
    println!("  ACP strength: {:.2}", config.acp_strength);
    println!("  Learning rate: {:.2}", config.learning_rate);
    println!("  Decay rate: {:.2} / noise: {:.2}", config.decay_rate, config.noise);
    println!("  Time horizon: {}", config.max_steps);
    println!("  Seed: {}", config.random_seed);
    println!("{}", "-".repeat(80));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DefenderKind;

    fn small_config(episodes: usize) -> SimulationConfig {
        SimulationConfig {
            num_nodes: 12,
            connectivity: 0.4,
            num_episodes: episodes,
            max_steps: 30,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_single_episode_acp() {
        let result = run_single_episode(0, true, &small_config(1)).unwrap();
        assert_eq!(result.episode_id, 0);
        assert!(result.use_acp);
        assert_eq!(result.defender, DefenderKind::OptimisticAcp);
        assert!(result.total_reward.is_finite());
        assert!(result.steps <= 30);
        assert!(!result.action_counts.contains_key(&ActionType::RestoreNode));
        assert!(result.deception_attempts.is_some());
    }

    #[test]
    fn test_single_episode_traditional() {
        let result = run_single_episode(1, false, &small_config(1)).unwrap();
        assert!(!result.use_acp);
        assert_eq!(result.defender, DefenderKind::Pessimistic);
        assert_eq!(result.seed, 43);
        assert!(result.deception_attempts.is_none());
        assert!((0.0..=1.0).contains(&result.final_attacker_confidence));
    }

    #[test]
    fn test_episode_is_reproducible() {
        let config = small_config(1);
        let a = run_single_episode(4, true, &config).unwrap();
        let b = run_single_episode(4, true, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SimulationConfig { num_nodes: 0, ..small_config(2) };
        assert!(matches!(
            run_single_episode(0, true, &config),
            Err(SimulationError::InvalidConfiguration(_))
        ));
        assert!(run_experiment(&config, false).is_err());
    }

    #[test]
    fn test_episode_allocation() {
        let (acp, traditional, analysis) = run_experiment(&small_config(11), false).unwrap();
        assert_eq!(acp.len(), 6);
        assert_eq!(traditional.len(), 5);
        assert_eq!(analysis.acp_episodes.len(), 6);
        assert!(analysis.acp_episodes.iter().all(|e| e.use_acp && e.episode_id % 2 == 0));
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(run_experiment_parallel(&small_config(2), Some(0), false).is_err());
    }

    #[test]
    fn test_abort_before_start_discards_everything() {
        let abort = AbortHandle::new();
        abort.abort();
        let (acp, traditional, analysis) =
            run_experiment_parallel_with_abort(&small_config(6), Some(2), false, &abort).unwrap();
        assert!(acp.is_empty());
        assert!(traditional.is_empty());
        assert!(analysis.aborted);
    }

    fn failing_on(bad_id: usize) -> impl Fn(usize, bool, &SimulationConfig) -> Result<EpisodeResult> + Sync {
        move |episode_id, use_acp, config| {
            if episode_id == bad_id {
                Err(SimulationError::GenerationFailure { num_nodes: config.num_nodes, attempts: 100 })
            } else {
                run_single_episode(episode_id, use_acp, config)
            }
        }
    }

    #[test]
    fn test_failed_episode_leaves_siblings_intact() {
        let config = small_config(6);
        let (acp_clean, trad_clean, _) = run_experiment(&config, false).unwrap();

        for workers in [1, 3] {
            let (acp, traditional, analysis) =
                run_episodes_with(&config, workers, false, "test", &AbortHandle::new(), failing_on(3)).unwrap();

            let failed: Vec<usize> = analysis.failed_episodes.iter().map(|f| f.episode_id).collect();
            assert_eq!(failed, vec![3], "workers={}", workers);
            assert!(!analysis.failed_episodes[0].use_acp);
            assert!(!analysis.aborted);

            assert_eq!(acp, acp_clean);
            assert_eq!(traditional.len(), 2);
            assert_eq!(traditional[0], trad_clean[0]);
            assert_eq!(traditional[1], trad_clean[2]);
            assert!(analysis.traditional_episodes.iter().all(|e| e.episode_id != 3));
            assert_eq!(analysis.completed_episodes(), 5);
        }
    }

    #[test]
    fn test_progress_cadence() {
        assert!(should_report(0));
        assert!(!should_report(49));
        assert!(should_report(50));
        assert!(!should_report(51));
        assert!(should_report(100));
    }

    #[test]
    fn test_default_worker_count_bounded() {
        let workers = default_worker_count();
        assert!((1..=MAX_WORKERS).contains(&workers));
    }
}
