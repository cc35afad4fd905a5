//! # ACP Simulation
//!
//! An adversarial cyber-defense simulation on a network graph. A learning
//! attacker probes and compromises nodes while one of two defenders tries
//! to contain it:
//!
//! - a **pessimistic** defender that reflexively remediates, paying for
//!   expensive node restores
//! - an **optimistic ACP** defender that relies on Active Cyber Protection
//!   (false signals and honeypots) and never restores
//!
//! Running many seeded episodes of each produces the reward statistics the
//! two philosophies are compared on.
//!
//! ## Key Features
//!
//! - **Environment**: connected random topologies, per-node vulnerability,
//!   action costs, cognitive-latency exploitation, honeypots and deception
//! - **Attacker**: instance-based learning with recency decay, recall noise
//!   and a confidence estimate that deception erodes
//! - **Runner**: serial and thread-pool execution with bit-identical results
//!   for the same seed
//! - **Analysis**: means, confidence intervals, action distributions, JSON
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use acp_simulation::{run_experiment_parallel, SimulationConfig};
//!
//! let config = SimulationConfig {
//!     num_episodes: 200,
//!     ..SimulationConfig::default()
//! };
//!
//! let (acp, traditional, analysis) = run_experiment_parallel(&config, None, true).unwrap();
//! println!("{} ACP / {} traditional episodes", acp.len(), traditional.len());
//! analysis.print_summary();
//! ```

pub mod analysis;
pub mod attacker;
pub mod core;
pub mod covering;
pub mod defender;
pub mod environment;
pub mod error;
pub mod simulation;

// Re-export commonly used types
pub use analysis::{EpisodeFailure, ExperimentAnalysis};
pub use attacker::{Attacker, AttackerParams, AttackerProfile, CognitiveAttacker};
pub use crate::core::{
    ActionType, DeceptionRecord, DefenderKind, EpisodeResult, NodeState, SimulationConfig,
    TerminationReason, VulnerabilityDistribution,
};
pub use defender::{AcpParams, Defender, OptimisticAcpDefender, PessimisticDefender, PessimisticParams};
pub use environment::{ActionRequest, NetworkEnvironment, Observation, StepOutcome};
pub use error::{Result, SimulationError};
pub use simulation::{
    run_experiment, run_experiment_parallel, run_experiment_parallel_with_abort, run_single_episode,
    AbortHandle, RewardArray,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
