pub mod config;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub use config::{EnvironmentConfig, RewardShaping, SimulationConfig, VulnerabilityDistribution};

/// Node identifier; nodes are labelled `0..num_nodes`
pub type NodeId = usize;

/// Exactly one state per node at any time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeState {
    Clean,
    Compromised,
    Patched,
    Isolated,
    Honeypot,
}

impl NodeState {
    pub const ALL: [NodeState; 5] = [
        NodeState::Clean,
        NodeState::Compromised,
        NodeState::Patched,
        NodeState::Isolated,
        NodeState::Honeypot,
    ];
}

/// Every action either side can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Scan,
    Exploit,
    Propagate,
    Monitor,
    Patch,
    Isolate,
    DeployHoneypot,
    AcpDeception,
    RestoreNode,
}

impl ActionType {
    pub const ALL: [ActionType; 9] = [
        ActionType::Scan,
        ActionType::Exploit,
        ActionType::Propagate,
        ActionType::Monitor,
        ActionType::Patch,
        ActionType::Isolate,
        ActionType::DeployHoneypot,
        ActionType::AcpDeception,
        ActionType::RestoreNode,
    ];

    pub const ATTACKER_ACTIONS: [ActionType; 3] =
        [ActionType::Scan, ActionType::Exploit, ActionType::Propagate];

    pub const DEFENDER_ACTIONS: [ActionType; 6] = [
        ActionType::Monitor,
        ActionType::Patch,
        ActionType::Isolate,
        ActionType::DeployHoneypot,
        ActionType::AcpDeception,
        ActionType::RestoreNode,
    ];

    /// Upper-case name used in reports
    pub fn name(&self) -> &'static str {
        match self {
            ActionType::Scan => "SCAN",
            ActionType::Exploit => "EXPLOIT",
            ActionType::Propagate => "PROPAGATE",
            ActionType::Monitor => "MONITOR",
            ActionType::Patch => "PATCH",
            ActionType::Isolate => "ISOLATE",
            ActionType::DeployHoneypot => "DEPLOY_HONEYPOT",
            ActionType::AcpDeception => "ACP_DECEPTION",
            ActionType::RestoreNode => "RESTORE_NODE",
        }
    }

    /// Reference cost; full remediation is deliberately the most expensive
    pub fn reference_cost(&self) -> f64 {
        match self {
            ActionType::Monitor => 0.2,
            ActionType::Scan => 0.5,
            ActionType::Exploit => 1.0,
            ActionType::Patch => 1.0,
            ActionType::Propagate => 1.5,
            ActionType::AcpDeception => 1.5,
            ActionType::DeployHoneypot => 2.0,
            ActionType::Isolate => 2.5,
            ActionType::RestoreNode => 6.0,
        }
    }

    pub fn is_attacker_action(&self) -> bool {
        Self::ATTACKER_ACTIONS.contains(self)
    }

    /// Actions that operate on a single node chosen by the actor
    pub fn requires_target(&self) -> bool {
        !matches!(self, ActionType::Monitor | ActionType::AcpDeception)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which side issued an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Actor {
    Attacker,
    Defender,
}

/// Defender philosophy tag, queried instead of probing for fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefenderKind {
    /// Always-remediate reactive defender
    Pessimistic,
    /// Deception-based Active Cyber Protection defender
    OptimisticAcp,
}

impl DefenderKind {
    pub fn label(&self) -> &'static str {
        match self {
            DefenderKind::Pessimistic => "Traditional",
            DefenderKind::OptimisticAcp => "ACP",
        }
    }
}

/// Compact encoding of what the attacker observes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Situation(Vec<usize>);

impl Situation {
    pub fn new(features: Vec<usize>) -> Self {
        Self(features)
    }

    pub fn features(&self) -> &[usize] {
        &self.0
    }

    /// 1.0 for identical encodings, falling towards 0.0 with L1 distance
    pub fn similarity(&self, other: &Situation) -> f64 {
        if self.0.len() != other.0.len() {
            return 0.0;
        }

        let total: usize = self.0.iter().chain(other.0.iter()).sum();
        if total == 0 {
            return 1.0;
        }

        let distance: usize = self
            .0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| a.abs_diff(*b))
            .sum();

        (1.0 - distance as f64 / total as f64).clamp(0.0, 1.0)
    }
}

/// Attacker memory record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub situation: Situation,
    pub action: ActionType,
    pub outcome: f64,
    pub timestamp: u64,
    pub confidence: f64,
}

/// Fake importance label planted by a deception
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
    Critical,
    High,
    Important,
}

impl Criticality {
    pub const ALL: [Criticality; 3] = [Criticality::Critical, Criticality::High, Criticality::Important];
}

/// False signal shown to the attacker in place of a node's real profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeceptionRecord {
    pub false_vulnerability: f64,
    pub false_value: f64,
    pub false_criticality: Criticality,
    pub timestamp: u64,
    pub success: bool,
}

/// Why an episode ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    TimeHorizon,
    NetworkCompromised,
    ThreatContained,
}

/// Per-episode output record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeResult {
    pub episode_id: usize,
    pub use_acp: bool,
    pub defender: DefenderKind,
    pub seed: u64,
    pub total_reward: f64,
    pub steps: u64,
    pub action_counts: BTreeMap<ActionType, usize>,
    pub final_attacker_confidence: f64,
    pub termination: TerminationReason,
    pub compromised_nodes: usize,
    pub cognitive_latency_exploitations: u64,
    pub deception_events: usize,
    pub expensive_actions: usize,
    pub deception_attempts: Option<u64>,
    pub deception_successes: Option<u64>,
}

/// Normalise a histogram into frequencies summing to 1.0 (empty in, empty out)
pub fn frequencies(counts: &BTreeMap<ActionType, usize>) -> BTreeMap<ActionType, f64> {
    let total: usize = counts.values().sum();
    if total == 0 {
        return BTreeMap::new();
    }

    counts
        .iter()
        .filter(|(_, &count)| count > 0)
        .map(|(&action, &count)| (action, count as f64 / total as f64))
        .collect()
}
