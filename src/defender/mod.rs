use crate::core::{
    frequencies, ActionType, Criticality, NodeId, NodeState, SimulationConfig, VulnerabilityDistribution,
};
use crate::environment::{NetworkGraph, Observation};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

pub use crate::core::{DeceptionRecord, DefenderKind};

/// Range of the false vulnerability planted on a deceived node
pub const FALSE_VULNERABILITY_RANGE: (f64, f64) = (0.85, 0.98);

/// Range of the false asset value planted on a deceived node
pub const FALSE_VALUE_RANGE: (f64, f64) = (0.75, 0.95);

/// Deception is preferred while at least this share of nodes is unknown
pub const ASYMMETRY_THRESHOLD: f64 = 0.3;

/// Nodes offered to one `AcpDeception` action
pub const MAX_DECEPTION_TARGETS: usize = 3;

/// Capability contract of a defender agent
pub trait Defender {
    /// Choose the next action and record it in the history
    fn select_action(&mut self, observation: &Observation, attacker_knowledge: &BTreeSet<NodeId>) -> ActionType;

    /// Node to apply `action` to; `None` for untargeted actions
    fn select_target(
        &mut self,
        action: ActionType,
        observation: &Observation,
        attacker_knowledge: &BTreeSet<NodeId>,
    ) -> Option<NodeId>;

    fn action_history(&self) -> &[ActionType];

    /// Shared topology; never mutated by the defender
    fn network(&self) -> &NetworkGraph;

    fn kind(&self) -> DefenderKind;

    /// Plant false signals on `targets`. Only deception-capable defenders
    /// produce records.
    fn deploy_acp_deception(
        &mut self,
        _targets: &[NodeId],
        _current_time: u64,
        _attacker_knowledge: &BTreeSet<NodeId>,
    ) -> BTreeMap<NodeId, DeceptionRecord> {
        BTreeMap::new()
    }

    /// Candidate nodes for the next deception
    fn deception_targets(&self, _observation: &Observation, _attacker_knowledge: &BTreeSet<NodeId>) -> Vec<NodeId> {
        Vec::new()
    }

    fn deception_stats(&self) -> Option<DeceptionStats> {
        None
    }

    fn get_action_distribution(&self) -> BTreeMap<ActionType, f64> {
        let mut counts = BTreeMap::new();
        for action in self.action_history() {
            *counts.entry(*action).or_insert(0) += 1;
        }
        frequencies(&counts)
    }
}

/// Deception counters of a deception-capable defender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeceptionStats {
    pub attempts: u64,
    pub successes: u64,
}

impl DeceptionStats {
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.successes as f64 / self.attempts as f64
        }
    }
}

/// One successful deception
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeceptionEntry {
    pub node: NodeId,
    pub time: u64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PessimisticParams {
    pub restore_node_probability: f64,
    /// How readily the defender acts on ambiguous signals
    pub paranoia_level: f64,
    pub vulnerability_distribution: VulnerabilityDistribution,
}

impl Default for PessimisticParams {
    fn default() -> Self {
        Self {
            restore_node_probability: 0.4185,
            paranoia_level: 0.8,
            vulnerability_distribution: VulnerabilityDistribution::Uniform,
        }
    }
}

impl From<&SimulationConfig> for PessimisticParams {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            restore_node_probability: config.restore_node_probability,
            paranoia_level: config.paranoia_level,
            vulnerability_distribution: config.vulnerability_distribution,
        }
    }
}

/// Reactive defender that over-remediates
#[derive(Debug, Clone)]
pub struct PessimisticDefender {
    network: Arc<NetworkGraph>,
    params: PessimisticParams,
    node_states: Vec<NodeState>,
    /// Own belief of node vulnerability; may diverge from the environment
    vulnerabilities: Vec<f64>,
    action_history: Vec<ActionType>,
    rng: StdRng,
}

impl PessimisticDefender {
    pub fn new(network: Arc<NetworkGraph>, seed: u64) -> Self {
        Self::with_params(network, PessimisticParams::default(), seed)
    }

    pub fn with_params(network: Arc<NetworkGraph>, params: PessimisticParams, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let num_nodes = network.node_count();
        let vulnerabilities = params.vulnerability_distribution.sample_many(num_nodes, &mut rng);

        Self {
            network,
            params,
            node_states: vec![NodeState::Clean; num_nodes],
            vulnerabilities,
            action_history: Vec::new(),
            rng,
        }
    }

    pub fn from_config(network: Arc<NetworkGraph>, config: &SimulationConfig, seed: u64) -> Self {
        Self::with_params(network, PessimisticParams::from(config), seed)
    }

    pub fn params(&self) -> &PessimisticParams {
        &self.params
    }

    pub fn node_states(&self) -> &[NodeState] {
        &self.node_states
    }

    pub fn vulnerabilities(&self) -> &[f64] {
        &self.vulnerabilities
    }
}

impl Defender for PessimisticDefender {
    fn select_action(&mut self, observation: &Observation, _attacker_knowledge: &BTreeSet<NodeId>) -> ActionType {
        self.node_states.clone_from(&observation.node_states);

        let action = if self.rng.gen::<f64>() < self.params.restore_node_probability {
            ActionType::RestoreNode
        } else if observation.count(NodeState::Compromised) > 0 {
            if self.rng.gen::<f64>() < self.params.paranoia_level {
                ActionType::Isolate
            } else {
                ActionType::Patch
            }
        } else if self.rng.gen::<f64>() < self.params.paranoia_level {
            ActionType::Patch
        } else {
            ActionType::Monitor
        };

        self.action_history.push(action);
        action
    }

    fn select_target(
        &mut self,
        action: ActionType,
        observation: &Observation,
        _attacker_knowledge: &BTreeSet<NodeId>,
    ) -> Option<NodeId> {
        let compromised = observation.nodes_in(NodeState::Compromised);
        let target = match action {
            ActionType::RestoreNode => compromised.first().copied(),
            ActionType::Isolate => most_vulnerable(&compromised, &self.vulnerabilities),
            ActionType::Patch => most_vulnerable(&compromised, &self.vulnerabilities)
                .or_else(|| most_vulnerable(&observation.nodes_in(NodeState::Clean), &self.vulnerabilities)),
            _ => return None,
        };

        target.or_else(|| random_node(&mut self.rng, observation.num_nodes()))
    }

    fn action_history(&self) -> &[ActionType] {
        &self.action_history
    }

    fn network(&self) -> &NetworkGraph {
        &self.network
    }

    fn kind(&self) -> DefenderKind {
        DefenderKind::Pessimistic
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcpParams {
    /// Probability that a single deception attempt succeeds
    pub acp_strength: f64,
    pub vulnerability_distribution: VulnerabilityDistribution,
}

impl Default for AcpParams {
    fn default() -> Self {
        Self {
            acp_strength: 0.65,
            vulnerability_distribution: VulnerabilityDistribution::Uniform,
        }
    }
}

impl From<&SimulationConfig> for AcpParams {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            acp_strength: config.acp_strength,
            vulnerability_distribution: config.vulnerability_distribution,
        }
    }
}

/// Deception-based defender. Never restores a node.
#[derive(Debug, Clone)]
pub struct OptimisticAcpDefender {
    network: Arc<NetworkGraph>,
    params: AcpParams,
    node_states: Vec<NodeState>,
    vulnerabilities: Vec<f64>,
    action_history: Vec<ActionType>,
    deception_attempts: u64,
    deception_successes: u64,
    deception_history: Vec<DeceptionEntry>,
    rng: StdRng,
}

impl OptimisticAcpDefender {
    pub fn new(network: Arc<NetworkGraph>, seed: u64) -> Self {
        Self::with_params(network, AcpParams::default(), seed)
    }

    pub fn with_params(network: Arc<NetworkGraph>, params: AcpParams, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let num_nodes = network.node_count();
        let vulnerabilities = params.vulnerability_distribution.sample_many(num_nodes, &mut rng);

        Self {
            network,
            params,
            node_states: vec![NodeState::Clean; num_nodes],
            vulnerabilities,
            action_history: Vec::new(),
            deception_attempts: 0,
            deception_successes: 0,
            deception_history: Vec::new(),
            rng,
        }
    }

    pub fn from_config(network: Arc<NetworkGraph>, config: &SimulationConfig, seed: u64) -> Self {
        Self::with_params(network, AcpParams::from(config), seed)
    }

    pub fn params(&self) -> &AcpParams {
        &self.params
    }

    pub fn node_states(&self) -> &[NodeState] {
        &self.node_states
    }

    pub fn vulnerabilities(&self) -> &[f64] {
        &self.vulnerabilities
    }

    pub fn deception_attempts(&self) -> u64 {
        self.deception_attempts
    }

    pub fn deception_successes(&self) -> u64 {
        self.deception_successes
    }

    pub fn deception_history(&self) -> &[DeceptionEntry] {
        &self.deception_history
    }

    fn false_signal(&mut self, current_time: u64) -> DeceptionRecord {
        let (vuln_lo, vuln_hi) = FALSE_VULNERABILITY_RANGE;
        let (value_lo, value_hi) = FALSE_VALUE_RANGE;

        DeceptionRecord {
            false_vulnerability: self.rng.gen_range(vuln_lo..=vuln_hi),
            false_value: self.rng.gen_range(value_lo..=value_hi),
            false_criticality: Criticality::ALL[self.rng.gen_range(0..Criticality::ALL.len())],
            timestamp: current_time,
            success: true,
        }
    }
}

impl Defender for OptimisticAcpDefender {
    fn select_action(&mut self, observation: &Observation, attacker_knowledge: &BTreeSet<NodeId>) -> ActionType {
        self.node_states.clone_from(&observation.node_states);

        let num_nodes = observation.num_nodes().max(1);
        let known = attacker_knowledge.iter().filter(|n| **n < num_nodes).count();
        let unknown_fraction = (num_nodes - known) as f64 / num_nodes as f64;
        let compromised = observation.count(NodeState::Compromised) > 0;

        let action = if unknown_fraction >= ASYMMETRY_THRESHOLD && !(compromised && self.rng.gen_bool(0.5)) {
            if self.rng.gen::<f64>() < self.params.acp_strength {
                ActionType::AcpDeception
            } else if self.rng.gen_bool(0.5) {
                ActionType::DeployHoneypot
            } else {
                ActionType::Monitor
            }
        } else if compromised {
            if self.rng.gen::<f64>() < 0.6 {
                ActionType::Isolate
            } else {
                ActionType::Patch
            }
        } else if self.rng.gen::<f64>() < 0.3 {
            ActionType::Patch
        } else {
            ActionType::Monitor
        };

        self.action_history.push(action);
        action
    }

    fn select_target(
        &mut self,
        action: ActionType,
        observation: &Observation,
        attacker_knowledge: &BTreeSet<NodeId>,
    ) -> Option<NodeId> {
        let compromised = observation.nodes_in(NodeState::Compromised);
        let target = match action {
            ActionType::Isolate => most_vulnerable(&compromised, &self.vulnerabilities),
            ActionType::Patch => most_vulnerable(&compromised, &self.vulnerabilities)
                .or_else(|| most_vulnerable(&observation.nodes_in(NodeState::Clean), &self.vulnerabilities)),
            ActionType::DeployHoneypot => {
                let clean = observation.nodes_in(NodeState::Clean);
                let hidden: Vec<NodeId> = clean
                    .iter()
                    .copied()
                    .filter(|node| !attacker_knowledge.contains(node))
                    .collect();
                most_vulnerable(&hidden, &self.vulnerabilities).or_else(|| most_vulnerable(&clean, &self.vulnerabilities))
            }
            _ => return None,
        };

        target.or_else(|| random_node(&mut self.rng, observation.num_nodes()))
    }

    fn action_history(&self) -> &[ActionType] {
        &self.action_history
    }

    fn network(&self) -> &NetworkGraph {
        &self.network
    }

    fn kind(&self) -> DefenderKind {
        DefenderKind::OptimisticAcp
    }

    /// Deceive only nodes the attacker has not yet seen; known nodes are
    /// skipped without touching the counters
    fn deploy_acp_deception(
        &mut self,
        targets: &[NodeId],
        current_time: u64,
        attacker_knowledge: &BTreeSet<NodeId>,
    ) -> BTreeMap<NodeId, DeceptionRecord> {
        let mut planted = BTreeMap::new();

        for &node in targets {
            if attacker_knowledge.contains(&node) {
                continue;
            }

            self.deception_attempts += 1;
            if self.rng.gen::<f64>() >= self.params.acp_strength {
                continue;
            }

            let record = self.false_signal(current_time);
            self.deception_successes += 1;
            self.deception_history.push(DeceptionEntry {
                node,
                time: current_time,
                kind: "acp_false_signal".to_string(),
            });
            planted.insert(node, record);
        }

        tracing::trace!(
            time = current_time,
            requested = targets.len(),
            planted = planted.len(),
            "acp deception deployed"
        );

        planted
    }

    /// Most vulnerable nodes still hidden from the attacker
    fn deception_targets(&self, observation: &Observation, attacker_knowledge: &BTreeSet<NodeId>) -> Vec<NodeId> {
        let mut candidates: Vec<NodeId> = (0..observation.num_nodes())
            .filter(|node| !attacker_knowledge.contains(node))
            .filter(|node| {
                matches!(
                    observation.node_states[*node],
                    NodeState::Clean | NodeState::Patched | NodeState::Honeypot
                )
            })
            .collect();

        candidates.sort_by(|a, b| {
            observation.vulnerabilities[*b]
                .total_cmp(&observation.vulnerabilities[*a])
                .then(a.cmp(b))
        });
        candidates.truncate(MAX_DECEPTION_TARGETS);
        candidates
    }

    fn deception_stats(&self) -> Option<DeceptionStats> {
        Some(DeceptionStats {
            attempts: self.deception_attempts,
            successes: self.deception_successes,
        })
    }
}

/// Highest believed vulnerability among `nodes`; lowest id wins ties
fn most_vulnerable(nodes: &[NodeId], beliefs: &[f64]) -> Option<NodeId> {
    nodes
        .iter()
        .copied()
        .filter(|node| *node < beliefs.len())
        .fold(None, |best: Option<NodeId>, node| match best {
            Some(current) if beliefs[current] >= beliefs[node] => Some(current),
            _ => Some(node),
        })
}

fn random_node(rng: &mut StdRng, num_nodes: usize) -> Option<NodeId> {
    (num_nodes > 0).then(|| rng.gen_range(0..num_nodes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::topology::generate_network;

    fn network(num_nodes: usize) -> Arc<NetworkGraph> {
        let mut rng = StdRng::seed_from_u64(42);
        Arc::new(generate_network(num_nodes, 0.3, &mut rng).unwrap())
    }

    fn clean_view(num_nodes: usize) -> Observation {
        Observation {
            node_states: vec![NodeState::Clean; num_nodes],
            vulnerabilities: vec![0.5; num_nodes],
            asset_values: vec![0.5; num_nodes],
            current_time: 0,
        }
    }

    #[test]
    fn test_pessimistic_defaults() {
        let defender = PessimisticDefender::new(network(10), 1);
        assert_eq!(defender.params().restore_node_probability, 0.4185);
        assert_eq!(defender.params().paranoia_level, 0.8);
        assert_eq!(defender.params().vulnerability_distribution, VulnerabilityDistribution::Uniform);
        assert_eq!(defender.node_states().len(), 10);
        assert!(defender.node_states().iter().all(|s| *s == NodeState::Clean));
        assert!(defender.vulnerabilities().iter().all(|v| *v == 0.5));
        assert!(defender.action_history().is_empty());
        assert_eq!(defender.network().node_count(), 10);
        assert_eq!(defender.kind(), DefenderKind::Pessimistic);
        assert!(defender.deception_stats().is_none());
    }

    #[test]
    fn test_belief_distributions() {
        for dist in [
            VulnerabilityDistribution::Normal,
            VulnerabilityDistribution::Exponential,
            VulnerabilityDistribution::Bimodal,
        ] {
            let params = PessimisticParams { vulnerability_distribution: dist, ..PessimisticParams::default() };
            let defender = PessimisticDefender::with_params(network(10), params, 7);
            assert_eq!(defender.vulnerabilities().len(), 10);
            assert!(defender.vulnerabilities().iter().all(|v| (0.1..=0.9).contains(v)));

            let params = AcpParams { vulnerability_distribution: dist, ..AcpParams::default() };
            let defender = OptimisticAcpDefender::with_params(network(10), params, 7);
            assert!(defender.vulnerabilities().iter().all(|v| (0.1..=0.9).contains(v)));
        }
    }

    #[test]
    fn test_restore_frequency() {
        let mut defender = PessimisticDefender::new(network(10), 42);
        let view = clean_view(10);
        let knowledge = BTreeSet::new();

        let restores = (0..1000)
            .filter(|_| defender.select_action(&view, &knowledge) == ActionType::RestoreNode)
            .count();

        let ratio = restores as f64 / 1000.0;
        assert!((0.37..=0.47).contains(&ratio), "restore ratio {}", ratio);
        assert_eq!(defender.action_history().len(), 1000);
    }

    #[test]
    fn test_pessimistic_actions_by_situation() {
        let mut defender = PessimisticDefender::new(network(10), 3);
        let knowledge = BTreeSet::new();

        let clean = clean_view(10);
        for _ in 0..50 {
            let action = defender.select_action(&clean, &knowledge);
            assert!(matches!(action, ActionType::RestoreNode | ActionType::Patch | ActionType::Monitor));
        }

        let mut breached = clean_view(10);
        breached.node_states[4] = NodeState::Compromised;
        for _ in 0..50 {
            let action = defender.select_action(&breached, &knowledge);
            assert!(matches!(action, ActionType::RestoreNode | ActionType::Isolate | ActionType::Patch));
        }
        assert_eq!(defender.node_states()[4], NodeState::Compromised);
        assert_eq!(defender.select_target(ActionType::Isolate, &breached, &knowledge), Some(4));
        assert_eq!(defender.select_target(ActionType::RestoreNode, &breached, &knowledge), Some(4));
        assert_eq!(defender.select_target(ActionType::Monitor, &breached, &knowledge), None);
    }

    #[test]
    fn test_acp_defaults() {
        let defender = OptimisticAcpDefender::new(network(10), 1);
        assert_eq!(defender.params().acp_strength, 0.65);
        assert_eq!(defender.deception_attempts(), 0);
        assert_eq!(defender.deception_successes(), 0);
        assert!(defender.deception_history().is_empty());
        assert_eq!(defender.kind(), DefenderKind::OptimisticAcp);
        assert_eq!(defender.deception_stats(), Some(DeceptionStats { attempts: 0, successes: 0 }));
        assert_eq!(DeceptionStats { attempts: 0, successes: 0 }.success_rate(), 0.0);

        let custom = OptimisticAcpDefender::with_params(
            network(10),
            AcpParams { acp_strength: 0.8, ..AcpParams::default() },
            1,
        );
        assert_eq!(custom.params().acp_strength, 0.8);
    }

    #[test]
    fn test_acp_never_restores() {
        let mut defender = OptimisticAcpDefender::new(network(10), 9);
        let mut view = clean_view(10);
        let mut knowledge = BTreeSet::new();

        for i in 0..500 {
            if i % 3 == 0 {
                view.node_states[i % 10] = NodeState::Compromised;
            }
            if i % 7 == 0 {
                knowledge.insert(i % 10);
            }
            let action = defender.select_action(&view, &knowledge);
            assert_ne!(action, ActionType::RestoreNode);
        }
    }

    #[test]
    fn test_acp_prefers_deception_under_asymmetry() {
        let mut defender = OptimisticAcpDefender::new(network(10), 5);
        let view = clean_view(10);
        let knowledge = BTreeSet::new();

        let actions: Vec<ActionType> = (0..200).map(|_| defender.select_action(&view, &knowledge)).collect();
        assert!(actions
            .iter()
            .all(|a| matches!(a, ActionType::AcpDeception | ActionType::DeployHoneypot | ActionType::Monitor)));
        assert!(actions.contains(&ActionType::AcpDeception));
    }

    #[test]
    fn test_acp_falls_back_without_asymmetry() {
        let mut defender = OptimisticAcpDefender::new(network(10), 5);
        let mut view = clean_view(10);
        view.node_states[2] = NodeState::Compromised;
        let knowledge: BTreeSet<NodeId> = (0..10).collect();

        for _ in 0..100 {
            let action = defender.select_action(&view, &knowledge);
            assert!(matches!(action, ActionType::Isolate | ActionType::Patch));
        }
    }

    #[test]
    fn test_full_strength_deception() {
        let params = AcpParams { acp_strength: 1.0, ..AcpParams::default() };
        let mut defender = OptimisticAcpDefender::with_params(network(10), params, 1);
        let knowledge = BTreeSet::from([0, 1]);

        let planted = defender.deploy_acp_deception(&[3, 4, 5], 7, &knowledge);

        assert_eq!(planted.len(), 3);
        assert_eq!(defender.deception_successes(), 3);
        assert_eq!(defender.deception_attempts(), 3);
        assert_eq!(defender.deception_history().len(), 3);
        for (node, record) in &planted {
            assert!([3, 4, 5].contains(node));
            assert!((0.85..=0.98).contains(&record.false_vulnerability));
            assert!((0.75..=0.95).contains(&record.false_value));
            assert_eq!(record.timestamp, 7);
            assert!(record.success);
        }
    }

    #[test]
    fn test_known_nodes_cannot_be_deceived() {
        let mut defender = OptimisticAcpDefender::new(network(10), 1);
        let knowledge = BTreeSet::from([0, 1, 2]);

        let planted = defender.deploy_acp_deception(&[0, 1, 2], 0, &knowledge);

        assert!(planted.is_empty());
        assert_eq!(defender.deception_successes(), 0);
        assert_eq!(defender.deception_attempts(), 0);
    }

    #[test]
    fn test_zero_strength_counts_attempts_only() {
        let params = AcpParams { acp_strength: 0.0, ..AcpParams::default() };
        let mut defender = OptimisticAcpDefender::with_params(network(10), params, 1);

        let planted = defender.deploy_acp_deception(&[5, 6], 0, &BTreeSet::new());
        assert!(planted.is_empty());
        assert_eq!(defender.deception_attempts(), 2);
        assert_eq!(defender.deception_successes(), 0);
    }

    #[test]
    fn test_pessimistic_default_deception_is_noop() {
        let mut defender = PessimisticDefender::new(network(10), 1);
        assert!(defender.deploy_acp_deception(&[1, 2], 0, &BTreeSet::new()).is_empty());
        assert!(defender.deception_targets(&clean_view(10), &BTreeSet::new()).is_empty());
    }

    #[test]
    fn test_deception_targets_skip_known_nodes() {
        let defender = OptimisticAcpDefender::new(network(10), 1);
        let mut view = clean_view(10);
        view.vulnerabilities[8] = 0.9;
        view.node_states[1] = NodeState::Compromised;
        let knowledge = BTreeSet::from([0]);

        let targets = defender.deception_targets(&view, &knowledge);
        assert_eq!(targets, vec![8, 2, 3]);
    }

    #[test]
    fn test_action_distribution() {
        let mut defender = PessimisticDefender::new(network(10), 1);
        assert!(defender.get_action_distribution().is_empty());

        defender.action_history = vec![
            ActionType::Monitor,
            ActionType::Monitor,
            ActionType::Patch,
            ActionType::Isolate,
        ];
        let dist = defender.get_action_distribution();
        assert_eq!(dist.len(), 3);
        assert_eq!(dist[&ActionType::Monitor], 0.5);
        assert_eq!(dist[&ActionType::Patch], 0.25);
        assert_eq!(dist[&ActionType::Isolate], 0.25);
    }

    #[test]
    fn test_honeypot_target_hidden_from_attacker() {
        let mut defender = OptimisticAcpDefender::new(network(10), 1);
        let view = clean_view(10);
        let knowledge: BTreeSet<NodeId> = (0..9).collect();
        assert_eq!(
            defender.select_target(ActionType::DeployHoneypot, &view, &knowledge),
            Some(9)
        );
    }
}
