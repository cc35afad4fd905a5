pub mod topology;

use crate::core::{
    ActionType, Actor, DeceptionRecord, EnvironmentConfig, NodeId, NodeState,
};
use crate::error::{Result, SimulationError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

pub use topology::{NetworkGraph, TopologyModel};

/// Actions at or above this cost are recorded as expensive
pub const EXPENSIVE_ACTION_COST: f64 = 5.0;

/// Latency above which a slow defender makes defenses look weaker
pub const LATENCY_EXPLOIT_THRESHOLD: f64 = 0.6;

const MAX_EXPLOIT_PROBABILITY: f64 = 0.95;

/// Share of base vulnerability a patched node keeps
const PATCH_RETENTION: f64 = 0.3;

/// Vulnerability a honeypot advertises to the attacker
const HONEYPOT_LURE_VULNERABILITY: f64 = 0.9;

/// Cost of every action, keyed by action type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCosts(BTreeMap<ActionType, f64>);

impl Default for ActionCosts {
    fn default() -> Self {
        Self(
            ActionType::ALL
                .iter()
                .map(|action| (*action, action.reference_cost()))
                .collect(),
        )
    }
}

impl ActionCosts {
    pub fn get(&self, action: ActionType) -> f64 {
        self.0.get(&action).copied().unwrap_or_else(|| action.reference_cost())
    }

    pub fn contains(&self, action: ActionType) -> bool {
        self.0.contains_key(&action)
    }

    /// String-keyed view for external reporting
    pub fn by_name(&self) -> BTreeMap<String, f64> {
        self.0
            .iter()
            .map(|(action, cost)| (action.name().to_string(), *cost))
            .collect()
    }

    pub fn most_expensive(&self) -> Option<ActionType> {
        self.0
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(action, _)| *action)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeceptionEventKind {
    FalseSignal,
    HoneypotDeployed,
    HoneypotTriggered,
    /// Attacker acted on a node carrying a false signal
    LureEngaged,
    /// A false foothold was exposed to the attacker
    FootholdRevealed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeceptionEvent {
    pub time: u64,
    pub node: NodeId,
    pub kind: DeceptionEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpensiveAction {
    pub time: u64,
    pub node: Option<NodeId>,
    pub action: ActionType,
    pub cost: f64,
}

/// Per-episode counters and histories, cleared by `reset`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentMetrics {
    pub cognitive_latency_exploitations: u64,
    pub acp_deceptions: Vec<DeceptionEvent>,
    pub expensive_actions: Vec<ExpensiveAction>,
}

/// What one side is shown of the network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub node_states: Vec<NodeState>,
    pub vulnerabilities: Vec<f64>,
    pub asset_values: Vec<f64>,
    pub current_time: u64,
}

impl Observation {
    pub fn num_nodes(&self) -> usize {
        self.node_states.len()
    }

    pub fn nodes_in(&self, state: NodeState) -> Vec<NodeId> {
        self.node_states
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == state)
            .map(|(node, _)| node)
            .collect()
    }

    pub fn count(&self, state: NodeState) -> usize {
        self.node_states.iter().filter(|s| **s == state).count()
    }
}

/// One action submitted to the environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub actor: Actor,
    pub action: ActionType,
    pub target: Option<NodeId>,
    /// False signals carried by an `AcpDeception` action
    pub false_signals: BTreeMap<NodeId, DeceptionRecord>,
}

impl ActionRequest {
    pub fn attacker(action: ActionType, target: Option<NodeId>) -> Self {
        Self {
            actor: Actor::Attacker,
            action,
            target,
            false_signals: BTreeMap::new(),
        }
    }

    pub fn defender(action: ActionType, target: Option<NodeId>) -> Self {
        Self {
            actor: Actor::Defender,
            action,
            target,
            false_signals: BTreeMap::new(),
        }
    }

    pub fn deception(false_signals: BTreeMap<NodeId, DeceptionRecord>) -> Self {
        Self {
            actor: Actor::Defender,
            action: ActionType::AcpDeception,
            target: None,
            false_signals,
        }
    }
}

/// Ground-truth result of one executed action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub actor: Actor,
    pub action: ActionType,
    pub target: Option<NodeId>,
    pub success: bool,
    /// Success as reported to the acting side
    pub perceived_success: bool,
    /// Success probability the attacker could infer from its view
    pub expected_probability: Option<f64>,
    pub cost: f64,
    pub defender_reward: f64,
    pub attacker_reward: f64,
    pub detected: Vec<NodeId>,
    pub revealed: Vec<NodeId>,
    pub deceptions_installed: usize,
}

impl StepOutcome {
    fn new(request: &ActionRequest, cost: f64) -> Self {
        Self {
            actor: request.actor,
            action: request.action,
            target: request.target,
            success: false,
            perceived_success: false,
            expected_probability: None,
            cost,
            defender_reward: 0.0,
            attacker_reward: 0.0,
            detected: Vec::new(),
            revealed: Vec::new(),
            deceptions_installed: 0,
        }
    }

    /// Reward credited to the acting side
    pub fn reward(&self) -> f64 {
        match self.actor {
            Actor::Attacker => self.attacker_reward,
            Actor::Defender => self.defender_reward,
        }
    }

    /// The part of the outcome the attacker gets to see
    pub fn attacker_feedback(&self) -> AttackerFeedback {
        AttackerFeedback {
            action: self.action,
            target: self.target,
            perceived_success: self.perceived_success,
            expected_probability: self.expected_probability,
            revealed: self.revealed.clone(),
            reward: self.attacker_reward,
        }
    }
}

/// Attacker-visible view of a step outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackerFeedback {
    pub action: ActionType,
    pub target: Option<NodeId>,
    pub perceived_success: bool,
    pub expected_probability: Option<f64>,
    pub revealed: Vec<NodeId>,
    pub reward: f64,
}

/// Ground truth of one episode: topology, node state, vulnerability,
/// costs and metrics. The only component that mutates node state.
#[derive(Debug, Clone)]
pub struct NetworkEnvironment {
    config: EnvironmentConfig,
    network: Arc<NetworkGraph>,
    criticality: Vec<f64>,
    node_states: Vec<NodeState>,
    vulnerabilities: Vec<f64>,
    deceptions: BTreeMap<NodeId, DeceptionRecord>,
    /// Honeypots the attacker believes it has compromised
    false_footholds: BTreeSet<NodeId>,
    action_costs: ActionCosts,
    metrics: EnvironmentMetrics,
    current_time: u64,
    rng: StdRng,
}

impl NetworkEnvironment {
    pub fn new(config: EnvironmentConfig, seed: u64) -> Result<Self> {
        config.validate()?;

        let mut rng = StdRng::seed_from_u64(seed);
        let network = topology::generate_network(config.num_nodes, config.connectivity, &mut rng)?;
        let criticality = topology::degree_criticality(&network);
        let vulnerabilities = config
            .vulnerability_distribution
            .sample_many(config.num_nodes, &mut rng);

        tracing::debug!(
            num_nodes = config.num_nodes,
            edges = network.edge_count(),
            distribution = %config.vulnerability_distribution,
            "network environment created"
        );

        Ok(Self {
            node_states: vec![NodeState::Clean; config.num_nodes],
            config,
            network: Arc::new(network),
            criticality,
            vulnerabilities,
            deceptions: BTreeMap::new(),
            false_footholds: BTreeSet::new(),
            action_costs: ActionCosts::default(),
            metrics: EnvironmentMetrics::default(),
            current_time: 0,
            rng,
        })
    }

    /// Re-initialise node state, time, metrics and vulnerabilities.
    /// The topology is kept.
    pub fn reset(&mut self) -> Observation {
        self.node_states = vec![NodeState::Clean; self.config.num_nodes];
        self.vulnerabilities = self
            .config
            .vulnerability_distribution
            .sample_many(self.config.num_nodes, &mut self.rng);
        self.deceptions.clear();
        self.false_footholds.clear();
        self.metrics = EnvironmentMetrics::default();
        self.current_time = 0;

        self.observe_defender()
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    pub fn num_nodes(&self) -> usize {
        self.config.num_nodes
    }

    /// Shared read-only handle to the topology
    pub fn network(&self) -> Arc<NetworkGraph> {
        Arc::clone(&self.network)
    }

    pub fn node_states(&self) -> &[NodeState] {
        &self.node_states
    }

    pub fn node_state(&self, node: NodeId) -> Option<NodeState> {
        self.node_states.get(node).copied()
    }

    /// Force a node into a state, e.g. to stage a scenario
    pub fn set_node_state(&mut self, node: NodeId, state: NodeState) -> Result<()> {
        let slot = self
            .node_states
            .get_mut(node)
            .ok_or(SimulationError::InvalidTarget {
                node: Some(node),
                num_nodes: self.config.num_nodes,
            })?;
        *slot = state;
        Ok(())
    }

    /// Base vulnerabilities as drawn from the configured distribution
    pub fn vulnerabilities(&self) -> &[f64] {
        &self.vulnerabilities
    }

    pub fn effective_vulnerability(&self, node: NodeId) -> f64 {
        let base = self.vulnerabilities.get(node).copied().unwrap_or(0.0);
        match self.node_states.get(node) {
            Some(NodeState::Patched) => base * PATCH_RETENTION,
            _ => base,
        }
    }

    pub fn is_high_value(&self, node: NodeId) -> bool {
        self.criticality
            .get(node)
            .is_some_and(|c| *c >= self.config.reward.high_value_threshold)
    }

    pub fn action_costs(&self) -> &ActionCosts {
        &self.action_costs
    }

    pub fn metrics(&self) -> &EnvironmentMetrics {
        &self.metrics
    }

    pub fn active_deceptions(&self) -> &BTreeMap<NodeId, DeceptionRecord> {
        &self.deceptions
    }

    pub fn current_time(&self) -> u64 {
        self.current_time
    }

    pub fn advance_time(&mut self) {
        self.current_time += 1;
    }

    pub fn compromised_count(&self) -> usize {
        self.count(NodeState::Compromised)
    }

    pub fn all_compromised(&self) -> bool {
        self.node_states.iter().all(|s| *s == NodeState::Compromised)
    }

    fn count(&self, state: NodeState) -> usize {
        self.node_states.iter().filter(|s| **s == state).count()
    }

    /// Ground truth, as the defender sees it
    pub fn observe_defender(&self) -> Observation {
        Observation {
            node_states: self.node_states.clone(),
            vulnerabilities: (0..self.num_nodes())
                .map(|node| self.effective_vulnerability(node))
                .collect(),
            asset_values: self.criticality.clone(),
            current_time: self.current_time,
        }
    }

    /// Attacker view: honeypots look clean, false footholds look
    /// compromised and deceived nodes show their false profile
    pub fn observe_attacker(&self) -> Observation {
        let node_states = self
            .node_states
            .iter()
            .enumerate()
            .map(|(node, state)| match state {
                NodeState::Honeypot if self.false_footholds.contains(&node) => NodeState::Compromised,
                NodeState::Honeypot => NodeState::Clean,
                other => *other,
            })
            .collect();

        let vulnerabilities = (0..self.num_nodes())
            .map(|node| self.perceived_vulnerability(node))
            .collect();

        let asset_values = (0..self.num_nodes())
            .map(|node| match self.deceptions.get(&node) {
                Some(record) => record.false_value,
                None => self.criticality[node],
            })
            .collect();

        Observation {
            node_states,
            vulnerabilities,
            asset_values,
            current_time: self.current_time,
        }
    }

    fn perceived_vulnerability(&self, node: NodeId) -> f64 {
        if let Some(record) = self.deceptions.get(&node) {
            return record.false_vulnerability;
        }
        match self.node_states[node] {
            NodeState::Honeypot => HONEYPOT_LURE_VULNERABILITY,
            _ => self.effective_vulnerability(node),
        }
    }

    /// Apply one action. An invalid target is rejected with no state
    /// change and no reward.
    pub fn execute(&mut self, request: &ActionRequest) -> Result<StepOutcome> {
        self.validate_request(request)?;

        let cost = self.action_costs.get(request.action);
        let mut outcome = StepOutcome::new(request, cost);

        match request.action {
            ActionType::Scan => self.apply_scan(self.required_target(request)?, &mut outcome),
            ActionType::Exploit => self.apply_exploit(self.required_target(request)?, &mut outcome),
            ActionType::Propagate => self.apply_propagate(self.required_target(request)?, &mut outcome),
            ActionType::Monitor => {
                outcome.success = true;
                outcome.detected = (0..self.num_nodes())
                    .filter(|node| self.node_states[*node] == NodeState::Compromised)
                    .collect();
            }
            ActionType::Patch => self.apply_patch(self.required_target(request)?, &mut outcome),
            ActionType::Isolate => self.apply_isolate(self.required_target(request)?, &mut outcome),
            ActionType::DeployHoneypot => {
                self.apply_honeypot(self.required_target(request)?, &mut outcome)
            }
            ActionType::AcpDeception => self.apply_deception(&request.false_signals, &mut outcome),
            ActionType::RestoreNode => self.apply_restore(self.required_target(request)?, &mut outcome),
        }

        if request.actor == Actor::Defender {
            outcome.perceived_success = outcome.success;
        }

        if cost >= EXPENSIVE_ACTION_COST {
            self.metrics.expensive_actions.push(ExpensiveAction {
                time: self.current_time,
                node: request.target,
                action: request.action,
                cost,
            });
        }

        self.settle_rewards(&mut outcome);

        tracing::trace!(
            time = self.current_time,
            actor = ?outcome.actor,
            action = %outcome.action,
            target = ?outcome.target,
            success = outcome.success,
            reward = outcome.reward(),
            "action executed"
        );

        Ok(outcome)
    }

    fn validate_request(&self, request: &ActionRequest) -> Result<()> {
        let num_nodes = self.num_nodes();
        let invalid = |node: Option<NodeId>| SimulationError::InvalidTarget { node, num_nodes };

        match request.target {
            Some(node) if node >= num_nodes => return Err(invalid(Some(node))),
            None if request.action.requires_target() => return Err(invalid(None)),
            _ => {}
        }

        if let Some(node) = request.false_signals.keys().find(|node| **node >= num_nodes) {
            return Err(invalid(Some(*node)));
        }

        Ok(())
    }

    fn required_target(&self, request: &ActionRequest) -> Result<NodeId> {
        request.target.ok_or(SimulationError::InvalidTarget {
            node: None,
            num_nodes: self.num_nodes(),
        })
    }

    fn settle_rewards(&self, outcome: &mut StepOutcome) {
        match outcome.actor {
            Actor::Defender => {
                let baseline = self.config.reward.clean_node_reward * self.count(NodeState::Clean) as f64;
                outcome.defender_reward += baseline - outcome.cost;
            }
            Actor::Attacker => {
                outcome.attacker_reward -= outcome.cost;
            }
        }
    }

    fn apply_scan(&mut self, node: NodeId, outcome: &mut StepOutcome) {
        let probability = match self.node_states[node] {
            NodeState::Honeypot => 1.0,
            _ => 0.5 + 0.5 * self.effective_vulnerability(node),
        };

        outcome.success = self.rng.gen::<f64>() < probability;
        outcome.perceived_success = outcome.success;
    }

    fn apply_exploit(&mut self, node: NodeId, outcome: &mut StepOutcome) {
        outcome.expected_probability = Some(self.perceived_vulnerability(node));
        self.engage_lure(node, outcome);

        let state = self.node_states[node];
        match state {
            NodeState::Isolated | NodeState::Compromised => {}
            NodeState::Honeypot => self.trigger_honeypot(node, outcome),
            NodeState::Clean | NodeState::Patched => {
                let (low, high) = self.config.latency_window;
                let latency = self.rng.gen_range(low..=high);
                let boosted = latency > LATENCY_EXPLOIT_THRESHOLD;

                let mut probability = self.effective_vulnerability(node);
                if boosted {
                    probability = (probability + latency - LATENCY_EXPLOIT_THRESHOLD).min(MAX_EXPLOIT_PROBABILITY);
                }

                if self.rng.gen::<f64>() < probability {
                    if boosted {
                        self.metrics.cognitive_latency_exploitations += 1;
                    }
                    self.compromise(node, outcome);
                }
            }
        }
    }

    fn apply_propagate(&mut self, node: NodeId, outcome: &mut StepOutcome) {
        outcome.expected_probability = Some(self.perceived_vulnerability(node));
        self.engage_lure(node, outcome);

        let adjacent: Vec<NodeId> = topology::neighbors(&self.network, node).collect();
        let has_foothold = adjacent
            .iter()
            .any(|n| self.node_states[*n] == NodeState::Compromised);

        let state = self.node_states[node];
        match state {
            NodeState::Isolated | NodeState::Compromised => {}
            _ if !has_foothold => {
                // Only a false foothold (or nothing) borders the target
                let exposed: Vec<NodeId> = adjacent
                    .into_iter()
                    .filter(|n| self.false_footholds.contains(n))
                    .collect();
                for foothold in exposed {
                    self.false_footholds.remove(&foothold);
                    self.record_deception(foothold, DeceptionEventKind::FootholdRevealed);
                    outcome.attacker_reward -= self.config.reward.reveal_penalty;
                    outcome.revealed.push(foothold);
                }
            }
            NodeState::Honeypot => self.trigger_honeypot(node, outcome),
            NodeState::Clean | NodeState::Patched => {
                if self.rng.gen::<f64>() < self.effective_vulnerability(node) {
                    self.compromise(node, outcome);
                }
            }
        }
    }

    fn apply_patch(&mut self, node: NodeId, outcome: &mut StepOutcome) {
        if matches!(self.node_states[node], NodeState::Clean | NodeState::Compromised) {
            self.node_states[node] = NodeState::Patched;
            outcome.success = true;
        }
    }

    fn apply_isolate(&mut self, node: NodeId, outcome: &mut StepOutcome) {
        if self.node_states[node] == NodeState::Compromised {
            self.node_states[node] = NodeState::Isolated;
            self.deceptions.remove(&node);
            outcome.success = true;
            outcome.defender_reward += self.config.reward.isolate_bonus;
        }
    }

    fn apply_honeypot(&mut self, node: NodeId, outcome: &mut StepOutcome) {
        if self.node_states[node] == NodeState::Clean {
            self.node_states[node] = NodeState::Honeypot;
            self.record_deception(node, DeceptionEventKind::HoneypotDeployed);
            outcome.success = true;
        }
    }

    fn apply_deception(&mut self, signals: &BTreeMap<NodeId, DeceptionRecord>, outcome: &mut StepOutcome) {
        for (node, record) in signals {
            if matches!(self.node_states[*node], NodeState::Compromised | NodeState::Isolated) {
                continue;
            }
            self.deceptions.insert(*node, record.clone());
            self.record_deception(*node, DeceptionEventKind::FalseSignal);
            outcome.deceptions_installed += 1;
        }
        outcome.success = outcome.deceptions_installed > 0;
    }

    fn apply_restore(&mut self, node: NodeId, outcome: &mut StepOutcome) {
        self.node_states[node] = NodeState::Clean;
        self.deceptions.remove(&node);
        self.false_footholds.remove(&node);
        outcome.success = true;
    }

    fn compromise(&mut self, node: NodeId, outcome: &mut StepOutcome) {
        self.node_states[node] = NodeState::Compromised;
        self.deceptions.remove(&node);
        outcome.success = true;
        outcome.perceived_success = true;
        outcome.attacker_reward += self.config.reward.compromise_reward;

        if self.is_high_value(node) {
            outcome.defender_reward -= self.config.reward.high_value_penalty;
        }
    }

    /// Attacker is told it succeeded; nothing is actually compromised
    fn trigger_honeypot(&mut self, node: NodeId, outcome: &mut StepOutcome) {
        self.false_footholds.insert(node);
        self.record_deception(node, DeceptionEventKind::HoneypotTriggered);
        outcome.perceived_success = true;
        outcome.attacker_reward += self.config.reward.compromise_reward;
        outcome.defender_reward += self.config.reward.honeypot_bonus;
    }

    fn engage_lure(&mut self, node: NodeId, outcome: &mut StepOutcome) {
        if self.deceptions.contains_key(&node) {
            self.record_deception(node, DeceptionEventKind::LureEngaged);
            outcome.defender_reward += self.config.reward.lure_bonus;
        }
    }

    fn record_deception(&mut self, node: NodeId, kind: DeceptionEventKind) {
        self.metrics.acp_deceptions.push(DeceptionEvent {
            time: self.current_time,
            node,
            kind,
        });
    }
}
