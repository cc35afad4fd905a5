use crate::core::{ActionType, Instance, NodeId, NodeState, SimulationConfig, Situation};
use crate::environment::{topology, AttackerFeedback, NetworkGraph, Observation};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Utility assumed for an action the attacker has never tried
pub const DEFAULT_UTILITY: f64 = 2.0;

/// Confidence multiplier applied for every exposed false foothold
pub const REVEAL_CONFIDENCE_FACTOR: f64 = 0.85;

/// Base EMA rate of the confidence estimate, scaled by the learning rate
const CONFIDENCE_RATE: f64 = 0.1;

/// Recall noise is clipped to this many standard deviations
const NOISE_CLIP: f64 = 3.0;

const TIE_EPSILON: f64 = 1e-9;

/// Beliefs and memory parameters every attacker carries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackerProfile {
    pub decay_rate: f64,
    pub noise: f64,
    pub known_nodes: BTreeSet<NodeId>,
    /// Nodes the attacker believes it holds
    pub compromised_nodes: BTreeSet<NodeId>,
    pub overall_confidence: f64,
}

impl Default for AttackerProfile {
    fn default() -> Self {
        Self {
            decay_rate: 0.8,
            noise: 0.1,
            known_nodes: BTreeSet::new(),
            compromised_nodes: BTreeSet::new(),
            overall_confidence: 1.0,
        }
    }
}

/// Tunable learning parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackerParams {
    pub decay_rate: f64,
    pub noise: f64,
    pub learning_rate: f64,
}

impl Default for AttackerParams {
    fn default() -> Self {
        Self {
            decay_rate: 0.8,
            noise: 0.1,
            learning_rate: 1.0,
        }
    }
}

impl From<&SimulationConfig> for AttackerParams {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            decay_rate: config.decay_rate,
            noise: config.noise,
            learning_rate: config.learning_rate,
        }
    }
}

/// Capability contract of an attacker agent
pub trait Attacker {
    /// Choose the next action from the attacker's view of the network
    fn select_action(&mut self, observation: &Observation, current_time: u64) -> ActionType;

    /// Store the outcome of an action taken in `situation`
    fn learn(
        &mut self,
        situation: Situation,
        action: ActionType,
        outcome: f64,
        timestamp: u64,
        confidence: f64,
    );

    fn encode_situation(&self, observation: &Observation) -> Situation;

    fn profile(&self) -> &AttackerProfile;

    fn profile_mut(&mut self) -> &mut AttackerProfile;

    /// Read-only topology, when the attacker has been given one
    fn network(&self) -> Option<&NetworkGraph> {
        None
    }

    /// EMA rate used when recalibrating confidence
    fn confidence_rate(&self) -> f64 {
        CONFIDENCE_RATE
    }

    /// Node an action should be aimed at, or `None` when nothing fits
    fn select_target(&self, action: ActionType, observation: &Observation) -> Option<NodeId> {
        let profile = self.profile();
        match action {
            ActionType::Scan => (0..observation.num_nodes()).find(|node| {
                !profile.known_nodes.contains(node)
                    && observation.node_states[*node] != NodeState::Isolated
            }),
            ActionType::Exploit => best_target(profile.known_nodes.iter().copied(), profile, observation, |node| {
                (observation.vulnerabilities[node], observation.asset_values[node])
            }),
            ActionType::Propagate => {
                let frontier = propagation_frontier(self.network()?, profile);
                best_target(frontier.into_iter(), profile, observation, |node| {
                    (observation.asset_values[node], observation.vulnerabilities[node])
                })
            }
            _ => None,
        }
    }

    /// Update beliefs from the visible result of the attacker's own action
    fn observe(&mut self, feedback: &AttackerFeedback) {
        let rate = self.confidence_rate();
        let profile = self.profile_mut();

        if let Some(target) = feedback.target {
            if feedback.perceived_success {
                profile.known_nodes.insert(target);
                if matches!(feedback.action, ActionType::Exploit | ActionType::Propagate) {
                    profile.compromised_nodes.insert(target);
                }
            }
        }

        if let Some(expected) = feedback.expected_probability {
            let observed = if feedback.perceived_success { 1.0 } else { 0.0 };
            let calibration = 1.0 - (observed - expected).powi(2);
            profile.overall_confidence += rate * (calibration - profile.overall_confidence);
        }

        for node in &feedback.revealed {
            profile.compromised_nodes.remove(node);
            profile.overall_confidence *= REVEAL_CONFIDENCE_FACTOR;
        }

        profile.overall_confidence = profile.overall_confidence.clamp(0.0, 1.0);
    }
}

/// Graph neighbours of the nodes the attacker believes it holds
pub fn propagation_frontier(network: &NetworkGraph, profile: &AttackerProfile) -> BTreeSet<NodeId> {
    profile
        .compromised_nodes
        .iter()
        .filter(|node| **node < network.node_count())
        .flat_map(|node| topology::neighbors(network, *node))
        .filter(|node| !profile.compromised_nodes.contains(node))
        .collect()
}

/// Candidate not yet held with the highest score; lowest id wins ties
fn best_target<I, F>(candidates: I, profile: &AttackerProfile, observation: &Observation, score: F) -> Option<NodeId>
where
    I: Iterator<Item = NodeId>,
    F: Fn(NodeId) -> (f64, f64),
{
    candidates
        .filter(|node| *node < observation.num_nodes())
        .filter(|node| !profile.compromised_nodes.contains(node))
        .filter(|node| matches!(observation.node_states[*node], NodeState::Clean | NodeState::Patched))
        .fold(None, |best: Option<(NodeId, (f64, f64))>, node| {
            let candidate = score(node);
            match best {
                Some((_, current)) if current >= candidate => best,
                _ => Some((node, candidate)),
            }
        })
        .map(|(node, _)| node)
}

/// Instance-based learning attacker: decisions blend recalled outcomes,
/// weighted by recency and similarity of past situations
#[derive(Debug, Clone)]
pub struct CognitiveAttacker {
    profile: AttackerProfile,
    network: Option<Arc<NetworkGraph>>,
    learning_rate: f64,
    memory: Vec<Instance>,
    rng: StdRng,
}

impl CognitiveAttacker {
    pub fn new(seed: u64) -> Self {
        Self::with_params(AttackerParams::default(), seed)
    }

    pub fn with_params(params: AttackerParams, seed: u64) -> Self {
        Self {
            profile: AttackerProfile {
                decay_rate: params.decay_rate,
                noise: params.noise,
                ..AttackerProfile::default()
            },
            network: None,
            learning_rate: params.learning_rate,
            memory: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_config(network: Arc<NetworkGraph>, config: &SimulationConfig, seed: u64) -> Self {
        Self::with_params(AttackerParams::from(config), seed).with_network(network)
    }

    /// Let the attacker see adjacency, which `Propagate` needs
    pub fn with_network(mut self, network: Arc<NetworkGraph>) -> Self {
        self.network = Some(network);
        self
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn memory(&self) -> &[Instance] {
        &self.memory
    }

    /// Confidence-weighted blend of every remembered outcome, per action
    fn blended_values(&mut self, situation: &Situation, current_time: u64) -> BTreeMap<ActionType, f64> {
        let mut grouped: BTreeMap<ActionType, Vec<usize>> = BTreeMap::new();
        for (idx, instance) in self.memory.iter().enumerate() {
            grouped.entry(instance.action).or_default().push(idx);
        }

        let mut values = BTreeMap::new();
        for (action, indices) in grouped {
            let activations: Array1<f64> = indices
                .iter()
                .map(|idx| {
                    activation(
                        &self.profile,
                        &self.memory[*idx],
                        situation,
                        current_time,
                        &mut self.rng,
                    )
                })
                .collect();
            let probabilities = softmax(&activations);

            let mut weighted = 0.0;
            let mut weight = 0.0;
            for (p, idx) in probabilities.iter().zip(&indices) {
                let instance = &self.memory[*idx];
                weighted += p * instance.confidence * instance.outcome;
                weight += p * instance.confidence;
            }

            let value = if weight > 0.0 {
                weighted / weight
            } else {
                probabilities
                    .iter()
                    .zip(&indices)
                    .map(|(p, idx)| p * self.memory[*idx].outcome)
                    .sum()
            };
            values.insert(action, value);
        }

        values
    }

    /// Actions with at least one plausible target in the current view
    fn available_actions(&self, observation: &Observation) -> Vec<ActionType> {
        ActionType::ATTACKER_ACTIONS
            .into_iter()
            .filter(|action| match action {
                ActionType::Propagate if self.profile.compromised_nodes.is_empty() => false,
                _ => self.select_target(*action, observation).is_some(),
            })
            .collect()
    }

    /// Drop believed footholds the attacker can see it no longer holds
    fn sync_beliefs(&mut self, observation: &Observation) {
        self.profile.compromised_nodes.retain(|node| {
            observation
                .node_states
                .get(*node)
                .is_some_and(|state| *state == NodeState::Compromised)
        });
    }
}

impl Attacker for CognitiveAttacker {
    fn select_action(&mut self, observation: &Observation, current_time: u64) -> ActionType {
        self.sync_beliefs(observation);

        let available = self.available_actions(observation);
        if available.is_empty() {
            return ActionType::Scan;
        }

        let situation = self.encode_situation(observation);
        let values = self.blended_values(&situation, current_time);

        let mut best: Option<(ActionType, f64, bool)> = None;
        for action in available {
            let explored = values.contains_key(&action);
            let utility = values.get(&action).copied().unwrap_or(DEFAULT_UTILITY);

            let better = match best {
                None => true,
                Some((current, current_utility, current_explored)) => {
                    if (utility - current_utility).abs() > TIE_EPSILON {
                        utility > current_utility
                    } else if explored != current_explored {
                        !explored
                    } else {
                        action.reference_cost() < current.reference_cost()
                    }
                }
            };

            if better {
                best = Some((action, utility, explored));
            }
        }

        best.map(|(action, _, _)| action).unwrap_or(ActionType::Scan)
    }

    fn learn(
        &mut self,
        situation: Situation,
        action: ActionType,
        outcome: f64,
        timestamp: u64,
        confidence: f64,
    ) {
        self.memory.push(Instance {
            situation,
            action,
            outcome,
            timestamp,
            confidence,
        });
    }

    /// Per-state node counts of the view, then known and held counts
    fn encode_situation(&self, observation: &Observation) -> Situation {
        let mut features: Vec<usize> = NodeState::ALL
            .iter()
            .map(|state| observation.count(*state))
            .collect();
        features.push(self.profile.known_nodes.len());
        features.push(self.profile.compromised_nodes.len());
        Situation::new(features)
    }

    fn profile(&self) -> &AttackerProfile {
        &self.profile
    }

    fn profile_mut(&mut self) -> &mut AttackerProfile {
        &mut self.profile
    }

    fn network(&self) -> Option<&NetworkGraph> {
        self.network.as_deref()
    }

    fn confidence_rate(&self) -> f64 {
        CONFIDENCE_RATE * self.learning_rate
    }
}

/// A(i) = -d * ln(max(t - t_i, 1)) + (similarity - 1) + recall noise
fn activation(
    profile: &AttackerProfile,
    instance: &Instance,
    situation: &Situation,
    current_time: u64,
    rng: &mut StdRng,
) -> f64 {
    let elapsed = current_time.saturating_sub(instance.timestamp).max(1) as f64;
    let recency = -profile.decay_rate * elapsed.ln();
    let mismatch = situation.similarity(&instance.situation) - 1.0;
    let z: f64 = rng.sample(StandardNormal);

    recency + mismatch + profile.noise * z.clamp(-NOISE_CLIP, NOISE_CLIP)
}

fn softmax(activations: &Array1<f64>) -> Array1<f64> {
    let max = activations.fold(f64::NEG_INFINITY, |acc, &a| acc.max(a));
    let exp = activations.mapv(|a| (a - max).exp());
    let sum = exp.sum();
    exp / sum
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(states: Vec<NodeState>) -> Observation {
        let n = states.len();
        Observation {
            node_states: states,
            vulnerabilities: vec![0.5; n],
            asset_values: vec![0.5; n],
            current_time: 0,
        }
    }

    #[test]
    fn test_profile_defaults() {
        let attacker = CognitiveAttacker::new(1);
        let profile = attacker.profile();
        assert_eq!(profile.decay_rate, 0.8);
        assert_eq!(profile.noise, 0.1);
        assert!(profile.known_nodes.is_empty());
        assert!(profile.compromised_nodes.is_empty());
        assert_eq!(profile.overall_confidence, 1.0);
    }

    #[test]
    fn test_params_are_injected() {
        let params = AttackerParams { decay_rate: 0.5, noise: 0.3, learning_rate: 2.0 };
        let attacker = CognitiveAttacker::with_params(params, 1);
        assert_eq!(attacker.profile().decay_rate, 0.5);
        assert_eq!(attacker.profile().noise, 0.3);
        assert_eq!(attacker.confidence_rate(), 0.2);
    }

    #[test]
    fn test_instances_do_not_share_state() {
        let mut a = CognitiveAttacker::new(1);
        let b = CognitiveAttacker::new(1);
        a.profile_mut().known_nodes.insert(3);
        assert!(b.profile().known_nodes.is_empty());
    }

    #[test]
    fn test_scans_first_without_knowledge() {
        let mut attacker = CognitiveAttacker::new(7);
        let obs = view(vec![NodeState::Clean; 5]);
        assert_eq!(attacker.select_action(&obs, 0), ActionType::Scan);
        assert_eq!(attacker.select_target(ActionType::Scan, &obs), Some(0));
    }

    #[test]
    fn test_unexplored_action_preferred_on_tie() {
        let mut attacker = CognitiveAttacker::new(7);
        attacker.profile_mut().known_nodes.insert(1);
        let obs = view(vec![NodeState::Clean; 5]);

        // Scan already remembered at the default utility
        let situation = attacker.encode_situation(&obs);
        attacker.learn(situation, ActionType::Scan, DEFAULT_UTILITY, 0, 1.0);

        assert_eq!(attacker.select_action(&obs, 5), ActionType::Exploit);
    }

    #[test]
    fn test_low_outcomes_steer_away() {
        let mut attacker = CognitiveAttacker::new(11);
        attacker.profile_mut().known_nodes.insert(1);
        let obs = view(vec![NodeState::Clean; 5]);
        let situation = attacker.encode_situation(&obs);

        attacker.learn(situation.clone(), ActionType::Exploit, -1.0, 0, 1.0);
        attacker.learn(situation.clone(), ActionType::Scan, 4.0, 1, 1.0);

        assert_eq!(attacker.select_action(&obs, 3), ActionType::Scan);
        assert_eq!(attacker.memory().len(), 2);
    }

    #[test]
    fn test_blend_weights_by_confidence() {
        let mut attacker = CognitiveAttacker::with_params(
            AttackerParams { noise: 0.0, ..AttackerParams::default() },
            3,
        );
        let situation = Situation::new(vec![5, 0, 0, 0, 0, 0, 0]);
        attacker.learn(situation.clone(), ActionType::Exploit, 4.0, 1, 1.0);
        attacker.learn(situation.clone(), ActionType::Exploit, -1.0, 1, 0.0);

        let values = attacker.blended_values(&situation, 2);
        assert!((values[&ActionType::Exploit] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_recent_instances_dominate() {
        let mut attacker = CognitiveAttacker::with_params(
            AttackerParams { noise: 0.0, decay_rate: 2.0, learning_rate: 1.0 },
            3,
        );
        let situation = Situation::new(vec![5, 0, 0, 0, 0, 0, 0]);
        attacker.learn(situation.clone(), ActionType::Exploit, -1.0, 0, 1.0);
        attacker.learn(situation.clone(), ActionType::Exploit, 4.0, 99, 1.0);

        let values = attacker.blended_values(&situation, 100);
        assert!(values[&ActionType::Exploit] > 3.9);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let p = softmax(&Array1::from(vec![1.0, 2.0, 3.0]));
        assert!((p.sum() - 1.0).abs() < 1e-12);
        assert!(p[2] > p[1] && p[1] > p[0]);
    }

    #[test]
    fn test_observe_updates_beliefs() {
        let mut attacker = CognitiveAttacker::new(1);
        attacker.observe(&AttackerFeedback {
            action: ActionType::Scan,
            target: Some(2),
            perceived_success: true,
            expected_probability: None,
            revealed: Vec::new(),
            reward: -0.5,
        });
        assert!(attacker.profile().known_nodes.contains(&2));

        attacker.observe(&AttackerFeedback {
            action: ActionType::Exploit,
            target: Some(2),
            perceived_success: true,
            expected_probability: Some(0.5),
            revealed: Vec::new(),
            reward: 4.0,
        });
        assert!(attacker.profile().compromised_nodes.contains(&2));
        // EMA towards 1 - (1 - 0.5)^2 = 0.75
        assert!((attacker.profile().overall_confidence - (1.0 + 0.1 * (0.75 - 1.0))).abs() < 1e-12);
    }

    #[test]
    fn test_reveal_degrades_confidence() {
        let mut attacker = CognitiveAttacker::new(1);
        attacker.profile_mut().compromised_nodes.insert(4);
        attacker.observe(&AttackerFeedback {
            action: ActionType::Propagate,
            target: Some(5),
            perceived_success: false,
            expected_probability: None,
            revealed: vec![4],
            reward: -3.5,
        });
        assert!(!attacker.profile().compromised_nodes.contains(&4));
        assert!((attacker.profile().overall_confidence - REVEAL_CONFIDENCE_FACTOR).abs() < 1e-12);
    }

    #[test]
    fn test_exploit_targets_most_vulnerable_known_node() {
        let mut attacker = CognitiveAttacker::new(1);
        attacker.profile_mut().known_nodes.extend([0, 1, 2]);
        let mut obs = view(vec![NodeState::Clean; 4]);
        obs.vulnerabilities = vec![0.2, 0.95, 0.6, 0.99];
        obs.asset_values = vec![0.9, 0.1, 0.2, 0.3];

        assert_eq!(attacker.select_target(ActionType::Exploit, &obs), Some(1));
        assert_eq!(attacker.select_target(ActionType::Scan, &obs), Some(3));
    }

    #[test]
    fn test_propagate_stays_on_graph_neighbours() {
        // 0 - 7 and 1 - 2, so node 1 is out of reach from a foothold on 0
        let network = Arc::new(NetworkGraph::from_edges([(0, 7), (1, 2), (2, 3)]));
        let mut attacker = CognitiveAttacker::new(1).with_network(network);
        attacker.profile_mut().known_nodes.extend([0, 1, 7]);
        attacker.profile_mut().compromised_nodes.insert(0);

        let mut states = vec![NodeState::Clean; 8];
        states[0] = NodeState::Compromised;
        let mut obs = view(states);
        obs.asset_values[1] = 1.0;
        obs.asset_values[7] = 0.1;

        assert_eq!(attacker.select_target(ActionType::Propagate, &obs), Some(7));
        assert_eq!(
            propagation_frontier(attacker.network().unwrap(), attacker.profile()),
            BTreeSet::from([7])
        );
    }

    #[test]
    fn test_propagate_needs_topology() {
        let mut attacker = CognitiveAttacker::new(1);
        attacker.profile_mut().known_nodes.extend([0, 1]);
        attacker.profile_mut().compromised_nodes.insert(0);
        let obs = view(vec![NodeState::Compromised, NodeState::Clean]);

        assert_eq!(attacker.select_target(ActionType::Propagate, &obs), None);
    }

    #[test]
    fn test_sync_drops_lost_footholds() {
        let mut attacker = CognitiveAttacker::new(1);
        attacker.profile_mut().compromised_nodes.extend([0, 1]);
        let obs = view(vec![NodeState::Compromised, NodeState::Isolated, NodeState::Clean]);

        attacker.select_action(&obs, 1);
        assert_eq!(attacker.profile().compromised_nodes, BTreeSet::from([0]));
    }
}
