use crate::error::{Result, SimulationError};
use rand::Rng;
use rand_distr::{Exp1, StandardNormal};
use serde::{Deserialize, Serialize};
use std::fmt;

const VULNERABILITY_FLOOR: f64 = 0.1;
const VULNERABILITY_CEILING: f64 = 0.9;

/// Shape of per-node vulnerability draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VulnerabilityDistribution {
    /// Constant 0.5
    #[default]
    Uniform,
    Normal,
    Exponential,
    /// Mixture of a low and a high sub-population
    Bimodal,
}

impl VulnerabilityDistribution {
    /// Parse a distribution name; anything unrecognised becomes `Uniform`
    pub fn parse_or_uniform(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "normal" => VulnerabilityDistribution::Normal,
            "exponential" => VulnerabilityDistribution::Exponential,
            "bimodal" => VulnerabilityDistribution::Bimodal,
            _ => VulnerabilityDistribution::Uniform,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VulnerabilityDistribution::Uniform => "uniform",
            VulnerabilityDistribution::Normal => "normal",
            VulnerabilityDistribution::Exponential => "exponential",
            VulnerabilityDistribution::Bimodal => "bimodal",
        }
    }

    /// Draw one vulnerability value
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let raw = match self {
            VulnerabilityDistribution::Uniform => return 0.5,
            VulnerabilityDistribution::Normal => {
                let z: f64 = rng.sample(StandardNormal);
                0.5 + 0.15 * z
            }
            VulnerabilityDistribution::Exponential => {
                let e: f64 = rng.sample(Exp1);
                0.3 * e
            }
            VulnerabilityDistribution::Bimodal => {
                let center = if rng.gen_bool(0.5) { 0.3 } else { 0.7 };
                let z: f64 = rng.sample(StandardNormal);
                center + 0.1 * z
            }
        };

        raw.clamp(VULNERABILITY_FLOOR, VULNERABILITY_CEILING)
    }

    pub fn sample_many<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<f64> {
        (0..count).map(|_| self.sample(rng)).collect()
    }
}

impl From<String> for VulnerabilityDistribution {
    fn from(name: String) -> Self {
        Self::parse_or_uniform(&name)
    }
}

impl From<VulnerabilityDistribution> for String {
    fn from(dist: VulnerabilityDistribution) -> Self {
        dist.name().to_string()
    }
}

impl fmt::Display for VulnerabilityDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reward-shaping constants. Empirically chosen, not derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardShaping {
    /// Defender baseline per clean node, credited once per round
    pub clean_node_reward: f64,
    pub isolate_bonus: f64,
    /// Attacker gain for a (perceived) compromise
    pub compromise_reward: f64,
    /// Defender loss when a high-value node falls
    pub high_value_penalty: f64,
    /// Degree criticality at or above which a node counts as high-value
    pub high_value_threshold: f64,
    pub honeypot_bonus: f64,
    /// Defender gain when the attacker spends effort on a false signal
    pub lure_bonus: f64,
    /// Attacker loss when a false foothold is exposed
    pub reveal_penalty: f64,
}

impl Default for RewardShaping {
    fn default() -> Self {
        Self {
            clean_node_reward: 0.4,
            isolate_bonus: 10.0,
            compromise_reward: 5.0,
            high_value_penalty: 5.0,
            high_value_threshold: 0.75,
            honeypot_bonus: 3.0,
            lure_bonus: 1.0,
            reveal_penalty: 2.0,
        }
    }
}

/// Parameters the network environment is built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub num_nodes: usize,
    /// Edge probability (Erdős–Rényi) or attachment density (Barabási–Albert)
    pub connectivity: f64,
    /// Bounds of the defender response latency drawn per exploit
    pub latency_window: (f64, f64),
    pub vulnerability_distribution: VulnerabilityDistribution,
    pub reward: RewardShaping,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            num_nodes: 50,
            connectivity: 0.6,
            latency_window: (0.3, 0.8),
            vulnerability_distribution: VulnerabilityDistribution::Uniform,
            reward: RewardShaping::default(),
        }
    }
}

impl EnvironmentConfig {
    pub fn new(num_nodes: usize, connectivity: f64) -> Self {
        Self {
            num_nodes,
            connectivity,
            ..Self::default()
        }
    }

    pub fn with_distribution(mut self, distribution: VulnerabilityDistribution) -> Self {
        self.vulnerability_distribution = distribution;
        self
    }

    pub fn with_latency_window(mut self, low: f64, high: f64) -> Self {
        self.latency_window = (low, high);
        self
    }

    pub fn validate(&self) -> Result<()> {
        ensure(self.num_nodes >= 2, "num_nodes must be at least 2")?;
        ensure(
            self.connectivity > 0.0 && self.connectivity <= 1.0,
            "connectivity must lie in (0, 1]",
        )?;
        let (low, high) = self.latency_window;
        ensure(
            (0.0..=1.0).contains(&low) && (0.0..=1.0).contains(&high) && low <= high,
            "latency_window must satisfy 0 <= low <= high <= 1",
        )
    }
}

impl From<&SimulationConfig> for EnvironmentConfig {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            num_nodes: config.num_nodes,
            connectivity: config.connectivity,
            latency_window: config.latency_window,
            vulnerability_distribution: config.vulnerability_distribution,
            reward: config.reward.clone(),
        }
    }
}

/// Experiment-wide configuration, read-only once built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub num_nodes: usize,
    pub connectivity: f64,
    pub latency_window: (f64, f64),
    pub vulnerability_distribution: VulnerabilityDistribution,
    /// Probability that a single deception attempt succeeds
    pub acp_strength: f64,
    pub learning_rate: f64,
    pub decay_rate: f64,
    pub noise: f64,
    pub restore_node_probability: f64,
    pub paranoia_level: f64,
    pub num_episodes: usize,
    /// Time horizon of one episode
    pub max_steps: u64,
    pub random_seed: u64,
    pub confidence_level: f64,
    pub reward: RewardShaping,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_nodes: 50,
            connectivity: 0.6,
            latency_window: (0.3, 0.8),
            vulnerability_distribution: VulnerabilityDistribution::Uniform,
            acp_strength: 0.65,
            learning_rate: 1.0,
            decay_rate: 0.8,
            noise: 0.1,
            restore_node_probability: 0.4185,
            paranoia_level: 0.8,
            num_episodes: 1000,
            max_steps: 100,
            random_seed: 42,
            confidence_level: 0.95,
            reward: RewardShaping::default(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        EnvironmentConfig::from(self).validate()?;
        ensure(probability(self.acp_strength), "acp_strength must lie in [0, 1]")?;
        ensure(
            probability(self.restore_node_probability),
            "restore_node_probability must lie in [0, 1]",
        )?;
        ensure(probability(self.paranoia_level), "paranoia_level must lie in [0, 1]")?;
        ensure(self.learning_rate > 0.0, "learning_rate must be positive")?;
        ensure(self.decay_rate >= 0.0, "decay_rate must be non-negative")?;
        ensure(self.noise >= 0.0, "noise must be non-negative")?;
        ensure(self.num_episodes > 0, "num_episodes must be positive")?;
        ensure(self.max_steps > 0, "max_steps must be positive")?;
        ensure(
            self.confidence_level > 0.0 && self.confidence_level < 1.0,
            "confidence_level must lie in (0, 1)",
        )
    }

    /// Seed of one episode, independent of execution order
    pub fn episode_seed(&self, episode_id: usize) -> u64 {
        self.random_seed.wrapping_add(episode_id as u64)
    }

    /// Even ids run the ACP defender, so an odd total favours ACP by one
    pub fn acp_episode_count(&self) -> usize {
        self.num_episodes.div_ceil(2)
    }

    pub fn traditional_episode_count(&self) -> usize {
        self.num_episodes / 2
    }
}

fn probability(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

fn ensure(condition: bool, message: &str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(SimulationError::InvalidConfiguration(message.to_string()))
    }
}
