use thiserror::Error;

/// Errors raised by the simulation engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    /// Malformed parameter combination, raised at construction time only
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Action referenced a node that does not exist (or carried no target)
    #[error("invalid target {node:?} for network of {num_nodes} nodes")]
    InvalidTarget {
        node: Option<usize>,
        num_nodes: usize,
    },

    /// Topology could not be made connected
    #[error("network generation failed for {num_nodes} nodes after {attempts} attempts")]
    GenerationFailure { num_nodes: usize, attempts: usize },

    #[error("worker pool error: {0}")]
    WorkerPool(String),
}

impl SimulationError {
    /// Whether the episode can continue after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SimulationError::InvalidTarget { .. })
    }
}

pub type Result<T> = std::result::Result<T, SimulationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_invalid_target_is_recoverable() {
        let target = SimulationError::InvalidTarget { node: Some(99), num_nodes: 10 };
        assert!(target.is_recoverable());

        let generation = SimulationError::GenerationFailure { num_nodes: 10, attempts: 100 };
        assert!(!generation.is_recoverable());
        assert!(!SimulationError::InvalidConfiguration("x".into()).is_recoverable());
    }

    #[test]
    fn test_error_messages() {
        let err = SimulationError::InvalidTarget { node: Some(12), num_nodes: 10 };
        assert_eq!(err.to_string(), "invalid target Some(12) for network of 10 nodes");
    }
}
