//! Boundary to an external covering-array generator: the parameter model
//! it consumes, the input text it reads, and conversion of one generated
//! row back into a [`SimulationConfig`].

use crate::core::{SimulationConfig, VulnerabilityDistribution};
use crate::error::{Result, SimulationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One row of a covering array, keyed by parameter name
pub type CoveringRow = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Int,
    Double,
    Enum,
    Boolean,
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterKind::Int => "int",
            ParameterKind::Double => "double",
            ParameterKind::Enum => "enum",
            ParameterKind::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoveringParameter {
    pub name: String,
    pub kind: ParameterKind,
    pub values: Vec<String>,
}

impl CoveringParameter {
    pub fn new<V: ToString>(name: &str, kind: ParameterKind, values: &[V]) -> Self {
        Self {
            name: name.to_string(),
            kind,
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }
}

/// Constraint in the generator's expression syntax
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoveringConstraint {
    pub expression: String,
}

impl CoveringConstraint {
    pub fn new(expression: &str) -> Self {
        Self {
            expression: expression.to_string(),
        }
    }
}

/// Parameters swept by the reference combinatorial study
pub fn reference_parameters() -> Vec<CoveringParameter> {
    vec![
        CoveringParameter::new("acp_strength", ParameterKind::Double, &[0.3, 0.5, 0.7, 0.9]),
        CoveringParameter::new("num_nodes", ParameterKind::Int, &[50, 100, 200, 500]),
        CoveringParameter::new("connectivity", ParameterKind::Double, &[0.3, 0.5, 0.7]),
        CoveringParameter::new("learning_rate", ParameterKind::Double, &["0.5", "1.0", "1.5", "2.0"]),
        CoveringParameter::new(
            "vulnerability_dist",
            ParameterKind::Enum,
            &["uniform", "normal", "exponential", "bimodal"],
        ),
        CoveringParameter::new("confidence_level", ParameterKind::Double, &["0.90", "0.95", "0.99"]),
        CoveringParameter::new("num_episodes", ParameterKind::Int, &[1000, 5000, 10000]),
    ]
}

pub fn reference_constraints() -> Vec<CoveringConstraint> {
    vec![
        CoveringConstraint::new("(num_nodes = 500) => (num_episodes <= 5000)"),
        CoveringConstraint::new("(confidence_level = 0.99) => (num_episodes >= 5000)"),
    ]
}

/// Render the generator input file
pub fn render_acts_input(parameters: &[CoveringParameter], constraints: &[CoveringConstraint]) -> String {
    let mut lines = vec![
        "[System]".to_string(),
        "Name: ACP_Simulation".to_string(),
        "Description: Beyond Paralysis - Combinatorial Testing".to_string(),
        String::new(),
        "[Parameter]".to_string(),
    ];

    for param in parameters {
        lines.push(format!("{} ({}): {}", param.name, param.kind, param.values.join(", ")));
    }
    lines.push(String::new());

    if !constraints.is_empty() {
        lines.push("[Constraint]".to_string());
        lines.extend(constraints.iter().map(|c| c.expression.clone()));
        lines.push(String::new());
    }

    lines.push("[Relation]".to_string());
    lines.push(String::new());

    lines.join("\n")
}

/// Parse generator CSV output; `#` lines are comments, the first
/// remaining line is the header
pub fn parse_rows(csv: &str) -> Result<Vec<CoveringRow>> {
    let mut lines = csv
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'));

    let Some(header) = lines.next() else {
        return Ok(Vec::new());
    };
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();

    lines
        .enumerate()
        .map(|(idx, line)| {
            let cells: Vec<&str> = line.split(',').map(str::trim).collect();
            if cells.len() != columns.len() {
                return Err(SimulationError::InvalidConfiguration(format!(
                    "row {} has {} cells, expected {}",
                    idx + 1,
                    cells.len(),
                    columns.len()
                )));
            }
            Ok(columns
                .iter()
                .zip(cells)
                .map(|(column, cell)| (column.to_string(), cell.to_string()))
                .collect::<CoveringRow>())
        })
        .collect()
}

impl SimulationConfig {
    /// Overlay one covering-array row on the defaults, then validate
    pub fn from_row(row: &CoveringRow) -> Result<Self> {
        let mut config = SimulationConfig::default();

        for (key, value) in row {
            match key.as_str() {
                "acp_strength" => config.acp_strength = parse_value(key, value)?,
                "num_nodes" => config.num_nodes = parse_value(key, value)?,
                "connectivity" => config.connectivity = parse_value(key, value)?,
                "learning_rate" => config.learning_rate = parse_value(key, value)?,
                "decay_rate" => config.decay_rate = parse_value(key, value)?,
                "noise" => config.noise = parse_value(key, value)?,
                "vulnerability_dist" | "vulnerability_distribution" => {
                    config.vulnerability_distribution = VulnerabilityDistribution::parse_or_uniform(value)
                }
                "confidence_level" => config.confidence_level = parse_value(key, value)?,
                "num_episodes" => config.num_episodes = parse_value(key, value)?,
                "max_steps" => config.max_steps = parse_value(key, value)?,
                "random_seed" => config.random_seed = parse_value(key, value)?,
                "restore_node_probability" => config.restore_node_probability = parse_value(key, value)?,
                "paranoia_level" => config.paranoia_level = parse_value(key, value)?,
                _ => {
                    return Err(SimulationError::InvalidConfiguration(format!(
                        "unknown parameter '{}'",
                        key
                    )))
                }
            }
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        SimulationError::InvalidConfiguration(format!("cannot parse {} = '{}'", key, value))
    })
}
