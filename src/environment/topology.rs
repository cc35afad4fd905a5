use crate::core::NodeId;
use crate::error::{Result, SimulationError};
use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Network topology; each node weight is its own id
pub type NetworkGraph = UnGraph<NodeId, ()>;

/// Largest network still generated as an Erdős–Rényi graph
pub const ERDOS_RENYI_MAX_NODES: usize = 100;

/// Bound on Erdős–Rényi regeneration before repairing connectivity
pub const MAX_GENERATION_ATTEMPTS: usize = 100;

/// Random graph model picked for a network size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TopologyModel {
    ErdosRenyi { edge_probability: f64 },
    BarabasiAlbert { attachment: usize },
}

impl TopologyModel {
    pub fn for_size(num_nodes: usize, connectivity: f64) -> Self {
        if num_nodes <= ERDOS_RENYI_MAX_NODES {
            TopologyModel::ErdosRenyi {
                edge_probability: connectivity,
            }
        } else {
            let attachment = ((num_nodes as f64 * connectivity / 10.0).floor() as usize).max(1);
            TopologyModel::BarabasiAlbert { attachment }
        }
    }
}

/// Generate a connected network of `num_nodes` nodes
pub fn generate_network<R: Rng + ?Sized>(
    num_nodes: usize,
    connectivity: f64,
    rng: &mut R,
) -> Result<NetworkGraph> {
    let mut attempts = 1;

    let mut graph = match TopologyModel::for_size(num_nodes, connectivity) {
        TopologyModel::ErdosRenyi { edge_probability } => {
            let mut graph = erdos_renyi(num_nodes, edge_probability, rng);
            while !is_connected(&graph) && attempts < MAX_GENERATION_ATTEMPTS {
                graph = erdos_renyi(num_nodes, edge_probability, rng);
                attempts += 1;
            }
            graph
        }
        TopologyModel::BarabasiAlbert { attachment } => barabasi_albert(num_nodes, attachment, rng),
    };

    if !is_connected(&graph) {
        tracing::debug!(num_nodes, attempts, "repairing disconnected network");
        connect_components(&mut graph, rng);
    }

    if is_connected(&graph) {
        Ok(graph)
    } else {
        Err(SimulationError::GenerationFailure { num_nodes, attempts })
    }
}

pub fn is_connected(graph: &NetworkGraph) -> bool {
    graph.node_count() <= 1 || connected_components(graph) == 1
}

/// Degree of every node divided by the maximum degree
pub fn degree_criticality(graph: &NetworkGraph) -> Vec<f64> {
    let degrees: Vec<usize> = graph
        .node_indices()
        .map(|idx| graph.neighbors(idx).count())
        .collect();
    let max_degree = degrees.iter().copied().max().unwrap_or(0).max(1);

    degrees
        .into_iter()
        .map(|d| d as f64 / max_degree as f64)
        .collect()
}

pub fn neighbors(graph: &NetworkGraph, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    graph.neighbors(NodeIndex::new(node)).map(|idx| idx.index())
}

fn empty_graph(num_nodes: usize) -> NetworkGraph {
    let mut graph = UnGraph::with_capacity(num_nodes, num_nodes * 2);
    for id in 0..num_nodes {
        graph.add_node(id);
    }
    graph
}

fn erdos_renyi<R: Rng + ?Sized>(num_nodes: usize, edge_probability: f64, rng: &mut R) -> NetworkGraph {
    let mut graph = empty_graph(num_nodes);

    for i in 0..num_nodes {
        for j in (i + 1)..num_nodes {
            if rng.gen_bool(edge_probability) {
                graph.add_edge(NodeIndex::new(i), NodeIndex::new(j), ());
            }
        }
    }

    graph
}

/// Preferential attachment: each new node links to `attachment` existing
/// nodes picked proportionally to their degree
fn barabasi_albert<R: Rng + ?Sized>(num_nodes: usize, attachment: usize, rng: &mut R) -> NetworkGraph {
    let mut graph = empty_graph(num_nodes);
    if num_nodes < 2 {
        return graph;
    }

    let attachment = attachment.clamp(1, num_nodes - 1);
    let mut targets: Vec<NodeId> = (0..attachment).collect();
    let mut repeated: Vec<NodeId> = Vec::with_capacity(2 * num_nodes * attachment);

    for source in attachment..num_nodes {
        for &target in &targets {
            graph.add_edge(NodeIndex::new(source), NodeIndex::new(target), ());
        }

        repeated.extend(targets.iter().copied());
        repeated.extend(std::iter::repeat(source).take(attachment));

        let mut chosen = BTreeSet::new();
        while chosen.len() < attachment {
            chosen.insert(repeated[rng.gen_range(0..repeated.len())]);
        }
        targets = chosen.into_iter().collect();
    }

    graph
}

/// Link consecutive components with one edge each
fn connect_components<R: Rng + ?Sized>(graph: &mut NetworkGraph, rng: &mut R) {
    let mut sets = UnionFind::new(graph.node_count());
    for edge in graph.edge_references() {
        sets.union(edge.source().index(), edge.target().index());
    }

    let mut components: BTreeMap<usize, Vec<NodeId>> = BTreeMap::new();
    for node in 0..graph.node_count() {
        components.entry(sets.find(node)).or_default().push(node);
    }

    let groups: Vec<Vec<NodeId>> = components.into_values().collect();
    for pair in groups.windows(2) {
        let a = pair[0][rng.gen_range(0..pair[0].len())];
        let b = pair[1][rng.gen_range(0..pair[1].len())];
        graph.add_edge(NodeIndex::new(a), NodeIndex::new(b), ());
    }
}
