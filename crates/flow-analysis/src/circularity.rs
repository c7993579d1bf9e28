//! Circularity detection over the topic transition graph.
//!
//! The graph has one node per topic and one directed edge per transition
//! whose endpoints are both known topics. Cycles are the strongly connected
//! components with more than one node, found with Tarjan's algorithm.
//!
//! ## Circularity index
//!
//! ```text
//! index = clamp01((nodes_in_cycles / total_nodes) * (1 + ln(cycle_count + 1)))
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AnalysisError;
use crate::types::{Topic, TopicId, TopicTransition};

/// Result of cycle analysis on a topic graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircularityAnalysis {
    /// Every SCC, singletons included, in completion order
    pub strongly_connected_components: Vec<Vec<TopicId>>,
    /// Number of SCCs with more than one node
    pub cycle_count: usize,
    /// Mean size of those SCCs (0 without cycles)
    pub average_cycle_length: f64,
    /// Largest of those SCCs (0 without cycles)
    pub max_cycle_length: usize,
    /// Nodes belonging to any cycle
    pub nodes_in_cycles: usize,
    /// Bounded circularity index (0.0 - 1.0)
    pub circularity_index: f64,
}

/// Directed topic graph in adjacency-list form.
#[derive(Debug, Clone, Default)]
pub struct TopicGraph {
    nodes: Vec<TopicId>,
    positions: HashMap<TopicId, usize>,
    adjacency: Vec<Vec<usize>>,
}

impl TopicGraph {
    /// Build the graph from topics and transitions.
    ///
    /// Nodes keep topic order. Edges with an unknown endpoint are dropped.
    pub fn new(topics: &[Topic], transitions: &[TopicTransition]) -> Self {
        let mut graph = Self::default();
        for topic in topics {
            graph.add_node(&topic.id);
        }
        for transition in transitions {
            if !graph.add_edge(&transition.from_topic, &transition.to_topic) {
                debug!(
                    from = %transition.from_topic,
                    to = %transition.to_topic,
                    "Dropping transition with unknown endpoint"
                );
            }
        }
        graph
    }

    /// Add a node; repeated ids are ignored.
    pub fn add_node(&mut self, id: &str) {
        if self.positions.contains_key(id) {
            return;
        }
        self.positions.insert(id.to_string(), self.nodes.len());
        self.nodes.push(id.to_string());
        self.adjacency.push(Vec::new());
    }

    /// Add a directed edge between known nodes.
    ///
    /// Returns `false` and leaves the graph unchanged if either endpoint is unknown.
    pub fn add_edge(&mut self, from: &str, to: &str) -> bool {
        match (self.positions.get(from), self.positions.get(to)) {
            (Some(&f), Some(&t)) => {
                self.adjacency[f].push(t);
                true
            }
            _ => false,
        }
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum()
    }

    /// Strongly connected components as lists of topic ids.
    ///
    /// Roots are tried in node order and components come out in the order
    /// Tarjan's algorithm completes them.
    pub fn strongly_connected_components(&self) -> Vec<Vec<TopicId>> {
        Tarjan::new(self)
            .run()
            .into_iter()
            .map(|component| {
                component
                    .into_iter()
                    .map(|node| self.nodes[node].clone())
                    .collect()
            })
            .collect()
    }
}

const UNVISITED: usize = usize::MAX;

/// Tarjan's SCC search with an explicit call stack.
struct Tarjan<'g> {
    graph: &'g TopicGraph,
    index: Vec<usize>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    next_index: usize,
    components: Vec<Vec<usize>>,
}

impl<'g> Tarjan<'g> {
    fn new(graph: &'g TopicGraph) -> Self {
        let n = graph.node_count();
        Self {
            graph,
            index: vec![UNVISITED; n],
            lowlink: vec![0; n],
            on_stack: vec![false; n],
            stack: Vec::with_capacity(n),
            next_index: 0,
            components: Vec::new(),
        }
    }

    fn visit(&mut self, v: usize) {
        self.index[v] = self.next_index;
        self.lowlink[v] = self.next_index;
        self.next_index += 1;
        self.stack.push(v);
        self.on_stack[v] = true;
    }

    fn run(mut self) -> Vec<Vec<usize>> {
        // Frames of (node, next edge to follow) replace recursion.
        let mut frames: Vec<(usize, usize)> = Vec::new();

        for root in 0..self.graph.node_count() {
            if self.index[root] != UNVISITED {
                continue;
            }
            self.visit(root);
            frames.push((root, 0));

            while let Some(frame) = frames.last_mut() {
                let v = frame.0;
                if let Some(&w) = self.graph.adjacency[v].get(frame.1) {
                    frame.1 += 1;
                    if self.index[w] == UNVISITED {
                        self.visit(w);
                        frames.push((w, 0));
                    } else if self.on_stack[w] {
                        self.lowlink[v] = self.lowlink[v].min(self.index[w]);
                    }
                    continue;
                }

                frames.pop();
                if let Some(&(parent, _)) = frames.last() {
                    self.lowlink[parent] = self.lowlink[parent].min(self.lowlink[v]);
                }
                if self.lowlink[v] == self.index[v] {
                    let mut component = Vec::new();
                    while let Some(w) = self.stack.pop() {
                        self.on_stack[w] = false;
                        component.push(w);
                        if w == v {
                            break;
                        }
                    }
                    self.components.push(component);
                }
            }
        }

        self.components
    }
}

/// Analyze circularity, falling back to an all-zero result on failure.
pub fn analyze_circularity(
    topics: &[Topic],
    transitions: &[TopicTransition],
) -> CircularityAnalysis {
    try_analyze_circularity(topics, transitions).unwrap_or_else(|e| {
        warn!(error = %e, "Circularity analysis failed, using empty result");
        CircularityAnalysis::default()
    })
}

/// Analyze circularity of the graph induced by topics and transitions.
pub fn try_analyze_circularity(
    topics: &[Topic],
    transitions: &[TopicTransition],
) -> Result<CircularityAnalysis, AnalysisError> {
    let graph = TopicGraph::new(topics, transitions);
    let total_nodes = graph.node_count();
    if total_nodes == 0 {
        return Ok(CircularityAnalysis::default());
    }

    let components = graph.strongly_connected_components();
    let cycle_sizes: Vec<usize> = components
        .iter()
        .map(Vec::len)
        .filter(|&size| size > 1)
        .collect();

    let cycle_count = cycle_sizes.len();
    let nodes_in_cycles: usize = cycle_sizes.iter().sum();
    let max_cycle_length = cycle_sizes.iter().copied().max().unwrap_or(0);
    let average_cycle_length = if cycle_count == 0 {
        0.0
    } else {
        nodes_in_cycles as f64 / cycle_count as f64
    };

    let cycle_fraction = nodes_in_cycles as f64 / total_nodes as f64;
    let index = cycle_fraction * (1.0 + (cycle_count as f64 + 1.0).ln());
    if !index.is_finite() {
        return Err(AnalysisError::NonFinite("circularity index"));
    }

    debug!(
        nodes = total_nodes,
        edges = graph.edge_count(),
        components = components.len(),
        cycle_count,
        "Analyzed circularity"
    );

    Ok(CircularityAnalysis {
        strongly_connected_components: components,
        cycle_count,
        average_cycle_length,
        max_cycle_length,
        nodes_in_cycles,
        circularity_index: index.clamp(0.0, 1.0),
    })
}
