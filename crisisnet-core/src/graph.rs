//! Multi-relational message graph and its builder
//!
//! Nodes are corpus messages; edges connect messages by semantic similarity
//! or by shared keyword/location. At most one edge exists per unordered
//! pair: once any edge is inserted, later candidates for that pair are
//! discarded regardless of type. Insertion order of the edge rules gives
//! the precedence similarity > shared_keyword > shared_location.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::records::{truncate_chars, Message};
use crate::{DEFAULT_SIMILARITY_THRESHOLD, SHARED_KEYWORD_WEIGHT, SHARED_LOCATION_WEIGHT};

/// Characters of message text carried on each node
const NODE_TEXT_CHARS: usize = 100;

/// Relation type of a graph edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Similarity,
    SharedKeyword,
    SharedLocation,
}

/// An undirected, weighted, typed edge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    /// Edge weight in [0, 1]
    pub weight: f64,
    pub kind: EdgeKind,
}

/// Attributes carried on each graph node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeAttrs {
    pub keyword: Option<String>,
    pub location: Option<String>,
    pub disaster: bool,
    /// Message text truncated for display
    pub text: String,
}

/// Externally supplied pairwise similarity matrix
///
/// Symmetric with zero diagonal, values in [0, 1], indexed by corpus order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityMatrix {
    rows: Vec<Vec<f64>>,
}

impl SimilarityMatrix {
    /// Validate squareness and wrap the raw rows
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self, CoreError> {
        let n = rows.len();
        for row in &rows {
            if row.len() != n {
                return Err(CoreError::MatrixShape {
                    rows: n,
                    cols: row.len(),
                    expected: n,
                });
            }
        }
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.rows[i][j]
    }
}

/// The deduplicated, typed-edge undirected graph over one corpus
#[derive(Debug, Clone, Default)]
pub struct MessageGraph {
    /// Node ids in insertion (corpus) order
    order: Vec<String>,
    nodes: HashMap<String, NodeAttrs>,
    /// Edges keyed by canonical unordered pair
    edges: HashMap<(String, String), Edge>,
}

fn canonical_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

impl MessageGraph {
    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Node ids in corpus order
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn node(&self, id: &str) -> Option<&NodeAttrs> {
        self.nodes.get(id)
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        self.edges.contains_key(&canonical_pair(a, b))
    }

    pub fn edge_between(&self, a: &str, b: &str) -> Option<&Edge> {
        self.edges.get(&canonical_pair(a, b))
    }

    fn add_node(&mut self, id: String, attrs: NodeAttrs) -> Result<(), CoreError> {
        if self.nodes.contains_key(&id) {
            return Err(CoreError::DuplicateMessageId(id));
        }
        self.order.push(id.clone());
        self.nodes.insert(id, attrs);
        Ok(())
    }

    /// Insert an edge unless the unordered pair already has one.
    /// Returns false when the candidate was discarded.
    fn try_add_edge(&mut self, source: &str, target: &str, weight: f64, kind: EdgeKind) -> bool {
        let key = canonical_pair(source, target);
        if self.edges.contains_key(&key) {
            return false;
        }
        self.edges.insert(
            key,
            Edge {
                source: source.to_string(),
                target: target.to_string(),
                weight: weight.clamp(0.0, 1.0),
                kind,
            },
        );
        true
    }

    /// Aggregate graph statistics
    pub fn stats(&self) -> GraphStats {
        let mut similarity = 0usize;
        let mut shared_keyword = 0usize;
        let mut shared_location = 0usize;
        for edge in self.edges.values() {
            match edge.kind {
                EdgeKind::Similarity => similarity += 1,
                EdgeKind::SharedKeyword => shared_keyword += 1,
                EdgeKind::SharedLocation => shared_location += 1,
            }
        }

        let n = self.node_count();
        let density = if n > 1 {
            2.0 * self.edge_count() as f64 / (n as f64 * (n as f64 - 1.0))
        } else {
            0.0
        };

        GraphStats {
            nodes: n,
            edges: self.edge_count(),
            similarity_edges: similarity,
            shared_keyword_edges: shared_keyword,
            shared_location_edges: shared_location,
            density,
        }
    }

    /// Node-link form for serialization: nodes in corpus order, edges
    /// sorted by their canonical pair
    pub fn snapshot(&self) -> GraphSnapshot {
        let nodes = self
            .order
            .iter()
            .filter_map(|id| {
                self.nodes.get(id).map(|attrs| GraphNode {
                    id: id.clone(),
                    keyword: attrs.keyword.clone(),
                    location: attrs.location.clone(),
                    disaster: attrs.disaster,
                    text: attrs.text.clone(),
                })
            })
            .collect();

        let mut pairs: Vec<&(String, String)> = self.edges.keys().collect();
        pairs.sort();
        let edges = pairs
            .into_iter()
            .filter_map(|pair| self.edges.get(pair).cloned())
            .collect();

        GraphSnapshot { nodes, edges }
    }
}

/// A node in the serialized node-link form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub keyword: Option<String>,
    pub location: Option<String>,
    pub disaster: bool,
    pub text: String,
}

/// Serializable node-link view of a [`MessageGraph`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<Edge>,
}

/// Summary counts over a built graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub similarity_edges: usize,
    pub shared_keyword_edges: usize,
    pub shared_location_edges: usize,
    pub density: f64,
}

/// Builds a [`MessageGraph`] from messages plus a similarity matrix
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    threshold: f64,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }

    pub fn with_threshold(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Build the graph: similarity edges first, then shared-keyword, then
    /// shared-location. The matrix must match the message count.
    pub fn build(
        &self,
        messages: &[Message],
        similarity: &SimilarityMatrix,
    ) -> Result<MessageGraph, CoreError> {
        if similarity.len() != messages.len() {
            return Err(CoreError::MatrixShape {
                rows: similarity.len(),
                cols: similarity.len(),
                expected: messages.len(),
            });
        }

        let mut graph = MessageGraph::default();

        for message in messages {
            graph.add_node(
                message.id.clone(),
                NodeAttrs {
                    keyword: message.keyword.clone(),
                    location: message.location.clone(),
                    disaster: message.disaster,
                    text: truncate_chars(&message.text, NODE_TEXT_CHARS),
                },
            )?;
        }

        // Semantic similarity edges (diagonal excluded)
        let n = messages.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let sim = similarity.get(i, j);
                if sim > 0.0 && sim >= self.threshold {
                    graph.try_add_edge(
                        &messages[i].id,
                        &messages[j].id,
                        sim,
                        EdgeKind::Similarity,
                    );
                }
            }
        }

        // Shared-keyword edges for groups of size > 1
        for (_, group) in group_indices(messages, |m| m.keyword.as_deref()) {
            for (a, b) in pairs(&group) {
                graph.try_add_edge(
                    &messages[a].id,
                    &messages[b].id,
                    SHARED_KEYWORD_WEIGHT,
                    EdgeKind::SharedKeyword,
                );
            }
        }

        // Shared-location edges for groups of size > 1
        for (_, group) in group_indices(messages, |m| m.location.as_deref()) {
            for (a, b) in pairs(&group) {
                graph.try_add_edge(
                    &messages[a].id,
                    &messages[b].id,
                    SHARED_LOCATION_WEIGHT,
                    EdgeKind::SharedLocation,
                );
            }
        }

        Ok(graph)
    }
}

/// Group message indices by a non-empty string key, corpus order within groups
fn group_indices<'a, F>(messages: &'a [Message], key: F) -> Vec<(String, Vec<usize>)>
where
    F: Fn(&'a Message) -> Option<&'a str>,
{
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, message) in messages.iter().enumerate() {
        let Some(k) = key(message) else { continue };
        if k.is_empty() {
            continue;
        }
        let entry = groups.entry(k.to_string()).or_default();
        if entry.is_empty() {
            order.push(k.to_string());
        }
        entry.push(idx);
    }
    order
        .into_iter()
        .filter_map(|k| {
            let group = groups.remove(&k)?;
            (group.len() > 1).then_some((k, group))
        })
        .collect()
}

/// All unordered index pairs of a group
fn pairs(indices: &[usize]) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    for (i, &a) in indices.iter().enumerate() {
        for &b in &indices[i + 1..] {
            out.push((a, b));
        }
    }
    out
}
