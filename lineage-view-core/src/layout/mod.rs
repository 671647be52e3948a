//! Positions a [`FlowGraph`] with a pluggable layout engine
//!
//! The adapter owns no state. It sizes every node, hands the engine the nodes and the
//! edges between them, and converts the engine's node centres into the anchor the
//! drawing surface expects (centre minus half the node size).

mod layered;

pub use layered::LayeredLayout;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::errors::LineageError;
use crate::view::{FlowGraph, HandlePosition, Position};

/// Axis along which lineage flows
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LayoutDirection {
    #[default]
    #[serde(rename = "LR")]
    LeftRight,
    #[serde(rename = "TB")]
    TopBottom,
}

impl LayoutDirection {
    pub fn is_horizontal(&self) -> bool {
        matches!(self, LayoutDirection::LeftRight)
    }
}

impl fmt::Display for LayoutDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutDirection::LeftRight => f.write_str("LR"),
            LayoutDirection::TopBottom => f.write_str("TB"),
        }
    }
}

impl FromStr for LayoutDirection {
    type Err = LineageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LR" => Ok(LayoutDirection::LeftRight),
            "TB" => Ok(LayoutDirection::TopBottom),
            other => Err(LineageError::Validation(format!(
                "Unknown layout direction '{}', expected LR or TB",
                other
            ))),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Node box sizes handed to the layout engine
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct NodeDimensions {
    pub width: f64,
    pub height: f64,
    /// Height of a node drawn with its column list open
    pub expanded_height: f64,
}

impl Default for NodeDimensions {
    fn default() -> Self {
        Self {
            width: 400.0,
            height: 50.0,
            expanded_height: 350.0,
        }
    }
}

impl NodeDimensions {
    pub fn size_of(&self, expanded: bool) -> Size {
        Size {
            width: self.width,
            height: if expanded {
                self.expanded_height
            } else {
                self.height
            },
        }
    }
}

/// Input of a layout engine: sized nodes in render order and the edges between them
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutGraph {
    pub direction: LayoutDirection,
    pub nodes: Vec<(String, Size)>,
    pub edges: Vec<(String, String)>,
}

/// Layered-graph positioning.
///
/// Implementations must be deterministic and return the centre of every node they
/// were given, keyed by node id.
pub trait LayoutEngine {
    fn compute(&self, graph: &LayoutGraph) -> HashMap<String, Position>;
}

pub fn layout_graph<E>(
    graph: FlowGraph,
    direction: LayoutDirection,
    dimensions: &NodeDimensions,
    engine: &E,
) -> FlowGraph
where
    E: LayoutEngine + ?Sized,
{
    let FlowGraph {
        mut nodes,
        edges,
        dropped_edges,
    } = graph;

    let node_ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let edges: Vec<_> = edges
        .into_iter()
        .filter(|e| node_ids.contains(e.source()) && node_ids.contains(e.target()))
        .collect();

    let mut seen_pairs = HashSet::new();
    let layout_edges: Vec<(String, String)> = edges
        .iter()
        .map(|e| (e.source().to_string(), e.target().to_string()))
        .filter(|pair| seen_pairs.insert(pair.clone()))
        .collect();

    let request = LayoutGraph {
        direction,
        nodes: nodes
            .iter()
            .map(|n| (n.id.clone(), dimensions.size_of(n.is_expanded)))
            .collect(),
        edges: layout_edges,
    };

    let centres = engine.compute(&request);
    let (target_position, source_position) = if direction.is_horizontal() {
        (HandlePosition::Left, HandlePosition::Right)
    } else {
        (HandlePosition::Top, HandlePosition::Bottom)
    };

    for node in &mut nodes {
        node.target_position = target_position;
        node.source_position = source_position;

        let size = dimensions.size_of(node.is_expanded);
        match centres.get(&node.id) {
            Some(centre) => {
                node.position = Position::new(
                    centre.x - size.width / 2.0,
                    centre.y - size.height / 2.0,
                );
            }
            None => warn!("Layout engine returned no position for node {}", node.id),
        }
    }

    FlowGraph {
        nodes,
        edges,
        dropped_edges,
    }
}
