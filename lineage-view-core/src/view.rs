//! Renderable view model derived from a lineage document
//!
//! Nothing here is persisted. A [`FlowGraph`] is rebuilt from the [`EntityLineage`]
//! on every render pass and handed to the drawing surface as-is.
//!
//! [`EntityLineage`]: crate::model::EntityLineage

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::{Column, EntityReference, EntityType, LineageEdge};

/// Colour of traced (highlighted) edges
pub const INFO_COLOR: &str = "#2196f3";

/// Visual role of a node or column
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Input,
    Output,
    Default,
    LoadMore,
    NotConnected,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Side of a node where edges attach
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HandlePosition {
    Left,
    Right,
    Top,
    Bottom,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnNode {
    #[serde(flatten)]
    pub column: Column,
    pub kind: NodeKind,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    pub position: Position,
    pub source_position: HandlePosition,
    pub target_position: HandlePosition,
    /// Keyed by column FQN (or name when the FQN is missing)
    pub columns: IndexMap<String, ColumnNode>,
    pub is_expanded: bool,
    /// The focal entity of the lineage document
    pub is_main: bool,
    pub entity: EntityReference,
}

impl GraphNode {
    pub fn is_load_more(&self) -> bool {
        self.kind == NodeKind::LoadMore
    }
}

/// How the drawing surface renders an edge
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EdgeRenderKind {
    #[default]
    Default,
    /// Edge with inline edit controls, used in edit mode
    ButtonEdge,
}

impl EdgeRenderKind {
    pub fn for_mode(edit_mode: bool) -> Self {
        if edit_mode {
            EdgeRenderKind::ButtonEdge
        } else {
            EdgeRenderKind::Default
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntityEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub render: EdgeRenderKind,
    /// Animated when a pipeline carries the lineage
    pub animated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<EntityReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<EntityType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<EntityType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge: Option<LineageEdge>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_handle: String,
    pub target_handle: String,
    pub render: EdgeRenderKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge: Option<LineageEdge>,
}

/// View edge: either between whole entities or between two of their columns
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "edgeKind", rename_all = "camelCase")]
pub enum GraphEdge {
    Entity(EntityEdge),
    Column(ColumnEdge),
}

impl GraphEdge {
    pub fn entity_edge_id(source: &str, target: &str) -> String {
        format!("edge-{}-{}", source, target)
    }

    pub fn column_edge_id(
        source_handle: &str,
        target_handle: &str,
        source: &str,
        target: &str,
    ) -> String {
        format!(
            "column-{}-{}-edge-{}-{}",
            source_handle, target_handle, source, target
        )
    }

    pub fn id(&self) -> &str {
        match self {
            GraphEdge::Entity(e) => &e.id,
            GraphEdge::Column(e) => &e.id,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            GraphEdge::Entity(e) => &e.source,
            GraphEdge::Column(e) => &e.source,
        }
    }

    pub fn target(&self) -> &str {
        match self {
            GraphEdge::Entity(e) => &e.target,
            GraphEdge::Column(e) => &e.target,
        }
    }

    pub fn source_handle(&self) -> Option<&str> {
        match self {
            GraphEdge::Entity(_) => None,
            GraphEdge::Column(e) => Some(&e.source_handle),
        }
    }

    pub fn target_handle(&self) -> Option<&str> {
        match self {
            GraphEdge::Entity(_) => None,
            GraphEdge::Column(e) => Some(&e.target_handle),
        }
    }

    pub fn is_column_edge(&self) -> bool {
        matches!(self, GraphEdge::Column(_))
    }

    pub fn lineage_edge(&self) -> Option<&LineageEdge> {
        match self {
            GraphEdge::Entity(e) => e.edge.as_ref(),
            GraphEdge::Column(e) => e.edge.as_ref(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct FlowGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    /// Raw edges skipped because an endpoint was not in the document
    #[serde(skip)]
    pub dropped_edges: usize,
}

impl FlowGraph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.id() == id)
    }

    pub fn stats(&self) -> String {
        let column_edges = self.edges.iter().filter(|e| e.is_column_edge()).count();
        format!(
            "Nodes: {}, Edges: {}, Column edges: {}",
            self.nodes.len(),
            self.edges.len() - column_edges,
            column_edges
        )
    }
}

/// Stroke settings the drawing surface applies per edge
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EdgeStyle {
    pub opacity: f64,
    pub stroke_width: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
}

pub fn edge_style(traced: bool) -> EdgeStyle {
    if traced {
        EdgeStyle {
            opacity: 1.0,
            stroke_width: 2,
            stroke: Some(INFO_COLOR.to_string()),
        }
    } else {
        EdgeStyle {
            opacity: 0.25,
            stroke_width: 1,
            stroke: None,
        }
    }
}
