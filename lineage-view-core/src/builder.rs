//! Converts a lineage document into a [`FlowGraph`]
//!
//! Edges whose endpoints are not part of the document are skipped without error.
//! The server streams lineage incrementally, so a dangling reference is normal while
//! neighbouring pages load; it is logged at debug level and counted in
//! [`FlowGraph::dropped_edges`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::model::{Column, EntityLineage, EntityReference, EntityType};
use crate::view::{
    ColumnEdge, ColumnNode, EdgeRenderKind, EntityEdge, FlowGraph, GraphEdge, GraphNode,
    HandlePosition, NodeKind, Position,
};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BuildOptions {
    /// Edit mode disables role colouring and renders editable edges
    pub edit_mode: bool,
    /// Nodes are drawn with their column list open
    pub expanded: bool,
}

/// A connection drawn by the user between two nodes, optionally between two columns
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

pub fn build_graph(
    lineage: &EntityLineage,
    columns: &HashMap<String, Vec<Column>>,
    options: &BuildOptions,
) -> FlowGraph {
    let main = &lineage.entity;
    let mut candidates: Vec<&EntityReference> = vec![main];
    candidates.extend(lineage.nodes.iter().filter(|n| n.id != main.id));

    let lookup: HashMap<&str, &EntityReference> =
        candidates.iter().map(|n| (n.id.as_str(), *n)).collect();

    let render = EdgeRenderKind::for_mode(options.edit_mode);
    let mut edges = Vec::new();
    let mut dropped_edges = 0;

    for edge in lineage.all_edges() {
        let (Some(source), Some(target)) = (
            lookup.get(edge.from_entity.as_str()),
            lookup.get(edge.to_entity.as_str()),
        ) else {
            debug!(
                "Skipping lineage edge {} -> {}: endpoint not in document",
                edge.from_entity, edge.to_entity
            );
            dropped_edges += 1;
            continue;
        };

        if let Some(details) = &edge.lineage_details {
            for column_lineage in &details.columns_lineage {
                let to_column = match column_lineage.to_column.as_deref() {
                    Some(c) if !c.is_empty() => c,
                    _ => continue,
                };
                for from_column in &column_lineage.from_columns {
                    edges.push(GraphEdge::Column(ColumnEdge {
                        id: GraphEdge::column_edge_id(
                            from_column,
                            to_column,
                            &edge.from_entity,
                            &edge.to_entity,
                        ),
                        source: edge.from_entity.clone(),
                        target: edge.to_entity.clone(),
                        source_handle: from_column.clone(),
                        target_handle: to_column.to_string(),
                        render,
                        function: column_lineage.function.clone(),
                        edge: Some(edge.clone()),
                    }));
                }
            }
        }

        let pipeline = edge.pipeline().cloned();
        edges.push(GraphEdge::Entity(EntityEdge {
            id: GraphEdge::entity_edge_id(&edge.from_entity, &edge.to_entity),
            source: edge.from_entity.clone(),
            target: edge.to_entity.clone(),
            render,
            animated: pipeline.is_some(),
            label: pipeline.as_ref().map(|p| p.display_label().to_string()),
            pipeline,
            source_type: Some(source.entity_type),
            target_type: Some(target.entity_type),
            edge: Some(edge.clone()),
        }));
    }

    if dropped_edges > 0 {
        debug!(
            "Dropped {} lineage edge(s) referencing unknown entities",
            dropped_edges
        );
    }

    let nodes = candidates
        .iter()
        .map(|entity| make_node(lineage, entity, entity.id == main.id, &edges, columns, options))
        .collect();

    FlowGraph {
        nodes,
        edges,
        dropped_edges,
    }
}

fn make_node(
    lineage: &EntityLineage,
    entity: &EntityReference,
    is_main: bool,
    edges: &[GraphEdge],
    columns: &HashMap<String, Vec<Column>>,
    options: &BuildOptions,
) -> GraphNode {
    let kind = if entity.is_load_more() {
        NodeKind::LoadMore
    } else if options.edit_mode {
        NodeKind::Default
    } else {
        node_kind(lineage, &entity.id)
    };

    let node_columns: IndexMap<String, ColumnNode> = columns
        .get(&entity.id)
        .map(|cols| {
            cols.iter()
                .map(|col| {
                    let col_kind = match kind {
                        NodeKind::LoadMore => NodeKind::LoadMore,
                        _ if options.edit_mode => NodeKind::Default,
                        _ => column_kind(edges, col.key()),
                    };
                    (
                        col.key().to_string(),
                        ColumnNode {
                            column: col.clone(),
                            kind: col_kind,
                        },
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    GraphNode {
        id: entity.id.clone(),
        kind,
        position: Position::default(),
        source_position: HandlePosition::Right,
        target_position: HandlePosition::Left,
        columns: node_columns,
        is_expanded: options.expanded,
        is_main,
        entity: entity.clone(),
    }
}

/// Role of an entity from the document's edge lists.
///
/// A downstream target that never feeds anything downstream is an output, an upstream
/// source that is never fed upstream is an input, anything else is default.
pub fn node_kind(lineage: &EntityLineage, id: &str) -> NodeKind {
    let downstream_to = lineage.downstream_edges.iter().any(|e| e.to_entity == id);
    let downstream_from = lineage.downstream_edges.iter().any(|e| e.from_entity == id);
    let upstream_from = lineage.upstream_edges.iter().any(|e| e.from_entity == id);
    let upstream_to = lineage.upstream_edges.iter().any(|e| e.to_entity == id);

    if downstream_to && !downstream_from {
        return NodeKind::Output;
    }
    if upstream_from && !upstream_to {
        return NodeKind::Input;
    }
    NodeKind::Default
}

/// Role of a column handle among the built column edges
pub fn column_kind(edges: &[GraphEdge], handle: &str) -> NodeKind {
    let is_source = edges.iter().any(|e| e.source_handle() == Some(handle));
    let is_target = edges.iter().any(|e| e.target_handle() == Some(handle));

    match (is_source, is_target) {
        (true, true) => NodeKind::Default,
        (true, false) => NodeKind::Input,
        (false, true) => NodeKind::Output,
        (false, false) => NodeKind::NotConnected,
    }
}

/// View edge for a connection the user just drew
pub fn create_connection_edge(
    connection: &Connection,
    options: &BuildOptions,
    source_type: EntityType,
    target_type: EntityType,
) -> GraphEdge {
    let render = EdgeRenderKind::for_mode(options.edit_mode);

    match (&connection.source_handle, &connection.target_handle) {
        (Some(source_handle), Some(target_handle)) => GraphEdge::Column(ColumnEdge {
            id: GraphEdge::column_edge_id(
                source_handle,
                target_handle,
                &connection.source,
                &connection.target,
            ),
            source: connection.source.clone(),
            target: connection.target.clone(),
            source_handle: source_handle.clone(),
            target_handle: target_handle.clone(),
            render,
            function: None,
            edge: None,
        }),
        _ => GraphEdge::Entity(EntityEdge {
            id: GraphEdge::entity_edge_id(&connection.source, &connection.target),
            source: connection.source.clone(),
            target: connection.target.clone(),
            render,
            animated: false,
            label: None,
            pipeline: None,
            source_type: Some(source_type),
            target_type: Some(target_type),
            edge: None,
        }),
    }
}

/// Keeps the first item for every id
pub fn unique_by_id<T, F>(items: Vec<T>, id: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(id(item).to_string()))
        .collect()
}

/// Splits edges into entity edges and column edges
pub fn classify_edges(edges: &[GraphEdge]) -> (Vec<&GraphEdge>, Vec<&GraphEdge>) {
    edges.iter().partition(|e| !e.is_column_edge())
}

/// Nodes reachable from the focal entity in one hop of the document's edge lists
pub fn connected_nodes(lineage: &EntityLineage) -> Vec<&EntityReference> {
    lineage
        .nodes
        .iter()
        .filter(|n| {
            lineage.downstream_edges.iter().any(|d| d.to_entity == n.id)
                || lineage.upstream_edges.iter().any(|u| u.from_entity == n.id)
        })
        .collect()
}
