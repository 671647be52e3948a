//! Pure transforms behind lineage editing
//!
//! Every function returns new values; callers swap them into their document once the
//! server has accepted the change (or keep them optimistically and revert on error).

use serde::{Deserialize, Serialize};

use crate::fqn::{self, FqnPart};
use crate::model::{
    AddLineage, EdgeData, EdgeEndpoint, EntitiesEdge, EntityLineage, EntityReference, EntityType,
    LineageDetails, LineageEdge, NodeKey,
};
use crate::notify::Message;
use crate::view::GraphEdge;

/// Side of the focal entity a new connection lands on
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum StreamDirection {
    Upstream,
    Downstream,
    NoStream,
}

/// Endpoints of an edge the user asked to remove
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RemovedEdge {
    pub id: String,
    pub source: EntityReference,
    pub target: EntityReference,
}

/// Removes the `source_handle -> target_handle` pairing from the column lineage.
///
/// An entry left without source columns is dropped. Other entries and every other
/// detail field are kept as they are.
pub fn restrict_column_lineage(
    details: &LineageDetails,
    source_handle: &str,
    target_handle: &str,
) -> LineageDetails {
    let columns_lineage = details
        .columns_lineage
        .iter()
        .filter_map(|entry| {
            if entry.to_column.as_deref() != Some(target_handle) {
                return Some(entry.clone());
            }
            let mut restricted = entry.clone();
            restricted.from_columns.retain(|c| c != source_handle);
            (!restricted.from_columns.is_empty()).then_some(restricted)
        })
        .collect();

    LineageDetails {
        columns_lineage,
        ..details.clone()
    }
}

/// Replaces the details of the `source -> target` edge.
///
/// A pipeline reference in `details` is completed with the name and display name of
/// `pipeline_detail` where it lacks them.
pub fn attach_pipeline(
    edges: &[LineageEdge],
    details: &LineageDetails,
    source: &str,
    target: &str,
    pipeline_detail: Option<&EntityReference>,
) -> Vec<LineageEdge> {
    let mut completed = details.clone();
    if let (Some(pipeline), Some(detail)) = (completed.pipeline.as_mut(), pipeline_detail) {
        if pipeline.name.is_none() {
            pipeline.name = detail.name.clone();
        }
        if pipeline.display_name.is_none() {
            pipeline.display_name = detail.display_name.clone();
        }
    }

    update_edge_details(edges, source, target, Some(completed))
}

/// Details and add-lineage request for a connection (re)drawn between two entities.
///
/// Column lineage and SQL of the previously selected edge carry over; the pipeline is
/// replaced by `pipeline_id` (or cleared).
pub fn new_lineage_connection(
    selected_edge: Option<&LineageEdge>,
    pipeline_id: Option<&str>,
    from: &EdgeEndpoint,
    to: &EdgeEndpoint,
) -> (LineageDetails, AddLineage) {
    let previous = selected_edge
        .and_then(|e| e.lineage_details.clone())
        .unwrap_or_default();

    let details = LineageDetails {
        sql_query: Some(previous.sql_query.clone().unwrap_or_default()),
        pipeline: pipeline_id.map(|id| EntityReference::new(id, EntityType::Pipeline)),
        ..previous
    };

    let request = AddLineage {
        edge: EntitiesEdge {
            from_entity: from.clone(),
            to_entity: to.clone(),
            lineage_details: Some(details.clone()),
        },
    };

    (details, request)
}

pub fn update_edge_details(
    edges: &[LineageEdge],
    source: &str,
    target: &str,
    details: Option<LineageDetails>,
) -> Vec<LineageEdge> {
    edges
        .iter()
        .map(|edge| {
            if edge.connects(source, target) {
                LineageEdge {
                    lineage_details: details.clone(),
                    ..edge.clone()
                }
            } else {
                edge.clone()
            }
        })
        .collect()
}

pub fn find_edge<'a>(edges: &'a [LineageEdge], source: &str, target: &str) -> Option<&'a LineageEdge> {
    edges.iter().find(|e| e.connects(source, target))
}

/// Edges without the one keyed by `edge_data`
pub fn remove_edge(edges: &[LineageEdge], edge_data: &EdgeData) -> Vec<LineageEdge> {
    edges
        .iter()
        .filter(|e| !e.connects(&edge_data.from_id, &edge_data.to_id))
        .cloned()
        .collect()
}

/// Decides which edge list of the focal entity a new `source -> target` connection
/// belongs to. Node ids may carry a `__suffix`; only the base id is compared.
pub fn classify_connection(lineage: &EntityLineage, source: &str, target: &str) -> StreamDirection {
    let main_id = lineage.entity.id.as_str();
    let touches = |edges: &[LineageEdge], endpoint: &str| {
        if endpoint == main_id {
            return false;
        }
        let base = NodeKey::parse(endpoint).base_id;
        edges
            .iter()
            .any(|e| e.from_entity == base || e.to_entity == base)
    };

    let source_upstream = touches(&lineage.upstream_edges, source);
    let target_upstream = touches(&lineage.upstream_edges, target);
    let source_downstream = touches(&lineage.downstream_edges, source);
    let target_downstream = touches(&lineage.downstream_edges, target);

    if source_upstream || target_upstream || NodeKey::parse(target).base_id == main_id {
        StreamDirection::Upstream
    } else if source_downstream
        || target_downstream
        || NodeKey::parse(source).base_id == main_id
    {
        StreamDirection::Downstream
    } else {
        StreamDirection::NoStream
    }
}

/// Resolves both endpoints of a view edge to entities.
///
/// An endpoint missing from `nodes` falls back to `selected`, or to the focal
/// `entity` when nothing is selected.
pub fn removed_edge(
    nodes: &[EntityReference],
    edge: &GraphEdge,
    entity: &EntityReference,
    selected: Option<&EntityReference>,
) -> RemovedEdge {
    let fallback = selected.unwrap_or(entity);
    let resolve = |endpoint: &str| {
        let base = NodeKey::parse(endpoint).base_id;
        nodes
            .iter()
            .find(|n| n.id == base)
            .unwrap_or(fallback)
            .clone()
    };

    RemovedEdge {
        id: edge.id().to_string(),
        source: resolve(edge.source()),
        target: resolve(edge.target()),
    }
}

/// Confirmation asked before removing `edge`
pub fn removal_prompt(removed: &RemovedEdge, edge: &GraphEdge) -> Message {
    let label = |entity: &EntityReference, handle: Option<&str>| -> String {
        if let Some(name) = entity.display_name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        let (name_source, part) = match handle {
            Some(handle) => (handle, FqnPart::Column),
            None => (
                entity.fully_qualified_name.as_deref().unwrap_or_default(),
                FqnPart::Table,
            ),
        };
        if entity.entity_type == EntityType::Table {
            fqn::table_part(name_source, part)
        } else {
            fqn::entity_name(name_source)
        }
    };

    Message::RemoveEdgePrompt {
        source: label(&removed.source, edge.source_handle()),
        target: label(&removed.target, edge.target_handle()),
    }
}
