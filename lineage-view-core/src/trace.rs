//! Transitive tracing of nodes and columns for highlighting
//!
//! Both tracers walk a worklist and record every visited id in a caller supplied set,
//! so cycles terminate and nothing is reported twice. Passing the same set to several
//! calls continues a trace instead of restarting it.

use serde::Serialize;
use std::collections::{HashSet, VecDeque};

use crate::model::{Direction, NodeKey};
use crate::view::{GraphEdge, GraphNode};

/// Nodes connected to a selected node, upstream and downstream
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeTrace {
    pub incomers: Vec<String>,
    pub outgoers: Vec<String>,
}

/// Column handles connected to a selected column
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnTrace {
    pub incoming: Vec<String>,
    pub outgoing: Vec<String>,
    /// The selected column followed by every incoming and outgoing handle
    pub connected: Vec<String>,
}

struct KeyedEdge<'a> {
    source: &'a str,
    target: &'a str,
    source_key: NodeKey,
    target_key: NodeKey,
}

/// Every node reachable from `start` in `direction`.
///
/// One hop follows the edges whose near endpoint is the current node and resolves the
/// far endpoint by its base id, so `id__suffix` references reach node `id`. Nodes of a
/// hop are returned in `nodes` order.
pub fn trace_nodes<'a>(
    start: &GraphNode,
    nodes: &'a [GraphNode],
    edges: &[GraphEdge],
    direction: Direction,
    traced: &mut HashSet<String>,
) -> Vec<&'a GraphNode> {
    let keyed: Vec<KeyedEdge<'_>> = edges
        .iter()
        .map(|e| KeyedEdge {
            source: e.source(),
            target: e.target(),
            source_key: NodeKey::parse(e.source()),
            target_key: NodeKey::parse(e.target()),
        })
        .collect();

    let mut found = Vec::new();
    let mut queue = VecDeque::from([start.id.clone()]);

    while let Some(current) = queue.pop_front() {
        let hop: HashSet<&str> = keyed
            .iter()
            .filter_map(|e| match direction {
                Direction::Upstream if e.target == current => Some(e.source_key.base_id.as_str()),
                Direction::Downstream if e.source == current => Some(e.target_key.base_id.as_str()),
                _ => None,
            })
            .collect();

        for node in nodes.iter().filter(|n| hop.contains(n.id.as_str())) {
            if traced.insert(node.id.clone()) {
                found.push(node);
                queue.push_back(node.id.clone());
            }
        }
    }

    found
}

/// Every column handle reachable from `column` over column edges in `direction`
pub fn trace_column_edges(
    column: &str,
    column_edges: &[GraphEdge],
    direction: Direction,
    traced: &mut HashSet<String>,
) -> Vec<String> {
    if column.is_empty() {
        return Vec::new();
    }

    let mut found = Vec::new();
    let mut queue = VecDeque::from([column.to_string()]);

    while let Some(current) = queue.pop_front() {
        for edge in column_edges {
            let (Some(source), Some(target)) = (edge.source_handle(), edge.target_handle()) else {
                continue;
            };
            let next = match direction {
                Direction::Upstream if target == current => source,
                Direction::Downstream if source == current => target,
                _ => continue,
            };
            if traced.insert(next.to_string()) {
                found.push(next.to_string());
                queue.push_back(next.to_string());
            }
        }
    }

    found
}

pub fn trace_node(selected: &GraphNode, nodes: &[GraphNode], edges: &[GraphEdge]) -> NodeTrace {
    let ids = |direction| {
        trace_nodes(selected, nodes, edges, direction, &mut HashSet::new())
            .into_iter()
            .map(|n| n.id.clone())
            .collect()
    };

    NodeTrace {
        incomers: ids(Direction::Upstream),
        outgoers: ids(Direction::Downstream),
    }
}

pub fn trace_column(column: &str, column_edges: &[GraphEdge]) -> ColumnTrace {
    let incoming =
        trace_column_edges(column, column_edges, Direction::Upstream, &mut HashSet::new());
    let outgoing =
        trace_column_edges(column, column_edges, Direction::Downstream, &mut HashSet::new());

    let mut seen = HashSet::new();
    let connected = std::iter::once(column.to_string())
        .chain(incoming.iter().cloned())
        .chain(outgoing.iter().cloned())
        .filter(|c| !c.is_empty() && seen.insert(c.clone()))
        .collect();

    ColumnTrace {
        incoming,
        outgoing,
        connected,
    }
}

/// Whether an entity edge lies on the traced path through `selected_id`
pub fn is_traced_edge(
    selected_id: &str,
    edge: &GraphEdge,
    incomers: &[String],
    outgoers: &[String],
) -> bool {
    if edge.is_column_edge() {
        return false;
    }
    let contains = |ids: &[String], id: &str| ids.iter().any(|i| i == id);

    let incomer_edge = contains(incomers, edge.source())
        && (contains(incomers, edge.target()) || edge.target() == selected_id);
    let outgoer_edge = contains(outgoers, edge.target())
        && (contains(outgoers, edge.source()) || edge.source() == selected_id);

    incomer_edge || outgoer_edge
}

/// Whether a column edge lies on the traced path through `column`
pub fn is_column_lineage_traced(
    column: &str,
    edge: &GraphEdge,
    incoming: &[String],
    outgoing: &[String],
) -> bool {
    let (Some(source), Some(target)) = (edge.source_handle(), edge.target_handle()) else {
        return false;
    };
    let contains = |ids: &[String], id: &str| ids.iter().any(|i| i == id);

    let incoming_edge = contains(incoming, source) && (contains(incoming, target) || column == target);
    let outgoing_edge = contains(outgoing, target) && (contains(outgoing, source) || column == source);

    incoming_edge || outgoing_edge
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build_graph, BuildOptions};
    use crate::model::{EntityLineage, EntityReference, EntityType, LineageEdge};
    use crate::view::FlowGraph;
    use std::collections::HashMap;

    fn chain() -> FlowGraph {
        let mut lineage = EntityLineage::new(EntityReference::new("B", EntityType::Table));
        lineage.nodes = vec![
            EntityReference::new("A", EntityType::Table),
            EntityReference::new("C", EntityType::Table),
        ];
        lineage.upstream_edges = vec![LineageEdge::new("A", "B")];
        lineage.downstream_edges = vec![LineageEdge::new("B", "C")];
        build_graph(&lineage, &HashMap::new(), &BuildOptions::default())
    }

    #[test]
    fn test_trace_chain_both_ways() {
        let graph = chain();
        let c = graph.node("C").unwrap();
        let incomers: Vec<&str> = trace_nodes(
            c,
            &graph.nodes,
            &graph.edges,
            Direction::Upstream,
            &mut HashSet::new(),
        )
        .iter()
        .map(|n| n.id.as_str())
        .collect();
        assert_eq!(incomers, vec!["B", "A"]);

        let a = graph.node("A").unwrap();
        let trace = trace_node(a, &graph.nodes, &graph.edges);
        assert_eq!(trace.outgoers, vec!["B", "C"]);
        assert!(trace.incomers.is_empty());
    }

    #[test]
    fn test_previously_traced_nodes_are_skipped() {
        let graph = chain();
        let c = graph.node("C").unwrap();
        let mut traced = HashSet::from(["B".to_string()]);
        let found = trace_nodes(c, &graph.nodes, &graph.edges, Direction::Upstream, &mut traced);
        assert!(found.is_empty());
    }

    #[test]
    fn test_is_traced_edge() {
        let graph = chain();
        let trace = trace_node(graph.node("C").unwrap(), &graph.nodes, &graph.edges);
        let a_to_b = graph.edge("edge-A-B").unwrap();
        let b_to_c = graph.edge("edge-B-C").unwrap();
        assert!(is_traced_edge("C", a_to_b, &trace.incomers, &trace.outgoers));
        assert!(is_traced_edge("C", b_to_c, &trace.incomers, &trace.outgoers));
        assert!(!is_traced_edge("A", b_to_c, &[], &[]));
    }

    #[test]
    fn test_empty_column_traces_nothing() {
        let trace = trace_column("", &[]);
        assert!(trace.incoming.is_empty());
        assert!(trace.outgoing.is_empty());
        assert!(trace.connected.is_empty());
    }
}
