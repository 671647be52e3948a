use serde_json::json;

use super::renderer::is_highlighted;
use super::ExportOptions;
use crate::errors::LineageResult;
use crate::view::{edge_style, FlowGraph};

/// Nodes and edges as the drawing surface consumes them, each edge with its style
pub fn render(graph: &FlowGraph, options: &ExportOptions) -> LineageResult<String> {
    let edges: Vec<_> = graph
        .edges
        .iter()
        .filter(|e| options.include_column_edges || !e.is_column_edge())
        .map(|edge| -> Result<serde_json::Value, serde_json::Error> {
            let mut value = serde_json::to_value(edge)?;
            value["style"] = serde_json::to_value(edge_style(is_highlighted(edge, options)))?;
            Ok(value)
        })
        .collect::<Result<_, _>>()?;

    let res = json!({
        "direction": options.direction,
        "nodes": graph.nodes,
        "edges": edges,
    });
    Ok(serde_json::to_string_pretty(&res)?)
}
