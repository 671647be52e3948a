pub mod to_dot;
pub mod to_json;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::errors::{LineageError, LineageResult};
use crate::layout::LayoutDirection;
use crate::trace::NodeTrace;
use crate::view::FlowGraph;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Dot,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => f.write_str("json"),
            ExportFormat::Dot => f.write_str("dot"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = LineageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "dot" => Ok(ExportFormat::Dot),
            other => Err(LineageError::Validation(format!(
                "Unknown export format '{}', expected json or dot",
                other
            ))),
        }
    }
}

/// What to highlight when rendering
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExportOptions {
    pub direction: LayoutDirection,
    /// Selected node and its trace; every edge is faded when absent
    pub selection: Option<(String, NodeTrace)>,
    pub include_column_edges: bool,
}

pub fn render(graph: &FlowGraph, format: ExportFormat, options: &ExportOptions) -> LineageResult<String> {
    match format {
        ExportFormat::Json => to_json::render(graph, options),
        ExportFormat::Dot => to_dot::render(graph, options),
    }
}

pub fn write_string_to_file(filename: &str, content: &str) -> anyhow::Result<()> {
    let path = Path::new(filename);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            info!("Creating path: {:?}", parent);
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Shared template plumbing for the text renderers
pub mod renderer {
    use handlebars::{handlebars_helper, no_escape, Handlebars};
    use serde_json::{json, Value};

    use super::ExportOptions;
    use crate::errors::{LineageError, LineageResult};
    use crate::trace::is_traced_edge;
    use crate::view::{edge_style, FlowGraph, GraphEdge};

    const FADED_COLOR: &str = "#9e9e9e";

    pub fn get_handlebars() -> Handlebars<'static> {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(no_escape);

        handlebars_helper!(exists: |v: Value| {
            match v {
                Value::Null => false,
                Value::String(s) => !s.trim().is_empty(),
                _ => true,
            }
        });
        handlebars.register_helper("exists", Box::new(exists));

        handlebars_helper!(stringeq: |s1: String, s2: String| s1.eq(&s2));
        handlebars.register_helper("stringeq", Box::new(stringeq));

        handlebars_helper!(dot_escape: |v: Value| {
            match v {
                Value::String(s) => s.replace('\\', "\\\\").replace('"', "\\\""),
                Value::Null => String::new(),
                other => other.to_string(),
            }
        });
        handlebars.register_helper("dot_escape", Box::new(dot_escape));

        handlebars
    }

    pub fn is_highlighted(edge: &GraphEdge, options: &ExportOptions) -> bool {
        options.selection.as_ref().is_some_and(|(selected, trace)| {
            is_traced_edge(selected, edge, &trace.incomers, &trace.outgoers)
        })
    }

    pub fn create_standard_context(graph: &FlowGraph, options: &ExportOptions) -> Value {
        let graph_name = graph
            .nodes
            .iter()
            .find(|n| n.is_main)
            .map(|n| n.entity.display_label().to_string())
            .unwrap_or_else(|| "lineage".to_string());

        let nodes: Vec<Value> = graph
            .nodes
            .iter()
            .map(|node| {
                json!({
                    "id": node.id,
                    "label": node.entity.display_label(),
                    "kind": node.kind,
                    "type": node.entity.entity_type,
                    "is_main": node.is_main,
                    "x": node.position.x,
                    "y": node.position.y,
                })
            })
            .collect();

        let edges: Vec<Value> = graph
            .edges
            .iter()
            .filter(|e| options.include_column_edges || !e.is_column_edge())
            .map(|edge| {
                let style = edge_style(is_highlighted(edge, options));
                let label = match edge {
                    GraphEdge::Entity(e) => e.label.clone(),
                    GraphEdge::Column(e) => e.function.clone(),
                };
                json!({
                    "id": edge.id(),
                    "source": edge.source(),
                    "target": edge.target(),
                    "column": edge.is_column_edge(),
                    "source_handle": edge.source_handle(),
                    "target_handle": edge.target_handle(),
                    "label": label,
                    "stroke_width": style.stroke_width,
                    "opacity": style.opacity,
                    "color": style.stroke.unwrap_or_else(|| FADED_COLOR.to_string()),
                })
            })
            .collect();

        json!({
            "graph_name": graph_name,
            "direction": options.direction.to_string(),
            "nodes": nodes,
            "edges": edges,
        })
    }

    pub fn render_template(
        graph: &FlowGraph,
        options: &ExportOptions,
        template: &str,
    ) -> LineageResult<String> {
        let handlebars = get_handlebars();
        let context = create_standard_context(graph, options);
        handlebars
            .render_template(template, &context)
            .map_err(|e| LineageError::ExportFailed(e.to_string()))
    }
}
