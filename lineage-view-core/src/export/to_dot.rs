use super::ExportOptions;
use crate::errors::LineageResult;
use crate::view::FlowGraph;

pub fn get_template() -> String {
    include_str!("to_dot.hbs").to_string()
}

pub fn render(graph: &FlowGraph, options: &ExportOptions) -> LineageResult<String> {
    super::renderer::render_template(graph, options, &get_template())
}
