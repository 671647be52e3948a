pub mod builder;
pub mod client;
pub mod config;
pub mod edit;
pub mod errors;
pub mod export;
pub mod fqn;
pub mod layout;
pub mod model;
pub mod notify;
pub mod pagination;
pub mod trace;
pub mod view;

pub use builder::{build_graph, BuildOptions};
pub use config::LineageViewConfig;
pub use layout::{layout_graph, LayeredLayout, LayoutDirection, LayoutEngine};
pub use model::{EntityLineage, EntityReference, EntityType, LineageEdge};
pub use view::{FlowGraph, GraphEdge, GraphNode};
