use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use lineage_view::builder::{build_graph, classify_edges, BuildOptions};
use lineage_view::client::{HttpLineageClient, LineageMutations, SessionContext};
use lineage_view::config::LineageViewConfig;
use lineage_view::edit::new_lineage_connection;
use lineage_view::errors::LineageError;
use lineage_view::export::{self, write_string_to_file, ExportFormat, ExportOptions};
use lineage_view::layout::{layout_graph, LayoutDirection};
use lineage_view::model::{Column, EdgeData, EdgeEndpoint, EntityLineage, EntityType};
use lineage_view::notify::TracingNotifier;
use lineage_view::pagination::{
    build_child_map, paginate, PageSession, PaginatedLineage, PaginationState,
};
use lineage_view::trace::{trace_column, trace_node};
use lineage_view::view::GraphEdge;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    /// YAML configuration file
    #[clap(short, long, global = true)]
    config: Option<String>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build, lay out and export the view of a lineage document
    Render {
        /// Lineage document (JSON)
        input: String,
        /// Columns per entity id (JSON object of arrays)
        #[clap(long)]
        columns: Option<String>,
        #[clap(short, long, default_value = "json")]
        format: String,
        #[clap(short, long)]
        output: Option<String>,
        /// LR or TB, overrides the configuration
        #[clap(short, long)]
        direction: Option<String>,
        #[clap(long)]
        edit: bool,
        #[clap(long)]
        expanded: bool,
        /// Reveal only the first page of children on each side
        #[clap(long)]
        paginate: bool,
        /// Highlight the lineage traced through this node
        #[clap(long)]
        select: Option<String>,
        #[clap(long)]
        include_columns: bool,
    },
    /// Print the nodes (or column handles) traced from a selection
    Trace {
        input: String,
        node: String,
        #[clap(long)]
        column: Option<String>,
    },
    /// Print the revealed page of a lineage document
    Page {
        input: String,
        /// Pagination session file (JSON): offsets and everything revealed so far,
        /// created when missing
        #[clap(short, long)]
        state: Option<String>,
        /// Load-more node to expand before printing
        #[clap(short, long)]
        expand: Option<String>,
        #[clap(short, long)]
        output: Option<String>,
    },
    /// Fetch lineage of an entity from the catalog
    Fetch {
        entity_type: String,
        fqn: String,
        #[clap(long)]
        upstream_depth: Option<u32>,
        #[clap(long)]
        downstream_depth: Option<u32>,
        #[clap(short, long)]
        output: Option<String>,
    },
    /// Add a lineage edge through the catalog API
    AddEdge {
        from_type: String,
        from_id: String,
        to_type: String,
        to_id: String,
        #[clap(long)]
        pipeline: Option<String>,
    },
    /// Remove a lineage edge through the catalog API
    RemoveEdge {
        from_type: String,
        from_id: String,
        to_type: String,
        to_id: String,
    },
    /// Write the default configuration
    InitConfig { path: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    let config = match &args.config {
        Some(path) => LineageViewConfig::load(path)
            .with_context(|| format!("Failed to load configuration {}", path))?,
        None => LineageViewConfig::default(),
    };

    match args.command {
        Commands::Render {
            input,
            columns,
            format,
            output,
            direction,
            edit,
            expanded,
            paginate: first_page,
            select,
            include_columns,
        } => {
            let lineage = read_lineage(&input)?;
            let columns: HashMap<String, Vec<Column>> = match columns {
                Some(path) => serde_json::from_str(&std::fs::read_to_string(&path)?)
                    .with_context(|| format!("Invalid columns file {}", path))?,
                None => HashMap::new(),
            };
            let direction: LayoutDirection = match direction {
                Some(d) => d.parse()?,
                None => config.layout.direction,
            };
            let format: ExportFormat = format.parse()?;

            let view_lineage = if first_page {
                page_of(&lineage, &PaginationState::new(), &config)?.to_entity_lineage(&lineage)
            } else {
                lineage
            };

            let options = BuildOptions {
                edit_mode: edit,
                expanded,
            };
            let graph = build_graph(&view_lineage, &columns, &options);
            let graph = layout_graph(
                graph,
                direction,
                &config.layout.dimensions,
                &config.layout.engine(),
            );
            info!("{}", graph.stats());

            let selection = match select {
                Some(id) => {
                    let node = graph
                        .node(&id)
                        .ok_or_else(|| LineageError::NodeNotFound(id.clone()))?;
                    let trace = trace_node(node, &graph.nodes, &graph.edges);
                    Some((id, trace))
                }
                None => None,
            };
            let export_options = ExportOptions {
                direction,
                selection,
                include_column_edges: include_columns,
            };
            let rendered = export::render(&graph, format, &export_options)?;
            emit(output.as_deref(), &rendered)?;
        }
        Commands::Trace {
            input,
            node,
            column,
        } => {
            let lineage = read_lineage(&input)?;
            let graph = build_graph(&lineage, &HashMap::new(), &BuildOptions::default());
            let rendered = match column {
                Some(column) => {
                    let (_, column_edges) = classify_edges(&graph.edges);
                    let column_edges: Vec<GraphEdge> = column_edges.into_iter().cloned().collect();
                    serde_json::to_string_pretty(&trace_column(&column, &column_edges))?
                }
                None => {
                    let selected = graph
                        .node(&node)
                        .ok_or_else(|| LineageError::NodeNotFound(node.clone()))?;
                    serde_json::to_string_pretty(&trace_node(selected, &graph.nodes, &graph.edges))?
                }
            };
            emit(None, &rendered)?;
        }
        Commands::Page {
            input,
            state,
            expand,
            output,
        } => {
            let lineage = read_lineage(&input)?;
            let child_map = build_child_map(&lineage);
            let page_size = config.pagination.page_size;
            let mut session: PageSession = match &state {
                Some(path) if std::path::Path::new(path).exists() => {
                    serde_json::from_str(&std::fs::read_to_string(path)?)
                        .with_context(|| format!("Invalid pagination session {}", path))?
                }
                _ => PageSession::start(&lineage, &child_map, page_size)?,
            };

            if let Some(id) = expand {
                session.load_more(&child_map, &id, page_size)?;
                info!("Revealed {} nodes", session.page.nodes.len());
            }

            if let Some(path) = &state {
                write_string_to_file(path, &serde_json::to_string_pretty(&session)?)?;
            }
            emit(output.as_deref(), &serde_json::to_string_pretty(&session.page)?)?;
        }
        Commands::Fetch {
            entity_type,
            fqn,
            upstream_depth,
            downstream_depth,
            output,
        } => {
            let mutations = LineageMutations::new(http_client(&config)?, TracingNotifier);
            let lineage = mutations
                .fetch_lineage(
                    parse_entity_type(&entity_type)?,
                    &fqn,
                    upstream_depth.unwrap_or(config.api.depth),
                    downstream_depth.unwrap_or(config.api.depth),
                )
                .await?;
            info!(
                "Fetched {} nodes, {} upstream and {} downstream edges",
                lineage.nodes.len(),
                lineage.upstream_edges.len(),
                lineage.downstream_edges.len()
            );
            emit(output.as_deref(), &serde_json::to_string_pretty(&lineage)?)?;
        }
        Commands::AddEdge {
            from_type,
            from_id,
            to_type,
            to_id,
            pipeline,
        } => {
            let from = EdgeEndpoint {
                id: from_id,
                entity_type: parse_entity_type(&from_type)?,
            };
            let to = EdgeEndpoint {
                id: to_id,
                entity_type: parse_entity_type(&to_type)?,
            };
            let (_, request) = new_lineage_connection(None, pipeline.as_deref(), &from, &to);

            let mutations = LineageMutations::new(http_client(&config)?, TracingNotifier);
            mutations.add_lineage_edge(&request).await?;
        }
        Commands::RemoveEdge {
            from_type,
            from_id,
            to_type,
            to_id,
        } => {
            let edge = EdgeData {
                from_entity: parse_entity_type(&from_type)?,
                from_id,
                to_entity: parse_entity_type(&to_type)?,
                to_id,
            };
            let mutations = LineageMutations::new(http_client(&config)?, TracingNotifier);
            mutations.remove_lineage_edge(&edge).await?;
        }
        Commands::InitConfig { path } => {
            info!("Writing default configuration: {}", path);
            write_string_to_file(&path, &LineageViewConfig::default().to_yaml()?)?;
        }
    }

    Ok(())
}

fn read_lineage(path: &str) -> Result<EntityLineage> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read lineage document {}", path))?;
    let lineage = serde_json::from_str(&content)
        .with_context(|| format!("Invalid lineage document {}", path))?;
    Ok(lineage)
}

fn page_of(
    lineage: &EntityLineage,
    state: &PaginationState,
    config: &LineageViewConfig,
) -> Result<PaginatedLineage> {
    let child_map = build_child_map(lineage);
    Ok(paginate(
        lineage,
        &child_map,
        state,
        config.pagination.page_size,
    )?)
}

fn parse_entity_type(value: &str) -> Result<EntityType> {
    let entity_type: EntityType =
        serde_json::from_value(serde_json::Value::String(value.to_string()))?;
    if entity_type == EntityType::Other {
        anyhow::bail!("Unknown entity type '{}'", value);
    }
    Ok(entity_type)
}

fn http_client(config: &LineageViewConfig) -> Result<HttpLineageClient> {
    let mut session = SessionContext::new(&config.api.base_url)?;
    if let Some(token) = &config.api.token {
        session = session.with_token(token);
    }
    Ok(HttpLineageClient::new(session, config.api.timeout())?)
}

fn emit(output: Option<&str>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            info!("Writing {}", path);
            write_string_to_file(path, content)
        }
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!(
            "handlebars=off,reqwest=warn,{}",
            log_level
        )))
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}
