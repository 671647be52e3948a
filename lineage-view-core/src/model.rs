//! Lineage documents as served by the catalog API
//!
//! These types mirror the server's JSON (camelCase) so a fetched document can be
//! deserialised without translation. None of them are mutated in place by the view
//! derivation code; edits produce new values (see [`crate::edit`]).

use patterns::node_key_pattern;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of catalog asset
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityType {
    #[serde(rename = "table")]
    Table,
    #[serde(rename = "topic")]
    Topic,
    #[serde(rename = "dashboard")]
    Dashboard,
    #[serde(rename = "pipeline")]
    Pipeline,
    #[serde(rename = "mlmodel")]
    MlModel,
    #[serde(rename = "container")]
    Container,
    #[serde(rename = "dashboardDataModel")]
    DashboardDataModel,
    #[serde(rename = "database")]
    Database,
    #[serde(rename = "databaseSchema")]
    DatabaseSchema,
    /// Synthetic placeholder standing in for children not yet revealed
    #[serde(rename = "load-more")]
    LoadMore,
    #[serde(rename = "other", other)]
    Other,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Table => "table",
            EntityType::Topic => "topic",
            EntityType::Dashboard => "dashboard",
            EntityType::Pipeline => "pipeline",
            EntityType::MlModel => "mlmodel",
            EntityType::Container => "container",
            EntityType::DashboardDataModel => "dashboardDataModel",
            EntityType::Database => "database",
            EntityType::DatabaseSchema => "databaseSchema",
            EntityType::LoadMore => "load-more",
            EntityType::Other => "other",
        }
    }

    /// Name of the route parameter carrying this entity's fully qualified name
    pub fn fqn_param(&self) -> &'static str {
        match self {
            EntityType::Table => "datasetFQN",
            EntityType::Topic => "topicFQN",
            EntityType::Pipeline => "pipelineFQN",
            EntityType::MlModel => "mlModelFqn",
            EntityType::Dashboard => "dashboardFQN",
            EntityType::Database => "databaseFQN",
            EntityType::DatabaseSchema => "databaseSchemaFQN",
            EntityType::DashboardDataModel => "dashboardDataModelFQN",
            _ => "entityFQN",
        }
    }

    /// Route of the entity's lineage tab, empty for kinds that have none
    pub fn lineage_path(&self, fqn: &str) -> String {
        let segment = match self {
            EntityType::Table => "table",
            EntityType::Topic => "topic",
            EntityType::Dashboard => "dashboard",
            EntityType::Pipeline => "pipeline",
            EntityType::MlModel => "mlmodel",
            EntityType::DashboardDataModel => "dashboardDataModel",
            EntityType::Container => "container",
            _ => return String::new(),
        };
        format!("/{}/{}/lineage", segment, fqn)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of travel relative to a node
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Towards sources (incomers)
    Upstream,
    /// Towards consumers (outgoers)
    Downstream,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Upstream => "upstream",
            Direction::Downstream => "downstream",
        }
    }
}

/// Metadata carried by a LOAD_MORE placeholder so the caller can request the next page
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoadMoreData {
    /// Offset of the first child not yet revealed
    pub index: usize,
    pub parent_id: String,
    /// Number of children past the revealed window
    pub children_length: usize,
    pub direction: Direction,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntityReference {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fully_qualified_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination_data: Option<LoadMoreData>,
}

impl EntityReference {
    pub fn new(id: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            id: id.into(),
            entity_type,
            fully_qualified_name: None,
            name: None,
            display_name: None,
            description: None,
            deleted: None,
            pagination_data: None,
        }
    }

    pub fn with_fqn(mut self, fqn: impl Into<String>) -> Self {
        self.fully_qualified_name = Some(fqn.into());
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Placeholder node for children beyond the revealed page window
    pub fn load_more(id: impl Into<String>, data: LoadMoreData) -> Self {
        Self {
            display_name: Some("Load More".to_string()),
            pagination_data: Some(data),
            ..Self::new(id, EntityType::LoadMore)
        }
    }

    pub fn is_load_more(&self) -> bool {
        self.entity_type == EntityType::LoadMore
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.unwrap_or(false)
    }

    /// Human readable label: display name, then name, then FQN, then id
    pub fn display_label(&self) -> &str {
        [&self.display_name, &self.name, &self.fully_qualified_name]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|s| !s.is_empty())
            .unwrap_or(self.id.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fully_qualified_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fully_qualified_name: None,
            data_type: None,
            display_name: None,
        }
    }

    pub fn with_fqn(mut self, fqn: impl Into<String>) -> Self {
        self.fully_qualified_name = Some(fqn.into());
        self
    }

    /// Handle identifier used by column edges
    pub fn key(&self) -> &str {
        self.fully_qualified_name.as_deref().unwrap_or(&self.name)
    }
}

/// Column-level fan-in: every `from_columns` entry feeds `to_column`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ColumnLineage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_column: Option<String>,
    #[serde(default)]
    pub from_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct LineageDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_query: Option<String>,
    #[serde(default)]
    pub columns_lineage: Vec<ColumnLineage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<EntityReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Directed entity-level lineage `from_entity -> to_entity`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineageEdge {
    pub from_entity: String,
    pub to_entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineage_details: Option<LineageDetails>,
}

impl LineageEdge {
    pub fn new(from_entity: impl Into<String>, to_entity: impl Into<String>) -> Self {
        Self {
            from_entity: from_entity.into(),
            to_entity: to_entity.into(),
            lineage_details: None,
        }
    }

    pub fn with_details(mut self, details: LineageDetails) -> Self {
        self.lineage_details = Some(details);
        self
    }

    pub fn connects(&self, from: &str, to: &str) -> bool {
        self.from_entity == from && self.to_entity == to
    }

    pub fn pipeline(&self) -> Option<&EntityReference> {
        self.lineage_details.as_ref().and_then(|d| d.pipeline.as_ref())
    }
}

/// Root lineage document around one focal entity
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntityLineage {
    pub entity: EntityReference,
    #[serde(default)]
    pub nodes: Vec<EntityReference>,
    #[serde(default)]
    pub upstream_edges: Vec<LineageEdge>,
    #[serde(default)]
    pub downstream_edges: Vec<LineageEdge>,
}

impl EntityLineage {
    pub fn new(entity: EntityReference) -> Self {
        Self {
            entity,
            nodes: Vec::new(),
            upstream_edges: Vec::new(),
            downstream_edges: Vec::new(),
        }
    }

    /// Downstream edges followed by upstream edges
    pub fn all_edges(&self) -> impl Iterator<Item = &LineageEdge> {
        self.downstream_edges.iter().chain(self.upstream_edges.iter())
    }

    pub fn find_node(&self, id: &str) -> Option<&EntityReference> {
        if self.entity.id == id {
            return Some(&self.entity);
        }
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Endpoint of an edge in an add-lineage request
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EdgeEndpoint {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntitiesEdge {
    pub from_entity: EdgeEndpoint,
    pub to_entity: EdgeEndpoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineage_details: Option<LineageDetails>,
}

/// Body of the add-lineage endpoint
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AddLineage {
    pub edge: EntitiesEdge,
}

/// Key of the delete-edge endpoint
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EdgeData {
    pub from_entity: EntityType,
    pub from_id: String,
    pub to_entity: EntityType,
    pub to_id: String,
}

/// Node id split into its entity id and an optional `__suffix` disambiguator.
///
/// The first `base__suffix` run of word characters is taken wherever it sits in the id,
/// so characters outside `[\w-]` before it are not part of the base.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub base_id: String,
    pub suffix: Option<String>,
}

impl NodeKey {
    pub fn parse(raw: &str) -> Self {
        match node_key_pattern().captures(raw) {
            Some(caps) => Self {
                base_id: caps[1].to_string(),
                suffix: Some(caps[2].to_string()),
            },
            None => Self {
                base_id: raw.to_string(),
                suffix: None,
            },
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.suffix {
            Some(suffix) => write!(f, "{}__{}", self.base_id, suffix),
            None => f.write_str(&self.base_id),
        }
    }
}

mod patterns {
    use regex::Regex;
    use std::sync::OnceLock;

    pub fn node_key_pattern() -> &'static Regex {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        PATTERN.get_or_init(|| {
            Regex::new(r"([\w\-^]+)__([\w\-]+)").expect("node key pattern is valid")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_serde_names() {
        let json = serde_json::to_string(&EntityType::DashboardDataModel).unwrap();
        assert_eq!(json, "\"dashboardDataModel\"");
        let parsed: EntityType = serde_json::from_str("\"load-more\"").unwrap();
        assert_eq!(parsed, EntityType::LoadMore);
        let unknown: EntityType = serde_json::from_str("\"searchIndex\"").unwrap();
        assert_eq!(unknown, EntityType::Other);
    }

    #[test]
    fn test_lineage_paths() {
        assert_eq!(
            EntityType::Table.lineage_path("svc.db.schema.orders"),
            "/table/svc.db.schema.orders/lineage"
        );
        assert_eq!(EntityType::Database.lineage_path("svc.db"), "");
        assert_eq!(EntityType::MlModel.fqn_param(), "mlModelFqn");
        assert_eq!(EntityType::Container.fqn_param(), "entityFQN");
    }

    #[test]
    fn test_display_label_fallbacks() {
        let entity = EntityReference::new("id-1", EntityType::Table).with_fqn("svc.db.s.t");
        assert_eq!(entity.display_label(), "svc.db.s.t");
        let entity = entity.with_display_name("Orders");
        assert_eq!(entity.display_label(), "Orders");
        assert_eq!(
            EntityReference::new("id-2", EntityType::Topic).display_label(),
            "id-2"
        );
    }

    #[test]
    fn test_lineage_document_deserialises_camel_case() {
        let doc = r#"{
            "entity": {"id": "t1", "type": "table", "fullyQualifiedName": "svc.db.s.t1"},
            "nodes": [{"id": "t2", "type": "table"}],
            "downstreamEdges": [{
                "fromEntity": "t1",
                "toEntity": "t2",
                "lineageDetails": {
                    "sqlQuery": "insert into t2 select * from t1",
                    "columnsLineage": [{"toColumn": "t2.a", "fromColumns": ["t1.a"]}]
                }
            }]
        }"#;
        let lineage: EntityLineage = serde_json::from_str(doc).unwrap();
        assert_eq!(lineage.nodes.len(), 1);
        assert!(lineage.upstream_edges.is_empty());
        let details = lineage.downstream_edges[0].lineage_details.as_ref().unwrap();
        assert_eq!(details.columns_lineage[0].from_columns, vec!["t1.a"]);
    }

    #[test]
    fn test_node_key_parsing() {
        let key = NodeKey::parse("3f2c-aa__copy-1");
        assert_eq!(key.base_id, "3f2c-aa");
        assert_eq!(key.suffix.as_deref(), Some("copy-1"));
        assert_eq!(key.to_string(), "3f2c-aa__copy-1");

        let plain = NodeKey::parse("3f2c-aa");
        assert_eq!(plain.base_id, "3f2c-aa");
        assert!(plain.suffix.is_none());
    }

    #[test]
    fn test_node_key_keeps_greedy_base() {
        let key = NodeKey::parse("a__b__c");
        assert_eq!(key.base_id, "a__b");
        assert_eq!(key.suffix.as_deref(), Some("c"));
    }

    #[test]
    fn test_node_key_takes_first_word_run() {
        let key = NodeKey::parse("svc.db__x");
        assert_eq!(key.base_id, "db");
        assert_eq!(key.suffix.as_deref(), Some("x"));

        let dotted = NodeKey::parse("svc.db");
        assert_eq!(dotted.base_id, "svc.db");
        assert!(dotted.suffix.is_none());
    }
}
