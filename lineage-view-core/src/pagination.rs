//! Child map of a lineage document and page-windowed flattening
//!
//! [`build_child_map`] arranges the document into a tree around the focal entity:
//! `children` hang off downstream edges, `parents` off upstream edges. A single visited
//! set spans both walks, so an entity appears at most once in the whole tree.
//!
//! [`flatten_to_page`] turns one side of that tree back into a node list, revealing at
//! most `page_size` children per node starting at the offset recorded in
//! [`PaginationState`]. Children past the window are represented by one LOAD_MORE
//! placeholder whose [`LoadMoreData`] tells the caller where the next window starts.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::errors::{LineageError, LineageResult};
use crate::model::{Direction, EntityLineage, EntityReference, LineageEdge, LoadMoreData};

/// Page size used when nothing else is configured
pub const MAX_LINEAGE_LENGTH: usize = 20;

/// Entity with its place in the child map
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntityReferenceChild {
    #[serde(flatten)]
    pub entity: EntityReference,
    /// Position among the siblings emitted under the same parent
    pub page_index: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<EntityReferenceChild>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<EntityReferenceChild>,
}

impl EntityReferenceChild {
    pub fn id(&self) -> &str {
        &self.entity.id
    }

    /// Subtree on the given side
    pub fn branch(&self, direction: Direction) -> &[EntityReferenceChild] {
        match direction {
            Direction::Downstream => &self.children,
            Direction::Upstream => &self.parents,
        }
    }
}

/// Removes structurally identical edges, keeping the first occurrence.
///
/// Edges sharing endpoints but carrying different details are kept apart.
pub fn remove_duplicates(edges: &[LineageEdge]) -> Vec<LineageEdge> {
    let mut unique: Vec<LineageEdge> = Vec::with_capacity(edges.len());
    for edge in edges {
        if !unique.contains(edge) {
            unique.push(edge.clone());
        }
    }
    unique
}

pub fn build_child_map(lineage: &EntityLineage) -> EntityReferenceChild {
    let downstream = remove_duplicates(&lineage.downstream_edges);
    let upstream = remove_duplicates(&lineage.upstream_edges);

    let mut visited = HashSet::from([lineage.entity.id.clone()]);
    let children = walk_branch(
        &lineage.nodes,
        &downstream,
        &lineage.entity.id,
        Direction::Downstream,
        &mut visited,
    );
    let parents = walk_branch(
        &lineage.nodes,
        &upstream,
        &lineage.entity.id,
        Direction::Upstream,
        &mut visited,
    );

    EntityReferenceChild {
        entity: lineage.entity.clone(),
        page_index: 0,
        children,
        parents,
    }
}

struct Frame<'a> {
    entity: Option<&'a EntityReference>,
    page_index: usize,
    edges: Vec<&'a LineageEdge>,
    cursor: usize,
    built: Vec<EntityReferenceChild>,
}

/// Depth-first walk of one side, in edge order, without recursion
fn walk_branch<'a>(
    nodes: &'a [EntityReference],
    edges: &'a [LineageEdge],
    root_id: &str,
    direction: Direction,
    visited: &mut HashSet<String>,
) -> Vec<EntityReferenceChild> {
    let edges_from = |id: &str| -> Vec<&'a LineageEdge> {
        edges
            .iter()
            .filter(|e| match direction {
                Direction::Downstream => e.from_entity == id,
                Direction::Upstream => e.to_entity == id,
            })
            .collect()
    };

    let mut stack = vec![Frame {
        entity: None,
        page_index: 0,
        edges: edges_from(root_id),
        cursor: 0,
        built: Vec::new(),
    }];

    while let Some(frame) = stack.last_mut() {
        if frame.cursor < frame.edges.len() {
            let edge = frame.edges[frame.cursor];
            frame.cursor += 1;

            let far = match direction {
                Direction::Downstream => &edge.to_entity,
                Direction::Upstream => &edge.from_entity,
            };
            let Some(node) = nodes.iter().find(|n| &n.id == far) else {
                continue;
            };
            if !visited.insert(node.id.clone()) {
                continue;
            }

            let page_index = frame.built.len();
            stack.push(Frame {
                entity: Some(node),
                page_index,
                edges: edges_from(&node.id),
                cursor: 0,
                built: Vec::new(),
            });
            continue;
        }

        let Some(done) = stack.pop() else { break };
        let Some(entity) = done.entity else {
            return done.built;
        };
        let (children, parents) = match direction {
            Direction::Downstream => (done.built, Vec::new()),
            Direction::Upstream => (Vec::new(), done.built),
        };
        if let Some(parent) = stack.last_mut() {
            parent.built.push(EntityReferenceChild {
                entity: entity.clone(),
                page_index: done.page_index,
                children,
                parents,
            });
        }
    }

    Vec::new()
}

/// Offsets recorded for one node, per side
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeIndexMap {
    #[serde(default)]
    pub upstream: Vec<usize>,
    #[serde(default)]
    pub downstream: Vec<usize>,
}

/// Caller-owned window offsets, keyed by parent node id
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct PaginationState {
    entries: HashMap<String, NodeIndexMap>,
}

impl PaginationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start of the current window for `parent_id`, 0 when nothing was recorded
    pub fn offset(&self, parent_id: &str, direction: Direction) -> usize {
        self.entries
            .get(parent_id)
            .and_then(|entry| match direction {
                Direction::Upstream => entry.upstream.last(),
                Direction::Downstream => entry.downstream.last(),
            })
            .copied()
            .unwrap_or(0)
    }

    pub fn advance(&mut self, parent_id: &str, direction: Direction, offset: usize) {
        let entry = self.entries.entry(parent_id.to_string()).or_default();
        match direction {
            Direction::Upstream => entry.upstream.push(offset),
            Direction::Downstream => entry.downstream.push(offset),
        }
    }

    /// Moves the window of the placeholder's parent to the first unrevealed child
    pub fn advance_past(&mut self, load_more: &LoadMoreData) {
        self.advance(&load_more.parent_id, load_more.direction, load_more.index);
    }

    pub fn get(&self, parent_id: &str) -> Option<&NodeIndexMap> {
        self.entries.get(parent_id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Id of the placeholder for the window of `parent_id` starting at `start`
pub fn load_more_id(direction: Direction, parent_id: &str, start: usize) -> String {
    format!("loadmore_{}_{}_{}", direction.as_str(), parent_id, start)
}

/// Flattens one side of the child map into revealed nodes and placeholder edges.
///
/// Only placeholder edges are produced. Edges between revealed entities come from the
/// source document (see [`PaginatedLineage::to_entity_lineage`]).
pub fn flatten_to_page(
    child_map: &EntityReferenceChild,
    direction: Direction,
    state: &PaginationState,
    page_size: usize,
) -> LineageResult<(Vec<EntityReference>, Vec<LineageEdge>)> {
    if page_size == 0 {
        return Err(LineageError::Validation(
            "Page size must be greater than zero".to_string(),
        ));
    }

    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    let mut stack = vec![child_map];

    while let Some(item) = stack.pop() {
        let branch = item.branch(direction);
        if branch.is_empty() {
            continue;
        }

        let parent_id = item.id();
        let start = state.offset(parent_id, direction).min(branch.len());
        let end = (start + page_size).min(branch.len());
        let window = &branch[start..end];

        nodes.extend(window.iter().map(|child| child.entity.clone()));
        stack.extend(window.iter().rev());

        if branch.len() > start + page_size {
            let id = load_more_id(direction, parent_id, start);
            let remaining = branch.len() - end;
            debug!(
                "Revealed {} of {} {} children of {}, {} behind {}",
                window.len(),
                branch.len(),
                direction.as_str(),
                parent_id,
                remaining,
                id
            );

            edges.push(match direction {
                Direction::Downstream => LineageEdge::new(parent_id, id.as_str()),
                Direction::Upstream => LineageEdge::new(id.as_str(), parent_id),
            });
            nodes.push(EntityReference::load_more(
                id,
                LoadMoreData {
                    index: end,
                    parent_id: parent_id.to_string(),
                    children_length: remaining,
                    direction,
                },
            ));
        }
    }

    Ok((nodes, edges))
}

/// Revealed slice of a lineage document
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PaginatedLineage {
    /// Focal entity first, then downstream and upstream reveals
    pub nodes: Vec<EntityReference>,
    /// Placeholder edges only
    pub edges: Vec<LineageEdge>,
}

impl PaginatedLineage {
    /// Lineage document restricted to the revealed nodes.
    ///
    /// Source edges are kept whole; [`crate::builder::build_graph`] drops the ones
    /// reaching unrevealed entities. Placeholder edges are filed on the side their
    /// placeholder belongs to.
    pub fn to_entity_lineage(&self, source: &EntityLineage) -> EntityLineage {
        let upstream_placeholders: HashSet<&str> = self
            .nodes
            .iter()
            .filter(|n| {
                n.pagination_data
                    .as_ref()
                    .is_some_and(|p| p.direction == Direction::Upstream)
            })
            .map(|n| n.id.as_str())
            .collect();

        let mut lineage = EntityLineage::new(source.entity.clone());
        lineage.nodes = self
            .nodes
            .iter()
            .filter(|n| n.id != source.entity.id)
            .cloned()
            .collect();
        lineage.upstream_edges = source.upstream_edges.clone();
        lineage.downstream_edges = source.downstream_edges.clone();

        for edge in &self.edges {
            if upstream_placeholders.contains(edge.from_entity.as_str()) {
                lineage.upstream_edges.push(edge.clone());
            } else {
                lineage.downstream_edges.push(edge.clone());
            }
        }
        lineage
    }

    /// Accumulates a later window into this one.
    ///
    /// Nodes keep their first occurrence by id. Placeholders whose window has been
    /// revealed (their parent advanced past them) are dropped along with their edges.
    pub fn merge(&mut self, next: PaginatedLineage, state: &PaginationState) {
        let stale = |node: &EntityReference| {
            node.pagination_data
                .as_ref()
                .is_some_and(|p| state.offset(&p.parent_id, p.direction) >= p.index)
        };
        let stale_ids: HashSet<String> = self
            .nodes
            .iter()
            .filter(|n| stale(n))
            .map(|n| n.id.clone())
            .collect();

        self.nodes.retain(|n| !stale_ids.contains(&n.id));
        self.edges
            .retain(|e| !stale_ids.contains(&e.from_entity) && !stale_ids.contains(&e.to_entity));

        let mut seen: HashSet<String> = self.nodes.iter().map(|n| n.id.clone()).collect();
        self.nodes
            .extend(next.nodes.into_iter().filter(|n| seen.insert(n.id.clone())));
        for edge in next.edges {
            if !self.edges.contains(&edge) {
                self.edges.push(edge);
            }
        }
    }
}

/// Focal entity followed by the revealed windows of both sides
pub fn paginate(
    lineage: &EntityLineage,
    child_map: &EntityReferenceChild,
    state: &PaginationState,
    page_size: usize,
) -> LineageResult<PaginatedLineage> {
    let mut page = PaginatedLineage {
        nodes: vec![lineage.entity.clone()],
        edges: Vec::new(),
    };

    for direction in [Direction::Downstream, Direction::Upstream] {
        let (nodes, edges) = flatten_to_page(child_map, direction, state, page_size)?;
        page.nodes.extend(nodes);
        page.edges.extend(edges);
    }

    Ok(page)
}

impl PaginatedLineage {
    /// Reveals the window behind a LOAD_MORE placeholder and merges it into this page.
    ///
    /// Only the placeholder's parent is flattened again, so windows opened under
    /// children of earlier pages are reachable. `state` is advanced only on success.
    pub fn reveal_more(
        &mut self,
        child_map: &EntityReferenceChild,
        load_more: &LoadMoreData,
        state: &mut PaginationState,
        page_size: usize,
    ) -> LineageResult<()> {
        let parent = if child_map.id() == load_more.parent_id {
            child_map
        } else {
            find_node_path(&load_more.parent_id, child_map.branch(load_more.direction))
                .and_then(|path| path.last().copied())
                .ok_or_else(|| LineageError::NodeNotFound(load_more.parent_id.clone()))?
        };

        let mut advanced = state.clone();
        advanced.advance_past(load_more);
        let (nodes, edges) = flatten_to_page(parent, load_more.direction, &advanced, page_size)?;

        self.merge(PaginatedLineage { nodes, edges }, &advanced);
        *state = advanced;
        Ok(())
    }
}

/// Everything revealed so far together with the offsets that revealed it
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PageSession {
    pub state: PaginationState,
    pub page: PaginatedLineage,
}

impl PageSession {
    /// First page of both sides
    pub fn start(
        lineage: &EntityLineage,
        child_map: &EntityReferenceChild,
        page_size: usize,
    ) -> LineageResult<Self> {
        let state = PaginationState::new();
        let page = paginate(lineage, child_map, &state, page_size)?;
        Ok(Self { state, page })
    }

    /// Expands the placeholder with id `placeholder_id`, keeping earlier windows
    pub fn load_more(
        &mut self,
        child_map: &EntityReferenceChild,
        placeholder_id: &str,
        page_size: usize,
    ) -> LineageResult<()> {
        let data = self
            .page
            .nodes
            .iter()
            .find(|n| n.id == placeholder_id)
            .and_then(|n| n.pagination_data.clone())
            .ok_or_else(|| LineageError::NodeNotFound(placeholder_id.to_string()))?;
        debug!(
            "Expanding {} children of {} from {}",
            data.direction.as_str(),
            data.parent_id,
            data.index
        );
        self.page
            .reveal_more(child_map, &data, &mut self.state, page_size)
    }
}

/// Chain of entries from a top-level item down to the one with `id`
pub fn find_node_path<'a>(
    id: &str,
    items: &'a [EntityReferenceChild],
) -> Option<Vec<&'a EntityReferenceChild>> {
    let mut stack: Vec<Vec<&'a EntityReferenceChild>> =
        items.iter().rev().map(|item| vec![item]).collect();

    while let Some(path) = stack.pop() {
        let Some(&last) = path.last() else { continue };
        if last.id() == id {
            return Some(path);
        }
        for next in last.children.iter().chain(last.parents.iter()).rev() {
            let mut extended = path.clone();
            extended.push(next);
            stack.push(extended);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityType;

    fn table(id: &str) -> EntityReference {
        EntityReference::new(id, EntityType::Table)
    }

    fn fan_out(parent: &str, count: usize) -> EntityLineage {
        let mut lineage = EntityLineage::new(table(parent));
        for i in 0..count {
            let id = format!("c{:02}", i);
            lineage.nodes.push(table(&id));
            lineage.downstream_edges.push(LineageEdge::new(parent, id));
        }
        lineage
    }

    #[test]
    fn test_remove_duplicates() {
        let edges = vec![LineageEdge::new("A", "B"), LineageEdge::new("A", "B")];
        assert_eq!(remove_duplicates(&edges).len(), 1);

        let detailed = vec![
            LineageEdge::new("A", "B").with_details(crate::model::LineageDetails {
                sql_query: Some("x".to_string()),
                ..Default::default()
            }),
            LineageEdge::new("A", "B").with_details(crate::model::LineageDetails {
                sql_query: Some("y".to_string()),
                ..Default::default()
            }),
        ];
        assert_eq!(remove_duplicates(&detailed).len(), 2);
    }

    #[test]
    fn test_child_map_shares_visited_set() {
        let mut lineage = EntityLineage::new(table("M"));
        lineage.nodes = vec![table("A"), table("B"), table("C")];
        lineage.downstream_edges = vec![
            LineageEdge::new("M", "A"),
            LineageEdge::new("A", "B"),
            LineageEdge::new("M", "B"),
            LineageEdge::new("B", "M"),
        ];
        lineage.upstream_edges = vec![LineageEdge::new("B", "M"), LineageEdge::new("C", "M")];

        let map = build_child_map(&lineage);
        assert_eq!(map.children.len(), 1);
        assert_eq!(map.children[0].id(), "A");
        assert_eq!(map.children[0].children[0].id(), "B");
        // B was already placed downstream
        assert_eq!(map.parents.len(), 1);
        assert_eq!(map.parents[0].id(), "C");
        assert_eq!(map.parents[0].page_index, 0);
    }

    #[test]
    fn test_child_map_ignores_unknown_nodes() {
        let mut lineage = EntityLineage::new(table("M"));
        lineage.nodes = vec![table("A")];
        lineage.downstream_edges = vec![LineageEdge::new("M", "ghost"), LineageEdge::new("M", "A")];
        let map = build_child_map(&lineage);
        assert_eq!(map.children.len(), 1);
        assert_eq!(map.children[0].page_index, 0);
    }

    #[test]
    fn test_first_page_has_load_more() {
        let lineage = fan_out("P", 25);
        let map = build_child_map(&lineage);
        let (nodes, edges) =
            flatten_to_page(&map, Direction::Downstream, &PaginationState::new(), 10).unwrap();

        let real: Vec<_> = nodes.iter().filter(|n| !n.is_load_more()).collect();
        assert_eq!(real.len(), 10);
        let placeholder = nodes.iter().find(|n| n.is_load_more()).unwrap();
        assert_eq!(
            placeholder.pagination_data,
            Some(LoadMoreData {
                index: 10,
                parent_id: "P".to_string(),
                children_length: 15,
                direction: Direction::Downstream,
            })
        );
        assert_eq!(edges, vec![LineageEdge::new("P", "loadmore_downstream_P_0")]);
    }

    #[test]
    fn test_next_window_reveals_new_children() {
        let lineage = fan_out("P", 25);
        let map = build_child_map(&lineage);
        let mut state = PaginationState::new();

        let (first, _) = flatten_to_page(&map, Direction::Downstream, &state, 10).unwrap();
        state.advance("P", Direction::Downstream, 10);
        let (second, _) = flatten_to_page(&map, Direction::Downstream, &state, 10).unwrap();

        let first_ids: HashSet<_> = first.iter().map(|n| n.id.clone()).collect();
        assert!(second
            .iter()
            .filter(|n| !n.is_load_more())
            .all(|n| !first_ids.contains(&n.id)));
        let placeholder = second.iter().find(|n| n.is_load_more()).unwrap();
        assert_eq!(placeholder.id, "loadmore_downstream_P_10");
        assert_eq!(placeholder.pagination_data.as_ref().unwrap().children_length, 5);

        state.advance("P", Direction::Downstream, 20);
        let (last, edges) = flatten_to_page(&map, Direction::Downstream, &state, 10).unwrap();
        assert_eq!(last.len(), 5);
        assert!(edges.is_empty());
    }

    #[test]
    fn test_upstream_placeholder_edge_points_at_parent() {
        let mut lineage = EntityLineage::new(table("P"));
        for i in 0..3 {
            let id = format!("u{}", i);
            lineage.nodes.push(table(&id));
            lineage.upstream_edges.push(LineageEdge::new(id, "P"));
        }
        let map = build_child_map(&lineage);
        let page = paginate(&lineage, &map, &PaginationState::new(), 2).unwrap();
        assert_eq!(page.nodes[0].id, "P");
        assert_eq!(page.edges, vec![LineageEdge::new("loadmore_upstream_P_0", "P")]);

        let view = page.to_entity_lineage(&lineage);
        assert_eq!(view.nodes.len(), 3);
        assert!(view
            .upstream_edges
            .iter()
            .any(|e| e.from_entity == "loadmore_upstream_P_0"));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let lineage = fan_out("P", 1);
        let map = build_child_map(&lineage);
        let err = flatten_to_page(&map, Direction::Downstream, &PaginationState::new(), 0)
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
    }

    #[test]
    fn test_pagination_state_latest_offset_wins() {
        let mut state = PaginationState::new();
        assert_eq!(state.offset("P", Direction::Upstream), 0);
        state.advance("P", Direction::Upstream, 10);
        state.advance("P", Direction::Upstream, 20);
        assert_eq!(state.offset("P", Direction::Upstream), 20);
        assert_eq!(state.offset("P", Direction::Downstream), 0);
        assert_eq!(state.get("P").unwrap().upstream, vec![10, 20]);
    }

    #[test]
    fn test_find_node_path() {
        let mut lineage = EntityLineage::new(table("M"));
        lineage.nodes = vec![table("A"), table("B")];
        lineage.downstream_edges = vec![LineageEdge::new("M", "A"), LineageEdge::new("A", "B")];
        let map = build_child_map(&lineage);

        let path: Vec<&str> = find_node_path("B", std::slice::from_ref(&map))
            .unwrap()
            .iter()
            .map(|c| c.id())
            .collect();
        assert_eq!(path, vec!["M", "A", "B"]);
        assert!(find_node_path("Z", std::slice::from_ref(&map)).is_none());
    }
}
