use lineage_view::builder::{build_graph, BuildOptions};
use lineage_view::layout::{layout_graph, LayeredLayout, LayoutDirection, NodeDimensions};
use lineage_view::model::{Direction, EntityLineage, EntityReference, EntityType, LineageEdge};
use lineage_view::pagination::{
    build_child_map, flatten_to_page, paginate, PageSession, PaginationState, MAX_LINEAGE_LENGTH,
};
use lineage_view::view::NodeKind;
use std::collections::{HashMap, HashSet};

fn table(id: &str) -> EntityReference {
    EntityReference::new(id, EntityType::Table)
}

/// Focal `P` with `downstream` children and `upstream` parents, one grandchild under `d00`
fn wide_lineage(downstream: usize, upstream: usize) -> EntityLineage {
    let mut lineage = EntityLineage::new(table("P"));
    for i in 0..downstream {
        let id = format!("d{:02}", i);
        lineage.nodes.push(table(&id));
        lineage.downstream_edges.push(LineageEdge::new("P", id));
    }
    for i in 0..upstream {
        let id = format!("u{:02}", i);
        lineage.nodes.push(table(&id));
        lineage.upstream_edges.push(LineageEdge::new(id, "P"));
    }
    lineage.nodes.push(table("grandchild"));
    lineage
        .downstream_edges
        .push(LineageEdge::new("d00", "grandchild"));
    lineage
}

#[test]
fn windows_never_exceed_page_size_and_never_repeat() {
    let lineage = wide_lineage(25, 0);
    let map = build_child_map(&lineage);
    let mut state = PaginationState::new();
    let mut revealed: HashSet<String> = HashSet::new();

    loop {
        let (nodes, _) = flatten_to_page(&map, Direction::Downstream, &state, 10).unwrap();
        let direct: Vec<_> = nodes
            .iter()
            .filter(|n| !n.is_load_more() && n.id.starts_with('d'))
            .collect();
        assert!(direct.len() <= 10);
        for node in &direct {
            assert!(revealed.insert(node.id.clone()), "{} revealed twice", node.id);
        }

        match nodes.iter().find_map(|n| n.pagination_data.clone()) {
            Some(data) => state.advance_past(&data),
            None => break,
        }
    }

    assert_eq!(revealed.len(), 25);
}

#[test]
fn paginated_view_has_no_dangling_edges() {
    let lineage = wide_lineage(25, 3);
    let map = build_child_map(&lineage);
    let page = paginate(&lineage, &map, &PaginationState::new(), 10).unwrap();

    assert_eq!(page.nodes[0].id, "P");
    // 10 children, the grandchild under d00, 3 parents, one placeholder
    assert_eq!(page.nodes.len(), 1 + 10 + 1 + 3 + 1);

    let view = page.to_entity_lineage(&lineage);
    let graph = build_graph(&view, &HashMap::new(), &BuildOptions::default());
    let ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    for edge in &graph.edges {
        assert!(ids.contains(edge.source()) && ids.contains(edge.target()));
    }
    // edges to the 15 unrevealed children are pruned
    assert_eq!(graph.dropped_edges, 15);

    let placeholder = graph
        .nodes
        .iter()
        .find(|n| n.kind == NodeKind::LoadMore)
        .unwrap();
    assert!(graph.edge(&format!("edge-P-{}", placeholder.id)).is_some());

    let laid_out = layout_graph(
        graph,
        LayoutDirection::LeftRight,
        &NodeDimensions::default(),
        &LayeredLayout::default(),
    );
    let main = laid_out.node("P").unwrap();
    let child = laid_out.node("d01").unwrap();
    assert!(main.position.x < child.position.x);
}

#[test]
fn merging_windows_replaces_the_clicked_placeholder() {
    let lineage = wide_lineage(25, 0);
    let map = build_child_map(&lineage);
    let mut state = PaginationState::new();

    let mut page = paginate(&lineage, &map, &state, 10).unwrap();
    let clicked = page
        .nodes
        .iter()
        .find_map(|n| n.pagination_data.clone())
        .unwrap();
    state.advance_past(&clicked);

    let next = paginate(&lineage, &map, &state, 10).unwrap();
    page.merge(next, &state);

    let placeholders: Vec<&str> = page
        .nodes
        .iter()
        .filter(|n| n.is_load_more())
        .map(|n| n.id.as_str())
        .collect();
    assert_eq!(placeholders, vec!["loadmore_downstream_P_10"]);
    assert_eq!(page.edges, vec![LineageEdge::new("P", "loadmore_downstream_P_10")]);

    let real: HashSet<&str> = page
        .nodes
        .iter()
        .filter(|n| !n.is_load_more())
        .map(|n| n.id.as_str())
        .collect();
    // focal, 20 children and the grandchild
    assert_eq!(real.len(), 22);
}

#[test]
fn default_page_size_is_twenty() {
    let lineage = wide_lineage(21, 0);
    let map = build_child_map(&lineage);
    let (nodes, edges) = flatten_to_page(
        &map,
        Direction::Downstream,
        &PaginationState::new(),
        MAX_LINEAGE_LENGTH,
    )
    .unwrap();
    assert_eq!(edges.len(), 1);
    let data = nodes.iter().find_map(|n| n.pagination_data.as_ref()).unwrap();
    assert_eq!(data.index, 20);
    assert_eq!(data.children_length, 1);
}

fn placeholder_ids(session: &PageSession) -> Vec<&str> {
    session
        .page
        .nodes
        .iter()
        .filter(|n| n.is_load_more())
        .map(|n| n.id.as_str())
        .collect()
}

#[test]
fn consecutive_load_more_keeps_earlier_windows() {
    let lineage = wide_lineage(25, 0);
    let map = build_child_map(&lineage);
    let mut session = PageSession::start(&lineage, &map, 10).unwrap();
    assert_eq!(placeholder_ids(&session), vec!["loadmore_downstream_P_0"]);

    session
        .load_more(&map, "loadmore_downstream_P_0", 10)
        .unwrap();
    assert_eq!(placeholder_ids(&session), vec!["loadmore_downstream_P_10"]);
    session
        .load_more(&map, "loadmore_downstream_P_10", 10)
        .unwrap();

    let ids: HashSet<&str> = session.page.nodes.iter().map(|n| n.id.as_str()).collect();
    for i in 0..25 {
        assert!(ids.contains(format!("d{:02}", i).as_str()), "d{:02} missing", i);
    }
    assert!(ids.contains("grandchild"));
    assert!(placeholder_ids(&session).is_empty());
    assert!(session.page.edges.is_empty());
    assert_eq!(session.state.get("P").unwrap().downstream, vec![10, 20]);

    let err = session.load_more(&map, "loadmore_downstream_P_10", 10).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn load_more_under_an_earlier_window_reveals_nested_children() {
    let mut lineage = wide_lineage(25, 0);
    for i in 0..15 {
        let id = format!("g{:02}", i);
        lineage.nodes.push(table(&id));
        lineage.downstream_edges.push(LineageEdge::new("d00", id));
    }
    let map = build_child_map(&lineage);
    let mut session = PageSession::start(&lineage, &map, 10).unwrap();
    assert_eq!(
        placeholder_ids(&session),
        vec!["loadmore_downstream_P_0", "loadmore_downstream_d00_0"]
    );

    session
        .load_more(&map, "loadmore_downstream_P_0", 10)
        .unwrap();
    session
        .load_more(&map, "loadmore_downstream_d00_0", 10)
        .unwrap();

    assert_eq!(placeholder_ids(&session), vec!["loadmore_downstream_P_10"]);
    assert_eq!(
        session.page.edges,
        vec![LineageEdge::new("P", "loadmore_downstream_P_10")]
    );
    let real: HashSet<&str> = session
        .page
        .nodes
        .iter()
        .filter(|n| !n.is_load_more())
        .map(|n| n.id.as_str())
        .collect();
    // focal, d00..d19, the grandchild and g00..g14
    assert_eq!(real.len(), 1 + 20 + 1 + 15);
}
