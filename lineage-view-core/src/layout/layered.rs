use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction as EdgeDirection;
use std::collections::{HashMap, HashSet};

use super::{LayoutDirection, LayoutEngine, LayoutGraph, Size};
use crate::view::Position;

/// Sugiyama-style layered layout.
///
/// 1. Cycles are broken by reversing the back edges of a depth-first search.
/// 2. Nodes are ranked by longest path from the sources.
/// 3. Nodes within a rank are ordered by barycenter sweeps.
/// 4. Ranks are spaced `rank_sep` apart along the flow axis, nodes `node_sep` apart
///    across it, each rank centred on the widest one.
#[derive(Clone, Debug, PartialEq)]
pub struct LayeredLayout {
    pub rank_sep: f64,
    pub node_sep: f64,
    pub sweeps: usize,
}

impl Default for LayeredLayout {
    fn default() -> Self {
        Self {
            rank_sep: 50.0,
            node_sep: 50.0,
            sweeps: 4,
        }
    }
}

impl LayoutEngine for LayeredLayout {
    fn compute(&self, graph: &LayoutGraph) -> HashMap<String, Position> {
        let mut dag: DiGraph<usize, ()> = DiGraph::new();
        let mut index: HashMap<&str, NodeIndex> = HashMap::new();
        for (i, (id, _)) in graph.nodes.iter().enumerate() {
            if !index.contains_key(id.as_str()) {
                index.insert(id.as_str(), dag.add_node(i));
            }
        }
        if dag.node_count() == 0 {
            return HashMap::new();
        }

        let mut pairs = Vec::new();
        let mut seen = HashSet::new();
        for (source, target) in &graph.edges {
            if let (Some(&a), Some(&b)) = (index.get(source.as_str()), index.get(target.as_str())) {
                if a != b && seen.insert((a, b)) {
                    pairs.push((a, b));
                }
            }
        }

        let mut cyclic = dag.clone();
        for &(a, b) in &pairs {
            cyclic.add_edge(a, b, ());
        }
        let back = back_edges(&cyclic);

        let mut added = HashSet::new();
        for &(a, b) in &pairs {
            let (from, to) = if back.contains(&(a, b)) { (b, a) } else { (a, b) };
            if added.insert((from, to)) {
                dag.add_edge(from, to, ());
            }
        }

        let ranks = longest_path_ranks(&dag);
        let layers = self.order_layers(&dag, &ranks);
        self.assign_coordinates(graph, &dag, &layers)
    }
}

impl LayeredLayout {
    fn order_layers(&self, dag: &DiGraph<usize, ()>, ranks: &[usize]) -> Vec<Vec<NodeIndex>> {
        let max_rank = ranks.iter().copied().max().unwrap_or(0);
        let mut layers: Vec<Vec<NodeIndex>> = vec![Vec::new(); max_rank + 1];
        for node in dag.node_indices() {
            layers[ranks[node.index()]].push(node);
        }

        let mut position: Vec<f64> = vec![0.0; dag.node_count()];
        let record = |layers: &[Vec<NodeIndex>], position: &mut Vec<f64>| {
            for layer in layers {
                for (i, node) in layer.iter().enumerate() {
                    position[node.index()] = i as f64;
                }
            }
        };
        record(&layers, &mut position);

        for _ in 0..self.sweeps {
            for li in 1..layers.len() {
                sort_by_barycenter(dag, &mut layers[li], &position, EdgeDirection::Incoming);
                record(&layers, &mut position);
            }
            for li in (0..layers.len().saturating_sub(1)).rev() {
                sort_by_barycenter(dag, &mut layers[li], &position, EdgeDirection::Outgoing);
                record(&layers, &mut position);
            }
        }

        layers
    }

    fn assign_coordinates(
        &self,
        graph: &LayoutGraph,
        dag: &DiGraph<usize, ()>,
        layers: &[Vec<NodeIndex>],
    ) -> HashMap<String, Position> {
        let horizontal = graph.direction == LayoutDirection::LeftRight;
        let size_of = |node: NodeIndex| -> Size { graph.nodes[dag[node]].1 };
        // (extent along the flow axis, extent across it)
        let extents = |node: NodeIndex| -> (f64, f64) {
            let size = size_of(node);
            if horizontal {
                (size.width, size.height)
            } else {
                (size.height, size.width)
            }
        };

        let rank_depth: Vec<f64> = layers
            .iter()
            .map(|layer| layer.iter().map(|&n| extents(n).0).fold(0.0, f64::max))
            .collect();
        let rank_breadth: Vec<f64> = layers
            .iter()
            .map(|layer| {
                let total: f64 = layer.iter().map(|&n| extents(n).1).sum();
                total + self.node_sep * layer.len().saturating_sub(1) as f64
            })
            .collect();
        let widest = rank_breadth.iter().copied().fold(0.0, f64::max);

        let mut positions = HashMap::new();
        let mut flow = 0.0;
        for (li, layer) in layers.iter().enumerate() {
            if li > 0 {
                flow += rank_depth[li - 1] / 2.0 + self.rank_sep + rank_depth[li] / 2.0;
            } else {
                flow = rank_depth[0] / 2.0;
            }

            let mut across = (widest - rank_breadth[li]) / 2.0;
            for &node in layer {
                let breadth = extents(node).1;
                let centre = across + breadth / 2.0;
                let position = if horizontal {
                    Position::new(flow, centre)
                } else {
                    Position::new(centre, flow)
                };
                positions.insert(graph.nodes[dag[node]].0.clone(), position);
                across += breadth + self.node_sep;
            }
        }

        positions
    }
}

/// Edges closing a cycle in a depth-first walk (iterative, visits nodes in index order)
fn back_edges(graph: &DiGraph<usize, ()>) -> HashSet<(NodeIndex, NodeIndex)> {
    const NEW: u8 = 0;
    const ACTIVE: u8 = 1;
    const DONE: u8 = 2;

    let successors = |node: NodeIndex| -> Vec<NodeIndex> {
        let mut next: Vec<NodeIndex> = graph.neighbors(node).collect();
        next.sort();
        next
    };

    let mut state = vec![NEW; graph.node_count()];
    let mut back = HashSet::new();

    for start in graph.node_indices() {
        if state[start.index()] != NEW {
            continue;
        }
        state[start.index()] = ACTIVE;
        let mut stack = vec![(start, successors(start), 0usize)];

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            if frame.2 < frame.1.len() {
                let next = frame.1[frame.2];
                frame.2 += 1;
                match state[next.index()] {
                    NEW => {
                        state[next.index()] = ACTIVE;
                        stack.push((next, successors(next), 0));
                    }
                    ACTIVE => {
                        back.insert((node, next));
                    }
                    _ => {}
                }
            } else {
                state[node.index()] = DONE;
                stack.pop();
            }
        }
    }

    back
}

fn longest_path_ranks(dag: &DiGraph<usize, ()>) -> Vec<usize> {
    let order = toposort(dag, None).unwrap_or_else(|_| dag.node_indices().collect());
    let mut ranks = vec![0usize; dag.node_count()];
    for node in order {
        let rank = ranks[node.index()];
        for succ in dag.neighbors(node) {
            if ranks[succ.index()] <= rank {
                ranks[succ.index()] = rank + 1;
            }
        }
    }
    ranks
}

fn sort_by_barycenter(
    dag: &DiGraph<usize, ()>,
    layer: &mut [NodeIndex],
    position: &[f64],
    side: EdgeDirection,
) {
    let mut scored: Vec<(NodeIndex, f64)> = layer
        .iter()
        .map(|&node| {
            let neighbours: Vec<f64> = dag
                .neighbors_directed(node, side)
                .map(|n| position[n.index()])
                .collect();
            let score = if neighbours.is_empty() {
                position[node.index()]
            } else {
                neighbours.iter().sum::<f64>() / neighbours.len() as f64
            };
            (node, score)
        })
        .collect();
    scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    for (slot, (node, _)) in layer.iter_mut().zip(scored) {
        *slot = node;
    }
}
