//! Tiered auto-layout for flow graphs.
//!
//! The layout engine is a pure function: given the graph and a direction it
//! returns a new node list with only positions changed. Nodes are ranked
//! into tiers by their longest-path distance from the start step, then laid
//! out on a grid with one axis per tier and the other per row within the
//! tier.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::constants::{ROW_SPACING, TIER_SPACING};
use crate::types::{FlowGraph, StepKind, StepNode};

/// Requested orientation for auto-arrange.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutDirection {
    /// Tiers advance along X, rows stack along Y.
    Horizontal,
    /// Tiers advance along Y, rows stack along X.
    Vertical,
    /// Pick whichever axis suits the graph's shape.
    Auto,
}

/// Computes fresh positions for every node in the graph.
///
/// Ids, kinds, and attribute bags are untouched; only positions change.
/// Never fails: an empty graph yields an empty list and cyclic graphs
/// terminate because tier refinement is bounded by the node count.
pub fn layout(graph: &FlowGraph, direction: LayoutDirection) -> Vec<StepNode> {
    if graph.nodes.is_empty() {
        return Vec::new();
    }

    let tiers = assign_tiers(graph);

    // Group node indices by tier, insertion order within each bucket.
    let tier_count = tiers.iter().copied().max().unwrap_or(0) + 1;
    let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); tier_count];
    for (index, tier) in tiers.iter().enumerate() {
        buckets[*tier].push(index);
    }

    let resolved = match direction {
        LayoutDirection::Auto => {
            let widest = buckets.iter().map(Vec::len).max().unwrap_or(0);
            // Wide-and-shallow graphs read better stacked vertically; deep
            // ones flow left to right.
            if tier_count >= widest {
                LayoutDirection::Horizontal
            } else {
                LayoutDirection::Vertical
            }
        }
        other => other,
    };

    // Order rows within a tier by the node's existing cross-axis position
    // so repeated arranges don't shuffle siblings around. The sort is
    // stable, so equal positions fall back to insertion order.
    let cross_axis = |index: usize| {
        let (x, y) = graph.nodes[index].position;
        match resolved {
            LayoutDirection::Horizontal => y,
            _ => x,
        }
    };
    for bucket in &mut buckets {
        bucket.sort_by(|&a, &b| cross_axis(a).total_cmp(&cross_axis(b)));
    }

    let mut result = graph.nodes.clone();
    for (tier, bucket) in buckets.iter().enumerate() {
        // Rows sit symmetrically around the cross-axis origin so tiers of
        // different widths stay visually aligned on their shared center.
        let half_span = (bucket.len() as f32 - 1.0) / 2.0;
        for (row, &index) in bucket.iter().enumerate() {
            let depth = tier as f32 * TIER_SPACING;
            let breadth = (row as f32 - half_span) * ROW_SPACING;
            result[index].position = match resolved {
                LayoutDirection::Horizontal => (depth, breadth),
                _ => (breadth, depth),
            };
        }
    }
    result
}

/// Assigns each node a tier: its longest-path distance in edge hops from a
/// root.
///
/// Roots are the start-typed nodes, or every node without incoming
/// connections when no start exists. Nodes unreachable from any root stay
/// in tier 0 alongside the roots. Tiers are refined upward by repeated
/// edge relaxation; no tier may exceed the longest possible acyclic path
/// (node count minus one), so cycles cannot push tiers past the graph.
fn assign_tiers(graph: &FlowGraph) -> Vec<usize> {
    let node_count = graph.nodes.len();
    let index_of = |id: &str| graph.nodes.iter().position(|n| n.id == id);

    let mut roots: Vec<usize> = graph
        .nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.kind == StepKind::Start)
        .map(|(i, _)| i)
        .collect();
    if roots.is_empty() {
        let targets: HashSet<&str> = graph
            .connections
            .iter()
            .map(|c| c.target.as_str())
            .collect();
        roots = graph
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| !targets.contains(n.id.as_str()))
            .map(|(i, _)| i)
            .collect();
    }

    // Reachability guard: only edges leaving a reachable node participate
    // in relaxation, so stranded subgraphs stay pinned at tier 0.
    let mut reachable = vec![false; node_count];
    let mut stack = roots.clone();
    while let Some(index) = stack.pop() {
        if reachable[index] {
            continue;
        }
        reachable[index] = true;
        for connection in &graph.connections {
            if connection.source == graph.nodes[index].id {
                if let Some(target) = index_of(&connection.target) {
                    stack.push(target);
                }
            }
        }
    }

    let mut tiers = vec![0usize; node_count];
    let max_tier = node_count.saturating_sub(1);
    for _ in 0..node_count {
        let mut changed = false;
        for connection in &graph.connections {
            let (Some(source), Some(target)) =
                (index_of(&connection.source), index_of(&connection.target))
            else {
                continue;
            };
            if !reachable[source] {
                continue;
            }
            let proposed = tiers[source] + 1;
            if proposed <= max_tier && tiers[target] < proposed {
                tiers[target] = proposed;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    tiers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FlowGraph;

    fn diamond() -> FlowGraph {
        // start -> ocr -> end
        //       -> biometric -> ocr
        // ocr is fed by two predecessors at different depths.
        let mut graph = FlowGraph::new();
        let start = graph.add_node(StepKind::Start, (0.0, 0.0));
        let ocr = graph.add_node(StepKind::DocumentOcr, (50.0, 0.0));
        let bio = graph.add_node(StepKind::Biometric, (50.0, 100.0));
        let end = graph.add_node(StepKind::End, (100.0, 0.0));
        graph.add_connection(&start, &ocr);
        graph.add_connection(&start, &bio);
        graph.add_connection(&bio, &ocr);
        graph.add_connection(&ocr, &end);
        graph
    }

    fn position_of<'a>(nodes: &'a [StepNode], id: &str) -> (f32, f32) {
        nodes.iter().find(|n| n.id == id).unwrap().position
    }

    #[test]
    fn empty_graph_lays_out_to_nothing() {
        assert!(layout(&FlowGraph::new(), LayoutDirection::Horizontal).is_empty());
    }

    #[test]
    fn multi_predecessor_node_lands_after_all_of_them() {
        let graph = diamond();
        let nodes = layout(&graph, LayoutDirection::Horizontal);

        let start_x = position_of(&nodes, "start-1").0;
        let bio_x = position_of(&nodes, "biometric-1").0;
        let ocr_x = position_of(&nodes, "ocr-1").0;
        let end_x = position_of(&nodes, "end-1").0;

        // Longest-path ranking: ocr sits after biometric, not beside it.
        assert!(bio_x > start_x);
        assert!(ocr_x > bio_x);
        assert!(end_x > ocr_x);
        assert_eq!(ocr_x, 2.0 * TIER_SPACING);
    }

    #[test]
    fn vertical_direction_transposes_axes() {
        let graph = diamond();
        let horizontal = layout(&graph, LayoutDirection::Horizontal);
        let vertical = layout(&graph, LayoutDirection::Vertical);

        for node in &horizontal {
            let (hx, hy) = node.position;
            let (vx, vy) = position_of(&vertical, &node.id);
            assert_eq!((vx, vy), (hy, hx));
        }
    }

    #[test]
    fn layout_is_deterministic_and_idempotent() {
        let graph = diamond();
        let first = layout(&graph, LayoutDirection::Auto);
        assert_eq!(first, layout(&graph, LayoutDirection::Auto));

        // Applying the computed positions and arranging again changes
        // nothing.
        let mut settled = graph.clone();
        settled.nodes = first.clone();
        assert_eq!(layout(&settled, LayoutDirection::Auto), first);
    }

    #[test]
    fn layout_only_touches_positions() {
        let mut graph = diamond();
        graph
            .node_mut("ocr-1")
            .unwrap()
            .data
            .insert("retries".to_string(), serde_json::json!(3));

        let nodes = layout(&graph, LayoutDirection::Horizontal);
        let ocr = nodes.iter().find(|n| n.id == "ocr-1").unwrap();
        assert_eq!(ocr.kind, StepKind::DocumentOcr);
        assert_eq!(ocr.data["retries"], serde_json::json!(3));
        assert_eq!(nodes.len(), graph.nodes.len());
    }

    #[test]
    fn cycles_terminate_with_bounded_tiers() {
        let mut graph = FlowGraph::new();
        let start = graph.add_node(StepKind::Start, (0.0, 0.0));
        let a = graph.add_node(StepKind::Decision, (0.0, 0.0));
        let b = graph.add_node(StepKind::ManualReview, (0.0, 0.0));
        graph.add_connection(&start, &a);
        graph.add_connection(&a, &b);
        graph.add_connection(&b, &a);

        let nodes = layout(&graph, LayoutDirection::Horizontal);
        // The longest acyclic path through n nodes has n - 1 hops, so the
        // cycle must not rank anything past that.
        let bound = (graph.nodes.len() - 1) as f32 * TIER_SPACING;
        for node in &nodes {
            assert!(node.position.0 <= bound, "{} ranked past {}", node.id, bound);
        }
        assert_eq!(position_of(&nodes, "start-1").0, 0.0);
    }

    #[test]
    fn unreachable_nodes_fall_back_to_the_root_tier() {
        let mut graph = FlowGraph::new();
        let start = graph.add_node(StepKind::Start, (0.0, 0.0));
        let a = graph.add_node(StepKind::DocumentOcr, (0.0, 0.0));
        let stray = graph.add_node(StepKind::MessageStep, (500.0, 500.0));
        graph.add_connection(&start, &a);
        let _ = stray;

        let nodes = layout(&graph, LayoutDirection::Horizontal);
        assert_eq!(position_of(&nodes, "message-1").0, 0.0);
    }

    #[test]
    fn auto_prefers_horizontal_for_deep_graphs() {
        // A four-deep chain: tier count 4, widest tier 1.
        let mut graph = FlowGraph::new();
        let start = graph.add_node(StepKind::Start, (0.0, 0.0));
        let a = graph.add_node(StepKind::DocumentOcr, (0.0, 0.0));
        let b = graph.add_node(StepKind::Biometric, (0.0, 0.0));
        let end = graph.add_node(StepKind::End, (0.0, 0.0));
        graph.add_connection(&start, &a);
        graph.add_connection(&a, &b);
        graph.add_connection(&b, &end);

        let nodes = layout(&graph, LayoutDirection::Auto);
        assert_eq!(position_of(&nodes, "end-1"), (3.0 * TIER_SPACING, 0.0));
    }

    #[test]
    fn auto_prefers_vertical_for_wide_graphs() {
        // One start fanning out to three children: tier count 2, widest 3.
        let mut graph = FlowGraph::new();
        let start = graph.add_node(StepKind::Start, (0.0, 0.0));
        for _ in 0..3 {
            let child = graph.add_node(StepKind::MessageStep, (0.0, 0.0));
            graph.add_connection(&start, &child);
        }

        let nodes = layout(&graph, LayoutDirection::Auto);
        // Tiers advance along Y in vertical mode, and the three children
        // straddle the start step's cross-axis position.
        assert_eq!(position_of(&nodes, "message-1").1, TIER_SPACING);
        assert_eq!(position_of(&nodes, "message-1").0, -ROW_SPACING);
        assert_eq!(position_of(&nodes, "message-2").0, 0.0);
        assert_eq!(position_of(&nodes, "message-3").0, ROW_SPACING);
    }

    #[test]
    fn rows_keep_their_relative_order_between_arranges() {
        let mut graph = FlowGraph::new();
        let start = graph.add_node(StepKind::Start, (0.0, 0.0));
        let low = graph.add_node(StepKind::DocumentOcr, (100.0, 400.0));
        let high = graph.add_node(StepKind::Biometric, (100.0, -50.0));
        graph.add_connection(&start, &low);
        graph.add_connection(&start, &high);

        let nodes = layout(&graph, LayoutDirection::Horizontal);
        // biometric-1 already sat above ocr-1, so it keeps row 0.
        assert!(position_of(&nodes, "biometric-1").1 < position_of(&nodes, "ocr-1").1);
    }
}
