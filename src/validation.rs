//! Structural validation of flow graphs.
//!
//! Validation is a pure pass over the graph producing a list of findings.
//! Findings are reports, not exceptions: the editor surfaces them as
//! non-blocking banners and keeps working no matter what they say. The
//! surrounding page decides whether an invalid flow may be saved or
//! activated; this module only describes what is wrong.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};

use crate::types::{FlowGraph, NodeId, StepKind};

/// The kinds of structural problems the validator reports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FindingKind {
    /// The flow has no terminal step.
    MissingEnd,
    /// One or more steps have no connections at all.
    DisconnectedNodes,
    /// No directed path leads from the start step to any end step.
    NoPathToEnd,
    /// The validator itself failed unexpectedly.
    ValidationError,
}

/// A single structural problem found in the graph.
///
/// Produced fresh on every validation pass and replaced wholesale; findings
/// are never patched in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Finding {
    /// What category of problem this is.
    pub kind: FindingKind,
    /// Short heading for banner display.
    pub title: String,
    /// Human-readable description.
    pub message: String,
    /// The nodes involved, when the problem is attributable to specific
    /// nodes. Empty for graph-wide findings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_ids: Vec<NodeId>,
}

/// Runs every structural rule over the graph and returns the findings.
///
/// Rules run in a fixed order and do not short-circuit, so the output is
/// deterministic for identical input. If rule evaluation panics, the whole
/// pass degrades to a single `ValidationError` finding instead of taking
/// the editor down with it.
pub fn validate(graph: &FlowGraph) -> Vec<Finding> {
    match panic::catch_unwind(AssertUnwindSafe(|| run_rules(graph))) {
        Ok(findings) => findings,
        Err(_) => {
            log::warn!("validation pass panicked; degrading to a generic finding");
            vec![Finding {
                kind: FindingKind::ValidationError,
                title: "Validation failed".to_string(),
                message: "The flow could not be validated. Please review its structure."
                    .to_string(),
                node_ids: Vec::new(),
            }]
        }
    }
}

fn run_rules(graph: &FlowGraph) -> Vec<Finding> {
    let mut findings = Vec::new();

    check_missing_end(graph, &mut findings);
    check_disconnected_nodes(graph, &mut findings);
    check_path_to_end(graph, &mut findings);

    findings
}

/// Rule 1: the flow must contain at least one end step.
fn check_missing_end(graph: &FlowGraph, findings: &mut Vec<Finding>) {
    if graph.nodes.iter().any(|n| n.kind == StepKind::End) {
        return;
    }
    findings.push(Finding {
        kind: FindingKind::MissingEnd,
        title: "Missing end step".to_string(),
        message: "The flow has no end step, so no applicant journey can complete."
            .to_string(),
        node_ids: Vec::new(),
    });
}

/// Rule 2: every step except the start must take part in at least one
/// connection. Reported as a single finding listing all offenders in node
/// insertion order.
fn check_disconnected_nodes(graph: &FlowGraph, findings: &mut Vec<Finding>) {
    let mut connected: HashSet<&str> = HashSet::new();
    for connection in &graph.connections {
        connected.insert(connection.source.as_str());
        connected.insert(connection.target.as_str());
    }

    let disconnected: Vec<NodeId> = graph
        .nodes
        .iter()
        .filter(|n| n.kind != StepKind::Start && !connected.contains(n.id.as_str()))
        .map(|n| n.id.clone())
        .collect();

    if disconnected.is_empty() {
        return;
    }
    findings.push(Finding {
        kind: FindingKind::DisconnectedNodes,
        title: "Disconnected steps".to_string(),
        message: format!(
            "{} step(s) are not connected to the flow: {}",
            disconnected.len(),
            disconnected.join(", ")
        ),
        node_ids: disconnected,
    });
}

/// Rule 3: some end step must be reachable from the start.
///
/// Only evaluated when an end step exists and the graph has more than one
/// node. Walks outgoing connections depth-first from every start step with
/// a visited set, so cyclic graphs terminate.
fn check_path_to_end(graph: &FlowGraph, findings: &mut Vec<Finding>) {
    let has_end = graph.nodes.iter().any(|n| n.kind == StepKind::End);
    if !has_end || graph.nodes.len() <= 1 {
        return;
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&str> = graph
        .nodes
        .iter()
        .filter(|n| n.kind == StepKind::Start)
        .map(|n| n.id.as_str())
        .collect();

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        for connection in &graph.connections {
            if connection.source == id {
                stack.push(connection.target.as_str());
            }
        }
    }

    let end_reached = graph
        .nodes
        .iter()
        .any(|n| n.kind == StepKind::End && visited.contains(n.id.as_str()));
    if end_reached {
        return;
    }
    findings.push(Finding {
        kind: FindingKind::NoPathToEnd,
        title: "End step unreachable".to_string(),
        message: "No path of connections leads from the start step to an end step."
            .to_string(),
        node_ids: Vec::new(),
    });
}
