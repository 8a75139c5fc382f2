//! Persistence boundary for flow documents.
//!
//! The editor serializes the [`FlowGraph`] verbatim as JSON. This module
//! also adapts two legacy shapes the surrounding back office still uses:
//! step-record sequences that predate the graph editor, and storage models
//! that require a strict linear step order rather than a connection graph.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::constants::TIER_SPACING;
use crate::types::{FlowGraph, NodeId, StepKind};

/// Errors crossing the file persistence boundary.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Reading or writing the file failed.
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),
    /// The file contents were not a valid flow document.
    #[error("invalid flow document: {0}")]
    Format(#[from] serde_json::Error),
}

/// Errors from reconstructing a strict linear step order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// Every node has an incoming connection, so no walk can begin.
    #[error("flow has no entry step without incoming connections")]
    NoEntryPoint,
    /// More than one node has no incoming connections.
    #[error("flow has {0} candidate entry steps, expected exactly one")]
    AmbiguousEntryPoint(usize),
}

/// Reads a flow document from disk.
pub fn load_flow(path: &Path) -> Result<FlowGraph, StorageError> {
    let json = fs::read_to_string(path)?;
    let graph = FlowGraph::from_json(&json)?;
    log::info!(
        "loaded flow from {} ({} nodes, {} connections)",
        path.display(),
        graph.nodes.len(),
        graph.connections.len()
    );
    Ok(graph)
}

/// Writes a flow document to disk as pretty-printed JSON.
pub fn save_flow(graph: &FlowGraph, path: &Path) -> Result<(), StorageError> {
    let json = graph.to_json()?;
    fs::write(path, json)?;
    log::info!("saved flow to {}", path.display());
    Ok(())
}

/// A persisted onboarding step from before the graph editor existed.
///
/// These records carry no connection list; their sequence order is the
/// flow order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// The step kind tag.
    #[serde(rename = "type")]
    pub kind: StepKind,
    /// Display label, when the record carries one.
    #[serde(default)]
    pub label: Option<String>,
    /// Canvas position, when the record carries one.
    #[serde(default)]
    pub position: Option<(f32, f32)>,
    /// Per-step configuration.
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// Adapts a legacy step sequence into a flow graph.
///
/// Each record becomes a node at its recorded position, or at an
/// auto-incrementing X offset when none was stored. Record order becomes a
/// linear chain of connections.
pub fn graph_from_step_records(records: &[StepRecord]) -> FlowGraph {
    let mut graph = FlowGraph::new();
    let mut ids: Vec<NodeId> = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let position = record
            .position
            .unwrap_or((index as f32 * TIER_SPACING, 0.0));
        let id = graph.add_node(record.kind, position);
        let mut data = record.data.clone();
        if let Some(label) = &record.label {
            data.insert("label".to_string(), Value::String(label.clone()));
        }
        graph.update_node_data(&id, data);
        ids.push(id);
    }

    for pair in ids.windows(2) {
        graph.add_connection(&pair[0], &pair[1]);
    }
    graph
}

/// Reconstructs a strict linear step order from the connection graph.
///
/// Walks outgoing connections from the unique node that has no incoming
/// connections. Branches follow the earliest-added connection and a
/// visited set stops revisits, so cycles terminate. Fails explicitly when
/// no unique entry step exists.
pub fn linear_step_order(graph: &FlowGraph) -> Result<Vec<NodeId>, OrderError> {
    if graph.nodes.is_empty() {
        return Ok(Vec::new());
    }

    let entries: Vec<&NodeId> = graph
        .nodes
        .iter()
        .filter(|n| graph.connections.iter().all(|c| c.target != n.id))
        .map(|n| &n.id)
        .collect();
    let entry = match entries.as_slice() {
        [] => return Err(OrderError::NoEntryPoint),
        [only] => (*only).clone(),
        many => return Err(OrderError::AmbiguousEntryPoint(many.len())),
    };

    let mut order = Vec::new();
    let mut current = Some(entry);
    while let Some(id) = current {
        if order.contains(&id) {
            break;
        }
        order.push(id.clone());
        current = graph
            .connections
            .iter()
            .find(|c| c.source == id)
            .map(|c| c.target.clone());
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flow_roundtrips_through_a_file() {
        let mut graph = FlowGraph::new();
        let a = graph.add_node(StepKind::Start, (0.0, 0.0));
        let b = graph.add_node(StepKind::End, (300.0, 0.0));
        graph.add_connection(&a, &b);

        let dir = std::env::temp_dir().join("flow-designer-storage-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("roundtrip.json");
        save_flow(&graph, &path).unwrap();
        let restored = load_flow(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(restored.nodes, graph.nodes);
        assert_eq!(restored.connections, graph.connections);
    }

    #[test]
    fn loading_garbage_reports_a_format_error() {
        let dir = std::env::temp_dir().join("flow-designer-storage-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("garbage.json");
        std::fs::write(&path, "not json").unwrap();
        let err = load_flow(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(err, StorageError::Format(_)));
    }

    #[test]
    fn step_records_become_a_linear_chain() {
        let records = vec![
            StepRecord {
                kind: StepKind::Start,
                label: None,
                position: None,
                data: Map::new(),
            },
            StepRecord {
                kind: StepKind::DocumentOcr,
                label: Some("Passport scan".to_string()),
                position: Some((40.0, 80.0)),
                data: {
                    let mut m = Map::new();
                    m.insert("retries".to_string(), json!(2));
                    m
                },
            },
            StepRecord {
                kind: StepKind::End,
                label: None,
                position: None,
                data: Map::new(),
            },
        ];

        let graph = graph_from_step_records(&records);
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.connections.len(), 2);

        // Missing positions fall back to an auto-incrementing X offset.
        assert_eq!(graph.node("start-1").unwrap().position, (0.0, 0.0));
        assert_eq!(graph.node("end-1").unwrap().position, (2.0 * TIER_SPACING, 0.0));

        let ocr = graph.node("ocr-1").unwrap();
        assert_eq!(ocr.position, (40.0, 80.0));
        assert_eq!(ocr.label(), "Passport scan");
        assert_eq!(ocr.data["retries"], json!(2));

        assert_eq!(graph.connections[0].source, "start-1");
        assert_eq!(graph.connections[0].target, "ocr-1");
        assert_eq!(graph.connections[1].target, "end-1");
    }

    #[test]
    fn linear_order_walks_from_the_entry_step() {
        let mut graph = FlowGraph::new();
        let a = graph.add_node(StepKind::Start, (0.0, 0.0));
        let b = graph.add_node(StepKind::ListCheck, (0.0, 0.0));
        let c = graph.add_node(StepKind::End, (0.0, 0.0));
        graph.add_connection(&a, &b);
        graph.add_connection(&b, &c);

        assert_eq!(linear_step_order(&graph).unwrap(), vec![a, b, c]);
    }

    #[test]
    fn linear_order_fails_without_a_unique_entry() {
        let mut graph = FlowGraph::new();
        let a = graph.add_node(StepKind::Decision, (0.0, 0.0));
        let b = graph.add_node(StepKind::ManualReview, (0.0, 0.0));
        graph.add_connection(&a, &b);
        graph.add_connection(&b, &a);
        assert_eq!(linear_step_order(&graph), Err(OrderError::NoEntryPoint));

        let mut graph = FlowGraph::new();
        graph.add_node(StepKind::Start, (0.0, 0.0));
        graph.add_node(StepKind::MessageStep, (0.0, 0.0));
        assert_eq!(
            linear_step_order(&graph),
            Err(OrderError::AmbiguousEntryPoint(2))
        );
    }

    #[test]
    fn linear_order_terminates_on_downstream_cycles() {
        let mut graph = FlowGraph::new();
        let a = graph.add_node(StepKind::Start, (0.0, 0.0));
        let b = graph.add_node(StepKind::Decision, (0.0, 0.0));
        let c = graph.add_node(StepKind::ManualReview, (0.0, 0.0));
        graph.add_connection(&a, &b);
        graph.add_connection(&b, &c);
        graph.add_connection(&c, &b);

        assert_eq!(linear_step_order(&graph).unwrap(), vec![a, b, c]);
    }

    #[test]
    fn empty_graph_orders_to_nothing() {
        assert_eq!(linear_step_order(&FlowGraph::new()).unwrap(), Vec::<NodeId>::new());
    }
}
