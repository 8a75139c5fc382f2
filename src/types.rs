//! Core data types for the onboarding flow designer.
//!
//! This module defines the graph model used throughout the application:
//! step nodes, directed connections between them, and the flow graph that
//! owns both and enforces the structural identity rules.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Unique identifier for flow step nodes, minted as `{kind-tag}-{n}`.
pub type NodeId = String;

/// The closed set of onboarding step kinds available in the editor.
///
/// The editor treats each kind as an opaque tag with a default label and a
/// per-kind attribute schema; what a step semantically does (OCR, biometric
/// capture, ...) is the concern of the runtime that consumes saved flows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    /// Entry point of the flow. Exactly one is created per flow and it
    /// cannot be deleted.
    Start,
    /// Document capture and OCR extraction step.
    #[serde(rename = "ocr")]
    DocumentOcr,
    /// Biometric capture (selfie/liveness) step.
    Biometric,
    /// Watchlist / sanctions list screening step.
    ListCheck,
    /// Hand-off to a human review queue.
    ManualReview,
    /// Branching decision step.
    Decision,
    /// Informational message shown to the applicant.
    #[serde(rename = "message")]
    MessageStep,
    /// Terminal step of the flow.
    End,
}

impl StepKind {
    /// All step kinds in palette order.
    pub const ALL: [StepKind; 8] = [
        StepKind::Start,
        StepKind::DocumentOcr,
        StepKind::Biometric,
        StepKind::ListCheck,
        StepKind::ManualReview,
        StepKind::Decision,
        StepKind::MessageStep,
        StepKind::End,
    ];

    /// The stable wire tag used in node ids and persisted documents.
    pub fn tag(&self) -> &'static str {
        match self {
            StepKind::Start => "start",
            StepKind::DocumentOcr => "ocr",
            StepKind::Biometric => "biometric",
            StepKind::ListCheck => "list-check",
            StepKind::ManualReview => "manual-review",
            StepKind::Decision => "decision",
            StepKind::MessageStep => "message",
            StepKind::End => "end",
        }
    }

    /// Default display label for newly created nodes of this kind.
    pub fn default_label(&self) -> &'static str {
        match self {
            StepKind::Start => "Start",
            StepKind::DocumentOcr => "Document OCR",
            StepKind::Biometric => "Biometric Check",
            StepKind::ListCheck => "List Screening",
            StepKind::ManualReview => "Manual Review",
            StepKind::Decision => "Decision",
            StepKind::MessageStep => "Message",
            StepKind::End => "End",
        }
    }

    /// Whether nodes of this kind may be deleted by the user.
    pub fn is_deletable(&self) -> bool {
        !matches!(self, StepKind::Start)
    }
}

/// A single onboarding step placed on the canvas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepNode {
    /// Unique identifier, stable for the lifetime of the node.
    pub id: NodeId,
    /// The step kind tag.
    #[serde(rename = "type")]
    pub kind: StepKind,
    /// Position on the canvas as (x, y) world coordinates.
    pub position: (f32, f32),
    /// Open attribute bag: always carries `"label"`, plus per-kind config.
    pub data: Map<String, Value>,
}

impl StepNode {
    /// Creates a node with the given identity and a default label.
    pub fn new(id: NodeId, kind: StepKind, position: (f32, f32)) -> Self {
        let mut data = Map::new();
        data.insert(
            "label".to_string(),
            Value::String(kind.default_label().to_string()),
        );
        Self {
            id,
            kind,
            position,
            data,
        }
    }

    /// The node's display label from its attribute bag.
    pub fn label(&self) -> &str {
        self.data
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or_else(|| self.kind.default_label())
    }
}

/// A directed transition between two steps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Connection {
    /// Identifier derived from the endpoints as `{source}-{target}`.
    pub id: String,
    /// ID of the source node.
    pub source: NodeId,
    /// ID of the target node.
    pub target: NodeId,
    /// Optional transition label (e.g. a decision branch name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Connection {
    /// Creates a new unlabeled connection between two nodes.
    pub fn new(source: &str, target: &str) -> Self {
        Self {
            id: connection_id(source, target),
            source: source.to_string(),
            target: target.to_string(),
            label: None,
        }
    }
}

/// Derives the connection id for a (source, target) pair.
pub fn connection_id(source: &str, target: &str) -> String {
    format!("{}-{}", source, target)
}

/// The flow graph: all step nodes and the transitions between them.
///
/// Nodes keep insertion order; validator output, layout tie-breaking, and
/// keyboard navigation all iterate in that order, so it is observable.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FlowGraph {
    /// All step nodes, in insertion order.
    pub nodes: Vec<StepNode>,
    /// All directed connections.
    pub connections: Vec<Connection>,
    /// Policy switch: whether a node may connect to itself. Off by default;
    /// a self-transition has no meaning in an onboarding sequence.
    #[serde(default)]
    pub allow_self_loops: bool,
}

impl FlowGraph {
    /// Creates a new empty flow graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes the graph to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserializes a graph from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Looks up a node by id.
    pub fn node(&self, id: &str) -> Option<&StepNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Looks up a node by id, mutably.
    pub fn node_mut(&mut self, id: &str) -> Option<&mut StepNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Mints a fresh id for a node of the given kind.
    ///
    /// The suffix is the smallest positive integer not already used by a
    /// node of that kind, so deleting `ocr-1` and adding another OCR step
    /// yields `ocr-1` again and ids never collide.
    fn mint_id(&self, kind: StepKind) -> NodeId {
        let tag = kind.tag();
        let mut n = 1usize;
        loop {
            let candidate = format!("{}-{}", tag, n);
            if self.nodes.iter().all(|node| node.id != candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Adds a node of the given kind at the given position.
    ///
    /// Always succeeds; returns the freshly minted node id.
    pub fn add_node(&mut self, kind: StepKind, position: (f32, f32)) -> NodeId {
        let id = self.mint_id(kind);
        self.nodes.push(StepNode::new(id.clone(), kind, position));
        id
    }

    /// Adds a directed connection between two existing nodes.
    ///
    /// Rejected as a silent no-op (returns `false`) when the endpoints are
    /// equal (unless self-loops are allowed), when either endpoint is
    /// unknown, or when the same (source, target) pair already exists.
    /// These rejections arise from normal interactive exploration and are
    /// not errors.
    pub fn add_connection(&mut self, source: &str, target: &str) -> bool {
        if source == target && !self.allow_self_loops {
            return false;
        }
        if self.node(source).is_none() || self.node(target).is_none() {
            return false;
        }
        if self
            .connections
            .iter()
            .any(|c| c.source == source && c.target == target)
        {
            return false;
        }
        self.connections.push(Connection::new(source, target));
        true
    }

    /// Removes a node and every connection referencing it.
    ///
    /// A silent no-op (returns `false`) when the node does not exist or its
    /// kind is protected from deletion (the start node).
    pub fn remove_node(&mut self, id: &str) -> bool {
        let Some(index) = self.nodes.iter().position(|n| n.id == id) else {
            return false;
        };
        if !self.nodes[index].kind.is_deletable() {
            return false;
        }
        self.nodes.remove(index);
        self.connections
            .retain(|c| c.source != id && c.target != id);
        true
    }

    /// Removes a connection by id. Returns the removed connection and its
    /// index, or `None` if no such connection exists.
    pub fn remove_connection(&mut self, id: &str) -> Option<(usize, Connection)> {
        let index = self.connections.iter().position(|c| c.id == id)?;
        Some((index, self.connections.remove(index)))
    }

    /// Moves a node to a new position. Unconditional; positions are not
    /// bounds-checked. No-op for unknown ids.
    pub fn move_node(&mut self, id: &str, position: (f32, f32)) {
        if let Some(node) = self.node_mut(id) {
            node.position = position;
        }
    }

    /// Shallow-merges the given entries into a node's attribute bag.
    /// Existing keys are overwritten; other keys are untouched.
    pub fn update_node_data(&mut self, id: &str, partial: Map<String, Value>) {
        if let Some(node) = self.node_mut(id) {
            for (key, value) in partial {
                node.data.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn add_node_mints_sequential_ids_per_kind() {
        let mut graph = FlowGraph::new();
        assert_eq!(graph.add_node(StepKind::DocumentOcr, (0.0, 0.0)), "ocr-1");
        assert_eq!(graph.add_node(StepKind::DocumentOcr, (0.0, 0.0)), "ocr-2");
        assert_eq!(graph.add_node(StepKind::Biometric, (0.0, 0.0)), "biometric-1");
    }

    #[test]
    fn deleted_id_suffix_is_reused() {
        let mut graph = FlowGraph::new();
        graph.add_node(StepKind::DocumentOcr, (0.0, 0.0));
        graph.add_node(StepKind::DocumentOcr, (0.0, 0.0));
        assert!(graph.remove_node("ocr-1"));
        // Smallest free suffix comes back first.
        assert_eq!(graph.add_node(StepKind::DocumentOcr, (0.0, 0.0)), "ocr-1");
        assert_eq!(graph.add_node(StepKind::DocumentOcr, (0.0, 0.0)), "ocr-3");
    }

    #[test]
    fn ids_stay_unique_across_mixed_mutations() {
        let mut graph = FlowGraph::new();
        for _ in 0..5 {
            graph.add_node(StepKind::Decision, (0.0, 0.0));
        }
        graph.remove_node("decision-2");
        graph.remove_node("decision-4");
        graph.add_node(StepKind::Decision, (0.0, 0.0));
        graph.add_node(StepKind::Decision, (0.0, 0.0));
        graph.add_node(StepKind::Decision, (0.0, 0.0));

        let mut ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        let before = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), before);
    }

    #[test]
    fn new_node_carries_default_label() {
        let mut graph = FlowGraph::new();
        let id = graph.add_node(StepKind::ManualReview, (10.0, 20.0));
        let node = graph.node(&id).unwrap();
        assert_eq!(node.label(), "Manual Review");
        assert_eq!(node.position, (10.0, 20.0));
    }

    #[test]
    fn add_connection_rejects_self_loop() {
        let mut graph = FlowGraph::new();
        let a = graph.add_node(StepKind::Decision, (0.0, 0.0));
        assert!(!graph.add_connection(&a, &a));
        assert!(graph.connections.is_empty());
    }

    #[test]
    fn self_loop_policy_is_configurable() {
        let mut graph = FlowGraph::new();
        graph.allow_self_loops = true;
        let a = graph.add_node(StepKind::Decision, (0.0, 0.0));
        assert!(graph.add_connection(&a, &a));
        assert_eq!(graph.connections.len(), 1);
    }

    #[test]
    fn add_connection_rejects_unknown_endpoints() {
        let mut graph = FlowGraph::new();
        let a = graph.add_node(StepKind::Start, (0.0, 0.0));
        assert!(!graph.add_connection(&a, "ocr-1"));
        assert!(!graph.add_connection("ocr-1", &a));
        assert!(graph.connections.is_empty());
    }

    #[test]
    fn duplicate_connection_is_a_no_op() {
        let mut graph = FlowGraph::new();
        let a = graph.add_node(StepKind::Start, (0.0, 0.0));
        let b = graph.add_node(StepKind::End, (0.0, 0.0));
        assert!(graph.add_connection(&a, &b));
        assert!(!graph.add_connection(&a, &b));
        assert_eq!(graph.connections.len(), 1);
        // The reverse direction is a different edge.
        assert!(graph.add_connection(&b, &a));
        assert_eq!(graph.connections.len(), 2);
    }

    #[test]
    fn connection_id_derives_from_endpoints() {
        let mut graph = FlowGraph::new();
        let a = graph.add_node(StepKind::Start, (0.0, 0.0));
        let b = graph.add_node(StepKind::End, (0.0, 0.0));
        graph.add_connection(&a, &b);
        assert_eq!(graph.connections[0].id, "start-1-end-1");
    }

    #[test]
    fn remove_node_cascades_connections() {
        let mut graph = FlowGraph::new();
        let a = graph.add_node(StepKind::Start, (0.0, 0.0));
        let b = graph.add_node(StepKind::DocumentOcr, (0.0, 0.0));
        let c = graph.add_node(StepKind::End, (0.0, 0.0));
        graph.add_connection(&a, &b);
        graph.add_connection(&b, &c);
        graph.add_connection(&a, &c);

        assert!(graph.remove_node(&b));

        assert_eq!(graph.connections.len(), 1);
        assert_eq!(graph.connections[0].source, a);
        assert_eq!(graph.connections[0].target, c);
    }

    #[test]
    fn start_node_cannot_be_deleted() {
        let mut graph = FlowGraph::new();
        let start = graph.add_node(StepKind::Start, (0.0, 0.0));
        assert!(!graph.remove_node(&start));
        assert!(graph.node(&start).is_some());
    }

    #[test]
    fn remove_unknown_node_is_a_no_op() {
        let mut graph = FlowGraph::new();
        assert!(!graph.remove_node("ocr-1"));
    }

    #[test]
    fn move_node_overwrites_position() {
        let mut graph = FlowGraph::new();
        let id = graph.add_node(StepKind::Biometric, (0.0, 0.0));
        graph.move_node(&id, (-40.0, 900.5));
        assert_eq!(graph.node(&id).unwrap().position, (-40.0, 900.5));
    }

    #[test]
    fn update_node_data_merges_shallowly() {
        let mut graph = FlowGraph::new();
        let id = graph.add_node(StepKind::DocumentOcr, (0.0, 0.0));

        let mut partial = Map::new();
        partial.insert("label".to_string(), json!("Passport OCR"));
        partial.insert("document_types".to_string(), json!(["passport"]));
        graph.update_node_data(&id, partial);

        let node = graph.node(&id).unwrap();
        assert_eq!(node.label(), "Passport OCR");
        assert_eq!(node.data["document_types"], json!(["passport"]));

        // A later partial update leaves unrelated keys alone.
        let mut second = Map::new();
        second.insert("label".to_string(), json!("ID OCR"));
        graph.update_node_data(&id, second);
        let node = graph.node(&id).unwrap();
        assert_eq!(node.label(), "ID OCR");
        assert_eq!(node.data["document_types"], json!(["passport"]));
    }

    #[test]
    fn graph_json_roundtrip() {
        let mut graph = FlowGraph::new();
        let a = graph.add_node(StepKind::Start, (0.0, 0.0));
        let b = graph.add_node(StepKind::End, (300.0, 0.0));
        graph.add_connection(&a, &b);

        let json = graph.to_json().unwrap();
        assert!(json.contains("\"start\""));
        assert!(json.contains("\"end\""));

        let restored = FlowGraph::from_json(&json).unwrap();
        assert_eq!(restored.nodes.len(), 2);
        assert_eq!(restored.connections.len(), 1);
        assert_eq!(restored.connections[0].source, a);
        assert_eq!(restored.connections[0].target, b);
    }

    #[test]
    fn kind_tags_roundtrip_through_serde() {
        for kind in StepKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.tag()));
            let back: StepKind = serde_json::from_str(&json).unwrap();
            assert_eq!(back, kind);
        }
    }
}
