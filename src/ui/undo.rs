//! Undo/redo functionality for tracking and reversing user actions.
//!
//! Every mutation the editor performs on the flow graph records an
//! [`UndoAction`] carrying enough state to reverse it. Applying an undo
//! yields the matching redo action, so the two stacks stay symmetric.

use crate::constants::MAX_UNDO_HISTORY;
use crate::types::{Connection, FlowGraph, NodeId, StepNode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Represents different types of actions that can be undone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UndoAction {
    /// A node was moved from one position to another.
    NodeMoved {
        /// The node that moved.
        node_id: NodeId,
        /// Position before the move.
        old_position: (f32, f32),
        /// Position after the move.
        new_position: (f32, f32),
    },
    /// Several nodes were repositioned at once (auto-arrange).
    MultipleNodesMoved {
        /// Positions before the move, per node.
        old_positions: Vec<(NodeId, (f32, f32))>,
        /// Positions after the move, per node.
        new_positions: Vec<(NodeId, (f32, f32))>,
    },
    /// A node's attribute bag was changed.
    DataChanged {
        /// The node that was edited.
        node_id: NodeId,
        /// Full attribute bag before the edit.
        old_data: Map<String, Value>,
        /// Full attribute bag after the edit.
        new_data: Map<String, Value>,
    },
    /// A node was deleted along with its connections.
    NodeDeleted {
        /// The deleted node.
        node: StepNode,
        /// The node's index in the node list, so restore keeps list order.
        index: usize,
        /// Every connection that referenced the node.
        connections: Vec<Connection>,
    },
    /// A connection was deleted.
    ConnectionDeleted {
        /// The deleted connection.
        connection: Connection,
        /// Its index in the connection list.
        index: usize,
    },
    /// A node was created.
    NodeCreated {
        /// Id of the created node.
        node_id: NodeId,
    },
    /// A connection was created.
    ConnectionCreated {
        /// Source node id.
        source: NodeId,
        /// Target node id.
        target: NodeId,
    },
}

/// Manages undo/redo history for the application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UndoHistory {
    /// Stack of actions that can be undone
    #[serde(skip)]
    undo_stack: Vec<UndoAction>,
    /// Stack of actions that can be redone
    #[serde(skip)]
    redo_stack: Vec<UndoAction>,
}

impl UndoHistory {
    /// Creates a new empty undo history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an action to the undo history.
    ///
    /// Clears the redo stack since a new action invalidates any previously
    /// undone actions.
    pub fn push_action(&mut self, action: UndoAction) {
        self.undo_stack.push(action);
        self.redo_stack.clear();

        // Limit undo history size
        if self.undo_stack.len() > MAX_UNDO_HISTORY {
            self.undo_stack.remove(0);
        }
    }

    /// Returns true if there are actions that can be undone.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Returns true if there are actions that can be redone.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Pops the most recent action from the undo stack.
    pub fn pop_undo(&mut self) -> Option<UndoAction> {
        self.undo_stack.pop()
    }

    /// Pops the most recent action from the redo stack.
    pub fn pop_redo(&mut self) -> Option<UndoAction> {
        self.redo_stack.pop()
    }

    /// Pushes an action onto the undo stack without clearing redo.
    /// Used when a redo is performed.
    pub fn push_undo(&mut self, action: UndoAction) {
        self.undo_stack.push(action);
    }

    /// Pushes an action onto the redo stack.
    pub fn push_redo(&mut self, action: UndoAction) {
        self.redo_stack.push(action);
    }

    /// Clears all undo and redo history.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

/// Extension methods for applying undo/redo actions to a flow graph.
pub trait UndoableGraph {
    /// Applies an undo action to reverse it, returning the matching redo
    /// action, or `None` if the action no longer applies.
    fn apply_undo(&mut self, action: &UndoAction) -> Option<UndoAction>;
}

impl UndoableGraph for FlowGraph {
    fn apply_undo(&mut self, action: &UndoAction) -> Option<UndoAction> {
        match action {
            UndoAction::NodeMoved {
                node_id,
                old_position,
                new_position,
            } => {
                let node = self.node_mut(node_id)?;
                node.position = *old_position;
                Some(UndoAction::NodeMoved {
                    node_id: node_id.clone(),
                    old_position: *new_position,
                    new_position: *old_position,
                })
            }
            UndoAction::MultipleNodesMoved {
                old_positions,
                new_positions,
            } => {
                for (id, position) in old_positions {
                    self.move_node(id, *position);
                }
                Some(UndoAction::MultipleNodesMoved {
                    old_positions: new_positions.clone(),
                    new_positions: old_positions.clone(),
                })
            }
            UndoAction::DataChanged {
                node_id,
                old_data,
                new_data,
            } => {
                let node = self.node_mut(node_id)?;
                node.data = old_data.clone();
                Some(UndoAction::DataChanged {
                    node_id: node_id.clone(),
                    old_data: new_data.clone(),
                    new_data: old_data.clone(),
                })
            }
            UndoAction::NodeDeleted {
                node,
                index,
                connections,
            } => {
                // Restore the node at its original list position
                let index = (*index).min(self.nodes.len());
                self.nodes.insert(index, node.clone());
                for conn in connections {
                    self.connections.push(conn.clone());
                }
                Some(UndoAction::NodeCreated {
                    node_id: node.id.clone(),
                })
            }
            UndoAction::ConnectionDeleted { connection, index } => {
                if *index <= self.connections.len() {
                    self.connections.insert(*index, connection.clone());
                } else {
                    self.connections.push(connection.clone());
                }
                Some(UndoAction::ConnectionCreated {
                    source: connection.source.clone(),
                    target: connection.target.clone(),
                })
            }
            UndoAction::NodeCreated { node_id } => {
                // Remove the created node and any connections attached since
                let index = self.nodes.iter().position(|n| n.id == *node_id)?;
                let node = self.nodes.remove(index);
                let connections: Vec<Connection> = self
                    .connections
                    .iter()
                    .filter(|c| c.source == *node_id || c.target == *node_id)
                    .cloned()
                    .collect();
                self.connections
                    .retain(|c| c.source != *node_id && c.target != *node_id);
                Some(UndoAction::NodeDeleted {
                    node,
                    index,
                    connections,
                })
            }
            UndoAction::ConnectionCreated { source, target } => {
                let index = self
                    .connections
                    .iter()
                    .position(|c| c.source == *source && c.target == *target)?;
                let connection = self.connections.remove(index);
                Some(UndoAction::ConnectionDeleted { connection, index })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StepKind;

    fn linear_graph() -> (FlowGraph, Vec<NodeId>) {
        let mut graph = FlowGraph::new();
        let a = graph.add_node(StepKind::Start, (0.0, 0.0));
        let b = graph.add_node(StepKind::DocumentOcr, (300.0, 0.0));
        let c = graph.add_node(StepKind::End, (600.0, 0.0));
        graph.add_connection(&a, &b);
        graph.add_connection(&b, &c);
        (graph, vec![a, b, c])
    }

    #[test]
    fn node_move_round_trips() {
        let (mut graph, ids) = linear_graph();
        graph.move_node(&ids[1], (50.0, 50.0));

        let action = UndoAction::NodeMoved {
            node_id: ids[1].clone(),
            old_position: (300.0, 0.0),
            new_position: (50.0, 50.0),
        };
        let redo = graph.apply_undo(&action).unwrap();
        assert_eq!(graph.node(&ids[1]).unwrap().position, (300.0, 0.0));

        graph.apply_undo(&redo).unwrap();
        assert_eq!(graph.node(&ids[1]).unwrap().position, (50.0, 50.0));
    }

    #[test]
    fn node_delete_restores_list_order_and_connections() {
        let (mut graph, ids) = linear_graph();
        let node = graph.node(&ids[1]).unwrap().clone();
        let connections: Vec<Connection> = graph
            .connections
            .iter()
            .filter(|c| c.source == ids[1] || c.target == ids[1])
            .cloned()
            .collect();
        assert!(graph.remove_node(&ids[1]));

        let action = UndoAction::NodeDeleted {
            node,
            index: 1,
            connections,
        };
        graph.apply_undo(&action).unwrap();

        let order: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(order, vec!["start-1", "ocr-1", "end-1"]);
        assert_eq!(graph.connections.len(), 2);
    }

    #[test]
    fn connection_create_and_delete_are_inverses() {
        let (mut graph, ids) = linear_graph();
        let action = UndoAction::ConnectionCreated {
            source: ids[0].clone(),
            target: ids[1].clone(),
        };
        let redo = graph.apply_undo(&action).unwrap();
        assert_eq!(graph.connections.len(), 1);

        graph.apply_undo(&redo).unwrap();
        assert_eq!(graph.connections.len(), 2);
        assert_eq!(graph.connections[0].source, ids[0]);
    }

    #[test]
    fn data_change_round_trips() {
        let (mut graph, ids) = linear_graph();
        let old_data = graph.node(&ids[1]).unwrap().data.clone();
        let mut partial = Map::new();
        partial.insert("label".to_string(), Value::String("Passport OCR".into()));
        graph.update_node_data(&ids[1], partial);
        let new_data = graph.node(&ids[1]).unwrap().data.clone();

        let action = UndoAction::DataChanged {
            node_id: ids[1].clone(),
            old_data,
            new_data,
        };
        let redo = graph.apply_undo(&action).unwrap();
        assert_eq!(graph.node(&ids[1]).unwrap().label(), "Document OCR");

        graph.apply_undo(&redo).unwrap();
        assert_eq!(graph.node(&ids[1]).unwrap().label(), "Passport OCR");
    }

    #[test]
    fn multi_move_round_trips() {
        let (mut graph, ids) = linear_graph();
        let old_positions: Vec<(NodeId, (f32, f32))> = graph
            .nodes
            .iter()
            .map(|n| (n.id.clone(), n.position))
            .collect();
        for id in &ids {
            graph.move_node(id, (1.0, 1.0));
        }
        let new_positions: Vec<(NodeId, (f32, f32))> = graph
            .nodes
            .iter()
            .map(|n| (n.id.clone(), n.position))
            .collect();

        let action = UndoAction::MultipleNodesMoved {
            old_positions: old_positions.clone(),
            new_positions,
        };
        graph.apply_undo(&action).unwrap();
        for (id, position) in &old_positions {
            assert_eq!(graph.node(id).unwrap().position, *position);
        }
    }

    #[test]
    fn history_caps_and_clears_redo() {
        let mut history = UndoHistory::new();
        for _ in 0..(MAX_UNDO_HISTORY + 10) {
            history.push_action(UndoAction::ConnectionCreated {
                source: "a".into(),
                target: "b".into(),
            });
        }
        let mut count = 0;
        while history.pop_undo().is_some() {
            count += 1;
        }
        assert_eq!(count, MAX_UNDO_HISTORY);

        history.push_action(UndoAction::ConnectionCreated {
            source: "a".into(),
            target: "b".into(),
        });
        history.push_redo(UndoAction::ConnectionCreated {
            source: "a".into(),
            target: "b".into(),
        });
        assert!(history.can_redo());
        history.push_action(UndoAction::ConnectionCreated {
            source: "c".into(),
            target: "d".into(),
        });
        assert!(!history.can_redo());
    }
}
