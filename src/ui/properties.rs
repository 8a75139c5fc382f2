//! Properties panel for the selected step or connection.
//!
//! Edits are staged in temporary strings while a field has focus and
//! committed to the graph on Enter or focus loss, so half-typed values
//! never land in the model. Every commit records an undo action carrying
//! the node's full data map before and after the change.

use super::state::FlowDesignerApp;
use super::undo::UndoAction;
use crate::types::{NodeId, StepKind};
use eframe::egui;
use serde_json::Value;

/// How an attribute is edited and stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Single-line text, stored as a JSON string.
    Text,
    /// Multi-line text, stored as a JSON string.
    Multiline,
    /// Whole number, stored as a JSON number.
    Integer,
    /// Checkbox, stored as a JSON boolean.
    Boolean,
}

/// One editable attribute of a step kind.
pub struct AttributeField {
    /// Key in the node's data map.
    pub key: &'static str,
    /// Label shown next to the editor.
    pub label: &'static str,
    pub kind: FieldKind,
}

const fn field(key: &'static str, label: &'static str, kind: FieldKind) -> AttributeField {
    AttributeField { key, label, kind }
}

/// The editable attributes for each step kind, beyond the shared label.
pub fn attribute_schema(kind: StepKind) -> &'static [AttributeField] {
    const DOCUMENT_OCR: &[AttributeField] = &[
        field("document_types", "Accepted documents", FieldKind::Text),
        field("max_retries", "Max capture retries", FieldKind::Integer),
    ];
    const BIOMETRIC: &[AttributeField] = &[
        field("liveness_required", "Require liveness", FieldKind::Boolean),
        field("match_threshold", "Match threshold (%)", FieldKind::Integer),
    ];
    const LIST_CHECK: &[AttributeField] = &[
        field("lists", "Screening lists", FieldKind::Text),
        field("fuzziness", "Fuzziness (%)", FieldKind::Integer),
    ];
    const MANUAL_REVIEW: &[AttributeField] = &[
        field("queue", "Review queue", FieldKind::Text),
        field("sla_hours", "SLA (hours)", FieldKind::Integer),
    ];
    const DECISION: &[AttributeField] = &[
        field("condition", "Condition", FieldKind::Multiline),
        field("branches", "Branch names", FieldKind::Text),
    ];
    const MESSAGE: &[AttributeField] = &[
        field("channel", "Channel", FieldKind::Text),
        field("body", "Message body", FieldKind::Multiline),
    ];
    const END: &[AttributeField] = &[field("outcome", "Outcome", FieldKind::Text)];

    match kind {
        StepKind::Start => &[],
        StepKind::DocumentOcr => DOCUMENT_OCR,
        StepKind::Biometric => BIOMETRIC,
        StepKind::ListCheck => LIST_CHECK,
        StepKind::ManualReview => MANUAL_REVIEW,
        StepKind::Decision => DECISION,
        StepKind::MessageStep => MESSAGE,
        StepKind::End => END,
    }
}

impl FlowDesignerApp {
    /// Renders the contents of the right-hand properties panel.
    pub fn draw_properties_contents(&mut self, ui: &mut egui::Ui) {
        ui.heading("Properties");
        ui.separator();

        egui::ScrollArea::vertical().show(ui, |ui| {
            if let Some(selected_id) = self.interaction.selected_node.clone() {
                if self.graph.node(&selected_id).is_some() {
                    self.draw_node_properties(ui, &selected_id);
                } else {
                    ui.label("Step not found");
                }
            } else if let Some(conn_idx) = self.interaction.selected_connection {
                if let Some(connection) = self.graph.connections.get(conn_idx) {
                    let source_label = self
                        .graph
                        .node(&connection.source)
                        .map(|n| n.label().to_string())
                        .unwrap_or_else(|| "(missing)".to_string());
                    let target_label = self
                        .graph
                        .node(&connection.target)
                        .map(|n| n.label().to_string())
                        .unwrap_or_else(|| "(missing)".to_string());
                    ui.label("Type: Connection");
                    ui.separator();
                    ui.label(format!("From: {}", source_label));
                    ui.label(format!("To: {}", target_label));
                    ui.separator();
                    ui.colored_label(egui::Color32::GRAY, "Press Delete to remove");
                } else {
                    ui.label("Connection not found");
                }
            } else {
                ui.label("Nothing selected");
                ui.add_space(8.0);
                ui.colored_label(
                    egui::Color32::GRAY,
                    "Select a step or connection on the canvas to edit it here.",
                );
            }
        });
    }

    fn draw_node_properties(&mut self, ui: &mut egui::Ui, node_id: &NodeId) {
        let Some(node) = self.graph.node(node_id) else {
            return;
        };
        let kind = node.kind;
        let label = node.label().to_string();
        let position = node.position;

        ui.label(format!("Type: {}", kind.default_label()));
        ui.label(format!("ID: {}", node_id));
        ui.separator();

        ui.label("Label:");
        if self.interaction.editing_node_label.as_deref() == Some(node_id.as_str()) {
            self.draw_label_editor(ui, node_id);
        } else if ui.button(&label).clicked() {
            self.start_editing_label(node_id, &label);
        }

        let schema = attribute_schema(kind);
        if !schema.is_empty() {
            ui.separator();
            self.ensure_staged_attributes(node_id, schema);
            for field in schema {
                self.draw_attribute_editor(ui, node_id, field);
            }
        }

        ui.separator();
        ui.label(format!("Position: ({:.0}, {:.0})", position.0, position.1));
        if kind == StepKind::Start {
            ui.colored_label(egui::Color32::GRAY, "The start step cannot be deleted");
        } else {
            ui.colored_label(egui::Color32::GRAY, "Press Delete to remove");
        }
    }

    /// Renders the label editing field for a step.
    fn draw_label_editor(&mut self, ui: &mut egui::Ui, node_id: &NodeId) {
        let response = ui.text_edit_singleline(&mut self.interaction.temp_label);

        // Only request focus on the first frame of editing
        if !self.interaction.focus_requested_for_edit {
            response.request_focus();
            self.interaction.focus_requested_for_edit = true;
        }

        // Select all text when flag is set and field has focus
        if self.interaction.should_select_text && response.has_focus() {
            self.interaction.should_select_text = false;
            select_all_text_in_field(ui, response.id, self.interaction.temp_label.len());
        }

        let enter = ui.input(|i| i.key_pressed(egui::Key::Enter));
        if (response.has_focus() && enter) || (response.lost_focus() && !enter) {
            self.save_label_change(node_id, ui.input(|i| i.time));
        }
    }

    fn start_editing_label(&mut self, node_id: &NodeId, current: &str) {
        self.interaction.editing_node_label = Some(node_id.clone());
        self.interaction.temp_label = current.to_string();
        self.interaction.should_select_text = true;
        self.interaction.focus_requested_for_edit = false;
    }

    fn save_label_change(&mut self, node_id: &NodeId, now: f64) {
        let new_label = self.interaction.temp_label.trim().to_string();
        if !new_label.is_empty() {
            self.commit_attribute(node_id, "label", Value::String(new_label), now);
        }
        self.interaction.editing_node_label = None;
        self.interaction.temp_label.clear();
    }

    /// Repopulates the staged attribute strings when the selection changes.
    fn ensure_staged_attributes(&mut self, node_id: &NodeId, schema: &[AttributeField]) {
        if self.interaction.temp_attributes_node.as_deref() == Some(node_id.as_str()) {
            return;
        }
        self.interaction.temp_attributes.clear();
        if let Some(node) = self.graph.node(node_id) {
            for field in schema {
                let staged = match node.data.get(field.key) {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    Some(Value::Bool(b)) => b.to_string(),
                    _ => String::new(),
                };
                self.interaction
                    .temp_attributes
                    .insert(field.key.to_string(), staged);
            }
        }
        self.interaction.temp_attributes_node = Some(node_id.clone());
    }

    fn draw_attribute_editor(&mut self, ui: &mut egui::Ui, node_id: &NodeId, field: &AttributeField) {
        let now = ui.input(|i| i.time);
        match field.kind {
            FieldKind::Boolean => {
                let current = self
                    .graph
                    .node(node_id)
                    .and_then(|n| n.data.get(field.key))
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                let mut value = current;
                if ui.checkbox(&mut value, field.label).changed() && value != current {
                    self.commit_attribute(node_id, field.key, Value::Bool(value), now);
                }
            }
            FieldKind::Text | FieldKind::Multiline | FieldKind::Integer => {
                ui.label(format!("{}:", field.label));
                let staged = self
                    .interaction
                    .temp_attributes
                    .entry(field.key.to_string())
                    .or_default();
                let response = if field.kind == FieldKind::Multiline {
                    ui.add(
                        egui::TextEdit::multiline(staged)
                            .desired_rows(3)
                            .desired_width(f32::INFINITY),
                    )
                } else {
                    ui.text_edit_singleline(staged)
                };

                let enter = ui.input(|i| i.key_pressed(egui::Key::Enter));
                let commit = if field.kind == FieldKind::Multiline {
                    response.lost_focus()
                } else {
                    (response.has_focus() && enter) || (response.lost_focus() && !enter)
                };
                if commit {
                    let staged = self
                        .interaction
                        .temp_attributes
                        .get(field.key)
                        .cloned()
                        .unwrap_or_default();
                    match field.kind {
                        FieldKind::Integer => {
                            // Unparseable input is dropped without touching
                            // the stored value
                            if let Ok(value) = staged.trim().parse::<i64>() {
                                self.commit_attribute(
                                    node_id,
                                    field.key,
                                    Value::Number(value.into()),
                                    now,
                                );
                            }
                        }
                        _ => {
                            self.commit_attribute(
                                node_id,
                                field.key,
                                Value::String(staged),
                                now,
                            );
                        }
                    }
                }
            }
        }
    }

    /// Writes one attribute into the node's data map, recording an undo
    /// action when the value actually changed.
    pub(super) fn commit_attribute(
        &mut self,
        node_id: &NodeId,
        key: &str,
        value: Value,
        now: f64,
    ) {
        let Some(node) = self.graph.node(node_id) else {
            return;
        };
        let old_data = node.data.clone();
        if old_data.get(key) == Some(&value) {
            return;
        }
        let mut new_data = old_data.clone();
        new_data.insert(key.to_string(), value);

        self.undo_history.push_action(UndoAction::DataChanged {
            node_id: node_id.clone(),
            old_data,
            new_data: new_data.clone(),
        });
        self.graph.update_node_data(node_id, new_data);
        self.mark_graph_changed(now);
    }
}

/// Selects all text in a text edit field using egui's internal state.
fn select_all_text_in_field(ui: &mut egui::Ui, field_id: egui::Id, len: usize) {
    ui.memory_mut(|mem| {
        let state = mem
            .data
            .get_temp_mut_or_default::<egui::text_edit::TextEditState>(field_id);
        state
            .cursor
            .set_char_range(Some(egui::text::CCursorRange::two(
                egui::text::CCursor::new(0),
                egui::text::CCursor::new(len),
            )));
    });
}
