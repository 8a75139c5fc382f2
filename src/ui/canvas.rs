//! Canvas interaction and navigation functionality.
//!
//! This module handles canvas panning, zooming, node dragging, connection
//! drawing from output anchors, and coordinate transformations between
//! screen and world space. Exactly one pointer gesture is active at a time
//! (see [`Gesture`]); every hit test goes through the same
//! screen-to-world conversion so zoom and pan never desynchronize from
//! picking.

use super::state::{FlowDesignerApp, Gesture};
use super::undo::UndoAction;
use crate::constants::{
    ANCHOR_RADIUS, CLICK_THRESHOLD, GRID_SIZE, MAX_ZOOM, MIN_ZOOM, NODE_HEIGHT, NODE_WIDTH,
};
use crate::types::NodeId;
use eframe::egui;

impl FlowDesignerApp {
    /// Converts screen coordinates to world coordinates accounting for zoom
    /// and pan.
    pub fn screen_to_world(&self, screen_pos: egui::Pos2) -> egui::Pos2 {
        (screen_pos - self.canvas.offset) / self.canvas.zoom_factor
    }

    /// Converts world coordinates to screen coordinates accounting for zoom
    /// and pan.
    pub fn world_to_screen(&self, world_pos: egui::Pos2) -> egui::Pos2 {
        world_pos * self.canvas.zoom_factor + self.canvas.offset
    }

    /// Snaps a position to the nearest grid point. Used for shift-dragging.
    pub fn snap_to_grid(&self, pos: egui::Pos2) -> egui::Pos2 {
        egui::pos2(
            (pos.x / GRID_SIZE).round() * GRID_SIZE,
            (pos.y / GRID_SIZE).round() * GRID_SIZE,
        )
    }

    /// Handles canvas panning.
    ///
    /// Panning starts on middle-button drag, or on primary drag over empty
    /// canvas when the toolbar pan-mode toggle is active.
    pub fn handle_canvas_panning(&mut self, ui: &mut egui::Ui, response: &egui::Response) {
        let middle_down = ui.input(|i| i.pointer.middle_down());
        let primary_down = ui.input(|i| i.pointer.primary_down());

        match &self.interaction.gesture {
            Gesture::Idle => {
                if let Some(pos) = response.interact_pointer_pos() {
                    let pan_with_primary = self.interaction.pan_mode
                        && primary_down
                        && self.find_node_at_position(self.screen_to_world(pos)).is_none();
                    if middle_down || pan_with_primary {
                        self.interaction.gesture = Gesture::Panning { last_pos: pos };
                    }
                }
            }
            Gesture::Panning { last_pos } => {
                if middle_down || primary_down {
                    if let Some(pos) = response.interact_pointer_pos() {
                        self.canvas.offset += pos - *last_pos;
                        self.interaction.gesture = Gesture::Panning { last_pos: pos };
                    }
                } else {
                    self.interaction.gesture = Gesture::Idle;
                }
            }
            _ => {}
        }
    }

    /// Handles scroll input over the canvas.
    ///
    /// Ctrl/Cmd+scroll zooms around the cursor with the zoom factor clamped
    /// to [`MIN_ZOOM`]..=[`MAX_ZOOM`]; plain scroll pans the canvas.
    pub fn handle_canvas_zoom(&mut self, ui: &mut egui::Ui, response: &egui::Response) {
        // Ctrl/Cmd+scroll (and pinch) arrives as a zoom factor, plain scroll
        // as a scroll delta; egui never reports both for the same wheel
        // event.
        let (scroll_delta, zoom_delta) = ui.input(|i| (i.smooth_scroll_delta, i.zoom_delta()));
        if scroll_delta == egui::Vec2::ZERO && zoom_delta == 1.0 {
            return;
        }

        let mouse_pos = ui
            .input(|i| i.pointer.hover_pos())
            .or_else(|| response.interact_pointer_pos());
        let Some(mouse_pos) = mouse_pos else {
            return;
        };
        if !response.rect.contains(mouse_pos) {
            return;
        }

        if zoom_delta != 1.0 {
            let step = if zoom_delta > 1.0 { 0.025 } else { -0.025 };
            self.zoom_around(mouse_pos, step);
        } else {
            // Plain scroll pans.
            self.canvas.offset += scroll_delta;
        }
    }

    /// Adjusts the zoom factor by `delta`, keeping the world point under
    /// `anchor` fixed on screen. The factor is clamped to the zoom bounds.
    pub fn zoom_around(&mut self, anchor: egui::Pos2, delta: f32) {
        let world_before = self.screen_to_world(anchor);
        let old_zoom = self.canvas.zoom_factor;
        self.canvas.zoom_factor = (old_zoom + delta).clamp(MIN_ZOOM, MAX_ZOOM);

        if (self.canvas.zoom_factor - old_zoom).abs() > f32::EPSILON {
            let world_after = self.world_to_screen(world_before);
            self.canvas.offset += anchor - world_after;
        }
    }

    /// Drives the node-drag / connection-draw / palette-drop gesture state
    /// machine for one frame.
    pub fn handle_pointer_gestures(&mut self, ui: &mut egui::Ui, response: &egui::Response) {
        let primary_down = ui.input(|i| i.pointer.primary_down());
        let pointer_pos = response.interact_pointer_pos();
        let now = ui.input(|i| i.time);

        match self.interaction.gesture.clone() {
            Gesture::Idle => {
                if primary_down && !self.interaction.pan_mode {
                    if let Some(pos) = pointer_pos {
                        if response.rect.contains(pos) {
                            self.begin_press(pos);
                        }
                    }
                }
            }
            Gesture::DraggingNode {
                node_id,
                grab_offset,
                original_position,
            } => {
                if primary_down {
                    if let Some(pos) = pointer_pos {
                        let mut world = self.screen_to_world(pos) + grab_offset;
                        if ui.input(|i| i.modifiers.shift) {
                            world = self.snap_to_grid(world);
                        }
                        self.graph.move_node(&node_id, (world.x, world.y));
                    }
                } else {
                    self.finish_node_drag(&node_id, original_position, now);
                }
            }
            Gesture::CreatingConnection { source } => {
                if primary_down {
                    self.interaction.connection_draw_pos = pointer_pos;
                } else {
                    let release = pointer_pos.or(self.interaction.connection_draw_pos);
                    if let Some(pos) = release {
                        self.finish_connection(&source, pos, now);
                    }
                    self.interaction.connection_draw_pos = None;
                    self.interaction.gesture = Gesture::Idle;
                }
            }
            Gesture::DraggingNewNode { kind } => {
                let any_down = ui.input(|i| i.pointer.any_down());
                if any_down {
                    self.interaction.connection_draw_pos = ui.input(|i| i.pointer.hover_pos());
                } else {
                    // Commit only when released over the canvas; a drop
                    // anywhere else silently discards the gesture.
                    let release = ui
                        .input(|i| i.pointer.hover_pos())
                        .or(self.interaction.connection_draw_pos);
                    if let Some(pos) = release {
                        if response.rect.contains(pos) {
                            let world = self.screen_to_world(pos);
                            self.commit_palette_drop(kind, (world.x, world.y), now);
                        }
                    }
                    self.interaction.connection_draw_pos = None;
                    self.interaction.gesture = Gesture::Idle;
                }
            }
            Gesture::Panning { .. } => {}
        }

        // A gesture whose pointer vanished without a release event is
        // abandoned rather than left stuck.
        if ui.input(|i| i.pointer.hover_pos()).is_none()
            && !ui.input(|i| i.pointer.any_down())
            && self.interaction.gesture != Gesture::Idle
        {
            self.abandon_gesture();
        }
    }

    /// Resolves a primary press at `pos` into the gesture it starts:
    /// connection drawing from an output anchor, node dragging from a node
    /// body, or selection changes for connections and empty space.
    fn begin_press(&mut self, pos: egui::Pos2) {
        let world = self.screen_to_world(pos);

        if let Some(source) = self.find_output_anchor_at(world) {
            self.interaction.gesture = Gesture::CreatingConnection { source };
            self.interaction.connection_draw_pos = Some(pos);
            return;
        }

        if let Some(node_id) = self.find_node_at_position(world) {
            if let Some(node) = self.graph.node(&node_id) {
                let center = egui::pos2(node.position.0, node.position.1);
                let original_position = node.position;
                self.select_node(Some(node_id.clone()));
                self.interaction.gesture = Gesture::DraggingNode {
                    grab_offset: center - world,
                    original_position,
                    node_id,
                };
            }
            return;
        }

        if let Some(index) = self.find_connection_at_position(world) {
            self.interaction.selected_connection = Some(index);
            self.select_node(None);
            return;
        }

        self.interaction.selected_connection = None;
        self.select_node(None);
    }

    /// Ends a node drag, recording an undo action when the node actually
    /// moved.
    fn finish_node_drag(&mut self, node_id: &NodeId, original_position: (f32, f32), now: f64) {
        if let Some(node) = self.graph.node(node_id) {
            let new_position = node.position;
            if new_position != original_position {
                self.undo_history.push_action(UndoAction::NodeMoved {
                    node_id: node_id.clone(),
                    old_position: original_position,
                    new_position,
                });
                self.mark_graph_changed(now);
            }
        }
        self.interaction.gesture = Gesture::Idle;
    }

    /// Commits a connection drawn from `source` if the release point lands
    /// on a different node's body. Invalid targets are discarded silently;
    /// the model's own rejection rules (duplicates, self-loops, unknown
    /// endpoints) also apply.
    fn finish_connection(&mut self, source: &NodeId, release_pos: egui::Pos2, now: f64) {
        let world = self.screen_to_world(release_pos);
        let Some(target) = self.find_node_at_position(world) else {
            return;
        };
        if self.graph.add_connection(source, &target) {
            self.undo_history.push_action(UndoAction::ConnectionCreated {
                source: source.clone(),
                target,
            });
            self.mark_graph_changed(now);
        }
    }

    /// Creates a node of `kind` at the palette-drop position and selects it.
    pub(super) fn commit_palette_drop(
        &mut self,
        kind: crate::types::StepKind,
        position: (f32, f32),
        now: f64,
    ) {
        let node_id = self.graph.add_node(kind, position);
        self.undo_history.push_action(UndoAction::NodeCreated {
            node_id: node_id.clone(),
        });
        self.select_node(Some(node_id));
        self.mark_graph_changed(now);
    }

    /// Abandons whatever gesture is in flight, reverting a dragged node to
    /// where it started.
    pub fn abandon_gesture(&mut self) {
        if let Gesture::DraggingNode {
            node_id,
            original_position,
            ..
        } = &self.interaction.gesture
        {
            let id = node_id.clone();
            let position = *original_position;
            self.graph.move_node(&id, position);
        }
        self.interaction.connection_draw_pos = None;
        self.interaction.gesture = Gesture::Idle;
    }

    /// Updates the selection, resetting any staged property edits so the
    /// panel repopulates for the new node.
    pub fn select_node(&mut self, node_id: Option<NodeId>) {
        if self.interaction.selected_node != node_id {
            self.interaction.editing_node_label = None;
            self.interaction.temp_label.clear();
            self.interaction.temp_attributes.clear();
            self.interaction.temp_attributes_node = None;
        }
        if node_id.is_some() {
            self.interaction.selected_connection = None;
        }
        self.interaction.selected_node = node_id;
        self.interaction.keyboard_focus = None;
    }

    /// Finds the node at the given world position, if any.
    ///
    /// Later nodes draw on top, so the scan runs back to front.
    pub fn find_node_at_position(&self, pos: egui::Pos2) -> Option<NodeId> {
        let node_size = egui::vec2(NODE_WIDTH, NODE_HEIGHT);
        self.graph
            .nodes
            .iter()
            .rev()
            .find(|node| {
                let center = egui::pos2(node.position.0, node.position.1);
                egui::Rect::from_center_size(center, node_size).contains(pos)
            })
            .map(|node| node.id.clone())
    }

    /// World position of a node's output anchor: the midpoint of its right
    /// edge.
    pub fn output_anchor_pos(&self, node: &crate::types::StepNode) -> egui::Pos2 {
        egui::pos2(node.position.0 + NODE_WIDTH / 2.0, node.position.1)
    }

    /// Finds the node whose output anchor contains the given world
    /// position, if any.
    pub fn find_output_anchor_at(&self, pos: egui::Pos2) -> Option<NodeId> {
        self.graph
            .nodes
            .iter()
            .rev()
            .find(|node| (self.output_anchor_pos(node) - pos).length() <= ANCHOR_RADIUS * 1.5)
            .map(|node| node.id.clone())
    }

    /// Finds the connection nearest the given world position within the
    /// click threshold, if any.
    pub fn find_connection_at_position(&self, pos: egui::Pos2) -> Option<usize> {
        for (index, connection) in self.graph.connections.iter().enumerate() {
            let (Some(source), Some(target)) = (
                self.graph.node(&connection.source),
                self.graph.node(&connection.target),
            ) else {
                continue;
            };
            let start = egui::pos2(source.position.0, source.position.1);
            let end = egui::pos2(target.position.0, target.position.1);
            if point_to_line_distance(pos, start, end) < CLICK_THRESHOLD {
                return Some(index);
            }
        }
        None
    }
}

/// Distance from a point to a line segment, via clamped projection.
fn point_to_line_distance(point: egui::Pos2, line_start: egui::Pos2, line_end: egui::Pos2) -> f32 {
    let line_vec = line_end - line_start;
    let point_vec = point - line_start;
    let line_len_sq = line_vec.length_sq();

    if line_len_sq < 0.0001 {
        // Segment is essentially a point
        return point_vec.length();
    }

    let t = (point_vec.dot(line_vec) / line_len_sq).clamp(0.0, 1.0);
    let projection = line_start + line_vec * t;
    (point - projection).length()
}
