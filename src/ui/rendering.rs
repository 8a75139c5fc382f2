//! Canvas rendering functionality for step nodes, connections, and grid.
//!
//! This module handles all drawing operations including grid background,
//! connection lines with directional arrows, connection previews while a
//! connection is being drawn from an output anchor, and node visualization.

use super::state::{FlowDesignerApp, Gesture};
use crate::constants::{ANCHOR_RADIUS, NODE_HEIGHT, NODE_WIDTH};
use crate::types::{Connection, StepKind, StepNode};
use eframe::egui;
use eframe::epaint::StrokeKind;

impl FlowDesignerApp {
    /// Renders all flow elements (grid, connections, and nodes) on the canvas.
    ///
    /// Elements are drawn in layers: grid first (background), then connections,
    /// then nodes (foreground), ensuring proper visual hierarchy.
    pub fn render_flow_elements(&self, painter: &egui::Painter, canvas_rect: egui::Rect) {
        if self.canvas.show_grid {
            self.draw_grid(painter, canvas_rect);
        }

        // Connections behind nodes
        for (idx, connection) in self.graph.connections.iter().enumerate() {
            let is_selected = self.interaction.selected_connection == Some(idx);
            self.draw_connection(painter, connection, is_selected);
        }

        // Connection preview while drawing from an output anchor
        if let Gesture::CreatingConnection { source } = &self.interaction.gesture {
            if let Some(draw_pos) = self.interaction.connection_draw_pos {
                self.draw_connection_preview(painter, source, draw_pos);
            }
        }

        // Nodes on top
        for node in &self.graph.nodes {
            self.draw_node(painter, node);
        }

        // Ghost of the step being dragged in from the palette
        if let Gesture::DraggingNewNode { kind } = &self.interaction.gesture {
            if let Some(pos) = self.interaction.connection_draw_pos {
                self.draw_palette_ghost(painter, *kind, pos, canvas_rect);
            }
        }
    }

    /// Draws a zoom-aware grid on the canvas for visual reference.
    ///
    /// Grid lines are drawn every 20 world units. The grid automatically
    /// adjusts for zoom level and only draws when the grid spacing is
    /// visible.
    pub fn draw_grid(&self, painter: &egui::Painter, canvas_rect: egui::Rect) {
        let grid_size = crate::constants::GRID_SIZE;
        let grid_color = egui::Color32::from_rgba_unmultiplied(128, 128, 128, 32);
        let stroke = egui::Stroke::new(1.0, grid_color);

        // World space bounds of the visible area
        let top_left_world = self.screen_to_world(canvas_rect.min);
        let bottom_right_world = self.screen_to_world(canvas_rect.max);

        let start_x = (top_left_world.x / grid_size).floor() * grid_size;
        let end_x = (bottom_right_world.x / grid_size).ceil() * grid_size;
        let start_y = (top_left_world.y / grid_size).floor() * grid_size;
        let end_y = (bottom_right_world.y / grid_size).ceil() * grid_size;

        // Skip when the grid would be too dense to read
        let screen_grid_size = grid_size * self.canvas.zoom_factor;
        if screen_grid_size < 2.0 {
            return;
        }

        let mut x = start_x;
        while x <= end_x {
            let screen_x = self.world_to_screen(egui::pos2(x, 0.0)).x;
            if screen_x >= canvas_rect.min.x && screen_x <= canvas_rect.max.x {
                painter.line_segment(
                    [
                        egui::pos2(screen_x, canvas_rect.min.y),
                        egui::pos2(screen_x, canvas_rect.max.y),
                    ],
                    stroke,
                );
            }
            x += grid_size;
        }

        let mut y = start_y;
        while y <= end_y {
            let screen_y = self.world_to_screen(egui::pos2(0.0, y)).y;
            if screen_y >= canvas_rect.min.y && screen_y <= canvas_rect.max.y {
                painter.line_segment(
                    [
                        egui::pos2(canvas_rect.min.x, screen_y),
                        egui::pos2(canvas_rect.max.x, screen_y),
                    ],
                    stroke,
                );
            }
            y += grid_size;
        }
    }

    /// Renders a connection between two steps with a directional arrow.
    pub fn draw_connection(
        &self,
        painter: &egui::Painter,
        connection: &Connection,
        is_selected: bool,
    ) {
        let start_world = self
            .graph
            .node(&connection.source)
            .map(|n| egui::pos2(n.position.0, n.position.1))
            .unwrap_or_else(|| egui::pos2(0.0, 0.0));
        let start_pos = self.world_to_screen(start_world);

        let end_world = self
            .graph
            .node(&connection.target)
            .map(|n| egui::pos2(n.position.0, n.position.1))
            .unwrap_or_else(|| egui::pos2(100.0, 100.0));
        let end_pos = self.world_to_screen(end_world);

        let (line_color, line_width) = if is_selected {
            (egui::Color32::from_rgb(100, 150, 255), 3.0)
        } else {
            (egui::Color32::DARK_GRAY, 2.0)
        };

        painter.line_segment(
            [start_pos, end_pos],
            egui::Stroke::new(line_width, line_color),
        );

        self.draw_arrow_at_center(painter, start_pos, end_pos, line_color);
    }

    /// Draws a directional arrow at the center of a connection line.
    ///
    /// The arrow is a filled triangle pointing from source to target, scaled
    /// with the current zoom level.
    fn draw_arrow_at_center(
        &self,
        painter: &egui::Painter,
        start: egui::Pos2,
        end: egui::Pos2,
        color: egui::Color32,
    ) {
        let center = start + (end - start) * 0.5;
        let direction = (end - start).normalized();

        let arrow_size = 8.0 * self.canvas.zoom_factor;
        let arrow_width = 6.0 * self.canvas.zoom_factor;
        let perpendicular = egui::vec2(-direction.y, direction.x);

        let arrow_tip = center + direction * arrow_size;
        let arrow_left = center - direction * arrow_size + perpendicular * arrow_width;
        let arrow_right = center - direction * arrow_size - perpendicular * arrow_width;

        painter.add(egui::Shape::convex_polygon(
            vec![arrow_tip, arrow_left, arrow_right],
            color,
            egui::Stroke::NONE,
        ));
    }

    /// Renders a preview of the connection being drawn from an output anchor.
    ///
    /// Shows a line from the source node's output anchor to the current
    /// pointer position. The line is blue when the pointer is over a target
    /// the model would accept and red over a target it would reject
    /// (self-loop or duplicate).
    pub fn draw_connection_preview(
        &self,
        painter: &egui::Painter,
        source_id: &str,
        to_screen_pos: egui::Pos2,
    ) {
        let Some(source) = self.graph.node(source_id) else {
            return;
        };
        let from_screen = self.world_to_screen(self.output_anchor_pos(source));

        let to_world = self.screen_to_world(to_screen_pos);
        let is_valid = match self.find_node_at_position(to_world) {
            Some(target_id) => {
                target_id != source_id
                    && !self
                        .graph
                        .connections
                        .iter()
                        .any(|c| c.source == source_id && c.target == target_id)
            }
            // No target yet; show as potentially valid
            None => true,
        };

        let color = if is_valid {
            egui::Color32::from_rgb(100, 150, 255)
        } else {
            egui::Color32::from_rgb(255, 80, 80)
        };

        painter.line_segment([from_screen, to_screen_pos], egui::Stroke::new(2.0, color));
        painter.circle_filled(to_screen_pos, 4.0, color);
    }

    /// Renders a single step node with kind-specific styling and its label.
    ///
    /// Nodes are color-coded by step kind. Selected nodes have a yellow
    /// border, the node under an active drag has an orange border, the
    /// keyboard-focused node has a blue border, and nodes flagged by open
    /// validation findings get a red border.
    pub fn draw_node(&self, painter: &egui::Painter, node: &StepNode) {
        let node_size = egui::vec2(NODE_WIDTH, NODE_HEIGHT);

        let world_pos = egui::pos2(node.position.0, node.position.1);
        let screen_pos = self.world_to_screen(world_pos);
        let scaled_size = node_size * self.canvas.zoom_factor;
        let rect = egui::Rect::from_center_size(screen_pos, scaled_size);

        let dragging = matches!(
            &self.interaction.gesture,
            Gesture::DraggingNode { node_id, .. } if *node_id == node.id
        );

        let mut color = step_kind_fill(node.kind);
        if dragging {
            color = egui::Color32::from_rgba_unmultiplied(
                (color.r() as f32 * 0.8) as u8,
                (color.g() as f32 * 0.8) as u8,
                (color.b() as f32 * 0.8) as u8,
                color.a(),
            );
        }

        painter.rect_filled(rect, 5.0, color);

        let keyboard_focused = self
            .interaction
            .keyboard_focus
            .and_then(|i| self.graph.nodes.get(i))
            .is_some_and(|focused| focused.id == node.id);
        let flagged = self
            .validation
            .findings
            .iter()
            .any(|f| f.node_ids.iter().any(|id| *id == node.id));

        let (stroke_color, stroke_width) = if dragging {
            (egui::Color32::from_rgb(255, 165, 0), 4.0)
        } else if self.interaction.selected_node.as_deref() == Some(node.id.as_str()) {
            (egui::Color32::YELLOW, 3.0)
        } else if keyboard_focused {
            (egui::Color32::from_rgb(100, 150, 255), 3.0)
        } else if flagged {
            (egui::Color32::from_rgb(200, 60, 60), 2.0)
        } else {
            (egui::Color32::BLACK, 2.0)
        };

        painter.rect_stroke(
            rect,
            5.0,
            egui::Stroke::new(stroke_width, stroke_color),
            StrokeKind::Outside,
        );

        self.draw_output_anchor(painter, node);
        self.draw_node_text(painter, node, screen_pos, scaled_size);
    }

    /// Draws the output anchor on the node's right edge. Connections are
    /// started by dragging from this circle.
    fn draw_output_anchor(&self, painter: &egui::Painter, node: &StepNode) {
        let anchor_screen = self.world_to_screen(self.output_anchor_pos(node));
        let radius = ANCHOR_RADIUS * self.canvas.zoom_factor;
        painter.circle_filled(anchor_screen, radius, egui::Color32::WHITE);
        painter.circle_stroke(
            anchor_screen,
            radius,
            egui::Stroke::new(1.5, egui::Color32::DARK_GRAY),
        );
    }

    /// Draws the translucent preview of a step dragged in from the palette.
    fn draw_palette_ghost(
        &self,
        painter: &egui::Painter,
        kind: StepKind,
        pointer: egui::Pos2,
        canvas_rect: egui::Rect,
    ) {
        let size = egui::vec2(NODE_WIDTH, NODE_HEIGHT) * self.canvas.zoom_factor;
        let rect = egui::Rect::from_center_size(pointer, size);

        let inside = canvas_rect.contains(pointer);
        let fill = step_kind_fill(kind).gamma_multiply(if inside { 0.6 } else { 0.3 });
        painter.rect_filled(rect, 5.0, fill);
        painter.rect_stroke(
            rect,
            5.0,
            egui::Stroke::new(1.5, egui::Color32::DARK_GRAY),
            StrokeKind::Outside,
        );

        let font_size = (12.0 * self.canvas.zoom_factor).clamp(8.0, 48.0);
        painter.text(
            pointer,
            egui::Align2::CENTER_CENTER,
            kind.default_label(),
            egui::FontId::proportional(font_size),
            egui::Color32::BLACK,
        );
    }

    /// Renders the node's label text with wrapping and vertical centering.
    ///
    /// Font size scales with zoom level for readability.
    fn draw_node_text(
        &self,
        painter: &egui::Painter,
        node: &StepNode,
        pos: egui::Pos2,
        size: egui::Vec2,
    ) {
        let text_rect = egui::Rect::from_center_size(
            pos,
            egui::vec2(
                size.x - 10.0 * self.canvas.zoom_factor,
                size.y - 16.0 * self.canvas.zoom_factor,
            ),
        );

        let base_font_size = 12.0;
        let scaled_font_size = (base_font_size * self.canvas.zoom_factor).clamp(8.0, 48.0);
        let font_id = egui::FontId::proportional(scaled_font_size);

        let max_width = text_rect.width();
        let wrapped_text = self.wrap_text(node.label(), max_width, &font_id, painter);

        let line_height = painter
            .layout_no_wrap(" ".to_string(), font_id.clone(), egui::Color32::BLACK)
            .size()
            .y;
        let total_height = line_height * wrapped_text.len() as f32;
        let start_y = text_rect.center().y - total_height / 2.0;

        for (i, line) in wrapped_text.iter().enumerate() {
            let line_pos = egui::pos2(text_rect.center().x, start_y + i as f32 * line_height);
            painter.text(
                line_pos,
                egui::Align2::CENTER_CENTER,
                line,
                font_id.clone(),
                egui::Color32::BLACK,
            );
        }
    }

    /// Wraps text to fit within the specified width, returning a vector of
    /// lines.
    ///
    /// Breaks text at word boundaries. If a single word is too long, it is
    /// placed on its own line anyway.
    pub fn wrap_text(
        &self,
        text: &str,
        max_width: f32,
        font_id: &egui::FontId,
        painter: &egui::Painter,
    ) -> Vec<String> {
        let mut lines = Vec::new();
        let words: Vec<&str> = text.split_whitespace().collect();

        if words.is_empty() {
            return vec![text.to_string()];
        }

        let mut current_line = String::new();

        for word in words {
            let test_line = if current_line.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current_line, word)
            };

            let text_width = painter
                .layout_no_wrap(test_line.clone(), font_id.clone(), egui::Color32::BLACK)
                .size()
                .x;

            if text_width <= max_width {
                current_line = test_line;
            } else if !current_line.is_empty() {
                lines.push(current_line);
                current_line = word.to_string();
            } else {
                // Single word too long, add it anyway
                lines.push(word.to_string());
            }
        }

        if !current_line.is_empty() {
            lines.push(current_line);
        }

        if lines.is_empty() {
            lines.push(text.to_string());
        }

        lines
    }
}

/// Fill color for a step kind on the canvas and in palette ghosts.
pub fn step_kind_fill(kind: StepKind) -> egui::Color32 {
    match kind {
        StepKind::Start => egui::Color32::LIGHT_GREEN,
        StepKind::DocumentOcr => egui::Color32::from_rgb(174, 214, 241),
        StepKind::Biometric => egui::Color32::from_rgb(213, 189, 235),
        StepKind::ListCheck => egui::Color32::from_rgb(250, 215, 160),
        StepKind::ManualReview => egui::Color32::from_rgb(245, 183, 177),
        StepKind::Decision => egui::Color32::from_rgb(249, 231, 159),
        StepKind::MessageStep => egui::Color32::from_rgb(171, 235, 198),
        StepKind::End => egui::Color32::LIGHT_RED,
    }
}
