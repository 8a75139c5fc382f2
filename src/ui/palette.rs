//! Step palette panel.
//!
//! The palette lists every step kind; dragging an entry onto the canvas
//! starts a [`Gesture::DraggingNewNode`] that the canvas commits on release.

use super::rendering::step_kind_fill;
use super::state::{FlowDesignerApp, Gesture};
use crate::types::StepKind;
use eframe::egui;

impl FlowDesignerApp {
    /// Draws the step palette in the left side panel.
    pub fn draw_palette(&mut self, ui: &mut egui::Ui) {
        ui.heading("Steps");
        ui.separator();
        ui.label("Drag a step onto the canvas");
        ui.add_space(4.0);

        for kind in StepKind::ALL {
            let entry = self.draw_palette_entry(ui, kind);
            if entry.drag_started() && self.interaction.gesture == Gesture::Idle {
                self.interaction.gesture = Gesture::DraggingNewNode { kind };
                self.interaction.connection_draw_pos = ui.input(|i| i.pointer.hover_pos());
            }
            ui.add_space(4.0);
        }
    }

    /// Draws one draggable palette entry and returns its response.
    fn draw_palette_entry(&self, ui: &mut egui::Ui, kind: StepKind) -> egui::Response {
        let desired = egui::vec2(ui.available_width(), 32.0);
        let (rect, response) = ui.allocate_exact_size(desired, egui::Sense::drag());

        if ui.is_rect_visible(rect) {
            let hovered = response.hovered();
            let fill = step_kind_fill(kind).gamma_multiply(if hovered { 1.0 } else { 0.85 });
            let stroke = if hovered {
                egui::Stroke::new(2.0, egui::Color32::DARK_GRAY)
            } else {
                egui::Stroke::new(1.0, egui::Color32::GRAY)
            };
            ui.painter().rect_filled(rect, 4.0, fill);
            ui.painter()
                .rect_stroke(rect, 4.0, stroke, eframe::epaint::StrokeKind::Inside);
            ui.painter().text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                kind.default_label(),
                egui::FontId::proportional(13.0),
                egui::Color32::BLACK,
            );
        }

        response.on_hover_cursor(egui::CursorIcon::Grab)
    }
}
