//! User interface components and rendering logic for the flow designer.
//!
//! This module contains all the UI-related code including the main
//! application struct, canvas rendering, property panels, context menus, and
//! user interaction handling.
//!
//! # Module Organization
//!
//! - `state` - Application state structures and the main FlowDesignerApp
//! - `canvas` - Canvas navigation, zooming, panning, and pointer gestures
//! - `rendering` - Drawing nodes, connections, grid, and previews
//! - `palette` - The step palette panel
//! - `properties` - Per-kind attribute forms for the selected step
//! - `undo` - Undo/redo actions and history
//! - `file_ops` - File save/load operations on background dialog threads

mod canvas;
mod file_ops;
mod palette;
mod properties;
mod rendering;
mod state;
mod undo;


pub use state::FlowDesignerApp;
pub use undo::{UndoAction, UndoableGraph};

use self::state::PendingConfirmAction;
use crate::constants::ZOOM_STEP;
use crate::layout::{layout, LayoutDirection};
use crate::types::Connection;
use eframe::egui;

impl eframe::App for FlowDesignerApp {
    /// Persist entire app state between restarts.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        match self.to_json() {
            Ok(json) => {
                storage.set_string("app_state", json);
            }
            Err(err) => {
                log::error!("failed to serialize app state: {err}");
            }
        }
    }

    /// Main update function called by egui for each frame.
    ///
    /// Handles the overall UI layout: toolbar, palette, properties panel,
    /// validation banner, and the main canvas area, plus global keyboard
    /// shortcuts and the debounced validation pass.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let visuals = if self.dark_mode {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        };
        ctx.set_visuals(visuals);

        self.handle_pending_operations(ctx);
        self.handle_undo_redo_keys(ctx);
        self.handle_delete_key(ctx);
        self.handle_file_shortcuts(ctx);
        self.handle_zoom_keys(ctx);
        self.handle_keyboard_navigation(ctx);

        // Intercept native window close requests (titlebar X)
        if ctx.input(|i| i.viewport().close_requested()) {
            if self.file.has_unsaved_changes && !self.file.allow_close_on_next_request {
                ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
                if !self.file.show_unsaved_dialog {
                    self.file.show_unsaved_dialog = true;
                    self.file.pending_confirm_action = Some(PendingConfirmAction::Quit);
                }
            } else {
                self.file.allow_close_on_next_request = false;
            }
        }

        // Restore native window size once per session
        if !self.applied_viewport_restore {
            if let Some((w, h)) = self.window_inner_size {
                ctx.send_viewport_cmd(egui::ViewportCommand::InnerSize(egui::vec2(w, h)));
            }
            self.applied_viewport_restore = true;
        }
        let size = ctx.input(|i| i.content_rect().size());
        self.window_inner_size = Some((size.x, size.y));

        // Run a pending validation pass once the graph has been quiet long
        // enough, and keep repainting while one is scheduled
        let now = ctx.input(|i| i.time);
        self.validation.run_if_due(&self.graph, now);
        if self.validation.is_pending() {
            ctx.request_repaint_after(std::time::Duration::from_millis(50));
        }

        egui::TopBottomPanel::top("top_toolbar").show(ctx, |ui| {
            self.draw_toolbar(ui);
        });

        if !self.validation.findings.is_empty() {
            egui::TopBottomPanel::bottom("validation_banner").show(ctx, |ui| {
                self.draw_validation_banner(ui);
            });
        }

        egui::SidePanel::left("palette_panel")
            .resizable(false)
            .default_width(160.0)
            .show(ctx, |ui| {
                self.draw_palette(ui);
            });

        // Use remembered width when available, but clamp to viewport
        let viewport_width = ctx.input(|i| i.content_rect().width());
        let clamped_width = self
            .properties_panel_width
            .clamp(180.0, (viewport_width * 0.9).max(180.0));

        egui::SidePanel::right("properties_panel")
            .resizable(true)
            .default_width(clamped_width)
            .show(ctx, |ui| {
                let current_width = ui.available_width();
                let max_allowed = (viewport_width * 0.9).max(180.0);
                self.properties_panel_width = current_width.clamp(180.0, max_allowed);
                self.draw_properties_contents(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_canvas(ui);
        });

        // Unsaved changes confirmation dialog
        if self.file.show_unsaved_dialog {
            let title = match self.file.pending_confirm_action {
                Some(PendingConfirmAction::Quit) => "Unsaved changes — Quit?",
                Some(PendingConfirmAction::New) => "Unsaved changes — Create New?",
                Some(PendingConfirmAction::Open) => "Unsaved changes — Open File?",
                None => "Unsaved changes",
            };
            egui::Window::new(title)
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
                .show(ctx, |ui| {
                    ui.label("You have unsaved changes. Are you sure you want to continue?");
                    ui.horizontal(|ui| {
                        let confirm_label = match self.file.pending_confirm_action {
                            Some(PendingConfirmAction::Quit) => "Discard and Quit",
                            Some(PendingConfirmAction::New) => "Discard and Create New",
                            Some(PendingConfirmAction::Open) => "Discard and Open",
                            None => "Discard",
                        };
                        if ui.button(confirm_label).clicked() {
                            match self.file.pending_confirm_action {
                                Some(PendingConfirmAction::New) => {
                                    self.new_flow();
                                }
                                Some(PendingConfirmAction::Open) => {
                                    self.load_flow();
                                }
                                Some(PendingConfirmAction::Quit) => {
                                    // Allow one close request through
                                    self.file.allow_close_on_next_request = true;
                                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                                }
                                None => {}
                            }
                            self.file.show_unsaved_dialog = false;
                            self.file.pending_confirm_action = None;
                        }
                        if ui.button("Cancel").clicked() {
                            self.file.show_unsaved_dialog = false;
                            self.file.pending_confirm_action = None;
                        }
                    });
                });
        }
    }
}

impl FlowDesignerApp {
    /// Marks the graph as mutated: flags unsaved changes and schedules a
    /// debounced validation pass.
    pub fn mark_graph_changed(&mut self, now: f64) {
        self.file.has_unsaved_changes = true;
        self.validation.schedule(now);
    }

    fn handle_file_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let mut request_quit = false;
        ctx.input(|i| {
            let cmd = i.modifiers.command;
            let shift = i.modifiers.shift;
            // Save As: Cmd/Ctrl+Shift+S
            if i.key_pressed(egui::Key::S) && cmd && shift {
                self.save_flow_as();
            }
            // Save: Cmd/Ctrl+S
            else if i.key_pressed(egui::Key::S) && cmd {
                self.save_flow();
            }
            // Open: Cmd/Ctrl+O
            if i.key_pressed(egui::Key::O) && cmd {
                if self.file.has_unsaved_changes {
                    self.file.show_unsaved_dialog = true;
                    self.file.pending_confirm_action = Some(PendingConfirmAction::Open);
                } else {
                    self.load_flow();
                }
            }
            // New: Cmd/Ctrl+N
            if i.key_pressed(egui::Key::N) && cmd {
                if self.file.has_unsaved_changes {
                    self.file.show_unsaved_dialog = true;
                    self.file.pending_confirm_action = Some(PendingConfirmAction::New);
                } else {
                    self.new_flow();
                }
            }
            // Quit: Cmd/Ctrl+Q
            if i.key_pressed(egui::Key::Q) && cmd {
                if self.file.has_unsaved_changes {
                    self.file.show_unsaved_dialog = true;
                    self.file.pending_confirm_action = Some(PendingConfirmAction::Quit);
                } else {
                    request_quit = true;
                }
            }
        });
        if request_quit {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }

    /// Handles undo/redo keyboard shortcuts.
    fn handle_undo_redo_keys(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        // Ctrl+Z for undo
        if ctx.input(|i| i.key_pressed(egui::Key::Z) && i.modifiers.command && !i.modifiers.shift)
        {
            self.perform_undo();
        }
        // Ctrl+Shift+Z or Ctrl+Y for redo
        else if ctx.input(|i| {
            (i.key_pressed(egui::Key::Z) && i.modifiers.command && i.modifiers.shift)
                || (i.key_pressed(egui::Key::Y) && i.modifiers.command)
        }) {
            self.perform_redo();
        }
    }

    /// Handles Ctrl +/- keyboard zoom, anchored at the canvas center.
    fn handle_zoom_keys(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let (zoom_in, zoom_out) = ctx.input(|i| {
            let cmd = i.modifiers.command || i.modifiers.ctrl;
            (
                cmd && (i.key_pressed(egui::Key::Plus) || i.key_pressed(egui::Key::Equals)),
                cmd && i.key_pressed(egui::Key::Minus),
            )
        });
        if zoom_in || zoom_out {
            let anchor = ctx.input(|i| i.content_rect().center());
            let delta = if zoom_in { ZOOM_STEP } else { -ZOOM_STEP };
            self.zoom_around(anchor, delta);
        }
    }

    /// Handles delete/backspace presses to remove the current selection.
    ///
    /// The start step is protected: the model rejects its removal and the
    /// press is a silent no-op.
    fn handle_delete_key(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let pressed = ctx.input(|i| {
            i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace)
        });
        if !pressed {
            return;
        }
        let now = ctx.input(|i| i.time);

        if let Some(selected_node) = self.interaction.selected_node.clone() {
            // Capture the node, its list index, and its connections for undo
            // before the cascade removes them
            let snapshot = self
                .graph
                .nodes
                .iter()
                .position(|n| n.id == selected_node)
                .and_then(|index| self.graph.node(&selected_node).cloned().map(|n| (index, n)));
            let connections: Vec<Connection> = self
                .graph
                .connections
                .iter()
                .filter(|c| c.source == selected_node || c.target == selected_node)
                .cloned()
                .collect();

            if self.graph.remove_node(&selected_node) {
                if let Some((index, node)) = snapshot {
                    self.undo_history.push_action(UndoAction::NodeDeleted {
                        node,
                        index,
                        connections,
                    });
                }
                self.select_node(None);
                self.mark_graph_changed(now);
            }
        } else if let Some(conn_idx) = self.interaction.selected_connection {
            if let Some(connection) = self.graph.connections.get(conn_idx).cloned() {
                if let Some((index, connection)) = self.graph.remove_connection(&connection.id) {
                    self.undo_history.push_action(UndoAction::ConnectionDeleted {
                        connection,
                        index,
                    });
                    self.interaction.selected_connection = None;
                    self.mark_graph_changed(now);
                }
            }
        }
    }

    /// Drives the keyboard focus overlay: Tab enters focus mode, arrow keys
    /// move focus through the node list, Enter selects the focused node,
    /// Escape exits (and abandons any in-flight gesture).
    fn handle_keyboard_navigation(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.interaction.keyboard_focus = None;
            self.abandon_gesture();
            return;
        }

        let node_count = self.graph.nodes.len();
        if node_count == 0 {
            self.interaction.keyboard_focus = None;
            return;
        }

        if ctx.input(|i| i.key_pressed(egui::Key::Tab)) {
            let shift = ctx.input(|i| i.modifiers.shift);
            self.interaction.keyboard_focus = Some(match self.interaction.keyboard_focus {
                None => 0,
                Some(i) if shift => (i + node_count - 1) % node_count,
                Some(i) => (i + 1) % node_count,
            });
        }

        if let Some(focus) = self.interaction.keyboard_focus {
            let forward = ctx.input(|i| {
                i.key_pressed(egui::Key::ArrowRight) || i.key_pressed(egui::Key::ArrowDown)
            });
            let backward = ctx.input(|i| {
                i.key_pressed(egui::Key::ArrowLeft) || i.key_pressed(egui::Key::ArrowUp)
            });
            if forward {
                self.interaction.keyboard_focus = Some((focus + 1) % node_count);
            } else if backward {
                self.interaction.keyboard_focus = Some((focus + node_count - 1) % node_count);
            }

            if ctx.input(|i| i.key_pressed(egui::Key::Enter)) {
                let id = self
                    .graph
                    .nodes
                    .get(self.interaction.keyboard_focus.unwrap_or(focus))
                    .map(|n| n.id.clone());
                if let Some(id) = id {
                    let focus = self.interaction.keyboard_focus;
                    self.select_node(Some(id));
                    // select_node clears focus mode; keep it so navigation
                    // can continue from the same place
                    self.interaction.keyboard_focus = focus;
                }
            }
        }
    }

    /// Renders the toolbar with file operations, undo/redo, layout controls,
    /// and view options.
    fn draw_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            // File operations
            if ui.button("New").clicked() {
                if self.file.has_unsaved_changes {
                    self.file.show_unsaved_dialog = true;
                    self.file.pending_confirm_action = Some(PendingConfirmAction::New);
                } else {
                    self.new_flow();
                }
            }
            if ui.button("Open").clicked() {
                if self.file.has_unsaved_changes {
                    self.file.show_unsaved_dialog = true;
                    self.file.pending_confirm_action = Some(PendingConfirmAction::Open);
                } else {
                    self.load_flow();
                }
            }
            if ui.button("Save").clicked() {
                self.save_flow();
            }
            if ui.button("Save As").clicked() {
                self.save_flow_as();
            }

            ui.separator();

            ui.add_enabled_ui(self.undo_history.can_undo(), |ui| {
                if ui.button("⟲ Undo").clicked() {
                    self.perform_undo();
                }
            });
            ui.add_enabled_ui(self.undo_history.can_redo(), |ui| {
                if ui.button("⟳ Redo").clicked() {
                    self.perform_redo();
                }
            });

            ui.separator();

            // Auto-arrange apply button + combo box to choose direction
            if ui.button("Auto Arrange").clicked() {
                self.apply_auto_arrange(ui.input(|i| i.time));
            }
            egui::ComboBox::from_id_salt("layout_direction_combo")
                .selected_text(match self.layout_direction {
                    LayoutDirection::Horizontal => "Horizontal",
                    LayoutDirection::Vertical => "Vertical",
                    LayoutDirection::Auto => "Auto",
                })
                .show_ui(ui, |ui| {
                    ui.selectable_value(
                        &mut self.layout_direction,
                        LayoutDirection::Horizontal,
                        "Horizontal",
                    );
                    ui.selectable_value(
                        &mut self.layout_direction,
                        LayoutDirection::Vertical,
                        "Vertical",
                    );
                    ui.selectable_value(&mut self.layout_direction, LayoutDirection::Auto, "Auto");
                });

            ui.separator();

            // View options
            ui.checkbox(&mut self.interaction.pan_mode, "Pan Mode");
            ui.checkbox(&mut self.canvas.show_grid, "Show Grid");
            ui.checkbox(&mut self.dark_mode, "Dark Mode");

            ui.separator();

            let finding_count = self.validation.findings.len();
            if finding_count > 0 {
                ui.colored_label(
                    egui::Color32::from_rgb(200, 120, 40),
                    format!("⚠ {} finding(s)", finding_count),
                );
            } else {
                ui.colored_label(egui::Color32::from_rgb(60, 160, 60), "✔ Valid");
            }

            // Current file and unsaved changes indicator
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if let Some(file_path) = &self.file.current_path {
                    let status = if self.file.has_unsaved_changes { "*" } else { "" };
                    ui.label(format!("{}{}", file_path, status));
                } else {
                    let status = if self.file.has_unsaved_changes {
                        "Untitled*"
                    } else {
                        "Untitled"
                    };
                    ui.label(status);
                }

                ui.label(format!("Zoom: {:.0}%", self.canvas.zoom_factor * 100.0));
            });
        });
    }

    /// Renders the non-blocking validation banner. Clicking a finding
    /// selects its first offending node.
    fn draw_validation_banner(&mut self, ui: &mut egui::Ui) {
        let findings = self.validation.findings.clone();
        for finding in &findings {
            ui.horizontal(|ui| {
                let text = format!("⚠ {}: {}", finding.title, finding.message);
                let response = ui.add(
                    egui::Label::new(
                        egui::RichText::new(text).color(egui::Color32::from_rgb(200, 120, 40)),
                    )
                    .sense(egui::Sense::click()),
                );
                if response.clicked() {
                    if let Some(id) = finding.node_ids.first() {
                        self.select_node(Some(id.clone()));
                    }
                }
            });
        }
    }

    /// Renders the right-click context menu for creating nodes.
    fn draw_context_menu(&mut self, ui: &mut egui::Ui) {
        let screen_pos = egui::pos2(
            self.context_menu.screen_pos.0,
            self.context_menu.screen_pos.1,
        );
        let world_pos = self.context_menu.world_pos;
        let now = ui.input(|i| i.time);

        let area_response = egui::Area::new(egui::Id::new("context_menu"))
            .fixed_pos(screen_pos)
            .show(ui.ctx(), |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.vertical(|ui| {
                        ui.label("Create Step:");
                        ui.separator();

                        for kind in crate::types::StepKind::ALL {
                            if ui.button(kind.default_label()).clicked() {
                                self.commit_palette_drop(kind, world_pos, now);
                                self.context_menu.show = false;
                            }
                        }

                        ui.separator();
                        if ui.button("Cancel").clicked() {
                            self.context_menu.show = false;
                        }
                    });
                })
            });

        // Close on click outside, after the first frame
        if !self.context_menu.just_opened && ui.input(|i| i.pointer.primary_clicked()) {
            if let Some(click_pos) = ui.input(|i| i.pointer.interact_pos()) {
                if !area_response.response.rect.contains(click_pos) {
                    self.context_menu.show = false;
                }
            }
        }

        self.context_menu.just_opened = false;
    }

    /// Renders the main canvas area and drives pointer gestures.
    pub fn draw_canvas(&mut self, ui: &mut egui::Ui) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());

        // Center the origin on the first frame
        if !self.canvas.centered {
            self.canvas.centered = true;
            if self.canvas.offset == egui::Vec2::ZERO {
                self.canvas.offset = response.rect.center().to_vec2();
            }
        }

        self.handle_canvas_panning(ui, &response);
        self.handle_canvas_zoom(ui, &response);
        self.handle_pointer_gestures(ui, &response);

        // Right-click for context menu
        if response.secondary_clicked() {
            if let Some(screen_pos) = response.interact_pointer_pos() {
                let world_pos = self.screen_to_world(screen_pos);
                self.context_menu.screen_pos = (screen_pos.x, screen_pos.y);
                self.context_menu.world_pos = (world_pos.x, world_pos.y);
                self.context_menu.show = true;
                self.context_menu.just_opened = true;
            }
        }

        self.render_flow_elements(&painter, response.rect);

        if self.context_menu.show {
            self.draw_context_menu(ui);
        }
    }

    /// Performs an undo operation.
    pub fn perform_undo(&mut self) {
        if let Some(action) = self.undo_history.pop_undo() {
            if let Some(redo_action) = self.graph.apply_undo(&action) {
                self.undo_history.push_redo(redo_action);
                self.file.has_unsaved_changes = true;
                self.select_node(None);
                self.interaction.selected_connection = None;
                self.validation.run_now(&self.graph);
            }
        }
    }

    /// Performs a redo operation.
    pub fn perform_redo(&mut self) {
        if let Some(action) = self.undo_history.pop_redo() {
            if let Some(undo_action) = self.graph.apply_undo(&action) {
                // push_undo, not push_action: the redo stack must survive
                self.undo_history.push_undo(undo_action);
                self.file.has_unsaved_changes = true;
                self.select_node(None);
                self.interaction.selected_connection = None;
                self.validation.run_now(&self.graph);
            }
        }
    }

    /// Applies the tiered layout to every node, recording a single combined
    /// undo action for the whole rearrangement.
    pub fn apply_auto_arrange(&mut self, now: f64) {
        let arranged = layout(&self.graph, self.layout_direction);

        let mut old_positions = Vec::new();
        let mut new_positions = Vec::new();
        for node in &arranged {
            if let Some(current) = self.graph.node(&node.id) {
                if current.position != node.position {
                    old_positions.push((node.id.clone(), current.position));
                    new_positions.push((node.id.clone(), node.position));
                }
            }
        }
        if new_positions.is_empty() {
            return;
        }

        self.undo_history.push_action(UndoAction::MultipleNodesMoved {
            old_positions,
            new_positions: new_positions.clone(),
        });
        for (id, position) in new_positions {
            self.graph.move_node(&id, position);
        }
        self.mark_graph_changed(now);
    }
}
