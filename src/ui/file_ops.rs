//! File operations for saving and loading flows.
//!
//! Native file dialogs block, so they run on a short-lived thread and hand
//! their result back over a channel that `handle_pending_operations` drains
//! each frame. The UI thread never waits on a dialog.

use std::path::PathBuf;

use super::state::{
    FileOperationResult, FlowDesignerApp, PendingLoadOperation, PendingSaveOperation,
};
use crate::storage;
use crate::types::FlowGraph;
use eframe::egui;

impl FlowDesignerApp {
    /// Processes completed file operations and starts any newly requested
    /// ones.
    pub fn handle_pending_operations(&mut self, ctx: &egui::Context) {
        // Drain results from dialog threads first
        let mut results = Vec::new();
        if let Some(receiver) = &self.file.file_operation_receiver {
            while let Ok(result) = receiver.try_recv() {
                results.push(result);
            }
        }
        for result in results {
            match result {
                FileOperationResult::SaveCompleted(path) => {
                    self.file.current_path = Some(path);
                    self.file.has_unsaved_changes = false;
                }
                FileOperationResult::LoadCompleted(path, content) => {
                    match FlowGraph::from_json(&content) {
                        Ok(graph) => {
                            self.graph = graph;
                            self.file.current_path = Some(path);
                            self.file.has_unsaved_changes = false;
                            self.select_node(None);
                            self.interaction.selected_connection = None;
                            self.undo_history.clear();
                            self.validation.run_now(&self.graph);
                        }
                        Err(e) => {
                            log::error!("failed to parse flow file: {}", e);
                        }
                    }
                }
                FileOperationResult::OperationFailed(error) => {
                    log::error!("file operation failed: {}", error);
                }
            }
        }

        // Start a requested save
        if let Some(save_op) = self.file.pending_save_operation.take() {
            let ctx = ctx.clone();
            let graph = self.graph.clone();
            let sender = self.file.file_operation_sender.clone();

            match save_op {
                PendingSaveOperation::SaveAs => {
                    std::thread::spawn(move || {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("JSON", &["json"])
                            .set_file_name("flow.json")
                            .save_file()
                        {
                            send_save_result(&sender, &graph, path);
                        }
                        ctx.request_repaint();
                    });
                }
                PendingSaveOperation::Save => {
                    if let Some(path) = self.file.current_path.clone() {
                        std::thread::spawn(move || {
                            send_save_result(&sender, &graph, PathBuf::from(path));
                            ctx.request_repaint();
                        });
                    } else {
                        self.file.pending_save_operation = Some(PendingSaveOperation::SaveAs);
                    }
                }
            }
        }

        // Start a requested load
        if let Some(PendingLoadOperation::Load) = self.file.pending_load_operation.take() {
            let ctx = ctx.clone();
            let sender = self.file.file_operation_sender.clone();

            std::thread::spawn(move || {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("JSON", &["json"])
                    .pick_file()
                {
                    let result = match std::fs::read_to_string(&path) {
                        Ok(json) => FileOperationResult::LoadCompleted(
                            path.display().to_string(),
                            json,
                        ),
                        Err(e) => FileOperationResult::OperationFailed(format!(
                            "failed to read {}: {}",
                            path.display(),
                            e
                        )),
                    };
                    if let Some(tx) = sender {
                        let _ = tx.send(result);
                    }
                }
                ctx.request_repaint();
            });
        }
    }

    /// Opens a file dialog to save the flow under a new name.
    pub fn save_flow_as(&mut self) {
        self.file.pending_save_operation = Some(PendingSaveOperation::SaveAs);
    }

    /// Saves the flow to the current path, or falls back to "Save As" when
    /// no path is set yet.
    pub fn save_flow(&mut self) {
        if self.file.current_path.is_some() {
            self.file.pending_save_operation = Some(PendingSaveOperation::Save);
        } else {
            self.save_flow_as();
        }
    }

    /// Opens a file dialog to load a flow from disk.
    pub fn load_flow(&mut self) {
        self.file.pending_load_operation = Some(PendingLoadOperation::Load);
    }

    /// Resets the editor to a fresh flow containing only the start step.
    pub fn new_flow(&mut self) {
        self.graph = FlowGraph::new();
        self.graph.add_node(crate::types::StepKind::Start, (0.0, 0.0));
        self.file.current_path = None;
        self.file.has_unsaved_changes = false;
        self.select_node(None);
        self.interaction.selected_connection = None;
        self.undo_history.clear();
        self.canvas.offset = egui::Vec2::ZERO;
        self.canvas.zoom_factor = 1.0;
        self.canvas.centered = false;
        self.validation.run_now(&self.graph);
    }
}

fn send_save_result(
    sender: &Option<std::sync::mpsc::Sender<FileOperationResult>>,
    graph: &FlowGraph,
    path: PathBuf,
) {
    let result = match storage::save_flow(graph, &path) {
        Ok(()) => FileOperationResult::SaveCompleted(path.display().to_string()),
        Err(e) => FileOperationResult::OperationFailed(format!(
            "failed to save {}: {}",
            path.display(),
            e
        )),
    };
    if let Some(tx) = sender {
        let _ = tx.send(result);
    }
}
