//! # Flow Designer
//!
//! A visual editor for KYC/KYB onboarding flows: directed graphs of
//! verification steps connected by transitions. Flows start at a single
//! protected start step and are built up from a palette of step kinds:
//! - **Document OCR**: capture and extract identity documents
//! - **Biometric**: selfie and liveness checks
//! - **List screening**: sanctions and watchlist lookups
//! - **Manual review**: hand-off to a human queue
//! - **Decision**: conditional branching
//! - **Message**: applicant-facing notices
//! - **End**: terminal outcomes
//!
//! ## Features
//! - Drag-and-drop step creation from the palette
//! - Connection drawing from output anchors
//! - Canvas panning, zooming, and grid snapping
//! - Step property editing with per-kind attribute schemas
//! - Debounced structural validation with clickable findings
//! - Full undo/redo, tiered auto-arrange, and JSON save/load

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod constants;
pub mod layout;
pub mod storage;
pub mod types;
mod ui;
pub mod validation;

pub use types::{Connection, FlowGraph, NodeId, StepKind, StepNode};
pub use ui::FlowDesignerApp;

/// Runs the flow designer application with default settings.
///
/// This function initializes the egui application window and starts the main
/// event loop. Previously persisted editor state is restored when available.
///
/// # Returns
///
/// Returns `Ok(())` if the application runs successfully, or an
/// `eframe::Error` if initialization fails.
///
/// # Example
///
/// ```no_run
/// use flow_designer::run_app;
///
/// fn main() -> Result<(), eframe::Error> {
///     run_app()
/// }
/// ```
pub fn run_app() -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "Flow Designer",
        options,
        Box::new(|cc| {
            let app = cc
                .storage
                .and_then(|storage| storage.get_string("app_state"))
                .and_then(|json| FlowDesignerApp::from_json(&json).ok())
                .unwrap_or_default();
            Ok(Box::new(app))
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_graph_is_empty() {
        let graph = FlowGraph::new();
        assert!(graph.nodes.is_empty());
        assert!(graph.connections.is_empty());
        assert!(!graph.allow_self_loops);
    }

    #[test]
    fn default_app_has_a_single_start_step() {
        let app = FlowDesignerApp::default();
        assert_eq!(app.graph.nodes.len(), 1);
        assert_eq!(app.graph.nodes[0].kind, StepKind::Start);
    }
}
