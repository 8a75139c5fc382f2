//! Application state management structures.
//!
//! This module contains all the state structures that track the editor's
//! current UI state, including canvas navigation, pointer gestures, the
//! keyboard focus overlay, debounced validation, and file operations.

use super::undo::UndoHistory;
use crate::constants::VALIDATION_DEBOUNCE_SECS;
use crate::layout::LayoutDirection;
use crate::types::{FlowGraph, NodeId, StepKind};
use crate::validation::{self, Finding};
use eframe::egui;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{channel, Receiver, Sender};

/// State related to canvas navigation and display.
///
/// Tracks the current pan offset, zoom level, and display options for the
/// canvas.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasState {
    /// Current canvas pan offset for navigation (in screen space)
    #[serde(skip)]
    pub offset: egui::Vec2,
    /// Current zoom level, clamped to [MIN_ZOOM, MAX_ZOOM]
    pub zoom_factor: f32,
    /// Whether the grid should be displayed on the canvas
    pub show_grid: bool,
    /// Whether the initial view has been centred on the canvas yet
    #[serde(skip)]
    pub centered: bool,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            offset: egui::Vec2::ZERO,
            zoom_factor: 1.0,
            show_grid: true,
            centered: false,
        }
    }
}

/// The single pointer gesture currently in progress.
///
/// Exactly one gesture is active at a time; starting a new one replaces the
/// old. An in-flight gesture is abandoned back to `Idle` when the pointer
/// is released (or leaves the canvas without a release event).
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Gesture {
    /// No gesture in progress.
    #[default]
    Idle,
    /// A palette entry is being dragged onto the canvas; commits an
    /// `add_node` when released over the canvas, discards otherwise.
    DraggingNewNode {
        /// The step kind picked from the palette.
        kind: StepKind,
    },
    /// An existing node is being dragged.
    DraggingNode {
        /// The node being moved.
        node_id: NodeId,
        /// Offset from pointer to node center, so the node doesn't jump.
        grab_offset: egui::Vec2,
        /// Position before the drag started, for undo.
        original_position: (f32, f32),
    },
    /// A connection is being drawn from a node's output anchor; commits an
    /// `add_connection` when released over another node's body.
    CreatingConnection {
        /// The source node the drag started from.
        source: NodeId,
    },
    /// The canvas is being panned.
    Panning {
        /// Last pointer position, for computing the pan delta.
        last_pos: egui::Pos2,
    },
}

/// State related to user interactions with nodes and the canvas.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionState {
    /// The pointer gesture currently in progress.
    #[serde(skip)]
    pub gesture: Gesture,
    /// Currently selected node ID, if any
    #[serde(skip)]
    pub selected_node: Option<NodeId>,
    /// Currently selected connection index, if any
    #[serde(skip)]
    pub selected_connection: Option<usize>,
    /// Current pointer position while drawing a connection (screen space)
    #[serde(skip)]
    pub connection_draw_pos: Option<egui::Pos2>,
    /// Keyboard focus overlay: index into the node list while Tab
    /// navigation is active, `None` otherwise
    #[serde(skip)]
    pub keyboard_focus: Option<usize>,
    /// Whether left-drag on empty canvas pans instead of doing nothing
    pub pan_mode: bool,
    /// Node whose label is currently being edited in the properties panel
    #[serde(skip)]
    pub editing_node_label: Option<NodeId>,
    /// Temporary storage for the label while editing
    #[serde(skip)]
    pub temp_label: String,
    /// Per-field staging buffers for the selected node's attributes
    #[serde(skip)]
    pub temp_attributes: std::collections::HashMap<String, String>,
    /// Which node the staging buffers were loaded from
    #[serde(skip)]
    pub temp_attributes_node: Option<NodeId>,
    /// Flag indicating text should be selected in the label field
    #[serde(skip)]
    pub should_select_text: bool,
    /// Flag to track if focus was already requested for the current edit
    #[serde(skip)]
    pub focus_requested_for_edit: bool,
}

impl Default for InteractionState {
    fn default() -> Self {
        Self {
            gesture: Gesture::Idle,
            selected_node: None,
            selected_connection: None,
            connection_draw_pos: None,
            keyboard_focus: None,
            pan_mode: false,
            editing_node_label: None,
            temp_label: String::new(),
            temp_attributes: Default::default(),
            temp_attributes_node: None,
            should_select_text: false,
            focus_requested_for_edit: false,
        }
    }
}

/// Debounced structural validation state.
///
/// Every graph mutation schedules a re-validation; the pass only runs once
/// the graph has been quiet for the debounce window, and a newer schedule
/// supersedes any pending one, so only the latest graph state is ever
/// validated.
#[derive(Default)]
pub struct ValidationState {
    /// Findings from the most recent completed pass.
    pub findings: Vec<Finding>,
    /// Time of the most recent mutation, if a pass is pending.
    dirty_at: Option<f64>,
}

impl ValidationState {
    /// Schedules a re-validation. A later schedule replaces an earlier one.
    pub fn schedule(&mut self, now: f64) {
        self.dirty_at = Some(now);
    }

    /// Whether a validation pass is scheduled but not yet run.
    pub fn is_pending(&self) -> bool {
        self.dirty_at.is_some()
    }

    /// Runs the pending validation pass once the quiet period has elapsed.
    /// Returns true if a pass ran this call.
    pub fn run_if_due(&mut self, graph: &FlowGraph, now: f64) -> bool {
        match self.dirty_at {
            Some(at) if now - at >= VALIDATION_DEBOUNCE_SECS => {
                self.findings = validation::validate(graph);
                self.dirty_at = None;
                true
            }
            _ => false,
        }
    }

    /// Runs a validation pass immediately, bypassing the debounce.
    pub fn run_now(&mut self, graph: &FlowGraph) {
        self.findings = validation::validate(graph);
        self.dirty_at = None;
    }
}

/// State related to the right-click context menu for creating nodes.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct ContextMenuState {
    /// Whether the context menu is currently visible
    #[serde(skip)]
    pub show: bool,
    /// Screen position where the context menu should appear
    #[serde(skip)]
    pub screen_pos: (f32, f32),
    /// World position where nodes should be created from the context menu
    #[serde(skip)]
    pub world_pos: (f32, f32),
    /// Flag to prevent the menu from closing immediately after opening
    #[serde(skip)]
    pub just_opened: bool,
}

impl Default for ContextMenuState {
    fn default() -> Self {
        Self {
            show: false,
            screen_pos: (0.0, 0.0),
            world_pos: (0.0, 0.0),
            just_opened: false,
        }
    }
}

/// State related to file operations and persistence.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct FileState {
    /// Current file path for save/load operations
    #[serde(skip)]
    pub current_path: Option<String>,
    /// Flag indicating if the flow has unsaved changes
    #[serde(skip)]
    pub has_unsaved_changes: bool,
    /// Pending file operations handed to a background dialog thread
    #[serde(skip)]
    pub pending_save_operation: Option<PendingSaveOperation>,
    #[serde(skip)]
    pub pending_load_operation: Option<PendingLoadOperation>,
    /// Channel for receiving file operation results from dialog threads
    #[serde(skip)]
    pub file_operation_sender: Option<Sender<FileOperationResult>>,
    #[serde(skip)]
    pub file_operation_receiver: Option<Receiver<FileOperationResult>>,
    /// Whether to show an unsaved-changes confirmation dialog
    #[serde(skip)]
    pub show_unsaved_dialog: bool,
    /// The action the user attempted that requires confirmation
    #[serde(skip)]
    pub pending_confirm_action: Option<PendingConfirmAction>,
    /// One-shot flag to allow the next close request after confirmation
    #[serde(skip)]
    pub allow_close_on_next_request: bool,
}

impl Default for FileState {
    fn default() -> Self {
        let (sender, receiver) = channel();
        Self {
            current_path: None,
            has_unsaved_changes: false,
            pending_save_operation: None,
            pending_load_operation: None,
            file_operation_sender: Some(sender),
            file_operation_receiver: Some(receiver),
            show_unsaved_dialog: false,
            pending_confirm_action: None,
            allow_close_on_next_request: false,
        }
    }
}

/// Represents a pending save operation type.
#[derive(Debug)]
pub enum PendingSaveOperation {
    /// Save with a new file path (show file picker)
    SaveAs,
    /// Save to the existing file path
    Save,
}

/// Represents a pending load operation type.
#[derive(Debug)]
pub enum PendingLoadOperation {
    /// Load from a file (show file picker)
    Load,
}

/// Messages sent from dialog threads back to the main app.
#[derive(Debug)]
pub enum FileOperationResult {
    /// Save operation completed successfully with the given path
    SaveCompleted(String),
    /// Load operation completed successfully with path and content
    LoadCompleted(String, String),
    /// Operation failed with an error message
    OperationFailed(String),
}

/// Pending confirmation actions that require approval due to unsaved
/// changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingConfirmAction {
    /// User is attempting to create a new flow
    New,
    /// User is attempting to open a file
    Open,
    /// User is attempting to quit the application
    Quit,
}

/// The main application structure containing UI state and the flow graph.
///
/// This struct implements the `eframe::App` trait and handles all user
/// interface rendering and interaction logic.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct FlowDesignerApp {
    /// The flow graph being edited
    pub graph: FlowGraph,
    /// Canvas navigation and display state
    pub canvas: CanvasState,
    /// User interaction state
    pub interaction: InteractionState,
    /// Context menu state
    pub context_menu: ContextMenuState,
    /// File operations state
    pub file: FileState,
    /// Debounced validation state
    #[serde(skip)]
    pub validation: ValidationState,
    /// Undo/redo history for tracking and reversing actions
    pub undo_history: UndoHistory,
    /// Direction mode used by the auto-arrange button
    pub layout_direction: LayoutDirection,
    /// Whether dark mode visuals are enabled
    pub dark_mode: bool,
    /// Remembered width of the properties panel across sessions
    pub properties_panel_width: f32,
    /// Persisted last known window inner size in logical points
    pub window_inner_size: Option<(f32, f32)>,
    /// Whether we've already applied the stored window geometry this session
    #[serde(skip)]
    pub applied_viewport_restore: bool,
}

impl Default for FlowDesignerApp {
    fn default() -> Self {
        let mut graph = FlowGraph::new();
        // Every flow begins with its (non-deletable) start step.
        graph.add_node(StepKind::Start, (0.0, 0.0));
        let mut validation = ValidationState::default();
        validation.run_now(&graph);
        Self {
            graph,
            canvas: CanvasState::default(),
            interaction: InteractionState::default(),
            context_menu: ContextMenuState::default(),
            file: FileState::default(),
            validation,
            undo_history: UndoHistory::new(),
            layout_direction: LayoutDirection::Auto,
            dark_mode: true,
            properties_panel_width: 300.0,
            window_inner_size: None,
            applied_viewport_restore: false,
        }
    }
}

impl FlowDesignerApp {
    /// Serializes the application state to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserializes application state from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
