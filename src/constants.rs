//! Shared application-wide constants.
//! Centralizes tweakable values used across UI rendering and interactions.

// Node dimensions
/// Default node width in world units.
pub const NODE_WIDTH: f32 = 100.0;
/// Default node height in world units.
pub const NODE_HEIGHT: f32 = 70.0;

// Grid/drawing
/// Grid cell size in world units.
pub const GRID_SIZE: f32 = 20.0;

// Canvas interactions
/// Click threshold in world units used for distinguishing click vs drag.
pub const CLICK_THRESHOLD: f32 = 10.0;
/// Radius of a node's output anchor in world units.
pub const ANCHOR_RADIUS: f32 = 6.0;
/// Lower bound on canvas zoom.
pub const MIN_ZOOM: f32 = 0.5;
/// Upper bound on canvas zoom.
pub const MAX_ZOOM: f32 = 2.0;
/// Zoom increment per Ctrl +/- key press.
pub const ZOOM_STEP: f32 = 0.1;

// Auto layout
/// Distance between successive tiers along the flow direction, in world units.
pub const TIER_SPACING: f32 = 300.0;
/// Distance between sibling nodes within a tier, in world units.
pub const ROW_SPACING: f32 = 180.0;

// Validation
/// Quiet period after the last edit before structural validation re-runs,
/// in seconds.
pub const VALIDATION_DEBOUNCE_SECS: f64 = 0.3;

// Undo/redo
/// Maximum number of undo history entries to retain.
pub const MAX_UNDO_HISTORY: usize = 100;
