/*!
 * Session management for the subtitle pipeline.
 *
 * This module provides:
 * - Stage, view and activity log models
 * - A pure state machine over the four stage snapshots
 * - The manager that runs stages and guards re-entrancy
 */

pub mod manager;
pub mod models;
pub mod state;

// Re-export main types
pub use manager::SessionManager;
pub use models::{ActivityLog, LogLine, Stage, SubtitleSet, View};
pub use state::{Applied, ReviewGate, SessionEvent, SessionState};
