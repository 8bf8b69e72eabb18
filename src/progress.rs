//! Status of the most recent generation run.
//!
//! A [`ProgressReporter`] is a cheap handle onto shared state. The generator
//! owns one and hands clones to each run and to whoever polls it. Every
//! setter overwrites; there is no history.
//!
//! ```text
//! NotStarted ──begin──▶ InProgress ──▶ Done
//!                            │
//!                            └────────▶ Error
//! ```

use serde::Serialize;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Status {
    #[default]
    NotStarted,
    InProgress,
    Done,
    Error,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Done | Status::Error)
    }
}

/// Point-in-time copy of the run state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub phase: String,
    pub status: Status,
    pub message: String,
    pub percent: f32,
}

#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    state: Arc<RwLock<ProgressSnapshot>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    // Setters are single field stores, so a poisoned lock still holds a
    // consistent snapshot.
    fn write(&self) -> RwLockWriteGuard<'_, ProgressSnapshot> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read(&self) -> RwLockReadGuard<'_, ProgressSnapshot> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Start a new run: set the phase, mark it in progress, clear the
    /// message and percentage.
    pub fn begin(&self, phase: &str) {
        let mut state = self.write();
        *state = ProgressSnapshot {
            phase: phase.to_string(),
            status: Status::InProgress,
            message: String::new(),
            percent: 0.0,
        };
    }

    pub fn set_phase(&self, phase: &str) {
        self.write().phase = phase.to_string();
    }

    pub fn set_status(&self, status: Status) {
        self.write().status = status;
    }

    pub fn set_message(&self, message: impl Into<String>) {
        self.write().message = message.into();
    }

    /// Clamped to `0..=100`. NaN reads as 0.
    pub fn set_percent(&self, percent: f32) {
        let percent = if percent.is_nan() {
            0.0
        } else {
            percent.clamp(0.0, 100.0)
        };
        self.write().percent = percent;
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.read().clone()
    }

    pub fn status(&self) -> Status {
        self.read().status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_not_started() {
        let snap = ProgressReporter::new().snapshot();
        assert_eq!(snap.status, Status::NotStarted);
        assert_eq!(snap.percent, 0.0);
        assert!(snap.phase.is_empty());
    }

    #[test]
    fn begin_resets_previous_run() {
        let progress = ProgressReporter::new();
        progress.begin("generate");
        progress.set_message("Saving page");
        progress.set_percent(80.0);
        progress.set_status(Status::Error);

        progress.begin("generate");
        let snap = progress.snapshot();
        assert_eq!(snap.status, Status::InProgress);
        assert_eq!(snap.message, "");
        assert_eq!(snap.percent, 0.0);
    }

    #[test]
    fn percent_is_clamped() {
        let progress = ProgressReporter::new();
        progress.set_percent(150.0);
        assert_eq!(progress.snapshot().percent, 100.0);
        progress.set_percent(-3.0);
        assert_eq!(progress.snapshot().percent, 0.0);
        progress.set_percent(f32::NAN);
        assert_eq!(progress.snapshot().percent, 0.0);
    }

    #[test]
    fn clones_share_state() {
        let progress = ProgressReporter::new();
        let other = progress.clone();
        std::thread::spawn(move || other.set_phase("generate"))
            .join()
            .unwrap();
        assert_eq!(progress.snapshot().phase, "generate");
    }

    #[test]
    fn snapshot_serializes_status_by_name() {
        let progress = ProgressReporter::new();
        progress.begin("generate");
        progress.set_message("Drawing cards");
        progress.set_percent(42.5);

        let json = serde_json::to_value(progress.snapshot()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "phase": "generate",
                "status": "InProgress",
                "message": "Drawing cards",
                "percent": 42.5
            })
        );
    }

    #[test]
    fn terminal_states() {
        assert!(Status::Done.is_terminal());
        assert!(Status::Error.is_terminal());
        assert!(!Status::InProgress.is_terminal());
    }
}
