//! Batch state: the ordered unit list, a cursor, and a running flag.
//! Unit status changes go through a validated transition table.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::BatchError;
use crate::translate::FailureKind;

/// Prefix of the text stored in place of a failed unit's translation.
pub const FAILED_SENTINEL_PREFIX: &str = "[translation failed";

pub fn failure_sentinel(kind: FailureKind, message: &str) -> String {
    format!("{FAILED_SENTINEL_PREFIX}: {kind}: {message}]")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitStatus {
    Pending,
    InProgress,
    Done,
    Failed,
}

impl std::fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitStatus::Pending => write!(f, "Pending"),
            UnitStatus::InProgress => write!(f, "InProgress"),
            UnitStatus::Done => write!(f, "Done"),
            UnitStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl UnitStatus {
    pub fn can_transition_to(self, next: UnitStatus) -> bool {
        matches!(
            (self, next),
            (UnitStatus::Pending, UnitStatus::InProgress)
                | (UnitStatus::InProgress, UnitStatus::Done)
                | (UnitStatus::InProgress, UnitStatus::Failed)
                // manual override
                | (_, UnitStatus::Done)
                // restart or interrupted step
                | (_, UnitStatus::Pending)
        )
    }

    /// Done or Failed.
    pub fn is_terminal(self) -> bool {
        matches!(self, UnitStatus::Done | UnitStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationUnit {
    /// Position in the source document.
    pub index: usize,
    pub source: String,
    pub translation: String,
    pub status: UnitStatus,
}

impl TranslationUnit {
    pub fn new(index: usize, source: impl Into<String>) -> Self {
        Self {
            index,
            source: source.into(),
            translation: String::new(),
            status: UnitStatus::Pending,
        }
    }

    /// Units numbered by position.
    pub fn from_paragraphs<I, S>(paragraphs: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        paragraphs
            .into_iter()
            .enumerate()
            .map(|(i, p)| Self::new(i, p))
            .collect()
    }

    fn set_status(&mut self, next: UnitStatus) -> Result<(), BatchError> {
        if !self.status.can_transition_to(next) {
            warn!(index = self.index, from = %self.status, to = %next, "invalid unit transition");
            return Err(BatchError::InvalidTransition {
                index: self.index,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Per-status counts for progress display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub done: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchState {
    units: Vec<TranslationUnit>,
    cursor: usize,
    running: bool,
}

impl BatchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to a fresh run over `units`: cursor 0, everything Pending.
    /// An empty batch is finished immediately and never runs.
    pub fn start(&mut self, mut units: Vec<TranslationUnit>) {
        for (i, unit) in units.iter_mut().enumerate() {
            unit.index = i;
            unit.translation.clear();
            unit.status = UnitStatus::Pending;
        }
        self.running = !units.is_empty();
        self.units = units;
        self.cursor = 0;
    }

    /// Mark the unit at the cursor InProgress and return its index.
    /// None when not running or already at the end.
    pub fn begin_step(&mut self) -> Option<usize> {
        if !self.running || self.cursor >= self.units.len() {
            return None;
        }
        let index = self.cursor;
        self.units[index].set_status(UnitStatus::InProgress).ok()?;
        Some(index)
    }

    /// Advance past a unit that was overridden before the cursor reached it,
    /// keeping the manual text. Returns its index when it did.
    pub fn skip_overridden(&mut self) -> Option<usize> {
        if !self.running {
            return None;
        }
        let index = self.cursor;
        if self.units.get(index)?.status != UnitStatus::Done {
            return None;
        }
        self.advance();
        Some(index)
    }

    fn advance(&mut self) {
        self.cursor += 1;
        if self.cursor == self.units.len() {
            self.running = false;
        }
    }

    /// Store the outcome of the in-flight step and advance the cursor.
    pub fn finish_step(
        &mut self,
        status: UnitStatus,
        translation: String,
    ) -> Result<usize, BatchError> {
        let index = self.cursor;
        let unit = self
            .units
            .get_mut(index)
            .filter(|u| u.status == UnitStatus::InProgress)
            .ok_or(BatchError::NoStepInProgress)?;
        unit.set_status(status)?;
        unit.translation = translation;
        self.advance();
        Ok(index)
    }

    /// Stop at the current step boundary. Cursor and statuses are kept.
    pub fn cancel(&mut self) {
        self.running = false;
    }

    /// Re-enable a cancelled or reloaded batch. Returns whether it runs.
    pub fn resume(&mut self) -> bool {
        self.running = self.cursor < self.units.len();
        self.running
    }

    /// Replace a unit's translation and mark it Done, at any time.
    pub fn override_unit(
        &mut self,
        index: usize,
        text: impl Into<String>,
    ) -> Result<(), BatchError> {
        let len = self.units.len();
        let unit = self
            .units
            .get_mut(index)
            .ok_or(BatchError::IndexOutOfRange { index, len })?;
        unit.set_status(UnitStatus::Done)?;
        unit.translation = text.into();
        Ok(())
    }

    /// Put a unit left InProgress by an interrupted process back to Pending
    /// and pause the batch.
    pub fn recover_interrupted(&mut self) {
        for unit in &mut self.units {
            if unit.status == UnitStatus::InProgress {
                unit.status = UnitStatus::Pending;
            }
        }
        self.running = false;
    }

    /// Check the structural invariants of a deserialized state.
    pub fn validate(&self) -> Result<(), BatchError> {
        if self.cursor > self.units.len() {
            return Err(BatchError::Corrupt(format!(
                "cursor {} beyond {} units",
                self.cursor,
                self.units.len()
            )));
        }
        for (pos, unit) in self.units.iter().enumerate() {
            if unit.index != pos {
                return Err(BatchError::Corrupt(format!(
                    "unit at position {pos} has index {}",
                    unit.index
                )));
            }
            if pos < self.cursor && !unit.status.is_terminal() {
                return Err(BatchError::Corrupt(format!(
                    "unit {pos} behind the cursor is {}",
                    unit.status
                )));
            }
            if pos >= self.cursor && unit.status == UnitStatus::Failed {
                return Err(BatchError::Corrupt(format!(
                    "unit {pos} at or after the cursor is Failed"
                )));
            }
            if unit.status == UnitStatus::InProgress && pos != self.cursor {
                return Err(BatchError::Corrupt(format!(
                    "unit {pos} is InProgress but the cursor is at {}",
                    self.cursor
                )));
            }
        }
        Ok(())
    }

    pub fn units(&self) -> &[TranslationUnit] {
        &self.units
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.cursor == self.units.len()
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for unit in &self.units {
            match unit.status {
                UnitStatus::Pending => counts.pending += 1,
                UnitStatus::InProgress => counts.in_progress += 1,
                UnitStatus::Done => counts.done += 1,
                UnitStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    /// Current translation of every unit, in document order.
    pub fn translations(&self) -> Vec<String> {
        self.units.iter().map(|u| u.translation.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(n: usize) -> BatchState {
        let mut state = BatchState::new();
        state.start(TranslationUnit::from_paragraphs((0..n).map(|i| format!("p{i}"))));
        state
    }

    #[test]
    fn transition_table() {
        assert!(UnitStatus::Pending.can_transition_to(UnitStatus::InProgress));
        assert!(UnitStatus::InProgress.can_transition_to(UnitStatus::Failed));
        assert!(UnitStatus::Failed.can_transition_to(UnitStatus::Done));
        assert!(!UnitStatus::Pending.can_transition_to(UnitStatus::Failed));
        assert!(!UnitStatus::Done.can_transition_to(UnitStatus::InProgress));
    }

    #[test]
    fn start_resets_everything() {
        let mut state = started(2);
        state.begin_step().unwrap();
        state.finish_step(UnitStatus::Done, "x".into()).unwrap();

        state.start(state.units().to_vec());
        assert_eq!(state.cursor(), 0);
        assert!(state.is_running());
        assert!(state.units().iter().all(|u| u.status == UnitStatus::Pending));
        assert!(state.units().iter().all(|u| u.translation.is_empty()));
    }

    #[test]
    fn empty_batch_is_finished_and_idle() {
        let state = started(0);
        assert!(!state.is_running());
        assert!(state.is_finished());
    }

    #[test]
    fn last_step_stops_running() {
        let mut state = started(1);
        assert_eq!(state.begin_step(), Some(0));
        state.finish_step(UnitStatus::Failed, "oops".into()).unwrap();
        assert_eq!(state.cursor(), 1);
        assert!(!state.is_running());
        assert_eq!(state.begin_step(), None);
    }

    #[test]
    fn finish_without_begin_is_rejected() {
        let mut state = started(1);
        assert!(matches!(
            state.finish_step(UnitStatus::Done, String::new()),
            Err(BatchError::NoStepInProgress)
        ));
    }

    #[test]
    fn cancel_keeps_cursor_and_resume_continues() {
        let mut state = started(3);
        state.begin_step();
        state.finish_step(UnitStatus::Done, "a".into()).unwrap();
        state.cancel();
        assert_eq!(state.begin_step(), None);
        assert_eq!(state.cursor(), 1);

        assert!(state.resume());
        assert_eq!(state.begin_step(), Some(1));
    }

    #[test]
    fn resume_on_finished_batch_stays_idle() {
        let mut state = started(1);
        state.begin_step();
        state.finish_step(UnitStatus::Done, "a".into()).unwrap();
        assert!(!state.resume());
    }

    #[test]
    fn override_any_time() {
        let mut state = started(2);
        state.override_unit(1, "manual").unwrap();
        assert_eq!(state.units()[1].status, UnitStatus::Done);
        assert_eq!(state.units()[1].translation, "manual");

        let err = state.override_unit(5, "x").unwrap_err();
        assert!(matches!(err, BatchError::IndexOutOfRange { index: 5, len: 2 }));
    }

    #[test]
    fn overridden_unit_ahead_of_cursor_is_kept() {
        let mut state = started(2);
        state.override_unit(0, "manual").unwrap();
        assert_eq!(state.begin_step(), None);
        assert_eq!(state.skip_overridden(), Some(0));
        assert_eq!(state.cursor(), 1);
        assert_eq!(state.units()[0].translation, "manual");
        assert_eq!(state.skip_overridden(), None);
        assert_eq!(state.begin_step(), Some(1));
    }

    #[test]
    fn recover_and_validate() {
        let mut state = started(2);
        state.begin_step();
        assert!(state.validate().is_ok());

        state.recover_interrupted();
        assert_eq!(state.units()[0].status, UnitStatus::Pending);
        assert!(!state.is_running());
        assert!(state.validate().is_ok());
    }

    #[test]
    fn validate_rejects_pending_behind_cursor() {
        let json = r#"{"units":[{"index":0,"source":"a","translation":"","status":"Pending"}],"cursor":1,"running":false}"#;
        let state: BatchState = serde_json::from_str(json).unwrap();
        assert!(matches!(state.validate(), Err(BatchError::Corrupt(_))));
    }

    #[test]
    fn validate_rejects_failed_at_or_after_cursor() {
        let json = r#"{"units":[
            {"index":0,"source":"a","translation":"x","status":"Done"},
            {"index":1,"source":"b","translation":"[translation failed: timeout: t]","status":"Failed"}
        ],"cursor":1,"running":false}"#;
        let state: BatchState = serde_json::from_str(json).unwrap();
        assert!(matches!(state.validate(), Err(BatchError::Corrupt(_))));
    }

    #[test]
    fn sentinel_is_recognizable() {
        let s = failure_sentinel(FailureKind::Timeout, "gave up");
        assert!(s.starts_with(FAILED_SENTINEL_PREFIX));
        assert!(s.contains("timeout"));
    }
}
