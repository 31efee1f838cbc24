//! Batch driver: translates one unit per `step()` in document order.
//! Progress is observable after every step through the returned report
//! and a watch channel. A failed unit never stops the batch.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::state::{failure_sentinel, BatchState, TranslationUnit, UnitStatus};
use super::BatchError;
use crate::metrics::{metric_names, MetricsRegistry};
use crate::translate::{sanitize, LanguageTag, TranslationResult, Translator};

/// Snapshot published after every state change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchProgress {
    pub cursor: usize,
    pub total: usize,
    pub done: usize,
    pub failed: usize,
    pub running: bool,
}

impl BatchProgress {
    fn of(state: &BatchState) -> Self {
        let counts = state.counts();
        Self {
            cursor: state.cursor(),
            total: state.len(),
            done: counts.done,
            failed: counts.failed,
            running: state.is_running(),
        }
    }
}

/// Result of one completed step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub index: usize,
    pub status: UnitStatus,
    pub translation: String,
    /// Cursor after the step.
    pub cursor: usize,
    pub total: usize,
}

pub struct BatchDriver<T> {
    translator: T,
    source: LanguageTag,
    target: LanguageTag,
    state: BatchState,
    progress_tx: watch::Sender<BatchProgress>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl<T: Translator> BatchDriver<T> {
    pub fn new(translator: T, source: LanguageTag, target: LanguageTag) -> Self {
        Self::with_state(translator, source, target, BatchState::new())
    }

    /// Driver over an existing (e.g. reloaded) state.
    pub fn with_state(
        translator: T,
        source: LanguageTag,
        target: LanguageTag,
        state: BatchState,
    ) -> Self {
        let (progress_tx, _) = watch::channel(BatchProgress::of(&state));
        Self {
            translator,
            source,
            target,
            state,
            progress_tx,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn start(&mut self, units: Vec<TranslationUnit>) {
        self.state.start(units);
        info!(
            units = self.state.len(),
            source = %self.source,
            target = %self.target,
            "batch_started"
        );
        self.publish();
    }

    /// Translate the unit at the cursor. None when there is nothing to do.
    pub async fn step(&mut self) -> Option<StepReport> {
        if let Some(index) = self.state.skip_overridden() {
            info!(index, "batch_step_kept_override");
            self.publish();
            return Some(self.report(index));
        }

        let index = self.state.begin_step()?;
        self.publish();
        let started = Instant::now();
        let span = self.metrics.as_ref().map(|m| m.span(metric_names::BATCH_STEP));

        let source_text = self.state.units()[index].source.clone();
        let result = self
            .translator
            .translate(&source_text, &self.source, &self.target)
            .await;

        let (status, translation) = match result {
            TranslationResult::Success(raw) => (UnitStatus::Done, sanitize(&raw, &source_text)),
            TranslationResult::Failure { kind, message } => {
                warn!(index, kind = %kind, error = %message, "unit failed, continuing");
                (UnitStatus::Failed, failure_sentinel(kind, &message))
            }
        };

        if let Err(e) = self.state.finish_step(status, translation) {
            error!(index, error = %e, "batch step could not be recorded");
            return None;
        }
        self.publish();

        if let Some(span) = span {
            span.finish();
        }
        info!(
            index,
            status = %status,
            cursor = self.state.cursor(),
            total = self.state.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch_step"
        );

        Some(self.report(index))
    }

    /// Stop at the next step boundary. Cursor and statuses are kept.
    pub fn cancel(&mut self) {
        self.state.cancel();
        info!(cursor = self.state.cursor(), "batch_cancelled");
        self.publish();
    }

    /// Re-enable a cancelled or reloaded batch.
    pub fn resume(&mut self) -> bool {
        let running = self.state.resume();
        info!(cursor = self.state.cursor(), running, "batch_resumed");
        self.publish();
        running
    }

    /// Replace a unit's translation (human review). Allowed at any time.
    pub fn override_unit(
        &mut self,
        index: usize,
        text: impl Into<String>,
    ) -> Result<(), BatchError> {
        self.state.override_unit(index, text)?;
        info!(index, "unit_overridden");
        self.publish();
        Ok(())
    }

    pub fn subscribe(&self) -> watch::Receiver<BatchProgress> {
        self.progress_tx.subscribe()
    }

    pub fn state(&self) -> &BatchState {
        &self.state
    }

    pub fn into_state(self) -> BatchState {
        self.state
    }

    pub fn source(&self) -> &LanguageTag {
        &self.source
    }

    pub fn target(&self) -> &LanguageTag {
        &self.target
    }

    fn publish(&self) {
        self.progress_tx.send_replace(BatchProgress::of(&self.state));
    }

    fn report(&self, index: usize) -> StepReport {
        let unit = &self.state.units()[index];
        StepReport {
            index,
            status: unit.status,
            translation: unit.translation.clone(),
            cursor: self.state.cursor(),
            total: self.state.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every unit reached Done or Failed.
    Completed,
    /// Stopped at a step boundary by the cancellation token.
    Cancelled,
    /// The batch was not running when the loop started.
    Idle,
}

/// Drive `step()` until the batch finishes or `cancel` fires.
/// `step_delay` paces consecutive requests; `on_step` sees every report.
pub async fn run_batch<T, F>(
    driver: &mut BatchDriver<T>,
    cancel: &CancellationToken,
    step_delay: Duration,
    mut on_step: F,
) -> RunOutcome
where
    T: Translator,
    F: FnMut(&StepReport, &BatchState),
{
    if !driver.state().is_running() {
        return if driver.state().is_finished() {
            RunOutcome::Completed
        } else {
            RunOutcome::Idle
        };
    }

    while driver.state().is_running() {
        if cancel.is_cancelled() {
            driver.cancel();
            return RunOutcome::Cancelled;
        }

        let Some(report) = driver.step().await else {
            break;
        };
        on_step(&report, driver.state());

        if driver.state().is_running() && !step_delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(step_delay) => {}
                _ = cancel.cancelled() => {}
            }
        }
    }

    if driver.state().is_finished() {
        RunOutcome::Completed
    } else {
        RunOutcome::Idle
    }
}
