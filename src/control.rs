//! Cooperative pause/resume/stop for batch runs.
//!
//! A single [`RunState`] value replaces separate "paused" and "stopped"
//! flags, so "paused and stopped at once" cannot be represented. The state
//! lives in a `tokio::sync::watch` channel: control calls are plain
//! synchronous methods, and a paused pipeline parks on the channel
//! until the state changes instead of sleep-polling.
//!
//! Cancellation is cooperative. The pipeline only consults the token at its
//! checkpoints (before each file, before each page, around each save), so
//! an in-flight render or recognition call always completes first.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Lifecycle of the controller that owns a [`ControlToken`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RunState {
    /// No batch in progress. Pause and stop are no-ops.
    #[default]
    Idle,
    Running,
    Paused,
    /// Stop requested; the run unwinds at its next checkpoint.
    Stopped,
}

/// Result of a checkpoint: keep going or unwind now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    Continue,
    Stop,
}

/// Shared handle to the run state. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ControlToken {
    tx: Arc<watch::Sender<RunState>>,
}

impl Default for ControlToken {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(RunState::Idle);
        Self { tx: Arc::new(tx) }
    }

    pub fn state(&self) -> RunState {
        *self.tx.borrow()
    }

    /// Running → Paused. Returns whether the state changed.
    pub fn pause(&self) -> bool {
        self.transition(|s| (s == RunState::Running).then_some(RunState::Paused))
    }

    /// Paused → Running.
    pub fn resume(&self) -> bool {
        self.transition(|s| (s == RunState::Paused).then_some(RunState::Running))
    }

    /// Running or Paused → Stopped. A stop while idle is ignored.
    pub fn stop(&self) -> bool {
        self.transition(|s| {
            matches!(s, RunState::Running | RunState::Paused).then_some(RunState::Stopped)
        })
    }

    /// Idle → Running. Fails if a run is already active.
    pub(crate) fn begin(&self) -> bool {
        self.transition(|s| (s == RunState::Idle).then_some(RunState::Running))
    }

    /// Any → Idle, at the end of a run.
    pub(crate) fn finish(&self) {
        self.tx.send_modify(|s| *s = RunState::Idle);
    }

    /// Wait out a pause, then report whether to continue.
    ///
    /// An idle token always continues, which lets a document run on its own
    /// outside any batch.
    pub async fn checkpoint(&self) -> Checkpoint {
        let mut rx = self.tx.subscribe();
        let state = *rx.borrow_and_update();
        match state {
            RunState::Idle | RunState::Running => Checkpoint::Continue,
            RunState::Stopped => Checkpoint::Stop,
            RunState::Paused => {
                debug!("Paused at checkpoint; waiting for resume or stop");
                let stopped = rx
                    .wait_for(|s| *s != RunState::Paused)
                    .await
                    .map(|s| *s == RunState::Stopped)
                    .unwrap_or(true);
                if stopped {
                    Checkpoint::Stop
                } else {
                    debug!("Resumed");
                    Checkpoint::Continue
                }
            }
        }
    }

    fn transition(&self, next: impl FnOnce(RunState) -> Option<RunState>) -> bool {
        self.tx.send_if_modified(|s| match next(*s) {
            Some(n) => {
                *s = n;
                true
            }
            None => false,
        })
    }
}
