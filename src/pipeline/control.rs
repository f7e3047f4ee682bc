use std::sync::{Condvar, Mutex, MutexGuard};

use crate::error::PipelineError;

#[derive(Debug, Default)]
struct ControlState {
    paused: bool,
    cancelled: bool,
}

/// Shared pause/cancel surface between the encode worker and the control
/// thread.
///
/// The worker blocks in [`PipelineControl::wait_if_paused`] at its two
/// suspension points; `resume` and `cancel` wake it. All flag mutation
/// happens under the one internal lock, so this is the only state the two
/// threads share.
#[derive(Debug, Default)]
pub struct PipelineControl {
    state: Mutex<ControlState>,
    cond: Condvar,
}

impl PipelineControl {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Ask the worker to hold at its next suspension point
    pub fn pause(&self) {
        self.lock().paused = true;
    }

    /// Clear the pause flag and wake whichever wait point is blocked
    pub fn resume(&self) {
        let mut state = self.lock();
        state.paused = false;
        drop(state);
        self.cond.notify_all();
    }

    /// Request cooperative cancellation. A worker blocked in a pause-wait is
    /// woken and observes the cancellation instead of resuming.
    pub fn cancel(&self) {
        let mut state = self.lock();
        state.cancelled = true;
        drop(state);
        self.cond.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    /// Block while paused; also the worker's cancellation poll point.
    ///
    /// Returns `Err(PipelineError::Cancelled)` when cancellation was
    /// requested, whether it arrived while blocked or beforehand.
    pub fn wait_if_paused(&self) -> Result<(), PipelineError> {
        let mut state = self.lock();
        while state.paused {
            if state.cancelled {
                return Err(PipelineError::Cancelled);
            }
            state = self
                .cond
                .wait(state)
                .unwrap_or_else(|e| e.into_inner());
        }

        if state.cancelled {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}
