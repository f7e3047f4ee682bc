use std::time::Instant;

/// Clock regime a [`SlotTimer`] runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    /// Live preview: elapsed time follows the system clock
    Live,
    /// Offline encode: elapsed time is set explicitly per rendered frame
    Encode,
}

/// Tracks elapsed time for one active timeline slot.
///
/// In live mode the timer follows the wall clock, freezes while paused, and
/// stays continuous across a pause. In encode mode the pipeline sets the
/// elapsed value for the exact frame being rendered, so output is
/// deterministic regardless of real time. While a video sub-clip's first
/// frame has not arrived, the timer reports the slot as fully elapsed so
/// duration-based effect logic does not race the decoder.
#[derive(Debug)]
pub struct SlotTimer {
    total_ms: u64,
    mode: TimerMode,
    start: Instant,
    offset_ms: u64,
    paused_at: Option<Instant>,
    awaiting_media: bool,
    encode_elapsed_ms: u64,
}

impl SlotTimer {
    pub fn new(total_ms: u64, mode: TimerMode) -> Self {
        Self {
            total_ms,
            mode,
            start: Instant::now(),
            offset_ms: 0,
            paused_at: None,
            awaiting_media: false,
            encode_elapsed_ms: 0,
        }
    }

    /// Milliseconds since the slot became active, adjusted for pause
    pub fn elapsed(&self) -> u64 {
        if self.mode == TimerMode::Encode {
            return self.encode_elapsed_ms;
        }

        if self.awaiting_media {
            return self.total_ms;
        }

        let now = self.paused_at.unwrap_or_else(Instant::now);
        now.duration_since(self.start).as_millis() as u64 + self.offset_ms
    }

    /// Reinitialize to zero elapsed. Called when a slot becomes active.
    /// Ignored while paused: resetting would desynchronize the paused clock.
    pub fn reset(&mut self) {
        if self.paused_at.is_some() {
            return;
        }
        self.start = Instant::now();
        self.offset_ms = 0;
    }

    /// Restart the clock from an explicit elapsed offset (seek)
    pub fn set_offset(&mut self, elapsed_ms: u64) {
        self.start = Instant::now();
        self.offset_ms = elapsed_ms;
    }

    /// Elapsed value for the frame currently being encoded
    pub fn set_encode_elapsed(&mut self, elapsed_ms: u64) {
        self.encode_elapsed_ms = elapsed_ms;
    }

    /// Freeze the clock at the moment pause was detected
    pub fn pause(&mut self) {
        if self.paused_at.is_none() {
            self.paused_at = Some(Instant::now());
        }
    }

    /// Unfreeze, carrying the elapsed-so-far forward so total elapsed time
    /// across the pause is continuous.
    pub fn resume(&mut self) {
        if let Some(paused_at) = self.paused_at.take() {
            self.offset_ms += paused_at.duration_since(self.start).as_millis() as u64;
            self.start = Instant::now();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    /// Mark whether the slot is still waiting for its first video frame
    pub fn set_awaiting_media(&mut self, waiting: bool) {
        self.awaiting_media = waiting;
    }

    /// Whether the slot still has time left on the clock
    pub fn is_alive(&self) -> bool {
        self.elapsed() < self.total_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn live_elapsed_advances() {
        let timer = SlotTimer::new(1000, TimerMode::Live);
        sleep(Duration::from_millis(20));
        assert!(timer.elapsed() >= 20);
    }

    #[test]
    fn encode_mode_ignores_wall_clock() {
        let mut timer = SlotTimer::new(1000, TimerMode::Encode);
        timer.set_encode_elapsed(340);
        sleep(Duration::from_millis(15));
        assert_eq!(timer.elapsed(), 340);
    }

    #[test]
    fn pause_freezes_the_clock() {
        let mut timer = SlotTimer::new(1000, TimerMode::Live);
        sleep(Duration::from_millis(10));
        timer.pause();
        let frozen = timer.elapsed();
        sleep(Duration::from_millis(30));
        assert_eq!(timer.elapsed(), frozen);
    }

    #[test]
    fn resume_is_continuous_across_pause() {
        let mut timer = SlotTimer::new(1000, TimerMode::Live);
        sleep(Duration::from_millis(10));
        timer.pause();
        let at_pause = timer.elapsed();
        sleep(Duration::from_millis(50));
        timer.resume();

        // The paused interval must not count toward elapsed time.
        let after_resume = timer.elapsed();
        assert!(after_resume >= at_pause);
        assert!(after_resume < at_pause + 40);
    }

    #[test]
    fn reset_is_ignored_while_paused() {
        let mut timer = SlotTimer::new(1000, TimerMode::Live);
        sleep(Duration::from_millis(10));
        timer.pause();
        let frozen = timer.elapsed();
        timer.reset();
        assert_eq!(timer.elapsed(), frozen);
    }

    #[test]
    fn awaiting_media_clamps_to_total() {
        let mut timer = SlotTimer::new(2500, TimerMode::Live);
        timer.set_awaiting_media(true);
        assert_eq!(timer.elapsed(), 2500);
        assert!(!timer.is_alive());
        timer.set_awaiting_media(false);
        assert!(timer.is_alive());
    }

    #[test]
    fn offset_restart_counts_from_seek_point() {
        let mut timer = SlotTimer::new(5000, TimerMode::Live);
        timer.set_offset(3000);
        assert!(timer.elapsed() >= 3000);
        assert!(timer.is_alive());
    }
}
