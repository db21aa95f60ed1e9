//! Duplicate-frame suppression.
//!
//! Radio front ends and replay devices tend to emit the same captured packet
//! several times in a burst. [`DuplicateFilter`] drops a frame that is
//! byte-identical to the last forwarded one when it shows up again within a
//! suppression window.
//!
//! The decision is pure: [`DuplicateFilter::should_forward`] never mutates,
//! and the caller records a frame with [`DuplicateFilter::record`] only after
//! forwarding it succeeded.

use std::time::{Duration, Instant};

use crate::frame::Frame;

/// The most recently forwarded frame and when it was forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastSentRecord {
    pub frame: Frame,
    pub sent_at: Instant,
}

/// Suppresses byte-identical frames repeated within a window.
#[derive(Debug, Clone)]
pub struct DuplicateFilter {
    window: Duration,
    last: Option<LastSentRecord>,
    suppressed: u64,
}

impl DuplicateFilter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last: None,
            suppressed: 0,
        }
    }

    pub fn last_sent(&self) -> Option<&LastSentRecord> {
        self.last.as_ref()
    }

    /// Frames rejected by [`check`](Self::check) so far.
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }

    /// Whether `frame` observed at `now` should be forwarded.
    ///
    /// Returns `false` only when `frame` equals the last forwarded frame and
    /// less than the window has elapsed since it was forwarded. A `now` that
    /// precedes the record counts as zero elapsed time.
    pub fn should_forward(&self, frame: &Frame, now: Instant) -> bool {
        match &self.last {
            Some(last) if last.frame == *frame => {
                now.saturating_duration_since(last.sent_at) >= self.window
            }
            _ => true,
        }
    }

    /// Like [`should_forward`](Self::should_forward), counting suppressions.
    pub fn check(&mut self, frame: &Frame, now: Instant) -> bool {
        let forward = self.should_forward(frame, now);
        if !forward {
            self.suppressed += 1;
        }
        forward
    }

    /// Replace the last-sent record after a successful forward.
    pub fn record(&mut self, frame: Frame, sent_at: Instant) {
        self.last = Some(LastSentRecord { frame, sent_at });
    }
}
