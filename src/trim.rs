//! Trim window for video uploads: at most five seconds, always inside the clip.

use thiserror::Error;
use tracing::debug;

/// Longest segment the backend accepts, in seconds.
pub const MAX_SPAN: f64 = 5.0;

/// Slack for `end - start` after float addition, e.g. `7.3 + 5.0 - 7.3`.
const SPAN_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum TrimError {
    #[error("time value {0} is not a finite non-negative number")]
    InvalidTime(f64),
    #[error("start {start:.1}s would leave the window [{start:.1}, {end:.1}] invalid")]
    StartOutOfBounds { start: f64, end: f64 },
}

/// The confirmed `(start, end)` range sent with the next extraction request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimRange {
    pub start: f64,
    pub end: f64,
}

impl TrimRange {
    pub fn span(&self) -> f64 {
        self.end - self.start
    }
}

/// `(start, end)` inside `[0, duration]`, never wider than [`MAX_SPAN`].
///
/// A duration of zero means the clip's metadata has not been read yet.
/// Rejected transitions leave the previous state in place.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrimWindow {
    duration: f64,
    start: f64,
    end: f64,
}

impl TrimWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn has_duration(&self) -> bool {
        self.duration > 0.0
    }

    /// Whether the clip is longer than a single window.
    pub fn needs_trim(&self) -> bool {
        self.duration > MAX_SPAN
    }

    pub fn set_duration(&mut self, duration: f64) -> Result<(), TrimError> {
        if !duration.is_finite() || duration < 0.0 {
            debug!(duration, "rejected trim duration");
            return Err(TrimError::InvalidTime(duration));
        }
        self.duration = duration;
        self.start = 0.0;
        self.end = MAX_SPAN.min(duration);
        Ok(())
    }

    /// Move the start bound; the end bound stays where it is.
    pub fn set_start(&mut self, start: f64) -> Result<(), TrimError> {
        if !start.is_finite() {
            return Err(TrimError::InvalidTime(start));
        }
        let start = start.clamp(0.0, self.duration);
        if start > self.end || self.end - start > MAX_SPAN + SPAN_TOLERANCE {
            debug!(start, end = self.end, "rejected trim start");
            return Err(TrimError::StartOutOfBounds {
                start,
                end: self.end,
            });
        }
        self.start = start;
        Ok(())
    }

    /// Move the end bound, clamped to `[start, min(duration, start + 5)]`.
    pub fn set_end(&mut self, end: f64) -> Result<(), TrimError> {
        if !end.is_finite() {
            return Err(TrimError::InvalidTime(end));
        }
        let upper = self.duration.min(self.start + MAX_SPAN);
        self.end = end.clamp(self.start, upper);
        Ok(())
    }

    /// Slide the whole window so it starts at `start`, keeping it as wide as
    /// the clip allows.
    pub fn slide_to(&mut self, start: f64) -> Result<(), TrimError> {
        if !start.is_finite() {
            return Err(TrimError::InvalidTime(start));
        }
        let latest = (self.duration - MAX_SPAN).max(0.0);
        self.start = start.clamp(0.0, latest);
        self.end = (self.start + MAX_SPAN).min(self.duration);
        Ok(())
    }

    /// The range to submit, or `None` while the duration is unknown.
    pub fn confirm(&self) -> Option<TrimRange> {
        self.has_duration().then_some(TrimRange {
            start: self.start,
            end: self.end,
        })
    }

    /// Checks `0 <= start <= end <= duration` and `end - start <= 5`.
    pub fn is_valid(&self) -> bool {
        0.0 <= self.start
            && self.start <= self.end
            && self.end <= self.duration
            && self.end - self.start <= MAX_SPAN + SPAN_TOLERANCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(duration: f64) -> TrimWindow {
        let mut w = TrimWindow::new();
        w.set_duration(duration).unwrap();
        w
    }

    #[test]
    fn unknown_duration_has_nothing_to_confirm() {
        let w = TrimWindow::new();
        assert!(!w.has_duration());
        assert_eq!(w.confirm(), None);
        assert!(w.is_valid());
    }

    #[test]
    fn set_duration_initializes_window() {
        let w = window(12.0);
        assert_eq!((w.start(), w.end()), (0.0, 5.0));
        assert!(w.needs_trim());

        let short = window(3.2);
        assert_eq!((short.start(), short.end()), (0.0, 3.2));
        assert!(!short.needs_trim());
    }

    #[test]
    fn set_duration_rejects_garbage() {
        let mut w = window(12.0);
        assert!(w.set_duration(-1.0).is_err());
        assert!(w.set_duration(f64::NAN).is_err());
        assert!(w.set_duration(f64::INFINITY).is_err());
        assert_eq!(w, window(12.0));
    }

    #[test]
    fn start_past_end_is_rejected() {
        let mut w = window(12.0);
        assert!(w.set_start(8.0).is_err());
        assert_eq!((w.start(), w.end()), (0.0, 5.0));
    }

    #[test]
    fn end_is_capped_by_start_plus_span() {
        let mut w = window(12.0);
        w.set_end(10.0).unwrap();
        assert_eq!(w.end(), 5.0);
    }

    #[test]
    fn start_then_end_walk_forward() {
        let mut w = window(12.0);
        w.set_start(3.0).unwrap();
        w.set_end(11.0).unwrap();
        assert_eq!((w.start(), w.end()), (3.0, 8.0));
        assert!(w.set_start(2.5).is_err(), "span would exceed five seconds");
        w.set_start(4.0).unwrap();
        assert_eq!((w.start(), w.end()), (4.0, 8.0));
    }

    #[test]
    fn end_never_drops_below_start() {
        let mut w = window(12.0);
        w.set_start(2.0).unwrap();
        w.set_end(0.5).unwrap();
        assert_eq!(w.end(), 2.0);
        assert!(w.is_valid());
    }

    #[test]
    fn negative_start_clamps_to_zero() {
        let mut w = window(12.0);
        w.set_start(-3.0).unwrap();
        assert_eq!(w.start(), 0.0);
    }

    #[test]
    fn slide_moves_both_bounds() {
        let mut w = window(12.0);
        w.slide_to(4.0).unwrap();
        assert_eq!((w.start(), w.end()), (4.0, 9.0));
        w.slide_to(11.0).unwrap();
        assert_eq!((w.start(), w.end()), (7.0, 12.0));

        let mut short = window(3.0);
        short.slide_to(2.0).unwrap();
        assert_eq!((short.start(), short.end()), (0.0, 3.0));
    }

    #[test]
    fn confirm_reports_current_range() {
        let mut w = window(20.0);
        w.slide_to(10.0).unwrap();
        let range = w.confirm().unwrap();
        assert_eq!(range, TrimRange { start: 10.0, end: 15.0 });
        assert_eq!(range.span(), 5.0);
    }
}
