//! View window state driven by zoom gestures.
//!
//! Two states: full view (the `(0, 0)` sentinel, `[0, rmax]` on screen) and
//! a custom window. Every window handed out satisfies
//! `0 <= left <= right <= rmax`.

use tracing::debug;

use super::data::TimeWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    FullView,
    Custom(TimeWindow),
}

#[derive(Debug, Clone)]
pub struct ZoomController {
    state: ViewState,
    rmax_ms: i64,
}

impl ZoomController {
    pub fn new(rmax_ms: i64) -> Self {
        Self {
            state: ViewState::FullView,
            rmax_ms: rmax_ms.max(0),
        }
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn rmax_ms(&self) -> i64 {
        self.rmax_ms
    }

    pub fn is_full_view(&self) -> bool {
        self.state == ViewState::FullView
    }

    /// Window to hand to the fetch pipeline; the sentinel in full view.
    pub fn requested_window(&self) -> TimeWindow {
        match self.state {
            ViewState::FullView => TimeWindow::FULL_VIEW,
            ViewState::Custom(window) => window,
        }
    }

    /// Window actually on screen.
    pub fn window(&self) -> TimeWindow {
        self.requested_window().resolve(self.rmax_ms)
    }

    /// Zoom to the axis range reported by the chart, in seconds.
    ///
    /// Returns `None` when either bound is missing or not finite; the chart
    /// reports autorange relayouts that way and they are not zooms. A range
    /// that clamps to a single instant falls back to full view.
    pub fn zoom_in(
        &mut self,
        range_start_s: Option<f64>,
        range_end_s: Option<f64>,
    ) -> Option<TimeWindow> {
        let (start, end) = match (range_start_s, range_end_s) {
            (Some(s), Some(e)) if s.is_finite() && e.is_finite() => (s, e),
            _ => return None,
        };

        let a = seconds_to_ms(start);
        let b = seconds_to_ms(end);
        let (left, right) = if a <= b { (a, b) } else { (b, a) };
        let left = left.clamp(0, self.rmax_ms);
        let right = right.clamp(0, self.rmax_ms);

        self.state = if left == right {
            ViewState::FullView
        } else {
            ViewState::Custom(TimeWindow::new(left, right))
        };

        let window = self.window();
        debug!(window = %window, full_view = self.is_full_view(), "Zoom in");
        Some(window)
    }

    /// Widen a custom window by half its span on each side.
    ///
    /// The span is measured once, before either bound moves, and each side
    /// moves by at least 1ms. A result that would leave `[0, rmax]` on either
    /// side snaps to full view. Does nothing in full view.
    pub fn zoom_out(&mut self) -> Option<TimeWindow> {
        let ViewState::Custom(current) = self.state else {
            return None;
        };

        let half = (current.span_ms() / 2).max(1);
        let left = current.left_ms - half;
        let right = current.right_ms + half;

        self.state = if left < 0 || right > self.rmax_ms {
            ViewState::FullView
        } else {
            ViewState::Custom(TimeWindow::new(left, right))
        };

        let window = self.window();
        debug!(window = %window, full_view = self.is_full_view(), "Zoom out");
        Some(window)
    }

    /// Back to full view.
    pub fn reset(&mut self) -> TimeWindow {
        self.state = ViewState::FullView;
        self.window()
    }
}

/// Axis seconds to whole milliseconds, truncating toward zero.
fn seconds_to_ms(seconds: f64) -> i64 {
    (seconds * 1000.0).trunc() as i64
}
