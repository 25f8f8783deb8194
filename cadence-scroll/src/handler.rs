//! Throttled scroll-event funnel.
//!
//! Scroll events arrive far faster than a window needs recomputing. The
//! handler wraps a caller-supplied callback in a throttle controller at
//! display-refresh frequency, so recomputation is bounded regardless of
//! event rate while the final offset of a burst is never lost (trailing
//! edge).

use std::time::Duration;

use cadence_timing::{throttle, Controller, ThrottleOptions};

/// Default throttle interval, one display frame at 60Hz.
pub const SCROLL_THROTTLE_INTERVAL: Duration = Duration::from_millis(16);

/// Funnels scroll offsets through a throttled callback.
///
/// Composition, not shared ownership: the handler owns only the controller;
/// the callback captures whatever windowing state the caller wants updated.
#[derive(Clone)]
pub struct ScrollHandler {
    controller: Controller<f64, ()>,
}

impl ScrollHandler {
    /// Wrap `callback` at the default display-refresh interval.
    pub fn new<F>(callback: F) -> Self
    where
        F: FnMut(f64) + Send + 'static,
    {
        Self::with_interval(callback, SCROLL_THROTTLE_INTERVAL)
    }

    /// Wrap `callback` at an explicit throttle interval.
    pub fn with_interval<F>(mut callback: F, interval: Duration) -> Self
    where
        F: FnMut(f64) + Send + 'static,
    {
        let controller = throttle(
            move |offset: f64| callback(offset),
            interval,
            ThrottleOptions::default(),
        );
        Self { controller }
    }

    /// Report a scroll offset. Invokes the callback on the leading edge of
    /// a burst and again with the final offset once the burst settles.
    pub fn on_scroll(&self, offset: f64) {
        self.controller.call(offset);
    }

    /// Deliver a pending trailing offset immediately.
    pub fn flush(&self) {
        self.controller.flush();
    }

    /// Drop a pending trailing offset without delivering it.
    pub fn cancel(&self) {
        self.controller.cancel();
    }

    /// Whether a trailing delivery is armed.
    pub fn pending(&self) -> bool {
        self.controller.pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::{FixedScrollConfig, FixedVirtualScroll};
    use crate::window::WindowRange;
    use std::sync::{Arc, Mutex};
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_to_leading_and_trailing() {
        let offsets = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&offsets);
        let handler = ScrollHandler::new(move |offset| sink.lock().unwrap().push(offset));

        // A 40ms flick at 4ms spacing: far more events than frames.
        for step in 0..10 {
            handler.on_scroll(step as f64 * 100.0);
            sleep(Duration::from_millis(4)).await;
        }
        sleep(SCROLL_THROTTLE_INTERVAL * 4).await;

        let offsets = offsets.lock().unwrap();
        assert_eq!(offsets.first(), Some(&0.0));
        assert_eq!(offsets.last(), Some(&900.0));
        // 10 events over 40ms at a 16ms interval: at most 4 deliveries.
        assert!(offsets.len() <= 4, "delivered {} times", offsets.len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_recomputation_through_handler() {
        let engine = FixedVirtualScroll::new(
            FixedScrollConfig::new()
                .with_item_height(50.0)
                .with_viewport_height(500.0)
                .with_overscan(5)
                .with_item_count(1000),
        )
        .expect("valid config");

        let range = Arc::new(Mutex::new(engine.window(0.0)));
        let shared_range = Arc::clone(&range);
        let handler = ScrollHandler::new(move |offset| {
            *shared_range.lock().unwrap() = engine.window(offset);
        });

        handler.on_scroll(2500.0);
        sleep(SCROLL_THROTTLE_INTERVAL * 2).await;
        assert_eq!(*range.lock().unwrap(), WindowRange { start: 45, end: 65 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_trailing_offset() {
        let offsets = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&offsets);
        let handler = ScrollHandler::new(move |offset| sink.lock().unwrap().push(offset));

        handler.on_scroll(100.0); // leading
        handler.on_scroll(200.0); // would be trailing
        assert!(handler.pending());
        handler.cancel();
        sleep(SCROLL_THROTTLE_INTERVAL * 4).await;
        assert_eq!(*offsets.lock().unwrap(), vec![100.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_delivers_trailing_offset_immediately() {
        let offsets = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&offsets);
        let handler = ScrollHandler::new(move |offset| sink.lock().unwrap().push(offset));

        handler.on_scroll(100.0);
        handler.on_scroll(200.0);
        handler.flush();
        assert_eq!(*offsets.lock().unwrap(), vec![100.0, 200.0]);
        assert!(!handler.pending());
    }
}
