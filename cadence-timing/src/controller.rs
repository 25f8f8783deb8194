//! The shared debounce/throttle mechanism.
//!
//! One state machine serves both constructors. A call records its arguments
//! and the current time; the controller decides whether an invocation window
//! is open, whether the leading edge fires, and when the trailing timer is
//! due. Trailing timers are spawned scheduler tasks invalidated by a
//! generation counter: re-arming or cancelling bumps the generation and the
//! stale task becomes a no-op when it wakes.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use cadence_core::{Clock, Scheduler, TokioClock, TokioScheduler};

/// Options for [`debounce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceOptions {
    /// Invoke on the leading edge of a burst.
    pub leading: bool,
    /// Invoke on the trailing edge with the latest recorded arguments.
    pub trailing: bool,
}

impl Default for DebounceOptions {
    fn default() -> Self {
        Self {
            leading: false,
            trailing: true,
        }
    }
}

impl DebounceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_leading(mut self, leading: bool) -> Self {
        self.leading = leading;
        self
    }

    pub fn with_trailing(mut self, trailing: bool) -> Self {
        self.trailing = trailing;
        self
    }
}

/// Options for [`throttle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleOptions {
    /// Invoke on the leading edge of each interval.
    pub leading: bool,
    /// Invoke on the trailing edge with the latest recorded arguments.
    pub trailing: bool,
}

impl Default for ThrottleOptions {
    fn default() -> Self {
        Self {
            leading: true,
            trailing: true,
        }
    }
}

impl ThrottleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_leading(mut self, leading: bool) -> Self {
        self.leading = leading;
        self
    }

    pub fn with_trailing(mut self, trailing: bool) -> Self {
        self.trailing = trailing;
        self
    }
}

/// Create a debounced controller around `operation`.
///
/// Calls made while the invocation window is open re-record their arguments;
/// the trailing timer fires once `wait` has elapsed since the most recent
/// call. With `leading` set, the call that opens a window invokes
/// immediately and [`Controller::call`] returns that result synchronously.
///
/// With both edges enabled and call spacing at or beyond `wait`, one
/// idle→active→idle cycle can produce two invocations: one with the
/// triggering call's arguments, one with the final call's. That is the
/// contract, not an artifact.
pub fn debounce<A, R, F>(operation: F, wait: Duration, options: DebounceOptions) -> Controller<A, R>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
    F: FnMut(A) -> R + Send + 'static,
{
    Controller::new(
        operation,
        wait,
        None,
        options.leading,
        options.trailing,
        Arc::new(TokioClock::new()),
        Arc::new(TokioScheduler::new()),
    )
}

/// Create a throttled controller around `operation`.
///
/// Same mechanism as [`debounce`] with the maximum deferral pinned to
/// `wait`: at least one invocation happens per `wait`-length interval
/// regardless of call frequency.
pub fn throttle<A, R, F>(operation: F, wait: Duration, options: ThrottleOptions) -> Controller<A, R>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
    F: FnMut(A) -> R + Send + 'static,
{
    Controller::new(
        operation,
        wait,
        Some(wait),
        options.leading,
        options.trailing,
        Arc::new(TokioClock::new()),
        Arc::new(TokioScheduler::new()),
    )
}

struct ControlState<A, R> {
    operation: Box<dyn FnMut(A) -> R + Send>,
    last_args: Option<A>,
    last_call_time: Option<Instant>,
    last_invoke_time: Option<Instant>,
    last_result: Option<R>,
    /// Generation of the currently armed timer; `None` means no window open.
    timer_generation: Option<u64>,
    generation: u64,
}

struct ControlShared<A, R> {
    wait: Duration,
    max_wait: Option<Duration>,
    leading: bool,
    trailing: bool,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
    state: Mutex<ControlState<A, R>>,
}

/// Handle over one rate-limited operation.
///
/// Cloning yields another handle to the same underlying state; all clones
/// observe the same window, timer, and recorded arguments.
///
/// The wrapped operation must not call back into its own controller.
pub struct Controller<A, R> {
    shared: Arc<ControlShared<A, R>>,
}

impl<A, R> Clone for Controller<A, R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<A, R> Controller<A, R>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
{
    /// Construct with explicit capabilities. [`debounce`] / [`throttle`]
    /// wire the production clock and scheduler.
    pub fn new<F>(
        operation: F,
        wait: Duration,
        max_wait: Option<Duration>,
        leading: bool,
        trailing: bool,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self
    where
        F: FnMut(A) -> R + Send + 'static,
    {
        Self {
            shared: Arc::new(ControlShared {
                wait,
                max_wait,
                leading,
                trailing,
                clock,
                scheduler,
                state: Mutex::new(ControlState {
                    operation: Box::new(operation),
                    last_args: None,
                    last_call_time: None,
                    last_invoke_time: None,
                    last_result: None,
                    timer_generation: None,
                    generation: 0,
                }),
            }),
        }
    }

    /// Record a call. Returns the operation's result when this call invoked
    /// it on the leading edge, otherwise the most recent prior result.
    pub fn call(&self, args: A) -> Option<R> {
        let now = self.shared.clock.now();
        let mut state = lock_state(&self.shared.state);
        let is_invoking = Self::should_invoke(&self.shared, &state, now);

        state.last_args = Some(args);
        state.last_call_time = Some(now);

        if is_invoking {
            if state.timer_generation.is_none() {
                return Self::leading_edge(&self.shared, &mut state, now);
            }
            if self.shared.max_wait.is_some() {
                // Deferral cap reached inside an open window: invoke now and
                // restart the timer.
                Self::arm_timer(&self.shared, &mut state, self.shared.wait);
                return Self::invoke(&mut state, now);
            }
        }
        if state.timer_generation.is_none() {
            Self::arm_timer(&self.shared, &mut state, self.shared.wait);
        }
        state.last_result.clone()
    }

    /// Discard the pending timer and recorded arguments without invoking.
    pub fn cancel(&self) {
        let mut state = lock_state(&self.shared.state);
        state.timer_generation = None;
        state.last_args = None;
        state.last_call_time = None;
        state.last_invoke_time = None;
    }

    /// Perform the pending trailing invocation immediately, if any, and
    /// return its result.
    pub fn flush(&self) -> Option<R> {
        let now = self.shared.clock.now();
        let mut state = lock_state(&self.shared.state);
        if state.timer_generation.is_some() {
            Self::trailing_edge(&self.shared, &mut state, now)
        } else {
            state.last_result.clone()
        }
    }

    /// Whether a trailing timer is currently armed.
    pub fn pending(&self) -> bool {
        lock_state(&self.shared.state).timer_generation.is_some()
    }

    fn should_invoke(
        shared: &ControlShared<A, R>,
        state: &ControlState<A, R>,
        now: Instant,
    ) -> bool {
        let Some(last_call) = state.last_call_time else {
            // First call since construction or cancel.
            return true;
        };
        if now.duration_since(last_call) >= shared.wait {
            return true;
        }
        match (shared.max_wait, state.last_invoke_time) {
            (Some(max_wait), Some(last_invoke)) => {
                now.duration_since(last_invoke) >= max_wait
            }
            (Some(_), None) => true,
            _ => false,
        }
    }

    fn leading_edge(
        shared: &Arc<ControlShared<A, R>>,
        state: &mut ControlState<A, R>,
        now: Instant,
    ) -> Option<R> {
        // Start the deferral clock even when the leading edge is disabled,
        // so max_wait counts from the window opening.
        state.last_invoke_time = Some(now);
        Self::arm_timer(shared, state, shared.wait);
        if shared.leading {
            Self::invoke(state, now)
        } else {
            state.last_result.clone()
        }
    }

    fn trailing_edge(
        shared: &Arc<ControlShared<A, R>>,
        state: &mut ControlState<A, R>,
        now: Instant,
    ) -> Option<R> {
        state.timer_generation = None;
        // Only invoke if the operation was called after the leading edge.
        if shared.trailing && state.last_args.is_some() {
            return Self::invoke(state, now);
        }
        state.last_args = None;
        state.last_result.clone()
    }

    fn invoke(state: &mut ControlState<A, R>, now: Instant) -> Option<R> {
        let args = state.last_args.take()?;
        state.last_invoke_time = Some(now);
        let result = (state.operation)(args);
        state.last_result = Some(result.clone());
        Some(result)
    }

    fn arm_timer(
        shared: &Arc<ControlShared<A, R>>,
        state: &mut ControlState<A, R>,
        delay: Duration,
    ) {
        state.generation += 1;
        let generation = state.generation;
        state.timer_generation = Some(generation);
        let pause = shared.scheduler.delay(delay);
        let this = Arc::clone(shared);
        shared.scheduler.spawn(Box::pin(async move {
            pause.await;
            Self::timer_expired(&this, generation);
        }));
    }

    fn timer_expired(shared: &Arc<ControlShared<A, R>>, generation: u64) {
        let now = shared.clock.now();
        let mut state = lock_state(&shared.state);
        if state.timer_generation != Some(generation) {
            // Cancelled or superseded while we slept.
            return;
        }
        if Self::should_invoke(shared, &state, now) {
            tracing::trace!(generation, "trailing edge");
            Self::trailing_edge(shared, &mut state, now);
        } else {
            // Calls arrived while we slept; sleep out the remainder.
            let delay = Self::remaining_wait(shared, &state, now);
            Self::arm_timer(shared, &mut state, delay);
        }
    }

    fn remaining_wait(
        shared: &ControlShared<A, R>,
        state: &ControlState<A, R>,
        now: Instant,
    ) -> Duration {
        let since_call = state
            .last_call_time
            .map(|t| now.duration_since(t))
            .unwrap_or(shared.wait);
        let remaining = shared.wait.saturating_sub(since_call);
        match (shared.max_wait, state.last_invoke_time) {
            (Some(max_wait), Some(last_invoke)) => {
                remaining.min(max_wait.saturating_sub(now.duration_since(last_invoke)))
            }
            _ => remaining,
        }
    }
}

/// A panicked operation leaves the surrounding state consistent; keep
/// serving rather than propagating the poison.
fn lock_state<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
