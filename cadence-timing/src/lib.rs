//! Cadence Timing - Invocation-Rate Control
//!
//! Rate-limits invocation of a target operation. Two constructors share one
//! underlying mechanism:
//!
//! - [`debounce`]: collapse a burst of calls into (at most) a leading and a
//!   trailing invocation. The trailing timer fires once the burst has been
//!   quiet for the configured wait.
//! - [`throttle`]: the same mechanism with a maximum deferral equal to the
//!   wait, guaranteeing at least one invocation per wait-length interval no
//!   matter how fast calls arrive.
//!
//! Controllers are cheap cloneable handles; the pending trailing timer is
//! the only resource they hold, released via [`Controller::cancel`].
//!
//! # Example
//!
//! ```ignore
//! let search = debounce(|query: String| run_search(&query), Duration::from_millis(300),
//!     DebounceOptions::default());
//! search.call("ca".to_string());
//! search.call("cad".to_string());
//! // one invocation, with "cad", 300ms after the last keystroke
//! ```

pub mod controller;

pub use controller::{debounce, throttle, Controller, DebounceOptions, ThrottleOptions};
