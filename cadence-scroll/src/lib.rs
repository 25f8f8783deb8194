//! Cadence Scroll - Virtual Scroll Window
//!
//! Computes, from a scroll offset and viewport size, the minimal contiguous
//! index range of a large ordered list that must be materialized. The engine
//! is UI-agnostic: the host renders the items it is told to and feeds back
//! scroll offsets, viewport sizes, and (for the variable-height model)
//! measured item heights.
//!
//! Two models:
//!
//! - [`FixedVirtualScroll`]: constant item height, pure arithmetic, O(1)
//!   per scroll event.
//! - [`VariableVirtualScroll`]: per-item heights (measured, or estimated
//!   until measured) prefix-summed into a position table; O(log N) range
//!   lookup per scroll event, O(N) table rebuild only when a measured
//!   height changes.
//!
//! Scroll-position updates are funneled through [`ScrollHandler`], which
//! wraps a caller-supplied callback in a throttle at display-refresh
//! frequency. Out-of-range indices are always clamped, never an error.

pub mod fixed;
pub mod handler;
pub mod variable;
pub mod window;

pub use fixed::{FixedScrollConfig, FixedVirtualScroll};
pub use handler::{ScrollHandler, SCROLL_THROTTLE_INTERVAL};
pub use variable::{HeightEstimator, ItemPosition, VariableScrollConfig, VariableVirtualScroll};
pub use window::{VirtualItem, WindowRange};
