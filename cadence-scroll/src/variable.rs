//! Variable-height windowing: measured heights, estimator fallback, and a
//! prefix-summed position table searched binarily on every scroll event.
//!
//! The position table is rebuilt in O(N) whenever a cached height changes.
//! Rebuilds are triggered by measurement deltas, not by scroll events, so
//! the steady-state cost per scroll is one O(log N) search.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::window::WindowRange;

/// Supplies a height guess for items that have not been measured yet.
pub type HeightEstimator = Arc<dyn Fn(usize) -> f64 + Send + Sync>;

/// One row of the position table.
///
/// Invariant: `positions[i].bottom == positions[i + 1].top`, and
/// `height == bottom - top`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ItemPosition {
    pub index: usize,
    pub top: f64,
    pub height: f64,
    pub bottom: f64,
}

/// Configuration for a [`VariableVirtualScroll`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariableScrollConfig {
    /// Extra off-screen items materialized beyond each edge of the viewport.
    pub overscan: usize,
    /// Current viewport height.
    pub viewport_height: f64,
    /// Total number of items in the list.
    pub item_count: usize,
}

impl Default for VariableScrollConfig {
    fn default() -> Self {
        Self {
            overscan: 3,
            viewport_height: 600.0,
            item_count: 0,
        }
    }
}

impl VariableScrollConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    pub fn with_viewport_height(mut self, viewport_height: f64) -> Self {
        self.viewport_height = viewport_height;
        self
    }

    pub fn with_item_count(mut self, item_count: usize) -> Self {
        self.item_count = item_count;
        self
    }
}

/// Windowing engine for lists whose items have individual heights.
pub struct VariableVirtualScroll {
    config: VariableScrollConfig,
    estimator: HeightEstimator,
    /// Actual rendered height per index, reported by the host after an
    /// item first renders.
    measured: HashMap<usize, f64>,
    positions: Vec<ItemPosition>,
    dirty: bool,
}

impl VariableVirtualScroll {
    pub fn new(config: VariableScrollConfig, estimator: HeightEstimator) -> Self {
        Self {
            config,
            estimator,
            measured: HashMap::new(),
            positions: Vec::new(),
            dirty: true,
        }
    }

    /// Convenience constructor for a flat height estimate.
    pub fn with_estimated_height(config: VariableScrollConfig, estimate: f64) -> Self {
        Self::new(config, Arc::new(move |_| estimate))
    }

    pub fn config(&self) -> &VariableScrollConfig {
        &self.config
    }

    /// Record the actual rendered height of `index`. A change invalidates
    /// the position table; reporting an unchanged height is free.
    /// Out-of-range indices are ignored.
    pub fn report_height(&mut self, index: usize, height: f64) {
        if index >= self.config.item_count || !height.is_finite() || height < 0.0 {
            return;
        }
        if self.measured.get(&index) != Some(&height) {
            self.measured.insert(index, height);
            self.dirty = true;
        }
    }

    /// Index range to materialize at `scroll_offset`.
    ///
    /// Binary search for the first item whose bottom reaches the viewport
    /// top and the last whose top is inside the viewport bottom, expanded
    /// by the overscan and clamped to the list.
    pub fn window(&mut self, scroll_offset: f64) -> WindowRange {
        self.ensure_positions();
        if self.positions.is_empty() {
            return WindowRange { start: 0, end: 0 };
        }
        let viewport_top = scroll_offset.max(0.0);
        let viewport_bottom = viewport_top + self.config.viewport_height;

        let first = self
            .positions
            .partition_point(|p| p.bottom < viewport_top);
        let last = self
            .positions
            .partition_point(|p| p.top <= viewport_bottom);

        WindowRange {
            start: first.saturating_sub(self.config.overscan),
            end: (last + self.config.overscan).min(self.config.item_count),
        }
    }

    /// Positions of the items inside the window.
    pub fn visible_items(&mut self, scroll_offset: f64) -> Vec<ItemPosition> {
        let range = self.window(scroll_offset);
        self.positions[range.start..range.end].to_vec()
    }

    /// Full spacer height.
    pub fn total_height(&mut self) -> f64 {
        self.ensure_positions();
        self.positions.last().map(|p| p.bottom).unwrap_or(0.0)
    }

    /// Target scroll offset that brings `index` to the top of the
    /// viewport. Out-of-range indices clamp to the last item.
    pub fn scroll_to_index(&mut self, index: usize) -> f64 {
        self.ensure_positions();
        if self.positions.is_empty() {
            return 0.0;
        }
        let index = index.min(self.positions.len() - 1);
        self.positions[index].top
    }

    pub fn scroll_to_top(&self) -> f64 {
        0.0
    }

    pub fn scroll_to_bottom(&mut self) -> f64 {
        let total = self.total_height();
        (total - self.config.viewport_height).max(0.0)
    }

    /// Keep geometry current when the container resizes.
    pub fn set_viewport_height(&mut self, viewport_height: f64) {
        self.config.viewport_height = viewport_height;
    }

    /// Keep geometry current when the list grows or shrinks. Measurements
    /// for retained indices survive.
    pub fn set_item_count(&mut self, item_count: usize) {
        if self.config.item_count != item_count {
            self.config.item_count = item_count;
            self.measured.retain(|index, _| *index < item_count);
            self.dirty = true;
        }
    }

    fn ensure_positions(&mut self) {
        if !self.dirty && self.positions.len() == self.config.item_count {
            return;
        }
        self.rebuild_positions();
    }

    /// O(N) prefix summation of per-item heights.
    fn rebuild_positions(&mut self) {
        let count = self.config.item_count;
        let mut positions = Vec::with_capacity(count);
        let mut top = 0.0f64;
        for index in 0..count {
            let height = self
                .measured
                .get(&index)
                .copied()
                .unwrap_or_else(|| (self.estimator)(index))
                .max(0.0);
            let bottom = top + height;
            positions.push(ItemPosition {
                index,
                top,
                height,
                bottom,
            });
            top = bottom;
        }
        self.positions = positions;
        self.dirty = false;
    }
}
