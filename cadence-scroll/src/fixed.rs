//! Fixed-height windowing: pure arithmetic over a constant item height.

use cadence_core::{CadenceResult, ConfigError};
use serde::{Deserialize, Serialize};

use crate::window::{VirtualItem, WindowRange};

/// Configuration for a [`FixedVirtualScroll`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedScrollConfig {
    /// Height of every item.
    pub item_height: f64,
    /// Extra off-screen items materialized beyond each edge of the
    /// viewport, to reduce blank flashes during fast scroll.
    pub overscan: usize,
    /// Current viewport height.
    pub viewport_height: f64,
    /// Total number of items in the list.
    pub item_count: usize,
}

impl Default for FixedScrollConfig {
    fn default() -> Self {
        Self {
            item_height: 40.0,
            overscan: 3,
            viewport_height: 600.0,
            item_count: 0,
        }
    }
}

impl FixedScrollConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item_height(mut self, item_height: f64) -> Self {
        self.item_height = item_height;
        self
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

    /// Validate the configuration.
    pub fn validate(&self) -> CadenceResult<()> {
        if !self.item_height.is_finite() || self.item_height <= 0.0 {
            return Err(ConfigError::invalid_value(
                "item_height",
                self.item_height,
                "must be a positive finite height",
            )
            .into());
        }
        if !self.viewport_height.is_finite() || self.viewport_height < 0.0 {
            return Err(ConfigError::invalid_value(
                "viewport_height",
                self.viewport_height,
                "must be a non-negative finite height",
            )
            .into());
        }
        Ok(())
    }
}

/// Windowing engine for lists whose items all share one height.
#[derive(Debug, Clone)]
pub struct FixedVirtualScroll {
    config: FixedScrollConfig,
}

impl FixedVirtualScroll {
    pub fn new(config: FixedScrollConfig) -> CadenceResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FixedScrollConfig {
        &self.config
    }

    /// Index range to materialize at `scroll_offset`.
    pub fn window(&self, scroll_offset: f64) -> WindowRange {
        let count = self.config.item_count;
        let offset = scroll_offset.max(0.0);
        let first = ((offset / self.config.item_height).floor() as usize).min(count);
        let visible = (self.config.viewport_height / self.config.item_height).ceil() as usize;
        WindowRange {
            start: first.saturating_sub(self.config.overscan),
            end: (first + visible + self.config.overscan).min(count),
        }
    }

    /// Items inside the window, each with its absolute spacer offset.
    pub fn visible_items(&self, scroll_offset: f64) -> Vec<VirtualItem> {
        let range = self.window(scroll_offset);
        (range.start..range.end)
            .map(|index| VirtualItem {
                index,
                top: self.item_offset(index),
            })
            .collect()
    }

    /// Absolute offset of `index` inside the spacer. Out-of-range indices
    /// clamp to the last item.
    pub fn item_offset(&self, index: usize) -> f64 {
        self.clamp_index(index) as f64 * self.config.item_height
    }

    /// Full spacer height keeping native scrollbar proportions correct.
    pub fn total_height(&self) -> f64 {
        self.config.item_count as f64 * self.config.item_height
    }

    /// Target scroll offset that brings `index` to the top of the viewport.
    pub fn scroll_to_index(&self, index: usize) -> f64 {
        self.item_offset(index)
    }

    pub fn scroll_to_top(&self) -> f64 {
        0.0
    }

    pub fn scroll_to_bottom(&self) -> f64 {
        (self.total_height() - self.config.viewport_height).max(0.0)
    }

    /// Keep geometry current when the container resizes.
    pub fn set_viewport_height(&mut self, viewport_height: f64) {
        self.config.viewport_height = viewport_height;
    }

    /// Keep geometry current when the list grows or shrinks.
    pub fn set_item_count(&mut self, item_count: usize) {
        self.config.item_count = item_count;
    }

    fn clamp_index(&self, index: usize) -> usize {
        index.min(self.config.item_count.saturating_sub(1))
    }
}
