//! Grouping-category attributes, which decide how a component's children are traversed.

use std::collections::BTreeMap;

/// Enables or disables individual children of a component.
///
/// Children without an explicit setting follow the default, so the switch works
/// regardless of how many children the owning component gains later.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchAttribute {
    default_enabled: bool,
    overrides: BTreeMap<usize, bool>,
}

impl Default for SwitchAttribute {
    fn default() -> Self {
        Self::all_enabled()
    }
}

impl SwitchAttribute {
    pub fn all_enabled() -> Self {
        Self {
            default_enabled: true,
            overrides: BTreeMap::new(),
        }
    }

    pub fn all_disabled() -> Self {
        Self {
            default_enabled: false,
            overrides: BTreeMap::new(),
        }
    }

    /// A switch showing exactly one child.
    pub fn only(index: usize) -> Self {
        let mut switch = Self::all_disabled();
        switch.enable(index);
        switch
    }

    pub fn enable_all(&mut self) {
        *self = Self::all_enabled();
    }

    pub fn disable_all(&mut self) {
        *self = Self::all_disabled();
    }

    /// Enables `index` and disables every other child.
    pub fn enable_only(&mut self, index: usize) {
        *self = Self::only(index);
    }

    pub fn enable(&mut self, index: usize) {
        self.set_enabled(index, true);
    }

    pub fn disable(&mut self, index: usize) {
        self.set_enabled(index, false);
    }

    fn set_enabled(&mut self, index: usize, enabled: bool) {
        if enabled == self.default_enabled {
            self.overrides.remove(&index);
        } else {
            self.overrides.insert(index, enabled);
        }
    }

    pub fn is_enabled(&self, index: usize) -> bool {
        self.overrides
            .get(&index)
            .copied()
            .unwrap_or(self.default_enabled)
    }
}

/// Level-of-detail selection by distance from the eye.
///
/// Child `i` is displayed while the eye distance is below `range_end(i)` and at or
/// above `range_end(i - 1)`. With no ranges configured, child 0 is always shown.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LodAttribute {
    range_ends: Vec<f32>,
}

impl LodAttribute {
    pub fn new(range_ends: Vec<f32>) -> Self {
        Self { range_ends }
    }

    /// Sets the far limit for a child, growing the range list as needed.
    ///
    /// Newly created intermediate entries copy the previous limit, which gives
    /// them an empty range.
    pub fn set_range_end(&mut self, child: usize, range: f32) {
        while self.range_ends.len() <= child {
            let previous = self.range_ends.last().copied().unwrap_or(0.0);
            self.range_ends.push(previous);
        }
        self.range_ends[child] = range;
    }

    pub fn range_end(&self, child: usize) -> Option<f32> {
        self.range_ends.get(child).copied()
    }

    pub fn range_ends(&self) -> &[f32] {
        &self.range_ends
    }

    /// Picks the child to display at `distance`, None if it is beyond every range.
    pub fn select_child(&self, distance: f32, child_count: usize) -> Option<usize> {
        if child_count == 0 {
            return None;
        }
        if self.range_ends.is_empty() {
            return Some(0);
        }
        self.range_ends
            .iter()
            .take(child_count)
            .position(|&end| distance < end)
    }
}

/// Draws children in order as coplanar layers, each offset one step further forward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecalAttribute {
    /// Depth offset added per child index
    pub offset_step: f32,
}

impl Default for DecalAttribute {
    fn default() -> Self {
        Self { offset_step: 1.0 }
    }
}

impl DecalAttribute {
    pub fn layer_offset(&self, child: usize) -> f32 {
        self.offset_step * child as f32
    }
}
