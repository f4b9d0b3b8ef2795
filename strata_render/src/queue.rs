// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render queue: draw jobs bucketed by symbol level for one pass.

use alloc::vec::Vec;

use strata_core::context::FeatureFlags;
use strata_core::rule::RuleId;

/// A single draw command: one layer of one rule's symbol for one feature.
///
/// Jobs only refer to the feature and the symbol; both are owned elsewhere
/// (the pass retains matched features, the tree owns symbols).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RenderJob {
    /// Arrival index of the feature among the features retained by the pass.
    pub feature: usize,
    /// Rule whose symbol is drawn.
    pub rule: RuleId,
    /// Layer of the symbol to draw.
    pub layer: usize,
    /// Flags the feature was offered with.
    pub flags: FeatureFlags,
}

/// Jobs sharing one normalized level, in insertion order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderLevel {
    /// Normalized level.
    pub level: u32,
    /// Declared level the normalized level stands for.
    pub z_index: i32,
    /// Jobs in insertion order.
    pub jobs: Vec<RenderJob>,
}

/// Ordered collection of [`RenderLevel`]s for one pass.
///
/// Levels are created the first time a job lands on them and are kept
/// sorted by ascending z-index.
#[derive(Clone, Debug, Default)]
pub struct RenderQueue {
    levels: Vec<RenderLevel>,
}

impl RenderQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `job` to the level with the given z-index.
    pub fn push(&mut self, level: u32, z_index: i32, job: RenderJob) {
        let pos = match self.levels.binary_search_by_key(&z_index, |l| l.z_index) {
            Ok(pos) => pos,
            Err(pos) => {
                self.levels.insert(
                    pos,
                    RenderLevel {
                        level,
                        z_index,
                        jobs: Vec::new(),
                    },
                );
                pos
            }
        };
        debug_assert_eq!(
            self.levels[pos].level, level,
            "one z-index must map to one normalized level"
        );
        self.levels[pos].jobs.push(job);
    }

    /// Levels in ascending z order.
    #[must_use]
    pub fn levels(&self) -> &[RenderLevel] {
        &self.levels
    }

    /// Total number of queued jobs.
    #[must_use]
    pub fn job_count(&self) -> usize {
        self.levels.iter().map(|l| l.jobs.len()).sum()
    }

    /// Returns `true` if no job is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Drops every level.
    pub fn clear(&mut self) {
        self.levels.clear();
    }

    /// Removes and returns every level, leaving the queue empty.
    pub fn take_levels(&mut self) -> Vec<RenderLevel> {
        core::mem::take(&mut self.levels)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use strata_core::rule::{Rule, RuleTree};

    use super::*;

    fn job(rule: RuleId, feature: usize, layer: usize) -> RenderJob {
        RenderJob {
            feature,
            rule,
            layer,
            flags: FeatureFlags::default(),
        }
    }

    fn rule() -> RuleId {
        let mut tree = RuleTree::<()>::new();
        let root = tree.root();
        tree.append_child(root, Rule::group())
    }

    #[test]
    fn levels_are_created_on_demand_in_z_order() {
        let r = rule();
        let mut queue = RenderQueue::new();
        queue.push(2, 10, job(r, 0, 0));
        queue.push(0, -5, job(r, 0, 1));
        queue.push(1, 3, job(r, 1, 0));
        queue.push(2, 10, job(r, 1, 0));

        let z: Vec<_> = queue.levels().iter().map(|l| l.z_index).collect();
        assert_eq!(z, vec![-5, 3, 10]);
        let top: Vec<_> = queue.levels()[2].jobs.iter().map(|j| j.feature).collect();
        assert_eq!(top, vec![0, 1], "jobs keep insertion order");
        assert_eq!(queue.job_count(), 4);
    }

    #[test]
    fn take_levels_empties_queue() {
        let r = rule();
        let mut queue = RenderQueue::new();
        queue.push(0, 0, job(r, 0, 0));
        let levels = queue.take_levels();
        assert_eq!(levels.len(), 1);
        assert!(queue.is_empty());
        assert_eq!(queue.job_count(), 0);

        queue.push(0, 0, job(r, 0, 0));
        queue.clear();
        assert!(queue.levels().is_empty());
    }
}
