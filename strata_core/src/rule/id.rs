// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rule identity.

use core::fmt;

/// Sentinel value indicating "no rule" in index fields.
pub const INVALID: u32 = u32::MAX;

/// A handle to a rule in a [`RuleTree`](super::RuleTree).
///
/// Contains both a slot index and a generation counter so that stale handles
/// can be detected after a rule is removed and the slot is reused.
///
/// Handles are only meaningful for the tree that issued them. Use the rule's
/// string key to address a rule across saves and loads.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId {
    /// Slot index into the tree's arrays.
    pub(crate) idx: u32,
    /// Generation counter; must match the tree's generation for this slot.
    pub(crate) generation: u32,
}

impl RuleId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RuleId({}@gen{})", self.idx, self.generation)
    }
}
