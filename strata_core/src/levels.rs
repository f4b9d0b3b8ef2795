// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Symbol-level normalization.
//!
//! Symbols declare arbitrary integer levels for their layers (negative,
//! sparse, repeated). Before a pass, the distinct levels used anywhere in
//! the rule tree are collected and mapped onto a contiguous range
//! `0..N`, so that:
//!
//! - layers declaring the same level in different rules land on the same
//!   normalized level, and
//! - unused levels are compacted out.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;

/// One symbol layer placed on a normalized level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerSlot {
    /// Normalized level (`0..N`).
    pub level: u32,
    /// Index of the layer inside its symbol.
    pub layer: usize,
}

/// Mapping from declared levels to normalized levels.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LevelMap {
    /// Distinct declared levels in ascending order; position is the
    /// normalized level.
    z_levels: Vec<i32>,
}

impl LevelMap {
    /// Builds the map from any collection of declared levels.
    #[must_use]
    pub fn new(levels: impl IntoIterator<Item = i32>) -> Self {
        let set: BTreeSet<i32> = levels.into_iter().collect();
        Self {
            z_levels: set.into_iter().collect(),
        }
    }

    /// Builds the map from levels that are already sorted and distinct.
    pub(crate) fn from_sorted(z_levels: Vec<i32>) -> Self {
        debug_assert!(
            z_levels.windows(2).all(|w| w[0] < w[1]),
            "levels must be strictly ascending"
        );
        Self { z_levels }
    }

    /// Number of normalized levels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.z_levels.len()
    }

    /// Returns `true` if no symbol declares any level.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.z_levels.is_empty()
    }

    /// Returns the normalized level of a declared level.
    #[must_use]
    pub fn normalize(&self, z: i32) -> Option<u32> {
        let idx = self.z_levels.binary_search(&z).ok()?;
        u32::try_from(idx).ok()
    }

    /// Returns the declared level behind normalized level `level`.
    #[must_use]
    pub fn z_index(&self, level: u32) -> Option<i32> {
        self.z_levels.get(level as usize).copied()
    }

    /// Declared levels in ascending order.
    #[must_use]
    pub fn z_levels(&self) -> &[i32] {
        &self.z_levels
    }

    /// Places every layer of a symbol on its normalized level.
    ///
    /// Slots are sorted by level, then by layer index. Layers whose level is
    /// unknown to the map are skipped.
    #[must_use]
    pub fn slots(&self, levels: impl IntoIterator<Item = (usize, i32)>) -> Vec<LayerSlot> {
        let mut slots: Vec<LayerSlot> = levels
            .into_iter()
            .filter_map(|(layer, z)| Some(LayerSlot {
                level: self.normalize(z)?,
                layer,
            }))
            .collect();
        slots.sort_unstable();
        slots
    }
}
