// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Legend view over symbol-bearing rules.
//!
//! Every rule that owns a symbol is one legend entry, addressed by the
//! rule's key. An entry's check state is the rule's active flag, so
//! unchecking an entry disables the rule (and everything below it).

use alloc::vec::Vec;

use crate::rule::{RuleId, RuleTree};
use crate::scale::ScaleRange;

/// One legend entry.
#[derive(Debug)]
pub struct LegendItem<'a, S> {
    /// Key of the rule the entry stands for.
    pub key: &'a str,
    /// Rule label.
    pub label: &'a str,
    /// Rule symbol.
    pub symbol: &'a S,
    /// Rule scale range.
    pub scale: ScaleRange,
    /// Number of symbol-bearing ancestors below the root.
    pub depth: usize,
    /// Key of the parent rule, or `None` directly below the root.
    pub parent_key: Option<&'a str>,
    /// Whether the rule is active.
    pub checked: bool,
}

impl<S> Clone for LegendItem<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for LegendItem<'_, S> {}

impl<S> RuleTree<S> {
    /// Lists legend entries depth-first in declaration order.
    ///
    /// With `Some(scale)`, rules out of scale are skipped together with
    /// their subtree.
    #[must_use]
    pub fn legend_symbol_items(&self, scale: Option<f64>) -> Vec<LegendItem<'_, S>> {
        let mut items = Vec::new();
        let root = self.root();
        for child in self.children(root) {
            self.collect_legend(child, scale, 0, &mut items);
        }
        items
    }

    fn collect_legend<'a>(
        &'a self,
        id: RuleId,
        scale: Option<f64>,
        depth: usize,
        items: &mut Vec<LegendItem<'a, S>>,
    ) {
        if scale.is_some_and(|s| !self.is_scale_ok(id, s)) {
            return;
        }
        let mut child_depth = depth;
        if let Some(symbol) = self.symbol(id) {
            let parent_key = self
                .parent(id)
                .filter(|&p| p != self.root())
                .map(|p| self.key(p));
            items.push(LegendItem {
                key: self.key(id),
                label: self.label(id),
                symbol,
                scale: self.scale(id),
                depth,
                parent_key,
                checked: self.is_active(id),
            });
            child_depth += 1;
        }
        for child in self.children(id) {
            self.collect_legend(child, scale, child_depth, items);
        }
    }

    /// Returns the check state of the entry `key`; unknown keys report
    /// `true`.
    #[must_use]
    pub fn legend_symbol_item_checked(&self, key: &str) -> bool {
        self.find_rule_by_key(key).is_none_or(|id| self.is_active(id))
    }

    /// Checks or unchecks the entry `key`. Unknown keys are ignored.
    pub fn check_legend_symbol_item(&mut self, key: &str, checked: bool) {
        if let Some(id) = self.find_rule_by_key(key) {
            self.set_active(id, checked);
        }
    }

    /// Replaces the symbol of the entry `key`.
    ///
    /// Returns `false` (dropping `symbol`) when no rule has that key.
    pub fn set_legend_symbol_item(&mut self, key: &str, symbol: S) -> bool {
        match self.find_rule_by_key(key) {
            Some(id) => {
                self.set_symbol(id, Some(symbol));
                true
            }
            None => false,
        }
    }
}
