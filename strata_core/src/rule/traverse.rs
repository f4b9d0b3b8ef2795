// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use super::id::{INVALID, RuleId};
use super::store::RuleTree;

/// An iterator over the direct children of a rule, in declaration order.
///
/// Created by [`RuleTree::children`].
#[derive(Debug)]
pub struct Children<'a, S> {
    tree: &'a RuleTree<S>,
    current: u32,
}

impl<'a, S> Children<'a, S> {
    pub(crate) fn new(tree: &'a RuleTree<S>, first: u32) -> Self {
        Self {
            tree,
            current: first,
        }
    }
}

impl<S> Iterator for Children<'_, S> {
    type Item = RuleId;

    fn next(&mut self) -> Option<RuleId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.tree.next_sibling[idx as usize];
        Some(self.tree.id_at(idx))
    }
}

/// A depth-first pre-order iterator over every rule below a given rule
/// (children, grandchildren, ...), excluding the rule itself.
///
/// Created by [`RuleTree::descendants`].
#[derive(Debug)]
pub struct Descendants<'a, S> {
    tree: &'a RuleTree<S>,
    top: u32,
    current: u32,
}

impl<'a, S> Descendants<'a, S> {
    pub(crate) fn new(tree: &'a RuleTree<S>, top: u32) -> Self {
        Self {
            tree,
            top,
            current: tree.first_child[top as usize],
        }
    }
}

impl<S> Iterator for Descendants<'_, S> {
    type Item = RuleId;

    fn next(&mut self) -> Option<RuleId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        let first = self.tree.first_child[idx as usize];
        self.current = if first != INVALID {
            first
        } else {
            // Climb until a rule with a next sibling, stopping at `top`.
            let mut n = idx;
            loop {
                let sibling = self.tree.next_sibling[n as usize];
                if sibling != INVALID {
                    break sibling;
                }
                n = self.tree.parent[n as usize];
                if n == self.top || n == INVALID {
                    break INVALID;
                }
            }
        };
        Some(self.tree.id_at(idx))
    }
}
