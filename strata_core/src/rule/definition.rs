// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Detached rule definitions.
//!
//! A [`Rule`] is the persistent part of one rule outside any tree. A
//! [`RuleNode`] is a detached subtree. Both are plain owned values: build
//! them, then hand them to a [`RuleTree`](super::RuleTree), which takes
//! ownership of every symbol inside.

use alloc::string::String;
use alloc::vec::Vec;

use crate::scale::ScaleRange;

/// Flags for one rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RuleFlags {
    /// Disabled rules (and their whole subtree) never match.
    pub active: bool,
    /// ELSE rules only run when no ordinary sibling rendered.
    pub is_else: bool,
}

impl Default for RuleFlags {
    fn default() -> Self {
        Self {
            active: true,
            is_else: false,
        }
    }
}

/// The definition of one rule, detached from any tree.
///
/// A rule with no filter and the default scale range matches every feature.
/// A rule without a symbol draws nothing itself but may still group
/// children.
#[derive(Clone, Debug, PartialEq)]
pub struct Rule<S> {
    /// Owned symbol, if the rule draws.
    pub symbol: Option<S>,
    /// Scale denominators at which the rule applies.
    pub scale: ScaleRange,
    /// Filter expression source; blank means "no filter".
    pub filter: String,
    /// Human-readable label (legend text).
    pub label: String,
    /// Longer description.
    pub description: String,
    /// Active and ELSE flags.
    pub flags: RuleFlags,
    /// Unique key; generated by the tree when `None` or already taken.
    pub key: Option<String>,
}

impl<S> Default for Rule<S> {
    fn default() -> Self {
        Self {
            symbol: None,
            scale: ScaleRange::UNBOUNDED,
            filter: String::new(),
            label: String::new(),
            description: String::new(),
            flags: RuleFlags::default(),
            key: None,
        }
    }
}

impl<S> Rule<S> {
    /// Creates an active, unfiltered rule that takes ownership of `symbol`.
    #[must_use]
    pub fn new(symbol: Option<S>) -> Self {
        Self {
            symbol,
            ..Self::default()
        }
    }

    /// Creates a rule drawing `symbol`.
    #[must_use]
    pub fn with_symbol(symbol: S) -> Self {
        Self::new(Some(symbol))
    }

    /// Creates a rule without a symbol (a pure grouping node).
    #[must_use]
    pub fn group() -> Self {
        Self::new(None)
    }

    /// Sets the filter expression.
    #[must_use]
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Sets the scale range.
    #[must_use]
    pub fn scale(mut self, min_denom: f64, max_denom: f64) -> Self {
        self.scale = ScaleRange::new(min_denom, max_denom);
        self
    }

    /// Sets the label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Marks the rule as an ELSE rule.
    #[must_use]
    pub fn else_rule(mut self) -> Self {
        self.flags.is_else = true;
        self
    }

    /// Sets the active flag.
    #[must_use]
    pub fn active(mut self, active: bool) -> Self {
        self.flags.active = active;
        self
    }

    /// Requests a specific key.
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// A detached subtree: a rule definition plus its ordered children.
#[derive(Clone, Debug, PartialEq)]
pub struct RuleNode<S> {
    /// The rule at the top of the subtree.
    pub rule: Rule<S>,
    /// Children in declaration order.
    pub children: Vec<Self>,
}

impl<S> RuleNode<S> {
    /// Creates a childless node.
    #[must_use]
    pub fn new(rule: Rule<S>) -> Self {
        Self {
            rule,
            children: Vec::new(),
        }
    }

    /// Appends a child subtree.
    #[must_use]
    pub fn child(mut self, child: impl Into<Self>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Number of rules in the subtree, including this one.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(Self::len).sum::<usize>()
    }

    /// Always `false`; a node contains at least its own rule.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl<S> From<Rule<S>> for RuleNode<S> {
    fn from(rule: Rule<S>) -> Self {
        Self::new(rule)
    }
}
