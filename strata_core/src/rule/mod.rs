// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rule tree data model.
//!
//! A *rule* is a node in a classification tree. Each rule has:
//!
//! - An identity ([`RuleId`]): a generational handle that becomes stale when
//!   the rule is removed, plus a unique string [`key`](RuleTree::key) that
//!   survives cloning and persistence.
//! - Topology: parent, first-child, and sibling links forming an ordered tree.
//!   Child order is declaration order and drives evaluation and draw order.
//! - **Definition** set by the caller: [`symbol`](RuleTree::set_symbol),
//!   [`filter`](RuleTree::set_filter), [`scale`](RuleTree::set_scale),
//!   [`label`](RuleTree::set_label), and [`flags`](RuleTree::set_active).
//! - **Derived caches** brought up to date by [`refresh`](RuleTree::refresh):
//!   the ordinary/ELSE partition of each parent's children and the
//!   tree-wide set of declared symbol levels.
//!
//! Per-pass data (gates, compiled filters, normalized layer slots) never
//! lives in the tree. It lives in a [`RenderState`] that borrows the tree for
//! the duration of one pass, so the persistent definition cannot be edited
//! while a pass is running.
//!
//! # Dirty tracking
//!
//! Structural edits automatically mark the corresponding dirty channel
//! (see [`dirty`](crate::dirty)):
//!
//! - **PARTITION**: child-list changes and ELSE-flag toggles mark the
//!   parent whose partition must be rebuilt.
//! - **ZLEVELS**: symbol changes mark the root; the level set is
//!   recollected from the whole tree.

mod definition;
mod evaluate;
mod id;
mod store;
mod traverse;

pub use definition::{Rule, RuleFlags, RuleNode};
pub use evaluate::{ElsePolicy, MatchSink, RenderResult, RenderState};
pub use id::{INVALID, RuleId};
pub use store::{RuleTree, RuleTreeError};
pub use traverse::{Children, Descendants};
