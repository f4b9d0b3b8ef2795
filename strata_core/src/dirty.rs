// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! The rule tree keeps two pieces of derived state next to its persistent
//! definitions. Both are invalidated on write through [`understory_dirty`]
//! channels and recomputed on [`RuleTree::refresh`].
//!
//! - [`PARTITION`]: marked on a *parent* rule whenever its child list
//!   changes (append, insert, remove, take) or a child's ELSE flag is
//!   toggled. Draining it recomputes the normal/ELSE split for exactly the
//!   marked parents.
//! - [`ZLEVELS`]: marked whenever a symbol is attached, replaced, or
//!   detached anywhere in the tree. Draining anything rebuilds the sorted
//!   set of declared symbol-layer levels.
//!
//! Both channels are local-only (no dependency edges), since neither value
//! is inherited by descendants.
//!
//! [`RuleTree::refresh`]: crate::rule::RuleTree::refresh

use understory_dirty::Channel;

/// A child list or a child's ELSE flag changed: the parent's normal/ELSE
/// partition must be recomputed.
pub const PARTITION: Channel = Channel::new(0);

/// A symbol was attached or detached: the tree-wide z-level set must be
/// recollected.
pub const ZLEVELS: Channel = Channel::new(1);
