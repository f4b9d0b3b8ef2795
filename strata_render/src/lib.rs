// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render queue and rule-based render dispatcher for strata.
//!
//! This crate sits between [`strata_core`]'s rule evaluation and the
//! painter that draws symbol layers. It defines:
//!
//! - [`RenderJob`]: one (feature, symbol layer) draw command
//! - [`RenderLevel`] / [`RenderQueue`]: jobs bucketed by normalized symbol
//!   level, kept in ascending z order
//! - [`RuleRenderer`]: owns a [`RuleTree`](strata_core::rule::RuleTree) and
//!   starts render passes
//! - [`RenderPass`]: one scoped pass: features are queued while they
//!   arrive and drawn level by level when the pass finishes
//!
//! A pass has two phases. While features arrive, the pass only enqueues.
//! When it is finished (or dropped), the queue is flushed: every job of
//! the lowest level is drawn, in feature arrival order, before any job of
//! the next level. All fills therefore draw below all outlines, whatever
//! order the features came in.

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

mod pass;
mod queue;
mod renderer;

#[cfg(test)]
mod testing;

pub use pass::RenderPass;
pub use queue::{RenderJob, RenderLevel, RenderQueue};
pub use renderer::{RendererConfig, RuleRenderer};
