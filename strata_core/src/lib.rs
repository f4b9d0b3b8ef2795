// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rule tree and per-pass evaluation for rule-based map rendering.
//!
//! `strata_core` decides *which* symbols apply to each feature of a vector
//! layer and at *which* normalized symbol level each symbol layer draws. It
//! does not paint anything: drawing, expression parsing, and symbol
//! definitions are external collaborators reached through traits. It is
//! `no_std` compatible (with `alloc`) and stores rules in struct-of-arrays
//! layout addressed by generational handles.
//!
//! # Architecture
//!
//! ```text
//!   RuleTree (persistent definitions)
//!       │ refresh()
//!       ▼
//!   RenderState::start() ──► gates, compiled filters, LevelMap
//!       │
//!       ▼  per feature
//!   RenderState::render_feature() ──► MatchSink::on_match(rule, symbol, slots)
//!       │
//!       ▼
//!   render queue (strata_render) ──► SymbolPainter::draw_layer()
//! ```
//!
//! **[`rule`]**: The rule arena ([`RuleTree`](rule::RuleTree)), detached
//! definitions ([`Rule`](rule::Rule), [`RuleNode`](rule::RuleNode)), and the
//! per-pass companion table ([`RenderState`](rule::RenderState)).
//!
//! **[`dirty`]**: Cache invalidation channels for the ELSE partition and
//! the tree-wide z-level set, via `understory_dirty`.
//!
//! **[`levels`]**: Normalization of declared symbol-layer levels into a
//! contiguous `0..N` range.
//!
//! **[`scale`]**, **[`context`]**: Scale-denominator gating and the per-pass
//! render context.
//!
//! **[`expression`]** and **[`symbol`]**: Contracts for the external filter
//! engine, symbols, and the painter that draws one symbol layer.
//!
//! **[`refine`]**: One-shot transforms that split a rule into generated
//! children (categories, ranges, scale bands).
//!
//! **[`legend`]**: Legend view over symbol-bearing rules.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! render-pass instrumentation, with a zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-draw-call
//!   events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod context;
pub mod dirty;
pub mod expression;
pub mod legend;
pub mod levels;
pub mod refine;
pub mod rule;
pub mod scale;
pub mod symbol;
pub mod trace;

#[cfg(test)]
pub(crate) mod testing;
