// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for render passes.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! the render pass calls at each stage. All method bodies default to no-ops,
//! so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! [`PassSummaryBuilder`] collects per-feature outcomes during a pass and
//! produces a [`PassSummary`] at the end.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates [`DrawEvent`] and the
//!   corresponding `TraceSink` method.

use crate::expression::FilterError;
use crate::rule::{RenderResult, RuleId};

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted once the per-pass state is built, before any feature is seen.
#[derive(Clone, Copy, Debug)]
pub struct PassBeginEvent {
    /// Monotonic pass counter of the renderer.
    pub pass_index: u64,
    /// Scale denominator of the pass (`0.0` = scale-independent).
    pub scale_denominator: f64,
    /// Number of normalized symbol levels.
    pub level_count: usize,
    /// Number of rules reachable through active, in-scale ancestors.
    pub active_rules: usize,
}

/// Emitted when a rule's filter fails to compile at pass start.
///
/// The rule never matches for the rest of the pass.
#[derive(Clone, Copy, Debug)]
pub struct FilterErrorEvent<'a> {
    /// The rule whose filter was rejected.
    pub rule: RuleId,
    /// The rule's unique key.
    pub key: &'a str,
    /// The engine's error.
    pub error: &'a FilterError,
}

/// Emitted after a feature has been evaluated against the rule tree.
#[derive(Clone, Copy, Debug)]
pub struct FeatureEvent {
    /// Pass counter.
    pub pass_index: u64,
    /// Arrival index of the feature within the pass.
    pub feature_index: u64,
    /// Outcome at the root rule.
    pub result: RenderResult,
    /// Number of render jobs queued for the feature.
    pub jobs: usize,
}

/// Emitted when one normalized level has been flushed.
#[derive(Clone, Copy, Debug)]
pub struct LevelFlushEvent {
    /// Pass counter.
    pub pass_index: u64,
    /// Normalized level.
    pub level: u32,
    /// Declared level shared by every job on this level.
    pub z_index: i32,
    /// Number of jobs drawn.
    pub jobs: usize,
}

/// Emitted for every individual draw call during the flush.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct DrawEvent {
    /// Pass counter.
    pub pass_index: u64,
    /// Normalized level being flushed.
    pub level: u32,
    /// Arrival index of the feature among retained features.
    pub feature: usize,
    /// Rule owning the symbol.
    pub rule: RuleId,
    /// Symbol layer drawn.
    pub layer: usize,
}

/// Per-pass totals produced by [`PassSummaryBuilder`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Pass counter.
    pub pass_index: u64,
    /// Features offered to the pass.
    pub features: u64,
    /// Features that matched at least one symbol-bearing rule.
    pub rendered: u64,
    /// Features that matched nothing and were dropped.
    pub dropped: u64,
    /// Render jobs queued (and drawn) in total.
    pub jobs: u64,
    /// Normalized levels that held at least one job.
    pub levels: usize,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from render passes.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a pass has been prepared.
    fn on_pass_begin(&mut self, e: &PassBeginEvent) {
        _ = e;
    }

    /// Called when a rule's filter fails to compile.
    fn on_filter_error(&mut self, e: &FilterErrorEvent<'_>) {
        _ = e;
    }

    /// Called after each feature is evaluated.
    fn on_feature(&mut self, e: &FeatureEvent) {
        _ = e;
    }

    /// Called after each level is flushed.
    fn on_level_flush(&mut self, e: &LevelFlushEvent) {
        _ = e;
    }

    /// Called with the pass totals once the flush has completed.
    fn on_pass_end(&mut self, s: &PassSummary) {
        _ = s;
    }

    /// Called for every draw call (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_draw(&mut self, e: &DrawEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`PassBeginEvent`].
    #[inline]
    pub fn pass_begin(&mut self, e: &PassBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_pass_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FilterErrorEvent`].
    #[inline]
    pub fn filter_error(&mut self, e: &FilterErrorEvent<'_>) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_filter_error(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FeatureEvent`].
    #[inline]
    pub fn feature(&mut self, e: &FeatureEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_feature(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`LevelFlushEvent`].
    #[inline]
    pub fn level_flush(&mut self, e: &LevelFlushEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_level_flush(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PassSummary`].
    #[inline]
    pub fn pass_end(&mut self, s: &PassSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_pass_end(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits a [`DrawEvent`] (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn draw(&mut self, e: &DrawEvent) {
        if let Some(s) = &mut self.sink {
            s.on_draw(e);
        }
    }
}

// ---------------------------------------------------------------------------
// PassSummaryBuilder
// ---------------------------------------------------------------------------

/// Accumulates per-feature and per-level counts during a pass.
#[derive(Debug)]
pub struct PassSummaryBuilder {
    summary: PassSummary,
}

impl PassSummaryBuilder {
    /// Starts a summary for pass `pass_index`.
    #[must_use]
    pub fn new(pass_index: u64) -> Self {
        Self {
            summary: PassSummary {
                pass_index,
                ..PassSummary::default()
            },
        }
    }

    /// Records the outcome of one feature.
    pub fn record_feature(&mut self, result: RenderResult, jobs: usize) {
        self.summary.features += 1;
        if result == RenderResult::Rendered {
            self.summary.rendered += 1;
        } else {
            self.summary.dropped += 1;
        }
        self.summary.jobs += jobs as u64;
    }

    /// Records one flushed level.
    pub fn record_level(&mut self, jobs: usize) {
        if jobs > 0 {
            self.summary.levels += 1;
        }
    }

    /// Returns the totals so far.
    #[must_use]
    pub fn current(&self) -> PassSummary {
        self.summary
    }

    /// Consumes the builder and produces the final [`PassSummary`].
    #[must_use]
    pub fn finish(self) -> PassSummary {
        self.summary
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_pass_begin(&PassBeginEvent {
            pass_index: 0,
            scale_denominator: 0.0,
            level_count: 0,
            active_rules: 1,
        });
        sink.on_pass_end(&PassSummary::default());
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.level_flush(&LevelFlushEvent {
            pass_index: 3,
            level: 0,
            z_index: -1,
            jobs: 4,
        });
        tracer.pass_end(&PassSummary::default());
    }

    #[test]
    fn summary_builder_counts_outcomes() {
        let mut builder = PassSummaryBuilder::new(7);
        builder.record_feature(RenderResult::Rendered, 3);
        builder.record_feature(RenderResult::Filtered, 0);
        builder.record_feature(RenderResult::Inactive, 0);
        builder.record_feature(RenderResult::Rendered, 1);
        builder.record_level(2);
        builder.record_level(0);
        builder.record_level(2);

        let summary = builder.finish();
        assert_eq!(summary.pass_index, 7);
        assert_eq!(summary.features, 4);
        assert_eq!(summary.rendered, 2);
        assert_eq!(summary.dropped, 2);
        assert_eq!(summary.jobs, 4);
        assert_eq!(summary.levels, 2, "empty levels are not counted");
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            levels: Vec<u32>,
        }
        impl TraceSink for RecordingSink {
            fn on_level_flush(&mut self, e: &LevelFlushEvent) {
                self.levels.push(e.level);
            }
        }

        let mut sink = RecordingSink { levels: Vec::new() };
        let mut tracer = Tracer::new(&mut sink);
        tracer.level_flush(&LevelFlushEvent {
            pass_index: 0,
            level: 2,
            z_index: 5,
            jobs: 1,
        });
        // Access sink after tracer is dropped.
        drop(tracer);
        assert_eq!(sink.levels, &[2]);
    }
}
