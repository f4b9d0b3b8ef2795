// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use strata_core::rule::RenderResult;
use strata_core::trace::{
    DrawEvent, FeatureEvent, FilterErrorEvent, LevelFlushEvent, PassBeginEvent, PassSummary,
    TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
///
/// Per-draw lines are only written when `verbose` is set, since a pass can
/// issue many draw calls.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    verbose: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self {
            writer,
            verbose: false,
        }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            verbose: false,
        }
    }

    /// Also prints one line per draw call.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Consumes the sink and returns the writer.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

fn result_name(result: RenderResult) -> &'static str {
    match result {
        RenderResult::Filtered => "filtered",
        RenderResult::Inactive => "inactive",
        RenderResult::Rendered => "rendered",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_pass_begin(&mut self, e: &PassBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[pass:begin] pass={} scale=1:{} levels={} rules={}",
            e.pass_index, e.scale_denominator, e.level_count, e.active_rules,
        );
    }

    fn on_filter_error(&mut self, e: &FilterErrorEvent<'_>) {
        let _ = writeln!(
            self.writer,
            "[filter:error] rule={} {:?}: {}",
            e.key, e.rule, e.error,
        );
    }

    fn on_feature(&mut self, e: &FeatureEvent) {
        let _ = writeln!(
            self.writer,
            "[feature] pass={} #{} {} jobs={}",
            e.pass_index,
            e.feature_index,
            result_name(e.result),
            e.jobs,
        );
    }

    fn on_level_flush(&mut self, e: &LevelFlushEvent) {
        let _ = writeln!(
            self.writer,
            "[level] pass={} level={} z={} jobs={}",
            e.pass_index, e.level, e.z_index, e.jobs,
        );
    }

    fn on_pass_end(&mut self, s: &PassSummary) {
        let _ = writeln!(
            self.writer,
            "[pass:end] pass={} features={} rendered={} dropped={} jobs={} levels={}",
            s.pass_index, s.features, s.rendered, s.dropped, s.jobs, s.levels,
        );
    }

    fn on_draw(&mut self, e: &DrawEvent) {
        if !self.verbose {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[draw] pass={} level={} feature={} {:?} layer={}",
            e.pass_index, e.level, e.feature, e.rule, e.layer,
        );
    }
}
