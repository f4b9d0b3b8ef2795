// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory event recording.
//!
//! [`RecorderSink`] implements [`TraceSink`] and keeps an owned
//! [`RecordedEvent`] for every event, in arrival order. Borrowed event data
//! (rule keys, filter errors) is copied.

use strata_core::rule::{RenderResult, RuleId};
use strata_core::trace::{
    DrawEvent, FeatureEvent, FilterErrorEvent, LevelFlushEvent, PassBeginEvent, PassSummary,
    TraceSink,
};

/// An owned copy of one trace event.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`PassBeginEvent`].
    PassBegin(PassBeginEvent),
    /// A rule's filter was rejected by the engine.
    FilterError {
        /// The rule whose filter was rejected.
        rule: RuleId,
        /// The rule's key.
        key: String,
        /// The rejected filter text.
        source: String,
        /// The engine's description.
        message: String,
    },
    /// A [`FeatureEvent`].
    Feature(FeatureEvent),
    /// A [`LevelFlushEvent`].
    LevelFlush(LevelFlushEvent),
    /// A [`PassSummary`].
    PassEnd(PassSummary),
    /// A [`DrawEvent`].
    Draw(DrawEvent),
}

/// A [`TraceSink`] that records every event in memory.
#[derive(Debug, Default)]
pub struct RecorderSink {
    events: Vec<RecordedEvent>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded events, oldest first.
    #[must_use]
    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    /// Consumes the recorder and returns the recorded events.
    #[must_use]
    pub fn into_events(self) -> Vec<RecordedEvent> {
        self.events
    }

    /// Drops every recorded event.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Summaries of every finished pass, oldest first.
    pub fn summaries(&self) -> impl Iterator<Item = &PassSummary> + '_ {
        self.events.iter().filter_map(|e| match e {
            RecordedEvent::PassEnd(s) => Some(s),
            _ => None,
        })
    }

    /// Number of features recorded with the given outcome.
    #[must_use]
    pub fn count_results(&self, result: RenderResult) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, RecordedEvent::Feature(f) if f.result == result))
            .count()
    }
}

impl TraceSink for RecorderSink {
    fn on_pass_begin(&mut self, e: &PassBeginEvent) {
        self.events.push(RecordedEvent::PassBegin(*e));
    }

    fn on_filter_error(&mut self, e: &FilterErrorEvent<'_>) {
        self.events.push(RecordedEvent::FilterError {
            rule: e.rule,
            key: String::from(e.key),
            source: e.error.source.clone(),
            message: e.error.message.clone(),
        });
    }

    fn on_feature(&mut self, e: &FeatureEvent) {
        self.events.push(RecordedEvent::Feature(*e));
    }

    fn on_level_flush(&mut self, e: &LevelFlushEvent) {
        self.events.push(RecordedEvent::LevelFlush(*e));
    }

    fn on_pass_end(&mut self, s: &PassSummary) {
        self.events.push(RecordedEvent::PassEnd(*s));
    }

    fn on_draw(&mut self, e: &DrawEvent) {
        self.events.push(RecordedEvent::Draw(*e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::expression::FilterError;
    use strata_core::rule::RuleTree;
    use strata_core::trace::Tracer;

    #[test]
    fn records_in_arrival_order() {
        let tree = RuleTree::<()>::new();
        let error = FilterError::new("a ==", "dangling operator");
        let mut sink = RecorderSink::new();
        {
            let mut tracer = Tracer::new(&mut sink);
            tracer.pass_begin(&PassBeginEvent {
                pass_index: 0,
                scale_denominator: 0.0,
                level_count: 1,
                active_rules: 2,
            });
            tracer.filter_error(&FilterErrorEvent {
                rule: tree.root(),
                key: "roads",
                error: &error,
            });
            tracer.feature(&FeatureEvent {
                pass_index: 0,
                feature_index: 0,
                result: RenderResult::Rendered,
                jobs: 2,
            });
            tracer.feature(&FeatureEvent {
                pass_index: 0,
                feature_index: 1,
                result: RenderResult::Filtered,
                jobs: 0,
            });
            tracer.pass_end(&PassSummary {
                pass_index: 0,
                features: 2,
                rendered: 1,
                dropped: 1,
                jobs: 2,
                levels: 1,
            });
        }

        let events = sink.events();
        assert_eq!(events.len(), 5);
        assert!(matches!(events[0], RecordedEvent::PassBegin(_)));
        assert!(matches!(
            &events[1],
            RecordedEvent::FilterError { key, source, .. } if key == "roads" && source == "a =="
        ));
        assert_eq!(sink.count_results(RenderResult::Rendered), 1);
        assert_eq!(sink.count_results(RenderResult::Filtered), 1);
        assert_eq!(sink.summaries().map(|s| s.jobs).collect::<Vec<_>>(), [2]);

        sink.clear();
        assert!(sink.events().is_empty());
    }
}
