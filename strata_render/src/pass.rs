// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One scoped render pass: collect, then flush.

use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use strata_core::context::{FeatureFlags, RenderContext};
use strata_core::levels::{LayerSlot, LevelMap};
use strata_core::rule::{RenderResult, RenderState, RuleId};
use strata_core::symbol::SymbolPainter;
use strata_core::trace::{
    FeatureEvent, LevelFlushEvent, PassSummary, PassSummaryBuilder, Tracer,
};

use crate::queue::{RenderJob, RenderQueue};

/// A render pass started by
/// [`RuleRenderer::start_render`](crate::RuleRenderer::start_render).
///
/// While the pass is open, [`render_feature`](Self::render_feature) only
/// queues draw jobs. [`finish`](Self::finish) draws every queued job, level
/// by level, and reports a [`PassSummary`]. Dropping an unfinished pass
/// flushes it the same way; there is no way to discard queued jobs.
pub struct RenderPass<'a, S, F, P: SymbolPainter<S, F> + ?Sized> {
    pass_index: u64,
    state: RenderState<'a, S, F>,
    painter: &'a mut P,
    tracer: Tracer<'a>,
    queue: RenderQueue,
    /// Features that matched at least one rule, in arrival order.
    features: Vec<F>,
    offered: u64,
    summary: PassSummaryBuilder,
    finished: bool,
}

impl<S, F, P: SymbolPainter<S, F> + ?Sized> fmt::Debug for RenderPass<'_, S, F, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderPass")
            .field("pass_index", &self.pass_index)
            .field("state", &self.state)
            .field("queue", &self.queue)
            .field("retained", &self.features.len())
            .field("offered", &self.offered)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl<'a, S, F, P: SymbolPainter<S, F> + ?Sized> RenderPass<'a, S, F, P> {
    pub(crate) fn new(
        pass_index: u64,
        state: RenderState<'a, S, F>,
        painter: &'a mut P,
        tracer: Tracer<'a>,
    ) -> Self {
        Self {
            pass_index,
            state,
            painter,
            tracer,
            queue: RenderQueue::new(),
            features: Vec::new(),
            offered: 0,
            summary: PassSummaryBuilder::new(pass_index),
            finished: false,
        }
    }

    /// Offers one feature to the pass.
    ///
    /// Every matching symbol-bearing rule queues one job per symbol layer.
    /// Returns `false` when nothing matched; the feature is then dropped
    /// without drawing anything, which is not an error.
    pub fn render_feature(&mut self, feature: F, flags: FeatureFlags) -> bool {
        let index = self.features.len();
        let level_map = self.state.level_map();
        let queue = &mut self.queue;
        let mut jobs = 0_usize;
        let result = self.state.render_feature(
            &feature,
            &mut |rule: RuleId, _: &S, slots: &[LayerSlot]| {
                for slot in slots {
                    let Some(z_index) = level_map.z_index(slot.level) else {
                        continue;
                    };
                    queue.push(
                        slot.level,
                        z_index,
                        RenderJob {
                            feature: index,
                            rule,
                            layer: slot.layer,
                            flags,
                        },
                    );
                    jobs += 1;
                }
            },
        );

        self.summary.record_feature(result, jobs);
        self.tracer.feature(&FeatureEvent {
            pass_index: self.pass_index,
            feature_index: self.offered,
            result,
            jobs,
        });
        self.offered += 1;

        let rendered = result == RenderResult::Rendered;
        if rendered {
            self.features.push(feature);
        }
        rendered
    }

    /// Returns whether `feature` would render, without queueing anything.
    #[must_use]
    pub fn will_render_feature(&self, feature: &F) -> bool {
        self.state.will_render_feature(feature)
    }

    /// Symbol-bearing rules `feature` matches, without queueing anything.
    #[must_use]
    pub fn rules_for_feature(&self, feature: &F) -> Vec<RuleId> {
        self.state.rules_for_feature(feature)
    }

    /// Symbols `feature` would be drawn with, without queueing anything.
    #[must_use]
    pub fn symbols_for_feature(&self, feature: &F) -> Vec<&'a S> {
        self.state.symbols_for_feature(feature)
    }

    /// Legend keys `feature` matches, without queueing anything.
    #[must_use]
    pub fn legend_keys_for_feature(&self, feature: &F) -> BTreeSet<String> {
        self.state.legend_keys_for_feature(feature)
    }

    /// Tests one rule's own filter as compiled for this pass.
    #[must_use]
    pub fn is_filter_ok(&self, rule: RuleId, feature: &F) -> bool {
        self.state.is_filter_ok(rule, feature)
    }

    /// Aggregate pre-filter expression for data sources.
    #[must_use]
    pub fn filter(&self) -> &str {
        self.state.filter()
    }

    /// Normalized level mapping of this pass.
    #[must_use]
    pub fn level_map(&self) -> &LevelMap {
        self.state.level_map()
    }

    /// Context the pass was started with.
    #[must_use]
    pub fn context(&self) -> &RenderContext {
        self.state.context()
    }

    /// Queued jobs, bucketed by level.
    #[must_use]
    pub fn queue(&self) -> &RenderQueue {
        &self.queue
    }

    /// Number of jobs waiting for the flush.
    #[must_use]
    pub fn queued_jobs(&self) -> usize {
        self.queue.job_count()
    }

    /// Totals so far.
    #[must_use]
    pub fn summary(&self) -> PassSummary {
        self.summary.current()
    }

    /// Draws every queued job and ends the pass.
    pub fn finish(mut self) -> PassSummary {
        self.flush()
    }

    fn flush(&mut self) -> PassSummary {
        if self.finished {
            return self.summary.current();
        }
        self.finished = true;

        let context = *self.state.context();
        let tree = self.state.tree();
        self.painter.begin_pass(&context);
        for level in self.queue.take_levels() {
            for job in &level.jobs {
                let (Some(symbol), Some(feature)) =
                    (tree.symbol(job.rule), self.features.get(job.feature))
                else {
                    continue;
                };
                self.painter
                    .draw_layer(symbol, job.layer, feature, &context, job.flags);
                #[cfg(feature = "trace-rich")]
                self.tracer.draw(&strata_core::trace::DrawEvent {
                    pass_index: self.pass_index,
                    level: level.level,
                    feature: job.feature,
                    rule: job.rule,
                    layer: job.layer,
                });
            }
            self.summary.record_level(level.jobs.len());
            self.tracer.level_flush(&LevelFlushEvent {
                pass_index: self.pass_index,
                level: level.level,
                z_index: level.z_index,
                jobs: level.jobs.len(),
            });
        }
        self.painter.end_pass(&context);
        self.features.clear();

        let summary = self.summary.current();
        self.tracer.pass_end(&summary);
        summary
    }
}

impl<S, F, P: SymbolPainter<S, F> + ?Sized> Drop for RenderPass<'_, S, F, P> {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use strata_core::rule::{Rule, RuleTree};

    use super::*;
    use crate::renderer::{RendererConfig, RuleRenderer};
    use crate::testing::{Feat, Painter, Sym, TestEngine};

    fn ctx() -> RenderContext {
        RenderContext::scale_independent()
    }

    #[test]
    fn flush_draws_level_by_level_in_arrival_order() {
        // Feature A matches a symbol at levels [0, 1]; B one at [1, 0].
        let mut tree = RuleTree::new();
        let root = tree.root();
        tree.append_child(root, Rule::with_symbol(Sym::new("sa", &[0, 1])).filter("a = 1"));
        tree.append_child(root, Rule::with_symbol(Sym::new("sb", &[1, 0])).filter("a = 2"));
        let mut renderer = RuleRenderer::new(tree);
        let mut painter = Painter::default();

        let mut pass = renderer.start_render(ctx(), &TestEngine, &mut painter, Tracer::none());
        assert!(pass.render_feature(Feat::new("A", 1), FeatureFlags::default()));
        assert!(pass.render_feature(Feat::new("B", 2), FeatureFlags::default()));
        assert_eq!(pass.queued_jobs(), 4);
        let summary = pass.finish();

        assert_eq!(
            painter.draws,
            vec![
                ("A", "sa", 0),
                ("B", "sb", 1),
                ("A", "sa", 1),
                ("B", "sb", 0),
            ]
        );
        assert_eq!(summary.jobs, 4);
        assert_eq!(summary.levels, 2);
        assert_eq!(painter.passes, 1);
    }

    #[test]
    fn unmatched_features_are_dropped() {
        let mut tree = RuleTree::new();
        let root = tree.root();
        tree.append_child(root, Rule::with_symbol(Sym::new("s", &[0])).filter("a = 1"));
        let mut renderer = RuleRenderer::new(tree);
        let mut painter = Painter::default();

        let mut pass = renderer.start_render(ctx(), &TestEngine, &mut painter, Tracer::none());
        assert!(!pass.render_feature(Feat::new("miss", 5), FeatureFlags::default()));
        assert!(pass.render_feature(Feat::new("hit", 1), FeatureFlags::SELECTED));
        let summary = pass.finish();

        assert_eq!(painter.draws, vec![("hit", "s", 0)]);
        assert_eq!(painter.selected, vec![true]);
        assert_eq!(summary.features, 2);
        assert_eq!(summary.rendered, 1);
        assert_eq!(summary.dropped, 1);
    }

    #[test]
    fn jobs_point_at_retained_features_past_drops() {
        let mut tree = RuleTree::new();
        let root = tree.root();
        tree.append_child(root, Rule::with_symbol(Sym::new("s", &[1, 0])).filter("a > 0"));
        let mut renderer = RuleRenderer::new(tree);
        let mut painter = Painter::default();

        let mut pass = renderer.start_render(ctx(), &TestEngine, &mut painter, Tracer::none());
        let names = ["f0", "f1", "f2", "f3", "f4", "f5"];
        for (a, name) in names.into_iter().enumerate() {
            let a = i64::try_from(a).expect("small index");
            pass.render_feature(Feat::new(name, a % 2), FeatureFlags::default());
        }
        assert_eq!(pass.queued_jobs(), 6);
        pass.finish();

        assert_eq!(
            painter.draws,
            vec![
                ("f1", "s", 1),
                ("f3", "s", 1),
                ("f5", "s", 1),
                ("f1", "s", 0),
                ("f3", "s", 0),
                ("f5", "s", 0),
            ]
        );
    }

    #[test]
    fn dropping_a_pass_still_flushes() {
        let mut renderer = RuleRenderer::with_default_symbol(Sym::new("s", &[0]));
        let mut painter = Painter::default();
        {
            let mut pass = renderer.start_render(ctx(), &TestEngine, &mut painter, Tracer::none());
            pass.render_feature(Feat::new("x", 0), FeatureFlags::default());
        }
        assert_eq!(painter.draws, vec![("x", "s", 0)]);
        assert_eq!(painter.passes, 1);
    }

    #[test]
    fn queries_do_not_queue() {
        let mut renderer = RuleRenderer::with_default_symbol(Sym::new("s", &[0]));
        let mut painter = Painter::default();
        let pass = renderer.start_render(ctx(), &TestEngine, &mut painter, Tracer::none());
        let f = Feat::new("x", 0);
        assert!(pass.will_render_feature(&f));
        assert_eq!(pass.rules_for_feature(&f).len(), 1);
        assert_eq!(pass.symbols_for_feature(&f)[0].name, "s");
        assert_eq!(pass.legend_keys_for_feature(&f).len(), 1);
        assert_eq!(pass.filter(), "TRUE");
        assert_eq!(pass.queued_jobs(), 0);
        let summary = pass.finish();
        assert_eq!(summary.jobs, 0);
        assert!(painter.draws.is_empty());
    }

    #[test]
    fn pending_edits_apply_at_next_pass() {
        let mut renderer = RuleRenderer::with_config(RuleTree::new(), RendererConfig::every_else());
        let root = renderer.tree().root();
        renderer
            .tree_mut()
            .append_child(root, Rule::with_symbol(Sym::new("e1", &[0])).else_rule());
        renderer
            .tree_mut()
            .append_child(root, Rule::with_symbol(Sym::new("e2", &[3])).else_rule());
        let mut painter = Painter::default();

        let mut pass = renderer.start_render(ctx(), &TestEngine, &mut painter, Tracer::none());
        assert_eq!(pass.level_map().z_levels(), &[0, 3]);
        pass.render_feature(Feat::new("x", 0), FeatureFlags::default());
        pass.finish();
        assert_eq!(painter.draws, vec![("x", "e1", 0), ("x", "e2", 0)]);
        assert_eq!(renderer.pass_count(), 1);
    }
}
