// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-pass rule evaluation.
//!
//! A [`RenderState`] is built once per render pass from a refreshed
//! [`RuleTree`] and then answers per-feature queries without touching the
//! tree. Building it follows the gate-compile-place pattern:
//!
//! 1. **Gates**: Walk the tree from the root. A rule is *ready* when it is
//!    active and its scale range contains the pass scale; children are only
//!    visited below ready rules. Inactive and out-of-scale children are left
//!    out of their parent's active lists.
//! 2. **Filters**: Compile the filter of every ready, non-ELSE rule once.
//!    A filter that fails to compile is reported to the tracer and makes the
//!    rule a permanent no-match for the pass.
//! 3. **Slots**: Place every symbol layer of every ready rule on its
//!    normalized level, using the tree-wide [`LevelMap`].
//!
//! The aggregate filter string is assembled in the same walk.
//!
//! Evaluation of a feature visits ready rules depth-first in declaration
//! order and reports every symbol-bearing match to a [`MatchSink`]. The
//! read-only queries ([`will_render_feature`](RenderState::will_render_feature)
//! and friends) run the exact same visit with a collecting sink, so they
//! cannot diverge from [`render_feature`](RenderState::render_feature).

use alloc::boxed::Box;
use alloc::collections::BTreeSet;
use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use super::id::RuleId;
use super::store::RuleTree;
use crate::context::RenderContext;
use crate::expression::{CompiledFilter, FilterEngine, is_blank};
use crate::levels::{LayerSlot, LevelMap};
use crate::symbol::Symbol;
use crate::trace::{FilterErrorEvent, Tracer};

/// Aggregate filter text that lets every feature through.
const ALL_FEATURES: &str = "TRUE";
/// Aggregate filter text when no rule can render at all.
const NO_FEATURES: &str = "FALSE";

/// Outcome of evaluating a feature against a rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderResult {
    /// The rule or one of its gates excluded the feature, or nothing in the
    /// subtree draws.
    Filtered,
    /// The rule is disabled.
    Inactive,
    /// The feature matched this rule or a descendant that draws.
    Rendered,
}

/// How ELSE siblings are evaluated once no ordinary sibling rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ElsePolicy {
    /// ELSE siblings are tried in order; the first that renders wins.
    #[default]
    FirstMatch,
    /// Every ELSE sibling is tried.
    All,
}

/// Receives the symbol-bearing rules a feature matched, in visit order.
pub trait MatchSink<S> {
    /// Called once per matching rule that owns a symbol.
    ///
    /// `slots` lists the normalized level of every layer of `symbol`, sorted
    /// by level.
    fn on_match(&mut self, rule: RuleId, symbol: &S, slots: &[LayerSlot]);
}

impl<S, T: FnMut(RuleId, &S, &[LayerSlot])> MatchSink<S> for T {
    fn on_match(&mut self, rule: RuleId, symbol: &S, slots: &[LayerSlot]) {
        self(rule, symbol, slots);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Gate {
    /// Below a rule that is not ready; never examined.
    Unreached,
    Inactive,
    OutOfScale,
    Ready,
}

enum FilterSlot<F> {
    Compiled(Box<dyn CompiledFilter<F>>),
    Broken,
}

/// Per-pass evaluation state for one [`RuleTree`].
///
/// Borrows the tree for the whole pass, so the persistent definition cannot
/// change while features are being evaluated.
pub struct RenderState<'t, S, F> {
    tree: &'t RuleTree<S>,
    context: RenderContext,
    else_policy: ElsePolicy,

    // -- Per-slot state --
    gate: Vec<Gate>,
    filters: Vec<Option<FilterSlot<F>>>,
    active_children: Vec<Vec<u32>>,
    active_else: Vec<Vec<u32>>,
    norm_levels: Vec<Vec<LayerSlot>>,

    // -- Pass-wide --
    level_map: LevelMap,
    filter: String,
    active_rules: usize,
}

impl<S, F> fmt::Debug for RenderState<'_, S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderState")
            .field("context", &self.context)
            .field("else_policy", &self.else_policy)
            .field("level_map", &self.level_map)
            .field("filter", &self.filter)
            .field("active_rules", &self.active_rules)
            .finish_non_exhaustive()
    }
}

impl<'t, S: Symbol, F> RenderState<'t, S, F> {
    /// Prepares `tree` for a pass at `context`.
    ///
    /// # Panics
    ///
    /// Panics if the tree has edits that were not applied with
    /// [`RuleTree::refresh`].
    pub fn start(
        tree: &'t RuleTree<S>,
        context: RenderContext,
        engine: &dyn FilterEngine<F>,
        else_policy: ElsePolicy,
        tracer: &mut Tracer<'_>,
    ) -> Self {
        assert!(
            !tree.needs_refresh(),
            "rule tree must be refreshed before a render pass starts"
        );
        let n = tree.len as usize;
        let mut state = Self {
            tree,
            context,
            else_policy,
            gate: vec![Gate::Unreached; n],
            filters: (0..n).map(|_| None).collect(),
            active_children: vec![Vec::new(); n],
            active_else: vec![Vec::new(); n],
            norm_levels: vec![Vec::new(); n],
            level_map: tree.level_map(),
            filter: String::new(),
            active_rules: 0,
        };
        let root = tree.root;
        state.gate[root as usize] = state.gate_for(root);
        state.filter = if state.gate[root as usize] == Gate::Ready {
            state.prepare(root, engine, tracer)
        } else {
            String::from(NO_FEATURES)
        };
        state
    }

    fn gate_for(&self, idx: u32) -> Gate {
        let i = idx as usize;
        if !self.tree.flags[i].active {
            Gate::Inactive
        } else if !self.tree.scale[i].contains(self.context.scale_denominator) {
            Gate::OutOfScale
        } else {
            Gate::Ready
        }
    }

    /// Records the gate of a child reached below a ready rule.
    fn gate_child(&mut self, child: u32) -> bool {
        let gate = self.gate_for(child);
        self.gate[child as usize] = gate;
        gate == Gate::Ready
    }

    /// Prepares a ready rule and its subtree; returns its aggregate filter.
    fn prepare(&mut self, idx: u32, engine: &dyn FilterEngine<F>, tracer: &mut Tracer<'_>) -> String {
        let tree = self.tree;
        let i = idx as usize;
        self.active_rules += 1;

        let is_else = tree.flags[i].is_else;
        let source = tree.filter[i].as_str();
        if !is_else && !is_blank(source) {
            self.filters[i] = Some(match engine.compile(source) {
                Ok(compiled) => FilterSlot::Compiled(compiled),
                Err(error) => {
                    tracer.filter_error(&FilterErrorEvent {
                        rule: tree.id_at(idx),
                        key: &tree.key[i],
                        error: &error,
                    });
                    FilterSlot::Broken
                }
            });
        }

        if let Some(symbol) = &tree.symbol[i] {
            self.norm_levels[i] = self.level_map.slots(symbol.levels());
        }

        // The tree's cached partition is current: `start` rejects stale trees.
        let mut subfilters = Vec::new();
        for &child in &tree.normal_children[i] {
            if self.gate_child(child) {
                self.active_children[i].push(child);
                subfilters.push(self.prepare(child, engine, tracer));
            }
        }
        for &child in &tree.else_children[i] {
            if self.gate_child(child) {
                self.active_else[i].push(child);
                subfilters.push(self.prepare(child, engine, tracer));
            }
        }

        // A rule that draws itself passes every feature its own filter does.
        let subfilter = if tree.symbol[i].is_some() || subfilters.is_empty() {
            None
        } else if subfilters.iter().any(|s| s == ALL_FEATURES) {
            Some(String::from(ALL_FEATURES))
        } else {
            Some(format!("({})", subfilters.join(") OR (")))
        };

        if is_else {
            return subfilter.unwrap_or_else(|| String::from(ALL_FEATURES));
        }
        match (is_blank(source), subfilter) {
            (false, Some(sf)) if sf != ALL_FEATURES => format!("({source}) AND ({sf})"),
            (false, _) => String::from(source),
            (true, Some(sf)) => sf,
            (true, None) => String::from(ALL_FEATURES),
        }
    }
}

impl<'t, S, F> RenderState<'t, S, F> {
    /// Evaluates `feature` from the root and reports every symbol-bearing
    /// match to `sink`.
    ///
    /// Ordinary siblings are all evaluated, so a feature may match several
    /// rules. ELSE children run only when no ordinary child rendered.
    pub fn render_feature<M: MatchSink<S> + ?Sized>(&self, feature: &F, sink: &mut M) -> RenderResult {
        self.visit(self.tree.root, feature, sink)
    }

    /// Returns whether `feature` would render, without side effects.
    #[must_use]
    pub fn will_render_feature(&self, feature: &F) -> bool {
        let mut ignore = |_: RuleId, _: &S, _: &[LayerSlot]| {};
        self.render_feature(feature, &mut ignore) == RenderResult::Rendered
    }

    /// Returns the symbol-bearing rules `feature` matches, in visit order.
    #[must_use]
    pub fn rules_for_feature(&self, feature: &F) -> Vec<RuleId> {
        let mut rules = Vec::new();
        let mut collect = |rule: RuleId, _: &S, _: &[LayerSlot]| rules.push(rule);
        self.render_feature(feature, &mut collect);
        rules
    }

    /// Returns the symbols `feature` would be drawn with, in visit order.
    #[must_use]
    pub fn symbols_for_feature(&self, feature: &F) -> Vec<&'t S> {
        let tree = self.tree;
        self.rules_for_feature(feature)
            .into_iter()
            .filter_map(|rule| tree.symbol[rule.idx as usize].as_ref())
            .collect()
    }

    /// Returns the keys of the legend entries `feature` matches.
    #[must_use]
    pub fn legend_keys_for_feature(&self, feature: &F) -> BTreeSet<String> {
        let tree = self.tree;
        self.rules_for_feature(feature)
            .into_iter()
            .map(|rule| tree.key[rule.idx as usize].clone())
            .collect()
    }

    /// Tests a single rule's own filter as compiled for this pass.
    ///
    /// Rules the pass never reached (below an inactive or out-of-scale
    /// ancestor) report `false`.
    #[must_use]
    pub fn is_filter_ok(&self, id: RuleId, feature: &F) -> bool {
        self.tree.validate(id);
        self.gate[id.idx as usize] != Gate::Unreached && self.passes_filter(id.idx, feature)
    }

    /// Returns whether a rule takes part in this pass (active, in scale, and
    /// below ready ancestors).
    #[must_use]
    pub fn is_ready(&self, id: RuleId) -> bool {
        self.tree.validate(id);
        self.gate[id.idx as usize] == Gate::Ready
    }

    /// Aggregate filter expression of the whole tree for this pass.
    ///
    /// Data sources may use it to pre-filter features. It is only a hint:
    /// every feature is still checked against the rules.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Normalized level mapping used by this pass.
    #[must_use]
    pub fn level_map(&self) -> &LevelMap {
        &self.level_map
    }

    /// Context captured at pass start.
    #[must_use]
    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    /// Number of rules that take part in the pass.
    #[must_use]
    pub fn active_rules(&self) -> usize {
        self.active_rules
    }

    /// The tree this pass evaluates.
    #[must_use]
    pub fn tree(&self) -> &'t RuleTree<S> {
        self.tree
    }

    fn passes_filter(&self, idx: u32, feature: &F) -> bool {
        match &self.filters[idx as usize] {
            None => true,
            Some(FilterSlot::Broken) => false,
            Some(FilterSlot::Compiled(filter)) => {
                filter.evaluate(feature, &self.context) == Some(true)
            }
        }
    }

    fn visit<M: MatchSink<S> + ?Sized>(&self, idx: u32, feature: &F, sink: &mut M) -> RenderResult {
        let i = idx as usize;
        match self.gate[i] {
            Gate::Ready => {}
            Gate::OutOfScale => return RenderResult::Filtered,
            Gate::Inactive | Gate::Unreached => return RenderResult::Inactive,
        }
        if !self.passes_filter(idx, feature) {
            return RenderResult::Filtered;
        }

        let mut rendered = false;
        if let Some(symbol) = &self.tree.symbol[i] {
            let slots = &self.norm_levels[i];
            if !slots.is_empty() {
                sink.on_match(self.tree.id_at(idx), symbol, slots);
                rendered = true;
            }
        }

        let mut children_rendered = false;
        for &child in &self.active_children[i] {
            if self.visit(child, feature, sink) == RenderResult::Rendered {
                children_rendered = true;
            }
        }
        if !children_rendered {
            for &child in &self.active_else[i] {
                if self.visit(child, feature, sink) == RenderResult::Rendered {
                    children_rendered = true;
                    if self.else_policy == ElsePolicy::FirstMatch {
                        break;
                    }
                }
            }
        }

        if rendered || children_rendered {
            RenderResult::Rendered
        } else {
            RenderResult::Filtered
        }
    }
}
