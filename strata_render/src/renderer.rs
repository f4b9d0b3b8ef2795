// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rule-based renderer: owns the rule tree and starts render passes.

use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use strata_core::context::RenderContext;
use strata_core::expression::{FilterEngine, is_blank};
use strata_core::legend::LegendItem;
use strata_core::rule::{ElsePolicy, RenderState, RuleTree};
use strata_core::symbol::{Symbol, SymbolPainter};
use strata_core::trace::{PassBeginEvent, Tracer};

use crate::pass::RenderPass;

/// Configuration for a [`RuleRenderer`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RendererConfig {
    /// How ELSE siblings are evaluated once no ordinary sibling rendered.
    pub else_policy: ElsePolicy,
}

impl RendererConfig {
    /// ELSE siblings are first-match-wins.
    #[must_use]
    pub const fn first_match() -> Self {
        Self {
            else_policy: ElsePolicy::FirstMatch,
        }
    }

    /// Every ELSE sibling gets a chance once no ordinary sibling rendered.
    #[must_use]
    pub const fn every_else() -> Self {
        Self {
            else_policy: ElsePolicy::All,
        }
    }
}

/// Renders the features of one vector layer through a tree of rules.
///
/// The renderer owns its [`RuleTree`] and every symbol in it. Each call to
/// [`start_render`](Self::start_render) brings the tree's derived caches up
/// to date and returns a [`RenderPass`] that borrows the tree until the pass
/// is finished, so the tree cannot be edited mid-pass.
pub struct RuleRenderer<S> {
    tree: RuleTree<S>,
    config: RendererConfig,
    passes: u64,
}

impl<S> fmt::Debug for RuleRenderer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRenderer")
            .field("rules", &self.tree.len())
            .field("config", &self.config)
            .field("passes", &self.passes)
            .finish()
    }
}

impl<S> RuleRenderer<S> {
    /// Creates a renderer over `tree` with the default configuration.
    #[must_use]
    pub fn new(tree: RuleTree<S>) -> Self {
        Self::with_config(tree, RendererConfig::default())
    }

    /// Creates a renderer with an explicit configuration.
    #[must_use]
    pub fn with_config(tree: RuleTree<S>, config: RendererConfig) -> Self {
        Self {
            tree,
            config,
            passes: 0,
        }
    }

    /// Creates a renderer with a single catch-all rule drawing `symbol`.
    #[must_use]
    pub fn with_default_symbol(symbol: S) -> Self {
        Self::new(RuleTree::with_default_symbol(symbol))
    }

    /// The rule tree.
    #[must_use]
    pub fn tree(&self) -> &RuleTree<S> {
        &self.tree
    }

    /// The rule tree, for editing between passes.
    pub fn tree_mut(&mut self) -> &mut RuleTree<S> {
        &mut self.tree
    }

    /// Consumes the renderer and returns its tree.
    #[must_use]
    pub fn into_tree(self) -> RuleTree<S> {
        self.tree
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> RendererConfig {
        self.config
    }

    /// Replaces the configuration; takes effect at the next pass.
    pub fn set_config(&mut self, config: RendererConfig) {
        self.config = config;
    }

    /// Number of passes started so far.
    #[must_use]
    pub fn pass_count(&self) -> u64 {
        self.passes
    }

    /// Every symbol in the tree, depth-first.
    #[must_use]
    pub fn symbols(&self) -> Vec<&S> {
        self.tree.symbols()
    }

    /// Attribute names needed to render: columns read by any rule filter
    /// plus attributes read by any symbol.
    ///
    /// Filters that fail to compile contribute nothing.
    #[must_use]
    pub fn used_attributes<F>(&self, engine: &dyn FilterEngine<F>) -> BTreeSet<String>
    where
        S: Symbol,
    {
        let mut attributes = BTreeSet::new();
        let root = self.tree.root();
        for id in core::iter::once(root).chain(self.tree.descendants(root)) {
            if let Some(symbol) = self.tree.symbol(id) {
                attributes.extend(symbol.used_attributes());
            }
            if self.tree.is_else(id) || is_blank(self.tree.filter(id)) {
                continue;
            }
            if let Ok(filter) = engine.compile(self.tree.filter(id)) {
                attributes.extend(filter.referenced_columns());
            }
        }
        attributes
    }

    /// Returns whether any rule filter needs feature geometry.
    #[must_use]
    pub fn filter_needs_geometry<F>(&self, engine: &dyn FilterEngine<F>) -> bool {
        let root = self.tree.root();
        core::iter::once(root)
            .chain(self.tree.descendants(root))
            .filter(|&id| !self.tree.is_else(id) && !is_blank(self.tree.filter(id)))
            .filter_map(|id| engine.compile(self.tree.filter(id)).ok())
            .any(|filter| filter.needs_geometry())
    }

    /// Legend entries, optionally restricted to rules visible at `scale`.
    #[must_use]
    pub fn legend_symbol_items(&self, scale: Option<f64>) -> Vec<LegendItem<'_, S>> {
        self.tree.legend_symbol_items(scale)
    }

    /// Check state of a legend entry; unknown keys report `true`.
    #[must_use]
    pub fn legend_symbol_item_checked(&self, key: &str) -> bool {
        self.tree.legend_symbol_item_checked(key)
    }

    /// Checks or unchecks a legend entry, enabling or disabling its rule.
    pub fn check_legend_symbol_item(&mut self, key: &str, checked: bool) {
        self.tree.check_legend_symbol_item(key, checked);
    }

    /// Replaces the symbol behind a legend entry.
    ///
    /// Returns `false` when no rule has that key.
    pub fn set_legend_symbol_item(&mut self, key: &str, symbol: S) -> bool {
        self.tree.set_legend_symbol_item(key, symbol)
    }

    /// Indented text listing of the whole tree.
    #[must_use]
    pub fn dump(&self) -> String
    where
        S: fmt::Debug,
    {
        self.tree.dump(self.tree.root())
    }
}

impl<S: Symbol> RuleRenderer<S> {
    /// Starts a render pass.
    ///
    /// Applies pending tree edits, compiles every filter the pass can reach
    /// with `engine`, and normalizes symbol levels. Features are then offered
    /// through [`RenderPass::render_feature`]; `painter` receives the draw
    /// calls when the pass is finished.
    pub fn start_render<'a, F, P>(
        &'a mut self,
        context: RenderContext,
        engine: &dyn FilterEngine<F>,
        painter: &'a mut P,
        mut tracer: Tracer<'a>,
    ) -> RenderPass<'a, S, F, P>
    where
        P: SymbolPainter<S, F> + ?Sized,
    {
        self.tree.refresh();
        self.passes += 1;
        let pass_index = self.passes;
        let else_policy = self.config.else_policy;
        let tree: &'a RuleTree<S> = &self.tree;

        let state = RenderState::start(tree, context, engine, else_policy, &mut tracer);
        tracer.pass_begin(&PassBeginEvent {
            pass_index,
            scale_denominator: context.scale_denominator,
            level_count: state.level_map().len(),
            active_rules: state.active_rules(),
        });
        RenderPass::new(pass_index, state, painter, tracer)
    }
}
