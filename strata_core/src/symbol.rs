// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Symbol and painter contracts.
//!
//! Symbols are owned by the rule tree but defined elsewhere. The core only
//! needs to know how many layers a symbol has and at which declared level
//! each layer draws. Actual drawing goes through a [`SymbolPainter`], which
//! the render queue invokes once per (feature, symbol layer) job during the
//! flush phase.

use alloc::string::String;
use alloc::vec::Vec;

use crate::context::{FeatureFlags, RenderContext};

/// An ordered stack of drawable layers used to render one feature.
pub trait Symbol {
    /// Number of symbol layers, bottom-most first.
    fn layer_count(&self) -> usize;

    /// Declared level (rendering pass) of layer `layer`.
    ///
    /// Layers of different symbols that share a level draw together, before
    /// any layer of the next level.
    fn layer_level(&self, layer: usize) -> i32;

    /// Attribute names the symbol reads while drawing (data-defined
    /// properties).
    fn used_attributes(&self) -> Vec<String> {
        Vec::new()
    }

    /// Returns `(layer, level)` pairs in layer order.
    fn levels(&self) -> impl Iterator<Item = (usize, i32)> + '_
    where
        Self: Sized,
    {
        (0..self.layer_count()).map(|layer| (layer, self.layer_level(layer)))
    }
}

/// Draws individual symbol layers for features of type `F`.
///
/// During a flush the painter receives one [`draw_layer`](Self::draw_layer)
/// call per queued job, in ascending level order and, within a level, in
/// feature arrival order.
pub trait SymbolPainter<S, F> {
    /// Called once before the first draw call of a pass.
    fn begin_pass(&mut self, context: &RenderContext) {
        _ = context;
    }

    /// Draws layer `layer` of `symbol` for `feature`.
    fn draw_layer(
        &mut self,
        symbol: &S,
        layer: usize,
        feature: &F,
        context: &RenderContext,
        flags: FeatureFlags,
    );

    /// Called once after the last draw call of a pass.
    fn end_pass(&mut self, context: &RenderContext) {
        _ = context;
    }
}
