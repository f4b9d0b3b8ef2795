// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Symbol, feature, filter engine, and painter doubles for unit tests.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use strata_core::context::{FeatureFlags, RenderContext};
use strata_core::expression::{CompiledFilter, FilterEngine, FilterError};
use strata_core::symbol::{Symbol, SymbolPainter};

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Sym {
    pub(crate) name: &'static str,
    levels: Vec<i32>,
    attributes: Vec<String>,
}

impl Sym {
    pub(crate) fn new(name: &'static str, levels: &[i32]) -> Self {
        Self {
            name,
            levels: levels.to_vec(),
            attributes: Vec::new(),
        }
    }

    pub(crate) fn reading(mut self, attribute: &str) -> Self {
        self.attributes.push(String::from(attribute));
        self
    }
}

impl Symbol for Sym {
    fn layer_count(&self) -> usize {
        self.levels.len()
    }

    fn layer_level(&self, layer: usize) -> i32 {
        self.levels[layer]
    }

    fn used_attributes(&self) -> Vec<String> {
        self.attributes.clone()
    }
}

/// A feature with a name and a single numeric attribute `a`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Feat {
    pub(crate) name: &'static str,
    a: i64,
}

impl Feat {
    pub(crate) fn new(name: &'static str, a: i64) -> Self {
        Self { name, a }
    }
}

/// Compiles `<column> <op> <int>`, where `<op>` is `=`, `<`, or `>`.
///
/// Only column `a` has a value; other columns evaluate to null.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct TestEngine;

struct Compare {
    column: String,
    op: char,
    value: i64,
}

impl CompiledFilter<Feat> for Compare {
    fn evaluate(&self, feature: &Feat, _context: &RenderContext) -> Option<bool> {
        if self.column != "a" {
            return None;
        }
        Some(match self.op {
            '=' => feature.a == self.value,
            '<' => feature.a < self.value,
            _ => feature.a > self.value,
        })
    }

    fn referenced_columns(&self) -> Vec<String> {
        alloc::vec![self.column.clone()]
    }

    fn needs_geometry(&self) -> bool {
        self.column.starts_with('$')
    }
}

impl FilterEngine<Feat> for TestEngine {
    fn compile(&self, source: &str) -> Result<Box<dyn CompiledFilter<Feat>>, FilterError> {
        let tokens: Vec<&str> = source.split_whitespace().collect();
        let [column, op, value] = tokens.as_slice() else {
            return Err(FilterError::new(source, "expected `<column> <op> <int>`"));
        };
        let op = match *op {
            "=" => '=',
            "<" => '<',
            ">" => '>',
            _ => return Err(FilterError::new(source, "unknown operator")),
        };
        let value = value
            .parse()
            .map_err(|_| FilterError::new(source, "expected an integer"))?;
        Ok(Box::new(Compare {
            column: String::from(*column),
            op,
            value,
        }))
    }
}

/// Records every draw call as `(feature, symbol, layer)`.
#[derive(Debug, Default)]
pub(crate) struct Painter {
    pub(crate) draws: Vec<(&'static str, &'static str, usize)>,
    pub(crate) selected: Vec<bool>,
    pub(crate) passes: usize,
}

impl SymbolPainter<Sym, Feat> for Painter {
    fn begin_pass(&mut self, _context: &RenderContext) {
        self.passes += 1;
    }

    fn draw_layer(
        &mut self,
        symbol: &Sym,
        layer: usize,
        feature: &Feat,
        _context: &RenderContext,
        flags: FeatureFlags,
    ) {
        self.draws.push((feature.name, symbol.name, layer));
        self.selected.push(flags.selected);
    }
}
