// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal symbol, feature, and filter engine used by unit tests.
//!
//! The engine understands conjunctions of comparisons between one attribute
//! and a number (`a = 1`, `"a" >= 1.5 AND "a" <= 3`), plus the literals
//! `TRUE`, `FALSE`, and `NULL`. Anything else fails to compile.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use crate::context::RenderContext;
use crate::expression::{CompiledFilter, FilterEngine, FilterError};
use crate::symbol::Symbol;

/// Columns whose evaluation needs geometry.
const GEOMETRY_COLUMNS: &[&str] = &["$area", "$length"];

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TestSymbol {
    pub(crate) name: &'static str,
    pub(crate) levels: Vec<i32>,
}

impl TestSymbol {
    pub(crate) fn new(name: &'static str, levels: &[i32]) -> Self {
        Self {
            name,
            levels: levels.to_vec(),
        }
    }
}

impl Symbol for TestSymbol {
    fn layer_count(&self) -> usize {
        self.levels.len()
    }

    fn layer_level(&self, layer: usize) -> i32 {
        self.levels[layer]
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TestFeature {
    attrs: Vec<(&'static str, i64)>,
}

impl TestFeature {
    pub(crate) fn new(attrs: &[(&'static str, i64)]) -> Self {
        Self {
            attrs: attrs.to_vec(),
        }
    }

    fn get(&self, name: &str) -> Option<i64> {
        self.attrs
            .iter()
            .find(|(n, _)| *n == name)
            .map(|&(_, v)| v)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Op {
    fn parse(token: &str) -> Option<Self> {
        Some(match token {
            "=" => Self::Eq,
            "!=" | "<>" => Self::Ne,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            _ => return None,
        })
    }

    fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Clause {
    Literal(Option<bool>),
    Compare { column: String, op: Op, value: f64 },
}

#[derive(Clone, Debug, PartialEq)]
struct TestFilter {
    clauses: Vec<Clause>,
}

impl CompiledFilter<TestFeature> for TestFilter {
    fn evaluate(&self, feature: &TestFeature, _context: &RenderContext) -> Option<bool> {
        let mut result = true;
        for clause in &self.clauses {
            let value = match clause {
                Clause::Literal(v) => *v,
                Clause::Compare { column, op, value } => feature
                    .get(column)
                    .map(|attr| op.apply(attr as f64, *value)),
            };
            result &= value?;
        }
        Some(result)
    }

    fn referenced_columns(&self) -> Vec<String> {
        self.clauses
            .iter()
            .filter_map(|c| match c {
                Clause::Compare { column, .. } => Some(column.clone()),
                Clause::Literal(_) => None,
            })
            .collect()
    }

    fn needs_geometry(&self) -> bool {
        self.referenced_columns()
            .iter()
            .any(|c| GEOMETRY_COLUMNS.contains(&c.as_str()))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct TestEngine;

impl TestEngine {
    fn clause(source: &str, text: &str) -> Result<Clause, FilterError> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        match tokens.as_slice() {
            ["TRUE"] => Ok(Clause::Literal(Some(true))),
            ["FALSE"] => Ok(Clause::Literal(Some(false))),
            ["NULL"] => Ok(Clause::Literal(None)),
            [column, op, value] => {
                let op = Op::parse(op)
                    .ok_or_else(|| FilterError::new(source, "unknown operator"))?;
                let value = value
                    .parse::<f64>()
                    .map_err(|_| FilterError::new(source, "expected a number"))?;
                let column = column.trim_matches('"');
                if column.is_empty() {
                    return Err(FilterError::new(source, "empty column name"));
                }
                Ok(Clause::Compare {
                    column: String::from(column),
                    op,
                    value,
                })
            }
            _ => Err(FilterError::new(source, "expected `<column> <op> <number>`")),
        }
    }
}

impl FilterEngine<TestFeature> for TestEngine {
    fn compile(&self, source: &str) -> Result<Box<dyn CompiledFilter<TestFeature>>, FilterError> {
        let clauses = source
            .split(" AND ")
            .map(|part| Self::clause(source, part.trim().trim_start_matches('(').trim_end_matches(')')))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Box::new(TestFilter { clauses }))
    }
}
