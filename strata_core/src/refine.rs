// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rule refinement.
//!
//! Each refinement turns one rule into a grouping node: the rule gives up
//! its symbol and gains one generated child per category, value range, or
//! scale band. Children carry a derived filter (or scale range) and either
//! their own symbol or a copy of the refined rule's symbol.
//!
//! These are editing operations, not part of rendering. Refining a rule
//! that was already refined appends another set of children below it.
//! Empty inputs leave the rule untouched.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::expression::{quote_column, quote_string};
use crate::rule::{Rule, RuleId, RuleTree};
use crate::scale::ScaleRange;

/// The value a classification is computed from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClassAttribute {
    /// An attribute name; quoted when written into filters.
    Field(String),
    /// An expression, written verbatim (parenthesized) into filters.
    Expression(String),
}

impl ClassAttribute {
    fn to_filter_operand(&self) -> String {
        match self {
            Self::Field(name) => quote_column(name),
            Self::Expression(expr) => format!("({expr})"),
        }
    }
}

/// A category value.
#[derive(Clone, Debug, PartialEq)]
pub enum CategoryValue {
    /// Written verbatim.
    Int(i64),
    /// Written with four decimals.
    Float(f64),
    /// Written as a quoted string literal.
    Text(String),
}

impl CategoryValue {
    fn to_literal(&self) -> String {
        match self {
            Self::Int(v) => format!("{v}"),
            Self::Float(v) => format!("{v:.4}"),
            Self::Text(v) => quote_string(v),
        }
    }
}

/// One category of a categorized classification.
#[derive(Clone, Debug, PartialEq)]
pub struct Category<S> {
    /// Value features must equal.
    pub value: CategoryValue,
    /// Symbol for the category; `None` copies the refined rule's symbol.
    pub symbol: Option<S>,
    /// Label; empty uses the generated filter text.
    pub label: String,
}

impl<S> Category<S> {
    /// Creates a category that reuses the refined rule's symbol.
    #[must_use]
    pub fn new(value: CategoryValue) -> Self {
        Self {
            value,
            symbol: None,
            label: String::new(),
        }
    }

    /// Sets the category's own symbol.
    #[must_use]
    pub fn symbol(mut self, symbol: S) -> Self {
        self.symbol = Some(symbol);
        self
    }

    /// Sets the label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// One class of a graduated classification.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassRange<S> {
    /// Lower bound.
    pub lower: f64,
    /// Upper bound, inclusive.
    pub upper: f64,
    /// Symbol for the class; `None` copies the refined rule's symbol.
    pub symbol: Option<S>,
    /// Label; empty uses the generated filter text.
    pub label: String,
}

impl<S> ClassRange<S> {
    /// Creates a class that reuses the refined rule's symbol.
    #[must_use]
    pub fn new(lower: f64, upper: f64) -> Self {
        Self {
            lower,
            upper,
            symbol: None,
            label: String::new(),
        }
    }

    /// Sets the class's own symbol.
    #[must_use]
    pub fn symbol(mut self, symbol: S) -> Self {
        self.symbol = Some(symbol);
        self
    }

    /// Sets the label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Splits rule `id` into one child per category.
///
/// Each child's filter tests equality: `"<field>" = <value>`.
pub fn refine_rule_categories<S: Clone>(
    tree: &mut RuleTree<S>,
    id: RuleId,
    attribute: &ClassAttribute,
    categories: impl IntoIterator<Item = Category<S>>,
) {
    let categories: Vec<_> = categories.into_iter().collect();
    if categories.is_empty() {
        return;
    }
    let base = tree.set_symbol(id, None);
    let operand = attribute.to_filter_operand();
    for category in categories {
        let filter = format!("{operand} = {}", category.value.to_literal());
        let label = label_or(category.label, &filter);
        let symbol = category.symbol.or_else(|| base.clone());
        tree.append_child(id, Rule::new(symbol).filter(filter).label(label));
    }
}

/// Splits rule `id` into one child per value range.
///
/// The first range includes its lower bound; the others exclude it, so
/// adjacent ranges sharing a bound do not overlap. Upper bounds are always
/// inclusive.
pub fn refine_rule_ranges<S: Clone>(
    tree: &mut RuleTree<S>,
    id: RuleId,
    attribute: &ClassAttribute,
    ranges: impl IntoIterator<Item = ClassRange<S>>,
) {
    let mut ranges = ranges.into_iter().peekable();
    if ranges.peek().is_none() {
        return;
    }
    let base = tree.set_symbol(id, None);
    let operand = attribute.to_filter_operand();
    for (i, range) in ranges.enumerate() {
        let op = if i == 0 { ">=" } else { ">" };
        let filter = format!(
            "{operand} {op} {:.4} AND {operand} <= {:.4}",
            range.lower, range.upper
        );
        let label = label_or(range.label, &filter);
        let symbol = range.symbol.or_else(|| base.clone());
        tree.append_child(id, Rule::new(symbol).filter(filter).label(label));
    }
}

/// Splits rule `id` into scale bands at the given denominators.
///
/// Denominators are sorted; those outside the rule's own scale range are
/// ignored. Every band gets a copy of the rule's symbol and is labelled
/// `"<min> - <max>"`.
pub fn refine_rule_scales<S: Clone>(tree: &mut RuleTree<S>, id: RuleId, scales: &[f64]) {
    if scales.is_empty() {
        return;
    }
    let mut scales = scales.to_vec();
    scales.sort_by(f64::total_cmp);

    let range = tree.scale(id);
    let base = tree.set_symbol(id, None);
    let mut old = range.min_denom;
    for scale in scales {
        if range.min_denom != 0.0 && scale <= range.min_denom {
            continue;
        }
        if range.max_denom != 0.0 && scale >= range.max_denom {
            break;
        }
        push_band(tree, id, base.clone(), ScaleRange::new(old, scale));
        old = scale;
    }
    push_band(tree, id, base, ScaleRange::new(old, range.max_denom));
}

fn push_band<S>(tree: &mut RuleTree<S>, id: RuleId, symbol: Option<S>, scale: ScaleRange) {
    let label = format!("{} - {}", scale.min_denom, scale.max_denom);
    let mut rule = Rule::new(symbol).label(label);
    rule.scale = scale;
    tree.append_child(id, rule);
}

fn label_or(label: String, filter: &str) -> String {
    if label.is_empty() {
        String::from(filter)
    } else {
        label
    }
}
