// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Filter-expression engine contract.
//!
//! Rules carry filters as source text. Parsing and evaluating that text is
//! the job of an external engine: a [`FilterEngine`] compiles the text once
//! per render pass into a [`CompiledFilter`], which is then evaluated against
//! each feature.
//!
//! Evaluation is tri-state: `Some(true)` matches, `Some(false)` does not,
//! and `None` (a null result or an evaluation error) is treated as a
//! non-match by the rule tree. Evaluation never aborts a pass.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::context::RenderContext;

/// A filter compiled by a [`FilterEngine`], ready to test features of type `F`.
pub trait CompiledFilter<F> {
    /// Evaluates the filter for `feature`.
    ///
    /// Returns `None` when the result is null or evaluation failed.
    fn evaluate(&self, feature: &F, context: &RenderContext) -> Option<bool>;

    /// Attribute names read by the filter.
    fn referenced_columns(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether evaluating the filter requires the feature's geometry.
    fn needs_geometry(&self) -> bool {
        false
    }
}

/// Compiles filter source text into evaluable filters.
pub trait FilterEngine<F> {
    /// Parses `source`.
    ///
    /// # Errors
    ///
    /// Returns a [`FilterError`] when `source` is not a valid expression.
    fn compile(&self, source: &str) -> Result<Box<dyn CompiledFilter<F>>, FilterError>;
}

/// A filter expression failed to parse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterError {
    /// The offending source text.
    pub source: String,
    /// Engine-provided description of the problem.
    pub message: String,
}

impl FilterError {
    /// Creates an error for `source`.
    #[must_use]
    pub fn new(source: &str, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid filter `{}`: {}", self.source, self.message)
    }
}

impl core::error::Error for FilterError {}

/// Quotes an attribute name for use in a filter: `"name"`, with embedded
/// double quotes doubled.
#[must_use]
pub fn quote_column(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for c in name.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Quotes a string literal for use in a filter: `'text'`, with embedded
/// single quotes doubled.
#[must_use]
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\'' {
            out.push('\'');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// Returns whether `source` carries no filter (empty or whitespace only).
#[must_use]
pub fn is_blank(source: &str) -> bool {
    source.trim().is_empty()
}
