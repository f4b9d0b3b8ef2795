// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Persistence errors.

use thiserror::Error;

/// Errors raised while reading or writing documents.
#[derive(Debug, Error)]
pub enum PersistError {
    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An element had an unexpected tag.
    #[error("expected <{expected}> element, found <{found}>")]
    UnexpectedElement {
        /// Tag that was required.
        expected: &'static str,
        /// Tag that was present.
        found: String,
    },

    /// A required section is missing from a document.
    #[error("missing <{0}> section")]
    MissingSection(&'static str),

    /// A rule refers to a symbol the document does not define.
    #[error("rule refers to undefined symbol `{0}`")]
    MissingSymbol(String),

    /// A numeric attribute could not be parsed.
    #[error("invalid number for attribute `{attribute}`: `{value}`")]
    InvalidNumber {
        /// Attribute name.
        attribute: &'static str,
        /// Raw attribute value.
        value: String,
    },

    /// A symbol element could not be decoded.
    #[error("invalid symbol `{name}`: {message}")]
    Symbol {
        /// Name of the symbol in the document.
        name: String,
        /// Codec-provided description.
        message: String,
    },
}
