// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Element-tree persistence for strata rule trees and renderers.
//!
//! Rule trees are stored as a generic element tree ([`Element`]): a tag,
//! string attributes, and ordered children. The tree can be encoded as JSON
//! with [`to_json`] and read back with [`from_json`].
//!
//! Symbols are not stored inline. Each rule refers by name to an entry of a
//! shared [`SymbolMap`], so several rules may refer to the same symbol
//! definition. Symbol contents are (de)serialized by a caller-provided
//! [`SymbolCodec`].
//!
//! ```text
//! renderer-v2 [type=ruleRenderer]
//! ├── rules [key=…]            the root rule
//! │   └── rule [key, filter, scalemindenom, scalemaxdenom, label,
//! │             description, checkstate, else, symbol] …
//! └── symbols
//!     └── symbol [name=0] …    produced by the SymbolCodec
//! ```

mod element;
mod error;
mod rules;
mod symbols;

pub use element::{Element, from_json, to_json};
pub use error::PersistError;
pub use rules::{load_renderer, load_rule, save_renderer, save_rule};
pub use symbols::{SymbolCodec, SymbolMap};
