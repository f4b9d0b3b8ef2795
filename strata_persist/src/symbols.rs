// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared symbol map and the symbol codec contract.

use std::fmt;

use crate::element::Element;
use crate::error::PersistError;

const SYMBOLS: &str = "symbols";
const SYMBOL: &str = "symbol";
const NAME: &str = "name";

/// Converts symbols to and from elements.
///
/// The codec only sees one symbol at a time. The `name` attribute of a
/// symbol element is reserved for the map.
pub trait SymbolCodec<S> {
    /// Codec-specific decoding error.
    type Error: fmt::Display;

    /// Encodes `symbol` as an element. The tag is replaced by `symbol`.
    fn encode(&self, symbol: &S) -> Element;

    /// Decodes a symbol element.
    ///
    /// # Errors
    ///
    /// Returns the codec's error when the element does not describe a
    /// valid symbol.
    fn decode(&self, element: &Element) -> Result<S, Self::Error>;
}

/// Named symbols shared by the rules of one document.
#[derive(Clone, Debug, PartialEq)]
pub struct SymbolMap<S> {
    symbols: Vec<(String, S)>,
}

impl<S> Default for SymbolMap<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> SymbolMap<S> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            symbols: Vec::new(),
        }
    }

    /// Adds `symbol` under the next free numeric name and returns the name.
    pub fn insert(&mut self, symbol: S) -> String {
        let mut n = self.symbols.len();
        let name = loop {
            let name = n.to_string();
            if self.get(&name).is_none() {
                break name;
            }
            n += 1;
        };
        self.symbols.push((name.clone(), symbol));
        name
    }

    /// Adds or replaces the symbol called `name`.
    pub fn insert_named(&mut self, name: impl Into<String>, symbol: S) {
        let name = name.into();
        match self.symbols.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = symbol,
            None => self.symbols.push((name, symbol)),
        }
    }

    /// Returns the symbol called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&S> {
        self.symbols
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    /// Number of symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns `true` if the map holds no symbol.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Iterates over `(name, symbol)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &S)> + '_ {
        self.symbols.iter().map(|(n, s)| (n.as_str(), s))
    }

    /// Encodes the map as a `symbols` element.
    pub fn to_element(&self, codec: &impl SymbolCodec<S>) -> Element {
        let mut element = Element::new(SYMBOLS);
        for (name, symbol) in self.iter() {
            let mut child = codec.encode(symbol);
            child.tag = String::from(SYMBOL);
            child.set_attribute(NAME, name);
            element.children.push(child);
        }
        element
    }

    /// Decodes a `symbols` element.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::UnexpectedElement`] for a wrong tag and
    /// [`PersistError::Symbol`] when the codec rejects a symbol.
    pub fn from_element(element: &Element, codec: &impl SymbolCodec<S>) -> Result<Self, PersistError> {
        if element.tag != SYMBOLS {
            return Err(PersistError::UnexpectedElement {
                expected: SYMBOLS,
                found: element.tag.clone(),
            });
        }
        let mut map = Self::new();
        for (index, child) in element.children_named(SYMBOL).enumerate() {
            let name = child
                .attribute(NAME)
                .map_or_else(|| index.to_string(), String::from);
            let symbol = codec.decode(child).map_err(|e| PersistError::Symbol {
                name: name.clone(),
                message: e.to_string(),
            })?;
            map.insert_named(name, symbol);
        }
        Ok(map)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Symbols are plain level lists, stored as a comma-separated attribute.
    pub(crate) struct LevelsCodec;

    impl SymbolCodec<Vec<i32>> for LevelsCodec {
        type Error = String;

        fn encode(&self, symbol: &Vec<i32>) -> Element {
            let levels: Vec<String> = symbol.iter().map(ToString::to_string).collect();
            Element::new("levels").with_attribute("levels", levels.join(","))
        }

        fn decode(&self, element: &Element) -> Result<Vec<i32>, String> {
            let raw = element.attribute("levels").ok_or("missing levels")?;
            if raw.is_empty() {
                return Ok(Vec::new());
            }
            raw.split(',')
                .map(|l| l.parse().map_err(|_| format!("bad level `{l}`")))
                .collect()
        }
    }

    #[test]
    fn names_are_sequential_and_unique() {
        let mut map = SymbolMap::new();
        map.insert_named("1", vec![9]);
        assert_eq!(map.insert(vec![0]), "2");
        assert_eq!(map.insert(vec![1]), "3");
        assert_eq!(map.get("1"), Some(&vec![9]));
        map.insert_named("1", vec![7]);
        assert_eq!(map.get("1"), Some(&vec![7]));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn element_round_trip() {
        let mut map = SymbolMap::new();
        map.insert(vec![0, 2]);
        map.insert(vec![-1]);
        let element = map.to_element(&LevelsCodec);
        assert_eq!(element.children[1].attribute("name"), Some("1"));
        assert_eq!(element.children[1].tag, "symbol");
        let back = SymbolMap::from_element(&element, &LevelsCodec).expect("decode");
        assert_eq!(back, map);
    }

    #[test]
    fn codec_errors_name_the_symbol() {
        let element = Element::new("symbols").with_child(
            Element::new("symbol")
                .with_attribute("name", "fill")
                .with_attribute("levels", "1,x"),
        );
        let err = SymbolMap::from_element(&element, &LevelsCodec).expect_err("bad level");
        assert!(
            matches!(&err, PersistError::Symbol { name, .. } if name == "fill"),
            "got: {err}"
        );
    }
}
