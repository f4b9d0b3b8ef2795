// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Saving and loading rules and renderers.

use strata_core::rule::{ElsePolicy, Rule, RuleId, RuleNode, RuleTree};
use strata_core::scale::ScaleRange;
use strata_render::{RendererConfig, RuleRenderer};

use crate::element::Element;
use crate::error::PersistError;
use crate::symbols::{SymbolCodec, SymbolMap};

const RENDERER: &str = "renderer-v2";
const RENDERER_TYPE: &str = "ruleRenderer";
const RULES: &str = "rules";
const RULE: &str = "rule";
const SYMBOLS: &str = "symbols";

/// Filter text that older documents used for ELSE rules.
const LEGACY_ELSE: &str = "ELSE";

/// Saves the subtree rooted at `id`.
///
/// Every symbol in the subtree is added to `symbols`; rules refer to them by
/// name. Attributes that hold their default value are omitted.
pub fn save_rule<S: Clone>(tree: &RuleTree<S>, id: RuleId, symbols: &mut SymbolMap<S>) -> Element {
    let mut element = Element::new(RULE).with_attribute("key", tree.key(id));
    let filter = tree.filter(id);
    if !filter.is_empty() {
        element.set_attribute("filter", filter);
    }
    let scale = tree.scale(id);
    if scale.min_denom != 0.0 {
        element.set_attribute("scalemindenom", scale.min_denom.to_string());
    }
    if scale.max_denom != 0.0 {
        element.set_attribute("scalemaxdenom", scale.max_denom.to_string());
    }
    if !tree.label(id).is_empty() {
        element.set_attribute("label", tree.label(id));
    }
    if !tree.description(id).is_empty() {
        element.set_attribute("description", tree.description(id));
    }
    if !tree.is_active(id) {
        element.set_attribute("checkstate", "0");
    }
    if tree.is_else(id) {
        element.set_attribute("else", "1");
    }
    if let Some(symbol) = tree.symbol(id) {
        let name = symbols.insert(symbol.clone());
        element.set_attribute("symbol", name);
    }
    for child in tree.children(id) {
        element.children.push(save_rule(tree, child, symbols));
    }
    element
}

/// Loads a subtree saved by [`save_rule`].
///
/// Symbols are cloned out of `symbols`, so several rules may share one
/// entry. A filter of `ELSE` is read as an ELSE rule without a filter.
///
/// # Errors
///
/// Returns [`PersistError::UnexpectedElement`] for an element that is not a
/// rule, [`PersistError::InvalidNumber`] for a malformed scale, and
/// [`PersistError::MissingSymbol`] for a dangling symbol reference.
pub fn load_rule<S: Clone>(element: &Element, symbols: &SymbolMap<S>) -> Result<RuleNode<S>, PersistError> {
    if element.tag != RULE && element.tag != RULES {
        return Err(PersistError::UnexpectedElement {
            expected: RULE,
            found: element.tag.clone(),
        });
    }

    let symbol = match element.attribute("symbol") {
        Some(name) => Some(
            symbols
                .get(name)
                .cloned()
                .ok_or_else(|| PersistError::MissingSymbol(String::from(name)))?,
        ),
        None => None,
    };
    let mut rule = Rule::new(symbol);
    if let Some(key) = element.attribute("key") {
        rule = rule.key(key);
    }
    match element.attribute("filter") {
        Some(filter) if filter.trim() == LEGACY_ELSE => rule = rule.else_rule(),
        Some(filter) => rule = rule.filter(filter),
        None => {}
    }
    rule.scale = ScaleRange::new(
        parse_denom(element, "scalemindenom")?,
        parse_denom(element, "scalemaxdenom")?,
    );
    if let Some(label) = element.attribute("label") {
        rule = rule.label(label);
    }
    if let Some(description) = element.attribute("description") {
        rule = rule.description(description);
    }
    if element.attribute("checkstate") == Some("0") {
        rule = rule.active(false);
    }
    if element.attribute("else") == Some("1") {
        rule = rule.else_rule();
    }

    let mut node = RuleNode::new(rule);
    for child in element.children_named(RULE) {
        node.children.push(load_rule(child, symbols)?);
    }
    Ok(node)
}

fn parse_denom(element: &Element, attribute: &'static str) -> Result<f64, PersistError> {
    let Some(value) = element.attribute(attribute) else {
        return Ok(0.0);
    };
    match value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(PersistError::InvalidNumber {
            attribute,
            value: String::from(value),
        }),
    }
}

/// Saves a renderer: its configuration, its rule tree, and a shared symbol
/// section encoded with `codec`.
pub fn save_renderer<S: Clone>(renderer: &RuleRenderer<S>, codec: &impl SymbolCodec<S>) -> Element {
    let tree = renderer.tree();
    let mut symbols = SymbolMap::new();
    let mut rules = save_rule(tree, tree.root(), &mut symbols);
    rules.tag = String::from(RULES);

    let mut element = Element::new(RENDERER).with_attribute("type", RENDERER_TYPE);
    if renderer.config().else_policy == ElsePolicy::All {
        element.set_attribute("elsepolicy", "all");
    }
    element
        .with_child(rules)
        .with_child(symbols.to_element(codec))
}

/// Loads a renderer saved by [`save_renderer`].
///
/// # Errors
///
/// Returns [`PersistError::UnexpectedElement`] when `element` is not a rule
/// renderer, [`PersistError::MissingSection`] when it has no rules, and any
/// error raised while decoding symbols or rules.
pub fn load_renderer<S: Clone>(
    element: &Element,
    codec: &impl SymbolCodec<S>,
) -> Result<RuleRenderer<S>, PersistError> {
    if element.tag != RENDERER {
        return Err(PersistError::UnexpectedElement {
            expected: RENDERER,
            found: element.tag.clone(),
        });
    }
    if let Some(kind) = element.attribute("type")
        && kind != RENDERER_TYPE
    {
        return Err(PersistError::UnexpectedElement {
            expected: RENDERER_TYPE,
            found: String::from(kind),
        });
    }

    let symbols = match element.child(SYMBOLS) {
        Some(section) => SymbolMap::from_element(section, codec)?,
        None => SymbolMap::new(),
    };
    let rules = element.child(RULES).ok_or(PersistError::MissingSection(RULES))?;
    let tree = RuleTree::from_root(load_rule(rules, &symbols)?);

    let config = match element.attribute("elsepolicy") {
        Some("all") => RendererConfig::every_else(),
        _ => RendererConfig::first_match(),
    };
    Ok(RuleRenderer::with_config(tree, config))
}
