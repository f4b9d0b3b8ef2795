// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays rule storage with allocation, topology, and property management.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use understory_dirty::{CycleHandling, DirtyTracker};

use super::definition::{Rule, RuleFlags, RuleNode};
use super::id::{INVALID, RuleId};
use super::traverse::{Children, Descendants};
use crate::context::RenderContext;
use crate::dirty;
use crate::expression::{FilterEngine, is_blank};
use crate::levels::LevelMap;
use crate::scale::ScaleRange;
use crate::symbol::Symbol;

/// Errors reported by [`RuleTree`] edits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuleTreeError {
    /// Another rule in the tree already uses this key.
    DuplicateKey(String),
}

impl fmt::Display for RuleTreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKey(key) => write!(f, "rule key `{key}` is already in use"),
        }
    }
}

impl core::error::Error for RuleTreeError {}

/// Struct-of-arrays storage for a tree of rules.
///
/// The tree always has a root rule, created with the tree. The root has no
/// symbol by default and, having no filter, matches every feature; it only
/// groups the top-level rules. Rules are addressed by [`RuleId`] handles;
/// removed rules are recycled via a free list and generation counters
/// prevent stale handle access.
///
/// Every rule owns its symbol. Removing a rule drops its whole subtree and
/// every symbol in it.
///
/// # Derived caches
///
/// Each parent keeps its children partitioned into ordinary and ELSE rules,
/// and the tree keeps the sorted set of symbol-layer levels used anywhere.
/// Edits mark these stale (see [`dirty`](crate::dirty));
/// [`refresh`](Self::refresh) brings them up to date. A render pass can only
/// start on a refreshed tree.
#[derive(Debug)]
pub struct RuleTree<S> {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Definition (persistent) --
    pub(crate) symbol: Vec<Option<S>>,
    pub(crate) scale: Vec<ScaleRange>,
    pub(crate) filter: Vec<String>,
    pub(crate) label: Vec<String>,
    pub(crate) description: Vec<String>,
    pub(crate) flags: Vec<RuleFlags>,
    pub(crate) key: Vec<String>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,
    pub(crate) root: u32,

    // -- Key index --
    keys: BTreeMap<String, u32>,
    next_key: u64,

    // -- Dirty tracking --
    dirty: DirtyTracker<u32>,
    caches_stale: bool,

    // -- Derived caches --
    pub(crate) normal_children: Vec<Vec<u32>>,
    pub(crate) else_children: Vec<Vec<u32>>,
    z_levels: Vec<i32>,
}

impl<S> Default for RuleTree<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> RuleTree<S> {
    /// Creates a tree holding only an empty root rule.
    #[must_use]
    pub fn new() -> Self {
        Self::from_root(RuleNode::new(Rule::group()))
    }

    /// Builds a tree from a detached subtree, which becomes the root.
    ///
    /// Keys carried by the nodes are kept; missing or duplicate keys are
    /// replaced by generated ones.
    #[must_use]
    pub fn from_root(node: RuleNode<S>) -> Self {
        let mut tree = Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            symbol: Vec::new(),
            scale: Vec::new(),
            filter: Vec::new(),
            label: Vec::new(),
            description: Vec::new(),
            flags: Vec::new(),
            key: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            root: INVALID,
            keys: BTreeMap::new(),
            next_key: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            caches_stale: true,
            normal_children: Vec::new(),
            else_children: Vec::new(),
            z_levels: Vec::new(),
        };
        let RuleNode { rule, children } = node;
        tree.root = tree.alloc(rule);
        for child in children {
            tree.graft_idx(tree.root, child, INVALID);
        }
        // The root never has a parent; it is never an ELSE rule of anything.
        tree.dirty.mark(tree.root, dirty::ZLEVELS);
        tree
    }

    /// Creates a tree whose root holds one catch-all rule drawing `symbol`.
    #[must_use]
    pub fn with_default_symbol(symbol: S) -> Self {
        Self::from_root(RuleNode::new(Rule::group()).child(Rule::with_symbol(symbol)))
    }

    /// Returns the root rule.
    #[must_use]
    pub fn root(&self) -> RuleId {
        self.id_at(self.root)
    }

    /// Returns the number of live rules, including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len as usize - self.free_list.len()
    }

    /// Always `false`; the tree holds at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns whether the given handle refers to a live rule.
    ///
    /// Freeing a slot bumps its generation, so a handle is live exactly when
    /// its generation matches the slot's.
    #[must_use]
    pub fn is_alive(&self, id: RuleId) -> bool {
        (id.idx < self.len) && self.generation[id.idx as usize] == id.generation
    }

    // -- Topology API --

    /// Appends `rule` as the last child of `parent`, taking ownership of its
    /// symbol.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is stale.
    pub fn append_child(&mut self, parent: RuleId, rule: Rule<S>) -> RuleId {
        self.graft(parent, RuleNode::new(rule))
    }

    /// Inserts `rule` as child number `index` of `parent`.
    ///
    /// An `index` past the end appends.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is stale.
    pub fn insert_child(&mut self, parent: RuleId, index: usize, rule: Rule<S>) -> RuleId {
        self.graft_at(parent, index, RuleNode::new(rule))
    }

    /// Appends a detached subtree as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is stale.
    pub fn graft(&mut self, parent: RuleId, node: RuleNode<S>) -> RuleId {
        self.validate(parent);
        let idx = self.graft_idx(parent.idx, node, INVALID);
        self.id_at(idx)
    }

    /// Inserts a detached subtree as child number `index` of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is stale.
    pub fn graft_at(&mut self, parent: RuleId, index: usize, node: RuleNode<S>) -> RuleId {
        self.validate(parent);
        let before = self
            .child_at(parent, index)
            .map_or(INVALID, |sibling| sibling.idx);
        let idx = self.graft_idx(parent.idx, node, before);
        self.id_at(idx)
    }

    /// Removes a rule and its whole subtree, dropping their symbols.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or refers to the root.
    pub fn remove(&mut self, id: RuleId) {
        drop(self.take(id));
    }

    /// Detaches a rule and its subtree from the tree and returns it.
    ///
    /// Keys are preserved in the returned node, so grafting it back restores
    /// the same keys.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or refers to the root.
    pub fn take(&mut self, id: RuleId) -> RuleNode<S> {
        self.validate(id);
        assert!(id.idx != self.root, "cannot remove the root rule");
        let p = self.parent[id.idx as usize];
        self.unlink_from_parent(id.idx);
        self.mark(p, dirty::PARTITION);
        self.detach_subtree(id.idx)
    }

    /// Returns the parent of a rule, or `None` for the root.
    #[must_use]
    pub fn parent(&self, id: RuleId) -> Option<RuleId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        (p != INVALID).then(|| self.id_at(p))
    }

    /// Returns an iterator over the direct children of a rule.
    #[must_use]
    pub fn children(&self, id: RuleId) -> Children<'_, S> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns every rule below `id`, depth-first in declaration order.
    #[must_use]
    pub fn descendants(&self, id: RuleId) -> Descendants<'_, S> {
        self.validate(id);
        Descendants::new(self, id.idx)
    }

    /// Returns the number of direct children of a rule.
    #[must_use]
    pub fn child_count(&self, id: RuleId) -> usize {
        self.children(id).count()
    }

    /// Returns child number `index` of a rule.
    #[must_use]
    pub fn child_at(&self, id: RuleId, index: usize) -> Option<RuleId> {
        self.children(id).nth(index)
    }

    /// Returns the number of ancestors of a rule (0 for the root).
    #[must_use]
    pub fn depth(&self, id: RuleId) -> usize {
        self.validate(id);
        let mut depth = 0;
        let mut p = self.parent[id.idx as usize];
        while p != INVALID {
            depth += 1;
            p = self.parent[p as usize];
        }
        depth
    }

    // -- Keys --

    /// Returns the unique key of a rule.
    #[must_use]
    pub fn key(&self, id: RuleId) -> &str {
        self.validate(id);
        &self.key[id.idx as usize]
    }

    /// Overrides the key of a rule.
    ///
    /// # Errors
    ///
    /// Returns [`RuleTreeError::DuplicateKey`] if another rule uses `key`.
    pub fn set_key(&mut self, id: RuleId, key: impl Into<String>) -> Result<(), RuleTreeError> {
        self.validate(id);
        let key = key.into();
        match self.keys.get(&key) {
            Some(&owner) if owner == id.idx => return Ok(()),
            Some(_) => return Err(RuleTreeError::DuplicateKey(key)),
            None => {}
        }
        let old = core::mem::replace(&mut self.key[id.idx as usize], key.clone());
        self.keys.remove(&old);
        self.keys.insert(key, id.idx);
        Ok(())
    }

    /// Finds a rule anywhere in the tree by its key.
    #[must_use]
    pub fn find_rule_by_key(&self, key: &str) -> Option<RuleId> {
        self.keys.get(key).map(|&idx| self.id_at(idx))
    }

    /// Searches `from` and its descendants, depth-first, for a rule with
    /// the given key.
    #[must_use]
    pub fn find_rule_by_key_from(&self, from: RuleId, key: &str) -> Option<RuleId> {
        if self.key(from) == key {
            return Some(from);
        }
        self.descendants(from).find(|&id| self.key[id.idx as usize] == key)
    }

    // -- Property getters (read-only, no dirty marking) --

    /// Returns the symbol owned by a rule.
    #[must_use]
    pub fn symbol(&self, id: RuleId) -> Option<&S> {
        self.validate(id);
        self.symbol[id.idx as usize].as_ref()
    }

    /// Returns the filter expression source (empty when unfiltered).
    #[must_use]
    pub fn filter(&self, id: RuleId) -> &str {
        self.validate(id);
        &self.filter[id.idx as usize]
    }

    /// Returns whether the rule has a non-blank filter.
    #[must_use]
    pub fn has_filter(&self, id: RuleId) -> bool {
        !is_blank(self.filter(id))
    }

    /// Returns the scale range of a rule.
    #[must_use]
    pub fn scale(&self, id: RuleId) -> ScaleRange {
        self.validate(id);
        self.scale[id.idx as usize]
    }

    /// Returns the label of a rule.
    #[must_use]
    pub fn label(&self, id: RuleId) -> &str {
        self.validate(id);
        &self.label[id.idx as usize]
    }

    /// Returns the description of a rule.
    #[must_use]
    pub fn description(&self, id: RuleId) -> &str {
        self.validate(id);
        &self.description[id.idx as usize]
    }

    /// Returns the flags of a rule.
    #[must_use]
    pub fn flags(&self, id: RuleId) -> RuleFlags {
        self.validate(id);
        self.flags[id.idx as usize]
    }

    /// Returns whether a rule is active.
    #[must_use]
    pub fn is_active(&self, id: RuleId) -> bool {
        self.flags(id).active
    }

    /// Returns whether a rule is an ELSE rule.
    #[must_use]
    pub fn is_else(&self, id: RuleId) -> bool {
        self.flags(id).is_else
    }

    /// Returns whether a rule neither draws nor has children.
    ///
    /// Such a rule is inert: evaluating it always yields
    /// [`RenderResult::Filtered`](super::RenderResult::Filtered) (or
    /// `Inactive` when disabled), and it never suppresses ELSE siblings.
    #[must_use]
    pub fn is_no_op(&self, id: RuleId) -> bool {
        self.symbol(id).is_none() && self.first_child[id.idx as usize] == INVALID
    }

    // -- Mutation API (auto-marks dirty) --

    /// Replaces the symbol of a rule, returning the previous one.
    pub fn set_symbol(&mut self, id: RuleId, symbol: Option<S>) -> Option<S> {
        self.validate(id);
        self.mark(self.root, dirty::ZLEVELS);
        core::mem::replace(&mut self.symbol[id.idx as usize], symbol)
    }

    /// Returns the symbol of a rule for in-place editing.
    ///
    /// Conservatively marks the z-level set stale, since edits may change
    /// layer levels.
    pub fn symbol_mut(&mut self, id: RuleId) -> Option<&mut S> {
        self.validate(id);
        self.mark(self.root, dirty::ZLEVELS);
        self.symbol[id.idx as usize].as_mut()
    }

    /// Sets the filter expression source.
    pub fn set_filter(&mut self, id: RuleId, filter: impl Into<String>) {
        self.validate(id);
        self.filter[id.idx as usize] = filter.into();
    }

    /// Sets the scale range.
    pub fn set_scale(&mut self, id: RuleId, scale: ScaleRange) {
        self.validate(id);
        self.scale[id.idx as usize] = scale;
    }

    /// Sets the minimum scale denominator (`0.0` disables the bound).
    pub fn set_scale_min_denom(&mut self, id: RuleId, min_denom: f64) {
        self.validate(id);
        self.scale[id.idx as usize].min_denom = min_denom;
    }

    /// Sets the maximum scale denominator (`0.0` disables the bound).
    pub fn set_scale_max_denom(&mut self, id: RuleId, max_denom: f64) {
        self.validate(id);
        self.scale[id.idx as usize].max_denom = max_denom;
    }

    /// Sets the label.
    pub fn set_label(&mut self, id: RuleId, label: impl Into<String>) {
        self.validate(id);
        self.label[id.idx as usize] = label.into();
    }

    /// Sets the description.
    pub fn set_description(&mut self, id: RuleId, description: impl Into<String>) {
        self.validate(id);
        self.description[id.idx as usize] = description.into();
    }

    /// Enables or disables a rule (and, implicitly, its subtree).
    pub fn set_active(&mut self, id: RuleId, active: bool) {
        self.validate(id);
        self.flags[id.idx as usize].active = active;
    }

    /// Sets or clears the ELSE flag.
    ///
    /// Marks the parent's partition stale.
    pub fn set_else(&mut self, id: RuleId, is_else: bool) {
        self.validate(id);
        self.flags[id.idx as usize].is_else = is_else;
        let p = self.parent[id.idx as usize];
        if p != INVALID {
            self.mark(p, dirty::PARTITION);
        }
    }

    // -- Derived caches --

    /// Returns whether edits since the last [`refresh`](Self::refresh) left
    /// derived caches stale.
    #[must_use]
    pub fn needs_refresh(&self) -> bool {
        self.caches_stale
    }

    /// Recomputes the ordinary/ELSE partition of every parent whose child
    /// list or children's ELSE flags changed.
    pub fn update_else_rules(&mut self) {
        let parents: Vec<u32> = self
            .dirty
            .drain(dirty::PARTITION)
            .deterministic()
            .run()
            .collect();
        for p in parents {
            if self.is_live_idx(p) {
                self.recompute_partition(p);
            }
        }
    }

    /// Brings every derived cache up to date.
    pub fn refresh(&mut self)
    where
        S: Symbol,
    {
        self.update_else_rules();
        let zlevels_changed = self
            .dirty
            .drain(dirty::ZLEVELS)
            .deterministic()
            .run()
            .count()
            > 0;
        if zlevels_changed {
            self.z_levels = self.collect_z_levels(self.root()).into_iter().collect();
        }
        self.caches_stale = false;
    }

    /// Ordinary (non-ELSE) children of a rule, as of the last refresh.
    pub fn normal_children(&self, id: RuleId) -> impl Iterator<Item = RuleId> + '_ {
        self.validate(id);
        self.normal_children[id.idx as usize]
            .iter()
            .map(|&idx| self.id_at(idx))
    }

    /// ELSE children of a rule, as of the last refresh.
    pub fn else_children(&self, id: RuleId) -> impl Iterator<Item = RuleId> + '_ {
        self.validate(id);
        self.else_children[id.idx as usize]
            .iter()
            .map(|&idx| self.id_at(idx))
    }

    /// Collects every declared symbol-layer level used by `id` and its
    /// descendants, regardless of activity or scale.
    #[must_use]
    pub fn collect_z_levels(&self, id: RuleId) -> BTreeSet<i32>
    where
        S: Symbol,
    {
        let mut levels = BTreeSet::new();
        for rule in core::iter::once(id).chain(self.descendants(id)) {
            if let Some(symbol) = &self.symbol[rule.idx as usize] {
                levels.extend(symbol.levels().map(|(_, z)| z));
            }
        }
        levels
    }

    /// Distinct declared levels of the whole tree, ascending, as of the last
    /// refresh.
    #[must_use]
    pub fn z_levels(&self) -> &[i32] {
        &self.z_levels
    }

    /// Normalized level mapping for the whole tree, as of the last refresh.
    #[must_use]
    pub fn level_map(&self) -> LevelMap {
        LevelMap::from_sorted(self.z_levels.clone())
    }

    // -- Queries --

    /// Returns whether a rule applies at `scale` (`0.0` always applies).
    #[must_use]
    pub fn is_scale_ok(&self, id: RuleId, scale: f64) -> bool {
        self.scale(id).contains(scale)
    }

    /// Tests a single rule's own filter against `feature`, compiling it on
    /// demand.
    ///
    /// Unfiltered rules and ELSE rules pass. A filter that fails to compile
    /// or evaluates to null never passes.
    pub fn is_filter_ok<F>(
        &self,
        id: RuleId,
        feature: &F,
        context: &RenderContext,
        engine: &dyn FilterEngine<F>,
    ) -> bool {
        if self.is_else(id) || !self.has_filter(id) {
            return true;
        }
        engine
            .compile(self.filter(id))
            .is_ok_and(|filter| filter.evaluate(feature, context) == Some(true))
    }

    /// Every symbol in the tree, depth-first, regardless of activity.
    #[must_use]
    pub fn symbols(&self) -> Vec<&S> {
        let root = self.root();
        core::iter::once(root)
            .chain(self.descendants(root))
            .filter_map(|id| self.symbol[id.idx as usize].as_ref())
            .collect()
    }

    /// Deep-copies the subtree at `id`, keys included.
    #[must_use]
    pub fn to_node(&self, id: RuleId) -> RuleNode<S>
    where
        S: Clone,
    {
        self.validate(id);
        let idx = id.idx as usize;
        RuleNode {
            rule: Rule {
                symbol: self.symbol[idx].clone(),
                scale: self.scale[idx],
                filter: self.filter[idx].clone(),
                label: self.label[idx].clone(),
                description: self.description[idx].clone(),
                flags: self.flags[idx],
                key: Some(self.key[idx].clone()),
            },
            children: self.children(id).map(|c| self.to_node(c)).collect(),
        }
    }

    /// Renders the subtree at `id` as indented text, one rule per line.
    #[must_use]
    pub fn dump(&self, id: RuleId) -> String
    where
        S: fmt::Debug,
    {
        let mut out = String::new();
        self.dump_into(id, 0, &mut out);
        out
    }

    fn dump_into(&self, id: RuleId, indent: usize, out: &mut String)
    where
        S: fmt::Debug,
    {
        let idx = id.idx as usize;
        let scale = self.scale[idx];
        let symbol = match &self.symbol[idx] {
            Some(symbol) => format!("{symbol:?}"),
            None => String::from("[]"),
        };
        let filter = if self.flags[idx].is_else {
            "ELSE"
        } else {
            self.filter[idx].as_str()
        };
        out.push_str(&format!(
            "{:indent$}RULE {} - scale [{},{}] - filter {} - {}\n",
            "",
            self.label[idx],
            scale.min_denom,
            scale.max_denom,
            filter,
            symbol,
        ));
        for child in self.children(id) {
            self.dump_into(child, indent + 2, out);
        }
    }

    // -- Internal helpers --

    pub(crate) fn id_at(&self, idx: u32) -> RuleId {
        RuleId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Every linked rule but the root has a parent; freed slots have none.
    fn is_live_idx(&self, idx: u32) -> bool {
        idx == self.root || (idx < self.len && self.parent[idx as usize] != INVALID)
    }

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: RuleId) {
        assert!(
            self.is_alive(id),
            "stale RuleId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    fn mark(&mut self, idx: u32, channel: understory_dirty::Channel) {
        self.dirty.mark(idx, channel);
        self.caches_stale = true;
    }

    /// Allocates a slot for `rule` without linking it.
    fn alloc(&mut self, rule: Rule<S>) -> u32 {
        let Rule {
            symbol,
            scale,
            filter,
            label,
            description,
            flags,
            key,
        } = rule;
        let key = match key {
            Some(key) if !key.is_empty() && !self.keys.contains_key(&key) => key,
            _ => self.generate_key(),
        };
        let has_symbol = symbol.is_some();

        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            let i = idx as usize;
            self.generation[i] += 1;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.symbol[i] = symbol;
            self.scale[i] = scale;
            self.filter[i] = filter;
            self.label[i] = label;
            self.description[i] = description;
            self.flags[i] = flags;
            self.key[i] = key.clone();
            self.normal_children[i].clear();
            self.else_children[i].clear();
            idx
        } else {
            // Allocate a new slot.
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.symbol.push(symbol);
            self.scale.push(scale);
            self.filter.push(filter);
            self.label.push(label);
            self.description.push(description);
            self.flags.push(flags);
            self.key.push(key.clone());
            self.generation.push(0);
            self.normal_children.push(Vec::new());
            self.else_children.push(Vec::new());
            idx
        };

        self.keys.insert(key, idx);
        if has_symbol && self.root != INVALID {
            self.mark(self.root, dirty::ZLEVELS);
        }
        idx
    }

    /// Allocates and links a subtree under `parent`, before `before` (or
    /// last when `before` is [`INVALID`]).
    fn graft_idx(&mut self, parent: u32, node: RuleNode<S>, before: u32) -> u32 {
        let RuleNode { rule, children } = node;
        let c = self.alloc(rule);
        if before == INVALID {
            self.link_last(parent, c);
        } else {
            self.link_before(c, before);
        }
        self.mark(parent, dirty::PARTITION);
        for child in children {
            self.graft_idx(c, child, INVALID);
        }
        c
    }

    /// Detaches and frees the already-unlinked subtree at `idx`.
    fn detach_subtree(&mut self, idx: u32) -> RuleNode<S> {
        let mut kids = Vec::new();
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            kids.push(child);
            child = self.next_sibling[child as usize];
        }
        let children = kids.into_iter().map(|c| self.detach_subtree(c)).collect();

        let i = idx as usize;
        let key = core::mem::take(&mut self.key[i]);
        self.keys.remove(&key);
        let symbol = self.symbol[i].take();
        if symbol.is_some() {
            self.mark(self.root, dirty::ZLEVELS);
        }
        let rule = Rule {
            symbol,
            scale: self.scale[i],
            filter: core::mem::take(&mut self.filter[i]),
            label: core::mem::take(&mut self.label[i]),
            description: core::mem::take(&mut self.description[i]),
            flags: self.flags[i],
            key: Some(key),
        };

        // Bump generation so old handles immediately fail validation.
        self.generation[i] += 1;
        self.parent[i] = INVALID;
        self.first_child[i] = INVALID;
        self.next_sibling[i] = INVALID;
        self.prev_sibling[i] = INVALID;
        self.normal_children[i].clear();
        self.else_children[i].clear();
        self.dirty.remove_key(idx);
        self.free_list.push(idx);

        RuleNode { rule, children }
    }

    fn generate_key(&mut self) -> String {
        loop {
            self.next_key += 1;
            let key = format!("rule-{}", self.next_key);
            if !self.keys.contains_key(&key) {
                return key;
            }
        }
    }

    fn link_last(&mut self, p: u32, c: u32) {
        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            // Walk to last child.
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }
    }

    fn link_before(&mut self, c: u32, s: u32) {
        let p = self.parent[s as usize];
        self.parent[c as usize] = p;
        self.next_sibling[c as usize] = s;
        self.prev_sibling[c as usize] = self.prev_sibling[s as usize];

        if self.prev_sibling[s as usize] != INVALID {
            self.next_sibling[self.prev_sibling[s as usize] as usize] = c;
        } else {
            // `s` was the first child.
            self.first_child[p as usize] = c;
        }
        self.prev_sibling[s as usize] = c;
    }

    /// Removes `idx` from its parent's child list without touching dirty state.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            // Was first child.
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }

    fn recompute_partition(&mut self, p: u32) {
        let mut normal = core::mem::take(&mut self.normal_children[p as usize]);
        let mut elses = core::mem::take(&mut self.else_children[p as usize]);
        normal.clear();
        elses.clear();
        let mut child = self.first_child[p as usize];
        while child != INVALID {
            if self.flags[child as usize].is_else {
                elses.push(child);
            } else {
                normal.push(child);
            }
            child = self.next_sibling[child as usize];
        }
        self.normal_children[p as usize] = normal;
        self.else_children[p as usize] = elses;
    }
}

impl<S: Clone> Clone for RuleTree<S> {
    /// Deep-copies the tree. Keys are preserved; handles issued by `self` are
    /// not valid for the copy.
    fn clone(&self) -> Self {
        Self::from_root(self.to_node(self.root()))
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::testing::TestSymbol;

    fn sym(levels: &[i32]) -> TestSymbol {
        TestSymbol::new("s", levels)
    }

    #[test]
    fn new_tree_has_bare_root() {
        let tree = RuleTree::<TestSymbol>::new();
        let root = tree.root();
        assert_eq!(tree.len(), 1);
        assert!(tree.is_alive(root));
        assert!(tree.symbol(root).is_none());
        assert_eq!(tree.parent(root), None);
        assert!(!tree.has_filter(root));
        assert!(tree.is_no_op(root));
    }

    #[test]
    fn append_and_insert_keep_declaration_order() {
        let mut tree = RuleTree::<TestSymbol>::new();
        let root = tree.root();
        let a = tree.append_child(root, Rule::group().label("a"));
        let c = tree.append_child(root, Rule::group().label("c"));
        let b = tree.insert_child(root, 1, Rule::group().label("b"));
        let d = tree.insert_child(root, 99, Rule::group().label("d"));
        let first = tree.insert_child(root, 0, Rule::group().label("first"));

        let kids: Vec<_> = tree.children(root).collect();
        assert_eq!(kids, vec![first, a, b, c, d]);
        assert_eq!(tree.child_at(root, 2), Some(b));
        assert_eq!(tree.child_count(root), 5);
        assert_eq!(tree.parent(b), Some(root));
    }

    #[test]
    fn descendants_are_pre_order() {
        let mut tree = RuleTree::<TestSymbol>::new();
        let root = tree.root();
        // Tree: root -> [a -> [a1, a2 -> [a2x]], b]
        let a = tree.append_child(root, Rule::group());
        let b = tree.append_child(root, Rule::group());
        let a1 = tree.append_child(a, Rule::group());
        let a2 = tree.append_child(a, Rule::group());
        let a2x = tree.append_child(a2, Rule::group());

        let all: Vec<_> = tree.descendants(root).collect();
        assert_eq!(all, vec![a, a1, a2, a2x, b]);
        let below_a: Vec<_> = tree.descendants(a).collect();
        assert_eq!(below_a, vec![a1, a2, a2x]);
        assert_eq!(tree.descendants(b).count(), 0);
        assert_eq!(tree.depth(a2x), 3);
    }

    #[test]
    fn remove_frees_whole_subtree() {
        let mut tree = RuleTree::new();
        let root = tree.root();
        let a = tree.append_child(root, Rule::with_symbol(sym(&[0])));
        let a1 = tree.append_child(a, Rule::with_symbol(sym(&[1])));
        let b = tree.append_child(root, Rule::group());

        tree.remove(a);
        assert!(!tree.is_alive(a));
        assert!(!tree.is_alive(a1));
        assert!(tree.is_alive(b));
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut tree = RuleTree::<TestSymbol>::new();
        let root = tree.root();
        let id1 = tree.append_child(root, Rule::group());
        tree.remove(id1);
        let id2 = tree.append_child(root, Rule::group());
        assert!(!tree.is_alive(id1));
        assert!(tree.is_alive(id2));
        assert_eq!(id1.idx, id2.idx);
        assert_ne!(id1.generation, id2.generation);
    }

    #[test]
    fn handles_stay_stale_across_repeated_reuse() {
        let mut tree = RuleTree::<TestSymbol>::new();
        let root = tree.root();
        let mut stale = Vec::new();
        for _ in 0..3 {
            let id = tree.append_child(root, Rule::group());
            let child = tree.append_child(id, Rule::group());
            tree.remove(id);
            assert!(!tree.is_alive(id));
            assert!(!tree.is_alive(child));
            stale.extend([id, child]);
        }
        let fresh = tree.append_child(root, Rule::group());
        assert!(tree.is_alive(fresh));
        assert!(stale.iter().all(|&id| !tree.is_alive(id)));
        assert!(stale.iter().any(|id| id.idx == fresh.idx));
        assert_eq!(tree.len(), 2);
        tree.refresh();
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![fresh]);
    }

    #[test]
    #[should_panic(expected = "stale RuleId")]
    fn removed_handle_panics_on_get_filter() {
        let mut tree = RuleTree::<TestSymbol>::new();
        let root = tree.root();
        let id = tree.append_child(root, Rule::group().filter("a = 1"));
        tree.remove(id);
        let _ = tree.filter(id);
    }

    #[test]
    #[should_panic(expected = "cannot remove the root rule")]
    fn removing_root_panics() {
        let mut tree = RuleTree::<TestSymbol>::new();
        let root = tree.root();
        tree.remove(root);
    }

    #[test]
    fn take_and_graft_preserve_keys() {
        let mut tree = RuleTree::new();
        let root = tree.root();
        let a = tree.append_child(root, Rule::with_symbol(sym(&[0])).key("keep-a"));
        tree.append_child(a, Rule::group().key("keep-a1"));

        let node = tree.take(a);
        assert_eq!(node.rule.key.as_deref(), Some("keep-a"));
        assert_eq!(node.children[0].rule.key.as_deref(), Some("keep-a1"));
        assert!(tree.find_rule_by_key("keep-a").is_none());

        let back = tree.graft(root, node);
        assert_eq!(tree.key(back), "keep-a");
        assert_eq!(tree.find_rule_by_key("keep-a1").map(|id| tree.parent(id)), Some(Some(back)));
    }

    #[test]
    fn keys_are_generated_and_unique() {
        let mut tree = RuleTree::<TestSymbol>::new();
        let root = tree.root();
        let a = tree.append_child(root, Rule::group().key("dup"));
        let b = tree.append_child(root, Rule::group().key("dup"));
        let c = tree.append_child(root, Rule::group());
        assert_eq!(tree.key(a), "dup");
        assert_ne!(tree.key(b), "dup", "duplicate key must be regenerated");
        assert!(!tree.key(c).is_empty());
        assert_ne!(tree.key(b), tree.key(c));
        assert_ne!(tree.key(root), tree.key(c));
    }

    #[test]
    fn set_key_rejects_duplicates() {
        let mut tree = RuleTree::<TestSymbol>::new();
        let root = tree.root();
        let a = tree.append_child(root, Rule::group().key("a"));
        let b = tree.append_child(root, Rule::group().key("b"));
        assert_eq!(
            tree.set_key(b, "a"),
            Err(RuleTreeError::DuplicateKey("a".into()))
        );
        assert_eq!(tree.set_key(a, "a"), Ok(()));
        assert_eq!(tree.set_key(b, "z"), Ok(()));
        assert_eq!(tree.find_rule_by_key("z"), Some(b));
        assert_eq!(tree.find_rule_by_key("b"), None);
    }

    #[test]
    fn find_rule_by_key_from_searches_subtree_only() {
        let mut tree = RuleTree::<TestSymbol>::new();
        let root = tree.root();
        let a = tree.append_child(root, Rule::group().key("a"));
        let b = tree.append_child(root, Rule::group().key("b"));
        let deep = tree.append_child(a, Rule::group().key("deep"));

        assert_eq!(tree.find_rule_by_key_from(root, "deep"), Some(deep));
        assert_eq!(tree.find_rule_by_key_from(a, "deep"), Some(deep));
        assert_eq!(tree.find_rule_by_key_from(b, "deep"), None);
        assert_eq!(tree.find_rule_by_key_from(b, "b"), Some(b));
        assert_eq!(tree.find_rule_by_key("missing"), None);
    }

    #[test]
    fn else_partition_updates_on_refresh() {
        let mut tree = RuleTree::<TestSymbol>::new();
        let root = tree.root();
        let r1 = tree.append_child(root, Rule::group().filter("a = 1"));
        let r2 = tree.append_child(root, Rule::group().else_rule());
        let r3 = tree.append_child(root, Rule::group());
        assert!(tree.needs_refresh());
        tree.refresh();
        assert!(!tree.needs_refresh());

        assert_eq!(tree.normal_children(root).collect::<Vec<_>>(), vec![r1, r3]);
        assert_eq!(tree.else_children(root).collect::<Vec<_>>(), vec![r2]);

        tree.set_else(r1, true);
        tree.set_else(r2, false);
        assert!(tree.needs_refresh());
        tree.update_else_rules();
        assert_eq!(tree.normal_children(root).collect::<Vec<_>>(), vec![r2, r3]);
        assert_eq!(tree.else_children(root).collect::<Vec<_>>(), vec![r1]);

        tree.remove(r1);
        tree.refresh();
        assert_eq!(tree.else_children(root).count(), 0);
    }

    #[test]
    fn z_levels_track_symbol_changes() {
        let mut tree = RuleTree::new();
        let root = tree.root();
        let a = tree.append_child(root, Rule::with_symbol(sym(&[5, 0])));
        tree.refresh();
        assert_eq!(tree.z_levels(), &[0, 5]);

        let b = tree.append_child(a, Rule::with_symbol(sym(&[-2])));
        tree.refresh();
        assert_eq!(tree.z_levels(), &[-2, 0, 5]);

        tree.set_symbol(a, None);
        tree.refresh();
        assert_eq!(tree.z_levels(), &[-2]);

        tree.remove(b);
        tree.refresh();
        assert!(tree.z_levels().is_empty());
        assert!(tree.level_map().is_empty());
    }

    #[test]
    fn collect_z_levels_includes_inactive_rules() {
        let mut tree = RuleTree::new();
        let root = tree.root();
        let a = tree.append_child(root, Rule::with_symbol(sym(&[3])).active(false));
        tree.append_child(a, Rule::with_symbol(sym(&[1, 3])));
        let levels: Vec<_> = tree.collect_z_levels(root).into_iter().collect();
        assert_eq!(levels, vec![1, 3]);
    }

    #[test]
    fn clone_is_deep_and_keeps_keys() {
        let mut tree = RuleTree::new();
        let root = tree.root();
        let a = tree.append_child(root, Rule::with_symbol(sym(&[0])).filter("a = 1").key("a"));
        tree.append_child(a, Rule::with_symbol(sym(&[1])).else_rule().key("a-else"));

        let copy = tree.clone();
        tree.set_filter(a, "a = 2");

        let ca = copy.find_rule_by_key("a").expect("cloned rule keeps its key");
        assert_eq!(copy.filter(ca), "a = 1");
        let ce = copy.find_rule_by_key("a-else").expect("nested key kept");
        assert!(copy.is_else(ce));
        assert_eq!(copy.parent(ce), Some(ca));
        assert_eq!(copy.len(), tree.len());
    }

    #[test]
    fn with_default_symbol_builds_catch_all() {
        let tree = RuleTree::with_default_symbol(sym(&[0]));
        let root = tree.root();
        assert_eq!(tree.child_count(root), 1);
        let rule = tree.child_at(root, 0).expect("default rule");
        assert!(tree.symbol(rule).is_some());
        assert!(!tree.has_filter(rule));
        assert!(!tree.scale(rule).depends_on_scale());
    }

    #[test]
    fn filter_check_compiles_on_demand() {
        use crate::testing::{TestEngine, TestFeature};

        let mut tree = RuleTree::<TestSymbol>::new();
        let root = tree.root();
        let r = tree.append_child(root, Rule::group().filter("a = 1"));
        let bad = tree.append_child(root, Rule::group().filter("a = = 1"));
        let els = tree.append_child(root, Rule::group().filter("a = 9").else_rule());
        let ctx = RenderContext::scale_independent();
        let engine = TestEngine;

        let one = TestFeature::new(&[("a", 1)]);
        let two = TestFeature::new(&[("a", 2)]);
        assert!(tree.is_filter_ok(r, &one, &ctx, &engine));
        assert!(!tree.is_filter_ok(r, &two, &ctx, &engine));
        assert!(!tree.is_filter_ok(bad, &one, &ctx, &engine));
        assert!(tree.is_filter_ok(els, &two, &ctx, &engine), "ELSE rules skip the filter");
        assert!(tree.is_filter_ok(root, &two, &ctx, &engine));
    }

    #[test]
    fn symbols_lists_every_symbol() {
        let mut tree = RuleTree::new();
        let root = tree.root();
        let a = tree.append_child(root, Rule::with_symbol(TestSymbol::new("a", &[0])));
        tree.append_child(a, Rule::with_symbol(TestSymbol::new("a1", &[0])).active(false));
        tree.append_child(root, Rule::with_symbol(TestSymbol::new("b", &[0])));
        let names: Vec<_> = tree.symbols().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["a", "a1", "b"]);
    }

    #[test]
    fn dump_indents_children() {
        let mut tree = RuleTree::new();
        let root = tree.root();
        let a = tree.append_child(root, Rule::with_symbol(sym(&[0])).label("A").filter("a = 1"));
        tree.append_child(a, Rule::group().label("B").else_rule());
        let text = tree.dump(root);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("  RULE A - scale [0,0] - filter a = 1"), "got: {text}");
        assert!(lines[2].starts_with("    RULE B"), "got: {text}");
        assert!(lines[2].contains("filter ELSE"), "got: {text}");
    }
}
