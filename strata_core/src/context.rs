// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-pass render context and per-feature flags.

/// State shared by every evaluation in one render pass.
///
/// The context is captured when a pass starts; rules are gated against the
/// scale it carries for the whole pass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RenderContext {
    /// Map scale denominator of the pass. `0.0` requests scale-independent
    /// evaluation, which disables every rule's scale gate.
    pub scale_denominator: f64,
}

impl RenderContext {
    /// Creates a context for rendering at the given scale denominator.
    #[must_use]
    pub const fn at_scale(scale_denominator: f64) -> Self {
        Self { scale_denominator }
    }

    /// Creates a context that ignores scale ranges.
    #[must_use]
    pub const fn scale_independent() -> Self {
        Self {
            scale_denominator: 0.0,
        }
    }
}

/// Rendering flags attached to a feature for the duration of one pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FeatureFlags {
    /// The feature is part of the current selection.
    pub selected: bool,
    /// Vertex markers should be drawn on top of the feature's geometry.
    pub draw_vertex_marker: bool,
}

impl FeatureFlags {
    /// Flags for a selected feature.
    pub const SELECTED: Self = Self {
        selected: true,
        draw_vertex_marker: false,
    };
}
