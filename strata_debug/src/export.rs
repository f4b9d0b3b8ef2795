// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON export of recorded events.
//!
//! [`export`] writes the events captured by a
//! [`RecorderSink`](super::recorder::RecorderSink) as one JSON array, one
//! object per event, each tagged with an `"event"` name.

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::RecordedEvent;

/// Converts one recorded event to a JSON object.
#[must_use]
pub fn to_value(event: &RecordedEvent) -> Value {
    match event {
        RecordedEvent::PassBegin(e) => json!({
            "event": "PassBegin",
            "pass": e.pass_index,
            "scale": e.scale_denominator,
            "levels": e.level_count,
            "active_rules": e.active_rules,
        }),
        RecordedEvent::FilterError {
            rule,
            key,
            source,
            message,
        } => json!({
            "event": "FilterError",
            "rule": rule.index(),
            "key": key,
            "filter": source,
            "message": message,
        }),
        RecordedEvent::Feature(e) => json!({
            "event": "Feature",
            "pass": e.pass_index,
            "feature": e.feature_index,
            "result": format!("{:?}", e.result),
            "jobs": e.jobs,
        }),
        RecordedEvent::LevelFlush(e) => json!({
            "event": "LevelFlush",
            "pass": e.pass_index,
            "level": e.level,
            "z": e.z_index,
            "jobs": e.jobs,
        }),
        RecordedEvent::PassEnd(s) => json!({
            "event": "PassEnd",
            "pass": s.pass_index,
            "features": s.features,
            "rendered": s.rendered,
            "dropped": s.dropped,
            "jobs": s.jobs,
            "levels": s.levels,
        }),
        RecordedEvent::Draw(e) => json!({
            "event": "Draw",
            "pass": e.pass_index,
            "level": e.level,
            "feature": e.feature,
            "rule": e.rule.index(),
            "layer": e.layer,
        }),
    }
}

/// Writes `events` as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns any I/O error raised by `writer`.
pub fn export(events: &[RecordedEvent], writer: &mut dyn Write) -> io::Result<()> {
    let values: Vec<Value> = events.iter().map(to_value).collect();
    serde_json::to_writer_pretty(&mut *writer, &values)?;
    writeln!(writer)
}
