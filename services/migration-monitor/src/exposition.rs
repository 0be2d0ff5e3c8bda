// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Prometheus text exposition parsing
//!
//! Extracts the metrics the monitor cares about from a pipeline's
//! `/metrics/prometheus` payload. Each [`MetricKind`] is looked up by family
//! name suffix; the first matching family wins and its first numeric sample
//! is taken.

use strum::IntoEnumIterator;

use migration_monitor_types::{MetricKind, MetricSample};

/// Counter samples carry this suffix; their family name does not.
const COUNTER_SUFFIX: &str = "_total";

/// One sample line of an exposition payload.
#[derive(Debug, Clone, PartialEq)]
struct SampleLine<'a> {
    name: &'a str,
    value: &'a str,
}

impl SampleLine<'_> {
    /// Name of the metric family this sample belongs to.
    fn family_name(&self) -> &str {
        self.name
            .strip_suffix(COUNTER_SUFFIX)
            .unwrap_or(self.name)
    }

    /// The sample value as a count, if it is one.
    fn count(&self) -> Option<u64> {
        let value: f64 = self.value.parse().ok()?;
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        // Counters are exported as floats; truncate toward zero.
        Some(value.trunc() as u64)
    }
}

/// Parse an exposition payload into a [`MetricSample`].
///
/// Metrics that are absent, or whose matching family has no numeric sample,
/// are left as `None`.
pub fn parse_exposition(payload: &str) -> MetricSample {
    let samples: Vec<SampleLine<'_>> = payload.lines().filter_map(parse_sample_line).collect();

    let mut result = MetricSample::default();
    for kind in MetricKind::iter() {
        if let Some(count) = first_count(&samples, kind) {
            result.set(kind, count);
        }
    }
    result
}

/// First numeric sample of the first family matching `kind`.
fn first_count(samples: &[SampleLine<'_>], kind: MetricKind) -> Option<u64> {
    let family = samples
        .iter()
        .map(SampleLine::family_name)
        .find(|name| kind.matches(name))?;

    samples
        .iter()
        .filter(|sample| sample.family_name() == family)
        .find_map(SampleLine::count)
}

/// Split a sample line into name and value. Comments, blank lines and
/// malformed lines yield `None`.
fn parse_sample_line(line: &str) -> Option<SampleLine<'_>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let name_end = line
        .find(|c: char| c == '{' || c.is_whitespace())
        .unwrap_or(line.len());
    let name = &line[..name_end];
    if name.is_empty() {
        return None;
    }

    let mut rest = &line[name_end..];
    if rest.starts_with('{') {
        let close = label_set_end(rest)?;
        rest = &rest[close + 1..];
    }

    // Anything after the value is an optional timestamp.
    let value = rest.split_whitespace().next()?;
    Some(SampleLine { name, value })
}

/// Byte offset of the `}` closing a label set that starts at offset 0.
///
/// Label values are quoted and may contain braces, whitespace and escaped
/// quotes.
fn label_set_end(labels: &str) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in labels.char_indices().skip(1) {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '}' if !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}
