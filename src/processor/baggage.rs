// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Copies ambient baggage entries onto spans.

use std::fmt;
use std::sync::Arc;

use opentelemetry::baggage::BaggageExt;
use opentelemetry::{Context, KeyValue};

use super::{AttributeSink, SpanEnricher};

/// A baggage entry as seen by the filter predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaggageEntry<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

/// Decides which baggage entries become span attributes.
pub type BaggageFilter = Arc<dyn Fn(&BaggageEntry<'_>) -> bool + Send + Sync>;

/// Sets one span attribute per baggage entry that passes the filter.
#[derive(Clone)]
pub struct BaggageEnricher {
    filter: BaggageFilter,
}

impl BaggageEnricher {
    pub fn new(filter: BaggageFilter) -> Self {
        Self { filter }
    }

    /// Copy every entry.
    pub fn allow_all() -> Self {
        Self::new(Arc::new(|_| true))
    }
}

impl Default for BaggageEnricher {
    fn default() -> Self {
        Self::allow_all()
    }
}

impl fmt::Debug for BaggageEnricher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaggageEnricher").finish_non_exhaustive()
    }
}

impl SpanEnricher for BaggageEnricher {
    fn is_start_required(&self) -> bool {
        true
    }

    fn is_end_required(&self) -> bool {
        false
    }

    fn on_start(&self, span: &mut dyn AttributeSink, cx: &Context) {
        for (key, (value, _metadata)) in cx.baggage().iter() {
            let value = value.as_str();
            let entry = BaggageEntry {
                key: key.as_str(),
                value: &value,
            };
            if (self.filter)(&entry) {
                span.set_attribute(KeyValue::new(key.clone(), value.to_string()));
            }
        }
    }
}
