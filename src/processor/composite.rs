// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Ordered fan-out of span hooks to registered enrichers.

use std::sync::Arc;
use std::time::Duration;

use opentelemetry::Context;
use opentelemetry_sdk::error::{OTelSdkError, OTelSdkResult};
use opentelemetry_sdk::trace::{Span, SpanData, SpanProcessor};

use super::SpanEnricher;

/// Runs every registered enricher, in registration order, for each span.
///
/// Later enrichers may overwrite attributes written by earlier ones; the last
/// write for a key wins.
#[derive(Debug, Default, Clone)]
pub struct CompositeSpanProcessor {
    enrichers: Vec<Arc<dyn SpanEnricher>>,
    start_required: bool,
    end_required: bool,
}

impl CompositeSpanProcessor {
    /// Create an empty composite.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an enricher.
    pub fn add(&mut self, enricher: Arc<dyn SpanEnricher>) {
        self.start_required |= enricher.is_start_required();
        self.end_required |= enricher.is_end_required();
        self.enrichers.push(enricher);
    }

    /// Builder form of [`add`](Self::add).
    pub fn with(mut self, enricher: Arc<dyn SpanEnricher>) -> Self {
        self.add(enricher);
        self
    }

    pub fn len(&self) -> usize {
        self.enrichers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enrichers.is_empty()
    }

    /// Whether any registered enricher needs the start hook.
    pub fn is_start_required(&self) -> bool {
        self.start_required
    }

    /// Whether any registered enricher needs the end hook.
    pub fn is_end_required(&self) -> bool {
        self.end_required
    }

    fn broadcast<F>(&self, operation: &str, f: F) -> OTelSdkResult
    where
        F: Fn(&dyn SpanEnricher) -> OTelSdkResult,
    {
        let failures: Vec<String> = self
            .enrichers
            .iter()
            .filter_map(|enricher| match f(enricher.as_ref()) {
                Ok(()) => None,
                Err(e) => {
                    tracing::debug!(enricher = ?enricher, error = %e, "Span enricher {} failed", operation);
                    Some(e.to_string())
                }
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(OTelSdkError::InternalFailure(format!(
                "{} failed for {} enricher(s): {}",
                operation,
                failures.len(),
                failures.join("; ")
            )))
        }
    }
}

impl SpanProcessor for CompositeSpanProcessor {
    fn on_start(&self, span: &mut Span, cx: &Context) {
        if !self.start_required {
            return;
        }
        for enricher in self.enrichers.iter().filter(|e| e.is_start_required()) {
            enricher.on_start(&mut *span, cx);
        }
    }

    fn on_end(&self, span: SpanData) {
        if !self.end_required {
            return;
        }
        for enricher in self.enrichers.iter().filter(|e| e.is_end_required()) {
            enricher.on_end(&span);
        }
    }

    fn force_flush(&self) -> OTelSdkResult {
        self.broadcast("force_flush", |e| e.force_flush(None))
    }

    fn shutdown_with_timeout(&self, timeout: Duration) -> OTelSdkResult {
        self.broadcast("shutdown", |e| e.shutdown(Some(timeout)))
    }
}
