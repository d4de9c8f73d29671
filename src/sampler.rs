// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Trace-id based deterministic sampling.
//!
//! A sample rate of N keeps roughly one trace in N. The decision depends only on
//! the trace id, so every service sampling at the same rate keeps the same traces.
//! Kept spans carry a `SampleRate` attribute so the backend can re-weight counts.

use opentelemetry::trace::{
    Link, SamplingDecision, SamplingResult, SpanKind, TraceContextExt, TraceId,
};
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::trace::{Sampler, ShouldSample};

/// Attribute recording the sample rate on kept spans.
pub const SAMPLE_RATE_KEY: &str = "SampleRate";

/// Deterministic "one in N" sampler.
#[derive(Debug, Clone)]
pub struct DeterministicSampler {
    sample_rate: i64,
    inner: Option<Sampler>,
}

impl DeterministicSampler {
    /// Create a sampler keeping one trace in `sample_rate`.
    ///
    /// Rates below 1 drop everything.
    pub fn new(sample_rate: i64) -> Self {
        let inner = match sample_rate {
            rate if rate < 1 => None,
            1 => Some(Sampler::AlwaysOn),
            rate => Some(Sampler::TraceIdRatioBased(1.0 / rate as f64)),
        };
        Self { sample_rate, inner }
    }

    pub fn sample_rate(&self) -> i64 {
        self.sample_rate
    }
}

impl ShouldSample for DeterministicSampler {
    fn should_sample(
        &self,
        parent_context: Option<&Context>,
        trace_id: TraceId,
        name: &str,
        span_kind: &SpanKind,
        attributes: &[KeyValue],
        links: &[Link],
    ) -> SamplingResult {
        let trace_state = parent_context
            .map(|cx| cx.span().span_context().trace_state().clone())
            .unwrap_or_default();

        let Some(inner) = &self.inner else {
            return SamplingResult {
                decision: SamplingDecision::Drop,
                attributes: Vec::new(),
                trace_state,
            };
        };

        let mut result =
            inner.should_sample(parent_context, trace_id, name, span_kind, attributes, links);
        if result.decision == SamplingDecision::RecordAndSample {
            result
                .attributes
                .push(KeyValue::new(SAMPLE_RATE_KEY, self.sample_rate));
        }
        result
    }
}
