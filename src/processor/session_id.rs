// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Session id stamping for spans and log records.

use std::sync::Arc;
use std::time::Duration;

use opentelemetry::logs::LogRecord as _;
use opentelemetry::{Context, InstrumentationScope, KeyValue};
use opentelemetry_sdk::error::OTelSdkResult;
use opentelemetry_sdk::logs::{LogProcessor, SdkLogRecord};

use crate::session::{SessionManager, SESSION_ID_KEY};

use super::{AttributeSink, SpanEnricher};

/// Sets `session.id` on every span.
///
/// Reading the id goes through the manager, so a span started after the session
/// lifetime elapses is the one that triggers rotation.
#[derive(Debug, Clone)]
pub struct SessionIdEnricher {
    manager: Arc<SessionManager>,
}

impl SessionIdEnricher {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }
}

impl SpanEnricher for SessionIdEnricher {
    fn is_start_required(&self) -> bool {
        true
    }

    fn is_end_required(&self) -> bool {
        false
    }

    fn on_start(&self, span: &mut dyn AttributeSink, _cx: &Context) {
        span.set_attribute(KeyValue::new(
            SESSION_ID_KEY,
            self.manager.get_or_rotate_session_id(),
        ));
    }
}

/// Sets `session.id` on every log record.
#[derive(Debug, Clone)]
pub struct SessionIdLogProcessor {
    manager: Arc<SessionManager>,
}

impl SessionIdLogProcessor {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }
}

impl LogProcessor for SessionIdLogProcessor {
    fn emit(&self, record: &mut SdkLogRecord, _scope: &InstrumentationScope) {
        record.add_attribute(SESSION_ID_KEY, self.manager.get_or_rotate_session_id());
    }

    fn force_flush(&self) -> OTelSdkResult {
        Ok(())
    }

    fn shutdown_with_timeout(&self, _timeout: Duration) -> OTelSdkResult {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::test_support::values_for;
    use crate::processor::CompositeSpanProcessor;
    use crate::session::{InMemorySessionStorage, SessionManagerConfig};
    use opentelemetry::logs::{Logger, LoggerProvider};
    use opentelemetry::trace::{Tracer, TracerProvider};
    use opentelemetry_sdk::logs::{InMemoryLogExporter, SdkLoggerProvider};
    use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider};

    fn manager() -> Arc<SessionManager> {
        Arc::new(SessionManager::new(
            Arc::new(InMemorySessionStorage::new()),
            SessionManagerConfig::default(),
        ))
    }

    #[test]
    fn test_span_gets_current_session_id() {
        let manager = manager();
        let enricher = SessionIdEnricher::new(manager.clone());
        let mut attributes: Vec<KeyValue> = Vec::new();

        enricher.on_start(&mut attributes, &Context::new());

        let expected = manager.get_or_rotate_session_id();
        assert_eq!(values_for(&attributes, SESSION_ID_KEY), vec![expected]);
    }

    #[test]
    fn test_spans_in_one_session_share_an_id() {
        let manager = manager();
        let exporter = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_span_processor(
                CompositeSpanProcessor::new()
                    .with(Arc::new(SessionIdEnricher::new(manager.clone()))),
            )
            .with_simple_exporter(exporter.clone())
            .build();
        let tracer = provider.tracer("test");

        tracer.in_span("first", |_cx| {});
        tracer.in_span("second", |_cx| {});

        let spans = exporter.get_finished_spans().unwrap();
        let ids: Vec<_> = spans
            .iter()
            .flat_map(|span| values_for(&span.attributes, SESSION_ID_KEY))
            .collect();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], ids[1]);
        assert_eq!(ids[0], manager.get_or_rotate_session_id());
    }

    #[test]
    fn test_log_record_gets_session_id() {
        let manager = manager();
        let exporter = InMemoryLogExporter::default();
        let provider = SdkLoggerProvider::builder()
            .with_log_processor(SessionIdLogProcessor::new(manager.clone()))
            .with_simple_exporter(exporter.clone())
            .build();

        let logger = provider.logger("test");
        let mut record = logger.create_log_record();
        record.set_body("hello".into());
        logger.emit(record);

        let logs = exporter.get_emitted_logs().unwrap();
        assert_eq!(logs.len(), 1);
        let id = manager.get_or_rotate_session_id();
        let found = logs[0]
            .record
            .attributes_iter()
            .any(|(key, value)| {
                key.as_str() == SESSION_ID_KEY
                    && *value == opentelemetry::logs::AnyValue::from(id.clone())
            });
        assert!(found);
    }
}
