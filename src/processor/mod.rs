// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Span enrichment pipeline.
//!
//! Every span created anywhere in the host application passes through a
//! [`CompositeSpanProcessor`], which runs an ordered list of [`SpanEnricher`]s at
//! span start and span end. Enrichers read ambient state (baggage, session,
//! navigation path, device and network status) and write span attributes. They
//! never fail: missing state means the attribute is skipped.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use honeycomb::processor::{BaggageEnricher, CompositeSpanProcessor, SessionIdEnricher};
//!
//! let composite = CompositeSpanProcessor::new()
//!     .with(Arc::new(BaggageEnricher::allow_all()))
//!     .with(Arc::new(SessionIdEnricher::new(session_manager.clone())));
//!
//! let provider = SdkTracerProvider::builder()
//!     .with_span_processor(composite)
//!     .build();
//! ```

mod baggage;
mod composite;
mod device;
mod navigation;
mod network;
mod session_id;

use std::fmt::Debug;
use std::time::Duration;

use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::error::OTelSdkResult;
use opentelemetry_sdk::trace::SpanData;

pub use baggage::{BaggageEnricher, BaggageEntry, BaggageFilter};
pub use composite::CompositeSpanProcessor;
pub use device::{DeviceInfo, DeviceInfoEnricher};
pub use navigation::{
    encode_navigation_path, NavigationPathEnricher, NavigationState, CURRENT_NAVIGATION_PATH_KEY,
    UNENCODABLE_PATH,
};
pub use network::{
    ConnectionType, NetworkMonitor, NetworkStatus, NetworkStatusEnricher, SharedNetworkMonitor,
};
pub use session_id::{SessionIdEnricher, SessionIdLogProcessor};

/// Something a span attribute can be written to.
///
/// Implemented for SDK spans, and for plain attribute lists so enrichers can be
/// exercised without a tracer provider.
pub trait AttributeSink {
    fn set_attribute(&mut self, attribute: KeyValue);
}

impl AttributeSink for opentelemetry_sdk::trace::Span {
    fn set_attribute(&mut self, attribute: KeyValue) {
        opentelemetry::trace::Span::set_attribute(self, attribute);
    }
}

impl AttributeSink for Vec<KeyValue> {
    fn set_attribute(&mut self, attribute: KeyValue) {
        self.push(attribute);
    }
}

/// A unit of cross-cutting span logic, run by [`CompositeSpanProcessor`].
///
/// The two capability flags let the composite skip enrichers that have nothing
/// to do at a given hook.
pub trait SpanEnricher: Send + Sync + Debug {
    /// Whether [`on_start`](Self::on_start) does anything.
    fn is_start_required(&self) -> bool;

    /// Whether [`on_end`](Self::on_end) does anything.
    fn is_end_required(&self) -> bool;

    /// Called when a span starts, with the context it was started in.
    fn on_start(&self, span: &mut dyn AttributeSink, cx: &Context);

    /// Called when a span ends.
    fn on_end(&self, _span: &SpanData) {}

    fn force_flush(&self, _timeout: Option<Duration>) -> OTelSdkResult {
        Ok(())
    }

    fn shutdown(&self, _timeout: Option<Duration>) -> OTelSdkResult {
        Ok(())
    }
}
