// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! SDK composition root.
//!
//! [`Honeycomb::configure`] turns resolved options into running tracer, meter and
//! logger providers and registers them as the process-wide OpenTelemetry globals.
//!
//! ```text
//!   HoneycombOptions
//!         │
//!         ▼
//!   build exporters ──(any error)──▶ HoneycombError, nothing registered
//!         │
//!         ▼
//!   SessionManager ─┬─▶ CompositeSpanProcessor ─▶ SdkTracerProvider
//!                   └─▶ SessionIdLogProcessor  ─▶ SdkLoggerProvider
//!                                                 SdkMeterProvider
//!         │
//!         ▼
//!   register globals (once) + propagators + panic hook
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, SystemTime};

use opentelemetry::logs::{AnyValue, LogRecord as _, Logger as _, LoggerProvider as _, Severity};
use opentelemetry::propagation::{TextMapCompositePropagator, TextMapPropagator};
use opentelemetry::trace::{Span as _, Tracer as _, TracerProvider as _};
use opentelemetry::{global, Key, KeyValue};
use opentelemetry_sdk::logs::{LogExporter, SdkLoggerProvider};
use opentelemetry_sdk::metrics::exporter::PushMetricExporter;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::propagation::{BaggagePropagator, TraceContextPropagator};
use opentelemetry_sdk::trace::{SdkTracerProvider, SpanExporter};
use opentelemetry_sdk::Resource;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::HoneycombOptions;
use crate::error::HoneycombError;
use crate::exporter::{
    build_log_exporter, build_metric_exporter, build_span_exporter, OfflineCaching,
};
use crate::processor::{
    encode_navigation_path, BaggageEnricher, CompositeSpanProcessor, DeviceInfoEnricher,
    NavigationPathEnricher, NavigationState, NetworkStatusEnricher, SessionIdEnricher,
    SessionIdLogProcessor, SharedNetworkMonitor, SpanEnricher,
};
use crate::sampler::DeterministicSampler;
use crate::session::{
    FileSessionStorage, InMemorySessionStorage, SessionId, SessionManager, SessionManagerConfig,
    SessionObserver, SessionStorage,
};

/// Instrumentation scope for error and panic log records.
pub const ERROR_LOGGER_NAME: &str = "io.honeycomb.error";

/// Instrumentation scope for navigation spans.
pub const NAVIGATION_TRACER_NAME: &str = "io.honeycomb.navigation";

/// Name of the span emitted for each navigation.
pub const NAVIGATION_SPAN_NAME: &str = "Navigation";

/// Attribute carrying the reported path on navigation spans.
pub const NAVIGATION_PATH_KEY: &str = "NavigationPath";

static CONFIGURED: AtomicBool = AtomicBool::new(false);

/// The exporters one SDK instance ships through.
#[derive(Debug)]
pub struct Exporters<S, M, L> {
    pub spans: S,
    pub metrics: M,
    pub logs: L,
}

/// A configured SDK instance.
///
/// Cheap to clone; every clone shares the same providers and session.
#[derive(Debug, Clone)]
pub struct Honeycomb {
    options: Arc<HoneycombOptions>,
    session_manager: Arc<SessionManager>,
    navigation: NavigationState,
    network: SharedNetworkMonitor,
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
    logger_provider: SdkLoggerProvider,
}

impl Honeycomb {
    /// Configure the SDK and register it as the process-wide OpenTelemetry globals.
    ///
    /// Every exporter is built before anything global is touched, so a
    /// configuration error leaves the process untouched. Only one call per
    /// process can succeed; later ones fail with
    /// [`AlreadyConfigured`](HoneycombError::AlreadyConfigured).
    pub fn configure(options: HoneycombOptions) -> Result<Self, HoneycombError> {
        Self::configure_with(options, Vec::new())
    }

    /// Like [`configure`](Self::configure), appending `span_enrichers` after the
    /// built-in enrichers.
    pub fn configure_with(
        options: HoneycombOptions,
        span_enrichers: Vec<Arc<dyn SpanEnricher>>,
    ) -> Result<Self, HoneycombError> {
        let caching = OfflineCaching::from_flag(options.offline_caching_enabled);
        let exporters = Exporters {
            spans: build_span_exporter(&options.traces, &caching)?,
            metrics: build_metric_exporter(&options.metrics, &caching)?,
            logs: build_log_exporter(&options.logs, &caching)?,
        };

        let honeycomb = Self::assemble_with(
            options,
            default_session_storage(),
            exporters,
            span_enrichers,
        );
        honeycomb.register_global()?;
        Ok(honeycomb)
    }

    /// Wire providers around caller-supplied exporters without touching globals.
    pub fn assemble<S, M, L>(
        options: HoneycombOptions,
        storage: Arc<dyn SessionStorage>,
        exporters: Exporters<S, M, L>,
    ) -> Self
    where
        S: SpanExporter + 'static,
        M: PushMetricExporter,
        L: LogExporter + 'static,
    {
        Self::assemble_with(options, storage, exporters, Vec::new())
    }

    /// Like [`assemble`](Self::assemble), with caller enrichers run after the
    /// built-in ones. A caller enricher writing a built-in key writes it last.
    pub fn assemble_with<S, M, L>(
        options: HoneycombOptions,
        storage: Arc<dyn SessionStorage>,
        exporters: Exporters<S, M, L>,
        span_enrichers: Vec<Arc<dyn SpanEnricher>>,
    ) -> Self
    where
        S: SpanExporter + 'static,
        M: PushMetricExporter,
        L: LogExporter + 'static,
    {
        let session_manager = Arc::new(SessionManager::new(
            storage,
            SessionManagerConfig {
                session_lifetime: options.session_timeout,
                debug: options.debug,
            },
        ));
        let navigation = NavigationState::new();
        let network = SharedNetworkMonitor::default();

        let mut enrichers = CompositeSpanProcessor::new()
            .with(Arc::new(BaggageEnricher::allow_all()))
            .with(Arc::new(SessionIdEnricher::new(session_manager.clone())))
            .with(Arc::new(NavigationPathEnricher::new(navigation.clone())))
            .with(Arc::new(NetworkStatusEnricher::new(Arc::new(network.clone()))))
            .with(Arc::new(DeviceInfoEnricher::default()));
        for enricher in span_enrichers {
            enrichers.add(enricher);
        }

        let resource = build_resource(&options);

        let tracer_provider = SdkTracerProvider::builder()
            .with_resource(resource.clone())
            .with_sampler(DeterministicSampler::new(options.sample_rate))
            .with_span_processor(enrichers)
            .with_batch_exporter(exporters.spans)
            .build();

        let meter_provider = SdkMeterProvider::builder()
            .with_resource(resource.clone())
            .with_reader(PeriodicReader::builder(exporters.metrics).build())
            .build();

        let logger_provider = SdkLoggerProvider::builder()
            .with_resource(resource)
            .with_log_processor(SessionIdLogProcessor::new(session_manager.clone()))
            .with_batch_exporter(exporters.logs)
            .build();

        Self {
            options: Arc::new(options),
            session_manager,
            navigation,
            network,
            tracer_provider,
            meter_provider,
            logger_provider,
        }
    }

    /// Install this instance as the global tracer and meter provider.
    ///
    /// Also installs the configured propagators and, when enabled, the panic hook.
    pub fn register_global(&self) -> Result<(), HoneycombError> {
        if CONFIGURED
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(HoneycombError::AlreadyConfigured);
        }

        global::set_tracer_provider(self.tracer_provider.clone());
        global::set_meter_provider(self.meter_provider.clone());
        global::set_text_map_propagator(build_propagator(&self.options.propagators));

        if self.options.panic_instrumentation_enabled {
            install_panic_hook(self.logger_provider.clone());
        }

        if self.options.debug {
            info!(options = ?self.options, "Honeycomb options");
        }
        info!(
            service.name = %self.options.service_name,
            sample_rate = self.options.sample_rate,
            "Honeycomb configured"
        );
        Ok(())
    }

    pub fn options(&self) -> &HoneycombOptions {
        &self.options
    }

    pub fn session_manager(&self) -> &Arc<SessionManager> {
        &self.session_manager
    }

    /// Current session id, rotating the session first if it has expired.
    pub fn session_id(&self) -> SessionId {
        self.session_manager.get_or_rotate_session_id()
    }

    /// Register an observer for session start/end events.
    pub fn subscribe(&self, observer: Arc<dyn SessionObserver>) {
        self.session_manager.subscribe(observer);
    }

    /// Connectivity cell read by the network enricher; push updates into it.
    pub fn network_monitor(&self) -> &SharedNetworkMonitor {
        &self.network
    }

    pub fn navigation_state(&self) -> &NavigationState {
        &self.navigation
    }

    pub fn tracer_provider(&self) -> &SdkTracerProvider {
        &self.tracer_provider
    }

    pub fn meter_provider(&self) -> &SdkMeterProvider {
        &self.meter_provider
    }

    pub fn logger_provider(&self) -> &SdkLoggerProvider {
        &self.logger_provider
    }

    /// Report a navigation to `path` and emit a `Navigation` span.
    pub fn set_current_screen(&self, path: impl Into<String>) {
        let path = path.into();
        self.navigation.set_current_path(path.clone());

        let tracer = self.tracer_provider.tracer(NAVIGATION_TRACER_NAME);
        let mut span = tracer
            .span_builder(NAVIGATION_SPAN_NAME)
            .with_attributes(vec![KeyValue::new(NAVIGATION_PATH_KEY, path)])
            .start(&tracer);
        span.end();
    }

    /// Report a navigation to a structured path, JSON-encoded.
    pub fn set_current_screen_path<T: Serialize + ?Sized>(&self, path: &T) {
        self.set_current_screen(encode_navigation_path(path));
    }

    /// Emit a FATAL log record describing `error`.
    ///
    /// Caller attributes are applied last and may override the standard ones.
    pub fn log_error<E, I, K, V>(&self, error: &E, attributes: I, thread_name: Option<&str>)
    where
        E: std::error::Error + ?Sized,
        I: IntoIterator<Item = (K, V)>,
        K: Into<Key>,
        V: Into<AnyValue>,
    {
        let mut fields: Vec<(Key, AnyValue)> = vec![
            (
                Key::from_static_str("exception.type"),
                AnyValue::from(error_type_name(error)),
            ),
            (
                Key::from_static_str("exception.message"),
                AnyValue::from(error.to_string()),
            ),
        ];
        if let Some(name) = thread_name {
            fields.push((
                Key::from_static_str("thread.name"),
                AnyValue::from(name.to_string()),
            ));
        }
        fields.extend(attributes.into_iter().map(|(k, v)| (k.into(), v.into())));

        emit_fatal(&self.logger_provider, error.to_string(), fields);
    }

    /// Flush all three providers, waiting at most `timeout`.
    pub fn flush(&self, timeout: Duration) -> Result<(), HoneycombError> {
        let this = self.clone();
        let results = run_bounded(timeout, move || {
            [
                ("traces", this.tracer_provider.force_flush()),
                ("metrics", this.meter_provider.force_flush()),
                ("logs", this.logger_provider.force_flush()),
            ]
        })?;

        for (signal, result) in results {
            if let Err(e) = result {
                warn!(signal, error = %e, "Flush failed");
            }
        }
        Ok(())
    }

    /// Shut down all three providers, waiting at most `timeout`.
    ///
    /// Telemetry recorded afterwards is dropped.
    pub fn shutdown(&self, timeout: Duration) -> Result<(), HoneycombError> {
        let this = self.clone();
        let results = run_bounded(timeout, move || {
            [
                ("traces", this.tracer_provider.shutdown()),
                ("metrics", this.meter_provider.shutdown()),
                ("logs", this.logger_provider.shutdown()),
            ]
        })
        .map_err(|_| HoneycombError::Shutdown(format!("timed out after {:?}", timeout)))?;

        let failures: Vec<String> = results
            .into_iter()
            .filter_map(|(signal, result)| result.err().map(|e| format!("{}: {}", signal, e)))
            .collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(HoneycombError::Shutdown(failures.join("; ")))
        }
    }
}

/// `exception.type` for `error`: its type name, or for trait objects the leading
/// identifier of its `Debug` output (the struct or variant name).
fn error_type_name<E: std::error::Error + ?Sized>(error: &E) -> String {
    let name = std::any::type_name::<E>();
    if !name.starts_with("dyn ") {
        return name.to_string();
    }
    let debug = format!("{:?}", error);
    let ident: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
        .collect();
    if ident.is_empty() {
        name.to_string()
    } else {
        ident
    }
}

fn default_session_storage() -> Arc<dyn SessionStorage> {
    match FileSessionStorage::open_default() {
        Some(storage) => Arc::new(storage),
        None => {
            warn!("No local data directory; sessions will not survive restarts");
            Arc::new(InMemorySessionStorage::new())
        }
    }
}

fn build_resource(options: &HoneycombOptions) -> Resource {
    Resource::builder()
        .with_service_name(options.service_name.clone())
        .with_attributes(
            options
                .resource_attributes
                .iter()
                .map(|(k, v)| KeyValue::new(k.clone(), v.clone())),
        )
        .build()
}

fn build_propagator(names: &[String]) -> TextMapCompositePropagator {
    let mut propagators: Vec<Box<dyn TextMapPropagator + Send + Sync>> = Vec::new();
    for name in names {
        match name.as_str() {
            "tracecontext" => propagators.push(Box::new(TraceContextPropagator::new())),
            "baggage" => propagators.push(Box::new(BaggagePropagator::new())),
            other => warn!(propagator = other, "Unknown propagator; skipping"),
        }
    }
    TextMapCompositePropagator::new(propagators)
}

fn emit_fatal(provider: &SdkLoggerProvider, body: String, fields: Vec<(Key, AnyValue)>) {
    let logger = provider.logger(ERROR_LOGGER_NAME);
    let mut record = logger.create_log_record();
    let now = SystemTime::now();
    record.set_timestamp(now);
    record.set_observed_timestamp(now);
    record.set_severity_number(Severity::Fatal);
    record.set_severity_text("FATAL");
    record.set_body(AnyValue::from(body));
    for (key, value) in fields {
        record.add_attribute(key, value);
    }
    logger.emit(record);
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "Box<dyn Any>"
    }
}

fn install_panic_hook(provider: SdkLoggerProvider) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let message = panic_message(info.payload()).to_string();
        let thread = std::thread::current();

        let mut fields = vec![
            (Key::from_static_str("exception.type"), AnyValue::from("panic")),
            (
                Key::from_static_str("exception.message"),
                AnyValue::from(message.clone()),
            ),
            (
                Key::from_static_str("exception.stacktrace"),
                AnyValue::from(std::backtrace::Backtrace::force_capture().to_string()),
            ),
        ];
        if let Some(name) = thread.name() {
            fields.push((
                Key::from_static_str("thread.name"),
                AnyValue::from(name.to_string()),
            ));
        }
        if let Some(location) = info.location() {
            fields.push((
                Key::from_static_str("code.filepath"),
                AnyValue::from(location.file().to_string()),
            ));
            fields.push((
                Key::from_static_str("code.lineno"),
                AnyValue::from(i64::from(location.line())),
            ));
        }

        emit_fatal(&provider, message, fields);
        if let Err(e) = provider.force_flush() {
            debug!(error = %e, "Flush after panic failed");
        }
        previous(info);
    }));
}

/// Run `work` on a helper thread and wait for it at most `timeout`.
fn run_bounded<T, F>(timeout: Duration, work: F) -> Result<T, HoneycombError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let _ = tx.send(work());
    });
    rx.recv_timeout(timeout)
        .map_err(|_| HoneycombError::FlushTimeout(timeout))
}
