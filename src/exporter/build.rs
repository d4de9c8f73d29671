// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! OTLP exporter construction.
//!
//! Each signal gets an exporter over gRPC or HTTP/protobuf. HTTP/JSON is rejected
//! outright. With offline caching enabled, HTTP exporters send through a
//! [`PersistentHttpClient`]; when its spool cannot be opened, or the transport is
//! gRPC, the plain exporter is used and a warning logged.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Request, Response};
use opentelemetry_http::{HttpClient, HttpError};
use opentelemetry_otlp::tonic_types::metadata::MetadataMap;
use opentelemetry_otlp::tonic_types::transport::ClientTlsConfig;
use opentelemetry_otlp::{
    LogExporter, MetricExporter, Protocol, SpanExporter, WithExportConfig, WithHttpConfig,
    WithTonicConfig,
};

use crate::config::{ExporterConfig, OtlpProtocol, Signal};
use crate::error::{ConfigError, HoneycombError};

use super::persistence::{
    default_spool_dir, spool_dir_in, BlockingHttpClient, PersistentHttpClient, Spool,
    DEFAULT_MAX_SPOOLED,
};

/// Where (and whether) undeliverable HTTP payloads are spooled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OfflineCaching {
    #[default]
    Disabled,
    /// Spool under the platform cache directory.
    Enabled,
    /// Spool under `<dir>/<signal>-cache`.
    EnabledIn(PathBuf),
}

impl OfflineCaching {
    pub fn from_flag(enabled: bool) -> Self {
        if enabled {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }

    fn spool_dir(&self, signal: Signal) -> Option<PathBuf> {
        match self {
            Self::Disabled => None,
            Self::Enabled => default_spool_dir(signal),
            Self::EnabledIn(dir) => Some(spool_dir_in(dir, signal)),
        }
    }

    fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

/// The HTTP transport handed to OTLP/HTTP exporters.
#[derive(Debug)]
pub enum ExportClient {
    Direct(BlockingHttpClient),
    Persistent(PersistentHttpClient<BlockingHttpClient>),
}

#[async_trait]
impl HttpClient for ExportClient {
    async fn send_bytes(&self, request: Request<Bytes>) -> Result<Response<Bytes>, HttpError> {
        match self {
            Self::Direct(client) => client.send_bytes(request).await,
            Self::Persistent(client) => client.send_bytes(request).await,
        }
    }
}

fn build_error(signal: Signal, reason: impl ToString) -> HoneycombError {
    HoneycombError::ExporterBuild {
        signal: signal.to_string(),
        reason: reason.to_string(),
    }
}

/// Build the HTTP transport for one signal, decorating it when caching is on.
pub fn export_client(
    config: &ExporterConfig,
    caching: &OfflineCaching,
) -> Result<ExportClient, HoneycombError> {
    let direct = BlockingHttpClient::new(config.timeout).map_err(|e| build_error(config.signal, e))?;

    let Some(dir) = caching.spool_dir(config.signal) else {
        if caching.is_enabled() {
            tracing::warn!(signal = %config.signal, "No cache directory available; offline caching disabled");
        }
        return Ok(ExportClient::Direct(direct));
    };

    match Spool::open(&dir, DEFAULT_MAX_SPOOLED) {
        Ok(spool) => {
            tracing::debug!(signal = %config.signal, dir = %dir.display(), "Offline caching enabled");
            Ok(ExportClient::Persistent(PersistentHttpClient::new(direct, spool)))
        }
        Err(e) => {
            tracing::warn!(
                signal = %config.signal,
                dir = %dir.display(),
                error = %e,
                "Offline cache unavailable; exporting without it"
            );
            Ok(ExportClient::Direct(direct))
        }
    }
}

fn header_map(config: &ExporterConfig) -> Result<HeaderMap, HoneycombError> {
    let mut map = HeaderMap::with_capacity(config.headers.len());
    for (name, value) in &config.headers {
        let invalid = |message: String| {
            HoneycombError::Config(ConfigError::InvalidHeader {
                name: name.clone(),
                message,
            })
        };
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
        let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

fn ensure_runtime(signal: Signal) -> Result<(), HoneycombError> {
    tokio::runtime::Handle::try_current()
        .map(|_| ())
        .map_err(|_| HoneycombError::RuntimeRequired(signal.to_string()))
}

fn ensure_signal(config: &ExporterConfig, expected: Signal) -> Result<(), HoneycombError> {
    if config.signal == expected {
        Ok(())
    } else {
        Err(build_error(
            expected,
            format!("given {} exporter settings", config.signal),
        ))
    }
}

/// Expands to the gRPC / HTTP builder chains shared by every signal.
macro_rules! build_otlp_exporter {
    ($exporter:ty, $config:expr, $caching:expr) => {{
        let config: &ExporterConfig = $config;
        match config.protocol {
            OtlpProtocol::HttpJson => Err(HoneycombError::Config(
                ConfigError::UnsupportedProtocol(format!(
                    "{} for {} (use grpc or http/protobuf)",
                    config.protocol, config.signal
                )),
            )),
            OtlpProtocol::Grpc => {
                if $caching.is_enabled() {
                    tracing::warn!(
                        signal = %config.signal,
                        "Offline caching is not supported over gRPC; exporting without it"
                    );
                }
                ensure_runtime(config.signal)?;
                let builder = <$exporter>::builder()
                    .with_tonic()
                    .with_endpoint(config.endpoint.clone())
                    .with_timeout(config.timeout)
                    .with_metadata(MetadataMap::from_headers(header_map(config)?));
                let builder = if config.endpoint.starts_with("https://") {
                    builder.with_tls_config(ClientTlsConfig::new().with_native_roots())
                } else {
                    builder
                };
                builder.build().map_err(|e| build_error(config.signal, e))
            }
            OtlpProtocol::HttpProtobuf => {
                let headers: HashMap<String, String> = config
                    .headers
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                <$exporter>::builder()
                    .with_http()
                    .with_http_client(export_client(config, $caching)?)
                    .with_endpoint(config.endpoint.clone())
                    .with_timeout(config.timeout)
                    .with_protocol(Protocol::HttpBinary)
                    .with_headers(headers)
                    .build()
                    .map_err(|e| build_error(config.signal, e))
            }
        }
    }};
}

/// Build the trace exporter.
pub fn build_span_exporter(
    config: &ExporterConfig,
    caching: &OfflineCaching,
) -> Result<SpanExporter, HoneycombError> {
    ensure_signal(config, Signal::Traces)?;
    build_otlp_exporter!(SpanExporter, config, caching)
}

/// Build the metric exporter.
pub fn build_metric_exporter(
    config: &ExporterConfig,
    caching: &OfflineCaching,
) -> Result<MetricExporter, HoneycombError> {
    ensure_signal(config, Signal::Metrics)?;
    build_otlp_exporter!(MetricExporter, config, caching)
}

/// Build the log exporter.
pub fn build_log_exporter(
    config: &ExporterConfig,
    caching: &OfflineCaching,
) -> Result<LogExporter, HoneycombError> {
    ensure_signal(config, Signal::Logs)?;
    build_otlp_exporter!(LogExporter, config, caching)
}
