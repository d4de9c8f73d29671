// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration type definitions.
//!
//! [`HoneycombConfig`] is the raw, everything-optional form read from a source
//! or written as a struct literal. [`HoneycombOptions`] is the validated result
//! with every default applied.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default base endpoint for all signals.
pub const DEFAULT_API_ENDPOINT: &str = "https://api.honeycomb.io:443";

/// Service name used when none is configured.
pub const DEFAULT_SERVICE_NAME: &str = "unknown_service";

/// Propagators installed when none are configured.
pub const DEFAULT_PROPAGATORS: &str = "tracecontext,baggage";

/// Export timeout when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Name reported as `telemetry.distro.name`.
pub const DISTRO_NAME: &str = "honeycomb-opentelemetry-rust";

/// Version reported as `honeycomb.distro.version` and `x-otlp-version`.
pub const DISTRO_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Wire protocol used by an OTLP exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OtlpProtocol {
    #[serde(rename = "grpc")]
    Grpc,
    #[serde(rename = "http/protobuf")]
    HttpProtobuf,
    #[serde(rename = "http/json")]
    HttpJson,
}

impl Default for OtlpProtocol {
    fn default() -> Self {
        Self::HttpProtobuf
    }
}

impl OtlpProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grpc => "grpc",
            Self::HttpProtobuf => "http/protobuf",
            Self::HttpJson => "http/json",
        }
    }
}

impl fmt::Display for OtlpProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OtlpProtocol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "grpc" => Ok(Self::Grpc),
            "http/protobuf" => Ok(Self::HttpProtobuf),
            "http/json" => Ok(Self::HttpJson),
            other => Err(ConfigError::UnsupportedProtocol(other.to_string())),
        }
    }
}

/// One of the three telemetry signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Traces,
    Metrics,
    Logs,
}

impl Signal {
    pub const ALL: [Signal; 3] = [Signal::Traces, Signal::Metrics, Signal::Logs];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Traces => "traces",
            Self::Metrics => "metrics",
            Self::Logs => "logs",
        }
    }

    /// Path appended to the base endpoint for HTTP transports.
    pub fn path_suffix(&self) -> &'static str {
        match self {
            Self::Traces => "v1/traces",
            Self::Metrics => "v1/metrics",
            Self::Logs => "v1/logs",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw configuration. Every field is optional; see [`HoneycombConfig::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HoneycombConfig {
    pub api_key: Option<String>,
    pub traces_api_key: Option<String>,
    pub metrics_api_key: Option<String>,
    pub logs_api_key: Option<String>,

    pub dataset: Option<String>,
    pub metrics_dataset: Option<String>,

    /// Base endpoint shared by all signals.
    pub api_endpoint: Option<String>,
    pub traces_endpoint: Option<String>,
    pub metrics_endpoint: Option<String>,
    pub logs_endpoint: Option<String>,

    pub sample_rate: Option<i64>,
    pub debug: Option<bool>,

    pub service_name: Option<String>,
    pub service_version: Option<String>,
    pub resource_attributes: Option<HashMap<String, String>>,

    /// Comma-separated propagator names.
    pub propagators: Option<String>,

    /// Exporter kind per signal; only `otlp` is accepted.
    pub traces_exporter: Option<String>,
    pub metrics_exporter: Option<String>,
    pub logs_exporter: Option<String>,

    pub headers: Option<HashMap<String, String>>,
    pub traces_headers: Option<HashMap<String, String>>,
    pub metrics_headers: Option<HashMap<String, String>>,
    pub logs_headers: Option<HashMap<String, String>>,

    pub timeout: Option<Duration>,
    pub traces_timeout: Option<Duration>,
    pub metrics_timeout: Option<Duration>,
    pub logs_timeout: Option<Duration>,

    pub protocol: Option<OtlpProtocol>,
    pub traces_protocol: Option<OtlpProtocol>,
    pub metrics_protocol: Option<OtlpProtocol>,
    pub logs_protocol: Option<OtlpProtocol>,

    pub session_timeout: Option<Duration>,
    pub offline_caching_enabled: Option<bool>,
    pub panic_instrumentation_enabled: Option<bool>,
}

/// Resolved settings for one signal's exporter.
#[derive(Clone, PartialEq, Eq)]
pub struct ExporterConfig {
    pub signal: Signal,
    pub endpoint: String,
    pub protocol: OtlpProtocol,
    pub headers: BTreeMap<String, String>,
    pub timeout: Duration,
}

impl fmt::Debug for ExporterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: BTreeMap<&str, &str> = self
            .headers
            .iter()
            .map(|(k, v)| {
                let value = if k.eq_ignore_ascii_case("x-honeycomb-team") {
                    "<redacted>"
                } else {
                    v.as_str()
                };
                (k.as_str(), value)
            })
            .collect();
        f.debug_struct("ExporterConfig")
            .field("signal", &self.signal)
            .field("endpoint", &self.endpoint)
            .field("protocol", &self.protocol)
            .field("headers", &headers)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Fully resolved, validated configuration.
#[derive(Clone, PartialEq)]
pub struct HoneycombOptions {
    pub traces_api_key: String,
    pub metrics_api_key: String,
    pub logs_api_key: String,
    pub dataset: Option<String>,
    pub metrics_dataset: Option<String>,

    pub traces: ExporterConfig,
    pub metrics: ExporterConfig,
    pub logs: ExporterConfig,

    pub sample_rate: i64,
    pub debug: bool,

    pub service_name: String,
    pub service_version: Option<String>,
    pub resource_attributes: BTreeMap<String, String>,
    pub propagators: Vec<String>,

    pub session_timeout: Duration,
    pub offline_caching_enabled: bool,
    pub panic_instrumentation_enabled: bool,
}

impl HoneycombOptions {
    /// Exporter settings for `signal`.
    pub fn exporter(&self, signal: Signal) -> &ExporterConfig {
        match signal {
            Signal::Traces => &self.traces,
            Signal::Metrics => &self.metrics,
            Signal::Logs => &self.logs,
        }
    }
}

impl fmt::Debug for HoneycombOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HoneycombOptions")
            .field("traces_api_key", &redact(&self.traces_api_key))
            .field("metrics_api_key", &redact(&self.metrics_api_key))
            .field("logs_api_key", &redact(&self.logs_api_key))
            .field("dataset", &self.dataset)
            .field("metrics_dataset", &self.metrics_dataset)
            .field("traces", &self.traces)
            .field("metrics", &self.metrics)
            .field("logs", &self.logs)
            .field("sample_rate", &self.sample_rate)
            .field("debug", &self.debug)
            .field("service_name", &self.service_name)
            .field("service_version", &self.service_version)
            .field("resource_attributes", &self.resource_attributes)
            .field("propagators", &self.propagators)
            .field("session_timeout", &self.session_timeout)
            .field("offline_caching_enabled", &self.offline_caching_enabled)
            .field(
                "panic_instrumentation_enabled",
                &self.panic_instrumentation_enabled,
            )
            .finish()
    }
}

fn redact(key: &str) -> String {
    let visible: String = key.chars().take(4).collect();
    format!("{}...", visible)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_parsing() {
        assert_eq!("grpc".parse::<OtlpProtocol>().unwrap(), OtlpProtocol::Grpc);
        assert_eq!(
            "HTTP/Protobuf".parse::<OtlpProtocol>().unwrap(),
            OtlpProtocol::HttpProtobuf
        );
        assert_eq!(
            "http/json".parse::<OtlpProtocol>().unwrap(),
            OtlpProtocol::HttpJson
        );
        assert!(matches!(
            "thrift".parse::<OtlpProtocol>(),
            Err(ConfigError::UnsupportedProtocol(p)) if p == "thrift"
        ));
    }

    #[test]
    fn test_protocol_serde_names() {
        let json = serde_json::to_string(&OtlpProtocol::HttpProtobuf).unwrap();
        assert_eq!(json, r#""http/protobuf""#);
        let parsed: OtlpProtocol = serde_json::from_str(r#""grpc""#).unwrap();
        assert_eq!(parsed, OtlpProtocol::Grpc);
    }

    #[test]
    fn test_signal_suffixes() {
        let suffixes: Vec<_> = Signal::ALL.iter().map(Signal::path_suffix).collect();
        assert_eq!(suffixes, vec!["v1/traces", "v1/metrics", "v1/logs"]);
    }

    #[test]
    fn test_config_deserializes_partially() {
        let config: HoneycombConfig =
            serde_json::from_str(r#"{"apiKey": "abc", "sampleRate": 5}"#).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("abc"));
        assert_eq!(config.sample_rate, Some(5));
        assert!(config.dataset.is_none());
    }

    #[test]
    fn test_exporter_debug_redacts_team_header() {
        let config = ExporterConfig {
            signal: Signal::Traces,
            endpoint: "https://api.honeycomb.io:443/v1/traces".to_string(),
            protocol: OtlpProtocol::HttpProtobuf,
            headers: BTreeMap::from([("x-honeycomb-team".to_string(), "secret".to_string())]),
            timeout: DEFAULT_TIMEOUT,
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
