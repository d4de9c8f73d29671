// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration merging and resolution.
//!
//! [`HoneycombConfig::merge`] layers raw configurations (later wins, field by
//! field). [`HoneycombConfig::resolve`] validates the result and applies every
//! default, producing [`HoneycombOptions`].

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::error::ConfigError;
use crate::exporter::{get_headers, resolve_endpoint};
use crate::processor::DeviceInfo;
use crate::session::DEFAULT_SESSION_LIFETIME;

use super::types::{
    ExporterConfig, HoneycombConfig, HoneycombOptions, OtlpProtocol, Signal,
    DEFAULT_API_ENDPOINT, DEFAULT_PROPAGATORS, DEFAULT_SERVICE_NAME, DEFAULT_TIMEOUT,
    DISTRO_NAME, DISTRO_VERSION,
};

/// Runtime description reported as `honeycomb.distro.runtime_version`.
pub fn runtime_version() -> String {
    let info = DeviceInfo::detect();
    let os = info
        .os_type
        .unwrap_or_else(|| std::env::consts::OS.to_string());
    match info.os_version {
        Some(version) => format!("{} {}", os, version),
        None => os,
    }
}

/// File name of the running executable, reported as `app.bundle.executable`.
pub fn bundle_executable() -> Option<String> {
    std::env::current_exe()
        .ok()?
        .file_name()?
        .to_str()
        .map(str::to_string)
}

macro_rules! overlay {
    ($base:ident, $over:ident; $($field:ident),+ $(,)?) => {
        $( if $over.$field.is_some() { $base.$field = $over.$field; } )+
    };
}

impl HoneycombConfig {
    /// Layer `overrides` on top of `self`. Set fields in `overrides` win.
    pub fn merge(self, overrides: HoneycombConfig) -> HoneycombConfig {
        let mut merged = self;
        overlay!(merged, overrides;
            api_key, traces_api_key, metrics_api_key, logs_api_key,
            dataset, metrics_dataset,
            api_endpoint, traces_endpoint, metrics_endpoint, logs_endpoint,
            sample_rate, debug,
            service_name, service_version, resource_attributes, propagators,
            traces_exporter, metrics_exporter, logs_exporter,
            headers, traces_headers, metrics_headers, logs_headers,
            timeout, traces_timeout, metrics_timeout, logs_timeout,
            protocol, traces_protocol, metrics_protocol, logs_protocol,
            session_timeout, offline_caching_enabled, panic_instrumentation_enabled,
        );
        merged
    }

    /// Validate and apply defaults.
    ///
    /// Fails when no API key covers a signal, an exporter other than `otlp` is
    /// selected, an endpoint is not a URL, or a header is not a valid HTTP header.
    pub fn resolve(&self) -> Result<HoneycombOptions, ConfigError> {
        verify_exporter("OTEL_TRACES_EXPORTER", &self.traces_exporter)?;
        verify_exporter("OTEL_METRICS_EXPORTER", &self.metrics_exporter)?;
        verify_exporter("OTEL_LOGS_EXPORTER", &self.logs_exporter)?;

        let api_key_for = |specific: &Option<String>, signal: Signal| {
            non_empty(specific)
                .or_else(|| non_empty(&self.api_key))
                .map(str::to_string)
                .ok_or_else(|| {
                    ConfigError::MissingApiKey(format!(
                        "no API key for {}: set HONEYCOMB_API_KEY",
                        signal
                    ))
                })
        };
        let traces_api_key = api_key_for(&self.traces_api_key, Signal::Traces)?;
        let metrics_api_key = api_key_for(&self.metrics_api_key, Signal::Metrics)?;
        let logs_api_key = api_key_for(&self.logs_api_key, Signal::Logs)?;

        let mut resource_attributes: BTreeMap<String, String> = self
            .resource_attributes
            .iter()
            .flatten()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let service_name = non_empty(&self.service_name)
            .map(str::to_string)
            .or_else(|| resource_attributes.get("service.name").cloned())
            .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string());
        let service_version = non_empty(&self.service_version).map(str::to_string);

        put_if_absent(&mut resource_attributes, "service.name", service_name.clone());
        if let Some(version) = &service_version {
            put_if_absent(&mut resource_attributes, "service.version", version.clone());
        }
        put_if_absent(&mut resource_attributes, "honeycomb.distro.version", DISTRO_VERSION);
        put_if_absent(
            &mut resource_attributes,
            "honeycomb.distro.runtime_version",
            runtime_version(),
        );
        put_if_absent(&mut resource_attributes, "telemetry.distro.name", DISTRO_NAME);
        put_if_absent(&mut resource_attributes, "telemetry.distro.version", DISTRO_VERSION);
        if let Some(executable) = bundle_executable() {
            put_if_absent(&mut resource_attributes, "app.bundle.executable", executable);
        }

        let base = non_empty(&self.api_endpoint).unwrap_or(DEFAULT_API_ENDPOINT);
        let protocol = self.protocol.unwrap_or_default();
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let no_headers = HashMap::new();
        let general_headers = self.headers.as_ref().unwrap_or(&no_headers);

        let exporter = |signal: Signal,
                        api_key: &str,
                        dataset: Option<&str>,
                        endpoint: &Option<String>,
                        signal_protocol: Option<OtlpProtocol>,
                        signal_headers: &Option<HashMap<String, String>>,
                        signal_timeout: Option<Duration>|
         -> Result<ExporterConfig, ConfigError> {
            let protocol = signal_protocol.unwrap_or(protocol);
            let endpoint =
                resolve_endpoint(non_empty(endpoint), base, protocol, signal.path_suffix());
            validate_url(&format!("{} endpoint", signal), &endpoint)?;

            let headers = get_headers(
                api_key,
                dataset,
                general_headers,
                signal_headers.as_ref().unwrap_or(&no_headers),
            );
            validate_headers(&headers)?;

            Ok(ExporterConfig {
                signal,
                endpoint,
                protocol,
                headers,
                timeout: signal_timeout.unwrap_or(timeout),
            })
        };

        let dataset = non_empty(&self.dataset);
        let metrics_dataset = non_empty(&self.metrics_dataset);

        let traces = exporter(
            Signal::Traces,
            &traces_api_key,
            dataset,
            &self.traces_endpoint,
            self.traces_protocol,
            &self.traces_headers,
            self.traces_timeout,
        )?;
        let metrics = exporter(
            Signal::Metrics,
            &metrics_api_key,
            metrics_dataset,
            &self.metrics_endpoint,
            self.metrics_protocol,
            &self.metrics_headers,
            self.metrics_timeout,
        )?;
        let logs = exporter(
            Signal::Logs,
            &logs_api_key,
            dataset,
            &self.logs_endpoint,
            self.logs_protocol,
            &self.logs_headers,
            self.logs_timeout,
        )?;

        let propagators = non_empty(&self.propagators)
            .unwrap_or(DEFAULT_PROPAGATORS)
            .split(',')
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        Ok(HoneycombOptions {
            traces_api_key,
            metrics_api_key,
            logs_api_key,
            dataset: dataset.map(str::to_string),
            metrics_dataset: metrics_dataset.map(str::to_string),
            traces,
            metrics,
            logs,
            sample_rate: self.sample_rate.unwrap_or(1),
            debug: self.debug.unwrap_or(false),
            service_name,
            service_version,
            resource_attributes,
            propagators,
            session_timeout: self.session_timeout.unwrap_or(DEFAULT_SESSION_LIFETIME),
            offline_caching_enabled: self.offline_caching_enabled.unwrap_or(false),
            panic_instrumentation_enabled: self.panic_instrumentation_enabled.unwrap_or(true),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn put_if_absent(map: &mut BTreeMap<String, String>, key: &str, value: impl Into<String>) {
    map.entry(key.to_string()).or_insert_with(|| value.into());
}

fn verify_exporter(key: &str, exporter: &Option<String>) -> Result<(), ConfigError> {
    match non_empty(exporter) {
        Some(name) if !name.trim().eq_ignore_ascii_case("otlp") => {
            Err(ConfigError::UnsupportedExporter {
                key: key.to_string(),
                exporter: name.to_string(),
            })
        }
        _ => Ok(()),
    }
}

fn validate_url(option: &str, url: &str) -> Result<(), ConfigError> {
    match reqwest::Url::parse(url) {
        Ok(parsed) if parsed.has_host() => Ok(()),
        _ => Err(ConfigError::MalformedUrl {
            option: option.to_string(),
            url: url.to_string(),
        }),
    }
}

fn validate_headers(headers: &BTreeMap<String, String>) -> Result<(), ConfigError> {
    for (name, value) in headers {
        http::HeaderName::from_bytes(name.as_bytes()).map_err(|e| ConfigError::InvalidHeader {
            name: name.clone(),
            message: e.to_string(),
        })?;
        http::HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidHeader {
            name: name.clone(),
            message: e.to_string(),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptionsSource;

    const CLASSIC: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    fn with_key() -> HoneycombConfig {
        HoneycombConfig {
            api_key: Some("key".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let options = with_key().resolve().unwrap();

        assert_eq!(options.service_name, "unknown_service");
        assert_eq!(options.service_version, None);
        assert_eq!(options.resource_attributes["service.name"], "unknown_service");
        assert_eq!(
            options.resource_attributes["honeycomb.distro.version"],
            DISTRO_VERSION
        );
        assert_eq!(options.resource_attributes["telemetry.distro.name"], DISTRO_NAME);
        assert!(options
            .resource_attributes
            .contains_key("honeycomb.distro.runtime_version"));
        assert!(!options.resource_attributes.contains_key("service.version"));

        assert_eq!(options.traces.endpoint, "https://api.honeycomb.io:443/v1/traces");
        assert_eq!(options.metrics.endpoint, "https://api.honeycomb.io:443/v1/metrics");
        assert_eq!(options.logs.endpoint, "https://api.honeycomb.io:443/v1/logs");

        for signal in Signal::ALL {
            let exporter = options.exporter(signal);
            assert_eq!(exporter.protocol, OtlpProtocol::HttpProtobuf);
            assert_eq!(exporter.timeout, Duration::from_secs(10));
            assert_eq!(exporter.headers.len(), 2);
            assert_eq!(exporter.headers["x-honeycomb-team"], "key");
            assert_eq!(exporter.headers["x-otlp-version"], DISTRO_VERSION);
        }

        assert_eq!(options.sample_rate, 1);
        assert!(!options.debug);
        assert_eq!(options.propagators, vec!["tracecontext", "baggage"]);
        assert_eq!(options.session_timeout, DEFAULT_SESSION_LIFETIME);
        assert!(!options.offline_caching_enabled);
        assert!(options.panic_instrumentation_enabled);
    }

    #[test]
    fn test_empty_strings_fall_back_to_defaults() {
        let source = OptionsSource::from_map([
            ("HONEYCOMB_API_KEY", "key"),
            ("OTEL_SERVICE_NAME", ""),
            ("OTEL_RESOURCE_ATTRIBUTES", ""),
            ("OTEL_PROPAGATORS", ""),
            ("OTEL_EXPORTER_OTLP_ENDPOINT", ""),
            ("OTEL_EXPORTER_OTLP_HEADERS", ""),
            ("OTEL_EXPORTER_OTLP_TIMEOUT", ""),
            ("OTEL_EXPORTER_OTLP_PROTOCOL", ""),
        ]);
        let options = HoneycombConfig::from_source(&source)
            .unwrap()
            .resolve()
            .unwrap();

        assert_eq!(options, with_key().resolve().unwrap());
    }

    #[test]
    fn test_general_values_apply_to_every_signal() {
        let source = OptionsSource::from_map([
            ("HONEYCOMB_API_KEY", "key"),
            ("HONEYCOMB_API_ENDPOINT", "http://example.com:1234"),
            ("OTEL_SERVICE_NAME", "service"),
            ("OTEL_SERVICE_VERSION", "1"),
            ("OTEL_RESOURCE_ATTRIBUTES", "resource=aaa"),
            ("OTEL_PROPAGATORS", "baggage"),
            ("OTEL_EXPORTER_OTLP_HEADERS", "header=bbb"),
            ("OTEL_EXPORTER_OTLP_TIMEOUT", "30000"),
            ("OTEL_EXPORTER_OTLP_PROTOCOL", "http/json"),
        ]);
        let options = HoneycombConfig::from_source(&source)
            .unwrap()
            .resolve()
            .unwrap();

        assert_eq!(options.service_name, "service");
        assert_eq!(options.service_version.as_deref(), Some("1"));
        assert_eq!(options.resource_attributes["resource"], "aaa");
        assert_eq!(options.resource_attributes["service.version"], "1");
        assert_eq!(options.traces.endpoint, "http://example.com:1234/v1/traces");
        assert_eq!(options.metrics.endpoint, "http://example.com:1234/v1/metrics");
        assert_eq!(options.logs.endpoint, "http://example.com:1234/v1/logs");
        for signal in Signal::ALL {
            let exporter = options.exporter(signal);
            assert_eq!(exporter.headers["header"], "bbb");
            assert_eq!(exporter.timeout, Duration::from_secs(30));
            assert_eq!(exporter.protocol, OtlpProtocol::HttpJson);
        }
        assert_eq!(options.propagators, vec!["baggage"]);
    }

    #[test]
    fn test_signal_specific_values() {
        let config = HoneycombConfig {
            api_key: Some("key".to_string()),
            dataset: Some("dataset".to_string()),
            metrics_dataset: Some("metrics".to_string()),
            traces_api_key: Some(CLASSIC.to_string()),
            metrics_api_key: Some("b".repeat(32)),
            logs_api_key: Some("c".repeat(32)),
            traces_endpoint: Some("http://traces.example.com/v1/traces".to_string()),
            metrics_protocol: Some(OtlpProtocol::Grpc),
            logs_timeout: Some(Duration::from_secs(2)),
            logs_headers: Some(HashMap::from([("logs".to_string(), "yes".to_string())])),
            ..Default::default()
        };
        let options = config.resolve().unwrap();

        assert_eq!(options.traces.endpoint, "http://traces.example.com/v1/traces");
        assert_eq!(options.traces.headers["x-honeycomb-team"], CLASSIC);
        assert_eq!(options.traces.headers["x-honeycomb-dataset"], "dataset");

        assert_eq!(options.metrics.endpoint, "https://api.honeycomb.io:443");
        assert_eq!(options.metrics.protocol, OtlpProtocol::Grpc);
        assert_eq!(options.metrics.headers["x-honeycomb-dataset"], "metrics");

        assert_eq!(options.logs.timeout, Duration::from_secs(2));
        assert_eq!(options.logs.headers["logs"], "yes");
        assert_eq!(options.logs.headers["x-honeycomb-dataset"], "dataset");
        assert!(!options.traces.headers.contains_key("logs"));
    }

    #[test]
    fn test_non_classic_key_never_sends_dataset() {
        let config = HoneycombConfig {
            api_key: Some("not-a-classic-key".to_string()),
            dataset: Some("dataset".to_string()),
            ..Default::default()
        };
        let options = config.resolve().unwrap();
        for signal in Signal::ALL {
            assert!(!options.exporter(signal).headers.contains_key("x-honeycomb-dataset"));
        }
    }

    #[test]
    fn test_missing_api_key() {
        let err = HoneycombConfig::default().resolve().unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey(_)));

        // Per-signal keys alone are not enough when one signal is uncovered.
        let partial = HoneycombConfig {
            traces_api_key: Some("t".to_string()),
            metrics_api_key: Some("m".to_string()),
            ..Default::default()
        };
        let err = partial.resolve().unwrap_err();
        assert!(err.to_string().contains("logs"));
    }

    #[test]
    fn test_per_signal_keys_cover_all_signals() {
        let config = HoneycombConfig {
            traces_api_key: Some("t".to_string()),
            metrics_api_key: Some("m".to_string()),
            logs_api_key: Some("l".to_string()),
            ..Default::default()
        };
        let options = config.resolve().unwrap();
        assert_eq!(options.logs.headers["x-honeycomb-team"], "l");
    }

    #[test]
    fn test_unsupported_exporter() {
        let config = HoneycombConfig {
            logs_exporter: Some("console".to_string()),
            ..with_key()
        };
        let err = config.resolve().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnsupportedExporter { ref key, ref exporter }
                if key == "OTEL_LOGS_EXPORTER" && exporter == "console"
        ));

        let otlp = HoneycombConfig {
            traces_exporter: Some("OTLP".to_string()),
            ..with_key()
        };
        assert!(otlp.resolve().is_ok());
    }

    #[test]
    fn test_malformed_endpoint() {
        let config = HoneycombConfig {
            api_endpoint: Some("not a url".to_string()),
            ..with_key()
        };
        let err = config.resolve().unwrap_err();
        assert!(matches!(err, ConfigError::MalformedUrl { .. }));
    }

    #[test]
    fn test_invalid_header() {
        let config = HoneycombConfig {
            headers: Some(HashMap::from([(
                "bad header".to_string(),
                "value".to_string(),
            )])),
            ..with_key()
        };
        let err = config.resolve().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHeader { ref name, .. } if name == "bad header"));
    }

    #[test]
    fn test_resource_attributes_are_never_overwritten() {
        let config = HoneycombConfig {
            service_name: Some("from-option".to_string()),
            resource_attributes: Some(HashMap::from([
                ("service.name".to_string(), "from-resource".to_string()),
                ("telemetry.distro.name".to_string(), "custom".to_string()),
            ])),
            ..with_key()
        };
        let options = config.resolve().unwrap();
        assert_eq!(options.service_name, "from-option");
        assert_eq!(options.resource_attributes["service.name"], "from-resource");
        assert_eq!(options.resource_attributes["telemetry.distro.name"], "custom");
    }

    #[test]
    fn test_bundle_executable_attribute() {
        let options = with_key().resolve().unwrap();
        assert_eq!(
            options.resource_attributes.get("app.bundle.executable"),
            bundle_executable().as_ref()
        );
        assert!(bundle_executable().is_some_and(|name| !name.is_empty()));

        let config = HoneycombConfig {
            resource_attributes: Some(HashMap::from([(
                "app.bundle.executable".to_string(),
                "Custom.app".to_string(),
            )])),
            ..with_key()
        };
        let options = config.resolve().unwrap();
        assert_eq!(options.resource_attributes["app.bundle.executable"], "Custom.app");
    }

    #[test]
    fn test_service_name_from_resource_attributes() {
        let config = HoneycombConfig {
            resource_attributes: Some(HashMap::from([(
                "service.name".to_string(),
                "from-resource".to_string(),
            )])),
            ..with_key()
        };
        assert_eq!(config.resolve().unwrap().service_name, "from-resource");
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let file = HoneycombConfig {
            api_key: Some("file".to_string()),
            dataset: Some("file-dataset".to_string()),
            ..Default::default()
        };
        let env = HoneycombConfig {
            api_key: Some("env".to_string()),
            sample_rate: Some(4),
            ..Default::default()
        };
        let merged = file.merge(env);
        assert_eq!(merged.api_key.as_deref(), Some("env"));
        assert_eq!(merged.dataset.as_deref(), Some("file-dataset"));
        assert_eq!(merged.sample_rate, Some(4));
    }
}
