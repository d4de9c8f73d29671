// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration sources.
//!
//! An [`OptionsSource`] is a flat string map using the standard environment
//! variable names (`HONEYCOMB_API_KEY`, `OTEL_EXPORTER_OTLP_PROTOCOL`, ...). It can
//! be read from the process environment, an explicit map, or a JSON/YAML file.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

use super::types::{HoneycombConfig, OtlpProtocol};

pub const HONEYCOMB_API_KEY: &str = "HONEYCOMB_API_KEY";
pub const HONEYCOMB_TRACES_APIKEY: &str = "HONEYCOMB_TRACES_APIKEY";
pub const HONEYCOMB_METRICS_APIKEY: &str = "HONEYCOMB_METRICS_APIKEY";
pub const HONEYCOMB_LOGS_APIKEY: &str = "HONEYCOMB_LOGS_APIKEY";
pub const HONEYCOMB_DATASET: &str = "HONEYCOMB_DATASET";
pub const HONEYCOMB_METRICS_DATASET: &str = "HONEYCOMB_METRICS_DATASET";
pub const HONEYCOMB_API_ENDPOINT: &str = "HONEYCOMB_API_ENDPOINT";
pub const OTEL_EXPORTER_OTLP_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
pub const HONEYCOMB_TRACES_ENDPOINT: &str = "HONEYCOMB_TRACES_ENDPOINT";
pub const HONEYCOMB_METRICS_ENDPOINT: &str = "HONEYCOMB_METRICS_ENDPOINT";
pub const HONEYCOMB_LOGS_ENDPOINT: &str = "HONEYCOMB_LOGS_ENDPOINT";
pub const SAMPLE_RATE: &str = "SAMPLE_RATE";
pub const DEBUG: &str = "DEBUG";
pub const OTEL_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";
pub const OTEL_SERVICE_VERSION: &str = "OTEL_SERVICE_VERSION";
pub const OTEL_RESOURCE_ATTRIBUTES: &str = "OTEL_RESOURCE_ATTRIBUTES";
pub const OTEL_PROPAGATORS: &str = "OTEL_PROPAGATORS";
pub const OTEL_TRACES_EXPORTER: &str = "OTEL_TRACES_EXPORTER";
pub const OTEL_METRICS_EXPORTER: &str = "OTEL_METRICS_EXPORTER";
pub const OTEL_LOGS_EXPORTER: &str = "OTEL_LOGS_EXPORTER";
pub const OTEL_EXPORTER_OTLP_HEADERS: &str = "OTEL_EXPORTER_OTLP_HEADERS";
pub const OTEL_EXPORTER_OTLP_TRACES_HEADERS: &str = "OTEL_EXPORTER_OTLP_TRACES_HEADERS";
pub const OTEL_EXPORTER_OTLP_METRICS_HEADERS: &str = "OTEL_EXPORTER_OTLP_METRICS_HEADERS";
pub const OTEL_EXPORTER_OTLP_LOGS_HEADERS: &str = "OTEL_EXPORTER_OTLP_LOGS_HEADERS";
pub const OTEL_EXPORTER_OTLP_TIMEOUT: &str = "OTEL_EXPORTER_OTLP_TIMEOUT";
pub const OTEL_EXPORTER_OTLP_TRACES_TIMEOUT: &str = "OTEL_EXPORTER_OTLP_TRACES_TIMEOUT";
pub const OTEL_EXPORTER_OTLP_METRICS_TIMEOUT: &str = "OTEL_EXPORTER_OTLP_METRICS_TIMEOUT";
pub const OTEL_EXPORTER_OTLP_LOGS_TIMEOUT: &str = "OTEL_EXPORTER_OTLP_LOGS_TIMEOUT";
pub const OTEL_EXPORTER_OTLP_PROTOCOL: &str = "OTEL_EXPORTER_OTLP_PROTOCOL";
pub const OTEL_EXPORTER_OTLP_TRACES_PROTOCOL: &str = "OTEL_EXPORTER_OTLP_TRACES_PROTOCOL";
pub const OTEL_EXPORTER_OTLP_METRICS_PROTOCOL: &str = "OTEL_EXPORTER_OTLP_METRICS_PROTOCOL";
pub const OTEL_EXPORTER_OTLP_LOGS_PROTOCOL: &str = "OTEL_EXPORTER_OTLP_LOGS_PROTOCOL";
pub const HONEYCOMB_SESSION_TIMEOUT: &str = "HONEYCOMB_SESSION_TIMEOUT";
pub const HONEYCOMB_OFFLINE_CACHING_ENABLED: &str = "HONEYCOMB_OFFLINE_CACHING_ENABLED";
pub const HONEYCOMB_PANIC_INSTRUMENTATION_ENABLED: &str = "HONEYCOMB_PANIC_INSTRUMENTATION_ENABLED";

/// A flat key/value configuration source.
///
/// Empty values are indistinguishable from missing ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionsSource {
    values: HashMap<String, String>,
}

impl OptionsSource {
    /// Read every variable in the process environment.
    pub fn from_env() -> Self {
        Self::from_map(std::env::vars())
    }

    /// Build a source from explicit pairs.
    pub fn from_map<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Load a JSON or YAML file holding a flat object of scalar values.
    ///
    /// The format is chosen by extension; anything other than `.yaml`/`.yml`
    /// is read as JSON.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let raw: HashMap<String, serde_json::Value> = match extension.to_lowercase().as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            _ => serde_json::from_str(&content)?,
        };

        let mut values = HashMap::with_capacity(raw.len());
        for (key, value) in raw {
            let value = match value {
                serde_json::Value::Null => continue,
                serde_json::Value::String(s) => s,
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Number(n) => n.to_string(),
                _ => {
                    return Err(ConfigError::invalid(
                        key,
                        "expected a string, number or boolean",
                    ))
                }
            };
            values.insert(key, value);
        }
        Ok(Self { values })
    }

    /// Overlay `other` on top of this source; its values win.
    pub fn overlay(mut self, other: OptionsSource) -> Self {
        self.values.extend(other.values);
        self
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.values
            .get(key)
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }

    pub fn get_int(&self, key: &str) -> Result<Option<i64>, ConfigError> {
        self.parse_with(key, |v| {
            v.trim()
                .parse::<i64>()
                .map_err(|_| format!("expected an integer, got {:?}", v))
        })
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        self.parse_with(key, |v| match v.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(format!("expected a boolean, got {:?}", v)),
        })
    }

    /// A duration given in whole milliseconds.
    pub fn get_millis(&self, key: &str) -> Result<Option<Duration>, ConfigError> {
        self.parse_with(key, |v| {
            v.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| format!("expected milliseconds, got {:?}", v))
        })
    }

    /// A duration given in whole seconds.
    pub fn get_seconds(&self, key: &str) -> Result<Option<Duration>, ConfigError> {
        self.parse_with(key, |v| {
            v.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| format!("expected seconds, got {:?}", v))
        })
    }

    /// A `key=value,key=value` list.
    pub fn get_key_value_list(
        &self,
        key: &str,
    ) -> Result<Option<HashMap<String, String>>, ConfigError> {
        self.parse_with(key, parse_key_value_list)
    }

    pub fn get_protocol(&self, key: &str) -> Result<Option<OtlpProtocol>, ConfigError> {
        match self.get_string(key) {
            Some(value) => value.parse().map(Some),
            None => Ok(None),
        }
    }

    fn parse_with<T, F>(&self, key: &str, parse: F) -> Result<Option<T>, ConfigError>
    where
        F: FnOnce(&str) -> Result<T, String>,
    {
        match self.get_string(key) {
            Some(value) => parse(&value)
                .map(Some)
                .map_err(|message| ConfigError::invalid(key, message)),
            None => Ok(None),
        }
    }
}

fn parse_key_value_list(value: &str) -> Result<HashMap<String, String>, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (k, v) = entry
                .split_once('=')
                .ok_or_else(|| format!("expected key=value, got {:?}", entry))?;
            let k = k.trim();
            if k.is_empty() {
                return Err(format!("empty key in {:?}", entry));
            }
            Ok((k.to_string(), v.trim().to_string()))
        })
        .collect()
}

impl HoneycombConfig {
    /// Read every recognised key from `source`.
    ///
    /// Only malformed values fail here; missing keys stay `None` until
    /// [`resolve`](Self::resolve).
    pub fn from_source(source: &OptionsSource) -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: source.get_string(HONEYCOMB_API_KEY),
            traces_api_key: source.get_string(HONEYCOMB_TRACES_APIKEY),
            metrics_api_key: source.get_string(HONEYCOMB_METRICS_APIKEY),
            logs_api_key: source.get_string(HONEYCOMB_LOGS_APIKEY),
            dataset: source.get_string(HONEYCOMB_DATASET),
            metrics_dataset: source.get_string(HONEYCOMB_METRICS_DATASET),
            api_endpoint: source
                .get_string(HONEYCOMB_API_ENDPOINT)
                .or_else(|| source.get_string(OTEL_EXPORTER_OTLP_ENDPOINT)),
            traces_endpoint: source.get_string(HONEYCOMB_TRACES_ENDPOINT),
            metrics_endpoint: source.get_string(HONEYCOMB_METRICS_ENDPOINT),
            logs_endpoint: source.get_string(HONEYCOMB_LOGS_ENDPOINT),
            sample_rate: source.get_int(SAMPLE_RATE)?,
            debug: source.get_bool(DEBUG)?,
            service_name: source.get_string(OTEL_SERVICE_NAME),
            service_version: source.get_string(OTEL_SERVICE_VERSION),
            resource_attributes: source.get_key_value_list(OTEL_RESOURCE_ATTRIBUTES)?,
            propagators: source.get_string(OTEL_PROPAGATORS),
            traces_exporter: source.get_string(OTEL_TRACES_EXPORTER),
            metrics_exporter: source.get_string(OTEL_METRICS_EXPORTER),
            logs_exporter: source.get_string(OTEL_LOGS_EXPORTER),
            headers: source.get_key_value_list(OTEL_EXPORTER_OTLP_HEADERS)?,
            traces_headers: source.get_key_value_list(OTEL_EXPORTER_OTLP_TRACES_HEADERS)?,
            metrics_headers: source.get_key_value_list(OTEL_EXPORTER_OTLP_METRICS_HEADERS)?,
            logs_headers: source.get_key_value_list(OTEL_EXPORTER_OTLP_LOGS_HEADERS)?,
            timeout: source.get_millis(OTEL_EXPORTER_OTLP_TIMEOUT)?,
            traces_timeout: source.get_millis(OTEL_EXPORTER_OTLP_TRACES_TIMEOUT)?,
            metrics_timeout: source.get_millis(OTEL_EXPORTER_OTLP_METRICS_TIMEOUT)?,
            logs_timeout: source.get_millis(OTEL_EXPORTER_OTLP_LOGS_TIMEOUT)?,
            protocol: source.get_protocol(OTEL_EXPORTER_OTLP_PROTOCOL)?,
            traces_protocol: source.get_protocol(OTEL_EXPORTER_OTLP_TRACES_PROTOCOL)?,
            metrics_protocol: source.get_protocol(OTEL_EXPORTER_OTLP_METRICS_PROTOCOL)?,
            logs_protocol: source.get_protocol(OTEL_EXPORTER_OTLP_LOGS_PROTOCOL)?,
            session_timeout: source.get_seconds(HONEYCOMB_SESSION_TIMEOUT)?,
            offline_caching_enabled: source.get_bool(HONEYCOMB_OFFLINE_CACHING_ENABLED)?,
            panic_instrumentation_enabled: source
                .get_bool(HONEYCOMB_PANIC_INSTRUMENTATION_ENABLED)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_values_are_unset() {
        let source = OptionsSource::from_map([("A", ""), ("B", "   "), ("C", "x")]);
        assert_eq!(source.get_string("A"), None);
        assert_eq!(source.get_string("B"), None);
        assert_eq!(source.get_string("C").as_deref(), Some("x"));
        assert_eq!(source.get_int("A").unwrap(), None);
    }

    #[test]
    fn test_typed_getters() {
        let source = OptionsSource::from_map([
            ("INT", "42"),
            ("BOOL", "TRUE"),
            ("MILLIS", "30000"),
            ("SECS", "60"),
            ("PROTO", "grpc"),
        ]);
        assert_eq!(source.get_int("INT").unwrap(), Some(42));
        assert_eq!(source.get_bool("BOOL").unwrap(), Some(true));
        assert_eq!(
            source.get_millis("MILLIS").unwrap(),
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            source.get_seconds("SECS").unwrap(),
            Some(Duration::from_secs(60))
        );
        assert_eq!(
            source.get_protocol("PROTO").unwrap(),
            Some(OtlpProtocol::Grpc)
        );
    }

    #[test]
    fn test_malformed_values_name_the_key() {
        let source = OptionsSource::from_map([("SAMPLE_RATE", "often")]);
        let err = source.get_int("SAMPLE_RATE").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, .. } if field == "SAMPLE_RATE"
        ));
    }

    #[test]
    fn test_key_value_list() {
        let source = OptionsSource::from_map([("H", " a=1 , b = two,,c=x=y ")]);
        let list = source.get_key_value_list("H").unwrap().unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list["a"], "1");
        assert_eq!(list["b"], "two");
        assert_eq!(list["c"], "x=y");

        let bad = OptionsSource::from_map([("H", "novalue")]);
        assert!(bad.get_key_value_list("H").is_err());
    }

    #[test]
    fn test_from_json_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("honeycomb.json");
        std::fs::write(
            &path,
            r#"{"HONEYCOMB_API_KEY": "file_key", "SAMPLE_RATE": 3, "DEBUG": true, "UNUSED": null}"#,
        )
        .unwrap();

        let source = OptionsSource::from_file(&path).unwrap();
        assert_eq!(source.get_string("HONEYCOMB_API_KEY").as_deref(), Some("file_key"));
        assert_eq!(source.get_int("SAMPLE_RATE").unwrap(), Some(3));
        assert_eq!(source.get_bool("DEBUG").unwrap(), Some(true));
        assert_eq!(source.get_string("UNUSED"), None);
    }

    #[test]
    fn test_from_yaml_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("honeycomb.yaml");
        std::fs::write(
            &path,
            "HONEYCOMB_API_KEY: yaml_key\nOTEL_EXPORTER_OTLP_TIMEOUT: 5000\n",
        )
        .unwrap();

        let source = OptionsSource::from_file(&path).unwrap();
        assert_eq!(source.get_string("HONEYCOMB_API_KEY").as_deref(), Some("yaml_key"));
        assert_eq!(
            source.get_millis("OTEL_EXPORTER_OTLP_TIMEOUT").unwrap(),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_from_file_rejects_nested_values() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("honeycomb.json");
        std::fs::write(&path, r#"{"HONEYCOMB_API_KEY": {"nested": true}}"#).unwrap();
        assert!(OptionsSource::from_file(&path).is_err());
    }

    #[test]
    fn test_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = OptionsSource::from_file(&temp.path().join("missing.json"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_overlay_prefers_later_source() {
        let file = OptionsSource::from_map([("A", "file"), ("B", "file")]);
        let env = OptionsSource::from_map([("B", "env")]);
        let merged = file.overlay(env);
        assert_eq!(merged.get_string("A").as_deref(), Some("file"));
        assert_eq!(merged.get_string("B").as_deref(), Some("env"));
    }

    #[test]
    fn test_config_from_source() {
        let source = OptionsSource::from_map([
            (HONEYCOMB_API_KEY, "key"),
            (OTEL_EXPORTER_OTLP_ENDPOINT, "http://collector:4318"),
            (OTEL_EXPORTER_OTLP_TIMEOUT, "30000"),
            (OTEL_EXPORTER_OTLP_PROTOCOL, "http/json"),
            (HONEYCOMB_SESSION_TIMEOUT, "900"),
        ]);
        let config = HoneycombConfig::from_source(&source).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("key"));
        assert_eq!(config.api_endpoint.as_deref(), Some("http://collector:4318"));
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.protocol, Some(OtlpProtocol::HttpJson));
        assert_eq!(config.session_timeout, Some(Duration::from_secs(900)));
    }

    #[test]
    fn test_honeycomb_endpoint_beats_otel_endpoint() {
        let source = OptionsSource::from_map([
            (HONEYCOMB_API_ENDPOINT, "https://honeycomb.example"),
            (OTEL_EXPORTER_OTLP_ENDPOINT, "http://collector:4318"),
        ]);
        let config = HoneycombConfig::from_source(&source).unwrap();
        assert_eq!(
            config.api_endpoint.as_deref(),
            Some("https://honeycomb.example")
        );
    }
}
