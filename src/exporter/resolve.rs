// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Endpoint and header resolution for OTLP exporters.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{OtlpProtocol, DISTRO_VERSION};

pub const OTLP_VERSION_HEADER: &str = "x-otlp-version";
pub const TEAM_HEADER: &str = "x-honeycomb-team";
pub const DATASET_HEADER: &str = "x-honeycomb-dataset";

static CLASSIC_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-f0-9]{32}|hc[a-z]ic_[a-z0-9]{58})$").expect("classic key pattern is valid")
});

/// Whether `api_key` is a classic key, which routes data by dataset header.
///
/// Classic keys are either 32 lowercase hex characters or the 64-character
/// ingest form `hcXic_...`.
pub fn is_classic_api_key(api_key: &str) -> bool {
    CLASSIC_KEY.is_match(api_key)
}

/// Endpoint for one signal.
///
/// An explicit endpoint is used verbatim. Otherwise gRPC uses the base as-is and
/// HTTP appends `suffix`, inserting a `/` unless the base already ends with one.
pub fn resolve_endpoint(
    explicit: Option<&str>,
    fallback: &str,
    protocol: OtlpProtocol,
    suffix: &str,
) -> String {
    if let Some(endpoint) = explicit {
        return endpoint.to_string();
    }
    if protocol == OtlpProtocol::Grpc {
        return fallback.to_string();
    }
    if fallback.ends_with('/') {
        format!("{}{}", fallback, suffix)
    } else {
        format!("{}/{}", fallback, suffix)
    }
}

/// Headers for one signal's exporter.
///
/// Each step overwrites same-named headers from the previous one:
/// `x-otlp-version`, general headers, `x-honeycomb-team`, `x-honeycomb-dataset`
/// (classic keys only), signal headers. Names are compared case-insensitively
/// and stored lowercase.
pub fn get_headers(
    api_key: &str,
    dataset: Option<&str>,
    general: &HashMap<String, String>,
    signal: &HashMap<String, String>,
) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert(OTLP_VERSION_HEADER.to_string(), DISTRO_VERSION.to_string());
    headers.extend(general.iter().map(|(k, v)| (k.to_ascii_lowercase(), v.clone())));
    headers.insert(TEAM_HEADER.to_string(), api_key.to_string());
    if let Some(dataset) = dataset {
        if is_classic_api_key(api_key) {
            headers.insert(DATASET_HEADER.to_string(), dataset.to_string());
        }
    }
    headers.extend(signal.iter().map(|(k, v)| (k.to_ascii_lowercase(), v.clone())));
    headers
}
