// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Static device attributes, captured once.

use opentelemetry::{Context, KeyValue};

use super::{AttributeSink, SpanEnricher};

/// A snapshot of the host device.
///
/// Fields the platform cannot report are left unset and skipped on spans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    /// `os.type`, e.g. `linux`
    pub os_type: Option<String>,
    /// `os.name`, e.g. `Ubuntu`
    pub os_name: Option<String>,
    /// `os.version`
    pub os_version: Option<String>,
    /// `host.arch`, e.g. `x86_64`
    pub arch: Option<String>,
    /// `device.model.identifier`
    pub model_identifier: Option<String>,
    /// `device.manufacturer`
    pub manufacturer: Option<String>,
}

impl DeviceInfo {
    /// Detect what the standard library and environment can tell us.
    pub fn detect() -> Self {
        Self {
            os_type: Some(std::env::consts::OS.to_string()),
            os_name: os_release_field("NAME"),
            os_version: os_release_field("VERSION_ID"),
            arch: Some(std::env::consts::ARCH.to_string()),
            model_identifier: None,
            manufacturer: None,
        }
    }

    /// Attributes for every known field.
    pub fn attributes(&self) -> Vec<KeyValue> {
        [
            ("os.type", &self.os_type),
            ("os.name", &self.os_name),
            ("os.version", &self.os_version),
            ("host.arch", &self.arch),
            ("device.model.identifier", &self.model_identifier),
            ("device.manufacturer", &self.manufacturer),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| KeyValue::new(key, v.clone())))
        .collect()
    }
}

#[cfg(target_os = "linux")]
fn os_release_field(field: &str) -> Option<String> {
    let content = std::fs::read_to_string("/etc/os-release").ok()?;
    parse_os_release(&content, field)
}

#[cfg(not(target_os = "linux"))]
fn os_release_field(_field: &str) -> Option<String> {
    None
}

#[cfg_attr(not(any(test, target_os = "linux")), allow(dead_code))]
fn parse_os_release(content: &str, field: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let (key, value) = line.split_once('=')?;
        (key.trim() == field).then(|| value.trim().trim_matches('"').to_string())
    })
}

/// Writes the device snapshot onto every span.
#[derive(Debug, Clone)]
pub struct DeviceInfoEnricher {
    attributes: Vec<KeyValue>,
}

impl DeviceInfoEnricher {
    pub fn new(info: DeviceInfo) -> Self {
        Self {
            attributes: info.attributes(),
        }
    }
}

impl Default for DeviceInfoEnricher {
    fn default() -> Self {
        Self::new(DeviceInfo::detect())
    }
}

impl SpanEnricher for DeviceInfoEnricher {
    fn is_start_required(&self) -> bool {
        !self.attributes.is_empty()
    }

    fn is_end_required(&self) -> bool {
        false
    }

    fn on_start(&self, span: &mut dyn AttributeSink, _cx: &Context) {
        for attribute in &self.attributes {
            span.set_attribute(attribute.clone());
        }
    }
}
