// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration module for the Honeycomb SDK.
//!
//! Handles loading, merging, and validation of configuration:
//! - Sources: process environment, explicit maps, JSON/YAML files
//! - Raw config: [`HoneycombConfig`], every field optional
//! - Resolved options: [`HoneycombOptions`], defaults applied and validated
//!
//! ```rust,ignore
//! use honeycomb::config::{HoneycombConfig, OptionsSource};
//!
//! let options = HoneycombConfig::from_source(&OptionsSource::from_env())?.resolve()?;
//! ```

mod loader;
mod merger;
mod types;

pub use loader::*;
pub use merger::runtime_version;
pub use types::{
    ExporterConfig, HoneycombConfig, HoneycombOptions, OtlpProtocol, Signal,
    DEFAULT_API_ENDPOINT, DEFAULT_PROPAGATORS, DEFAULT_SERVICE_NAME, DEFAULT_TIMEOUT,
    DISTRO_NAME, DISTRO_VERSION,
};

use std::path::Path;

use crate::error::ConfigError;

/// Load options from an optional file, overlaid by the process environment.
///
/// Environment variables win over file values.
pub fn load_options(file: Option<&Path>) -> Result<HoneycombOptions, ConfigError> {
    let mut source = match file {
        Some(path) => OptionsSource::from_file(path)?,
        None => OptionsSource::default(),
    };
    source = source.overlay(OptionsSource::from_env());
    HoneycombConfig::from_source(&source)?.resolve()
}
