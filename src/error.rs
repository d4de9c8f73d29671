// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for the Honeycomb SDK.
//!
//! Configuration problems are the only failures a host application ever sees:
//! they abort [`Honeycomb::configure`](crate::Honeycomb::configure) before anything
//! is registered. Runtime problems (storage, offline spool, missing ambient state)
//! are logged through `tracing` and swallowed where they happen.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing API key: {0}")]
    MissingApiKey(String),

    #[error("Malformed URL for {option}: {url}")]
    MalformedUrl { option: String, url: String },

    #[error("Unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("Unsupported exporter {exporter} for {key}")]
    UnsupportedExporter { key: String, exporter: String },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Invalid header {name}: {message}")]
    InvalidHeader { name: String, message: String },

    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("IO error reading config: {0}")]
    IoError(String),

    #[error("YAML parsing error: {0}")]
    YamlError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(String),
}

impl ConfigError {
    /// Create an invalid-value error for a named option.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            _ => Self::IoError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::YamlError(err.to_string())
    }
}

/// Errors surfaced by the SDK composition root.
#[derive(Error, Debug)]
pub enum HoneycombError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to build {signal} exporter: {reason}")]
    ExporterBuild { signal: String, reason: String },

    #[error("The gRPC {0} exporter requires a running Tokio runtime")]
    RuntimeRequired(String),

    #[error("Honeycomb has already been configured in this process")]
    AlreadyConfigured,

    #[error("Flush did not complete within {0:?}")]
    FlushTimeout(Duration),

    #[error("Shutdown failed: {0}")]
    Shutdown(String),
}

impl HoneycombError {
    /// Check if this error was caused by invalid configuration.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::ExporterBuild { .. } | Self::RuntimeRequired(_)
        )
    }
}

/// Errors from the session persistence layer.
///
/// These never leave the session module: the manager logs them and carries on.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Stored session corrupted: {0}")]
    Corrupted(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Corrupted(err.to_string())
    }
}

/// Result type alias using anyhow for flexible error handling.
pub type Result<T> = anyhow::Result<T>;
