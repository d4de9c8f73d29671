// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Honeycomb OpenTelemetry distribution for client applications.
//!
//! Wraps the OpenTelemetry SDK with what a client-side app needs on top of plain
//! tracing: a durable user session stamped on every span and log record, span
//! enrichment from ambient state, and OTLP export to Honeycomb with optional
//! offline caching.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`config`] - Option sources, raw configuration and validated options
//! - [`error`] - Error types and result aliases
//! - [`session`] - Session storage, expiry and rotation
//! - [`processor`] - Span enrichers and the composite span processor
//! - [`sampler`] - Deterministic one-in-N sampling
//! - [`exporter`] - Endpoint/header resolution and OTLP exporter construction
//! - [`telemetry`] - The SDK's own diagnostic logging
//! - [`honeycomb`] - Composition root tying the above into running providers
//!
//! # Example
//!
//! ```rust,ignore
//! use honeycomb::config::{HoneycombConfig, OptionsSource};
//! use honeycomb::Honeycomb;
//!
//! let options = HoneycombConfig::from_source(&OptionsSource::from_env())?.resolve()?;
//! let sdk = Honeycomb::configure(options)?;
//!
//! sdk.set_current_screen("/home");
//! println!("session {}", sdk.session_id());
//! ```

pub mod config;
pub mod error;
pub mod exporter;
pub mod honeycomb;
pub mod processor;
pub mod sampler;
pub mod session;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use config::{HoneycombConfig, HoneycombOptions, OptionsSource};
pub use error::{ConfigError, HoneycombError, Result};
pub use honeycomb::{Exporters, Honeycomb};
pub use session::{SessionEvent, SessionManager, SessionObserver, SESSION_ID_KEY};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
