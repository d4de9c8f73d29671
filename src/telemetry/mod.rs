// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! SDK self-diagnostics.
//!
//! The SDK never surfaces runtime failures to the host application; it logs them
//! through `tracing` instead:
//!
//! - **debug**: storage misses, spool activity, enricher skips
//! - **warn**: offline cache unavailable, unknown propagators
//! - **info**: configuration complete
//!
//! Initialize a subscriber at startup if the host does not already have one:
//!
//! ```rust,ignore
//! use honeycomb::telemetry::{init_logging, LoggingConfig};
//!
//! let _guard = init_logging(&LoggingConfig::default())?;
//! ```

mod init;

pub use init::{init_logging, LoggingConfig, LoggingGuard};
