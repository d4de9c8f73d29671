// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! OTLP exporter resolution and construction.
//!
//! - **Resolve**: per-signal endpoint and header computation
//! - **Build**: gRPC / HTTP exporters for traces, metrics and logs
//! - **Persistence**: offline spooling of undeliverable HTTP payloads

mod build;
mod persistence;
mod resolve;

pub use build::{
    build_log_exporter, build_metric_exporter, build_span_exporter, export_client, ExportClient,
    OfflineCaching,
};
pub use persistence::{
    default_spool_dir, spool_dir_in, BlockingHttpClient, PersistentHttpClient, Spool,
    DEFAULT_MAX_SPOOLED,
};
pub use resolve::{
    get_headers, is_classic_api_key, resolve_endpoint, DATASET_HEADER, OTLP_VERSION_HEADER,
    TEAM_HEADER,
};
