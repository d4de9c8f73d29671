// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! honeycomb-smoke - end-to-end check of an SDK configuration.
//!
//! Configures the SDK, sends a small fixed batch of telemetry and flushes it.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use opentelemetry::baggage::BaggageExt;
use opentelemetry::trace::{Span as _, TraceContextExt, Tracer as _};
use opentelemetry::{global, Context, KeyValue};

use honeycomb::config;
use honeycomb::telemetry::{init_logging, LoggingConfig};
use honeycomb::Honeycomb;

/// Send a test batch of telemetry using the current Honeycomb configuration.
#[derive(Parser)]
#[command(name = "honeycomb-smoke")]
#[command(author, version, long_about = None)]
struct Cli {
    /// JSON or YAML file of options; environment variables override it
    #[arg(short, long, env = "HONEYCOMB_CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Navigation path to report
    #[arg(long, default_value = "/smoke")]
    screen: String,

    /// Seconds to wait for the final flush
    #[arg(long, default_value_t = 10)]
    flush_timeout: u64,

    /// Print the resolved options and exit without sending anything
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, thiserror::Error)]
#[error("smoke test error (intentional)")]
struct SmokeError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = config::load_options(cli.config.as_deref())
        .context("Failed to load Honeycomb options")?;

    let _guard = init_logging(&LoggingConfig::for_debug_flag(options.debug))?;

    if cli.dry_run {
        println!("{:#?}", options);
        return Ok(());
    }

    let sdk = Honeycomb::configure(options).context("Failed to configure Honeycomb")?;

    send_spans();
    sdk.set_current_screen(cli.screen);
    sdk.log_error(
        &SmokeError,
        [("smoke.step", "log_error")],
        std::thread::current().name(),
    );

    let timeout = Duration::from_secs(cli.flush_timeout);
    sdk.flush(timeout).context("Flush did not finish")?;

    println!("session.id: {}", sdk.session_id());

    sdk.shutdown(timeout)?;
    Ok(())
}

fn send_spans() {
    let tracer = global::tracer("honeycomb-smoke");
    let cx = Context::current_with_baggage(vec![KeyValue::new(
        "smoke.run",
        uuid::Uuid::new_v4().to_string(),
    )]);
    let _attached = cx.attach();

    tracer.in_span("smoke-parent", |cx| {
        let mut child = tracer.start_with_context("smoke-child", &cx);
        child.set_attribute(KeyValue::new("smoke.depth", 1_i64));
        child.end();
        cx.span().add_event("child finished", vec![]);
    });
}
