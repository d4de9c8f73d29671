// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Current navigation path, recorded by UI instrumentation and read by spans.

use std::sync::{Arc, RwLock};

use opentelemetry::{Context, KeyValue};
use serde::Serialize;

use super::{AttributeSink, SpanEnricher};

/// Span attribute holding the navigation path active when the span started.
pub const CURRENT_NAVIGATION_PATH_KEY: &str = "CurrentNavigationPath";

/// Recorded when a structured path cannot be serialized.
pub const UNENCODABLE_PATH: &str = "<unencodable path>";

/// Shared, last-write-wins holder for the current navigation path.
#[derive(Debug, Clone, Default)]
pub struct NavigationState {
    current: Arc<RwLock<Option<String>>>,
}

impl NavigationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_current_path(&self, path: impl Into<String>) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(path.into());
    }

    pub fn current_path(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn clear(&self) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

/// Render a structured navigation path as compact JSON.
pub fn encode_navigation_path<T: Serialize + ?Sized>(path: &T) -> String {
    serde_json::to_string(path).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Navigation path is not serializable");
        UNENCODABLE_PATH.to_string()
    })
}

/// Sets `CurrentNavigationPath` when a path has been recorded.
#[derive(Debug, Clone)]
pub struct NavigationPathEnricher {
    state: NavigationState,
}

impl NavigationPathEnricher {
    pub fn new(state: NavigationState) -> Self {
        Self { state }
    }
}

impl SpanEnricher for NavigationPathEnricher {
    fn is_start_required(&self) -> bool {
        true
    }

    fn is_end_required(&self) -> bool {
        false
    }

    fn on_start(&self, span: &mut dyn AttributeSink, _cx: &Context) {
        if let Some(path) = self.state.current_path() {
            span.set_attribute(KeyValue::new(CURRENT_NAVIGATION_PATH_KEY, path));
        }
    }
}
