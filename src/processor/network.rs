// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Network connectivity attributes.
//!
//! The host application (or a platform reachability hook) reports changes into a
//! [`SharedNetworkMonitor`]; spans read the latest snapshot without touching the
//! network stack.

use std::fmt::Debug;
use std::sync::{Arc, RwLock};

use opentelemetry::{Context, KeyValue};
use serde::{Deserialize, Serialize};

use super::{AttributeSink, SpanEnricher};

/// Kind of connection, following the `network.connection.type` semantic convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Wifi,
    Wired,
    Cell,
    Unavailable,
    #[default]
    Unknown,
}

impl ConnectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wifi => "wifi",
            Self::Wired => "wired",
            Self::Cell => "cell",
            Self::Unavailable => "unavailable",
            Self::Unknown => "unknown",
        }
    }
}

/// A point-in-time connectivity snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStatus {
    pub connection_type: ConnectionType,
    /// Radio technology for cellular connections, e.g. `lte`.
    pub connection_subtype: Option<String>,
    pub carrier_name: Option<String>,
    pub carrier_icc: Option<String>,
}

impl NetworkStatus {
    pub fn new(connection_type: ConnectionType) -> Self {
        Self {
            connection_type,
            ..Default::default()
        }
    }

    fn attributes(&self) -> Vec<KeyValue> {
        if self.connection_type == ConnectionType::Unknown {
            return Vec::new();
        }
        let mut attributes = vec![KeyValue::new(
            "network.connection.type",
            self.connection_type.as_str(),
        )];
        let optional = [
            ("network.connection.subtype", &self.connection_subtype),
            ("network.carrier.name", &self.carrier_name),
            ("network.carrier.icc", &self.carrier_icc),
        ];
        attributes.extend(
            optional
                .into_iter()
                .filter_map(|(key, value)| value.as_ref().map(|v| KeyValue::new(key, v.clone()))),
        );
        attributes
    }
}

/// Source of connectivity snapshots.
pub trait NetworkMonitor: Send + Sync + Debug {
    fn current_status(&self) -> NetworkStatus;
}

/// Monitor whose status is pushed in by whoever observes connectivity changes.
#[derive(Debug, Clone, Default)]
pub struct SharedNetworkMonitor {
    status: Arc<RwLock<NetworkStatus>>,
}

impl SharedNetworkMonitor {
    pub fn new(initial: NetworkStatus) -> Self {
        Self {
            status: Arc::new(RwLock::new(initial)),
        }
    }

    /// Record a connectivity change.
    pub fn update(&self, status: NetworkStatus) {
        *self.status.write().unwrap_or_else(|e| e.into_inner()) = status;
    }
}

impl NetworkMonitor for SharedNetworkMonitor {
    fn current_status(&self) -> NetworkStatus {
        self.status
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Writes connectivity attributes when the status is known.
#[derive(Debug, Clone)]
pub struct NetworkStatusEnricher {
    monitor: Arc<dyn NetworkMonitor>,
}

impl NetworkStatusEnricher {
    pub fn new(monitor: Arc<dyn NetworkMonitor>) -> Self {
        Self { monitor }
    }
}

impl SpanEnricher for NetworkStatusEnricher {
    fn is_start_required(&self) -> bool {
        true
    }

    fn is_end_required(&self) -> bool {
        false
    }

    fn on_start(&self, span: &mut dyn AttributeSink, _cx: &Context) {
        for attribute in self.monitor.current_status().attributes() {
            span.set_attribute(attribute);
        }
    }
}
