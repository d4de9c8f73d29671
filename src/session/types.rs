// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Session types shared by the manager, storage and observers.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use opentelemetry_sdk::trace::{IdGenerator, RandomIdGenerator};
use serde::{Deserialize, Serialize};

/// Session identifier (32 lowercase hex characters by default).
pub type SessionId = String;

/// Key under which the session id is persisted and attached to telemetry.
pub const SESSION_ID_KEY: &str = "session.id";

/// Key under which the session start time is persisted.
pub const SESSION_START_TIME_KEY: &str = "session.startTime";

/// A bounded period of application usage, correlating many spans and logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier.
    #[serde(rename = "session.id")]
    pub id: SessionId,
    /// When the session started.
    #[serde(rename = "session.startTime")]
    pub start_timestamp: DateTime<Utc>,
}

impl Session {
    /// Create a session with an explicit id and start time.
    pub fn new(id: impl Into<SessionId>, start_timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            start_timestamp,
        }
    }

    /// Time elapsed between the session start and `now`.
    ///
    /// Saturates at zero if the clock went backwards.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        (now - self.start_timestamp).to_std().unwrap_or(Duration::ZERO)
    }

    /// Whether the session has outlived `lifetime` at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, lifetime: Duration) -> bool {
        self.elapsed(now) >= lifetime
    }
}

/// Produces new session identifiers.
pub type IdGeneratorFn = Arc<dyn Fn() -> SessionId + Send + Sync>;

/// Supplies the current instant.
pub type ClockFn = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Default identifier: a random 128-bit trace id rendered as hex.
pub fn generate_session_id() -> SessionId {
    RandomIdGenerator::default().new_trace_id().to_string()
}

/// Default generator wrapping [`generate_session_id`].
pub fn default_id_generator() -> IdGeneratorFn {
    Arc::new(generate_session_id)
}

/// Default clock backed by the system time.
pub fn system_clock() -> ClockFn {
    Arc::new(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_id_is_128_bit_hex() {
        let id = generate_session_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, "0".repeat(32));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = generate_session_id();
        let b = generate_session_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_session_expiry_boundary() {
        let start = Utc::now();
        let session = Session::new("abc", start);
        let lifetime = Duration::from_secs(60);

        assert!(!session.is_expired(start + chrono::Duration::seconds(59), lifetime));
        assert!(session.is_expired(start + chrono::Duration::seconds(60), lifetime));
    }

    #[test]
    fn test_elapsed_saturates_when_clock_goes_backwards() {
        let start = Utc::now();
        let session = Session::new("abc", start);
        assert_eq!(session.elapsed(start - chrono::Duration::seconds(5)), Duration::ZERO);
    }

    #[test]
    fn test_session_serde_uses_reserved_keys() {
        let session = Session::new("abc", Utc::now());
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json[SESSION_ID_KEY], "abc");
        assert!(json.get(SESSION_START_TIME_KEY).is_some());

        let parsed: Session = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, session);
    }
}
