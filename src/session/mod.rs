// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Session tracking shared by every span and log record the SDK emits.
//!
//! - **Types**: Session, id generator and clock strategies
//! - **Storage**: durable (file) or in-memory persistence of the current session
//! - **Manager**: expiry-driven rotation and session transition events
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   SessionManager                     │
//! │  get_or_rotate_session_id(): check → rotate → persist│
//! └──────────────────────────────────────────────────────┘
//!          │                    │                 │
//!          ▼                    ▼                 ▼
//! ┌─────────────────┐  ┌────────────────┐  ┌──────────────────┐
//! │ SessionStorage  │  │ clock / id gen │  │ SessionObserver  │
//! │ (file, memory)  │  │  (injectable)  │  │ (Started, Ended) │
//! └─────────────────┘  └────────────────┘  └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use honeycomb::session::{InMemorySessionStorage, SessionManager, SessionManagerConfig};
//!
//! let manager = SessionManager::new(
//!     Arc::new(InMemorySessionStorage::new()),
//!     SessionManagerConfig::default(),
//! );
//! let id = manager.get_or_rotate_session_id();
//! ```

pub mod manager;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use manager::{
    SessionEvent, SessionManager, SessionManagerConfig, SessionObserver, DEFAULT_SESSION_LIFETIME,
};
pub use storage::{FileSessionStorage, InMemorySessionStorage, SessionStorage};
pub use types::{
    default_id_generator, generate_session_id, system_clock, ClockFn, IdGeneratorFn, Session,
    SessionId, SESSION_ID_KEY, SESSION_START_TIME_KEY,
};
