// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Session lifecycle: creation, expiry-driven rotation and persistence.
//!
//! Expiry is checked on access rather than by a timer. A session can sit expired
//! for as long as nothing asks for its id; the next caller rotates it inline.

use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

use tracing::{debug, info};

use super::storage::SessionStorage;
use super::types::{
    default_id_generator, system_clock, ClockFn, IdGeneratorFn, Session, SessionId,
};

/// Default session lifetime (4 hours).
pub const DEFAULT_SESSION_LIFETIME: Duration = Duration::from_secs(4 * 60 * 60);

/// A session transition delivered to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new session became current.
    Started {
        session: Session,
        previous: Option<Session>,
    },
    /// A session was superseded.
    Ended { session: Session },
}

/// Receives session transitions synchronously on the thread that caused them.
pub trait SessionObserver: Send + Sync {
    fn on_session_event(&self, event: &SessionEvent);
}

impl<F> SessionObserver for F
where
    F: Fn(&SessionEvent) + Send + Sync,
{
    fn on_session_event(&self, event: &SessionEvent) {
        self(event)
    }
}

/// Session manager settings.
#[derive(Debug, Clone)]
pub struct SessionManagerConfig {
    /// How long a session lives, measured from its start.
    pub session_lifetime: Duration,
    /// Log every transition at info level.
    pub debug: bool,
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self {
            session_lifetime: DEFAULT_SESSION_LIFETIME,
            debug: false,
        }
    }
}

/// Owns the current session and rotates it when it expires.
///
/// The check-rotate-persist sequence runs under a single lock, so concurrent
/// callers racing on an expired session produce exactly one rotation.
pub struct SessionManager {
    storage: Arc<dyn SessionStorage>,
    current: Mutex<Option<Session>>,
    config: SessionManagerConfig,
    id_generator: IdGeneratorFn,
    clock: ClockFn,
    observers: RwLock<Vec<Arc<dyn SessionObserver>>>,
}

impl SessionManager {
    /// Create a manager, adopting any session already persisted in `storage`.
    pub fn new(storage: Arc<dyn SessionStorage>, config: SessionManagerConfig) -> Self {
        let current = storage.read();
        if let Some(ref session) = current {
            debug!(session.id = %session.id, "Restored persisted session");
        }

        Self {
            storage,
            current: Mutex::new(current),
            config,
            id_generator: default_id_generator(),
            clock: system_clock(),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Replace the session id generator.
    pub fn with_id_generator(mut self, id_generator: IdGeneratorFn) -> Self {
        self.id_generator = id_generator;
        self
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: ClockFn) -> Self {
        self.clock = clock;
        self
    }

    /// Configured session lifetime.
    pub fn session_lifetime(&self) -> Duration {
        self.config.session_lifetime
    }

    /// Register an observer for session transitions.
    pub fn subscribe(&self, observer: Arc<dyn SessionObserver>) {
        self.observers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(observer);
    }

    /// Return the current session id, starting or rotating the session first if needed.
    ///
    /// Not a pure read: it may create a session, persist it and notify observers
    /// (`Started` before `Ended`) before returning.
    pub fn get_or_rotate_session_id(&self) -> SessionId {
        self.get_or_rotate_session().id
    }

    /// Like [`get_or_rotate_session_id`](Self::get_or_rotate_session_id) but returns the whole session.
    pub fn get_or_rotate_session(&self) -> Session {
        let (session, events) = {
            let mut current = self.lock_current();
            let now = (self.clock)();
            let mut events = Vec::new();

            let session = match current.take() {
                Some(existing) if !existing.is_expired(now, self.config.session_lifetime) => existing,
                Some(expired) => {
                    self.log_transition(format_args!(
                        "Session timeout after {:?} elapsed, creating new session",
                        self.config.session_lifetime
                    ));
                    let session = Session::new((self.id_generator)(), now);
                    events.push(SessionEvent::Started {
                        session: session.clone(),
                        previous: Some(expired.clone()),
                    });
                    events.push(SessionEvent::Ended { session: expired });
                    session
                }
                None => {
                    self.log_transition(format_args!("No active session, creating session"));
                    let session = Session::new((self.id_generator)(), now);
                    events.push(SessionEvent::Started {
                        session: session.clone(),
                        previous: None,
                    });
                    session
                }
            };

            *current = Some(session.clone());
            self.storage.save(&session);
            (session, events)
        };

        self.notify(&events);
        session
    }

    /// Current session without rotating or persisting.
    pub fn peek(&self) -> Option<Session> {
        self.lock_current().clone()
    }

    /// Forget the current session in memory and in storage.
    ///
    /// The next access starts a fresh session with no previous session.
    pub fn clear(&self) {
        let mut current = self.lock_current();
        *current = None;
        self.storage.clear();
    }

    fn lock_current(&self) -> MutexGuard<'_, Option<Session>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn log_transition(&self, message: std::fmt::Arguments<'_>) {
        if self.config.debug {
            info!("SessionManager: {}", message);
        } else {
            debug!("SessionManager: {}", message);
        }
    }

    fn notify(&self, events: &[SessionEvent]) {
        if events.is_empty() {
            return;
        }
        let observers = self
            .observers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        for event in events {
            if self.config.debug {
                info!(?event, "SessionManager: session transition");
            }
            for observer in &observers {
                observer.on_session_event(event);
            }
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("current", &self.peek())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
