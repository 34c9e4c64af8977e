//! Server-side sessions.
//!
//! The client only ever holds a session id inside a private cookie; the
//! identity it maps to lives in a [`SessionStore`] managed by Rocket.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::external::Identity;

mod generate;
mod guard;

pub use guard::*;

/// Name of the private cookie carrying the session id.
pub const SESSION_COOKIE: &str = "session_id";

pub type SharedSessions = Arc<dyn SessionStore>;

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct SessionId(String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How long sessions stay valid and how many the store keeps at once.
/// When the store is full the oldest session is evicted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionPolicy {
    pub ttl: Duration,
    pub max_sessions: usize,
}

impl SessionPolicy {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
    pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

    pub fn expiring_after(ttl: Duration) -> Self {
        Self {
            ttl,
            ..Self::default()
        }
    }

    pub fn with_max_sessions(self, max_sessions: usize) -> Self {
        Self {
            max_sessions,
            ..self
        }
    }
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            ttl: Self::DEFAULT_TTL,
            max_sessions: Self::DEFAULT_MAX_SESSIONS,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Session {
    pub id: SessionId,
    pub user: Identity,
    pub created_at: Instant,
    pub expires_at: Instant,
}

impl Session {
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

#[rocket::async_trait]
pub trait SessionStore: Send + Sync {
    fn policy(&self) -> SessionPolicy;

    /// Starts a new session for `user` under a fresh id.
    async fn create(&self, user: Identity) -> Session;

    /// Looks up a live session. Expired sessions are dropped and reported as absent.
    async fn get(&self, id: &SessionId) -> Option<Session>;

    /// Ends a session. Returns whether it existed.
    async fn invalidate(&self, id: &SessionId) -> bool;

    /// Drops every expired session and returns how many were removed.
    async fn purge_expired(&self) -> usize;

    /// Number of sessions currently held, expired ones included until purged.
    async fn len(&self) -> usize;
}

#[derive(Default)]
pub struct MemorySessionStore {
    policy: SessionPolicy,
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl MemorySessionStore {
    pub fn new(policy: SessionPolicy) -> Self {
        Self {
            policy,
            sessions: RwLock::default(),
        }
    }
}

#[rocket::async_trait]
impl SessionStore for MemorySessionStore {
    fn policy(&self) -> SessionPolicy {
        self.policy
    }

    async fn create(&self, user: Identity) -> Session {
        let created_at = Instant::now();
        let session = Session {
            id: SessionId::generate(),
            user,
            created_at,
            expires_at: created_at + self.policy.ttl,
        };

        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.policy.max_sessions {
            sessions.retain(|_, session| !session.is_expired(created_at));
        }
        while sessions.len() >= self.policy.max_sessions.max(1) {
            let oldest = sessions
                .values()
                .min_by_key(|session| session.created_at)
                .map(|session| session.id.clone());
            match oldest {
                Some(oldest) => {
                    sessions.remove(&oldest);
                }
                None => break,
            }
        }
        sessions.insert(session.id.clone(), session.clone());
        session
    }

    async fn get(&self, id: &SessionId) -> Option<Session> {
        let session = self.sessions.read().await.get(id).cloned()?;
        if session.is_expired(Instant::now()) {
            self.sessions.write().await.remove(id);
            return None;
        }
        Some(session)
    }

    async fn invalidate(&self, id: &SessionId) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now));
        before - sessions.len()
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
