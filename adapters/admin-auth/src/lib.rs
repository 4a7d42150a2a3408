//! admin-auth: credential check and server-side sessions for the admin area.
//!
//! Purpose
//! - Decide whether a request carries an authenticated admin identity.
//! - `AuthGate::login(username, password, now)` checks the configured admin
//!   credentials and opens a session, returning its opaque id (sent to the
//!   browser as a cookie by the app).
//! - `AuthGate::current_user(session_id, now)` resolves a session id back to
//!   the admin, or `None` once the session has expired or was logged out.
//!
//! Notes
//! - Sessions live in process memory only and do not survive restarts.
//! - Session lifetime is fixed from login; activity does not extend it.
//! - Time is passed in by the caller so expiry is testable.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUser {
    pub username: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing username or password")]
    MissingCredentials,
    #[error("wrong username or password")]
    BadCredentials,
    #[error("session store unavailable")]
    Store,
}

/// The single admin account the site accepts.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Check a submitted username/password pair.
    pub fn verify(&self, username: &str, password: &str) -> Result<AdminUser, AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        // Evaluate both comparisons so timing does not reveal which one failed
        let user_ok = constant_time_eq(username.as_bytes(), self.username.as_bytes());
        let pass_ok = constant_time_eq(password.as_bytes(), self.password.as_bytes());
        if user_ok & pass_ok {
            Ok(AdminUser {
                username: self.username.clone(),
            })
        } else {
            Err(AuthError::BadCredentials)
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

struct Session {
    user: AdminUser,
    expires_at: SystemTime,
}

/// In-memory session table with a fixed time-to-live.
pub struct SessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Open a session for `user`, returning its id.
    pub fn create(&self, user: AdminUser, now: SystemTime) -> Result<String, AuthError> {
        let id = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.lock().map_err(|_| AuthError::Store)?;
        // Opportunistic cleanup keeps the table from growing without bound
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(
            id.clone(),
            Session {
                user,
                expires_at: now + self.ttl,
            },
        );
        Ok(id)
    }

    /// Resolve a session id. Expired sessions are dropped on sight.
    pub fn get(&self, id: &str, now: SystemTime) -> Option<AdminUser> {
        let mut sessions = self.sessions.lock().ok()?;
        let expired = match sessions.get(id) {
            Some(s) if s.expires_at > now => return Some(s.user.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            debug!("session expired");
            sessions.remove(id);
        }
        None
    }

    pub fn remove(&self, id: &str) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.remove(id);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Credentials plus sessions: the admin gate as seen by the web layer.
pub struct AuthGate {
    credentials: Credentials,
    sessions: SessionStore,
}

impl AuthGate {
    pub fn new(credentials: Credentials, session_ttl: Duration) -> Self {
        Self {
            credentials,
            sessions: SessionStore::new(session_ttl),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.sessions.ttl()
    }

    /// Verify credentials and open a session.
    pub fn login(
        &self,
        username: &str,
        password: &str,
        now: SystemTime,
    ) -> Result<String, AuthError> {
        match self.credentials.verify(username, password) {
            Ok(user) => self.sessions.create(user, now),
            Err(e) => {
                warn!(err = %e, "login rejected");
                Err(e)
            }
        }
    }

    pub fn current_user(&self, session_id: Option<&str>, now: SystemTime) -> Option<AdminUser> {
        session_id.and_then(|id| self.sessions.get(id, now))
    }

    pub fn is_authenticated(&self, session_id: Option<&str>, now: SystemTime) -> bool {
        self.current_user(session_id, now).is_some()
    }

    pub fn logout(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }
}
