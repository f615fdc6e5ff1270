//! Bounded session table
//!
//! This module holds the session records, looks them up by id and binds
//! incoming requests to an existing or freshly created session.

use rand::distr::{Alphanumeric, SampleString};
use std::fmt;

/// Length of a generated session id.
pub const SESSION_ID_LENGTH: usize = 16;

/// A server-side record keyed by the id a client presents in its cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// 16 characters from `[A-Za-z0-9]`
    pub id: String,

    /// Placeholder per-user data, `User<n>`
    pub user_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The table already holds `capacity` sessions
    CapacityExceeded { capacity: usize },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::CapacityExceeded { capacity } => {
                write!(f, "session store is full ({} sessions)", capacity)
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// Result of binding a request to a session
#[derive(Debug, Clone)]
pub struct SessionBinding {
    pub session: Session,

    /// True when the session was created for this request and the client
    /// still has to be told about it
    pub created: bool,
}

/// Fixed-capacity session table in creation order
#[derive(Debug)]
pub struct SessionStore {
    sessions: Vec<Session>,
    capacity: usize,
}

impl SessionStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Linear scan on the full id.
    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Creates and stores a new session.
    ///
    /// Fails without touching existing entries once the table is full.
    pub fn create(&mut self) -> Result<&Session, SessionError> {
        if self.sessions.len() >= self.capacity {
            tracing::warn!(capacity = self.capacity, "Session store is full");
            return Err(SessionError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        let id = self.unused_id();
        let user_data = format!("User{}", self.sessions.len() + 1);
        tracing::debug!(session = %id, user = %user_data, "Session created");

        let index = self.sessions.len();
        self.sessions.push(Session { id, user_data });
        Ok(&self.sessions[index])
    }

    /// Reuses the session named by `presented`, or creates a new one.
    pub fn bind(&mut self, presented: Option<&str>) -> Result<SessionBinding, SessionError> {
        if let Some(session) = presented.and_then(|id| self.get(id)) {
            return Ok(SessionBinding {
                session: session.clone(),
                created: false,
            });
        }

        let session = self.create()?.clone();
        Ok(SessionBinding {
            session,
            created: true,
        })
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // Ids already handed out are skipped
    fn unused_id(&self) -> String {
        loop {
            let id = generate_session_id();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }
}

/// Draws a fresh id uniformly from the 62-character alphanumeric alphabet.
pub fn generate_session_id() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), SESSION_ID_LENGTH)
}

/// `Set-Cookie` value announcing `session` under `cookie_name`.
pub fn set_cookie_value(cookie_name: &str, session: &Session) -> String {
    format!("{}={}; Path=/; HttpOnly", cookie_name, session.id)
}
