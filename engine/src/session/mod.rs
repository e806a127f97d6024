//! Per-user conversation sessions
//!
//! Every user owns one [`Session`]: the system instruction as turn 0 followed
//! by a bounded window of user and assistant turns. When the window overflows,
//! the oldest non-system turns are evicted first.
//!
//! Sessions live in a [`DashMap`] and are never held across an `.await`;
//! readers get clones. Sessions are process-local and do not survive a
//! restart.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::SessionConfig;
use crate::llm::{Role, Turn};

/// Platform user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// One user's conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,

    /// `messages[0]` is always the system turn
    pub messages: Vec<Turn>,
}

impl Session {
    fn seeded(user_id: UserId, system_prompt: &str) -> Self {
        Self {
            user_id,
            messages: vec![Turn::system(system_prompt)],
        }
    }

    /// Turns after the system instruction
    pub fn history(&self) -> &[Turn] {
        self.messages.get(1..).unwrap_or_default()
    }
}

/// Concurrent map of sessions keyed by user
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<UserId, Session>,
    system_prompt: String,
    max_history: usize,
}

impl SessionStore {
    pub fn new(system_prompt: impl Into<String>, max_history: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            system_prompt: system_prompt.into(),
            max_history: max_history.max(1),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.system_prompt.clone(), config.max_history)
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Return the user's session, creating a seeded one if absent
    pub fn get_or_create(&self, user_id: UserId) -> Session {
        self.sessions
            .entry(user_id)
            .or_insert_with(|| {
                tracing::debug!(%user_id, "Creating session");
                Session::seeded(user_id, &self.system_prompt)
            })
            .clone()
    }

    /// Append a turn, evicting the oldest non-system turns on overflow
    ///
    /// Returns the number of non-system turns retained afterwards.
    pub fn append(&self, user_id: UserId, role: Role, content: impl Into<String>) -> usize {
        let mut entry = self
            .sessions
            .entry(user_id)
            .or_insert_with(|| Session::seeded(user_id, &self.system_prompt));

        let messages = &mut entry.messages;
        messages.push(Turn::new(role, content));

        let cap = self.max_history + 1;
        if messages.len() > cap {
            let excess = messages.len() - cap;
            messages.drain(1..1 + excess);
            tracing::debug!(%user_id, evicted = excess, "Trimmed session history");
        }

        messages.len() - 1
    }

    /// Discard all turns except a fresh system instruction
    pub fn reset(&self, user_id: UserId) {
        self.sessions
            .insert(user_id, Session::seeded(user_id, &self.system_prompt));
        tracing::info!(%user_id, "Session reset");
    }

    /// Clone of the user's session, if one exists
    pub fn snapshot(&self, user_id: UserId) -> Option<Session> {
        self.sessions.get(&user_id).map(|s| s.value().clone())
    }

    /// Number of users with a session
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
