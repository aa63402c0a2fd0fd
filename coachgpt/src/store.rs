//! Typed access to practice sessions and their messages.
//!
//! Two backends share the [`SessionStore`] trait: [`RemoteStore`] talks to a
//! hosted PostgREST endpoint, [`SqliteStore`] keeps everything in a local file.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod remote;
mod schema;
mod sqlite;

pub use remote::{RemoteStore, StoreConfig};
pub use sqlite::SqliteStore;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Ai,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Ai => "ai",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(MessageRole::User),
            "ai" => Some(MessageRole::Ai),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub scenario: String,
    pub score: i64,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub feedback: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone)]
pub struct NewSession {
    pub user_id: Uuid,
    pub role: String,
    pub scenario: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct NewMessage {
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub feedback: String,
}

#[derive(Serialize, Debug, Clone, Default)]
pub struct SessionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, new: NewSession) -> Result<Session>;

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>>;

    /// Sessions of one user, newest first.
    async fn list_sessions(&self, user_id: Uuid) -> Result<Vec<Session>>;

    /// Applies the given fields and bumps `updated_at`.
    async fn update_session(&self, id: Uuid, update: SessionUpdate) -> Result<Session>;

    async fn append_message(&self, new: NewMessage) -> Result<Message>;

    /// Messages of one session, oldest first.
    async fn list_messages(&self, session_id: Uuid) -> Result<Vec<Message>>;
}
