use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use miette::{miette, Context, IntoDiagnostic, Result};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{
    schema, Message, MessageRole, NewMessage, NewSession, Session, SessionStore, SessionUpdate,
};

const SESSION_COLUMNS: &str =
    "id, user_id, role, scenario, score, completed, created_at, updated_at";
const MESSAGE_COLUMNS: &str = "id, session_id, role, content, feedback, created_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Could not open database at {}", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory().into_diagnostic()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        schema::setup_schema_v0(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn fetch_session(conn: &Connection, id: Uuid) -> Result<Option<Session>> {
        conn.query_row(
            &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
            params![id.to_string()],
            session_from_row,
        )
        .optional()
        .into_diagnostic()
    }
}

fn uuid_column(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn session_from_row(row: &Row) -> rusqlite::Result<Session> {
    Ok(Session {
        id: uuid_column(row, 0)?,
        user_id: uuid_column(row, 1)?,
        role: row.get(2)?,
        scenario: row.get(3)?,
        score: row.get(4)?,
        completed: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn message_from_row(row: &Row) -> rusqlite::Result<Message> {
    let role: String = row.get(2)?;
    let role = MessageRole::parse(&role).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            format!("unknown message role {role:?}").into(),
        )
    })?;

    Ok(Message {
        id: uuid_column(row, 0)?,
        session_id: uuid_column(row, 1)?,
        role,
        content: row.get(3)?,
        feedback: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn create_session(&self, new: NewSession) -> Result<Session> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            role: new.role,
            scenario: new.scenario,
            score: 0,
            completed: false,
            created_at: now,
            updated_at: now,
        };

        self.conn()
            .execute(
                &format!("INSERT INTO sessions ({SESSION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
                params![
                    session.id.to_string(),
                    session.user_id.to_string(),
                    session.role,
                    session.scenario,
                    session.score,
                    session.completed,
                    session.created_at,
                    session.updated_at,
                ],
            )
            .into_diagnostic()
            .wrap_err("Could not insert session")?;

        tracing::debug!(session_id = %session.id, role = %session.role, "created session");
        Ok(session)
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>> {
        Self::fetch_session(&self.conn(), id)
    }

    async fn list_sessions(&self, user_id: Uuid) -> Result<Vec<Session>> {
        let conn = self.conn();
        let mut st = conn
            .prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC"
            ))
            .into_diagnostic()?;
        let sessions = st
            .query_map(params![user_id.to_string()], session_from_row)
            .into_diagnostic()?
            .collect::<rusqlite::Result<Vec<_>>>()
            .into_diagnostic()?;
        Ok(sessions)
    }

    async fn update_session(&self, id: Uuid, update: SessionUpdate) -> Result<Session> {
        let conn = self.conn();
        let changed = conn
            .execute(
                "UPDATE sessions
                    SET score = COALESCE(?1, score),
                        completed = COALESCE(?2, completed),
                        updated_at = ?3
                  WHERE id = ?4",
                params![update.score, update.completed, Utc::now(), id.to_string()],
            )
            .into_diagnostic()
            .wrap_err("Could not update session")?;

        if changed == 0 {
            return Err(miette!("Session {id} not found"));
        }

        Self::fetch_session(&conn, id)?.ok_or_else(|| miette!("Session {id} not found"))
    }

    async fn append_message(&self, new: NewMessage) -> Result<Message> {
        let message = Message {
            id: Uuid::new_v4(),
            session_id: new.session_id,
            role: new.role,
            content: new.content,
            feedback: new.feedback,
            created_at: Utc::now(),
        };

        self.conn()
            .execute(
                &format!("INSERT INTO messages ({MESSAGE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
                params![
                    message.id.to_string(),
                    message.session_id.to_string(),
                    message.role.as_str(),
                    message.content,
                    message.feedback,
                    message.created_at,
                ],
            )
            .into_diagnostic()
            .wrap_err_with(|| format!("Could not append message to session {}", message.session_id))?;

        Ok(message)
    }

    async fn list_messages(&self, session_id: Uuid) -> Result<Vec<Message>> {
        let conn = self.conn();
        let mut st = conn
            .prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE session_id = ?1 ORDER BY created_at, rowid"
            ))
            .into_diagnostic()?;
        let messages = st
            .query_map(params![session_id.to_string()], message_from_row)
            .into_diagnostic()?
            .collect::<rusqlite::Result<Vec<_>>>()
            .into_diagnostic()?;
        Ok(messages)
    }
}
