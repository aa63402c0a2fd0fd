use miette::{IntoDiagnostic, Result};
use rusqlite::Connection;

pub(crate) fn setup_schema_v0(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .into_diagnostic()?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS sessions (
                  id                    TEXT PRIMARY KEY NOT NULL,
                  user_id               TEXT NOT NULL,
                  role                  TEXT NOT NULL,
                  scenario              TEXT NOT NULL,
                  score                 INTEGER NOT NULL DEFAULT 0,
                  completed             INTEGER NOT NULL DEFAULT 0,
                  created_at            TEXT NOT NULL,
                  updated_at            TEXT NOT NULL
                  )",
        (),
    )
    .into_diagnostic()?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS messages (
                  id                    TEXT PRIMARY KEY NOT NULL,
                  session_id            TEXT NOT NULL REFERENCES sessions (id),
                  role                  TEXT NOT NULL CHECK (role IN ('user', 'ai')),
                  content               TEXT NOT NULL,
                  feedback              TEXT NOT NULL DEFAULT '',
                  created_at            TEXT NOT NULL
                  )",
        (),
    )
    .into_diagnostic()?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS index_sessions_user on sessions (user_id);",
        (),
    )
    .into_diagnostic()?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS index_messages_session on messages (session_id);",
        (),
    )
    .into_diagnostic()?;

    Ok(())
}
