use async_trait::async_trait;
use miette::{miette, Context, IntoDiagnostic, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::{Message, NewMessage, NewSession, Session, SessionStore, SessionUpdate};
use crate::APP_USER_AGENT;

const SESSIONS: &str = "sessions";
const MESSAGES: &str = "messages";

#[derive(Debug, Clone)]
pub struct StoreConfig {
    url: String,
    anon_key: String,
}

impl StoreConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
        }
    }

    /// Reads `SUPABASE_URL` and `SUPABASE_ANON_KEY`; both are required.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("SUPABASE_URL").ok().filter(|v| !v.is_empty());
        let anon_key = std::env::var("SUPABASE_ANON_KEY").ok().filter(|v| !v.is_empty());

        match (url, anon_key) {
            (Some(url), Some(anon_key)) => Ok(Self::new(url, anon_key)),
            _ => Err(miette!("Missing Supabase environment variables")),
        }
    }

    pub fn store(&self) -> Result<RemoteStore> {
        let mut headers = HeaderMap::new();

        let mut key = HeaderValue::from_str(&self.anon_key)
            .into_diagnostic()
            .wrap_err("Could not create header value")?;
        key.set_sensitive(true);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", self.anon_key))
            .into_diagnostic()
            .wrap_err("Could not create header value")?;
        bearer.set_sensitive(true);

        headers.insert(HeaderName::from_static("apikey"), key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(
            HeaderName::from_static("prefer"),
            HeaderValue::from_static("return=representation"),
        );

        let http = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .default_headers(headers)
            .build()
            .into_diagnostic()
            .wrap_err("Could not build reqwest client")?;

        Ok(RemoteStore {
            http,
            rest_url: format!("{}/rest/v1", self.url.trim_end_matches('/')),
        })
    }
}

/// Sessions and messages kept in a hosted Postgres behind PostgREST.
pub struct RemoteStore {
    http: reqwest::Client,
    rest_url: String,
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

impl RemoteStore {
    fn table(&self, table: &str) -> String {
        format!("{}/{table}", self.rest_url)
    }

    async fn rows<T: DeserializeOwned>(request: reqwest::RequestBuilder, what: &str) -> Result<Vec<T>> {
        let response = request
            .send()
            .await
            .into_diagnostic()
            .wrap_err_with(|| format!("Could not reach store to {what}"))?
            .error_for_status()
            .into_diagnostic()
            .wrap_err_with(|| format!("Store refused to {what}"))?;

        response
            .json::<Vec<T>>()
            .await
            .into_diagnostic()
            .wrap_err_with(|| format!("Could not decode store rows to {what}"))
    }

    async fn insert<B: Serialize + Sync, T: DeserializeOwned>(&self, table: &str, body: &B, what: &str) -> Result<T> {
        Self::rows(self.http.post(self.table(table)).json(body), what)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| miette!("Store returned no row to {what}"))
    }
}

#[async_trait]
impl SessionStore for RemoteStore {
    async fn create_session(&self, new: NewSession) -> Result<Session> {
        let session: Session = self.insert(SESSIONS, &new, "create session").await?;
        tracing::debug!(session_id = %session.id, role = %session.role, "created session");
        Ok(session)
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>> {
        let request = self
            .http
            .get(self.table(SESSIONS))
            .query(&[("id", eq(id)), ("limit", "1".to_owned())]);
        Ok(Self::rows(request, "get session").await?.into_iter().next())
    }

    async fn list_sessions(&self, user_id: Uuid) -> Result<Vec<Session>> {
        let request = self
            .http
            .get(self.table(SESSIONS))
            .query(&[("user_id", eq(user_id)), ("order", "created_at.desc".to_owned())]);
        Self::rows(request, "list sessions").await
    }

    async fn update_session(&self, id: Uuid, update: SessionUpdate) -> Result<Session> {
        let mut body = serde_json::to_value(&update).into_diagnostic()?;
        body["updated_at"] = json!(chrono::Utc::now());

        let request = self
            .http
            .patch(self.table(SESSIONS))
            .query(&[("id", eq(id))])
            .json(&body);

        Self::rows(request, "update session")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| miette!("Session {id} not found"))
    }

    async fn append_message(&self, new: NewMessage) -> Result<Message> {
        self.insert(MESSAGES, &new, "append message").await
    }

    async fn list_messages(&self, session_id: Uuid) -> Result<Vec<Message>> {
        let request = self
            .http
            .get(self.table(MESSAGES))
            .query(&[("session_id", eq(session_id)), ("order", "created_at.asc".to_owned())]);
        Self::rows(request, "list messages").await
    }
}
