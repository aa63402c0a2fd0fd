use miette::{Context, IntoDiagnostic, Result};
use reqwest::header::{HeaderValue, AUTHORIZATION};

use crate::APP_USER_AGENT;

pub mod completion;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Clone)]
pub struct Config {
    /// Not validated up front: a missing key surfaces as a rejected completion call.
    api_key: Option<String>,
    base_url: String,
    model: String,
}

pub struct Client {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl Config {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    pub fn from_env() -> Self {
        let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|key| !key.is_empty());
        if api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY is not set, completion requests will be unauthenticated");
        }

        Self::new(
            api_key,
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned()),
            std::env::var("COACH_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_owned()),
        )
    }

    pub fn client(&self) -> Result<Client> {
        let mut headers = reqwest::header::HeaderMap::new();

        if let Some(api_key) = &self.api_key {
            let value = format!("Bearer {api_key}");
            let mut value = HeaderValue::from_str(&value)
                .into_diagnostic()
                .wrap_err("Could not create header value")?;
            value.set_sensitive(true);

            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .default_headers(headers)
            .build()
            .into_diagnostic()
            .wrap_err("Could not build reqwest client")?;

        Ok(Client {
            http,
            base_url: self.base_url.trim_end_matches('/').to_owned(),
            model: self.model.clone(),
        })
    }
}

impl Client {
    pub fn model(&self) -> &str {
        &self.model
    }
}
