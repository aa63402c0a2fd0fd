use std::sync::Arc;

use miette::Result;

pub use crate::coach::{Coach, TurnError};
pub use crate::openai::completion::{Completer, CompletionRequest};
pub use crate::openai::{Client as OpenAiClient, Config};

pub mod catalog;
pub mod coach;
pub mod heuristics;
pub mod openai;
pub mod store;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Builds a coach backed by the OpenAI client configured from the environment.
pub fn coach_from_env() -> Result<Coach> {
    let client = Config::from_env().client()?;
    Ok(Coach::new(Arc::new(client)))
}
