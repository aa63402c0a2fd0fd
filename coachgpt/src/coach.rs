//! The per-turn coaching handler.
//!
//! A turn either opens a practice conversation with a scenario for the role, or
//! scores the user's answer. Scoring asks the completion model for a JSON verdict
//! and falls back to the local heuristics when that reply isn't JSON. A failed
//! completion call is not covered by the fallback and surfaces as an error.

use std::sync::{Arc, Mutex};

use indoc::formatdoc;
use miette::Diagnostic;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde_json::Value;
use shared::{FeedbackResponse, HistoryEntry, ScenarioResponse, TurnRequest, TurnResponse};
use thiserror::Error;

use crate::catalog::{self, Role};
use crate::heuristics::{calculate_score, generate_feedback, generate_follow_up};
use crate::openai::completion::{Completer, CompletionRequest};

pub const DEFAULT_SCENARIO: &str = "General workplace communication scenario";

/// Turns at or beyond this count mark the practice conversation as complete.
pub const COMPLETION_TURN: i64 = 9;

#[derive(Debug, Error, Diagnostic)]
pub enum TurnError {
    #[error("Invalid role")]
    #[diagnostic(code(coach::invalid_role), help("use one of the catalog role keys"))]
    InvalidRole,

    #[error("completion request failed: {0}")]
    #[diagnostic(code(coach::completion))]
    Completion(miette::Report),
}

/// What the model's reply turned out to be.
#[derive(Debug)]
pub enum ModelReply {
    Parsed(ModelFeedback),
    /// The model said `null`, or sent no content at all. There is nothing to
    /// read feedback from, and this is not a parse failure either.
    Null,
    Unparseable(serde_json::Error),
}

/// Fields the model was asked to return. Values are kept as the model sent them.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ModelFeedback {
    pub corrected_response: Option<Value>,
    pub score: Option<Value>,
    pub feedback: Option<Value>,
    pub next_message: Option<Value>,
}

pub fn parse_model_reply(content: Option<&str>) -> ModelReply {
    let Some(content) = content else {
        return ModelReply::Null;
    };

    match serde_json::from_str::<Value>(content) {
        Ok(Value::Null) => ModelReply::Null,
        Ok(Value::Object(mut fields)) => ModelReply::Parsed(ModelFeedback {
            corrected_response: fields.remove("correctedResponse"),
            score: fields.remove("score"),
            feedback: fields.remove("feedback"),
            next_message: fields.remove("nextMessage"),
        }),
        Ok(_) => ModelReply::Parsed(ModelFeedback::default()),
        Err(e) => ModelReply::Unparseable(e),
    }
}

pub fn analysis_prompt(role: &Role, scenario: &str, user_message: &str) -> String {
    let role_title = role.title();
    formatdoc!(
        r#"
        You are an AI communication coach. Analyze the user's response to the following scenario and provide constructive feedback.

        Role: {role_title}
        Scenario: {scenario}
        User's Response: "{user_message}"

        Please provide:
        1. A corrected version of the user's response with any grammatical mistakes fixed
        2. A score from 1-100 based on professionalism, clarity, and effectiveness
        3. Specific feedback on what was good and what could be improved
        4. A follow-up question or scenario to continue the practice

        Keep your response concise but helpful. Format as JSON with keys: correctedResponse, score, feedback, nextMessage
        "#
    )
}

pub fn welcome_message(role: &Role, scenario: &str) -> String {
    format!(
        "Welcome! Let's practice professional communication for your role as a {}. Here's your scenario:\n\n{scenario}\n\nPlease respond as you would in a real workplace situation.",
        role.title()
    )
}

pub struct Coach {
    completer: Arc<dyn Completer>,
    rng: Mutex<StdRng>,
}

impl Coach {
    pub fn new(completer: Arc<dyn Completer>) -> Self {
        Self::with_rng(completer, StdRng::from_entropy())
    }

    pub fn with_rng(completer: Arc<dyn Completer>, rng: StdRng) -> Self {
        Self {
            completer,
            rng: Mutex::new(rng),
        }
    }

    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnResponse, TurnError> {
        let role = request
            .role
            .as_deref()
            .and_then(catalog::lookup)
            .ok_or(TurnError::InvalidRole)?;

        match request.user_message.as_deref().filter(|m| !m.is_empty()) {
            None => Ok(TurnResponse::Scenario(self.scenario_turn(role))),
            Some(user_message) => self
                .feedback_turn(
                    role,
                    user_message,
                    &request.conversation_history,
                    request.message_count,
                )
                .await
                .map(TurnResponse::Feedback),
        }
    }

    pub fn scenario_turn(&self, role: &Role) -> ScenarioResponse {
        let scenario = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            role.scenarios
                .choose(&mut *rng)
                .copied()
                .unwrap_or(DEFAULT_SCENARIO)
        };

        tracing::debug!(role = role.key, scenario, "picked scenario");

        ScenarioResponse {
            message: welcome_message(role, scenario),
            scenario: scenario.to_owned(),
            is_scenario: true,
        }
    }

    pub async fn feedback_turn(
        &self,
        role: &Role,
        user_message: &str,
        history: &[HistoryEntry],
        message_count: i64,
    ) -> Result<FeedbackResponse, TurnError> {
        let scenario = history
            .first()
            .map(|entry| entry.content.as_str())
            .unwrap_or(DEFAULT_SCENARIO);

        let request = CompletionRequest::coaching(
            self.completer.model(),
            role.system_prompt,
            &analysis_prompt(role, scenario, user_message),
        );
        let content = self
            .completer
            .complete(request)
            .await
            .map_err(TurnError::Completion)?;

        let follow_up = || generate_follow_up(role, user_message, history).to_owned();

        let analysis = match parse_model_reply(content.as_deref()) {
            ModelReply::Parsed(analysis) => analysis,
            ModelReply::Null => {
                return Err(TurnError::Completion(miette::miette!(
                    "model reply was null, no feedback to read"
                )))
            }
            ModelReply::Unparseable(reason) => {
                tracing::warn!(
                    role = role.key,
                    %reason,
                    "model reply was not JSON, using local scoring"
                );
                let score = calculate_score(user_message);
                ModelFeedback {
                    corrected_response: Some(Value::from(user_message)),
                    score: Some(Value::from(score)),
                    feedback: Some(Value::from(generate_feedback(user_message, score))),
                    next_message: Some(Value::from(follow_up())),
                }
            }
        };

        let message = match analysis.next_message {
            Some(Value::String(next)) if !next.is_empty() => next,
            _ => follow_up(),
        };

        Ok(FeedbackResponse {
            message,
            feedback: analysis.feedback,
            score: analysis.score,
            corrected_response: analysis.corrected_response,
            is_complete: message_count >= COMPLETION_TURN,
        })
    }
}
