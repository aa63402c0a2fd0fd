use std::{io::Write, path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use itertools::Itertools;
use miette::{miette, IntoDiagnostic, Result};
use rand::{rngs::StdRng, SeedableRng};
use serde_json::Value;
use shared::{HistoryEntry, TurnRequest, TurnResponse};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use coachgpt::{
    catalog::{self, Role, ROLES},
    coach_from_env,
    heuristics::{calculate_score, generate_feedback},
    store::{
        MessageRole, NewMessage, NewSession, SessionStore, SessionUpdate, SqliteStore,
        StoreConfig,
    },
    Coach, Config,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Practice workplace communication with an AI coach")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the roles that can be practiced
    Roles,
    /// Print an opening scenario for a role
    Scenario {
        #[arg(long)]
        role: String,
        /// Seed for reproducible scenario picks
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Score an answer with the local heuristics, without calling the model
    Score { message: String },
    /// Run an interactive practice session and record it
    Practice {
        #[arg(long)]
        role: String,
        #[arg(long)]
        user: Uuid,
        /// Record into a local SQLite file instead of the hosted store
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

fn find_role(key: &str) -> Result<&'static Role> {
    catalog::lookup(key).ok_or_else(|| {
        miette!(
            "Invalid role {key:?}, expected one of: {}",
            ROLES.iter().map(|r| r.key).join(", ")
        )
    })
}

fn text(value: &Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn score_of(value: &Option<Value>) -> Option<i64> {
    let score = match value.as_ref()? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    Some(score.clamp(0, 100))
}

async fn practice(role: &'static Role, user_id: Uuid, store: Box<dyn SessionStore>) -> Result<()> {
    let coach = coach_from_env()?;

    let opening = coach.scenario_turn(role);
    let session = store
        .create_session(NewSession {
            user_id,
            role: role.key.to_owned(),
            scenario: opening.scenario.clone(),
        })
        .await?;
    store
        .append_message(NewMessage {
            session_id: session.id,
            role: MessageRole::Ai,
            content: opening.scenario.clone(),
            feedback: String::new(),
        })
        .await?;
    tracing::info!(session_id = %session.id, role = role.key, "practice session started");

    println!("{}\n", opening.message);

    let mut history = vec![HistoryEntry {
        role: MessageRole::Ai.as_str().to_owned(),
        content: opening.scenario,
    }];
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush().into_diagnostic()?;

        let Some(line) = lines.next_line().await.into_diagnostic()? else {
            break;
        };
        let answer = line.trim();
        if answer.is_empty() {
            continue;
        }

        let request = TurnRequest {
            role: Some(role.key.to_owned()),
            user_message: Some(answer.to_owned()),
            conversation_history: history.clone(),
            message_count: history.len() as i64,
        };
        let TurnResponse::Feedback(turn) = coach.handle_turn(request).await? else {
            return Err(miette!("Coach answered an answer with a new scenario"));
        };

        let feedback = text(&turn.feedback);
        store
            .append_message(NewMessage {
                session_id: session.id,
                role: MessageRole::User,
                content: answer.to_owned(),
                feedback: feedback.clone(),
            })
            .await?;
        store
            .append_message(NewMessage {
                session_id: session.id,
                role: MessageRole::Ai,
                content: turn.message.clone(),
                feedback: String::new(),
            })
            .await?;
        store
            .update_session(
                session.id,
                SessionUpdate {
                    score: score_of(&turn.score),
                    completed: turn.is_complete.then_some(true),
                },
            )
            .await?;

        println!();
        if let Some(score) = &turn.score {
            println!("Score: {score}");
        }
        println!("Feedback: {feedback}");
        println!("Improved: {}", text(&turn.corrected_response));
        println!("\n{}\n", turn.message);

        history.push(HistoryEntry {
            role: MessageRole::User.as_str().to_owned(),
            content: answer.to_owned(),
        });
        history.push(HistoryEntry {
            role: MessageRole::Ai.as_str().to_owned(),
            content: turn.message,
        });

        if turn.is_complete {
            println!("Practice complete. Session {} saved.", session.id);
            break;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Roles => {
            for role in ROLES.iter() {
                println!("{:<22}{}", role.key, role.scenarios.iter().join(" | "));
            }
        }
        Command::Scenario { role, seed } => {
            let role = find_role(&role)?;
            let client = Arc::new(Config::from_env().client()?);
            let coach = match seed {
                Some(seed) => Coach::with_rng(client, StdRng::seed_from_u64(seed)),
                None => Coach::new(client),
            };
            println!("{}", coach.scenario_turn(role).message);
        }
        Command::Score { message } => {
            let score = calculate_score(&message);
            println!("Score: {score}");
            println!("Feedback: {}", generate_feedback(&message, score));
        }
        Command::Practice { role, user, db } => {
            let role = find_role(&role)?;
            let store: Box<dyn SessionStore> = match db {
                Some(path) => Box::new(SqliteStore::open(path)?),
                None => Box::new(StoreConfig::from_env()?.store()?),
            };
            practice(role, user, store).await?;
        }
    }

    Ok(())
}
