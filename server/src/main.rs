use std::{net::SocketAddr, sync::Arc};

use miette::{IntoDiagnostic, Result, WrapErr};
use tracing_subscriber::EnvFilter;

mod routes;

use routes::{app, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let state = AppState {
        coach: Arc::new(coachgpt::coach_from_env()?),
    };

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_owned());
    let addr: SocketAddr = bind_addr
        .parse()
        .into_diagnostic()
        .wrap_err_with(|| format!("Invalid BIND_ADDR {bind_addr:?}"))?;

    tracing::info!(%addr, route = routes::COACH_ROUTE, "coach server listening");

    axum::Server::try_bind(&addr)
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not bind {addr}"))?
        .serve(app(state).into_make_service())
        .await
        .into_diagnostic()
}
