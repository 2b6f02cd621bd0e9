mod app;
mod auth;
mod config;
mod db;
mod error;
#[cfg(test)]
mod memory;
mod state;
mod tickets;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    let app_state = state::AppState::init().await?;
    let config = app_state.config.clone();
    let app = app::build_app(app_state);

    app::serve(app, &config).await
}

/// `RUST_LOG` picks the filter, `LOG_FORMAT=json` switches to one JSON object per line.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ticketdesk=debug,axum=info,tower_http=info".into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.with_target(false).json().init(),
        _ => builder.init(),
    }
}
