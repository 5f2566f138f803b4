mod app;
mod auth;
mod bot;
mod catalog;
mod config;
mod error;
mod pages;
mod requests;
mod state;
mod wallet;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "skillsaarthi=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;
    let (host, port) = (app_state.config.host.clone(), app_state.config.port);
    tracing::info!(
        environment = ?app_state.config.environment,
        storage = ?app_state.config.storage,
        "configuration loaded"
    );

    app::serve(app::build_app(app_state), &host, port).await
}
