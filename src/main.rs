use feeportal::{app, config::AppConfig, logging, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init("feeportal=debug,axum=info,tower_http=info");

    let config = AppConfig::from_env()?;
    let listener = app::bind(&config.host, config.port).await?;
    let state = AppState::init(config).await?;

    app::serve(listener, app::build_app(state)).await
}
