pub mod analytics;
pub mod api;
pub mod auth;
pub mod config;
pub mod content;
pub mod error;
pub mod state;
pub mod storage;
pub mod upload;

use tracing_subscriber::{EnvFilter, fmt::time::ChronoLocal};

use config::Config;
use state::AppState;

/// 启动服务，启动失败时记录错误并以非零状态退出
pub async fn run() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
        .with_env_filter(EnvFilter::from_env("QALAM_LOG"))
        .init();

    if let Err(e) = start().await {
        tracing::error!(%e, "server stopped");
        std::process::exit(1);
    }
}

async fn start() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    let pool = storage::new_db_pool(config.database_url()).await?;
    storage::migrate(&pool, storage::SCHEMA).await?;

    let app = AppState::from_config(pool, &config);
    api::run_server(app, &config).await?;
    Ok(())
}
