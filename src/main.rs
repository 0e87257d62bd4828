use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::sys_core::{core::AppState, handlers::run_server};

pub mod sys_compress;
pub mod sys_config;
pub mod sys_core;
pub mod sys_indexjson;
pub mod sys_statichost;
pub mod sys_unionfs;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "unionfs_host=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = sys_config::core::from_env()?;
    tracing::info!(
        roots = config.roots.len(),
        static_mounts = config.static_mounts.len(),
        bind = %config.bind,
        "configuration loaded"
    );

    let state = Arc::new(AppState::from_config(config));
    run_server(state).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
