use keihi_shinsei::shared::config::{
    initialize_logging_system, load_environment_variables, AppConfig,
};
use keihi_shinsei::shared::errors::{AppError, AppResult};
use keihi_shinsei::{bootstrap, http};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> AppResult<()> {
    load_environment_variables();

    let config = AppConfig::from_env()?;
    initialize_logging_system(&config.log_level);

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .map_err(|e| AppError::configuration(format!("バインドアドレスが不正です: {e}")))?;

    let ctx = Arc::new(bootstrap(&config).await?);

    http::server::run(addr, ctx).await
}
