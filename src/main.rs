use consumption_dashboard::{router, AppConfig, AppState};
use std::future::IntoFuture;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("configuration missing: {err}");
            return Err(err.into());
        }
    };

    let state = AppState::start(&config).await?;
    let app = router(state.clone());

    info!(namespace = %config.namespace, "listening on http://{}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    tokio::select! {
        result = axum::serve(listener, app).into_future() => result?,
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }

    state.shutdown();
    Ok(())
}
