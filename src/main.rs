// Yatube server

use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use yatube::{app_state::AppState, config::Config, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("yatube=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    let address = config.server_address();

    let app_state = AppState::new(config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialise application state: {}", e))?;

    let app = create_router(app_state).layer(CorsLayer::permissive());

    let listener = TcpListener::bind(&address).await?;
    info!("Yatube listening on http://{}", address);
    axum::serve(listener, app).await?;

    Ok(())
}
