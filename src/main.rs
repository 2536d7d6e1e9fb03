use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;
use page_critic::{
    config::Config,
    api::routes::create_router,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).compact().init();

    // Errors out here when OPENAI_API_KEY is missing
    let config = Config::load()?;
    let server_addr = config.server_addr;
    info!(model = %config.model, index = %config.index_path.display(), "configuration loaded");

    let app_state = AppState::new(config)?;
    let app = create_router(app_state);

    let listener = TcpListener::bind(server_addr).await?;
    info!("listening on http://{}", server_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
