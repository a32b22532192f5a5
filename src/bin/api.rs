use sales_insight_orchestrator::{
    agent::Orchestrator,
    api::start_server,
    config::AppConfig,
    llm::{DisabledImageGenerator, ImageGenerator, OpenAiClient, OpenAiImageClient},
    store::MongoStore,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables before the filter reads RUST_LOG
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    if config.openai_api_key.is_empty() {
        warn!("OPENAI_API_KEY not set; every question will be answered as chat");
    }

    info!("Sales Insight Orchestrator - API Server");
    info!("Port: {}", config.port);

    // Store connection is the one fatal startup dependency
    let store = Arc::new(MongoStore::connect(&config).await?);

    let generator = Arc::new(OpenAiClient::new(&config)?);
    let images: Arc<dyn ImageGenerator> = if config.image_generation_enabled {
        Arc::new(OpenAiImageClient::new(&config)?)
    } else {
        info!("Image generation disabled");
        Arc::new(DisabledImageGenerator)
    };

    let orchestrator = Arc::new(Orchestrator::new(
        generator,
        images,
        store,
        config.query_timeout,
    ));

    info!("Orchestrator initialized");

    start_server(orchestrator, &config).await?;

    Ok(())
}
