use sales_insight_orchestrator::{
    agent::{Answer, Orchestrator},
    config::AppConfig,
    llm::{DisabledImageGenerator, ImageGenerator, OpenAiClient, OpenAiImageClient},
    store::MongoStore,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Logs go to stderr so stdout stays pure JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let question = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if question.trim().is_empty() {
        eprintln!("usage: ask <question>");
        std::process::exit(2);
    }

    let config = AppConfig::from_env()?;

    let store = Arc::new(MongoStore::connect(&config).await?);
    let generator = Arc::new(OpenAiClient::new(&config)?);
    let images: Arc<dyn ImageGenerator> = if config.image_generation_enabled {
        Arc::new(OpenAiImageClient::new(&config)?)
    } else {
        Arc::new(DisabledImageGenerator)
    };

    let orchestrator = Orchestrator::new(generator, images, store, config.query_timeout);

    info!(question = %question, "Answering question");

    match orchestrator.answer(&question).await {
        Ok(outcome) => {
            let body = match outcome.answer {
                Answer::Rejected(envelope) => serde_json::to_string_pretty(&envelope)?,
                Answer::Answered(envelope) => serde_json::to_string_pretty(&envelope)?,
            };
            println!("{}", body);
            Ok(())
        }
        Err(e) => {
            eprintln!("Question failed ({}): {}", e.kind(), e);
            Err(Box::new(e) as Box<dyn std::error::Error>)
        }
    }
}
