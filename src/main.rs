// src/main.rs
use actix_web::{App, HttpServer, middleware, web};
use anyhow::Context;
use log::info;
use std::sync::Arc;

use snapcode::AppContext;
use snapcode::config::Config;
use snapcode::handlers;
use snapcode::services::{ImageProcessor, LLMService, RedisService};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting snapcode service...");

    let config = Config::from_env().context("loading configuration")?;
    if config.openai_api_key.is_none() && config.anthropic_api_key.is_none() {
        info!("No server-side API keys configured; clients must send their own OpenAI key");
    }

    // Initialize services
    let redis_service = Arc::new(
        RedisService::new(&config.redis_url)
            .await
            .with_context(|| format!("connecting to Redis at {}", config.redis_url))?,
    );
    let llm_service = Arc::new(LLMService::new(&config));
    let image_processor = Arc::new(ImageProcessor::new());

    let bind_addr = config.bind_addr.clone();
    let app_context = AppContext {
        config: Arc::new(config),
        redis_service,
        llm_service,
        image_processor,
    };

    info!("Starting HTTP server on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_context.clone()))
            .wrap(middleware::Logger::default())
            .configure(handlers::routes)
    })
    .bind(&bind_addr)?
    .run()
    .await?;

    Ok(())
}
