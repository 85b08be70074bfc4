// src/lib.rs
//! Screenshot-to-code backend: turns a screenshot plus user settings into
//! generated front-end code streamed from OpenAI or Anthropic models.

use std::sync::Arc;

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod prompts;
pub mod services;

use crate::config::Config;
use crate::services::{ImageProcessor, LLMService, RedisService};

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub redis_service: Arc<RedisService>,
    pub llm_service: Arc<LLMService>,
    pub image_processor: Arc<ImageProcessor>,
}
