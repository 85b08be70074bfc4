// src/services/mod.rs
pub mod debug_writer;
pub mod image_processor;
pub mod llm_service;
pub mod redis_service;
pub mod sse;

pub use debug_writer::DebugFileWriter;
pub use image_processor::ImageProcessor;
pub use llm_service::{CompletionProvider, LLMService};
pub use redis_service::RedisService;
