// src/errors.rs
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapcodeError {
    #[error("Redis error: {0}")]
    Redis(String),

    #[error("LLM service error: {0}")]
    Llm(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Missing API key: {0}")]
    MissingApiKey(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Rejection for a string outside one of the closed wire enumerations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl SnapcodeError {
    fn label(&self) -> &'static str {
        match self {
            SnapcodeError::Redis(_) => "Database error",
            SnapcodeError::Llm(_) => "AI service error",
            SnapcodeError::ImageProcessing(_) => "Image processing error",
            SnapcodeError::Serialization(_) => "Data processing error",
            SnapcodeError::Validation(_) => "Validation error",
            SnapcodeError::NotFound(_) => "Not found",
            SnapcodeError::InvalidModel(_) => "Invalid model",
            SnapcodeError::MissingApiKey(_) => "Missing API key",
            SnapcodeError::Config(_) => "Configuration error",
            SnapcodeError::Io(_) => "I/O error",
        }
    }
}

impl ResponseError for SnapcodeError {
    fn status_code(&self) -> StatusCode {
        match self {
            SnapcodeError::Redis(_)
            | SnapcodeError::Serialization(_)
            | SnapcodeError::Config(_)
            | SnapcodeError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SnapcodeError::Llm(_) => StatusCode::SERVICE_UNAVAILABLE,
            SnapcodeError::ImageProcessing(_)
            | SnapcodeError::Validation(_)
            | SnapcodeError::InvalidModel(_) => StatusCode::BAD_REQUEST,
            SnapcodeError::MissingApiKey(_) => StatusCode::UNAUTHORIZED,
            SnapcodeError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.label(),
            "message": self.to_string()
        }))
    }
}

impl From<ParseEnumError> for SnapcodeError {
    fn from(err: ParseEnumError) -> Self {
        SnapcodeError::Validation(err.to_string())
    }
}
