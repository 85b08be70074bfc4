// src/config.rs
use crate::errors::SnapcodeError;
use crate::models::Llm;
use std::path::PathBuf;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const OPENAI_DEFAULT_BASE: &str = "https://api.openai.com/v1";
pub const ANTHROPIC_DEFAULT_BASE: &str = "https://api.anthropic.com";

/// Service configuration, read from the environment at startup.
#[derive(Clone)]
pub struct Config {
    pub bind_addr: String,
    pub redis_url: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub anthropic_base_url: String,
    pub debug_enabled: bool,
    pub debug_dir: PathBuf,
    pub default_model: Llm,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            redis_url: DEFAULT_REDIS_URL.to_string(),
            openai_api_key: None,
            openai_base_url: None,
            anthropic_api_key: None,
            anthropic_base_url: ANTHROPIC_DEFAULT_BASE.to_string(),
            debug_enabled: false,
            debug_dir: PathBuf::from("./debug"),
            default_model: Llm::Gpt4Vision,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, SnapcodeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SnapcodeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let debug_enabled = match get("IS_DEBUG_ENABLED") {
            Some(value) => parse_bool(&value).ok_or_else(|| {
                SnapcodeError::Config(format!("IS_DEBUG_ENABLED must be a boolean, got '{}'", value))
            })?,
            None => defaults.debug_enabled,
        };

        let default_model = match get("DEFAULT_MODEL") {
            Some(value) => value
                .parse::<Llm>()
                .map_err(|e| SnapcodeError::Config(format!("DEFAULT_MODEL: {}", e)))?,
            None => defaults.default_model,
        };

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            redis_url: get("REDIS_URL").unwrap_or(defaults.redis_url),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL"),
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            anthropic_base_url: get("ANTHROPIC_BASE_URL").unwrap_or(defaults.anthropic_base_url),
            debug_enabled,
            debug_dir: get("DEBUG_DIR").map(PathBuf::from).unwrap_or(defaults.debug_dir),
            default_model,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
