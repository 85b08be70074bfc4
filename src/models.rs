// src/models.rs
use crate::errors::ParseEnumError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Editor settings
// ============================================================================

/// Color scheme of the code editor pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorTheme {
    Espresso,
    #[default]
    Cobalt,
}

impl EditorTheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditorTheme::Espresso => "espresso",
            EditorTheme::Cobalt => "cobalt",
        }
    }

    pub fn all() -> [Self; 2] {
        [Self::Espresso, Self::Cobalt]
    }
}

impl fmt::Display for EditorTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EditorTheme {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "espresso" => Ok(EditorTheme::Espresso),
            "cobalt" => Ok(EditorTheme::Cobalt),
            other => Err(ParseEnumError::new("editor theme", other)),
        }
    }
}

/// Target format the generated code is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stack {
    #[default]
    HtmlTailwind,
    ReactTailwind,
    Bootstrap,
    IonicTailwind,
    VueTailwind,
    Svg,
}

impl Stack {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stack::HtmlTailwind => "html_tailwind",
            Stack::ReactTailwind => "react_tailwind",
            Stack::Bootstrap => "bootstrap",
            Stack::IonicTailwind => "ionic_tailwind",
            Stack::VueTailwind => "vue_tailwind",
            Stack::Svg => "svg",
        }
    }

    pub fn all() -> [Self; 6] {
        [
            Self::HtmlTailwind,
            Self::ReactTailwind,
            Self::Bootstrap,
            Self::IonicTailwind,
            Self::VueTailwind,
            Self::Svg,
        ]
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stack {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|stack| stack.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("stack", s))
    }
}

/// User configuration sent along with every generation request.
///
/// Unset credentials travel as `null`, never as empty strings.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(rename = "openAiApiKey")]
    pub openai_api_key: Option<String>,
    #[serde(rename = "openAiBaseURL")]
    pub openai_base_url: Option<String>,
    pub screenshot_one_api_key: Option<String>,
    pub is_image_generation_enabled: bool,
    pub editor_theme: EditorTheme,
    pub generated_code_config: Stack,
    /// Only relevant for the hosted version.
    pub is_term_of_service_accepted: bool,
    /// Only relevant for the hosted version.
    pub access_code: Option<String>,
}

fn redacted(value: &Option<String>) -> Option<&'static str> {
    value.as_ref().map(|_| "<redacted>")
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("openai_api_key", &redacted(&self.openai_api_key))
            .field("openai_base_url", &self.openai_base_url)
            .field("screenshot_one_api_key", &redacted(&self.screenshot_one_api_key))
            .field("is_image_generation_enabled", &self.is_image_generation_enabled)
            .field("editor_theme", &self.editor_theme)
            .field("generated_code_config", &self.generated_code_config)
            .field("is_term_of_service_accepted", &self.is_term_of_service_accepted)
            .field("access_code", &redacted(&self.access_code))
            .finish()
    }
}

// ============================================================================
// UI phase
// ============================================================================

/// Phase the front end is in. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppState {
    #[default]
    Initial,
    Coding,
    CodeReady,
    CodeReadyNoPreview,
}

impl AppState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppState::Initial => "INITIAL",
            AppState::Coding => "CODING",
            AppState::CodeReady => "CODE_READY",
            AppState::CodeReadyNoPreview => "CODE_READY_NO_PREVIEW",
        }
    }

    pub fn all() -> [Self; 4] {
        [
            Self::Initial,
            Self::Coding,
            Self::CodeReady,
            Self::CodeReadyNoPreview,
        ]
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppState {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("app state", s))
    }
}

// ============================================================================
// Generation requests
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationType {
    Create,
    Update,
}

impl GenerationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationType::Create => "create",
            GenerationType::Update => "update",
        }
    }
}

impl fmt::Display for GenerationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(GenerationType::Create),
            "update" => Ok(GenerationType::Update),
            other => Err(ParseEnumError::new("generation type", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeGenerationParams {
    pub generation_type: GenerationType,
    /// Screenshot as a data URL.
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_image: Option<String>,
    /// Alternating code / instruction turns of earlier iterations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_imported_from_code: Option<bool>,
}

impl CodeGenerationParams {
    pub fn create(image: impl Into<String>) -> Self {
        Self {
            generation_type: GenerationType::Create,
            image: image.into(),
            result_image: None,
            history: None,
            is_imported_from_code: None,
        }
    }

    pub fn update(image: impl Into<String>, history: Vec<String>) -> Self {
        Self {
            generation_type: GenerationType::Update,
            history: Some(history),
            ..Self::create(image)
        }
    }

    pub fn history(&self) -> &[String] {
        self.history.as_deref().unwrap_or_default()
    }

    pub fn is_imported_from_code(&self) -> bool {
        self.is_imported_from_code.unwrap_or(false)
    }
}

/// Everything a generation call needs: the request merged with the settings.
///
/// On the wire both halves are flattened into a single object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullGenerationSettings {
    #[serde(flatten)]
    pub params: CodeGenerationParams,
    #[serde(flatten)]
    pub settings: Settings,
}

impl FullGenerationSettings {
    pub fn new(params: CodeGenerationParams, settings: Settings) -> Self {
        Self { params, settings }
    }

    pub fn into_parts(self) -> (CodeGenerationParams, Settings) {
        (self.params, self.settings)
    }
}

// ============================================================================
// Models and results
// ============================================================================

/// Model identifiers as they are sent to the providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Llm {
    #[serde(rename = "gpt-4-vision-preview", alias = "gpt_4_vision")]
    Gpt4Vision,
    #[serde(rename = "gpt-4-turbo-2024-04-09")]
    Gpt4Turbo20240409,
    #[serde(rename = "claude-3-sonnet-20240229", alias = "claude_3_sonnet")]
    Claude3Sonnet,
    #[serde(rename = "claude-3-opus-20240229")]
    Claude3Opus,
    #[serde(rename = "claude-3-haiku-20240307")]
    Claude3Haiku,
}

impl Llm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Llm::Gpt4Vision => "gpt-4-vision-preview",
            Llm::Gpt4Turbo20240409 => "gpt-4-turbo-2024-04-09",
            Llm::Claude3Sonnet => "claude-3-sonnet-20240229",
            Llm::Claude3Opus => "claude-3-opus-20240229",
            Llm::Claude3Haiku => "claude-3-haiku-20240307",
        }
    }

    pub fn all() -> [Self; 5] {
        [
            Self::Gpt4Vision,
            Self::Gpt4Turbo20240409,
            Self::Claude3Sonnet,
            Self::Claude3Opus,
            Self::Claude3Haiku,
        ]
    }

    pub fn is_claude(&self) -> bool {
        matches!(
            self,
            Llm::Claude3Sonnet | Llm::Claude3Opus | Llm::Claude3Haiku
        )
    }

    /// Completion cap sent with every request.
    pub fn max_tokens(&self) -> u32 {
        4096
    }
}

impl fmt::Display for Llm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Llm {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gpt_4_vision" => Ok(Llm::Gpt4Vision),
            "claude_3_sonnet" => Ok(Llm::Claude3Sonnet),
            other => Self::all()
                .into_iter()
                .find(|model| model.as_str() == other)
                .ok_or_else(|| ParseEnumError::new("model", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub id: Uuid,
    pub generation_type: GenerationType,
    pub stack: Stack,
    pub model: Llm,
    pub code: String,
    pub processing_time_ms: u64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn editor_theme_round_trips_and_rejects_unknown() {
        for theme in EditorTheme::all() {
            assert_eq!(theme.as_str().parse::<EditorTheme>().unwrap(), theme);
            let wire = serde_json::to_value(theme).unwrap();
            assert_eq!(wire, json!(theme.as_str()));
        }
        assert!("solarized".parse::<EditorTheme>().is_err());
        assert!("Cobalt".parse::<EditorTheme>().is_err());
        assert!(serde_json::from_value::<EditorTheme>(json!("monokai")).is_err());
    }

    #[test]
    fn app_state_round_trips_and_rejects_unknown() {
        let expected = ["INITIAL", "CODING", "CODE_READY", "CODE_READY_NO_PREVIEW"];
        for (state, wire) in AppState::all().into_iter().zip(expected) {
            assert_eq!(state.to_string(), wire);
            assert_eq!(wire.parse::<AppState>().unwrap(), state);
            assert_eq!(serde_json::to_value(state).unwrap(), json!(wire));
            assert_eq!(serde_json::from_value::<AppState>(json!(wire)).unwrap(), state);
        }
        assert!("initial".parse::<AppState>().is_err());
        assert!("DONE".parse::<AppState>().is_err());
        assert_eq!(AppState::default(), AppState::Initial);
    }

    #[test]
    fn stack_uses_snake_case_wire_values() {
        for stack in Stack::all() {
            assert_eq!(stack.as_str().parse::<Stack>().unwrap(), stack);
            assert_eq!(serde_json::to_value(stack).unwrap(), json!(stack.as_str()));
        }
        assert!("angular".parse::<Stack>().is_err());
    }

    #[test]
    fn default_settings_leave_everything_unset() {
        let settings = Settings::default();
        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(
            value,
            json!({
                "openAiApiKey": null,
                "openAiBaseURL": null,
                "screenshotOneApiKey": null,
                "isImageGenerationEnabled": false,
                "editorTheme": "cobalt",
                "generatedCodeConfig": "html_tailwind",
                "isTermOfServiceAccepted": false,
                "accessCode": null
            })
        );
        let back: Settings = serde_json::from_value(value).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn settings_debug_hides_credentials() {
        let settings = Settings {
            openai_api_key: Some("sk-secret".into()),
            access_code: Some("letmein".into()),
            ..Settings::default()
        };
        let printed = format!("{:?}", settings);
        assert!(!printed.contains("sk-secret"));
        assert!(!printed.contains("letmein"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn update_with_history_differs_from_plain_create() {
        let create = CodeGenerationParams::create("data:image/png;base64,AAAA");
        let update = CodeGenerationParams::update(
            "data:image/png;base64,AAAA",
            vec!["<html></html>".into(), "make it blue".into()],
        );
        assert_ne!(create, update);
        assert!(create.history().is_empty());
        assert_eq!(update.history().len(), 2);

        let wire = serde_json::to_value(&create).unwrap();
        assert_eq!(
            wire,
            json!({"generationType": "create", "image": "data:image/png;base64,AAAA"})
        );
    }

    #[test]
    fn generation_type_is_restricted() {
        let bad = json!({"generationType": "delete", "image": "x"});
        assert!(serde_json::from_value::<CodeGenerationParams>(bad).is_err());
        assert_eq!("update".parse::<GenerationType>().unwrap(), GenerationType::Update);
    }

    #[test]
    fn full_settings_merge_keeps_every_field() {
        let params = CodeGenerationParams {
            generation_type: GenerationType::Update,
            image: "data:image/png;base64,AAAA".into(),
            result_image: Some("data:image/png;base64,BBBB".into()),
            history: Some(vec!["<div/>".into()]),
            is_imported_from_code: Some(true),
        };
        let settings = Settings {
            openai_api_key: Some("sk-1".into()),
            openai_base_url: Some("http://proxy/v1".into()),
            screenshot_one_api_key: Some("shot".into()),
            is_image_generation_enabled: true,
            editor_theme: EditorTheme::Espresso,
            generated_code_config: Stack::VueTailwind,
            is_term_of_service_accepted: true,
            access_code: Some("code".into()),
        };
        let full = FullGenerationSettings::new(params.clone(), settings.clone());

        let wire = serde_json::to_value(&full).unwrap();
        let object = wire.as_object().unwrap();
        assert_eq!(object.len(), 13);
        assert_eq!(object["generationType"], json!("update"));
        assert_eq!(object["openAiBaseURL"], json!("http://proxy/v1"));
        assert_eq!(object["generatedCodeConfig"], json!("vue_tailwind"));

        let back: FullGenerationSettings = serde_json::from_value(wire).unwrap();
        let (p, s) = back.into_parts();
        assert_eq!(p, params);
        assert_eq!(s, settings);
    }

    #[test]
    fn llm_accepts_frontend_aliases() {
        assert_eq!("gpt_4_vision".parse::<Llm>().unwrap(), Llm::Gpt4Vision);
        assert_eq!("claude_3_sonnet".parse::<Llm>().unwrap(), Llm::Claude3Sonnet);
        assert_eq!(
            "claude-3-opus-20240229".parse::<Llm>().unwrap(),
            Llm::Claude3Opus
        );
        assert!("gpt-5".parse::<Llm>().is_err());
        assert_eq!(
            serde_json::from_value::<Llm>(json!("gpt_4_vision")).unwrap(),
            Llm::Gpt4Vision
        );
        assert!(Llm::Claude3Haiku.is_claude());
        assert!(!Llm::Gpt4Turbo20240409.is_claude());
    }
}
