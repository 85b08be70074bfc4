// src/prompts.rs
use crate::errors::SnapcodeError;
use crate::models::{CodeGenerationParams, GenerationType, Stack};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A chat message in the OpenAI wire shape. Claude requests are derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ChatMessage {
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn parts(role: Role, parts: Vec<ContentPart>) -> Self {
        Self {
            role,
            content: MessageContent::Parts(parts),
        }
    }
}

impl ContentPart {
    pub fn image(url: impl Into<String>) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: url.into(),
                detail: Some("high".to_string()),
            },
        }
    }
}

const GENERAL_RULES: &str = r#"
- Make sure the app looks exactly like the screenshot.
- Pay close attention to background color, text color, font size, font family,
padding, margin, border, etc. Match the colors and sizes exactly.
- Use the exact text from the screenshot.
- Do not add comments in the code such as "<!-- Add other navigation links as needed -->" in place of writing the full code. WRITE THE FULL CODE.
- Repeat elements as needed to match the screenshot. For example, if there are 15 items, the code should have 15 items.
- For images, use placeholder images from https://placehold.co and include a detailed description of the image in the alt text.
"#;

const USER_PROMPT: &str = "Generate code for a web page that looks exactly like this.";

const SVG_USER_PROMPT: &str = "Generate code for a SVG that looks exactly like this.";

fn stack_instructions(stack: Stack) -> &'static str {
    match stack {
        Stack::HtmlTailwind => {
            "You are an expert Tailwind developer. You take screenshots of a reference web page \
             from the user, and then build single page apps using Tailwind, HTML and JS.\n\
             In terms of libraries, use this script to include Tailwind: \
             <script src=\"https://cdn.tailwindcss.com\"></script>\n\
             You can use Google Fonts and Font Awesome for icons."
        }
        Stack::ReactTailwind => {
            "You are an expert React/Tailwind developer. You take screenshots of a reference \
             web page from the user, and then build single page apps using React and Tailwind CSS.\n\
             In terms of libraries, use these scripts to include React so that it can run on a \
             standalone page: https://unpkg.com/react/umd/react.development.js, \
             https://unpkg.com/react-dom/umd/react-dom.development.js and \
             https://unpkg.com/@babel/standalone/babel.js. \
             Use this script to include Tailwind: <script src=\"https://cdn.tailwindcss.com\"></script>"
        }
        Stack::Bootstrap => {
            "You are an expert Bootstrap developer. You take screenshots of a reference web page \
             from the user, and then build single page apps using Bootstrap, HTML and JS.\n\
             In terms of libraries, include Bootstrap from \
             https://cdn.jsdelivr.net/npm/bootstrap@5.3.2/dist/css/bootstrap.min.css."
        }
        Stack::IonicTailwind => {
            "You are an expert Ionic/Tailwind developer. You take screenshots of a reference web \
             page from the user, and then build single page apps using Ionic and Tailwind CSS.\n\
             In terms of libraries, include Ionic from \
             https://cdn.jsdelivr.net/npm/@ionic/core/dist/ionic/ionic.esm.js and Tailwind \
             from https://cdn.tailwindcss.com. Use ionicons for icons."
        }
        Stack::VueTailwind => {
            "You are an expert Vue/Tailwind developer. You take screenshots of a reference web \
             page from the user, and then build single page apps using Vue and Tailwind CSS.\n\
             Use Vue using the global build: https://registry.npmmirror.com/vue/3.3.11/files/dist/vue.global.js \
             and include Tailwind from https://cdn.tailwindcss.com."
        }
        Stack::Svg => {
            "You are an expert at building SVGs. You take screenshots of a reference web page \
             from the user, and then build a SVG that looks exactly like the screenshot.\n\
             You can use Google Fonts."
        }
    }
}

fn output_rule(stack: Stack) -> &'static str {
    match stack {
        Stack::Svg => "Return only the full code in <svg></svg> tags.",
        _ => "Return only the full code in <html></html> tags.",
    }
}

pub fn system_prompt(stack: Stack) -> String {
    format!(
        "{}\n{}\n{}\nDo not include markdown \"```\" or \"```html\" at the start or end.",
        stack_instructions(stack),
        GENERAL_RULES,
        output_rule(stack)
    )
}

pub fn imported_code_system_prompt(stack: Stack, code: &str) -> String {
    format!(
        "{}\nThe user has imported existing code. Apply their instructions to it.\n\
         {}\nDo not include markdown \"```\" or \"```html\" at the start or end.\n\n\
         Here is the code of the app: {}",
        stack_instructions(stack),
        output_rule(stack),
        code
    )
}

/// Builds the message list for one generation request.
pub fn assemble_prompt(
    params: &CodeGenerationParams,
    stack: Stack,
) -> Result<Vec<ChatMessage>, SnapcodeError> {
    if params.is_imported_from_code() {
        return assemble_imported_code_prompt(params, stack);
    }

    let mut parts = vec![ContentPart::image(params.image.as_str())];
    if let Some(result_image) = &params.result_image {
        parts.push(ContentPart::image(result_image.as_str()));
    }
    let instruction = if stack == Stack::Svg {
        SVG_USER_PROMPT
    } else {
        USER_PROMPT
    };
    parts.push(ContentPart::Text {
        text: instruction.to_string(),
    });

    let mut messages = vec![
        ChatMessage::text(Role::System, system_prompt(stack)),
        ChatMessage::parts(Role::User, parts),
    ];

    if params.generation_type == GenerationType::Update {
        let history = params.history();
        if history.is_empty() {
            return Err(SnapcodeError::Validation(
                "update requests need a non-empty history".to_string(),
            ));
        }
        // Turns alternate starting with the generated code.
        for (index, turn) in history.iter().enumerate() {
            let role = if index % 2 == 0 {
                Role::Assistant
            } else {
                Role::User
            };
            messages.push(ChatMessage::text(role, turn.as_str()));
        }
    }

    Ok(messages)
}

fn assemble_imported_code_prompt(
    params: &CodeGenerationParams,
    stack: Stack,
) -> Result<Vec<ChatMessage>, SnapcodeError> {
    let (code, rest) = params.history().split_first().ok_or_else(|| {
        SnapcodeError::Validation("imported code requests need the code in history".to_string())
    })?;

    let mut messages = vec![ChatMessage::text(
        Role::System,
        imported_code_system_prompt(stack, code),
    )];
    for (index, turn) in rest.iter().enumerate() {
        let role = if index % 2 == 0 {
            Role::User
        } else {
            Role::Assistant
        };
        messages.push(ChatMessage::text(role, turn.as_str()));
    }

    Ok(messages)
}
