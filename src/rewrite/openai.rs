use super::{build_prompt, ContentKind, ModelSettings, Rewriter};
use crate::error::{ChangegenError, Result};
use crate::style::StyleTemplate;
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Chat completion request in the OpenAI wire format.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

pub struct OpenAiRewriter {
    http: Client,
    settings: ModelSettings,
    base_url: String,
}

impl OpenAiRewriter {
    pub fn new(settings: ModelSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| ChangegenError::Config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            http,
            settings,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl Rewriter for OpenAiRewriter {
    fn rewrite(&self, content: &str, kind: ContentKind, style: &StyleTemplate) -> Result<String> {
        let request = ChatRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(build_prompt(content, kind, style)),
            }],
        };

        let response = self
            .http
            .post(self.endpoint())
            .header(AUTHORIZATION, format!("Bearer {}", self.settings.api_key))
            .json(&request)
            .send()
            .map_err(|err| ChangegenError::Rewrite(format!("failed to call OpenAI: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ChangegenError::Rewrite(format!(
                "OpenAI API error ({status}): {body}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|err| ChangegenError::Rewrite(format!("invalid OpenAI response: {err}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| ChangegenError::Rewrite("OpenAI returned no choices".to_string()))
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
