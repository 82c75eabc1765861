use super::{build_prompt, ContentKind, ModelSettings, Rewriter};
use crate::error::{ChangegenError, Result};
use crate::style::StyleTemplate;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

pub struct AnthropicRewriter {
    http: Client,
    settings: ModelSettings,
    base_url: String,
}

impl AnthropicRewriter {
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
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }
}

impl Rewriter for AnthropicRewriter {
    fn rewrite(&self, content: &str, kind: ContentKind, style: &StyleTemplate) -> Result<String> {
        let request = MessagesRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            messages: vec![Message {
                role: "user",
                content: build_prompt(content, kind, style),
            }],
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", API_VERSION)
            .header(CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .map_err(|err| ChangegenError::Rewrite(format!("failed to call Anthropic: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "<unable to read response>".to_string());
            return Err(ChangegenError::Rewrite(format!(
                "Anthropic responded with {status}: {body}"
            )));
        }

        let parsed: MessagesResponse = response
            .json()
            .map_err(|err| ChangegenError::Rewrite(format!("invalid Anthropic response: {err}")))?;

        let text = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            return Err(ChangegenError::Rewrite(
                "Anthropic returned no text".to_string(),
            ));
        }
        Ok(text.trim().to_string())
    }

    fn provider_name(&self) -> &'static str {
        "anthropic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_blocks() {
        let raw = r#"{"content":[{"type":"text","text":"- Added login"},{"type":"tool_use"}]}"#;
        let parsed: MessagesResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.content.len(), 2);
        assert_eq!(parsed.content[0].text, "- Added login");
        assert_eq!(parsed.content[1].text, "");
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let rewriter = AnthropicRewriter::new(ModelSettings::new("k", "m"))
            .unwrap()
            .with_base_url("http://localhost:9/");
        assert_eq!(rewriter.endpoint(), "http://localhost:9/v1/messages");
    }
}
