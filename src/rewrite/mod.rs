pub mod anthropic;
pub mod offline;
pub mod openai;

pub use anthropic::AnthropicRewriter;
pub use offline::OfflineRewriter;
pub use openai::OpenAiRewriter;

use crate::cache::RewriteCache;
use crate::error::Result;
use crate::model::{as_entry, sanitize_entry, CommitRecord, RawCommit};
use crate::retry::RetryPolicy;
use crate::style::StyleTemplate;
use std::fmt;
use std::time::Duration;

/// What a rewrite call is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Commit,
    Summary,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Commit => "commit",
            ContentKind::Summary => "summary",
        }
    }
}

/// Text-generation backend turning raw content into styled prose.
pub trait Rewriter {
    fn rewrite(&self, content: &str, kind: ContentKind, style: &StyleTemplate) -> Result<String>;

    fn provider_name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAi,
    Offline,
}

impl Provider {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "anthropic" => Some(Provider::Anthropic),
            "openai" => Some(Provider::OpenAi),
            "offline" => Some(Provider::Offline),
            _ => None,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Anthropic => "claude-3-5-sonnet-20240620",
            Provider::OpenAi => "gpt-4o-mini",
            Provider::Offline => "none",
        }
    }

    pub fn key_variable(&self) -> Option<&'static str> {
        match self {
            Provider::Anthropic => Some("ANTHROPIC_API_KEY"),
            Provider::OpenAi => Some("OPENAI_API_KEY"),
            Provider::Offline => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAi => "openai",
            Provider::Offline => "offline",
        };
        f.write_str(name)
    }
}

/// Connection settings shared by the HTTP backends.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl ModelSettings {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 400,
            timeout: Duration::from_secs(60),
        }
    }
}

pub fn build_rewriter(provider: Provider, settings: Option<ModelSettings>) -> Result<Box<dyn Rewriter>> {
    let rewriter: Box<dyn Rewriter> = match (provider, settings) {
        (Provider::Offline, _) => Box::new(OfflineRewriter),
        (Provider::Anthropic, Some(settings)) => Box::new(AnthropicRewriter::new(settings)?),
        (Provider::OpenAi, Some(settings)) => Box::new(OpenAiRewriter::new(settings)?),
        (provider, None) => {
            return Err(crate::error::ChangegenError::Config(format!(
                "{provider} provider needs an API key"
            )))
        }
    };
    Ok(rewriter)
}

pub fn build_prompt(content: &str, kind: ContentKind, style: &StyleTemplate) -> String {
    let tone = style.tone;
    let mut prompt = format!(
        "Transform the content into a {tone} description.
Remove any sensitive information like:
- Internal URLs or endpoints
- Authentication details
- Database structures
- Environment variables
- Internal tool names
- User names or emails
- API keys or tokens

Content: {content}

Style Guide:
- Use {tone} language
- Start changes with appropriate verbs ({verbs})
- Focus on the impact and value of changes
- Remove technical implementation details
- Remove file names and paths
- Remove dates from descriptions

Example format: {example}

Response format: Start each line with \"- \" and use clear markdown formatting.
No introductions or comments, just the formatted content.",
        verbs = style.verb_list(),
        example = style.example,
    );

    if kind == ContentKind::Summary {
        prompt.push_str(
            "

Additional summary rules:
- Group similar changes together
- Prioritize major features and improvements
- Use bullet points only, without markdown headings
- Maintain chronological order (newest first)

No introductions or comments, just the formatted content.
",
        );
    }

    prompt
}

/// How a commit entry was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySource {
    Rewritten,
    Cached,
    Fallback,
}

/// Rewrite backend plus the retry policy, cache and style of one run.
pub struct RewriteService<'a> {
    rewriter: &'a dyn Rewriter,
    style: &'a StyleTemplate,
    policy: RetryPolicy,
    cache: Option<&'a RewriteCache>,
    sleep: fn(Duration),
}

impl<'a> RewriteService<'a> {
    pub fn new(rewriter: &'a dyn Rewriter, style: &'a StyleTemplate, policy: RetryPolicy) -> Self {
        Self {
            rewriter,
            style,
            policy,
            cache: None,
            sleep: std::thread::sleep,
        }
    }

    pub fn with_cache(mut self, cache: Option<&'a RewriteCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_sleep(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }

    fn call(&self, content: &str, kind: ContentKind) -> Result<String> {
        self.policy.run_with_sleep(
            |_| self.rewriter.rewrite(content, kind, self.style),
            self.sleep,
        )
    }

    /// Rewrites one commit. Never fails: after the retry budget is spent the
    /// raw first line is sanitized locally instead.
    pub fn rewrite_commit(&self, commit: &RawCommit) -> (CommitRecord, EntrySource) {
        let provider = self.rewriter.provider_name();

        if let Some(cache) = self.cache {
            match cache.get(&commit.id, self.style.name, provider, ContentKind::Commit) {
                Ok(Some(entry)) => {
                    tracing::debug!(commit = %commit.id, "rewrite cache hit");
                    return (CommitRecord::new(commit.date, &commit.title, &entry), EntrySource::Cached);
                }
                Ok(None) => {}
                Err(err) => tracing::warn!(error = %err, "rewrite cache lookup failed"),
            }
        }

        match self.call(&commit.title, ContentKind::Commit) {
            Ok(text) if !text.trim().is_empty() => {
                let entry = as_entry(&text);
                if let Some(cache) = self.cache {
                    if let Err(err) =
                        cache.put(&commit.id, self.style.name, provider, ContentKind::Commit, &entry)
                    {
                        tracing::warn!(error = %err, "failed to store rewrite in cache");
                    }
                }
                (CommitRecord::new(commit.date, &commit.title, &entry), EntrySource::Rewritten)
            }
            Ok(_) => {
                tracing::warn!(commit = %commit.id, "empty rewrite, using sanitized original");
                self.fallback(commit)
            }
            Err(err) => {
                tracing::warn!(commit = %commit.id, error = %err, "failed to format commit message, using sanitized original");
                self.fallback(commit)
            }
        }
    }

    fn fallback(&self, commit: &RawCommit) -> (CommitRecord, EntrySource) {
        let entry = sanitize_entry(&commit.title);
        (CommitRecord::new(commit.date, &commit.title, &entry), EntrySource::Fallback)
    }

    pub fn summarize(&self, body: &str) -> Result<String> {
        self.call(body, ContentKind::Summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChangegenError;
    use crate::style::find_style;
    use chrono::NaiveDate;
    use std::cell::Cell;

    struct Flaky {
        failures: Cell<u32>,
    }

    impl Rewriter for Flaky {
        fn rewrite(&self, content: &str, _kind: ContentKind, _style: &StyleTemplate) -> Result<String> {
            if self.failures.get() > 0 {
                self.failures.set(self.failures.get() - 1);
                return Err(ChangegenError::Rewrite("overloaded".to_string()));
            }
            Ok(format!("Added {content}"))
        }

        fn provider_name(&self) -> &'static str {
            "flaky"
        }
    }

    fn no_sleep(_: Duration) {}

    fn commit(title: &str) -> RawCommit {
        RawCommit::new("abc123", NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), title)
    }

    #[test]
    fn prompt_carries_style_and_summary_rules() {
        let style = find_style("playful").unwrap();
        let commit_prompt = build_prompt("fix: login", ContentKind::Commit, style);
        assert!(commit_prompt.contains("casual and exciting"));
        assert!(commit_prompt.contains("🐛 Squashed"));
        assert!(commit_prompt.contains("Content: fix: login"));
        assert!(!commit_prompt.contains("Additional summary rules"));

        let summary_prompt = build_prompt("- a", ContentKind::Summary, style);
        assert!(summary_prompt.contains("Additional summary rules"));
    }

    #[test]
    fn retries_transient_failures() {
        let style = find_style("regular").unwrap();
        let rewriter = Flaky { failures: Cell::new(2) };
        let service = RewriteService::new(&rewriter, style, RetryPolicy::default()).with_sleep(no_sleep);
        let (record, source) = service.rewrite_commit(&commit("login page"));
        assert_eq!(source, EntrySource::Rewritten);
        assert_eq!(record.rendered_entry, "- Added login page");
    }

    #[test]
    fn falls_back_to_sanitized_message() {
        let style = find_style("regular").unwrap();
        let rewriter = Flaky { failures: Cell::new(5) };
        let service = RewriteService::new(&rewriter, style, RetryPolicy::default()).with_sleep(no_sleep);
        let (record, source) = service.rewrite_commit(&commit("feat(ui): login page"));
        assert_eq!(source, EntrySource::Fallback);
        assert_eq!(record.rendered_entry, "- login page");
        assert_eq!(record.raw_first_line, "feat(ui): login page");
        assert_eq!(rewriter.failures.get(), 2);
    }

    #[test]
    fn providers_parse_by_name() {
        assert_eq!(Provider::from_name("OpenAI"), Some(Provider::OpenAi));
        assert_eq!(Provider::from_name("gemini"), None);
        assert_eq!(Provider::Anthropic.key_variable(), Some("ANTHROPIC_API_KEY"));
        assert!(build_rewriter(Provider::OpenAi, None).is_err());
        assert!(build_rewriter(Provider::Offline, None).is_ok());
    }
}
