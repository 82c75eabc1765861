use crate::cli::{CommonArgs, GenerateArgs};
use crate::error::{ChangegenError, Result};
use crate::period::Granularity;
use crate::rewrite::{ModelSettings, Provider};
use crate::style::{find_style, style_names, StyleTemplate};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

pub const DEFAULT_COMMIT_LIMIT: usize = 100;
pub const DEFAULT_CHANGELOG: &str = "CHANGELOG.md";

/// Where commits are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Github(String),
    Local(PathBuf),
}

/// Everything one `generate` run needs, resolved once before the pipeline
/// starts.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub source: SourceSpec,
    pub branch: Option<String>,
    pub limit: Option<usize>,
    pub granularity: Granularity,
    pub style: &'static StyleTemplate,
    pub provider: Provider,
    pub model: Option<ModelSettings>,
    pub github_token: Option<String>,
    pub after_date: Option<NaiveDate>,
    pub changelog: PathBuf,
    pub cache_dir: Option<PathBuf>,
    pub use_cache: bool,
    pub dry_run: bool,
    pub summary: bool,
}

impl RunConfig {
    pub fn from_env(common: &CommonArgs, args: &GenerateArgs) -> Result<Self> {
        Self::from_args(common, args, |name| std::env::var(name).ok())
    }

    /// Builds the run configuration, reading secrets through `env`.
    pub fn from_args<E>(common: &CommonArgs, args: &GenerateArgs, env: E) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let source = match (&args.local, &args.source) {
            (Some(path), _) => SourceSpec::Local(path.clone()),
            (None, Some(repo)) => SourceSpec::Github(repo.clone()),
            (None, None) => {
                return Err(ChangegenError::Config(
                    "no commit source given: pass a GitHub repository (owner/repo) or --local <PATH>"
                        .to_string(),
                ))
            }
        };

        let style = find_style(&args.style).ok_or_else(|| {
            ChangegenError::Config(format!(
                "unknown style '{}', choose one of: {}",
                args.style,
                style_names().join(", ")
            ))
        })?;

        let provider = Provider::from_name(&args.provider).ok_or_else(|| {
            ChangegenError::Config(format!(
                "unknown provider '{}', choose one of: anthropic, openai, offline",
                args.provider
            ))
        })?;

        let model = match provider.key_variable() {
            None => None,
            Some(variable) => {
                let key = env(variable).filter(|k| !k.trim().is_empty()).ok_or_else(|| {
                    ChangegenError::Config(format!(
                        "{variable} environment variable is not set\n  export {variable}='your-key'\n  or run with --provider offline"
                    ))
                })?;
                let name = args
                    .model
                    .clone()
                    .unwrap_or_else(|| provider.default_model().to_string());
                Some(ModelSettings::new(key, name))
            }
        };

        let github_token = env("GITHUB_TOKEN").filter(|t| !t.trim().is_empty());
        if github_token.is_none() && matches!(source, SourceSpec::Github(_)) {
            tracing::warn!("GITHUB_TOKEN is not set, GitHub requests are unauthenticated and rate limited");
        }

        let after_date = args.after_date.as_deref().map(parse_date).transpose()?;

        Ok(Self {
            source,
            branch: args.branch.clone(),
            limit: parse_limit(&args.num_commits),
            granularity: parse_granularity(&args.group_by),
            style,
            provider,
            model,
            github_token,
            after_date,
            changelog: changelog_path(common),
            cache_dir: common.cache.clone(),
            use_cache: !common.no_cache,
            dry_run: args.dry_run,
            summary: !args.no_summary,
        })
    }

    /// Directory holding the changelog, used for the default cache location.
    pub fn document_dir(&self) -> PathBuf {
        document_dir(&self.changelog)
    }
}

pub fn changelog_path(common: &CommonArgs) -> PathBuf {
    common
        .changelog
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CHANGELOG))
}

pub fn document_dir(changelog: &Path) -> PathBuf {
    match changelog.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// `all` means no limit; anything unparsable falls back to the default.
pub fn parse_limit(input: &str) -> Option<usize> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("all") {
        return None;
    }
    match input.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!(input, "invalid commit count, using default: {DEFAULT_COMMIT_LIMIT}");
            Some(DEFAULT_COMMIT_LIMIT)
        }
    }
}

pub fn parse_granularity(input: &str) -> Granularity {
    Granularity::parse_known(input).unwrap_or_else(|| {
        tracing::warn!(input, "unknown grouping, grouping by day");
        Granularity::Day
    })
}

pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| ChangegenError::InvalidDate(format!("expected YYYY-MM-DD, got '{input}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[clap(flatten)]
        common: CommonArgs,
        #[clap(flatten)]
        generate: GenerateArgs,
    }

    fn build(argv: &[&str], env: &[(&str, &str)]) -> Result<RunConfig> {
        let mut full = vec!["changegen"];
        full.extend_from_slice(argv);
        let parsed = Harness::parse_from(full);
        RunConfig::from_args(&parsed.common, &parsed.generate, |name| {
            env.iter().find(|(k, _)| *k == name).map(|(_, v)| v.to_string())
        })
    }

    #[test]
    fn defaults_for_a_github_source() {
        let config = build(&["owner/repo"], &[("ANTHROPIC_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.source, SourceSpec::Github("owner/repo".to_string()));
        assert_eq!(config.limit, Some(DEFAULT_COMMIT_LIMIT));
        assert_eq!(config.granularity, Granularity::Day);
        assert_eq!(config.style.name, "regular");
        assert_eq!(config.provider, Provider::Anthropic);
        let model = config.model.unwrap();
        assert_eq!(model.model, "claude-3-5-sonnet-20240620");
        assert_eq!(model.max_tokens, 400);
        assert_eq!(config.changelog, PathBuf::from(DEFAULT_CHANGELOG));
        assert!(config.use_cache && config.summary && !config.dry_run);
    }

    #[test]
    fn missing_provider_key_is_a_config_error() {
        let err = build(&["owner/repo", "--provider", "openai"], &[]).unwrap_err();
        assert!(matches!(err, ChangegenError::Config(ref msg) if msg.contains("OPENAI_API_KEY")));
    }

    #[test]
    fn offline_needs_no_key() {
        let config = build(&["--local", ".", "--provider", "offline", "-n", "all"], &[]).unwrap();
        assert!(config.model.is_none());
        assert_eq!(config.limit, None);
        assert_eq!(config.source, SourceSpec::Local(PathBuf::from(".")));
    }

    #[test]
    fn lenient_inputs_fall_back() {
        assert_eq!(parse_limit("abc"), Some(DEFAULT_COMMIT_LIMIT));
        assert_eq!(parse_limit("ALL"), None);
        assert_eq!(parse_limit("25"), Some(25));
        assert_eq!(parse_granularity("fortnight"), Granularity::Day);
        assert_eq!(parse_granularity("month"), Granularity::Month);
    }

    #[test]
    fn unknown_style_and_bad_date_are_rejected() {
        assert!(build(&["--local", ".", "--provider", "offline", "--style", "gothic"], &[]).is_err());
        let err = build(&["--local", ".", "--provider", "offline", "--after-date", "June"], &[]).unwrap_err();
        assert!(matches!(err, ChangegenError::InvalidDate(_)));
    }

    #[test]
    fn a_source_is_required() {
        assert!(matches!(
            build(&["--provider", "offline"], &[]).unwrap_err(),
            ChangegenError::Config(_)
        ));
    }

    #[test]
    fn document_dir_of_bare_file_is_cwd() {
        assert_eq!(document_dir(Path::new("CHANGELOG.md")), PathBuf::from("."));
        assert_eq!(document_dir(Path::new("docs/CHANGELOG.md")), PathBuf::from("docs"));
    }
}
