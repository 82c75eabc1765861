use crate::aggregate::{aggregate, newest_date, ChangelogBucket};
use crate::cache::RewriteCache;
use crate::cli::{CommonArgs, GenerateArgs};
use crate::config::{changelog_path, parse_granularity, RunConfig, SourceSpec};
use crate::cutoff::{effective_cutoff, latest_recorded_date, stamp_last_date, take_new};
use crate::document::Document;
use crate::error::Result;
use crate::merge::{merge, Merged};
use crate::model::{CommitRecord, RawCommit};
use crate::output;
use crate::period::Granularity;
use crate::render::{render, render_body, summarize};
use crate::retry::RetryPolicy;
use crate::rewrite::{build_rewriter, EntrySource, Provider, RewriteService};
use crate::source::{CommitSource, GithubSource, LocalRepo};
use anyhow::Context;
use chrono::NaiveDate;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// What a `generate` run ended with.
#[derive(Debug)]
pub enum Outcome {
    NoNewCommits,
    Written(Merged),
    Printed(Merged),
}

pub fn exec(common: CommonArgs, args: GenerateArgs) -> anyhow::Result<()> {
    let config = RunConfig::from_env(&common, &args).context("Invalid configuration")?;
    output::prerequisites(&config);

    match run(&config)? {
        Outcome::NoNewCommits => output::no_new_commits(),
        Outcome::Printed(merged) => print!("{}", merged.text),
        Outcome::Written(merged) => output::next_steps(&config.changelog, &merged),
    }
    Ok(())
}

pub fn exec_cutoff(common: CommonArgs) -> anyhow::Result<()> {
    let path = changelog_path(&common);
    let persisted = read_persisted(&path).context("Failed to read changelog")?;

    match (persisted.as_deref(), latest_recorded_date(persisted.as_deref())) {
        (None, _) => println!("No changelog at {}; every commit is new.", path.display()),
        (Some(_), None) => println!(
            "{} has no dated sections; every commit is new.",
            path.display()
        ),
        (Some(_), Some(date)) => println!(
            "Last recorded date: {} (commits after it are new)",
            style(date.format("%Y-%m-%d")).cyan()
        ),
    }
    Ok(())
}

pub fn exec_preview(input: PathBuf, group_by: String) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let records = load_records(&raw).context("Failed to parse commit records")?;
    print!("{}", preview(&records, parse_granularity(&group_by)));
    Ok(())
}

/// Commit records from JSON, with every entry normalized to a bullet.
pub fn load_records(raw: &str) -> Result<Vec<CommitRecord>> {
    let records: Vec<CommitRecord> = serde_json::from_str(raw)
        .map_err(|err| crate::error::ChangegenError::Parse(format!("invalid commit records: {err}")))?;
    Ok(records
        .into_iter()
        .map(|r| CommitRecord::new(r.date, r.raw_first_line, &r.rendered_entry))
        .collect())
}

/// Renders already-rewritten records into a complete document.
pub fn preview(records: &[CommitRecord], granularity: Granularity) -> String {
    render(&aggregate(records, granularity).bucket, granularity)
}

/// Runs the whole generation once: collect, rewrite, aggregate, render,
/// summarize, merge, then write (or print on a dry run).
pub fn run(config: &RunConfig) -> Result<Outcome> {
    let persisted = read_persisted(&config.changelog)?;
    let recorded = latest_recorded_date(persisted.as_deref());
    let cutoff = effective_cutoff(recorded, config.after_date);
    if let Some(date) = cutoff {
        tracing::debug!(%date, "collecting commits newer than cutoff");
    }

    let source = open_source(config)?;
    output::banner(source.info());

    let commits = collect_new(source.as_ref(), cutoff, config.limit)?;
    if commits.is_empty() {
        return Ok(Outcome::NoNewCommits);
    }

    let rewriter = build_rewriter(config.provider, config.model.clone())?;
    let cache = open_cache(config);
    let service = RewriteService::new(rewriter.as_ref(), config.style, RetryPolicy::default())
        .with_cache(cache.as_ref());

    let records = rewrite_all(&service, &commits);
    let bucket = group(&records, config.granularity);
    output::distribution(&bucket, config.granularity);

    let body = render_body(&bucket, config.granularity);
    let summary = if config.summary && config.provider != Provider::Offline {
        combined_summary(persisted.as_deref(), &body, &service)
    } else {
        None
    };

    let merged = finish(persisted.as_deref(), &body, summary.as_deref(), &records, config.granularity);
    if config.dry_run {
        return Ok(Outcome::Printed(merged));
    }

    std::fs::write(&config.changelog, &merged.text)?;
    Ok(Outcome::Written(merged))
}

/// Merges the new body and records the newest collected date for weekly and
/// monthly documents, whose headings alone cannot tell how far a period was
/// already covered.
pub fn finish(
    persisted: Option<&str>,
    body: &str,
    summary: Option<&str>,
    records: &[CommitRecord],
    granularity: Granularity,
) -> Merged {
    let mut merged = merge(persisted, body, summary);
    let last = match granularity {
        Granularity::Day => None,
        Granularity::Week | Granularity::Month => newest_date(records),
    };
    merged.text = stamp_last_date(&merged.text, last);
    merged
}

/// The persisted document, or `None` if there is none yet.
pub fn read_persisted(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

pub fn open_source(config: &RunConfig) -> Result<Box<dyn CommitSource>> {
    let source: Box<dyn CommitSource> = match &config.source {
        SourceSpec::Github(repo) => Box::new(GithubSource::connect(
            repo,
            config.github_token.clone(),
            config.branch.as_deref(),
        )?),
        SourceSpec::Local(path) => Box::new(LocalRepo::open(Some(path), config.branch.as_deref())?),
    };
    Ok(source)
}

pub fn collect_new(
    source: &dyn CommitSource,
    cutoff: Option<NaiveDate>,
    limit: Option<usize>,
) -> Result<Vec<RawCommit>> {
    take_new(source.commits()?, cutoff, limit, |commit: &RawCommit| commit.date)
}

fn open_cache(config: &RunConfig) -> Option<RewriteCache> {
    if !config.use_cache {
        return None;
    }
    RewriteCache::new(config.cache_dir.as_ref(), config.document_dir())
        .map_err(|err| tracing::warn!(error = %err, "rewrite cache unavailable, continuing without it"))
        .ok()
}

/// Rewrites every commit in order. Individual failures fall back to the
/// sanitized title, so the output always has one record per input.
pub fn rewrite_all(service: &RewriteService<'_>, commits: &[RawCommit]) -> Vec<CommitRecord> {
    let pb = ProgressBar::new(commits.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb.set_message("Rewriting commits...");

    let mut cached = 0;
    let mut fallbacks = 0;
    let mut records = Vec::with_capacity(commits.len());
    for commit in commits {
        let (record, origin) = service.rewrite_commit(commit);
        match origin {
            EntrySource::Cached => cached += 1,
            EntrySource::Fallback => fallbacks += 1,
            EntrySource::Rewritten => {}
        }
        records.push(record);
        pb.inc(1);
    }
    pb.finish_and_clear();

    output::totals(records.len(), cached, fallbacks);
    records
}

fn group(records: &[CommitRecord], granularity: Granularity) -> ChangelogBucket {
    let aggregation = aggregate(records, granularity);
    if !aggregation.preserved() {
        tracing::warn!("some commits were lost while grouping");
    }
    aggregation.bucket
}

/// Summary of the document as it will look after the merge, so the summary
/// covers old and new sections alike.
fn combined_summary(persisted: Option<&str>, body: &str, service: &RewriteService<'_>) -> Option<String> {
    let combined = merge(persisted, body, None);
    let sections = Document::parse(&combined.text).sections_text();
    summarize(&sections, |text| service.summarize(text))
}
