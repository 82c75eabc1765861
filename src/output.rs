use crate::aggregate::ChangelogBucket;
use crate::config::{RunConfig, SourceSpec};
use crate::merge::{MergeMode, Merged};
use crate::period::{format_label, Granularity};
use crate::source::SourceInfo;
use crate::style::STYLES;
use console::style;
use std::path::Path;

/// Status lines go to stderr so `--dry-run` output on stdout stays a clean
/// document.
pub fn prerequisites(config: &RunConfig) {
    eprintln!("\n{}", style("=== Changelog Generator ===").cyan().bold());
    eprintln!("{}", style("Checking prerequisites...").cyan());

    if matches!(config.source, SourceSpec::Github(_)) {
        if config.github_token.is_some() {
            eprintln!("{} GitHub token", style("✓").green());
        } else {
            eprintln!("{} GitHub token missing (public repositories only)", style("!").yellow());
        }
    }
    match config.provider.key_variable() {
        Some(variable) => eprintln!("{} {variable}", style("✓").green()),
        None => eprintln!("{} offline rewriting, no API key needed", style("✓").green()),
    }
}

pub fn banner(info: &SourceInfo) {
    eprintln!("\n{} Repository found: {}", style("✓").green(), style(&info.name).bold());
    eprintln!("  Branch: {}", info.branch);
    eprintln!(
        "  Description: {}",
        info.description.as_deref().unwrap_or("No description")
    );
    if let Some(total) = info.total_commits {
        eprintln!("  Repository has {} total commits", style(total).cyan());
    }
}

pub fn no_new_commits() {
    println!("No new commits found since last changelog update.");
}

pub fn distribution(bucket: &ChangelogBucket, granularity: Granularity) {
    eprintln!("\n{}", style("Commit distribution:").cyan());
    for (period, count) in bucket.distribution() {
        eprintln!("  {}: {count} commits", format_label(period.date(), granularity));
    }
    eprintln!("Total commits preserved: {}", style(bucket.total_entries()).cyan());
}

pub fn totals(processed: usize, cached: usize, fallbacks: usize) {
    eprintln!("\nProcessed {} commits", style(processed).cyan());
    if cached > 0 {
        eprintln!("  {} reused from the rewrite cache", style(cached).cyan());
    }
    if fallbacks > 0 {
        eprintln!("  {} kept as sanitized originals", style(fallbacks).yellow());
    }
}

pub fn next_steps(path: &Path, merged: &Merged) {
    let action = match merged.mode {
        MergeMode::Fresh => "Created",
        MergeMode::Degraded => "Rewrote",
        MergeMode::SummaryReplaced | MergeMode::Prepended => "Updated",
    };
    eprintln!(
        "\n{} {action} {} ({} new sections, {} kept)",
        style("✓").green(),
        style(path.display()).bold(),
        merged.new_sections,
        merged.kept_sections
    );
    eprintln!("\n{}", style("Next steps").bold());
    eprintln!("  Review the new entries, then commit {}", path.display());
    eprintln!("  Re-run later to prepend only commits newer than the last recorded period");
}

pub fn styles() {
    println!("{}", style("Writing styles").bold());
    println!("{}", "─".repeat(50));
    for template in STYLES.iter() {
        println!("{}", style(template.name).cyan().bold());
        println!("  {}", template.description);
        println!("  Verbs: {}", template.verb_list());
        println!("  Example: {}\n", template.example);
    }
}
