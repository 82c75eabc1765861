use crate::aggregate::ChangelogBucket;
use crate::error::Result;
use crate::period::{format_label, DisplayLabel, Granularity};

pub const TITLE: &str = "# Changelog";
pub const SUMMARY_HEADING: &str = "## Summary";

/// Full document for a bucket: title followed by the period sections.
pub fn render(bucket: &ChangelogBucket, granularity: Granularity) -> String {
    compose(None, &render_body(bucket, granularity))
}

/// Period sections only, newest first.
///
/// Monthly grouping emits a `## <year>` heading whenever the year changes and a
/// `### <Month>` heading whenever the `(year, month)` pair changes. Daily and
/// weekly grouping emit one `## <label>` heading per period.
pub fn render_body(bucket: &ChangelogBucket, granularity: Granularity) -> String {
    let mut out = String::new();
    let mut current_year: Option<String> = None;
    let mut current_month: Option<(String, String)> = None;

    for (period, entries) in bucket.iter_desc() {
        match format_label(period.date(), granularity) {
            DisplayLabel::YearMonth(year, month) => {
                if current_year.as_deref() != Some(year.as_str()) {
                    out.push_str(&format!("## {year}\n\n"));
                    current_year = Some(year.clone());
                }
                let pair = (year, month);
                if current_month.as_ref() != Some(&pair) {
                    out.push_str(&format!("### {}\n\n", pair.1));
                    current_month = Some(pair);
                }
            }
            DisplayLabel::Flat(label) => out.push_str(&format!("## {label}\n\n")),
        }

        for entry in entries {
            out.push_str(entry);
            out.push('\n');
        }
        out.push('\n');
    }

    out
}

/// Title, optional summary section, then the body.
pub fn compose(summary: Option<&str>, body: &str) -> String {
    let mut out = format!("{TITLE}\n\n");
    if let Some(summary) = summary {
        out.push_str(&summary_section(summary));
    }
    out.push_str(body);
    out
}

pub fn summary_section(summary: &str) -> String {
    format!("{SUMMARY_HEADING}\n\n{}\n\n", demote_headings(summary))
}

/// Turns markdown heading lines into bold lines so generated prose can never
/// open a section of its own.
pub fn demote_headings(text: &str) -> String {
    text.trim()
        .lines()
        .map(|line| match line.trim_start().strip_prefix('#') {
            Some(rest) => {
                let title = rest.trim_start_matches('#').trim();
                if title.is_empty() {
                    String::new()
                } else {
                    format!("**{title}**")
                }
            }
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Runs the summary rewrite over `body`. A failure yields `None` and a
/// warning; the unsummarized document stays valid.
pub fn summarize<F>(body: &str, rewrite: F) -> Option<String>
where
    F: FnOnce(&str) -> Result<String>,
{
    if body.trim().is_empty() {
        return None;
    }
    match rewrite(body) {
        Ok(summary) if !summary.trim().is_empty() => Some(demote_headings(&summary)),
        Ok(_) => {
            tracing::warn!("summary rewrite returned nothing, keeping the plain changelog");
            None
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to generate summary, keeping the plain changelog");
            None
        }
    }
}
