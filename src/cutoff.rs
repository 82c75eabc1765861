use crate::document::Document;
use crate::error::Result;
use crate::period::{period_end, Granularity};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

const MARKER_PREFIX: &str = "<!-- last: ";

struct HeadingPatterns {
    marker: Regex,
    iso: Regex,
    day: Regex,
    week: Regex,
    year: Regex,
    month: Regex,
}

fn patterns() -> &'static HeadingPatterns {
    static PATTERNS: OnceLock<HeadingPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| HeadingPatterns {
        marker: Regex::new(r"^<!-- last: (\d{4}-\d{2}-\d{2}) -->\s*$").expect("valid regex"),
        iso: Regex::new(r"^## (\d{4}-\d{2}-\d{2})\s*$").expect("valid regex"),
        day: Regex::new(r"^## (\d{2} [A-Z][a-z]{2} \d{4})\s*$").expect("valid regex"),
        week: Regex::new(r"^## \d{2} [A-Z][a-z]{2} \d{4} - (\d{2} [A-Z][a-z]{2} \d{4})\s*$")
            .expect("valid regex"),
        year: Regex::new(r"^## (\d{4})\s*$").expect("valid regex"),
        month: Regex::new(r"^### ([A-Z][a-z]+)\s*$").expect("valid regex"),
    })
}

/// Most recent date already recorded in a persisted changelog.
///
/// A `<!-- last: YYYY-MM-DD -->` marker, written for weekly and monthly
/// documents, names the newest collected commit and wins over headings.
/// Otherwise headings are scanned top to bottom and the first date-bearing one
/// wins, since sections are kept newest first. `## YYYY-MM-DD` and
/// `## DD Mon YYYY` headings give their date. Without a marker, weekly
/// `## <start> - <end>` headings give the week's end and monthly `## YYYY` /
/// `### Month` pairs give the month's last day.
pub fn latest_recorded_date(persisted: Option<&str>) -> Option<NaiveDate> {
    let text = persisted?;
    let p = patterns();
    let mut year: Option<i32> = None;

    for line in text.lines() {
        if let Some(caps) = p.marker.captures(line) {
            if let Ok(date) = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d") {
                return Some(date);
            }
        }
        if let Some(caps) = p.iso.captures(line) {
            if let Ok(date) = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d") {
                return Some(date);
            }
        }
        if let Some(caps) = p.day.captures(line) {
            if let Ok(date) = NaiveDate::parse_from_str(&caps[1], "%d %b %Y") {
                return Some(date);
            }
        }
        if let Some(caps) = p.week.captures(line) {
            if let Ok(date) = NaiveDate::parse_from_str(&caps[1], "%d %b %Y") {
                return Some(period_cutoff(date));
            }
        }
        if let Some(caps) = p.year.captures(line) {
            year = caps[1].parse().ok();
            continue;
        }
        if let (Some(y), Some(caps)) = (year, p.month.captures(line)) {
            let first = format!("01 {} {y}", &caps[1]);
            if let Ok(date) = NaiveDate::parse_from_str(&first, "%d %B %Y") {
                return Some(period_cutoff(period_end(date, Granularity::Month)));
            }
        }
    }

    None
}

fn period_cutoff(end: NaiveDate) -> NaiveDate {
    tracing::warn!(
        %end,
        "changelog has no last-date marker, using the end of its newest period as cutoff; \
         commits inside that period made after it was written are skipped"
    );
    end
}

/// Replaces the last-date marker in the preamble with one for `date`, or
/// removes it when `date` is `None`.
pub fn stamp_last_date(text: &str, date: Option<NaiveDate>) -> String {
    let mut doc = Document::parse(text);
    let mut preamble = String::new();
    let mut skip_blank = false;
    for line in doc.preamble.split_inclusive('\n') {
        if line.starts_with(MARKER_PREFIX) {
            skip_blank = true;
            continue;
        }
        if skip_blank && line.trim().is_empty() {
            skip_blank = false;
            continue;
        }
        skip_blank = false;
        preamble.push_str(line);
    }

    if let Some(date) = date {
        if !preamble.is_empty() && !preamble.ends_with("\n\n") {
            preamble.push_str(if preamble.ends_with('\n') { "\n" } else { "\n\n" });
        }
        preamble.push_str(&format!("{MARKER_PREFIX}{} -->\n\n", date.format("%Y-%m-%d")));
    }
    doc.preamble = preamble;
    doc.to_text()
}

/// Later of the persisted cutoff and an explicit `--after-date`.
pub fn effective_cutoff(recorded: Option<NaiveDate>, after: Option<NaiveDate>) -> Option<NaiveDate> {
    match (recorded, after) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

/// Takes commits from a newest-first sequence until one is dated on or before
/// `cutoff`, or until `limit` commits have been taken. The first error from
/// the sequence aborts collection.
///
/// This is a prefix scan: a source delivering out of order is truncated at the
/// first old commit it yields.
pub fn take_new<I, T, F>(
    commits: I,
    cutoff: Option<NaiveDate>,
    limit: Option<usize>,
    date_of: F,
) -> Result<Vec<T>>
where
    I: IntoIterator<Item = Result<T>>,
    F: Fn(&T) -> NaiveDate,
{
    let mut taken = Vec::new();
    for commit in commits {
        if limit.is_some_and(|max| taken.len() >= max) {
            break;
        }
        let commit = commit?;
        if cutoff.is_some_and(|c| date_of(&commit) <= c) {
            break;
        }
        taken.push(commit);
    }
    Ok(taken)
}
