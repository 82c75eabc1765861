use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u32 = 1;

pub const ENTRY_MARKER: &str = "- ";

/// A commit as delivered by a commit source, before any rewriting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCommit {
    pub id: String,
    pub date: NaiveDate,
    pub title: String,
}

impl RawCommit {
    pub fn new(id: impl Into<String>, date: NaiveDate, message: &str) -> Self {
        Self {
            id: id.into(),
            date,
            title: message.lines().next().unwrap_or("").trim().to_string(),
        }
    }
}

/// A commit after rewriting; `rendered_entry` always begins with `- `.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub date: NaiveDate,
    pub raw_first_line: String,
    pub rendered_entry: String,
}

impl CommitRecord {
    pub fn new(date: NaiveDate, raw_first_line: impl Into<String>, entry: &str) -> Self {
        Self {
            date,
            raw_first_line: raw_first_line.into(),
            rendered_entry: as_entry(entry),
        }
    }
}

/// Trims `text` and makes sure it starts with the bullet marker. Heading
/// markers are stripped from every line so an entry cannot open a section.
pub fn as_entry(text: &str) -> String {
    let cleaned = text
        .lines()
        .map(|line| match line.trim_start().strip_prefix('#') {
            Some(rest) => rest.trim_start_matches('#').trim(),
            None => line.trim_end(),
        })
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    let trimmed = cleaned.trim();
    if trimmed.starts_with(ENTRY_MARKER) {
        trimmed.to_string()
    } else {
        format!("{ENTRY_MARKER}{trimmed}")
    }
}

/// Local stand-in for a rewritten entry: the text after the last `:`.
pub fn sanitize_entry(raw_first_line: &str) -> String {
    let tail = raw_first_line.rsplit(':').next().unwrap_or(raw_first_line);
    format!("{ENTRY_MARKER}{}", tail.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_commit_keeps_first_line_only() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let commit = RawCommit::new("abc", date, "Fix crash\n\nLong body here");
        assert_eq!(commit.title, "Fix crash");
    }

    #[test]
    fn entries_get_a_bullet_marker() {
        assert_eq!(as_entry("Added login"), "- Added login");
        assert_eq!(as_entry("  - Added login \n"), "- Added login");
    }

    #[test]
    fn entries_never_carry_headings() {
        assert_eq!(as_entry("## 02 Jun 2024\n\n- Added login"), "- 02 Jun 2024\n- Added login");
        assert!(!as_entry("### Added\n- search").contains('#'));
    }

    #[test]
    fn sanitize_drops_conventional_prefix() {
        assert_eq!(sanitize_entry("feat(auth): add login"), "- add login");
        assert_eq!(sanitize_entry("Fix crash"), "- Fix crash");
        assert_eq!(sanitize_entry("a: b: c"), "- c");
    }
}
