use crate::document::{Document, Section};
use crate::render::compose;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Nothing was persisted; the new document is the output.
    Fresh,
    /// The persisted document had no period headings and was replaced.
    Degraded,
    /// New sections were prepended and the Summary replaced.
    SummaryReplaced,
    /// New sections were prepended; the persisted document had no Summary.
    Prepended,
}

#[derive(Debug, Clone)]
pub struct Merged {
    pub text: String,
    pub mode: MergeMode,
    pub new_sections: usize,
    pub kept_sections: usize,
}

/// Combines a freshly rendered document with the persisted one.
///
/// `new_body` may be a full rendered document; its title and Summary are
/// discarded and only its period sections are used. New sections are assumed
/// to be no older than every persisted section and are placed in front of
/// them. When the oldest new section and the newest persisted one share a
/// heading (a month or week that spans two runs) their entries are joined
/// under one heading. All other persisted sections are copied byte for byte.
pub fn merge(persisted: Option<&str>, new_body: &str, new_summary: Option<&str>) -> Merged {
    let fresh = Document::parse(new_body);
    let summary = new_summary
        .map(str::to_string)
        .or_else(|| fresh.summary.as_ref().map(|s| s.body.trim().to_string()));

    let existing = match persisted.filter(|text| !text.trim().is_empty()) {
        None => return fresh_document(&fresh, summary.as_deref(), MergeMode::Fresh),
        Some(text) => Document::parse(text),
    };

    if existing.is_malformed() {
        tracing::warn!("existing changelog has no period sections, writing a fresh one");
        return fresh_document(&fresh, summary.as_deref(), MergeMode::Degraded);
    }

    let new_sections = fresh.sections.len();
    let kept_sections = existing.sections.len();

    let (summary, mode) = match existing.summary {
        Some(old) => (
            Some(summary.as_deref().map(Section::summary).unwrap_or(old)),
            MergeMode::SummaryReplaced,
        ),
        None => (None, MergeMode::Prepended),
    };

    let mut sections = fresh.sections;
    let mut older = existing.sections.into_iter();
    if let Some(first_old) = older.next() {
        match sections.last_mut() {
            Some(last_new) if last_new.heading.trim_end() == first_old.heading.trim_end() => {
                last_new.body = join_bodies(&last_new.body, &first_old.body);
            }
            _ => sections.push(first_old),
        }
    }
    sections.extend(older);

    let merged = Document {
        preamble: existing.preamble,
        summary,
        sections,
    };

    Merged {
        text: merged.to_text(),
        mode,
        new_sections,
        kept_sections,
    }
}

/// Body of one period continued across two runs. A `### ` heading opening
/// the older body is dropped when the newer body already ends under the same
/// heading.
fn join_bodies(newer: &str, older: &str) -> String {
    let newer = newer.trim_end_matches('\n');
    let older = older.trim_start_matches('\n');
    let last_sub = newer.lines().rev().find(|line| line.starts_with("### "));

    match older.lines().next() {
        Some(first) if first.starts_with("### ") => {
            if last_sub.map(str::trim_end) == Some(first.trim_end()) {
                let rest = older.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
                format!("{newer}\n{}", rest.trim_start_matches('\n'))
            } else {
                format!("{newer}\n\n{older}")
            }
        }
        _ => format!("{newer}\n{older}"),
    }
}

fn fresh_document(fresh: &Document, summary: Option<&str>, mode: MergeMode) -> Merged {
    Merged {
        text: compose(summary, &fresh.sections_text()),
        mode,
        new_sections: fresh.sections.len(),
        kept_sections: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::model::CommitRecord;
    use crate::period::Granularity;
    use crate::render::{render, render_body};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn record(y: i32, m: u32, d: u32, msg: &str) -> CommitRecord {
        CommitRecord::new(NaiveDate::from_ymd_opt(y, m, d).unwrap(), msg, msg)
    }

    fn body(commits: &[CommitRecord], g: Granularity) -> String {
        render_body(&aggregate(commits, g).bucket, g)
    }

    #[test]
    fn nothing_persisted_yields_new_document() {
        let new = body(&[record(2024, 6, 2, "Add login"), record(2024, 6, 1, "Fix crash")], Granularity::Day);
        let merged = merge(None, &new, None);
        assert_eq!(merged.mode, MergeMode::Fresh);
        assert_eq!(
            merged.text,
            "# Changelog\n\n## 02 Jun 2024\n\n- Add login\n\n## 01 Jun 2024\n\n- Fix crash\n\n"
        );

        let with_summary = merge(Some("  \n"), &new, Some("- Login arrived"));
        assert_eq!(with_summary.mode, MergeMode::Fresh);
        assert!(with_summary.text.starts_with("# Changelog\n\n## Summary\n\n- Login arrived\n\n## 02 Jun 2024"));
    }

    #[test]
    fn new_sections_go_in_front_of_untouched_old_ones() {
        let persisted = "# Changelog\n\n## 2024-06-01\n\n- Fix crash\n";
        let new = body(&[record(2024, 6, 3, "Add login")], Granularity::Day);
        let merged = merge(Some(persisted), &new, None);

        assert_eq!(merged.mode, MergeMode::Prepended);
        assert_eq!(
            merged.text,
            "# Changelog\n\n## 03 Jun 2024\n\n- Add login\n\n## 2024-06-01\n\n- Fix crash\n"
        );
        assert_eq!((merged.new_sections, merged.kept_sections), (1, 1));
    }

    #[test]
    fn persisted_summary_is_replaced_not_appended() {
        let persisted = "# Changelog\n\n## Summary\n\n- Old summary\n\n## 01 Jun 2024\n\n- Fix crash\n\n";
        let new = render(&aggregate(&[record(2024, 6, 3, "Add login")], Granularity::Day).bucket, Granularity::Day);
        let merged = merge(Some(persisted), &new, Some("- New summary"));

        assert_eq!(merged.mode, MergeMode::SummaryReplaced);
        assert_eq!(
            merged.text,
            "# Changelog\n\n## Summary\n\n- New summary\n\n## 03 Jun 2024\n\n- Add login\n\n## 01 Jun 2024\n\n- Fix crash\n\n"
        );
        assert!(!merged.text.contains("Old summary"));
    }

    #[test]
    fn old_summary_survives_when_none_was_generated() {
        let persisted = "# Changelog\n\n## Summary\n\n- Old summary\n\n## 01 Jun 2024\n\n- Fix crash\n\n";
        let new = body(&[record(2024, 6, 3, "Add login")], Granularity::Day);
        let merged = merge(Some(persisted), &new, None);
        assert!(merged.text.contains("## Summary\n\n- Old summary\n\n## 03 Jun 2024"));
    }

    #[test]
    fn summary_is_dropped_when_persisted_had_none() {
        let persisted = "# Changelog\n\n## 01 Jun 2024\n\n- Fix crash\n\n";
        let new = body(&[record(2024, 6, 3, "Add login")], Granularity::Day);
        let merged = merge(Some(persisted), &new, Some("- Summary"));
        assert!(!merged.text.contains("## Summary"));
    }

    #[test]
    fn new_document_title_and_summary_are_stripped() {
        let persisted = "# Changelog\n\n## 01 Jun 2024\n\n- Fix crash\n\n";
        let new = "# Changelog\n\n## Summary\n\n- Stale\n\n## 03 Jun 2024\n\n- Add login\n\n";
        let merged = merge(Some(persisted), new, None);
        assert_eq!(merged.text.matches("# Changelog").count(), 1);
        assert!(!merged.text.contains("Stale"));
    }

    #[test]
    fn malformed_persisted_document_degrades_to_fresh() {
        let persisted = "Some notes without any headings\n";
        let new = body(&[record(2024, 6, 3, "Add login")], Granularity::Day);
        let merged = merge(Some(persisted), &new, None);
        assert_eq!(merged.mode, MergeMode::Degraded);
        assert_eq!(merged.text, "# Changelog\n\n## 03 Jun 2024\n\n- Add login\n\n");
    }

    #[test]
    fn merge_keeps_every_existing_section() {
        let persisted = "# Changelog\n\n## 05 Jun 2024\n\n- e\n\n## 04 Jun 2024\n\n- d\n\n## 2024-06-01\n\n- a\n";
        let new = body(&[record(2024, 6, 9, "z")], Granularity::Day);
        let merged = merge(Some(persisted), &new, None);
        let doc = Document::parse(&merged.text);
        assert_eq!(doc.sections.len(), 4);
        for old in Document::parse(persisted).sections {
            assert!(doc.sections.contains(&old));
        }
    }

    fn two_batches_and_one_run(older: Vec<CommitRecord>, newer: Vec<CommitRecord>, g: Granularity) -> (String, String) {
        let first = merge(None, &body(&older, g), None);
        let second = merge(Some(&first.text), &body(&newer, g), None);

        let mut all = newer;
        all.extend(older);
        let combined = merge(None, &body(&all, g), None);
        (second.text, combined.text)
    }

    #[test]
    fn merging_in_two_batches_matches_one_combined_run() {
        let older = vec![record(2024, 6, 2, "b"), record(2024, 6, 1, "a")];
        let newer = vec![record(2024, 6, 5, "d"), record(2024, 6, 4, "c")];
        let (batched, combined) = two_batches_and_one_run(older, newer, Granularity::Day);
        assert_eq!(batched, combined);
    }

    #[test]
    fn monthly_batches_share_the_year_heading() {
        let june = vec![record(2024, 6, 20, "b"), record(2024, 6, 2, "a")];
        let july = vec![record(2024, 7, 3, "c")];
        let (batched, combined) = two_batches_and_one_run(june, july, Granularity::Month);
        assert_eq!(batched, combined);
        assert_eq!(batched, "# Changelog\n\n## 2024\n\n### July\n\n- c\n\n### June\n\n- b\n- a\n\n");
    }

    #[test]
    fn month_spanning_two_runs_keeps_one_month_heading() {
        let early = vec![record(2024, 6, 2, "a")];
        let late = vec![record(2024, 6, 20, "b")];
        let (batched, combined) = two_batches_and_one_run(early, late, Granularity::Month);
        assert_eq!(batched, combined);
        assert_eq!(batched.matches("### June").count(), 1);
    }

    #[test]
    fn week_spanning_two_runs_keeps_one_week_heading() {
        let early = vec![record(2024, 6, 4, "a")];
        let late = vec![record(2024, 6, 7, "b")];
        let (batched, combined) = two_batches_and_one_run(early, late, Granularity::Week);
        assert_eq!(batched, combined);
        assert_eq!(batched, "# Changelog\n\n## 03 Jun 2024 - 09 Jun 2024\n\n- b\n- a\n\n");
    }

    #[test]
    fn headings_inside_a_summary_never_become_sections() {
        let first = merge(None, &body(&[record(2024, 6, 2, "- Added login")], Granularity::Day), Some("## 02 Jun 2024\n\n- Added login"));
        let new = body(&[record(2024, 6, 5, "- Fixed crash")], Granularity::Day);
        let second = merge(Some(&first.text), &new, Some("## 05 Jun 2024\n\n- Fixed crash\n# Highlights"));

        let doc = Document::parse(&second.text);
        assert_eq!(doc.sections.len(), 2);
        assert_eq!(second.text.matches("- Added login").count(), 1);
        assert!(!doc.summary.unwrap().body.contains("\n#"));
    }
}
