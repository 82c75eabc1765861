use crate::render::{demote_headings, SUMMARY_HEADING};

const SECTION_PREFIX: &str = "## ";

/// A `## ` heading line and the raw text up to the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: String,
    pub body: String,
}

impl Section {
    pub fn summary(text: &str) -> Self {
        Self {
            heading: SUMMARY_HEADING.to_string(),
            body: format!("\n{}\n\n", demote_headings(text)),
        }
    }

    pub fn title(&self) -> &str {
        self.heading.trim_start_matches(SECTION_PREFIX).trim()
    }

    pub fn is_summary(&self) -> bool {
        self.heading.trim_end() == SUMMARY_HEADING
    }

    fn write_to(&self, out: &mut String, last: bool) {
        out.push_str(&self.heading);
        out.push('\n');
        out.push_str(&self.body);
        if !last && !self.body.ends_with('\n') {
            out.push('\n');
        }
    }
}

/// A changelog split into its preamble (title and anything before the first
/// `## ` heading), an optional Summary section and the period sections.
///
/// Parsing keeps every byte, so `Document::parse(text).to_text() == text` for
/// any document whose Summary (if any) precedes its period sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub preamble: String,
    pub summary: Option<Section>,
    pub sections: Vec<Section>,
}

impl Document {
    pub fn parse(text: &str) -> Self {
        let mut doc = Document::default();
        let mut current: Option<Section> = None;

        for line in text.split_inclusive('\n') {
            if line.starts_with(SECTION_PREFIX) {
                if let Some(section) = current.take() {
                    doc.push(section);
                }
                current = Some(Section {
                    heading: line.trim_end_matches(['\n', '\r']).to_string(),
                    body: String::new(),
                });
                continue;
            }
            match current.as_mut() {
                Some(section) => section.body.push_str(line),
                None => doc.preamble.push_str(line),
            }
        }
        if let Some(section) = current {
            doc.push(section);
        }

        doc
    }

    fn push(&mut self, section: Section) {
        if section.is_summary() && self.summary.is_none() {
            self.summary = Some(section);
        } else {
            self.sections.push(section);
        }
    }

    pub fn has_summary(&self) -> bool {
        self.summary.is_some()
    }

    pub fn is_malformed(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn sections_text(&self) -> String {
        let mut out = String::new();
        let count = self.sections.len();
        for (i, section) in self.sections.iter().enumerate() {
            section.write_to(&mut out, i + 1 == count);
        }
        out
    }

    pub fn to_text(&self) -> String {
        let mut out = self.preamble.clone();
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        if let Some(summary) = &self.summary {
            summary.write_to(&mut out, self.sections.is_empty());
        }
        out.push_str(&self.sections_text());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = "# Changelog\n\n## Summary\n\n- Lots happened\n\n\
                       ## 2024\n\n### June\n\n- a\n\n## 2023\n\n### May\n\n- b\n";

    #[test]
    fn splits_preamble_summary_and_sections() {
        let doc = Document::parse(DOC);
        assert_eq!(doc.preamble, "# Changelog\n\n");
        assert_eq!(doc.summary.as_ref().map(|s| s.body.as_str()), Some("\n- Lots happened\n\n"));
        let titles: Vec<_> = doc.sections.iter().map(Section::title).collect();
        assert_eq!(titles, ["2024", "2023"]);
        assert_eq!(doc.sections[0].body, "\n### June\n\n- a\n\n");
    }

    #[test]
    fn round_trips_text() {
        assert_eq!(Document::parse(DOC).to_text(), DOC);
        let plain = "# Changelog\n\n## 02 Jun 2024\n\n- a\n\n## 01 Jun 2024\n\n- b\n\n";
        assert_eq!(Document::parse(plain).to_text(), plain);
    }

    #[test]
    fn month_headings_stay_inside_year_sections() {
        let doc = Document::parse("# Changelog\n\n### June\n\n- orphan\n");
        assert!(doc.is_malformed());
        assert_eq!(doc.preamble, "# Changelog\n\n### June\n\n- orphan\n");
    }

    #[test]
    fn replacing_summary_uses_canonical_layout() {
        let mut doc = Document::parse(DOC);
        doc.summary = Some(Section::summary("- Fresh summary"));
        assert!(doc.to_text().starts_with("# Changelog\n\n## Summary\n\n- Fresh summary\n\n## 2024\n"));
    }

    #[test]
    fn missing_trailing_newline_does_not_glue_sections() {
        let mut doc = Document::parse("# Changelog\n\n## 01 Jun 2024\n\n- a");
        let newer = Document::parse("## 03 Jun 2024\n\n- c");
        let mut sections = newer.sections;
        sections.append(&mut doc.sections);
        doc.sections = sections;
        assert_eq!(doc.to_text(), "# Changelog\n\n## 03 Jun 2024\n\n- c\n## 01 Jun 2024\n\n- a");
    }
}
