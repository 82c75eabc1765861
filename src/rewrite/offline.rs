use super::{ContentKind, Rewriter};
use crate::error::{ChangegenError, Result};
use crate::model::sanitize_entry;
use crate::style::{ChangeKind, StyleTemplate};

/// Rewrites without any network access: commit titles get the style's verb
/// for their detected change kind, summaries are not produced.
pub struct OfflineRewriter;

impl OfflineRewriter {
    fn classify(title: &str) -> Option<ChangeKind> {
        let lower = title.to_lowercase();
        let head = lower.split([':', ' ', '(']).next().unwrap_or("");
        let kind = match head {
            "feat" | "add" | "added" | "adds" => ChangeKind::Added,
            "fix" | "fixed" | "fixes" | "bugfix" => ChangeKind::Fixed,
            "remove" | "removed" | "delete" | "deleted" | "drop" => ChangeKind::Removed,
            "security" | "sec" => ChangeKind::Security,
            "perf" | "optimize" | "speed" => ChangeKind::Performance,
            "update" | "updated" | "refactor" | "chore" | "docs" | "change" | "bump" => {
                ChangeKind::Updated
            }
            _ => return None,
        };
        Some(kind)
    }
}

impl Rewriter for OfflineRewriter {
    fn rewrite(&self, content: &str, kind: ContentKind, style: &StyleTemplate) -> Result<String> {
        if kind == ContentKind::Summary {
            return Err(ChangegenError::Rewrite(
                "summaries need a text-generation provider".to_string(),
            ));
        }

        let description = sanitize_entry(content);
        let description = description.trim_start_matches("- ").trim();
        let line = match Self::classify(content) {
            Some(change) if content.contains(':') || description.split_whitespace().count() > 1 => {
                let rest = if content.contains(':') {
                    description.to_string()
                } else {
                    description
                        .split_once(' ')
                        .map(|(_, rest)| rest.to_string())
                        .unwrap_or_default()
                };
                format!("- {} {}", style.verb(change), rest).trim_end().to_string()
            }
            _ => format!("- {description}"),
        };
        Ok(line)
    }

    fn provider_name(&self) -> &'static str {
        "offline"
    }
}
