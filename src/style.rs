use serde::Serialize;

/// Change category a verb is picked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Updated,
    Fixed,
    Removed,
    Security,
    Performance,
}

impl ChangeKind {
    pub const ALL: [ChangeKind; 6] = [
        ChangeKind::Added,
        ChangeKind::Updated,
        ChangeKind::Fixed,
        ChangeKind::Removed,
        ChangeKind::Security,
        ChangeKind::Performance,
    ];
}

/// Writing style applied to every rewrite in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub verbs: [(ChangeKind, &'static str); 6],
    pub tone: &'static str,
    pub example: &'static str,
}

impl StyleTemplate {
    pub fn verb(&self, kind: ChangeKind) -> &'static str {
        self.verbs
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, v)| *v)
            .unwrap_or("Updated")
    }

    pub fn verb_list(&self) -> String {
        self.verbs.iter().map(|(_, v)| *v).collect::<Vec<_>>().join(", ")
    }
}

pub const DEFAULT_STYLE: &str = "regular";

pub static STYLES: [StyleTemplate; 3] = [
    StyleTemplate {
        name: "playful",
        description: "Fun and energetic with emojis",
        verbs: [
            (ChangeKind::Added, "🚀 Launched"),
            (ChangeKind::Updated, "✨ Leveled up"),
            (ChangeKind::Fixed, "🐛 Squashed"),
            (ChangeKind::Removed, "🗑️ Cleaned up"),
            (ChangeKind::Security, "🔒 Secured"),
            (ChangeKind::Performance, "⚡ Turbocharged"),
        ],
        tone: "casual and exciting",
        example: "🚀 Launched an awesome new chat feature",
    },
    StyleTemplate {
        name: "regular",
        description: "Clear and straightforward",
        verbs: [
            (ChangeKind::Added, "Added"),
            (ChangeKind::Updated, "Updated"),
            (ChangeKind::Fixed, "Fixed"),
            (ChangeKind::Removed, "Removed"),
            (ChangeKind::Security, "Secured"),
            (ChangeKind::Performance, "Improved"),
        ],
        tone: "clear and direct",
        example: "Added new chat feature",
    },
    StyleTemplate {
        name: "corporate",
        description: "Professional and detailed",
        verbs: [
            (ChangeKind::Added, "Implemented"),
            (ChangeKind::Updated, "Enhanced"),
            (ChangeKind::Fixed, "Resolved"),
            (ChangeKind::Removed, "Deprecated"),
            (ChangeKind::Security, "Strengthened"),
            (ChangeKind::Performance, "Optimized"),
        ],
        tone: "formal and comprehensive",
        example: "Implemented enhanced communication functionality for improved user engagement",
    },
];

pub fn find_style(name: &str) -> Option<&'static StyleTemplate> {
    let name = name.trim().to_lowercase();
    STYLES.iter().find(|s| s.name == name)
}

pub fn style_names() -> Vec<&'static str> {
    STYLES.iter().map(|s| s.name).collect()
}
