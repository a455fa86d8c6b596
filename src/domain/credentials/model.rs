use serde::{Deserialize, Serialize};

/// Kind of remote work a credential is used for.
///
/// Each category owns one primary row of the credential blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    Speech,
    Media,
    Translation,
}

impl TaskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::Speech => "speech",
            TaskCategory::Media => "media",
            TaskCategory::Translation => "translation",
        }
    }

    /// Row layout used when nothing else is configured
    pub fn default_layout(&self) -> CategoryLayout {
        match self {
            TaskCategory::Speech => CategoryLayout::new(0, 2),
            TaskCategory::Media => CategoryLayout::new(1, 2),
            TaskCategory::Translation => CategoryLayout::new(2, 3),
        }
    }

    pub fn all() -> [TaskCategory; 3] {
        [
            TaskCategory::Speech,
            TaskCategory::Media,
            TaskCategory::Translation,
        ]
    }
}

impl std::fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TaskCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "speech" | "tts" => Ok(TaskCategory::Speech),
            "media" | "image_video" => Ok(TaskCategory::Media),
            "translation" | "translate" => Ok(TaskCategory::Translation),
            other => Err(format!("unknown task category: {}", other)),
        }
    }
}

/// Where a category finds its credentials in the blob
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryLayout {
    /// Row holding the category's primary credential
    pub primary_row: usize,
    /// First row of the shared fallback pool
    pub fallback_start: usize,
}

impl CategoryLayout {
    pub fn new(primary_row: usize, fallback_start: usize) -> Self {
        Self {
            primary_row,
            fallback_start,
        }
    }
}
