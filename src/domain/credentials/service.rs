use super::model::{CategoryLayout, TaskCategory};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};

/// Number of leading characters shown when a credential is logged
const LOGGED_PREFIX_CHARS: usize = 8;

/// Rotating set of access credentials partitioned by task category.
///
/// Credentials come from a newline separated blob. Credentials that failed
/// with an auth or rate-limit error are marked bad for the rest of the
/// session; reconfiguring the pool forgets every mark.
#[derive(Debug)]
pub struct CredentialPool {
    rows: RwLock<Vec<String>>,
    bad: Mutex<HashSet<String>>,
    layouts: HashMap<TaskCategory, CategoryLayout>,
}

impl Default for CredentialPool {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialPool {
    pub fn new() -> Self {
        let layouts = TaskCategory::all()
            .into_iter()
            .map(|category| (category, category.default_layout()))
            .collect();

        Self {
            rows: RwLock::new(Vec::new()),
            bad: Mutex::new(HashSet::new()),
            layouts,
        }
    }

    pub fn from_blob(blob: &str) -> Self {
        let pool = Self::new();
        pool.configure(blob);
        pool
    }

    /// Override the row layout of one category
    pub fn with_layout(mut self, category: TaskCategory, layout: CategoryLayout) -> Self {
        self.layouts.insert(category, layout);
        self
    }

    /// Replace the configured credentials and forget every bad mark
    pub fn configure(&self, blob: &str) {
        let rows: Vec<String> = blob
            .split('\n')
            .map(str::trim)
            .filter(|row| !row.is_empty())
            .map(str::to_string)
            .collect();

        tracing::info!(credential_count = rows.len(), "Credential pool configured");

        *self.rows.write() = rows;
        self.reset();
    }

    /// Resolve the credential to use next for `category`.
    ///
    /// Returns an empty string when nothing is configured at all.
    pub fn get(&self, category: TaskCategory) -> String {
        let layout = self.layout(category);
        let rows = self.rows.read();
        let bad = self.bad.lock();

        let primary = rows.get(layout.primary_row).cloned().unwrap_or_default();
        if !primary.is_empty() && !bad.contains(&primary) {
            return primary;
        }

        if let Some(fallback) = rows
            .iter()
            .skip(layout.fallback_start)
            .find(|candidate| !bad.contains(*candidate))
        {
            tracing::debug!(
                category = %category,
                credential = %mask(fallback),
                "Using fallback credential"
            );
            return fallback.clone();
        }

        if !primary.is_empty() {
            tracing::warn!(
                category = %category,
                "Every credential is marked bad, reusing primary credential"
            );
            return primary;
        }

        rows.first().cloned().unwrap_or_default()
    }

    pub fn has_usable(&self, category: TaskCategory) -> bool {
        !self.get(category).is_empty()
    }

    /// Skip `credential` until the pool is reconfigured
    pub fn mark_bad(&self, credential: &str) {
        if credential.is_empty() {
            return;
        }

        if self.bad.lock().insert(credential.to_string()) {
            tracing::warn!(
                credential = %mask(credential),
                "Credential marked as bad and will be skipped"
            );
        }
    }

    pub fn is_bad(&self, credential: &str) -> bool {
        self.bad.lock().contains(credential)
    }

    pub fn reset(&self) {
        self.bad.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    fn layout(&self, category: TaskCategory) -> CategoryLayout {
        self.layouts
            .get(&category)
            .copied()
            .unwrap_or_else(|| category.default_layout())
    }
}

fn mask(credential: &str) -> String {
    let prefix: String = credential.chars().take(LOGGED_PREFIX_CHARS).collect();
    format!("{}...", prefix)
}
