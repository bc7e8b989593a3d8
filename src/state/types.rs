//! Local state value types

use crate::catalog::TrackedItem;
use crate::error::{TrackerError, TrackerResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Manga id -> read flag
pub type ReadMap = BTreeMap<u64, bool>;

/// Confirmed and pending read flags taken together
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReadState {
    pub confirmed: ReadMap,
    pub pending: ReadMap,
}

impl ReadState {
    /// Effective read flag: pending, then confirmed, then the catalog's own flag
    pub fn is_read(&self, item: &TrackedItem) -> bool {
        self.pending
            .get(&item.id)
            .or_else(|| self.confirmed.get(&item.id))
            .copied()
            .unwrap_or(item.is_read)
    }

    /// Whether the item has an uncommitted change
    pub fn is_pending(&self, id: u64) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

/// Accent and background theme names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeSettings {
    pub accent: String,
    pub background: String,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            accent: "default".to_string(),
            background: "default".to_string(),
        }
    }
}

impl ThemeSettings {
    /// Theme names end up in HTML attributes: lowercase letters, digits, `-`, `_`
    pub fn validate(name: &str) -> TrackerResult<String> {
        let name = name.trim();
        let valid = !name.is_empty()
            && name.len() <= 32
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');

        if valid {
            Ok(name.to_string())
        } else {
            Err(TrackerError::Validation(format!(
                "invalid theme name {:?}",
                name
            )))
        }
    }
}
