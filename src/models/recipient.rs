//! Recipient directory mapping GitLab usernames to Slack recipient ids.
//!
//! The directory is a flat JSON object:
//!
//! ```json
//! { "alice": "U012AB3CD", "bob": "U045EF6GH" }
//! ```

use crate::error::AppError;
use std::collections::HashMap;
use std::path::Path;

/// Static GitLab username → Slack recipient id mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientDirectory {
    entries: HashMap<String, String>,
}

impl RecipientDirectory {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    /// Parse a directory document.
    pub fn from_json(document: &str) -> Result<Self, AppError> {
        let entries: HashMap<String, String> = serde_json::from_str(document).map_err(|e| {
            AppError::config_field(format!("Invalid recipients document: {}", e), "recipients")
        })?;
        Ok(Self { entries })
    }

    /// Load a directory document from disk.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let document = std::fs::read_to_string(path).map_err(|e| {
            AppError::config_field(
                format!("Failed to read recipients file {}: {}", path.display(), e),
                "recipients",
            )
        })?;
        Self::from_json(&document)
    }

    /// Slack recipient id for `username`.
    ///
    /// Blank ids count as unmapped.
    pub fn resolve(&self, username: &str) -> Option<&str> {
        self.entries
            .get(username)
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RecipientDirectory
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
