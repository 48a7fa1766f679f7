use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use linetable::TableRow;

/// A registered playlist feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Number of channels owned by this source, refreshed on every parse.
    #[serde(default)]
    pub channel_count: usize,
    pub last_updated: DateTime<Utc>,
}

pub(crate) fn enabled_by_default() -> bool {
    true
}

impl TableRow for Source {
    const TABLE_NAME: &'static str = "sources";

    fn key(&self) -> &str {
        &self.id
    }
}

/// Fields of a [`Source`] that may be changed after creation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourcePatch {
    pub name: Option<String>,
    pub url: Option<String>,
    pub enabled: Option<bool>,
}

impl SourcePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.url.is_none() && self.enabled.is_none()
    }
}
