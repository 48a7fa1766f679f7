use serde::{Deserialize, Serialize};

use linetable::TableRow;

use crate::source::enabled_by_default;

/// One playable stream, owned by the source it was parsed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: String,
    pub source_id: String,
    /// The source's name when this channel was parsed. Not updated on rename.
    pub source_name: String,
    pub name: String,
    pub group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvg_id: Option<String>,
    pub url: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

impl TableRow for Channel {
    const TABLE_NAME: &'static str = "channels";

    fn key(&self) -> &str {
        &self.id
    }
}

/// Fields of a [`Channel`] that may be edited by hand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelPatch {
    pub name: Option<String>,
    pub group: Option<String>,
    pub logo: Option<String>,
    pub tvg_id: Option<String>,
    pub url: Option<String>,
    pub enabled: Option<bool>,
}

impl ChannelPatch {
    /// Applies the patch. An empty `logo` or `tvg_id` clears the attribute.
    pub fn apply(self, channel: &mut Channel) {
        if let Some(name) = self.name {
            channel.name = name;
        }
        if let Some(group) = self.group {
            channel.group = group;
        }
        if let Some(logo) = self.logo {
            channel.logo = Some(logo).filter(|l| !l.is_empty());
        }
        if let Some(tvg_id) = self.tvg_id {
            channel.tvg_id = Some(tvg_id).filter(|t| !t.is_empty());
        }
        if let Some(url) = self.url {
            channel.url = url;
        }
        if let Some(enabled) = self.enabled {
            channel.enabled = enabled;
        }
    }
}
