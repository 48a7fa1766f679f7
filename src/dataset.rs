use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::source::Source;

/// All sources and channels, in the order they were created.
///
/// Every channel's `source_id` names a source in `sources`, every source's
/// `channel_count` matches its live channels, and channel ids are unique.
/// The helpers below keep that true; nothing here does I/O.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub sources: Vec<Source>,
    pub channels: Vec<Channel>,
}

impl Dataset {
    pub fn find_source(&self, id: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn find_source_mut(&mut self, id: &str) -> Option<&mut Source> {
        self.sources.iter_mut().find(|s| s.id == id)
    }

    pub fn find_channel(&self, id: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == id)
    }

    pub fn find_channel_mut(&mut self, id: &str) -> Option<&mut Channel> {
        self.channels.iter_mut().find(|c| c.id == id)
    }

    pub fn channels_of<'a>(&'a self, source_id: &'a str) -> impl Iterator<Item = &'a Channel> {
        self.channels.iter().filter(move |c| c.source_id == source_id)
    }

    /// Recomputes `channel_count` for `source_id` from actual membership.
    /// Returns the new count, or `None` if the source does not exist.
    pub fn recount(&mut self, source_id: &str) -> Option<usize> {
        let count = self.channels_of(source_id).count();
        let source = self.find_source_mut(source_id)?;
        source.channel_count = count;
        Some(count)
    }

    /// Drops every channel owned by `source_id` and appends `batch` in its place.
    pub fn replace_channels_of(&mut self, source_id: &str, batch: Vec<Channel>) {
        self.channels.retain(|c| c.source_id != source_id);
        self.channels.extend(batch);
        self.recount(source_id);
    }

    /// Removes a source together with its channels. Returns the source and the
    /// number of channels that went with it.
    pub fn remove_source(&mut self, id: &str) -> Option<(Source, usize)> {
        let pos = self.sources.iter().position(|s| s.id == id)?;
        let source = self.sources.remove(pos);
        let before = self.channels.len();
        self.channels.retain(|c| c.source_id != id);
        Some((source, before - self.channels.len()))
    }

    /// Removes one channel and refreshes its owner's count.
    pub fn remove_channel(&mut self, id: &str) -> Option<Channel> {
        let pos = self.channels.iter().position(|c| c.id == id)?;
        let channel = self.channels.remove(pos);
        self.recount(&channel.source_id);
        Some(channel)
    }

    /// Channels that belong in the generated playlist: enabled, and owned by an
    /// enabled source. Dataset order is kept.
    pub fn publishable(&self) -> Vec<&Channel> {
        let live: HashSet<&str> = self
            .sources
            .iter()
            .filter(|s| s.enabled)
            .map(|s| s.id.as_str())
            .collect();
        self.channels
            .iter()
            .filter(|c| c.enabled && live.contains(c.source_id.as_str()))
            .collect()
    }

    /// Describes every broken relation between sources and channels.
    #[cfg(test)]
    pub fn violations(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut seen = HashSet::new();
        for channel in &self.channels {
            if !seen.insert(channel.id.as_str()) {
                problems.push(format!("duplicate channel id {}", channel.id));
            }
            if self.find_source(&channel.source_id).is_none() {
                problems.push(format!(
                    "channel {} points at missing source {}",
                    channel.id, channel.source_id
                ));
            }
        }
        for source in &self.sources {
            let live = self.channels_of(&source.id).count();
            if live != source.channel_count {
                problems.push(format!(
                    "source {} counts {} channels but owns {}",
                    source.id, source.channel_count, live
                ));
            }
        }
        problems
    }
}
