use std::io::IsTerminal;

use anyhow::{bail, ensure};
use itertools::Itertools;

use crate::channel::{Channel, ChannelPatch};

use super::{App, settle};

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum GroupKey {
    Group,
    Source,
}

impl GroupKey {
    fn extract<'a>(&self, channel: &'a Channel) -> &'a str {
        match self {
            GroupKey::Group => &channel.group,
            GroupKey::Source => &channel.source_name,
        }
    }
}

pub(crate) fn parse_grouping(arg: &str) -> Option<Vec<GroupKey>> {
    arg.chars()
        .map(|c| match c {
            'g' => Some(GroupKey::Group),
            's' => Some(GroupKey::Source),
            _ => None,
        })
        .collect()
}

fn format_channel(channel: &Channel, grouped_keys: &[GroupKey], color: bool) -> String {
    let (bold, dim, reset) = if color {
        ("\x1b[1m", "\x1b[2m", "\x1b[0m")
    } else {
        ("", "", "")
    };
    let mut line = format!("{dim}{}{reset}  {bold}{}{reset}", channel.id, channel.name);
    if !grouped_keys.contains(&GroupKey::Group) {
        line.push_str(&format!(" [{}]", channel.group));
    }
    if !grouped_keys.contains(&GroupKey::Source) {
        line.push_str(&format!(" {dim}({}){reset}", channel.source_name));
    }
    if !channel.enabled {
        line.push_str(" disabled");
    }
    line
}

fn render_grouped(channels: &[&Channel], keys: &[GroupKey], color: bool) -> String {
    fn recurse(
        out: &mut String,
        channels: &[&Channel],
        remaining: &[GroupKey],
        all_keys: &[GroupKey],
        color: bool,
    ) {
        let depth = all_keys.len() - remaining.len();
        let indent = "  ".repeat(depth);

        let Some((&key, rest)) = remaining.split_first() else {
            for channel in channels {
                out.push_str(&format!("{indent}{}\n", format_channel(channel, all_keys, color)));
            }
            return;
        };

        let mut sorted = channels.to_vec();
        sorted.sort_by(|a, b| key.extract(a).cmp(key.extract(b)));

        let (prefix, suffix) = if depth == 0 {
            ("=== ", " ===")
        } else {
            ("--- ", " ---")
        };

        for (group_val, group) in &sorted.iter().chunk_by(|c| key.extract(**c)) {
            let group_channels: Vec<&Channel> = group.copied().collect();
            out.push_str(&format!("{indent}{prefix}{group_val}{suffix}\n"));
            if depth == 0 {
                out.push('\n');
            }
            recurse(out, &group_channels, rest, all_keys, color);
            out.push('\n');
            if depth == 0 {
                out.push('\n');
            }
        }
    }

    let mut out = String::new();
    recurse(&mut out, channels, keys, keys, color);
    out
}

pub(crate) fn cmd_ls(app: &App, group: &str, source: Option<&str>) -> anyhow::Result<()> {
    let Some(keys) = parse_grouping(group) else {
        bail!("Unknown grouping: {}. Use: g, s, gs, sg", group);
    };

    let channels = app.channels()?;
    let selected: Vec<&Channel> = channels
        .iter()
        .filter(|c| source.is_none_or(|id| c.source_id == id))
        .collect();
    ensure!(!selected.is_empty(), "No matching channels");

    let color = std::io::stdout().is_terminal();
    print!("{}", render_grouped(&selected, &keys, color));
    Ok(())
}

pub(crate) fn cmd_update(app: &App, id: &str, patch: ChannelPatch) -> anyhow::Result<()> {
    ensure!(patch != ChannelPatch::default(), "Nothing to update");
    let channel = settle(app.update_channel(id, patch)?);
    println!("{}", format_channel(&channel, &[], false));
    Ok(())
}

pub(crate) fn cmd_remove(app: &App, id: &str) -> anyhow::Result<()> {
    let channel = settle(app.delete_channel(id)?);
    println!("Removed channel {} ({})", channel.id, channel.name);
    Ok(())
}

pub(crate) fn cmd_set_enabled(app: &App, ids: &[String], enabled: bool) -> anyhow::Result<()> {
    let count = settle(app.batch_set_enabled(ids, enabled)?);
    let verb = if enabled { "Enabled" } else { "Disabled" };
    println!("{} {} channel(s)", verb, count);
    Ok(())
}
