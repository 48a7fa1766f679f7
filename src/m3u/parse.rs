use tracing::debug;

use super::{ATTR_GROUP, ATTR_TVG_ID, ATTR_TVG_LOGO, EXTINF, UNCLASSIFIED, UNNAMED_CHANNEL};
use crate::channel::Channel;
use crate::ids::next_id;

/// Turns playlist text into channels, in the order their URL lines appear.
///
/// Never fails. An `#EXTINF:` line opens a pending channel, replacing any
/// earlier one that never got a URL. The next line starting with `http`
/// completes it. Every other line is ignored, as is a pending channel left
/// open at the end of input.
pub fn parse(raw: &str, source_id: &str, source_name: &str) -> Vec<Channel> {
    let mut channels = Vec::new();
    let mut pending: Option<Channel> = None;
    let mut dropped = 0usize;

    for line in raw.lines().filter(|l| !l.trim().is_empty()) {
        if let Some(info) = line.strip_prefix(EXTINF) {
            if pending.is_some() {
                dropped += 1;
            }
            pending = Some(pending_channel(info, source_id, source_name));
        } else if line.starts_with("http") {
            if let Some(mut channel) = pending.take() {
                channel.url = line.trim().to_string();
                channels.push(channel);
            }
        }
    }
    if pending.is_some() {
        dropped += 1;
    }

    debug!(
        source = source_name,
        channels = channels.len(),
        dropped,
        "parsed playlist"
    );
    channels
}

fn pending_channel(info: &str, source_id: &str, source_name: &str) -> Channel {
    let attrs = attributes(info);
    Channel {
        id: next_id(),
        source_id: source_id.to_string(),
        source_name: source_name.to_string(),
        name: display_name(info).unwrap_or(UNNAMED_CHANNEL).to_string(),
        group: lookup(&attrs, ATTR_GROUP).unwrap_or(UNCLASSIFIED).to_string(),
        logo: lookup(&attrs, ATTR_TVG_LOGO).map(String::from),
        tvg_id: lookup(&attrs, ATTR_TVG_ID).map(String::from),
        url: String::new(),
        enabled: true,
    }
}

/// Text after the last comma, trimmed. `None` when there is no comma or
/// nothing but whitespace follows it.
fn display_name(info: &str) -> Option<&str> {
    let (_, name) = info.rsplit_once(',')?;
    let name = name.trim();
    (!name.is_empty()).then_some(name)
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Every `key="value"` pair on the line, left to right. A value runs to the
/// next double quote; an unterminated value ends the scan.
fn attributes(info: &str) -> Vec<(&str, &str)> {
    let mut attrs = Vec::new();
    let mut rest = info;

    while let Some(eq) = rest.find("=\"") {
        let key_start = rest[..eq]
            .char_indices()
            .rev()
            .take_while(|(_, c)| is_key_char(*c))
            .last()
            .map_or(eq, |(i, _)| i);
        let key = &rest[key_start..eq];

        let value_start = eq + 2;
        let Some(len) = rest[value_start..].find('"') else {
            break;
        };
        attrs.push((key, &rest[value_start..value_start + len]));
        rest = &rest[value_start + len + 1..];
    }
    attrs
}

/// First non-empty value for `key`.
fn lookup<'a>(attrs: &[(&str, &'a str)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, v)| *k == key && !v.is_empty())
        .map(|(_, v)| *v)
}
