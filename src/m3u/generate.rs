use super::{ATTR_GROUP, ATTR_TVG_ID, ATTR_TVG_LOGO, EXTINF, HEADER};
use crate::channel::Channel;

/// Renders channels as an extended M3U document, in the order given.
///
/// Filtering is the caller's job: every channel passed in is written.
/// Attribute values are written as they are, without escaping quotes.
pub fn generate<'a, I>(channels: I) -> String
where
    I: IntoIterator<Item = &'a Channel>,
{
    let mut out = String::from(HEADER);
    out.push('\n');

    for channel in channels {
        out.push_str(EXTINF);
        out.push_str("-1");
        push_attr(&mut out, ATTR_TVG_ID, channel.tvg_id.as_deref().unwrap_or_default());
        push_attr(&mut out, ATTR_TVG_LOGO, channel.logo.as_deref().unwrap_or_default());
        push_attr(&mut out, ATTR_GROUP, &channel.group);
        out.push(',');
        out.push_str(&channel.name);
        out.push('\n');
        out.push_str(&channel.url);
        out.push('\n');
    }
    out
}

fn push_attr(out: &mut String, key: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    out.push(' ');
    out.push_str(key);
    out.push_str("=\"");
    out.push_str(value);
    out.push('"');
}
