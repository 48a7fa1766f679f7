//! The extended M3U playlist format: `#EXTINF:` metadata lines, each followed
//! by the stream URL it describes.

mod generate;
mod parse;

pub use generate::generate;
pub use parse::parse;

pub const HEADER: &str = "#EXTM3U";
pub const EXTINF: &str = "#EXTINF:";

pub const UNNAMED_CHANNEL: &str = "unnamed channel";
pub const UNCLASSIFIED: &str = "unclassified";

pub(crate) const ATTR_TVG_ID: &str = "tvg-id";
pub(crate) const ATTR_TVG_LOGO: &str = "tvg-logo";
pub(crate) const ATTR_GROUP: &str = "group-title";
