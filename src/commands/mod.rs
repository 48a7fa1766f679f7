pub mod channel;
pub mod dump;
pub mod generate;
pub mod pull;
pub mod source;

use anyhow::Context;

use crate::config::Config;
use crate::http::HttpFetcher;
use crate::output::PlaylistFile;
use crate::reconcile::{Applied, Reconciler};
use crate::store::JsonlStore;

pub(crate) type App = Reconciler<JsonlStore, HttpFetcher, PlaylistFile>;

pub(crate) fn open(config: &Config) -> anyhow::Result<App> {
    let fetcher = HttpFetcher::new(&config.fetch).context("failed to set up fetcher")?;
    Ok(Reconciler::new(
        JsonlStore::open(&config.store_dir),
        fetcher,
        PlaylistFile::new(&config.output),
    ))
}

/// Unwraps a saved change, telling the user when the playlist lagged behind.
pub(crate) fn settle<T>(applied: Applied<T>) -> T {
    if let Some(e) = &applied.output_error {
        eprintln!("Saved, but the playlist was not updated: {e}");
    }
    applied.value
}

/// Turns `--enable` / `--disable` into an optional new state.
pub(crate) fn toggle(enable: bool, disable: bool) -> Option<bool> {
    match (enable, disable) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}
