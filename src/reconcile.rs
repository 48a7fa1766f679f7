//! Every change to sources and channels goes through [`Reconciler`].
//!
//! An operation loads the whole dataset, changes it in memory, saves it, and
//! then regenerates the playlist. Writers are serialized by an internal lock;
//! reads go straight to the store and never wait for a fetch.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::channel::{Channel, ChannelPatch};
use crate::dataset::Dataset;
use crate::error::{FetchError, PersistError, ReconcileError};
use crate::http::Fetcher;
use crate::ids::next_id;
use crate::m3u;
use crate::output::OutputSink;
use crate::source::{Source, SourcePatch};
use crate::store::Store;

pub type Result<T> = std::result::Result<T, ReconcileError>;

/// A mutation that was saved. `output_error` is set when the playlist could
/// not be regenerated afterwards; the saved change stands either way.
#[derive(Debug)]
#[must_use]
pub struct Applied<T> {
    pub value: T,
    pub output_error: Option<PersistError>,
}

/// Hooks for reporting progress while every source is pulled.
pub trait PullProgress: Sync {
    fn start(&self, _total: usize) {}
    fn fetched(&self, _url: &str) {}
}

impl PullProgress for () {}

/// What happened to one source during [`Reconciler::parse_all`].
#[derive(Debug, Clone, PartialEq)]
pub struct PullOutcome {
    pub source_id: String,
    pub source_name: String,
    /// Number of channels parsed, or why the fetch failed.
    pub result: std::result::Result<usize, FetchError>,
}

pub struct Reconciler<S, F, O> {
    store: S,
    fetcher: F,
    output: O,
    writer: Mutex<()>,
}

impl<S: Store, F: Fetcher, O: OutputSink> Reconciler<S, F, O> {
    pub fn new(store: S, fetcher: F, output: O) -> Self {
        Self {
            store,
            fetcher,
            output,
            writer: Mutex::new(()),
        }
    }

    fn write_section(&self) -> Result<(MutexGuard<'_, ()>, S::Lock)> {
        let guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let lock = self.store.lock()?;
        Ok((guard, lock))
    }

    // --- reads ---

    pub fn dataset(&self) -> Result<Dataset> {
        Ok(self.store.load()?)
    }

    pub fn sources(&self) -> Result<Vec<Source>> {
        Ok(self.store.load()?.sources)
    }

    pub fn channels(&self) -> Result<Vec<Channel>> {
        Ok(self.store.load()?.channels)
    }

    // --- sources ---

    pub fn add_source(&self, name: &str, url: &str) -> Result<Applied<Source>> {
        let name = required("source name", name)?;
        let url = required("source url", url)?;

        let _guard = self.write_section()?;
        let mut dataset = self.store.load()?;
        let source = Source {
            id: next_id(),
            name,
            url,
            enabled: true,
            channel_count: 0,
            last_updated: Utc::now(),
        };
        dataset.sources.push(source.clone());
        info!(id = %source.id, name = %source.name, "added source");
        self.commit(&dataset, source)
    }

    pub fn update_source(&self, id: &str, patch: SourcePatch) -> Result<Applied<Source>> {
        let name = patch.name.as_deref().map(|n| required("source name", n)).transpose()?;
        let url = patch.url.as_deref().map(|u| required("source url", u)).transpose()?;

        let _guard = self.write_section()?;
        let mut dataset = self.store.load()?;
        let source = dataset
            .find_source_mut(id)
            .ok_or_else(|| ReconcileError::source_not_found(id))?;
        if let Some(name) = name {
            source.name = name;
        }
        if let Some(url) = url {
            source.url = url;
        }
        if let Some(enabled) = patch.enabled {
            source.enabled = enabled;
        }
        source.last_updated = Utc::now();
        let updated = source.clone();
        info!(id, "updated source");
        self.commit(&dataset, updated)
    }

    /// Removes a source and all of its channels. Returns how many channels went.
    pub fn delete_source(&self, id: &str) -> Result<Applied<usize>> {
        let _guard = self.write_section()?;
        let mut dataset = self.store.load()?;
        let (source, removed) = dataset
            .remove_source(id)
            .ok_or_else(|| ReconcileError::source_not_found(id))?;
        info!(id, name = %source.name, channels = removed, "deleted source");
        self.commit(&dataset, removed)
    }

    /// Fetches a source and replaces its channels with what the playlist holds
    /// now. On a fetch failure nothing is changed.
    pub fn parse_source(&self, id: &str) -> Result<Applied<Vec<Channel>>> {
        let _guard = self.write_section()?;
        let mut dataset = self.store.load()?;
        let source = dataset
            .find_source(id)
            .ok_or_else(|| ReconcileError::source_not_found(id))?
            .clone();

        let text = self.fetcher.fetch(&source.url)?;
        let channels = m3u::parse(&text, &source.id, &source.name);
        apply_batch(&mut dataset, &source.id, channels.clone());
        info!(id, name = %source.name, channels = channels.len(), "parsed source");
        self.commit(&dataset, channels)
    }

    /// Re-parses every enabled source. Fetches run in parallel; one failing
    /// source does not stop the others.
    pub fn parse_all(&self, progress: &dyn PullProgress) -> Result<Applied<Vec<PullOutcome>>> {
        let _guard = self.write_section()?;
        let mut dataset = self.store.load()?;
        let targets: Vec<Source> = dataset.sources.iter().filter(|s| s.enabled).cloned().collect();
        progress.start(targets.len());

        let fetcher = &self.fetcher;
        let fetched: Vec<(Source, std::result::Result<String, FetchError>)> = targets
            .into_par_iter()
            .map(|source| {
                let result = fetcher.fetch(&source.url);
                progress.fetched(&source.url);
                (source, result)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(fetched.len());
        for (source, result) in fetched {
            let result = match result {
                Ok(text) => {
                    let channels = m3u::parse(&text, &source.id, &source.name);
                    let count = channels.len();
                    apply_batch(&mut dataset, &source.id, channels);
                    Ok(count)
                }
                Err(e) => {
                    warn!(id = %source.id, error = %e, "skipping source");
                    Err(e)
                }
            };
            outcomes.push(PullOutcome {
                source_id: source.id,
                source_name: source.name,
                result,
            });
        }
        info!(sources = outcomes.len(), "pulled sources");
        self.commit(&dataset, outcomes)
    }

    // --- channels ---

    pub fn update_channel(&self, id: &str, mut patch: ChannelPatch) -> Result<Applied<Channel>> {
        patch.url = patch.url.as_deref().map(|u| required("channel url", u)).transpose()?;

        let _guard = self.write_section()?;
        let mut dataset = self.store.load()?;
        let channel = dataset
            .find_channel_mut(id)
            .ok_or_else(|| ReconcileError::channel_not_found(id))?;
        patch.apply(channel);
        let updated = channel.clone();
        info!(id, "updated channel");
        self.commit(&dataset, updated)
    }

    pub fn delete_channel(&self, id: &str) -> Result<Applied<Channel>> {
        let _guard = self.write_section()?;
        let mut dataset = self.store.load()?;
        let channel = dataset
            .remove_channel(id)
            .ok_or_else(|| ReconcileError::channel_not_found(id))?;
        info!(id, source = %channel.source_id, "deleted channel");
        self.commit(&dataset, channel)
    }

    /// Sets `enabled` on every listed channel that exists. Unknown ids are
    /// skipped. Returns how many channels matched.
    pub fn batch_set_enabled(&self, ids: &[String], enabled: bool) -> Result<Applied<usize>> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();

        let _guard = self.write_section()?;
        let mut dataset = self.store.load()?;
        let mut updated = 0;
        for channel in dataset
            .channels
            .iter_mut()
            .filter(|c| wanted.contains(c.id.as_str()))
        {
            channel.enabled = enabled;
            updated += 1;
        }
        info!(requested = wanted.len(), updated, enabled, "batch toggled channels");
        self.commit(&dataset, updated)
    }

    // --- output ---

    /// Rewrites the playlist from the stored dataset. Returns the number of
    /// channels written.
    pub fn regenerate_output(&self) -> Result<usize> {
        let _guard = self.write_section()?;
        let dataset = self.store.load()?;
        Ok(self.publish(&dataset)?)
    }

    fn publish(&self, dataset: &Dataset) -> std::result::Result<usize, PersistError> {
        let channels = dataset.publishable();
        self.output.write(&m3u::generate(channels.iter().copied()))?;
        info!(channels = channels.len(), "regenerated playlist");
        Ok(channels.len())
    }

    fn commit<T>(&self, dataset: &Dataset, value: T) -> Result<Applied<T>> {
        self.store.save(dataset)?;
        let output_error = self.publish(dataset).err();
        if let Some(e) = &output_error {
            warn!(error = %e, "playlist not regenerated; the change itself was saved");
        }
        Ok(Applied {
            value,
            output_error,
        })
    }
}

fn apply_batch(dataset: &mut Dataset, source_id: &str, channels: Vec<Channel>) {
    dataset.replace_channels_of(source_id, channels);
    if let Some(source) = dataset.find_source_mut(source_id) {
        source.last_updated = Utc::now();
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ReconcileError::Validation(format!("{field} must not be empty")));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::http::fake::FakeFetcher;
    use crate::output::memory::MemorySink;
    use crate::store::memory::MemoryStore;

    type TestReconciler = Reconciler<MemoryStore, FakeFetcher, MemorySink>;

    const NEWS: &str = "#EXTM3U\n\
        #EXTINF:-1 tvg-id=\"cctv1\" tvg-logo=\"http://x/l.png\" group-title=\"News\",CCTV-1\n\
        http://example.com/cctv1.m3u8\n\
        #EXTINF:-1 group-title=\"News\",CCTV-13\n\
        http://example.com/cctv13.m3u8\n";

    const SPORTS: &str = "#EXTM3U\n\
        #EXTINF:-1 group-title=\"Sports\",Arena\n\
        https://example.com/arena.m3u8\n";

    fn reconciler() -> TestReconciler {
        Reconciler::new(MemoryStore::default(), FakeFetcher::default(), MemorySink::default())
    }

    fn add(r: &TestReconciler, name: &str, url: &str, body: &str) -> Source {
        r.fetcher.serve(url, body);
        r.add_source(name, url).unwrap().value
    }

    fn parsed(r: &TestReconciler, name: &str, url: &str, body: &str) -> Source {
        let source = add(r, name, url, body);
        r.parse_source(&source.id).unwrap().value;
        source
    }

    fn assert_consistent(r: &TestReconciler) {
        let problems = r.store.snapshot().violations();
        assert!(problems.is_empty(), "{problems:?}");
    }

    fn playlist(r: &TestReconciler) -> String {
        r.output.last().unwrap()
    }

    #[test]
    fn test_add_source_trims_and_defaults() {
        let r = reconciler();
        let applied = r.add_source("  News  ", " http://example.com/news.m3u\n").unwrap();

        let source = applied.value;
        assert_eq!(source.name, "News");
        assert_eq!(source.url, "http://example.com/news.m3u");
        assert!(source.enabled);
        assert_eq!(source.channel_count, 0);
        assert!(applied.output_error.is_none());
        assert_eq!(r.store.snapshot().sources, vec![source]);
        assert_eq!(playlist(&r), "#EXTM3U\n");
    }

    #[test]
    fn test_add_source_requires_name_and_url() {
        let r = reconciler();
        assert!(matches!(
            r.add_source("   ", "http://x"),
            Err(ReconcileError::Validation(_))
        ));
        assert!(matches!(
            r.add_source("Name", ""),
            Err(ReconcileError::Validation(_))
        ));
        assert_eq!(r.store.saves(), 0);
    }

    #[test]
    fn test_source_ids_are_unique() {
        let r = reconciler();
        let a = r.add_source("A", "http://a").unwrap().value;
        let b = r.add_source("B", "http://b").unwrap().value;
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_update_source_merges_fields() {
        let r = reconciler();
        let source = add(&r, "News", "http://news", NEWS);

        let updated = r
            .update_source(
                &source.id,
                SourcePatch {
                    name: Some(" World News ".to_string()),
                    ..Default::default()
                },
            )
            .unwrap()
            .value;

        assert_eq!(updated.name, "World News");
        assert_eq!(updated.url, "http://news");
        assert!(updated.last_updated >= source.last_updated);
    }

    #[test]
    fn test_update_source_unknown_id() {
        let r = reconciler();
        let err = r.update_source("nope", SourcePatch::default()).unwrap_err();
        assert!(matches!(err, ReconcileError::NotFound { kind: "source", .. }));
    }

    #[test]
    fn test_update_source_rejects_blank_name() {
        let r = reconciler();
        let source = add(&r, "News", "http://news", NEWS);
        let err = r
            .update_source(
                &source.id,
                SourcePatch {
                    name: Some(" ".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Validation(_)));
        assert_eq!(r.store.snapshot().sources[0].name, "News");
    }

    #[test]
    fn test_rename_does_not_touch_parsed_channels() {
        let r = reconciler();
        let source = parsed(&r, "News", "http://news", NEWS);
        r.update_source(
            &source.id,
            SourcePatch {
                name: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .unwrap()
        .value;

        let dataset = r.store.snapshot();
        assert!(dataset.channels.iter().all(|c| c.source_name == "News"));

        r.parse_source(&source.id).unwrap().value;
        let dataset = r.store.snapshot();
        assert!(dataset.channels.iter().all(|c| c.source_name == "Renamed"));
    }

    #[test]
    fn test_parse_source_replaces_batch() {
        let r = reconciler();
        let source = parsed(&r, "News", "http://news", NEWS);

        let dataset = r.store.snapshot();
        assert_eq!(dataset.channels.len(), 2);
        assert_eq!(dataset.find_source(&source.id).unwrap().channel_count, 2);
        let first_ids: Vec<String> = dataset.channels.iter().map(|c| c.id.clone()).collect();

        r.fetcher.serve("http://news", SPORTS);
        let batch = r.parse_source(&source.id).unwrap().value;

        let dataset = r.store.snapshot();
        assert_eq!(batch.len(), 1);
        assert_eq!(dataset.channels, batch);
        assert_eq!(dataset.find_source(&source.id).unwrap().channel_count, 1);
        assert!(dataset.channels.iter().all(|c| !first_ids.contains(&c.id)));
        assert_consistent(&r);
    }

    #[test]
    fn test_parse_source_keeps_other_sources() {
        let r = reconciler();
        let news = parsed(&r, "News", "http://news", NEWS);
        let sports = parsed(&r, "Sports", "http://sports", SPORTS);

        r.parse_source(&news.id).unwrap().value;

        let dataset = r.store.snapshot();
        assert_eq!(dataset.channels_of(&sports.id).count(), 1);
        assert_eq!(dataset.channels_of(&news.id).count(), 2);
        assert_consistent(&r);
    }

    #[test]
    fn test_parse_source_fetch_failure_changes_nothing() {
        let r = reconciler();
        let source = parsed(&r, "News", "http://news", NEWS);
        let before = r.store.snapshot();
        let saves = r.store.saves();

        r.update_source(
            &source.id,
            SourcePatch {
                url: Some("http://dead".to_string()),
                ..Default::default()
            },
        )
        .unwrap()
        .value;
        let before_parse = r.store.snapshot();

        let err = r.parse_source(&source.id).unwrap_err();
        assert!(matches!(err, ReconcileError::Fetch(_)));
        assert_eq!(r.store.snapshot(), before_parse);
        assert_eq!(r.store.saves(), saves + 1);
        assert_eq!(before_parse.channels, before.channels);
    }

    #[test]
    fn test_parse_unknown_source_does_not_fetch() {
        let r = reconciler();
        let err = r.parse_source("nope").unwrap_err();
        assert!(matches!(err, ReconcileError::NotFound { .. }));
        assert!(r.fetcher.calls().is_empty());
    }

    #[test]
    fn test_delete_source_cascades() {
        let r = reconciler();
        let news = parsed(&r, "News", "http://news", NEWS);
        let sports = parsed(&r, "Sports", "http://sports", SPORTS);

        let removed = r.delete_source(&news.id).unwrap().value;

        let dataset = r.store.snapshot();
        assert_eq!(removed, 2);
        assert_eq!(dataset.sources.len(), 1);
        assert_eq!(dataset.channels.len(), 1);
        assert_eq!(dataset.channels[0].source_id, sports.id);
        assert!(!playlist(&r).contains("CCTV"));
        assert_consistent(&r);
    }

    #[test]
    fn test_delete_source_without_channels() {
        let r = reconciler();
        let source = add(&r, "Empty", "http://empty", "");
        assert_eq!(r.delete_source(&source.id).unwrap().value, 0);
        assert!(r.store.snapshot().sources.is_empty());
    }

    #[test]
    fn test_delete_unknown_source() {
        let r = reconciler();
        assert!(matches!(
            r.delete_source("nope"),
            Err(ReconcileError::NotFound { kind: "source", .. })
        ));
    }

    #[test]
    fn test_update_channel_disables_it_in_output() {
        let r = reconciler();
        parsed(&r, "News", "http://news", NEWS);
        let target = r.store.snapshot().channels[0].id.clone();

        let channel = r
            .update_channel(
                &target,
                ChannelPatch {
                    enabled: Some(false),
                    ..Default::default()
                },
            )
            .unwrap()
            .value;

        assert!(!channel.enabled);
        assert!(!playlist(&r).contains("CCTV-1\n"));
        assert!(playlist(&r).contains("CCTV-13\n"));
    }

    #[test]
    fn test_update_channel_rejects_blank_url() {
        let r = reconciler();
        parsed(&r, "News", "http://news", NEWS);
        let target = r.store.snapshot().channels[0].id.clone();
        let saves = r.store.saves();

        let err = r
            .update_channel(
                &target,
                ChannelPatch {
                    url: Some("   ".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();

        assert!(matches!(err, ReconcileError::Validation(_)));
        assert_eq!(r.store.saves(), saves);
        assert_eq!(
            r.store.snapshot().channels[0].url,
            "http://example.com/cctv1.m3u8"
        );
        assert_eq!(m3u::parse(&playlist(&r), "x", "X").len(), 2);
    }

    #[test]
    fn test_update_channel_trims_url() {
        let r = reconciler();
        parsed(&r, "News", "http://news", NEWS);
        let target = r.store.snapshot().channels[0].id.clone();

        let channel = r
            .update_channel(
                &target,
                ChannelPatch {
                    url: Some("  http://mirror/cctv1.m3u8 ".to_string()),
                    ..Default::default()
                },
            )
            .unwrap()
            .value;

        assert_eq!(channel.url, "http://mirror/cctv1.m3u8");
        assert!(playlist(&r).contains(",CCTV-1\nhttp://mirror/cctv1.m3u8\n"));
    }

    #[test]
    fn test_update_unknown_channel() {
        let r = reconciler();
        assert!(matches!(
            r.update_channel("nope", ChannelPatch::default()),
            Err(ReconcileError::NotFound { kind: "channel", .. })
        ));
    }

    #[test]
    fn test_delete_channel_decrements_count() {
        let r = reconciler();
        let source = parsed(&r, "News", "http://news", NEWS);
        let target = r.store.snapshot().channels[1].id.clone();

        let removed = r.delete_channel(&target).unwrap().value;

        let dataset = r.store.snapshot();
        assert_eq!(removed.name, "CCTV-13");
        assert_eq!(dataset.find_source(&source.id).unwrap().channel_count, 1);
        assert!(matches!(
            r.delete_channel(&target),
            Err(ReconcileError::NotFound { .. })
        ));
        assert_consistent(&r);
    }

    #[test]
    fn test_batch_set_enabled_counts_matches() {
        let r = reconciler();
        parsed(&r, "News", "http://news", NEWS);
        parsed(&r, "Sports", "http://sports", SPORTS);
        let mut ids: Vec<String> = r.store.snapshot().channels.iter().map(|c| c.id.clone()).collect();
        ids.push("unknown".to_string());

        let count = r.batch_set_enabled(&ids, false).unwrap().value;

        assert_eq!(count, 3);
        assert!(r.store.snapshot().channels.iter().all(|c| !c.enabled));
        assert_eq!(playlist(&r), "#EXTM3U\n");
    }

    #[test]
    fn test_batch_set_enabled_unknown_only() {
        let r = reconciler();
        parsed(&r, "News", "http://news", NEWS);
        let before = r.store.snapshot();

        let count = r.batch_set_enabled(&["ghost".to_string()], false).unwrap().value;

        assert_eq!(count, 0);
        assert_eq!(r.store.snapshot(), before);
    }

    #[test]
    fn test_disabled_source_is_left_out_of_output() {
        let r = reconciler();
        let news = parsed(&r, "News", "http://news", NEWS);
        parsed(&r, "Sports", "http://sports", SPORTS);

        r.update_source(
            &news.id,
            SourcePatch {
                enabled: Some(false),
                ..Default::default()
            },
        )
        .unwrap()
        .value;

        let out = playlist(&r);
        assert!(!out.contains("CCTV"));
        assert!(out.contains("Arena"));
        assert_eq!(r.store.snapshot().channels.len(), 3);
    }

    #[test]
    fn test_output_follows_dataset_order() {
        let r = reconciler();
        parsed(&r, "News", "http://news", NEWS);
        parsed(&r, "Sports", "http://sports", SPORTS);

        let names: Vec<String> = playlist(&r)
            .lines()
            .filter_map(|l| l.rsplit_once(',').map(|(_, n)| n.to_string()))
            .collect();
        assert_eq!(names, vec!["CCTV-1", "CCTV-13", "Arena"]);
    }

    #[test]
    fn test_regenerate_is_idempotent() {
        let r = reconciler();
        parsed(&r, "News", "http://news", NEWS);

        assert_eq!(r.regenerate_output().unwrap(), 2);
        let first = playlist(&r);
        assert_eq!(r.regenerate_output().unwrap(), 2);
        assert_eq!(playlist(&r), first);
    }

    #[test]
    fn test_output_failure_keeps_saved_change() {
        let r = Reconciler::new(MemoryStore::default(), FakeFetcher::default(), MemorySink::broken());

        let applied = r.add_source("News", "http://news").unwrap();

        assert!(applied.output_error.is_some());
        assert_eq!(r.store.snapshot().sources.len(), 1);
        assert!(matches!(
            r.regenerate_output(),
            Err(ReconcileError::Persist(_))
        ));
    }

    #[test]
    fn test_save_failure_is_reported_without_regenerating() {
        let r = reconciler();
        r.store.fail_saves(true);

        let err = r.add_source("News", "http://news").unwrap_err();

        assert!(matches!(err, ReconcileError::Persist(_)));
        assert!(r.store.snapshot().sources.is_empty());
        assert_eq!(r.output.writes(), 0);
    }

    #[test]
    fn test_parse_all_skips_failures_and_disabled() {
        let r = reconciler();
        let news = add(&r, "News", "http://news", NEWS);
        let sports = add(&r, "Sports", "http://sports", SPORTS);
        let dead = r.add_source("Dead", "http://dead").unwrap().value;
        let off = add(&r, "Off", "http://off", NEWS);
        r.update_source(
            &off.id,
            SourcePatch {
                enabled: Some(false),
                ..Default::default()
            },
        )
        .unwrap()
        .value;

        let counted = AtomicUsize::new(0);
        struct Counter<'a>(&'a AtomicUsize);
        impl PullProgress for Counter<'_> {
            fn fetched(&self, _url: &str) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let outcomes = r.parse_all(&Counter(&counted)).unwrap().value;

        assert_eq!(counted.load(Ordering::SeqCst), 3);
        assert_eq!(outcomes.len(), 3);
        let by_id = |id: &str| outcomes.iter().find(|o| o.source_id == id).unwrap();
        assert_eq!(by_id(&news.id).result, Ok(2));
        assert_eq!(by_id(&sports.id).result, Ok(1));
        assert!(by_id(&dead.id).result.is_err());
        assert!(!r.fetcher.calls().contains(&"http://off".to_string()));

        let dataset = r.store.snapshot();
        assert_eq!(dataset.channels.len(), 3);
        assert_consistent(&r);
    }

    #[test]
    fn test_reads_do_not_save() {
        let r = reconciler();
        parsed(&r, "News", "http://news", NEWS);
        let saves = r.store.saves();

        assert_eq!(r.sources().unwrap().len(), 1);
        assert_eq!(r.channels().unwrap().len(), 2);
        assert_eq!(r.dataset().unwrap(), r.store.snapshot());
        assert_eq!(r.store.saves(), saves);
    }

    #[test]
    fn test_invariants_hold_across_mixed_operations() {
        let r = reconciler();
        let bodies = [NEWS, SPORTS, "", "#EXTINF:-1,Half\n"];
        let mut sources = Vec::new();
        for (i, body) in bodies.iter().enumerate() {
            let url = format!("http://feed/{i}");
            sources.push(parsed(&r, &format!("Feed {i}"), &url, body));
        }

        // Deterministic walk over the operations.
        let mut seed: u64 = 0x2545_f491;
        for step in 0..200 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let pick = (seed >> 33) as usize;
            let dataset = r.store.snapshot();
            match pick % 8 {
                0 if !dataset.sources.is_empty() => {
                    let s = &dataset.sources[pick % dataset.sources.len()];
                    let _ = r.parse_source(&s.id);
                }
                1 if !dataset.channels.is_empty() => {
                    let c = &dataset.channels[pick % dataset.channels.len()];
                    let _ = r.delete_channel(&c.id);
                }
                2 if dataset.sources.len() > 1 => {
                    let s = &dataset.sources[pick % dataset.sources.len()];
                    let _ = r.delete_source(&s.id);
                }
                3 => {
                    let url = format!("http://feed/{}", pick % bodies.len());
                    let _ = r.add_source(&format!("Step {step}"), &url);
                }
                4 => {
                    let ids: Vec<String> = dataset.channels.iter().step_by(2).map(|c| c.id.clone()).collect();
                    let _ = r.batch_set_enabled(&ids, pick % 2 == 0);
                }
                5 if !dataset.channels.is_empty() => {
                    let c = &dataset.channels[pick % dataset.channels.len()];
                    let url = if pick % 3 == 0 {
                        " ".to_string()
                    } else {
                        format!("http://edit/{step}")
                    };
                    let patch = ChannelPatch {
                        name: Some(format!("Renamed {step}")),
                        url: Some(url),
                        enabled: Some(pick % 2 == 0),
                        ..Default::default()
                    };
                    let _ = r.update_channel(&c.id, patch);
                }
                6 if !dataset.sources.is_empty() => {
                    let s = &dataset.sources[pick % dataset.sources.len()];
                    let patch = SourcePatch {
                        name: Some(format!("Source {step}")),
                        url: Some(format!("http://feed/{}", pick % bodies.len())),
                        enabled: Some(pick % 3 != 0),
                    };
                    let _ = r.update_source(&s.id, patch);
                }
                _ => {
                    let _ = r.parse_all(&());
                }
            }
            assert_consistent(&r);
            let out = playlist(&r);
            assert_eq!(
                m3u::parse(&out, "x", "X").len(),
                r.store.snapshot().publishable().len(),
                "{out}"
            );
        }
    }

    #[test]
    fn test_concurrent_writers_do_not_lose_updates() {
        let r = Arc::new(reconciler());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let r = Arc::clone(&r);
                std::thread::spawn(move || {
                    for i in 0..10 {
                        r.add_source(&format!("S{t}-{i}"), "http://x").unwrap().value;
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(r.store.snapshot().sources.len(), 40);
    }
}
