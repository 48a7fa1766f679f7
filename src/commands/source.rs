use anyhow::{Context, ensure};

use crate::source::{Source, SourcePatch};

use super::{App, settle};

pub(crate) fn cmd_add(app: &App, name: &str, url: &str) -> anyhow::Result<()> {
    let source = settle(app.add_source(name, url)?);
    println!("{}", source.id);
    Ok(())
}

pub(crate) fn cmd_update(app: &App, id: &str, patch: SourcePatch) -> anyhow::Result<()> {
    ensure!(!patch.is_empty(), "Nothing to update");
    let source = settle(app.update_source(id, patch)?);
    println!("{}", format_source(&source));
    Ok(())
}

pub(crate) fn cmd_remove(app: &App, id: &str) -> anyhow::Result<()> {
    let removed = settle(app.delete_source(id)?);
    println!("Removed source {} and {} channel(s)", id, removed);
    Ok(())
}

pub(crate) fn cmd_parse(app: &App, id: &str) -> anyhow::Result<()> {
    let channels = settle(
        app.parse_source(id)
            .with_context(|| format!("failed to parse source {id}"))?,
    );
    println!("Parsed {} channel(s)", channels.len());
    Ok(())
}

pub(crate) fn cmd_ls(app: &App) -> anyhow::Result<()> {
    let sources = app.sources()?;
    ensure!(!sources.is_empty(), "No sources");
    for source in &sources {
        println!("{}", format_source(source));
    }
    Ok(())
}

fn format_source(source: &Source) -> String {
    let state = if source.enabled { "" } else { " [disabled]" };
    format!(
        "{}  {} <{}> {} channel(s), updated {}{}",
        source.id,
        source.name,
        source.url,
        source.channel_count,
        source.last_updated.format("%Y-%m-%d %H:%M"),
        state
    )
}
