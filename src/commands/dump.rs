use anyhow::Context;

use super::App;

pub(crate) fn cmd_dump(app: &App) -> anyhow::Result<()> {
    let dataset = app.dataset()?;
    let json = serde_json::to_string_pretty(&dataset).context("failed to serialize dataset")?;
    println!("{json}");
    Ok(())
}
