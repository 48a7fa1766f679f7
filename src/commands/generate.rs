use super::App;

pub(crate) fn cmd_generate(app: &App) -> anyhow::Result<()> {
    let written = app.regenerate_output()?;
    println!("Wrote {} channel(s)", written);
    Ok(())
}
