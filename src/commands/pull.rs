use indicatif::{ProgressBar, ProgressStyle};

use crate::reconcile::PullProgress;

use super::{App, settle};

impl PullProgress for ProgressBar {
    fn start(&self, total: usize) {
        self.set_length(total as u64);
    }

    fn fetched(&self, url: &str) {
        self.set_message(url.to_string());
        self.inc(1);
    }
}

pub(crate) fn cmd_pull(app: &App) -> anyhow::Result<()> {
    let pb = ProgressBar::new(0);
    pb.set_style(ProgressStyle::with_template("{bar:30} {pos}/{len} {wide_msg}")?);

    let outcomes = settle(app.parse_all(&pb)?);
    pb.finish_and_clear();

    for outcome in &outcomes {
        match &outcome.result {
            Ok(count) => println!("{}: {} channel(s)", outcome.source_name, count),
            Err(e) => eprintln!(
                "Error fetching {} ({}): {}",
                outcome.source_name, outcome.source_id, e
            ),
        }
    }
    Ok(())
}
