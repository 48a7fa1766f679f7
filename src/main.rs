mod channel;
mod commands;
mod config;
mod dataset;
mod error;
mod http;
mod ids;
mod m3u;
mod output;
mod reconcile;
mod source;
mod store;

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::channel::ChannelPatch;
use crate::commands::toggle;
use crate::config::Config;
use crate::source::SourcePatch;

const LOG_ENV: &str = "CHANMERGE_LOG";

/// Merge remote M3U playlists into one curated playlist
#[derive(Parser)]
struct Args {
    /// Directory holding sources, channels and config.toml
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Log what is going on
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Manage playlist sources
    Source {
        #[command(subcommand)]
        command: SourceCommand,
    },
    /// Inspect and curate parsed channels
    Channel {
        #[command(subcommand)]
        command: ChannelCommand,
    },
    /// Fetch and re-parse every enabled source
    Pull,
    /// Rewrite the merged playlist from stored channels
    Generate,
    /// Print all sources and channels as JSON
    Dump,
}

#[derive(ClapArgs)]
struct Toggle {
    /// Enable it
    #[arg(long, conflicts_with = "disable")]
    enable: bool,
    /// Disable it
    #[arg(long)]
    disable: bool,
}

#[derive(Subcommand)]
enum SourceCommand {
    /// Register a playlist URL
    Add { name: String, url: String },
    /// Change a source's name, URL or state
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[command(flatten)]
        toggle: Toggle,
    },
    /// Delete a source and its channels
    #[command(alias = "remove")]
    Rm { id: String },
    /// Fetch a source and replace its channels
    Parse { id: String },
    /// List sources
    Ls,
}

#[derive(Subcommand)]
enum ChannelCommand {
    /// List channels
    Ls {
        /// Grouping mode: g (group), s (source), or combinations like gs, sg
        #[arg(short, long, default_value = "")]
        group: String,
        /// Only channels of this source
        #[arg(long)]
        source: Option<String>,
    },
    /// Edit a channel
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        logo: Option<String>,
        #[arg(long)]
        tvg_id: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[command(flatten)]
        toggle: Toggle,
    },
    /// Delete a channel
    #[command(alias = "remove")]
    Rm { id: String },
    /// Enable channels by id
    Enable {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Disable channels by id
    Disable {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = Config::load(config::store_dir(args.store.as_deref()))?;
    let app = commands::open(&config)?;

    match args.command {
        Some(Command::Source { command }) => match command {
            SourceCommand::Add { name, url } => commands::source::cmd_add(&app, &name, &url),
            SourceCommand::Update {
                id,
                name,
                url,
                toggle: t,
            } => commands::source::cmd_update(
                &app,
                &id,
                SourcePatch {
                    name,
                    url,
                    enabled: toggle(t.enable, t.disable),
                },
            ),
            SourceCommand::Rm { id } => commands::source::cmd_remove(&app, &id),
            SourceCommand::Parse { id } => commands::source::cmd_parse(&app, &id),
            SourceCommand::Ls => commands::source::cmd_ls(&app),
        },
        Some(Command::Channel { command }) => match command {
            ChannelCommand::Ls { group, source } => {
                commands::channel::cmd_ls(&app, &group, source.as_deref())
            }
            ChannelCommand::Update {
                id,
                name,
                group,
                logo,
                tvg_id,
                url,
                toggle: t,
            } => commands::channel::cmd_update(
                &app,
                &id,
                ChannelPatch {
                    name,
                    group,
                    logo,
                    tvg_id,
                    url,
                    enabled: toggle(t.enable, t.disable),
                },
            ),
            ChannelCommand::Rm { id } => commands::channel::cmd_remove(&app, &id),
            ChannelCommand::Enable { ids } => commands::channel::cmd_set_enabled(&app, &ids, true),
            ChannelCommand::Disable { ids } => {
                commands::channel::cmd_set_enabled(&app, &ids, false)
            }
        },
        Some(Command::Pull) => commands::pull::cmd_pull(&app),
        Some(Command::Generate) => commands::generate::cmd_generate(&app),
        Some(Command::Dump) => commands::dump::cmd_dump(&app),
        None => commands::channel::cmd_ls(&app, "", None),
    }
}
