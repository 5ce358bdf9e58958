use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use config::CliConfig;

#[derive(Parser)]
#[command(name = "rte")]
#[command(version, about = "Runtime tag editing for running engine processes")]
struct Args {
    /// Config file (defaults to rte/rte.toml under the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Process id of the target (defaults to the first one found)
    #[arg(short, long, global = true)]
    pid: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List running targets once
    Targets,

    /// Keep listing targets as they start and exit (Ctrl-C to stop)
    Watch {
        /// Seconds between scans
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,
    },

    /// Show where a tag is loaded in the target
    TagAddress {
        /// Tag manifest
        manifest: PathBuf,
        /// Tag name, `name.group` or index
        tag: String,
    },

    /// Dump the live header of a tag
    Header {
        manifest: PathBuf,
        tag: String,
        /// Also print the raw header bytes
        #[arg(long)]
        raw: bool,
    },

    /// Resolve the live address of a field
    FieldAddress {
        manifest: PathBuf,
        tag: String,
        /// Root structure of the tag definition
        #[arg(long)]
        root: String,
        /// Field path, e.g. `Header.Items[3].Name`
        path: String,
    },

    /// Patch a tag with an edited image
    Poke {
        manifest: PathBuf,
        tag: String,
        /// Edited definition of the tag (defaults to the one in the cache)
        #[arg(long, value_name = "FILE")]
        image: Option<PathBuf>,
    },

    /// Write one field value in place
    PokeField {
        manifest: PathBuf,
        tag: String,
        #[arg(long)]
        root: String,
        path: String,
        /// Serialized value as hex bytes, e.g. `00 00 80 3F`
        value: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("rte=info".parse()?))
        .init();

    let args = Args::parse();
    let config = CliConfig::load_or_default(args.config.as_deref());
    let pid = args.pid;

    match args.command {
        Command::Targets => commands::targets::run(&config),
        Command::Watch { interval } => commands::watch::run(&config, interval),
        Command::TagAddress { manifest, tag } => {
            commands::tag::address(&config, &manifest, &tag, pid)
        }
        Command::Header { manifest, tag, raw } => {
            commands::tag::header(&config, &manifest, &tag, raw, pid)
        }
        Command::FieldAddress {
            manifest,
            tag,
            root,
            path,
        } => commands::field::address(&config, &manifest, &tag, &root, &path, pid),
        Command::Poke {
            manifest,
            tag,
            image,
        } => commands::poke::run(&config, &manifest, &tag, image.as_deref(), pid),
        Command::PokeField {
            manifest,
            tag,
            root,
            path,
            value,
        } => commands::field::poke(&config, &manifest, &tag, &root, &path, &value, pid),
    }
}
