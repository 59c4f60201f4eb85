//! BRBON inspector
//!
//! Prints, validates and summarizes BRBON item files

use anyhow::Context;
use brbon::{Endianness, ItemManager, ManagerConfig};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "brbon")]
#[command(about = "Inspect BRBON item files")]
struct Args {
    /// Read multi-byte fields as big endian
    #[arg(long, global = true)]
    big_endian: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the item tree as JSON
    Inspect {
        file: PathBuf,
        /// Single-line output
        #[arg(long)]
        compact: bool,
    },
    /// Run the load checks and report the first violation
    Validate { file: PathBuf },
    /// Print root size, type and item counts
    Stats { file: PathBuf },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args = Args::parse();
    let config = ManagerConfig {
        endianness: if args.big_endian {
            Endianness::Big
        } else {
            Endianness::Little
        },
        initial_capacity: 0,
        ..ManagerConfig::default()
    };

    match args.command {
        Command::Inspect { file, compact } => {
            let manager = open(&file, config)?;
            let json = manager
                .value(&manager.root())
                .context("root item is unreadable")?
                .to_json();
            let text = if compact {
                serde_json::to_string(&json)?
            } else {
                serde_json::to_string_pretty(&json)?
            };
            println!("{text}");
        }
        Command::Validate { file } => {
            let manager = open(&file, config)?;
            info!("{} is valid", file.display());
            println!("OK: {} bytes", manager.as_bytes().len());
        }
        Command::Stats { file } => {
            let manager = open(&file, config)?;
            let root = manager.root();
            let item_type = manager.item_type(&root).context("root item is unreadable")?;
            println!("Root type:      {item_type}");
            if let Some(name) = manager.name(&root) {
                println!("Root name:      {name}");
            }
            println!("Root size:      {} bytes", manager.as_bytes().len());
            println!("Root count:     {}", manager.count(&root).unwrap_or(0));
            println!("Unused bytes:   {}", manager.unused_bytes());
        }
    }
    Ok(())
}

fn open(file: &Path, config: ManagerConfig) -> anyhow::Result<ItemManager> {
    ItemManager::load_from_file(file, config).with_context(|| format!("failed to load {}", file.display()))
}
