//! blockstore-inspect
//!
//! Prints the head and individual blocks of a durable block store directory.
//!
//! The directory must not be open elsewhere: a running node holds its lock
//! and the inspector exits with an error instead of touching the files.

use std::path::PathBuf;
use std::process::ExitCode;

use blockstore::{Block, BlockStore, BlockStoreConfig, Hash};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// blockstore inspector
#[derive(Parser, Debug)]
#[command(name = "blockstore-inspect")]
#[command(about = "Inspect the blocks and head pointer of a block store")]
#[command(version)]
struct Args {
    /// Data directory of a diskdb block store
    #[arg(short, long, default_value = "./blockstore_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the current head block
    Head,

    /// Print one block, looked up by height or by content hash
    Block {
        /// Block height
        #[arg(long, conflicts_with = "hash", required_unless_present = "hash")]
        height: Option<u64>,

        /// Content hash, hex with or without 0x
        #[arg(long)]
        hash: Option<String>,
    },
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,blockstore=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> blockstore::Result<()> {
    if !args.data_dir.is_dir() {
        return Err(blockstore::BlockStoreError::Config(format!(
            "data directory {} does not exist",
            args.data_dir.display()
        )));
    }

    let store = BlockStore::open(BlockStoreConfig::disk(&args.data_dir))?;

    match args.command {
        Commands::Head => match store.get_current_block() {
            Some(block) => print_block(&block),
            None => println!("empty (height {})", store.get_current_height()),
        },
        Commands::Block { height, hash } => {
            let block = match (height, hash) {
                (Some(height), _) => store.get_block_by_height(height)?,
                (None, Some(hash)) => store.get_block_by_hash(&hash.parse::<Hash>()?)?,
                (None, None) => unreachable!("clap requires --height or --hash"),
            };
            print_block(&block);
        }
    }

    Ok(())
}

fn print_block(block: &Block) {
    println!("height:       {}", block.header.height);
    println!("hash:         {}", block.hash());
    println!("header hash:  {}", block.header_hash);
    println!("parent hash:  {}", block.header.parent_hash);
    println!("state root:   {}", block.header.state_root);
    println!("timestamp:    {}", block.header.timestamp);
    println!("transactions: {}", block.transactions.len());
}
