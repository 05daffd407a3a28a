//! pagetree command-line shell.
//!
//! # Usage
//!
//! ```bash
//! # Interactive prompt against ./pagetree.db
//! pagetree
//!
//! # Run a single command and exit
//! pagetree --db index.db -c "insert apple 3"
//!
//! # Log splits and page I/O
//! RUST_LOG=pagetree=trace pagetree
//! ```

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pagetree::common::config::MAX_ENTRIES;
use pagetree::{shell, BPlusTree, Pager, TreeConfig};

/// Interactive shell over a disk-backed B+ tree
#[derive(Parser, Debug)]
#[command(name = "pagetree", version, about = "Disk-backed B+ tree shell")]
struct Cli {
    /// Database file, created if missing
    #[arg(long, default_value = "pagetree.db", env = "PAGETREE_DB")]
    db: PathBuf,

    /// Maximum entries per node; must match the value recorded in an
    /// existing file
    #[arg(long, default_value_t = MAX_ENTRIES)]
    max_entries: usize,

    /// Fail instead of creating the database file when it is missing
    #[arg(long)]
    no_create: bool,

    /// Execute a single command and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("pagetree=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = TreeConfig::default().with_max_entries(cli.max_entries);
    let mut tree = if cli.no_create {
        let mut tree = BPlusTree::new(Pager::open_existing(&cli.db)?, config)?;
        tree.init()?;
        tree
    } else {
        BPlusTree::open(&cli.db, config)?
    };
    info!(db = %cli.db.display(), "opened database");

    if let Some(line) = &cli.command {
        if let Some(output) = shell::run_line(&mut tree, line) {
            println!("{}", output);
        }
        tree.close()?;
        return Ok(());
    }

    println!("B+ Tree CLI: Enter commands like:");
    println!("  insert <key> <int-value>");
    println!("  search <key>");
    println!("  exit");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        stdout.flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        match shell::run_line(&mut tree, &line) {
            Some(output) if output.is_empty() => {}
            Some(output) => println!("{}", output),
            None => break,
        }
    }

    tree.close()?;
    Ok(())
}
