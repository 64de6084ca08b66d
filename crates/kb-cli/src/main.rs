//! kb: Personal knowledge-base CLI.
//!
//! Keeps a directory of markdown files in sync with a Notion database. The
//! sync engines live in kb-sync; this binary wires them to the native
//! filesystem and the Notion API.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use kb_cli::config::Config;
use kb_cli::native_fs::NativeFs;
use kb_cli::notion::NotionGateway;
use kb_cli::output::{self, OutputFormat};
use kb_cli::list_entries;

use kb_sync::{FileSystem, Ledger, Pacer, SyncEngine, SyncOptions, TokioClock};

#[derive(Parser, Debug)]
#[command(name = "kb")]
#[command(about = "Sync a local markdown knowledge base with a Notion database")]
struct Args {
    /// Path to the local store
    #[arg(long, global = true, env = "KB_PATH", default_value = "~/kb")]
    store: String,

    /// Notion database id
    #[arg(long, global = true, env = "NOTION_DATABASE_ID")]
    database: Option<String>,

    /// Enable verbose logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bring remote changes into the store
    Pull {
        /// Show what would change without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Send local changes to Notion
    Push {
        /// Show what would change without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Pull, then push
    Sync {
        /// Show what would change without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// List local documents and their sync state
    List {
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Pull,
    Push,
    Both,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging - respects RUST_LOG env var, defaults to info (or debug with --verbose)
    let default_filter = if args.verbose {
        "debug,kb_sync=debug,kb_cli=debug"
    } else {
        "info,kb_sync=info,kb_cli=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let token = std::env::var("NOTION_TOKEN").ok();
    let config = Config::load(&args.store, args.database.clone(), token)?;
    debug!("Store path: {:?}", config.store_path);

    let fs = NativeFs::new(config.store_path.clone());

    match args.command {
        Command::List { format } => list(&fs, format).await,
        Command::Pull { dry_run } => run(&config, fs, Direction::Pull, dry_run).await,
        Command::Push { dry_run } => run(&config, fs, Direction::Push, dry_run).await,
        Command::Sync { dry_run } => run(&config, fs, Direction::Both, dry_run).await,
    }
}

async fn list(fs: &NativeFs, format: OutputFormat) -> Result<()> {
    if !fs.exists("").await? {
        anyhow::bail!("Store {:?} does not exist", fs.base_path());
    }
    let ledger = Ledger::load(fs).await.context("Failed to load ledger")?;
    let entries = list_entries(fs, &ledger)
        .await
        .context("Failed to read documents")?;
    println!("{}", output::render_list(&entries, format)?.trim_end());
    Ok(())
}

async fn run(config: &Config, fs: NativeFs, direction: Direction, dry_run: bool) -> Result<()> {
    let target = config.remote()?;

    fs.mkdir("").await.context("Failed to create store directory")?;
    let mut ledger = Ledger::load(&fs).await.context("Failed to load ledger")?;

    info!(
        "{:?} {:?} against database {}{}",
        direction,
        fs.base_path(),
        target.database_id,
        if dry_run { " (dry run)" } else { "" }
    );

    let gateway = NotionGateway::new(target, &config.notion);
    let pacer = Pacer::new(TokioClock::new(), config.pacer_config());
    let options = SyncOptions {
        collection_id: target.database_id.to_string(),
        dry_run,
    };
    let mut engine = SyncEngine::new(gateway, fs, pacer, options);

    let mut changed = false;
    if matches!(direction, Direction::Pull | Direction::Both) {
        let report = engine.pull(&mut ledger).await.context("Pull failed")?;
        changed |= report.has_changes();
        print!("{}", output::format_pull_report(&report));
    }
    if matches!(direction, Direction::Push | Direction::Both) {
        let report = engine.push(&mut ledger).await.context("Push failed")?;
        changed |= report.has_changes();
        print!("{}", output::format_push_report(&report));
    }
    if !changed {
        info!("Store and database already agree");
    }

    if !dry_run {
        ledger.last_sync = Some(chrono::Utc::now().to_rfc3339());
        ledger
            .save(engine.fs())
            .await
            .context("Failed to save ledger")?;
    }
    Ok(())
}
