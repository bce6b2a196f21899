//! Command-line interface for db-sync
//!
//! # Usage Examples
//!
//! ## Sync
//! ```bash
//! # Replace the local database with the remote one
//! db-sync --config db-sync.toml pull
//!
//! # Replace the remote database with the local one, keeping the local dump
//! db-sync push --keep-local
//! ```
//!
//! ## Inspection
//! ```bash
//! # Print every command a pull would run, passwords masked
//! db-sync plan pull
//!
//! # Print the artifact name the next local dump would use
//! db-sync name local
//!
//! # Normalize a plain SQL dump without running the sync
//! db-sync normalize --input dump.sql --output normalized.sql
//! ```

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use db_sync::mysql_dump::{DumpNormalizer, Environment};
use db_sync::{
    CleanPolicy, Config, Direction, DryRunExecutor, ShellExecutor, SyncReport, Workflow,
};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "db-sync")]
#[command(about = "Pull and push MySQL databases between a workstation and a deployed host")]
#[command(long_about = None)]
struct Cli {
    #[command(flatten)]
    opts: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalOpts {
    /// Configuration file
    #[arg(
        long,
        short,
        global = true,
        env = "DB_SYNC_CONFIG",
        default_value = "db-sync.toml"
    )]
    config: PathBuf,

    /// Print the commands instead of running them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Keep the local artifact regardless of `clean_local`
    #[arg(long, global = true)]
    keep_local: bool,

    /// Keep the remote artifact regardless of `clean_remote`
    #[arg(long, global = true)]
    keep_remote: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump the remote database and load it locally
    Pull,

    /// Dump the local database and load it on the remote host
    Push,

    /// Show what a pull or push would run, without running it
    Plan {
        #[arg(value_enum)]
        direction: SyncDirection,
    },

    /// Normalize a plain (uncompressed) SQL dump
    Normalize {
        /// Dump to read
        #[arg(long)]
        input: PathBuf,

        /// Where to write the result (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print the artifact name the next dump would use
    Name {
        /// Environment whose database is dumped
        #[arg(default_value = "local")]
        environment: Environment,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SyncDirection {
    Pull,
    Push,
}

impl From<SyncDirection> for Direction {
    fn from(direction: SyncDirection) -> Self {
        match direction {
            SyncDirection::Pull => Direction::RemoteToLocal,
            SyncDirection::Push => Direction::LocalToRemote,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Pull => run_sync(&cli.opts, Direction::RemoteToLocal, cli.opts.dry_run).await,
        Commands::Push => run_sync(&cli.opts, Direction::LocalToRemote, cli.opts.dry_run).await,
        Commands::Plan { direction } => run_sync(&cli.opts, direction.into(), true).await,
        Commands::Normalize { input, output } => run_normalize(&input, output.as_deref()),
        Commands::Name { environment } => run_name(&cli.opts, environment).await,
    }
}

fn load_config(opts: &GlobalOpts) -> anyhow::Result<Config> {
    Config::from_file(&opts.config)
        .with_context(|| format!("Failed to load config from {:?}", opts.config))
}

async fn run_sync(opts: &GlobalOpts, direction: Direction, dry_run: bool) -> anyhow::Result<()> {
    let config = load_config(opts)?;
    let builder = config.command_builder()?;
    let resolver = config.resolver();
    let clean = CleanPolicy {
        local: config.db.clean_local && !opts.keep_local,
        remote: config.db.clean_remote && !opts.keep_remote,
    };

    if dry_run {
        let executor = DryRunExecutor::new();
        let report = Workflow::new(&builder, &resolver, &executor, clean)
            .run(direction)
            .await?;
        for action in executor.actions() {
            println!("{}", builder.redact(&action.to_string()));
        }
        print_report(&report);
        return Ok(());
    }

    let executor = ShellExecutor::from_config(&config);
    let report = Workflow::new(&builder, &resolver, &executor, clean)
        .run(direction)
        .await?;

    tracing::info!("Sync {} completed", direction);
    print_report(&report);
    Ok(())
}

fn print_report(report: &SyncReport) {
    println!("artifact:       {}", report.artifact);
    println!("local path:     {}", report.local_path.display());
    println!("remote path:    {}", report.remote_path.display());
    println!(
        "dumped:         {}",
        if report.dumped { "yes" } else { "no (reused)" }
    );
    println!("local cleaned:  {}", report.local_cleaned);
    println!("remote cleaned: {}", report.remote_cleaned);
}

fn run_normalize(input: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let reader = BufReader::new(
        File::open(input).with_context(|| format!("Failed to open {}", input.display()))?,
    );
    let normalizer = DumpNormalizer::new();

    let lines = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            normalizer.normalize_stream(reader, BufWriter::new(file))
        }
        None => normalizer.normalize_stream(reader, BufWriter::new(std::io::stdout().lock())),
    }
    .context("Failed to normalize dump")?;

    tracing::info!("Normalized {} lines from {}", lines, input.display());
    Ok(())
}

async fn run_name(opts: &GlobalOpts, environment: Environment) -> anyhow::Result<()> {
    let config = load_config(opts)?;
    let builder = config.command_builder()?;
    let name = config
        .resolver()
        .dump_file(&builder.database(environment).database)
        .await?;
    println!("{name}");
    Ok(())
}
