//! salesdw CLI - load raw sales CSVs into the PostgreSQL star schema
//!
//! `run` does the whole extract, transform and load. `transform` stops before
//! the database and prints what would be written.

use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use salesdw::warehouse::{analytics, ensure_tables, load, Database};
use salesdw::{export_batch, transform, EtlError, PipelineConfig, RawBatches};

#[derive(Parser)]
#[command(name = "salesdw")]
#[command(version, about = "Batch ETL from sales CSV files into a star-schema warehouse", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, clean and load one batch into the warehouse
    Run {
        /// Path to the pipeline config file
        #[arg(short, long, default_value = "salesdw.yaml")]
        config: PathBuf,

        /// Override the raw data directory from the config
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },

    /// Clean and resolve one batch without touching the database
    Transform {
        /// Path to the pipeline config file
        #[arg(short, long, default_value = "salesdw.yaml")]
        config: PathBuf,

        /// Override the raw data directory from the config
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// NDJSON output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Create the warehouse tables if they do not exist
    InitDb {
        /// Path to the pipeline config file
        #[arg(short, long, default_value = "salesdw.yaml")]
        config: PathBuf,
    },

    /// Print the canned analytics queries as JSON
    Report {
        /// Path to the pipeline config file
        #[arg(short, long, default_value = "salesdw.yaml")]
        config: PathBuf,

        /// Number of rows in the top products list
        #[arg(short, long, default_value_t = 5)]
        limit: i64,
    },
}

fn main() {
    dotenv::dotenv().ok();
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config, data_dir } => run(config, data_dir),
        Commands::Transform {
            config,
            data_dir,
            output,
        } => dry_run(config, data_dir, output),
        Commands::InitDb { config } => init_db(config),
        Commands::Report { config, limit } => report(config, limit),
    };

    if let Err(e) = result {
        error!("{}", e);
        process::exit(1);
    }
}

fn load_config(path: &Path, data_dir: Option<PathBuf>) -> Result<PipelineConfig, EtlError> {
    let mut config = PipelineConfig::load_or_default(path)?;
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    Ok(config)
}

fn connect(config: &PipelineConfig) -> Result<Database, EtlError> {
    let url = config.database_url()?;
    Database::new_with_config(&url, &config.database)
}

fn run(config: PathBuf, data_dir: Option<PathBuf>) -> Result<(), EtlError> {
    let config = load_config(&config, data_dir)?;
    info!("Extracting from {}", config.data_dir.display());

    let raw = RawBatches::from_dir(&config.data_dir)?;
    let batch = transform(&raw, &config.cleaning)?;

    let db = connect(&config)?;
    let mut conn = db.get_connection()?;
    ensure_tables(&mut conn)?;
    let summary = load(&mut conn, &batch)?;

    info!(
        run_id = %batch.run_id,
        facts = summary.facts,
        dropped_sales = batch.report.sales.dropped(),
        "Run complete"
    );
    Ok(())
}

fn dry_run(
    config: PathBuf,
    data_dir: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<(), EtlError> {
    let config = load_config(&config, data_dir)?;
    let raw = RawBatches::from_dir(&config.data_dir)?;
    let batch = transform(&raw, &config.cleaning)?;
    let facts = batch.dry_run()?;

    let lines = match &output {
        Some(path) => {
            let file = File::create(path).map_err(|source| EtlError::Io {
                path: path.clone(),
                source,
            })?;
            export_batch(BufWriter::new(file), &batch, &facts)?
        }
        None => export_batch(io::stdout().lock(), &batch, &facts)?,
    };

    if batch.report.sales.dropped() > 0 {
        warn!(
            "{} of {} sales rows were dropped during cleaning",
            batch.report.sales.dropped(),
            batch.report.sales.total
        );
    }
    info!(run_id = %batch.run_id, lines, "Dry run complete");
    Ok(())
}

fn init_db(config: PathBuf) -> Result<(), EtlError> {
    let config = load_config(&config, None)?;
    let db = connect(&config)?;
    db.test_connection()?;
    let mut conn = db.get_connection()?;
    ensure_tables(&mut conn)?;
    info!("Warehouse tables are in place");
    Ok(())
}

fn report(config: PathBuf, limit: i64) -> Result<(), EtlError> {
    let config = load_config(&config, None)?;
    let db = connect(&config)?;
    let mut conn = db.get_connection()?;
    let report = analytics::run_all(&mut conn, limit)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &report)
        .map_err(|e| EtlError::Serialization(e.into()))?;
    writeln!(out).map_err(|e| EtlError::Serialization(e.into()))?;
    Ok(())
}
