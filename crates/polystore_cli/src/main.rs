//! polystore CLI
//!
//! Command-line front end for the polystore data store facade. The CLI is
//! deliberately thin: it builds a configuration from its arguments, hands it
//! to the core, and prints whatever the core returns.
//!
//! # Commands
//!
//! - `save` - store records read as a JSON array
//! - `get` - retrieve records and print them as a JSON array
//! - `inspect` - display backend metadata
//! - `trim` - remove records from one end of the store
//! - `sample` - generate demo records for piping into `save`

mod commands;

use clap::{Parser, Subcommand};
use polystore_core::{BackendConfig, BackendKind, Config, FieldSpec, Processor, Store};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// polystore command-line data store tools.
#[derive(Parser)]
#[command(name = "polystore")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Backend kind (csv, json, sqlite)
    #[arg(global = true, short, long)]
    backend: Option<String>,

    /// Backend location: a file path, or `:memory:` for ephemeral SQLite
    #[arg(global = true, short, long)]
    location: Option<String>,

    /// SQLite table name
    #[arg(global = true, long)]
    table: Option<String>,

    /// Declared field map, e.g. `ssn:strIDX|name:str|salary:int`
    #[arg(global = true, short, long)]
    fields: Option<String>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store records read as a JSON array
    Save {
        /// Input file; read from stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Coerce values to the declared field kinds
        #[arg(long)]
        coerce: bool,
    },

    /// Retrieve records and print them as a JSON array
    Get {
        /// Equality filter of the form `field=value`
        #[arg(short = 'w', long = "where")]
        filter: Option<String>,

        /// Coerce values to the declared field kinds
        #[arg(long)]
        coerce: bool,
    },

    /// Display backend metadata
    Inspect {
        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Remove records from one end of the store
    Trim {
        /// Number of records to remove
        count: usize,

        /// Remove the newest records instead of the oldest
        #[arg(long)]
        newest: bool,
    },

    /// Generate sample records as a JSON array
    Sample {
        /// Number of records to generate (capped at 100)
        #[arg(default_value = "10")]
        count: usize,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Save { input, coerce } => {
            let store = build_store(&cli, *coerce)?;
            commands::save::run(&store, input.as_deref())?;
        }
        Commands::Get { filter, coerce } => {
            let store = build_store(&cli, *coerce)?;
            commands::get::run(&store, filter.as_deref())?;
        }
        Commands::Inspect { format } => {
            let store = build_store(&cli, false)?;
            commands::inspect::run(&store, format)?;
        }
        Commands::Trim { count, newest } => {
            let store = build_store(&cli, false)?;
            commands::trim::run(&store, *count, *newest)?;
        }
        Commands::Sample { count } => {
            commands::sample::run(*count)?;
        }
        Commands::Version => {
            println!("polystore CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

/// Builds a single-target store from the global CLI options.
fn build_store(cli: &Cli, coerce: bool) -> Result<Store, Box<dyn std::error::Error>> {
    let backend: BackendKind = cli
        .backend
        .as_deref()
        .ok_or("--backend is required (csv, json, or sqlite)")?
        .parse()?;
    let location = cli
        .location
        .clone()
        .ok_or("--location is required")?;

    let fields = match &cli.fields {
        Some(map) => FieldSpec::parse_map(map)?,
        None => Vec::new(),
    };

    let mut backend_config = BackendConfig::new(backend, location).fields(fields.clone());
    if let Some(table) = &cli.table {
        backend_config = backend_config.table(table.clone());
    }

    let store = Store::open(&Config::single(backend_config))?;
    Ok(if coerce {
        store.with_processor(Processor::with_fields(fields).coerce(true))
    } else {
        store
    })
}
