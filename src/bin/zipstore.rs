//! PostalStore CLI
//!
//! Loads postal-code CSV files into a blocked sequence set and queries them.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use clap::{Parser, Subcommand};
use postalstore::record::parse_csv_line;
use postalstore::{Result, Store, StoreConfig, StoreError};
use tracing_subscriber::{fmt, EnvFilter};

/// Rows used by `run` when no CSV is given
const SAMPLE_ROWS: &[&str] = &[
    "60601,Chicago,IL,Cook,41.8858,-87.6181",
    "10001,New York,NY,New York,40.7484,-73.9967",
    "90210,Beverly Hills,CA,Los Angeles,34.0901,-118.4065",
    "33101,Miami,FL,Miami-Dade,25.7791,-80.1978",
    "10002,New York,NY,New York,40.7157,-73.9863",
    "32801,Orlando,FL,Orange,28.5421,-81.3790",
    "59601,Helena,MT,Lewis And Clark,46.5927,-112.0361",
    "00501,Holtsville,NY,Suffolk,40.8154,-73.0451",
    "99950,Ketchikan,AK,Ketchikan Gateway,55.3422,-131.6461",
];

/// PostalStore CLI
#[derive(Parser, Debug)]
#[command(name = "zipstore")]
#[command(about = "Blocked sequence set with a sparse index for postal codes")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./postalstore_data")]
    data_dir: String,

    /// Block capacity in bytes for a new store; an existing dump keeps its own
    #[arg(short, long, default_value = "512")]
    block_size: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest, build the index, and run sample lookups
    Run {
        /// CSV file to ingest (built-in sample rows if omitted)
        csv: Option<String>,
    },

    /// Insert every row of a CSV file and flush
    Load {
        /// CSV file to ingest
        csv: String,
    },

    /// Look up a zip code through the index
    Search {
        /// The zip code to find
        zip: String,
    },

    /// List records for a state
    State {
        /// Two-letter state abbreviation
        state: String,

        /// Maximum records to print
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Print blocks and the index
    Dump {
        /// Follow block links instead of storage order
        #[arg(long)]
        logical: bool,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,postalstore=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    tracing::info!("PostalStore v{}", postalstore::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);

    let config = StoreConfig::builder()
        .data_dir(&args.data_dir)
        .block_capacity(args.block_size)
        .build();

    if let Err(e) = execute(config, args.command) {
        tracing::error!("Command failed: {}", e);
        std::process::exit(1);
    }
}

fn execute(config: StoreConfig, command: Commands) -> Result<()> {
    let store = Store::open(config)?;

    match command {
        Commands::Run { csv } => {
            match csv {
                Some(path) => ingest_file(&store, Path::new(&path))?,
                None => ingest_lines(&store, SAMPLE_ROWS.iter().map(|row| Ok(row.to_string())))?,
            };

            let entries = store.rebuild_index();
            println!("{}", store.summary());
            println!("Index entries: {}", entries);

            for zip in ["90210", "10002", "00000"] {
                print_lookup(&store, zip);
            }
            print_state(&store, "FL", 5);

            store.close()
        }
        Commands::Load { csv } => {
            ingest_file(&store, Path::new(&csv))?;
            println!("{}", store.summary());
            store.close()
        }
        Commands::Search { zip } => {
            // Accept "501" for "00501"
            let key = zip
                .parse::<u32>()
                .map(|z| format!("{:05}", z))
                .unwrap_or(zip);
            print_lookup(&store, &key);
            Ok(())
        }
        Commands::State { state, limit } => {
            print_state(&store, &state, limit);
            Ok(())
        }
        Commands::Dump { logical } => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            store.with_view(|set, index| -> io::Result<()> {
                if logical {
                    set.dump_logical_order(&mut out)?;
                } else {
                    set.dump_physical_order(&mut out)?;
                }
                index.dump(&mut out)
            })?;
            Ok(())
        }
    }
}

fn ingest_file(store: &Store, path: &Path) -> Result<usize> {
    let file = File::open(path).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "cannot open CSV file");
        e
    })?;
    ingest_lines(store, BufReader::new(file).lines())
}

/// Sorted-insert every parseable row; header and malformed rows are skipped
fn ingest_lines<I>(store: &Store, lines: I) -> Result<usize>
where
    I: Iterator<Item = io::Result<String>>,
{
    let mut inserted = 0;
    let mut skipped = 0;

    for (i, line) in lines.enumerate() {
        let line = line?;
        let zip = match parse_csv_line(&line) {
            Ok(zip) => zip,
            Err(e) => {
                tracing::debug!(line = i + 1, error = %e, "skipping row");
                skipped += 1;
                continue;
            }
        };

        match store.insert(zip.to_record()) {
            Ok(_) => inserted += 1,
            Err(StoreError::DuplicateKey(key)) => {
                tracing::warn!(line = i + 1, key = %key, "duplicate zip code skipped");
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    tracing::info!(inserted, skipped, "ingest finished");
    Ok(inserted)
}

fn print_lookup(store: &Store, zip: &str) {
    match store.search(zip) {
        Some(record) => println!("Found ZIP {}: {}", zip, record),
        None => println!("ZIP {} not found", zip),
    }
}

fn print_state(store: &Store, state: &str, limit: usize) {
    let records = store.search_by_state(state);
    println!("Records for state {}:", state);
    if records.is_empty() {
        println!("No records found for state {}.", state);
        return;
    }
    for record in records.iter().take(limit) {
        println!("{}", record);
    }
    if records.len() > limit {
        println!("...and {} more records.", records.len() - limit);
    }
}
