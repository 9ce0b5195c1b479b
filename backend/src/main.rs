//! Productload CLI - Load product catalogs from CSV
//!
//! # Main Commands
//!
//! ```bash
//! productload load products.csv --match-by sku    # Load into the store
//! productload load products.csv --dummy           # Process, then roll back
//! productload serve                               # Start HTTP server (port 3000)
//! ```
//!
//! # Inspection Commands
//!
//! ```bash
//! productload headers products.csv    # Show header to operator bindings
//! productload operators               # List the operator catalog
//! productload parse products.csv      # Dump the parsed table as JSON
//! ```
//!
//! `PRODUCTLOAD_CONFIG` names a default options file and `PRODUCTLOAD_STORE`
//! a default store snapshot; both may be set in `.env`.

use clap::{Args, Parser, Subcommand};
use productload::api::logs::LOG_BROADCASTER;
use productload::server::{start_server, ServerConfig};
use productload::{
    load_table, parse_file, parse_file_auto, CatalogRegistry, DataTable, LoadOptions,
    LoadSession, LocalAssets, MemoryRepository, OperatorKind, SchemaVersion,
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "productload")]
#[command(about = "Load product catalogs (variants, taxons, properties) from CSV", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a CSV file into the store
    Load {
        /// Input CSV file
        input: PathBuf,

        #[command(flatten)]
        load: LoadArgs,

        /// Store snapshot file (default: $PRODUCTLOAD_STORE, else in memory only)
        #[arg(long)]
        store: Option<PathBuf>,

        /// Directory image paths are resolved against
        #[arg(long)]
        images_dir: Option<PathBuf>,

        /// Write the load report as JSON
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Show how each header of a CSV file binds to an operator
    Headers {
        /// Input CSV file
        input: PathBuf,

        #[command(flatten)]
        load: LoadArgs,
    },

    /// List the operator catalog for a schema version
    Operators {
        /// Schema version (e.g. 2.2)
        #[arg(long)]
        schema_version: Option<SchemaVersion>,
    },

    /// Parse a CSV file and output JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Options file (default: $PRODUCTLOAD_CONFIG)
        #[arg(long)]
        options: Option<PathBuf>,

        /// Store snapshot file (default: $PRODUCTLOAD_STORE)
        #[arg(long)]
        store: Option<PathBuf>,

        /// Directory image paths are resolved against
        #[arg(long)]
        images_dir: Option<PathBuf>,
    },
}

/// Flags shared by commands that map or load a file.
#[derive(Args)]
struct LoadArgs {
    /// Options JSON file (default: $PRODUCTLOAD_CONFIG)
    #[arg(long)]
    options: Option<PathBuf>,

    /// CSV delimiter (auto-detect if not specified)
    #[arg(short, long)]
    delimiter: Option<char>,

    /// Process every row, then roll back
    #[arg(long)]
    dummy: bool,

    /// Column used to find existing products to update
    #[arg(short, long)]
    match_by: Option<String>,

    /// Columns that must be present (comma separated or repeated)
    #[arg(long, value_delimiter = ',')]
    mandatory: Vec<String>,

    /// Columns to map even without a schema field (comma separated or repeated)
    #[arg(long, value_delimiter = ',')]
    force: Vec<String>,

    /// Map every resolvable header
    #[arg(long)]
    include_all: bool,

    /// Fail on any unmappable header
    #[arg(long)]
    strict: bool,

    /// Target schema version (e.g. 2.2)
    #[arg(long)]
    schema_version: Option<SchemaVersion>,

    /// Log every field as it is applied
    #[arg(short, long)]
    verbose: bool,
}

impl LoadArgs {
    /// Options file values, overridden by flags.
    fn options(&self) -> Result<LoadOptions, Box<dyn std::error::Error>> {
        let mut options = read_options(self.options.as_deref())?;
        options.dummy |= self.dummy;
        options.include_all |= self.include_all;
        options.strict |= self.strict;
        options.verbose |= self.verbose;
        if let Some(column) = &self.match_by {
            options.match_by = Some(column.clone());
        }
        if !self.mandatory.is_empty() {
            options.mandatory = self.mandatory.clone();
        }
        if !self.force.is_empty() {
            options.force_inclusion = self.force.clone();
        }
        if let Some(version) = self.schema_version {
            options.schema_version = version;
        }
        Ok(options)
    }

    fn table(&self, input: &Path) -> Result<DataTable, Box<dyn std::error::Error>> {
        let table = match self.delimiter {
            Some(d) => parse_file(input, d)?,
            None => parse_file_auto(input)?,
        };
        Ok(table)
    }
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();
    LOG_BROADCASTER.set_echo(true);

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Load {
            input,
            load,
            store,
            images_dir,
            report,
        } => cmd_load(&input, &load, store, images_dir, report.as_deref()),

        Commands::Headers { input, load } => cmd_headers(&input, &load),

        Commands::Operators { schema_version } => cmd_operators(schema_version.unwrap_or_default()),

        Commands::Parse {
            input,
            delimiter,
            output,
        } => cmd_parse(&input, delimiter, output.as_deref()),

        Commands::Serve {
            port,
            options,
            store,
            images_dir,
        } => cmd_serve(port, options, store, images_dir).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn read_options(path: Option<&Path>) -> Result<LoadOptions, Box<dyn std::error::Error>> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(|| env::var_os("PRODUCTLOAD_CONFIG").map(PathBuf::from));
    match path {
        Some(p) => {
            eprintln!("⚙️  Options: {}", p.display());
            Ok(LoadOptions::from_json_file(p)?)
        }
        None => Ok(LoadOptions::default()),
    }
}

fn store_path(flag: Option<PathBuf>) -> Option<PathBuf> {
    flag.or_else(|| env::var_os("PRODUCTLOAD_STORE").map(PathBuf::from))
}

fn local_assets(images_dir: Option<PathBuf>, options: &LoadOptions) -> LocalAssets {
    match images_dir {
        Some(dir) => LocalAssets::with_base_dir(dir),
        None => LocalAssets::new(),
    }
    .with_delimiters(options.delimiters.clone())
}

fn cmd_load(
    input: &Path,
    args: &LoadArgs,
    store: Option<PathBuf>,
    images_dir: Option<PathBuf>,
    report_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Loading: {}", input.display());

    let options = args.options()?;
    let table = args.table(input)?;
    eprintln!("   Encoding: {}", table.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(table.delimiter));
    eprintln!("   Rows: {}", table.len());

    let store = store_path(store);
    let mut repo = match &store {
        Some(path) => MemoryRepository::open(path)?,
        None => MemoryRepository::new(),
    };
    let mut assets = local_assets(images_dir, &options);
    let mut registry = CatalogRegistry::new();

    let report = match load_table(&table, &mut repo, &mut assets, &mut registry, options) {
        Ok(report) => report,
        Err(e) => {
            if let (Some(report), Some(path)) = (e.report(), report_path) {
                write_output(&serde_json::to_string_pretty(report)?, Some(path))?;
            }
            return Err(e.into());
        }
    };

    eprintln!("\n📊 Results:");
    eprintln!("   Processed: {}", report.processed_count);
    eprintln!("   ✅ Loaded: {}", report.loaded_count);
    if report.failed_count > 0 {
        eprintln!("   ❌ Failed: {}", report.failed_count);
        for failure in report.failures.iter().take(5) {
            eprintln!("     - row {}: {}", failure.row, failure.error);
        }
    }
    if !report.warnings.is_empty() {
        eprintln!("   ⚠️  Warnings: {}", report.warnings.len());
    }

    if report.dry_run {
        eprintln!("   Dry run: nothing was kept");
    } else if let Some(path) = &store {
        repo.persist(path)?;
        eprintln!("   💾 Store saved to: {}", path.display());
    }

    if let Some(path) = report_path {
        write_output(&serde_json::to_string_pretty(&report)?, Some(path))?;
    }

    if !report.is_success() {
        std::process::exit(2);
    }
    Ok(())
}

fn cmd_headers(input: &Path, args: &LoadArgs) -> Result<(), Box<dyn std::error::Error>> {
    let options = args.options()?;
    let table = args.table(input)?;

    let mut registry = CatalogRegistry::new();
    let catalog = registry.product_catalog(options.schema_version, false);
    let mut repo = MemoryRepository::new();
    let mut assets = LocalAssets::new();
    let session = LoadSession::new(&mut repo, &mut assets, catalog, options);

    let bindings = session.map_headers(&table.headers)?;
    println!("🔗 {} of {} columns mapped:\n", bindings.len(), table.headers.len());
    for binding in &bindings {
        println!(
            "  [{}] {:<24} → {} ({:?})",
            binding.column_index, binding.header, binding.operator.name, binding.operator.handler
        );
    }
    for (index, header) in table.headers.iter().enumerate() {
        if !bindings.iter().any(|b| b.column_index == index) {
            println!("  [{}] {:<24} ✗ skipped", index, header);
        }
    }
    Ok(())
}

fn cmd_operators(version: SchemaVersion) -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = CatalogRegistry::new();
    let catalog = registry.product_catalog(version, false);

    println!("📋 Product operators (schema {}):\n", version);
    for op in catalog.operators() {
        let kind = match op.kind {
            OperatorKind::Attribute => "attribute",
            OperatorKind::ToOne => "to-one",
            OperatorKind::ToMany => "to-many",
            OperatorKind::Pseudo => "pseudo",
        };
        match (&op.target_type, &op.find_by_default) {
            (Some(target), Some(field)) => println!("  {:<20} {:<10} {} by {}", op.name, kind, target, field),
            (Some(target), None) => println!("  {:<20} {:<10} {}", op.name, kind, target),
            _ => println!("  {:<20} {}", op.name, kind),
        }
    }

    println!("\nAliases:");
    for (alias, name) in catalog.aliases() {
        println!("  {:<20} → {}", alias, name);
    }
    Ok(())
}

fn cmd_parse(
    input: &Path,
    delimiter: Option<char>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let table = match delimiter {
        Some(d) => parse_file(input, d)?,
        None => parse_file_auto(input)?,
    };

    eprintln!("   Encoding: {}", table.encoding);
    eprintln!(
        "   Delimiter: '{}'{}",
        format_delimiter(table.delimiter),
        if delimiter.is_none() { " (auto-detected)" } else { "" }
    );
    eprintln!("   Columns: {}", table.headers.join(", "));
    eprintln!("✅ Parsed {} rows", table.len());

    let json = serde_json::to_string_pretty(&table)?;
    write_output(&json, output)?;

    Ok(())
}

async fn cmd_serve(
    port: u16,
    options: Option<PathBuf>,
    store: Option<PathBuf>,
    images_dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig {
        options: read_options(options.as_deref())?,
        store_path: store_path(store),
        images_dir,
    };
    start_server(port, config).await
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
