//! PhotonFlat command-line driver
//!
//! Exercises the row store outside a query engine:
//! - Hash-group synthetic rows with the built-in aggregators
//! - Page a byte stream through zstd compression blocks
//!
//! # Examples
//!
//! ```bash
//! # Group 100k rows into 16 keys
//! photonflat group --rows 100000 --keys 16
//!
//! # Same, JSON output, with Prometheus counters afterwards
//! photonflat group --rows 1000 --keys 4 --json --metrics
//!
//! # Process-wide counters
//! photonflat metrics
//!
//! # Page 1 MiB through 64 KiB blocks
//! photonflat page --bytes 1048576 --page-size 65536
//! ```

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use photonflat::aggregate::AggregatorRegistry;
use photonflat::memory::Pool;
use photonflat::metrics::export_metrics;
use photonflat::{Column, EngineConfig, Field, Fields, HashFlat, Kind, PagedSlice, Schema, Value};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// PhotonFlat - packed row store and hash aggregation core
#[derive(Parser, Debug)]
#[command(name = "photonflat")]
#[command(version = photonflat::VERSION)]
#[command(about = "PhotonFlat - packed row store and hash aggregation core", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine configuration file (TOML); PHOTONFLAT_* variables override it
    #[arg(long, global = true, env = "PHOTONFLAT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Group synthetic rows by key with COUNT/SUM/MIN/MAX/AVG
    Group(GroupArgs),

    /// Write a byte stream into a paged slice and report compression
    Page(PageArgs),

    /// Print the Prometheus text exposition
    Metrics,

    /// Show version
    Version,
}

#[derive(Args, Debug)]
struct GroupArgs {
    /// Number of input rows
    #[arg(long, default_value = "10000")]
    rows: usize,

    /// Number of distinct keys
    #[arg(long, default_value = "8")]
    keys: usize,

    /// Groups to print
    #[arg(long, default_value = "10")]
    show: usize,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Print Prometheus counters afterwards
    #[arg(long)]
    metrics: bool,
}

#[derive(Args, Debug)]
struct PageArgs {
    /// Bytes to write
    #[arg(long, default_value = "1048576")]
    bytes: usize,

    /// Page size override
    #[arg(long)]
    page_size: Option<usize>,

    /// Print Prometheus counters afterwards
    #[arg(long)]
    metrics: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli);

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::from_env()?,
    };

    match cli.command {
        Commands::Group(args) => group_command(&config, args),
        Commands::Page(args) => page_command(config, args),
        Commands::Metrics => {
            print!("{}", export_metrics());
            Ok(())
        }
        Commands::Version => {
            println!("PhotonFlat {}", photonflat::VERSION);
            Ok(())
        }
    }
}

/// Console logging filtered by `--log-level` and `RUST_LOG`
fn setup_logging(cli: &Cli) {
    let log_level = cli
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::WARN);
    let filter = EnvFilter::from_default_env().add_directive(log_level.into());

    if cli.log_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(!cli.no_color),
            )
            .with(filter)
            .init();
    }
}

/// Group command - hash aggregation over generated rows
fn group_command(config: &EngineConfig, args: GroupArgs) -> anyhow::Result<()> {
    anyhow::ensure!(args.keys > 0, "--keys must be positive");

    let registry = AggregatorRegistry::with_builtins();
    let aggregates = ["count", "sum", "min", "max", "avg"];

    let mut columns = vec![Column::new("key", Kind::Varchar)];
    let mut fields = vec![Field::plain(Kind::Varchar)];
    for name in aggregates {
        columns.push(Column::new(name, Kind::BigInt));
        fields.push(Field::aggregate(registry.spec(name, Kind::BigInt)?));
    }
    let schema = Schema::new(columns);

    let pool = Pool::new();
    let mut hash = HashFlat::with_config(&pool, schema.clone(), Fields::new(fields), config)?;

    let mut created = 0usize;
    for i in 0..args.rows {
        let key = Value::from(format!("key-{:04}", i % args.keys));
        // every tenth value is null so COUNT and SUM diverge
        let value = if i % 10 == 9 {
            Value::Null
        } else {
            Value::BigInt(((i as i64) * 7919) % 1000 - 500)
        };
        let mut row = vec![key];
        row.extend(std::iter::repeat(value).take(aggregates.len()));
        if hash.update(&photonflat::OwnedRow::new(row))?.is_created() {
            created += 1;
        }
    }
    info!(rows = args.rows, groups = created, "Grouping finished");

    let groups = hash
        .iter()
        .take(args.show)
        .map(|id| hash.crow(id))
        .collect::<photonflat::error::Result<Vec<_>>>()?;
    let stats = pool.stats();

    if args.json {
        let out = json!({
            "rows": args.rows,
            "groups": hash.len(),
            "contiguous_keys": hash.key_layout().is_contiguous(),
            "memory_usage": hash.flat().memory_usage(),
            "pool": stats,
            "columns": schema.columns().iter().map(|c| c.name.clone()).collect::<Vec<_>>(),
            "rows_shown": groups.iter().map(|r| r.values()).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Groups ({} from {} rows)", hash.len(), args.rows);
        println!("───────────────────────────────");
        let header: Vec<&str> = schema.columns().iter().map(|c| c.name.as_str()).collect();
        println!("{}", header.join("\t"));
        for row in &groups {
            let cells: Vec<String> = row.values().iter().map(format_value).collect();
            println!("{}", cells.join("\t"));
        }
        if hash.len() > groups.len() {
            println!("... {} more", hash.len() - groups.len());
        }
        println!();
        println!("Buffer bytes: {}", hash.flat().memory_usage());
        println!(
            "Pool: allocated {} extended {} freed {} live {}",
            stats.allocated, stats.extended, stats.freed, stats.live
        );
    }

    if args.metrics {
        print!("{}", export_metrics());
    }
    Ok(())
}

/// Page command - compression blocks over a generated stream
fn page_command(mut config: EngineConfig, args: PageArgs) -> anyhow::Result<()> {
    if let Some(page_size) = args.page_size {
        config.paged.page_size = page_size;
        config.validate()?;
    }

    let pool = Pool::new();
    let mut paged = PagedSlice::with_config(&pool, &config.paged);

    // repeating records compress; the counter keeps them from being identical
    let mut written = 0usize;
    let mut record = 0u64;
    while written < args.bytes {
        let line = format!("record={:08} status=ok region=north\n", record % 4096);
        let take = line.len().min(args.bytes - written);
        paged.write(&line.as_bytes()[..take])?;
        written += take;
        record += 1;
    }
    paged.seal()?;

    // spot-check the first and last byte through the block cache
    if written > 0 {
        let first = paged.read(0, 1)?[0];
        let last = paged.read(written - 1, 1)?[0];
        info!(first, last, "Read back block boundaries");
    }

    let stats = paged.stats();
    let compressed = paged.blocks().iter().filter(|b| b.is_compressed()).count();
    println!("Bytes written:     {}", paged.size());
    println!("Page size:         {}", config.paged.page_size);
    println!("Blocks:            {} ({} compressed)", paged.blocks().len(), compressed);
    println!("Stored bytes:      {}", stats.compressed_size);
    println!("Space saved:       {:.1}%", stats.space_saved_percent());

    if args.metrics {
        print!("{}", export_metrics());
    }
    Ok(())
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Varchar(s) => s.clone(),
        Value::Double(d) => format!("{:.3}", d),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}
