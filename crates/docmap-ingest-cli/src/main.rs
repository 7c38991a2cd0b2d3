use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::info;

use docmap_ingest::eligibility::classify;
use docmap_ingest::schema::{self, collect_violations};
use docmap_ingest::{ImportRequest, Importer, StaticHost};
use docmap_ingest_core::AppConfig;

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "docmap-ingest",
    about = "Import reviewed preprints from Data Hub docmaps as host manuscripts",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Wrap output in a JSON envelope with status and timing.
    /// Also enabled by setting DOCMAP_INGEST_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG wins when set.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an import against a file-backed host.
    Import {
        /// Host fixture: blueprint, submission form, existing DOIs.
        #[arg(long)]
        host: PathBuf,

        /// Skip docmaps created at or before this time (RFC 3339).
        /// Only used with `dedup = "predicate-and-cutoff"`.
        #[arg(long)]
        last_import_date: Option<DateTime<Utc>>,

        /// Config file (defaults to $DOCMAP_INGEST_CONFIG or the user config dir).
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate a docmap index file and list every violation.
    Validate { file: PathBuf },

    /// Show which docmaps in an index file would be considered for import.
    Inspect { file: PathBuf },

    /// Show version information.
    Version,
}

// ─── Main ────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let start = Instant::now();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let json_output = cli.json || std::env::var("DOCMAP_INGEST_JSON").as_deref() == Ok("1");

    match cli.command {
        Commands::Import {
            host,
            last_import_date,
            config,
        } => {
            let config = match config {
                Some(path) => AppConfig::load_from(&path)
                    .with_context(|| format!("loading config from {}", path.display()))?,
                None => AppConfig::load().context("loading config")?,
            };
            let host = StaticHost::load(&host)?;
            let importer = Importer::from_config(&config)?;

            let request = ImportRequest { last_import_date };
            let outcome = importer.run(&host, &request).await?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "records": outcome.records, "report": outcome.report },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                print_json(&serde_json::to_value(&outcome.records)?)?;
                eprintln!(
                    "{} record(s), {} manuscript(s); {} duplicate, {} ineligible",
                    outcome.report.records,
                    outcome.report.manuscripts,
                    outcome.report.rejected_duplicate,
                    outcome.report.rejected_ineligible,
                );
            }
        }

        Commands::Validate { file } => {
            let value = read_json(&file)?;
            let violations = collect_violations(&value);
            let dur = start.elapsed().as_millis();

            if json_output {
                let items: Vec<_> = violations
                    .iter()
                    .map(|v| serde_json::json!({ "path": v.path, "message": v.message }))
                    .collect();
                print_json(&serde_json::json!({
                    "status": if violations.is_empty() { "ok" } else { "error" },
                    "data": { "valid": violations.is_empty(), "violations": items },
                    "meta": { "duration_ms": dur }
                }))?;
            } else if violations.is_empty() {
                println!("✓ {} is a valid docmap index", file.display());
            } else {
                println!("✗ {} violation(s) in {}:", violations.len(), file.display());
                for violation in &violations {
                    println!("  {violation}");
                }
            }

            if !violations.is_empty() {
                std::process::exit(1);
            }
        }

        Commands::Inspect { file } => {
            let index = schema::parse_index(read_json(&file)?)?;
            let mut rows = Vec::with_capacity(index.docmaps.len());
            for docmap in &index.docmaps {
                let verdict = classify(docmap)?;
                let doi = docmap.first_step_preprint_doi()?.map(ToOwned::to_owned);
                rows.push((docmap.id.clone(), doi, verdict));
            }
            let dur = start.elapsed().as_millis();
            info!(docmaps = rows.len(), "index inspected");

            if json_output {
                let items: Vec<_> = rows
                    .iter()
                    .map(|(id, doi, verdict)| {
                        serde_json::json!({
                            "id": id,
                            "doi": doi,
                            "eligible": verdict.is_none(),
                            "reason": verdict.map(|r| r.to_string()),
                        })
                    })
                    .collect();
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "items": items, "total": rows.len() },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                for (id, doi, verdict) in &rows {
                    let doi = doi.as_deref().unwrap_or("-");
                    match verdict {
                        None => println!("✓ {id}  {doi}"),
                        Some(reason) => println!("✗ {id}  {doi}  ({reason})"),
                    }
                }
            }
        }

        Commands::Version => {
            let version = env!("CARGO_PKG_VERSION");
            let dur = start.elapsed().as_millis();
            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":{"version":version},"meta":{"duration_ms":dur}}))?;
            } else {
                println!("docmap-ingest v{version}");
            }
        }
    }

    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Logs go to stderr so stdout stays parseable JSON.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match verbose {
        0 => "docmap_ingest=info",
        1 => "docmap_ingest=debug",
        _ => "docmap_ingest=trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}
