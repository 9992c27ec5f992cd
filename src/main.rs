//! cloudq - query live cloud resource inventories with SQL

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use cloudq::config::{default_data_dir, DEFAULT_LOG_LEVEL};
use cloudq::output::{render, OutputFormat};
use cloudq::provider::aws::AwsProvider;
use cloudq::{CloudqError, EngineOptions, QueryEngine, Result};

/// Query live cloud resource inventories with SQL
#[derive(Parser, Debug)]
#[command(name = "cloudq")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query live cloud resource inventories with SQL")]
#[command(long_about = r#"Query live cloud resource inventories with SQL

Tables are named <resource>_<collection> and materialized on demand from the
provider, e.g.:

    cloudq "select id, json_get(tags, 'env') from ec2_instances"

Prefix a table with a region to query (or join) other regions:

    cloudq "select count(*) from us_west_2.ec2_volumes"

Run without a query to start an interactive shell."#)]
struct Args {
    /// SQL to execute; starts an interactive shell when omitted
    query: Option<String>,

    /// Override the provider's default region
    #[arg(long, env = "CLOUDQ_REGION")]
    region: Option<String>,

    /// Directory holding the per-region cache databases
    #[arg(long, env = "CLOUDQ_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Seconds a loaded table stays fresh; 0 reloads on every query
    #[arg(long, env = "CLOUDQ_TTL", default_value_t = 0)]
    ttl: u64,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Log filter (RUST_LOG syntax); RUST_LOG takes precedence
    #[arg(long, env = "CLOUDQ_LOG", default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(log_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: Args) -> Result<()> {
    let provider = AwsProvider::connect(args.region.as_deref())?;
    let data_dir = args.data_dir.clone().unwrap_or_else(default_data_dir);
    let mut options = EngineOptions::new(&data_dir);
    if args.ttl > 0 {
        options = options.with_table_ttl(Duration::from_secs(args.ttl));
    }
    let engine = QueryEngine::new(Arc::new(provider), options)?;

    match &args.query {
        Some(sql) => {
            let result = engine.execute(sql)?;
            println!("{}", render(&result, args.format)?);
            Ok(())
        }
        None => shell(&engine, args.format, &data_dir),
    }
}

/// Interactive shell: one SQL statement per line, persistent history.
fn shell(engine: &QueryEngine, format: OutputFormat, data_dir: &PathBuf) -> Result<()> {
    let mut editor = rustyline::DefaultEditor::new()
        .map_err(|e| CloudqError::config(format!("readline: {}", e)))?;
    let history_path = data_dir.join("history.txt");
    let _ = editor.load_history(&history_path);

    println!(
        "cloudq {} -- home region {}; type a query, or exit to quit",
        env!("CARGO_PKG_VERSION"),
        engine.home_region()
    );

    loop {
        match editor.readline("cloudq> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if matches!(line, "exit" | "quit" | ".exit") {
                    break;
                }
                let _ = editor.add_history_entry(line);
                match engine.execute(line) {
                    Ok(result) => println!("{}", render(&result, format)?),
                    Err(e) => eprintln!("{} {}", "error:".red().bold(), e),
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(CloudqError::config(format!("readline: {}", e))),
        }
    }

    let _ = editor.save_history(&history_path);
    Ok(())
}
