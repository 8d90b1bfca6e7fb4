//! chirp: query a keyword-search HTTP API as if it were a SQL table.
//!
//! The search endpoint is registered as a DataFusion table (`tweets` by
//! default). An equality predicate on the search column (`q`) becomes the
//! remote query; every other predicate is evaluated locally.
//!
//! # Commands
//!
//! - `search <TERM>`: fetch the records matching one term.
//! - `query <SQL>`: run any SQL against the table.
//! - `explain <SQL>`: show the plan and the remote request without fetching.

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use owo_colors::OwoColorize;

mod commands;
mod exit_codes;
mod output;

use chirp_common::config::AppConfig;
use chirp_common::telemetry::init_tracing;
use chirp_connectors::sources::SourceProvider;
use chirp_connectors::SearchSourceProvider;
use chirp_error::{ChirpError, ErrorCategory, ErrorCode};
use datafusion::prelude::SessionContext;

use output::OutputFormat;

#[derive(Parser)]
#[command(name = "chirp")]
#[command(about = "Query a keyword-search API with SQL", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (human, json)
    #[arg(long, global = true, value_enum, default_value = "human")]
    output: OutputFormat,

    /// Path to the YAML configuration file; missing files fall back to defaults
    #[arg(long, global = true, env = "CHIRP_CONFIG", default_value = "chirp.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the records matching a search term
    Search {
        /// Free-text search term sent to the API
        term: String,
        /// Maximum number of rows to print
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Run a SQL query against the search table
    Query {
        /// SQL text, e.g. "SELECT text FROM tweets WHERE q = 'rust'"
        sql: String,
    },
    /// Show the query plan, including the remote request, without fetching
    Explain {
        /// SQL text to plan
        sql: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenv().ok();

    let cli = Cli::parse();

    let config = match AppConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            let err = ChirpError::new(ErrorCode::InvalidConfig, format!("{:#}", e))
                .with_hint(format!("Check {} and CHIRP__* environment variables", cli.config));
            exit_with_error(&cli, &err.into());
        }
    };

    init_tracing(&config.logging.filter)?;

    if let Err(e) = run_cli(&cli, &config).await {
        exit_with_error(&cli, &e);
    }

    Ok(())
}

fn exit_with_error(cli: &Cli, e: &anyhow::Error) -> ! {
    let exit_code = map_error_to_exit_code(e);
    if cli.output.is_machine_readable() {
        let detail = e.downcast_ref::<ChirpError>().cloned();
        output::print_error(cli.output, &e.to_string(), exit_code, detail).ok();
    } else {
        eprintln!("{} {}", "Error:".red().bold(), e);
    }
    std::process::exit(exit_code);
}

fn map_error_to_exit_code(e: &anyhow::Error) -> i32 {
    if let Some(chirp_err) = e.downcast_ref::<ChirpError>() {
        return match chirp_err.category() {
            ErrorCategory::Fetch => exit_codes::CONNECTION_ERROR,
            ErrorCategory::Config => exit_codes::CONFIG_ERROR,
            ErrorCategory::Query => exit_codes::QUERY_ERROR,
            ErrorCategory::Internal => exit_codes::GENERAL_ERROR,
            _ => exit_codes::GENERAL_ERROR,
        };
    }

    // Fallback: string heuristics for errors that never became a ChirpError
    let s = e.to_string().to_lowercase();
    if s.contains("usage") || s.contains("argument") {
        return exit_codes::USAGE_ERROR;
    }
    if s.contains("config") || s.contains("yaml") {
        return exit_codes::CONFIG_ERROR;
    }
    if s.contains("connect") || s.contains("timeout") {
        return exit_codes::CONNECTION_ERROR;
    }
    exit_codes::GENERAL_ERROR
}

async fn run_cli(cli: &Cli, config: &AppConfig) -> Result<(), anyhow::Error> {
    let ctx = SessionContext::new();
    SearchSourceProvider::new()
        .register(&ctx, &config.search)
        .await?;

    match &cli.command {
        Commands::Search { term, limit } => {
            commands::search(&ctx, &config.search, term, *limit, cli.output).await?;
        }
        Commands::Query { sql } => {
            commands::query(&ctx, sql, cli.output).await?;
        }
        Commands::Explain { sql } => {
            commands::explain(&ctx, sql, cli.output).await?;
        }
    }
    Ok(())
}
