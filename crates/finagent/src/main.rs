use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use finagent::models::{Currency, FinagentConfig, Query};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "config/finagent.toml";

#[derive(Parser, Debug)]
#[command(name = "finagent", about = "Financial query agents with USD/INR price reporting")]
struct Cli {
    /// Path to configuration file. Defaults are used if the default path is absent.
    #[arg(short, long, default_value = DEFAULT_CONFIG, global = true)]
    config: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one query and print the report
    Query {
        /// The question, e.g. "Summarize analyst recommendations for NVDA"
        text: String,

        /// Ticker symbol the query is about
        #[arg(short, long)]
        symbol: Option<String>,

        /// Currency to display first (INR or USD)
        #[arg(long)]
        currency: Option<Currency>,

        /// Web search only, skip market data and price lookup
        #[arg(long)]
        news: bool,

        /// Treat bare tickers as domestic listings
        #[arg(long)]
        assume_domestic: bool,

        /// Pretty-print the output JSON
        #[arg(long)]
        pretty: bool,

        /// Render the report as markdown instead of JSON
        #[arg(long, conflicts_with = "pretty")]
        markdown: bool,
    },

    /// Serve queries over HTTP
    Serve {
        /// Address to listen on, overriding the config
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the report.
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }

    let mut config = load_config(&cli.config)?;

    match cli.command {
        Command::Query {
            text,
            symbol,
            currency,
            news,
            assume_domestic,
            pretty,
            markdown,
        } => {
            config.symbols.assume_domestic |= assume_domestic;
            let bridge = finagent::build_bridge(&config).context("Failed to build pipeline")?;

            let mut query = if news { Query::news(text) } else { Query::new(text) };
            if let Some(symbol) = symbol {
                query = query.with_symbol(symbol);
            }
            if let Some(currency) = currency {
                query = query.with_currency(currency);
            }

            let report = tokio::select! {
                result = bridge.submit(query) => result.context("Query failed")?,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received shutdown signal");
                    bridge.shutdown();
                    anyhow::bail!("Interrupted");
                }
            };

            let output = if markdown {
                report.to_markdown()
            } else if pretty {
                serde_json::to_string_pretty(&report)?
            } else {
                serde_json::to_string(&report)?
            };
            println!("{output}");
        }

        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.bridge.bind.clone());
            let bridge = finagent::build_bridge(&config).context("Failed to build pipeline")?;
            let listener = TcpListener::bind(&bind)
                .await
                .with_context(|| format!("Failed to bind {bind}"))?;

            let shutdown = bridge.shutdown_token();
            let signal_bridge = bridge.clone();
            tokio::spawn(async move {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Received shutdown signal");
                signal_bridge.shutdown();
            });

            finagent::server::serve(bridge, listener, shutdown)
                .await
                .context("HTTP server error")?;
        }
    }

    Ok(())
}

fn load_config(path: &str) -> Result<FinagentConfig> {
    if path == DEFAULT_CONFIG && !Path::new(path).exists() {
        tracing::debug!("No config file at {DEFAULT_CONFIG}, using defaults");
        return Ok(FinagentConfig::default());
    }

    let config_str = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {path}"))?;
    toml::from_str(&config_str).with_context(|| format!("Failed to parse config: {path}"))
}
