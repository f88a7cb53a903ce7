//! a11yscan command line
//!
//! `a11yscan analyze <url>` prints one analysis as JSON; `a11yscan serve`
//! runs the HTTP API.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use a11yscan::config::AppConfig;
use a11yscan::error::{Error, ErrorResponse};
use a11yscan::handlers::{router, AppState};
use a11yscan::pipeline::Analyzer;
use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Accessibility scanner for live web pages
#[derive(Parser, Debug)]
#[command(name = "a11yscan")]
#[command(version)]
#[command(about = "Headless-browser accessibility analysis with heuristic scoring and AI narrative")]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze one URL and print the outcome as JSON
    Analyze {
        /// URL to analyze (scheme optional)
        url: Option<String>,

        /// Write the JSON to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Run the HTTP API
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "3001")]
        port: u16,

        /// Concurrent analyses allowed
        #[arg(long)]
        max_concurrent: Option<usize>,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(ClapArgs, Debug)]
struct CommonArgs {
    /// Skip the AI narrative pass (heuristic report only)
    #[arg(long)]
    no_ai: bool,

    /// Path to Chrome/Chromium executable
    #[arg(long)]
    chrome_path: Option<String>,

    /// Launch Chromium without its sandbox (containers)
    #[arg(long)]
    no_sandbox: bool,

    /// Show the browser window
    #[arg(long)]
    headful: bool,

    /// Whole-analysis budget in seconds
    #[arg(long)]
    timeout: Option<u64>,
}

impl CommonArgs {
    fn apply(&self, config: &mut AppConfig) {
        if self.no_ai {
            config.enrichment_enabled = false;
        }
        if let Some(ref path) = self.chrome_path {
            config.browser.chrome_path = Some(path.clone());
        }
        if self.no_sandbox {
            config.browser.sandbox = false;
        }
        if self.headful {
            config.browser.headless = false;
        }
        if let Some(secs) = self.timeout {
            config.analysis_timeout = Duration::from_secs(secs.max(1));
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = AppConfig::from_env()?;

    match args.command {
        Command::Analyze {
            url,
            output,
            pretty,
            common,
        } => {
            common.apply(&mut config);
            let analyzer = Analyzer::new(config)?;
            let url = url.unwrap_or_default();
            let outcome = analyzer.analyze(&url).await?;

            let json = if pretty {
                serde_json::to_string_pretty(&outcome)?
            } else {
                serde_json::to_string(&outcome)?
            };
            match output {
                Some(path) => {
                    tokio::fs::write(&path, json)
                        .await
                        .with_context(|| format!("writing {}", path.display()))?;
                    tracing::info!("Wrote {}", path.display());
                }
                None => println!("{}", json),
            }
        }
        Command::Serve {
            host,
            port,
            max_concurrent,
            common,
        } => {
            common.apply(&mut config);
            if let Some(n) = max_concurrent {
                config.max_concurrent = n.max(1);
            }
            let analyzer = Analyzer::new(config)?;
            let state = Arc::new(AppState::new(analyzer));
            let app = router(state);

            let addr = format!("{}:{}", host, port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("binding {}", addr))?;
            tracing::info!("a11yscan API listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

fn error_response(err: &anyhow::Error) -> ErrorResponse {
    match err.downcast_ref::<Error>() {
        Some(e) => e.to_response(),
        None => ErrorResponse {
            error: "INTERNAL_ERROR".to_string(),
            message: format!("{:#}", err),
            hints: Vec::new(),
        },
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(err) = run(args).await {
        tracing::error!("{:#}", err);
        let response = error_response(&err);
        let json = serde_json::to_string_pretty(&response)
            .unwrap_or_else(|_| format!("{{\"error\":\"{}\"}}", response.error));
        eprintln!("{}", json);
        std::process::exit(1);
    }
}
