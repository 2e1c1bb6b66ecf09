//! # driftgraph - Stream Inspector
//!
//! The binary for the driftgraph object graph codec.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │          apps/driftgraph (THE BINARY)        │
//! │                                              │
//! │  ┌─────────────┐        ┌────────────────┐   │
//! │  │    CLI      │        │    Catalog     │   │
//! │  │   (clap)    │        │ (sample types) │   │
//! │  └──────┬──────┘        └───────┬────────┘   │
//! │         └───────────┬───────────┘            │
//! │                     ▼                        │
//! │             ┌─────────────────┐              │
//! │             │ driftgraph-core │              │
//! │             │   (THE LOGIC)   │              │
//! │             └─────────────────┘              │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! driftgraph sample -o library.dg --legacy
//! driftgraph inspect -f library.dg
//! driftgraph nodes -f library.dg --limit 20
//! driftgraph manifest -f library.dg --preview-removed --json-mode
//! ```

use clap::Parser;
use driftgraph::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // DRIFTGRAPH_LOG_FORMAT=json enables machine-parseable logs.
    let log_format = std::env::var("DRIFTGRAPH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "driftgraph=info,driftgraph_core=warn".into());

    // Logs go to stderr so `--json-mode` output stays parseable.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the driftgraph startup banner.
fn print_banner() {
    println!(
        r#"
  driftgraph v{}
  Schema-tolerant object graph streams
"#,
        env!("CARGO_PKG_VERSION")
    );
}
