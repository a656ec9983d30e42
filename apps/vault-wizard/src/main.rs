//! # vault-wizard
//!
//! Binary entry point for the Vault guided-tour wizard.
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! vault-wizard server --host 0.0.0.0 --port 8080
//!
//! # Offline operations
//! vault-wizard validate
//! vault-wizard machines --json-mode
//! vault-wizard replay --script tour.json --save state.vwiz
//! vault-wizard progress --snapshot state.vwiz
//! ```

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vault_wizard::{cli, config::ENV_LOG_FORMAT};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // VAULT_WIZARD_LOG_FORMAT=json switches to machine-parseable output.
    let log_format = std::env::var(ENV_LOG_FORMAT).unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vault_wizard=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
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

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_banner() {
    println!(
        r#"
  Vault Wizard v{}
  Guided tour state machines
"#,
        env!("CARGO_PKG_VERSION")
    );
}
