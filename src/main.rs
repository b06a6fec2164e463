//! email-groups - Command-line client for the email groups backend

use clap::Parser;
use email_groups::{App, Cli};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!(command = ?cli.command, "starting email-groups");

    if let Err(e) = App::run(cli).await {
        tracing::error!("Application error: {:#}", e);
        std::process::exit(1);
    }
}
