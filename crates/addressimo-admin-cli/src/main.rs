#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::process::ExitCode;

use addressimo_admin_cli::{AdminCli, EXIT_INVALID_INVOCATION, execute, exit_status, render};
use clap::Parser;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = AdminCli::parse();
    let outcome = execute(&cli).await;
    let status = exit_status(&outcome);

    match outcome.and_then(|view| render(&view, cli.json)) {
        Ok(rendered) => {
            println!("{rendered}");
            ExitCode::from(status)
        }
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(EXIT_INVALID_INVOCATION)
        }
    }
}
