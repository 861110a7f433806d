//! tuner - iterative prompt optimization from the terminal
//!
//! Generates test cases for a prompt, rewrites it with an LLM and keeps the
//! rewrite only when it is judged better.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cli;
mod commands;
mod config;
mod error;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::from_default_env()
                .add_directive("tuner=info".parse()?)
                .add_directive("tuner_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = config::Config::load()?;

    match cli.command {
        Commands::Optimize(args) => commands::optimize::execute(args, &config).await,
        Commands::Evaluate(args) => commands::evaluate::execute(args, &config).await,
        Commands::History { file } => commands::history::execute(&file),
        Commands::Version => {
            println!("tuner {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
