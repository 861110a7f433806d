//! CLI argument definitions using clap derive macros.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Iterative prompt optimization
///
/// Generates conversational test cases, rewrites the prompt and keeps the
/// rewrite only when it is judged better.
#[derive(Parser, Debug)]
#[command(name = "tuner")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Optimize a prompt from an input directory
    Optimize(OptimizeArgs),

    /// Score a prompt against a test case file
    Evaluate(EvaluateArgs),

    /// Pretty-print a saved optimization result or session history
    History {
        /// JSON file to display
        file: PathBuf,
    },

    /// Show version information
    Version,
}

#[derive(Args, Debug)]
pub struct OptimizeArgs {
    /// Directory holding global-prompt.txt and prompt-to-optimize.txt
    #[arg(short, long)]
    pub input_dir: Option<PathBuf>,

    /// Directory for step artifacts and result files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Run a single generate → rewrite → judge pass
    #[arg(long, conflicts_with = "max_iterations")]
    pub single: bool,

    /// Maximum number of rounds
    #[arg(short, long)]
    pub max_iterations: Option<usize>,

    /// Also measure each rewrite with the evaluator (logged only)
    #[arg(long)]
    pub cross_check: bool,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// File containing the prompt to evaluate
    #[arg(short, long)]
    pub prompt: PathBuf,

    /// JSON file containing an array of test cases
    #[arg(short, long)]
    pub test_cases: PathBuf,

    /// File containing the global context prompt
    #[arg(short, long)]
    pub global_prompt: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}
