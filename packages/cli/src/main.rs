mod commands;
mod media;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{check, init, replay, CheckArgs, InitArgs, ReplayArgs};
use tracing_subscriber::EnvFilter;

/// Blockpad CLI - drive the block editor headlessly
#[derive(Parser, Debug)]
#[command(name = "blockpad")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default blockpad.config.json
    Init(InitArgs),

    /// Replay a script of editing events against a document
    Replay(ReplayArgs),

    /// Check a persisted document and repair its structure
    Check(CheckArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir.display().to_string(),
        Err(err) => {
            eprintln!("{} Cannot get current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Replay(args) => replay(args, &cwd),
        Command::Check(args) => check(args, &cwd),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
