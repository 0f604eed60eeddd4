mod cli;
mod commands;
mod config;
mod drag;
mod editor;
mod export;
mod geometry;
mod logging;
mod model;
mod store;
mod ui;
mod view;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let command = args.command.unwrap_or(cli::Command::Tui);
    match command {
        cli::Command::Tui => commands::tui(&args.global),
        cli::Command::Config { init } => commands::config(&args.global, init),
    }
}
