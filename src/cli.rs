use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "quadrant", version, about = "Four-quadrant note board for the terminal")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Directory exported images are written to
    #[arg(long, global = true)]
    pub export_dir: Option<PathBuf>,
    /// Maximum length of an axis title, in characters
    #[arg(long, global = true)]
    pub title_max_len: Option<usize>,
    /// Width of a note on the board, in board units
    #[arg(long, global = true)]
    pub footprint_width: Option<f32>,
    /// Height of a note on the board, in board units
    #[arg(long, global = true)]
    pub footprint_height: Option<f32>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the interactive board (default)
    Tui,
    /// Print the effective configuration
    Config {
        /// Write the default configuration file if none exists
        #[arg(long)]
        init: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_board() {
        let cli = Cli::try_parse_from(["quadrant"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.global.config.is_none());
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "quadrant",
            "config",
            "--init",
            "--title-max-len",
            "20",
            "--footprint-width",
            "120",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Command::Config { init: true })));
        assert_eq!(cli.global.title_max_len, Some(20));
        assert_eq!(cli.global.footprint_width, Some(120.0));
    }
}
