use crate::cli::GlobalArgs;
use crate::config::{self, Config, Overrides};
use crate::editor::{MAX_FONT_SIZE, MIN_FONT_SIZE};
use crate::logging;
use crate::model::Board;
use crate::ui;
use anyhow::{bail, Context, Result};
use tracing::info;

pub fn tui(args: &GlobalArgs) -> Result<()> {
    let config = load_effective(args)?;
    let data_dir = config::data_dir()?;
    let log_path = logging::init(&data_dir)?;
    let export_dir = config.resolved_export_dir()?;
    info!(log = %log_path.display(), export_dir = %export_dir.display(), "starting board");

    let board = Board::new(config.titles.clone(), config.title_max_len);
    ui::run(board, config, export_dir)
}

pub fn config(args: &GlobalArgs, init: bool) -> Result<()> {
    let path = config::config_path(args.config.as_deref())?;
    if init {
        if path.exists() {
            bail!("config already exists at {}", path.display());
        }
        config::save_config(&path, &Config::default())?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }
    let config = load_effective(args)?;
    let yaml = serde_yaml::to_string(&config).context("serializing config")?;
    println!("# {}", path.display());
    print!("{}", yaml);
    Ok(())
}

fn load_effective(args: &GlobalArgs) -> Result<Config> {
    let path = config::config_path(args.config.as_deref())?;
    let mut config =
        config::load_config(&path).with_context(|| format!("loading {}", path.display()))?;
    config.apply(&overrides(args));
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let footprint = config.footprint;
    let positive = |v: f32| v.is_finite() && v > 0.0;
    if !positive(footprint.width) || !positive(footprint.height) {
        bail!(
            "footprint must be a positive size, got {}x{}",
            footprint.width,
            footprint.height
        );
    }
    if !(MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&config.default_font_size) {
        bail!(
            "default_font_size must be between {} and {}, got {}",
            MIN_FONT_SIZE,
            MAX_FONT_SIZE,
            config.default_font_size
        );
    }
    if config.title_max_len == 0 {
        bail!("title_max_len must be at least 1");
    }
    Ok(())
}

fn overrides(args: &GlobalArgs) -> Overrides {
    Overrides {
        export_dir: args.export_dir.clone(),
        title_max_len: args.title_max_len,
        footprint_width: args.footprint_width,
        footprint_height: args.footprint_height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn flags_override_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(&path, "title_max_len: 5\nexport_dir: /tmp/from-file\n").unwrap();
        let args = GlobalArgs {
            config: Some(path),
            export_dir: Some(PathBuf::from("/tmp/from-flag")),
            ..Default::default()
        };
        let config = load_effective(&args).unwrap();
        assert_eq!(config.title_max_len, 5);
        assert_eq!(config.export_dir, Some(PathBuf::from("/tmp/from-flag")));
    }

    #[test]
    fn rejects_empty_footprint() {
        let dir = tempfile::tempdir().unwrap();
        let args = GlobalArgs {
            config: Some(dir.path().join("missing.yml")),
            footprint_height: Some(0.0),
            ..Default::default()
        };
        assert!(load_effective(&args).is_err());
    }

    #[test]
    fn rejects_non_finite_footprint() {
        let dir = tempfile::tempdir().unwrap();
        let args = GlobalArgs {
            config: Some(dir.path().join("missing.yml")),
            footprint_width: Some(f32::NAN),
            ..Default::default()
        };
        assert!(load_effective(&args).is_err());
    }

    #[test]
    fn rejects_out_of_range_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        let args = GlobalArgs {
            config: Some(path.clone()),
            ..Default::default()
        };
        for raw in ["default_font_size: 0\n", "default_font_size: 200\n", "title_max_len: 0\n"] {
            std::fs::write(&path, raw).unwrap();
            assert!(load_effective(&args).is_err(), "accepted {:?}", raw);
        }
        std::fs::write(&path, "default_font_size: 72\ntitle_max_len: 1\n").unwrap();
        assert!(load_effective(&args).is_ok());
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let args = GlobalArgs {
            config: Some(dir.path().join("config.yml")),
            ..Default::default()
        };
        config(&args, true).unwrap();
        assert!(config(&args, true).is_err());
    }
}
