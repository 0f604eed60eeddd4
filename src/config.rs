use crate::editor::ItemDefaults;
use crate::geometry::Footprint;
use crate::model::{Rgb, Titles};
use anyhow::{Context, Result};
use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub title_max_len: usize,
    pub default_color: Rgb,
    pub default_font_size: u16,
    pub footprint: Footprint,
    pub titles: Titles,
    pub export_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            title_max_len: 12,
            default_color: Rgb::BLACK,
            default_font_size: 16,
            footprint: Footprint::default(),
            titles: Titles::default(),
            export_dir: None,
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub export_dir: Option<PathBuf>,
    pub title_max_len: Option<usize>,
    pub footprint_width: Option<f32>,
    pub footprint_height: Option<f32>,
}

impl Config {
    pub fn item_defaults(&self) -> ItemDefaults {
        ItemDefaults {
            color: self.default_color,
            font_size: self.default_font_size,
        }
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(dir) = &overrides.export_dir {
            self.export_dir = Some(dir.clone());
        }
        if let Some(len) = overrides.title_max_len {
            self.title_max_len = len;
        }
        if let Some(width) = overrides.footprint_width {
            self.footprint.width = width;
        }
        if let Some(height) = overrides.footprint_height {
            self.footprint.height = height;
        }
    }

    /// Where exports land: configured directory, else the user's downloads, else the
    /// working directory.
    pub fn resolved_export_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.export_dir {
            return Ok(dir.clone());
        }
        if let Some(downloads) = UserDirs::new().and_then(|u| u.download_dir().map(Path::to_path_buf))
        {
            return Ok(downloads);
        }
        env::current_dir().context("resolving export directory")
    }
}

pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    Ok(project_dirs()?.config_dir().join("config.yml"))
}

pub fn data_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.data_local_dir().to_path_buf())
}

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let data = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let config: Config = serde_yaml::from_str(&data).context("parsing config file")?;
    Ok(config)
}

pub fn save_config(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_yaml::to_string(config).context("serializing config")?;
    fs::write(path, serialized).with_context(|| format!("writing {:?}", path))?;
    Ok(())
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "quadrant").context("locating config directory")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.yml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.title_max_len, 12);
        assert_eq!(config.footprint, Footprint { width: 100.0, height: 50.0 });
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yml");
        let mut config = Config::default();
        config.default_color = Rgb(16, 32, 64);
        config.titles.y1 = "urgent".into();
        save_config(&path, &config).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("#102040"));
        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "title_max_len: 8\nfootprint:\n  width: 80.0\n  height: 40.0\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.title_max_len, 8);
        assert_eq!(config.footprint.width, 80.0);
        assert_eq!(config.default_font_size, 16);
        assert_eq!(config.titles, Titles::default());
    }

    #[test]
    fn malformed_color_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "default_color: black\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn overrides_win_over_file_values() {
        let mut config = Config::default();
        config.apply(&Overrides {
            export_dir: Some(PathBuf::from("/tmp/out")),
            title_max_len: Some(20),
            footprint_width: None,
            footprint_height: Some(60.0),
        });
        assert_eq!(config.export_dir, Some(PathBuf::from("/tmp/out")));
        assert_eq!(config.title_max_len, 20);
        assert_eq!(config.footprint, Footprint { width: 100.0, height: 60.0 });
        assert_eq!(config.resolved_export_dir().unwrap(), PathBuf::from("/tmp/out"));
    }
}
