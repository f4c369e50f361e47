use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use anyhow::{Context, Result};
use crate::global::dirs::get_global_config_file;
use crate::icons::ICONS_DIR;

/// Output directory used when neither `--out` nor the config file names one.
pub const DEFAULT_OUTPUT_DIR: &str = "lucide_icons";

/// Represents the contents of the optional `config.toml` file.
///
/// Every key is optional; anything left out falls back to the built-in default.
#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Icon set to read: a directory of SVGs or a `.tar`/`.tar.gz` archive.
    pub icons_dir: Option<PathBuf>,
    /// Where `export` and `export-all` write when `--out` is not given.
    pub output_dir: Option<PathBuf>,
    /// User agent sent to GitHub by `sync`.
    pub user_agent: Option<String>,
}

impl Settings {
    /// Saves the settings to the given file path in pretty TOML format.
    ///
    /// # Errors
    /// Returns an error if the file can't be written or serialization fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_str = toml::to_string_pretty(self)?;
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml_str)?;
        Ok(())
    }
    /// Loads settings from a file path.
    ///
    /// # Errors
    /// Returns an error if the file can't be read or deserialized.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Settings> {
        let path = path.as_ref();
        let toml = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file {}", path.display()))?;
        toml::from_str(&toml)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }
    /// Loads the config the CLI should use.
    ///
    /// An explicitly named file must exist. The per-user default file is optional;
    /// when it is missing the built-in defaults are used.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Settings> {
        match explicit {
            Some(path) => Settings::load(path),
            None => match get_global_config_file() {
                Ok(path) if path.exists() => Settings::load(path),
                _ => Ok(Settings::default()),
            },
        }
    }
    /// Picks the icon source: the `--dir` flag (or `LUCIDE_ICONS_DIR`), then the
    /// config file, then the icon set bundled with the crate.
    pub fn icons_source(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.icons_dir.clone())
            .unwrap_or_else(|| PathBuf::from(ICONS_DIR))
    }
    /// Picks the export directory: `--out`, then the config file, then `lucide_icons`.
    pub fn output_dir(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }
}
