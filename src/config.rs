use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default plaintext block size for file splitting (256 KiB)
pub const DEFAULT_BLOCK_SIZE: usize = 256 * 1024;

/// What goes between two part records in a part file
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordSeparator {
    /// One record per line
    #[default]
    Newline,
    /// Records separated by an empty line
    BlankLine,
}

impl RecordSeparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordSeparator::Newline => "\n",
            RecordSeparator::BlankLine => "\n\n",
        }
    }
}

/// Options shared by the block splitter and combiner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileOptions {
    /// Overwrite outputs that already have content
    pub truncate: bool,
    /// Report progress after every block
    pub verbose: bool,
    pub block_size: usize,
    pub separator: RecordSeparator,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            truncate: false,
            verbose: false,
            block_size: DEFAULT_BLOCK_SIZE,
            separator: RecordSeparator::Newline,
        }
    }
}

/// Configuration for the sharrd command line
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Plaintext bytes per block when splitting files
    pub block_size: usize,
    /// Separator written between part records
    pub separator: RecordSeparator,
    /// Number of shares to create (default: 5)
    pub default_parts: u8,
    /// Threshold required to recover the secret (default: 3)
    pub default_threshold: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            separator: RecordSeparator::Newline,
            default_parts: 5,
            default_threshold: 3,
        }
    }
}

impl Config {
    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "sharrd", "sharrd")
            .context("Failed to determine configuration directory")?;

        Ok(proj_dirs.config_dir().join("config.json"))
    }

    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to `path`, or to the default location
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(&path, contents)
            .context("Failed to write config file")?;

        Ok(path)
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            bail!("block_size must be greater than 0");
        }
        if self.default_threshold < 2 {
            bail!("default_threshold must be at least 2");
        }
        if self.default_threshold > self.default_parts {
            bail!(
                "default_threshold ({}) cannot be greater than default_parts ({})",
                self.default_threshold,
                self.default_parts
            );
        }
        Ok(())
    }

    pub fn file_options(&self, truncate: bool, verbose: bool) -> FileOptions {
        FileOptions {
            truncate,
            verbose,
            block_size: self.block_size,
            separator: self.separator,
        }
    }
}
