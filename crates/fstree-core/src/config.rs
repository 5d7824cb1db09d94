//! Configuration module

use crate::descriptor::{parse_mode, MAX_MODE};
use crate::materialize::DEFAULT_DIR_MODE;
use crate::rank::{build_chain, RankChain, RankKind};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tree creation settings
    pub create: CreateConfig,
    /// Tree comparison settings
    pub diff: DiffConfig,
}

/// Tree creation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateConfig {
    /// Mode for ancestor directories created without a descriptor of their own
    #[serde(deserialize_with = "deserialize_mode")]
    pub default_dir_mode: u32,
}

impl Default for CreateConfig {
    fn default() -> Self {
        Self {
            default_dir_mode: DEFAULT_DIR_MODE,
        }
    }
}

/// Tree comparison configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Rank chain used when none is given explicitly
    pub ranks: Vec<RankKind>,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            ranks: vec![
                RankKind::Name,
                RankKind::Dir,
                RankKind::Size,
                RankKind::Content,
            ],
        }
    }
}

impl DiffConfig {
    /// Instantiates the configured chain
    pub fn chain(&self) -> Result<RankChain> {
        if self.ranks.is_empty() {
            return Err(Error::EmptyRankChain);
        }
        Ok(build_chain(&self.ranks))
    }
}

/// Mode given either as an integer or as an octal string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ModeConfig {
    Numeric(u32),
    Octal(String),
}

/// Deserialize a mode from either `0o750` (TOML integer) or `"750"`
fn deserialize_mode<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    let mode = match ModeConfig::deserialize(deserializer)? {
        ModeConfig::Numeric(mode) => mode,
        ModeConfig::Octal(text) => parse_mode(text.trim())
            .map_err(|e| D::Error::custom(format!("Invalid mode {:?}: {}", text, e)))?,
    };
    if mode > MAX_MODE {
        return Err(D::Error::custom(format!("Mode {:o} exceeds 7777", mode)));
    }
    Ok(mode)
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::fs(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` when given, the defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.diff.ranks.is_empty() {
            return Err(Error::Config(
                "diff.ranks must list at least one rank".to_string(),
            ));
        }
        Ok(())
    }

    /// Get default configuration content with examples
    pub fn default_config_content() -> String {
        r#"# fstree configuration file

[create]
# Mode for directories created only because a deeper entry needs them.
# Directories with their own descriptor line always get that line's mode.
default_dir_mode = "700"

[diff]
# Rank chain, evaluated left to right; the first mismatch wins.
# Available: name, dir, size, perm, time, content
ranks = ["name", "dir", "size", "content"]
"#
        .to_string()
    }
}
