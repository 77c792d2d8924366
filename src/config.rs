use crate::data::{LoaderOptions, DEFAULT_CAMPAIGN_COST};
use crate::stats::HourFill;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_path")]
    pub path: PathBuf,
    #[serde(default = "default_separator")]
    pub separator: char,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: default_source_path(),
            separator: default_separator(),
        }
    }
}

fn default_source_path() -> PathBuf {
    PathBuf::from("social_media_engagement_enhanced.csv")
}

fn default_separator() -> char {
    ','
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_campaign_cost")]
    pub campaign_cost: f64,
    #[serde(default)]
    pub zero_fill_hours: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            campaign_cost: default_campaign_cost(),
            zero_fill_hours: false,
        }
    }
}

fn default_campaign_cost() -> f64 {
    DEFAULT_CAMPAIGN_COST
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Where a loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    File(PathBuf),
    Defaults,
}

impl fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigOrigin::File(path) => write!(f, "Loaded configuration from {}", path.display()),
            ConfigOrigin::Defaults => write!(f, "No config file found, using defaults"),
        }
    }
}

impl Config {
    /// Read `path`, or fall back to defaults when it does not exist.
    /// Logging is usually not installed yet, so the origin is returned for the caller to log.
    pub fn load(path: &Path) -> Result<(Self, ConfigOrigin)> {
        if !path.exists() {
            return Ok((Config::default(), ConfigOrigin::Defaults));
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Ok((Self::parse(&content)?, ConfigOrigin::File(path.to_path_buf())))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).with_context(|| "Failed to parse configuration file")?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let cost = self.pipeline.campaign_cost;
        if !cost.is_finite() || cost <= 0.0 {
            bail!("pipeline.campaign_cost must be greater than zero, got {}", cost);
        }
        if !self.source.separator.is_ascii() {
            bail!(
                "source.separator must be a single ASCII character, got {:?}",
                self.source.separator
            );
        }
        Ok(())
    }

    pub fn loader_options(&self) -> LoaderOptions {
        let mut options = LoaderOptions::default();
        if self.source.separator.is_ascii() {
            options.separator = self.source.separator as u8;
        }
        options
    }

    pub fn hour_fill(&self) -> HourFill {
        if self.pipeline.zero_fill_hours {
            HourFill::ZeroFill
        } else {
            HourFill::Observed
        }
    }
}
