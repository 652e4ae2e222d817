//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::domain::criteria::{Junction, RenderFormat, RenderOptions, SearchArguments, SearchMode};

/// Quarry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub render: RenderConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub indent_width: usize,
    pub beautify: bool,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub page_size: u32,
    pub default_mode: String,
    pub root_condition: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            render: RenderConfig {
                indent_width: 2,
                beautify: false,
                format: "plain".to_string(),
            },
            search: SearchConfig {
                page_size: 25,
                default_mode: "basic".to_string(),
                root_condition: "OR".to_string(),
            },
        }
    }
}

impl RenderConfig {
    /// Build renderer options from the configured values
    pub fn options(&self) -> anyhow::Result<RenderOptions> {
        let format = RenderFormat::parse(&self.format)
            .ok_or_else(|| anyhow!("Invalid render format: {}", self.format))?;
        Ok(RenderOptions::default()
            .with_indent_width(self.indent_width)
            .with_beautify(self.beautify)
            .with_format(format))
    }
}

impl SearchConfig {
    pub fn mode(&self) -> anyhow::Result<SearchMode> {
        SearchMode::parse(&self.default_mode)
            .ok_or_else(|| anyhow!("Invalid search mode: {}", self.default_mode))
    }

    /// Paging arguments for searches started with this configuration
    pub fn arguments(&self) -> SearchArguments {
        SearchArguments::default().with_page_size(self.page_size)
    }

    pub fn root_junction(&self) -> anyhow::Result<Junction> {
        Junction::parse(&self.root_condition)
            .ok_or_else(|| anyhow!("Invalid root condition: {}", self.root_condition))
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("QUARRY_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("quarry")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or return defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.render.options()?;
        self.search.mode()?;
        self.search.root_junction()?;
        if self.search.page_size == 0 {
            return Err(anyhow!("Page size must be greater than zero"));
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "render.indent_width" => Ok(self.render.indent_width.to_string()),
            "render.beautify" => Ok(self.render.beautify.to_string()),
            "render.format" => Ok(self.render.format.clone()),

            "search.page_size" => Ok(self.search.page_size.to_string()),
            "search.default_mode" => Ok(self.search.default_mode.clone()),
            "search.root_condition" => Ok(self.search.root_condition.clone()),

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `quarry config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "render.indent_width" => {
                let width: usize = value
                    .parse()
                    .with_context(|| format!("Invalid indent_width value: {}", value))?;
                if width > 16 {
                    return Err(anyhow!("Indent width must be between 0 and 16"));
                }
                self.render.indent_width = width;
            }
            "render.beautify" => {
                self.render.beautify = value
                    .parse()
                    .with_context(|| format!("Invalid beautify value: {}", value))?;
            }
            "render.format" => {
                let format = RenderFormat::parse(value).ok_or_else(|| {
                    anyhow!("Invalid render format: {}. Valid options: plain, ansi, html", value)
                })?;
                self.render.format = format.as_str().to_string();
            }

            "search.page_size" => {
                let size: u32 = value
                    .parse()
                    .with_context(|| format!("Invalid page_size value: {}", value))?;
                if size == 0 {
                    return Err(anyhow!("Page size must be greater than zero"));
                }
                self.search.page_size = size;
            }
            "search.default_mode" => {
                if SearchMode::parse(value).is_none() {
                    return Err(anyhow!(
                        "Invalid search mode: {}. Valid options: basic, advanced, external",
                        value
                    ));
                }
                self.search.default_mode = value.to_lowercase();
            }
            "search.root_condition" => {
                let junction = Junction::parse(value).ok_or_else(|| {
                    anyhow!("Invalid root condition: {}. Valid options: AND, OR", value)
                })?;
                self.search.root_condition = junction.as_str().to_string();
            }

            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `quarry config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = vec![
            "render.indent_width",
            "render.beautify",
            "render.format",
            "search.page_size",
            "search.default_mode",
            "search.root_condition",
        ];

        keys.into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}
