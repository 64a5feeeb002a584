use anyhow::{Result, bail};
use clap::Parser;
use serde::Deserialize;
use serde_yaml;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "wayfarer")]
#[command(about = "Browse places and keep your favorites in sync", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,

    /// Run a single shell command instead of reading from stdin
    #[arg(short = 'e', long = "exec")]
    pub exec: Option<String>,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".wayfarer")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Deserialize, Clone)]
pub struct App {
    #[serde(default = "default_base_url")]
    base_url: String,
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_indicator_min")]
    pub indicator_min_ms: u64,
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_request_timeout() -> u64 {
    15
}

fn default_indicator_min() -> u64 {
    500
}

impl Default for App {
    fn default() -> Self {
        App {
            base_url: default_base_url(),
            data_dir: None,
            request_timeout_secs: default_request_timeout(),
            indicator_min_ms: default_indicator_min(),
            log_format: LogFormat::default(),
        }
    }
}

impl App {
    pub fn with_base_url(base_url: &str) -> Self {
        App {
            base_url: base_url.to_string(),
            ..App::default()
        }
    }

    pub fn get_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// `None` means requests may wait forever.
    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn indicator_min(&self) -> Duration {
        Duration::from_millis(self.indicator_min_ms)
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub app: App,
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        let cfg = Config::load_config(path)?;
        Ok(cfg)
    }

    /// Loads `path` when given. Without one, falls back to the default path and then to built-in defaults.
    pub fn resolve(path: Option<&str>) -> Result<(Self, PathBuf)> {
        match path {
            Some(path) => {
                let path = PathBuf::from(path);
                if !path.exists() {
                    bail!("config file not found: {}", path.display());
                }
                let cfg = Config::new(&path.to_string_lossy())?;
                Ok((cfg, path))
            }
            None => {
                let path = default_config_path();
                if path.exists() {
                    let cfg = Config::new(&path.to_string_lossy())?;
                    Ok((cfg, path))
                } else {
                    Ok((Config::default(), path))
                }
            }
        }
    }

    /// Directory for durable client storage.
    pub fn data_dir(&self, config_path: &std::path::Path) -> PathBuf {
        match &self.app.data_dir {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => config_path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(default_config_dir),
        }
    }

    fn load_config(path: &str) -> Result<Config> {
        let yaml_str = fs::read_to_string(path)?;
        Config::from_yaml(&yaml_str)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Config> {
        let yaml_with_env = Config::substitute_env_vars(yaml_str)?;
        let config: Config = serde_yaml::from_str(&yaml_with_env)?;
        Ok(config)
    }

    fn substitute_env_vars(yaml_str: &str) -> Result<String> {
        let mut result = yaml_str.to_string();
        let mut offset = 0;

        while let Some(start) = result[offset..].find("${") {
            let actual_start = offset + start;
            if let Some(end) = result[actual_start..].find("}") {
                let var_name = &result[actual_start + 2..actual_start + end];

                // ${VAR:-default}
                let env_value = if let Some(default_start) = var_name.find(":-") {
                    let actual_var = &var_name[..default_start];
                    let default_val = &var_name[default_start + 2..];
                    env::var(actual_var).unwrap_or_else(|_| default_val.to_string())
                } else {
                    env::var(var_name).unwrap_or_else(|_| {
                        tracing::warn!(var = var_name, "environment variable not found");
                        String::new()
                    })
                };

                result.replace_range(actual_start..actual_start + end + 1, &env_value);
                offset = actual_start + env_value.len();
            } else {
                break;
            }
        }

        Ok(result)
    }
}
