use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, warn};

pub const PRODUCTION_API_URL: &str = "https://api.img.pro";
pub const TEST_API_URL: &str = "https://test.api.img.pro";
pub const DEFAULT_AUTH_URL: &str = "https://img.pro";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Test,
}

impl Environment {
    pub fn api_url(self) -> &'static str {
        match self {
            Self::Production => PRODUCTION_API_URL,
            Self::Test => TEST_API_URL,
        }
    }

    /// Local development talks to the test API.
    pub fn for_hostname(hostname: &str) -> Self {
        if hostname == "localhost" { Self::Test } else { Self::Production }
    }
}

/// Settings from `config.toml`, then `IMGPRO_*` environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Overrides the environment's API base URL.
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub auth_url: Option<String>,
    #[serde(default)]
    pub database_url: Option<String>,
    /// Used when storage has no saved environment yet.
    #[serde(default)]
    pub environment: Option<Environment>,
}

impl Config {
    /// Load from `path`, or the default config file when `None`. A missing
    /// file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |k| std::env::var(k).ok())
    }

    /// [`Config::load`] with an explicit variable lookup.
    pub fn load_with(path: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path(),
        };
        let mut cfg = match path {
            Some(p) if p.exists() => Self::from_file(&p)?,
            _ => Self::default(),
        };
        cfg.apply_env(lookup);
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        debug!(path = %path.display(), "loaded config file");
        toml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Environment variables win over file values. Takes a lookup function so
    /// tests don't have to touch the process environment.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());
        if let Some(v) = non_empty("IMGPRO_API_URL") { self.api_url = Some(v); }
        if let Some(v) = non_empty("IMGPRO_AUTH_URL") { self.auth_url = Some(v); }
        if let Some(v) = non_empty("IMGPRO_DATABASE_URL") { self.database_url = Some(v); }
        if let Some(v) = non_empty("IMGPRO_ENVIRONMENT").and_then(|v| v.parse().ok()) { self.environment = Some(v); }
    }

    pub fn auth_url(&self) -> &str {
        self.auth_url.as_deref().unwrap_or(DEFAULT_AUTH_URL)
    }

    /// API base URL override for one run. An explicit `run_env` wins over the
    /// configured `api_url`, since it was asked for on this invocation.
    pub fn api_url_for_run(&self, run_env: Option<Environment>) -> Option<String> {
        match run_env {
            Some(env) => {
                if let Some(configured) = &self.api_url {
                    warn!(%configured, environment = %env, "--env overrides the configured api_url for this run");
                }
                Some(env.api_url().to_string())
            }
            None => self.api_url.clone(),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("pro", "img", "imgpro").map(|p| p.config_dir().join("config.toml"))
}
