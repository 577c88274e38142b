//! # Configuration
//!
//! Settings are read from an INI file:
//!
//! ```ini
//! [auth]
//! username = alice
//! token = ghp_...
//!
//! [options]
//! repo_dir = /srv/mirrors
//! owner_dirs = true
//! workers = 4
//! api_url = https://api.github.com/
//!
//! [database]
//! path = /srv/mirrors/metadata.db
//!
//! [notify]
//! webhook_url = https://hooks.example.com/services/...
//! ```
//!
//! `[auth]` and `options.repo_dir` are required; everything else has a
//! default or is optional.

use std::fmt;
use std::path::{Path, PathBuf};

use ini::Ini;

use crate::defaults;
use crate::error::{Error, Result};
use crate::github::DEFAULT_API_URL;

/// Parsed configuration file.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub username: String,
    pub token: String,
    pub repo_dir: PathBuf,
    pub owner_dirs: bool,
    pub workers: usize,
    pub api_url: String,
    pub database: Option<PathBuf>,
    pub webhook_url: Option<String>,
}

// Keeps the token out of debug logs.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .field("repo_dir", &self.repo_dir)
            .field("owner_dirs", &self.owner_dirs)
            .field("workers", &self.workers)
            .field("api_url", &self.api_url)
            .field("database", &self.database)
            .field("webhook_url", &self.webhook_url)
            .finish()
    }
}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read {}: {}", path.display(), e),
            hint: Some("Pass --config or set REPO_MIRROR_CONFIG".to_string()),
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let ini = Ini::load_from_str(content).map_err(|e| Error::Config {
            message: format!("invalid INI: {}", e),
            hint: None,
        })?;

        let username = required(&ini, "auth", "username")?;
        let token = required(&ini, "auth", "token")?;
        let repo_dir = PathBuf::from(required(&ini, "options", "repo_dir")?);

        let owner_dirs = match optional(&ini, "options", "owner_dirs") {
            Some(value) => parse_bool("owner_dirs", value)?,
            None => true,
        };
        let workers = match optional(&ini, "options", "workers") {
            Some(value) => parse_workers(value)?,
            None => defaults::DEFAULT_WORKERS,
        };
        let api_url = optional(&ini, "options", "api_url")
            .unwrap_or(DEFAULT_API_URL)
            .to_string();

        Ok(Self {
            username,
            token,
            repo_dir,
            owner_dirs,
            workers,
            api_url,
            database: optional(&ini, "database", "path").map(PathBuf::from),
            webhook_url: optional(&ini, "notify", "webhook_url").map(str::to_string),
        })
    }
}

fn optional<'a>(ini: &'a Ini, section: &str, key: &str) -> Option<&'a str> {
    ini.get_from(Some(section), key)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn required(ini: &Ini, section: &str, key: &str) -> Result<String> {
    optional(ini, section, key)
        .map(str::to_string)
        .ok_or_else(|| Error::Config {
            message: format!("missing {} in [{}]", key, section),
            hint: Some(format!("Add '{} = ...' under [{}]", key, section)),
        })
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(Error::Config {
            message: format!("{} must be a boolean, got '{}'", key, value),
            hint: Some("Use true or false".to_string()),
        }),
    }
}

fn parse_workers(value: &str) -> Result<usize> {
    match value.parse::<usize>() {
        Ok(workers) if workers > 0 => Ok(workers),
        _ => Err(Error::Config {
            message: format!("workers must be a positive integer, got '{}'", value),
            hint: None,
        }),
    }
}
