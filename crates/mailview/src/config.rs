//! View configuration
//!
//! Loaded from (in order of priority):
//! 1. JSON file (~/.config/mailview/mailview.json)
//! 2. Environment variables (`MAILVIEW_BASE_URL`, `MAILVIEW_PAGE_SIZE`)
//! 3. Built-in defaults

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::render::DEFAULT_MAX_HTML_BYTES;

/// Config filename in the mailview config directory
const CONFIG_FILE: &str = "mailview.json";

const BASE_URL_ENV: &str = "MAILVIEW_BASE_URL";
const PAGE_SIZE_ENV: &str = "MAILVIEW_PAGE_SIZE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Records requested per overview page
    pub page_size: usize,
    /// Rows from the end of the list at which the next page is requested
    pub prefetch_threshold: usize,
    /// HTML bodies above this size are not sanitized; the text is shown instead
    pub max_html_bytes: usize,
    /// Webmail server root for the REST backend
    pub base_url: Option<String>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            prefetch_threshold: 10,
            max_html_bytes: DEFAULT_MAX_HTML_BYTES,
            base_url: None,
        }
    }
}

impl ViewConfig {
    /// Load config using the following priority:
    /// 1. JSON file (~/.config/mailview/mailview.json)
    /// 2. Environment variables over defaults
    pub fn load() -> Result<Self> {
        if config::config_exists(CONFIG_FILE) {
            let loaded: Self = config::load_json(CONFIG_FILE)?;
            return loaded.validated();
        }
        Self::from_env()
    }

    /// Load config from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let loaded: Self = config::load_json_file(path)?;
        loaded.validated()
    }

    /// Parse config from a JSON string; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: Self = serde_json::from_str(json).context("Failed to parse view config JSON")?;
        parsed.validated()
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(url) = lookup(BASE_URL_ENV).filter(|u| !u.trim().is_empty()) {
            cfg.base_url = Some(url.trim().to_string());
        }
        if let Some(size) = lookup(PAGE_SIZE_ENV) {
            cfg.page_size = size
                .trim()
                .parse()
                .with_context(|| format!("{PAGE_SIZE_ENV} is not a number: {size}"))?;
        }
        cfg.validated()
    }

    /// Write the config to the mailview config directory
    pub fn save(&self) -> Result<PathBuf> {
        config::save_json(CONFIG_FILE, self)
    }

    /// Get the default config file path (~/.config/mailview/mailview.json)
    pub fn default_path() -> Option<PathBuf> {
        config::config_path(CONFIG_FILE)
    }

    fn validated(self) -> Result<Self> {
        if self.page_size < 1 {
            bail!("page_size must be >= 1");
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg = ViewConfig::from_json(r#"{"page_size": 25, "base_url": "http://localhost:8000"}"#).unwrap();
        assert_eq!(cfg.page_size, 25);
        assert_eq!(cfg.prefetch_threshold, 10);
        assert_eq!(cfg.max_html_bytes, 2 * 1024 * 1024);
        assert_eq!(cfg.base_url.as_deref(), Some("http://localhost:8000"));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert!(ViewConfig::from_json(r#"{"page_size": 0}"#).is_err());
        assert!(ViewConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars = HashMap::from([
            (BASE_URL_ENV, " https://mail.example.com "),
            (PAGE_SIZE_ENV, "20"),
        ]);
        let cfg = ViewConfig::from_vars(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.base_url.as_deref(), Some("https://mail.example.com"));
        assert_eq!(cfg.page_size, 20);

        let bad = HashMap::from([(PAGE_SIZE_ENV, "lots")]);
        assert!(ViewConfig::from_vars(|name| bad.get(name).map(|v| v.to_string())).is_err());

        let none = ViewConfig::from_vars(|_| None).unwrap();
        assert_eq!(none, ViewConfig::default());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let cfg = ViewConfig {
            prefetch_threshold: 3,
            ..ViewConfig::default()
        };
        config::save_json_file(&path, &cfg).unwrap();

        assert_eq!(ViewConfig::from_file(&path).unwrap(), cfg);
    }
}
