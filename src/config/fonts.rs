//! Font search configuration.
//!
//! Mirrors [`FontSearchConfig`] plus the resolver strategy. The
//! `INKMARK_CUSTOM_FONT_PATH` environment variable wins over `custom_path`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::watermark::fonts::{
    FontSearchConfig, FontStrategy, CUSTOM_FONT_ENV, DEFAULT_SYSTEM_FONT_ROOT, KNOWN_FONT_PATHS,
};

fn default_known_paths() -> Vec<PathBuf> {
    KNOWN_FONT_PATHS.iter().map(PathBuf::from).collect()
}

fn default_system_root() -> PathBuf {
    PathBuf::from(DEFAULT_SYSTEM_FONT_ROOT)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontsConfig {
    /// Operator-supplied font file, tried first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_path: Option<PathBuf>,

    /// Well-known font files, tried in order after the custom path
    #[serde(default = "default_known_paths")]
    pub known_paths: Vec<PathBuf>,

    /// Directory scanned recursively when no known path works
    #[serde(default = "default_system_root")]
    pub system_root: PathBuf,

    /// per_call or cached (default)
    #[serde(default)]
    pub strategy: FontStrategy,
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self {
            custom_path: None,
            known_paths: default_known_paths(),
            system_root: default_system_root(),
            strategy: FontStrategy::default(),
        }
    }
}

impl FontsConfig {
    pub fn to_search_config(&self) -> FontSearchConfig {
        FontSearchConfig {
            custom_path: self.custom_path.clone(),
            known_paths: self.known_paths.clone(),
            system_root: self.system_root.clone(),
        }
    }

    /// Replace `custom_path` with the environment override when it is set.
    pub fn apply_env_override(&mut self) {
        if let Some(path) = std::env::var(CUSTOM_FONT_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
        {
            self.custom_path = Some(PathBuf::from(path));
        }
    }
}
