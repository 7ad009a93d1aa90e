//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/sectree/sectree.toml`
//! 3. Environment variables: `SECTREE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;

/// Unified configuration for sectree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Base directory for sectree (default: ~/.sectree)
    pub base_dir: PathBuf,
    /// Store file (default: base_dir/store.json)
    pub store_file: PathBuf,
    /// JSON-lines audit log; audit events go to the log output when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_log: Option<PathBuf>,
    /// Identity recorded on changes (default: $USER or "system")
    pub actor: String,
    /// Compact sibling order and renumber after every section delete
    pub renumber_after_delete: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let base_dir = dirs_default_base_dir();
        let actor = std::env::var("USER").unwrap_or_else(|_| "system".into());

        Self {
            store_file: base_dir.join("store.json"),
            base_dir,
            audit_log: None,
            actor,
            renumber_after_delete: false,
        }
    }
}

/// Raw settings for intermediate parsing.
///
/// `None` means "not specified": the lower layer is kept.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub base_dir: Option<PathBuf>,
    pub store_file: Option<PathBuf>,
    pub audit_log: Option<PathBuf>,
    pub actor: Option<String>,
    pub renumber_after_delete: Option<bool>,
}

/// Get the default base directory (~/.sectree).
fn dirs_default_base_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".sectree"))
        .unwrap_or_else(|| PathBuf::from("~/.sectree"))
}

/// Get the XDG config directory for sectree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "sectree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("sectree.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Expand `~`, `$VAR` and `${VAR}`; unknown variables are left as written.
fn expand(value: &str) -> String {
    shellexpand::full(value)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| shellexpand::tilde(value).into_owned())
}

impl Settings {
    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        self.base_dir = PathBuf::from(expand(self.base_dir.to_string_lossy().as_ref()));
        self.store_file = PathBuf::from(expand(self.store_file.to_string_lossy().as_ref()));
        if let Some(audit_log) = &self.audit_log {
            self.audit_log = Some(PathBuf::from(expand(audit_log.to_string_lossy().as_ref())));
        }
    }

    /// Overlay a raw layer. A layer that moves `base_dir` without naming
    /// `store_file` moves the default store file along with it.
    fn apply_layer(&self, raw: &RawSettings) -> Self {
        let base_dir = raw.base_dir.clone().unwrap_or_else(|| self.base_dir.clone());
        let store_file = match (&raw.store_file, &raw.base_dir) {
            (Some(file), _) => file.clone(),
            (None, Some(dir)) if self.store_file == self.base_dir.join("store.json") => {
                dir.join("store.json")
            }
            (None, _) => self.store_file.clone(),
        };
        Self {
            base_dir,
            store_file,
            audit_log: raw.audit_log.clone().or_else(|| self.audit_log.clone()),
            actor: raw.actor.clone().unwrap_or_else(|| self.actor.clone()),
            renumber_after_delete: raw
                .renumber_after_delete
                .unwrap_or(self.renumber_after_delete),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/sectree/sectree.toml`
    /// 3. Environment variables: `SECTREE_*` prefix
    pub fn load() -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                current = Self::load_with_file(current, &global_path)?;
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply one TOML config file on top of `base`.
    pub fn load_with_file(base: Self, path: &Path) -> Result<Self, ApplicationError> {
        let raw = load_raw_settings(path)?;
        Ok(base.apply_layer(&raw))
    }

    /// Apply SECTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("SECTREE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        let mut raw = RawSettings::default();
        if let Ok(val) = config.get_string("base_dir") {
            raw.base_dir = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get_string("store_file") {
            raw.store_file = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get_string("audit_log") {
            raw.audit_log = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get_string("actor") {
            raw.actor = Some(val);
        }
        if let Ok(val) = config.get_bool("renumber_after_delete") {
            raw.renumber_after_delete = Some(val);
        }

        Ok(settings.apply_layer(&raw))
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# sectree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/sectree/sectree.toml
#   Env:    SECTREE_* environment variables (e.g. SECTREE_ACTOR=alice)

# Base directory for sectree data
# base_dir = "~/.sectree"

# Section store (defaults to base_dir/store.json)
# store_file = "~/.sectree/store.json"

# Append audit events as JSON lines to this file instead of the log output
# audit_log = "~/.sectree/audit.jsonl"

# Identity recorded on changes (defaults to $USER)
# actor = "alice"

# Close gaps in sibling order and renumber after deleting a section
# renumber_after_delete = false
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
