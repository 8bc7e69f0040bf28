//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/dectree/dectree.toml`
//! 3. Local config: `<dir>/.dectree.toml`
//! 4. Environment variables: `DECTREE_*` prefix

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::Principal;

/// Raw settings for intermediate parsing (arrays are Option to detect
/// "not specified").
///
/// - `None` → field not specified, inherit from base
/// - `Some([])` → explicit empty array
/// - `Some([...])` → explicit values to merge
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub database: Option<PathBuf>,
    pub actor: Option<String>,
    pub superusers: Option<Vec<String>>,
    pub busy_timeout_ms: Option<u64>,
}

/// Unified configuration for dectree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// SQLite database file
    pub database: PathBuf,
    /// Name recorded as creator of new entities
    pub actor: String,
    /// Actors allowed to modify trees; everybody else reads only
    pub superusers: Vec<String>,
    /// How long a writer waits for a competing writer
    pub busy_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let actor = default_actor();
        Self {
            database: default_database(),
            superusers: vec![actor.clone()],
            actor,
            busy_timeout_ms: 5000,
        }
    }
}

fn default_actor() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "admin".into())
}

/// Default database location in the XDG data directory.
fn default_database() -> PathBuf {
    ProjectDirs::from("", "", "dectree")
        .map(|dirs| dirs.data_dir().join("dectree.db"))
        .unwrap_or_else(|| PathBuf::from("~/.local/share/dectree/dectree.db"))
}

/// Get the XDG config directory for dectree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "dectree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("dectree.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".dectree.toml")
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
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

impl Settings {
    /// Merge arrays with union semantics and negation support.
    ///
    /// - Items from overlay are added to base
    /// - Items prefixed with `!` remove the corresponding item from the result
    /// - Duplicates are de-duplicated
    ///
    /// # Examples
    /// ```ignore
    /// merge_array(&["alice", "bob"], &["carol"])        // → ["alice", "bob", "carol"]
    /// merge_array(&["alice", "bob"], &["!alice", "carol"]) // → ["bob", "carol"]
    /// ```
    pub fn merge_array(base: &[String], overlay: &[String]) -> Vec<String> {
        let mut result: HashSet<String> = base.iter().cloned().collect();

        for item in overlay {
            if let Some(negated) = item.strip_prefix('!') {
                result.remove(negated);
            } else {
                result.insert(item.clone());
            }
        }

        // sorted for deterministic output
        let mut vec: Vec<String> = result.into_iter().collect();
        vec.sort();
        vec
    }

    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        let expanded = expand(self.database.to_string_lossy().as_ref());
        self.database = PathBuf::from(expanded);
    }

    /// Merge overlay config onto self (base) with union semantics for arrays.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            database: overlay
                .database
                .clone()
                .unwrap_or_else(|| self.database.clone()),
            actor: overlay.actor.clone().unwrap_or_else(|| self.actor.clone()),
            superusers: overlay
                .superusers
                .as_ref()
                .map(|o| Self::merge_array(&self.superusers, o))
                .unwrap_or_else(|| self.superusers.clone()),
            busy_timeout_ms: overlay.busy_timeout_ms.unwrap_or(self.busy_timeout_ms),
        }
    }

    /// Apply global config onto defaults with REPLACE semantics for arrays.
    ///
    /// The compiled superuser default is only a placeholder; the global
    /// file defines the real baseline that local files extend.
    fn apply_global(&self, global: &RawSettings) -> Self {
        Self {
            database: global
                .database
                .clone()
                .unwrap_or_else(|| self.database.clone()),
            actor: global.actor.clone().unwrap_or_else(|| self.actor.clone()),
            superusers: global
                .superusers
                .clone()
                .unwrap_or_else(|| self.superusers.clone()),
            busy_timeout_ms: global.busy_timeout_ms.unwrap_or(self.busy_timeout_ms),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Optional directory holding a `.dectree.toml`
    ///
    /// # Array Merge Semantics
    /// - Defaults → Global: REPLACE
    /// - Global → Local: UNION with negation support
    /// - Any → Env vars: REPLACE
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let global = global_config_path().filter(|p| p.exists());
        Self::load_from(global.as_deref(), local_dir)
    }

    /// [`Settings::load`] with an explicit global file.
    pub fn load_from(
        global: Option<&Path>,
        local_dir: Option<&Path>,
    ) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global {
            let raw = load_raw_settings(global_path)?;
            current = current.apply_global(&raw);
        }

        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();
        Ok(current)
    }

    /// Apply DECTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("DECTREE")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("superusers")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("database") {
            settings.database = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("actor") {
            settings.actor = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("superusers") {
            settings.superusers = val;
        }
        if let Ok(val) = config.get::<u64>("busy_timeout_ms") {
            settings.busy_timeout_ms = val;
        }

        Ok(settings)
    }

    /// The acting principal: the configured actor, superuser if listed.
    pub fn principal(&self) -> Principal {
        Principal::new(
            self.actor.clone(),
            self.superusers.iter().any(|s| s == &self.actor),
        )
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# dectree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/dectree/dectree.toml  (defines your baseline)
#   Local:  <dir>/.dectree.toml             (directory-specific additions)
#   Env:    DECTREE_* environment variables (explicit overrides)
#
# Array Merge Semantics:
#   Global config REPLACES compiled defaults.
#   Local config UNIONS with global.
#   Use "!name" in local config to REMOVE an inherited item:
#     superusers = ["carol", "!alice"]

# SQLite database file
# database = "~/.local/share/dectree/dectree.db"

# Name recorded as creator of new trees, paths, steps, options and solutions
# actor = "alice"

# Actors allowed to modify trees (everybody else has read-only access)
# superusers = ["alice"]

# Milliseconds a writer waits while another process holds the database
# busy_timeout_ms = 5000
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn given_defaults_when_created_then_actor_is_superuser() {
        let settings = Settings::default();
        assert!(!settings.actor.is_empty());
        assert_eq!(settings.superusers, vec![settings.actor.clone()]);
        assert!(settings.principal().superuser);
        assert_eq!(settings.busy_timeout(), Duration::from_millis(5000));
        assert!(settings.database.ends_with("dectree.db"));
    }

    #[test]
    fn given_tilde_in_database_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            database: PathBuf::from("~/trees/dectree.db"),
            ..Settings::default()
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        let db = settings.database.to_string_lossy();
        assert!(db.starts_with(&home), "database should start with home: {db}");
        assert!(!db.contains('~'));
    }

    #[rstest]
    #[case(&["a", "b"], &["c"], &["a", "b", "c"])]
    #[case(&["a", "b"], &["!a", "c"], &["b", "c"])]
    #[case(&["a", "b"], &["!x"], &["a", "b"])]
    #[case(&[], &["a"], &["a"])]
    #[case(&["a"], &[], &["a"])]
    #[case(&["a", "b"], &["a", "c"], &["a", "b", "c"])]
    fn given_arrays_when_merge_array_then_unions_with_negation(
        #[case] base: &[&str],
        #[case] overlay: &[&str],
        #[case] expected: &[&str],
    ) {
        let result = Settings::merge_array(&strings(base), &strings(overlay));
        assert_eq!(result, strings(expected));
    }

    #[test]
    fn given_global_superusers_when_apply_global_then_replaces_defaults() {
        let base = Settings {
            superusers: strings(&["root"]),
            ..Settings::default()
        };
        let global = RawSettings {
            superusers: Some(strings(&["alice", "bob"])),
            busy_timeout_ms: Some(100),
            ..RawSettings::default()
        };

        let result = base.apply_global(&global);

        assert_eq!(result.superusers, strings(&["alice", "bob"]));
        assert_eq!(result.busy_timeout_ms, 100);
        assert_eq!(result.actor, base.actor);
    }

    #[test]
    fn given_local_superusers_when_merge_with_then_unions() {
        let base = Settings {
            actor: "alice".into(),
            superusers: strings(&["alice", "bob"]),
            ..Settings::default()
        };
        let local = RawSettings {
            actor: Some("bob".into()),
            superusers: Some(strings(&["!bob", "carol"])),
            ..RawSettings::default()
        };

        let result = base.merge_with(&local);

        assert_eq!(result.actor, "bob");
        assert_eq!(result.superusers, strings(&["alice", "carol"]));
        assert!(!result.principal().superuser);
    }

    #[test]
    fn given_settings_when_to_toml_then_round_trips() {
        let settings = Settings {
            database: PathBuf::from("/tmp/x.db"),
            actor: "alice".into(),
            superusers: strings(&["alice"]),
            busy_timeout_ms: 250,
        };
        let text = settings.to_toml().unwrap();
        let parsed: Settings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }
}
