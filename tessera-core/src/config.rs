//! Runtime configuration
//!
//! Layered from TOML files: the user file is read first, then the project file
//! overrides any key it sets explicitly. Unset keys fall back to defaults.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tessera_plugin_api::DEFAULT_WIDGET_PRIORITY;
use thiserror::Error;

/// Env var overriding the project config directory
pub const PROJECT_CONFIG_DIR_ENV: &str = "TESSERA_PROJECT_CONFIG_DIR";

const CONFIG_FILE: &str = "runtime.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Final runtime configuration with defaults applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Version reported in `core.app.initialized`
    pub app_version: String,
    /// Upper bound on each plugin `init`, in milliseconds
    pub init_timeout_ms: Option<u64>,
    /// Remove a plugin's routes when it is unloaded
    pub unload_routes: bool,
    /// Plugin names skipped at registration
    pub disabled_plugins: HashSet<String>,
    /// Priority for widgets registered without one
    pub default_widget_priority: i32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            init_timeout_ms: None,
            unload_routes: false,
            disabled_plugins: HashSet::new(),
            default_widget_priority: DEFAULT_WIDGET_PRIORITY,
        }
    }
}

impl RuntimeConfig {
    pub fn init_timeout(&self) -> Option<Duration> {
        self.init_timeout_ms.map(Duration::from_millis)
    }

    pub fn is_disabled(&self, plugin: &str) -> bool {
        self.disabled_plugins.contains(plugin)
    }
}

/// Config as read from a single file; every key optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRuntimeConfig {
    pub app_version: Option<String>,
    pub init_timeout_ms: Option<u64>,
    pub unload_routes: Option<bool>,
    pub disabled_plugins: Option<Vec<String>>,
    pub default_widget_priority: Option<i32>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<RuntimeConfig, ConfigError> {
        let paths: Vec<PathBuf> = Self::user_config_path()
            .into_iter()
            .chain(std::iter::once(Self::project_config_path()))
            .collect();
        Self::load_from(&paths)
    }

    /// Load and merge the given files in order; missing files are skipped
    pub fn load_from(paths: &[PathBuf]) -> Result<RuntimeConfig, ConfigError> {
        let mut raw = RawRuntimeConfig::default();
        for path in paths {
            if !path.exists() {
                continue;
            }
            let layer = Self::read(path)?;
            tracing::debug!(path = %path.display(), "Loaded config layer");
            raw = Self::merge_raw(raw, layer);
        }
        Self::finalize(raw)
    }

    /// Parse a single TOML document and apply defaults
    pub fn parse(contents: &str) -> Result<RuntimeConfig, ConfigError> {
        let raw: RawRuntimeConfig = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        Self::finalize(raw)
    }

    /// `$XDG_CONFIG_HOME/tessera/runtime.toml`, else the platform config dir
    pub fn user_config_path() -> Option<PathBuf> {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME")
            && !xdg.is_empty()
        {
            return Some(PathBuf::from(xdg).join("tessera").join(CONFIG_FILE));
        }
        dirs::config_dir().map(|dir| dir.join("tessera").join(CONFIG_FILE))
    }

    /// Get project config path
    /// Can be overridden with TESSERA_PROJECT_CONFIG_DIR
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var(PROJECT_CONFIG_DIR_ENV) {
            PathBuf::from(dir).join(CONFIG_FILE)
        } else {
            PathBuf::from(".tessera").join(CONFIG_FILE)
        }
    }

    fn read(path: &Path) -> Result<RawRuntimeConfig, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawRuntimeConfig, overlay: RawRuntimeConfig) -> RawRuntimeConfig {
        RawRuntimeConfig {
            app_version: overlay.app_version.or(base.app_version),
            init_timeout_ms: overlay.init_timeout_ms.or(base.init_timeout_ms),
            unload_routes: overlay.unload_routes.or(base.unload_routes),
            disabled_plugins: overlay.disabled_plugins.or(base.disabled_plugins),
            default_widget_priority: overlay
                .default_widget_priority
                .or(base.default_widget_priority),
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawRuntimeConfig) -> Result<RuntimeConfig, ConfigError> {
        if raw.init_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "init_timeout_ms must be greater than zero".into(),
            ));
        }
        if let Some(version) = &raw.app_version
            && version.trim().is_empty()
        {
            return Err(ConfigError::Invalid("app_version is empty".into()));
        }

        let defaults = RuntimeConfig::default();
        Ok(RuntimeConfig {
            app_version: raw.app_version.unwrap_or(defaults.app_version),
            init_timeout_ms: raw.init_timeout_ms,
            unload_routes: raw.unload_routes.unwrap_or(defaults.unload_routes),
            disabled_plugins: raw
                .disabled_plugins
                .map(|names| names.into_iter().collect())
                .unwrap_or_default(),
            default_widget_priority: raw
                .default_widget_priority
                .unwrap_or(defaults.default_widget_priority),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.app_version, env!("CARGO_PKG_VERSION"));
        assert_eq!(config.init_timeout(), None);
        assert!(!config.unload_routes);
        assert_eq!(config.default_widget_priority, 1);
    }

    #[test]
    fn test_parse_all_keys() {
        let config = ConfigLoader::parse(
            r#"
            app_version = "4.2.0"
            init_timeout_ms = 250
            unload_routes = true
            disabled_plugins = ["legacy-reports"]
            default_widget_priority = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.app_version, "4.2.0");
        assert_eq!(config.init_timeout(), Some(Duration::from_millis(250)));
        assert!(config.unload_routes);
        assert!(config.is_disabled("legacy-reports"));
        assert!(!config.is_disabled("billing"));
        assert_eq!(config.default_widget_priority, 10);
    }

    #[test]
    fn test_parse_rejects_zero_timeout() {
        let err = ConfigLoader::parse("init_timeout_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_parse_rejects_unknown_key() {
        let err = ConfigLoader::parse("unload_widgets = true").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_from_missing_files_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ConfigLoader::load_from(&[dir.path().join("nope.toml")]).unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn test_project_layer_overrides_user_layer() {
        let dir = TempDir::new().unwrap();
        let user = write(
            &dir,
            "user.toml",
            "app_version = \"1.0.0\"\nunload_routes = true\ndisabled_plugins = [\"a\"]",
        );
        let project = write(&dir, "project.toml", "app_version = \"2.0.0\"");

        let config = ConfigLoader::load_from(&[user, project]).unwrap();

        assert_eq!(config.app_version, "2.0.0");
        // Not set in the project layer, kept from the user layer
        assert!(config.unload_routes);
        assert!(config.is_disabled("a"));
    }

    #[test]
    fn test_load_from_reports_parse_path() {
        let dir = TempDir::new().unwrap();
        let bad = write(&dir, "bad.toml", "unload_routes = \"yes\"");

        match ConfigLoader::load_from(std::slice::from_ref(&bad)) {
            Err(ConfigError::Parse { path, .. }) => assert_eq!(path, bad),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_project_config_path_env_override() {
        let dir = TempDir::new().unwrap();
        // SAFETY: test is serialized, no other thread reads the environment
        unsafe { std::env::set_var(PROJECT_CONFIG_DIR_ENV, dir.path()) };
        let path = ConfigLoader::project_config_path();
        // SAFETY: see above
        unsafe { std::env::remove_var(PROJECT_CONFIG_DIR_ENV) };

        assert_eq!(path, dir.path().join("runtime.toml"));
    }

    #[test]
    #[serial]
    fn test_project_config_path_default() {
        // SAFETY: test is serialized, no other thread reads the environment
        unsafe { std::env::remove_var(PROJECT_CONFIG_DIR_ENV) };
        assert_eq!(
            ConfigLoader::project_config_path(),
            PathBuf::from(".tessera/runtime.toml")
        );
    }

    #[test]
    #[serial]
    fn test_user_config_path_honours_xdg() {
        let dir = TempDir::new().unwrap();
        let previous = std::env::var("XDG_CONFIG_HOME").ok();
        // SAFETY: test is serialized, no other thread reads the environment
        unsafe { std::env::set_var("XDG_CONFIG_HOME", dir.path()) };
        let path = ConfigLoader::user_config_path();
        // SAFETY: see above
        unsafe {
            match previous {
                Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
                None => std::env::remove_var("XDG_CONFIG_HOME"),
            }
        }

        assert_eq!(path, Some(dir.path().join("tessera").join("runtime.toml")));
    }

    #[test]
    #[serial]
    fn test_load_reads_project_dir_from_env() {
        let dir = TempDir::new().unwrap();
        write(&dir, "runtime.toml", "default_widget_priority = 7");
        let previous_xdg = std::env::var("XDG_CONFIG_HOME").ok();
        let empty_user = TempDir::new().unwrap();
        // SAFETY: test is serialized, no other thread reads the environment
        unsafe {
            std::env::set_var(PROJECT_CONFIG_DIR_ENV, dir.path());
            std::env::set_var("XDG_CONFIG_HOME", empty_user.path());
        }

        let config = ConfigLoader::load();

        // SAFETY: see above
        unsafe {
            std::env::remove_var(PROJECT_CONFIG_DIR_ENV);
            match previous_xdg {
                Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
                None => std::env::remove_var("XDG_CONFIG_HOME"),
            }
        }

        assert_eq!(config.unwrap().default_widget_priority, 7);
    }
}
