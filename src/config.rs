//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. User config: `~/.config/xdi/config.toml` (XDG) or platform config dir
//! 2. Project config: `.xdi.toml`
//! 3. Environment variables: `XDI_*`, nested keys separated by `__`
//!
//! # Example
//!
//! ```toml
//! [container]
//! on_missing = "fail"
//! validate_on_start = true
//! ```
//!
//! The same settings from the environment:
//! `XDI_CONTAINER__ON_MISSING=fail XDI_CONTAINER__VALIDATE_ON_START=true`.

use std::ops::Deref;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Data, Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

/// Boxed wrapper for figment::Error to reduce Result size on the stack.
#[derive(Debug)]
pub struct ConfigError(Box<figment::Error>);

impl Deref for ConfigError {
    type Target = figment::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub container: ContainerConfig,
}

/// What struct injection does when a marked field has no matching service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Leave the field untouched.
    #[default]
    Skip,
    /// Fail with `DiError::UnresolvedField`.
    Fail,
}

/// Container behaviour settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContainerConfig {
    /// Policy for injected fields without a registered service.
    #[serde(default)]
    pub on_missing: MissingPolicy,
    /// Materialize every lazy service right after wiring.
    #[serde(default)]
    pub validate_on_start: bool,
}

/// Project config file name, looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = ".xdi.toml";

impl Config {
    /// Load config with layered resolution (user → project → env).
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment(Toml::file(PROJECT_CONFIG_FILE))
    }

    /// Load config with an explicit project file in place of `.xdi.toml`.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::figment(Toml::file(path.as_ref()))
    }

    fn figment(project: Data<Toml>) -> Result<Self, ConfigError> {
        Figment::new()
            // Layer 1: User config (lowest priority)
            .merge(Toml::file(Self::user_config_path()))
            // Layer 2: Project config
            .merge(project)
            // Layer 3: Environment variables (highest priority)
            .merge(Env::prefixed("XDI_").split("__"))
            .extract()
            .map_err(ConfigError::from)
    }

    /// User config path: ~/.config/xdi/config.toml (XDG) or platform config dir.
    fn user_config_path() -> PathBuf {
        // Prefer XDG config location (~/.config) on all platforms
        if let Some(home) = dirs::home_dir() {
            let xdg_path = home.join(".config").join("xdi").join("config.toml");
            if xdg_path.exists() {
                return xdg_path;
            }
        }
        // Fall back to platform-specific config dir
        dirs::config_dir()
            .map(|p| p.join("xdi").join("config.toml"))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    #[serial]
    fn test_defaults_when_file_missing() {
        let config = Config::load_from("/nonexistent/xdi.toml").unwrap();
        assert_eq!(config.container.on_missing, MissingPolicy::Skip);
        assert!(!config.container.validate_on_start);
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        let file = write_config(
            r#"
            [container]
            on_missing = "fail"
            validate_on_start = true
            "#,
        );

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.container.on_missing, MissingPolicy::Fail);
        assert!(config.container.validate_on_start);
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let file = write_config("[container]\non_missing = \"fail\"\n");

        std::env::set_var("XDI_CONTAINER__ON_MISSING", "skip");
        let config = Config::load_from(file.path());
        std::env::remove_var("XDI_CONTAINER__ON_MISSING");

        assert_eq!(config.unwrap().container.on_missing, MissingPolicy::Skip);
    }

    #[test]
    #[serial]
    fn test_invalid_policy_is_an_error() {
        let file = write_config("[container]\non_missing = \"explode\"\n");
        assert!(Config::load_from(file.path()).is_err());
    }
}
