//! Configuration data types for regsync.

use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoResult, PostMergeContext, PostMergeHook};
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

use crate::client::RetryPolicy;

/// Pull retry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, SmartDefault)]
#[serde(default)]
pub struct RetryConfig {
    /// Extra pull attempts after the first failure. Zero means one attempt.
    #[default = 0]
    pub pulls: u32,

    /// Seconds slept after the first failed attempt; doubled after each
    /// further failure.
    #[default = 5]
    pub delay_secs: u64,
}

impl RetryConfig {
    /// Convert into the client's retry policy.
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.pulls, Duration::from_secs(self.delay_secs))
    }
}

/// Registry credential configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Docker CLI `config.json` holding per-registry `auths`.
    ///
    /// Defaults to `$DOCKER_CONFIG/config.json`, then
    /// `~/.docker/config.json`.
    pub docker_config: Option<Utf8PathBuf>,
}

/// Root application configuration.
///
/// This structure is loaded from configuration files, environment variables,
/// and command-line arguments with layered precedence. The precedence order
/// (lowest to highest) is: defaults, configuration file, environment variables,
/// command-line arguments.
///
/// Configuration files are discovered in this order:
/// 1. Path specified via `REGSYNC_CONFIG_PATH` environment variable
/// 2. `.regsync.toml` in the current working directory
/// 3. `.regsync.toml` in the home directory
/// 4. `~/.config/regsync/config.toml` (XDG default)
#[derive(Debug, Clone, Default, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(
    prefix = "REGSYNC",
    post_merge_hook,
    discovery(
        app_name = "regsync",
        env_var = "REGSYNC_CONFIG_PATH",
        config_file_name = "config.toml",
        dotfile_name = ".regsync.toml",
        config_cli_long = "config",
        config_cli_visible = true,
    )
)]
pub struct AppConfig {
    /// The container engine socket path or URL.
    pub engine_socket: Option<String>,

    /// Engine API version to negotiate, as `<major>.<minor>`.
    pub api_version: Option<String>,

    /// Pull retry configuration.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub retry: RetryConfig,

    /// Registry credential configuration.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub registry: RegistryConfig,
}

impl PostMergeHook for AppConfig {
    fn post_merge(&mut self, _ctx: &PostMergeContext) -> OrthoResult<()> {
        // Blank strings from the environment mean "unset".
        self.engine_socket = self
            .engine_socket
            .take()
            .filter(|value| !value.trim().is_empty());
        self.api_version = self
            .api_version
            .take()
            .filter(|value| !value.trim().is_empty());
        Ok(())
    }
}
