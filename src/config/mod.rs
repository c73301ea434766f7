//! Configuration system for regsync.
//!
//! This module provides the configuration structures and CLI definitions for
//! the regsync application. Precedence merging is handled by the
//! `ortho_config` crate: CLI flags override environment variables, which
//! override configuration files, which override defaults.
//!
//! The configuration file is expected at `~/.config/regsync/config.toml` by
//! default.
//!
//! # Example Configuration
//!
//! ```toml
//! engine_socket = "unix:///run/user/1000/podman/podman.sock"
//! api_version = "1.43"
//!
//! [retry]
//! pulls = 3
//! delay_secs = 5
//!
//! [registry]
//! docker_config = "/home/user/.docker/config.json"
//! ```

mod cli;
mod loader;
mod types;

#[cfg(test)]
mod tests;

pub use cli::{Cli, Commands, ImageArgs, ImagesArgs, RemoveArgs, RunArgs, TransferArgs};
pub use loader::{env_var_names, load_config};
pub use types::{AppConfig, RegistryConfig, RetryConfig};
