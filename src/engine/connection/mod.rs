//! Socket resolution and container engine connection.
//!
//! This module resolves the engine endpoint and API version from
//! configuration, environment variables, and platform defaults, then
//! establishes connections using the Bollard library.

use std::time::Duration;

use bollard::{ClientVersion, Docker};

use crate::error::{ContainerError, RegsyncError};

/// Environment variable names checked in fallback order after configuration sources.
const FALLBACK_ENV_VARS: &[&str] = &["DOCKER_HOST", "CONTAINER_HOST", "PODMAN_HOST"];

/// Environment variable selecting the engine API version.
const API_VERSION_ENV_VAR: &str = "DOCKER_API_VERSION";

/// Connection timeout in seconds for Docker/Podman API connections.
const CONNECTION_TIMEOUT_SECS: u64 = 120;

/// Timeout in seconds for health check operations.
const HEALTH_CHECK_TIMEOUT_SECS: u64 = 10;

/// Default socket path for Unix platforms.
#[cfg(unix)]
const DEFAULT_SOCKET: &str = "unix:///var/run/docker.sock";

/// Default socket path for Windows platforms.
#[cfg(windows)]
const DEFAULT_SOCKET: &str = "npipe:////./pipe/docker_engine";

/// Resolves container engine settings from environment variables.
///
/// # Type Parameters
///
/// * `E` - An environment provider implementing the `mockable::Env` trait,
///   allowing for testable environment variable access.
pub struct SocketResolver<'a, E: mockable::Env> {
    env: &'a E,
}

impl<'a, E: mockable::Env> SocketResolver<'a, E> {
    /// Creates a new socket resolver with the given environment provider.
    #[must_use]
    pub const fn new(env: &'a E) -> Self {
        Self { env }
    }

    /// Resolves the socket endpoint from fallback environment variables.
    ///
    /// Checks `DOCKER_HOST`, `CONTAINER_HOST`, then `PODMAN_HOST`. Returns
    /// `None` if none is set or all are empty.
    #[must_use]
    pub fn resolve_from_env(&self) -> Option<String> {
        FALLBACK_ENV_VARS
            .iter()
            .filter_map(|var_name| self.env.string(var_name))
            .find(|value| !value.is_empty())
    }

    /// Resolves the API version from `DOCKER_API_VERSION`, if set.
    #[must_use]
    pub fn api_version_from_env(&self) -> Option<String> {
        self.env
            .string(API_VERSION_ENV_VAR)
            .filter(|value| !value.is_empty())
    }

    /// Returns the platform default socket path.
    #[must_use]
    pub const fn default_socket() -> &'static str {
        DEFAULT_SOCKET
    }
}

/// Classifies socket endpoint types for connection handling.
enum SocketType {
    /// Unix socket or Windows named pipe with explicit scheme.
    Socket,
    /// HTTP, HTTPS, or TCP endpoint (TCP is rewritten to HTTP).
    Http,
    /// Bare path without scheme prefix.
    BarePath,
}

impl SocketType {
    fn is_socket_scheme(socket: &str) -> bool {
        socket.starts_with("unix://") || socket.starts_with("npipe://")
    }

    fn is_http_scheme(socket: &str) -> bool {
        socket.starts_with("tcp://")
            || socket.starts_with("http://")
            || socket.starts_with("https://")
    }

    fn classify(socket: &str) -> Self {
        match (Self::is_socket_scheme(socket), Self::is_http_scheme(socket)) {
            (true, _) => Self::Socket,
            (_, true) => Self::Http,
            _ => Self::BarePath,
        }
    }
}

/// Provides methods to connect to Docker or Podman container engines.
///
/// The connector supports Unix sockets, Windows named pipes, HTTP, and HTTPS
/// endpoints.
pub struct EngineConnector;

impl EngineConnector {
    /// Connect to the container engine at `socket` using `version`.
    ///
    /// Supports the following endpoint formats:
    /// - Unix sockets: `unix:///path/to/socket`
    /// - Windows named pipes: `npipe:////./pipe/name`
    /// - TCP: `tcp://host:port` (treated as HTTP connection)
    /// - HTTP: `http://host:port`
    /// - HTTPS: `https://host:port`
    /// - Bare paths: paths starting with `\\` or `//` are treated as named
    ///   pipes, all others as Unix sockets.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::ConnectionFailed` if the connection cannot be
    /// established.
    pub fn connect(socket: &str, version: &ClientVersion) -> Result<Docker, RegsyncError> {
        let docker = match SocketType::classify(socket) {
            SocketType::Socket => {
                Docker::connect_with_socket(socket, CONNECTION_TIMEOUT_SECS, version)
            }
            SocketType::Http => {
                // Rewrite tcp:// to http:// for Bollard compatibility
                let http_socket = if socket.starts_with("tcp://") {
                    socket.replacen("tcp://", "http://", 1)
                } else {
                    socket.to_owned()
                };
                Docker::connect_with_http(&http_socket, CONNECTION_TIMEOUT_SECS, version)
            }
            SocketType::BarePath => {
                let socket_uri = Self::normalize_bare_path(socket);
                Docker::connect_with_socket(&socket_uri, CONNECTION_TIMEOUT_SECS, version)
            }
        }
        .map_err(|e| {
            RegsyncError::from(ContainerError::ConnectionFailed {
                message: e.to_string(),
            })
        })?;

        Ok(docker)
    }

    fn normalize_bare_path(path: &str) -> String {
        if path.starts_with("\\\\") || path.starts_with("//") {
            format!("npipe://{path}")
        } else {
            format!("unix://{path}")
        }
    }

    /// Parse an API version such as `1.43` or `v1.43`.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::InvalidApiVersion` when the value is not two
    /// dot-separated integers.
    pub fn parse_api_version(version: &str) -> Result<ClientVersion, RegsyncError> {
        let invalid = || {
            RegsyncError::from(ContainerError::InvalidApiVersion {
                version: String::from(version),
            })
        };

        let trimmed = version.trim();
        let digits = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let (major, minor) = digits.split_once('.').ok_or_else(invalid)?;

        Ok(ClientVersion {
            major_version: major.parse().map_err(|_| invalid())?,
            minor_version: minor.parse().map_err(|_| invalid())?,
        })
    }

    /// Resolve the API version to negotiate.
    ///
    /// Resolution order:
    /// 1. `config_version` (from CLI, config file, or `REGSYNC_API_VERSION`)
    /// 2. `DOCKER_API_VERSION`
    /// 3. Bollard's default version
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::InvalidApiVersion` when the selected value
    /// cannot be parsed.
    pub fn resolve_api_version<E: mockable::Env>(
        config_version: Option<&str>,
        resolver: &SocketResolver<'_, E>,
    ) -> Result<ClientVersion, RegsyncError> {
        match config_version
            .filter(|v| !v.trim().is_empty())
            .map(String::from)
            .or_else(|| resolver.api_version_from_env())
        {
            Some(version) => Self::parse_api_version(&version),
            None => Ok(bollard::API_DEFAULT_VERSION.clone()),
        }
    }

    /// Connect using the resolved socket and API version.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::InvalidApiVersion` or
    /// `ContainerError::ConnectionFailed`.
    pub fn connect_with_fallback<E: mockable::Env>(
        config_socket: Option<&str>,
        config_version: Option<&str>,
        resolver: &SocketResolver<'_, E>,
    ) -> Result<Docker, RegsyncError> {
        let socket = Self::resolve_socket(config_socket, resolver);
        let version = Self::resolve_api_version(config_version, resolver)?;
        tracing::debug!(
            %socket,
            api_version = %format_args!("{}.{}", version.major_version, version.minor_version),
            "connecting to container engine"
        );
        Self::connect(&socket, &version)
    }

    /// Resolves the socket endpoint without establishing a connection.
    ///
    /// Resolution order:
    /// 1. `config_socket` (from CLI, config file, or `REGSYNC_ENGINE_SOCKET`)
    /// 2. `DOCKER_HOST`, `CONTAINER_HOST`, `PODMAN_HOST` (via resolver)
    /// 3. Platform default socket
    #[must_use]
    pub fn resolve_socket<E: mockable::Env>(
        config_socket: Option<&str>,
        resolver: &SocketResolver<'_, E>,
    ) -> String {
        config_socket
            .filter(|s| !s.is_empty())
            .map(String::from)
            .or_else(|| resolver.resolve_from_env())
            .unwrap_or_else(|| SocketResolver::<E>::default_socket().to_owned())
    }

    async fn ping_with_timeout(docker: &Docker) -> Result<(), RegsyncError> {
        let timeout = Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS);

        tokio::time::timeout(timeout, docker.ping())
            .await
            .map_err(|_| {
                RegsyncError::from(ContainerError::HealthCheckTimeout {
                    seconds: HEALTH_CHECK_TIMEOUT_SECS,
                })
            })?
            .map_err(|e| {
                RegsyncError::from(ContainerError::HealthCheckFailed {
                    message: e.to_string(),
                })
            })?;
        Ok(())
    }

    /// Connect using fallback resolution and verify the engine responds
    /// (async version).
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::InvalidApiVersion`,
    /// `ContainerError::ConnectionFailed`,
    /// `ContainerError::HealthCheckFailed`, or
    /// `ContainerError::HealthCheckTimeout`.
    pub async fn connect_with_fallback_and_verify_async<E: mockable::Env>(
        config_socket: Option<&str>,
        config_version: Option<&str>,
        resolver: &SocketResolver<'_, E>,
    ) -> Result<Docker, RegsyncError> {
        let docker = Self::connect_with_fallback(config_socket, config_version, resolver)?;
        Self::ping_with_timeout(&docker).await?;
        Ok(docker)
    }
}
