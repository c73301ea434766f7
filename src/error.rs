//! Semantic error types for the regsync library.
//!
//! This module defines the error hierarchy for regsync, following the principle
//! of using semantic error enums (via `thiserror`) for conditions the caller
//! might inspect, retry, or report, while reserving opaque errors
//! (`eyre::Report`) for the application boundary.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found at the expected path.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// The path where the configuration file was expected.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("failed to parse configuration file: {message}")]
    ParseError {
        /// A description of the parse error.
        message: String,
    },

    /// A required configuration value is missing.
    #[error("missing required configuration: {field}")]
    MissingRequired {
        /// The name of the missing field.
        field: String,
    },

    /// A configuration value failed validation.
    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue {
        /// The name of the invalid field.
        field: String,
        /// The reason the value is invalid.
        reason: String,
    },

    /// The `OrthoConfig` library returned an error during configuration loading.
    #[error("configuration loading failed: {0}")]
    OrthoConfig(Arc<ortho_config::OrthoError>),
}

/// Errors raised while parsing caller-supplied references and specifications.
///
/// None of these are retried: they describe malformed input rather than a
/// transient condition.
#[derive(Debug, Error)]
pub enum ReferenceError {
    /// The image reference was empty or whitespace-only.
    #[error("image reference is empty")]
    Empty,

    /// The image reference could not be parsed.
    #[error("invalid image reference '{reference}': {reason}")]
    InvalidReference {
        /// The rejected reference.
        reference: String,
        /// Why the reference was rejected.
        reason: String,
    },

    /// A port publication specification could not be parsed.
    #[error("invalid port specification '{spec}': {reason}")]
    InvalidPortSpec {
        /// The rejected specification.
        spec: String,
        /// Why the specification was rejected.
        reason: String,
    },

    /// An image list filter could not be parsed.
    #[error("invalid filter '{filter}': {reason}")]
    InvalidFilter {
        /// The rejected filter flag.
        filter: String,
        /// Why the filter was rejected.
        reason: String,
    },
}

/// Errors that can occur while transferring images to or from registries.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Every pull attempt failed. Only the last attempt's error is kept.
    #[error("failed to pull '{reference}' after {attempts} attempt(s): {message}")]
    PullFailed {
        /// The image reference being pulled.
        reference: String,
        /// How many attempts were made.
        attempts: u32,
        /// The error reported by the final attempt.
        message: String,
    },

    /// The push request or its progress stream failed.
    #[error("failed to push '{reference}': {message}")]
    PushFailed {
        /// The image reference being pushed.
        reference: String,
        /// A description of the push failure.
        message: String,
    },

    /// The engine refused to tag an image.
    #[error("failed to tag '{source_ref}' as '{target}': {message}")]
    TagFailed {
        /// The image being tagged.
        source_ref: String,
        /// The requested new reference.
        target: String,
        /// A description of the tag failure.
        message: String,
    },

    /// Listing local images failed.
    #[error("failed to list images for '{repository}': {message}")]
    ListFailed {
        /// The repository used as the reference filter.
        repository: String,
        /// A description of the listing failure.
        message: String,
    },

    /// A credential token for a registry could not be decoded.
    #[error("invalid credential for registry '{host}': {message}")]
    InvalidCredential {
        /// The registry host the credential belongs to.
        host: String,
        /// A description of the decoding failure.
        message: String,
    },
}

/// Errors that can occur during container engine operations.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Failed to connect to the container engine socket.
    #[error("failed to connect to container engine: {message}")]
    ConnectionFailed {
        /// A description of the connection failure.
        message: String,
    },

    /// The requested engine API version could not be parsed.
    #[error("invalid engine API version '{version}': expected <major>.<minor>")]
    InvalidApiVersion {
        /// The rejected version string.
        version: String,
    },

    /// Failed to create a container.
    #[error("failed to create container: {message}")]
    CreateFailed {
        /// A description of the creation failure.
        message: String,
    },

    /// Failed to start a container.
    #[error("failed to start container '{container_id}': {message}")]
    StartFailed {
        /// The ID of the container that failed to start.
        container_id: String,
        /// A description of the start failure.
        message: String,
    },

    /// Failed to remove a container.
    #[error("failed to remove container '{container_id}': {message}")]
    RemoveFailed {
        /// The ID of the container that could not be removed.
        container_id: String,
        /// A description of the removal failure.
        message: String,
    },

    /// Health check failed - engine did not respond correctly.
    #[error("container engine health check failed: {message}")]
    HealthCheckFailed {
        /// A description of the health check failure.
        message: String,
    },

    /// Health check timed out.
    #[error("container engine health check timed out after {seconds} seconds")]
    HealthCheckTimeout {
        /// The timeout duration in seconds.
        seconds: u64,
    },

    /// A Tokio runtime could not be created for a blocking call.
    #[error("failed to create async runtime: {message}")]
    RuntimeCreationFailed {
        /// A description of the runtime failure.
        message: String,
    },
}

/// Errors that can occur during filesystem operations.
#[derive(Debug, Error)]
pub enum FilesystemError {
    /// Permission denied when accessing a path.
    #[error("permission denied: {path}")]
    PermissionDenied {
        /// The path that could not be accessed.
        path: PathBuf,
    },

    /// An I/O error occurred.
    #[error("I/O error at '{path}': {message}")]
    IoError {
        /// The path where the error occurred.
        path: PathBuf,
        /// A description of the I/O error.
        message: String,
    },
}

/// Top-level error type for regsync.
///
/// This enum aggregates all domain-specific errors into a single type. At the
/// application boundary (main.rs), these errors are converted to
/// `eyre::Report` for human-readable error reporting.
#[derive(Debug, Error)]
pub enum RegsyncError {
    /// An error occurred during configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A reference or specification was malformed.
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    /// An image transfer failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// An error occurred during container operations.
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// An error occurred during filesystem operations.
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// A specialised `Result` type for regsync operations.
pub type Result<T> = std::result::Result<T, RegsyncError>;
