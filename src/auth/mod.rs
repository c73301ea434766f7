//! Registry credential lookup and encoding.
//!
//! Credentials are opaque tokens in Docker's `X-Registry-Auth` form: base64
//! of a small JSON object naming a user, password, or identity token. A
//! [`CredentialProvider`] maps a registry host to such a token, and this
//! module turns the token into the `Bollard` credential payload each transfer
//! needs.

use std::collections::HashMap;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use bollard::auth::DockerCredentials;
use serde::{Deserialize, Serialize};

mod docker_config;

pub use docker_config::DockerConfigCredentials;

use crate::error::RegistryError;

/// Authentication material for one registry, or the lack of it.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// An encoded registry token.
    Present(String),
    /// No credential is known for the registry.
    Absent,
}

impl Credential {
    /// Wrap a raw token, treating an empty string as [`Credential::Absent`].
    #[must_use]
    pub fn from_token(token: impl Into<String>) -> Self {
        let value = token.into();
        if value.is_empty() {
            Self::Absent
        } else {
            Self::Present(value)
        }
    }

    /// Return whether a token is present.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// Credentials to send with a pull.
    ///
    /// An absent credential sends no authentication at all; some registries
    /// reject an explicitly empty auth header on pulls.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::InvalidCredential` if the token cannot be
    /// decoded.
    pub fn for_pull(&self, host: &str) -> Result<Option<DockerCredentials>, RegistryError> {
        match self {
            Self::Present(token) => decode_token(host, token).map(Some),
            Self::Absent => Ok(None),
        }
    }

    /// Credentials to send with a push.
    ///
    /// An absent credential sends [`placeholder_credentials`], which the engine
    /// encodes as base64 of `{}`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::InvalidCredential` if the token cannot be
    /// decoded.
    pub fn for_push(&self, host: &str) -> Result<Option<DockerCredentials>, RegistryError> {
        match self {
            Self::Present(token) => decode_token(host, token).map(Some),
            Self::Absent => Ok(Some(placeholder_credentials())),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present(_) => f.write_str("Present(<redacted>)"),
            Self::Absent => f.write_str("Absent"),
        }
    }
}

/// Source of registry credentials keyed by registry host.
pub trait CredentialProvider {
    /// Return the credential for `host`, or [`Credential::Absent`].
    fn credential_for(&self, host: &str) -> Credential;
}

/// Provider that never has a credential.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredentials;

impl CredentialProvider for NoCredentials {
    fn credential_for(&self, _host: &str) -> Credential {
        Credential::Absent
    }
}

impl CredentialProvider for HashMap<String, String> {
    fn credential_for(&self, host: &str) -> Credential {
        self.get(host)
            .map_or(Credential::Absent, |token| Credential::from_token(token.as_str()))
    }
}

impl<P: CredentialProvider + ?Sized> CredentialProvider for &P {
    fn credential_for(&self, host: &str) -> Credential {
        (**self).credential_for(host)
    }
}

/// The payload pushed when no credential is known.
#[must_use]
pub fn placeholder_credentials() -> DockerCredentials {
    DockerCredentials::default()
}

/// JSON shape of a Docker `X-Registry-Auth` token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RegistryAuth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) serveraddress: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) identitytoken: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) registrytoken: Option<String>,
}

impl RegistryAuth {
    /// Encode as a URL-safe base64 token, the form the Docker CLI produces.
    pub(crate) fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_vec(self).map(|bytes| URL_SAFE.encode(bytes))
    }
}

impl From<RegistryAuth> for DockerCredentials {
    fn from(auth: RegistryAuth) -> Self {
        Self {
            username: auth.username,
            password: auth.password,
            email: auth.email,
            serveraddress: auth.serveraddress,
            identitytoken: auth.identitytoken,
            registrytoken: auth.registrytoken,
            ..Self::default()
        }
    }
}

/// Decode an `X-Registry-Auth` token into `Bollard` credentials.
///
/// Both URL-safe and standard alphabets are accepted, padded or not.
///
/// # Errors
///
/// Returns `RegistryError::InvalidCredential` when the token is not base64
/// or does not contain the expected JSON object.
pub fn decode_token(host: &str, token: &str) -> Result<DockerCredentials, RegistryError> {
    let bytes = [URL_SAFE, STANDARD, URL_SAFE_NO_PAD, STANDARD_NO_PAD]
        .iter()
        .find_map(|engine| engine.decode(token.trim()).ok())
        .ok_or_else(|| RegistryError::InvalidCredential {
            host: String::from(host),
            message: String::from("token is not valid base64"),
        })?;

    let auth: RegistryAuth =
        serde_json::from_slice(&bytes).map_err(|error| RegistryError::InvalidCredential {
            host: String::from(host),
            message: format!("token does not hold registry auth JSON: {error}"),
        })?;

    Ok(auth.into())
}
