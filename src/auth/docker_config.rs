//! Credentials read from the Docker CLI's `config.json`.

use std::collections::HashMap;
use std::io;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use serde::Deserialize;

use super::{Credential, CredentialProvider, RegistryAuth};
use crate::error::{ConfigError, FilesystemError, RegsyncError};
use crate::reference::DEFAULT_REGISTRY;

const CONFIG_FILE_NAME: &str = "config.json";

/// Keys under which the Docker CLI stores Docker Hub credentials.
const DOCKER_HUB_ALIASES: &[&str] = &["index.docker.io", "registry-1.docker.io"];

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    auths: HashMap<String, AuthEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct AuthEntry {
    #[serde(default)]
    auth: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    identitytoken: Option<String>,
}

impl AuthEntry {
    /// Whether the entry stores anything to authenticate with.
    ///
    /// Entries written alongside `credsStore` or `credHelpers` are empty
    /// objects.
    fn has_secret(&self) -> bool {
        let filled = |value: Option<&str>| value.is_some_and(|text| !text.is_empty());
        filled(self.auth.as_deref())
            || (filled(self.username.as_deref()) && filled(self.password.as_deref()))
            || filled(self.identitytoken.as_deref())
    }
}

/// Credential provider backed by the `auths` section of a Docker
/// `config.json`.
///
/// Keys are normalised to bare hosts when loaded, so `https://ghcr.io` and
/// `ghcr.io` resolve identically and the Docker Hub index URL answers for
/// `docker.io`.
#[derive(Debug, Clone, Default)]
pub struct DockerConfigCredentials {
    auths: HashMap<String, AuthEntry>,
}

impl DockerConfigCredentials {
    /// Create a provider with no stored credentials.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse the contents of a Docker `config.json`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ParseError` when the content is not valid JSON
    /// in the expected shape.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile =
            serde_json::from_str(content).map_err(|error| ConfigError::ParseError {
                message: format!("failed to parse Docker credentials: {error}"),
            })?;

        let mut entries: Vec<(String, String, AuthEntry)> = file
            .auths
            .into_iter()
            .map(|(key, entry)| (normalise_host(&key), key, entry))
            .collect();

        // Per host: entries with a secret first, then exact keys over aliased
        // ones, then the lexically smallest key.
        entries.sort_by(|(host_a, key_a, entry_a), (host_b, key_b, entry_b)| {
            host_a
                .cmp(host_b)
                .then_with(|| (!entry_a.has_secret()).cmp(&!entry_b.has_secret()))
                .then_with(|| (key_a != host_a).cmp(&(key_b != host_b)))
                .then_with(|| key_a.cmp(key_b))
        });

        let mut auths = HashMap::new();
        for (host, _, entry) in entries {
            auths.entry(host).or_insert(entry);
        }

        Ok(Self { auths })
    }

    /// Load credentials from `path`.
    ///
    /// A missing file is not an error: the provider is simply empty.
    ///
    /// # Errors
    ///
    /// Returns `FilesystemError` when the file exists but cannot be read, or
    /// `ConfigError::ParseError` when it cannot be parsed.
    pub fn load(path: &Utf8Path) -> Result<Self, RegsyncError> {
        let parent = path
            .parent()
            .filter(|dir| !dir.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let file_name = path.file_name().unwrap_or(CONFIG_FILE_NAME);

        let dir = match Dir::open_ambient_dir(parent, ambient_authority()) {
            Ok(dir) => dir,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Self::empty()),
            Err(error) => return Err(map_io_error(path, &error)),
        };

        match dir.read_to_string(file_name) {
            Ok(content) => Ok(Self::from_json(&content)?),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(Self::empty()),
            Err(error) => Err(map_io_error(path, &error)),
        }
    }

    /// Resolve the conventional location of the Docker CLI configuration.
    ///
    /// Uses `$DOCKER_CONFIG/config.json` when set, otherwise
    /// `$HOME/.docker/config.json`.
    #[must_use]
    pub fn default_path<E: mockable::Env>(env: &E) -> Option<Utf8PathBuf> {
        env.string("DOCKER_CONFIG")
            .filter(|value| !value.is_empty())
            .map(|dir| Utf8PathBuf::from(dir).join(CONFIG_FILE_NAME))
            .or_else(|| {
                env.string("HOME")
                    .filter(|value| !value.is_empty())
                    .map(|home| {
                        Utf8PathBuf::from(home)
                            .join(".docker")
                            .join(CONFIG_FILE_NAME)
                    })
            })
    }

    /// Return the registry hosts with stored credentials.
    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.auths.keys().map(String::as_str)
    }
}

impl CredentialProvider for DockerConfigCredentials {
    fn credential_for(&self, host: &str) -> Credential {
        let key = normalise_host(host);
        let Some(entry) = self.auths.get(&key).filter(|entry| entry.has_secret()) else {
            return Credential::Absent;
        };

        let Some(auth) = registry_auth(&key, entry) else {
            tracing::warn!(host = %key, "ignoring undecodable credential entry");
            return Credential::Absent;
        };

        match auth.encode() {
            Ok(token) => Credential::from_token(token),
            Err(error) => {
                tracing::warn!(host = %key, %error, "failed to encode registry credential");
                Credential::Absent
            }
        }
    }
}

/// Build the auth payload for one entry, preferring the combined `auth`
/// field over separate username and password fields.
fn registry_auth(host: &str, entry: &AuthEntry) -> Option<RegistryAuth> {
    let (username, password) = match entry.auth.as_deref().filter(|value| !value.is_empty()) {
        Some(encoded) => {
            let decoded = STANDARD.decode(encoded.trim()).ok()?;
            let pair = String::from_utf8(decoded).ok()?;
            let (user, pass) = pair.split_once(':')?;
            (Some(String::from(user)), Some(String::from(pass)))
        }
        None => (entry.username.clone(), entry.password.clone()),
    };

    Some(RegistryAuth {
        username,
        password,
        email: entry.email.clone(),
        serveraddress: Some(String::from(host)),
        identitytoken: entry.identitytoken.clone(),
        registrytoken: None,
    })
}

/// Reduce a config key such as `https://index.docker.io/v1/` to a host.
fn normalise_host(key: &str) -> String {
    let without_scheme = key
        .strip_prefix("https://")
        .or_else(|| key.strip_prefix("http://"))
        .unwrap_or(key);
    let host = without_scheme
        .split_once('/')
        .map_or(without_scheme, |(host, _)| host);

    if DOCKER_HUB_ALIASES.contains(&host) {
        String::from(DEFAULT_REGISTRY)
    } else {
        host.to_ascii_lowercase()
    }
}

fn map_io_error(path: &Utf8Path, error: &io::Error) -> RegsyncError {
    let path_buf = path.as_std_path().to_path_buf();
    match error.kind() {
        io::ErrorKind::PermissionDenied => {
            RegsyncError::from(FilesystemError::PermissionDenied { path: path_buf })
        }
        _ => RegsyncError::from(FilesystemError::IoError {
            path: path_buf,
            message: error.to_string(),
        }),
    }
}
