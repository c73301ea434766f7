//! Listing local images of one repository.

use std::collections::HashMap;

use bollard::models::ImageSummary;
use bollard::query_parameters::ListImagesOptions;

use super::SyncClient;
use crate::auth::CredentialProvider;
use crate::engine::ImageClient;
use crate::error::{ReferenceError, RegistryError, RegsyncError};

/// Filter key matching images by repository reference.
const REFERENCE_FILTER: &str = "reference";

/// Build the list filter `reference=<repository>`.
///
/// # Errors
///
/// Returns `ReferenceError::InvalidFilter` when `repository` is blank or
/// contains whitespace.
pub fn reference_filter(repository: &str) -> Result<HashMap<String, Vec<String>>, ReferenceError> {
    parse_filter_flag(&format!("{REFERENCE_FILTER}={repository}"))
}

/// Parse one `key=value` filter flag into the engine's filter map.
fn parse_filter_flag(flag: &str) -> Result<HashMap<String, Vec<String>>, ReferenceError> {
    let invalid = |reason: &str| ReferenceError::InvalidFilter {
        filter: String::from(flag),
        reason: String::from(reason),
    };

    let (key, value) = flag
        .split_once('=')
        .ok_or_else(|| invalid("expected key=value"))?;
    let filter_key = key.trim().to_ascii_lowercase();
    let filter_value = value.trim();

    if filter_key.is_empty() {
        return Err(invalid("filter key is empty"));
    }
    if filter_value.is_empty() {
        return Err(invalid("filter value is empty"));
    }
    if filter_value.chars().any(char::is_whitespace) {
        return Err(invalid("filter value contains whitespace"));
    }

    Ok(HashMap::from([(filter_key, vec![String::from(filter_value)])]))
}

impl<E: ImageClient, P: CredentialProvider> SyncClient<E, P> {
    /// List local images whose reference matches `repository` (async
    /// version).
    ///
    /// # Errors
    ///
    /// Returns `ReferenceError::InvalidFilter` when the filter cannot be
    /// built and `RegistryError::ListFailed` when the engine query fails.
    pub async fn list_images_for_repo_async(
        &self,
        repository: &str,
    ) -> Result<Vec<ImageSummary>, RegsyncError> {
        let options = ListImagesOptions {
            filters: Some(reference_filter(repository)?),
            ..ListImagesOptions::default()
        };

        self.engine.list_images(options).await.map_err(|error| {
            RegsyncError::from(RegistryError::ListFailed {
                repository: String::from(repository),
                message: error.to_string(),
            })
        })
    }

    /// List local images whose reference matches `repository`.
    ///
    /// This synchronous helper blocks on [`Self::list_images_for_repo_async`]
    /// using an existing Tokio runtime handle supplied by the caller.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::list_images_for_repo_async`].
    pub fn list_images_for_repo(
        &self,
        runtime: &tokio::runtime::Handle,
        repository: &str,
    ) -> Result<Vec<ImageSummary>, RegsyncError> {
        runtime.block_on(self.list_images_for_repo_async(repository))
    }
}
