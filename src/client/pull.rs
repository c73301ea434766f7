//! Pulling images with retry and backoff.

use bollard::query_parameters::{CreateImageOptions, CreateImageOptionsBuilder};

use super::{SyncClient, drain_progress};
use crate::auth::CredentialProvider;
use crate::engine::ImageClient;
use crate::error::{RegistryError, RegsyncError};
use crate::reference::ImageReference;

impl<E: ImageClient, P: CredentialProvider> SyncClient<E, P> {
    /// Pull `reference` into the local engine (async version).
    ///
    /// One attempt opens the pull and drains its progress stream. A failed
    /// attempt sleeps for the client's current backoff delay, doubles it, and
    /// tries again until the policy's attempts are used up. The sleep also
    /// follows the final failure.
    ///
    /// # Errors
    ///
    /// Returns `ReferenceError` for an unparseable reference,
    /// `RegistryError::InvalidCredential` when the stored credential cannot be
    /// decoded, and `RegistryError::PullFailed` carrying the last attempt's
    /// error once every attempt has failed.
    pub async fn pull_async(&self, reference: &str) -> Result<(), RegsyncError> {
        let image = ImageReference::parse(reference)?;
        let host = image.registry();
        let credentials = self.credentials.credential_for(host).for_pull(host)?;
        let options = build_pull_options(&image);
        let attempts = self.policy.attempts();

        let mut attempt = 1_u32;
        loop {
            let stream = self.engine.pull_image(options.clone(), credentials.clone());
            let error = match drain_progress(stream).await {
                Ok(events) => {
                    tracing::info!(reference, attempt, events, "pulled image");
                    return Ok(());
                }
                Err(failure) => failure,
            };

            let delay = self.backoff.escalate();
            tracing::warn!(
                reference,
                attempt,
                attempts,
                ?delay,
                %error,
                "pull attempt failed"
            );
            tokio::time::sleep(delay).await;

            if attempt >= attempts {
                return Err(RegistryError::PullFailed {
                    reference: String::from(reference),
                    attempts,
                    message: error.to_string(),
                }
                .into());
            }
            attempt = attempt.saturating_add(1);
        }
    }

    /// Pull `reference` into the local engine.
    ///
    /// This synchronous helper blocks on [`Self::pull_async`] using an
    /// existing Tokio runtime handle supplied by the caller. The handle must
    /// belong to a multi-threaded runtime: a failed pull sleeps before
    /// retrying, and a current-thread runtime's timer is never driven from
    /// `Handle::block_on`, so the call would hang.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::pull_async`].
    pub fn pull(
        &self,
        runtime: &tokio::runtime::Handle,
        reference: &str,
    ) -> Result<(), RegsyncError> {
        runtime.block_on(self.pull_async(reference))
    }
}

fn build_pull_options(image: &ImageReference) -> CreateImageOptions {
    CreateImageOptionsBuilder::new()
        .from_image(&image.name())
        .tag(image.pull_selector())
        .build()
}
