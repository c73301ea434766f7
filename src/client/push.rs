//! Pushing, tagging, and moving images between registries.

use bollard::query_parameters::{PushImageOptionsBuilder, TagImageOptionsBuilder};

use super::{SyncClient, drain_progress};
use crate::auth::CredentialProvider;
use crate::engine::ImageClient;
use crate::error::{RegistryError, RegsyncError};
use crate::reference::ImageReference;

impl<E: ImageClient, P: CredentialProvider> SyncClient<E, P> {
    /// Push a local image to its registry (async version).
    ///
    /// Pushes are attempted once. When no credential is known for the
    /// destination host an empty placeholder is sent instead.
    ///
    /// # Errors
    ///
    /// Returns `ReferenceError` for an unparseable reference,
    /// `RegistryError::InvalidCredential` for an undecodable credential, and
    /// `RegistryError::PushFailed` when the engine reports a failure.
    pub async fn push_async(&self, reference: &str) -> Result<(), RegsyncError> {
        let image = ImageReference::parse(reference)?;
        let host = image.registry();
        let credentials = self.credentials.credential_for(host).for_push(host)?;
        let options = PushImageOptionsBuilder::new()
            .tag(image.tag_or_default())
            .build();

        let stream = self.engine.push_image(&image.name(), options, credentials);
        let events = drain_progress(stream).await.map_err(|error| {
            RegsyncError::from(RegistryError::PushFailed {
                reference: String::from(reference),
                message: error.to_string(),
            })
        })?;

        tracing::info!(reference, events, "pushed image");
        Ok(())
    }

    /// Push a local image to its registry.
    ///
    /// This synchronous helper blocks on [`Self::push_async`] using an
    /// existing Tokio runtime handle supplied by the caller.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::push_async`].
    pub fn push(
        &self,
        runtime: &tokio::runtime::Handle,
        reference: &str,
    ) -> Result<(), RegsyncError> {
        runtime.block_on(self.push_async(reference))
    }

    /// Give the local image `source` the additional reference `target`
    /// (async version).
    ///
    /// `source` is passed to the engine untouched, so an image ID works as
    /// well as a name. `target` must be a valid reference; a missing tag
    /// becomes `latest`.
    ///
    /// # Errors
    ///
    /// Returns `ReferenceError` for an unparseable target and
    /// `RegistryError::TagFailed` when the engine refuses the tag.
    pub async fn tag_async(&self, source: &str, target: &str) -> Result<(), RegsyncError> {
        let destination = ImageReference::parse(target)?;
        let options = TagImageOptionsBuilder::new()
            .repo(&destination.name())
            .tag(destination.tag_or_default())
            .build();

        self.engine
            .tag_image(source, options)
            .await
            .map_err(|error| {
                RegsyncError::from(RegistryError::TagFailed {
                    source_ref: String::from(source),
                    target: String::from(target),
                    message: error.to_string(),
                })
            })?;

        tracing::debug!(source, target, "tagged image");
        Ok(())
    }

    /// Give the local image `source` the additional reference `target`.
    ///
    /// This synchronous helper blocks on [`Self::tag_async`] using an
    /// existing Tokio runtime handle supplied by the caller.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::tag_async`].
    pub fn tag(
        &self,
        runtime: &tokio::runtime::Handle,
        source: &str,
        target: &str,
    ) -> Result<(), RegsyncError> {
        runtime.block_on(self.tag_async(source, target))
    }

    /// Copy an image from one registry to another through the local engine
    /// (async version).
    ///
    /// Pulls `source` with retry, tags it as `destination`, and pushes the
    /// new reference. The first failing step ends the sequence.
    ///
    /// # Errors
    ///
    /// Returns the error of whichever step failed.
    pub async fn re_push_async(&self, source: &str, destination: &str) -> Result<(), RegsyncError> {
        self.pull_async(source).await?;
        self.tag_async(source, destination).await?;
        self.push_async(destination).await
    }

    /// Copy an image from one registry to another through the local engine.
    ///
    /// This synchronous helper blocks on [`Self::re_push_async`] using an
    /// existing Tokio runtime handle supplied by the caller. The handle must
    /// belong to a multi-threaded runtime: a failed pull sleeps before
    /// retrying, and a current-thread runtime's timer is never driven from
    /// `Handle::block_on`, so the call would hang.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::re_push_async`].
    pub fn re_push(
        &self,
        runtime: &tokio::runtime::Handle,
        source: &str,
        destination: &str,
    ) -> Result<(), RegsyncError> {
        runtime.block_on(self.re_push_async(source, destination))
    }
}
