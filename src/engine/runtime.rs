//! Trait seams over the engine's image and container endpoints.
//!
//! Synchronisation logic talks to these traits rather than to
//! `bollard::Docker` directly, so every operation can be exercised against a
//! recording stub without a running daemon.

use std::future::Future;
use std::pin::Pin;

use bollard::Docker;
use bollard::auth::DockerCredentials;
use bollard::errors::Error as BollardError;
use bollard::models::{ContainerCreateBody, ContainerCreateResponse, ImageSummary};
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptions, ListImagesOptions, PushImageOptions,
    RemoveContainerOptions, StartContainerOptions, TagImageOptions,
};
use futures_util::TryStreamExt;
use futures_util::stream::BoxStream;

/// Boxed future returned by engine trait methods.
pub type EngineFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BollardError>> + Send + 'a>>;

/// Progress stream returned by pull and push requests.
///
/// The request is only sent once the stream is polled, so connection
/// failures surface as the stream's first item.
pub type ProgressStream<'a> = BoxStream<'a, Result<TransferProgress, BollardError>>;

/// One progress event from a pull or push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferProgress {
    /// Layer or image identifier the event refers to.
    pub id: Option<String>,
    /// Human-readable status line.
    pub status: Option<String>,
}

/// Image operations the synchronisation client needs from the engine.
pub trait ImageClient {
    /// List local images matching `options`.
    fn list_images(&self, options: ListImagesOptions) -> EngineFuture<'_, Vec<ImageSummary>>;

    /// Pull an image, yielding progress events.
    fn pull_image(
        &self,
        options: CreateImageOptions,
        credentials: Option<DockerCredentials>,
    ) -> ProgressStream<'_>;

    /// Push `image`, yielding progress events.
    fn push_image(
        &self,
        image: &str,
        options: PushImageOptions,
        credentials: Option<DockerCredentials>,
    ) -> ProgressStream<'_>;

    /// Add a repository and tag to a local image.
    fn tag_image(&self, image: &str, options: TagImageOptions) -> EngineFuture<'_, ()>;
}

/// Container operations used to run and clean up containers.
pub trait ContainerClient {
    /// Create a container from `Bollard` options and body payload.
    fn create_container(
        &self,
        options: Option<CreateContainerOptions>,
        config: ContainerCreateBody,
    ) -> EngineFuture<'_, ContainerCreateResponse>;

    /// Start a created container.
    fn start_container(&self, container_id: &str) -> EngineFuture<'_, ()>;

    /// Remove a container.
    fn remove_container(
        &self,
        container_id: &str,
        options: RemoveContainerOptions,
    ) -> EngineFuture<'_, ()>;
}

impl ImageClient for Docker {
    fn list_images(&self, options: ListImagesOptions) -> EngineFuture<'_, Vec<ImageSummary>> {
        Box::pin(async move { Self::list_images(self, Some(options)).await })
    }

    fn pull_image(
        &self,
        options: CreateImageOptions,
        credentials: Option<DockerCredentials>,
    ) -> ProgressStream<'_> {
        Box::pin(
            Self::create_image(self, Some(options), None, credentials).map_ok(|info| {
                TransferProgress {
                    id: info.id,
                    status: info.status,
                }
            }),
        )
    }

    fn push_image(
        &self,
        image: &str,
        options: PushImageOptions,
        credentials: Option<DockerCredentials>,
    ) -> ProgressStream<'_> {
        Box::pin(
            Self::push_image(self, image, Some(options), credentials).map_ok(|info| {
                TransferProgress {
                    id: None,
                    status: info.status,
                }
            }),
        )
    }

    fn tag_image(&self, image: &str, options: TagImageOptions) -> EngineFuture<'_, ()> {
        let image_owned = String::from(image);
        Box::pin(async move { Self::tag_image(self, &image_owned, Some(options)).await })
    }
}

impl ContainerClient for Docker {
    fn create_container(
        &self,
        options: Option<CreateContainerOptions>,
        config: ContainerCreateBody,
    ) -> EngineFuture<'_, ContainerCreateResponse> {
        Box::pin(async move { Self::create_container(self, options, config).await })
    }

    fn start_container(&self, container_id: &str) -> EngineFuture<'_, ()> {
        let container_id_owned = String::from(container_id);
        Box::pin(async move {
            Self::start_container(self, &container_id_owned, None::<StartContainerOptions>).await
        })
    }

    fn remove_container(
        &self,
        container_id: &str,
        options: RemoveContainerOptions,
    ) -> EngineFuture<'_, ()> {
        let container_id_owned = String::from(container_id);
        Box::pin(async move {
            Self::remove_container(self, &container_id_owned, Some(options)).await
        })
    }
}
