//! Recording engine and credential stubs for client tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use bollard::auth::DockerCredentials;
use bollard::errors::Error as BollardError;
use bollard::models::{ContainerCreateBody, ContainerCreateResponse, ImageSummary};
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptions, ListImagesOptions, PushImageOptions,
    RemoveContainerOptions, TagImageOptions,
};
use futures_util::stream;

use crate::auth::{Credential, CredentialProvider, RegistryAuth};
use crate::client::{RetryPolicy, SyncClient};
use crate::engine::{
    ContainerClient, EngineFuture, ImageClient, ProgressStream, TransferProgress,
};

pub(super) const SOURCE: &str = "registry-a.example.com/team/app:1.0";
pub(super) const DESTINATION: &str = "registry-b.example.com/mirror/app:1.0";

pub(super) fn server_error(message: &str) -> BollardError {
    BollardError::DockerResponseServerError {
        status_code: 500,
        message: String::from(message),
    }
}

/// Every request the engine stub received, in arrival order per kind.
#[derive(Debug, Default)]
pub(super) struct Calls {
    pub(super) pulls: Vec<(CreateImageOptions, Option<DockerCredentials>)>,
    pub(super) pushes: Vec<(String, PushImageOptions, Option<DockerCredentials>)>,
    pub(super) tags: Vec<(String, TagImageOptions)>,
    pub(super) lists: Vec<ListImagesOptions>,
    pub(super) creates: Vec<(Option<CreateContainerOptions>, ContainerCreateBody)>,
    pub(super) starts: Vec<String>,
    pub(super) removes: Vec<(String, RemoveContainerOptions)>,
}

/// Engine stub that records requests and fails on demand.
///
/// Pulls fail mid-stream for as many attempts as were scripted, then
/// succeed. Every other operation succeeds unless its failure flag is set.
#[derive(Debug, Default)]
pub(super) struct RecordingEngine {
    calls: Mutex<Calls>,
    pull_failures: Mutex<VecDeque<String>>,
    fail_push: bool,
    fail_tag: bool,
    fail_start: bool,
    images: Vec<ImageSummary>,
}

impl RecordingEngine {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub(super) fn failing_pulls(self, count: usize) -> Self {
        let failures = (1..=count).map(|n| format!("pull failure {n}")).collect();
        Self {
            pull_failures: Mutex::new(failures),
            ..self
        }
    }

    pub(super) fn always_failing_pulls(self) -> Self {
        self.failing_pulls(64)
    }

    pub(super) fn failing_push(self) -> Self {
        Self {
            fail_push: true,
            ..self
        }
    }

    pub(super) fn failing_tag(self) -> Self {
        Self {
            fail_tag: true,
            ..self
        }
    }

    pub(super) fn failing_start(self) -> Self {
        Self {
            fail_start: true,
            ..self
        }
    }

    pub(super) fn with_images(self, images: Vec<ImageSummary>) -> Self {
        Self { images, ..self }
    }

    pub(super) fn calls<R>(&self, read: impl FnOnce(&Calls) -> R) -> R {
        read(&self.calls.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn record(&self, write: impl FnOnce(&mut Calls)) {
        write(&mut self.calls.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

fn progress(status: &str) -> Result<TransferProgress, BollardError> {
    Ok(TransferProgress {
        id: Some(String::from("layer")),
        status: Some(String::from(status)),
    })
}

impl ImageClient for RecordingEngine {
    fn list_images(&self, options: ListImagesOptions) -> EngineFuture<'_, Vec<ImageSummary>> {
        self.record(|calls| calls.lists.push(options));
        let images = self.images.clone();
        Box::pin(async move { Ok(images) })
    }

    fn pull_image(
        &self,
        options: CreateImageOptions,
        credentials: Option<DockerCredentials>,
    ) -> ProgressStream<'_> {
        self.record(|calls| calls.pulls.push((options, credentials)));
        let failure = self
            .pull_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        let events = match failure {
            Some(message) => vec![progress("Pulling fs layer"), Err(server_error(&message))],
            None => vec![progress("Pulling fs layer"), progress("Pull complete")],
        };
        Box::pin(stream::iter(events))
    }

    fn push_image(
        &self,
        image: &str,
        options: PushImageOptions,
        credentials: Option<DockerCredentials>,
    ) -> ProgressStream<'_> {
        self.record(|calls| calls.pushes.push((String::from(image), options, credentials)));
        let events = if self.fail_push {
            vec![progress("Preparing"), Err(server_error("denied: push refused"))]
        } else {
            vec![progress("Preparing"), progress("Pushed")]
        };
        Box::pin(stream::iter(events))
    }

    fn tag_image(&self, image: &str, options: TagImageOptions) -> EngineFuture<'_, ()> {
        self.record(|calls| calls.tags.push((String::from(image), options)));
        let fail = self.fail_tag;
        Box::pin(async move {
            if fail {
                Err(server_error("no such image"))
            } else {
                Ok(())
            }
        })
    }
}

impl ContainerClient for RecordingEngine {
    fn create_container(
        &self,
        options: Option<CreateContainerOptions>,
        config: ContainerCreateBody,
    ) -> EngineFuture<'_, ContainerCreateResponse> {
        self.record(|calls| calls.creates.push((options, config)));
        Box::pin(async move {
            Ok(ContainerCreateResponse {
                id: String::from("container-1"),
                warnings: vec![],
            })
        })
    }

    fn start_container(&self, container_id: &str) -> EngineFuture<'_, ()> {
        self.record(|calls| calls.starts.push(String::from(container_id)));
        let fail = self.fail_start;
        Box::pin(async move {
            if fail {
                Err(server_error("port is already allocated"))
            } else {
                Ok(())
            }
        })
    }

    fn remove_container(
        &self,
        container_id: &str,
        options: RemoveContainerOptions,
    ) -> EngineFuture<'_, ()> {
        self.record(|calls| calls.removes.push((String::from(container_id), options)));
        Box::pin(async move { Ok(()) })
    }
}

/// Credential provider that remembers which hosts were asked for.
#[derive(Debug, Default)]
pub(super) struct RecordingProvider {
    tokens: HashMap<String, String>,
    requested: Mutex<Vec<String>>,
}

impl RecordingProvider {
    pub(super) fn with_user(host: &str, username: &str) -> Self {
        let token = RegistryAuth {
            username: Some(String::from(username)),
            password: Some(String::from("secret")),
            serveraddress: Some(String::from(host)),
            ..RegistryAuth::default()
        }
        .encode()
        .expect("auth should encode");

        Self {
            tokens: HashMap::from([(String::from(host), token)]),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn requested(&self) -> Vec<String> {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CredentialProvider for RecordingProvider {
    fn credential_for(&self, host: &str) -> Credential {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(String::from(host));
        self.tokens.credential_for(host)
    }
}

/// Policy with no sleeping so retry tests finish immediately.
pub(super) const fn instant_policy(retries: u32) -> RetryPolicy {
    RetryPolicy::new(retries, Duration::ZERO)
}

pub(super) fn client(
    engine: RecordingEngine,
    retries: u32,
) -> SyncClient<RecordingEngine, RecordingProvider> {
    SyncClient::new(engine, RecordingProvider::default(), instant_policy(retries))
}

/// Multi-threaded runtime: the blocking wrappers call `Handle::block_on`,
/// which cannot drive the timer of a current-thread runtime.
pub(super) fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Runtime::new().expect("runtime should build")
}
