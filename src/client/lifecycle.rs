//! Running containers from pulled images and force-removing them.

use bollard::models::{ContainerCreateBody, HostConfig};
use bollard::query_parameters::{
    CreateContainerOptions, CreateContainerOptionsBuilder, RemoveContainerOptionsBuilder,
};
use serde_json::{Map, Value, json};

use super::{PortMappings, SyncClient};
use crate::auth::CredentialProvider;
use crate::engine::{ContainerClient, ImageClient};
use crate::error::{ConfigError, ContainerError, RegsyncError};

/// Container-creation request parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateContainerRequest {
    /// The image reference to create from.
    image: String,

    /// Optional container name.
    name: Option<String>,

    /// Ports to expose and publish.
    ports: PortMappings,
}

impl CreateContainerRequest {
    /// Create a request for `image` with no name and no ports.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingRequired` when `image` is empty or
    /// whitespace-only.
    pub fn new(image: impl Into<String>) -> Result<Self, RegsyncError> {
        let image_value = image.into();
        let trimmed = image_value.trim();

        if trimmed.is_empty() {
            return Err(RegsyncError::from(ConfigError::MissingRequired {
                field: String::from("image"),
            }));
        }

        Ok(Self {
            image: String::from(trimmed),
            name: None,
            ports: PortMappings::default(),
        })
    }

    /// Attach an optional container name; blank names are dropped.
    #[must_use]
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name.filter(|value| !value.trim().is_empty());
        self
    }

    /// Attach port mappings.
    #[must_use]
    pub fn with_ports(mut self, ports: PortMappings) -> Self {
        self.ports = ports;
        self
    }

    /// Return the configured image.
    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Return the optional configured name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Return the configured port mappings.
    #[must_use]
    pub const fn ports(&self) -> &PortMappings {
        &self.ports
    }
}

impl<E, P> SyncClient<E, P>
where
    E: ImageClient + ContainerClient,
    P: CredentialProvider,
{
    /// Pull `reference`, then create and start a container from it (async
    /// version).
    ///
    /// Port specifications are parsed before anything is sent to the engine.
    /// If the container is created but fails to start it is force-removed
    /// before the start error is returned.
    ///
    /// # Errors
    ///
    /// Returns `ReferenceError::InvalidPortSpec` for a malformed port
    /// specification, any error from [`Self::pull_async`],
    /// `ContainerError::CreateFailed`, or `ContainerError::StartFailed`.
    pub async fn run_async<S: AsRef<str>>(
        &self,
        reference: &str,
        name: Option<&str>,
        port_specs: &[S],
    ) -> Result<String, RegsyncError> {
        let ports = PortMappings::parse(port_specs)?;
        let request = CreateContainerRequest::new(reference)?
            .with_name(name.map(String::from))
            .with_ports(ports);

        self.pull_async(request.image()).await?;
        let container_id = self.create_container_async(&request).await?;

        if let Err(error) = self.engine.start_container(&container_id).await {
            self.discard_unstarted(&container_id).await;
            return Err(ContainerError::StartFailed {
                container_id,
                message: error.to_string(),
            }
            .into());
        }

        tracing::info!(reference, %container_id, "started container");
        Ok(container_id)
    }

    /// Pull `reference`, then create and start a container from it.
    ///
    /// This synchronous helper blocks on [`Self::run_async`] using an
    /// existing Tokio runtime handle supplied by the caller. The handle must
    /// belong to a multi-threaded runtime: a failed pull sleeps before
    /// retrying, and a current-thread runtime's timer is never driven from
    /// `Handle::block_on`, so the call would hang.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::run_async`].
    pub fn run<S: AsRef<str>>(
        &self,
        runtime: &tokio::runtime::Handle,
        reference: &str,
        name: Option<&str>,
        port_specs: &[S],
    ) -> Result<String, RegsyncError> {
        runtime.block_on(self.run_async(reference, name, port_specs))
    }

    /// Create a container from a prepared request (async version).
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::CreateFailed` when the engine rejects the
    /// create request.
    pub async fn create_container_async(
        &self,
        request: &CreateContainerRequest,
    ) -> Result<String, RegsyncError> {
        let options = build_create_options(request.name());
        let config = build_create_body(request)?;

        let response = self
            .engine
            .create_container(options, config)
            .await
            .map_err(|error| {
                RegsyncError::from(ContainerError::CreateFailed {
                    message: error.to_string(),
                })
            })?;

        for warning in &response.warnings {
            tracing::warn!(container_id = %response.id, %warning, "engine warning on create");
        }
        Ok(response.id)
    }

    /// Kill and remove a container (async version).
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::RemoveFailed` when the engine refuses.
    pub async fn force_remove_async(&self, container_id: &str) -> Result<(), RegsyncError> {
        let options = RemoveContainerOptionsBuilder::new().force(true).build();

        self.engine
            .remove_container(container_id, options)
            .await
            .map_err(|error| {
                RegsyncError::from(ContainerError::RemoveFailed {
                    container_id: String::from(container_id),
                    message: error.to_string(),
                })
            })
    }

    /// Kill and remove a container.
    ///
    /// This synchronous helper blocks on [`Self::force_remove_async`] using
    /// an existing Tokio runtime handle supplied by the caller.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::force_remove_async`].
    pub fn force_remove(
        &self,
        runtime: &tokio::runtime::Handle,
        container_id: &str,
    ) -> Result<(), RegsyncError> {
        runtime.block_on(self.force_remove_async(container_id))
    }

    async fn discard_unstarted(&self, container_id: &str) {
        if let Err(error) = self.force_remove_async(container_id).await {
            tracing::warn!(container_id, %error, "failed to remove container that did not start");
        }
    }
}

fn build_create_options(name: Option<&str>) -> Option<CreateContainerOptions> {
    name.filter(|value| !value.trim().is_empty())
        .map(|container_name| {
            CreateContainerOptionsBuilder::new()
                .name(container_name)
                .build()
        })
}

fn build_create_body(request: &CreateContainerRequest) -> Result<ContainerCreateBody, RegsyncError> {
    let ports = request.ports();
    let mut body = if ports.is_empty() {
        ContainerCreateBody::default()
    } else {
        exposed_ports_body(ports)?
    };

    body.image = Some(String::from(request.image()));
    body.host_config = Some(HostConfig {
        port_bindings: (!ports.is_empty()).then(|| ports.to_port_map()),
        ..HostConfig::default()
    });
    Ok(body)
}

/// Build a body carrying only `ExposedPorts`.
///
/// On the wire the field is a set written as a map from `port/proto` to an
/// empty object.
fn exposed_ports_body(ports: &PortMappings) -> Result<ContainerCreateBody, RegsyncError> {
    let exposed: Map<String, Value> = ports
        .exposed()
        .map(|key| (String::from(key), Value::Object(Map::new())))
        .collect();

    serde_json::from_value(json!({ "ExposedPorts": exposed })).map_err(|error| {
        RegsyncError::from(ContainerError::CreateFailed {
            message: format!("failed to encode exposed ports: {error}"),
        })
    })
}
