//! Container engine connection and the operations regsync drives through it.
//!
//! The socket endpoint is resolved through a priority-based fallback chain:
//!
//! 1. CLI argument (`--engine-socket`)
//! 2. Config file (`engine_socket` in TOML)
//! 3. `REGSYNC_ENGINE_SOCKET` environment variable
//! 4. `DOCKER_HOST` environment variable
//! 5. `CONTAINER_HOST` environment variable
//! 6. `PODMAN_HOST` environment variable
//! 7. Platform default (`/var/run/docker.sock` on Unix)

mod connection;
mod runtime;

pub use connection::{EngineConnector, SocketResolver};
pub use runtime::{
    ContainerClient, EngineFuture, ImageClient, ProgressStream, TransferProgress,
};
