//! The image synchronisation client.
//!
//! [`SyncClient`] combines an engine connection, a credential provider, and a
//! retry policy. It pulls with retry and backoff, pushes once, tags locally,
//! chains the three into a re-push between registries, and runs or removes
//! containers built from pulled images.
//!
//! Every operation has an `_async` form and a blocking form that drives it on
//! a caller-supplied Tokio runtime handle.

use bollard::errors::Error as BollardError;
use futures_util::TryStreamExt;

mod backoff;
mod lifecycle;
mod listing;
mod ports;
mod pull;
mod push;

pub use backoff::{Backoff, DEFAULT_PULL_RETRIES, DEFAULT_RETRY_DELAY, RetryPolicy};
pub use lifecycle::CreateContainerRequest;
pub use listing::reference_filter;
pub use ports::{HostBinding, PortMappings, Protocol};

use crate::engine::ProgressStream;

/// Client that moves images between the local engine and registries.
///
/// The backoff delay belongs to the client: failed pulls escalate it for
/// every later pull made through the same instance.
#[derive(Debug)]
pub struct SyncClient<E, P> {
    engine: E,
    credentials: P,
    policy: RetryPolicy,
    backoff: Backoff,
}

impl<E, P> SyncClient<E, P> {
    /// Create a client over `engine`, looking credentials up in `credentials`.
    #[must_use]
    pub const fn new(engine: E, credentials: P, policy: RetryPolicy) -> Self {
        Self {
            engine,
            credentials,
            backoff: Backoff::new(policy.initial_delay),
            policy,
        }
    }

    /// Return the engine connection.
    #[must_use]
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// Return the credential provider.
    #[must_use]
    pub const fn credentials(&self) -> &P {
        &self.credentials
    }

    /// Return the retry policy.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Return the shared backoff state.
    #[must_use]
    pub const fn backoff(&self) -> &Backoff {
        &self.backoff
    }
}

/// Consume a pull or push progress stream to the end.
///
/// Returns the number of events seen; the first error ends the transfer.
async fn drain_progress(mut stream: ProgressStream<'_>) -> Result<usize, BollardError> {
    let mut events = 0_usize;
    while let Some(progress) = stream.try_next().await? {
        events = events.saturating_add(1);
        tracing::trace!(
            id = progress.id.as_deref().unwrap_or_default(),
            status = progress.status.as_deref().unwrap_or_default(),
            "transfer progress"
        );
    }
    Ok(events)
}

#[cfg(test)]
mod tests;
