//! Given/when step definitions for re-push behavioural scenarios.

use std::time::Duration;

use regsync::auth::DockerConfigCredentials;
use regsync::client::{RetryPolicy, SyncClient};
use regsync::error::{RegistryError, RegsyncError};
use rstest_bdd_macros::{given, when};

use super::engine::StubEngine;
use super::state::{DESTINATION, FailureKind, RepushOutcome, RepushState, SOURCE, StepResult};

#[given("pulls are retried {retries} times")]
#[expect(
    clippy::unnecessary_wraps,
    reason = "rstest-bdd step signatures consistently return StepResult"
)]
fn pulls_are_retried(repush_state: &RepushState, retries: u32) -> StepResult<()> {
    repush_state.retries.set(retries);
    Ok(())
}

#[given("the source registry fails the first {count} pulls")]
#[expect(
    clippy::unnecessary_wraps,
    reason = "rstest-bdd step signatures consistently return StepResult"
)]
fn source_registry_fails_pulls(repush_state: &RepushState, count: usize) -> StepResult<()> {
    repush_state.failing_pulls.set(count);
    Ok(())
}

#[given("the destination registry refuses pushes")]
#[expect(
    clippy::unnecessary_wraps,
    reason = "rstest-bdd step signatures consistently return StepResult"
)]
fn destination_refuses_pushes(repush_state: &RepushState) -> StepResult<()> {
    repush_state.refuse_push.set(true);
    Ok(())
}

#[given("the destination registry has credentials for {username}")]
#[expect(
    clippy::unnecessary_wraps,
    reason = "rstest-bdd step signatures consistently return StepResult"
)]
fn destination_has_credentials(repush_state: &RepushState, username: String) -> StepResult<()> {
    let config = format!(
        r#"{{"auths": {{"https://registry-b.example.com": {{"username": "{username}", "password": "s3cret"}}}}}}"#
    );
    repush_state.docker_config.set(config);
    Ok(())
}

#[when("the image is re-pushed")]
fn image_is_re_pushed(repush_state: &RepushState) -> StepResult<()> {
    let docker_config = repush_state
        .docker_config
        .get()
        .ok_or_else(|| String::from("docker config should be set"))?;
    let credentials = DockerConfigCredentials::from_json(&docker_config)
        .map_err(|error| format!("docker config should parse: {error}"))?;

    let engine = StubEngine::new(
        repush_state.failing_pulls.get().unwrap_or(0),
        repush_state.refuse_push.get().unwrap_or(false),
    );
    let policy = RetryPolicy::new(repush_state.retries.get().unwrap_or(0), Duration::ZERO);
    let client = SyncClient::new(engine, credentials, policy);

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|_| String::from("failed to create tokio runtime for scenario"))?;
    let result = client.re_push(runtime.handle(), SOURCE, DESTINATION);

    repush_state.events.set(client.engine().events());
    repush_state.outcome.set(match result {
        Ok(()) => RepushOutcome::Success,
        Err(error) => RepushOutcome::Failed {
            kind: classify_failure_kind(&error),
            message: error.to_string(),
        },
    });

    Ok(())
}

const fn classify_failure_kind(error: &RegsyncError) -> FailureKind {
    match error {
        RegsyncError::Registry(RegistryError::PullFailed { attempts, .. }) => FailureKind::Pull {
            attempts: *attempts,
        },
        RegsyncError::Registry(RegistryError::TagFailed { .. }) => FailureKind::Tag,
        RegsyncError::Registry(RegistryError::PushFailed { .. }) => FailureKind::Push,
        _ => FailureKind::Other,
    }
}
