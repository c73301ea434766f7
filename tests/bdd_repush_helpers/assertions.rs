//! Then-step assertions for re-push behavioural scenarios.

use rstest_bdd_macros::then;

use super::state::{
    DESTINATION, EngineEvent, FailureKind, RepushOutcome, RepushState, SOURCE, StepResult,
};

fn outcome(repush_state: &RepushState) -> StepResult<RepushOutcome> {
    repush_state
        .outcome
        .get()
        .ok_or_else(|| String::from("re-push outcome should be set"))
}

fn events(repush_state: &RepushState) -> StepResult<Vec<EngineEvent>> {
    repush_state
        .events
        .get()
        .ok_or_else(|| String::from("engine events should be captured"))
}

fn failure_kind(repush_state: &RepushState) -> StepResult<FailureKind> {
    match outcome(repush_state)? {
        RepushOutcome::Failed { kind, .. } => Ok(kind),
        RepushOutcome::Success => Err(String::from("expected re-push failure, got success")),
    }
}

fn only_push(repush_state: &RepushState) -> StepResult<(Option<String>, bool)> {
    let pushes: Vec<_> = events(repush_state)?
        .into_iter()
        .filter_map(|event| match event {
            EngineEvent::Push {
                username,
                authenticated,
                ..
            } => Some((username, authenticated)),
            _ => None,
        })
        .collect();

    match pushes.as_slice() {
        [push] => Ok(push.clone()),
        other => Err(format!("expected exactly one push, got {}", other.len())),
    }
}

#[then("the re-push succeeds")]
fn re_push_succeeds(repush_state: &RepushState) -> StepResult<()> {
    match outcome(repush_state)? {
        RepushOutcome::Success => Ok(()),
        RepushOutcome::Failed { message, .. } => {
            Err(format!("expected success, got failure: {message}"))
        }
    }
}

#[then("the engine saw a pull, then a tag, then a push")]
fn engine_saw_pull_tag_push(repush_state: &RepushState) -> StepResult<()> {
    let expected = [
        EngineEvent::Pull {
            image: String::from("registry-a.example.com/team/app"),
            authenticated: false,
        },
        EngineEvent::Tag {
            source: String::from(SOURCE),
            repo: Some(String::from("registry-b.example.com/mirror/app")),
            tag: Some(String::from("1.0")),
        },
        EngineEvent::Push {
            image: String::from("registry-b.example.com/mirror/app"),
            username: Some(String::from("mirror-bot")),
            authenticated: true,
        },
    ];

    let seen = events(repush_state)?;
    if seen.as_slice() == expected.as_slice() {
        return Ok(());
    }

    Err(format!(
        "expected pull, tag, push for {SOURCE} -> {DESTINATION}, got {seen:?}"
    ))
}

#[then("the pull was sent without credentials")]
fn pull_sent_without_credentials(repush_state: &RepushState) -> StepResult<()> {
    let authenticated_pulls = events(repush_state)?
        .iter()
        .filter(|event| {
            matches!(
                event,
                EngineEvent::Pull {
                    authenticated: true,
                    ..
                }
            )
        })
        .count();

    if authenticated_pulls == 0 {
        return Ok(());
    }

    Err(format!(
        "expected anonymous pulls, got {authenticated_pulls} authenticated"
    ))
}

#[then("the push was sent as {username}")]
fn push_sent_as(repush_state: &RepushState, username: String) -> StepResult<()> {
    let (sent, _) = only_push(repush_state)?;
    if sent.as_deref() == Some(username.as_str()) {
        return Ok(());
    }

    Err(format!("expected push as {username}, got {sent:?}"))
}

#[then("the push was sent with placeholder credentials")]
fn push_sent_with_placeholder(repush_state: &RepushState) -> StepResult<()> {
    match only_push(repush_state)? {
        (None, true) => Ok(()),
        (username, authenticated) => Err(format!(
            "expected empty placeholder credentials, got username {username:?} (sent: {authenticated})"
        )),
    }
}

#[then("the engine received {count} pulls")]
fn engine_received_pulls(repush_state: &RepushState, count: usize) -> StepResult<()> {
    let pulls = events(repush_state)?
        .iter()
        .filter(|event| matches!(event, EngineEvent::Pull { .. }))
        .count();

    if pulls == count {
        return Ok(());
    }

    Err(format!("expected {count} pulls, got {pulls}"))
}

#[then("the engine received no tag or push")]
fn engine_received_no_tag_or_push(repush_state: &RepushState) -> StepResult<()> {
    let seen = events(repush_state)?;
    let later_steps = seen
        .iter()
        .filter(|event| !matches!(event, EngineEvent::Pull { .. }))
        .count();

    if later_steps == 0 {
        return Ok(());
    }

    Err(format!("expected only pulls, got {seen:?}"))
}

#[then("the re-push fails with a pull error after {attempts} attempts")]
fn re_push_fails_with_pull_error(repush_state: &RepushState, attempts: u32) -> StepResult<()> {
    match failure_kind(repush_state)? {
        FailureKind::Pull { attempts: made } if made == attempts => Ok(()),
        other => Err(format!(
            "expected pull failure after {attempts} attempts, got {other:?}"
        )),
    }
}

#[then("the re-push fails with a push error")]
fn re_push_fails_with_push_error(repush_state: &RepushState) -> StepResult<()> {
    match failure_kind(repush_state)? {
        FailureKind::Push => Ok(()),
        other => Err(format!("expected push failure, got {other:?}")),
    }
}
