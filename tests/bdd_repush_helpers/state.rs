//! Shared behavioural-test state for re-push scenarios.

use rstest::fixture;
use rstest_bdd::Slot;
use rstest_bdd_macros::ScenarioState;

/// Step result type for re-push BDD tests.
pub type StepResult<T> = Result<T, String>;

/// Image reference the scenarios copy from.
pub const SOURCE: &str = "registry-a.example.com/team/app:1.0";

/// Image reference the scenarios copy to.
pub const DESTINATION: &str = "registry-b.example.com/mirror/app:1.0";

/// One request observed by the stub engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A pull of `image`.
    Pull {
        /// Repository passed as `fromImage`.
        image: String,
        /// Whether any credential accompanied the pull.
        authenticated: bool,
    },
    /// A tag request adding `repo:tag` to `source`.
    Tag {
        /// The image being tagged.
        source: String,
        /// Repository of the new reference.
        repo: Option<String>,
        /// Tag of the new reference.
        tag: Option<String>,
    },
    /// A push of `image`.
    Push {
        /// Repository being pushed.
        image: String,
        /// Username from the credential sent, if any credential was sent.
        username: Option<String>,
        /// Whether a credential of any kind was sent.
        authenticated: bool,
    },
}

/// High-level outcome of a re-push attempt.
#[derive(Debug, Clone)]
pub enum RepushOutcome {
    /// Every step succeeded.
    Success,
    /// A step failed.
    Failed {
        /// The failure category.
        kind: FailureKind,
        /// Human-readable error message.
        message: String,
    },
}

/// Categorized failure outcomes for assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Pull attempts were exhausted.
    Pull {
        /// Attempts made before giving up.
        attempts: u32,
    },
    /// The engine rejected the tag request.
    Tag,
    /// The push failed.
    Push,
    /// Any other failure kind.
    Other,
}

/// Shared scenario state for re-push behavioural tests.
#[derive(Default, ScenarioState)]
pub struct RepushState {
    /// Extra pull attempts after the first failure.
    pub(crate) retries: Slot<u32>,

    /// How many leading pull attempts the stub engine fails.
    pub(crate) failing_pulls: Slot<usize>,

    /// Whether the stub engine refuses pushes.
    pub(crate) refuse_push: Slot<bool>,

    /// Docker `config.json` content backing the credential provider.
    pub(crate) docker_config: Slot<String>,

    /// Outcome of the most recent re-push attempt.
    pub(crate) outcome: Slot<RepushOutcome>,

    /// Requests the stub engine received, in order.
    pub(crate) events: Slot<Vec<EngineEvent>>,
}

/// Fixture providing fresh state for each re-push scenario.
#[fixture]
pub fn repush_state() -> RepushState {
    let state = RepushState::default();
    state.retries.set(0);
    state.failing_pulls.set(0);
    state.refuse_push.set(false);
    state.docker_config.set(String::from(r#"{"auths": {}}"#));
    state
}
