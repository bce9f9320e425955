//! Scripted in-memory flow engines. These stand in for the remote IdP so
//! the resolver and orchestrator can be exercised without a network.

use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use flowbind_client::{ClientError, StatusCode};
use flowbind_proto::constants::{STAGE_ACCESS_DENIED, STAGE_IDENTIFICATION, STAGE_PASSWORD};
use flowbind_proto::v1::{
    Challenge, ChallengeAnswer, ChallengeResponse, ChallengeType, ErrorDetail, FlowGroup, FlowUser,
};

use crate::engine::{EngineProvider, FlowEngine};

pub(crate) fn test_init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub(crate) fn stage_challenge(component: &str) -> Challenge {
    Challenge {
        component: component.to_string(),
        ctype: ChallengeType::Native,
        to: None,
    }
}

pub(crate) fn ident_challenge() -> Challenge {
    stage_challenge(STAGE_IDENTIFICATION)
}

pub(crate) fn password_challenge() -> Challenge {
    stage_challenge(STAGE_PASSWORD)
}

pub(crate) fn denied_challenge() -> Challenge {
    stage_challenge(STAGE_ACCESS_DENIED)
}

/// A response that neither completes nor rejects - the flow wants another
/// stage.
pub(crate) fn native_response() -> ChallengeResponse {
    ChallengeResponse {
        component: STAGE_PASSWORD.to_string(),
        ctype: ChallengeType::Native,
        response_errors: None,
    }
}

pub(crate) fn redirect_response() -> ChallengeResponse {
    ChallengeResponse {
        component: "stage-redirect".to_string(),
        ctype: ChallengeType::Redirect,
        response_errors: None,
    }
}

pub(crate) fn denied_response() -> ChallengeResponse {
    ChallengeResponse {
        component: STAGE_ACCESS_DENIED.to_string(),
        ctype: ChallengeType::Native,
        response_errors: None,
    }
}

pub(crate) fn error_response(field: &str, code: &str, message: &str) -> ChallengeResponse {
    let detail = ErrorDetail {
        code: code.to_string(),
        string: message.to_string(),
    };
    ChallengeResponse {
        component: STAGE_PASSWORD.to_string(),
        ctype: ChallengeType::Native,
        response_errors: Some([(field.to_string(), vec![detail])].into_iter().collect()),
    }
}

pub(crate) fn transport_error() -> ClientError {
    ClientError::Http(StatusCode::INTERNAL_SERVER_ERROR)
}

pub(crate) fn test_user(groups: &[Uuid]) -> FlowUser {
    FlowUser {
        pk: 1000,
        username: "jdoe".to_string(),
        name: "Jane Doe".to_string(),
        groups: groups
            .iter()
            .map(|pk| FlowGroup {
                pk: *pk,
                name: format!("group-{pk}"),
            })
            .collect(),
    }
}

/// A [`FlowEngine`] that replays preloaded results and records what was
/// submitted to it. Popping an unscripted step is a test bug and panics.
#[derive(Default)]
pub(crate) struct ScriptedEngine {
    challenges: Mutex<VecDeque<Result<Challenge, ClientError>>>,
    responses: Mutex<VecDeque<Result<ChallengeResponse, ClientError>>>,
    access: Mutex<VecDeque<Result<bool, ClientError>>>,
    users: Mutex<VecDeque<Result<FlowUser, ClientError>>>,
    submitted: Mutex<Vec<String>>,
    challenge_fetches: AtomicUsize,
}

impl ScriptedEngine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_challenge(&self, challenge: Result<Challenge, ClientError>) {
        self.challenges
            .lock()
            .expect("scripted engine lock poisoned")
            .push_back(challenge);
    }

    pub(crate) fn push_response(&self, response: Result<ChallengeResponse, ClientError>) {
        self.responses
            .lock()
            .expect("scripted engine lock poisoned")
            .push_back(response);
    }

    pub(crate) fn push_access(&self, access: Result<bool, ClientError>) {
        self.access
            .lock()
            .expect("scripted engine lock poisoned")
            .push_back(access);
    }

    pub(crate) fn push_user(&self, user: Result<FlowUser, ClientError>) {
        self.users
            .lock()
            .expect("scripted engine lock poisoned")
            .push_back(user);
    }

    pub(crate) fn submitted(&self) -> Vec<String> {
        self.submitted
            .lock()
            .expect("scripted engine lock poisoned")
            .clone()
    }

    pub(crate) fn challenge_fetch_count(&self) -> usize {
        self.challenge_fetches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl FlowEngine for ScriptedEngine {
    async fn get_challenge(
        &self,
        _flow_slug: &str,
        _query: &[(String, String)],
    ) -> Result<Challenge, ClientError> {
        self.challenge_fetches.fetch_add(1, Ordering::Relaxed);
        self.challenges
            .lock()
            .expect("scripted engine lock poisoned")
            .pop_front()
            .expect("unscripted challenge fetch")
    }

    async fn submit_response(
        &self,
        _flow_slug: &str,
        _query: &[(String, String)],
        answer: &ChallengeAnswer,
    ) -> Result<ChallengeResponse, ClientError> {
        let body = serde_json::to_string(answer).expect("answer should serialise");
        self.submitted
            .lock()
            .expect("scripted engine lock poisoned")
            .push(body);
        self.responses
            .lock()
            .expect("scripted engine lock poisoned")
            .pop_front()
            .expect("unscripted submission")
    }

    async fn check_application_access(&self, _app_slug: &str) -> Result<bool, ClientError> {
        self.access
            .lock()
            .expect("scripted engine lock poisoned")
            .pop_front()
            .expect("unscripted access check")
    }

    async fn get_current_user(&self) -> Result<FlowUser, ClientError> {
        self.users
            .lock()
            .expect("scripted engine lock poisoned")
            .pop_front()
            .expect("unscripted identity fetch")
    }
}

/// Hands each bind the next scripted engine; an exhausted script means the
/// test did not expect another session to open.
pub(crate) struct ScriptedProvider {
    engines: Mutex<VecDeque<ScriptedEngine>>,
}

impl ScriptedProvider {
    pub(crate) fn single(engine: ScriptedEngine) -> Self {
        ScriptedProvider {
            engines: Mutex::new(VecDeque::from([engine])),
        }
    }
}

impl EngineProvider for ScriptedProvider {
    type Engine = ScriptedEngine;

    fn open_session(&self, _remote_ip: IpAddr) -> Result<ScriptedEngine, ClientError> {
        self.engines
            .lock()
            .expect("scripted provider lock poisoned")
            .pop_front()
            .ok_or(ClientError::Configuration(
                "no scripted engine left".to_string(),
            ))
    }
}
