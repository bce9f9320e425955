//! The seam between the bind pipeline and the remote IdP. The pipeline only
//! ever speaks to a [`FlowEngine`]; production binds get one backed by a
//! fresh [`flowbind_client::FlowSession`], tests script one in memory.

use std::net::IpAddr;

use async_trait::async_trait;

use flowbind_client::{ClientError, FlowClient, FlowSession};
use flowbind_proto::v1::{Challenge, ChallengeAnswer, ChallengeResponse, FlowUser};

/// One bind attempt's view of the remote IdP. Implementations are expected
/// to keep flow state (cookies) alive for their own lifetime, which is a
/// single bind.
#[async_trait]
pub trait FlowEngine {
    async fn get_challenge(
        &self,
        flow_slug: &str,
        query: &[(String, String)],
    ) -> Result<Challenge, ClientError>;

    async fn submit_response(
        &self,
        flow_slug: &str,
        query: &[(String, String)],
        answer: &ChallengeAnswer,
    ) -> Result<ChallengeResponse, ClientError>;

    async fn check_application_access(&self, app_slug: &str) -> Result<bool, ClientError>;

    async fn get_current_user(&self) -> Result<FlowUser, ClientError>;
}

/// Hands out a fresh [`FlowEngine`] per bind attempt.
pub trait EngineProvider {
    type Engine: FlowEngine + Send + Sync;

    fn open_session(&self, remote_ip: IpAddr) -> Result<Self::Engine, ClientError>;
}

#[async_trait]
impl FlowEngine for FlowSession {
    async fn get_challenge(
        &self,
        flow_slug: &str,
        query: &[(String, String)],
    ) -> Result<Challenge, ClientError> {
        self.get_flow_challenge(flow_slug, query).await
    }

    async fn submit_response(
        &self,
        flow_slug: &str,
        query: &[(String, String)],
        answer: &ChallengeAnswer,
    ) -> Result<ChallengeResponse, ClientError> {
        self.solve_flow_challenge(flow_slug, query, answer).await
    }

    async fn check_application_access(&self, app_slug: &str) -> Result<bool, ClientError> {
        FlowSession::check_application_access(self, app_slug).await
    }

    async fn get_current_user(&self) -> Result<FlowUser, ClientError> {
        FlowSession::get_current_user(self).await
    }
}

/// The production provider: every bind gets its own cookie-jar session
/// against the configured IdP, tagged with the bind's source address.
#[derive(Debug, Clone)]
pub struct FlowClientProvider {
    client: FlowClient,
}

impl FlowClientProvider {
    pub fn new(client: FlowClient) -> Self {
        FlowClientProvider { client }
    }
}

impl EngineProvider for FlowClientProvider {
    type Engine = FlowSession;

    fn open_session(&self, remote_ip: IpAddr) -> Result<FlowSession, ClientError> {
        self.client.new_session(remote_ip)
    }
}
