//! Async HTTP client for the remote flow-based IdP. The outpost never
//! validates credentials itself - every bind is resolved by driving the IdP's
//! flow executor, so this client carries the outpost's own service token and
//! opens a fresh cookie-backed session per bind to keep executor state
//! server-side across the round trips.

#![deny(warnings)]
#![warn(unused_extern_crates)]
#![deny(clippy::todo)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

#[macro_use]
extern crate tracing;

use std::fs::File;
use std::io::Read;
use std::net::IpAddr;
use std::path::Path;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use flowbind_proto::constants::{HEADER_REMOTE_IP, QUERY_OUTPOST_LDAP};
use flowbind_proto::v1::{
    Challenge, ChallengeAnswer, ChallengeResponse, FlowUser, WhoamiResponse,
};

pub use reqwest::StatusCode;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("the service token was not accepted by the idp")]
    Unauthorized,
    #[error("unexpected http response: {0}")]
    Http(StatusCode),
    #[error("transport failure: {0}")]
    Transport(reqwest::Error),
    #[error("failed to decode response body")]
    JsonDecode,
    #[error("invalid client configuration: {0}")]
    Configuration(String),
}

/// The constant correlation parameters attached to every executor request of
/// a bind attempt, identifying this front end to the IdP.
pub fn outpost_flow_query() -> Vec<(String, String)> {
    vec![(QUERY_OUTPOST_LDAP.to_string(), "true".to_string())]
}

#[derive(Debug, Clone)]
pub struct FlowClientBuilder {
    address: Option<String>,
    service_token: Option<String>,
    verify_ca: bool,
    ca: Option<reqwest::Certificate>,
}

impl Default for FlowClientBuilder {
    fn default() -> Self {
        FlowClientBuilder::new()
    }
}

impl FlowClientBuilder {
    pub fn new() -> Self {
        FlowClientBuilder {
            address: None,
            service_token: None,
            verify_ca: true,
            ca: None,
        }
    }

    pub fn address(self, address: String) -> Self {
        FlowClientBuilder {
            address: Some(address),
            ..self
        }
    }

    pub fn service_token(self, token: String) -> Self {
        FlowClientBuilder {
            service_token: Some(token),
            ..self
        }
    }

    pub fn danger_accept_invalid_certs(self, accept_invalid_certs: bool) -> Self {
        FlowClientBuilder {
            verify_ca: !accept_invalid_certs,
            ..self
        }
    }

    pub fn add_root_certificate_pem(self, ca_path: &Path) -> Result<Self, ClientError> {
        let mut buf = Vec::new();
        File::open(ca_path)
            .and_then(|mut f| f.read_to_end(&mut buf))
            .map_err(|e| {
                ClientError::Configuration(format!("unable to read ca from {ca_path:?}: {e}"))
            })?;
        let ca = reqwest::Certificate::from_pem(&buf)
            .map_err(|e| ClientError::Configuration(format!("invalid ca pem: {e}")))?;
        Ok(FlowClientBuilder {
            ca: Some(ca),
            ..self
        })
    }

    pub fn build(self) -> Result<FlowClient, ClientError> {
        let address = self
            .address
            .ok_or_else(|| ClientError::Configuration("idp address is not set".to_string()))?;
        // Check the address parses now rather than on the first bind.
        Url::parse(&address)
            .map_err(|e| ClientError::Configuration(format!("invalid idp address: {e}")))?;
        let service_token = self.service_token.ok_or_else(|| {
            ClientError::Configuration("outpost service token is not set".to_string())
        })?;

        Ok(FlowClient {
            addr: address.trim_end_matches('/').to_string(),
            service_token,
            verify_ca: self.verify_ca,
            ca: self.ca,
        })
    }
}

/// Connection settings for the IdP. Cheap to hold for the life of the
/// outpost; actual HTTP clients are created per bind via [`FlowClient::new_session`].
#[derive(Debug, Clone)]
pub struct FlowClient {
    addr: String,
    service_token: String,
    verify_ca: bool,
    ca: Option<reqwest::Certificate>,
}

impl FlowClient {
    /// Open a session for a single bind attempt: a fresh cookie jar so that
    /// executor state survives across the stage round trips, the outpost's
    /// bearer token so that pre-identification failures are attributed to
    /// this outpost, and the directory client's address forwarded so the IdP
    /// can attribute the attempt to the real source.
    pub fn new_session(&self, remote_ip: IpAddr) -> Result<FlowSession, ClientError> {
        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", self.service_token))
            .map_err(|_| {
                ClientError::Configuration("service token is not a valid header value".to_string())
            })?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
        let remote = HeaderValue::from_str(&remote_ip.to_string()).map_err(|_| {
            ClientError::Configuration("remote address is not a valid header value".to_string())
        })?;
        headers.insert(HEADER_REMOTE_IP, remote);

        let client_builder = reqwest::Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .danger_accept_invalid_certs(!self.verify_ca);

        let client_builder = match &self.ca {
            Some(cert) => client_builder.add_root_certificate(cert.clone()),
            None => client_builder,
        };

        let client = client_builder.build().map_err(ClientError::Transport)?;

        Ok(FlowSession {
            client,
            addr: self.addr.clone(),
        })
    }
}

/// A per-bind session against the IdP. Holds the cookie jar that keeps the
/// executor's flow state alive between challenges.
#[derive(Debug)]
pub struct FlowSession {
    client: reqwest::Client,
    addr: String,
}

impl FlowSession {
    async fn perform_get_request<T: DeserializeOwned>(
        &self,
        dest: &str,
        query: &[(String, String)],
    ) -> Result<T, ClientError> {
        let dest = [self.addr.as_str(), dest].concat();
        debug!(%dest, "get request");

        let response = self
            .client
            .get(dest.as_str())
            .query(query)
            .send()
            .await
            .map_err(ClientError::Transport)?;

        match response.status() {
            reqwest::StatusCode::OK => {}
            reqwest::StatusCode::UNAUTHORIZED => return Err(ClientError::Unauthorized),
            unexpect => return Err(ClientError::Http(unexpect)),
        }

        response.json().await.map_err(|err| {
            warn!(?err, "failed to decode response body");
            ClientError::JsonDecode
        })
    }

    async fn perform_post_request<R: Serialize, T: DeserializeOwned>(
        &self,
        dest: &str,
        query: &[(String, String)],
        request: &R,
    ) -> Result<T, ClientError> {
        let dest = [self.addr.as_str(), dest].concat();
        debug!(%dest, "post request");

        let response = self
            .client
            .post(dest.as_str())
            .query(query)
            .json(request)
            .send()
            .await
            .map_err(ClientError::Transport)?;

        match response.status() {
            reqwest::StatusCode::OK => {}
            reqwest::StatusCode::UNAUTHORIZED => return Err(ClientError::Unauthorized),
            unexpect => return Err(ClientError::Http(unexpect)),
        }

        response.json().await.map_err(|err| {
            warn!(?err, "failed to decode response body");
            ClientError::JsonDecode
        })
    }

    /// Fetch the challenge of the currently pending stage of the flow.
    pub async fn get_flow_challenge(
        &self,
        flow_slug: &str,
        query: &[(String, String)],
    ) -> Result<Challenge, ClientError> {
        self.perform_get_request(
            ["/v1/flows/", flow_slug, "/executor"].concat().as_str(),
            query,
        )
        .await
    }

    /// Submit an answer to the currently pending stage.
    pub async fn solve_flow_challenge(
        &self,
        flow_slug: &str,
        query: &[(String, String)],
        answer: &ChallengeAnswer,
    ) -> Result<ChallengeResponse, ClientError> {
        self.perform_post_request(
            ["/v1/flows/", flow_slug, "/executor"].concat().as_str(),
            query,
            answer,
        )
        .await
    }

    /// Whether the identity bound to this session may use the application at
    /// all. A 403 is a normal authorisation denial, not an error.
    pub async fn check_application_access(&self, app_slug: &str) -> Result<bool, ClientError> {
        let dest = [
            self.addr.as_str(),
            "/v1/applications/",
            app_slug,
            "/check_access",
        ]
        .concat();
        debug!(%dest, "get request");

        let response = self
            .client
            .get(dest.as_str())
            .send()
            .await
            .map_err(ClientError::Transport)?;

        match response.status() {
            reqwest::StatusCode::OK => Ok(true),
            reqwest::StatusCode::FORBIDDEN => Ok(false),
            reqwest::StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
            unexpect => Err(ClientError::Http(unexpect)),
        }
    }

    /// The identity the IdP associates with this session once the flow has
    /// been passed.
    pub async fn get_current_user(&self) -> Result<FlowUser, ClientError> {
        let r: WhoamiResponse = self.perform_get_request("/v1/self", &[]).await?;
        Ok(r.user)
    }
}
