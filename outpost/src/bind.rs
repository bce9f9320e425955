//! The bind orchestrator. This is the single entry point the protocol layer
//! calls; it wires the DN parser, flow resolver, access check and session
//! cache into one strictly sequential, non-retrying pipeline. Failures are
//! logged here with their context and collapse to a bare LDAP result code -
//! no credential or stage detail ever reaches the wire.

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;

use ldap3_proto::simple::LdapResultCode;
use uuid::Uuid;

use flowbind_client::outpost_flow_query;

use crate::access::has_search_access;
use crate::cache::{BoundSession, BoundSessionCache};
use crate::config::OutpostConfig;
use crate::dn::resolve_username;
use crate::engine::{EngineProvider, FlowEngine};
use crate::flow::solve_flow;

pub struct LdapBindHandler<P: EngineProvider> {
    base_dn: String,
    flow_slug: String,
    app_slug: String,
    search_allowed_groups: BTreeSet<Uuid>,
    sessions: Arc<BoundSessionCache>,
    provider: P,
}

impl<P: EngineProvider> LdapBindHandler<P> {
    pub fn new(config: &OutpostConfig, provider: P, sessions: Arc<BoundSessionCache>) -> Self {
        LdapBindHandler {
            base_dn: config.base_dn.clone(),
            flow_slug: config.flow_slug.clone(),
            app_slug: config.app_slug.clone(),
            search_allowed_groups: config.search_allowed_groups.clone(),
            sessions,
            provider,
        }
    }

    /// Resolve one bind attempt against the remote IdP.
    ///
    /// Every step is terminal on failure; nothing is retried here (the
    /// directory client owns retries). Operational errors are logged and
    /// reported as `OperationsError`; rejected credentials and denied access
    /// are ordinary results, not errors.
    pub async fn bind(&self, bind_dn: &str, password: &str, peer: SocketAddr) -> LdapResultCode {
        let username = match resolve_username(bind_dn, &self.base_dn) {
            Ok(username) => username,
            Err(err) => {
                // A DN we can't place is a protocol layer bug, not a user
                // credential problem.
                warn!(%bind_dn, ?err, "failed to resolve bind dn");
                return LdapResultCode::OperationsError;
            }
        };

        let engine = match self.provider.open_session(peer.ip()) {
            Ok(engine) => engine,
            Err(err) => {
                warn!(%bind_dn, ?err, "failed to open idp session");
                return LdapResultCode::OperationsError;
            }
        };

        let query = outpost_flow_query();
        match solve_flow(&engine, &self.flow_slug, &username, password, &query).await {
            Ok(true) => {}
            Ok(false) => {
                info!(%bind_dn, "credentials rejected by flow");
                return LdapResultCode::InvalidCredentials;
            }
            Err(err) => {
                warn!(%bind_dn, ?err, "failed to solve flow challenge");
                return LdapResultCode::OperationsError;
            }
        }

        match engine.check_application_access(&self.app_slug).await {
            Ok(true) => {
                info!(%bind_dn, "user has application access");
            }
            Ok(false) => {
                info!(%bind_dn, "access denied for user");
                return LdapResultCode::InsufficentAccessRights;
            }
            Err(err) => {
                warn!(%bind_dn, ?err, "failed to check application access");
                return LdapResultCode::OperationsError;
            }
        }

        let user = match engine.get_current_user().await {
            Ok(user) => user,
            Err(err) => {
                warn!(%bind_dn, ?err, "failed to fetch bound identity");
                return LdapResultCode::OperationsError;
            }
        };

        let can_search = has_search_access(&user, &self.search_allowed_groups);
        self.sessions
            .put(bind_dn, BoundSession { user, can_search })
            .await;

        LdapResultCode::Success
    }

    /// The cache of successful binds this handler populates. The protocol
    /// layer consults it when authorising follow-up searches.
    pub fn sessions(&self) -> &Arc<BoundSessionCache> {
        &self.sessions
    }
}
