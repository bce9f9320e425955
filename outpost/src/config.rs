//! Outpost runtime configuration. Read from an optional TOML file merged
//! over built-in defaults; everything here is externally supplied and
//! read-only once the outpost is running.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use flowbind_client::{ClientError, FlowClient, FlowClientBuilder};

use crate::cache::BoundSessionCache;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/flowbind/outpost.toml";

/// Seconds a successful bind stays in the session cache.
pub const DEFAULT_BIND_SESSION_TTL: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Deserialize)]
struct ConfigInt {
    idp_url: Option<String>,
    service_token: Option<String>,
    flow_slug: Option<String>,
    app_slug: Option<String>,
    base_dn: Option<String>,
    search_allowed_groups: Option<Vec<Uuid>>,
    bind_session_ttl: Option<u64>,
    ca_path: Option<String>,
    accept_invalid_certs: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct OutpostConfig {
    /// Where the IdP lives, scheme included.
    pub idp_url: String,
    /// The outpost's own credential against the IdP.
    pub service_token: String,
    /// The authentication flow binds are resolved against.
    pub flow_slug: String,
    /// The application this outpost fronts.
    pub app_slug: String,
    /// The directory base this outpost serves; binds outside it are refused.
    pub base_dn: String,
    /// Groups whose members may search after binding.
    pub search_allowed_groups: BTreeSet<Uuid>,
    pub bind_session_ttl: u64,
    pub ca_path: Option<String>,
    pub accept_invalid_certs: bool,
}

impl Default for OutpostConfig {
    fn default() -> Self {
        OutpostConfig::new()
    }
}

impl Display for OutpostConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "idp_url: {}", self.idp_url)?;
        writeln!(f, "service_token: <redacted>")?;
        writeln!(f, "flow_slug: {}", self.flow_slug)?;
        writeln!(f, "app_slug: {}", self.app_slug)?;
        writeln!(f, "base_dn: {}", self.base_dn)?;
        writeln!(
            f,
            "search_allowed_groups: {:?}",
            self.search_allowed_groups
        )?;
        writeln!(f, "bind_session_ttl: {}", self.bind_session_ttl)?;
        writeln!(f, "ca_path: {:?}", self.ca_path)?;
        writeln!(f, "accept_invalid_certs: {}", self.accept_invalid_certs)
    }
}

impl OutpostConfig {
    pub fn new() -> Self {
        OutpostConfig {
            idp_url: "https://localhost:9443".to_string(),
            service_token: String::new(),
            flow_slug: "default-authentication-flow".to_string(),
            app_slug: String::new(),
            base_dn: String::new(),
            search_allowed_groups: BTreeSet::new(),
            bind_session_ttl: DEFAULT_BIND_SESSION_TTL,
            ca_path: None,
            accept_invalid_certs: false,
        }
    }

    /// Merge the TOML file at `config_path` over these settings. A missing
    /// file is not an error - the settings are returned unchanged.
    pub fn read_options_from_optional_config<P: AsRef<Path>>(
        self,
        config_path: P,
    ) -> Result<Self, ConfigError> {
        let mut f = match File::open(&config_path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no config file present, using defaults");
                return Ok(self);
            }
            Err(e) => return Err(e.into()),
        };

        let mut contents = String::new();
        f.read_to_string(&mut contents)?;
        let config: ConfigInt = toml::from_str(&contents)?;

        Ok(OutpostConfig {
            idp_url: config.idp_url.unwrap_or(self.idp_url),
            service_token: config.service_token.unwrap_or(self.service_token),
            flow_slug: config.flow_slug.unwrap_or(self.flow_slug),
            app_slug: config.app_slug.unwrap_or(self.app_slug),
            base_dn: config.base_dn.unwrap_or(self.base_dn),
            search_allowed_groups: config
                .search_allowed_groups
                .map(|groups| groups.into_iter().collect())
                .unwrap_or(self.search_allowed_groups),
            bind_session_ttl: config.bind_session_ttl.unwrap_or(self.bind_session_ttl),
            ca_path: config.ca_path.or(self.ca_path),
            accept_invalid_certs: config
                .accept_invalid_certs
                .unwrap_or(self.accept_invalid_certs),
        })
    }

    /// The lifetime these settings request for cached binds.
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.bind_session_ttl)
    }

    /// Build the bind session cache these settings describe.
    pub fn to_session_cache(&self) -> Arc<BoundSessionCache> {
        BoundSessionCache::new(self.session_ttl())
    }

    /// Build the IdP client these settings describe.
    pub fn to_flow_client(&self) -> Result<FlowClient, ClientError> {
        let builder = FlowClientBuilder::new()
            .address(self.idp_url.clone())
            .service_token(self.service_token.clone())
            .danger_accept_invalid_certs(self.accept_invalid_certs);
        let builder = match &self.ca_path {
            Some(path) => builder.add_root_certificate_pem(Path::new(path))?,
            None => builder,
        };
        builder.build()
    }
}
