use flowbind_client::ClientError;
use thiserror::Error;

/// Operational failures of the bind pipeline. Every variant maps to
/// `LdapResultCode::OperationsError` at the protocol boundary - rejected
/// credentials and denied access are results, not errors, and never appear
/// here.
#[derive(Debug, Error)]
pub enum BindError {
    /// The bind DN is not scoped under the configured base DN. The protocol
    /// layer should never have routed this bind to us.
    #[error("bind dn is outside the configured base dn")]
    InvalidBase,
    #[error("malformed bind dn: {0}")]
    MalformedDn(String),
    #[error("no cn attribute present in bind dn")]
    MissingCn,
    /// The executor presented a stage this outpost has no answer for. This
    /// is a flow configuration or version mismatch, not a credential
    /// failure.
    #[error("unsupported flow stage: {0}")]
    UnsupportedStage(String),
    #[error("exceeded stage recursion depth")]
    RecursionLimit,
    #[error("remote communication failure: {0}")]
    Transport(#[from] ClientError),
}
