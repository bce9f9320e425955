use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The delivery type of a challenge or of the executor's reply to a
/// submission. `Redirect` marks the flow as complete.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeType {
    Native,
    Shell,
    Redirect,
}

impl fmt::Display for ChallengeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChallengeType::Native => write!(f, "native"),
            ChallengeType::Shell => write!(f, "shell"),
            ChallengeType::Redirect => write!(f, "redirect"),
        }
    }
}

/// A challenge issued by the currently pending stage of a flow.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Challenge {
    /// Tag of the stage that issued this challenge.
    pub component: String,
    #[serde(rename = "type")]
    pub ctype: ChallengeType,
    /// Redirect challenges carry the destination here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

/// A single field-level validation error attached to a submission result.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorDetail {
    pub code: String,
    pub string: String,
}

/// What the executor returns after a challenge answer is submitted. When the
/// submission was rejected, `response_errors` carries the per-field reasons.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChallengeResponse {
    pub component: String,
    #[serde(rename = "type")]
    pub ctype: ChallengeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_errors: Option<BTreeMap<String, Vec<ErrorDetail>>>,
}

/// The typed answer to a stage challenge. Serialized as the bare field set
/// the respective stage expects.
#[derive(Debug, Serialize, Clone)]
#[serde(untagged)]
pub enum ChallengeAnswer {
    Identification { uid_field: String },
    Password { password: String },
}

/// A group membership of a remote identity.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FlowGroup {
    pub pk: Uuid,
    pub name: String,
}

/// The identity record the IdP holds for an authenticated session. Immutable
/// once fetched.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FlowUser {
    pub pk: u64,
    pub username: String,
    pub name: String,
    pub groups: Vec<FlowGroup>,
}

/// Response to a "who am I" request against the bound session.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WhoamiResponse {
    pub user: FlowUser,
}
