//! Shared constants for talking to the flow executor.

/// Stage component tag for the identification stage. The expected answer
/// carries the identifying field (username).
pub const STAGE_IDENTIFICATION: &str = "stage-identification";

/// Stage component tag for the password stage.
pub const STAGE_PASSWORD: &str = "stage-password";

/// Stage component tag the executor uses to signal a confirmed denial. This
/// can appear either as a challenge or as the response to a submission.
pub const STAGE_ACCESS_DENIED: &str = "stage-access-denied";

/// Header carrying the directory client's source address, so that failed
/// attempts are attributed to the real client rather than the outpost.
pub const HEADER_REMOTE_IP: &str = "x-outpost-remote-ip";

/// Query parameter marking executor traffic as originating from an LDAP
/// outpost. Constant across every round trip of a single flow run.
pub const QUERY_OUTPOST_LDAP: &str = "outpost_ldap";
