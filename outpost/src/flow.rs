//! The flow challenge resolver. A bind is resolved by driving the IdP's
//! flow executor to completion: fetch the pending stage's challenge, answer
//! it, inspect the result, repeat until the executor redirects (passed),
//! denies, or rejects the submitted fields.

use flowbind_proto::constants::{STAGE_ACCESS_DENIED, STAGE_IDENTIFICATION, STAGE_PASSWORD};
use flowbind_proto::v1::{ChallengeAnswer, ChallengeType};

use crate::engine::FlowEngine;
use crate::error::BindError;

/// Hard ceiling on executor round trips for a single bind. A flow that has
/// not terminated by then is assumed to be looping.
pub const MAX_FLOW_DEPTH: usize = 10;

/// Drive the flow to a terminal state. `Ok(true)` means the flow was passed,
/// `Ok(false)` is a negotiated rejection (bad credentials or a confirmed
/// denial) - only operational failures surface as `Err`.
///
/// The loop replaces the obvious recursive formulation so the depth ceiling
/// is an explicit bound rather than a stack property. `query` is the
/// correlation marker and stays constant across all round trips; flow state
/// itself lives server-side, keyed by the engine's cookie jar.
pub async fn solve_flow<E: FlowEngine>(
    engine: &E,
    flow_slug: &str,
    uid: &str,
    password: &str,
    query: &[(String, String)],
) -> Result<bool, BindError> {
    for depth in 1..=MAX_FLOW_DEPTH {
        let challenge = engine.get_challenge(flow_slug, query).await?;
        debug!(component = %challenge.component, ctype = %challenge.ctype, depth, "got challenge");

        let answer = match challenge.component.as_str() {
            STAGE_IDENTIFICATION => ChallengeAnswer::Identification {
                uid_field: uid.to_string(),
            },
            STAGE_PASSWORD => ChallengeAnswer::Password {
                password: password.to_string(),
            },
            STAGE_ACCESS_DENIED => return Ok(false),
            component => return Err(BindError::UnsupportedStage(component.to_string())),
        };

        let response = engine.submit_response(flow_slug, query, &answer).await?;
        debug!(component = %response.component, ctype = %response.ctype, depth, "got response");

        if response.component == STAGE_ACCESS_DENIED {
            return Ok(false);
        }
        if response.ctype == ChallengeType::Redirect {
            return Ok(true);
        }
        if let Some(response_errors) = &response.response_errors {
            let first = response_errors
                .iter()
                .find_map(|(field, errors)| errors.first().map(|detail| (field, detail)));
            if let Some((field, detail)) = first {
                // One rejected field is enough, no need to keep negotiating.
                debug!(%field, code = %detail.code, "{}", detail.string);
                return Ok(false);
            }
        }
    }

    Err(BindError::RecursionLimit)
}
