//! The bind engine of the LDAP outpost. The directory protocol layer hands a
//! bind (dn + password + connection peer) to [`bind::LdapBindHandler`], which
//! resolves it against the remote IdP's flow executor instead of validating
//! anything locally. Successful binds are remembered for a short window in
//! the [`cache::BoundSessionCache`] so that the follow-up searches a
//! directory client issues can be authorised without another flow run.
//!
//! Nothing in this crate knows the LDAP wire format beyond the bind DN
//! string and the result code handed back to the protocol layer.

#![deny(warnings)]
#![warn(unused_extern_crates)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::await_holding_lock)]

#[macro_use]
extern crate tracing;

pub mod access;
pub mod bind;
pub mod cache;
pub mod config;
pub mod dn;
pub mod engine;
pub mod error;
pub mod flow;

#[cfg(test)]
pub(crate) mod testkit;

pub use crate::bind::LdapBindHandler;
pub use crate::cache::{BoundSession, BoundSessionCache};
pub use crate::config::OutpostConfig;
pub use crate::engine::{EngineProvider, FlowClientProvider, FlowEngine};
pub use crate::error::BindError;
