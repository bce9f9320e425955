//! Wire types exchanged with the remote flow-based IdP. These are the JSON
//! bodies the flow executor issues and accepts, plus the identity records the
//! IdP returns once a flow has been passed. Nothing in here is persisted.

#![deny(warnings)]
#![warn(unused_extern_crates)]

pub mod constants;
pub mod v1;
