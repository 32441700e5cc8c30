//! # gitpolicy-sync
//!
//! Fetches the client's profile and policies from the policy authority and
//! applies them as git configuration.
//!
//! Call [`pipeline::run`] with a [`Git`](gitpolicy_core::Git) handle and a
//! [`PolicyApi`] implementation; [`HttpPolicyApi`] is the real one.

pub mod api;
pub mod error;
pub mod identity;
pub mod paths;
pub mod pipeline;

pub use api::{HttpPolicyApi, PolicyApi};
pub use error::SyncError;
pub use identity::ClientIdentity;
pub use pipeline::SyncReport;
