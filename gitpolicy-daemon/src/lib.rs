//! Background service supervision and the periodic sync worker.
//!
//! [`lifecycle`] starts, stops and queries the service through the host's
//! service manager; [`worker`] is the loop that runs inside it.

mod error;
pub mod launchd;
pub mod lifecycle;
pub mod paths;
mod runtime;
pub mod windows;
pub mod worker;

pub use error::DaemonError;
pub use lifecycle::{
    DaemonController, DaemonIdentity, DaemonState, LifecycleOutcome, PlatformHandle,
    ServiceBackend, ServiceManager,
};
pub use runtime::{init_tracing, run, start_blocking};
pub use worker::{SyncWorker, DEFAULT_INTERVAL};
