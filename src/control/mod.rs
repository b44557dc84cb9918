//! Daemon control & configuration safety layer
//!
//! Handles:
//! - Atomic replacement of the canonical dnsmasq configuration
//! - Dry-run syntax checks in request-scoped scratch files
//! - Restarting dnsmasq as a systemd unit or as a container
//! - Bounded status probes that degrade instead of hanging
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                 ControlService                │
//! ├───────────────────────────────────────────────┤
//! │ ConfigStore │ SyntaxValidator  │ StatusProbe  │
//! │  (atomic)   │ (dnsmasq --test) │ (bounded)    │
//! ├───────────────────────────────────────────────┤
//! │        RestartBackend (fixed at start)        │
//! │  HostProcess (systemctl) │ RemoteContainer    │
//! │                          │ (runtime socket)   │
//! └───────────────────────────────────────────────┘
//! ```

pub mod activity;
pub mod backend;
pub mod executor;
pub mod leases;
pub mod probe;
pub mod protocol;
pub mod runtime;
pub mod service;
pub mod store;
pub mod validator;

#[cfg(all(test, unix))]
pub(crate) mod test_support;

pub use backend::{RestartBackend, Restarter};
pub use executor::CommandExecutor;
pub use leases::Lease;
pub use probe::{DaemonProbe, StatusProbe};
pub use protocol::{OperationResult, StatusResponse, StatusSnapshot, ValidationResult};
pub use service::ControlService;
pub use store::ConfigStore;
pub use validator::{DaemonSyntaxValidator, SyntaxValidator};
