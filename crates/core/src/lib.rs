//! `paydesk-core`: shared building blocks for the dashboard session layer.
//!
//! This crate has no I/O: identifiers, the domain error model and the
//! state-machine contract used by the session protocols.

pub mod error;
pub mod id;
pub mod machine;

pub use error::{DomainError, DomainResult};
pub use id::{OpaqueId, UserId, VendorId};
pub use machine::StateMachine;
