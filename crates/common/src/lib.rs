//! Shared domain model, status derivation, and error definitions used across
//! all reshare crates.

pub mod error;
pub mod status;
pub mod types;

pub use {
    error::{Error, Result},
    status::{EventPublicationStatus, derive_status},
    types::{Channel, Event, Publication, PublicationStatus},
};
