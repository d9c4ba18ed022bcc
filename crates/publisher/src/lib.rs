//! Publication coordination engine.
//!
//! [`Coordinator::publish`] screens every channel with the
//! [`ChannelValidator`], aborts the whole batch if any channel is invalid,
//! otherwise delivers to each channel independently through the
//! [`DeliveryExecutor`] and returns a [`Report`]. Persisting the report is
//! the caller's job.

pub mod coordinator;
pub mod error;
pub mod executor;
pub mod report;
pub mod validator;

#[cfg(test)]
mod mock;

pub use {
    coordinator::{Coordinator, CoordinatorConfig},
    error::{Error, Result},
    executor::DeliveryExecutor,
    report::{ChannelFailure, Report, ReportStatus},
    validator::{ChannelValidator, ValidationOutcome},
};
