//! Decision workflow that turns a submitted loan request into an approved,
//! installment-scheduled offer.
//!
//! The calculation core lives in [`workflows::approval`]; the remaining modules carry the
//! process-level concerns (configuration, logging, error mapping) shared with the API service.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
