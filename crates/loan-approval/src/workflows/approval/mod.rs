//! Loan approval decision workflow.
//!
//! Once an application is loaded, a simulated analysis runs for a fixed delay. The approved
//! amount and the four installment plans are then derived from the request. The applicant
//! picks a plan, which yields a payment schedule, and confirms it, which hands the offer to
//! the external application store.

pub mod analysis;
pub mod calculator;
pub mod domain;
mod error;
pub mod machine;
pub mod plans;
pub mod rates;
pub mod router;
pub mod schedule;
pub mod service;
pub mod store;
pub mod views;

#[cfg(test)]
mod tests;

pub use analysis::{AnalysisSimulator, AnalysisState, ANALYSIS_DELAY};
pub use calculator::approve;
pub use domain::{
    ApplicationId, ApplicationStatus, ApprovalDecision, ApprovalSubmission, ConfirmedApproval,
    DecisionReady, InstallmentOption, LoanApplication, Money, NextStage, PaymentSchedule,
    PaymentScheduleEntry, Rate, Tenor, UnsupportedTenor,
};
pub use error::ApprovalError;
pub use machine::{ApprovalState, ApprovalStateMachine, Selection};
pub use plans::InstallmentPlanGenerator;
pub use rates::{RateEntry, RateTable, RateTableError};
pub use router::approval_router;
pub use service::{AnalysisProgress, ApprovalService};
pub use store::{ApplicationStore, StoreError};
pub use views::{DecisionView, ScheduleView, SessionView};
