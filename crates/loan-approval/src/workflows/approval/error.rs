use super::analysis::AnalysisState;
use super::domain::{Money, NextStage, UnsupportedTenor};
use super::schedule::ScheduleError;
use super::store::StoreError;

/// Failures surfaced by the approval workflow. None of them is fatal: each either sends the
/// applicant back to the simulation or leaves the workflow ready for another attempt.
#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    #[error("no loan application in progress; start a new simulation")]
    MissingApplication,
    #[error("requested amount {0} must not be negative")]
    InvalidRequestedAmount(Money),
    #[error("analysis cannot {action} while {state}")]
    InvalidTransition {
        state: AnalysisState,
        action: &'static str,
    },
    #[error("analysis is already running for this application")]
    AnalysisInProgress,
    #[error("the application has not been decided yet")]
    DecisionPending,
    #[error(transparent)]
    UnsupportedTenor(#[from] UnsupportedTenor),
    #[error("select the number of installments before confirming")]
    NoSelection,
    #[error("an approval submission is already in flight")]
    SubmissionInFlight,
    #[error("the approval was already confirmed")]
    AlreadyConfirmed,
    #[error("no approval submission is awaiting a result")]
    NoSubmissionPending,
    #[error("approval could not be saved: {0}")]
    SubmissionFailed(#[source] StoreError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

impl ApprovalError {
    /// Where the host should send the applicant, when the error ends the flow.
    pub fn next_stage(&self) -> Option<NextStage> {
        match self {
            Self::MissingApplication => Some(NextStage::Simulation),
            _ => None,
        }
    }

    /// Whether calling the same operation again, unchanged, may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SubmissionFailed(_) | Self::SubmissionInFlight | Self::AnalysisInProgress
        )
    }
}
