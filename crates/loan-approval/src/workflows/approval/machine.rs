use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{
    ApplicationId, ApplicationStatus, ApprovalSubmission, ConfirmedApproval, DecisionReady,
    InstallmentOption, NextStage, PaymentSchedule, Tenor, UnsupportedTenor,
};
use super::error::ApprovalError;
use super::plans::total_with_interest;
use super::schedule;
use super::store::{ApplicationStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    NoSelection,
    Selected,
    Submitting,
    Confirmed,
}

impl ApprovalState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NoSelection => "No selection",
            Self::Selected => "Selected",
            Self::Submitting => "Submitting",
            Self::Confirmed => "Confirmed",
        }
    }
}

/// The chosen plan together with the payment calendar built for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub option: InstallmentOption,
    pub schedule: PaymentSchedule,
}

/// Tracks the applicant's plan choice and hands the accepted offer to the store.
///
/// At most one submission is outstanding: while `Submitting`, both selecting and confirming
/// are refused. A failed submission returns to `Selected` so the applicant can retry.
#[derive(Debug, Clone)]
pub struct ApprovalStateMachine {
    ready: DecisionReady,
    state: ApprovalState,
    selection: Option<Selection>,
    confirmed: Option<ConfirmedApproval>,
}

impl ApprovalStateMachine {
    pub fn new(ready: DecisionReady) -> Self {
        Self {
            ready,
            state: ApprovalState::NoSelection,
            selection: None,
            confirmed: None,
        }
    }

    pub fn state(&self) -> ApprovalState {
        self.state
    }

    pub fn decision(&self) -> &DecisionReady {
        &self.ready
    }

    pub fn application_id(&self) -> &ApplicationId {
        &self.ready.application.id
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn confirmed(&self) -> Option<&ConfirmedApproval> {
        self.confirmed.as_ref()
    }

    /// Choose a plan and rebuild its schedule from `start`. Any earlier selection and schedule
    /// are replaced as a whole.
    pub fn select_tenor(
        &mut self,
        tenor: Tenor,
        start: NaiveDate,
    ) -> Result<&Selection, ApprovalError> {
        match self.state {
            ApprovalState::Submitting => return Err(ApprovalError::SubmissionInFlight),
            ApprovalState::Confirmed => return Err(ApprovalError::AlreadyConfirmed),
            ApprovalState::NoSelection | ApprovalState::Selected => {}
        }

        let option = *self
            .ready
            .option(tenor)
            .ok_or(UnsupportedTenor(tenor.months()))?;
        let schedule = schedule::generate(&option, start)?;

        info!(
            application_id = %self.ready.application.id,
            tenor = tenor.months(),
            monthly_payment = %option.monthly_payment,
            "installment plan selected"
        );

        self.state = ApprovalState::Selected;
        Ok(&*self.selection.insert(Selection { option, schedule }))
    }

    /// Build the submission for the current selection and enter `Submitting`.
    ///
    /// `store_loading` is the store's own in-flight flag; a busy store is treated the same as
    /// a local submission in flight.
    pub fn begin_confirmation(
        &mut self,
        store_loading: bool,
    ) -> Result<ApprovalSubmission, ApprovalError> {
        match self.state {
            ApprovalState::Submitting => return Err(ApprovalError::SubmissionInFlight),
            ApprovalState::Confirmed => return Err(ApprovalError::AlreadyConfirmed),
            ApprovalState::NoSelection | ApprovalState::Selected => {}
        }
        if store_loading {
            return Err(ApprovalError::SubmissionInFlight);
        }

        let option = self
            .selection
            .as_ref()
            .map(|selection| selection.option)
            .ok_or(ApprovalError::NoSelection)?;
        let approved_amount = self.ready.decision.approved_amount();

        let submission = ApprovalSubmission {
            approved_amount,
            selected_tenor: option.tenor,
            monthly_payment: option.monthly_payment,
            interest_rate: option.rate,
            total_with_interest: total_with_interest(approved_amount, option.rate),
            status: ApplicationStatus::Approved,
        };

        self.state = ApprovalState::Submitting;
        Ok(submission)
    }

    /// Settle the submission started by [`begin_confirmation`](Self::begin_confirmation).
    pub fn finish_confirmation(
        &mut self,
        submission: ApprovalSubmission,
        outcome: Result<(), StoreError>,
    ) -> Result<ConfirmedApproval, ApprovalError> {
        if self.state != ApprovalState::Submitting {
            return Err(ApprovalError::NoSubmissionPending);
        }

        match outcome {
            Ok(()) => {
                let confirmed = ConfirmedApproval {
                    application_id: self.ready.application.id.clone(),
                    submission,
                    next_stage: NextStage::Documents,
                };
                info!(
                    application_id = %confirmed.application_id,
                    tenor = confirmed.submission.selected_tenor.months(),
                    "approval confirmed"
                );
                self.state = ApprovalState::Confirmed;
                self.confirmed = Some(confirmed.clone());
                Ok(confirmed)
            }
            Err(err) => {
                warn!(
                    application_id = %self.ready.application.id,
                    error = %err,
                    "approval submission failed"
                );
                self.state = ApprovalState::Selected;
                Err(ApprovalError::SubmissionFailed(err))
            }
        }
    }

    /// Submit the current selection and wait for the store, for callers that own the machine
    /// for the whole call.
    pub async fn confirm<S>(&mut self, store: &S) -> Result<ConfirmedApproval, ApprovalError>
    where
        S: ApplicationStore + ?Sized,
    {
        let submission = self.begin_confirmation(store.is_loading())?;
        let mut pending = PendingSubmission {
            machine: self,
            settled: false,
        };
        let outcome = store.update(&submission).await;
        pending.settle(submission, outcome)
    }

    /// Give up on a submission nobody will settle, returning to `Selected`.
    pub fn abandon_submission(&mut self) -> bool {
        if self.state != ApprovalState::Submitting {
            return false;
        }

        warn!(
            application_id = %self.ready.application.id,
            "approval submission abandoned before the store answered"
        );
        self.state = ApprovalState::Selected;
        true
    }
}

// Returns the machine to `Selected` if the confirming future is dropped mid-update.
struct PendingSubmission<'a> {
    machine: &'a mut ApprovalStateMachine,
    settled: bool,
}

impl PendingSubmission<'_> {
    fn settle(
        &mut self,
        submission: ApprovalSubmission,
        outcome: Result<(), StoreError>,
    ) -> Result<ConfirmedApproval, ApprovalError> {
        self.settled = true;
        self.machine.finish_confirmation(submission, outcome)
    }
}

impl Drop for PendingSubmission<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.machine.abandon_submission();
        }
    }
}
