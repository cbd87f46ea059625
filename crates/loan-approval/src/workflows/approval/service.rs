use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::analysis::{AnalysisSimulator, AnalysisState, AnalysisWait, PendingAnalysis};
use super::domain::{
    ApplicationId, ApprovalSubmission, ConfirmedApproval, DecisionReady, NextStage, Tenor,
};
use super::error::ApprovalError;
use super::machine::{ApprovalState, ApprovalStateMachine, Selection};
use super::plans::InstallmentPlanGenerator;
use super::rates::{RateTable, RateTableError};
use super::store::{ApplicationStore, StoreError};
use super::views::SessionView;

/// Result of asking for a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisProgress {
    /// The application id is known but its record has not been loaded yet.
    WaitingForApplication,
    /// The delay was interrupted by teardown or an application change.
    Cancelled,
    Decisioned(DecisionReady),
}

#[derive(Debug, Default)]
struct ApprovalSession {
    analysis: AnalysisSimulator,
    approval: Option<ApprovalStateMachine>,
}

impl ApprovalSession {
    /// Line the simulator up with the store's current application id.
    fn sync_application(&mut self, current: Option<ApplicationId>) -> Result<(), ApprovalError> {
        match self.analysis.state() {
            AnalysisState::Idle => self.analysis.start(current),
            AnalysisState::Aborted if current.is_none() => Err(ApprovalError::MissingApplication),
            _ if self.analysis.application_id() == current.as_ref() => Ok(()),
            _ => {
                if let Some(machine) = &self.approval {
                    info!(
                        previous = %machine.application_id(),
                        "application changed; discarding decision"
                    );
                }
                self.approval = None;
                self.analysis.change_application(current)
            }
        }
    }
}

/// Single-application approval workflow bound to an external application store.
///
/// The session lock is never held across the analysis delay or the store update, so the
/// in-flight guard is what serialises selection and confirmation. The delay and the update
/// run in their own tasks and settle the session even when the caller stops waiting.
pub struct ApprovalService<S> {
    store: Arc<S>,
    generator: InstallmentPlanGenerator,
    session: Arc<Mutex<ApprovalSession>>,
}

impl<S> ApprovalService<S>
where
    S: ApplicationStore + 'static,
{
    /// Validates the rate table before accepting work.
    pub fn new(store: Arc<S>, rates: RateTable) -> Result<Self, RateTableError> {
        rates.validate()?;
        Ok(Self {
            store,
            generator: InstallmentPlanGenerator::new(rates),
            session: Arc::new(Mutex::new(ApprovalSession::default())),
        })
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn session(&self) -> MutexGuard<'_, ApprovalSession> {
        lock(&self.session)
    }

    /// Run the simulated analysis for the store's current application.
    ///
    /// Resolves after [`ANALYSIS_DELAY`](super::analysis::ANALYSIS_DELAY) with the decision,
    /// or earlier when the record is not loaded yet or the analysis gets cancelled. A decided
    /// application returns its existing decision without recalculating.
    pub async fn analyze(&self) -> Result<AnalysisProgress, ApprovalError> {
        let pending = {
            let mut session = self.session();
            session.sync_application(self.store.application_id())?;

            match session.analysis.state() {
                AnalysisState::WaitingForApplication => {}
                AnalysisState::Analyzing => return Err(ApprovalError::AnalysisInProgress),
                AnalysisState::Decisioned => {
                    return session
                        .analysis
                        .decision()
                        .cloned()
                        .map(AnalysisProgress::Decisioned)
                        .ok_or(ApprovalError::DecisionPending);
                }
                AnalysisState::Idle | AnalysisState::Aborted => {
                    return Err(ApprovalError::MissingApplication)
                }
            }

            let Some(application) = self.store.application_data() else {
                return Ok(AnalysisProgress::WaitingForApplication);
            };
            match session.analysis.begin(application)? {
                Some(pending) => pending,
                None => return Ok(AnalysisProgress::WaitingForApplication),
            }
        };

        let task = tokio::spawn(run_analysis(
            self.session.clone(),
            self.generator.clone(),
            pending,
        ));
        join(task).await.unwrap_or(Ok(AnalysisProgress::Cancelled))
    }

    /// Re-read the store's application id; a change cancels any pending analysis and drops
    /// the previous decision.
    pub fn refresh_application(&self) -> Result<(), ApprovalError> {
        self.session().sync_application(self.store.application_id())
    }

    pub fn select_tenor(&self, tenor: Tenor, start: NaiveDate) -> Result<Selection, ApprovalError> {
        let mut session = self.session();
        let machine = session
            .approval
            .as_mut()
            .ok_or(ApprovalError::DecisionPending)?;
        if self.store.is_loading() {
            return Err(ApprovalError::SubmissionInFlight);
        }
        machine.select_tenor(tenor, start).cloned()
    }

    /// Submit the selected plan to the store. On failure the selection is kept so the
    /// caller can confirm again.
    pub async fn confirm(&self) -> Result<ConfirmedApproval, ApprovalError> {
        let (application_id, submission) = {
            let mut session = self.session();
            let machine = session
                .approval
                .as_mut()
                .ok_or(ApprovalError::DecisionPending)?;
            let submission = machine.begin_confirmation(self.store.is_loading())?;
            (machine.application_id().clone(), submission)
        };

        let task = tokio::spawn(settle_submission(
            self.store.clone(),
            self.session.clone(),
            application_id,
            submission,
        ));
        join(task).await.unwrap_or_else(|| {
            Err(ApprovalError::SubmissionFailed(StoreError::Unavailable(
                "submission task was cancelled".to_string(),
            )))
        })
    }

    /// The host went away: stop any pending analysis. Submissions already in flight finish
    /// on their own.
    pub fn teardown(&self) {
        self.session().analysis.cancel();
    }

    /// The applicant walked away from the offer.
    pub fn abandon(&self) -> NextStage {
        {
            let mut session = self.session();
            session.analysis.reset();
            session.approval = None;
        }
        self.store.clear();
        info!("approval flow abandoned");
        NextStage::Simulation
    }

    pub fn snapshot(&self) -> SessionView {
        let session = self.session();
        SessionView::new(
            session.analysis.state(),
            session.approval.as_ref(),
            self.store.is_loading(),
        )
    }
}

impl<S> Drop for ApprovalService<S> {
    fn drop(&mut self) {
        lock(&self.session).analysis.cancel();
    }
}

// Statements under the lock leave the session consistent, so a poisoned lock is still usable.
fn lock(session: &Mutex<ApprovalSession>) -> MutexGuard<'_, ApprovalSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Waits for a workflow task; `None` when the runtime cancelled it.
async fn join<T>(task: JoinHandle<T>) -> Option<T> {
    match task.await {
        Ok(value) => Some(value),
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(_) => None,
    }
}

async fn run_analysis(
    session: Arc<Mutex<ApprovalSession>>,
    generator: InstallmentPlanGenerator,
    pending: PendingAnalysis,
) -> Result<AnalysisProgress, ApprovalError> {
    let elapsed = match pending.wait().await {
        AnalysisWait::Elapsed(elapsed) => elapsed,
        AnalysisWait::Cancelled => return Ok(AnalysisProgress::Cancelled),
    };

    let mut session = lock(&session);
    match session.analysis.complete(elapsed, &generator)? {
        Some(ready) => {
            session.approval = Some(ApprovalStateMachine::new(ready.clone()));
            Ok(AnalysisProgress::Decisioned(ready))
        }
        None => Ok(AnalysisProgress::Cancelled),
    }
}

async fn settle_submission<S>(
    store: Arc<S>,
    session: Arc<Mutex<ApprovalSession>>,
    application_id: ApplicationId,
    submission: ApprovalSubmission,
) -> Result<ConfirmedApproval, ApprovalError>
where
    S: ApplicationStore + 'static,
{
    let outcome = store.update(&submission).await;

    let mut session = lock(&session);
    match session.approval.as_mut() {
        Some(machine)
            if machine.state() == ApprovalState::Submitting
                && machine.application_id() == &application_id =>
        {
            machine.finish_confirmation(submission, outcome)
        }
        _ => {
            warn!(
                application_id = %application_id,
                "session reset while the approval was being saved"
            );
            outcome
                .map(|()| ConfirmedApproval {
                    application_id,
                    submission,
                    next_stage: NextStage::Documents,
                })
                .map_err(ApprovalError::SubmissionFailed)
        }
    }
}
