use std::fmt;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::calculator;
use super::domain::{ApplicationId, DecisionReady, LoanApplication};
use super::error::ApprovalError;
use super::plans::InstallmentPlanGenerator;

/// Simulated underwriting time before a decision is shown.
pub const ANALYSIS_DELAY: Duration = Duration::from_millis(15_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisState {
    Idle,
    WaitingForApplication,
    Analyzing,
    Decisioned,
    Aborted,
}

impl AnalysisState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::WaitingForApplication => "waiting for application",
            Self::Analyzing => "analyzing",
            Self::Decisioned => "decisioned",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for AnalysisState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Gates the approval calculations behind a fixed, cancellable delay.
///
/// State changes are synchronous; the delay itself runs in [`PendingAnalysis::wait`] so the
/// owner does not need to stay borrowed while it elapses. Each analysis attempt gets a new
/// generation and a completion from an older generation is discarded. Dropping the simulator
/// cancels whatever is pending.
#[derive(Debug)]
pub struct AnalysisSimulator {
    state: AnalysisState,
    application_id: Option<ApplicationId>,
    generation: u64,
    cancel: Option<watch::Sender<bool>>,
    decision: Option<DecisionReady>,
}

impl Default for AnalysisSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisSimulator {
    pub fn new() -> Self {
        Self {
            state: AnalysisState::Idle,
            application_id: None,
            generation: 0,
            cancel: None,
            decision: None,
        }
    }

    pub fn state(&self) -> AnalysisState {
        self.state
    }

    pub fn application_id(&self) -> Option<&ApplicationId> {
        self.application_id.as_ref()
    }

    pub fn decision(&self) -> Option<&DecisionReady> {
        self.decision.as_ref()
    }

    /// Leave `Idle`. Without an application id the simulator aborts and the caller must
    /// redirect the applicant.
    pub fn start(&mut self, application_id: Option<ApplicationId>) -> Result<(), ApprovalError> {
        if self.state != AnalysisState::Idle {
            return Err(ApprovalError::InvalidTransition {
                state: self.state,
                action: "start",
            });
        }

        match application_id {
            Some(id) => {
                debug!(application_id = %id, "waiting for application record");
                self.application_id = Some(id);
                self.state = AnalysisState::WaitingForApplication;
                Ok(())
            }
            None => {
                warn!("analysis requested without an application");
                self.state = AnalysisState::Aborted;
                Err(ApprovalError::MissingApplication)
            }
        }
    }

    /// Begin the delay once the record for the current id is loaded.
    ///
    /// Returns `Ok(None)` when the record belongs to another application; the simulator keeps
    /// waiting in that case.
    pub fn begin(
        &mut self,
        application: LoanApplication,
    ) -> Result<Option<PendingAnalysis>, ApprovalError> {
        if self.state != AnalysisState::WaitingForApplication {
            return Err(ApprovalError::InvalidTransition {
                state: self.state,
                action: "begin analysis",
            });
        }
        if self.application_id.as_ref() != Some(&application.id) {
            debug!(loaded = %application.id, "ignoring record for another application");
            return Ok(None);
        }
        if application.requested_amount < Decimal::ZERO {
            return Err(ApprovalError::InvalidRequestedAmount(
                application.requested_amount,
            ));
        }

        self.generation += 1;
        let (cancel, cancelled) = watch::channel(false);
        self.cancel = Some(cancel);
        self.state = AnalysisState::Analyzing;
        info!(
            application_id = %application.id,
            generation = self.generation,
            delay_ms = ANALYSIS_DELAY.as_millis() as u64,
            "analysis started"
        );

        Ok(Some(PendingAnalysis {
            generation: self.generation,
            application,
            cancelled,
        }))
    }

    /// Turn an elapsed delay into a decision. Runs the amount calculation and plan generation
    /// exactly once; stale or cancelled attempts yield `None`.
    pub fn complete(
        &mut self,
        elapsed: ElapsedAnalysis,
        generator: &InstallmentPlanGenerator,
    ) -> Result<Option<DecisionReady>, ApprovalError> {
        if self.state != AnalysisState::Analyzing || elapsed.generation != self.generation {
            debug!(
                generation = elapsed.generation,
                current = self.generation,
                "discarding superseded analysis"
            );
            return Ok(None);
        }

        let application = elapsed.application;
        let decision = calculator::decide(application.requested_amount).ok_or(
            ApprovalError::InvalidRequestedAmount(application.requested_amount),
        )?;
        let options = generator.generate(decision.approved_amount());

        let ready = DecisionReady {
            application,
            decision,
            options,
        };

        self.cancel = None;
        self.state = AnalysisState::Decisioned;
        self.decision = Some(ready.clone());
        info!(
            application_id = %ready.application.id,
            approved_amount = %decision.approved_amount(),
            "application decisioned"
        );

        Ok(Some(ready))
    }

    /// Cancel a running delay. Returns whether anything was pending.
    pub fn cancel(&mut self) -> bool {
        if self.state != AnalysisState::Analyzing {
            return false;
        }

        if let Some(cancel) = self.cancel.take() {
            cancel.send_replace(true);
        }
        self.state = AnalysisState::WaitingForApplication;
        info!(generation = self.generation, "analysis cancelled");
        true
    }

    /// Follow a change of the current application id, dropping any pending or finished
    /// analysis for the previous one.
    pub fn change_application(
        &mut self,
        application_id: Option<ApplicationId>,
    ) -> Result<(), ApprovalError> {
        let unchanged = self.application_id == application_id
            && !matches!(self.state, AnalysisState::Idle | AnalysisState::Aborted);
        if unchanged {
            return Ok(());
        }

        self.reset();
        self.start(application_id)
    }

    /// Return to `Idle`, cancelling anything pending.
    pub fn reset(&mut self) {
        self.cancel();
        self.cancel = None;
        self.application_id = None;
        self.decision = None;
        self.state = AnalysisState::Idle;
    }
}

/// A started analysis whose delay has not elapsed yet.
#[derive(Debug)]
pub struct PendingAnalysis {
    generation: u64,
    application: LoanApplication,
    cancelled: watch::Receiver<bool>,
}

impl PendingAnalysis {
    pub fn application(&self) -> &LoanApplication {
        &self.application
    }

    /// Sleep for [`ANALYSIS_DELAY`] unless cancelled first.
    pub async fn wait(self) -> AnalysisWait {
        let PendingAnalysis {
            generation,
            application,
            cancelled,
        } = self;

        tokio::select! {
            biased;
            _ = cancellation(cancelled) => AnalysisWait::Cancelled,
            _ = tokio::time::sleep(ANALYSIS_DELAY) => AnalysisWait::Elapsed(ElapsedAnalysis {
                generation,
                application,
            }),
        }
    }
}

// Resolves on cancellation or once the simulator that issued the receiver is gone.
async fn cancellation(mut cancelled: watch::Receiver<bool>) {
    let _ = cancelled.wait_for(|cancelled| *cancelled).await;
}

#[derive(Debug)]
pub enum AnalysisWait {
    Elapsed(ElapsedAnalysis),
    Cancelled,
}

/// Proof that the delay for one generation ran to completion.
#[derive(Debug)]
pub struct ElapsedAnalysis {
    generation: u64,
    application: LoanApplication,
}
