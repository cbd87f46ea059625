use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Monetary amounts. Full precision is kept internally; rounding happens in the views.
pub type Money = Decimal;

/// Interest rates as fractions (0.07 = 7%).
pub type Rate = Decimal;

/// Identifier of a loan application held by the external store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Loan request as loaded from the external store. Read-only to the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub id: ApplicationId,
    pub requested_amount: Money,
    pub applicant_name: String,
}

impl LoanApplication {
    /// First word of the applicant's name, used when greeting the applicant.
    pub fn first_name(&self) -> &str {
        self.applicant_name.split_whitespace().next().unwrap_or("")
    }
}

/// Supported installment counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Tenor {
    Three,
    Six,
    Nine,
    Twelve,
}

impl Tenor {
    /// Every supported tenor, shortest first.
    pub const ALL: [Tenor; 4] = [Tenor::Three, Tenor::Six, Tenor::Nine, Tenor::Twelve];

    pub const fn months(self) -> u32 {
        match self {
            Self::Three => 3,
            Self::Six => 6,
            Self::Nine => 9,
            Self::Twelve => 12,
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Three => 0,
            Self::Six => 1,
            Self::Nine => 2,
            Self::Twelve => 3,
        }
    }

    pub fn from_months(months: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|tenor| tenor.months() == months)
    }
}

impl fmt::Display for Tenor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.months())
    }
}

impl TryFrom<u32> for Tenor {
    type Error = UnsupportedTenor;

    fn try_from(months: u32) -> Result<Self, Self::Error> {
        Self::from_months(months).ok_or(UnsupportedTenor(months))
    }
}

impl From<Tenor> for u32 {
    fn from(tenor: Tenor) -> Self {
        tenor.months()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{0} installments is not an offered tenor (expected 3, 6, 9 or 12)")]
pub struct UnsupportedTenor(pub u32);

/// Amount approved for an application. Created once per decision and never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApprovalDecision {
    approved_amount: Money,
}

impl ApprovalDecision {
    pub(crate) fn new(approved_amount: Money) -> Self {
        Self { approved_amount }
    }

    pub fn approved_amount(&self) -> Money {
        self.approved_amount
    }
}

/// One selectable plan: simple add-on interest spread evenly across the tenor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InstallmentOption {
    pub tenor: Tenor,
    pub rate: Rate,
    pub total_with_interest: Money,
    pub monthly_payment: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentScheduleEntry {
    pub installment_number: u32,
    pub due_date: NaiveDate,
    pub amount: Money,
}

/// Flat payment calendar for one selected option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentSchedule {
    pub tenor: Tenor,
    pub start_date: NaiveDate,
    pub entries: Vec<PaymentScheduleEntry>,
}

impl PaymentSchedule {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> Money {
        self.entries.iter().map(|entry| entry.amount).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Approved,
}

/// Payload handed to the external store when the applicant accepts an offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalSubmission {
    pub approved_amount: Money,
    #[serde(rename = "installments_option")]
    pub selected_tenor: Tenor,
    pub monthly_payment: Money,
    pub interest_rate: Rate,
    pub total_with_interest: Money,
    pub status: ApplicationStatus,
}

/// Workflow stage the host should move the applicant to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NextStage {
    /// Start over from the loan simulation.
    Simulation,
    /// Continue to document upload.
    Documents,
}

/// Emitted once analysis finishes: the approved amount plus the four selectable plans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionReady {
    pub application: LoanApplication,
    pub decision: ApprovalDecision,
    pub options: Vec<InstallmentOption>,
}

impl DecisionReady {
    pub fn option(&self, tenor: Tenor) -> Option<&InstallmentOption> {
        self.options.iter().find(|option| option.tenor == tenor)
    }
}

/// Emitted after the store accepted the submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmedApproval {
    pub application_id: ApplicationId,
    pub submission: ApprovalSubmission,
    pub next_stage: NextStage,
}
