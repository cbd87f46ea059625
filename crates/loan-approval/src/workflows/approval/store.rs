use async_trait::async_trait;

use super::domain::{ApplicationId, ApprovalSubmission, LoanApplication};

/// Application context owned outside the workflow.
///
/// The workflow only reads the current application, pushes the final decision through
/// [`update`](ApplicationStore::update) and asks for the record to be cleared when the
/// applicant walks away. `is_loading` reports an update that is still in flight.
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    fn application_id(&self) -> Option<ApplicationId>;
    fn application_data(&self) -> Option<LoanApplication>;
    async fn update(&self, submission: &ApprovalSubmission) -> Result<(), StoreError>;
    fn clear(&self);
    fn is_loading(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error("application store rejected the update: {0}")]
    Rejected(String),
    #[error("application store unavailable: {0}")]
    Unavailable(String),
}
