use async_trait::async_trait;
use chrono::NaiveDate;
use loan_approval::workflows::approval::{
    ApplicationId, ApplicationStore, ApprovalSubmission, LoanApplication, StoreError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

/// Application context kept in process memory, standing in for the real application store.
#[derive(Default)]
pub(crate) struct InMemoryApplicationStore {
    current: Mutex<Option<ApplicationId>>,
    applications: Mutex<HashMap<ApplicationId, LoanApplication>>,
    approvals: Mutex<HashMap<ApplicationId, ApprovalSubmission>>,
    loading: AtomicBool,
    reject_updates: AtomicBool,
}

impl InMemoryApplicationStore {
    /// Register an application and make it the current one.
    pub(crate) fn open(&self, application: LoanApplication) {
        let id = application.id.clone();
        self.applications
            .lock()
            .expect("store mutex poisoned")
            .insert(id.clone(), application);
        *self.current.lock().expect("store mutex poisoned") = Some(id);
    }

    pub(crate) fn approval(&self, id: &ApplicationId) -> Option<ApprovalSubmission> {
        self.approvals
            .lock()
            .expect("store mutex poisoned")
            .get(id)
            .cloned()
    }

    pub(crate) fn reject_updates(&self, reject: bool) {
        self.reject_updates.store(reject, Ordering::Relaxed);
    }
}

#[async_trait]
impl ApplicationStore for InMemoryApplicationStore {
    fn application_id(&self) -> Option<ApplicationId> {
        self.current.lock().expect("store mutex poisoned").clone()
    }

    fn application_data(&self) -> Option<LoanApplication> {
        let id = self.application_id()?;
        self.applications
            .lock()
            .expect("store mutex poisoned")
            .get(&id)
            .cloned()
    }

    async fn update(&self, submission: &ApprovalSubmission) -> Result<(), StoreError> {
        let id = self
            .application_id()
            .ok_or_else(|| StoreError::Rejected("no current application".to_string()))?;

        self.loading.store(true, Ordering::Release);
        let result = if self.reject_updates.load(Ordering::Relaxed) {
            Err(StoreError::Unavailable("updates are disabled".to_string()))
        } else if !self
            .applications
            .lock()
            .expect("store mutex poisoned")
            .contains_key(&id)
        {
            Err(StoreError::NotFound(id.clone()))
        } else {
            self.approvals
                .lock()
                .expect("store mutex poisoned")
                .insert(id.clone(), submission.clone());
            info!(application_id = %id, "approval stored");
            Ok(())
        };
        self.loading.store(false, Ordering::Release);

        result
    }

    fn clear(&self) {
        *self.current.lock().expect("store mutex poisoned") = None;
    }

    fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
