use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use tokio::sync::Notify;

use crate::workflows::approval::domain::{
    ApplicationId, ApprovalDecision, ApprovalSubmission, DecisionReady, LoanApplication,
};
use crate::workflows::approval::machine::ApprovalStateMachine;
use crate::workflows::approval::rates::RateTable;
use crate::workflows::approval::service::ApprovalService;
use crate::workflows::approval::store::{ApplicationStore, StoreError};
use crate::workflows::approval::{approve, InstallmentPlanGenerator};

pub(super) fn application_id(suffix: &str) -> ApplicationId {
    ApplicationId(format!("app-{suffix}"))
}

pub(super) fn application(suffix: &str, requested_amount: Decimal) -> LoanApplication {
    LoanApplication {
        id: application_id(suffix),
        requested_amount,
        applicant_name: "Maria Aparecida Souza".to_string(),
    }
}

pub(super) fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 15).expect("valid date")
}

/// Decision built directly from the calculators, skipping the analysis delay.
pub(super) fn decided(requested_amount: Decimal) -> DecisionReady {
    let application = application("decided", requested_amount);
    let approved = approve(requested_amount);
    DecisionReady {
        application,
        decision: ApprovalDecision::new(approved),
        options: InstallmentPlanGenerator::default().generate(approved),
    }
}

pub(super) fn machine(requested_amount: Decimal) -> ApprovalStateMachine {
    ApprovalStateMachine::new(decided(requested_amount))
}

/// Application store fake that records every submission.
#[derive(Default)]
pub(super) struct MemoryStore {
    application_id: Mutex<Option<ApplicationId>>,
    application: Mutex<Option<LoanApplication>>,
    updates: Mutex<Vec<ApprovalSubmission>>,
    next_failure: Mutex<Option<StoreError>>,
    loading: AtomicBool,
    clears: AtomicUsize,
}

impl MemoryStore {
    pub(super) fn with_application(application: LoanApplication) -> Self {
        let store = Self::default();
        store.select(Some(application.id.clone()));
        store.load(application);
        store
    }

    pub(super) fn select(&self, id: Option<ApplicationId>) {
        *self.application_id.lock().expect("store mutex poisoned") = id;
    }

    pub(super) fn load(&self, application: LoanApplication) {
        *self.application.lock().expect("store mutex poisoned") = Some(application);
    }

    pub(super) fn fail_next_update(&self, error: StoreError) {
        *self.next_failure.lock().expect("store mutex poisoned") = Some(error);
    }

    pub(super) fn set_loading(&self, loading: bool) {
        self.loading.store(loading, Ordering::SeqCst);
    }

    pub(super) fn updates(&self) -> Vec<ApprovalSubmission> {
        self.updates.lock().expect("store mutex poisoned").clone()
    }

    pub(super) fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ApplicationStore for MemoryStore {
    fn application_id(&self) -> Option<ApplicationId> {
        self.application_id
            .lock()
            .expect("store mutex poisoned")
            .clone()
    }

    fn application_data(&self) -> Option<LoanApplication> {
        self.application.lock().expect("store mutex poisoned").clone()
    }

    async fn update(&self, submission: &ApprovalSubmission) -> Result<(), StoreError> {
        if let Some(error) = self.next_failure.lock().expect("store mutex poisoned").take() {
            return Err(error);
        }
        self.updates
            .lock()
            .expect("store mutex poisoned")
            .push(submission.clone());
        Ok(())
    }

    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.select(None);
        *self.application.lock().expect("store mutex poisoned") = None;
    }

    fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }
}

/// Store whose update stays in flight until the test releases it.
pub(super) struct GatedStore {
    pub(super) inner: MemoryStore,
    pub(super) entered: Notify,
    pub(super) release: Notify,
}

impl GatedStore {
    pub(super) fn with_application(application: LoanApplication) -> Self {
        Self {
            inner: MemoryStore::with_application(application),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl ApplicationStore for GatedStore {
    fn application_id(&self) -> Option<ApplicationId> {
        self.inner.application_id()
    }

    fn application_data(&self) -> Option<LoanApplication> {
        self.inner.application_data()
    }

    async fn update(&self, submission: &ApprovalSubmission) -> Result<(), StoreError> {
        self.inner.set_loading(true);
        self.entered.notify_one();
        self.release.notified().await;
        let result = self.inner.update(submission).await;
        self.inner.set_loading(false);
        result
    }

    fn clear(&self) {
        self.inner.clear();
    }

    fn is_loading(&self) -> bool {
        self.inner.is_loading()
    }
}

/// Store that panics while reporting its application id until told otherwise.
pub(super) struct PanickingStore {
    pub(super) inner: MemoryStore,
    pub(super) panic_on_read: AtomicBool,
}

impl PanickingStore {
    pub(super) fn with_application(application: LoanApplication) -> Self {
        Self {
            inner: MemoryStore::with_application(application),
            panic_on_read: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl ApplicationStore for PanickingStore {
    fn application_id(&self) -> Option<ApplicationId> {
        if self.panic_on_read.load(Ordering::SeqCst) {
            panic!("application store crashed");
        }
        self.inner.application_id()
    }

    fn application_data(&self) -> Option<LoanApplication> {
        self.inner.application_data()
    }

    async fn update(&self, submission: &ApprovalSubmission) -> Result<(), StoreError> {
        self.inner.update(submission).await
    }

    fn clear(&self) {
        self.inner.clear();
    }

    fn is_loading(&self) -> bool {
        self.inner.is_loading()
    }
}

pub(super) fn service_with<S>(store: S) -> (Arc<ApprovalService<S>>, Arc<S>)
where
    S: ApplicationStore + 'static,
{
    let store = Arc::new(store);
    let service = ApprovalService::new(store.clone(), RateTable::standard())
        .expect("standard rate table is valid");
    (Arc::new(service), store)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
