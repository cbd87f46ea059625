//! End-to-end scenarios for the approval workflow, driven through the public service facade.

mod common {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use loan_approval::workflows::approval::{
        ApplicationId, ApplicationStore, ApprovalService, ApprovalSubmission, LoanApplication,
        RateTable, StoreError,
    };

    #[derive(Default)]
    pub(super) struct RecordingStore {
        pub(super) current: Mutex<Option<LoanApplication>>,
        pub(super) submissions: Mutex<Vec<ApprovalSubmission>>,
        pub(super) update_calls: AtomicUsize,
    }

    impl RecordingStore {
        pub(super) fn submissions(&self) -> Vec<ApprovalSubmission> {
            self.submissions.lock().expect("store mutex poisoned").clone()
        }
    }

    #[async_trait]
    impl ApplicationStore for RecordingStore {
        fn application_id(&self) -> Option<ApplicationId> {
            self.current
                .lock()
                .expect("store mutex poisoned")
                .as_ref()
                .map(|application| application.id.clone())
        }

        fn application_data(&self) -> Option<LoanApplication> {
            self.current.lock().expect("store mutex poisoned").clone()
        }

        async fn update(&self, submission: &ApprovalSubmission) -> Result<(), StoreError> {
            self.update_calls.fetch_add(1, Ordering::SeqCst);
            self.submissions
                .lock()
                .expect("store mutex poisoned")
                .push(submission.clone());
            Ok(())
        }

        fn clear(&self) {
            *self.current.lock().expect("store mutex poisoned") = None;
        }

        fn is_loading(&self) -> bool {
            false
        }
    }

    pub(super) fn service_for(
        requested_amount: Option<Decimal>,
    ) -> (Arc<ApprovalService<RecordingStore>>, Arc<RecordingStore>) {
        let store = Arc::new(RecordingStore::default());
        if let Some(requested_amount) = requested_amount {
            *store.current.lock().expect("store mutex poisoned") = Some(LoanApplication {
                id: ApplicationId("app-000001".to_string()),
                requested_amount,
                applicant_name: "João Pereira".to_string(),
            });
        }
        let service = ApprovalService::new(store.clone(), RateTable::standard())
            .expect("standard rate table is valid");
        (Arc::new(service), store)
    }
}

use std::sync::atomic::Ordering;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use common::service_for;
use loan_approval::workflows::approval::views::{format_brl, round_money};
use loan_approval::workflows::approval::{
    AnalysisProgress, ApprovalError, DecisionReady, NextStage, Tenor,
};

async fn decide(requested: Decimal) -> DecisionReady {
    let (service, _store) = service_for(Some(requested));
    match service.analyze().await.expect("analysis runs") {
        AnalysisProgress::Decisioned(ready) => ready,
        other => panic!("expected a decision, got {other:?}"),
    }
}

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 16).expect("valid date")
}

#[tokio::test(start_paused = true)]
async fn large_request_is_reduced_and_priced() {
    let ready = decide(dec!(1000)).await;

    assert_eq!(ready.decision.approved_amount(), dec!(900));
    let labels: Vec<String> = ready
        .options
        .iter()
        .map(|option| format!("{}x{}", option.tenor.months(), format_brl(option.monthly_payment)))
        .collect();
    assert_eq!(
        labels,
        vec!["3xR$ 321,00", "6xR$ 169,50", "9xR$ 120,00", "12xR$ 97,50"]
    );
}

#[tokio::test(start_paused = true)]
async fn small_request_is_approved_in_full() {
    let ready = decide(dec!(50)).await;

    assert_eq!(ready.decision.approved_amount(), dec!(50));
    let rounded: Vec<Decimal> = ready
        .options
        .iter()
        .map(|option| round_money(option.monthly_payment))
        .collect();
    assert_eq!(rounded, vec![dec!(17.83), dec!(9.42), dec!(6.67), dec!(5.42)]);

    for option in &ready.options {
        let rebuilt = option.monthly_payment * Decimal::from(option.tenor.months());
        assert!((rebuilt - option.total_with_interest).abs() <= dec!(0.01));
    }
}

#[tokio::test(start_paused = true)]
async fn reselection_leaves_only_latest_schedule() {
    let (service, store) = service_for(Some(dec!(1000)));
    service.analyze().await.expect("decides");

    service
        .select_tenor(Tenor::Twelve, start())
        .expect("selects twelve");
    let selection = service
        .select_tenor(Tenor::Six, start())
        .expect("selects six");

    assert_eq!(selection.schedule.len(), 6);
    let snapshot = service.snapshot();
    let schedule = snapshot.schedule.expect("schedule rendered");
    assert_eq!(schedule.tenor_months, 6);
    assert_eq!(schedule.entries.len(), 6);
    assert_eq!(schedule.entries[0].due_date, "16/11/2025");
    assert_eq!(schedule.entries[5].due_date, "16/04/2026");
    assert_eq!(snapshot.confirm_label, "Continuar com 6x de R$ 169,50");

    let confirmed = service.confirm().await.expect("confirms");
    assert_eq!(confirmed.submission.selected_tenor, Tenor::Six);
    assert_eq!(confirmed.next_stage, NextStage::Documents);
    assert_eq!(store.submissions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn missing_application_issues_no_calculation() {
    let (service, store) = service_for(None);

    let err = service.analyze().await.expect_err("no application");

    assert!(matches!(err, ApprovalError::MissingApplication));
    assert_eq!(err.next_stage(), Some(NextStage::Simulation));
    assert!(service.snapshot().decision.is_none());
    assert!(matches!(
        service.select_tenor(Tenor::Three, start()),
        Err(ApprovalError::DecisionPending)
    ));
    assert_eq!(store.update_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn confirm_without_selection_never_calls_store() {
    let (service, store) = service_for(Some(dec!(1000)));
    service.analyze().await.expect("decides");

    let err = service.confirm().await.expect_err("nothing selected");

    assert!(matches!(err, ApprovalError::NoSelection));
    assert!(!err.is_retryable());
    assert_eq!(store.update_calls.load(Ordering::SeqCst), 0);
    assert!(service.snapshot().approval_state.is_some());
}
