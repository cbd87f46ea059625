use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;

use super::domain::Tenor;
use super::error::ApprovalError;
use super::service::{AnalysisProgress, ApprovalService};
use super::store::ApplicationStore;
use super::views::{DecisionView, ScheduleView};

/// HTTP endpoints driving the approval screen.
pub fn approval_router<S>(service: Arc<ApprovalService<S>>) -> Router
where
    S: ApplicationStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/approval",
            get(session_handler::<S>).delete(abandon_handler::<S>),
        )
        .route("/api/v1/approval/analysis", post(analysis_handler::<S>))
        .route("/api/v1/approval/selection", post(selection_handler::<S>))
        .route(
            "/api/v1/approval/confirmation",
            post(confirmation_handler::<S>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct SelectionRequest {
    pub(crate) tenor_months: u32,
    #[serde(default)]
    pub(crate) start_date: Option<NaiveDate>,
}

pub(crate) async fn session_handler<S>(State(service): State<Arc<ApprovalService<S>>>) -> Response
where
    S: ApplicationStore + 'static,
{
    (StatusCode::OK, Json(service.snapshot())).into_response()
}

pub(crate) async fn analysis_handler<S>(
    State(service): State<Arc<ApprovalService<S>>>,
) -> Response
where
    S: ApplicationStore + 'static,
{
    match service.analyze().await {
        Ok(AnalysisProgress::Decisioned(ready)) => {
            (StatusCode::OK, Json(DecisionView::from(&ready))).into_response()
        }
        Ok(AnalysisProgress::WaitingForApplication) => (
            StatusCode::ACCEPTED,
            Json(json!({ "status": "waiting_for_application" })),
        )
            .into_response(),
        Ok(AnalysisProgress::Cancelled) => (
            StatusCode::CONFLICT,
            Json(json!({ "status": "cancelled" })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn selection_handler<S>(
    State(service): State<Arc<ApprovalService<S>>>,
    Json(request): Json<SelectionRequest>,
) -> Response
where
    S: ApplicationStore + 'static,
{
    let tenor = match Tenor::try_from(request.tenor_months) {
        Ok(tenor) => tenor,
        Err(err) => return error_response(err.into()),
    };
    let start = request
        .start_date
        .unwrap_or_else(|| Local::now().date_naive());

    match service.select_tenor(tenor, start) {
        Ok(selection) => {
            let payload = json!({
                "tenor_months": tenor.months(),
                "schedule": ScheduleView::from(&selection.schedule),
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn confirmation_handler<S>(
    State(service): State<Arc<ApprovalService<S>>>,
) -> Response
where
    S: ApplicationStore + 'static,
{
    match service.confirm().await {
        Ok(confirmed) => (StatusCode::OK, Json(confirmed)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn abandon_handler<S>(State(service): State<Arc<ApprovalService<S>>>) -> Response
where
    S: ApplicationStore + 'static,
{
    let next_stage = service.abandon();
    (StatusCode::OK, Json(json!({ "next_stage": next_stage }))).into_response()
}

pub(crate) fn status_for(err: &ApprovalError) -> StatusCode {
    match err {
        ApprovalError::MissingApplication
        | ApprovalError::InvalidTransition { .. }
        | ApprovalError::AnalysisInProgress
        | ApprovalError::DecisionPending
        | ApprovalError::SubmissionInFlight
        | ApprovalError::AlreadyConfirmed
        | ApprovalError::NoSubmissionPending => StatusCode::CONFLICT,
        ApprovalError::InvalidRequestedAmount(_)
        | ApprovalError::UnsupportedTenor(_)
        | ApprovalError::NoSelection
        | ApprovalError::Schedule(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ApprovalError::SubmissionFailed(_) => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(err: ApprovalError) -> Response {
    let status = status_for(&err);
    let payload = match err.next_stage() {
        Some(next_stage) => json!({ "error": err.to_string(), "next_stage": next_stage }),
        None => json!({ "error": err.to_string(), "retryable": err.is_retryable() }),
    };
    (status, Json(payload)).into_response()
}
