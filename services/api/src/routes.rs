use crate::infra::{next_application_id, AppState, InMemoryApplicationStore};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use loan_approval::error::AppError;
use loan_approval::workflows::approval::{
    approval_router, ApplicationId, ApprovalService, LoanApplication, Money,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

pub(crate) type LoanApprovalService = ApprovalService<InMemoryApplicationStore>;

#[derive(Debug, Deserialize)]
pub(crate) struct OpenApplicationRequest {
    pub(crate) requested_amount: Money,
    pub(crate) applicant_name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenApplicationResponse {
    pub(crate) application_id: ApplicationId,
}

pub(crate) fn with_application_routes(service: Arc<LoanApprovalService>) -> axum::Router {
    approval_router(service.clone())
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/applications",
            axum::routing::post(open_application_endpoint),
        )
        .layer(Extension(service))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Seed the store with a fresh application so the approval screen has something to analyze.
pub(crate) async fn open_application_endpoint(
    Extension(service): Extension<Arc<LoanApprovalService>>,
    Json(payload): Json<OpenApplicationRequest>,
) -> Result<(StatusCode, Json<OpenApplicationResponse>), AppError> {
    let application = LoanApplication {
        id: next_application_id(),
        requested_amount: payload.requested_amount,
        applicant_name: payload.applicant_name.trim().to_string(),
    };
    let application_id = application.id.clone();

    service.store().open(application);
    service.refresh_application()?;
    info!(application_id = %application_id, "application opened");

    Ok((
        StatusCode::CREATED,
        Json(OpenApplicationResponse { application_id }),
    ))
}
