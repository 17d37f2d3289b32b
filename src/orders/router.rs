use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::authorization::DenialReason;
use super::domain::{Actor, CompanyId, NewOrder, OrderId, OrderStatus};
use super::repository::{MenuCatalog, OrderRepository, SubsidyDirectory};
use super::service::{OrderLifecycleService, OrderServiceError};

type SharedService<R, M, S> = Arc<OrderLifecycleService<R, M, S>>;

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderRequest {
    pub order: NewOrder,
    pub actor: Actor,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransitionRequest {
    pub requested_status: OrderStatus,
    pub actor: Actor,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DailyReportQuery {
    pub date: NaiveDate,
    #[serde(default)]
    pub company_id: Option<CompanyId>,
}

/// Router builder exposing order placement, transitions, and daily reports.
pub fn order_router<R, M, S>(service: SharedService<R, M, S>) -> Router
where
    R: OrderRepository + 'static,
    M: MenuCatalog + 'static,
    S: SubsidyDirectory + 'static,
{
    Router::new()
        .route("/api/v1/orders", post(place_order_handler::<R, M, S>))
        .route("/api/v1/orders/:order_id", get(order_handler::<R, M, S>))
        .route(
            "/api/v1/orders/:order_id/transition",
            post(transition_handler::<R, M, S>),
        )
        .route("/api/v1/reports/daily", get(daily_report_handler::<R, M, S>))
        .with_state(service)
}

pub(crate) async fn place_order_handler<R, M, S>(
    State(service): State<SharedService<R, M, S>>,
    axum::Json(request): axum::Json<PlaceOrderRequest>,
) -> Response
where
    R: OrderRepository + 'static,
    M: MenuCatalog + 'static,
    S: SubsidyDirectory + 'static,
{
    let placed = run_blocking(move || service.place_order(request.order, &request.actor)).await;
    match placed {
        Ok(Ok(order)) => (StatusCode::CREATED, axum::Json(order)).into_response(),
        Ok(Err(error)) => error_response(error),
        Err(response) => response,
    }
}

pub(crate) async fn transition_handler<R, M, S>(
    State(service): State<SharedService<R, M, S>>,
    Path(order_id): Path<String>,
    axum::Json(request): axum::Json<TransitionRequest>,
) -> Response
where
    R: OrderRepository + 'static,
    M: MenuCatalog + 'static,
    S: SubsidyDirectory + 'static,
{
    let order_id = OrderId(order_id);
    let transitioned = run_blocking(move || {
        service.transition(&order_id, request.requested_status, &request.actor)
    })
    .await;
    match transitioned {
        Ok(Ok(order)) => (StatusCode::OK, axum::Json(order)).into_response(),
        Ok(Err(error)) => error_response(error),
        Err(response) => response,
    }
}

pub(crate) async fn order_handler<R, M, S>(
    State(service): State<SharedService<R, M, S>>,
    Path(order_id): Path<String>,
) -> Response
where
    R: OrderRepository + 'static,
    M: MenuCatalog + 'static,
    S: SubsidyDirectory + 'static,
{
    match service.get(&OrderId(order_id)) {
        Ok(order) => (StatusCode::OK, axum::Json(order)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn daily_report_handler<R, M, S>(
    State(service): State<SharedService<R, M, S>>,
    Query(query): Query<DailyReportQuery>,
) -> Response
where
    R: OrderRepository + 'static,
    M: MenuCatalog + 'static,
    S: SubsidyDirectory + 'static,
{
    match service.daily_report(query.date, query.company_id.as_ref()) {
        Ok(report) => (StatusCode::OK, axum::Json(report.summary())).into_response(),
        Err(error) => error_response(error),
    }
}

/// Run service work that may wait on an order lease off the async workers.
async fn run_blocking<T, F>(work: F) -> Result<T, Response>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|err| {
        tracing::error!(error = %err, "order task failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(json!({
                "error": "internal",
                "message": "order task failed",
                "retryable": false,
            })),
        )
            .into_response()
    })
}

pub(crate) fn status_for(error: &OrderServiceError) -> StatusCode {
    match error {
        OrderServiceError::NotFound { .. } | OrderServiceError::UnknownLunchOption(_) => {
            StatusCode::NOT_FOUND
        }
        OrderServiceError::Denied(DenialReason::Unauthorized { .. })
        | OrderServiceError::PlacementDenied { .. } => StatusCode::FORBIDDEN,
        OrderServiceError::Denied(DenialReason::InvalidTransition { .. })
        | OrderServiceError::Pricing(_)
        | OrderServiceError::UnavailableLunchOption(_) => StatusCode::UNPROCESSABLE_ENTITY,
        OrderServiceError::Conflict { .. } | OrderServiceError::Busy { .. } => {
            StatusCode::CONFLICT
        }
        OrderServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Error body carrying the kind plus the inputs that triggered it so callers
/// can render role-appropriate feedback.
pub(crate) fn error_response(error: OrderServiceError) -> Response {
    let status = status_for(&error);
    let mut payload = json!({
        "error": error.kind(),
        "message": error.to_string(),
        "retryable": error.is_retryable(),
    });

    let details = match &error {
        OrderServiceError::NotFound { order_id } | OrderServiceError::Busy { order_id } => {
            Some(json!({ "order_id": order_id }))
        }
        OrderServiceError::Conflict {
            order_id,
            expected,
            actual,
        } => Some(json!({ "order_id": order_id, "expected": expected, "actual": actual })),
        OrderServiceError::Denied(reason) => serde_json::to_value(reason).ok(),
        OrderServiceError::UnknownLunchOption(id)
        | OrderServiceError::UnavailableLunchOption(id) => {
            Some(json!({ "lunch_option_id": id }))
        }
        OrderServiceError::PlacementDenied {
            role,
            user_id,
            company_id,
        } => Some(json!({ "role": role, "user_id": user_id, "company_id": company_id })),
        OrderServiceError::Pricing(_) | OrderServiceError::Repository(_) => None,
    };
    if let (Some(details), Some(body)) = (details, payload.as_object_mut()) {
        body.insert("details".to_string(), details);
    }

    (status, axum::Json(payload)).into_response()
}
