use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    ActivityKind, ActivityMeta, ActorId, ApplicationDraft, ApplicationId, ApplicationPriority,
    ApplicationStatus, ConsultantId,
};
use super::ledger::LedgerError;
use super::lifecycle::TransitionError;
use super::repository::{
    ApplicationStore, ConsultantDirectory, NotificationDispatcher, RoomRepository, StoreError,
};
use super::room::RoomError;
use super::service::{IntakeService, IntakeServiceError};

/// Router builder exposing the intake engine to the surrounding request
/// layer.
pub fn intake_router<S, R, D, N>(service: Arc<IntakeService<S, R, D, N>>) -> Router
where
    S: ApplicationStore + 'static,
    R: RoomRepository + 'static,
    D: ConsultantDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    Router::new()
        .route(
            "/api/v1/intake/applications",
            post(create_handler::<S, R, D, N>),
        )
        .route(
            "/api/v1/intake/applications/:application_id",
            get(status_handler::<S, R, D, N>),
        )
        .route(
            "/api/v1/intake/applications/:application_id/transition",
            post(transition_handler::<S, R, D, N>),
        )
        .route(
            "/api/v1/intake/applications/:application_id/reassign",
            post(reassign_handler::<S, R, D, N>),
        )
        .route(
            "/api/v1/intake/applications/:application_id/release",
            post(release_handler::<S, R, D, N>),
        )
        .route(
            "/api/v1/intake/applications/:application_id/activity",
            post(activity_handler::<S, R, D, N>),
        )
        .route(
            "/api/v1/intake/applications/:application_id/assignments",
            get(history_handler::<S, R, D, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub struct CreateApplicationRequest {
    pub owner: String,
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub requested_amount: Option<u32>,
    #[serde(default)]
    pub priority: Option<ApplicationPriority>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status: ApplicationStatus,
    pub actor: String,
}

#[derive(Debug, Deserialize)]
pub struct ReassignRequest {
    pub consultant: String,
    pub actor: String,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ReleaseRequest {
    pub actor: String,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ActivityRequest {
    pub kind: ActivityKind,
    pub is_consultant: bool,
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
}

pub(crate) async fn create_handler<S, R, D, N>(
    State(service): State<Arc<IntakeService<S, R, D, N>>>,
    axum::Json(request): axum::Json<CreateApplicationRequest>,
) -> Response
where
    S: ApplicationStore + 'static,
    R: RoomRepository + 'static,
    D: ConsultantDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    let draft = ApplicationDraft {
        title: request.title,
        summary: request.summary,
        requested_amount: request.requested_amount,
        priority: request.priority,
    };
    match service.create_application(ActorId(request.owner), draft) {
        Ok(outcome) => {
            let payload = json!({
                "application_id": outcome.application.id,
                "status": outcome.application.status.label(),
                "sector": outcome.application.sector,
                "room_status": outcome.room.status.label(),
                "assigned_consultant": outcome.application.assigned_consultant,
                "no_match_reason": outcome.no_match_reason,
            });
            (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn status_handler<S, R, D, N>(
    State(service): State<Arc<IntakeService<S, R, D, N>>>,
    Path(application_id): Path<String>,
) -> Response
where
    S: ApplicationStore + 'static,
    R: RoomRepository + 'static,
    D: ConsultantDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    match service.application_status(&ApplicationId(application_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn transition_handler<S, R, D, N>(
    State(service): State<Arc<IntakeService<S, R, D, N>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<TransitionRequest>,
) -> Response
where
    S: ApplicationStore + 'static,
    R: RoomRepository + 'static,
    D: ConsultantDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    let id = ApplicationId(application_id);
    match service.transition_application(&id, request.status, &ActorId(request.actor)) {
        Ok(application) => {
            let payload = json!({
                "application_id": application.id,
                "status": application.status.label(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reassign_handler<S, R, D, N>(
    State(service): State<Arc<IntakeService<S, R, D, N>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<ReassignRequest>,
) -> Response
where
    S: ApplicationStore + 'static,
    R: RoomRepository + 'static,
    D: ConsultantDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    let id = ApplicationId(application_id);
    match service.reassign_consultant(
        &id,
        ConsultantId(request.consultant),
        ActorId(request.actor),
        &request.reason,
    ) {
        Ok(entry) => (StatusCode::OK, axum::Json(entry)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn release_handler<S, R, D, N>(
    State(service): State<Arc<IntakeService<S, R, D, N>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<ReleaseRequest>,
) -> Response
where
    S: ApplicationStore + 'static,
    R: RoomRepository + 'static,
    D: ConsultantDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    let id = ApplicationId(application_id);
    match service.release_consultant(&id, ActorId(request.actor), &request.reason) {
        Ok(()) => {
            let payload = json!({ "application_id": id, "status": "released" });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn activity_handler<S, R, D, N>(
    State(service): State<Arc<IntakeService<S, R, D, N>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<ActivityRequest>,
) -> Response
where
    S: ApplicationStore + 'static,
    R: RoomRepository + 'static,
    D: ConsultantDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    let id = ApplicationId(application_id);
    let meta = ActivityMeta {
        is_consultant: request.is_consultant,
        occurred_at: request.occurred_at,
    };
    match service.record_room_activity(&id, request.kind, meta) {
        Ok(room) => {
            let payload = json!({
                "application_id": room.application_id,
                "room_status": room.status.label(),
                "stats": room.stats,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn history_handler<S, R, D, N>(
    State(service): State<Arc<IntakeService<S, R, D, N>>>,
    Path(application_id): Path<String>,
) -> Response
where
    S: ApplicationStore + 'static,
    R: RoomRepository + 'static,
    D: ConsultantDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    match service.assignment_history(&ApplicationId(application_id)) {
        Ok(history) => (StatusCode::OK, axum::Json(history)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: IntakeServiceError) -> Response {
    let status = match &err {
        IntakeServiceError::UnknownOwner { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        IntakeServiceError::ApplicationNotFound { .. } => StatusCode::NOT_FOUND,
        IntakeServiceError::Transition(TransitionError::ApplicationNotFound { .. }) => {
            StatusCode::NOT_FOUND
        }
        IntakeServiceError::Transition(TransitionError::InvalidTransition { .. }) => {
            StatusCode::CONFLICT
        }
        IntakeServiceError::Ledger(LedgerError::ApplicationNotFound { .. }) => {
            StatusCode::NOT_FOUND
        }
        IntakeServiceError::Ledger(
            LedgerError::ApplicationClosed { .. }
            | LedgerError::NothingAssigned { .. }
            | LedgerError::ConcurrentAssignment { .. },
        ) => StatusCode::CONFLICT,
        IntakeServiceError::Room(RoomError::NotFound { .. })
        | IntakeServiceError::Transition(TransitionError::Room(RoomError::NotFound { .. })) => {
            StatusCode::NOT_FOUND
        }
        IntakeServiceError::Store(StoreError::Conflict)
        | IntakeServiceError::Ledger(LedgerError::Store(StoreError::Conflict)) => {
            StatusCode::CONFLICT
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}
