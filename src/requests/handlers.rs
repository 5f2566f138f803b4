use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Form, Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::RequireSession,
    error::AppError,
    requests::{
        dto::{ApplicantList, ApplicantQuery, ApprovedResponse, CreateRequestForm, RequestDetails},
        repo_types::{Applicant, WorkRequest},
        services,
    },
    state::AppState,
};

pub fn request_routes() -> Router<AppState> {
    Router::new()
        .route("/requests", post(create_request))
        .route("/requests/:id", get(get_request))
        .route("/requests/:id/apply", post(apply))
        .route("/requests/:id/applicants", get(list_applicants))
        .route(
            "/requests/:id/applicants/:applicant_id/approve",
            post(approve),
        )
        .route("/requests/:id/applicants/:applicant_id/deny", post(deny))
}

#[instrument(skip(state, session, form))]
pub async fn create_request(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    Form(form): Form<CreateRequestForm>,
) -> Result<(StatusCode, Json<WorkRequest>), AppError> {
    let request = services::create_request(&state, &session, form).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

#[instrument(skip(state, _session))]
pub async fn get_request(
    State(state): State<AppState>,
    RequireSession(_session): RequireSession,
    Path(id): Path<Uuid>,
) -> Result<Json<RequestDetails>, AppError> {
    let request = services::get_request(&state, id).await?;
    let summary = services::summarize(&state, id).await?;
    Ok(Json(RequestDetails { request, summary }))
}

#[instrument(skip(state, session))]
pub async fn apply(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<Applicant>), AppError> {
    let applicant = services::apply(&state, id, &session).await?;
    Ok((StatusCode::CREATED, Json(applicant)))
}

#[instrument(skip(state, _session))]
pub async fn list_applicants(
    State(state): State<AppState>,
    RequireSession(_session): RequireSession,
    Path(id): Path<Uuid>,
    Query(q): Query<ApplicantQuery>,
) -> Result<Json<ApplicantList>, AppError> {
    let summary = services::summarize(&state, id).await?;
    let applicants = services::filter(&state, id, q.status).await?;
    Ok(Json(ApplicantList {
        filter: q.status,
        summary,
        applicants,
    }))
}

#[instrument(skip(state, session))]
pub async fn approve(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    Path((id, applicant_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApprovedResponse>, AppError> {
    let (applicant, workspace) =
        services::approve(&state, id, applicant_id, session.user_id).await?;
    Ok(Json(ApprovedResponse {
        applicant,
        workspace,
    }))
}

#[instrument(skip(state, session))]
pub async fn deny(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    Path((id, applicant_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Applicant>, AppError> {
    let applicant = services::deny(&state, id, applicant_id, session.user_id).await?;
    Ok(Json(applicant))
}
