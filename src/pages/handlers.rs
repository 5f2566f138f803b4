use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::{debug, instrument};

use crate::{
    auth::{
        dto::CurrentUser,
        extractors::{MaybeSession, RequireSession},
        repo_types::Session,
    },
    error::AppError,
    pages::dto::{
        DashboardPage, ExplorePage, FormPage, GigPage, HomePage, Layout, OwnedRequest, ProfilePage,
        WorkspacePage, WorkspaceQuery,
    },
    requests::services::summarize_applicants,
    state::AppState,
    wallet::{resync_balance, wallet_balance},
};

const OPEN_REQUESTS_ON_EXPLORE: i64 = 20;
const DEFAULT_APPLICANT_NAME: &str = "Kunal Dhull";
const DEFAULT_REQUEST_TITLE: &str = "Logo design for college fest";

pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/explore", get(explore))
        .route("/gig/:id", get(gig))
        .route("/dashboard", get(dashboard))
        .route("/profile", get(profile))
        .route("/requests/new", get(new_request))
        .route("/services/new", get(new_service))
        .route("/workspace/:request_id/:applicant_id", get(workspace))
}

fn layout(title: impl Into<String>, page_class: &'static str, session: Option<&Session>) -> Layout {
    Layout {
        title: title.into(),
        page_class,
        current_user: session.map(CurrentUser::from),
        wallet_balance: wallet_balance(session),
    }
}

#[instrument(skip_all)]
pub async fn home(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
) -> Result<Json<HomePage>, AppError> {
    Ok(Json(HomePage {
        layout: layout("SkillSaarthi | Trade skills, not money", "page-home", session.as_ref()),
        categories: state.catalog.categories().await?,
        gigs: state.catalog.list_gigs().await?,
    }))
}

#[instrument(skip_all)]
pub async fn explore(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
) -> Result<Json<ExplorePage>, AppError> {
    Ok(Json(ExplorePage {
        layout: layout("Explore skills | SkillSaarthi", "page-explore", session.as_ref()),
        categories: state.catalog.categories().await?,
        gigs: state.catalog.list_gigs().await?,
        requests: state.requests.list_open(OPEN_REQUESTS_ON_EXPLORE).await?,
    }))
}

#[instrument(skip(state, session))]
pub async fn gig(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    // Non-numeric ids are just unknown gigs, same as the plain-text 404 below.
    let found = match id.parse::<i64>() {
        Ok(n) => state.catalog.get_gig(n).await?,
        Err(_) => None,
    };
    let Some(gig) = found else {
        debug!(%id, "gig not found");
        return Ok((StatusCode::NOT_FOUND, "Gig not found").into_response());
    };
    Ok(Json(GigPage {
        layout: layout(format!("{} | SkillSaarthi", gig.title), "page-gig", session.as_ref()),
        gig,
    })
    .into_response())
}

#[instrument(skip_all)]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
) -> Result<Json<DashboardPage>, AppError> {
    let session = resync_balance(&state, session).await?;
    Ok(Json(DashboardPage {
        layout: layout("Dashboard | SkillSaarthi", "page-dashboard", Some(&session)),
        // No ledger records token movements yet.
        tokens_earned: 0,
        tokens_spent: 0,
    }))
}

#[instrument(skip_all)]
pub async fn profile(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
) -> Result<Json<ProfilePage>, AppError> {
    let session = resync_balance(&state, session).await?;
    let owned = state.requests.list_by_owner(session.user_id).await?;
    let mut requests = Vec::with_capacity(owned.len());
    for request in owned {
        let applicants = state.requests.list_applicants(request.id).await?;
        requests.push(OwnedRequest {
            summary: summarize_applicants(&applicants),
            request,
        });
    }
    Ok(Json(ProfilePage {
        layout: layout("Profile | SkillSaarthi", "page-profile", Some(&session)),
        requests,
    }))
}

#[instrument(skip_all)]
pub async fn new_request(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
) -> Result<Json<FormPage>, AppError> {
    Ok(Json(FormPage {
        layout: layout("Post a new request | SkillSaarthi", "page-request", Some(&session)),
        categories: state.catalog.categories().await?,
    }))
}

#[instrument(skip_all)]
pub async fn new_service(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
) -> Result<Json<FormPage>, AppError> {
    Ok(Json(FormPage {
        layout: layout("Publish a new service | SkillSaarthi", "page-service", Some(&session)),
        categories: state.catalog.categories().await?,
    }))
}

#[instrument(skip(session, q))]
pub async fn workspace(
    RequireSession(session): RequireSession,
    Path((request_id, applicant_id)): Path<(String, String)>,
    Query(q): Query<WorkspaceQuery>,
) -> Json<WorkspacePage> {
    Json(WorkspacePage {
        layout: layout("Workspace | SkillSaarthi", "page-workspace", Some(&session)),
        applicant_name: q
            .applicant_name
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_APPLICANT_NAME.to_string()),
        request_title: q
            .request_title
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REQUEST_TITLE.to_string()),
        request_id,
        applicant_id,
    })
}
