use serde::Serialize;
use tracing::{info, warn};
use url::form_urlencoded;
use uuid::Uuid;

use crate::{
    auth::repo_types::Session,
    error::AppError,
    requests::{
        dto::CreateRequestForm,
        repo::InsertApplicantError,
        repo_types::{
            Applicant, ApplicantStatus, ApplicantSummary, NewWorkRequest, StatusFilter,
            TransitionOutcome, WorkRequest,
        },
    },
    state::AppState,
};

#[derive(Debug, thiserror::Error)]
pub enum ApplicantError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Only the owner of this request can decide on applicants.")]
    NotOwner,
    #[error("Applicant is already {current}.")]
    InvalidTransition { current: ApplicantStatus },
    #[error("You cannot apply to your own request.")]
    SelfApplication,
    #[error("You have already applied to this request.")]
    AlreadyApplied,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<ApplicantError> for AppError {
    fn from(e: ApplicantError) -> Self {
        match e {
            ApplicantError::NotFound(_) => AppError::NotFound(e.to_string()),
            ApplicantError::NotOwner => AppError::Authorization(e.to_string()),
            ApplicantError::InvalidTransition { .. } | ApplicantError::AlreadyApplied => {
                AppError::State(e.to_string())
            }
            ApplicantError::SelfApplication | ApplicantError::Validation(_) => {
                AppError::Validation(e.to_string())
            }
            ApplicantError::Internal(inner) => AppError::Internal(inner),
        }
    }
}

/// Collaboration context opened when an applicant is approved.
#[derive(Debug, Clone, Serialize)]
pub struct Workspace {
    pub request_id: Uuid,
    pub applicant_id: Uuid,
    pub applicant_name: String,
    pub request_title: String,
    pub url: String,
}

impl Workspace {
    fn open(request: &WorkRequest, applicant: &Applicant) -> Self {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("applicantName", &applicant.applicant_name)
            .append_pair("requestTitle", &request.title)
            .finish();
        Self {
            request_id: request.id,
            applicant_id: applicant.id,
            applicant_name: applicant.applicant_name.clone(),
            request_title: request.title.clone(),
            url: format!("/workspace/{}/{}?{}", request.id, applicant.id, query),
        }
    }
}

/// Counts recomputed from the statuses each time; nothing is cached.
pub fn summarize_applicants(applicants: &[Applicant]) -> ApplicantSummary {
    applicants
        .iter()
        .fold(ApplicantSummary::default(), |mut acc, a| {
            acc.total += 1;
            match a.status {
                ApplicantStatus::Pending => acc.pending += 1,
                ApplicantStatus::Approved => acc.approved += 1,
                ApplicantStatus::Denied => acc.denied += 1,
            }
            acc
        })
}

/// Keeps application order.
pub fn filter_applicants(applicants: &[Applicant], filter: StatusFilter) -> Vec<Applicant> {
    applicants
        .iter()
        .filter(|a| filter.matches(a.status))
        .cloned()
        .collect()
}

pub async fn create_request(
    state: &AppState,
    owner: &Session,
    form: CreateRequestForm,
) -> Result<WorkRequest, ApplicantError> {
    let title = form.title.trim().to_string();
    let category = form.category.trim().to_string();
    if title.is_empty() || category.is_empty() {
        return Err(ApplicantError::Validation(
            "Please provide a title and a category.".into(),
        ));
    }
    let budget_tokens = form
        .budget_tokens
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|b| *b >= 0)
        .ok_or_else(|| {
            ApplicantError::Validation(
                "Budget must be a whole number of tokens (0 or more).".into(),
            )
        })?;

    let request = state
        .requests
        .create_request(NewWorkRequest {
            title,
            category,
            description: form.description.trim().to_string(),
            budget_tokens,
            owner_user_id: owner.user_id,
        })
        .await?;
    info!(request_id = %request.id, owner = %owner.user_id, budget_tokens, "request posted");
    Ok(request)
}

pub async fn get_request(
    state: &AppState,
    request_id: Uuid,
) -> Result<WorkRequest, ApplicantError> {
    state
        .requests
        .get_request(request_id)
        .await?
        .ok_or(ApplicantError::NotFound("Request"))
}

pub async fn apply(
    state: &AppState,
    request_id: Uuid,
    applicant: &Session,
) -> Result<Applicant, ApplicantError> {
    let request = get_request(state, request_id).await?;
    if request.owner_user_id == applicant.user_id {
        warn!(%request_id, user_id = %applicant.user_id, "owner tried to apply to own request");
        return Err(ApplicantError::SelfApplication);
    }

    let created = state
        .requests
        .insert_applicant(request_id, applicant.user_id, &applicant.name)
        .await
        .map_err(|e| match e {
            InsertApplicantError::Duplicate => ApplicantError::AlreadyApplied,
            InsertApplicantError::Other(inner) => ApplicantError::Internal(inner),
        })?;
    info!(%request_id, applicant_id = %created.id, user_id = %applicant.user_id, "applied to request");
    Ok(created)
}

pub async fn approve(
    state: &AppState,
    request_id: Uuid,
    applicant_id: Uuid,
    acting_user_id: Uuid,
) -> Result<(Applicant, Workspace), ApplicantError> {
    let (request, applicant) =
        decide(state, request_id, applicant_id, acting_user_id, ApplicantStatus::Approved).await?;
    let workspace = Workspace::open(&request, &applicant);
    info!(%request_id, %applicant_id, "workspace opened");
    Ok((applicant, workspace))
}

pub async fn deny(
    state: &AppState,
    request_id: Uuid,
    applicant_id: Uuid,
    acting_user_id: Uuid,
) -> Result<Applicant, ApplicantError> {
    let (_, applicant) =
        decide(state, request_id, applicant_id, acting_user_id, ApplicantStatus::Denied).await?;
    Ok(applicant)
}

async fn decide(
    state: &AppState,
    request_id: Uuid,
    applicant_id: Uuid,
    acting_user_id: Uuid,
    to: ApplicantStatus,
) -> Result<(WorkRequest, Applicant), ApplicantError> {
    let request = get_request(state, request_id).await?;
    if request.owner_user_id != acting_user_id {
        warn!(%request_id, %applicant_id, %acting_user_id, "non-owner tried to decide on applicant");
        return Err(ApplicantError::NotOwner);
    }

    match state
        .requests
        .transition(request_id, applicant_id, ApplicantStatus::Pending, to)
        .await?
    {
        TransitionOutcome::Applied(applicant) => {
            info!(%request_id, %applicant_id, status = %applicant.status, "applicant decided");
            Ok((request, applicant))
        }
        TransitionOutcome::Conflict(current) => {
            warn!(%request_id, %applicant_id, %current, requested = %to, "illegal applicant transition");
            Err(ApplicantError::InvalidTransition { current })
        }
        TransitionOutcome::Missing => Err(ApplicantError::NotFound("Applicant")),
    }
}

pub async fn summarize(
    state: &AppState,
    request_id: Uuid,
) -> Result<ApplicantSummary, ApplicantError> {
    get_request(state, request_id).await?;
    let applicants = state.requests.list_applicants(request_id).await?;
    Ok(summarize_applicants(&applicants))
}

pub async fn filter(
    state: &AppState,
    request_id: Uuid,
    status: StatusFilter,
) -> Result<Vec<Applicant>, ApplicantError> {
    get_request(state, request_id).await?;
    let applicants = state.requests.list_applicants(request_id).await?;
    Ok(filter_applicants(&applicants, status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{dto::RegisterForm, services::register},
        config::AppConfig,
    };

    async fn user(state: &AppState, name: &str) -> Session {
        register(
            state,
            RegisterForm {
                name: name.into(),
                email: format!("{}@example.com", name.to_lowercase()),
                password: "pw".into(),
                confirm_password: "pw".into(),
            },
        )
        .await
        .expect("register")
        .session
    }

    fn form(title: &str, budget: &str) -> CreateRequestForm {
        CreateRequestForm {
            title: title.into(),
            category: "Design & Creative".into(),
            description: "Need a logo".into(),
            budget_tokens: budget.into(),
        }
    }

    /// Owner with a request that has `n` applicants, in order.
    async fn seeded(n: usize) -> (AppState, Session, WorkRequest, Vec<Applicant>) {
        let st = AppState::in_memory(AppConfig::for_tests());
        let owner = user(&st, "Owner").await;
        let request = create_request(&st, &owner, form("Logo design for college fest", "40"))
            .await
            .unwrap();
        let mut applicants = Vec::new();
        for i in 0..n {
            let u = user(&st, &format!("Applicant{i}")).await;
            applicants.push(apply(&st, request.id, &u).await.unwrap());
        }
        (st, owner, request, applicants)
    }

    #[tokio::test]
    async fn fresh_applicants_are_all_pending() {
        let (st, _, request, _) = seeded(3).await;
        let s = summarize(&st, request.id).await.unwrap();
        assert_eq!(
            s,
            ApplicantSummary {
                total: 3,
                approved: 0,
                pending: 3,
                denied: 0
            }
        );
    }

    #[tokio::test]
    async fn approve_twice_fails_second_time() {
        let (st, owner, request, applicants) = seeded(2).await;
        let target = applicants[0].id;

        let (approved, workspace) = approve(&st, request.id, target, owner.user_id).await.unwrap();
        assert_eq!(approved.status, ApplicantStatus::Approved);
        assert!(approved.decided_at.is_some());
        assert_eq!(workspace.applicant_id, target);
        let prefix = format!("/workspace/{}/{}?applicantName=Applicant0", request.id, target);
        assert!(workspace.url.starts_with(&prefix));
        assert!(workspace.url.contains("requestTitle=Logo+design+for+college+fest"));

        let err = approve(&st, request.id, target, owner.user_id).await.unwrap_err();
        assert!(matches!(
            err,
            ApplicantError::InvalidTransition {
                current: ApplicantStatus::Approved
            }
        ));
        let still = filter(&st, request.id, StatusFilter::Approved).await.unwrap();
        assert_eq!(still.len(), 1);
    }

    #[tokio::test]
    async fn denied_applicant_cannot_be_approved() {
        let (st, owner, request, applicants) = seeded(1).await;
        deny(&st, request.id, applicants[0].id, owner.user_id).await.unwrap();
        let err = approve(&st, request.id, applicants[0].id, owner.user_id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicantError::InvalidTransition {
                current: ApplicantStatus::Denied
            }
        ));
        assert!(matches!(AppError::from(err), AppError::State(_)));
    }

    #[tokio::test]
    async fn non_owner_cannot_decide() {
        let (st, _, request, applicants) = seeded(2).await;
        // an applicant is authenticated but does not own the request
        let intruder = applicants[1].user_id;

        let err = approve(&st, request.id, applicants[0].id, intruder).await.unwrap_err();
        assert!(matches!(err, ApplicantError::NotOwner));
        let err = deny(&st, request.id, applicants[0].id, intruder).await.unwrap_err();
        assert!(matches!(err, ApplicantError::NotOwner));

        let s = summarize(&st, request.id).await.unwrap();
        assert_eq!(s.pending, 2);
    }

    #[tokio::test]
    async fn filter_keeps_application_order() {
        let (st, owner, request, applicants) = seeded(4).await;
        approve(&st, request.id, applicants[2].id, owner.user_id).await.unwrap();

        let approved = filter(&st, request.id, StatusFilter::Approved).await.unwrap();
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].id, applicants[2].id);

        deny(&st, request.id, applicants[3].id, owner.user_id).await.unwrap();
        approve(&st, request.id, applicants[0].id, owner.user_id).await.unwrap();
        let approved: Vec<Uuid> = filter(&st, request.id, StatusFilter::Approved)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(approved, vec![applicants[0].id, applicants[2].id]);

        let pending = filter(&st, request.id, StatusFilter::Pending).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, applicants[1].id);

        let all = filter(&st, request.id, StatusFilter::All).await.unwrap();
        let ids: Vec<Uuid> = all.iter().map(|a| a.id).collect();
        let expected: Vec<Uuid> = applicants.iter().map(|a| a.id).collect();
        assert_eq!(ids, expected);

        let s = summarize(&st, request.id).await.unwrap();
        assert_eq!(
            s,
            ApplicantSummary {
                total: 4,
                approved: 2,
                pending: 1,
                denied: 1
            }
        );
    }

    #[tokio::test]
    async fn racing_decisions_let_exactly_one_through() {
        let (st, owner, request, applicants) = seeded(1).await;
        let target = applicants[0].id;

        let (a, d) = tokio::join!(
            approve(&st, request.id, target, owner.user_id),
            deny(&st, request.id, target, owner.user_id),
        );
        assert!(a.is_ok() ^ d.is_ok());
        let loser_is_transition_error = match (a, d) {
            (Err(e), Ok(_)) => matches!(e, ApplicantError::InvalidTransition { .. }),
            (Ok(_), Err(e)) => matches!(e, ApplicantError::InvalidTransition { .. }),
            _ => false,
        };
        assert!(loser_is_transition_error);
    }

    #[tokio::test]
    async fn decision_must_be_approve_or_deny() {
        let (st, owner, request, applicants) = seeded(1).await;
        let (rid, aid) = (request.id, applicants[0].id);
        let err = decide(&st, rid, aid, owner.user_id, ApplicantStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicantError::InvalidTransition {
                current: ApplicantStatus::Pending
            }
        ));
        let s = summarize(&st, request.id).await.unwrap();
        assert_eq!(s.pending, 1);
    }

    #[tokio::test]
    async fn owner_cannot_apply_and_duplicates_are_rejected() {
        let (st, owner, request, _) = seeded(0).await;
        let err = apply(&st, request.id, &owner).await.unwrap_err();
        assert!(matches!(err, ApplicantError::SelfApplication));

        let helper = user(&st, "Helper").await;
        apply(&st, request.id, &helper).await.unwrap();
        let err = apply(&st, request.id, &helper).await.unwrap_err();
        assert!(matches!(err, ApplicantError::AlreadyApplied));
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let (st, owner, request, _) = seeded(0).await;
        let err = approve(&st, request.id, Uuid::new_v4(), owner.user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicantError::NotFound("Applicant")));
        let err = summarize(&st, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ApplicantError::NotFound("Request")));
    }

    #[tokio::test]
    async fn create_request_validates_budget() {
        let st = AppState::in_memory(AppConfig::for_tests());
        let owner = user(&st, "Poster").await;
        for bad in ["-5", "ten", ""] {
            let err = create_request(&st, &owner, form("Title", bad)).await.unwrap_err();
            assert!(matches!(err, ApplicantError::Validation(_)), "budget {bad:?}");
        }
        let err = create_request(&st, &owner, form("  ", "10")).await.unwrap_err();
        assert!(matches!(err, ApplicantError::Validation(_)));

        let ok = create_request(&st, &owner, form("Title", "0")).await.unwrap();
        assert_eq!(ok.budget_tokens, 0);
        assert_eq!(ok.owner_user_id, owner.user_id);
    }
}
