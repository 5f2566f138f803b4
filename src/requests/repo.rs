use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::requests::repo_types::{
    Applicant, ApplicantRow, ApplicantStatus, NewWorkRequest, TransitionOutcome, WorkRequest,
};

#[derive(Debug, thiserror::Error)]
pub enum InsertApplicantError {
    #[error("user already applied to this request")]
    Duplicate,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn create_request(&self, new: NewWorkRequest) -> anyhow::Result<WorkRequest>;
    async fn get_request(&self, id: Uuid) -> anyhow::Result<Option<WorkRequest>>;
    async fn list_by_owner(&self, owner: Uuid) -> anyhow::Result<Vec<WorkRequest>>;
    async fn list_open(&self, limit: i64) -> anyhow::Result<Vec<WorkRequest>>;

    async fn insert_applicant(
        &self,
        request_id: Uuid,
        user_id: Uuid,
        applicant_name: &str,
    ) -> Result<Applicant, InsertApplicantError>;

    /// Applicants of a request in application order.
    async fn list_applicants(&self, request_id: Uuid) -> anyhow::Result<Vec<Applicant>>;

    /// Atomically set `to` if and only if the current status is `from`.
    async fn transition(
        &self,
        request_id: Uuid,
        applicant_id: Uuid,
        from: ApplicantStatus,
        to: ApplicantStatus,
    ) -> anyhow::Result<TransitionOutcome>;
}

#[derive(Clone)]
pub struct PgRequestStore {
    db: PgPool,
}

impl PgRequestStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const APPLICANT_COLUMNS: &str =
    "id, request_id, user_id, applicant_name, status, applied_at, decided_at";

#[async_trait]
impl RequestStore for PgRequestStore {
    async fn create_request(&self, new: NewWorkRequest) -> anyhow::Result<WorkRequest> {
        let row = sqlx::query_as::<_, WorkRequest>(
            r#"
            INSERT INTO requests (id, title, category, description, budget_tokens, owner_user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, title, category, description, budget_tokens, owner_user_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.title)
        .bind(&new.category)
        .bind(&new.description)
        .bind(new.budget_tokens)
        .bind(new.owner_user_id)
        .fetch_one(&self.db)
        .await
        .context("insert request")?;
        Ok(row)
    }

    async fn get_request(&self, id: Uuid) -> anyhow::Result<Option<WorkRequest>> {
        let row = sqlx::query_as::<_, WorkRequest>(
            r#"
            SELECT id, title, category, description, budget_tokens, owner_user_id, created_at
            FROM requests
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("get request")?;
        Ok(row)
    }

    async fn list_by_owner(&self, owner: Uuid) -> anyhow::Result<Vec<WorkRequest>> {
        let rows = sqlx::query_as::<_, WorkRequest>(
            r#"
            SELECT id, title, category, description, budget_tokens, owner_user_id, created_at
            FROM requests
            WHERE owner_user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner)
        .fetch_all(&self.db)
        .await
        .context("list requests by owner")?;
        Ok(rows)
    }

    async fn list_open(&self, limit: i64) -> anyhow::Result<Vec<WorkRequest>> {
        let rows = sqlx::query_as::<_, WorkRequest>(
            r#"
            SELECT r.id, r.title, r.category, r.description, r.budget_tokens, r.owner_user_id, r.created_at
            FROM requests r
            WHERE NOT EXISTS (
                SELECT 1 FROM applicants a
                WHERE a.request_id = r.id AND a.status = 'approved'
            )
            ORDER BY r.created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await
        .context("list open requests")?;
        Ok(rows)
    }

    async fn insert_applicant(
        &self,
        request_id: Uuid,
        user_id: Uuid,
        applicant_name: &str,
    ) -> Result<Applicant, InsertApplicantError> {
        let res = sqlx::query_as::<_, ApplicantRow>(&format!(
            r#"
            INSERT INTO applicants (id, request_id, user_id, applicant_name, status)
            VALUES ($1, $2, $3, $4, 'pending')
            RETURNING {APPLICANT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(request_id)
        .bind(user_id)
        .bind(applicant_name)
        .fetch_one(&self.db)
        .await;

        match res {
            Ok(row) => Ok(Applicant::try_from(row)?),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(InsertApplicantError::Duplicate)
            }
            Err(e) => Err(anyhow::Error::new(e).context("insert applicant").into()),
        }
    }

    async fn list_applicants(&self, request_id: Uuid) -> anyhow::Result<Vec<Applicant>> {
        let rows = sqlx::query_as::<_, ApplicantRow>(&format!(
            r#"
            SELECT {APPLICANT_COLUMNS}
            FROM applicants
            WHERE request_id = $1
            ORDER BY seq ASC
            "#
        ))
        .bind(request_id)
        .fetch_all(&self.db)
        .await
        .context("list applicants")?;

        rows.into_iter().map(Applicant::try_from).collect()
    }

    async fn transition(
        &self,
        request_id: Uuid,
        applicant_id: Uuid,
        from: ApplicantStatus,
        to: ApplicantStatus,
    ) -> anyhow::Result<TransitionOutcome> {
        if from.can_transition_to(to) {
            // The status predicate makes this a compare-and-swap: of two racing
            // updates only one sees `from` and returns a row.
            let updated = sqlx::query_as::<_, ApplicantRow>(&format!(
                r#"
                UPDATE applicants
                   SET status = $4, decided_at = now()
                 WHERE id = $1 AND request_id = $2 AND status = $3
                RETURNING {APPLICANT_COLUMNS}
                "#
            ))
            .bind(applicant_id)
            .bind(request_id)
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(&self.db)
            .await
            .context("transition applicant")?;

            if let Some(row) = updated {
                return Ok(TransitionOutcome::Applied(Applicant::try_from(row)?));
            }
        }

        let current: Option<(String,)> = sqlx::query_as(
            r#"SELECT status FROM applicants WHERE id = $1 AND request_id = $2"#,
        )
        .bind(applicant_id)
        .bind(request_id)
        .fetch_optional(&self.db)
        .await
        .context("read applicant status")?;

        Ok(match current {
            Some((status,)) => TransitionOutcome::Conflict(status.parse()?),
            None => TransitionOutcome::Missing,
        })
    }
}
