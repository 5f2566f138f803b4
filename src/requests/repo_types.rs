use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicantStatus {
    Pending,
    Approved,
    Denied,
}

impl ApplicantStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicantStatus::Pending => "pending",
            ApplicantStatus::Approved => "approved",
            ApplicantStatus::Denied => "denied",
        }
    }

    /// Only `pending` may move, and only to a decision. Decisions are final.
    pub fn can_transition_to(self, next: ApplicantStatus) -> bool {
        matches!(
            (self, next),
            (ApplicantStatus::Pending, ApplicantStatus::Approved)
                | (ApplicantStatus::Pending, ApplicantStatus::Denied)
        )
    }
}

impl std::fmt::Display for ApplicantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ApplicantStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApplicantStatus::Pending),
            "approved" => Ok(ApplicantStatus::Approved),
            "denied" => Ok(ApplicantStatus::Denied),
            other => anyhow::bail!("unknown applicant status {other:?}"),
        }
    }
}

/// Work request posted by a user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkRequest {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub description: String,
    pub budget_tokens: i64,
    pub owner_user_id: Uuid,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewWorkRequest {
    pub title: String,
    pub category: String,
    pub description: String,
    pub budget_tokens: i64,
    pub owner_user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Applicant {
    pub id: Uuid,
    pub request_id: Uuid,
    pub user_id: Uuid,
    pub applicant_name: String,
    pub status: ApplicantStatus,
    pub applied_at: OffsetDateTime,
    pub decided_at: Option<OffsetDateTime>,
}

/// Raw `applicants` row; `status` is TEXT in the database.
#[derive(Debug, FromRow)]
pub struct ApplicantRow {
    pub id: Uuid,
    pub request_id: Uuid,
    pub user_id: Uuid,
    pub applicant_name: String,
    pub status: String,
    pub applied_at: OffsetDateTime,
    pub decided_at: Option<OffsetDateTime>,
}

impl TryFrom<ApplicantRow> for Applicant {
    type Error = anyhow::Error;

    fn try_from(r: ApplicantRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            request_id: r.request_id,
            user_id: r.user_id,
            applicant_name: r.applicant_name,
            status: r.status.parse()?,
            applied_at: r.applied_at,
            decided_at: r.decided_at,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Approved,
    Denied,
}

impl StatusFilter {
    pub fn matches(self, status: ApplicantStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Pending => status == ApplicantStatus::Pending,
            StatusFilter::Approved => status == ApplicantStatus::Approved,
            StatusFilter::Denied => status == ApplicantStatus::Denied,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplicantSummary {
    pub total: usize,
    pub approved: usize,
    pub pending: usize,
    pub denied: usize,
}

/// Outcome of a compare-and-swap on an applicant's status.
#[derive(Debug)]
pub enum TransitionOutcome {
    Applied(Applicant),
    /// The applicant exists but was not in the expected state.
    Conflict(ApplicantStatus),
    Missing,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ApplicantStatus::*;

    #[test]
    fn only_pending_moves_and_only_to_a_decision() {
        for (from, to, ok) in [
            (Pending, Approved, true),
            (Pending, Denied, true),
            (Pending, Pending, false),
            (Approved, Denied, false),
            (Approved, Pending, false),
            (Denied, Approved, false),
            (Denied, Pending, false),
        ] {
            assert_eq!(from.can_transition_to(to), ok, "{from} -> {to}");
        }
    }
}
