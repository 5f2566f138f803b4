use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::requests::{
    repo::{InsertApplicantError, RequestStore},
    repo_types::{Applicant, ApplicantStatus, NewWorkRequest, TransitionOutcome, WorkRequest},
};

#[derive(Default)]
struct Inner {
    requests: HashMap<Uuid, WorkRequest>,
    // Vec keeps application order.
    applicants: HashMap<Uuid, Vec<Applicant>>,
}

/// In-process request store. One lock covers requests and applicants so a
/// transition is a single check-and-set.
#[derive(Default)]
pub struct MemoryRequestStore {
    inner: RwLock<Inner>,
}

fn newest_first(mut rows: Vec<WorkRequest>) -> Vec<WorkRequest> {
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    rows
}

#[async_trait]
impl RequestStore for MemoryRequestStore {
    async fn create_request(&self, new: NewWorkRequest) -> anyhow::Result<WorkRequest> {
        let request = WorkRequest {
            id: Uuid::new_v4(),
            title: new.title,
            category: new.category,
            description: new.description,
            budget_tokens: new.budget_tokens,
            owner_user_id: new.owner_user_id,
            created_at: OffsetDateTime::now_utc(),
        };
        let mut inner = self.inner.write().await;
        inner.requests.insert(request.id, request.clone());
        inner.applicants.insert(request.id, Vec::new());
        Ok(request)
    }

    async fn get_request(&self, id: Uuid) -> anyhow::Result<Option<WorkRequest>> {
        Ok(self.inner.read().await.requests.get(&id).cloned())
    }

    async fn list_by_owner(&self, owner: Uuid) -> anyhow::Result<Vec<WorkRequest>> {
        let inner = self.inner.read().await;
        let rows = inner
            .requests
            .values()
            .filter(|r| r.owner_user_id == owner)
            .cloned()
            .collect();
        Ok(newest_first(rows))
    }

    async fn list_open(&self, limit: i64) -> anyhow::Result<Vec<WorkRequest>> {
        let inner = self.inner.read().await;
        let rows = inner
            .requests
            .values()
            .filter(|r| {
                !inner
                    .applicants
                    .get(&r.id)
                    .map(|list| list.iter().any(|a| a.status == ApplicantStatus::Approved))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        let mut rows = newest_first(rows);
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }

    async fn insert_applicant(
        &self,
        request_id: Uuid,
        user_id: Uuid,
        applicant_name: &str,
    ) -> Result<Applicant, InsertApplicantError> {
        let mut inner = self.inner.write().await;
        let list = inner.applicants.entry(request_id).or_default();
        if list.iter().any(|a| a.user_id == user_id) {
            return Err(InsertApplicantError::Duplicate);
        }
        let applicant = Applicant {
            id: Uuid::new_v4(),
            request_id,
            user_id,
            applicant_name: applicant_name.to_string(),
            status: ApplicantStatus::Pending,
            applied_at: OffsetDateTime::now_utc(),
            decided_at: None,
        };
        list.push(applicant.clone());
        Ok(applicant)
    }

    async fn list_applicants(&self, request_id: Uuid) -> anyhow::Result<Vec<Applicant>> {
        let inner = self.inner.read().await;
        Ok(inner.applicants.get(&request_id).cloned().unwrap_or_default())
    }

    async fn transition(
        &self,
        request_id: Uuid,
        applicant_id: Uuid,
        from: ApplicantStatus,
        to: ApplicantStatus,
    ) -> anyhow::Result<TransitionOutcome> {
        let mut inner = self.inner.write().await;
        let Some(applicant) = inner
            .applicants
            .get_mut(&request_id)
            .and_then(|list| list.iter_mut().find(|a| a.id == applicant_id))
        else {
            return Ok(TransitionOutcome::Missing);
        };
        if applicant.status != from || !from.can_transition_to(to) {
            return Ok(TransitionOutcome::Conflict(applicant.status));
        }
        applicant.status = to;
        applicant.decided_at = Some(OffsetDateTime::now_utc());
        Ok(TransitionOutcome::Applied(applicant.clone()))
    }
}
