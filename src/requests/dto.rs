use serde::{Deserialize, Serialize};

use crate::requests::{
    repo_types::{Applicant, ApplicantSummary, StatusFilter, WorkRequest},
    services::Workspace,
};

/// Body of `POST /requests`, as posted by the new-request form.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    // kept as text so a malformed number is a form error, not a 422 from the extractor
    #[serde(default)]
    pub budget_tokens: String,
}

#[derive(Debug, Deserialize)]
pub struct ApplicantQuery {
    #[serde(default)]
    pub status: StatusFilter,
}

#[derive(Debug, Serialize)]
pub struct RequestDetails {
    pub request: WorkRequest,
    pub summary: ApplicantSummary,
}

#[derive(Debug, Serialize)]
pub struct ApplicantList {
    pub filter: StatusFilter,
    pub summary: ApplicantSummary,
    pub applicants: Vec<Applicant>,
}

#[derive(Debug, Serialize)]
pub struct ApprovedResponse {
    pub applicant: Applicant,
    pub workspace: Workspace,
}
