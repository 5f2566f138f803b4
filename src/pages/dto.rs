use serde::{Deserialize, Serialize};

use crate::{
    auth::dto::CurrentUser,
    catalog::Gig,
    requests::repo_types::{ApplicantSummary, WorkRequest},
};

/// Fields every page view carries for the layout.
#[derive(Debug, Serialize)]
pub struct Layout {
    pub title: String,
    pub page_class: &'static str,
    pub current_user: Option<CurrentUser>,
    pub wallet_balance: i64,
}

#[derive(Debug, Serialize)]
pub struct HomePage {
    #[serde(flatten)]
    pub layout: Layout,
    pub categories: Vec<String>,
    pub gigs: Vec<Gig>,
}

#[derive(Debug, Serialize)]
pub struct ExplorePage {
    #[serde(flatten)]
    pub layout: Layout,
    pub categories: Vec<String>,
    pub gigs: Vec<Gig>,
    pub requests: Vec<WorkRequest>,
}

#[derive(Debug, Serialize)]
pub struct GigPage {
    #[serde(flatten)]
    pub layout: Layout,
    pub gig: Gig,
}

#[derive(Debug, Serialize)]
pub struct DashboardPage {
    #[serde(flatten)]
    pub layout: Layout,
    pub tokens_earned: i64,
    pub tokens_spent: i64,
}

#[derive(Debug, Serialize)]
pub struct OwnedRequest {
    pub request: WorkRequest,
    pub summary: ApplicantSummary,
}

#[derive(Debug, Serialize)]
pub struct ProfilePage {
    #[serde(flatten)]
    pub layout: Layout,
    pub requests: Vec<OwnedRequest>,
}

#[derive(Debug, Serialize)]
pub struct FormPage {
    #[serde(flatten)]
    pub layout: Layout,
    pub categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceQuery {
    pub applicant_name: Option<String>,
    pub request_title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WorkspacePage {
    #[serde(flatten)]
    pub layout: Layout,
    pub applicant_name: String,
    pub request_title: String,
    pub request_id: String,
    pub applicant_id: String,
}
