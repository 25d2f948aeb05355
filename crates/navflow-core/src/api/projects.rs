use navflow_shared::{
    Listing, MemberArgs, MemberDto, ProjectCreate, ProjectDetail, ProjectDto, ProjectPatch,
};
use serde_json::Value;

use super::{ApiClient, ApiResult};

impl ApiClient {
    #[tracing::instrument(skip(self))]
    pub async fn list_projects(&self) -> ApiResult<Vec<ProjectDto>> {
        let listing: Listing<ProjectDto> = self.get("projects/").await?;
        Ok(listing.into_items())
    }

    #[tracing::instrument(skip(self), fields(project_id = id))]
    pub async fn get_project(&self, id: u64) -> ApiResult<ProjectDetail> {
        self.get(&format!("projects/{id}/")).await
    }

    #[tracing::instrument(skip(self, project), fields(org_id = project.organization_id))]
    pub async fn create_project(&self, project: &ProjectCreate) -> ApiResult<ProjectDto> {
        self.post("projects/", project).await
    }

    #[tracing::instrument(skip(self, patch), fields(project_id = id))]
    pub async fn update_project(&self, id: u64, patch: &ProjectPatch) -> ApiResult<ProjectDto> {
        self.patch(&format!("projects/{id}/"), patch).await
    }

    #[tracing::instrument(skip(self), fields(project_id = id))]
    pub async fn delete_project(&self, id: u64) -> ApiResult<()> {
        self.delete(&format!("projects/{id}/")).await
    }

    #[tracing::instrument(skip(self), fields(project_id = id))]
    pub async fn project_members(&self, id: u64) -> ApiResult<Vec<MemberDto>> {
        self.get(&format!("projects/{id}/members/")).await
    }

    #[tracing::instrument(skip(self, member), fields(project_id = id))]
    pub async fn add_project_member(&self, id: u64, member: &MemberArgs) -> ApiResult<MemberDto> {
        self.post(&format!("projects/{id}/add_member/"), member)
            .await
    }

    #[tracing::instrument(skip(self, email), fields(project_id = id))]
    pub async fn remove_project_member(&self, id: u64, email: &str) -> ApiResult<()> {
        let member = MemberArgs {
            email: email.to_string(),
            role: None,
        };
        self.post::<_, Value>(&format!("projects/{id}/remove_member/"), &member)
            .await
            .map(|_| ())
    }
}
