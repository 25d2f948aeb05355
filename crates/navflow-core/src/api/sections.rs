use navflow_shared::{Listing, SectionCreate, SectionDto, SectionPatch};

use super::{ApiClient, ApiResult, query_pairs};

impl ApiClient {
    #[tracing::instrument(skip(self))]
    pub async fn list_sections(&self, project: u64) -> ApiResult<Vec<SectionDto>> {
        let query = query_pairs([("project", Some(project.to_string()))]);
        let listing: Listing<SectionDto> = self.get_with("sections/", query).await?;
        Ok(listing.into_items())
    }

    #[tracing::instrument(skip(self, section), fields(project_id = section.project))]
    pub async fn create_section(&self, section: &SectionCreate) -> ApiResult<SectionDto> {
        self.post("sections/", section).await
    }

    #[tracing::instrument(skip(self, patch), fields(section_id = id))]
    pub async fn update_section(&self, id: u64, patch: &SectionPatch) -> ApiResult<SectionDto> {
        self.patch(&format!("sections/{id}/"), patch).await
    }

    #[tracing::instrument(skip(self), fields(section_id = id))]
    pub async fn delete_section(&self, id: u64) -> ApiResult<()> {
        self.delete(&format!("sections/{id}/")).await
    }

    #[tracing::instrument(skip(self), fields(section_id = id))]
    pub async fn set_default_section(&self, id: u64) -> ApiResult<SectionDto> {
        self.post_empty(&format!("sections/{id}/set_default/"))
            .await
    }
}
