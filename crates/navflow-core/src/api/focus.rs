use navflow_shared::{FocusArgs, FocusedTaskDto, Listing};
use serde_json::Value;

use super::{ApiClient, ApiResult};

impl ApiClient {
    #[tracing::instrument(skip(self))]
    pub async fn list_focus(&self) -> ApiResult<Vec<FocusedTaskDto>> {
        let listing: Listing<FocusedTaskDto> = self.get("focus/").await?;
        Ok(listing.into_items())
    }

    #[tracing::instrument(skip(self), fields(focus_id = id))]
    pub async fn unfocus(&self, id: u64) -> ApiResult<()> {
        self.post_empty::<Value>(&format!("focus/{id}/unfocus/"))
            .await
            .map(|_| ())
    }

    #[tracing::instrument(skip(self, notes), fields(focus_id = id))]
    pub async fn update_focus_notes(&self, id: u64, notes: &str) -> ApiResult<FocusedTaskDto> {
        let args = FocusArgs {
            notes: notes.to_string(),
        };
        self.patch(&format!("focus/{id}/update_notes/"), &args)
            .await
    }
}
