use navflow_shared::{CommentCreate, CommentDto, Listing};

use super::{ApiClient, ApiResult, query_pairs};

impl ApiClient {
    #[tracing::instrument(skip(self))]
    pub async fn list_comments(&self, task_id: u64) -> ApiResult<Vec<CommentDto>> {
        let query = query_pairs([("task_id", Some(task_id.to_string()))]);
        let listing: Listing<CommentDto> = self.get_with("comments/", query).await?;
        Ok(listing.into_items())
    }

    #[tracing::instrument(skip(self, content), fields(task_id = task))]
    pub async fn add_comment(&self, task: u64, content: &str) -> ApiResult<CommentDto> {
        let comment = CommentCreate {
            task,
            content: content.to_string(),
        };
        self.post("comments/", &comment).await
    }
}
