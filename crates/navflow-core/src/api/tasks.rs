use navflow_shared::{AddTime, FocusArgs, FocusedTaskDto, Listing, TaskCreate, TaskDto, TaskPatch, TaskReorder};
use serde_json::Value;

use super::{ApiClient, ApiResult, query_pairs};

impl ApiClient {
    #[tracing::instrument(skip(self))]
    pub async fn list_tasks(&self, project: Option<u64>) -> ApiResult<Vec<TaskDto>> {
        let query = query_pairs([("project", project.map(|id| id.to_string()))]);
        let listing: Listing<TaskDto> = self.get_with("tasks/", query).await?;
        Ok(listing.into_items())
    }

    #[tracing::instrument(skip(self), fields(task_id = id))]
    pub async fn get_task(&self, id: u64) -> ApiResult<TaskDto> {
        self.get(&format!("tasks/{id}/")).await
    }

    #[tracing::instrument(skip(self, task), fields(project_id = task.project_id))]
    pub async fn create_task(&self, task: &TaskCreate) -> ApiResult<TaskDto> {
        self.post("tasks/", task).await
    }

    #[tracing::instrument(skip(self, patch), fields(task_id = id))]
    pub async fn update_task(&self, id: u64, patch: &TaskPatch) -> ApiResult<TaskDto> {
        self.patch(&format!("tasks/{id}/"), patch).await
    }

    #[tracing::instrument(skip(self), fields(task_id = id))]
    pub async fn delete_task(&self, id: u64) -> ApiResult<()> {
        self.delete(&format!("tasks/{id}/")).await
    }

    #[tracing::instrument(skip(self), fields(task_id = id))]
    pub async fn start_timer(&self, id: u64) -> ApiResult<TaskDto> {
        self.post_empty(&format!("tasks/{id}/start_timer/")).await
    }

    #[tracing::instrument(skip(self), fields(task_id = id))]
    pub async fn stop_timer(&self, id: u64) -> ApiResult<TaskDto> {
        self.post_empty(&format!("tasks/{id}/stop_timer/")).await
    }

    #[tracing::instrument(skip(self), fields(task_id = id))]
    pub async fn add_time(&self, id: u64, minutes: u64) -> ApiResult<TaskDto> {
        self.post(&format!("tasks/{id}/add_time/"), &AddTime { minutes })
            .await
    }

    #[tracing::instrument(skip(self, reorder), fields(count = reorder.tasks.len()))]
    pub async fn reorder_tasks(&self, reorder: &TaskReorder) -> ApiResult<()> {
        self.post::<_, Value>("tasks/reorder/", reorder)
            .await
            .map(|_| ())
    }

    #[tracing::instrument(skip(self, notes), fields(task_id = id))]
    pub async fn focus_task(&self, id: u64, notes: &str) -> ApiResult<FocusedTaskDto> {
        let args = FocusArgs {
            notes: notes.to_string(),
        };
        self.post(&format!("tasks/{id}/focus/"), &args).await
    }
}
