use navflow_shared::{Listing, NotificationDto};
use serde_json::Value;

use super::{ApiClient, ApiResult};

impl ApiClient {
    #[tracing::instrument(skip(self))]
    pub async fn list_notifications(&self) -> ApiResult<Vec<NotificationDto>> {
        let listing: Listing<NotificationDto> = self.get("notifications/").await?;
        Ok(listing.into_items())
    }

    #[tracing::instrument(skip(self), fields(notification_id = id))]
    pub async fn mark_notification_read(&self, id: u64) -> ApiResult<()> {
        self.post_empty::<Value>(&format!("notifications/{id}/mark_read/"))
            .await
            .map(|_| ())
    }

    #[tracing::instrument(skip(self))]
    pub async fn mark_all_notifications_read(&self) -> ApiResult<()> {
        self.post_empty::<Value>("notifications/mark_all_read/")
            .await
            .map(|_| ())
    }

    #[tracing::instrument(skip(self), fields(notification_id = id))]
    pub async fn accept_notification(&self, id: u64) -> ApiResult<()> {
        self.post_empty::<Value>(&format!("notifications/{id}/accept/"))
            .await
            .map(|_| ())
    }

    #[tracing::instrument(skip(self), fields(notification_id = id))]
    pub async fn decline_notification(&self, id: u64) -> ApiResult<()> {
        self.post_empty::<Value>(&format!("notifications/{id}/decline/"))
            .await
            .map(|_| ())
    }
}
