use navflow_shared::{AuditLogEntry, Listing};

use super::{ApiClient, ApiResult, query_pairs};

/// Server-side filters for the activity feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditQuery {
    pub organization: Option<u64>,
    pub action: Option<String>,
    pub content_type: Option<String>,
    pub page: Option<u32>,
}

impl AuditQuery {
    fn pairs(&self) -> Vec<(String, String)> {
        query_pairs([
            ("organization", self.organization.map(|id| id.to_string())),
            ("action", self.action.clone()),
            ("content_type", self.content_type.clone()),
            ("page", self.page.map(|p| p.to_string())),
        ])
    }
}

impl ApiClient {
    #[tracing::instrument(skip(self))]
    pub async fn audit_logs(&self, query: &AuditQuery) -> ApiResult<Vec<AuditLogEntry>> {
        let listing: Listing<AuditLogEntry> = self.get_with("audit-logs/", query.pairs()).await?;
        Ok(listing.into_items())
    }
}
