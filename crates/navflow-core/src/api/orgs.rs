use navflow_shared::{
    InvitationDto, InviteRequest, Listing, MemberArgs, MemberDto, OrgPermissions,
    OrganizationCreate, OrganizationDto, OrganizationPatch, PermissionUpdate,
    PermissionUpdateResult, Role, RoleUpdate,
};
use serde_json::Value;

use super::{ApiClient, ApiResult};

impl ApiClient {
    #[tracing::instrument(skip(self))]
    pub async fn list_orgs(&self) -> ApiResult<Vec<OrganizationDto>> {
        let listing: Listing<OrganizationDto> = self.get("orgs/").await?;
        Ok(listing.into_items())
    }

    #[tracing::instrument(skip(self), fields(org_id = id))]
    pub async fn get_org(&self, id: u64) -> ApiResult<OrganizationDto> {
        self.get(&format!("orgs/{id}/")).await
    }

    #[tracing::instrument(skip(self, org))]
    pub async fn create_org(&self, org: &OrganizationCreate) -> ApiResult<OrganizationDto> {
        self.post("orgs/", org).await
    }

    #[tracing::instrument(skip(self, patch), fields(org_id = id))]
    pub async fn update_org(&self, id: u64, patch: &OrganizationPatch) -> ApiResult<OrganizationDto> {
        self.patch(&format!("orgs/{id}/"), patch).await
    }

    #[tracing::instrument(skip(self), fields(org_id = id))]
    pub async fn delete_org(&self, id: u64) -> ApiResult<()> {
        self.delete(&format!("orgs/{id}/")).await
    }

    #[tracing::instrument(skip(self), fields(org_id = id))]
    pub async fn org_members(&self, id: u64) -> ApiResult<Vec<MemberDto>> {
        let listing: Listing<MemberDto> = self.get(&format!("orgs/{id}/members/")).await?;
        Ok(listing.into_items())
    }

    #[tracing::instrument(skip(self, member), fields(org_id = id))]
    pub async fn add_org_member(&self, id: u64, member: &MemberArgs) -> ApiResult<Value> {
        self.post(&format!("orgs/{id}/add_member/"), member).await
    }

    #[tracing::instrument(skip(self, identifier), fields(org_id = id, role = %role))]
    pub async fn invite(&self, id: u64, identifier: &str, role: Role) -> ApiResult<Value> {
        let request = InviteRequest {
            identifier: identifier.to_string(),
            role,
        };
        self.post(&format!("orgs/{id}/invite/"), &request).await
    }

    #[tracing::instrument(skip(self, email), fields(org_id = id, role = %role))]
    pub async fn update_role(&self, id: u64, email: &str, role: Role) -> ApiResult<Value> {
        let update = RoleUpdate {
            user_email: email.to_string(),
            role,
        };
        self.post(&format!("orgs/{id}/update_role/"), &update).await
    }

    #[tracing::instrument(skip(self, email), fields(org_id = id))]
    pub async fn remove_org_member(&self, id: u64, email: &str) -> ApiResult<()> {
        let member = MemberArgs {
            email: email.to_string(),
            role: None,
        };
        self.post::<_, Value>(&format!("orgs/{id}/remove_member/"), &member)
            .await
            .map(|_| ())
    }

    #[tracing::instrument(skip(self), fields(org_id = id))]
    pub async fn org_invitations(&self, id: u64) -> ApiResult<Vec<InvitationDto>> {
        let listing: Listing<InvitationDto> = self.get(&format!("orgs/{id}/invitations/")).await?;
        Ok(listing.into_items())
    }

    /// Invitations addressed to the signed-in user.
    #[tracing::instrument(skip(self))]
    pub async fn my_invitations(&self) -> ApiResult<Vec<InvitationDto>> {
        let listing: Listing<InvitationDto> = self.get("orgs/invitations/").await?;
        Ok(listing.into_items())
    }

    #[tracing::instrument(skip(self), fields(invitation_id = id))]
    pub async fn accept_invitation(&self, id: u64) -> ApiResult<Value> {
        self.post_empty(&format!("orgs/invitations/{id}/accept/"))
            .await
    }

    #[tracing::instrument(skip(self), fields(invitation_id = id))]
    pub async fn decline_invitation(&self, id: u64) -> ApiResult<Value> {
        self.post_empty(&format!("orgs/invitations/{id}/decline/"))
            .await
    }

    #[tracing::instrument(skip(self), fields(org_id = id))]
    pub async fn org_permissions(&self, id: u64) -> ApiResult<OrgPermissions> {
        self.get(&format!("orgs/{id}/permissions/")).await
    }

    #[tracing::instrument(skip(self, update), fields(org_id = id, role = %update.role, permission = %update.permission))]
    pub async fn update_permission(
        &self,
        id: u64,
        update: &PermissionUpdate,
    ) -> ApiResult<OrgPermissions> {
        let result: PermissionUpdateResult = self
            .post(&format!("orgs/{id}/permissions/update/"), update)
            .await?;
        Ok(result.permissions)
    }
}
