use navflow_shared::{
    LoginRequest, RefreshRequest, RegisterRequest, TokenPair, UserDto, UserPatch,
};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use super::{ApiClient, ApiError, ApiRequest, ApiResult};

/// Registration answers either with a flat token pair or with the pair
/// nested under `tokens`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RegisterResponse {
    Nested {
        tokens: TokenPair,
        #[serde(default)]
        user: Option<UserDto>,
    },
    Flat(TokenPair),
}

impl ApiClient {
    /// Signs in and stores both tokens in the session.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<Option<UserDto>> {
        let request = ApiRequest::new(Method::POST, "accounts/login/")
            .anonymous()
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })?;
        let pair: TokenPair = self.send(request).await?;
        self.establish(pair.access, pair.refresh, pair.user)
    }

    #[tracing::instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest) -> ApiResult<Option<UserDto>> {
        let request = ApiRequest::new(Method::POST, "accounts/register/")
            .anonymous()
            .json(request)?;
        let (pair, user) = match self.send::<RegisterResponse>(request).await? {
            RegisterResponse::Nested { tokens, user } => {
                let user = user.or(tokens.user.clone());
                (tokens, user)
            }
            RegisterResponse::Flat(pair) => {
                let user = pair.user.clone();
                (pair, user)
            }
        };
        self.establish(pair.access, pair.refresh, user)
    }

    /// Best-effort server logout; local credentials are always cleared.
    #[tracing::instrument(skip(self))]
    pub async fn logout(&self) -> anyhow::Result<()> {
        let refresh = self.session().lock().refresh_token().map(str::to_string);
        if let Some(refresh) = refresh {
            let request = ApiRequest::new(Method::POST, "accounts/logout/").json(&RefreshRequest { refresh })?;
            if let Err(err) = self.send::<Value>(request).await {
                warn!(error = %err, "server logout failed; clearing local session anyway");
            }
        }
        self.session().lock().logout()
    }

    #[tracing::instrument(skip(self))]
    pub async fn current_user(&self) -> ApiResult<UserDto> {
        self.require_session()?;
        let user: UserDto = self.get("accounts/user/").await?;
        self.session().lock().set_user(Some(user.clone()));
        Ok(user)
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update_profile(&self, patch: &UserPatch) -> ApiResult<UserDto> {
        self.require_session()?;
        let user: UserDto = self.patch("accounts/user/", patch).await?;
        self.session().lock().set_user(Some(user.clone()));
        Ok(user)
    }

    fn establish(
        &self,
        access: String,
        refresh: Option<String>,
        user: Option<UserDto>,
    ) -> ApiResult<Option<UserDto>> {
        if access.is_empty() {
            return Err(ApiError::Status {
                status: reqwest::StatusCode::BAD_GATEWAY,
                message: Some("server issued no access token".to_string()),
            });
        }
        let mut session = self.session().lock();
        if let Err(err) = session.login(&access, refresh.as_deref(), user.clone()) {
            warn!(error = %err, "failed to persist credentials");
        }
        info!(has_user = user.is_some(), "signed in");
        Ok(user)
    }
}
