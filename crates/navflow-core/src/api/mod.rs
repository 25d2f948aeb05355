//! Authenticated REST client for the NavFlow backend.
//!
//! Every request goes through [`ApiClient::send`], which attaches the bearer
//! token, and on a `401` performs exactly one token refresh followed by one
//! replay of the original request.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use parking_lot::Mutex;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use navflow_shared::{RefreshRequest, RefreshResponse};

use crate::notice::server_message;
use crate::session::Session;

mod account;
mod audit;
mod comments;
mod error;
mod focus;
mod notifications;
mod orgs;
mod projects;
mod sections;
mod tasks;

pub use audit::AuditQuery;
pub use error::ApiError;

pub type ApiResult<T> = Result<T, ApiError>;

const REFRESH_PATH: &str = "accounts/token/refresh/";

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<Mutex<Session>>,
}

/// A request that can be replayed after a token refresh.
#[derive(Debug, Clone)]
struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    authenticated: bool,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            authenticated: true,
        }
    }

    fn query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query = pairs;
        self
    }

    fn json<B: Serialize>(mut self, body: &B) -> ApiResult<Self> {
        let value = serde_json::to_value(body).map_err(|source| ApiError::Decode {
            path: self.path.clone(),
            source,
        })?;
        self.body = Some(value);
        Ok(self)
    }

    fn anonymous(mut self) -> Self {
        self.authenticated = false;
        self
    }
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        session: Arc<Mutex<Session>>,
    ) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .user_agent(concat!("navflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &Arc<Mutex<Session>> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn require_session(&self) -> ApiResult<()> {
        if self.session.lock().is_authenticated() {
            Ok(())
        } else {
            Err(ApiError::NotSignedIn)
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.send(ApiRequest::new(Method::GET, path)).await
    }

    async fn get_with<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> ApiResult<T> {
        self.send(ApiRequest::new(Method::GET, path).query(query))
            .await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> ApiResult<T> {
        self.send(ApiRequest::new(Method::POST, path).json(body)?)
            .await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.send(ApiRequest::new(Method::POST, path)).await
    }

    async fn patch<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> ApiResult<T> {
        self.send(ApiRequest::new(Method::PATCH, path).json(body)?)
            .await
    }

    async fn delete(&self, path: &str) -> ApiResult<()> {
        self.send::<Value>(ApiRequest::new(Method::DELETE, path))
            .await
            .map(|_| ())
    }

    #[tracing::instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        let token = if request.authenticated {
            self.session.lock().access_token().map(str::to_string)
        } else {
            None
        };

        let response = self.dispatch(&request, token.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED || !request.authenticated {
            return self.decode(&request.path, response).await;
        }

        info!("access token rejected; refreshing once");
        let access = self.refresh().await?;

        let replay = self.dispatch(&request, Some(&access)).await?;
        if replay.status() == StatusCode::UNAUTHORIZED {
            warn!("replayed request rejected after refresh");
            return Err(ApiError::Unauthorized);
        }
        self.decode(&request.path, replay).await
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> ApiResult<reqwest::Response> {
        let mut builder = self
            .http
            .request(request.method.clone(), self.url(&request.path));
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        debug!(
            status = response.status().as_u16(),
            bearer = token.is_some(),
            "response received"
        );
        Ok(response)
    }

    /// Exchanges the refresh token for a new access token. Any failure ends
    /// the session.
    #[tracing::instrument(skip(self))]
    async fn refresh(&self) -> ApiResult<String> {
        let refresh = self.session.lock().refresh_token().map(str::to_string);
        let outcome = match refresh {
            Some(refresh) => self.request_refresh(refresh).await,
            None => {
                debug!("no refresh token stored");
                None
            }
        };

        match outcome {
            Some(tokens) => {
                let access = tokens.access.unwrap_or_default();
                if let Err(err) = self
                    .session
                    .lock()
                    .set_access_token(&access, tokens.refresh.as_deref())
                {
                    warn!(error = %err, "failed to persist refreshed token");
                }
                Ok(access)
            }
            None => {
                self.expire_session();
                Err(ApiError::SessionExpired)
            }
        }
    }

    /// `None` on any failure: transport, non-2xx, undecodable body, or a
    /// body without `access`.
    async fn request_refresh(&self, refresh: String) -> Option<RefreshResponse> {
        let request = ApiRequest::new(Method::POST, REFRESH_PATH)
            .anonymous()
            .json(&RefreshRequest { refresh })
            .ok()?;

        let response = match self.dispatch(&request, None).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "token refresh transport failure");
                return None;
            }
        };
        if !response.status().is_success() {
            warn!(status = response.status().as_u16(), "token refresh rejected");
            return None;
        }

        match response.json::<RefreshResponse>().await {
            Ok(tokens) if tokens.access.as_deref().is_some_and(|a| !a.is_empty()) => Some(tokens),
            Ok(_) => {
                warn!("token refresh response carried no access token");
                None
            }
            Err(err) => {
                warn!(error = %err, "token refresh response undecodable");
                None
            }
        }
    }

    fn expire_session(&self) {
        if let Err(err) = self.session.lock().logout() {
            warn!(error = %err, "failed to clear stored credentials");
        }
        info!("session expired; credentials cleared");
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        path: &str,
        response: reqwest::Response,
    ) -> ApiResult<T> {
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<Value>(&bytes)
                .ok()
                .and_then(|body| server_message(&body));
            debug!(status = status.as_u16(), has_message = message.is_some(), "request failed");
            return Err(ApiError::Status { status, message });
        }

        let body: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &bytes
        };
        serde_json::from_slice(body).map_err(|source| ApiError::Decode {
            path: path.to_string(),
            source,
        })
    }
}

fn query_pairs<const N: usize>(pairs: [(&str, Option<String>); N]) -> Vec<(String, String)> {
    pairs
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
        .collect()
}
