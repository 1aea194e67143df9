//! Outbound request path shared by every caller
//!
//! Every request:
//! - carries `Authorization: Bearer <token>` when the session holds one,
//!   read from the session at build time so a fresh sign-in is always seen
//! - turns a 401 into forced session expiry plus a redirect to sign-in,
//!   except on the login/register endpoints where a 401 just means
//!   "wrong credentials"
//!
//! All other failures are handed back to the caller unchanged.

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use crate::api::navigator::Navigator;
use crate::api::types::ErrorBody;
use crate::auth::SessionState;
use crate::core::config::{ApiConfig, SIGN_IN_ROUTE};
use crate::core::error::{Error, FetchError, Result};

pub const LOGIN_PATH: &str = "/users/login";
pub const REGISTER_PATH: &str = "/users/register";
pub const LOGOUT_PATH: &str = "/users/logout";

/// HTTP client wrapper; cheap to clone
#[derive(Clone)]
pub struct ApiGateway {
    client: Client,
    base_url: Url,
    session: Arc<SessionState>,
    navigator: Arc<dyn Navigator>,
}

impl ApiGateway {
    pub fn new(
        config: &ApiConfig,
        session: Arc<SessionState>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .tcp_nodelay(true)
            .connect_timeout(std::time::Duration::from_secs(5))
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::ConfigError {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: normalize_base(&config.base_url)?,
            session,
            navigator,
        })
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET path?query` decoded as `T`
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> std::result::Result<T, FetchError> {
        let token = self.session.bearer_token();
        let request = self.request(Method::GET, path)?.query(query);
        let response = self.execute(request, path, token).await?;
        Ok(response.json::<T>().await?)
    }

    /// `POST path` with a JSON body, decoded as `T`
    pub async fn post<B, T>(&self, path: &str, body: &B) -> std::result::Result<T, FetchError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let token = self.session.bearer_token();
        let request = self.request(Method::POST, path)?.json(body);
        let response = self.execute(request, path, token).await?;
        Ok(response.json::<T>().await?)
    }

    /// `POST path` with a JSON body, ignoring whatever the server returns
    pub async fn post_unit<B>(&self, path: &str, body: &B) -> std::result::Result<(), FetchError>
    where
        B: Serialize + ?Sized,
    {
        let token = self.session.bearer_token();
        let request = self.request(Method::POST, path)?.json(body);
        self.execute(request, path, token).await?;
        Ok(())
    }

    /// `POST path` with no body, carrying an explicit token. Used when the
    /// session has already let go of its credentials (sign-out).
    pub async fn post_with_token(
        &self,
        path: &str,
        token: Option<String>,
    ) -> std::result::Result<(), FetchError> {
        let request = self.request(Method::POST, path)?;
        self.execute(request, path, token).await?;
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> std::result::Result<RequestBuilder, FetchError> {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| FetchError::Network(format!("invalid endpoint {}: {}", path, e)))?;
        Ok(self
            .client
            .request(method, url)
            .header("Content-Type", "application/json"))
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        path: &str,
        token: Option<String>,
    ) -> std::result::Result<Response, FetchError> {
        let request = match &token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        debug!(path, authorized = token.is_some(), "Sending request");
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let message = error_message(response).await;

        if status == StatusCode::UNAUTHORIZED {
            if !is_auth_endpoint(path) {
                self.expire_session(token.as_deref());
            }
            return Err(FetchError::Unauthorized { message });
        }

        warn!(path, status = status.as_u16(), "Request failed");
        Err(FetchError::Server {
            status: status.as_u16(),
            message: message
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_default(),
        })
    }

    fn expire_session(&self, token_used: Option<&str>) {
        if self.session.force_expire(token_used) {
            self.navigator.redirect(SIGN_IN_ROUTE);
        }
    }
}

/// Login and register answer 401 for bad credentials; that is not expiry
pub fn is_auth_endpoint(path: &str) -> bool {
    path.contains(LOGIN_PATH) || path.contains(REGISTER_PATH)
}

fn normalize_base(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw).map_err(|e| Error::ConfigError {
        message: format!("Invalid API base URL '{}': {}", raw, e),
    })?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

async fn error_message(response: Response) -> Option<String> {
    let text = response.text().await.unwrap_or_default();
    if text.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => body.message,
        Err(_) => Some(text.trim().to_string()),
    }
}
