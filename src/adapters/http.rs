//! Typed client for the site's REST API.
//!
//! Requests carry the stored bearer token (except the contact submission).
//! A 401 triggers a single refresh through `token/refresh/` followed by one
//! retry; if the refresh fails both tokens are dropped.

use crate::domain::model::{
    CalculateRequest, ContactInquiry, EstimateResult, EstimationRules, ParameterSet, ServiceInfo,
};
use crate::domain::ports::{ConfigProvider, ContactApi, KeyValueStore, PricingApi, ServiceCatalog};
use crate::utils::error::{EstimatorError, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api/";
pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

const RULES_PATH: &str = "estimation/rules/";
const CALCULATE_PATH: &str = "estimation/calculate/";
const CONTACT_PATH: &str = "contact/";
const TOKEN_REFRESH_PATH: &str = "token/refresh/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    Bearer,
    Skip,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
}

pub struct ApiClient {
    client: Client,
    base_url: Url,
    tokens: Option<Arc<dyn KeyValueStore>>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("site-estimator/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: Self::normalize_base_url(base_url)?,
            tokens: None,
        })
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        Self::new(
            config.api_base_url(),
            Duration::from_secs(config.request_timeout_seconds()),
        )
    }

    /// Where `access_token` / `refresh_token` are read from and written to.
    pub fn with_token_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.tokens = Some(store);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // Url::join drops the last segment unless the base ends with '/'
    fn normalize_base_url(raw: &str) -> Result<Url> {
        let mut base = raw.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Url::parse(&base)?)
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    fn service_endpoint(&self, slug: &str) -> Result<Url> {
        let mut url = self.endpoint("services/")?;
        url.path_segments_mut()
            .map_err(|_| EstimatorError::ConfigError {
                message: format!("API base URL cannot be a base: {}", self.base_url),
            })?
            .pop_if_empty()
            .push(slug)
            .push("");
        Ok(url)
    }

    fn access_token(&self) -> Option<String> {
        let store = self.tokens.as_ref()?;
        match store.get(ACCESS_TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!("⚠️ Could not read access token: {}", e);
                None
            }
        }
    }

    pub fn clear_tokens(&self) {
        if let Some(store) = &self.tokens {
            for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
                if let Err(e) = store.remove(key) {
                    warn!("⚠️ Could not remove {}: {}", key, e);
                }
            }
        }
    }

    fn build<B>(&self, method: Method, url: Url, body: Option<&B>, token: Option<&str>) -> RequestBuilder
    where
        B: Serialize + ?Sized,
    {
        let mut request = self.client.request(method, url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request
    }

    async fn send<B>(&self, method: Method, url: Url, body: Option<&B>, auth: Auth) -> Result<Response>
    where
        B: Serialize + ?Sized + Sync,
    {
        let token = match auth {
            Auth::Bearer => self.access_token(),
            Auth::Skip => None,
        };

        debug!("📡 {} {}", method, url);
        let response = self
            .build(method.clone(), url.clone(), body, token.as_deref())
            .send()
            .await?;
        debug!("📡 {} {} -> {}", method, url, response.status());

        if response.status() == StatusCode::UNAUTHORIZED && auth == Auth::Bearer && self.tokens.is_some() {
            warn!("🔑 {} {} returned 401, refreshing access token", method, url);
            let fresh = match self.refresh_access_token().await {
                Ok(token) => token,
                Err(e) => {
                    self.clear_tokens();
                    return Err(EstimatorError::Unauthorized {
                        message: e.to_string(),
                    });
                }
            };

            let retry = self.build(method, url, body, Some(&fresh)).send().await?;
            return Self::check_status(retry).await;
        }

        Self::check_status(response).await
    }

    async fn refresh_access_token(&self) -> Result<String> {
        let store = self.tokens.as_ref().ok_or_else(|| EstimatorError::Unauthorized {
            message: "no token store configured".to_string(),
        })?;
        let refresh = store
            .get(REFRESH_TOKEN_KEY)?
            .filter(|t| !t.is_empty())
            .ok_or_else(|| EstimatorError::Unauthorized {
                message: "no refresh token stored".to_string(),
            })?;

        let url = self.endpoint(TOKEN_REFRESH_PATH)?;
        let response = self
            .client
            .post(url)
            .json(&RefreshRequest { refresh: &refresh })
            .send()
            .await?;
        let body: RefreshResponse = Self::check_status(response).await?.json().await?;

        store.set(ACCESS_TOKEN_KEY, &body.access)?;
        info!("🔑 Access token refreshed");
        Ok(body.access)
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        Err(EstimatorError::HttpStatus {
            status: status.as_u16(),
            message: extract_error_message(&text),
        })
    }
}

/// Pulls a human-readable reason out of an error body
/// (`{"error": ..}`, `{"detail": ..}`, `{"message": ..}` or DRF field errors).
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;

    for key in ["error", "detail", "message"] {
        if let Some(text) = object.get(key).and_then(|v| v.as_str()) {
            return Some(text.to_string());
        }
    }

    object.iter().find_map(|(field, value)| {
        let text = match value {
            serde_json::Value::String(s) => Some(s.as_str()),
            serde_json::Value::Array(items) => items.iter().find_map(|v| v.as_str()),
            _ => None,
        }?;
        Some(format!("{}: {}", field, text))
    })
}

#[async_trait]
impl PricingApi for ApiClient {
    async fn estimation_rules(&self) -> Result<EstimationRules> {
        let url = self.endpoint(RULES_PATH)?;
        let response = self.send::<()>(Method::GET, url, None, Auth::Bearer).await?;
        let rules: Option<EstimationRules> = response.json().await?;
        Ok(rules.unwrap_or_default())
    }

    async fn calculate(&self, service_id: &str, params: &ParameterSet) -> Result<EstimateResult> {
        let url = self.endpoint(CALCULATE_PATH)?;
        let body = CalculateRequest { service_id, params };
        let response = self.send(Method::POST, url, Some(&body), Auth::Bearer).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ServiceCatalog for ApiClient {
    async fn service(&self, slug: &str) -> Result<ServiceInfo> {
        let url = self.service_endpoint(slug)?;
        let response = self.send::<()>(Method::GET, url, None, Auth::Bearer).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ContactApi for ApiClient {
    async fn submit_contact(&self, inquiry: &ContactInquiry) -> Result<()> {
        let url = self.endpoint(CONTACT_PATH)?;
        self.send(Method::POST, url, Some(inquiry), Auth::Skip).await?;
        info!("📨 Contact inquiry submitted for {}", inquiry.email);
        Ok(())
    }
}
