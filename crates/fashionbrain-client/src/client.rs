//! The request wrapper: one GET and one POST primitive that every typed
//! endpoint helper goes through.

use std::sync::Arc;
use std::time::Duration;

use fashionbrain_config::{ApiConfig, FashionBrainConfig, DEFAULT_TIMEOUT_SECS};
use fashionbrain_core::{FashionBrainError, Result};
use fashionbrain_endpoints::{EndpointResolver, PageLocation};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde_json::Value;

use crate::response;

/// Per-method request budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    pub get_timeout: Duration,
    pub post_timeout: Duration,
}

impl ClientOptions {
    /// Use the same budget for every method.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            get_timeout: timeout,
            post_timeout: timeout,
        }
    }

    pub fn from_config(api: &ApiConfig) -> Self {
        Self {
            get_timeout: api.get_timeout(),
            post_timeout: api.post_timeout(),
        }
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

/// HTTP client bound to one backend base URL.
///
/// Cloning is cheap; clones share the connection pool and the base URL.
/// Calls are independent of each other: each carries its own timeout and no
/// state survives between them.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    options: ClientOptions,
}

impl ApiClient {
    /// Create a client for an already-resolved base URL.
    pub fn new<S: AsRef<str>>(base_url: S, options: ClientOptions) -> Result<Self> {
        let http = reqwest::Client::builder().build().map_err(|err| {
            FashionBrainError::Internal(format!("failed to build HTTP client: {}", err))
        })?;

        Ok(Self {
            http,
            base_url: Arc::from(base_url.as_ref().trim_end_matches('/')),
            options,
        })
    }

    /// Create a client for the resolver's session base URL.
    pub fn from_resolver(resolver: &EndpointResolver, options: ClientOptions) -> Result<Self> {
        Self::new(resolver.base_url(), options)
    }

    /// Resolve the base URL from configuration and build a client for it.
    pub fn from_config(config: &FashionBrainConfig, location: Option<PageLocation>) -> Result<Self> {
        let resolver = EndpointResolver::from_config(&config.api, location);
        Self::from_resolver(&resolver, ClientOptions::from_config(&config.api))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Full URL for an API path.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// `GET <base><path>`, returning the parsed JSON body.
    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<Value> {
        let timeout = self.options.get_timeout;
        let request = self.json_request(Method::GET, path, token, timeout);

        self.execute(Method::GET, path, request, timeout, None).await
    }

    /// `POST <base><path>` with a JSON body, returning the parsed JSON body.
    ///
    /// On the signup path a confirmation-required rejection is returned as
    /// a success value (see the crate docs).
    pub async fn post<B>(&self, path: &str, body: &B, token: Option<&str>) -> Result<Value>
    where
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)
            .map_err(|err| FashionBrainError::Serialization(err.to_string()))?;
        let payload = serde_json::to_vec(&body)
            .map_err(|err| FashionBrainError::Serialization(err.to_string()))?;

        let timeout = self.options.post_timeout;
        let request = self
            .json_request(Method::POST, path, token, timeout)
            .body(payload);

        self.execute(Method::POST, path, request, timeout, Some(&body))
            .await
    }

    /// `POST <base><path>` with a multipart form, using the POST budget.
    pub(crate) async fn post_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
        token: Option<&str>,
    ) -> Result<Value> {
        let timeout = self.options.post_timeout;
        let request = self
            .request(Method::POST, path, token, timeout)
            .multipart(form);

        self.execute(Method::POST, path, request, timeout, None).await
    }

    /// A request for a JSON endpoint: `request` plus the JSON content type.
    fn json_request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        timeout: Duration,
    ) -> RequestBuilder {
        self.request(method, path, token, timeout)
            .header(CONTENT_TYPE, "application/json")
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        timeout: Duration,
    ) -> RequestBuilder {
        let request = self
            .http
            .request(method, self.url_for(path))
            .timeout(timeout);

        match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        request: RequestBuilder,
        timeout: Duration,
        sent_body: Option<&Value>,
    ) -> Result<Value> {
        let url = self.url_for(path);
        tracing::debug!("{} {}", method, url);

        let response = request
            .send()
            .await
            .map_err(|err| self.transport_error(&url, timeout, err))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| self.transport_error(&url, timeout, err))?;

        tracing::debug!("{} {} -> {}", method, url, status);

        response::interpret(path, status, &text, sent_body)
    }

    fn transport_error(&self, url: &str, timeout: Duration, err: reqwest::Error) -> FashionBrainError {
        if err.is_timeout() {
            tracing::warn!("request timed out after {:?}: {}", timeout, url);
            return FashionBrainError::Timeout {
                url: url.to_string(),
                after: timeout,
            };
        }

        if err.is_builder() {
            return FashionBrainError::invalid_request(err.to_string());
        }

        tracing::error!("network error calling {}: {}", url, err);
        FashionBrainError::Network {
            base_url: self.base_url.to_string(),
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        ApiClient::new("http://localhost:8000/", ClientOptions::default()).unwrap()
    }

    #[test]
    fn trailing_slash_is_stripped() {
        assert_eq!(client().base_url(), "http://localhost:8000");
    }

    #[test]
    fn url_for_joins_paths() {
        let c = client();
        assert_eq!(c.url_for("/auth/me"), "http://localhost:8000/auth/me");
        assert_eq!(c.url_for("feed?num_outfits=3"), "http://localhost:8000/feed?num_outfits=3");
    }

    #[test]
    fn default_budgets_are_thirty_seconds() {
        let opts = ClientOptions::default();
        assert_eq!(opts.get_timeout, Duration::from_secs(30));
        assert_eq!(opts.post_timeout, Duration::from_secs(30));
    }

    #[test]
    fn options_from_config() {
        let api = ApiConfig {
            get_timeout_secs: 5,
            post_timeout_secs: 10,
            ..ApiConfig::default()
        };
        let opts = ClientOptions::from_config(&api);
        assert_eq!(opts.get_timeout, Duration::from_secs(5));
        assert_eq!(opts.post_timeout, Duration::from_secs(10));
    }

    #[test]
    fn clones_share_base_url() {
        let c = client();
        let d = c.clone();
        assert_eq!(c.base_url(), d.base_url());
    }

    #[test]
    fn from_config_uses_override() {
        let mut config = FashionBrainConfig::default();
        config.api.base_url = Some("https://api.example.com/".to_string());
        let c = ApiClient::from_config(&config, None).unwrap();
        assert_eq!(c.base_url(), "https://api.example.com");
    }

    #[test]
    fn bearer_header_only_with_token() {
        let c = client();
        let with = c
            .request(Method::GET, "/auth/me", Some("tok"), Duration::from_secs(1))
            .build()
            .unwrap();
        assert_eq!(
            with.headers().get("authorization").unwrap(),
            "Bearer tok"
        );

        let without = c
            .request(Method::GET, "/auth/me", None, Duration::from_secs(1))
            .build()
            .unwrap();
        assert!(without.headers().get("authorization").is_none());

        let blank = c
            .request(Method::GET, "/auth/me", Some("  "), Duration::from_secs(1))
            .build()
            .unwrap();
        assert!(blank.headers().get("authorization").is_none());
    }

    #[test]
    fn json_requests_declare_json_content_type() {
        let c = client();
        for method in [Method::GET, Method::POST] {
            let req = c
                .json_request(method.clone(), "/feed", Some("tok"), Duration::from_secs(1))
                .build()
                .unwrap();
            assert_eq!(
                req.headers().get(CONTENT_TYPE).unwrap(),
                "application/json",
                "{} request",
                method
            );
        }
    }

    #[tokio::test]
    async fn unserializable_body_is_rejected_before_sending() {
        use std::collections::HashMap;

        let mut body = HashMap::new();
        body.insert((1, 2), "tuple keys are not valid JSON object keys");

        let err = client().post("/action", &body, None).await.unwrap_err();
        assert!(matches!(err, FashionBrainError::Serialization(_)));
    }

    #[test]
    fn request_carries_timeout() {
        let req = client()
            .request(Method::POST, "/action", None, Duration::from_secs(7))
            .build()
            .unwrap();
        assert_eq!(req.timeout(), Some(&Duration::from_secs(7)));
    }
}
