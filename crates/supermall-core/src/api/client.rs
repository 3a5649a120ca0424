//! API client for communicating with the SuperMall REST API.
//!
//! This module provides the `ApiClient` struct for issuing JSON requests
//! against the configured base URL. The bearer token is read from the
//! shared [`TokenStore`] on every call, so installing or clearing a token
//! takes effect for all clones of the client.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::{header, Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::TokenStore;
use crate::config::{Config, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::models::{AuthResponse, LoginRequest, RegisterRequest};

use super::ApiError;

/// Method, optional JSON body and extra headers for one request.
///
/// Extra headers are applied after the defaults and replace them on
/// conflict.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub headers: header::HeaderMap,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            body: None,
            headers: header::HeaderMap::new(),
        }
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn delete() -> Self {
        Self::with_method(Method::DELETE)
    }

    pub fn post<B: Serialize + ?Sized>(body: &B) -> Result<Self, ApiError> {
        Self::with_method(Method::POST).body(body)
    }

    pub fn put<B: Serialize + ?Sized>(body: &B) -> Result<Self, ApiError> {
        Self::with_method(Method::PUT).body(body)
    }

    pub fn with_method(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Serialize `body` as the JSON payload.
    pub fn body<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to serialize body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn header(mut self, name: header::HeaderName, value: header::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// API client for the SuperMall backend.
/// Clone is cheap - reqwest::Client and the token store are shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Arc<str>,
    tokens: Arc<dyn TokenStore>,
}

impl ApiClient {
    /// Create a client for `base_url` with the default request timeout.
    pub fn new(base_url: impl AsRef<str>, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        Self::with_timeout(
            base_url,
            tokens,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn with_timeout(
        base_url: impl AsRef<str>,
        tokens: Arc<dyn TokenStore>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url.as_ref().trim_end_matches('/')),
            tokens,
        })
    }

    pub fn from_config(config: &Config, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        Self::with_timeout(
            &config.api_base_url,
            tokens,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// Install or clear the bearer token used by every clone of this client.
    pub fn set_token(&self, token: Option<String>) {
        self.tokens.set_token(token);
    }

    pub fn token(&self) -> Option<String> {
        self.tokens.get_token()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tokens.get_token().is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn default_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        if let Some(token) = self.tokens.get_token() {
            let mut value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::InvalidRequest("Token is not a valid header value".to_string()))?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Issue one request and return the decoded JSON body.
    ///
    /// The body is decoded whatever the status. Non-2xx responses become
    /// [`ApiError::Api`] with the server's `error` message; failures to get
    /// a response at all become [`ApiError::Network`].
    pub async fn request(&self, path: &str, options: RequestOptions) -> Result<Value, ApiError> {
        let url = self.url(path);
        let RequestOptions {
            method,
            body,
            headers,
        } = options;

        let mut builder = self
            .client
            .request(method.clone(), &url)
            .headers(self.default_headers()?);
        if let Some(ref body) = body {
            let bytes = serde_json::to_vec(body)
                .map_err(|e| ApiError::InvalidRequest(format!("Failed to serialize body: {}", e)))?;
            builder = builder.body(bytes);
        }
        builder = builder.headers(headers);

        debug!(method = %method, path = path, "Sending request");
        let response = builder.send().await.map_err(|e| {
            warn!(method = %method, path = path, error = %e, "Request failed without a response");
            ApiError::Network(e)
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(ApiError::Network)?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes);
            let err = ApiError::from_status(status, &body);
            debug!(method = %method, path = path, status = status.as_u16(), error = %err, "API error");
            return Err(err);
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::undecodable(&String::from_utf8_lossy(&bytes), e))
    }

    /// Like [`ApiClient::request`], then deserialize the JSON into `T`.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let value = self.request(path, options).await?;
        serde_json::from_value(value)
            .map_err(|e| ApiError::InvalidResponse(format!("Unexpected response from {}: {}", path, e)))
    }

    // ===== Authentication =====

    /// Create a backend account and obtain its access token.
    pub async fn register(&self, data: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.request_json("/auth/register", RequestOptions::post(data)?)
            .await
    }

    /// Exchange email and password for an access token.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.request_json("/auth/login", RequestOptions::post(credentials)?)
            .await
    }
}
