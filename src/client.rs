//! Typed client for the media API.

use std::path::Path;
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::config::Environment;
use crate::error::{ApiError, ApiResult};
use crate::storage::{Storage, TOKEN_KEY};
use crate::types::{
    DeleteResponse, ImportOptions, ListMediaOptions, MediaItem, MediaListResponse, MediaUpdate, UploadFile,
    UploadOptions, UploadResponse,
};

/// How to pick the base URL. An explicit URL wins; otherwise the hostname
/// decides between the test and production APIs.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    pub api_url: Option<String>,
    pub hostname: Option<String>,
}

impl ClientOptions {
    pub fn base_url(&self) -> String {
        if let Some(url) = self.api_url.as_deref().filter(|u| !u.is_empty()) {
            return url.trim_end_matches('/').to_string();
        }
        let env = self.hostname.as_deref().map(Environment::for_hostname).unwrap_or_default();
        env.api_url().to_string()
    }
}

pub struct ImgApi {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn Storage>,
}

impl ImgApi {
    pub fn new(store: Arc<dyn Storage>, options: ClientOptions) -> Self {
        Self { http: reqwest::Client::new(), base_url: options.base_url(), store }
    }

    pub fn base_url(&self) -> &str { &self.base_url }

    /// The token is read on every call so a login elsewhere takes effect
    /// without rebuilding the client.
    async fn token(&self) -> ApiResult<Option<String>> {
        let token = self.store.get(TOKEN_KEY).await.map_err(ApiError::storage)?;
        Ok(token.filter(|t| !t.is_empty()))
    }

    /// Send `builder` with the stored bearer token, then decode a 2xx body.
    /// Headers in `extra` are applied last and replace the auth header.
    async fn send<T: DeserializeOwned>(
        &self,
        mut builder: reqwest::RequestBuilder,
        extra: Option<HeaderMap>,
    ) -> ApiResult<T> {
        if let Some(token) = self.token().await? {
            builder = builder.bearer_auth(token);
        }
        if let Some(extra) = extra {
            builder = builder.headers(extra);
        }
        let resp = builder.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            debug!(status = status.as_u16(), "api request failed");
            return Err(ApiError::Status { status: status.as_u16(), body: text });
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn url(&self, path: &str) -> ApiResult<Url> {
        Ok(Url::parse(&format!("{}{}", self.base_url, path))?)
    }

    /// Generic request against `path` with an optional JSON body and caller
    /// headers.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        json: Option<&serde_json::Value>,
        headers: &[(&str, &str)],
    ) -> ApiResult<T> {
        let mut builder = self.http.request(method, self.url(path)?);
        if let Some(body) = json {
            builder = builder.json(body);
        }
        let mut extra = HeaderMap::new();
        for (k, v) in headers {
            let name = HeaderName::from_bytes(k.as_bytes())
                .map_err(|e| ApiError::Header(format!("{k}: {e}")))?;
            let value = HeaderValue::from_str(v)
                .map_err(|e| ApiError::Header(format!("{k}: {e}")))?;
            extra.insert(name, value);
        }
        self.send(builder, (!extra.is_empty()).then_some(extra)).await
    }

    pub async fn upload(&self, file: UploadFile, options: UploadOptions) -> ApiResult<UploadResponse> {
        let mut form = Form::new().part("file", Part::bytes(file.bytes).file_name(file.file_name));
        if let Some(desc) = options.description.filter(|d| !d.is_empty()) {
            form = form.text("description", desc);
        }
        if let Some(public) = options.public {
            form = form.text("public", public.to_string());
        }
        let builder = self.http.post(self.url("/v1/upload")?).multipart(form);
        self.send(builder, None).await
    }

    /// Read `path` from disk and upload it under its file name.
    pub async fn upload_path(&self, path: &Path, options: UploadOptions) -> ApiResult<UploadResponse> {
        let file = UploadFile::from_path(path).await?;
        self.upload(file, options).await
    }

    pub async fn list_media(&self, options: &ListMediaOptions) -> ApiResult<MediaListResponse> {
        let builder = self.http.get(self.url("/v1/media")?).query(&options.query_pairs());
        self.send(builder, None).await
    }

    pub async fn get_media(&self, id: &str) -> ApiResult<MediaItem> {
        let builder = self.http.get(self.url(&format!("/v1/media/{id}"))?);
        self.send(builder, None).await
    }

    pub async fn update_media(&self, id: &str, update: &MediaUpdate) -> ApiResult<MediaItem> {
        let builder = self.http.patch(self.url(&format!("/v1/media/{id}"))?).json(update);
        self.send(builder, None).await
    }

    pub async fn import_media(&self, url: &str, options: &ImportOptions) -> ApiResult<UploadResponse> {
        let mut body = serde_json::to_value(options).map_err(ApiError::Encode)?;
        if let Some(obj) = body.as_object_mut() {
            obj.insert("url".to_string(), serde_json::Value::String(url.to_string()));
        }
        let builder = self.http.post(self.url("/v1/import")?).json(&body);
        self.send(builder, None).await
    }

    pub async fn delete_media(&self, id: &str) -> ApiResult<DeleteResponse> {
        let builder = self.http.delete(self.url(&format!("/v1/media/{id}"))?);
        self.send(builder, None).await
    }

    /// Convenience for `Authorization` overrides in tests and scripts.
    pub fn auth_header(token: &str) -> (HeaderName, String) {
        (AUTHORIZATION, format!("Bearer {token}"))
    }
}
