pub mod auth;
pub mod catalog;
pub mod client;
pub mod codegen;
pub mod config;
pub mod dao;
pub mod db;
pub mod error;
pub mod history;
pub mod mapping;
pub mod request;
pub mod response;
pub mod storage;
pub mod types;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::auth::{ImgAuth, Navigator, StdoutNavigator, TokenStore, UserInfo};
    pub use crate::catalog::{EndpointDescriptor, EndpointFilter, HttpMethod, ParamType, TestScenario};
    pub use crate::client::{ClientOptions, ImgApi};
    pub use crate::codegen::Language;
    pub use crate::config::{Config, Environment};
    pub use crate::db::Database;
    pub use crate::error::{ApiError, ApiResult};
    pub use crate::history::{History, HistoryEntry};
    pub use crate::request::{BodyFormat, BuiltRequest, KeyValue, ParamValue, RequestParams};
    pub use crate::response::{ResponseBody, ResponseRecord, StatusClass};
    pub use crate::storage::{MemoryStore, Storage};
    pub use crate::types::*;
    pub use crate::{Playground, PlaygroundOptions};
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::{EndpointDescriptor, ParamType};
use crate::codegen::Language;
use crate::config::Environment;
use crate::history::{CapturedRequest, History, HistoryEntry};
use crate::request::{BodyFormat, BuiltRequest, KeyValue, ParamValue, RequestParams};
use crate::response::ResponseRecord;
use crate::storage::{Storage, ENVIRONMENT_KEY, TOKEN_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaygroundOptions {
    pub save_to_history: bool,
    /// Fail about half of all executions before anything is sent.
    pub mock_errors: bool,
}

impl Default for PlaygroundOptions {
    fn default() -> Self { Self { save_to_history: true, mock_errors: false } }
}

/// Interactive request editor state: one selected endpoint, the values typed
/// for it, the last response and the saved history.
///
/// Every mutation goes through `&mut self`, so at most one request is in
/// flight per playground.
pub struct Playground {
    store: Arc<dyn Storage>,
    http: reqwest::Client,
    api_url_override: Option<String>,
    environment: Environment,
    token: Option<String>,
    is_authenticated: bool,
    endpoint: Option<&'static EndpointDescriptor>,
    pub request_params: RequestParams,
    pub request_body: String,
    pub form_fields: Vec<KeyValue>,
    pub custom_headers: Vec<KeyValue>,
    pub json_error: Option<String>,
    pub body_format: BodyFormat,
    pub code_language: Language,
    pub options: PlaygroundOptions,
    response: Option<ResponseRecord>,
    is_loading: AtomicBool,
    history: History,
}

/// Holds the in-flight flag for one execution. Dropping it clears the flag,
/// including when the execution future itself is dropped mid-request.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Playground {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self {
            store,
            http: reqwest::Client::new(),
            api_url_override: None,
            environment: Environment::default(),
            token: None,
            is_authenticated: false,
            endpoint: None,
            request_params: RequestParams::new(),
            request_body: String::new(),
            form_fields: Vec::new(),
            custom_headers: Vec::new(),
            json_error: None,
            body_format: BodyFormat::default(),
            code_language: Language::default(),
            options: PlaygroundOptions::default(),
            response: None,
            is_loading: AtomicBool::new(false),
            history: History::default(),
        }
    }

    /// Send requests to `url` instead of the environment's API.
    pub fn with_api_url(mut self, url: Option<String>) -> Self {
        self.api_url_override = url.filter(|u| !u.is_empty());
        self
    }

    /// Environment used until a saved one is found by [`Playground::load`].
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Restore token, environment and history from storage.
    pub async fn load(&mut self) -> Result<()> {
        self.token = self.store.get(TOKEN_KEY).await?.filter(|t| !t.is_empty());
        self.is_authenticated = self.token.is_some();
        if let Some(saved) = self.store.get(ENVIRONMENT_KEY).await? {
            match saved.parse() {
                Ok(env) => self.environment = env,
                Err(_) => warn!(value = %saved, "ignoring unknown saved environment"),
            }
        }
        self.history = History::load(self.store.as_ref()).await?;
        debug!(environment = %self.environment, authenticated = self.is_authenticated, "playground loaded");
        Ok(())
    }

    // --- auth & environment ---

    pub fn token(&self) -> Option<&str> { self.token.as_deref() }

    pub fn is_authenticated(&self) -> bool { self.is_authenticated }

    /// Store `token`, or forget the stored one when it is empty.
    pub async fn save_token(&mut self, token: &str) -> Result<()> {
        if token.is_empty() {
            self.store.delete(TOKEN_KEY).await?;
            self.token = None;
            self.is_authenticated = false;
        } else {
            self.store.set(TOKEN_KEY, token).await?;
            self.token = Some(token.to_string());
            self.is_authenticated = true;
        }
        Ok(())
    }

    pub fn environment(&self) -> Environment { self.environment }

    pub async fn set_environment(&mut self, environment: Environment) -> Result<()> {
        self.environment = environment;
        self.store.set(ENVIRONMENT_KEY, &environment.to_string()).await?;
        info!(%environment, "environment changed");
        Ok(())
    }

    pub fn api_url(&self) -> String {
        match &self.api_url_override {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => self.environment.api_url().to_string(),
        }
    }

    // --- endpoint & editor ---

    pub fn endpoint(&self) -> Option<&'static EndpointDescriptor> { self.endpoint }

    fn selected(&self) -> Result<&'static EndpointDescriptor> {
        self.endpoint.ok_or_else(|| anyhow!("no endpoint selected"))
    }

    /// Select by id and reset params, body, form fields and response.
    pub fn select_endpoint(&mut self, id: &str) -> Result<&'static EndpointDescriptor> {
        let endpoint = catalog::find(id).ok_or_else(|| anyhow!("unknown endpoint `{id}`"))?;
        self.select(endpoint);
        Ok(endpoint)
    }

    fn select(&mut self, endpoint: &'static EndpointDescriptor) {
        self.endpoint = Some(endpoint);
        self.request_params.clear();
        self.request_body.clear();
        self.form_fields.clear();
        self.json_error = None;
        self.response = None;
    }

    /// Set a parameter from raw text, typed by its catalog declaration.
    /// Undeclared names are kept as text.
    pub fn set_param(&mut self, name: &str, raw: &str) -> Result<()> {
        let kind = self
            .selected()?
            .parameter(name)
            .map(|p| p.kind)
            .unwrap_or(ParamType::Text);
        let value = ParamValue::parse(kind, raw).with_context(|| format!("parameter `{name}`"))?;
        self.request_params.insert(name.to_string(), value);
        Ok(())
    }

    /// Replace the params with a scenario's. Body endpoints also get a JSON
    /// body built from the scenario params that are neither path placeholders
    /// nor files.
    pub fn load_scenario(&mut self, scenario_id: &str) -> Result<()> {
        let endpoint = self.selected()?;
        let scenario = endpoint
            .scenario(scenario_id)
            .ok_or_else(|| anyhow!("endpoint `{}` has no scenario `{scenario_id}`", endpoint.id))?;

        self.request_params = scenario
            .params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();

        if scenario.clear_auth {
            // In-memory only; the stored token survives.
            self.token = None;
            self.is_authenticated = false;
        }

        if endpoint.has_body {
            let body: serde_json::Map<String, serde_json::Value> = scenario
                .params
                .iter()
                .filter(|(k, v)| !endpoint.is_path_param(k) && !matches!(v, ParamValue::File(_)))
                .map(|(k, v)| (k.to_string(), v.to_json()))
                .collect();
            self.request_body = serde_json::to_string_pretty(&body)?;
        }
        debug!(endpoint = endpoint.id, scenario = scenario_id, "scenario loaded");
        Ok(())
    }

    /// Pretty-print the body in place. On failure the body is left alone and
    /// `json_error` says why.
    pub fn format_json(&mut self) -> bool {
        match serde_json::from_str::<serde_json::Value>(&self.request_body) {
            Ok(v) => {
                if let Ok(pretty) = serde_json::to_string_pretty(&v) {
                    self.request_body = pretty;
                }
                self.json_error = None;
                true
            }
            Err(e) => {
                self.json_error = Some(format!("Invalid JSON: {e}"));
                false
            }
        }
    }

    pub fn validate_json(&mut self) -> bool {
        match serde_json::from_str::<serde_json::Value>(&self.request_body) {
            Ok(_) => {
                self.json_error = None;
                true
            }
            Err(e) => {
                self.json_error = Some(format!("Invalid JSON: {e}"));
                false
            }
        }
    }

    /// Returns false when the endpoint has no example.
    pub fn load_example_body(&mut self) -> Result<bool> {
        let Some(example) = self.selected()?.example_body() else {
            return Ok(false);
        };
        self.request_body = serde_json::to_string_pretty(&example)?;
        Ok(true)
    }

    pub fn add_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.custom_headers.push(KeyValue::new(key, value));
    }

    pub fn remove_header(&mut self, index: usize) -> Option<KeyValue> {
        (index < self.custom_headers.len()).then(|| self.custom_headers.remove(index))
    }

    pub fn add_form_field(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.form_fields.push(KeyValue::new(key, value));
    }

    pub fn remove_form_field(&mut self, index: usize) -> Option<KeyValue> {
        (index < self.form_fields.len()).then(|| self.form_fields.remove(index))
    }

    // --- requests ---

    pub fn build_url(&self) -> Result<String> {
        Ok(request::build_url(&self.api_url(), self.selected()?, &self.request_params))
    }

    pub fn build_request(&self) -> Result<BuiltRequest> {
        Ok(request::build_request(
            &self.api_url(),
            self.selected()?,
            &self.request_params,
            self.token.as_deref(),
            &self.custom_headers,
            &self.request_body,
            self.body_format,
            &self.form_fields,
        ))
    }

    pub fn generate_code(&self, language: Language) -> Result<String> {
        Ok(codegen::generate(language, &self.build_request()?))
    }

    pub fn is_loading(&self) -> bool { self.is_loading.load(Ordering::Acquire) }

    pub fn response(&self) -> Option<&ResponseRecord> { self.response.as_ref() }

    /// Send the current request. Failures before a response arrives are
    /// recorded as a status-0 response, not returned as errors; only real
    /// responses are saved to history.
    pub async fn execute_request(&mut self) -> Result<&ResponseRecord> {
        let endpoint = self.selected()?;
        let in_flight = InFlight::acquire(&self.is_loading).ok_or_else(|| anyhow!("a request is already in flight"))?;
        self.response = None;
        let outcome = self.send().await;
        drop(in_flight);

        let (record, arrived) = match outcome {
            Ok(record) => {
                info!(endpoint = endpoint.id, status = record.status, time_ms = record.time, "request completed");
                (record, true)
            }
            Err(e) => {
                warn!(endpoint = endpoint.id, error = %e, "request failed");
                (ResponseRecord::network_error(format!("{e:#}")), false)
            }
        };
        self.response = Some(record);
        if arrived && self.options.save_to_history {
            self.save_to_history().await?;
        }
        self.response.as_ref().ok_or_else(|| anyhow!("response missing"))
    }

    async fn send(&self) -> Result<ResponseRecord> {
        let req = self.build_request()?;
        let started = Instant::now();
        if self.options.mock_errors && rand::random::<f64>() > 0.5 {
            bail!("Mock error: Random failure for testing");
        }
        debug!(method = %req.method, url = %req.url, "sending request");
        let resp = mapping::to_reqwest(&self.http, &req).await?.send().await?;
        mapping::record_response(resp, started).await
    }

    // --- history ---

    pub fn history(&self) -> &History { &self.history }

    /// Record the current request and its response.
    pub async fn save_to_history(&mut self) -> Result<()> {
        let endpoint = self.selected()?;
        let response = self.response.clone().ok_or_else(|| anyhow!("no response to save"))?;
        let entry = HistoryEntry::new(
            endpoint.method,
            endpoint.path,
            self.build_url()?,
            CapturedRequest {
                params: self.request_params.clone(),
                body: self.request_body.clone(),
                headers: self.custom_headers.clone(),
            },
            response,
        );
        self.history.push(entry);
        self.history.persist(self.store.as_ref()).await
    }

    /// Restore an entry into the editor. Returns false when no endpoint
    /// serves its route any more.
    pub fn load_from_history(&mut self, entry: &HistoryEntry) -> bool {
        let Some(endpoint) = catalog::find_by_route(entry.method, &entry.path) else {
            warn!(path = %entry.path, "history entry has no matching endpoint");
            return false;
        };
        self.select(endpoint);
        self.request_params = entry.request.params.clone();
        self.request_body = entry.request.body.clone();
        self.custom_headers = entry.request.headers.clone();
        self.response = Some(entry.response.clone());
        true
    }

    /// Empty the history if `confirm` agrees. Returns whether it did.
    pub async fn clear_history(&mut self, confirm: impl FnOnce() -> bool) -> Result<bool> {
        if !confirm() {
            return Ok(false);
        }
        self.history.clear(self.store.as_ref()).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HISTORY_LIMIT;
    use crate::response::ResponseBody;
    use crate::storage::{MemoryStore, HISTORY_KEY};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn playground(store: Arc<MemoryStore>, url: Option<String>) -> Playground {
        Playground::new(store).with_api_url(url)
    }

    #[tokio::test]
    async fn load_restores_token_environment_history() {
        let store = Arc::new(MemoryStore::with_entries([(TOKEN_KEY, "3|x"), (ENVIRONMENT_KEY, "test")]));
        let mut pg = playground(store, None);
        pg.load().await.unwrap();
        assert!(pg.is_authenticated());
        assert_eq!(pg.token(), Some("3|x"));
        assert_eq!(pg.environment(), Environment::Test);
        assert_eq!(pg.api_url(), "https://test.api.img.pro");
        assert!(pg.history().is_empty());
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn unknown_saved_environment_keeps_default() {
        let store = Arc::new(MemoryStore::with_entries([(ENVIRONMENT_KEY, "staging")]));
        let mut pg = Playground::new(store).with_environment(Environment::Test);
        pg.load().await.unwrap();
        assert_eq!(pg.environment(), Environment::Test);
        assert_eq!(pg.api_url(), "https://test.api.img.pro");
        assert!(logs_contain("ignoring unknown saved environment"));
    }

    #[tokio::test]
    async fn save_token_and_environment_persist() {
        let store = Arc::new(MemoryStore::new());
        let mut pg = playground(store.clone(), None);
        pg.save_token("5|y").await.unwrap();
        assert_eq!(store.get(TOKEN_KEY).await.unwrap().as_deref(), Some("5|y"));
        pg.save_token("").await.unwrap();
        assert!(!pg.is_authenticated());
        assert_eq!(store.get(TOKEN_KEY).await.unwrap(), None);

        pg.set_environment(Environment::Test).await.unwrap();
        assert_eq!(store.get(ENVIRONMENT_KEY).await.unwrap().as_deref(), Some("test"));
    }

    #[test]
    fn select_endpoint_resets_editor() {
        let mut pg = playground(Arc::new(MemoryStore::new()), None);
        pg.select_endpoint("list-media").unwrap();
        pg.set_param("limit", "10").unwrap();
        pg.request_body = "{}".into();
        pg.add_form_field("a", "b");
        pg.select_endpoint("get-media").unwrap();
        assert!(pg.request_params.is_empty());
        assert!(pg.request_body.is_empty());
        assert!(pg.form_fields.is_empty());
        assert!(pg.select_endpoint("nope").is_err());
    }

    #[test]
    fn typed_params_and_url() {
        let mut pg = playground(Arc::new(MemoryStore::new()), None);
        pg.select_endpoint("list-media").unwrap();
        pg.set_param("limit", "10").unwrap();
        assert_eq!(pg.request_params["limit"], ParamValue::from(10i64));
        assert_eq!(pg.build_url().unwrap(), "https://api.img.pro/v1/media?limit=10");
        assert!(pg.set_param("limit", "ten").is_err());
    }

    #[tokio::test]
    async fn scenario_seeds_params_body_and_clears_auth() {
        let store = Arc::new(MemoryStore::with_entries([(TOKEN_KEY, "1|t")]));
        let mut pg = playground(store.clone(), None);
        pg.load().await.unwrap();
        pg.select_endpoint("update-media").unwrap();
        pg.load_scenario("update-all").unwrap();
        assert_eq!(pg.request_params["uid"], ParamValue::from("sample123"));
        let body: serde_json::Value = serde_json::from_str(&pg.request_body).unwrap();
        assert_eq!(
            body,
            json!({"name": "updated-name.jpg", "description": "Updated description", "tags": "updated, new", "public": true})
        );
        assert!(pg.is_authenticated());

        pg.select_endpoint("get-media").unwrap();
        let unauth = pg.endpoint().unwrap().scenarios.iter().find(|s| s.clear_auth).unwrap().id;
        pg.load_scenario(unauth).unwrap();
        assert!(!pg.is_authenticated());
        assert!(pg.build_request().unwrap().bearer_token().is_none());
        assert_eq!(store.get(TOKEN_KEY).await.unwrap().as_deref(), Some("1|t"));
        assert!(pg.load_scenario("no-such-scenario").is_err());
    }

    #[test]
    fn json_format_and_validate() {
        let mut pg = playground(Arc::new(MemoryStore::new()), None);
        pg.request_body = "{\"a\":1}".into();
        assert!(pg.format_json());
        assert_eq!(pg.request_body, "{\n  \"a\": 1\n}");
        pg.request_body = "{oops".into();
        assert!(!pg.validate_json());
        assert!(pg.json_error.as_deref().unwrap().starts_with("Invalid JSON: "));
        assert!(!pg.format_json());
        assert_eq!(pg.request_body, "{oops");
    }

    #[test]
    fn example_bodies() {
        let mut pg = playground(Arc::new(MemoryStore::new()), None);
        pg.select_endpoint("import").unwrap();
        assert!(pg.load_example_body().unwrap());
        assert!(pg.request_body.contains("https://example.com/image.jpg"));
        pg.select_endpoint("get-root").unwrap();
        assert!(!pg.load_example_body().unwrap());
    }

    #[test]
    fn header_rows() {
        let mut pg = playground(Arc::new(MemoryStore::new()), None);
        pg.add_header("X-A", "1");
        pg.add_header("X-B", "2");
        assert_eq!(pg.remove_header(0).unwrap().key, "X-A");
        assert!(pg.remove_header(5).is_none());
        assert_eq!(pg.custom_headers.len(), 1);
    }

    #[tokio::test]
    async fn execute_records_response_and_history() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/media/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "abc123"})))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let mut pg = playground(store.clone(), Some(server.uri()));
        pg.save_token("1|t").await.unwrap();
        pg.select_endpoint("get-media").unwrap();
        pg.set_param("uid", "abc123").unwrap();

        let status = pg.execute_request().await.unwrap().status;
        assert_eq!(status, 200);
        assert!(!pg.is_loading());
        assert_eq!(pg.history().len(), 1);
        let entry = pg.history().nth(0).unwrap().clone();
        assert_eq!(entry.path, "/v1/media/{uid}");
        assert_eq!(entry.url, format!("{}/v1/media/abc123", server.uri()));
        assert!(store.get(HISTORY_KEY).await.unwrap().is_some());

        pg.select_endpoint("list-media").unwrap();
        assert!(pg.load_from_history(&entry));
        assert_eq!(pg.endpoint().unwrap().id, "get-media");
        assert_eq!(pg.request_params["uid"], ParamValue::from("abc123"));
        assert_eq!(pg.response().unwrap().body, ResponseBody::Json(json!({"id": "abc123"})));
    }

    #[tokio::test]
    async fn cancelled_request_releases_in_flight_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_millis(500)))
            .mount(&server)
            .await;
        let mut pg = playground(Arc::new(MemoryStore::new()), Some(server.uri()));
        pg.select_endpoint("get-root").unwrap();

        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(50), pg.execute_request()).await;
        assert!(timed_out.is_err());
        assert!(!pg.is_loading());

        let status = pg.execute_request().await.unwrap().status;
        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn transport_failure_is_network_error_record() {
        let mut pg = playground(Arc::new(MemoryStore::new()), Some("http://127.0.0.1:9".into()));
        pg.select_endpoint("get-root").unwrap();
        let record = pg.execute_request().await.unwrap().clone();
        assert_eq!(record.status, 0);
        assert_eq!(record.status_text, "Network Error");
        assert!(pg.history().is_empty());
    }

    #[tokio::test]
    async fn mock_errors_fail_some_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).mount(&server).await;
        let mut pg = playground(Arc::new(MemoryStore::new()), Some(server.uri()));
        pg.options = PlaygroundOptions { save_to_history: false, mock_errors: true };
        pg.select_endpoint("get-root").unwrap();
        let mut failed = 0;
        for _ in 0..64 {
            let r = pg.execute_request().await.unwrap();
            if r.status == 0 {
                assert_eq!(r.body, ResponseBody::Json(json!({"error": "Mock error: Random failure for testing"})));
                failed += 1;
            }
        }
        assert!(failed > 0 && failed < 64);
    }

    #[tokio::test]
    async fn history_is_capped_and_clear_needs_confirmation() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(204)).mount(&server).await;
        let store = Arc::new(MemoryStore::new());
        let mut pg = playground(store.clone(), Some(server.uri()));
        pg.select_endpoint("get-root").unwrap();
        for _ in 0..HISTORY_LIMIT + 1 {
            pg.execute_request().await.unwrap();
        }
        assert_eq!(pg.history().len(), HISTORY_LIMIT);

        assert!(!pg.clear_history(|| false).await.unwrap());
        assert_eq!(pg.history().len(), HISTORY_LIMIT);
        assert!(pg.clear_history(|| true).await.unwrap());
        assert!(pg.history().is_empty());
        assert_eq!(store.get(HISTORY_KEY).await.unwrap(), None);
    }

    #[test]
    fn generated_curl_uses_current_request() {
        let mut pg = playground(Arc::new(MemoryStore::new()), None);
        pg.select_endpoint("import").unwrap();
        pg.load_example_body().unwrap();
        let code = pg.generate_code(Language::Curl).unwrap();
        assert!(code.contains("-X POST"));
        assert!(code.contains("\"https://api.img.pro/v1/import\""));
    }
}
