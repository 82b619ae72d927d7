//! Token storage and the login/logout flow.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_AUTH_URL, PRODUCTION_API_URL};
use crate::storage::{Storage, TOKEN_KEY};

/// The single bearer token, kept in client storage.
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn Storage>,
}

impl TokenStore {
    pub fn new(store: Arc<dyn Storage>) -> Self { Self { store } }

    pub async fn get(&self) -> Result<Option<String>> {
        Ok(self.store.get(TOKEN_KEY).await?.filter(|t| !t.is_empty()))
    }

    pub async fn set(&self, token: &str) -> Result<()> {
        self.store.set(TOKEN_KEY, token).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.delete(TOKEN_KEY).await
    }
}

/// Where a login redirect goes. A browser host would navigate; the CLI prints.
pub trait Navigator: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

/// Prints the target URL on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutNavigator;

impl Navigator for StdoutNavigator {
    fn open(&self, url: &str) -> Result<()> {
        println!("Open {url} to create an API key, then run `imgpro auth set-token <TOKEN>`.");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    /// The `<id>` half of an `<id>|<secret>` token.
    pub token_id: String,
    pub authenticated: bool,
}

pub struct ImgAuth {
    tokens: TokenStore,
    navigator: Arc<dyn Navigator>,
    http: reqwest::Client,
    pub auth_url: String,
    pub api_url: String,
}

impl ImgAuth {
    pub fn new(store: Arc<dyn Storage>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            tokens: TokenStore::new(store),
            navigator,
            http: reqwest::Client::new(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            api_url: PRODUCTION_API_URL.to_string(),
        }
    }

    pub fn with_urls(mut self, auth_url: impl Into<String>, api_url: impl Into<String>) -> Self {
        self.auth_url = auth_url.into();
        self.api_url = api_url.into();
        self
    }

    pub fn tokens(&self) -> &TokenStore { &self.tokens }

    pub async fn get_token(&self) -> Result<Option<String>> { self.tokens.get().await }

    pub async fn set_token(&self, token: &str) -> Result<()> { self.tokens.set(token).await }

    /// Probe the API with the stored token. Only a 2xx counts; rejections and
    /// transport failures both come back as `false`.
    pub async fn is_authenticated(&self) -> Result<bool> {
        let Some(token) = self.tokens.get().await? else {
            debug!("no stored token");
            return Ok(false);
        };
        let url = format!("{}/v1/media?limit=1", self.api_url.trim_end_matches('/'));
        match self.http.get(&url).bearer_auth(&token).send().await {
            Ok(resp) => {
                let status = resp.status();
                if status == reqwest::StatusCode::UNAUTHORIZED {
                    warn!("token appears to be invalid or expired");
                } else if !status.is_success() {
                    debug!(status = status.as_u16(), "auth probe rejected");
                }
                Ok(status.is_success())
            }
            Err(e) => {
                warn!(error = %e, "auth check failed");
                Ok(false)
            }
        }
    }

    /// Send the user to the key-management page.
    pub fn login(&self) -> Result<()> {
        let url = format!("{}/api-keys", self.auth_url.trim_end_matches('/'));
        info!(%url, "redirecting to login");
        self.navigator.open(&url)
    }

    pub async fn logout(&self) -> Result<()> {
        self.tokens.clear().await?;
        info!("logged out");
        Ok(())
    }

    pub async fn get_user(&self) -> Result<Option<UserInfo>> {
        Ok(self.tokens.get().await?.map(|token| UserInfo {
            token_id: token.split('|').next().unwrap_or_default().to_string(),
            authenticated: true,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::Mutex;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl Navigator for Recorder {
        fn open(&self, url: &str) -> Result<()> {
            self.0.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    fn auth_with(store: Arc<MemoryStore>, api_url: &str) -> ImgAuth {
        ImgAuth::new(store, Arc::new(StdoutNavigator)).with_urls(DEFAULT_AUTH_URL, api_url)
    }

    #[tokio::test]
    async fn set_get_logout() {
        let store = Arc::new(MemoryStore::new());
        let auth = auth_with(store.clone(), PRODUCTION_API_URL);
        auth.set_token("7|s3cret").await.unwrap();
        assert_eq!(auth.get_token().await.unwrap().as_deref(), Some("7|s3cret"));
        assert_eq!(store.get(TOKEN_KEY).await.unwrap().as_deref(), Some("7|s3cret"));
        auth.logout().await.unwrap();
        assert_eq!(auth.get_token().await.unwrap(), None);
    }

    #[tokio::test]
    async fn user_info_uses_token_id() {
        let store = Arc::new(MemoryStore::with_entries([(TOKEN_KEY, "42|abcdef")]));
        let auth = auth_with(store, PRODUCTION_API_URL);
        let user = auth.get_user().await.unwrap().unwrap();
        assert_eq!(user.token_id, "42");
        assert!(user.authenticated);
    }

    #[tokio::test]
    async fn no_token_means_no_probe() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;
        let auth = auth_with(Arc::new(MemoryStore::new()), &server.uri());
        assert!(!auth.is_authenticated().await.unwrap());
    }

    #[tokio::test]
    async fn probe_success_is_authenticated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/media"))
            .and(query_param("limit", "1"))
            .and(header("authorization", "Bearer 1|ok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": [], "has_more": false})))
            .expect(1)
            .mount(&server)
            .await;
        let store = Arc::new(MemoryStore::with_entries([(TOKEN_KEY, "1|ok")]));
        assert!(auth_with(store, &server.uri()).is_authenticated().await.unwrap());
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn unauthorized_probe_logs_and_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(401)).mount(&server).await;
        let store = Arc::new(MemoryStore::with_entries([(TOKEN_KEY, "1|stale")]));
        assert!(!auth_with(store, &server.uri()).is_authenticated().await.unwrap());
        assert!(logs_contain("token appears to be invalid or expired"));
    }

    #[tokio::test]
    async fn server_error_and_unreachable_are_false() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(500)).mount(&server).await;
        let store = Arc::new(MemoryStore::with_entries([(TOKEN_KEY, "1|x")]));
        assert!(!auth_with(store.clone(), &server.uri()).is_authenticated().await.unwrap());
        // nothing listens on the discard port
        assert!(!auth_with(store, "http://127.0.0.1:9").is_authenticated().await.unwrap());
    }

    #[tokio::test]
    async fn login_opens_api_keys_page() {
        let nav = Arc::new(Recorder::default());
        let auth = ImgAuth::new(Arc::new(MemoryStore::new()), nav.clone());
        auth.login().unwrap();
        assert_eq!(nav.0.lock().unwrap().as_slice(), ["https://img.pro/api-keys".to_string()]);
    }
}
