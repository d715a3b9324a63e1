//! HTTP client for the Vinted JSON API using wreq for TLS fingerprint emulation.

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::vinted::endpoints::{ApiRequest, ItemEndpoint, Params, CATALOG_ITEMS};
use crate::vinted::headers::api_headers;
use crate::vinted::session::{Credential, SessionManager, Sleeper, TokioSleeper};
use crate::vinted::user_agents::{random_user_agent, truncate_for_log};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use wreq::redirect::Policy;
use wreq::Client;
use wreq_util::Emulation;

/// Raw JSON access to the API - enables mocking for tests.
#[async_trait]
pub trait VintedApi: Send + Sync {
    /// GETs any API path and returns the parsed JSON body.
    async fn call(&self, endpoint: &str, params: Option<&Params>) -> Result<Value>;

    /// Catalog search; the body looks like `{"items": [...]}`.
    async fn search(&self, params: Option<&Params>) -> Result<Value>;

    /// Item detail; the body looks like `{"item": {...}}`.
    async fn item(&self, item_id: &str, params: Option<&Params>) -> Result<Value>;

    /// Path [`VintedApi::item`] requests for `item_id`.
    fn item_path(&self, item_id: &str) -> String {
        ItemEndpoint::default().path(item_id)
    }
}

/// Vinted client holding one session credential and one connection pool.
///
/// Every call reads the current credential when it builds its headers, so a
/// refresh triggered by a 401 is picked up by the retried request. A 401
/// triggers at most `max_refreshes` refreshes per call; after that the 401 is
/// returned as [`Error::ApiCall`].
///
/// Concurrent calls on one instance that hit 401 together each refresh the
/// credential; the last writer wins. Replacement itself is atomic.
///
/// Dropping the client (or calling [`VintedClient::close`]) releases the pool.
pub struct VintedClient {
    http: Client,
    session: SessionManager,
    origin: String,
    user_agent: String,
    credential: RwLock<Credential>,
    retries: u32,
    max_refreshes: u32,
    item_endpoint: ItemEndpoint,
}

impl VintedClient {
    /// Creates a client and, unless the config carries cookies, bootstraps a session.
    pub async fn new(config: &ClientConfig) -> Result<Self> {
        Self::with_origin(config, None).await
    }

    /// Creates a client that sends requests to `origin` instead of the
    /// configured domain (for testing). The config is still validated.
    pub async fn with_origin(config: &ClientConfig, origin: Option<String>) -> Result<Self> {
        Self::with_sleeper(config, origin, Arc::new(TokioSleeper)).await
    }

    /// Like [`VintedClient::with_origin`] with a custom sleeper for bootstrap backoff.
    pub async fn with_sleeper(
        config: &ClientConfig,
        origin: Option<String>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self> {
        config.validate()?;

        let origin = origin.unwrap_or_else(|| config.origin()).trim_end_matches('/').to_string();
        let user_agent =
            config.user_agent.clone().unwrap_or_else(|| random_user_agent().to_string());

        debug!(
            "Initializing VintedClient(origin={}, user_agent={}, session_cookie={})",
            origin,
            truncate_for_log(&user_agent),
            if config.session_cookie.is_some() { "provided" } else { "auto-fetch" }
        );

        let http = build_http(config)?;
        let session =
            SessionManager::new(http.clone(), origin.clone(), user_agent.clone(), config.cookie_names.clone())
                .with_backoff_base(config.backoff_base())
                .with_sleeper(sleeper);

        let credential = match &config.session_cookie {
            Some(cookies) => Credential::new(cookies.clone()),
            None => session.acquire(config.retries).await?,
        };

        Ok(Self {
            http,
            session,
            origin,
            user_agent,
            credential: RwLock::new(credential),
            retries: config.retries,
            max_refreshes: config.max_refreshes,
            item_endpoint: config.item_endpoint,
        })
    }

    /// Returns the origin requests are sent to.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn item_endpoint(&self) -> ItemEndpoint {
        self.item_endpoint
    }

    /// Returns a copy of the current credential.
    pub async fn credential(&self) -> Credential {
        self.credential.read().await.clone()
    }

    /// Fetches a new credential and makes it current.
    pub async fn refresh_credential(&self) -> Result<Credential> {
        debug!("Refreshing session cookie");
        let fresh = self.session.acquire(self.retries).await?;
        *self.credential.write().await = fresh.clone();
        Ok(fresh)
    }

    /// Releases the connection pool.
    pub fn close(self) {
        debug!("Closing VintedClient for {}", self.origin);
    }

    /// Performs one GET with headers built from the current credential.
    async fn send(&self, url: &str) -> Result<wreq::Response> {
        let headers = {
            let credential = self.credential.read().await;
            api_headers(&self.origin, &self.user_agent, &credential)
        };

        debug!("GET {}", url);

        let mut request = self.http.get(url);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        Ok(request.send().await?)
    }
}

fn build_http(config: &ClientConfig) -> Result<Client> {
    let redirect = if config.follow_redirects {
        Policy::limited(config.max_redirects)
    } else {
        Policy::none()
    };

    let mut builder = Client::builder()
        .emulation(Emulation::Chrome131)
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .redirect(redirect)
        .timeout(config.timeout())
        .connect_timeout(config.connect_timeout());

    if let Some(proxy_url) = &config.proxy {
        debug!("Configuring proxy: {}", proxy_url);
        let proxy = wreq::Proxy::all(proxy_url).map_err(|e| {
            Error::InvalidConfiguration(format!("Failed to configure proxy {}: {}", proxy_url, e))
        })?;
        builder = builder.proxy(proxy);
    }

    Ok(builder.build()?)
}

#[async_trait]
impl VintedApi for VintedClient {
    async fn call(&self, endpoint: &str, params: Option<&Params>) -> Result<Value> {
        let request = ApiRequest::new(endpoint, params);
        let url = request.url(&self.origin);
        let mut refreshes = 0;

        loop {
            let response = self.send(&url).await?;
            let status = response.status().as_u16();
            debug!("Response status: {} for {}", status, request.path());

            match status {
                200 => {
                    let body = response.text().await?;
                    return serde_json::from_str(&body).map_err(|e| {
                        warn!("Failed to parse JSON response from {}: {}", request.path(), e);
                        Error::InvalidResponse {
                            endpoint: request.path().to_string(),
                            detail: e.to_string(),
                        }
                    });
                }
                401 if refreshes < self.max_refreshes => {
                    refreshes += 1;
                    warn!(
                        "Unauthorized on {}, refreshing session cookie ({}/{})",
                        request.path(),
                        refreshes,
                        self.max_refreshes
                    );
                    self.refresh_credential().await?;
                }
                _ => {
                    return Err(Error::ApiCall { endpoint: request.path().to_string(), status });
                }
            }
        }
    }

    async fn search(&self, params: Option<&Params>) -> Result<Value> {
        info!("Searching catalog: {}", params.map(Params::to_query_string).unwrap_or_default());
        self.call(CATALOG_ITEMS, params).await
    }

    async fn item(&self, item_id: &str, params: Option<&Params>) -> Result<Value> {
        info!("Fetching item: {}", item_id);
        self.call(&self.item_path(item_id), params).await
    }

    fn item_path(&self, item_id: &str) -> String {
        self.item_endpoint.path(item_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vinted::session::SESSION_COOKIE_NAME;
    use serde_json::json;
    use std::collections::BTreeMap;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_test_config() -> ClientConfig {
        ClientConfig {
            user_agent: Some("TestAgent/1.0".to_string()),
            backoff_base_ms: 0,
            ..ClientConfig::default()
        }
    }

    fn cookie_response(token: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .append_header("set-cookie", format!("{}={}; Path=/", SESSION_COOKIE_NAME, token))
    }

    fn cookie_header(token: &str) -> String {
        format!("{}={}", SESSION_COOKIE_NAME, token)
    }

    async fn mount_bootstrap(server: &MockServer, token: &str) {
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(cookie_response(token))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_construction_bootstraps_credential() {
        let mock_server = MockServer::start().await;
        mount_bootstrap(&mock_server, "token1").await;

        let client =
            VintedClient::with_origin(&make_test_config(), Some(mock_server.uri())).await.unwrap();

        assert_eq!(client.credential().await.get(SESSION_COOKIE_NAME), Some("token1"));
        assert_eq!(client.origin(), mock_server.uri());
        assert_eq!(client.user_agent(), "TestAgent/1.0");
    }

    #[tokio::test]
    async fn test_invalid_base_url_fails_before_network() {
        for bad in ["https://www.vinted.com/catalog", "vinted", "https://www.vinted.com:8443"] {
            let config = ClientConfig::new(bad);
            let result = VintedClient::with_origin(&config, Some("http://127.0.0.1:1".to_string())).await;
            assert!(matches!(result, Err(Error::InvalidConfiguration(_))), "{}", bad);
        }
    }

    #[tokio::test]
    async fn test_random_user_agent_when_unset() {
        let mut config = make_test_config();
        config.user_agent = None;
        config.session_cookie = Some(BTreeMap::from([(SESSION_COOKIE_NAME.to_string(), "x".to_string())]));

        let client = VintedClient::with_origin(&config, Some("http://localhost".to_string())).await.unwrap();
        assert!(crate::vinted::user_agents::USER_AGENTS.contains(&client.user_agent()));
    }

    #[tokio::test]
    async fn test_preset_cookie_skips_bootstrap() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(cookie_response("unused"))
            .expect(0)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path(CATALOG_ITEMS))
            .and(header("cookie", cookie_header("preset").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut config = make_test_config();
        config.session_cookie =
            Some(BTreeMap::from([(SESSION_COOKIE_NAME.to_string(), "preset".to_string())]));

        let client = VintedClient::with_origin(&config, Some(mock_server.uri())).await.unwrap();
        let body = client.search(None).await.unwrap();
        assert_eq!(body, json!({"items": []}));
    }

    #[tokio::test]
    async fn test_search_sends_query_and_headers() {
        let mock_server = MockServer::start().await;
        mount_bootstrap(&mock_server, "token1").await;

        Mock::given(method("GET"))
            .and(path(CATALOG_ITEMS))
            .and(query_param("search_text", "games"))
            .and(query_param("per_page", "20"))
            .and(header("cookie", cookie_header("token1").as_str()))
            .and(header("user-agent", "TestAgent/1.0"))
            .and(header("dnt", "1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"items": [{"id": 1}]})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client =
            VintedClient::with_origin(&make_test_config(), Some(mock_server.uri())).await.unwrap();
        let params = Params::new().with("search_text", "games").with("per_page", 20);

        let body = client.search(Some(&params)).await.unwrap();
        assert_eq!(body["items"][0]["id"], 1);
    }

    #[tokio::test]
    async fn test_unauthorized_refreshes_and_retries_once() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(cookie_response("token1"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(cookie_response("token2"))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path(CATALOG_ITEMS))
            .and(header("cookie", cookie_header("token1").as_str()))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path(CATALOG_ITEMS))
            .and(header("cookie", cookie_header("token2").as_str()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"items": [{"id": 7}]})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client =
            VintedClient::with_origin(&make_test_config(), Some(mock_server.uri())).await.unwrap();
        let before = client.credential().await;

        let params = Params::new().with("search_text", "games");
        let body = client.call("/catalog/items", Some(&params)).await.unwrap();

        assert_eq!(body, json!({"items": [{"id": 7}]}));
        let after = client.credential().await;
        assert_ne!(before, after);
        assert_eq!(after.get(SESSION_COOKIE_NAME), Some("token2"));
    }

    #[tokio::test]
    async fn test_persistent_unauthorized_is_bounded() {
        let mock_server = MockServer::start().await;

        // One bootstrap at construction plus two refreshes.
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(cookie_response("token"))
            .expect(3)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/v2/items/9/details"))
            .respond_with(ResponseTemplate::new(401))
            .expect(3)
            .mount(&mock_server)
            .await;

        let mut config = make_test_config();
        config.max_refreshes = 2;

        let client = VintedClient::with_origin(&config, Some(mock_server.uri())).await.unwrap();
        let err = client.item("9", None).await.unwrap_err();

        assert!(matches!(err, Error::ApiCall { status: 401, .. }));
        assert!(err.to_string().contains("/api/v2/items/9/details"));
    }

    #[tokio::test]
    async fn test_server_error_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(cookie_response("token1"))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path(CATALOG_ITEMS))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client =
            VintedClient::with_origin(&make_test_config(), Some(mock_server.uri())).await.unwrap();
        let before = client.credential().await;

        let err = client.search(None).await.unwrap_err();
        assert!(matches!(err, Error::ApiCall { status: 500, .. }));
        assert!(err.to_string().contains("500"));
        assert_eq!(client.credential().await, before);
    }

    #[tokio::test]
    async fn test_invalid_json_not_retried() {
        let mock_server = MockServer::start().await;
        mount_bootstrap(&mock_server, "token1").await;

        Mock::given(method("GET"))
            .and(path("/api/v2/items/5"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut config = make_test_config();
        config.item_endpoint = ItemEndpoint::Plain;

        let client = VintedClient::with_origin(&config, Some(mock_server.uri())).await.unwrap();
        let err = client.item("5", None).await.unwrap_err();

        match err {
            Error::InvalidResponse { endpoint, .. } => assert_eq!(endpoint, "/api/v2/items/5"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_item_details_endpoint() {
        let mock_server = MockServer::start().await;
        mount_bootstrap(&mock_server, "token1").await;

        Mock::given(method("GET"))
            .and(path("/api/v2/items/42/details"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"item": {"id": 42}})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client =
            VintedClient::with_origin(&make_test_config(), Some(mock_server.uri())).await.unwrap();
        assert_eq!(client.item_endpoint(), ItemEndpoint::Details);

        let body = client.item("42", None).await.unwrap();
        assert_eq!(body["item"]["id"], 42);
    }

    #[tokio::test]
    async fn test_call_custom_endpoint() {
        let mock_server = MockServer::start().await;
        mount_bootstrap(&mock_server, "token1").await;

        Mock::given(method("GET"))
            .and(path("/api/v2/users/123"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"user": {"login": "seller"}})),
            )
            .expect(2)
            .mount(&mock_server)
            .await;

        let client =
            VintedClient::with_origin(&make_test_config(), Some(mock_server.uri())).await.unwrap();

        let prefixed = client.call("/api/v2/users/123", None).await.unwrap();
        let bare = client.call("/users/123", None).await.unwrap();
        assert_eq!(prefixed, bare);
        assert_eq!(bare["user"]["login"], "seller");
    }

    #[tokio::test]
    async fn test_construction_fails_when_bootstrap_exhausted() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&mock_server)
            .await;

        let mut config = make_test_config();
        config.retries = 2;

        let result = VintedClient::with_origin(&config, Some(mock_server.uri())).await;
        match result {
            Err(err @ Error::CredentialAcquisition { .. }) => {
                assert_eq!(err.status(), Some(503));
            }
            Err(other) => panic!("unexpected error: {:?}", other),
            Ok(_) => panic!("construction should fail"),
        }
    }

    #[tokio::test]
    async fn test_refresh_failure_surfaces_from_call() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(cookie_response("token1"))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path(CATALOG_ITEMS))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut config = make_test_config();
        config.retries = 1;

        let client = VintedClient::with_origin(&config, Some(mock_server.uri())).await.unwrap();
        let err = client.search(None).await.unwrap_err();
        assert!(matches!(err, Error::CredentialAcquisition { status: Some(403), .. }));
        assert_eq!(client.credential().await.get(SESSION_COOKIE_NAME), Some("token1"));
    }

    #[tokio::test]
    async fn test_transport_failure_not_retried() {
        let mut config = make_test_config();
        config.session_cookie =
            Some(BTreeMap::from([(SESSION_COOKIE_NAME.to_string(), "preset".to_string())]));

        // Nothing listens on port 1.
        let client =
            VintedClient::with_origin(&config, Some("http://127.0.0.1:1".to_string())).await.unwrap();
        let err = client.search(None).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn test_manual_refresh_replaces_credential() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(cookie_response("token1"))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        mount_bootstrap(&mock_server, "token2").await;

        let client =
            VintedClient::with_origin(&make_test_config(), Some(mock_server.uri())).await.unwrap();
        let fresh = client.refresh_credential().await.unwrap();

        assert_eq!(fresh.get(SESSION_COOKIE_NAME), Some("token2"));
        assert_eq!(client.credential().await, fresh);
        client.close();
    }

    fn preset_config() -> ClientConfig {
        let mut config = make_test_config();
        config.session_cookie =
            Some(BTreeMap::from([(SESSION_COOKIE_NAME.to_string(), "preset".to_string())]));
        config
    }

    async fn mount_redirect(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path(CATALOG_ITEMS))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("location", format!("{}/api/v2/catalog/moved", server.uri())),
            )
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/catalog/moved"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_timeout_surfaces_as_transport_without_refresh() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(cookie_response("unused"))
            .expect(0)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path(CATALOG_ITEMS))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"items": []}))
                    .set_delay(std::time::Duration::from_secs(3)),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut config = preset_config();
        config.timeout_secs = 1;

        let client = VintedClient::with_origin(&config, Some(mock_server.uri())).await.unwrap();
        let err = client.search(None).await.unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(client.credential().await.get(SESSION_COOKIE_NAME), Some("preset"));
    }

    #[tokio::test]
    async fn test_redirect_not_followed_when_disabled() {
        let mock_server = MockServer::start().await;
        mount_redirect(&mock_server).await;

        let mut config = preset_config();
        config.follow_redirects = false;

        let client = VintedClient::with_origin(&config, Some(mock_server.uri())).await.unwrap();
        let err = client.search(None).await.unwrap_err();

        assert!(matches!(err, Error::ApiCall { status: 302, .. }));
    }

    #[tokio::test]
    async fn test_redirect_followed_by_default() {
        let mock_server = MockServer::start().await;
        mount_redirect(&mock_server).await;

        let client =
            VintedClient::with_origin(&preset_config(), Some(mock_server.uri())).await.unwrap();
        let body = client.search(None).await.unwrap();

        assert_eq!(body, json!({"items": []}));
    }

    /// Wraps `data` in a zlib stream made of one stored (uncompressed) block.
    fn zlib_stored(data: &[u8]) -> Vec<u8> {
        let len = data.len() as u16;
        let mut out = vec![0x78, 0x01, 0x01];
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&(!len).to_le_bytes());
        out.extend_from_slice(data);

        let (mut a, mut b) = (1u32, 0u32);
        for byte in data {
            a = (a + u32::from(*byte)) % 65521;
            b = (b + a) % 65521;
        }
        out.extend_from_slice(&((b << 16) | a).to_be_bytes());
        out
    }

    #[tokio::test]
    async fn test_deflate_encoded_body_is_decoded() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(CATALOG_ITEMS))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-encoding", "deflate")
                    .set_body_bytes(zlib_stored(br#"{"items":[{"id":3}]}"#)),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client =
            VintedClient::with_origin(&preset_config(), Some(mock_server.uri())).await.unwrap();
        let body = client.search(None).await.unwrap();

        assert_eq!(body["items"][0]["id"], 3);
    }
}
