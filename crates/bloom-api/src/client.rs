//! API client: request pipeline, session renewal, and the verb facade.

use crate::envelope::{decode_envelope, Envelope};
use crate::error::{ApiError, ApiResult, GENERIC_NETWORK_MESSAGE};
use crate::request::{RequestBody, RequestDescriptor, UploadForm};
use bloom_core::{Config, API_VERSION_PREFIX};
use bloom_storage::CredentialStore;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Session renewal endpoint, relative to the versioned API base.
pub const RENEWAL_PATH: &str = "/auth/refresh";

/// Renewal request body.
#[derive(Debug, Serialize)]
struct RenewalRequest {
    refresh_token: String,
}

/// Renewal response body. The server may omit a rotated refresh token, in
/// which case the prior one stays valid.
#[derive(Debug, Deserialize)]
struct RenewalResponse {
    token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Authenticated API client.
///
/// All credential mutation funnels through the injected [`CredentialStore`];
/// session renewal is single-flight: of N concurrent requests that observe
/// an expired token, exactly one calls the renewal endpoint and the rest
/// adopt the published credential pair.
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    credentials: Arc<CredentialStore>,
    /// Guard serializing renewal attempts across in-flight requests.
    renewal: tokio::sync::Mutex<()>,
}

impl ApiClient {
    /// Create a new client from configuration.
    pub fn new(config: &Config, credentials: Arc<CredentialStore>) -> ApiResult<Self> {
        let base = Url::parse(&format!(
            "{}{}",
            config.api_url.trim_end_matches('/'),
            API_VERSION_PREFIX
        ))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            http,
            base,
            credentials,
            renewal: tokio::sync::Mutex::new(()),
        })
    }

    // ==========================================
    // Typed verb facade
    // ==========================================

    /// GET with query parameters.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> ApiResult<T> {
        self.execute(RequestDescriptor::new(Method::GET, path).with_query(query))
            .await
    }

    /// POST with a JSON body.
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let body = serde_json::to_value(body)?;
        self.execute(RequestDescriptor::new(Method::POST, path).with_json(body))
            .await
    }

    /// PUT with a JSON body.
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let body = serde_json::to_value(body)?;
        self.execute(RequestDescriptor::new(Method::PUT, path).with_json(body))
            .await
    }

    /// DELETE with query parameters.
    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> ApiResult<T> {
        self.execute(RequestDescriptor::new(Method::DELETE, path).with_query(query))
            .await
    }

    /// POST a multipart form (uploads).
    pub async fn upload<T: DeserializeOwned>(&self, path: &str, form: UploadForm) -> ApiResult<T> {
        self.execute(RequestDescriptor::new(Method::POST, path).with_form(form))
            .await
    }

    // ==========================================
    // Pipeline
    // ==========================================

    /// Run a logical request: dispatch, normalize, and on a transport 401
    /// perform at most one renewal-and-retry cycle.
    async fn execute<T: DeserializeOwned>(&self, mut request: RequestDescriptor) -> ApiResult<T> {
        let token = self.credentials.get_access_token();
        let response = self.dispatch(&request, token.as_deref()).await?;

        if response.status() == StatusCode::UNAUTHORIZED && !request.retried {
            let original = Self::unauthorized_failure(response).await;

            return match self.renew_session(token.as_deref()).await {
                Ok(fresh_token) => {
                    request.retried = true;
                    let retried = self.dispatch(&request, Some(&fresh_token)).await?;
                    // The retry's outcome is final, another 401 included.
                    Self::normalize(retried).await
                }
                Err(e) => {
                    warn!(error = %e, "Session renewal failed, purging credentials");
                    self.credentials.clear_tokens();
                    // The caller sees the original authorization failure,
                    // not the renewal failure.
                    Err(original)
                }
            };
        }

        Self::normalize(response).await
    }

    /// Build and send one HTTP request.
    async fn dispatch(
        &self,
        request: &RequestDescriptor,
        token: Option<&str>,
    ) -> ApiResult<reqwest::Response> {
        let url = self.endpoint(&request.path)?;
        let mut builder = self.http.request(request.method.clone(), url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            // Multipart composition replaces the default header set, so the
            // bearer header below is attached after the body for every kind.
            RequestBody::Multipart(form) => builder.multipart(form.to_multipart()?),
        };

        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        debug!(method = %request.method, path = %request.path, retried = request.retried, "Dispatching request");
        Ok(builder.send().await?)
    }

    /// Convert a transport response into the caller-visible result.
    async fn normalize<T: DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            return decode_envelope(&body);
        }

        let body = response.text().await.unwrap_or_default();
        let (message, data) = Self::failure_details(&body);

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized {
                status: status.as_u16(),
                message,
            });
        }

        Err(ApiError::Status {
            status: status.as_u16(),
            message,
            data,
        })
    }

    /// Build the surfaced error for the first 401 of a logical request.
    async fn unauthorized_failure(response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let (message, _) = Self::failure_details(&body);
        ApiError::Unauthorized { status, message }
    }

    /// Pull `{message, data}` out of a failure body when it carries the
    /// business envelope, falling back to generic network-error text.
    fn failure_details(body: &str) -> (String, Option<serde_json::Value>) {
        match serde_json::from_str::<Envelope>(body) {
            Ok(envelope) => (
                envelope
                    .message
                    .unwrap_or_else(|| GENERIC_NETWORK_MESSAGE.to_string()),
                if envelope.data.is_null() {
                    None
                } else {
                    Some(envelope.data)
                },
            ),
            Err(_) => (GENERIC_NETWORK_MESSAGE.to_string(), None),
        }
    }

    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        Url::parse(&format!("{}{}", self.base, path)).map_err(ApiError::from)
    }

    // ==========================================
    // Session renewal coordinator
    // ==========================================

    /// Exchange the stored refresh token for a new credential pair.
    ///
    /// Single-flight: the guard serializes concurrent attempts, and a waiter
    /// that finds the stored access token already changed from the one its
    /// failed dispatch used adopts it instead of renewing again.
    async fn renew_session(&self, stale_token: Option<&str>) -> ApiResult<String> {
        let _guard = self.renewal.lock().await;

        if let Some(current) = self.credentials.get_access_token() {
            if stale_token != Some(current.as_str()) {
                debug!("Adopting credential pair renewed by a concurrent request");
                return Ok(current);
            }
        }

        let refresh_token =
            self.credentials
                .get_refresh_token()
                .ok_or_else(|| ApiError::Unauthorized {
                    status: 401,
                    message: "No refresh token available".to_string(),
                })?;

        let url = self.endpoint(RENEWAL_PATH)?;
        debug!(url = %url, "Renewing session");

        let response = self
            .http
            .post(url)
            .json(&RenewalRequest {
                refresh_token: refresh_token.clone(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let (message, _) = Self::failure_details(&body);
            warn!(status = %status, "Token renewal rejected");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
                data: None,
            });
        }

        let data: RenewalResponse = response.json().await?;
        let next_refresh = data.refresh_token.unwrap_or(refresh_token);
        self.credentials.set_tokens(&data.token, &next_refresh);

        info!("Session renewed");
        Ok(data.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloom_storage::{SecureStorage, StorageResult};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory storage for testing.
    struct MemoryStorage {
        data: Mutex<HashMap<String, String>>,
    }

    impl MemoryStorage {
        fn new() -> Self {
            Self {
                data: Mutex::new(HashMap::new()),
            }
        }
    }

    impl SecureStorage for MemoryStorage {
        fn set(&self, key: &str, value: &str) -> StorageResult<()> {
            self.data
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn get(&self, key: &str) -> StorageResult<Option<String>> {
            Ok(self.data.lock().unwrap().get(key).cloned())
        }

        fn delete(&self, key: &str) -> StorageResult<bool> {
            Ok(self.data.lock().unwrap().remove(key).is_some())
        }
    }

    /// Minimal HTTP stub server over a local TCP socket.
    mod stub {
        use std::sync::Arc;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        pub struct StubRequest {
            pub method: String,
            pub path: String,
            pub bearer: Option<String>,
            pub body: String,
        }

        pub type Handler = Arc<dyn Fn(StubRequest) -> (u16, String) + Send + Sync>;

        fn reason(status: u16) -> &'static str {
            match status {
                200 => "OK",
                401 => "Unauthorized",
                403 => "Forbidden",
                404 => "Not Found",
                500 => "Internal Server Error",
                502 => "Bad Gateway",
                _ => "OK",
            }
        }

        fn find_header_end(buf: &[u8]) -> Option<usize> {
            buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
        }

        /// Bind a listener and serve `handler` for every connection.
        /// Returns the base URL to point the client at.
        pub async fn spawn(handler: Handler) -> String {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();

            tokio::spawn(async move {
                loop {
                    let Ok((mut socket, _)) = listener.accept().await else {
                        break;
                    };
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        let mut buf = Vec::new();
                        let mut chunk = [0u8; 4096];

                        // Read the request head.
                        let head_end = loop {
                            match socket.read(&mut chunk).await {
                                Ok(0) => return,
                                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                                Err(_) => return,
                            }
                            if let Some(end) = find_header_end(&buf) {
                                break end;
                            }
                        };

                        let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
                        let mut lines = head.lines();
                        let request_line = lines.next().unwrap_or_default();
                        let mut parts = request_line.split_whitespace();
                        let method = parts.next().unwrap_or_default().to_string();
                        let target = parts.next().unwrap_or_default();
                        let path = target.split('?').next().unwrap_or_default().to_string();

                        let mut bearer = None;
                        let mut content_length = 0usize;
                        for line in lines {
                            let lower = line.to_ascii_lowercase();
                            if let Some(value) = lower.strip_prefix("content-length:") {
                                content_length = value.trim().parse().unwrap_or(0);
                            }
                            if lower.starts_with("authorization:") {
                                bearer = line
                                    .splitn(2, ':')
                                    .nth(1)
                                    .map(|v| v.trim())
                                    .and_then(|v| v.strip_prefix("Bearer "))
                                    .map(|v| v.to_string());
                            }
                        }

                        // Read the body.
                        while buf.len() - head_end < content_length {
                            match socket.read(&mut chunk).await {
                                Ok(0) => break,
                                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                                Err(_) => return,
                            }
                        }
                        let body =
                            String::from_utf8_lossy(&buf[head_end..head_end + content_length.min(buf.len() - head_end)])
                                .to_string();

                        let (status, response_body) = handler(StubRequest {
                            method,
                            path,
                            bearer,
                            body,
                        });

                        let response = format!(
                            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            reason(status),
                            response_body.len(),
                            response_body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
            });

            format!("http://{}", addr)
        }
    }

    use stub::{spawn, Handler, StubRequest};

    fn create_store() -> Arc<CredentialStore> {
        Arc::new(CredentialStore::new(Box::new(MemoryStorage::new())))
    }

    fn create_client(base_url: &str, credentials: Arc<CredentialStore>) -> ApiClient {
        let mut config = Config::default();
        config.api_url = base_url.to_string();
        config.request_timeout_ms = 5_000;
        ApiClient::new(&config, credentials).unwrap()
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Articles {
        items: Vec<String>,
    }

    /// Scenario A: valid token, business success passes data through.
    #[tokio::test]
    async fn test_get_with_valid_token_resolves_data() {
        let handler: Handler = Arc::new(|req: StubRequest| {
            assert_eq!(req.method, "GET");
            if req.path == "/api/v1/articles" && req.bearer.as_deref() == Some("valid-token") {
                (200, json!({"code": 200, "data": {"items": ["a", "b"]}}).to_string())
            } else {
                (401, json!({"message": "unauthorized"}).to_string())
            }
        });
        let base = spawn(handler).await;

        let store = create_store();
        store.set_tokens("valid-token", "refresh-1");
        let client = create_client(&base, store);

        let articles: Articles = client.get("/articles", &[]).await.unwrap();
        assert_eq!(articles.items, vec!["a", "b"]);
    }

    /// Scenario B: expired token, renewal succeeds, retry resolves; the
    /// store holds the new credential pair afterwards.
    #[tokio::test]
    async fn test_expired_token_renews_and_retries() {
        let refresh_calls = Arc::new(AtomicUsize::new(0));
        let refresh_calls_srv = refresh_calls.clone();

        let handler: Handler = Arc::new(move |req: StubRequest| {
            if req.path == "/api/v1/auth/refresh" {
                refresh_calls_srv.fetch_add(1, Ordering::SeqCst);
                assert!(req.body.contains("refresh-1"));
                return (
                    200,
                    json!({"token": "fresh-token", "refresh_token": "refresh-2"}).to_string(),
                );
            }
            if req.bearer.as_deref() == Some("fresh-token") {
                (200, json!({"code": 200, "data": {"items": ["x"]}}).to_string())
            } else {
                (401, json!({"message": "token expired"}).to_string())
            }
        });
        let base = spawn(handler).await;

        let store = create_store();
        store.set_tokens("stale-token", "refresh-1");
        let client = create_client(&base, store.clone());

        let articles: Articles = client.get("/articles", &[]).await.unwrap();
        assert_eq!(articles.items, vec!["x"]);

        assert_eq!(refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get_access_token(), Some("fresh-token".to_string()));
        assert_eq!(store.get_refresh_token(), Some("refresh-2".to_string()));
    }

    /// Renewal response without a rotated refresh token keeps the prior one.
    #[tokio::test]
    async fn test_renewal_keeps_prior_refresh_token_when_omitted() {
        let handler: Handler = Arc::new(|req: StubRequest| {
            if req.path == "/api/v1/auth/refresh" {
                return (200, json!({"token": "fresh-token"}).to_string());
            }
            if req.bearer.as_deref() == Some("fresh-token") {
                (200, json!({"code": 0, "data": null}).to_string())
            } else {
                (401, "{}".to_string())
            }
        });
        let base = spawn(handler).await;

        let store = create_store();
        store.set_tokens("stale-token", "refresh-1");
        let client = create_client(&base, store.clone());

        let () = client.get("/ping", &[]).await.unwrap();
        assert_eq!(store.get_refresh_token(), Some("refresh-1".to_string()));
    }

    /// Scenario C: renewal itself is rejected; the original authorization
    /// failure is surfaced and the credential pair is purged.
    #[tokio::test]
    async fn test_renewal_failure_purges_and_surfaces_original_error() {
        let handler: Handler = Arc::new(|req: StubRequest| {
            if req.path == "/api/v1/auth/refresh" {
                return (401, json!({"message": "refresh revoked"}).to_string());
            }
            (401, json!({"message": "token expired"}).to_string())
        });
        let base = spawn(handler).await;

        let store = create_store();
        store.set_tokens("stale-token", "refresh-1");
        let client = create_client(&base, store.clone());

        let err = client.get::<Articles>("/articles", &[]).await.unwrap_err();
        match err {
            ApiError::Unauthorized { status, message } => {
                assert_eq!(status, 401);
                // The original failure, not the renewal failure.
                assert_eq!(message, "token expired");
            }
            other => panic!("Expected unauthorized error, got {:?}", other),
        }

        assert_eq!(store.get_access_token(), None);
        assert_eq!(store.get_refresh_token(), None);
    }

    /// Missing refresh token skips straight to renewal failure and purge.
    #[tokio::test]
    async fn test_missing_refresh_token_fails_without_renewal_call() {
        let refresh_calls = Arc::new(AtomicUsize::new(0));
        let refresh_calls_srv = refresh_calls.clone();

        let handler: Handler = Arc::new(move |req: StubRequest| {
            if req.path == "/api/v1/auth/refresh" {
                refresh_calls_srv.fetch_add(1, Ordering::SeqCst);
            }
            (401, json!({"message": "token expired"}).to_string())
        });
        let base = spawn(handler).await;

        // Access token only; renewal has nothing to work with.
        let storage = MemoryStorage::new();
        storage
            .set(bloom_storage::StorageKeys::ACCESS_TOKEN, "stale-token")
            .unwrap();
        let store = Arc::new(CredentialStore::new(Box::new(storage)));
        let client = create_client(&base, store.clone());

        let err = client.get::<Articles>("/articles", &[]).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(refresh_calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.get_access_token(), None);
    }

    /// Scenario D: business failure on a transport success never triggers
    /// renewal and leaves credentials untouched.
    #[tokio::test]
    async fn test_business_failure_does_not_renew() {
        let refresh_calls = Arc::new(AtomicUsize::new(0));
        let refresh_calls_srv = refresh_calls.clone();

        let handler: Handler = Arc::new(move |req: StubRequest| {
            if req.path == "/api/v1/auth/refresh" {
                refresh_calls_srv.fetch_add(1, Ordering::SeqCst);
            }
            (200, json!({"code": 403, "message": "forbidden"}).to_string())
        });
        let base = spawn(handler).await;

        let store = create_store();
        store.set_tokens("valid-token", "refresh-1");
        let client = create_client(&base, store.clone());

        let err = client.get::<Articles>("/articles", &[]).await.unwrap_err();
        match err {
            ApiError::Business { code, message, .. } => {
                assert_eq!(code, 403);
                assert_eq!(message, "forbidden");
            }
            other => panic!("Expected business error, got {:?}", other),
        }

        assert_eq!(refresh_calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.get_access_token(), Some("valid-token".to_string()));
        assert_eq!(store.get_refresh_token(), Some("refresh-1".to_string()));
    }

    /// A retried request that is rejected again is surfaced as-is, with no
    /// second renewal attempt.
    #[tokio::test]
    async fn test_retry_rejected_again_does_not_renew_twice() {
        let refresh_calls = Arc::new(AtomicUsize::new(0));
        let refresh_calls_srv = refresh_calls.clone();

        let handler: Handler = Arc::new(move |req: StubRequest| {
            if req.path == "/api/v1/auth/refresh" {
                refresh_calls_srv.fetch_add(1, Ordering::SeqCst);
                return (
                    200,
                    json!({"token": "fresh-token", "refresh_token": "refresh-2"}).to_string(),
                );
            }
            // Reject every request, fresh token included.
            (401, json!({"message": "still unauthorized"}).to_string())
        });
        let base = spawn(handler).await;

        let store = create_store();
        store.set_tokens("stale-token", "refresh-1");
        let client = create_client(&base, store.clone());

        let err = client.get::<Articles>("/articles", &[]).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(refresh_calls.load(Ordering::SeqCst), 1);
    }

    /// Scenario E: two concurrent requests with an expired token cause
    /// exactly one renewal call; both retry against the published pair.
    #[tokio::test]
    async fn test_concurrent_requests_share_single_renewal() {
        let refresh_calls = Arc::new(AtomicUsize::new(0));
        let refresh_calls_srv = refresh_calls.clone();

        let handler: Handler = Arc::new(move |req: StubRequest| {
            if req.path == "/api/v1/auth/refresh" {
                refresh_calls_srv.fetch_add(1, Ordering::SeqCst);
                return (
                    200,
                    json!({"token": "fresh-token", "refresh_token": "refresh-2"}).to_string(),
                );
            }
            if req.bearer.as_deref() == Some("fresh-token") {
                (200, json!({"code": 200, "data": {"items": ["x"]}}).to_string())
            } else {
                (401, json!({"message": "token expired"}).to_string())
            }
        });
        let base = spawn(handler).await;

        let store = create_store();
        store.set_tokens("stale-token", "refresh-1");
        let client = create_client(&base, store.clone());

        let (first, second) = tokio::join!(
            client.get::<Articles>("/articles", &[]),
            client.get::<Articles>("/moments", &[]),
        );

        assert_eq!(first.unwrap().items, vec!["x"]);
        assert_eq!(second.unwrap().items, vec!["x"]);
        assert_eq!(refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get_access_token(), Some("fresh-token".to_string()));
    }

    /// Requests with no stored token dispatch unauthenticated.
    #[tokio::test]
    async fn test_dispatch_without_token_omits_bearer() {
        let handler: Handler = Arc::new(|req: StubRequest| {
            assert!(req.bearer.is_none());
            (200, json!({"code": 200, "data": {"items": []}}).to_string())
        });
        let base = spawn(handler).await;

        let client = create_client(&base, create_store());
        let articles: Articles = client.get("/articles", &[]).await.unwrap();
        assert!(articles.items.is_empty());
    }

    /// Non-401 transport failures are normalized, not retried.
    #[tokio::test]
    async fn test_server_error_normalized() {
        let requests = Arc::new(AtomicUsize::new(0));
        let requests_srv = requests.clone();

        let handler: Handler = Arc::new(move |_req: StubRequest| {
            requests_srv.fetch_add(1, Ordering::SeqCst);
            (502, json!({"message": "upstream down"}).to_string())
        });
        let base = spawn(handler).await;

        let client = create_client(&base, create_store());
        let err = client.get::<Articles>("/articles", &[]).await.unwrap_err();

        match err {
            ApiError::Status { status, message, .. } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream down");
            }
            other => panic!("Expected status error, got {:?}", other),
        }
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    /// Failure bodies that are not the business envelope fall back to the
    /// generic network-error text.
    #[tokio::test]
    async fn test_non_envelope_failure_body_uses_generic_message() {
        let handler: Handler =
            Arc::new(|_req: StubRequest| (500, "<html>oops</html>".to_string()));
        let base = spawn(handler).await;

        let client = create_client(&base, create_store());
        let err = client.get::<Articles>("/articles", &[]).await.unwrap_err();
        assert_eq!(err.code(), 500);
        assert_eq!(err.message(), GENERIC_NETWORK_MESSAGE);
    }

    /// POST serializes the JSON body and decodes the envelope.
    #[tokio::test]
    async fn test_post_json_body() {
        let handler: Handler = Arc::new(|req: StubRequest| {
            assert_eq!(req.method, "POST");
            assert!(req.body.contains("\"text\":\"hello\""));
            (200, json!({"code": 0, "data": {"items": ["created"]}}).to_string())
        });
        let base = spawn(handler).await;

        let client = create_client(&base, create_store());
        let result: Articles = client
            .post("/moments", &json!({"text": "hello"}))
            .await
            .unwrap();
        assert_eq!(result.items, vec!["created"]);
    }

    /// Upload sends multipart with the bearer header attached.
    #[tokio::test]
    async fn test_upload_multipart_with_bearer() {
        let handler: Handler = Arc::new(|req: StubRequest| {
            assert_eq!(req.method, "POST");
            assert_eq!(req.bearer.as_deref(), Some("valid-token"));
            assert!(req.body.contains("caption"));
            assert!(req.body.contains("photo-bytes"));
            (200, json!({"code": 200, "data": {"items": ["url"]}}).to_string())
        });
        let base = spawn(handler).await;

        let store = create_store();
        store.set_tokens("valid-token", "refresh-1");
        let client = create_client(&base, store);

        let form = UploadForm::new()
            .text("caption", "first steps")
            .file("photo", "steps.jpg", "image/jpeg", b"photo-bytes".to_vec());

        let result: Articles = client.upload("/upload", form).await.unwrap();
        assert_eq!(result.items, vec!["url"]);
    }

    /// Query parameters reach the server.
    #[tokio::test]
    async fn test_query_parameters_serialized() {
        let handler: Handler = Arc::new(|req: StubRequest| {
            // Path is stripped of its query in the stub; presence of the
            // request is enough, the client would fail on a bad URL anyway.
            assert_eq!(req.path, "/api/v1/articles");
            (200, json!({"code": 200, "data": {"items": []}}).to_string())
        });
        let base = spawn(handler).await;

        let client = create_client(&base, create_store());
        let _: Articles = client
            .get("/articles", &[("page", "2"), ("size", "20")])
            .await
            .unwrap();
    }
}
