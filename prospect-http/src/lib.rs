//! HTTP client with safe logging, bounded retries, and flexible auth.
//!
//! - Request options: headers, `Auth`, query params, user agent, timeout, retries
//! - JSON helpers for APIs, text helpers for HTML pages
//! - Redacts sensitive query params and never logs secret values
//! - Retries 429/5xx and send failures with exponential backoff and `Retry-After`
//! - Optional *raw* request/response logging via `PROSPECT_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), prospect_http::HttpError> {
//! let client = prospect_http::HttpClient::new("https://api.example.com")?;
//! let got: serde_json::Value = client
//!     .get_json("v1/items", prospect_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Clients built with [`HttpClient::unanchored`] have no base URL and only
//! accept absolute URLs. The page fetcher and the HTML search tier use them.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, RETRY_AFTER, USER_AGENT};
use reqwest::redirect::Policy;
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;

const RAW_ENV: &str = "PROSPECT_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024;
const SNIPPET_MAX: usize = 500;

const SECRET_PARAMS: &[&str] = &[
    "access_token",
    "authorization",
    "auth",
    "key",
    "api_key",
    "token",
    "secret",
    "client_secret",
    "bearer",
];

fn raw_enabled() -> bool {
    matches!(env::var(RAW_ENV).as_deref(), Ok("1") | Ok("true") | Ok("yes"))
}

fn is_secret_param(name: &str) -> bool {
    SECRET_PARAMS.contains(&name.to_ascii_lowercase().as_str())
}

fn is_secret_header(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower == "authorization" || lower.contains("token") || lower.contains("api-key")
}

/// Render a curl command for repro/debug. Secret headers and query values are
/// redacted.
fn make_curl(method: &Method, url: &Url, headers: &HeaderMap, body: Option<&[u8]>) -> String {
    let mut parts = vec!["curl".to_string(), format!("-X{method}")];
    for (name, val) in headers.iter() {
        let v = if is_secret_header(name.as_str()) {
            "<redacted>".to_string()
        } else {
            val.to_str().unwrap_or("").to_string()
        };
        parts.push(format!("-H '{}: {}'", name.as_str(), v.replace('\'', r"'\''")));
    }
    if let Some(bytes) = body {
        match std::str::from_utf8(bytes) {
            Ok(s) => {
                let mut s = s.to_string();
                truncate_on_boundary(&mut s, RAW_MAX_BODY);
                parts.push(format!("-d '{}'", s.replace('\'', r"'\''")));
            }
            Err(_) => parts.push(format!("--data-binary @- # ({} bytes)", bytes.len())),
        }
    }
    let (host_path, query) = redact_query(url);
    let query = query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    let scheme = url.scheme();
    if query.is_empty() {
        parts.push(format!("'{scheme}://{host_path}'"));
    } else {
        parts.push(format!("'{scheme}://{host_path}?{query}'"));
    }
    parts.join(" ")
}

fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let val = if is_secret_header(&key) {
                "<redacted>".to_string()
            } else {
                v.to_str().unwrap_or("").to_string()
            };
            (key, val)
        })
        .collect()
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

impl HttpError {
    /// True for failures worth logging as "blocked": 403 and 429.
    pub fn is_blocked(&self) -> bool {
        matches!(
            self,
            HttpError::Api { status, .. }
                if *status == StatusCode::FORBIDDEN || *status == StatusCode::TOO_MANY_REQUESTS
        )
    }
}

/// Authentication strategies supported by the HTTP client helpers.
///
/// ```
/// use prospect_http::Auth;
///
/// let bearer = Auth::Bearer("token");
/// match bearer {
///     Auth::Bearer(value) => assert_eq!(value, "token"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// Authorization: Bearer <token>
    Bearer(&'a str),
    /// Custom header (e.g., Brave: X-Subscription-Token)
    Header {
        name: HeaderName,
        value: HeaderValue,
    },
    /// Auth via query param
    Query {
        name: &'a str,
        value: Cow<'a, str>,
    },
    None,
}

impl Auth<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Auth::Bearer(_) => "bearer",
            Auth::Header { .. } => "header",
            Auth::Query { .. } => "query",
            Auth::None => "none",
        }
    }
}

/// Per-request tuning knobs for the HTTP client.
///
/// ```
/// use prospect_http::{Auth, RequestOpts};
/// use std::borrow::Cow;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(30)),
///     retries: Some(1),
///     auth: Some(Auth::Query {
///         name: "apikey",
///         value: Cow::Borrowed("demo"),
///     }),
///     ..Default::default()
/// };
///
/// assert_eq!(opts.timeout.unwrap().as_secs(), 30);
/// assert!(opts.user_agent.is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub retries: Option<usize>,
    pub auth: Option<Auth<'a>>,
    pub headers: Option<HeaderMap>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>,
    /// Overrides the client's default `User-Agent` for this request.
    pub user_agent: Option<&'a str>,
    /// If true and `path` is an absolute URL, use it as-is (ignore base).
    pub allow_absolute: bool,
}

/// A successful (2xx) text response.
#[derive(Debug, Clone)]
pub struct TextResponse {
    pub status: StatusCode,
    /// URL after redirects.
    pub final_url: Url,
    pub content_type: Option<String>,
    pub body: String,
}

enum Payload {
    Json(Vec<u8>),
    Form(String),
}

impl Payload {
    fn bytes(&self) -> &[u8] {
        match self {
            Payload::Json(b) => b,
            Payload::Form(s) => s.as_bytes(),
        }
    }

    fn content_type(&self) -> &'static str {
        match self {
            Payload::Json(_) => "application/json",
            Payload::Form(_) => "application/x-www-form-urlencoded",
        }
    }
}

struct RawResponse {
    status: StatusCode,
    final_url: Url,
    headers: HeaderMap,
    body: Vec<u8>,
    req_id: String,
}

#[derive(Clone)]
pub struct HttpClient {
    base: Option<Url>,
    inner: Client,
    pub default_timeout: Duration,
    pub max_retries: usize,
    /// First backoff step; doubled per attempt.
    pub backoff_base: Duration,
}

/// Builder for the underlying `reqwest` client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub connect_timeout: Duration,
    pub max_redirects: usize,
    pub default_user_agent: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            max_redirects: 10,
            default_user_agent: None,
        }
    }
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// ```no_run
    /// use prospect_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com")?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(15));
    /// assert_eq!(client.max_retries, 2);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        Self::build(Some(base), ClientOptions::default())
    }

    /// Construct a client with no base URL; every path must be absolute.
    pub fn unanchored(options: ClientOptions) -> Result<Self, HttpError> {
        Self::build(None, options)
    }

    fn build(base: Option<Url>, options: ClientOptions) -> Result<Self, HttpError> {
        let mut builder = Client::builder()
            .connect_timeout(options.connect_timeout)
            .redirect(Policy::limited(options.max_redirects));
        if let Some(ua) = &options.default_user_agent {
            builder = builder.user_agent(ua.clone());
        }
        let inner = builder.build().map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: Duration::from_secs(15),
            max_retries: 2,
            backoff_base: Duration::from_millis(200),
        })
    }

    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    pub fn with_backoff(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// POST JSON using optional Bearer auth.
    pub async fn post_json<B, T>(
        &self,
        path: &str,
        bearer: Option<&str>,
        body: &B,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let opts = RequestOpts {
            auth: bearer.map(Auth::Bearer),
            ..Default::default()
        };
        self.post_json_opts(path, body, opts).await
    }

    /// GET JSON with per-request options.
    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        let raw = self.execute(Method::GET, path, None, opts).await?;
        decode_json(raw)
    }

    /// POST JSON with per-request options.
    pub async fn post_json_opts<B, T>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let bytes = serde_json::to_vec(body).map_err(|e| HttpError::Build(e.to_string()))?;
        let raw = self
            .execute(Method::POST, path, Some(Payload::Json(bytes)), opts)
            .await?;
        decode_json(raw)
    }

    /// GET a page as text (HTML, plain text, anything UTF-8-ish).
    pub async fn get_text(&self, path: &str, opts: RequestOpts<'_>) -> Result<TextResponse, HttpError> {
        let raw = self.execute(Method::GET, path, None, opts).await?;
        Ok(into_text(raw))
    }

    /// POST an urlencoded form and read the response as text.
    pub async fn post_form_text(
        &self,
        path: &str,
        form: &[(&str, &str)],
        opts: RequestOpts<'_>,
    ) -> Result<TextResponse, HttpError> {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form.iter())
            .finish();
        let raw = self
            .execute(Method::POST, path, Some(Payload::Form(encoded)), opts)
            .await?;
        Ok(into_text(raw))
    }

    fn resolve(&self, path: &str, allow_absolute: bool) -> Result<Url, HttpError> {
        match &self.base {
            Some(base) => {
                if allow_absolute {
                    if let Ok(abs) = Url::parse(path) {
                        return Ok(abs);
                    }
                }
                base.join(path).map_err(|e| HttpError::Url(e.to_string()))
            }
            None => Url::parse(path).map_err(|e| HttpError::Url(e.to_string())),
        }
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let factor = 1u32 << (attempt.saturating_sub(1).min(16) as u32);
        self.backoff_base.saturating_mul(factor)
    }

    /// Send with retries. Returns only 2xx responses; everything else becomes
    /// an `HttpError`.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        payload: Option<Payload>,
        mut opts: RequestOpts<'_>,
    ) -> Result<RawResponse, HttpError> {
        let url = self.resolve(path, opts.allow_absolute)?;
        let max_retries = opts.retries.unwrap_or(self.max_retries);
        let timeout = opts.timeout.unwrap_or(self.default_timeout);

        // Fold query-param auth into the query list once so retries reuse it.
        if let Some(Auth::Query { name, value }) = &opts.auth {
            let mut q = opts.query.take().unwrap_or_default();
            q.push((*name, value.clone()));
            opts.query = Some(q);
        }
        let bearer = match &opts.auth {
            Some(Auth::Bearer(tok)) => Some(sanitize_api_key(tok)?),
            _ => None,
        };
        let auth_kind = opts.auth.as_ref().map(Auth::kind).unwrap_or("none");

        let redacted_q: Vec<(String, String)> = opts
            .query
            .as_ref()
            .map(|q| {
                q.iter()
                    .map(|(k, v)| {
                        let v = if is_secret_param(k) {
                            "<redacted>".to_string()
                        } else {
                            v.as_ref().to_string()
                        };
                        ((*k).to_string(), v)
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut attempt = 0usize;
        loop {
            let mut rb = self.inner.request(method.clone(), url.clone()).timeout(timeout);
            if let Some(q) = &opts.query {
                let pairs: Vec<(&str, &str)> = q.iter().map(|(k, v)| (*k, v.as_ref())).collect();
                rb = rb.query(&pairs);
            }
            if let Some(p) = &payload {
                rb = rb
                    .header(CONTENT_TYPE, p.content_type())
                    .body(p.bytes().to_vec());
            }
            if let Some(ua) = opts.user_agent {
                rb = rb.header(USER_AGENT, ua);
            }
            if let Some(hdrs) = &opts.headers {
                rb = rb.headers(hdrs.clone());
            }
            match &opts.auth {
                Some(Auth::Header { name, value }) => rb = rb.header(name, value),
                Some(Auth::Bearer(_)) => {
                    if let Some(tok) = &bearer {
                        rb = rb.bearer_auth(tok);
                    }
                }
                _ => {}
            }

            let req_id = format!(
                "r{:x}",
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_nanos()
            );

            tracing::debug!(
                req_id=%req_id,
                attempt=attempt + 1,
                max_retries,
                method=%method,
                host_path=%format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
                query=?redacted_q,
                timeout_ms=timeout.as_millis() as u64,
                auth_kind,
                has_body=%payload.is_some(),
                "http.request.start"
            );

            if raw_enabled() {
                let mut merged = HeaderMap::new();
                if let Some(h) = &opts.headers {
                    for (k, v) in h.iter() {
                        merged.append(k, v.clone());
                    }
                }
                let curl = make_curl(&method, &url, &merged, payload.as_ref().map(Payload::bytes));
                tracing::debug!(target: "http.raw", %req_id, %curl, "request");
            }

            let t0 = Instant::now();
            let sent = match rb.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    let final_url = resp.url().clone();
                    let headers = resp.headers().clone();
                    resp.bytes()
                        .await
                        .map(|b| (status, final_url, headers, b.to_vec()))
                        .map_err(|e| ("body", e.to_string()))
                }
                Err(err) => Err(("send", err.to_string())),
            };

            let (status, final_url, headers, body) = match sent {
                Ok(parts) => parts,
                Err((stage, message)) => {
                    if attempt < max_retries {
                        attempt += 1;
                        let delay = self.backoff(attempt);
                        tracing::warn!(
                            req_id=%req_id,
                            attempt,
                            max_retries,
                            stage,
                            backoff_ms=delay.as_millis() as u64,
                            message=%message,
                            "http.retrying.network"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    tracing::warn!(
                        req_id=%req_id,
                        attempt,
                        max_retries,
                        stage,
                        message=%message,
                        "http.network_error"
                    );
                    return Err(HttpError::Network(message));
                }
            };
            let dur_ms = t0.elapsed().as_millis() as u64;

            let request_id = headers
                .get("x-request-id")
                .or_else(|| headers.get("x-correlation-id"))
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-")
                .to_string();

            tracing::debug!(
                req_id=%req_id,
                %status,
                duration_ms=dur_ms,
                body_len=body.len(),
                x_request_id=%request_id,
                "http.response.headers"
            );

            if raw_enabled() {
                let hdrs = redact_headers(&headers);
                let truncated = body.len() > RAW_MAX_BODY;
                let text = String::from_utf8_lossy(&body[..body.len().min(RAW_MAX_BODY)]);
                tracing::info!(
                    target: "http.raw",
                    %req_id,
                    status=%status,
                    duration_ms=dur_ms,
                    headers=?hdrs,
                    body=%text,
                    truncated
                );
            }

            if status.is_success() {
                return Ok(RawResponse {
                    status,
                    final_url,
                    headers,
                    body,
                    req_id,
                });
            }

            let snippet = snip_body(&body);
            let message = extract_error_message(&body);
            let is_429 = status == StatusCode::TOO_MANY_REQUESTS;
            let is_5xx = status.is_server_error();

            if (is_429 || is_5xx) && attempt < max_retries {
                attempt += 1;
                let retry_after = retry_after_delay_secs(&headers);
                let delay = match retry_after {
                    Some(secs) => Duration::from_secs(secs),
                    None if is_429 => self.backoff(attempt).max(self.backoff_base * 5),
                    None => self.backoff(attempt),
                };
                tracing::warn!(
                    req_id=%req_id,
                    %status,
                    attempt,
                    max_retries,
                    backoff_ms=delay.as_millis() as u64,
                    retry_after_secs=?retry_after,
                    message=%message,
                    "http.retrying"
                );
                sleep(delay).await;
                continue;
            }

            tracing::warn!(
                req_id=%req_id,
                %status,
                message=%message,
                x_request_id=%request_id,
                body_snippet=%snippet,
                "http.error"
            );
            return Err(HttpError::Api {
                status,
                message,
                request_id,
            });
        }
    }
}

fn decode_json<T: DeserializeOwned>(raw: RawResponse) -> Result<T, HttpError> {
    serde_json::from_slice::<T>(&raw.body).map_err(|e| {
        let snippet = snip_body(&raw.body);
        tracing::warn!(
            req_id=%raw.req_id,
            serde_line=%e.line(),
            serde_col=%e.column(),
            serde_err=%e,
            body_snippet=%snippet,
            "http.response.decode_error"
        );
        HttpError::Decode(e.to_string(), snippet)
    })
}

fn into_text(raw: RawResponse) -> TextResponse {
    let content_type = raw
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    TextResponse {
        status: raw.status,
        final_url: raw.final_url,
        content_type,
        body: String::from_utf8_lossy(&raw.body).into_owned(),
    }
}

fn extract_error_message(body: &[u8]) -> String {
    // {"error":{"message":"..."}}
    #[derive(Deserialize)]
    struct Nested {
        error: NestedDetail,
    }
    #[derive(Deserialize)]
    struct NestedDetail {
        message: String,
    }

    // {"message":"..."} or {"detail":"..."} or {"error":"..."}
    #[derive(Deserialize)]
    struct Flat {
        #[serde(default)]
        message: String,
        #[serde(default)]
        detail: String,
        #[serde(default)]
        error: String,
    }

    if let Ok(env) = serde_json::from_slice::<Nested>(body) {
        return env.error.message;
    }
    if let Ok(m) = serde_json::from_slice::<Flat>(body) {
        for candidate in [m.message, m.detail, m.error] {
            if !candidate.is_empty() {
                return candidate;
            }
        }
    }
    snip_body(body)
}

fn retry_after_delay_secs(h: &HeaderMap) -> Option<u64> {
    h.get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())?
        .trim()
        .parse()
        .ok()
}

fn truncate_on_boundary(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
    s.push_str("...");
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).into_owned();
    truncate_on_boundary(&mut snip, SNIPPET_MAX);
    snip
}

fn sanitize_api_key(raw: &str) -> Result<String, HttpError> {
    let mut s = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    s.retain(|ch| !ch.is_ascii_whitespace());

    if !s.is_ascii() {
        return Err(HttpError::Build("API key contains non-ASCII bytes".into()));
    }
    if s.bytes().any(|b| b < 0x20 || b == 0x7F) {
        return Err(HttpError::Build("API key contains control characters".into()));
    }
    HeaderValue::from_str(&format!("Bearer {s}"))
        .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
    Ok(s)
}

fn redact_query(url: &Url) -> (String, Vec<(String, String)>) {
    let host_path = format!("{}{}", url.host_str().unwrap_or("-"), url.path());
    let redacted = url
        .query_pairs()
        .map(|(k, v)| {
            let k = k.to_string();
            let v = if is_secret_param(&k) {
                "<redacted>".to_string()
            } else {
                v.to_string()
            };
            (k, v)
        })
        .collect::<Vec<_>>();
    (host_path, redacted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_quotes_and_whitespace() {
        assert_eq!(sanitize_api_key(" \"sk-abc\n123\" ").unwrap(), "sk-abc123");
        assert!(sanitize_api_key("bad\u{00e9}key").is_err());
    }

    #[test]
    fn curl_redacts_secret_query_values() {
        let url = Url::parse("https://api.example.com/v1/search?q=rust&api_key=hunter2").unwrap();
        let curl = make_curl(&Method::GET, &url, &HeaderMap::new(), None);
        assert!(curl.contains("q=rust"));
        assert!(curl.contains("api_key=<redacted>"));
        assert!(!curl.contains("hunter2"));
    }

    #[test]
    fn subscription_token_header_is_redacted() {
        let mut headers = HeaderMap::new();
        headers.insert("x-subscription-token", HeaderValue::from_static("secret"));
        headers.insert("accept", HeaderValue::from_static("application/json"));
        let redacted = redact_headers(&headers);
        assert!(redacted.contains(&("x-subscription-token".into(), "<redacted>".into())));
        assert!(redacted.contains(&("accept".into(), "application/json".into())));
    }

    #[test]
    fn error_message_prefers_structured_fields() {
        assert_eq!(
            extract_error_message(br#"{"error":{"message":"quota exceeded"}}"#),
            "quota exceeded"
        );
        assert_eq!(extract_error_message(br#"{"detail":"nope"}"#), "nope");
        assert_eq!(extract_error_message(b"plain failure"), "plain failure");
    }

    #[test]
    fn unanchored_client_rejects_relative_paths() {
        let client = HttpClient::unanchored(ClientOptions::default()).unwrap();
        assert!(matches!(client.resolve("v1/items", true), Err(HttpError::Url(_))));
        assert!(client.resolve("https://example.org/a", false).is_ok());
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let client = HttpClient::new("https://api.example.com")
            .unwrap()
            .with_backoff(Duration::from_millis(100));
        assert_eq!(client.backoff(1), Duration::from_millis(100));
        assert_eq!(client.backoff(3), Duration::from_millis(400));
    }

    #[test]
    fn snippets_truncate_on_char_boundaries() {
        let body = "é".repeat(400);
        let snip = snip_body(body.as_bytes());
        assert!(snip.ends_with("..."));
        assert!(snip.len() <= SNIPPET_MAX + 3);
    }
}
