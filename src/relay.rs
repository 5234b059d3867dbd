//! # CORS Relay
//!
//! A stateless HTTP forwarder that lets the browser player read archive
//! audio from an origin that sends no CORS headers. The effects graph needs
//! CORS-clean media, otherwise the analyser only ever sees silence.
//!
//! | Request | Result |
//! |---------|--------|
//! | `GET /relay?url=<target>` | Upstream status and body, with `Range` forwarded |
//! | no / unparseable `url` | `400 Bad Request` |
//! | `url` outside the allowed prefix | `403 Forbidden` |
//! | upstream unreachable | `502 Bad Gateway` |
//!
//! Every response carries `Access-Control-Allow-Origin: *`.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header::{
    ACCEPT_RANGES, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, RANGE,
};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use log::{debug, info, warn};
use serde::Deserialize;
use tower_http::set_header::SetResponseHeaderLayer;
use url::Url;

pub const DEFAULT_BIND: &str = "127.0.0.1:8787";
pub const DEFAULT_ALLOWED_PREFIX: &str = "https://vault.petsq.net/";
pub const MAX_REDIRECTS: usize = 5;
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

pub const BIND_ENV: &str = "OFFBEAT_RELAY_BIND";
pub const ALLOWED_PREFIX_ENV: &str = "OFFBEAT_RELAY_ALLOWED_PREFIX";

/// Upstream headers passed back to the client. Everything else is dropped.
const FORWARDED_HEADERS: [axum::http::HeaderName; 4] =
    [CONTENT_TYPE, CONTENT_LENGTH, CONTENT_RANGE, ACCEPT_RANGES];

#[derive(Debug)]
pub enum RelayError {
    MissingUrl,
    InvalidUrl(String),
    Forbidden(String),
    Upstream(reqwest::Error),
    Response(axum::http::Error),
    Config(String),
    Io(std::io::Error),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::MissingUrl => write!(f, "Invalid URL provided"),
            RelayError::InvalidUrl(url) => write!(f, "Invalid URL provided: {url}"),
            RelayError::Forbidden(url) => write!(f, "URL not allowed: {url}"),
            RelayError::Upstream(e) => write!(f, "Error fetching content: {e}"),
            RelayError::Response(e) => write!(f, "Could not build response: {e}"),
            RelayError::Config(msg) => write!(f, "Relay configuration error: {msg}"),
            RelayError::Io(e) => write!(f, "Relay I/O error: {e}"),
        }
    }
}

impl std::error::Error for RelayError {}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        RelayError::Upstream(e)
    }
}

impl From<std::io::Error> for RelayError {
    fn from(e: std::io::Error) -> Self {
        RelayError::Io(e)
    }
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingUrl | RelayError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            RelayError::Forbidden(_) => StatusCode::FORBIDDEN,
            RelayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            RelayError::Response(_) | RelayError::Config(_) | RelayError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("Relay request failed: {self}");
        } else {
            debug!("Relay request rejected: {self}");
        }
        (status, self.to_string()).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub bind: SocketAddr,
    /// Targets must start with this exact string.
    pub allowed_prefix: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            bind: SocketAddr::from(([127, 0, 0, 1], 8787)),
            allowed_prefix: DEFAULT_ALLOWED_PREFIX.to_string(),
        }
    }
}

impl RelayConfig {
    /// Read `OFFBEAT_RELAY_BIND` and `OFFBEAT_RELAY_ALLOWED_PREFIX`, keeping
    /// defaults for whatever is unset.
    pub fn from_env() -> Result<Self, RelayError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RelayError> {
        let mut config = RelayConfig::default();
        if let Some(bind) = lookup(BIND_ENV) {
            config.bind = bind
                .parse()
                .map_err(|e| RelayError::Config(format!("{BIND_ENV}='{bind}': {e}")))?;
        }
        if let Some(prefix) = lookup(ALLOWED_PREFIX_ENV) {
            if Url::parse(&prefix).is_err() {
                return Err(RelayError::Config(format!(
                    "{ALLOWED_PREFIX_ENV}='{prefix}' is not an absolute URL"
                )));
            }
            config.allowed_prefix = prefix;
        }
        Ok(config)
    }
}

/// Check a requested target: present, an absolute http(s) URL with a host,
/// and under the allowed prefix.
pub fn validate_target(raw: Option<&str>, allowed_prefix: &str) -> Result<Url, RelayError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or(RelayError::MissingUrl)?;
    let url = Url::parse(raw).map_err(|_| RelayError::InvalidUrl(raw.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(RelayError::InvalidUrl(raw.to_string()));
    }
    if !raw.starts_with(allowed_prefix) {
        return Err(RelayError::Forbidden(raw.to_string()));
    }
    Ok(url)
}

#[derive(Clone)]
pub struct RelayState {
    client: reqwest::Client,
    allowed_prefix: String,
}

impl RelayState {
    pub fn new(allowed_prefix: impl Into<String>) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(RelayState {
            client,
            allowed_prefix: allowed_prefix.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RelayQuery {
    url: Option<String>,
}

async fn handle_relay(
    State(state): State<RelayState>,
    Query(query): Query<RelayQuery>,
    headers: HeaderMap,
) -> Result<Response, RelayError> {
    let target = validate_target(query.url.as_deref(), &state.allowed_prefix)?;

    let mut request = state.client.get(target.clone());
    if let Some(range) = headers.get(RANGE) {
        request = request.header(RANGE, range.clone());
    }
    let upstream = request.send().await?;
    let status = upstream.status();
    debug!("Relayed {target} -> {status}");

    let mut response = Response::builder().status(status);
    for name in FORWARDED_HEADERS {
        if let Some(value) = upstream.headers().get(&name) {
            response = response.header(name, value.clone());
        }
    }
    response
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(RelayError::Response)
}

/// The relay's routes, with CORS headers on every response.
pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/relay", get(handle_relay))
        .with_state(state)
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Range"),
        ))
}

/// Bind and serve until the process stops.
pub async fn serve(config: RelayConfig) -> Result<(), RelayError> {
    let state = RelayState::new(config.allowed_prefix.clone())?;
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!(
        "Relay listening on http://{} (allowing {})",
        listener.local_addr()?,
        config.allowed_prefix
    );
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::Redirect;

    const FILE: &[u8] = b"0123456789";

    async fn upstream_file(headers: HeaderMap) -> Response {
        let partial = headers.get(RANGE).and_then(|v| v.to_str().ok()) == Some("bytes=2-5");
        let builder = Response::builder()
            .header(CONTENT_TYPE, "audio/mpeg")
            .header(ACCEPT_RANGES, "bytes")
            .header("x-upstream-secret", "1");
        if partial {
            builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(CONTENT_RANGE, "bytes 2-5/10")
                .body(Body::from(FILE[2..6].to_vec()))
                .unwrap()
        } else {
            builder.status(StatusCode::OK).body(Body::from(FILE.to_vec())).unwrap()
        }
    }

    async fn spawn(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    /// An upstream serving `/file.mp3` (and `/moved` redirecting to it) plus
    /// a relay that allows only that upstream.
    async fn setup() -> (SocketAddr, SocketAddr) {
        let upstream = spawn(
            Router::new()
                .route("/file.mp3", get(upstream_file))
                .route("/moved", get(|| async { Redirect::temporary("/file.mp3") })),
        )
        .await;
        let state = RelayState::new(format!("http://{upstream}/")).unwrap();
        let relay = spawn(router(state)).await;
        (upstream, relay)
    }

    fn relay_url(relay: SocketAddr, target: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
        format!("http://{relay}/relay?url={encoded}")
    }

    #[test]
    fn target_validation() {
        let prefix = "https://vault.petsq.net/";
        assert!(matches!(validate_target(None, prefix), Err(RelayError::MissingUrl)));
        assert!(matches!(validate_target(Some("  "), prefix), Err(RelayError::MissingUrl)));
        assert!(matches!(
            validate_target(Some("not a url"), prefix),
            Err(RelayError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_target(Some("ftp://vault.petsq.net/a.mp3"), prefix),
            Err(RelayError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_target(Some("https://vault.petsq.net.evil.test/a.mp3"), prefix),
            Err(RelayError::Forbidden(_))
        ));
        assert!(matches!(
            validate_target(Some("http://vault.petsq.net/a.mp3"), prefix),
            Err(RelayError::Forbidden(_))
        ));
        let ok = validate_target(Some("https://vault.petsq.net/20251022_OFFBEAT_23.mp3"), prefix).unwrap();
        assert_eq!(ok.path(), "/20251022_OFFBEAT_23.mp3");
    }

    #[test]
    fn config_from_lookup() {
        let config = RelayConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, RelayConfig::default());
        assert_eq!(config.bind.to_string(), DEFAULT_BIND);

        let config = RelayConfig::from_lookup(|key| match key {
            BIND_ENV => Some("0.0.0.0:9000".into()),
            ALLOWED_PREFIX_ENV => Some("https://cdn.example.org/audio/".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.allowed_prefix, "https://cdn.example.org/audio/");

        assert!(RelayConfig::from_lookup(|key| (key == BIND_ENV).then(|| "nowhere".into())).is_err());
    }

    #[tokio::test]
    async fn forwards_range_and_whitelisted_headers() {
        let (upstream, relay) = setup().await;
        let resp = reqwest::Client::new()
            .get(relay_url(relay, &format!("http://{upstream}/file.mp3")))
            .header(RANGE, "bytes=2-5")
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        let headers = resp.headers().clone();
        assert_eq!(headers[CONTENT_RANGE], "bytes 2-5/10");
        assert_eq!(headers[CONTENT_TYPE], "audio/mpeg");
        assert_eq!(headers[ACCEPT_RANGES], "bytes");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_HEADERS], "Range");
        assert!(headers.get("x-upstream-secret").is_none(), "non-whitelisted header leaked");
        assert_eq!(resp.bytes().await.unwrap().as_ref(), b"2345");
    }

    #[tokio::test]
    async fn follows_redirects() {
        let (upstream, relay) = setup().await;
        let resp = reqwest::get(relay_url(relay, &format!("http://{upstream}/moved")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.bytes().await.unwrap().as_ref(), FILE);
    }

    #[tokio::test]
    async fn rejects_bad_requests() {
        let (_, relay) = setup().await;

        let missing = reqwest::get(format!("http://{relay}/relay")).await.unwrap();
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(missing.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let foreign = reqwest::get(relay_url(relay, "https://example.org/file.mp3"))
            .await
            .unwrap();
        assert_eq!(foreign.status(), StatusCode::FORBIDDEN);
        assert!(foreign.text().await.unwrap().starts_with("URL not allowed"));
    }

    #[tokio::test]
    async fn unreachable_upstream_is_bad_gateway() {
        // Grab a free port, then close it
        let closed = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let state = RelayState::new(format!("http://{closed}/")).unwrap();
        let relay = spawn(router(state)).await;
        let resp = reqwest::get(relay_url(relay, &format!("http://{closed}/file.mp3")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }
}
