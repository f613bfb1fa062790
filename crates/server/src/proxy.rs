//! Interception endpoint.
//!
//! Every request from the host page lands on the fallback route, is
//! rewritten against the configured page origin, and is answered through
//! the gateway. The response carries an `x-cache-status` header so the
//! host can tell a live answer from a degraded one.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use url::Url;

use presta_client::{FetchRequest, Gateway, GatewayResponse};
use presta_core::{AppConfig, Error};

/// Response headers owned by the transfer, not the payload.
const HOP_HEADERS: &[&str] = &["connection", "content-length", "content-encoding", "transfer-encoding"];

const CACHE_STATUS: &str = "x-cache-status";

struct AppState {
    gateway: Gateway,
    origin: Url,
    max_bytes: usize,
}

/// Build the proxy router around a gateway.
pub fn router(gateway: Gateway, config: &AppConfig) -> Result<Router, Error> {
    let origin = Url::parse(&config.page_origin)
        .map_err(|e| Error::InvalidUrl(format!("{}: {}", config.page_origin, e)))?;
    let state = Arc::new(AppState { gateway, origin, max_bytes: config.max_bytes });
    Ok(Router::new().fallback(proxy).with_state(state))
}

async fn proxy(State(state): State<Arc<AppState>>, request: Request) -> Response {
    match serve(&state, request).await {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(error = %err, "gateway request failed");
            (StatusCode::BAD_GATEWAY, err.to_string()).into_response()
        }
    }
}

async fn serve(state: &AppState, request: Request) -> Result<Response, Error> {
    let (parts, body) = request.into_parts();

    let url = upstream_url(&state.origin, &parts.uri)?;
    let headers = parts
        .headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect();
    let bytes = axum::body::to_bytes(body, state.max_bytes)
        .await
        .map_err(|e| Error::InvalidInput(format!("failed to read request body: {e}")))?;

    let fetch_request = FetchRequest {
        method: parts.method.as_str().to_string(),
        url,
        headers,
        body: if bytes.is_empty() { None } else { Some(bytes) },
    };

    let response = state.gateway.handle(&fetch_request).await?;
    Ok(into_http_response(response))
}

/// Rewrite an incoming request URI against the page origin.
fn upstream_url(origin: &Url, uri: &Uri) -> Result<Url, Error> {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    origin
        .join(path_and_query)
        .map_err(|e| Error::InvalidUrl(format!("{path_and_query}: {e}")))
}

/// Convert a gateway response into an HTTP response.
///
/// Hop-by-hop headers are dropped; the body is re-framed by the server.
fn into_http_response(response: GatewayResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut builder = Response::builder().status(status);

    for (name, value) in &response.headers {
        if HOP_HEADERS.iter().any(|hop| name.eq_ignore_ascii_case(hop)) {
            continue;
        }
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) else {
            continue;
        };
        builder = builder.header(name, value);
    }
    builder = builder.header(
        HeaderName::from_static(CACHE_STATUS),
        HeaderValue::from_static(response.source.as_str()),
    );

    builder
        .body(Body::from(response.body))
        .unwrap_or_else(|_| StatusCode::BAD_GATEWAY.into_response())
}
