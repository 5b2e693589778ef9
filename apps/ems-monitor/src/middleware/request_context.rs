use axum::{
    body::Body,
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use ems_telemetry::{RequestIds, new_request_ids};
use tracing::{Instrument, info_span};

const REQUEST_ID_HEADER: &str = "x-request-id";
const TRACE_ID_HEADER: &str = "x-trace-id";

/// 为每个请求建立 request span，并回写 x-request-id / x-trace-id。
///
/// 调用方已带 x-request-id 时沿用，trace_id 总是新生成。
pub async fn request_context(mut req: Request<Body>, next: Next) -> Response {
    let ids = inbound_ids(req.headers());
    req.extensions_mut().insert(ids.clone());

    let span = info_span!(
        "request",
        request_id = %ids.request_id,
        trace_id = %ids.trace_id,
        method = %req.method(),
        path = %req.uri().path()
    );

    let mut response = next.run(req).instrument(span).await;
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&ids.request_id) {
        headers.insert(REQUEST_ID_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&ids.trace_id) {
        headers.insert(TRACE_ID_HEADER, value);
    }
    response
}

fn inbound_ids(headers: &HeaderMap) -> RequestIds {
    let mut ids = new_request_ids();
    if let Some(request_id) = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty() && value.len() <= 128)
    {
        ids.request_id = request_id.to_string();
    }
    ids
}
