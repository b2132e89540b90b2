use axum::{
    extract::{FromRequestParts, Request},
    http::{header::HeaderName, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;
use tracing::Instrument;
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "x-request-id";
const CORRELATION_ID_HEADER: &str = "x-correlation-id";
const MAX_REQUEST_ID_LEN: usize = 128;

/// Identifier tying log lines and audit entries to one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    /// Reuses a caller-supplied id when it is short printable ASCII,
    /// otherwise mints a new one.
    fn from_headers(headers: &HeaderMap) -> Self {
        let supplied = headers
            .get(REQUEST_ID_HEADER)
            .or_else(|| headers.get(CORRELATION_ID_HEADER))
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| is_acceptable(v))
            .map(str::to_string);
        RequestId(supplied.unwrap_or_else(|| Uuid::new_v4().to_string()))
    }
}

fn is_acceptable(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_REQUEST_ID_LEN
        && value.bytes().all(|b| b.is_ascii_graphic())
}

pub async fn request_id(mut req: Request, next: Next) -> Response {
    let request_id = RequestId::from_headers(req.headers());
    req.extensions_mut().insert(request_id.clone());

    let span = tracing::debug_span!("request", request_id = %request_id.0);
    let mut response = next.run(req).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&request_id.0) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestId>()
            .cloned()
            .unwrap_or_else(|| RequestId::from_headers(&parts.headers)))
    }
}
