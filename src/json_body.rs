//! Global JSON body parsing.
//!
//! Requests declaring `application/json` are buffered and parsed before they
//! reach a handler. Only an object or array is accepted at the top level.
//! The parsed document is available as a [`JsonBody`] extension and the
//! original bytes are passed on untouched.

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use serde_json::Value;

pub const JSON_BODY_LIMIT: usize = 100 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct JsonBody(pub Value);

pub async fn parse_json_body(request: Request, next: Next) -> Response {
    if !is_json(request.headers()) {
        return next.run(request).await;
    }

    let (mut parts, body) = request.into_parts();
    let bytes = match to_bytes(body, JSON_BODY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(err) if exceeded_limit(&err) => {
            return (StatusCode::PAYLOAD_TOO_LARGE, "request entity too large").into_response()
        }
        Err(err) => {
            tracing::debug!("failed to read request body: {err}");
            return (StatusCode::BAD_REQUEST, "failed to read request body").into_response();
        }
    };

    if !bytes.is_empty() {
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value @ (Value::Object(_) | Value::Array(_))) => {
                parts.extensions.insert(JsonBody(value));
            }
            Ok(_) => {
                tracing::debug!("rejected JSON body with a primitive at the top level");
                return (
                    StatusCode::BAD_REQUEST,
                    "invalid JSON body: expected an object or array",
                )
                    .into_response();
            }
            Err(err) => {
                tracing::debug!("rejected malformed JSON body: {err}");
                return (StatusCode::BAD_REQUEST, format!("invalid JSON body: {err}"))
                    .into_response();
            }
        }
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

fn is_json(headers: &HeaderMap) -> bool {
    let Some(value) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let essence = value.split(';').next().unwrap_or_default().trim();
    essence.eq_ignore_ascii_case("application/json")
}

fn exceeded_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{HeaderValue, Request},
        routing::post,
        Extension, Router,
    };
    use tower::ServiceExt;

    fn headers(content_type: &'static str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        map
    }

    #[test]
    fn json_content_types() {
        assert!(is_json(&headers("application/json")));
        assert!(is_json(&headers("Application/JSON; charset=utf-8")));
        assert!(!is_json(&headers("application/merge-patch+json")));
        assert!(!is_json(&headers("text/plain")));
        assert!(!is_json(&HeaderMap::new()));
    }

    #[tokio::test]
    async fn parsed_body_is_exposed_to_handlers() {
        let app = Router::new()
            .route(
                "/",
                post(|Extension(JsonBody(value)): Extension<JsonBody>| async move {
                    value["n"].to_string()
                }),
            )
            .layer(axum::middleware::from_fn(parse_json_body));

        let resp = app
            .oneshot(
                Request::post("/")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"n": 7}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"7");
    }

    fn echo_app() -> Router {
        Router::new()
            .route("/", post(|| async { "served" }))
            .layer(axum::middleware::from_fn(parse_json_body))
    }

    async fn post_json(content_type: &'static str, body: &'static str) -> StatusCode {
        echo_app()
            .oneshot(
                Request::post("/")
                    .header(CONTENT_TYPE, content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn top_level_primitive_is_rejected() {
        assert_eq!(post_json("application/json", "5").await, StatusCode::BAD_REQUEST);
        assert_eq!(post_json("application/json", "\"text\"").await, StatusCode::BAD_REQUEST);
        assert_eq!(post_json("application/json", "null").await, StatusCode::BAD_REQUEST);
        assert_eq!(post_json("application/json", "[1, 2]").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn other_json_flavours_are_not_parsed() {
        assert_eq!(
            post_json("application/merge-patch+json", "{bad").await,
            StatusCode::OK
        );
    }
}
