//! `GET /sleep?seconds=N`

use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::{client_addr::ClientAddr, server::AppState};

pub const MIN_SECONDS: i64 = 1;
pub const MAX_SECONDS: i64 = 300;

pub const INVALID_INPUT_MESSAGE: &str =
    "Invalid input. \"seconds\" must be a number between 1 and 300.";

/// A validated delay, always within `MIN_SECONDS..=MAX_SECONDS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepRequest {
    seconds: u64,
}

impl SleepRequest {
    pub fn from_raw(raw: Option<&str>) -> Result<Self, SleepError> {
        match raw.and_then(parse_seconds) {
            Some(seconds) if (MIN_SECONDS..=MAX_SECONDS).contains(&seconds) => Ok(SleepRequest {
                seconds: seconds as u64,
            }),
            _ => Err(SleepError::InvalidSeconds {
                raw: raw.map(str::to_owned),
            }),
        }
    }

    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.seconds * 1000)
    }
}

/// Lenient integer coercion: the longest numeric prefix wins.
///
/// Leading whitespace and one sign are accepted, `0x` switches to hex, and
/// anything after the digits is ignored (`"10abc"` is 10). No digits at all
/// yields `None`. Overlong numbers saturate.
pub fn parse_seconds(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let (radix, digits) = match s.get(..2) {
        Some("0x") | Some("0X") => (16, &s[2..]),
        _ => (10, s),
    };

    let mut value: Option<i64> = None;
    for c in digits.chars() {
        let Some(digit) = c.to_digit(radix) else {
            break;
        };
        let acc = value.unwrap_or(0);
        value = Some(acc.saturating_mul(radix as i64).saturating_add(digit as i64));
    }
    value.map(|v| if negative { -v } else { v })
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SleepResponse {
    pub status: &'static str,
    pub message: String,
}

impl SleepResponse {
    pub fn success(seconds: u64) -> Self {
        SleepResponse {
            status: "success",
            message: format!("Paused for {seconds} second(s)"),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        SleepResponse {
            status: "error",
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SleepError {
    #[error("❗ Invalid sleep request: \"{}\"", raw_or_undefined(.raw))]
    InvalidSeconds { raw: Option<String> },
}

fn raw_or_undefined(raw: &Option<String>) -> &str {
    raw.as_deref().unwrap_or("undefined")
}

impl IntoResponse for SleepError {
    fn into_response(self) -> Response {
        match self {
            SleepError::InvalidSeconds { .. } => (
                StatusCode::BAD_REQUEST,
                Json(SleepResponse::error(INVALID_INPUT_MESSAGE)),
            )
                .into_response(),
        }
    }
}

/// Repeated keys are joined with `,` the way a list coerces to a string.
fn query_value(params: &[(String, String)], key: &str) -> Option<String> {
    let values: Vec<&str> = params
        .iter()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .collect();
    (!values.is_empty()).then(|| values.join(","))
}

pub async fn sleep(
    State(state): State<AppState>,
    client: ClientAddr,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<SleepResponse>, SleepError> {
    let raw = query_value(&params, "seconds");

    let request = match SleepRequest::from_raw(raw.as_deref()) {
        Ok(request) => request,
        Err(err) => {
            state.log.record(err.to_string());
            return Err(err);
        }
    };

    state.log.record(format!(
        "Sleep requested: {}s from {client}",
        request.seconds()
    ));
    tracing::debug!(seconds = request.seconds(), %client, "sleeping");

    tokio::time::sleep(request.duration()).await;

    Ok(Json(SleepResponse::success(request.seconds())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_prefix() {
        assert_eq!(parse_seconds("10abc"), Some(10));
        assert_eq!(parse_seconds("  42"), Some(42));
        assert_eq!(parse_seconds("+7"), Some(7));
        assert_eq!(parse_seconds("-5"), Some(-5));
        assert_eq!(parse_seconds("3.9"), Some(3));
        assert_eq!(parse_seconds("1e3"), Some(1));
        assert_eq!(parse_seconds("0x1A"), Some(26));
    }

    #[test]
    fn not_a_number() {
        assert_eq!(parse_seconds("abc"), None);
        assert_eq!(parse_seconds(""), None);
        assert_eq!(parse_seconds("-"), None);
        assert_eq!(parse_seconds("0x"), None);
        assert_eq!(parse_seconds(" x1"), None);
    }

    #[test]
    fn overlong_saturates() {
        assert_eq!(parse_seconds("99999999999999999999999"), Some(i64::MAX));
        assert!(SleepRequest::from_raw(Some("99999999999999999999999")).is_err());
    }

    #[test]
    fn bounds_are_inclusive() {
        assert_eq!(SleepRequest::from_raw(Some("1")).unwrap().seconds(), 1);
        assert_eq!(SleepRequest::from_raw(Some("300")).unwrap().seconds(), 300);
        assert!(SleepRequest::from_raw(Some("0")).is_err());
        assert!(SleepRequest::from_raw(Some("301")).is_err());
        assert!(SleepRequest::from_raw(Some("-5")).is_err());
        assert!(SleepRequest::from_raw(None).is_err());
    }

    #[test]
    fn duration_is_whole_seconds() {
        let request = SleepRequest::from_raw(Some("10abc")).unwrap();
        assert_eq!(request.duration(), Duration::from_millis(10_000));
    }

    #[test]
    fn invalid_log_line_keeps_raw_value() {
        let err = SleepRequest::from_raw(Some("abc")).unwrap_err();
        assert_eq!(err.to_string(), "❗ Invalid sleep request: \"abc\"");

        let err = SleepRequest::from_raw(None).unwrap_err();
        assert_eq!(err.to_string(), "❗ Invalid sleep request: \"undefined\"");
    }

    #[test]
    fn repeated_keys_are_joined() {
        let params = vec![
            ("seconds".to_string(), "2".to_string()),
            ("other".to_string(), "x".to_string()),
            ("seconds".to_string(), "9".to_string()),
        ];
        assert_eq!(query_value(&params, "seconds").as_deref(), Some("2,9"));
        assert_eq!(query_value(&params, "missing"), None);
    }

    #[test]
    fn success_body() {
        let body = serde_json::to_value(SleepResponse::success(5)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"status": "success", "message": "Paused for 5 second(s)"})
        );
    }
}
