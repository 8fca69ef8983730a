//! Response normalization: raw transport responses to tagged outcomes.

use crate::client::outcome::{RawResponse, RequestOutcome, ResponseBody};
use crate::errors::FailureKind;

/// Maximum characters of a response body quoted in failure messages.
const EXCERPT_LEN: usize = 200;

/// Converts a raw response into a tagged outcome.
///
/// Pure and idempotent: the same `RawResponse` always yields the same
/// outcome, with `attempts` fixed at 1 (the retry policy overwrites it).
///
/// - 2xx: `Success`, JSON-decoded when `expect_json` is set; a decode
///   failure yields `Failure(Decode)`.
/// - 4xx (and 1xx/3xx, which only appear with redirect following
///   disabled): `Failure(Client)` — never retried.
/// - 5xx: `Failure(Server)` — eligible for retry.
#[must_use]
pub fn normalize(raw: &RawResponse, expect_json: bool) -> RequestOutcome {
    match raw.status_code {
        200..=299 => {
            if expect_json {
                match serde_json::from_slice::<serde_json::Value>(&raw.body) {
                    Ok(value) => {
                        RequestOutcome::success(raw.status_code, ResponseBody::Json(value))
                    }
                    Err(e) => RequestOutcome::failure(
                        FailureKind::Decode,
                        format!("invalid JSON in HTTP {} response: {e}", raw.status_code),
                    ),
                }
            } else {
                RequestOutcome::success(raw.status_code, ResponseBody::Bytes(raw.body.clone()))
            }
        }
        500.. => RequestOutcome::http_failure(
            FailureKind::Server,
            raw.status_code,
            format!("HTTP {}: {}", raw.status_code, raw.body_excerpt(EXCERPT_LEN)),
        ),
        _ => RequestOutcome::http_failure(
            FailureKind::Client,
            raw.status_code,
            format!("HTTP {}: {}", raw.status_code, raw.body_excerpt(EXCERPT_LEN)),
        ),
    }
}
