//! The client side of `/api/websites/{eventCode}`: when to fetch, how to read the response, and
//! which responses are still worth applying.

use serde_json::Value;
use thiserror::Error;

use crate::model::SubmissionRecord;

pub const SIGN_IN_PATH: &str = "/signin";

/// Where the admin session stands from the page's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Loading,
    Authenticated,
    Unauthenticated,
}

impl SessionStatus {
    /// Maps the result of the admin session check. A check that has not resolved yet is
    /// `Loading`; a failed check counts as unauthenticated.
    pub fn from_check<E>(check: Option<&Result<bool, E>>) -> Self {
        match check {
            None => SessionStatus::Loading,
            Some(Ok(true)) => SessionStatus::Authenticated,
            Some(Ok(false)) | Some(Err(_)) => SessionStatus::Unauthenticated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Render nothing and do not fetch yet.
    Wait,
    /// Send the user to the sign-in page.
    Redirect,
    /// Fetch the records for this event code.
    Fetch(String),
}

/// Decides what the event page does for a given session state and route parameter. Fetching
/// never starts before the session has resolved.
pub fn gate(session: SessionStatus, event_code: Option<&str>) -> GateDecision {
    match session {
        SessionStatus::Loading => GateDecision::Wait,
        SessionStatus::Unauthenticated => GateDecision::Redirect,
        SessionStatus::Authenticated => match event_code {
            Some(code) if !code.is_empty() => GateDecision::Fetch(code.to_string()),
            _ => GateDecision::Wait,
        },
    }
}

pub fn websites_url(event_code: &str) -> String {
    format!("/api/websites/{}", urlencoding::encode(event_code))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("{}", network_message(.0))]
    Network(String),
    #[error("{0}")]
    MalformedBody(String),
    #[error("{}", status_message(.status, .message))]
    Status { status: u16, message: Option<String> },
    #[error("Failed to load data")]
    Unavailable,
}

fn network_message(message: &str) -> String {
    if message.is_empty() {
        "Failed to load data".to_string()
    } else {
        message.to_string()
    }
}

fn status_message(status: &u16, message: &Option<String>) -> String {
    match message {
        Some(m) => m.clone(),
        None => format!("Request failed: {}", status),
    }
}

/// A successful `/api/websites` body.
#[derive(Debug, Clone, PartialEq)]
pub struct WebsitesPayload {
    pub records: Vec<SubmissionRecord>,
    /// The body's `raw` field, or the whole body when there is none.
    pub raw: Value,
}

/// Interprets an HTTP status and body from `/api/websites`. The body must be JSON whatever the
/// status; a missing or non-array `records` field reads as no records.
pub fn parse_websites_response(status: u16, body: &str) -> Result<WebsitesPayload, FetchError> {
    let json: Value =
        serde_json::from_str(body).map_err(|e| FetchError::MalformedBody(e.to_string()))?;

    if !(200..300).contains(&status) {
        let message = json
            .get("error")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_string);
        return Err(FetchError::Status { status, message });
    }

    let records = match json.get("records") {
        Some(records @ Value::Array(_)) => serde_json::from_value(records.clone())
            .map_err(|e| FetchError::MalformedBody(e.to_string()))?,
        _ => Vec::new(),
    };
    let raw = match json.get("raw") {
        Some(raw) if !raw.is_null() => raw.clone(),
        _ => json,
    };

    Ok(WebsitesPayload { records, raw })
}

/// Identifies one in-flight fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    event_code: String,
}

impl FetchTicket {
    pub fn event_code(&self) -> &str {
        &self.event_code
    }
}

/// Hands out fetch tickets and remembers the latest one, so a response for an event the user
/// has already navigated away from is dropped instead of overwriting the table.
#[derive(Debug, Default)]
pub struct FetchTracker {
    generation: u64,
    active: Option<String>,
}

impl FetchTracker {
    pub fn begin(&mut self, event_code: &str) -> FetchTicket {
        self.generation += 1;
        self.active = Some(event_code.to_string());
        FetchTicket {
            generation: self.generation,
            event_code: event_code.to_string(),
        }
    }

    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.generation == self.generation
            && self.active.as_deref() == Some(ticket.event_code.as_str())
    }
}

/// Fetches the records for `event_code` from the browser.
#[cfg(feature = "hydrate")]
pub async fn fetch_event_records(event_code: &str) -> Result<WebsitesPayload, FetchError> {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    let window = web_sys::window().ok_or_else(|| FetchError::Network("no window".to_string()))?;

    let init = web_sys::RequestInit::new();
    init.set_method("GET");
    let request = web_sys::Request::new_with_str_and_init(&websites_url(event_code), &init)
        .map_err(js_error)?;
    request
        .headers()
        .set("Accept", "application/json")
        .map_err(js_error)?;

    let response = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(js_error)?;
    let response: web_sys::Response = response.dyn_into().map_err(js_error)?;
    let text = JsFuture::from(response.text().map_err(js_error)?)
        .await
        .map_err(js_error)?;

    parse_websites_response(response.status(), &text.as_string().unwrap_or_default())
}

#[cfg(feature = "hydrate")]
fn js_error(value: wasm_bindgen::JsValue) -> FetchError {
    FetchError::Network(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
}

/// Without a browser there is nothing to fetch with.
#[cfg(not(feature = "hydrate"))]
pub async fn fetch_event_records(_event_code: &str) -> Result<WebsitesPayload, FetchError> {
    Err(FetchError::Unavailable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_status_from_check() {
        assert_eq!(
            SessionStatus::from_check::<String>(None),
            SessionStatus::Loading
        );
        assert_eq!(
            SessionStatus::from_check::<String>(Some(&Ok(true))),
            SessionStatus::Authenticated
        );
        assert_eq!(
            SessionStatus::from_check::<String>(Some(&Ok(false))),
            SessionStatus::Unauthenticated
        );
        assert_eq!(
            SessionStatus::from_check(Some(&Err("Unauthorized".to_string()))),
            SessionStatus::Unauthenticated
        );
    }

    #[test]
    fn test_gate() {
        assert_eq!(gate(SessionStatus::Loading, Some("SPRING24")), GateDecision::Wait);
        assert_eq!(gate(SessionStatus::Unauthenticated, Some("SPRING24")), GateDecision::Redirect);
        assert_eq!(gate(SessionStatus::Unauthenticated, None), GateDecision::Redirect);
        assert_eq!(gate(SessionStatus::Authenticated, None), GateDecision::Wait);
        assert_eq!(gate(SessionStatus::Authenticated, Some("")), GateDecision::Wait);
        assert_eq!(
            gate(SessionStatus::Authenticated, Some("SPRING24")),
            GateDecision::Fetch("SPRING24".to_string())
        );
    }

    #[test]
    fn test_websites_url_escapes_event_code() {
        assert_eq!(websites_url("SPRING24"), "/api/websites/SPRING24");
        assert_eq!(websites_url("a b/c?d"), "/api/websites/a%20b%2Fc%3Fd");
    }

    #[test]
    fn test_parse_success() {
        let body = json!({
            "records": [
                { "name": "Ada", "email": "ada@x.com", "status": "Approved", "website": "https://ada.dev", "decisionReason": "Great" },
                { "name": "Bob", "email": "bob@x.com" }
            ],
            "raw": { "count": 2 }
        })
        .to_string();
        let payload = parse_websites_response(200, &body).expect("should parse");

        assert_eq!(payload.records.len(), 2);
        assert_eq!(payload.records[0].decision_reason.as_deref(), Some("Great"));
        assert_eq!(payload.records[0].website.as_deref(), Some("https://ada.dev"));
        assert_eq!(payload.records[1].status, None);
        assert_eq!(payload.raw, json!({ "count": 2 }));
    }

    #[test]
    fn test_parse_missing_records_defaults_to_empty() {
        let payload = parse_websites_response(200, r#"{"other": true}"#).expect("should parse");
        assert!(payload.records.is_empty());
        // Without a raw field the whole body is kept.
        assert_eq!(payload.raw, json!({ "other": true }));

        let payload =
            parse_websites_response(200, r#"{"records": "nope", "raw": null}"#).expect("should parse");
        assert!(payload.records.is_empty());
        assert_eq!(payload.raw, json!({ "records": "nope", "raw": null }));
    }

    #[test]
    fn test_parse_null_fields() {
        let body = r#"{"records": [{"name": null, "email": null, "status": null}]}"#;
        let payload = parse_websites_response(200, body).expect("should parse");
        assert_eq!(payload.records, vec![SubmissionRecord::default()]);
    }

    #[test]
    fn test_parse_server_error_message() {
        let err = parse_websites_response(500, r#"{"error":"db down"}"#).expect_err("should fail");
        assert_eq!(err.to_string(), "db down");
    }

    #[test]
    fn test_parse_error_without_message() {
        let err = parse_websites_response(404, "{}").expect_err("should fail");
        assert_eq!(
            err,
            FetchError::Status {
                status: 404,
                message: None
            }
        );
        assert_eq!(err.to_string(), "Request failed: 404");

        let err = parse_websites_response(401, r#"{"error":""}"#).expect_err("should fail");
        assert_eq!(err.to_string(), "Request failed: 401");
    }

    #[test]
    fn test_parse_malformed_body() {
        let err = parse_websites_response(200, "<html>").expect_err("should fail");
        assert!(matches!(err, FetchError::MalformedBody(_)));
        assert!(!err.to_string().is_empty());

        let err = parse_websites_response(502, "Bad Gateway").expect_err("should fail");
        assert!(matches!(err, FetchError::MalformedBody(_)));

        let err = parse_websites_response(200, r#"{"records":[42]}"#).expect_err("should fail");
        assert!(matches!(err, FetchError::MalformedBody(_)));
    }

    #[test]
    fn test_network_error_message() {
        assert_eq!(FetchError::Network(String::new()).to_string(), "Failed to load data");
        assert_eq!(
            FetchError::Network("connection refused".to_string()).to_string(),
            "connection refused"
        );
        assert_eq!(FetchError::Unavailable.to_string(), "Failed to load data");
    }

    #[test]
    fn test_fetch_tracker_discards_stale_tickets() {
        let mut tracker = FetchTracker::default();
        let first = tracker.begin("SPRING");
        assert!(tracker.is_current(&first));

        let second = tracker.begin("FALL");
        assert!(!tracker.is_current(&first));
        assert!(tracker.is_current(&second));
        assert_eq!(second.event_code(), "FALL");

        // Re-requesting the same event still invalidates the earlier request.
        let third = tracker.begin("FALL");
        assert!(!tracker.is_current(&second));
        assert!(tracker.is_current(&third));
    }
}
