//! Network-protocol log entry model
//!
//! The browser's performance log is a sequence of entries whose `message`
//! field is a JSON-encoded devtools protocol message. Only completed-response
//! messages carry the request id needed to fetch a body out-of-band; the rest
//! are noise for our purposes.

use serde::{Deserialize, Serialize};

/// Method name of a completed network response message
const RESPONSE_RECEIVED: &str = "Network.responseReceived";

/// One raw performance-log entry as returned by the driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// JSON-encoded protocol message
    pub message: String,
    #[serde(default)]
    pub timestamp: i64,
}

impl LogEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: 0,
        }
    }
}

/// A completed network response observed in the log.
///
/// `url` stays optional: entries lacking one are skipped by callers rather
/// than treated as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkResponse {
    pub request_id: String,
    pub url: Option<String>,
}

// Wire shape: {"message": {"method": "...", "params": {"requestId": "...",
// "response": {"url": "..."}}}}
#[derive(Deserialize)]
struct Envelope {
    message: ProtocolMessage,
}

#[derive(Deserialize)]
struct ProtocolMessage {
    method: String,
    #[serde(default)]
    params: Params,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Params {
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    response: Option<ResponseInfo>,
}

#[derive(Deserialize)]
struct ResponseInfo {
    #[serde(default)]
    url: Option<String>,
}

/// Parse one log entry into a completed network response.
///
/// Returns `None` for entries that are not valid protocol JSON, are not
/// completed responses, or carry no request id.
pub fn parse_entry(entry: &LogEntry) -> Option<NetworkResponse> {
    let envelope: Envelope = serde_json::from_str(&entry.message).ok()?;
    if envelope.message.method != RESPONSE_RECEIVED {
        return None;
    }
    let request_id = envelope.message.params.request_id?;
    let url = envelope.message.params.response.and_then(|r| r.url);
    Some(NetworkResponse { request_id, url })
}

/// Build a response-received log entry (test fixtures).
pub fn response_entry(request_id: &str, url: Option<&str>) -> LogEntry {
    let response = match url {
        Some(u) => serde_json::json!({ "url": u }),
        None => serde_json::json!({}),
    };
    LogEntry::new(
        serde_json::json!({
            "message": {
                "method": RESPONSE_RECEIVED,
                "params": { "requestId": request_id, "response": response }
            }
        })
        .to_string(),
    )
}
