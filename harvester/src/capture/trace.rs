//! Network trace extraction
//!
//! Recovers the authoritative order payload from the performance log of an
//! already-loaded order detail page. The page itself fetches the order from
//! the order-management API; we read that response back out of the trace
//! instead of re-requesting it with separate credentials.

use portal_client::{BrowserSession, ClientError, protocol};
use thiserror::Error;

/// Trace extraction errors
#[derive(Debug, Error)]
pub enum ExtractError {
    /// No response matching the order URL appeared in the log. Skippable:
    /// the caller must not treat this as fatal for the whole run.
    #[error("no order payload response in trace for {order_number}")]
    NotFound { order_number: String },

    /// The matching response carried a malformed JSON body
    #[error("malformed order payload: {0}")]
    Parse(#[from] serde_json::Error),

    /// Driver-side failure while reading the log or fetching a body
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Recover the order payload for `order_number` from the current page's
/// network trace.
///
/// The first response whose URL matches `{api_base}/orders/{order_number}`
/// is authoritative; later matches (retries) are ignored rather than merged.
/// Entries lacking a URL are skipped.
pub async fn extract_order_payload<S: BrowserSession + ?Sized>(
    session: &S,
    api_base: &str,
    order_number: &str,
) -> Result<String, ExtractError> {
    let needle = format!(
        "{}/orders/{}",
        api_base.trim_end_matches('/'),
        order_number
    );

    let entries = session.performance_log().await?;
    tracing::debug!(order_number, entries = entries.len(), "scanning network trace");

    for entry in &entries {
        let Some(response) = protocol::parse_entry(entry) else {
            continue;
        };
        let Some(url) = response.url else {
            continue;
        };
        if !url.contains(&needle) {
            continue;
        }

        // Bodies are not inline in the log; fetch out-of-band by request id
        let body = session.response_body(&response.request_id).await?;
        serde_json::from_str::<serde_json::Value>(&body)?;
        return Ok(body);
    }

    Err(ExtractError::NotFound {
        order_number: order_number.to_string(),
    })
}
