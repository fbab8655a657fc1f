//! Browser session capability contract
//!
//! The capture pipeline only consumes this trait; it never talks to a real
//! browser directly. `WebDriverSession` implements it against a chromedriver
//! endpoint, `ScriptedSession` against recorded fixtures.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClientResult;
use crate::protocol::LogEntry;

/// Opaque window/tab handle
pub type WindowHandle = String;

/// Opaque element reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    pub id: String,
}

/// Element location strategy
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    XPath(String),
    Name(String),
    Id(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// WebDriver (strategy, selector) pair.
    ///
    /// Name/Id locators translate to CSS, the strategies the W3C protocol
    /// actually ships.
    pub fn strategy(&self) -> (&'static str, String) {
        match self {
            Self::Css(s) => ("css selector", s.clone()),
            Self::XPath(s) => ("xpath", s.clone()),
            Self::Name(s) => ("css selector", format!("[name='{s}']")),
            Self::Id(s) => ("css selector", format!("#{s}")),
        }
    }
}

/// One browser cookie, in WebDriver wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            secure: None,
            http_only: None,
            expiry: None,
            same_site: None,
        }
    }
}

/// Session state carried across capture runs.
///
/// An explicit value: loaded before a run, applied through the cookie
/// contract, captured again during teardown, persisted after. Never a
/// process-wide singleton.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub cookies: Vec<Cookie>,
    #[serde(default)]
    pub saved_at: i64,
}

impl SessionState {
    pub fn new(cookies: Vec<Cookie>) -> Self {
        Self {
            cookies,
            saved_at: now_millis(),
        }
    }

    /// Load persisted session state; `Ok(None)` when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> ClientResult<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    /// Persist session state to disk.
    pub fn save(&self, path: impl AsRef<Path>) -> ClientResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

// Millisecond timestamp without dragging chrono into this crate
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Browser session capability contract.
///
/// All waits are bounded; an exceeded wait surfaces `ClientError::Timeout`
/// rather than hanging.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate the current window to a URL.
    async fn navigate(&self, url: &str) -> ClientResult<()>;

    /// Handle of the current window.
    async fn current_window(&self) -> ClientResult<WindowHandle>;

    /// Open a new tab and switch to it, returning its handle.
    async fn open_new_tab(&self) -> ClientResult<WindowHandle>;

    /// Switch to a previously obtained window handle.
    async fn switch_to(&self, handle: &WindowHandle) -> ClientResult<()>;

    /// Close the current window. The session has no current window until
    /// the next `switch_to`.
    async fn close_current(&self) -> ClientResult<()>;

    /// Drain the performance log accumulated for the current page lifetime.
    async fn performance_log(&self) -> ClientResult<Vec<LogEntry>>;

    /// Fetch a response body out-of-band by request id.
    async fn response_body(&self, request_id: &str) -> ClientResult<String>;

    /// Find one element; `Ok(None)` when absent.
    async fn find(&self, locator: &Locator) -> ClientResult<Option<ElementRef>>;

    /// Find all matching elements.
    async fn find_all(&self, locator: &Locator) -> ClientResult<Vec<ElementRef>>;

    /// Wait until an element is present, within the configured bound.
    async fn wait_for(&self, locator: &Locator) -> ClientResult<ElementRef>;

    /// Click an element.
    async fn click(&self, element: &ElementRef) -> ClientResult<()>;

    /// Type text into an element.
    async fn send_keys(&self, element: &ElementRef, text: &str) -> ClientResult<()>;

    /// Read an element attribute.
    async fn attribute(&self, element: &ElementRef, name: &str) -> ClientResult<Option<String>>;

    /// All cookies of the current browsing context.
    async fn cookies(&self) -> ClientResult<Vec<Cookie>>;

    /// Add a cookie to the current browsing context.
    async fn add_cookie(&self, cookie: &Cookie) -> ClientResult<()>;

    /// Tear the session down, releasing the driver.
    async fn quit(&self) -> ClientResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session_state.json");

        let state = SessionState::new(vec![
            Cookie::new("auth", "token-1"),
            Cookie {
                domain: Some(".example.com".into()),
                http_only: Some(true),
                ..Cookie::new("tracking", "xyz")
            },
        ]);
        state.save(&path).unwrap();

        let loaded = SessionState::load(&path).unwrap().unwrap();
        assert_eq!(loaded.cookies, state.cookies);
    }

    #[test]
    fn test_session_state_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = SessionState::load(dir.path().join("absent.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_cookie_wire_shape() {
        let cookie = Cookie {
            http_only: Some(true),
            ..Cookie::new("a", "b")
        };
        let json = serde_json::to_value(&cookie).unwrap();
        assert_eq!(json["httpOnly"], serde_json::json!(true));
        assert!(json.get("domain").is_none());
    }

    #[test]
    fn test_locator_strategies() {
        assert_eq!(
            Locator::name("Email").strategy(),
            ("css selector", "[name='Email']".to_string())
        );
        assert_eq!(
            Locator::id("searchTerm").strategy(),
            ("css selector", "#searchTerm".to_string())
        );
        assert_eq!(
            Locator::xpath("//button").strategy(),
            ("xpath", "//button".to_string())
        );
    }
}
