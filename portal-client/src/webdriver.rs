//! WebDriver-backed browser session
//!
//! Typed HTTP client over the WebDriver wire protocol against a chromedriver
//! endpoint. The performance log is read through the vendor log command and
//! response bodies are fetched through the vendor CDP-execute command, so the
//! session can recover payloads the page itself received.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::SessionConfig;
use crate::error::{ClientError, ClientResult};
use crate::protocol::LogEntry;
use crate::session::{BrowserSession, Cookie, ElementRef, Locator, WindowHandle};

/// W3C element identifier key
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// WebDriver session over HTTP
#[derive(Debug, Clone)]
pub struct WebDriverSession {
    client: Client,
    driver_url: String,
    session_id: String,
    config: SessionConfig,
}

#[derive(Deserialize)]
struct WdValue<T> {
    value: T,
}

#[derive(Deserialize)]
struct WdErrorBody {
    value: WdError,
}

#[derive(Default, Deserialize)]
struct WdError {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewSession {
    session_id: String,
}

#[derive(Deserialize)]
struct NewWindow {
    handle: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CdpBody {
    body: String,
    #[serde(default)]
    base64_encoded: bool,
}

impl WebDriverSession {
    /// Start a new driver session with performance logging enabled.
    pub async fn connect(config: SessionConfig) -> ClientResult<Self> {
        let client = Client::builder()
            // The driver blocks on page loads; give it headroom over the
            // page-load timeout so the protocol error arrives, not ours.
            .timeout(Duration::from_secs(config.page_load_timeout + 30))
            .build()?;

        let mut args: Vec<String> = vec!["--disable-blink-features=AutomationControlled".into()];
        if config.headless {
            args.push("--headless=new".into());
        }

        let capabilities = serde_json::json!({
            "capabilities": {
                "alwaysMatch": {
                    "goog:loggingPrefs": { "performance": "ALL" },
                    "goog:chromeOptions": { "args": args },
                    "timeouts": { "pageLoad": config.page_load_timeout * 1000 }
                }
            }
        });

        let url = format!("{}/session", config.driver_url.trim_end_matches('/'));
        let response = client.post(&url).json(&capabilities).send().await?;
        let session: NewSession =
            Self::handle_response(response, config.page_load_timeout * 1000).await?;

        tracing::debug!(session_id = %session.session_id, "WebDriver session started");

        Ok(Self {
            client,
            driver_url: config.driver_url.trim_end_matches('/').to_string(),
            session_id: session.session_id,
            config,
        })
    }

    /// Driver-assigned session id.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Issue a session-scoped command and unwrap the `value` envelope.
    async fn cmd<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> ClientResult<T> {
        let url = format!("{}/session/{}{}", self.driver_url, self.session_id, path);
        let mut request = self.client.request(method.clone(), &url);

        // The protocol requires a JSON body on every POST
        if method == Method::POST {
            request = request.json(&body.unwrap_or_else(|| serde_json::json!({})));
        }

        let response = request.send().await?;
        Self::handle_response(response, self.config.page_load_timeout * 1000).await
    }

    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
        timeout_hint_ms: u64,
    ) -> ClientResult<T> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let error = serde_json::from_str::<WdErrorBody>(&text)
                .map(|b| b.value)
                .unwrap_or_default();
            return Err(Self::map_driver_error(status, error, timeout_hint_ms));
        }

        let envelope: WdValue<T> = serde_json::from_str(&text)
            .map_err(|e| ClientError::InvalidResponse(format!("{e}: {text}")))?;
        Ok(envelope.value)
    }

    fn map_driver_error(status: StatusCode, error: WdError, timeout_hint_ms: u64) -> ClientError {
        match error.error.as_str() {
            "timeout" | "script timeout" => ClientError::Timeout {
                what: error.message,
                waited_ms: timeout_hint_ms,
            },
            "no such element" => ClientError::NotFound(error.message),
            "" => ClientError::Session(format!("driver returned {status}")),
            _ => ClientError::Session(format!("{}: {}", error.error, error.message)),
        }
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&self, url: &str) -> ClientResult<()> {
        let _: Option<serde_json::Value> = self
            .cmd(Method::POST, "/url", Some(serde_json::json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn current_window(&self) -> ClientResult<WindowHandle> {
        self.cmd(Method::GET, "/window", None).await
    }

    async fn open_new_tab(&self) -> ClientResult<WindowHandle> {
        let window: NewWindow = self
            .cmd(
                Method::POST,
                "/window/new",
                Some(serde_json::json!({ "type": "tab" })),
            )
            .await?;
        // The protocol opens the tab in the background; make it current
        self.switch_to(&window.handle).await?;
        Ok(window.handle)
    }

    async fn switch_to(&self, handle: &WindowHandle) -> ClientResult<()> {
        let _: Option<serde_json::Value> = self
            .cmd(
                Method::POST,
                "/window",
                Some(serde_json::json!({ "handle": handle })),
            )
            .await?;
        Ok(())
    }

    async fn close_current(&self) -> ClientResult<()> {
        // Returns the remaining handles; the caller decides where to go next
        let _: Vec<WindowHandle> = self.cmd(Method::DELETE, "/window", None).await?;
        Ok(())
    }

    async fn performance_log(&self) -> ClientResult<Vec<LogEntry>> {
        self.cmd(
            Method::POST,
            "/se/log",
            Some(serde_json::json!({ "type": "performance" })),
        )
        .await
    }

    async fn response_body(&self, request_id: &str) -> ClientResult<String> {
        let body: CdpBody = self
            .cmd(
                Method::POST,
                "/goog/cdp/execute",
                Some(serde_json::json!({
                    "cmd": "Network.getResponseBody",
                    "params": { "requestId": request_id }
                })),
            )
            .await?;

        if body.base64_encoded {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(body.body.as_bytes())
                .map_err(|e| ClientError::InvalidResponse(format!("base64 body: {e}")))?;
            String::from_utf8(bytes)
                .map_err(|e| ClientError::InvalidResponse(format!("non-utf8 body: {e}")))
        } else {
            Ok(body.body)
        }
    }

    async fn find(&self, locator: &Locator) -> ClientResult<Option<ElementRef>> {
        let (using, value) = locator.strategy();
        let result: ClientResult<HashMap<String, String>> = self
            .cmd(
                Method::POST,
                "/element",
                Some(serde_json::json!({ "using": using, "value": value })),
            )
            .await;

        match result {
            Ok(element) => Ok(element
                .get(ELEMENT_KEY)
                .or_else(|| element.values().next())
                .map(|id| ElementRef { id: id.clone() })),
            Err(ClientError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn find_all(&self, locator: &Locator) -> ClientResult<Vec<ElementRef>> {
        let (using, value) = locator.strategy();
        let elements: Vec<HashMap<String, String>> = self
            .cmd(
                Method::POST,
                "/elements",
                Some(serde_json::json!({ "using": using, "value": value })),
            )
            .await?;

        Ok(elements
            .into_iter()
            .filter_map(|e| {
                e.get(ELEMENT_KEY)
                    .or_else(|| e.values().next())
                    .map(|id| ElementRef { id: id.clone() })
            })
            .collect())
    }

    async fn wait_for(&self, locator: &Locator) -> ClientResult<ElementRef> {
        let started = Instant::now();
        let deadline = Duration::from_secs(self.config.wait_timeout);

        loop {
            if let Some(element) = self.find(locator).await? {
                return Ok(element);
            }
            if started.elapsed() >= deadline {
                return Err(ClientError::Timeout {
                    what: format!("element {locator:?}"),
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
            tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
        }
    }

    async fn click(&self, element: &ElementRef) -> ClientResult<()> {
        let _: Option<serde_json::Value> = self
            .cmd(
                Method::POST,
                &format!("/element/{}/click", element.id),
                None,
            )
            .await?;
        Ok(())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> ClientResult<()> {
        let _: Option<serde_json::Value> = self
            .cmd(
                Method::POST,
                &format!("/element/{}/value", element.id),
                Some(serde_json::json!({ "text": text })),
            )
            .await?;
        Ok(())
    }

    async fn attribute(&self, element: &ElementRef, name: &str) -> ClientResult<Option<String>> {
        self.cmd(
            Method::GET,
            &format!("/element/{}/attribute/{name}", element.id),
            None,
        )
        .await
    }

    async fn cookies(&self) -> ClientResult<Vec<Cookie>> {
        self.cmd(Method::GET, "/cookie", None).await
    }

    async fn add_cookie(&self, cookie: &Cookie) -> ClientResult<()> {
        let _: Option<serde_json::Value> = self
            .cmd(
                Method::POST,
                "/cookie",
                Some(serde_json::json!({ "cookie": cookie })),
            )
            .await?;
        Ok(())
    }

    async fn quit(&self) -> ClientResult<()> {
        let url = format!("{}/session/{}", self.driver_url, self.session_id);
        let response = self.client.delete(&url).send().await?;
        let _: Option<serde_json::Value> =
            Self::handle_response(response, self.config.page_load_timeout * 1000).await?;
        tracing::debug!(session_id = %self.session_id, "WebDriver session closed");
        Ok(())
    }
}
