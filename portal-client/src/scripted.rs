//! Scripted in-memory browser session for tests
//!
//! Drives the capture pipeline from recorded fixtures: per-URL performance
//! logs, per-request response bodies and per-URL elements. No browser, no
//! network.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{ClientError, ClientResult};
use crate::protocol::LogEntry;
use crate::session::{BrowserSession, Cookie, ElementRef, Locator, WindowHandle};

#[derive(Default)]
struct Page {
    log: Vec<LogEntry>,
    elements: Vec<(Locator, String)>,
}

struct Window {
    handle: String,
    url: Option<String>,
}

#[derive(Default)]
struct Inner {
    windows: Vec<Window>,
    current: Option<usize>,
    next_window: u32,
    next_element: u32,
    pages: HashMap<String, Page>,
    bodies: HashMap<String, String>,
    element_attrs: HashMap<String, HashMap<String, String>>,
    cookies: Vec<Cookie>,
    navigations: Vec<String>,
    clicked: Vec<String>,
    typed: Vec<(String, String)>,
    timeout_urls: Vec<String>,
    quit: bool,
}

/// In-memory `BrowserSession` driven by recorded fixtures.
pub struct ScriptedSession {
    inner: Mutex<Inner>,
}

impl Default for ScriptedSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedSession {
    pub fn new() -> Self {
        let inner = Inner {
            windows: vec![Window {
                handle: "w0".into(),
                url: None,
            }],
            current: Some(0),
            next_window: 1,
            ..Inner::default()
        };
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Record the performance log returned after navigating to `url`.
    pub fn stub_log(&self, url: &str, entries: Vec<LogEntry>) {
        let mut inner = self.inner.lock().unwrap();
        inner.pages.entry(url.to_string()).or_default().log = entries;
    }

    /// Record a response body fetched by request id.
    pub fn stub_body(&self, request_id: &str, body: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .bodies
            .insert(request_id.to_string(), body.to_string());
    }

    /// Register an element present on `url`, with its attributes.
    pub fn stub_element(
        &self,
        url: &str,
        locator: Locator,
        attrs: &[(&str, &str)],
    ) -> ElementRef {
        let mut inner = self.inner.lock().unwrap();
        let id = format!("e{}", inner.next_element);
        inner.next_element += 1;
        inner
            .pages
            .entry(url.to_string())
            .or_default()
            .elements
            .push((locator, id.clone()));
        inner.element_attrs.insert(
            id.clone(),
            attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        ElementRef { id }
    }

    /// Make navigation to `url` fail with a timeout.
    pub fn fail_navigation(&self, url: &str) {
        self.inner.lock().unwrap().timeout_urls.push(url.to_string());
    }

    /// URLs navigated to, in order.
    pub fn navigations(&self) -> Vec<String> {
        self.inner.lock().unwrap().navigations.clone()
    }

    /// Element ids clicked, in order.
    pub fn clicked(&self) -> Vec<String> {
        self.inner.lock().unwrap().clicked.clone()
    }

    /// (element id, text) pairs typed, in order.
    pub fn typed(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().typed.clone()
    }

    /// Number of currently open windows.
    pub fn open_windows(&self) -> usize {
        self.inner.lock().unwrap().windows.len()
    }

    /// Whether `quit` was called.
    pub fn is_quit(&self) -> bool {
        self.inner.lock().unwrap().quit
    }

    fn current_url(inner: &Inner) -> Option<String> {
        inner
            .current
            .and_then(|i| inner.windows.get(i))
            .and_then(|w| w.url.clone())
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn navigate(&self, url: &str) -> ClientResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.quit {
            return Err(ClientError::Session("session closed".into()));
        }
        inner.navigations.push(url.to_string());
        if inner.timeout_urls.iter().any(|u| u == url) {
            return Err(ClientError::Timeout {
                what: format!("navigation to {url}"),
                waited_ms: 0,
            });
        }
        let current = inner
            .current
            .ok_or_else(|| ClientError::Session("no current window".into()))?;
        inner.windows[current].url = Some(url.to_string());
        Ok(())
    }

    async fn current_window(&self) -> ClientResult<WindowHandle> {
        let inner = self.inner.lock().unwrap();
        inner
            .current
            .map(|i| inner.windows[i].handle.clone())
            .ok_or_else(|| ClientError::Session("no current window".into()))
    }

    async fn open_new_tab(&self) -> ClientResult<WindowHandle> {
        let mut inner = self.inner.lock().unwrap();
        let handle = format!("w{}", inner.next_window);
        inner.next_window += 1;
        inner.windows.push(Window {
            handle: handle.clone(),
            url: None,
        });
        inner.current = Some(inner.windows.len() - 1);
        Ok(handle)
    }

    async fn switch_to(&self, handle: &WindowHandle) -> ClientResult<()> {
        let mut inner = self.inner.lock().unwrap();
        match inner.windows.iter().position(|w| &w.handle == handle) {
            Some(index) => {
                inner.current = Some(index);
                Ok(())
            }
            None => Err(ClientError::Session(format!("no such window: {handle}"))),
        }
    }

    async fn close_current(&self) -> ClientResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let current = inner
            .current
            .take()
            .ok_or_else(|| ClientError::Session("no current window".into()))?;
        inner.windows.remove(current);
        Ok(())
    }

    async fn performance_log(&self) -> ClientResult<Vec<LogEntry>> {
        let inner = self.inner.lock().unwrap();
        let url = Self::current_url(&inner).unwrap_or_default();
        Ok(inner
            .pages
            .get(&url)
            .map(|p| p.log.clone())
            .unwrap_or_default())
    }

    async fn response_body(&self, request_id: &str) -> ClientResult<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .bodies
            .get(request_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("request {request_id}")))
    }

    async fn find(&self, locator: &Locator) -> ClientResult<Option<ElementRef>> {
        let inner = self.inner.lock().unwrap();
        let url = Self::current_url(&inner).unwrap_or_default();
        Ok(inner.pages.get(&url).and_then(|p| {
            p.elements
                .iter()
                .find(|(l, _)| l == locator)
                .map(|(_, id)| ElementRef { id: id.clone() })
        }))
    }

    async fn find_all(&self, locator: &Locator) -> ClientResult<Vec<ElementRef>> {
        let inner = self.inner.lock().unwrap();
        let url = Self::current_url(&inner).unwrap_or_default();
        Ok(inner
            .pages
            .get(&url)
            .map(|p| {
                p.elements
                    .iter()
                    .filter(|(l, _)| l == locator)
                    .map(|(_, id)| ElementRef { id: id.clone() })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn wait_for(&self, locator: &Locator) -> ClientResult<ElementRef> {
        self.find(locator).await?.ok_or_else(|| ClientError::Timeout {
            what: format!("element {locator:?}"),
            waited_ms: 0,
        })
    }

    async fn click(&self, element: &ElementRef) -> ClientResult<()> {
        self.inner.lock().unwrap().clicked.push(element.id.clone());
        Ok(())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> ClientResult<()> {
        self.inner
            .lock()
            .unwrap()
            .typed
            .push((element.id.clone(), text.to_string()));
        Ok(())
    }

    async fn attribute(&self, element: &ElementRef, name: &str) -> ClientResult<Option<String>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .element_attrs
            .get(&element.id)
            .and_then(|attrs| attrs.get(name).cloned()))
    }

    async fn cookies(&self) -> ClientResult<Vec<Cookie>> {
        Ok(self.inner.lock().unwrap().cookies.clone())
    }

    async fn add_cookie(&self, cookie: &Cookie) -> ClientResult<()> {
        self.inner.lock().unwrap().cookies.push(cookie.clone());
        Ok(())
    }

    async fn quit(&self) -> ClientResult<()> {
        self.inner.lock().unwrap().quit = true;
        Ok(())
    }
}
