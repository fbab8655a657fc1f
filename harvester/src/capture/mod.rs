//! Order capture orchestration
//!
//! Drives the browser across the order list for a date range: one isolated
//! tab per order, trace extraction inside the tab, artifact persistence,
//! then back to the list view. A single missing or failing order never
//! aborts the batch; losing the list-view window does.

pub mod trace;

use std::path::Path;
use std::time::Duration;

use portal_client::{BrowserSession, ClientError, Locator, SessionState, WindowHandle};
use thiserror::Error;

use crate::config::Credentials;
use crate::storage::{StorageBackend, StorageError};
use trace::ExtractError;

/// Order detail links on the list view
const ORDER_LINK_CSS: &str = "a[data-testid='OrderIndex_Table_OrderLink']";
/// Search box signalling the list view finished rendering
const SEARCH_TERM_ID: &str = "searchTerm";
/// Sign-in button on the dashboard; its absence means an authenticated session
const SIGN_IN_XPATH: &str = "//button[contains(., 'Sign In')]";

/// Capture errors
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The run cannot continue (list-view window lost, driver dead,
    /// authentication impossible)
    #[error("fatal session failure: {0}")]
    FatalSession(String),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Tally of one capture run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub captured: usize,
    pub skipped_not_found: usize,
    pub failed: usize,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "captured: {}, skipped (not found): {}, failed: {}",
            self.captured, self.skipped_not_found, self.failed
        )
    }
}

/// Per-order outcome inside the batch loop
enum CaptureStatus {
    Captured,
    SkippedNotFound,
}

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Dashboard URL (login entry point)
    pub dashboard_url: String,
    /// Seller portal base URL
    pub seller_portal_url: String,
    /// Order management API base; trace responses are matched against it
    pub order_api_url: String,
    /// Credentials; None means cookies-only (sign-in must not be required)
    pub credentials: Option<Credentials>,
    /// Skip writes whose digest matches the stored artifact
    pub check_digest: bool,
    /// Delay after detail navigation so the page's own API calls land (ms)
    pub settle_ms: u64,
}

impl CaptureConfig {
    /// Order list URL for a date range (dates as `MM/DD/YYYY`).
    pub fn orders_list_url(&self, from: &str, to: &str) -> String {
        format!(
            "{}/orders?orderDateFrom={}&orderDateTo={}&fulfillmentTypes=Normal&searchRange=Custom&page=1&size=500&sortBy",
            self.seller_portal_url.trim_end_matches('/'),
            from,
            to
        )
    }
}

/// Drives one capture batch over a browser session and a storage backend.
pub struct OrderCapture<'a> {
    session: &'a dyn BrowserSession,
    storage: &'a dyn StorageBackend,
    config: CaptureConfig,
}

impl<'a> OrderCapture<'a> {
    pub fn new(
        session: &'a dyn BrowserSession,
        storage: &'a dyn StorageBackend,
        config: CaptureConfig,
    ) -> Self {
        Self {
            session,
            storage,
            config,
        }
    }

    /// Run the full batch for a date range.
    ///
    /// Session state (cookies from a prior run) is applied before login;
    /// cookie capture for the next run happens in [`teardown`], which the
    /// caller invokes on every exit path.
    pub async fn run(
        &self,
        state: Option<&SessionState>,
        from: &str,
        to: &str,
    ) -> Result<RunSummary, CaptureError> {
        if let Some(state) = state {
            self.apply_session_state(state).await?;
        }
        self.login().await?;

        let (list_handle, links) = self.open_order_list(from, to).await?;
        if links.is_empty() {
            tracing::info!("no orders found");
            return Ok(RunSummary::default());
        }
        tracing::info!(count = links.len(), "found order links");

        self.extract_orders(&links, &list_handle).await
    }

    /// Apply cookies from a prior run so login can be skipped.
    async fn apply_session_state(&self, state: &SessionState) -> Result<(), CaptureError> {
        // Cookies can only be set against the portal's origin
        self.session.navigate(&self.config.dashboard_url).await?;
        for cookie in &state.cookies {
            if let Err(e) = self.session.add_cookie(cookie).await {
                tracing::warn!(cookie = %cookie.name, error = %e, "cookie rejected");
            }
        }
        Ok(())
    }

    /// Sign in unless the session is already authenticated.
    async fn login(&self) -> Result<(), CaptureError> {
        self.session.navigate(&self.config.dashboard_url).await?;

        let sign_in = self
            .session
            .find(&Locator::xpath(SIGN_IN_XPATH))
            .await?;
        let Some(sign_in) = sign_in else {
            tracing::info!("already logged in");
            return Ok(());
        };

        let Some(credentials) = &self.config.credentials else {
            return Err(CaptureError::FatalSession(
                "sign-in required but no credentials configured".into(),
            ));
        };

        let email = self.session.wait_for(&Locator::name("Email")).await?;
        self.session.send_keys(&email, &credentials.username).await?;
        let password = self.session.wait_for(&Locator::name("Password")).await?;
        self.session
            .send_keys(&password, &credentials.password)
            .await?;
        self.session.click(&sign_in).await?;

        tracing::info!("completed sign in");
        Ok(())
    }

    /// Navigate to the order list and collect the detail links it presents.
    async fn open_order_list(
        &self,
        from: &str,
        to: &str,
    ) -> Result<(WindowHandle, Vec<String>), CaptureError> {
        let url = self.config.orders_list_url(from, to);
        self.session.navigate(&url).await?;
        self.session.wait_for(&Locator::id(SEARCH_TERM_ID)).await?;
        let list_handle = self.session.current_window().await?;

        // An empty result page never renders a link; a timeout here means
        // "no orders", not a failure
        let links = match self.session.wait_for(&Locator::css(ORDER_LINK_CSS)).await {
            Ok(_) => self.collect_links().await?,
            Err(e) if e.is_timeout() => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        Ok((list_handle, links))
    }

    async fn collect_links(&self) -> Result<Vec<String>, CaptureError> {
        let elements = self
            .session
            .find_all(&Locator::css(ORDER_LINK_CSS))
            .await?;
        let mut links = Vec::with_capacity(elements.len());
        for element in &elements {
            if let Some(href) = self.session.attribute(element, "href").await? {
                links.push(href);
            }
        }
        Ok(links)
    }

    /// Per-order loop. Processes links in list order, one tab at a time.
    async fn extract_orders(
        &self,
        links: &[String],
        list_handle: &WindowHandle,
    ) -> Result<RunSummary, CaptureError> {
        let mut summary = RunSummary::default();

        for href in links {
            let order_number = order_number_from_url(href);

            match self.capture_one(href, &order_number).await {
                Ok(CaptureStatus::Captured) => {
                    summary.captured += 1;
                }
                Ok(CaptureStatus::SkippedNotFound) => {
                    tracing::warn!(order_number = %order_number, "no order payload in network trace");
                    summary.skipped_not_found += 1;
                }
                // Storage failures have no per-order recovery; re-running
                // the batch is the recovery path
                Err(e @ CaptureError::Storage(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!(order_number = %order_number, error = %e, "order capture failed");
                    summary.failed += 1;
                }
            }

            // The list view is the terminal state of every iteration;
            // losing it ends the run
            if let Err(e) = self.session.switch_to(list_handle).await {
                return Err(CaptureError::FatalSession(format!(
                    "lost order list window: {e}"
                )));
            }
        }

        Ok(summary)
    }

    /// Capture a single order in an isolated tab; the tab is closed on
    /// every path out.
    async fn capture_one(
        &self,
        href: &str,
        order_number: &str,
    ) -> Result<CaptureStatus, CaptureError> {
        self.session.open_new_tab().await?;
        let result = self.capture_in_tab(href, order_number).await;
        if let Err(e) = self.session.close_current().await {
            tracing::warn!(order_number, error = %e, "failed to close order tab");
        }
        result
    }

    async fn capture_in_tab(
        &self,
        href: &str,
        order_number: &str,
    ) -> Result<CaptureStatus, CaptureError> {
        self.session.navigate(href).await?;
        if self.config.settle_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.settle_ms)).await;
        }

        let body = match trace::extract_order_payload(
            self.session,
            &self.config.order_api_url,
            order_number,
        )
        .await
        {
            Ok(body) => body,
            Err(ExtractError::NotFound { .. }) => return Ok(CaptureStatus::SkippedNotFound),
            // Parse and driver errors degrade this order only; the loop
            // counts them as failed
            Err(e) => return Err(e.into()),
        };

        let key = format!("{order_number}.json");
        if self.config.check_digest {
            self.storage.save_if_changed(&key, body.as_bytes()).await?;
        } else {
            self.storage.save(&key, body.as_bytes()).await?;
        }

        Ok(CaptureStatus::Captured)
    }
}

/// Tear the session down: capture cookies for the next run, then quit.
///
/// Called on every exit path; failures are logged, never raised, so they
/// cannot mask the run outcome.
pub async fn teardown(session: &dyn BrowserSession, state_path: &Path) {
    match session.cookies().await {
        Ok(cookies) => {
            let state = SessionState::new(cookies);
            match state.save(state_path) {
                Ok(()) => {
                    tracing::info!(path = %state_path.display(), "session state persisted");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "could not persist session state");
                }
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not capture session cookies");
        }
    }

    if let Err(e) = session.quit().await {
        tracing::warn!(error = %e, "driver teardown failed");
    }
}

/// Last path segment of an order detail URL.
fn order_number_from_url(href: &str) -> String {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::MemoryStorage;
    use portal_client::ScriptedSession;
    use portal_client::protocol::response_entry;

    const PORTAL: &str = "https://sellerportal.example.com";
    const API: &str = "https://order-api.example.com";
    const DASHBOARD: &str = "https://store.example.com/admin/Seller/Dashboard/";

    fn capture_config(credentials: Option<Credentials>) -> CaptureConfig {
        CaptureConfig {
            dashboard_url: DASHBOARD.into(),
            seller_portal_url: PORTAL.into(),
            order_api_url: API.into(),
            credentials,
            check_digest: false,
            settle_ms: 0,
        }
    }

    fn detail_url(order_number: &str) -> String {
        format!("{PORTAL}/orders/{order_number}")
    }

    /// List page with links + search box, one detail page per order
    fn stub_list_and_orders(
        session: &ScriptedSession,
        config: &CaptureConfig,
        orders: &[(&str, Option<&str>)],
    ) {
        let list_url = config.orders_list_url("01/01/2024", "01/31/2024");
        session.stub_element(&list_url, Locator::id(SEARCH_TERM_ID), &[]);

        for (i, (order_number, body)) in orders.iter().enumerate() {
            let href = detail_url(order_number);
            session.stub_element(
                &list_url,
                Locator::css(ORDER_LINK_CSS),
                &[("href", href.as_str())],
            );

            match body {
                Some(body) => {
                    let request_id = format!("req-{i}");
                    session.stub_log(
                        &href,
                        vec![response_entry(
                            &request_id,
                            Some(&format!("{API}/orders/{order_number}")),
                        )],
                    );
                    session.stub_body(&request_id, body);
                }
                None => {
                    // Page loads but the trace never shows the order payload
                    session.stub_log(&href, vec![]);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_captures_all_orders_in_list_order() {
        let session = ScriptedSession::new();
        let storage = MemoryStorage::new();
        let config = capture_config(None);

        stub_list_and_orders(
            &session,
            &config,
            &[
                ("ORDER-1", Some(r#"{"orderNumber": "ORDER-1"}"#)),
                ("ORDER-2", Some(r#"{"orderNumber": "ORDER-2"}"#)),
            ],
        );

        let capture = OrderCapture::new(&session, &storage, config);
        let summary = capture.run(None, "01/01/2024", "01/31/2024").await.unwrap();

        assert_eq!(
            summary,
            RunSummary {
                captured: 2,
                skipped_not_found: 0,
                failed: 0
            }
        );
        assert_eq!(
            storage.get("ORDER-1.json").unwrap(),
            br#"{"orderNumber": "ORDER-1"}"#
        );
        assert_eq!(
            storage.get("ORDER-2.json").unwrap(),
            br#"{"orderNumber": "ORDER-2"}"#
        );
        // Every tab was closed; only the list window remains
        assert_eq!(session.open_windows(), 1);
        // Detail pages visited in list order
        let navigations = session.navigations();
        let pos1 = navigations.iter().position(|u| u == &detail_url("ORDER-1"));
        let pos2 = navigations.iter().position(|u| u == &detail_url("ORDER-2"));
        assert!(pos1.unwrap() < pos2.unwrap());
    }

    #[tokio::test]
    async fn test_missing_order_is_skipped_not_fatal() {
        let session = ScriptedSession::new();
        let storage = MemoryStorage::new();
        let config = capture_config(None);

        stub_list_and_orders(
            &session,
            &config,
            &[
                ("ORDER-1", None),
                ("ORDER-2", Some(r#"{"orderNumber": "ORDER-2"}"#)),
            ],
        );

        let capture = OrderCapture::new(&session, &storage, config);
        let summary = capture.run(None, "01/01/2024", "01/31/2024").await.unwrap();

        assert_eq!(
            summary,
            RunSummary {
                captured: 1,
                skipped_not_found: 1,
                failed: 0
            }
        );
        assert!(storage.get("ORDER-1.json").is_none());
        assert!(storage.get("ORDER-2.json").is_some());
    }

    #[tokio::test]
    async fn test_navigation_failure_counts_failed_and_continues() {
        let session = ScriptedSession::new();
        let storage = MemoryStorage::new();
        let config = capture_config(None);

        stub_list_and_orders(
            &session,
            &config,
            &[
                ("ORDER-1", Some(r#"{"orderNumber": "ORDER-1"}"#)),
                ("ORDER-2", Some(r#"{"orderNumber": "ORDER-2"}"#)),
            ],
        );
        session.fail_navigation(&detail_url("ORDER-1"));

        let capture = OrderCapture::new(&session, &storage, config);
        let summary = capture.run(None, "01/01/2024", "01/31/2024").await.unwrap();

        assert_eq!(
            summary,
            RunSummary {
                captured: 1,
                skipped_not_found: 0,
                failed: 1
            }
        );
        assert!(storage.get("ORDER-2.json").is_some());
        assert_eq!(session.open_windows(), 1);
    }

    #[tokio::test]
    async fn test_malformed_payload_counts_failed() {
        let session = ScriptedSession::new();
        let storage = MemoryStorage::new();
        let config = capture_config(None);

        stub_list_and_orders(
            &session,
            &config,
            &[("ORDER-1", Some("<html>gateway error</html>"))],
        );

        let capture = OrderCapture::new(&session, &storage, config);
        let summary = capture.run(None, "01/01/2024", "01/31/2024").await.unwrap();

        assert_eq!(
            summary,
            RunSummary {
                captured: 0,
                skipped_not_found: 0,
                failed: 1
            }
        );
        assert!(storage.get("ORDER-1.json").is_none());
    }

    #[tokio::test]
    async fn test_empty_list_view_is_a_clean_run() {
        let session = ScriptedSession::new();
        let storage = MemoryStorage::new();
        let config = capture_config(None);

        let list_url = config.orders_list_url("01/01/2024", "01/31/2024");
        session.stub_element(&list_url, Locator::id(SEARCH_TERM_ID), &[]);

        let capture = OrderCapture::new(&session, &storage, config);
        let summary = capture.run(None, "01/01/2024", "01/31/2024").await.unwrap();

        assert_eq!(summary, RunSummary::default());
        assert_eq!(storage.len(), 0);
    }

    #[tokio::test]
    async fn test_login_fills_credentials_when_sign_in_present() {
        let session = ScriptedSession::new();
        let storage = MemoryStorage::new();
        let config = capture_config(Some(Credentials {
            username: "seller@example.com".into(),
            password: "hunter2".into(),
        }));

        let sign_in =
            session.stub_element(DASHBOARD, Locator::xpath(SIGN_IN_XPATH), &[]);
        let email = session.stub_element(DASHBOARD, Locator::name("Email"), &[]);
        let password = session.stub_element(DASHBOARD, Locator::name("Password"), &[]);
        // Empty order list after login keeps the test focused
        let list_url = config.orders_list_url("01/01/2024", "01/31/2024");
        session.stub_element(&list_url, Locator::id(SEARCH_TERM_ID), &[]);

        let capture = OrderCapture::new(&session, &storage, config);
        capture.run(None, "01/01/2024", "01/31/2024").await.unwrap();

        let typed = session.typed();
        assert!(typed.contains(&(email.id.clone(), "seller@example.com".into())));
        assert!(typed.contains(&(password.id.clone(), "hunter2".into())));
        assert_eq!(session.clicked(), vec![sign_in.id]);
    }

    #[tokio::test]
    async fn test_sign_in_required_without_credentials_is_fatal() {
        let session = ScriptedSession::new();
        let storage = MemoryStorage::new();
        let config = capture_config(None);

        session.stub_element(DASHBOARD, Locator::xpath(SIGN_IN_XPATH), &[]);

        let capture = OrderCapture::new(&session, &storage, config);
        let err = capture
            .run(None, "01/01/2024", "01/31/2024")
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::FatalSession(_)));
    }

    #[tokio::test]
    async fn test_session_state_cookies_are_applied() {
        let session = ScriptedSession::new();
        let storage = MemoryStorage::new();
        let config = capture_config(None);
        let list_url = config.orders_list_url("01/01/2024", "01/31/2024");
        session.stub_element(&list_url, Locator::id(SEARCH_TERM_ID), &[]);

        let state = SessionState::new(vec![portal_client::Cookie::new("auth", "tok")]);

        let capture = OrderCapture::new(&session, &storage, config);
        capture
            .run(Some(&state), "01/01/2024", "01/31/2024")
            .await
            .unwrap();

        let cookies = session.cookies().await.unwrap();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name, "auth");
    }

    #[tokio::test]
    async fn test_teardown_persists_cookies_and_quits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session_state.json");

        let session = ScriptedSession::new();
        session
            .add_cookie(&portal_client::Cookie::new("auth", "tok"))
            .await
            .unwrap();

        teardown(&session, &path).await;

        assert!(session.is_quit());
        let state = SessionState::load(&path).unwrap().unwrap();
        assert_eq!(state.cookies.len(), 1);
    }

    #[test]
    fn test_order_number_from_url() {
        assert_eq!(
            order_number_from_url("https://p.example/orders/AB-1?tab=items"),
            "AB-1"
        );
        assert_eq!(order_number_from_url("https://p.example/orders/AB-2/"), "AB-2");
        assert_eq!(order_number_from_url("https://p.example/orders/AB-3"), "AB-3");
    }
}
