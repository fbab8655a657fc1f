//! Session configuration

/// Configuration for connecting to a WebDriver endpoint
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Driver base URL (e.g., "http://localhost:9515")
    pub driver_url: String,

    /// Page load timeout in seconds
    pub page_load_timeout: u64,

    /// Element-readiness wait timeout in seconds
    pub wait_timeout: u64,

    /// Poll interval for element-readiness waits in milliseconds
    pub poll_interval_ms: u64,

    /// Run the browser headless
    pub headless: bool,
}

impl SessionConfig {
    /// Create a new session configuration
    pub fn new(driver_url: impl Into<String>) -> Self {
        Self {
            driver_url: driver_url.into(),
            page_load_timeout: 30,
            wait_timeout: 10,
            poll_interval_ms: 250,
            headless: false,
        }
    }

    /// Set the element-readiness wait timeout
    pub fn with_wait_timeout(mut self, seconds: u64) -> Self {
        self.wait_timeout = seconds;
        self
    }

    /// Set the page load timeout
    pub fn with_page_load_timeout(mut self, seconds: u64) -> Self {
        self.page_load_timeout = seconds;
        self
    }

    /// Run the browser headless
    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new("http://localhost:9515")
    }
}
