//! Harvester configuration
//!
//! Environment-driven; `.env` is loaded by main before `from_env` runs.
//! Subcommand-level choices (date range, storage kind, sync direction) come
//! from the CLI and are combined with this at dispatch time.

use std::path::PathBuf;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Storage backend selection
#[derive(Debug, Clone)]
pub enum StorageTarget {
    /// One file per artifact under a base directory
    Local { path: PathBuf },
    /// One object per artifact in an S3 bucket
    S3 { bucket: String },
}

/// Portal credentials for the login flow
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Harvester configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Seller dashboard URL (login entry point)
    pub dashboard_url: String,
    /// Seller portal base URL (order list lives here)
    pub seller_portal_url: String,
    /// Order management API base URL (payloads observed in the trace)
    pub order_api_url: String,

    /// WebDriver endpoint
    pub webdriver_url: String,
    /// Run the browser headless
    pub headless: bool,
    /// Where session cookies persist between runs
    pub session_state_path: PathBuf,

    /// Portal login (optional: cookies-only runs carry none)
    pub username: Option<String>,
    pub password: Option<String>,

    /// Base directory for the local backend
    pub storage_path: PathBuf,
    /// Bucket for the S3 backend (required only when selected)
    pub s3_bucket: Option<String>,

    /// Page load timeout in seconds
    pub page_load_timeout: u64,
    /// Element-readiness wait timeout in seconds
    pub wait_timeout: u64,
    /// Post-navigation settle delay before reading the network trace (ms)
    pub settle_ms: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        Ok(Self {
            dashboard_url: std::env::var("PORTAL_DASHBOARD_URL").unwrap_or_else(|_| {
                "https://store.tcgplayer.com/admin/Seller/Dashboard/".into()
            }),
            seller_portal_url: std::env::var("SELLER_PORTAL_URL")
                .unwrap_or_else(|_| "https://sellerportal.tcgplayer.com".into()),
            order_api_url: std::env::var("ORDER_API_URL")
                .unwrap_or_else(|_| "https://order-management-api.tcgplayer.com".into()),
            webdriver_url: std::env::var("WEBDRIVER_URL")
                .unwrap_or_else(|_| "http://localhost:9515".into()),
            headless: std::env::var("HEADLESS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            session_state_path: std::env::var("SESSION_STATE_PATH")
                .unwrap_or_else(|_| "session_state.json".into())
                .into(),
            username: std::env::var("PORTAL_USERNAME").ok().filter(|s| !s.is_empty()),
            password: std::env::var("PORTAL_PASSWORD").ok().filter(|s| !s.is_empty()),
            storage_path: std::env::var("STORAGE_PATH")
                .unwrap_or_else(|_| "orders".into())
                .into(),
            s3_bucket: std::env::var("S3_BUCKET").ok().filter(|s| !s.is_empty()),
            page_load_timeout: std::env::var("PAGE_LOAD_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            wait_timeout: std::env::var("WAIT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            settle_ms: std::env::var("SETTLE_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2000),
        })
    }

    /// Credentials when both halves are configured.
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }

    /// Resolve the local storage target.
    pub fn local_target(&self) -> StorageTarget {
        StorageTarget::Local {
            path: self.storage_path.clone(),
        }
    }

    /// Resolve the S3 storage target; errors when no bucket is configured.
    pub fn s3_target(&self) -> Result<StorageTarget, BoxError> {
        match &self.s3_bucket {
            Some(bucket) => Ok(StorageTarget::S3 {
                bucket: bucket.clone(),
            }),
            None => Err("S3_BUCKET must be set to use the s3 backend".into()),
        }
    }
}
