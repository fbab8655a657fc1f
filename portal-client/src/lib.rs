//! Portal Client - browser session driver for the seller portal
//!
//! Exposes the browser-session capability contract the capture pipeline
//! depends on (navigation, performance-log retrieval, response-body fetch,
//! tab management, cookies), a concrete WebDriver-backed implementation, and
//! a scripted in-memory session for tests.

pub mod config;
pub mod error;
pub mod protocol;
pub mod scripted;
pub mod session;
pub mod webdriver;

pub use config::SessionConfig;
pub use error::{ClientError, ClientResult};
pub use protocol::{LogEntry, NetworkResponse};
pub use scripted::ScriptedSession;
pub use session::{BrowserSession, Cookie, ElementRef, Locator, SessionState, WindowHandle};
pub use webdriver::WebDriverSession;
