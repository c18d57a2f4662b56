//! Browser side of a task: the visit operation and the environment it runs in
//!
//! - `visit`: the time-bounded visit of one URL, run inside the child process
//! - `chrome`: `BrowserLauncher` backed by chromiumoxide
//! - `display`: virtual X display for headed Chrome with extensions

pub mod chrome;
pub mod display;
pub mod visit;

pub use chrome::ChromeLauncher;
pub use display::{DisplayBackend, DisplayProvider, DisplaySession, XvfbDisplay};
pub use visit::{visit, VisitReport};

use crate::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

/// User agent announced by the visiting browser
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; MSIE 9.0; Windows NT 6.1; Trident/5.0)";

/// Options of the visit operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitOptions {
    /// Unpacked extension loaded into every browser
    pub extension_path: Option<PathBuf>,
    pub user_agent: String,
    /// Soft timeout for the page load, enforced by the visit itself
    pub page_load_timeout: Duration,
    /// Time the page stays open after it loaded
    pub settle_delay: Duration,
    /// Time given to the extension to initialise before navigating
    pub extension_warmup: Duration,
    /// Disable Chrome's sandbox (constrained CI containers)
    pub no_sandbox: bool,
    /// Chrome binary; auto-detected when unset
    pub chrome_executable: Option<PathBuf>,
}

impl Default for VisitOptions {
    fn default() -> Self {
        Self {
            extension_path: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            page_load_timeout: Duration::from_secs(70),
            settle_delay: Duration::from_secs(10),
            extension_warmup: Duration::from_secs(5),
            no_sandbox: false,
            chrome_executable: None,
        }
    }
}

impl VisitOptions {
    /// Command-line flags of the `visit` subcommand carrying these options
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "--user-agent".to_string(),
            self.user_agent.clone(),
            "--page-load-timeout".to_string(),
            self.page_load_timeout.as_secs().to_string(),
            "--settle-delay".to_string(),
            self.settle_delay.as_secs().to_string(),
            "--extension-warmup".to_string(),
            self.extension_warmup.as_secs().to_string(),
        ];

        if let Some(path) = &self.extension_path {
            args.push("--extension-path".to_string());
            args.push(path.display().to_string());
        }
        if let Some(path) = &self.chrome_executable {
            args.push("--chrome-executable".to_string());
            args.push(path.display().to_string());
        }
        if self.no_sandbox {
            args.push("--no-sandbox".to_string());
        }

        args
    }
}

/// Starts a browser for one visit
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, options: &VisitOptions) -> Result<Box<dyn BrowserSession>>;
}

/// A running browser owned by one visit
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate to `url` and wait for the load event.
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Shut the browser down and release its process.
    async fn close(self: Box<Self>) -> Result<()>;
}
