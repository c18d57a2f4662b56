//! Chrome launcher backed by chromiumoxide

use crate::browser::{BrowserLauncher, BrowserSession, VisitOptions};
use crate::error::{Result, RobotaskError};
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Launches a fresh, headed Chrome with the observation extension loaded.
///
/// Extensions do not run in headless mode, so the browser expects a display
/// (usually the Xvfb server started by the worker loop).
#[derive(Debug, Default, Clone)]
pub struct ChromeLauncher;

impl ChromeLauncher {
    pub fn new() -> Self {
        Self
    }

    fn browser_config(options: &VisitOptions) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .with_head()
            .request_timeout(options.page_load_timeout)
            .arg(format!("--user-agent={}", options.user_agent))
            .arg("--disable-application-cache");

        if let Some(path) = &options.extension_path {
            builder = builder.extension(path.display().to_string());
        }
        if let Some(path) = &options.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        // Chrome's sandbox does not work inside some CI containers
        if options.no_sandbox {
            builder = builder.no_sandbox();
        }

        builder.build().map_err(RobotaskError::Browser)
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self, options: &VisitOptions) -> Result<Box<dyn BrowserSession>> {
        let config = Self::browser_config(options)?;
        let (browser, mut handler) = Browser::launch(config).await?;

        // Drive CDP events until the connection closes
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Box::new(ChromeSession {
            browser,
            handler_task,
        }))
    }
}

struct ChromeSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        let page = self.browser.new_page("about:blank").await?;
        page.goto(url).await?;
        debug!("Loaded {}", url);
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let ChromeSession {
            mut browser,
            handler_task,
        } = *self;

        let closed = browser.close().await;
        if let Err(e) = browser.wait().await {
            warn!("Failed to reap Chrome process: {}", e);
        }
        handler_task.abort();
        closed?;
        Ok(())
    }
}
