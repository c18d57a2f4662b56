//! The visit operation
//!
//! Runs inside the child process spawned by the isolated executor. Every
//! failure here is logged and reported as a `VisitReport`, never escalated:
//! the supervisor only cares whether the process exits, and when.

use crate::browser::{BrowserLauncher, BrowserSession, VisitOptions};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};

/// How a visit ended, from the point of view of the visit itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisitReport {
    /// Page loaded and stayed open for the settle delay
    Loaded,
    /// The soft page-load timeout fired
    PageLoadTimedOut,
    /// The browser failed to start, navigation failed, or the tab crashed
    Failed(String),
}

/// Visit `url` once with a fresh browser.
///
/// The browser is closed on every path once it has been launched, including
/// when the session body panics.
pub async fn visit<L>(launcher: &L, url: &str, options: &VisitOptions) -> VisitReport
where
    L: BrowserLauncher + ?Sized,
{
    info!("Launching browser for {}", url);
    let mut session = match launcher.launch(options).await {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to launch browser for {}: {}", url, e);
            return VisitReport::Failed(e.to_string());
        }
    };
    info!("Browser ready");

    let body = AssertUnwindSafe(browse(session.as_mut(), url, options)).catch_unwind();
    let report = match body.await {
        Ok(report) => report,
        Err(_) => {
            error!("Visit of {} panicked", url);
            VisitReport::Failed("visit panicked".to_string())
        }
    };

    if let Err(e) = session.close().await {
        warn!("Failed to close browser cleanly: {}", e);
    }

    report
}

async fn browse(session: &mut dyn BrowserSession, url: &str, options: &VisitOptions) -> VisitReport {
    sleep(options.extension_warmup).await;

    match timeout(options.page_load_timeout, session.navigate(url)).await {
        Ok(Ok(())) => {
            sleep(options.settle_delay).await;
            info!("Visited {}", url);
            VisitReport::Loaded
        }
        Ok(Err(e)) => {
            error!("Tab crashed while loading {}: {}", url, e);
            VisitReport::Failed(e.to_string())
        }
        Err(_) => {
            error!(
                "Page load of {} timed out after {:?}",
                url, options.page_load_timeout
            );
            VisitReport::PageLoadTimedOut
        }
    }
}

/// Visit and log the final report; used by the `visit` subcommand.
pub async fn visit_and_log<L>(launcher: &L, url: &str, options: &VisitOptions) -> VisitReport
where
    L: BrowserLauncher + ?Sized,
{
    let report = visit(launcher, url, options).await;
    match &report {
        VisitReport::Loaded => info!("Visit report for {}: loaded", url),
        VisitReport::PageLoadTimedOut => warn!("Visit report for {}: page load timed out", url),
        VisitReport::Failed(reason) => warn!("Visit report for {}: failed ({})", url, reason),
    }
    report
}
