//! Virtual X display for the visiting browser
//!
//! Chrome extensions only run in a headed browser. On servers the worker
//! starts an `Xvfb` server for each execution and hands its `DISPLAY` to the
//! child process.

use crate::error::{Result, RobotaskError};
use async_trait::async_trait;
use rand::Rng;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

/// Starts the display an execution runs in
#[async_trait]
pub trait DisplayProvider: Send + Sync {
    async fn start(&self) -> Result<Box<dyn DisplaySession>>;
}

/// A running display, stopped by the worker loop on every path
#[async_trait]
pub trait DisplaySession: Send {
    /// Environment the execution context needs to draw on this display
    fn env(&self) -> Vec<(String, String)>;

    async fn stop(self: Box<Self>);
}

/// Xvfb server settings
#[derive(Debug, Clone)]
pub struct XvfbDisplay {
    /// Server binary; `:<n> -screen ...` is appended after `leading_args`
    pub program: PathBuf,
    pub leading_args: Vec<String>,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    /// How long to wait for the server socket to appear
    pub startup_timeout: Duration,
}

impl Default for XvfbDisplay {
    fn default() -> Self {
        Self {
            program: PathBuf::from("Xvfb"),
            leading_args: Vec::new(),
            width: 800,
            height: 680,
            depth: 24,
            startup_timeout: Duration::from_secs(10),
        }
    }
}

impl XvfbDisplay {
    fn lock_file(number: u32) -> PathBuf {
        PathBuf::from(format!("/tmp/.X{}-lock", number))
    }

    fn socket_file(number: u32) -> PathBuf {
        PathBuf::from(format!("/tmp/.X11-unix/X{}", number))
    }

    /// Random display number with neither a lock file nor a socket
    fn free_display_number() -> Option<u32> {
        let mut rng = rand::thread_rng();
        (0..100)
            .map(|_| rng.gen_range(1000..60000))
            .find(|n| !Self::lock_file(*n).exists() && !Self::socket_file(*n).exists())
    }
}

#[async_trait]
impl DisplayProvider for XvfbDisplay {
    async fn start(&self) -> Result<Box<dyn DisplaySession>> {
        let number = Self::free_display_number()
            .ok_or_else(|| RobotaskError::Display("no free display number".to_string()))?;

        let mut child = Command::new(&self.program)
            .args(&self.leading_args)
            .arg(format!(":{}", number))
            .args(["-screen", "0"])
            .arg(format!("{}x{}x{}", self.width, self.height, self.depth))
            .args(["-nolisten", "tcp"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RobotaskError::Display(format!("Failed to start Xvfb: {}", e)))?;

        let deadline = Instant::now() + self.startup_timeout;
        let socket = Self::socket_file(number);
        let lock = Self::lock_file(number);
        loop {
            if let Some(status) = child.try_wait()? {
                return Err(RobotaskError::Display(format!(
                    "Xvfb on :{} exited during startup ({})",
                    number, status
                )));
            }
            // The server is still alive here, so both files are its own
            if socket.exists() && lock.exists() {
                break;
            }
            if Instant::now() >= deadline {
                let _ = child.kill().await;
                return Err(RobotaskError::Display(format!(
                    "Xvfb on :{} not ready after {:?}",
                    number, self.startup_timeout
                )));
            }
            sleep(Duration::from_millis(50)).await;
        }

        info!("Started Xvfb on :{}", number);
        Ok(Box::new(XvfbSession { number, child }))
    }
}

struct XvfbSession {
    number: u32,
    child: Child,
}

#[async_trait]
impl DisplaySession for XvfbSession {
    fn env(&self) -> Vec<(String, String)> {
        vec![("DISPLAY".to_string(), format!(":{}", self.number))]
    }

    async fn stop(self: Box<Self>) {
        let XvfbSession { number, mut child } = *self;

        // SIGTERM lets Xvfb remove its lock file; SIGKILL if it does not comply
        #[cfg(unix)]
        if let Some(pid) = child.id() {
            // SAFETY: pid belongs to a child we spawned and have not reaped yet.
            unsafe {
                libc::kill(pid as libc::pid_t, libc::SIGTERM);
            }
        }

        match timeout(Duration::from_secs(5), child.wait()).await {
            Ok(Ok(status)) => debug!("Xvfb on :{} exited: {}", number, status),
            Ok(Err(e)) => warn!("Failed to wait for Xvfb on :{}: {}", number, e),
            Err(_) => {
                warn!("Xvfb on :{} ignored SIGTERM, killing", number);
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill Xvfb on :{}: {}", number, e);
                }
            }
        }
        info!("Stopped Xvfb on :{}", number);
    }
}

/// Uses whatever display the worker itself runs under
#[derive(Debug, Default, Clone)]
pub struct InheritDisplay;

struct InheritedSession;

#[async_trait]
impl DisplayProvider for InheritDisplay {
    async fn start(&self) -> Result<Box<dyn DisplaySession>> {
        Ok(Box::new(InheritedSession))
    }
}

#[async_trait]
impl DisplaySession for InheritedSession {
    fn env(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    async fn stop(self: Box<Self>) {}
}

/// Display selected by configuration
#[derive(Debug, Clone)]
pub enum DisplayBackend {
    Xvfb(XvfbDisplay),
    Inherit(InheritDisplay),
}

impl DisplayBackend {
    pub fn from_config(virtual_display: bool) -> Self {
        if virtual_display {
            DisplayBackend::Xvfb(XvfbDisplay::default())
        } else {
            DisplayBackend::Inherit(InheritDisplay)
        }
    }
}

#[async_trait]
impl DisplayProvider for DisplayBackend {
    async fn start(&self) -> Result<Box<dyn DisplaySession>> {
        match self {
            DisplayBackend::Xvfb(xvfb) => xvfb.start().await,
            DisplayBackend::Inherit(inherit) => inherit.start().await,
        }
    }
}
