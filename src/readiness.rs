//! Makes sure the companion app is up before a request goes out.

use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::Instant;

use crate::config::{ObsidianConfig, ReadinessConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    Unknown,
    Launching,
    Polling,
    Ready,
    Unreachable,
}

/// Timing policy for [`ReadinessProber::ensure_ready`].
#[derive(Debug, Clone)]
pub struct ReadinessPolicy {
    pub settle_delay: Duration,
    pub backoff: Duration,
    pub max_attempts: u32,
    pub probe_timeout: Duration,
}

impl From<&ReadinessConfig> for ReadinessPolicy {
    fn from(config: &ReadinessConfig) -> Self {
        Self {
            settle_delay: Duration::from_secs(config.settle_delay_secs),
            backoff: Duration::from_secs(config.backoff_secs),
            max_attempts: config.max_attempts,
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
        }
    }
}

impl ReadinessPolicy {
    /// Upper bound on the duration of one `ensure_ready` call.
    pub fn worst_case_wait(&self) -> Duration {
        self.settle_delay + self.backoff * self.max_attempts
    }

    /// Time a single probe may take. Attempts start one `backoff` apart, so a
    /// probe never runs into the next attempt's slot.
    fn probe_budget(&self) -> Duration {
        if self.backoff.is_zero() {
            self.probe_timeout
        } else {
            self.probe_timeout.min(self.backoff)
        }
    }
}

/// OS-side hooks for finding and starting the companion app.
#[async_trait::async_trait]
pub trait AppLauncher: Send + Sync {
    async fn is_running(&self) -> bool;

    /// Fire-and-forget launch; success can only be observed by polling.
    async fn launch(&self);
}

/// Something that can tell whether the companion API answers.
#[async_trait::async_trait]
pub trait Liveness: Send + Sync {
    async fn is_alive(&self, timeout: Duration) -> bool;
}

/// Looks the app up in the process list and opens it via its URI scheme.
pub struct SystemLauncher {
    process_name: String,
    launch_uri: String,
}

impl SystemLauncher {
    pub fn new(config: &ObsidianConfig) -> Self {
        Self {
            process_name: config.process_name.clone(),
            launch_uri: config.launch_uri.clone(),
        }
    }
}

#[async_trait::async_trait]
impl AppLauncher for SystemLauncher {
    async fn is_running(&self) -> bool {
        let output = if cfg!(target_os = "windows") {
            let filter = format!("IMAGENAME eq {}", self.process_name);
            Command::new("tasklist")
                .args(["/FI", filter.as_str(), "/NH"])
                .output()
                .await
        } else {
            Command::new("pgrep")
                .args(["-x", self.process_name.as_str()])
                .output()
                .await
        };

        match output {
            Ok(output) if cfg!(target_os = "windows") => {
                let stdout = String::from_utf8_lossy(&output.stdout).to_lowercase();
                stdout.contains(&self.process_name.to_lowercase())
            }
            Ok(output) => output.status.success(),
            Err(e) => {
                log::debug!("Process lookup for {} failed: {}", self.process_name, e);
                false
            }
        }
    }

    async fn launch(&self) {
        if let Err(e) = open::that_detached(&self.launch_uri) {
            log::warn!("Failed to open {}: {}", self.launch_uri, e);
        }
    }
}

pub struct ReadinessProber {
    policy: ReadinessPolicy,
    launcher: Arc<dyn AppLauncher>,
}

impl ReadinessProber {
    pub fn new(policy: ReadinessPolicy, launcher: Arc<dyn AppLauncher>) -> Self {
        Self { policy, launcher }
    }

    pub fn policy(&self) -> &ReadinessPolicy {
        &self.policy
    }

    /// Launch the app if needed, then poll until it answers or the attempt
    /// budget runs out. Never fails: returns `Ready` or `Unreachable`, and
    /// nothing is cached between calls.
    pub async fn ensure_ready(&self, liveness: &dyn Liveness) -> ReadinessState {
        let mut state = ReadinessState::Unknown;

        if !self.launcher.is_running().await {
            state = self.transition(state, ReadinessState::Launching);
            log::info!(
                "Obsidian is not running. Launching (waiting up to {:?})...",
                self.policy.worst_case_wait()
            );
            self.launcher.launch().await;
            tokio::time::sleep(self.policy.settle_delay).await;
        }

        state = self.transition(state, ReadinessState::Polling);
        let budget = self.policy.probe_budget();
        for attempt in 1..=self.policy.max_attempts {
            let next_attempt = Instant::now() + self.policy.backoff;
            let alive = tokio::time::timeout(budget, liveness.is_alive(budget))
                .await
                .unwrap_or(false);
            if alive {
                return self.transition(state, ReadinessState::Ready);
            }
            log::debug!(
                "Obsidian API not answering (attempt {}/{})",
                attempt,
                self.policy.max_attempts
            );
            if attempt < self.policy.max_attempts {
                tokio::time::sleep_until(next_attempt).await;
            }
        }

        log::warn!(
            "Obsidian API not responding after {} attempt(s)",
            self.policy.max_attempts
        );
        self.transition(state, ReadinessState::Unreachable)
    }

    fn transition(&self, from: ReadinessState, to: ReadinessState) -> ReadinessState {
        log::debug!("Readiness: {:?} -> {:?}", from, to);
        to
    }
}
