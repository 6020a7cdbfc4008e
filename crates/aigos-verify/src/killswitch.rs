//! Kill-switch live-test sub-protocol.
//!
//! Sends a signed `TEST` command over each declared emergency-stop channel
//! and measures the end-to-end acknowledgement latency. A channel passes
//! iff the agent echoes the matching `test_id` within the timeout.
//!
//! The protocol is deliberately serial: channels are tested one after
//! another, and multi-iteration runs wait 100 ms between rounds, so the
//! latency numbers stay attributable and the test never congests itself.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, timeout, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use aigos_core::constants::{KILL_SWITCH_ITERATION_GAP_MS, KILL_SWITCH_TIMEOUT_MS};
use aigos_core::GovernanceError;
use aigos_crypto::Es256KeyPair;

// ── Wire types ───────────────────────────────────────────────────────────────

/// An emergency-stop delivery channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelKind {
    #[serde(rename = "SSE")]
    Sse,
    #[serde(rename = "WEBSOCKET")]
    WebSocket,
    #[serde(rename = "POLLING")]
    Polling,
    #[serde(rename = "LOCAL_FILE")]
    LocalFile,
}

/// The signed test command sent over a channel.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestCommand {
    #[serde(rename = "type")]
    pub command_type: String,
    pub test_id: String,
    pub timestamp: String,
    /// `ES256:<base64url>` over the canonical `test_id`/`timestamp` pair.
    pub signature: String,
}

static TEST_SEQ: AtomicU64 = AtomicU64::new(0);

impl TestCommand {
    /// Build and sign a fresh test command.
    pub fn signed(signer: &Es256KeyPair) -> Result<Self, GovernanceError> {
        let test_id = format!(
            "kst-{}-{}",
            Utc::now().timestamp_millis(),
            TEST_SEQ.fetch_add(1, Ordering::Relaxed)
        );
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let canonical = aigos_crypto::canonical(&[
            ("test_id", aigos_crypto::Value::Text(&test_id)),
            ("timestamp", aigos_crypto::Value::Timestamp(&timestamp)),
        ])?;
        let signature = format!("ES256:{}", signer.sign_b64(canonical.as_bytes()));
        Ok(Self { command_type: "TEST".to_string(), test_id, timestamp, signature })
    }
}

/// The agent's response to a test command.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub test_id: String,
}

/// A live emergency-stop channel under test.
#[async_trait]
pub trait KillSwitchChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// Deliver the command and wait for the agent's acknowledgement.
    async fn send_test(&self, command: &TestCommand) -> Result<Acknowledgement, GovernanceError>;
}

// ── Configuration & results ──────────────────────────────────────────────────

pub struct LiveTestConfig {
    pub channels: Vec<Arc<dyn KillSwitchChannel>>,
    pub timeout_ms: u64,
    pub signer: Arc<Es256KeyPair>,
}

impl LiveTestConfig {
    pub fn new(channels: Vec<Arc<dyn KillSwitchChannel>>, signer: Arc<Es256KeyPair>) -> Self {
        Self { channels, timeout_ms: KILL_SWITCH_TIMEOUT_MS, signer }
    }
}

/// Outcome of one channel round-trip.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChannelOutcome {
    pub channel: ChannelKind,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    pub detail: String,
}

/// Report for one test iteration across all channels.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChannelReport {
    pub test_id: String,
    pub outcomes: Vec<ChannelOutcome>,
    /// Overall success: any channel succeeded.
    pub success: bool,
}

/// Latency statistics over a multi-iteration run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Aggregate {
    pub iterations: usize,
    /// Successful channel round-trips across all iterations.
    pub passed: usize,
    pub failed: usize,
    pub p50_ms: u64,
    pub p99_ms: u64,
    pub min_ms: u64,
    pub max_ms: u64,
    pub success: bool,
}

// ── Protocol ─────────────────────────────────────────────────────────────────

/// Run one test iteration: sign a command, deliver it over every channel in
/// declaration order, and report per-channel outcomes.
///
/// Cancellation returns `Cancelled` immediately; a channel timeout is a
/// failed outcome, not an error.
pub async fn execute(
    config: &LiveTestConfig,
    cancel: &CancellationToken,
) -> Result<ChannelReport, GovernanceError> {
    let command = TestCommand::signed(&config.signer)?;
    let deadline = Duration::from_millis(config.timeout_ms);
    let mut outcomes = Vec::with_capacity(config.channels.len());

    for channel in &config.channels {
        if cancel.is_cancelled() {
            return Err(GovernanceError::Cancelled);
        }
        let started = Instant::now();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GovernanceError::Cancelled),
            result = timeout(deadline, channel.send_test(&command)) => result,
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let outcome = match result {
            Ok(Ok(ack)) if ack.test_id == command.test_id => ChannelOutcome {
                channel: channel.kind(),
                passed: true,
                latency_ms: Some(elapsed_ms),
                detail: format!("acknowledged in {elapsed_ms} ms"),
            },
            Ok(Ok(ack)) => ChannelOutcome {
                channel: channel.kind(),
                passed: false,
                latency_ms: Some(elapsed_ms),
                detail: format!(
                    "acknowledgement test_id '{}' does not match '{}'",
                    ack.test_id, command.test_id
                ),
            },
            Ok(Err(err)) => ChannelOutcome {
                channel: channel.kind(),
                passed: false,
                latency_ms: None,
                detail: format!("channel error: {err}"),
            },
            Err(_) => ChannelOutcome {
                channel: channel.kind(),
                passed: false,
                latency_ms: None,
                detail: format!("no acknowledgement within {} ms", config.timeout_ms),
            },
        };
        if !outcome.passed {
            warn!(channel = ?outcome.channel, detail = %outcome.detail, "kill-switch channel failed");
        }
        outcomes.push(outcome);
    }

    let success = outcomes.iter().any(|o| o.passed);
    debug!(test_id = %command.test_id, success, "kill-switch iteration complete");
    Ok(ChannelReport { test_id: command.test_id, outcomes, success })
}

/// Run `iterations` serial test rounds with a 100 ms gap between rounds and
/// aggregate the latency distribution of all successful round-trips.
pub async fn execute_multiple(
    config: &LiveTestConfig,
    iterations: usize,
    cancel: &CancellationToken,
) -> Result<Aggregate, GovernanceError> {
    let mut latencies: Vec<u64> = Vec::new();
    let mut passed = 0usize;
    let mut failed = 0usize;
    let mut any_success = false;

    for round in 0..iterations {
        if round > 0 {
            sleep(Duration::from_millis(KILL_SWITCH_ITERATION_GAP_MS)).await;
        }
        let report = execute(config, cancel).await?;
        any_success |= report.success;
        for outcome in report.outcomes {
            if outcome.passed {
                passed += 1;
                if let Some(ms) = outcome.latency_ms {
                    latencies.push(ms);
                }
            } else {
                failed += 1;
            }
        }
    }

    latencies.sort_unstable();
    Ok(Aggregate {
        iterations,
        passed,
        failed,
        p50_ms: percentile(&latencies, 50),
        p99_ms: percentile(&latencies, 99),
        min_ms: latencies.first().copied().unwrap_or(0),
        max_ms: latencies.last().copied().unwrap_or(0),
        success: any_success,
    })
}

/// Nearest-rank percentile over an ascending-sorted slice.
fn percentile(sorted: &[u64], p: u64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let rank = (p as usize * sorted.len()).div_ceil(100);
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}
