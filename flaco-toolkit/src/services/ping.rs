//! ICMP reachability probe backed by the system `ping` binary.

use std::sync::LazyLock;

use log::debug;
use regex::Regex;
use tokio::process::Command;

use crate::error::{ProbeError, ProbeResult};
use crate::types::{PingStatistics, RttSummary};

/// Inter-packet interval passed to `ping -i` (200ms).
const PING_INTERVAL: &str = "0.2";
/// Payload size passed to `ping -s`, in bytes.
const PING_PAYLOAD_BYTES: &str = "1350";

static COUNTS_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(\d+) packets transmitted, (\d+) (?:packets )?received").ok()
});
static LOSS_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)% packet loss").ok());
static RTT_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"= ([\d.]+)/([\d.]+)/([\d.]+)/([\d.]+) ms").ok()
});

/// Send `count` echo requests to `target` and return the statistics block.
///
/// The returned text is the `--- <target> ping statistics ---` header, the
/// packet-loss line and the rtt summary, exactly as printed by `ping`.
pub async fn ping(target: &str, count: u32) -> ProbeResult<String> {
    if count == 0 {
        return Err(ProbeError::ValidationError(
            "Echo request count must be positive".to_string(),
        ));
    }
    if target.starts_with('-') {
        return Err(ProbeError::ValidationError(format!(
            "Unable to ping {target}; check its syntax"
        )));
    }

    debug!("[PING] {target} x{count} (interval {PING_INTERVAL}s, {PING_PAYLOAD_BYTES} bytes)");

    let output = Command::new("ping")
        .arg("-c")
        .arg(count.to_string())
        .args(["-i", PING_INTERVAL, "-s", PING_PAYLOAD_BYTES])
        .arg(target)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ProbeError::PingFailed(format!("failed to run ping: {e}")))?;

    let stdout = String::from_utf8_lossy(&output.stdout);

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = if stderr.trim().is_empty() {
            extract_statistics(&stdout).unwrap_or_else(|| stdout.trim().to_string())
        } else {
            stderr.trim().to_string()
        };
        let status = output
            .status
            .code()
            .map_or_else(|| "signal".to_string(), |code| code.to_string());
        debug!("[PING] {target} exited with {status}");
        return Err(ProbeError::PingFailed(format!(
            "ping {target} returned non-zero exit status {status}: {detail}"
        )));
    }

    extract_statistics(&stdout).ok_or_else(|| {
        ProbeError::PingFailed(format!("no statistics in ping output for {target}"))
    })
}

/// Pull the statistics block out of raw `ping` output: the packet-loss line
/// plus one line of context on each side.
pub fn extract_statistics(output: &str) -> Option<String> {
    let lines: Vec<&str> = output.lines().collect();
    let idx = lines.iter().position(|line| line.contains("packet loss"))?;
    let start = idx.saturating_sub(1);
    let end = (idx + 2).min(lines.len());
    let block = lines[start..end].join("\n");
    Some(block.trim().to_string())
}

fn captures<'t>(re: &LazyLock<Option<Regex>>, text: &'t str) -> Option<regex::Captures<'t>> {
    re.as_ref()?.captures(text)
}

impl PingStatistics {
    /// Parse a statistics block (or full `ping` output).
    ///
    /// Understands both the Linux (`rtt min/avg/max/mdev`) and BSD
    /// (`round-trip min/avg/max/stddev`) summaries. Returns `None` when no
    /// packet-loss line is present.
    pub fn parse(text: &str) -> Option<Self> {
        let loss_caps = captures(&LOSS_RE, text)?;
        let loss = loss_caps.get(0)?.as_str().to_string();
        let loss_percent = loss_caps.get(1)?.as_str().parse().ok()?;

        let (transmitted, received) = captures(&COUNTS_RE, text)
            .and_then(|caps| {
                let transmitted = caps.get(1)?.as_str().parse().ok()?;
                let received = caps.get(2)?.as_str().parse().ok()?;
                Some((transmitted, received))
            })
            .unwrap_or((0, 0));

        let rtt = captures(&RTT_RE, text).and_then(|caps| {
            Some(RttSummary {
                min: caps.get(1)?.as_str().parse().ok()?,
                avg: caps.get(2)?.as_str().parse().ok()?,
                max: caps.get(3)?.as_str().parse().ok()?,
                mdev: caps.get(4)?.as_str().parse().ok()?,
            })
        });

        Some(Self {
            transmitted,
            received,
            loss_percent,
            loss,
            rtt,
        })
    }
}
