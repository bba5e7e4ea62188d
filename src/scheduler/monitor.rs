/*!
 * Advisory resource monitoring.
 *
 * Thresholds never cancel work: crossing one only logs a warning. Readings
 * that are unavailable on the host (no /proc, no nvidia-smi) are skipped.
 */

use log::{debug, warn};
use std::time::Duration;

use crate::app_config::MonitoringConfig;

/// One resource reading
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceSnapshot {
    /// System memory in use (%)
    pub memory_percent: Option<f64>,
    /// Accelerator memory in use (%), highest across devices
    pub accelerator_percent: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ResourceMonitor {
    config: MonitoringConfig,
    accelerator: bool,
}

impl ResourceMonitor {
    pub fn new(config: MonitoringConfig, accelerator: bool) -> Self {
        Self {
            config,
            accelerator,
        }
    }

    /// Run a check every `frequency` sub-batches; `index` is 0-based
    pub fn is_due(&self, index: usize) -> bool {
        index % self.config.frequency.max(1) == 0
    }

    /// Read current usage and warn about crossed thresholds
    pub async fn check_resources(&self, label: &str) -> ResourceSnapshot {
        let memory_percent = match tokio::fs::read_to_string("/proc/meminfo").await {
            Ok(content) => parse_meminfo(&content),
            Err(e) => {
                debug!("Memory reading unavailable: {}", e);
                None
            }
        };

        let accelerator_percent = if self.accelerator {
            read_accelerator_usage().await
        } else {
            None
        };

        let snapshot = ResourceSnapshot {
            memory_percent,
            accelerator_percent,
        };
        self.report(label, &snapshot);
        snapshot
    }

    /// Log the snapshot; returns whether any threshold was crossed
    pub fn report(&self, label: &str, snapshot: &ResourceSnapshot) -> bool {
        let mut alerted = false;

        if let Some(memory) = snapshot.memory_percent {
            debug!("[{}] memory {:.1}%", label, memory);
            if memory > f64::from(self.config.alert_memory_percent) {
                warn!(
                    "[{}] memory usage {:.1}% above alert threshold {}%",
                    label, memory, self.config.alert_memory_percent
                );
                alerted = true;
            }
        }

        if let Some(accelerator) = snapshot.accelerator_percent {
            debug!("[{}] accelerator memory {:.1}%", label, accelerator);
            if accelerator > f64::from(self.config.alert_accelerator_percent) {
                warn!(
                    "[{}] accelerator memory {:.1}% above alert threshold {}%",
                    label, accelerator, self.config.alert_accelerator_percent
                );
                alerted = true;
            }
        }

        alerted
    }

    /// Warn when a unit took longer than the alert threshold
    pub fn check_elapsed(&self, label: &str, elapsed: Duration) -> bool {
        let secs = elapsed.as_secs_f64();
        if secs > self.config.alert_unit_secs {
            warn!(
                "[{}] took {:.2}s, above alert threshold {:.2}s",
                label, secs, self.config.alert_unit_secs
            );
            return true;
        }
        false
    }
}

async fn read_accelerator_usage() -> Option<f64> {
    let output = tokio::process::Command::new("nvidia-smi")
        .args([
            "--query-gpu=memory.used,memory.total",
            "--format=csv,noheader,nounits",
        ])
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }
    parse_nvidia_smi(&String::from_utf8_lossy(&output.stdout))
}

/// Used memory (%) from `/proc/meminfo` content
pub fn parse_meminfo(content: &str) -> Option<f64> {
    let field = |name: &str| {
        content
            .lines()
            .find_map(|line| line.strip_prefix(name))
            .and_then(|rest| rest.trim_start_matches(':').split_whitespace().next())
            .and_then(|value| value.parse::<f64>().ok())
    };

    let total = field("MemTotal")?;
    let available = field("MemAvailable")?;
    if total <= 0.0 {
        return None;
    }
    Some((total - available) / total * 100.0)
}

/// Highest used memory (%) from `nvidia-smi` `used, total` CSV lines
pub fn parse_nvidia_smi(content: &str) -> Option<f64> {
    content
        .lines()
        .filter_map(|line| {
            let mut parts = line.split(',').map(|p| p.trim().parse::<f64>());
            match (parts.next(), parts.next()) {
                (Some(Ok(used)), Some(Ok(total))) if total > 0.0 => Some(used / total * 100.0),
                _ => None,
            }
        })
        .reduce(f64::max)
}
