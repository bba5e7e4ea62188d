/*!
 * One-time execution environment detection.
 *
 * Detection runs once at startup and its result is passed to whoever needs
 * it; nothing re-detects devices later.
 */

use log::{info, warn};
use std::fmt;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::app_config::{DevicePreference, Precision};

/// Upper bound for the derived CPU pool size
pub const MAX_DEFAULT_WORKERS: usize = 8;

/// Device that runs the translation model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda => write!(f, "cuda"),
        }
    }
}

/// What the host offers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionContext {
    pub device: Device,
    pub available_parallelism: usize,
}

impl ExecutionContext {
    /// Detect the device and CPU parallelism
    pub fn detect(preference: DevicePreference) -> Self {
        let available_parallelism = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        let device = match preference {
            DevicePreference::Cpu => Device::Cpu,
            DevicePreference::Auto | DevicePreference::Cuda => {
                if accelerator_present() {
                    Device::Cuda
                } else {
                    if preference == DevicePreference::Cuda {
                        warn!("CUDA requested but no accelerator detected, falling back to CPU");
                    }
                    Device::Cpu
                }
            }
        };

        let context = Self::new(device, available_parallelism);
        info!("Execution context: {}", context);
        context
    }

    pub fn new(device: Device, available_parallelism: usize) -> Self {
        Self {
            device,
            available_parallelism: available_parallelism.max(1),
        }
    }

    pub fn has_accelerator(&self) -> bool {
        self.device == Device::Cuda
    }

    /// Pool size when none is configured: one worker saturates an
    /// accelerator; on CPU, never more workers than cores, pending units or
    /// `MAX_DEFAULT_WORKERS`.
    pub fn default_workers(&self, pending: usize) -> usize {
        if self.has_accelerator() {
            return 1;
        }
        self.available_parallelism
            .min(pending)
            .min(MAX_DEFAULT_WORKERS)
            .max(1)
    }

    /// Half precision needs an accelerator
    pub fn effective_precision(&self, requested: Precision) -> Precision {
        if requested == Precision::Half && !self.has_accelerator() {
            warn!("Half precision requested without an accelerator, using full precision");
            return Precision::Full;
        }
        requested
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "device={}, cpus={}",
            self.device, self.available_parallelism
        )
    }
}

fn accelerator_present() -> bool {
    if Path::new("/dev/nvidia0").exists() {
        return true;
    }

    Command::new("nvidia-smi")
        .arg("-L")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
