//! Execution device selection.

use std::fmt;
use std::str::FromStr;

use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, CoreMLExecutionProvider, ExecutionProvider,
    ExecutionProviderDispatch,
};

use crate::error::{Error, Result};

/// Execution target for model inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Device {
    /// Plain CPU execution.
    Cpu,
    /// NVIDIA GPU through CUDA.
    Gpu,
    /// Apple unified memory through CoreML (GPU / Neural Engine).
    Unified,
}

impl Device {
    /// Preference order used by auto-detection.
    pub const PREFERENCE: [Self; 3] = [Self::Gpu, Self::Unified, Self::Cpu];

    /// Short lowercase name, as accepted on the command line.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Gpu => "gpu",
            Self::Unified => "unified",
        }
    }

    /// Whether this device's execution provider is compiled into ONNX Runtime.
    ///
    /// This does not check that the hardware is present.
    #[must_use]
    pub fn is_available(self) -> bool {
        let available = match self {
            Self::Cpu => return true,
            Self::Gpu => CUDAExecutionProvider::default().is_available(),
            Self::Unified => CoreMLExecutionProvider::default().is_available(),
        };

        available.unwrap_or_else(|err| {
            tracing::debug!("Availability check for {self} failed: {err}");
            false
        })
    }

    /// Execution providers that bind a session to this device.
    ///
    /// Accelerated providers are registered with `error_on_failure` so a device
    /// that cannot be initialized fails the model load instead of silently
    /// running on the CPU.
    #[must_use]
    pub fn execution_providers(self) -> Vec<ExecutionProviderDispatch> {
        match self {
            Self::Cpu => vec![CPUExecutionProvider::default().build()],
            Self::Gpu => vec![CUDAExecutionProvider::default().build().error_on_failure()],
            Self::Unified => vec![CoreMLExecutionProvider::default()
                .with_subgraphs(true)
                .build()
                .error_on_failure()],
        }
    }

    /// Devices to try for this run, in order.
    ///
    /// An explicit request yields just that device. Auto-detection yields every
    /// device whose provider is compiled into ONNX Runtime, in
    /// [`Device::PREFERENCE`] order, always ending with the CPU. A provider being
    /// compiled in does not mean the hardware is present, so callers go through
    /// [`Device::load_first`] to find the one that actually initializes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceUnavailable`] if an explicitly requested device
    /// cannot be used.
    pub fn candidates(requested: Option<Self>) -> Result<Vec<Self>> {
        Self::candidates_with(requested, Self::is_available)
    }

    /// Same as [`Device::candidates`] with a custom availability check.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceUnavailable`] if an explicitly requested device
    /// is reported unavailable.
    pub fn candidates_with<F>(requested: Option<Self>, is_available: F) -> Result<Vec<Self>>
    where
        F: Fn(Self) -> bool,
    {
        match requested {
            Some(device) if is_available(device) => Ok(vec![device]),
            Some(device) => Err(Error::DeviceUnavailable { device }),
            None => Ok(Self::PREFERENCE
                .into_iter()
                .filter(|&device| device == Self::Cpu || is_available(device))
                .collect()),
        }
    }

    /// Run `load` on each candidate until one succeeds.
    ///
    /// A device whose provider fails to register or whose session fails to build
    /// is skipped in favour of the next one. Any other failure (download, cache)
    /// is returned immediately, as is the last device's failure.
    ///
    /// # Errors
    ///
    /// Returns the first non-device error, or the error of the last candidate.
    pub fn load_first<T, F>(candidates: &[Self], mut load: F) -> Result<(Self, T)>
    where
        F: FnMut(Self) -> Result<T>,
    {
        let mut last_err = Error::DeviceUnavailable { device: Self::Cpu };

        for &device in candidates {
            match load(device) {
                Ok(loaded) => return Ok((device, loaded)),
                Err(err @ (Error::ModelLoad { .. } | Error::DeviceUnavailable { .. })) => {
                    tracing::warn!("Could not initialize {device}, trying next device: {err}");
                    last_err = err;
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_err)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "gpu" | "cuda" => Ok(Self::Gpu),
            "unified" | "mps" | "coreml" => Ok(Self::Unified),
            other => Err(format!("unknown device '{other}' (expected cpu, gpu or unified)")),
        }
    }
}
