use std::fmt::{Display, Formatter};
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::error::PipelineError;

/// Class of device the inference engine executes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Cpu,
    Cuda,
}

impl DeviceClass {
    /// Whether this device is an accelerator (one replica owns the whole device).
    pub fn is_accelerator(&self) -> bool {
        matches!(self, DeviceClass::Cuda)
    }

    /// Resolves a device string, treating `auto` as "CUDA if any CUDA device is visible".
    ///
    /// Unknown strings are rejected; see [`DeviceClass::resolve_lenient`] for the
    /// policy-default behaviour.
    pub fn resolve(device: &str, cuda_device_count: usize) -> Result<Self, PipelineError> {
        match device.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(if cuda_device_count > 0 {
                DeviceClass::Cuda
            } else {
                DeviceClass::Cpu
            }),
            other => other.parse(),
        }
    }

    /// Like [`DeviceClass::resolve`], but anything unrecognised falls into the CPU branch.
    pub fn resolve_lenient(device: &str, cuda_device_count: usize) -> Self {
        match Self::resolve(device, cuda_device_count) {
            Ok(class) => class,
            Err(_) => {
                tracing::warn!(device, "unrecognised device string, using the CPU policy");
                DeviceClass::Cpu
            }
        }
    }
}

impl FromStr for DeviceClass {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "cpu" => Ok(DeviceClass::Cpu),
            "cuda" | "gpu" => Ok(DeviceClass::Cuda),
            other if other.strip_prefix("cuda:").is_some_and(|id| id.parse::<usize>().is_ok()) => {
                Ok(DeviceClass::Cuda)
            }
            _ => Err(PipelineError::Config(format!("unknown device '{s}'"))),
        }
    }
}

impl Display for DeviceClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceClass::Cpu => write!(f, "cpu"),
            DeviceClass::Cuda => write!(f, "cuda"),
        }
    }
}

/// Numeric precision the engine computes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeType {
    Int8,
    Int8Float16,
    Int16,
    Float16,
    Float32,
}

impl FromStr for ComputeType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int8" => Ok(ComputeType::Int8),
            "int8_float16" => Ok(ComputeType::Int8Float16),
            "int16" => Ok(ComputeType::Int16),
            "float16" | "f16" => Ok(ComputeType::Float16),
            "float32" | "float" | "f32" => Ok(ComputeType::Float32),
            _ => Err(PipelineError::Config(format!("unknown compute type '{s}'"))),
        }
    }
}

impl Display for ComputeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ComputeType::Int8 => "int8",
            ComputeType::Int8Float16 => "int8_float16",
            ComputeType::Int16 => "int16",
            ComputeType::Float16 => "float16",
            ComputeType::Float32 => "float32",
        };
        write!(f, "{name}")
    }
}
