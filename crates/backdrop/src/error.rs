use std::fmt;

use crate::host::{DriverHandle, MountId};

/// Pipeline stage a compile diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub(crate) fn naga(self) -> wgpu::naga::ShaderStage {
        match self {
            ShaderStage::Vertex => wgpu::naga::ShaderStage::Vertex,
            ShaderStage::Fragment => wgpu::naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// A shader stage failed to parse, validate, or link.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{stage} shader failed to compile: {diagnostic}")]
pub struct ShaderCompileError {
    pub stage: ShaderStage,
    /// Compiler output, verbatim.
    pub diagnostic: String,
}

impl ShaderCompileError {
    pub fn new(stage: ShaderStage, diagnostic: impl Into<String>) -> Self {
        Self {
            stage,
            diagnostic: diagnostic.into(),
        }
    }

    pub(crate) fn empty_fragment() -> Self {
        Self::new(ShaderStage::Fragment, "fragment shader source is empty")
    }
}

/// No GPU-accelerated drawing context could be obtained.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no GPU drawing context available: {reason}")]
pub struct SurfaceUnavailableError {
    pub reason: String,
}

impl SurfaceUnavailableError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Failures raised by the page host itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("mount point {0} does not exist")]
    UnknownMount(MountId),
    #[error("mount point {0} already hosts a drawing element")]
    MountOccupied(MountId),
    #[error("backdrop {0} is not attached")]
    UnknownDriver(DriverHandle),
    #[error("listener limit of {0} reached")]
    ListenerLimit(usize),
}

/// Everything `attach` can report. All variants leave the mount untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttachError {
    #[error(transparent)]
    ShaderCompile(#[from] ShaderCompileError),
    #[error(transparent)]
    SurfaceUnavailable(#[from] SurfaceUnavailableError),
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Runtime failure of a single draw. The frame loop keeps running.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DrawError {
    #[error("drawing surface was lost")]
    Lost,
    #[error("drawing surface is outdated")]
    Outdated,
    #[error("timed out acquiring the next frame")]
    Timeout,
    #[error("GPU is out of memory")]
    OutOfMemory,
    #[error("draw failed: {0}")]
    Other(String),
}

impl From<wgpu::SurfaceError> for DrawError {
    fn from(value: wgpu::SurfaceError) -> Self {
        match value {
            wgpu::SurfaceError::Lost => DrawError::Lost,
            wgpu::SurfaceError::Outdated => DrawError::Outdated,
            wgpu::SurfaceError::Timeout => DrawError::Timeout,
            wgpu::SurfaceError::OutOfMemory => DrawError::OutOfMemory,
            other => DrawError::Other(format!("{other:?}")),
        }
    }
}
