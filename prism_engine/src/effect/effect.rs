/// Effect trait and runtime parameters

use std::fmt;
use std::sync::Arc;
use crate::error::{Error, Result};
use crate::graphics_device::{Buffer, BufferDesc, BufferUsage, CommandList, GraphicsDevice, MemoryLocation};
use crate::frame::{FrameTargets, RenderContext};
use crate::io::FrameInput;
use crate::engine_warn;

/// Per-frame input handed to `Effect::update`
#[derive(Debug, Clone, Copy)]
pub struct FrameUpdate<'a> {
    pub input: &'a FrameInput,
    /// Ring slot being recorded; its previous submission has completed
    pub slot: usize,
}

/// Value of a runtime parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterValue {
    Bool(bool),
    UInt(u32),
    Float(f32),
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Bool(value) => write!(f, "{}", value),
            ParameterValue::UInt(value) => write!(f, "{}", value),
            ParameterValue::Float(value) => write!(f, "{}", value),
        }
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Bool(value)
    }
}

impl From<u32> for ParameterValue {
    fn from(value: u32) -> Self {
        ParameterValue::UInt(value)
    }
}

impl From<f32> for ParameterValue {
    fn from(value: f32) -> Self {
        ParameterValue::Float(value)
    }
}

/// Named parameter update, usually from a settings UI
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterChange {
    pub name: String,
    pub value: ParameterValue,
}

impl ParameterChange {
    pub fn new(name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        Self { name: name.into(), value: value.into() }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self.value {
            ParameterValue::Bool(value) => Ok(value),
            _ => Err(self.mismatch("a bool")),
        }
    }

    /// Unsigned value in `min..=max`
    pub fn as_u32_in(&self, min: u32, max: u32) -> Result<u32> {
        match self.value {
            ParameterValue::UInt(value) if (min..=max).contains(&value) => Ok(value),
            _ => Err(self.mismatch(&format!("an integer in [{}, {}]", min, max))),
        }
    }

    /// Finite float, integers accepted
    pub fn as_f32(&self) -> Result<f32> {
        match self.value {
            ParameterValue::Float(value) if value.is_finite() => Ok(value),
            ParameterValue::UInt(value) => Ok(value as f32),
            _ => Err(self.mismatch("a finite number")),
        }
    }

    /// Finite float strictly above zero
    pub fn as_positive_f32(&self) -> Result<f32> {
        match self.as_f32() {
            Ok(value) if value > 0.0 => Ok(value),
            _ => Err(self.mismatch("a positive number")),
        }
    }

    fn mismatch(&self, expected: &str) -> Error {
        let message = format!("parameter '{}' = {} is not {}", self.name, self.value, expected);
        engine_warn!("prism::Effect", "{}", message);
        Error::InvalidResource(message)
    }
}

/// What applying a parameter requires from the frame driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildKind {
    /// The post-process graph must be reconfigured
    Topology,
    /// Uniforms were rewritten; nothing else to do
    Parameters,
}

/// Error for a parameter name the effect does not know
pub fn unknown_parameter(effect: &str, change: &ParameterChange) -> Error {
    let message = format!("{} has no parameter '{}'", effect, change.name);
    engine_warn!("prism::Effect", "{}", message);
    Error::InvalidResource(message)
}

/// Host-visible uniform buffer initialized with `bytes`
pub fn uniform_buffer(device: &dyn GraphicsDevice, bytes: &[u8]) -> Result<Arc<dyn Buffer>> {
    let buffer = device.create_buffer(BufferDesc {
        size: bytes.len() as u64,
        usage: BufferUsage::UNIFORM,
        location: MemoryLocation::CpuToGpu,
    })?;
    buffer.update(0, bytes)?;
    Ok(buffer)
}

/// A renderable workload
///
/// Call order: `setup` once, then per frame `update`, `record_compute`,
/// `record_pre_scene`, `record_scene` (inside the scene pass) and
/// `record_post` (after it). `resize` follows every surface rebuild and
/// `shutdown` ends the effect's life with the device idle.
pub trait Effect {
    fn name(&self) -> &str;

    /// Acquire cached shaders and pipelines, create buffers, build the graph
    fn setup(&mut self, ctx: &mut RenderContext, targets: &FrameTargets) -> Result<()>;

    /// Reconfigure the graph for new frame targets
    fn resize(&mut self, ctx: &mut RenderContext, targets: &FrameTargets) -> Result<()>;

    /// Rewrite per-frame uniforms
    fn update(&mut self, ctx: &RenderContext, frame: &FrameUpdate) -> Result<()>;

    /// Record async compute work; false when there is none this frame
    fn record_compute(&mut self, _ctx: &RenderContext, _cmd: &mut dyn CommandList) -> Result<bool> {
        Ok(false)
    }

    /// Commands before the scene pass begins (barriers)
    fn record_pre_scene(&mut self, _ctx: &RenderContext, _cmd: &mut dyn CommandList) -> Result<()> {
        Ok(())
    }

    /// Draws inside the scene pass; returns the number of draw calls
    fn record_scene(&mut self, ctx: &RenderContext, cmd: &mut dyn CommandList, targets: &FrameTargets) -> Result<u32>;

    /// Post-process after the scene pass; returns the number of passes
    fn record_post(&mut self, ctx: &RenderContext, cmd: &mut dyn CommandList, targets: &FrameTargets) -> Result<u32>;

    /// Apply a change and report what it requires
    ///
    /// Unknown names and out-of-range values are `Error::InvalidResource`
    /// and leave the effect unchanged.
    fn apply_parameter(&mut self, ctx: &mut RenderContext, change: &ParameterChange) -> Result<RebuildKind>;

    /// Release every cached handle and graph image
    fn shutdown(&mut self, ctx: &mut RenderContext);
}

#[cfg(test)]
#[path = "effect_tests.rs"]
mod tests;
