use bytemuck::{Pod, Zeroable};

use crate::types::{Rect, SurfaceSize};

/// CPU mirror of the `BackdropParams` std140 block injected by
/// [`crate::compile::wrap_fragment`].
///
/// ```text
///   offset 0   float uTime
///   offset 8   vec2  uResolution
///   offset 16  vec2  uMouse
///   size   32
/// ```
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BackdropUniforms {
    time: f32,
    padding0: f32,
    resolution: [f32; 2],
    pointer: [f32; 2],
    padding1: [f32; 2],
}

impl BackdropUniforms {
    /// Fresh uniforms for a surface of `size`: time zero, pointer centered.
    pub fn new(size: SurfaceSize) -> Self {
        let mut uniforms = Self::zeroed();
        uniforms.set_resolution(size);
        uniforms.set_pointer(Rect::from_size(size).local_center());
        uniforms
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn resolution(&self) -> [f32; 2] {
        self.resolution
    }

    pub fn pointer(&self) -> [f32; 2] {
        self.pointer
    }

    pub fn set_time(&mut self, seconds: f32) {
        self.time = seconds;
    }

    pub fn set_resolution(&mut self, size: SurfaceSize) {
        self.resolution = [size.width as f32, size.height as f32];
    }

    pub fn set_pointer(&mut self, pointer: [f32; 2]) {
        self.pointer = pointer;
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Maps a page-space pointer event onto surface-local coordinates.
///
/// Input events use a top-left origin; the surface uses bottom-left, so the
/// Y axis is flipped against the mount height.
pub fn surface_pointer(event_x: f64, event_y: f64, mount: &Rect) -> [f32; 2] {
    let x = event_x - mount.left;
    let y = mount.height - (event_y - mount.top);
    [x as f32, y as f32]
}
