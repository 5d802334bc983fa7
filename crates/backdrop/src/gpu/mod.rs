//! `wgpu` implementation of [`GraphicsBackend`].
//!
//! - `context` owns the instance/adapter/device/surface wiring for one window
//!   and reconfigures the swapchain on resize or loss.
//! - `pipeline` validates wrapped GLSL with naga and builds the full-screen
//!   render pipeline inside a validation error scope.
//!
//! A window can host one surface at a time; a second `create_surface` while
//! the first is alive reports [`SurfaceUnavailableError`].

mod context;
mod pipeline;

use std::sync::Arc;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::backend::GraphicsBackend;
use crate::error::{DrawError, ShaderCompileError, SurfaceUnavailableError};
use crate::types::{PowerPreference, SurfaceAlpha, SurfaceSize};
use crate::uniforms::BackdropUniforms;

pub use context::GpuSurface;
pub use pipeline::GpuProgram;

/// GPU backend bound to a single window.
pub struct WgpuBackend<W> {
    instance: wgpu::Instance,
    target: Arc<W>,
    power_preference: PowerPreference,
    surface_alpha: SurfaceAlpha,
    surface_live: bool,
}

impl<W> WgpuBackend<W>
where
    W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
{
    pub fn new(
        target: Arc<W>,
        power_preference: PowerPreference,
        surface_alpha: SurfaceAlpha,
    ) -> Self {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });
        Self {
            instance,
            target,
            power_preference,
            surface_alpha,
            surface_live: false,
        }
    }
}

impl<W> GraphicsBackend for WgpuBackend<W>
where
    W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
{
    type Surface = GpuSurface;
    type Program = GpuProgram;

    fn create_surface(&mut self, size: SurfaceSize) -> Result<GpuSurface, SurfaceUnavailableError> {
        if self.surface_live {
            return Err(SurfaceUnavailableError::new(
                "window already hosts a backdrop surface",
            ));
        }
        let surface = GpuSurface::new(
            &self.instance,
            Arc::clone(&self.target),
            size,
            self.power_preference,
            self.surface_alpha,
        )
        .map_err(|err| SurfaceUnavailableError::new(format!("{err:#}")))?;
        self.surface_live = true;
        Ok(surface)
    }

    fn compile_program(
        &mut self,
        surface: &GpuSurface,
        vertex: &str,
        fragment: &str,
    ) -> Result<GpuProgram, ShaderCompileError> {
        GpuProgram::new(surface, vertex, fragment)
    }

    fn resize_surface(&mut self, surface: &mut GpuSurface, size: SurfaceSize) {
        surface.resize(size);
    }

    fn draw(
        &mut self,
        surface: &mut GpuSurface,
        program: &GpuProgram,
        uniforms: &BackdropUniforms,
    ) -> Result<(), DrawError> {
        surface.draw(program, uniforms)
    }

    fn release_program(&mut self, _surface: &mut GpuSurface, program: GpuProgram) {
        drop(program);
    }

    fn release_surface(&mut self, surface: GpuSurface) {
        drop(surface);
        self.surface_live = false;
    }
}
