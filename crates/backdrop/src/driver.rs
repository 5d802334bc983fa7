use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::backend::GraphicsBackend;
use crate::debounce::Debouncer;
use crate::error::{DrawError, ShaderCompileError};
use crate::host::{DriverHandle, ElementId, FrameToken, ListenerId, MountId};
use crate::types::SurfaceSize;
use crate::uniforms::BackdropUniforms;

/// Rolling frame statistics for one driver.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameStats {
    /// Frames rendered since attach.
    pub frames: u64,
    /// Time between the two most recent frame callbacks.
    pub last_delta: Duration,
    /// Frames per second measured over the last full second.
    pub fps: f32,
    /// Draw attempts that reported an error.
    pub failed_draws: u64,
}

/// Resources and state owned by one attached backdrop.
///
/// Fields are declared in creation order: surface, program, uniforms, frame
/// handle. [`Driver::release`] tears them down in reverse.
pub(crate) struct Driver<B: GraphicsBackend> {
    pub handle: DriverHandle,
    pub mount: MountId,
    pub element: ElementId,
    surface: B::Surface,
    program: B::Program,
    fragment: String,
    size: SurfaceSize,
    pub uniforms: BackdropUniforms,
    pub frame: Option<FrameToken>,
    pub listeners: Vec<ListenerId>,
    pub resize: Debouncer<SurfaceSize>,
    attached_at: Instant,
    last_frame_at: Instant,
    stats: FrameStats,
    last_stats_at: Instant,
    frames_since_stats: u32,
    consecutive_failures: u32,
}

pub(crate) struct DriverParts<B: GraphicsBackend> {
    pub handle: DriverHandle,
    pub mount: MountId,
    pub element: ElementId,
    pub surface: B::Surface,
    pub program: B::Program,
    pub fragment: String,
    pub size: SurfaceSize,
    pub uniforms: BackdropUniforms,
    pub listeners: Vec<ListenerId>,
    pub resize_debounce: Duration,
    pub attached_at: Instant,
}

impl<B: GraphicsBackend> Driver<B> {
    pub fn from_parts(parts: DriverParts<B>) -> Self {
        Self {
            handle: parts.handle,
            mount: parts.mount,
            element: parts.element,
            surface: parts.surface,
            program: parts.program,
            fragment: parts.fragment,
            size: parts.size,
            uniforms: parts.uniforms,
            frame: None,
            listeners: parts.listeners,
            resize: Debouncer::new(parts.resize_debounce),
            attached_at: parts.attached_at,
            last_frame_at: parts.attached_at,
            stats: FrameStats::default(),
            last_stats_at: parts.attached_at,
            frames_since_stats: 0,
            consecutive_failures: 0,
        }
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Body of the frame callback: advance time, draw once.
    pub fn render(&mut self, backend: &mut B, now: Instant) -> Result<(), DrawError> {
        let delta = now.saturating_duration_since(self.last_frame_at);
        self.last_frame_at = now;
        self.uniforms
            .set_time(now.saturating_duration_since(self.attached_at).as_secs_f32());

        self.stats.frames += 1;
        self.stats.last_delta = delta;
        self.frames_since_stats += 1;
        let since_stats = now.saturating_duration_since(self.last_stats_at);
        if since_stats >= Duration::from_secs(1) {
            self.stats.fps = self.frames_since_stats as f32 / since_stats.as_secs_f32();
            self.frames_since_stats = 0;
            self.last_stats_at = now;
            debug!(
                driver = %self.handle,
                fps = self.stats.fps.round(),
                frames = self.stats.frames,
                time = self.uniforms.time(),
                "render stats"
            );
        }
        trace!(driver = %self.handle, delta_ms = delta.as_secs_f64() * 1000.0, "frame");

        let result = backend.draw(&mut self.surface, &self.program, &self.uniforms);
        match &result {
            Ok(()) => {
                if self.consecutive_failures > 0 {
                    debug!(
                        driver = %self.handle,
                        failures = self.consecutive_failures,
                        "drawing recovered"
                    );
                }
                self.consecutive_failures = 0;
            }
            Err(err) => {
                self.stats.failed_draws += 1;
                self.consecutive_failures += 1;
                // Only the first failure of a streak is loud; the loop keeps retrying.
                if self.consecutive_failures == 1 {
                    warn!(driver = %self.handle, error = %err, "draw failed; retrying next frame");
                } else {
                    trace!(driver = %self.handle, error = %err, "draw still failing");
                }
            }
        }
        result
    }

    /// Applies a debounced resize. The surface is reconfigured even when the
    /// size matches the current one.
    pub fn apply_resize(&mut self, backend: &mut B, size: SurfaceSize) {
        backend.resize_surface(&mut self.surface, size);
        self.size = size;
        self.uniforms.set_resolution(size);
        debug!(driver = %self.handle, %size, "surface resized");
    }

    /// Compiles `wrapped` against the current surface and swaps it in. The
    /// old program stays active if compilation fails.
    pub fn replace_program(
        &mut self,
        backend: &mut B,
        vertex: &str,
        fragment: &str,
        wrapped: &str,
    ) -> Result<(), ShaderCompileError> {
        let program = backend.compile_program(&self.surface, vertex, wrapped)?;
        let previous = std::mem::replace(&mut self.program, program);
        backend.release_program(&mut self.surface, previous);
        self.fragment = fragment.to_string();
        Ok(())
    }

    /// Releases GPU resources in reverse creation order.
    pub fn release(self, backend: &mut B) {
        let Self {
            handle,
            mut surface,
            program,
            ..
        } = self;
        backend.release_program(&mut surface, program);
        backend.release_surface(surface);
        debug!(driver = %handle, "released backdrop resources");
    }
}
