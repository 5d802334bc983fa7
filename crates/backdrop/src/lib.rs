//! Animated shader backdrop for the MoonPup landing page.
//!
//! A [`Page`] hosts mount points and drives any number of backdrops, each of
//! which owns a drawing surface, a compiled full-screen program and three
//! uniforms (`uTime`, `uResolution`, `uMouse`). The flow is:
//!
//! ```text
//!   caller fragment (WebGL-style GLSL)
//!          │ compile::wrap_fragment
//!          ▼
//!   Page::attach ──▶ GraphicsBackend::{create_surface, compile_program}
//!          │                                   │
//!          ▼                                   ▼
//!   frame queue ──▶ Page::run_frame ──▶ Driver::render ──▶ GraphicsBackend::draw
//!          ▲
//!          └── viewport_resized (debounced) / pointer_moved
//! ```
//!
//! [`GraphicsBackend`] is the seam between lifecycle and GPU. [`WgpuBackend`]
//! draws into a real window through `wgpu`; tests substitute a recording
//! backend. [`window::run`] wires a winit event loop to a single
//! full-viewport backdrop for local previews.

mod backend;
pub mod compile;
mod debounce;
mod driver;
mod error;
pub mod gpu;
mod host;
mod types;
mod uniforms;
pub mod window;

pub use backend::GraphicsBackend;
pub use debounce::Debouncer;
pub use driver::FrameStats;
pub use error::{
    AttachError, DrawError, HostError, ShaderCompileError, ShaderStage, SurfaceUnavailableError,
};
pub use gpu::WgpuBackend;
pub use host::{
    DriverHandle, ElementId, FrameToken, ListenerId, ListenerKind, MountId, MountLayout,
    MountPoint, Page, PageOptions,
};
pub use types::{
    BackdropConfig, PowerPreference, Rect, SurfaceAlpha, SurfaceSize, DEFAULT_RESIZE_DEBOUNCE,
};
pub use uniforms::{surface_pointer, BackdropUniforms};
