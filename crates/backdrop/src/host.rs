//! Single-threaded page host.
//!
//! `Page` plays the part a browser window plays for a canvas: it owns the
//! mount points, the window-level listener registry and the animation-frame
//! queue, and it dispatches host events to attached drivers.
//!
//! ```text
//!   viewport_resized ─▶ Resize listeners ─▶ Debouncer ─▶ advance_timers
//!                                                         └▶ resize_surface
//!   pointer_moved    ─▶ PointerMove listeners ─▶ uMouse
//!   run_frame        ─▶ FrameQueue batch ─▶ Driver::render ─▶ reschedule
//! ```
//!
//! Everything runs on the caller's thread; no callback can interleave with
//! another, so `detach` removing a queued frame token is enough to guarantee
//! that the driver never renders again.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::backend::GraphicsBackend;
use crate::compile::{wrap_fragment, VERTEX_SHADER_GLSL};
use crate::driver::{Driver, DriverParts, FrameStats};
use crate::error::{AttachError, HostError, ShaderCompileError};
use crate::types::{Rect, SurfaceSize, DEFAULT_RESIZE_DEBOUNCE};
use crate::uniforms::{surface_pointer, BackdropUniforms};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            pub fn raw(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

id_type!(
    /// Caller-owned region of the page.
    MountId,
    "mount"
);
id_type!(
    /// Token returned by `attach`; names one driver instance.
    DriverHandle,
    "driver"
);
id_type!(
    /// Registration in the window-level listener registry.
    ListenerId,
    "listener"
);
id_type!(
    /// "Render again next frame" registration.
    FrameToken,
    "frame"
);
id_type!(
    /// The drawing element a driver inserts into its mount.
    ElementId,
    "element"
);

/// How a mount point's content box follows the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MountLayout {
    /// Covers the whole viewport, like a fixed full-screen hero background.
    FillViewport,
    /// Fixed rectangle in page coordinates.
    Fixed(Rect),
}

/// A caller-owned region that may host one managed drawing element.
#[derive(Debug, Clone)]
pub struct MountPoint {
    layout: MountLayout,
    caller_children: Vec<String>,
    drawing: Option<ElementId>,
}

impl MountPoint {
    fn new(layout: MountLayout) -> Self {
        Self {
            layout,
            caller_children: Vec::new(),
            drawing: None,
        }
    }

    pub fn layout(&self) -> MountLayout {
        self.layout
    }

    /// Content box for the given viewport.
    pub fn rect(&self, viewport: SurfaceSize) -> Rect {
        match self.layout {
            MountLayout::FillViewport => Rect::from_size(viewport),
            MountLayout::Fixed(rect) => rect,
        }
    }

    pub fn caller_children(&self) -> &[String] {
        &self.caller_children
    }

    pub fn drawing_element(&self) -> Option<ElementId> {
        self.drawing
    }

    pub fn drawing_element_count(&self) -> usize {
        usize::from(self.drawing.is_some())
    }
}

/// Window-level signals a driver can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    Resize,
    PointerMove,
}

#[derive(Debug)]
struct ListenerRegistry {
    limit: usize,
    entries: BTreeMap<ListenerId, (DriverHandle, ListenerKind)>,
}

impl ListenerRegistry {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            entries: BTreeMap::new(),
        }
    }

    fn register(
        &mut self,
        id: ListenerId,
        owner: DriverHandle,
        kind: ListenerKind,
    ) -> Result<ListenerId, HostError> {
        if self.entries.len() >= self.limit {
            return Err(HostError::ListenerLimit(self.limit));
        }
        self.entries.insert(id, (owner, kind));
        Ok(id)
    }

    fn remove(&mut self, id: ListenerId) -> bool {
        self.entries.remove(&id).is_some()
    }

    fn targets(&self, kind: ListenerKind) -> Vec<DriverHandle> {
        self.entries
            .values()
            .filter(|(_, registered)| *registered == kind)
            .map(|(owner, _)| *owner)
            .collect()
    }

    fn count_for(&self, owner: DriverHandle) -> usize {
        self.entries
            .values()
            .filter(|(registered, _)| *registered == owner)
            .count()
    }
}

/// Pending animation-frame registrations, in request order.
#[derive(Debug, Default)]
struct FrameQueue {
    pending: BTreeMap<FrameToken, DriverHandle>,
}

impl FrameQueue {
    fn request(&mut self, token: FrameToken, owner: DriverHandle) -> FrameToken {
        self.pending.insert(token, owner);
        token
    }

    fn cancel(&mut self, token: FrameToken) -> bool {
        self.pending.remove(&token).is_some()
    }

    /// Drains the current batch; requests made while it runs land in the next one.
    fn take_batch(&mut self) -> Vec<(FrameToken, DriverHandle)> {
        std::mem::take(&mut self.pending).into_iter().collect()
    }

    fn count_for(&self, owner: DriverHandle) -> usize {
        self.pending.values().filter(|&&registered| registered == owner).count()
    }

    fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Tunables for a [`Page`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageOptions {
    /// Trailing-edge debounce applied to viewport resize bursts.
    pub resize_debounce: Duration,
    /// Maximum number of window-level listeners the page accepts.
    pub listener_limit: usize,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            resize_debounce: DEFAULT_RESIZE_DEBOUNCE,
            listener_limit: 64,
        }
    }
}

/// Host for any number of backdrop drivers sharing one graphics backend.
pub struct Page<B: GraphicsBackend> {
    backend: B,
    options: PageOptions,
    viewport: SurfaceSize,
    mounts: BTreeMap<MountId, MountPoint>,
    drivers: BTreeMap<DriverHandle, Driver<B>>,
    listeners: ListenerRegistry,
    frames: FrameQueue,
    next_id: u64,
}

impl<B: GraphicsBackend> Page<B> {
    pub fn new(backend: B, viewport: SurfaceSize) -> Self {
        Self::with_options(backend, viewport, PageOptions::default())
    }

    pub fn with_options(backend: B, viewport: SurfaceSize, options: PageOptions) -> Self {
        Self {
            backend,
            options,
            viewport,
            mounts: BTreeMap::new(),
            drivers: BTreeMap::new(),
            listeners: ListenerRegistry::new(options.listener_limit),
            frames: FrameQueue::default(),
            next_id: 1,
        }
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn viewport(&self) -> SurfaceSize {
        self.viewport
    }

    pub fn options(&self) -> PageOptions {
        self.options
    }

    pub fn add_mount(&mut self, layout: MountLayout) -> MountId {
        let id = MountId(self.allocate());
        self.mounts.insert(id, MountPoint::new(layout));
        id
    }

    /// Appends an opaque caller-owned child. Drivers never touch these.
    pub fn add_caller_child(
        &mut self,
        mount: MountId,
        label: impl Into<String>,
    ) -> Result<(), HostError> {
        let point = self
            .mounts
            .get_mut(&mount)
            .ok_or(HostError::UnknownMount(mount))?;
        point.caller_children.push(label.into());
        Ok(())
    }

    /// Changes a mount's layout. Takes effect on the next viewport resize.
    pub fn set_mount_layout(
        &mut self,
        mount: MountId,
        layout: MountLayout,
    ) -> Result<(), HostError> {
        let point = self
            .mounts
            .get_mut(&mount)
            .ok_or(HostError::UnknownMount(mount))?;
        point.layout = layout;
        Ok(())
    }

    pub fn mount(&self, mount: MountId) -> Option<&MountPoint> {
        self.mounts.get(&mount)
    }

    /// Attaches an animated backdrop rendering `fragment` into `mount`.
    ///
    /// Resources are created in dependency order (surface, program, uniforms,
    /// frame handle) and the first frame is only scheduled once all of them
    /// exist. On failure everything created so far is released again and the
    /// mount is left exactly as it was.
    pub fn attach(
        &mut self,
        mount: MountId,
        fragment: &str,
        now: Instant,
    ) -> Result<DriverHandle, AttachError> {
        let rect = {
            let point = self
                .mounts
                .get(&mount)
                .ok_or(HostError::UnknownMount(mount))?;
            if point.drawing.is_some() {
                return Err(HostError::MountOccupied(mount).into());
            }
            point.rect(self.viewport)
        };
        if fragment.trim().is_empty() {
            return Err(ShaderCompileError::empty_fragment().into());
        }

        let size = rect.pixel_size();
        let mut surface = self.backend.create_surface(size)?;
        let wrapped = wrap_fragment(fragment);
        let program = match self
            .backend
            .compile_program(&surface, VERTEX_SHADER_GLSL, &wrapped)
        {
            Ok(program) => program,
            Err(err) => {
                self.backend.release_surface(surface);
                warn!(%mount, error = %err, "backdrop shader failed to compile");
                return Err(err.into());
            }
        };

        let mut uniforms = BackdropUniforms::new(size);
        uniforms.set_pointer(rect.local_center());

        let handle = DriverHandle(self.allocate());
        let mut listeners = Vec::with_capacity(2);
        for kind in [ListenerKind::Resize, ListenerKind::PointerMove] {
            let id = ListenerId(self.allocate());
            match self.listeners.register(id, handle, kind) {
                Ok(id) => listeners.push(id),
                Err(err) => {
                    for id in listeners {
                        self.listeners.remove(id);
                    }
                    self.backend.release_program(&mut surface, program);
                    self.backend.release_surface(surface);
                    warn!(%mount, error = %err, "failed to register backdrop listeners");
                    return Err(err.into());
                }
            }
        }

        let element = ElementId(self.allocate());
        if let Some(point) = self.mounts.get_mut(&mount) {
            point.drawing = Some(element);
        }

        let mut driver = Driver::from_parts(DriverParts {
            handle,
            mount,
            element,
            surface,
            program,
            fragment: fragment.to_string(),
            size,
            uniforms,
            listeners,
            resize_debounce: self.options.resize_debounce,
            attached_at: now,
        });
        let token = FrameToken(self.allocate());
        driver.frame = Some(self.frames.request(token, handle));
        self.drivers.insert(handle, driver);

        info!(%handle, %mount, %size, "backdrop attached");
        Ok(handle)
    }

    /// Tears a driver down. Returns `false` if it was already detached.
    pub fn detach(&mut self, handle: DriverHandle) -> bool {
        let Some(mut driver) = self.drivers.remove(&handle) else {
            debug!(%handle, "detach ignored; driver not attached");
            return false;
        };

        if let Some(token) = driver.frame.take() {
            self.frames.cancel(token);
        }
        for id in driver.listeners.drain(..) {
            self.listeners.remove(id);
        }
        driver.resize.cancel();

        let mount = driver.mount;
        let element = driver.element;
        driver.release(&mut self.backend);

        if let Some(point) = self.mounts.get_mut(&mount) {
            if point.drawing == Some(element) {
                point.drawing = None;
            }
        }
        info!(%handle, %mount, "backdrop detached");
        true
    }

    /// Swaps the fragment shader of an attached driver.
    ///
    /// Returns `Ok(false)` when `fragment` is identical to the current text,
    /// so no recompilation happens. A failed compile keeps the old program.
    pub fn replace_shader(
        &mut self,
        handle: DriverHandle,
        fragment: &str,
    ) -> Result<bool, AttachError> {
        let driver = self
            .drivers
            .get_mut(&handle)
            .ok_or(HostError::UnknownDriver(handle))?;
        if driver.fragment() == fragment {
            return Ok(false);
        }
        if fragment.trim().is_empty() {
            return Err(ShaderCompileError::empty_fragment().into());
        }
        let wrapped = wrap_fragment(fragment);
        driver.replace_program(&mut self.backend, VERTEX_SHADER_GLSL, fragment, &wrapped)?;
        info!(%handle, "backdrop shader replaced");
        Ok(true)
    }

    /// Viewport resize signal. Queues a debounced surface resize per driver.
    pub fn viewport_resized(&mut self, viewport: SurfaceSize, now: Instant) {
        self.viewport = viewport;
        for handle in self.listeners.targets(ListenerKind::Resize) {
            let Some(driver) = self.drivers.get_mut(&handle) else {
                continue;
            };
            let Some(point) = self.mounts.get(&driver.mount) else {
                continue;
            };
            driver.resize.push(point.rect(viewport).pixel_size(), now);
        }
    }

    /// Pointer-move signal in page coordinates (top-left origin).
    pub fn pointer_moved(&mut self, x: f64, y: f64) {
        for handle in self.listeners.targets(ListenerKind::PointerMove) {
            let Some(driver) = self.drivers.get_mut(&handle) else {
                continue;
            };
            let Some(point) = self.mounts.get(&driver.mount) else {
                continue;
            };
            let rect = point.rect(self.viewport);
            driver.uniforms.set_pointer(surface_pointer(x, y, &rect));
        }
    }

    /// Fires debounce timers whose deadline has passed. Returns the number of
    /// surfaces that were resized.
    pub fn advance_timers(&mut self, now: Instant) -> usize {
        let mut resized = 0;
        for driver in self.drivers.values_mut() {
            if let Some(size) = driver.resize.poll(now) {
                driver.apply_resize(&mut self.backend, size);
                resized += 1;
            }
        }
        resized
    }

    /// Earliest pending timer deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.drivers
            .values()
            .filter_map(|driver| driver.resize.deadline())
            .min()
    }

    /// Runs one animation-frame batch. Returns the number of frames rendered.
    ///
    /// Each callback reschedules itself into the next batch, so every
    /// attached driver renders at most once per call.
    pub fn run_frame(&mut self, now: Instant) -> usize {
        let mut rendered = 0;
        for (token, handle) in self.frames.take_batch() {
            let Some(driver) = self.drivers.get_mut(&handle) else {
                continue;
            };
            if driver.frame != Some(token) {
                continue;
            }
            driver.frame = None;
            // Draw failures are logged by the driver; the loop keeps going.
            let _ = driver.render(&mut self.backend, now);
            rendered += 1;

            let next = FrameToken(self.next_id);
            self.next_id += 1;
            driver.frame = Some(self.frames.request(next, handle));
        }
        rendered
    }

    pub fn has_scheduled_frames(&self) -> bool {
        !self.frames.is_empty()
    }

    pub fn is_attached(&self, handle: DriverHandle) -> bool {
        self.drivers.contains_key(&handle)
    }

    pub fn attached_count(&self) -> usize {
        self.drivers.len()
    }

    /// Number of pending frame registrations owned by `handle`.
    pub fn scheduled_frames(&self, handle: DriverHandle) -> usize {
        self.frames.count_for(handle)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.entries.len()
    }

    pub fn listener_count_for(&self, handle: DriverHandle) -> usize {
        self.listeners.count_for(handle)
    }

    pub fn uniforms(&self, handle: DriverHandle) -> Option<BackdropUniforms> {
        self.drivers.get(&handle).map(|driver| driver.uniforms)
    }

    pub fn surface_size(&self, handle: DriverHandle) -> Option<SurfaceSize> {
        self.drivers.get(&handle).map(|driver| driver.size())
    }

    pub fn frame_stats(&self, handle: DriverHandle) -> Option<FrameStats> {
        self.drivers.get(&handle).map(|driver| driver.stats())
    }

    /// Detaches every driver, in handle order.
    pub fn detach_all(&mut self) -> usize {
        let handles: Vec<_> = self.drivers.keys().copied().collect();
        handles
            .into_iter()
            .filter(|handle| self.detach(*handle))
            .count()
    }
}

impl<B: GraphicsBackend> Drop for Page<B> {
    fn drop(&mut self) {
        if !self.drivers.is_empty() {
            debug!(drivers = self.drivers.len(), "page dropped with attached backdrops; detaching");
            self.detach_all();
        }
    }
}
