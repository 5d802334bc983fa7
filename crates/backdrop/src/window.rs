use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info, trace};
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use crate::gpu::WgpuBackend;
use crate::host::{MountLayout, Page, PageOptions};
use crate::types::{BackdropConfig, SurfaceAlpha, SurfaceSize};

/// Opens a preview window and runs one full-viewport backdrop until it closes.
///
/// Window events are forwarded to the [`Page`] the same way a browser would
/// deliver them to the page's listeners:
///
/// - `Resized` feeds the debounced viewport resize.
/// - `CursorMoved` feeds `uMouse`.
/// - `RedrawRequested` runs one animation-frame batch.
/// - `AboutToWait` fires due timers and requests the next redraw.
pub fn run(config: &BackdropConfig, fragment: &str) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.title.clone())
            .with_inner_size(PhysicalSize::new(
                config.window_size.width,
                config.window_size.height,
            ))
            .with_transparent(config.surface_alpha == SurfaceAlpha::Transparent)
            .build(&event_loop)
            .context("failed to create preview window")?,
    );

    let inner = window.inner_size();
    let viewport = SurfaceSize::new(inner.width, inner.height);
    let backend = WgpuBackend::new(
        Arc::clone(&window),
        config.power_preference,
        config.surface_alpha,
    );
    let options = PageOptions {
        resize_debounce: config.resize_debounce,
        ..PageOptions::default()
    };
    let mut page = Page::with_options(backend, viewport, options);
    let mount = page.add_mount(MountLayout::FillViewport);
    let handle = page
        .attach(mount, fragment, Instant::now())
        .context("failed to attach backdrop")?;
    info!(%viewport, "preview window ready");
    window.request_redraw();

    let run_result = event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                page.detach(handle);
                elwt.exit();
            }
            WindowEvent::Resized(size) => {
                page.viewport_resized(SurfaceSize::new(size.width, size.height), Instant::now());
            }
            WindowEvent::CursorMoved { position, .. } => {
                page.pointer_moved(position.x, position.y);
            }
            WindowEvent::RedrawRequested => {
                let rendered = page.run_frame(Instant::now());
                trace!(rendered, "frame batch complete");
            }
            _ => {}
        },
        Event::AboutToWait => {
            let now = Instant::now();
            let resized = page.advance_timers(now);
            if resized > 0 {
                debug!(resized, "applied debounced resize");
            }
            if page.has_scheduled_frames() {
                window.request_redraw();
            }
            match page.next_deadline() {
                Some(deadline) => elwt.set_control_flow(ControlFlow::WaitUntil(deadline)),
                None => elwt.set_control_flow(ControlFlow::Wait),
            }
        }
        _ => {}
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}
