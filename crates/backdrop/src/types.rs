use std::fmt;
use std::time::Duration;

/// Trailing-edge window applied to viewport resize bursts.
pub const DEFAULT_RESIZE_DEBOUNCE: Duration = Duration::from_millis(100);

/// Pixel dimensions of a drawing surface or mount content box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Size with both axes raised to at least one pixel, as GPU surfaces require.
    pub fn clamped(&self) -> Self {
        Self::new(self.width.max(1), self.height.max(1))
    }
}

impl fmt::Display for SurfaceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Axis-aligned rectangle in page coordinates with a top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Rectangle anchored at the page origin covering `size`.
    pub fn from_size(size: SurfaceSize) -> Self {
        Self::new(0.0, 0.0, f64::from(size.width), f64::from(size.height))
    }

    /// Content box in whole device pixels. Negative extents collapse to zero.
    pub fn pixel_size(&self) -> SurfaceSize {
        SurfaceSize::new(to_pixels(self.width), to_pixels(self.height))
    }

    /// Geometric center in rectangle-local coordinates.
    pub fn local_center(&self) -> [f32; 2] {
        [(self.width / 2.0) as f32, (self.height / 2.0) as f32]
    }
}

fn to_pixels(extent: f64) -> u32 {
    if extent.is_nan() || extent <= 0.0 {
        0
    } else {
        extent.round().min(f64::from(u32::MAX)) as u32
    }
}

/// GPU adapter preference forwarded to `wgpu`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerPreference {
    Low,
    #[default]
    High,
}

/// Declares how the swapchain alpha channel should be composited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceAlpha {
    /// Frames fully cover whatever sits behind the surface.
    Opaque,
    /// Frames may contain transparency and should be blended by the compositor.
    #[default]
    Transparent,
}

/// Immutable configuration for the preview window runtime.
#[derive(Debug, Clone)]
pub struct BackdropConfig {
    /// Initial window size in physical pixels.
    pub window_size: SurfaceSize,
    /// Window title shown by the compositor.
    pub title: String,
    /// Debounce window for viewport resize bursts.
    pub resize_debounce: Duration,
    /// Adapter power preference.
    pub power_preference: PowerPreference,
    /// Alpha behaviour of the swapchain.
    pub surface_alpha: SurfaceAlpha,
}

impl Default for BackdropConfig {
    fn default() -> Self {
        Self {
            window_size: SurfaceSize::new(1280, 720),
            title: "MoonPup Backdrop".to_string(),
            resize_debounce: DEFAULT_RESIZE_DEBOUNCE,
            power_preference: PowerPreference::default(),
            surface_alpha: SurfaceAlpha::default(),
        }
    }
}
