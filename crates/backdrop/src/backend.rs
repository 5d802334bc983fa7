use crate::error::{DrawError, ShaderCompileError, SurfaceUnavailableError};
use crate::types::SurfaceSize;
use crate::uniforms::BackdropUniforms;

/// Seam between the driver lifecycle and whatever owns the GPU.
///
/// Resources are released by value, so a surface or program cannot be handed
/// back twice. The driver always releases the program before the surface it
/// was compiled against.
pub trait GraphicsBackend {
    type Surface;
    type Program;

    /// Creates a drawing surface at exactly `size` device pixels.
    fn create_surface(
        &mut self,
        size: SurfaceSize,
    ) -> Result<Self::Surface, SurfaceUnavailableError>;

    /// Compiles and links a program for `surface` from already-wrapped GLSL.
    fn compile_program(
        &mut self,
        surface: &Self::Surface,
        vertex: &str,
        fragment: &str,
    ) -> Result<Self::Program, ShaderCompileError>;

    fn resize_surface(&mut self, surface: &mut Self::Surface, size: SurfaceSize);

    /// Issues one full-screen draw with `uniforms` and presents it.
    fn draw(
        &mut self,
        surface: &mut Self::Surface,
        program: &Self::Program,
        uniforms: &BackdropUniforms,
    ) -> Result<(), DrawError>;

    fn release_program(&mut self, surface: &mut Self::Surface, program: Self::Program);

    fn release_surface(&mut self, surface: Self::Surface);
}
