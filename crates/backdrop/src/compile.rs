use wgpu::naga;
use wgpu::naga::front::glsl;
use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::error::{ShaderCompileError, ShaderStage};

/// Names the caller's fragment shader reads; their declarations are replaced
/// by the injected uniform block.
const UNIFORM_NAMES: [&str; 3] = ["uTime", "uResolution", "uMouse"];

/// Produces a self-contained Vulkan GLSL fragment shader from caller text.
///
/// Steps performed:
///
/// 1. Strip `#version`, `precision` statements, declarations of the three
///    backdrop uniforms, and the `vUv` varying.
/// 2. Rename `gl_FragColor` to the declared fragment output.
/// 3. Prepend [`HEADER`] which declares the uniform block and maps the
///    WebGL-style names (`uTime`, `vUv`, ...) onto it.
pub fn wrap_fragment(source: &str) -> String {
    let mut sanitized = String::with_capacity(source.len());
    for line in source.lines() {
        let trimmed = line.trim_start();
        let skip = trimmed.starts_with("#version")
            || trimmed.starts_with("precision ")
            || (trimmed.starts_with("uniform ")
                && UNIFORM_NAMES.contains(&declared_name(trimmed)))
            || ((trimmed.starts_with("varying ") || trimmed.starts_with("in "))
                && declared_name(trimmed) == "vUv");
        if skip {
            continue;
        }
        sanitized.push_str(&line.replace("gl_FragColor", FRAG_OUTPUT));
        sanitized.push('\n');
    }

    format!("{HEADER}\n{sanitized}")
}

/// Identifier declared by a single-line `qualifier type name;` statement.
fn declared_name(declaration: &str) -> &str {
    declaration
        .split(';')
        .next()
        .and_then(|body| body.split_whitespace().last())
        .unwrap_or("")
}

/// Parses and validates `source` with naga without touching a GPU.
pub fn validate_stage(
    source: &str,
    stage: ShaderStage,
) -> Result<naga::Module, ShaderCompileError> {
    let mut frontend = glsl::Frontend::default();
    let module = frontend
        .parse(&glsl::Options::from(stage.naga()), source)
        .map_err(|errors| ShaderCompileError::new(stage, errors.emit_to_string(source)))?;

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|err| ShaderCompileError::new(stage, err.emit_to_string(source)))?;

    Ok(module)
}

/// Wraps and validates caller fragment text, returning the wrapped GLSL.
pub fn prepare_fragment(source: &str) -> Result<String, ShaderCompileError> {
    if source.trim().is_empty() {
        return Err(ShaderCompileError::empty_fragment());
    }
    let wrapped = wrap_fragment(source);
    validate_stage(&wrapped, ShaderStage::Fragment)?;
    Ok(wrapped)
}

/// GLSL prologue injected ahead of every backdrop fragment shader.
///
/// The block layout must match [`crate::uniforms::BackdropUniforms`].
const HEADER: &str = r"#version 450
layout(location = 0) in vec2 moonpup_uv;
layout(location = 0) out vec4 moonpup_frag_color;

layout(std140, set = 0, binding = 0) uniform BackdropParams {
    float _uTime;
    vec2 _uResolution;
    vec2 _uMouse;
} backdrop;

#define uTime backdrop._uTime
#define uResolution backdrop._uResolution
#define uMouse backdrop._uMouse
#define vUv moonpup_uv
";

const FRAG_OUTPUT: &str = "moonpup_frag_color";

/// Fixed full-screen quad, two triangles, emitting `vUv` in [0, 1].
pub const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec2 moonpup_uv;

const vec2 positions[6] = vec2[6](
    vec2(-1.0, -1.0),
    vec2(1.0, -1.0),
    vec2(1.0, 1.0),
    vec2(-1.0, -1.0),
    vec2(1.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    moonpup_uv = pos * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

/// Vertex count drawn per frame for [`VERTEX_SHADER_GLSL`].
pub const QUAD_VERTEX_COUNT: u32 = 6;
