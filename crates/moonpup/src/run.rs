use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use backdrop::compile::prepare_fragment;
use decor::stickers::default_stickers;
use decor::{Decor, StickerBoard, Viewport};
use tracing_subscriber::EnvFilter;

use crate::cli::{FontsArgs, LayoutArgs, RunArgs};
use crate::fonts::{FontLoader, FontReadiness, FontStatus};
use crate::settings::Settings;

/// Shader previewed when neither the command line nor the config names one.
pub const BUNDLED_SHADER: &str = include_str!("../shaders/cosmic.frag");

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Opens the preview window and drives the backdrop until it is closed.
pub fn run(settings: &Settings, args: RunArgs) -> Result<()> {
    let (origin, fragment) = select_shader(settings, &args)?;
    prepare_fragment(&fragment).with_context(|| format!("shader {origin} is invalid"))?;

    let fonts = FontLoader::start(
        settings.config.fonts.clone(),
        &settings.base_dir,
        settings.config.fonts_policy.clone(),
    )?;
    for font in &fonts.readiness().fonts {
        tracing::debug!(var = %font.var, stack = %font.stack, "font stack");
    }

    let config = settings.backdrop_config(args.size);
    tracing::info!(
        shader = %origin,
        size = %config.window_size,
        config = ?settings.source,
        "starting moonpup preview"
    );
    backdrop::window::run(&config, &fragment)
}

/// Validates each shader file offline. Fails if any of them is rejected.
pub fn check(shaders: &[PathBuf]) -> Result<()> {
    let mut failed = 0usize;
    for path in shaders {
        let outcome = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))
            .and_then(|source| prepare_fragment(&source).map_err(anyhow::Error::from));
        match outcome {
            Ok(_) => println!("ok    {}", path.display()),
            Err(err) => {
                failed += 1;
                println!("FAIL  {}", path.display());
                eprintln!("{err:#}");
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} shaders failed validation", shaders.len());
    }
    Ok(())
}

/// Prints one seeded decorative layout as JSON.
pub fn layout(settings: &Settings, args: LayoutArgs) -> Result<()> {
    let section = &settings.config.backdrop;
    let viewport = Viewport::new(
        args.width.unwrap_or(section.width),
        args.height.unwrap_or(section.height),
    );
    let seed = args.seed.unwrap_or_else(clock_seed);

    let (mut stickers, reader) = StickerBoard::new();
    stickers.finish_loading(default_stickers());
    let layout = Decor::new(seed).layout(&settings.config, viewport, &reader);
    tracing::debug!(
        seed,
        stars = layout.stars.len(),
        coins = layout.coins.len(),
        "generated layout"
    );

    let json = if args.pretty {
        serde_json::to_string_pretty(&layout)
    } else {
        serde_json::to_string(&layout)
    }
    .context("failed to serialise layout")?;
    println!("{json}");
    Ok(())
}

pub fn fonts(settings: &Settings, args: FontsArgs) -> Result<()> {
    let loader = FontLoader::start(
        settings.config.fonts.clone(),
        &settings.base_dir,
        settings.config.fonts_policy.clone(),
    )?;
    let readiness = loader.readiness();
    if args.json {
        let json = serde_json::to_string_pretty(readiness).context("failed to serialise fonts")?;
        println!("{json}");
    } else {
        print_fonts(readiness);
    }
    Ok(())
}

fn print_fonts(readiness: &FontReadiness) {
    if readiness.fonts.is_empty() {
        println!("No display fonts configured.");
        return;
    }
    println!("Display fonts (waited {:?}):", readiness.waited);
    for font in &readiness.fonts {
        let status = match &font.status {
            FontStatus::Loaded { .. } => "loaded".to_string(),
            FontStatus::Failed { reason } => format!("failed ({reason})"),
            FontStatus::TimedOut => "timed out".to_string(),
        };
        println!("  {:<18} {:<18} {status}", font.var, font.family);
        println!("  {:<18} -> {}", "", font.stack);
    }
}

fn select_shader(settings: &Settings, args: &RunArgs) -> Result<(String, String)> {
    let path = match (&args.shader, &settings.config.backdrop.shader) {
        (Some(path), _) => path.clone(),
        (None, Some(path)) => settings.resolve(path),
        (None, None) => return Ok(("<bundled cosmic>".to_string(), BUNDLED_SHADER.to_string())),
    };
    let source = fs::read_to_string(&path)
        .with_context(|| format!("failed to read shader {}", path.display()))?;
    Ok((path.display().to_string(), source))
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_shader_validates() {
        prepare_fragment(BUNDLED_SHADER).expect("bundled shader validates");
    }

    #[test]
    fn command_line_shader_wins_over_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let cli_shader = dir.path().join("cli.frag");
        fs::write(&cli_shader, "void main() { gl_FragColor = vec4(1.0); }\n").unwrap();

        let mut settings = Settings::defaults(dir.path().to_path_buf());
        settings.config.backdrop.shader = Some(PathBuf::from("absent.frag"));
        let args = RunArgs {
            shader: Some(cli_shader.clone()),
            size: None,
        };
        let (origin, source) = select_shader(&settings, &args).unwrap();
        assert_eq!(origin, cli_shader.display().to_string());
        assert!(source.contains("gl_FragColor"));
    }

    #[test]
    fn config_shader_resolves_against_base_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("nebula.frag"), "void main() {}\n").unwrap();

        let mut settings = Settings::defaults(dir.path().to_path_buf());
        settings.config.backdrop.shader = Some(PathBuf::from("nebula.frag"));
        let args = RunArgs {
            shader: None,
            size: None,
        };
        let (_, source) = select_shader(&settings, &args).unwrap();
        assert_eq!(source, "void main() {}\n");
    }

    #[test]
    fn falls_back_to_bundled_shader() {
        let settings = Settings::defaults(PathBuf::from("."));
        let args = RunArgs {
            shader: None,
            size: None,
        };
        let (origin, source) = select_shader(&settings, &args).unwrap();
        assert_eq!(origin, "<bundled cosmic>");
        assert_eq!(source, BUNDLED_SHADER);
    }
}
