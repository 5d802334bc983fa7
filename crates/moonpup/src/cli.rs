use std::path::PathBuf;

use backdrop::SurfaceSize;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "moonpup",
    author,
    version,
    about = "MoonPup animated backdrop",
    arg_required_else_help = false
)]
pub struct Cli {
    /// Configuration file (defaults to `moonpup.toml` in the config directory).
    #[arg(long, global = true, env = "MOONPUP_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// WebGL-style fragment shader to preview; the bundled cosmic shader when omitted.
    #[arg(value_name = "SHADER")]
    pub shader: Option<PathBuf>,

    /// Override the preview window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<SurfaceSize>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate fragment shaders offline without opening a window.
    Check(CheckArgs),
    /// Print a seeded decorative layout as JSON.
    Layout(LayoutArgs),
    /// Load the configured display fonts and print the resolved font stacks.
    Fonts(FontsArgs),
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[arg(value_name = "SHADER", required = true)]
    pub shaders: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct LayoutArgs {
    /// Viewport width in CSS pixels (defaults to `backdrop.width`).
    #[arg(long)]
    pub width: Option<u32>,
    /// Viewport height in CSS pixels (defaults to `backdrop.height`).
    #[arg(long)]
    pub height: Option<u32>,
    /// RNG seed; derived from the clock when omitted.
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Args, Debug)]
pub struct FontsArgs {
    /// Emit the readiness report as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_surface_size(value: &str) -> Result<SurfaceSize, String> {
    let (w, h) = value
        .trim()
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid width '{}'", w.trim()))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid height '{}'", h.trim()))?;
    if width == 0 || height == 0 {
        return Err("window dimensions must be greater than zero".into());
    }
    Ok(SurfaceSize::new(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_surface_size_variants() {
        assert_eq!(
            parse_surface_size("1280x720").unwrap(),
            SurfaceSize::new(1280, 720)
        );
        assert_eq!(
            parse_surface_size(" 800 X 600 ").unwrap(),
            SurfaceSize::new(800, 600)
        );
        assert_eq!(
            parse_surface_size("640×480").unwrap(),
            SurfaceSize::new(640, 480)
        );
        assert!(parse_surface_size("0x720").is_err());
        assert!(parse_surface_size("1280").is_err());
        assert!(parse_surface_size("widexhigh").is_err());
    }

    #[test]
    fn subcommands_parse() {
        let cli = Cli::try_parse_from(["moonpup", "layout", "--width", "800", "--seed", "3"])
            .expect("layout parses");
        match cli.command {
            Some(Command::Layout(args)) => {
                assert_eq!(args.width, Some(800));
                assert_eq!(args.height, None);
                assert_eq!(args.seed, Some(3));
            }
            other => panic!("unexpected command {other:?}"),
        }

        assert!(Cli::try_parse_from(["moonpup", "check"]).is_err());
    }

    #[test]
    fn bare_invocation_previews() {
        let cli = Cli::try_parse_from(["moonpup", "--size", "640x480", "aurora.frag"])
            .expect("run args parse");
        assert!(cli.command.is_none());
        assert_eq!(cli.run.size, Some(SurfaceSize::new(640, 480)));
        assert_eq!(cli.run.shader, Some(PathBuf::from("aurora.frag")));
    }
}
