use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

const BROKEN_SHADER: &str = "void main() { gl_FragColor = vec4(1.0) SYNTAX ERROR }\n";

fn bundled_shader() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders/cosmic.frag")
}

fn moonpup(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_moonpup"))
        .env("MOONPUP_CONFIG_DIR", config_dir)
        .env_remove("MOONPUP_CONFIG")
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("failed to run moonpup")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn check_accepts_bundled_shader() {
    let root = TempDir::new().unwrap();
    let shader = bundled_shader();
    let output = moonpup(root.path(), &["check", shader.to_str().unwrap()]);

    assert!(output.status.success(), "{output:?}");
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("ok"));
}

#[test]
fn check_fails_when_any_shader_is_broken() {
    let root = TempDir::new().unwrap();
    let broken = root.path().join("broken.frag");
    fs::write(&broken, BROKEN_SHADER).unwrap();
    let shader = bundled_shader();

    let output = moonpup(
        root.path(),
        &["check", shader.to_str().unwrap(), broken.to_str().unwrap()],
    );

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("FAIL"));
    assert!(stdout.contains("broken.frag"));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("1 of 2 shaders failed validation"));
}

#[test]
fn layout_is_reproducible_for_a_seed() {
    let root = TempDir::new().unwrap();
    let args = ["layout", "--width", "800", "--height", "600", "--seed", "3"];

    let first = moonpup(root.path(), &args);
    assert!(first.status.success(), "{first:?}");
    let layout = stdout_json(&first);

    assert_eq!(layout["seed"], 3);
    assert_eq!(layout["viewport"]["width"], 800);
    assert_eq!(layout["stars"].as_array().map(Vec::len), Some(48));
    assert_eq!(layout["characters"].as_array().map(Vec::len), Some(5));
    assert_eq!(layout["coins"].as_array().map(Vec::len), Some(12));
    assert_eq!(layout["stickers"].as_array().map(Vec::len), Some(3));

    let second = moonpup(root.path(), &args);
    assert_eq!(stdout_json(&second), layout);
}

#[test]
fn layout_reads_config_file() {
    let root = TempDir::new().unwrap();
    fs::write(
        root.path().join("moonpup.toml"),
        "[backdrop]\nwidth = 400\nheight = 400\n\n\
         [starfield]\ndensity = 4000\n\n\
         [coins]\ncount = 0\n",
    )
    .unwrap();

    let output = moonpup(root.path(), &["layout", "--seed", "9"]);
    assert!(output.status.success(), "{output:?}");
    let layout = stdout_json(&output);
    assert_eq!(layout["stars"].as_array().map(Vec::len), Some(40));
    assert_eq!(layout["coins"].as_array().map(Vec::len), Some(0));
}

#[test]
fn invalid_config_is_reported() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("moonpup.toml"), "[starfield]\nsparkle = true\n").unwrap();

    let output = moonpup(root.path(), &["layout", "--seed", "1"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("moonpup.toml"));
}

#[test]
fn fonts_fall_back_when_files_are_missing() {
    let root = TempDir::new().unwrap();
    let font_dir = root.path().join("fonts/Revamped");
    fs::create_dir_all(&font_dir).unwrap();
    fs::write(
        font_dir.join("Revamped-X3q1a.ttf"),
        [0x00, 0x01, 0x00, 0x00, 0x00, 0x0c, 0x00, 0x80],
    )
    .unwrap();

    let output = moonpup(root.path(), &["fonts", "--json"]);
    assert!(output.status.success(), "{output:?}");
    let report = stdout_json(&output);
    let fonts = report["fonts"].as_array().expect("fonts array");
    assert_eq!(fonts.len(), 3);

    assert_eq!(fonts[0]["family"], "Revamped");
    assert_eq!(fonts[0]["status"]["state"], "loaded");
    assert_eq!(fonts[0]["stack"], "\"Revamped\", Arial, sans-serif");

    assert_eq!(fonts[1]["var"], "--font-glow");
    assert_eq!(fonts[1]["status"]["state"], "failed");
    assert_eq!(fonts[1]["stack"], "Arial, sans-serif");
}
