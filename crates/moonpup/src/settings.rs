use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use backdrop::{BackdropConfig, PowerPreference, SurfaceAlpha, SurfaceSize};
use siteconfig::{PowerSetting, SiteConfig};

use crate::paths::AppPaths;

/// Site configuration plus the directory relative paths resolve against.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config: SiteConfig,
    /// Directory holding the configuration file, or the default config dir.
    pub base_dir: PathBuf,
    /// File the configuration was read from; `None` when running on defaults.
    pub source: Option<PathBuf>,
}

impl Settings {
    /// Loads `explicit`, or `moonpup.toml` from the config directory.
    ///
    /// A missing discovered file yields defaults; a missing explicit file is
    /// an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let config = read_config(path)?;
            let base_dir = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            return Ok(Self {
                config,
                base_dir,
                source: Some(path.to_path_buf()),
            });
        }

        let paths = AppPaths::discover()?;
        let path = paths.config_file();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no configuration file; using defaults");
            return Ok(Self::defaults(paths.config_dir().to_path_buf()));
        }
        let config = read_config(&path)?;
        Ok(Self {
            config,
            base_dir: paths.config_dir().to_path_buf(),
            source: Some(path),
        })
    }

    pub fn defaults(base_dir: PathBuf) -> Self {
        Self {
            config: SiteConfig::default(),
            base_dir,
            source: None,
        }
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Preview window configuration, with `size` overriding the configured
    /// window dimensions.
    pub fn backdrop_config(&self, size: Option<SurfaceSize>) -> BackdropConfig {
        let section = &self.config.backdrop;
        BackdropConfig {
            window_size: size.unwrap_or(SurfaceSize::new(section.width, section.height)),
            title: section.title.clone(),
            resize_debounce: section.resize_debounce,
            power_preference: match section.power {
                PowerSetting::Low => PowerPreference::Low,
                PowerSetting::High => PowerPreference::High,
            },
            surface_alpha: if section.transparent {
                SurfaceAlpha::Transparent
            } else {
                SurfaceAlpha::Opaque
            },
        }
    }
}

fn read_config(path: &Path) -> Result<SiteConfig> {
    let raw = fs::read_to_string(path).map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            anyhow::anyhow!("configuration file {} does not exist", path.display())
        } else {
            anyhow::Error::new(err)
                .context(format!("failed to read configuration {}", path.display()))
        }
    })?;
    let config = SiteConfig::from_toml_str(&raw)
        .with_context(|| format!("invalid configuration {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::tests::{env_lock, EnvGuard};
    use crate::paths::ENV_CONFIG_DIR;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn missing_discovered_file_yields_defaults() {
        let _lock = env_lock();
        let root = TempDir::new().unwrap();
        let _guard = EnvGuard::set(ENV_CONFIG_DIR, root.path());

        let settings = Settings::load(None).unwrap();
        assert!(settings.source.is_none());
        assert_eq!(settings.base_dir, root.path());
        assert_eq!(settings.config.backdrop.width, 1280);
    }

    #[test]
    fn discovered_file_is_parsed() {
        let _lock = env_lock();
        let root = TempDir::new().unwrap();
        fs::write(
            root.path().join("moonpup.toml"),
            "[backdrop]\nwidth = 640\nheight = 480\nresize_debounce = \"250ms\"\n",
        )
        .unwrap();
        let _guard = EnvGuard::set(ENV_CONFIG_DIR, root.path());

        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.source, Some(root.path().join("moonpup.toml")));
        let backdrop = settings.backdrop_config(None);
        assert_eq!(backdrop.window_size, SurfaceSize::new(640, 480));
        assert_eq!(backdrop.resize_debounce, Duration::from_millis(250));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let root = TempDir::new().unwrap();
        let err = Settings::load(Some(&root.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn explicit_file_sets_base_dir() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("site.toml");
        fs::write(&path, "[backdrop]\nshader = \"shaders/nebula.frag\"\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.base_dir, root.path());
        assert_eq!(
            settings.resolve(Path::new("shaders/nebula.frag")),
            root.path().join("shaders/nebula.frag")
        );
    }

    #[test]
    fn invalid_file_reports_path() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("broken.toml");
        fs::write(&path, "[starfield]\ndensity = 0\n").unwrap();
        let err = Settings::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn size_flag_and_power_map_onto_backdrop() {
        let mut settings = Settings::defaults(PathBuf::from("."));
        settings.config.backdrop.power = PowerSetting::Low;
        settings.config.backdrop.transparent = false;

        let backdrop = settings.backdrop_config(Some(SurfaceSize::new(320, 200)));
        assert_eq!(backdrop.window_size, SurfaceSize::new(320, 200));
        assert_eq!(backdrop.power_preference, PowerPreference::Low);
        assert_eq!(backdrop.surface_alpha, SurfaceAlpha::Opaque);
        assert_eq!(backdrop.title, "MoonPup");
    }
}
