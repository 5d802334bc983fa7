use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Closed numeric range written as a two-element array, e.g. `size = [0.5, 3.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Span {
    pub min: f64,
    pub max: f64,
}

impl Span {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    fn is_ordered(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

impl From<[f64; 2]> for Span {
    fn from([min, max]: [f64; 2]) -> Self {
        Self::new(min, max)
    }
}

impl From<Span> for [f64; 2] {
    fn from(span: Span) -> Self {
        [span.min, span.max]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerSetting {
    Low,
    #[default]
    High,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub backdrop: BackdropSection,
    #[serde(default)]
    pub starfield: StarfieldConfig,
    #[serde(default)]
    pub shooting_stars: ShootingStarsConfig,
    #[serde(default)]
    pub floating: FloatingConfig,
    #[serde(default)]
    pub coins: CoinsConfig,
    #[serde(default = "default_fonts")]
    pub fonts: Vec<FontFace>,
    #[serde(default)]
    pub fonts_policy: FontsPolicy,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            backdrop: BackdropSection::default(),
            starfield: StarfieldConfig::default(),
            shooting_stars: ShootingStarsConfig::default(),
            floating: FloatingConfig::default(),
            coins: CoinsConfig::default(),
            fonts: default_fonts(),
            fonts_policy: FontsPolicy::default(),
        }
    }
}

/// Preview window and shader driver settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackdropSection {
    pub width: u32,
    pub height: u32,
    pub title: String,
    #[serde(deserialize_with = "deserialize_duration")]
    pub resize_debounce: Duration,
    pub power: PowerSetting,
    pub transparent: bool,
    /// Fragment shader file; the bundled cosmic shader is used when unset.
    pub shader: Option<PathBuf>,
}

impl Default for BackdropSection {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "MoonPup".to_string(),
            resize_debounce: Duration::from_millis(100),
            power: PowerSetting::default(),
            transparent: true,
            shader: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StarfieldConfig {
    /// Viewport area in px² per star.
    pub density: f64,
    pub size: Span,
    pub opacity: Span,
    pub blink_probability: f64,
    pub blink_duration: Span,
    pub twinkle_probability: f64,
    pub twinkle_duration: Span,
}

impl Default for StarfieldConfig {
    fn default() -> Self {
        Self {
            density: 10_000.0,
            size: Span::new(0.5, 3.0),
            opacity: Span::new(0.3, 1.0),
            blink_probability: 0.3,
            blink_duration: Span::new(2.0, 5.0),
            twinkle_probability: 0.5,
            twinkle_duration: Span::new(5.0, 15.0),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShootingStarsConfig {
    /// Seconds between spawns.
    pub interval: Span,
    /// Start position in percent of the viewport.
    pub start_x: Span,
    pub start_y: Span,
    /// Degrees below the horizontal.
    pub angle: Span,
    pub size: Span,
    pub tail_length: Span,
    /// Flight time in seconds.
    pub duration: Span,
    /// Extra time a finished star stays around before removal.
    #[serde(deserialize_with = "deserialize_duration")]
    pub linger: Duration,
}

impl Default for ShootingStarsConfig {
    fn default() -> Self {
        Self {
            interval: Span::new(5.0, 15.0),
            start_x: Span::new(10.0, 40.0),
            start_y: Span::new(0.0, 30.0),
            angle: Span::new(15.0, 45.0),
            size: Span::new(2.0, 4.0),
            tail_length: Span::new(40.0, 100.0),
            duration: Span::new(0.7, 1.5),
            linger: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FloatingConfig {
    pub count: usize,
    pub images: Vec<String>,
    pub position: Span,
    pub size: Span,
    pub rotation: Span,
    pub loop_duration: Span,
    pub delay: Span,
    /// Vertical bob amplitude in px.
    pub bob: f64,
}

impl Default for FloatingConfig {
    fn default() -> Self {
        Self {
            count: 5,
            images: vec![
                "moonpup_sticker_nobg.png".to_string(),
                "moonpup_sticker_nobg01.png".to_string(),
                "moonpup_sticker_nobg02.png".to_string(),
            ],
            position: Span::new(10.0, 90.0),
            size: Span::new(80.0, 200.0),
            rotation: Span::new(-15.0, 15.0),
            loop_duration: Span::new(12.0, 20.0),
            delay: Span::new(0.0, 5.0),
            bob: 30.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoinsConfig {
    pub count: usize,
    pub kinds: Vec<String>,
    /// Candidate edge lengths in px.
    pub sizes: Vec<u32>,
    pub duration: Span,
    pub delay: Span,
}

impl Default for CoinsConfig {
    fn default() -> Self {
        Self {
            count: 12,
            kinds: [
                "mpup_main",
                "mpup_stack",
                "mpup_community",
                "mpup_meme",
                "mpup_dao",
                "mpup_gold",
                "mpup_silver",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            sizes: vec![32, 48, 96],
            duration: Span::new(15.0, 45.0),
            delay: Span::new(0.0, 10.0),
        }
    }
}

/// A custom display face the site wants to use.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FontFace {
    pub family: String,
    /// Font file, relative to the configuration directory.
    pub path: PathBuf,
    /// Style variable the resolved stack is published under.
    pub var: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FontsPolicy {
    pub fallback: String,
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
}

impl Default for FontsPolicy {
    fn default() -> Self {
        Self {
            fallback: "Arial, sans-serif".to_string(),
            timeout: Duration::from_secs(1),
        }
    }
}

fn default_version() -> u32 {
    1
}

fn default_fonts() -> Vec<FontFace> {
    [
        ("Revamped", "fonts/Revamped/Revamped-X3q1a.ttf", "--font-revamped"),
        ("NuixyberGlow", "fonts/Nuixyber Glow/NuixyberGlow-x3KP8.ttf", "--font-glow"),
        (
            "NuixyberGlowNext",
            "fonts/Nuixyber Glow/NuixyberGlowNext-3zWjZ.ttf",
            "--font-glow-next",
        ),
    ]
    .into_iter()
    .map(|(family, path, var)| FontFace {
        family: family.to_string(),
        path: PathBuf::from(path),
        var: var.to_string(),
    })
    .collect()
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Duration::try_from_secs_f64(v)
                .map_err(|err| E::custom(format!("invalid duration {v}: {err}")))
        }
    }

    deserializer.deserialize_any(Visitor)
}

const MAX_RESIZE_DEBOUNCE: Duration = Duration::from_secs(5);
/// Upper bound for shooting-star interval and flight spans, in seconds.
const MAX_SHOOTING_SECONDS: f64 = 3600.0;
const MAX_SHOOTING_LINGER: Duration = Duration::from_secs(60);
const MAX_FONT_TIMEOUT: Duration = Duration::from_secs(60);

impl SiteConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: SiteConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        let backdrop = &self.backdrop;
        if backdrop.width == 0 || backdrop.height == 0 {
            return Err(ConfigError::Invalid(
                "backdrop width and height must be greater than zero".into(),
            ));
        }
        if backdrop.resize_debounce > MAX_RESIZE_DEBOUNCE {
            return Err(ConfigError::Invalid(format!(
                "backdrop.resize_debounce must be at most {}",
                humantime::format_duration(MAX_RESIZE_DEBOUNCE)
            )));
        }

        let stars = &self.starfield;
        if !(stars.density.is_finite() && stars.density > 0.0) {
            return Err(ConfigError::Invalid(
                "starfield.density must be greater than zero".into(),
            ));
        }
        check_probability("starfield.blink_probability", stars.blink_probability)?;
        check_probability("starfield.twinkle_probability", stars.twinkle_probability)?;
        check_spans(&[
            ("starfield.size", stars.size),
            ("starfield.opacity", stars.opacity),
            ("starfield.blink_duration", stars.blink_duration),
            ("starfield.twinkle_duration", stars.twinkle_duration),
        ])?;
        if stars.opacity.min < 0.0 || stars.opacity.max > 1.0 {
            return Err(ConfigError::Invalid(
                "starfield.opacity must stay within [0, 1]".into(),
            ));
        }

        let shooting = &self.shooting_stars;
        check_spans(&[
            ("shooting_stars.interval", shooting.interval),
            ("shooting_stars.start_x", shooting.start_x),
            ("shooting_stars.start_y", shooting.start_y),
            ("shooting_stars.angle", shooting.angle),
            ("shooting_stars.size", shooting.size),
            ("shooting_stars.tail_length", shooting.tail_length),
            ("shooting_stars.duration", shooting.duration),
        ])?;
        if shooting.interval.min <= 0.0 {
            return Err(ConfigError::Invalid(
                "shooting_stars.interval must be greater than zero".into(),
            ));
        }
        if shooting.duration.min < 0.0 {
            return Err(ConfigError::Invalid(
                "shooting_stars.duration must be non-negative".into(),
            ));
        }
        for (name, span) in [
            ("shooting_stars.interval", shooting.interval),
            ("shooting_stars.duration", shooting.duration),
        ] {
            if span.max > MAX_SHOOTING_SECONDS {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be at most {MAX_SHOOTING_SECONDS} seconds"
                )));
            }
        }
        if shooting.linger > MAX_SHOOTING_LINGER {
            return Err(ConfigError::Invalid(format!(
                "shooting_stars.linger must be at most {}",
                humantime::format_duration(MAX_SHOOTING_LINGER)
            )));
        }

        let floating = &self.floating;
        check_spans(&[
            ("floating.position", floating.position),
            ("floating.size", floating.size),
            ("floating.rotation", floating.rotation),
            ("floating.loop_duration", floating.loop_duration),
            ("floating.delay", floating.delay),
        ])?;
        if floating.count > 0 && floating.images.is_empty() {
            return Err(ConfigError::Invalid(
                "floating.images must list at least one image".into(),
            ));
        }

        let coins = &self.coins;
        check_spans(&[
            ("coins.duration", coins.duration),
            ("coins.delay", coins.delay),
        ])?;
        if coins.count > 0 && (coins.kinds.is_empty() || coins.sizes.is_empty()) {
            return Err(ConfigError::Invalid(
                "coins.kinds and coins.sizes must be non-empty when coins.count > 0".into(),
            ));
        }

        let mut families = BTreeSet::new();
        for font in &self.fonts {
            if font.family.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "fonts entries require a non-empty family".into(),
                ));
            }
            if !families.insert(font.family.to_ascii_lowercase()) {
                return Err(ConfigError::Invalid(format!(
                    "font family '{}' is declared more than once",
                    font.family
                )));
            }
        }
        if self.fonts_policy.fallback.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "fonts_policy.fallback must not be empty".into(),
            ));
        }
        if self.fonts_policy.timeout > MAX_FONT_TIMEOUT {
            return Err(ConfigError::Invalid(format!(
                "fonts_policy.timeout must be at most {}",
                humantime::format_duration(MAX_FONT_TIMEOUT)
            )));
        }

        Ok(())
    }
}

fn check_probability(name: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

fn check_spans(spans: &[(&str, Span)]) -> Result<(), ConfigError> {
    for (name, span) in spans {
        if !span.is_ordered() {
            return Err(ConfigError::Invalid(format!(
                "{name} must be [min, max] with min <= max, got [{}, {}]",
                span.min, span.max
            )));
        }
    }
    Ok(())
}
