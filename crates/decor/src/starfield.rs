use rand::Rng;
use serde::Serialize;
use siteconfig::StarfieldConfig;

use crate::{chance, sample, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StarAnimation {
    Still,
    /// Fades out and back in, looping.
    Blink { duration: f64 },
    /// Brightens slightly and reverses, looping.
    Twinkle { duration: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Star {
    pub id: usize,
    /// Percent of viewport width.
    pub x: f64,
    /// Percent of viewport height.
    pub y: f64,
    pub size: f64,
    pub opacity: f64,
    pub animation: StarAnimation,
}

pub fn star_count(viewport: Viewport, config: &StarfieldConfig) -> usize {
    if config.density <= 0.0 {
        return 0;
    }
    (viewport.area() / config.density).floor() as usize
}

/// Scatters `floor(area / density)` stars across the viewport.
///
/// Blinking wins over twinkling when a star rolls both.
pub fn generate<R: Rng + ?Sized>(
    viewport: Viewport,
    config: &StarfieldConfig,
    rng: &mut R,
) -> Vec<Star> {
    (0..star_count(viewport, config))
        .map(|id| {
            let x = rng.gen::<f64>() * 100.0;
            let y = rng.gen::<f64>() * 100.0;
            let size = sample(config.size, rng);
            let opacity = sample(config.opacity, rng);
            let blink = chance(config.blink_probability, rng);
            let blink_duration = sample(config.blink_duration, rng);
            let twinkle = chance(config.twinkle_probability, rng);
            let twinkle_duration = sample(config.twinkle_duration, rng);
            let animation = if blink {
                StarAnimation::Blink {
                    duration: blink_duration,
                }
            } else if twinkle {
                StarAnimation::Twinkle {
                    duration: twinkle_duration,
                }
            } else {
                StarAnimation::Still
            };
            Star {
                id,
                x,
                y,
                size,
                opacity,
                animation,
            }
        })
        .collect()
}
