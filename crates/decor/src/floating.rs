use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use siteconfig::{CoinsConfig, FloatingConfig, Span};

use crate::sample;
use crate::stickers::Sticker;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FloatingCharacter {
    pub id: usize,
    pub image: String,
    /// Percent of the container.
    pub x: f64,
    pub y: f64,
    /// Width in px.
    pub size: f64,
    /// Resting rotation in degrees.
    pub rotation: f64,
    /// Seconds per loop.
    pub loop_duration: f64,
    pub delay: f64,
    /// Bob direction: `1` sinks first, `-1` rises first.
    pub direction: i8,
    pub bob: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FloatingCoin {
    pub id: usize,
    pub kind: String,
    pub size: u32,
    pub x: f64,
    pub y: f64,
    pub duration: f64,
    pub delay: f64,
    pub rotation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedSticker {
    pub id: String,
    pub name: String,
    pub color: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub rotation: f64,
    pub duration: f64,
    pub delay: f64,
}

/// Mascot stickers, cycling through the configured images.
pub fn characters<R: Rng + ?Sized>(config: &FloatingConfig, rng: &mut R) -> Vec<FloatingCharacter> {
    if config.images.is_empty() {
        return Vec::new();
    }
    (0..config.count)
        .map(|id| FloatingCharacter {
            id,
            image: config.images[id % config.images.len()].clone(),
            x: sample(config.position, rng),
            y: sample(config.position, rng),
            size: sample(config.size, rng),
            rotation: sample(config.rotation, rng),
            loop_duration: sample(config.loop_duration, rng),
            delay: sample(config.delay, rng),
            direction: if rng.gen_bool(0.5) { 1 } else { -1 },
            bob: config.bob,
        })
        .collect()
}

/// Background coin field with random kinds and sizes.
pub fn coins<R: Rng + ?Sized>(config: &CoinsConfig, rng: &mut R) -> Vec<FloatingCoin> {
    let mut coins = Vec::with_capacity(config.count);
    for id in 0..config.count {
        let (Some(kind), Some(&size)) = (config.kinds.choose(rng), config.sizes.choose(rng)) else {
            break;
        };
        coins.push(FloatingCoin {
            id,
            kind: kind.clone(),
            size,
            x: rng.gen::<f64>() * 100.0,
            y: rng.gen::<f64>() * 100.0,
            duration: sample(config.duration, rng),
            delay: sample(config.delay, rng),
            rotation: rng.gen::<f64>() * 360.0,
        });
    }
    coins
}

const STICKER_POSITION: Span = Span::new(10.0, 90.0);
const STICKER_SIZE: Span = Span::new(40.0, 80.0);
const STICKER_ROTATION: Span = Span::new(-10.0, 10.0);
const STICKER_DURATION: Span = Span::new(10.0, 15.0);
const STICKER_DELAY: Span = Span::new(0.0, 3.0);

/// Scatters the loaded coin stickers across the showcase.
pub fn place_stickers<R: Rng + ?Sized>(stickers: &[Sticker], rng: &mut R) -> Vec<PlacedSticker> {
    stickers
        .iter()
        .map(|sticker| PlacedSticker {
            id: sticker.id.clone(),
            name: sticker.name.clone(),
            color: sticker.color.clone(),
            x: sample(STICKER_POSITION, rng),
            y: sample(STICKER_POSITION, rng),
            size: sample(STICKER_SIZE, rng),
            rotation: sample(STICKER_ROTATION, rng),
            duration: sample(STICKER_DURATION, rng),
            delay: sample(STICKER_DELAY, rng),
        })
        .collect()
}
