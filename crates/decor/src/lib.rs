//! Seeded decorative layouts for the landing page.
//!
//! Every generator draws from a caller-supplied RNG so a fixed seed always
//! reproduces the same sky. [`Decor`] bundles a seeded `StdRng` with the
//! generators; the free functions in each module take any `Rng` for tests.

pub mod floating;
pub mod shooting;
pub mod starfield;
pub mod stickers;

use std::time::Instant;

use rand::prelude::*;
use serde::Serialize;
use siteconfig::{SiteConfig, Span};

pub use floating::{FloatingCharacter, FloatingCoin, PlacedSticker};
pub use shooting::{ShootingStar, ShootingStars, ShootingTick};
pub use starfield::{Star, StarAnimation};
pub use stickers::{Sticker, StickerBoard, StickerPatch, StickerReader, StickerWriter};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecorError {
    #[error("sticker '{0}' already exists")]
    DuplicateSticker(String),
    #[error("sticker '{0}' not found")]
    UnknownSticker(String),
}

/// Viewport dimensions in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> f64 {
        f64::from(self.width) * f64::from(self.height)
    }

    pub fn diagonal(&self) -> f64 {
        f64::from(self.width).hypot(f64::from(self.height))
    }
}

/// One full set of decorative elements for a viewport.
#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    pub seed: u64,
    pub viewport: Viewport,
    pub stars: Vec<Star>,
    pub shooting_star: shooting::ShootingStarPath,
    pub characters: Vec<FloatingCharacter>,
    pub coins: Vec<FloatingCoin>,
    pub stickers: Vec<PlacedSticker>,
}

pub struct Decor {
    seed: u64,
    rng: StdRng,
}

impl Decor {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Generates every decorative element for `viewport`.
    ///
    /// Stickers are only placed once the board has finished loading.
    pub fn layout(
        &mut self,
        config: &SiteConfig,
        viewport: Viewport,
        stickers: &StickerReader,
    ) -> Layout {
        let stars = starfield::generate(viewport, &config.starfield, &mut self.rng);
        let shooting = ShootingStars::new(
            config.shooting_stars.clone(),
            Instant::now(),
            &mut self.rng,
        );
        let shooting_star = shooting
            .active()
            .first()
            .map(|star| star.path(viewport))
            .unwrap_or_else(shooting::ShootingStarPath::idle);
        let characters = floating::characters(&config.floating, &mut self.rng);
        let coins = floating::coins(&config.coins, &mut self.rng);
        let stickers = if stickers.is_loading() {
            Vec::new()
        } else {
            floating::place_stickers(&stickers.snapshot(), &mut self.rng)
        };

        Layout {
            seed: self.seed,
            viewport,
            stars,
            shooting_star,
            characters,
            coins,
            stickers,
        }
    }
}

/// Uniform sample from `span`. Zero-width spans return `min`.
pub(crate) fn sample<R: Rng + ?Sized>(span: Span, rng: &mut R) -> f64 {
    span.min + rng.gen::<f64>() * span.width()
}

/// `true` with probability `p`; values outside [0, 1] saturate.
pub(crate) fn chance<R: Rng + ?Sized>(p: f64, rng: &mut R) -> bool {
    rng.gen::<f64>() < p
}
