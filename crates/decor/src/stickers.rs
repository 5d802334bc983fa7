//! Shared coin sticker catalogue.
//!
//! One [`StickerWriter`] owns mutation; any number of [`StickerReader`]s can
//! take snapshots. Snapshots are `Arc`-shared, so reading never copies the
//! list and a reader never observes a half-applied update.

use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;

use crate::DecorError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sticker {
    pub id: String,
    pub name: String,
    /// Gradient used until a real image is available.
    pub color: String,
    pub image: Option<String>,
}

impl Sticker {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        let color = default_color(&id).to_string();
        Self {
            id,
            name: name.into(),
            color,
            image: None,
        }
    }
}

/// Partial update merged into an existing sticker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StickerPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub image: Option<String>,
}

pub fn default_color(id: &str) -> &'static str {
    match id {
        "btc" => "from-yellow-400 to-orange-500",
        "eth" => "from-purple-400 to-blue-500",
        "mpup" => "from-pink-400 to-purple-500",
        _ => "from-blue-400 to-green-500",
    }
}

/// Catalogue the board is seeded with once loading finishes.
pub fn default_stickers() -> Vec<Sticker> {
    vec![
        Sticker::new("btc", "Bitcoin"),
        Sticker::new("eth", "Ethereum"),
        Sticker::new("mpup", "MoonPup"),
    ]
}

#[derive(Debug)]
struct BoardState {
    stickers: Arc<Vec<Sticker>>,
    loading: bool,
    revision: u64,
}

pub struct StickerBoard;

impl StickerBoard {
    /// Creates an empty board in the loading state.
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (StickerWriter, StickerReader) {
        let state = Arc::new(RwLock::new(BoardState {
            stickers: Arc::new(Vec::new()),
            loading: true,
            revision: 0,
        }));
        (
            StickerWriter {
                state: Arc::clone(&state),
            },
            StickerReader { state },
        )
    }
}

pub struct StickerWriter {
    state: Arc<RwLock<BoardState>>,
}

impl StickerWriter {
    pub fn reader(&self) -> StickerReader {
        StickerReader {
            state: Arc::clone(&self.state),
        }
    }

    /// Replaces the catalogue and clears the loading flag.
    pub fn finish_loading(&mut self, stickers: Vec<Sticker>) {
        self.with_state(|state| {
            state.stickers = Arc::new(stickers);
            state.loading = false;
        });
    }

    pub fn add(&mut self, sticker: Sticker) -> Result<(), DecorError> {
        self.try_with_state(|state| {
            if state.stickers.iter().any(|existing| existing.id == sticker.id) {
                return Err(DecorError::DuplicateSticker(sticker.id));
            }
            Arc::make_mut(&mut state.stickers).push(sticker);
            Ok(())
        })
    }

    pub fn update(&mut self, id: &str, patch: StickerPatch) -> Result<(), DecorError> {
        self.try_with_state(|state| {
            let stickers = Arc::make_mut(&mut state.stickers);
            let sticker = stickers
                .iter_mut()
                .find(|sticker| sticker.id == id)
                .ok_or_else(|| DecorError::UnknownSticker(id.to_string()))?;
            if let Some(name) = patch.name {
                sticker.name = name;
            }
            if let Some(color) = patch.color {
                sticker.color = color;
            }
            if let Some(image) = patch.image {
                sticker.image = Some(image);
            }
            Ok(())
        })
    }

    fn with_state(&mut self, apply: impl FnOnce(&mut BoardState)) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut *state);
        state.revision += 1;
    }

    fn try_with_state(
        &mut self,
        apply: impl FnOnce(&mut BoardState) -> Result<(), DecorError>,
    ) -> Result<(), DecorError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut *state)?;
        state.revision += 1;
        Ok(())
    }
}

#[derive(Clone)]
pub struct StickerReader {
    state: Arc<RwLock<BoardState>>,
}

impl StickerReader {
    pub fn snapshot(&self) -> Arc<Vec<Sticker>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&state.stickers)
    }

    pub fn is_loading(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .loading
    }

    /// Bumped on every successful mutation.
    pub fn revision(&self) -> u64 {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .revision
    }
}
