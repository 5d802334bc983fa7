//! Display font readiness.
//!
//! A [`FontLoader`] reads every configured font file once on a worker thread.
//! [`FontLoader::readiness`] waits for the worker up to the configured
//! timeout and caches the outcome for the life of the loader. Faces that did
//! not load in time resolve to the fallback stack.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use serde::Serialize;
use siteconfig::{FontFace, FontsPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FontFormat {
    TrueType,
    OpenType,
    Collection,
    Woff,
    Woff2,
}

impl FontFormat {
    /// Identifies a font container from its leading bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes.get(..4)? {
            [0x00, 0x01, 0x00, 0x00] | b"true" => Some(Self::TrueType),
            b"OTTO" => Some(Self::OpenType),
            b"ttcf" => Some(Self::Collection),
            b"wOFF" => Some(Self::Woff),
            b"wOF2" => Some(Self::Woff2),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FontStatus {
    Loaded { format: FontFormat },
    Failed { reason: String },
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFont {
    pub family: String,
    pub var: String,
    pub status: FontStatus,
    /// Font stack to publish under `var`.
    pub stack: String,
}

/// Final outcome of the font loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FontReadiness {
    pub fonts: Vec<ResolvedFont>,
    #[serde(with = "duration_millis")]
    pub waited: Duration,
}

impl FontReadiness {
    pub fn all_loaded(&self) -> bool {
        self.fonts
            .iter()
            .all(|font| matches!(font.status, FontStatus::Loaded { .. }))
    }

    /// Stack published under a style variable such as `--font-glow`.
    pub fn stack(&self, var: &str) -> Option<&str> {
        self.fonts
            .iter()
            .find(|font| font.var == var)
            .map(|font| font.stack.as_str())
    }
}

/// Builds the readiness report from whatever outcomes arrived in time.
///
/// `outcomes[i]` belongs to `faces[i]`; `None` means the face was still
/// loading when the wait ended.
pub fn resolve(
    faces: &[FontFace],
    outcomes: &[Option<Result<FontFormat, String>>],
    fallback: &str,
    waited: Duration,
) -> FontReadiness {
    let fonts = faces
        .iter()
        .enumerate()
        .map(|(index, face)| {
            let status = match outcomes.get(index).cloned().flatten() {
                Some(Ok(format)) => FontStatus::Loaded { format },
                Some(Err(reason)) => FontStatus::Failed { reason },
                None => FontStatus::TimedOut,
            };
            let stack = if matches!(status, FontStatus::Loaded { .. }) {
                format!("\"{}\", {fallback}", face.family)
            } else {
                fallback.to_string()
            };
            ResolvedFont {
                family: face.family.clone(),
                var: face.var.clone(),
                status,
                stack,
            }
        })
        .collect();
    FontReadiness { fonts, waited }
}

struct FontEvent {
    index: usize,
    outcome: Result<FontFormat, String>,
}

pub struct FontLoader {
    faces: Vec<FontFace>,
    policy: FontsPolicy,
    started: Instant,
    events: Receiver<FontEvent>,
    readiness: OnceLock<FontReadiness>,
}

impl FontLoader {
    /// Starts reading `faces` in the background. Relative font paths resolve
    /// against `root`.
    pub fn start(faces: Vec<FontFace>, root: &Path, policy: FontsPolicy) -> Result<Self> {
        let started = Instant::now();
        let (event_tx, event_rx) = unbounded();
        let jobs: Vec<(usize, PathBuf)> = faces
            .iter()
            .enumerate()
            .map(|(index, face)| (index, root.join(&face.path)))
            .collect();
        // Detached: the worker exits after its last read or once the
        // receiver is gone.
        thread::Builder::new()
            .name("moonpup-fonts".into())
            .spawn(move || {
                for (index, path) in jobs {
                    let outcome = load_font(&path);
                    if let Err(reason) = &outcome {
                        tracing::debug!(path = %path.display(), %reason, "font failed to load");
                    }
                    if event_tx.send(FontEvent { index, outcome }).is_err() {
                        break;
                    }
                }
            })
            .map_err(|err| anyhow!("failed to spawn font loader thread: {err}"))?;
        tracing::debug!(faces = faces.len(), "font loader started");

        Ok(Self {
            faces,
            policy,
            started,
            events: event_rx,
            readiness: OnceLock::new(),
        })
    }

    /// Waits for the worker until every face reported or the timeout passed.
    ///
    /// Later calls return the cached result without waiting.
    pub fn readiness(&self) -> &FontReadiness {
        self.readiness.get_or_init(|| self.collect())
    }

    fn collect(&self) -> FontReadiness {
        let deadline = self.started.checked_add(self.policy.timeout);
        let mut outcomes: Vec<Option<Result<FontFormat, String>>> = vec![None; self.faces.len()];
        let mut pending = self.faces.len();
        while pending > 0 {
            let event = match deadline {
                Some(deadline) => self.events.recv_deadline(deadline),
                // Unrepresentable deadline: wait for the worker to finish.
                None => self
                    .events
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };
            match event {
                Ok(FontEvent { index, outcome }) => {
                    if let Some(slot) = outcomes.get_mut(index) {
                        *slot = Some(outcome);
                        pending -= 1;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    tracing::warn!(
                        pending,
                        timeout = ?self.policy.timeout,
                        "font loading timed out; using fallback stack"
                    );
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        let readiness = resolve(
            &self.faces,
            &outcomes,
            &self.policy.fallback,
            self.started.elapsed(),
        );
        tracing::info!(
            loaded = readiness
                .fonts
                .iter()
                .filter(|font| matches!(font.status, FontStatus::Loaded { .. }))
                .count(),
            total = readiness.fonts.len(),
            "fonts ready"
        );
        readiness
    }
}

fn load_font(path: &Path) -> Result<FontFormat, String> {
    let bytes = fs::read(path).map_err(|err| format!("{}: {err}", path.display()))?;
    FontFormat::sniff(&bytes)
        .ok_or_else(|| format!("{} is not a recognised font file", path.display()))
}

mod duration_millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis().min(u128::from(u64::MAX)) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TTF_MAGIC: [u8; 8] = [0x00, 0x01, 0x00, 0x00, 0x00, 0x0c, 0x00, 0x80];

    fn face(family: &str, path: &str, var: &str) -> FontFace {
        FontFace {
            family: family.into(),
            path: PathBuf::from(path),
            var: var.into(),
        }
    }

    #[test]
    fn sniff_recognises_containers() {
        assert_eq!(FontFormat::sniff(&TTF_MAGIC), Some(FontFormat::TrueType));
        assert_eq!(FontFormat::sniff(b"OTTO...."), Some(FontFormat::OpenType));
        assert_eq!(FontFormat::sniff(b"wOF2abcd"), Some(FontFormat::Woff2));
        assert_eq!(FontFormat::sniff(b"<html>"), None);
        assert_eq!(FontFormat::sniff(b"OT"), None);
    }

    #[test]
    fn timed_out_faces_fall_back() {
        let faces = [
            face("Revamped", "a.ttf", "--font-revamped"),
            face("NuixyberGlow", "b.ttf", "--font-glow"),
            face("NuixyberGlowNext", "c.ttf", "--font-glow-next"),
        ];
        let outcomes = [
            Some(Ok(FontFormat::TrueType)),
            Some(Err("missing".to_string())),
        ];
        let readiness = resolve(&faces, &outcomes, "Arial, sans-serif", Duration::ZERO);

        assert_eq!(
            readiness.stack("--font-revamped"),
            Some("\"Revamped\", Arial, sans-serif")
        );
        assert_eq!(readiness.stack("--font-glow"), Some("Arial, sans-serif"));
        assert_eq!(readiness.fonts[2].status, FontStatus::TimedOut);
        assert_eq!(readiness.stack("--font-glow-next"), Some("Arial, sans-serif"));
        assert!(!readiness.all_loaded());
    }

    #[test]
    fn loader_reads_files_once() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("good.ttf"), TTF_MAGIC).unwrap();
        fs::write(root.path().join("bad.ttf"), b"not a font").unwrap();
        let faces = vec![
            face("Good", "good.ttf", "--font-good"),
            face("Bad", "bad.ttf", "--font-bad"),
            face("Missing", "missing.ttf", "--font-missing"),
        ];
        let policy = FontsPolicy {
            timeout: Duration::from_secs(10),
            ..FontsPolicy::default()
        };

        let loader = FontLoader::start(faces, root.path(), policy).unwrap();
        let first = loader.readiness();
        assert_eq!(
            first.fonts[0].status,
            FontStatus::Loaded {
                format: FontFormat::TrueType
            }
        );
        assert!(matches!(first.fonts[1].status, FontStatus::Failed { .. }));
        assert!(matches!(first.fonts[2].status, FontStatus::Failed { .. }));
        assert_eq!(first.stack("--font-good"), Some("\"Good\", Arial, sans-serif"));

        let second = loader.readiness();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn unrepresentable_timeout_waits_for_worker() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("good.ttf"), TTF_MAGIC).unwrap();
        let policy = FontsPolicy {
            timeout: Duration::MAX,
            ..FontsPolicy::default()
        };

        let loader =
            FontLoader::start(vec![face("Good", "good.ttf", "--font-good")], root.path(), policy)
                .unwrap();
        assert!(loader.readiness().all_loaded());
    }

    #[test]
    fn no_faces_is_immediately_ready() {
        let root = TempDir::new().unwrap();
        let loader = FontLoader::start(Vec::new(), root.path(), FontsPolicy::default()).unwrap();
        assert!(loader.readiness().fonts.is_empty());
        assert!(loader.readiness().all_loaded());
    }
}
