//! Genre target profiles
//!
//! Target-range tables per genre, mode, and vocal style. The store is an
//! explicit process-scoped cache keyed by resolved path, passed by
//! reference into the report synthesizer; `invalidate` forces a reload.
//! Unknown genres fall back to the `"default"` entry, and vocal-style
//! overlays shallow-merge over the mode's base targets.

use crate::error::{AnalysisError, AnalysisResult};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Compiled-in defaults for any target a profile leaves unset
const DEFAULT_LUFS: [f64; 2] = [-16.0, -12.0];
const DEFAULT_TILT: [f64; 2] = [-1.5, -0.5];
const DEFAULT_WIDTH: [f64; 2] = [0.2, 0.5];
const DEFAULT_CREST: [f64; 2] = [8.0, 14.0];

/// Partial target table; unset fields inherit from the layer below
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetOverlay {
    pub lufs_target: Option<[f64; 2]>,
    pub spectral_tilt: Option<[f64; 2]>,
    pub stereo_width: Option<[f64; 2]>,
    pub crest_factor: Option<[f64; 2]>,
}

impl TargetOverlay {
    /// Shallow merge: `overlay` keys win
    fn merged(&self, overlay: &TargetOverlay) -> TargetOverlay {
        TargetOverlay {
            lufs_target: overlay.lufs_target.or(self.lufs_target),
            spectral_tilt: overlay.spectral_tilt.or(self.spectral_tilt),
            stereo_width: overlay.stereo_width.or(self.stereo_width),
            crest_factor: overlay.crest_factor.or(self.crest_factor),
        }
    }
}

/// Fully resolved `[min, max]` target ranges for one scoring pass
#[derive(Debug, Clone, Copy)]
pub struct Targets {
    pub lufs_target: [f64; 2],
    pub spectral_tilt: [f64; 2],
    pub stereo_width: [f64; 2],
    pub crest_factor: [f64; 2],
}

impl From<&TargetOverlay> for Targets {
    fn from(overlay: &TargetOverlay) -> Self {
        Self {
            lufs_target: overlay.lufs_target.unwrap_or(DEFAULT_LUFS),
            spectral_tilt: overlay.spectral_tilt.unwrap_or(DEFAULT_TILT),
            stereo_width: overlay.stereo_width.unwrap_or(DEFAULT_WIDTH),
            crest_factor: overlay.crest_factor.unwrap_or(DEFAULT_CREST),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenreProfile {
    #[serde(default)]
    pub modes: BTreeMap<String, TargetOverlay>,
    #[serde(default)]
    pub vocal_styles: BTreeMap<String, TargetOverlay>,
}

type Profiles = BTreeMap<String, GenreProfile>;

/// Process-scoped profile cache keyed by resolved path
pub struct ProfileStore {
    path: PathBuf,
    cache: RwLock<HashMap<PathBuf, Arc<Profiles>>>,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn load(&self) -> AnalysisResult<Arc<Profiles>> {
        let resolved = self
            .path
            .canonicalize()
            .unwrap_or_else(|_| self.path.clone());

        if let Some(profiles) = self.cache.read().expect("profile cache poisoned").get(&resolved) {
            return Ok(profiles.clone());
        }

        let content = std::fs::read_to_string(&resolved).map_err(|e| {
            AnalysisError::Configuration(format!(
                "Cannot read genre profiles at {}: {}",
                resolved.display(),
                e
            ))
        })?;
        let profiles: Profiles = serde_json::from_str(&content).map_err(|e| {
            AnalysisError::Configuration(format!("Invalid genre profile file: {}", e))
        })?;

        let profiles = Arc::new(profiles);
        self.cache
            .write()
            .expect("profile cache poisoned")
            .insert(resolved, profiles.clone());
        Ok(profiles)
    }

    /// Drop the cached table; the next lookup reloads from disk
    pub fn invalidate(&self) {
        self.cache.write().expect("profile cache poisoned").clear();
    }

    /// Genre names available for selection, excluding the fallback entry
    pub fn genres(&self) -> AnalysisResult<Vec<String>> {
        let profiles = self.load()?;
        let mut names: Vec<String> = profiles
            .keys()
            .filter(|k| k.as_str() != "default")
            .cloned()
            .collect();
        names.sort();
        Ok(names)
    }

    /// Resolved targets for a genre/mode pair, with the vocal-style overlay
    /// applied in vocal mode
    pub fn targets(
        &self,
        genre: &str,
        mode: &str,
        vocal_style: Option<&str>,
    ) -> AnalysisResult<Targets> {
        let profiles = self.load()?;
        let profile = profiles
            .get(genre)
            .or_else(|| profiles.get("default"))
            .cloned()
            .unwrap_or_default();

        let mut overlay = profile.modes.get(mode).cloned().unwrap_or_default();
        if mode == "vocal" {
            if let Some(style) = vocal_style {
                if let Some(style_overlay) = profile.vocal_styles.get(style) {
                    overlay = overlay.merged(style_overlay);
                }
            }
        }
        Ok(Targets::from(&overlay))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "default": {
            "modes": {
                "mix": {"lufs_target": [-14, -10]}
            }
        },
        "pop": {
            "modes": {
                "vocal": {"lufs_target": [-18, -14], "crest_factor": [9, 15]},
                "mix": {"lufs_target": [-10, -7]}
            },
            "vocal_styles": {
                "belt": {"lufs_target": [-16, -12]}
            }
        }
    }"#;

    fn store_with(content: &str) -> (tempfile::TempDir, ProfileStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(content.as_bytes())
            .unwrap();
        (dir, ProfileStore::new(path))
    }

    #[test]
    fn unknown_genre_falls_back_to_default() {
        let (_dir, store) = store_with(SAMPLE);
        let targets = store.targets("polka", "mix", None).unwrap();
        assert_eq!(targets.lufs_target, [-14.0, -10.0]);
        // Unset keys resolve to compiled defaults
        assert_eq!(targets.stereo_width, DEFAULT_WIDTH);
    }

    #[test]
    fn vocal_style_overlay_wins_over_mode_base() {
        let (_dir, store) = store_with(SAMPLE);
        let base = store.targets("pop", "vocal", None).unwrap();
        assert_eq!(base.lufs_target, [-18.0, -14.0]);

        let styled = store.targets("pop", "vocal", Some("belt")).unwrap();
        assert_eq!(styled.lufs_target, [-16.0, -12.0]);
        // Keys the overlay does not set survive from the mode base
        assert_eq!(styled.crest_factor, [9.0, 15.0]);
    }

    #[test]
    fn overlay_is_ignored_outside_vocal_mode() {
        let (_dir, store) = store_with(SAMPLE);
        let targets = store.targets("pop", "mix", Some("belt")).unwrap();
        assert_eq!(targets.lufs_target, [-10.0, -7.0]);
    }

    #[test]
    fn genres_listing_excludes_default_and_is_sorted() {
        let (_dir, store) = store_with(SAMPLE);
        assert_eq!(store.genres().unwrap(), vec!["pop".to_string()]);
    }

    #[test]
    fn invalidate_forces_a_reload() {
        let (dir, store) = store_with(SAMPLE);
        assert_eq!(store.genres().unwrap(), vec!["pop".to_string()]);

        let path = dir.path().join("profiles.json");
        std::fs::write(&path, r#"{"default": {}, "rock": {}}"#).unwrap();
        // Cached copy still serves the old table
        assert_eq!(store.genres().unwrap(), vec!["pop".to_string()]);

        store.invalidate();
        assert_eq!(store.genres().unwrap(), vec!["rock".to_string()]);
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let store = ProfileStore::new("/nonexistent/profiles.json");
        assert!(matches!(
            store.targets("pop", "mix", None),
            Err(AnalysisError::Configuration(_))
        ));
    }
}
