//! On-disk run history: a directory keyed by a short configuration hash,
//! holding the resumable run status plus image snapshots.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::config::AppConfig;
use crate::engine::island::IslandState;
use crate::error::{PolyvolveError, Result};
use crate::eval::Individual;
use crate::render::{PixelBuffer, PixelMode};

const STATUS_FILENAME: &str = "status.json";
const CONFIG_FILENAME: &str = "config.toml";

/// Everything needed to resume a run where it left off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStatus {
    pub islands: Vec<IslandState>,
    pub best_offspring: Individual,
    pub rounds: u64,
}

pub struct HistoryIo {
    id: String,
    dirpath: PathBuf,
    status_path: PathBuf,
    config_path: PathBuf,
    config: AppConfig,
}

impl HistoryIo {
    /// Derive the history location from the configuration. The directory
    /// name carries a short hash of the run identity (codec + evolution
    /// sections + seed), so changing session settings like worker count or
    /// restart does not fork a new history.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let id = run_id(config)?;

        let target_stem = config
            .codec
            .target
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "target".to_string());
        let root = match &config.run.history_root {
            Some(root) => root.clone(),
            None => config
                .codec
                .target
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        };
        let dirpath = root.join(target_stem).join(format!("history_{id}"));

        Ok(Self {
            status_path: dirpath.join(STATUS_FILENAME),
            config_path: dirpath.join(CONFIG_FILENAME),
            id,
            dirpath,
            config: config.clone(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dirpath(&self) -> &Path {
        &self.dirpath
    }

    /// Whether a resumable status file exists for this configuration.
    pub fn exists(&self) -> bool {
        self.status_path.exists()
    }

    /// Create (or wipe and recreate) the history directory and record the
    /// configuration that owns it.
    pub fn init(&self) -> Result<()> {
        if self.dirpath.exists() {
            warn!("erasing {}", self.dirpath.display());
            fs::remove_dir_all(&self.dirpath)?;
        }
        info!("creating {}", self.dirpath.display());
        fs::create_dir_all(&self.dirpath)?;

        let toml_str = toml::to_string_pretty(&self.config)
            .map_err(|e| PolyvolveError::Configuration(format!("Failed to serialize: {}", e)))?;
        fs::write(&self.config_path, toml_str)?;
        Ok(())
    }

    /// Load the persisted status, after checking that the directory really
    /// belongs to the current configuration.
    pub fn resume(&self) -> Result<RunStatus> {
        let saved_toml = fs::read_to_string(&self.config_path)?;
        let saved: AppConfig = toml::from_str(&saved_toml).map_err(|e| {
            PolyvolveError::Persistence(format!("unreadable saved config: {}", e))
        })?;
        if run_id(&saved)? != self.id {
            return Err(PolyvolveError::Persistence(format!(
                "history {} was created by a different configuration",
                self.dirpath.display()
            )));
        }

        let json = fs::read_to_string(&self.status_path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, status: &RunStatus) -> Result<()> {
        let json = serde_json::to_string(status)?;
        fs::write(&self.status_path, json)?;
        Ok(())
    }

    /// Snapshot an island's current best into the island's own
    /// subdirectory, with a timestamped, fitness-tagged filename.
    pub fn save_island_best(
        &self,
        island_id: &str,
        iteration: u64,
        fitness: f64,
        pixels: &PixelBuffer,
    ) -> Result<PathBuf> {
        let dir = self.dirpath.join(island_id);
        fs::create_dir_all(&dir)?;
        let stamp = Local::now().format("%Y%m%d%H%M%S");
        let dst = dir.join(format!("t{stamp}_i{iteration}-sse{fitness:.3}.png"));
        save_pixels(&dst, pixels)?;
        Ok(dst)
    }

    /// Write an image directly under the history directory, e.g. the
    /// best-crossover snapshot overwritten each time it improves.
    pub fn save_image(&self, filename: &str, pixels: &PixelBuffer) -> Result<PathBuf> {
        let dst = self.dirpath.join(filename);
        save_pixels(&dst, pixels)?;
        Ok(dst)
    }
}

/// Short stable id of the run identity. SHA-1 rather than the stdlib
/// hasher: the id is compared against values written by earlier runs, so
/// it must not change across toolchain releases.
fn run_id(config: &AppConfig) -> Result<String> {
    let key = serde_json::to_string(&(&config.codec, &config.evolution, &config.run.seed))?;
    Ok(short_sha1(&key))
}

fn short_sha1(key: &str) -> String {
    let digest = Sha1::digest(key.as_bytes());
    let mut hex = String::with_capacity(7);
    for byte in digest.iter().take(4) {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex.truncate(7);
    hex
}

fn save_pixels(path: &Path, pixels: &PixelBuffer) -> Result<()> {
    let (w, h) = (pixels.width, pixels.height);
    let data = pixels.data.clone();
    let corrupt =
        || PolyvolveError::Persistence(format!("pixel buffer does not fill {w}x{h}"));
    match pixels.mode {
        PixelMode::L => image::GrayImage::from_raw(w, h, data)
            .ok_or_else(corrupt)?
            .save(path)?,
        PixelMode::La => image::GrayAlphaImage::from_raw(w, h, data)
            .ok_or_else(corrupt)?
            .save(path)?,
        PixelMode::Rgb => image::RgbImage::from_raw(w, h, data)
            .ok_or_else(corrupt)?
            .save(path)?,
        PixelMode::Rgba => image::RgbaImage::from_raw(w, h, data)
            .ok_or_else(corrupt)?
            .save(path)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_sha1_matches_known_digests() {
        // Pinned so ids written by one build resolve under the next one.
        assert_eq!(short_sha1(""), "da39a3e");
        assert_eq!(short_sha1("abc"), "a9993e3");
    }

    #[test]
    fn run_id_is_short_lowercase_hex() {
        let mut config = AppConfig::default();
        config.codec.target = PathBuf::from("face.png");
        let id = run_id(&config).unwrap();
        assert_eq!(id.len(), 7);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn run_id_ignores_session_settings() {
        let mut config = AppConfig::default();
        config.codec.target = PathBuf::from("face.png");
        let base = run_id(&config).unwrap();

        config.run.workers = 7;
        config.run.restart = true;
        config.run.max_rounds = 5;
        assert_eq!(run_id(&config).unwrap(), base);

        config.evolution.n_islands += 1;
        assert_ne!(run_id(&config).unwrap(), base);
    }

    #[test]
    fn history_dir_sits_next_to_the_target() {
        let mut config = AppConfig::default();
        config.codec.target = PathBuf::from("images/face.png");
        let history = HistoryIo::new(&config).unwrap();
        let dir = history.dirpath().to_string_lossy().into_owned();
        assert!(dir.starts_with("images/face/history_"), "{dir}");
    }
}
