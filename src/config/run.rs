use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::traits::ConfigSection;
use crate::error::Result;

/// Session-level settings. None of these change the run identity: a run can
/// be resumed with different workers, max_rounds or restart values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Rayon worker threads per round; 0 picks the count adaptively from
    /// measured throughput.
    pub workers: usize,
    /// Seed for all randomness; unset falls back to the `RANDOMSEED`
    /// environment variable, then to entropy.
    pub seed: Option<u64>,
    /// Erase any existing history for this configuration and start over.
    pub restart: bool,
    /// Where history directories are created; unset puts them next to the
    /// target image.
    pub history_root: Option<PathBuf>,
    /// Stop after this many mating rounds; 0 runs until interrupted.
    pub max_rounds: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            seed: None,
            restart: false,
            history_root: None,
            max_rounds: 0,
        }
    }
}

impl ConfigSection for RunConfig {
    fn section_name() -> &'static str {
        "run"
    }

    fn validate(&self) -> Result<()> {
        Ok(())
    }
}
