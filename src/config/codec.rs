use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::traits::ConfigSection;
use crate::engine::codec::ShapeCodec;
use crate::error::{PolyvolveError, Result};
use crate::render::{PixelMode, ShapeKind, Symmetry};

/// Target image and genome-layout settings. The final bit layout also
/// depends on the loaded target's size, so the [`ShapeCodec`] is built via
/// [`CodecConfig::build_codec`] once the image is known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodecConfig {
    pub target: PathBuf,
    /// Longest-side cap applied to the target after loading; 0 disables it.
    pub resize: u32,
    pub shape: ShapeKind,
    pub n_shapes: usize,
    pub color_bit_depth: usize,
    /// Pixel mode the target is converted to and fitness is computed in.
    pub target_mode: PixelMode,
    /// Pixel mode shape colors are decoded in.
    pub draw_mode: PixelMode,
    /// Symmetry element string, e.g. `"x"`, `"xy"` or `""`.
    pub symmetry: String,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            target: PathBuf::new(),
            resize: 100,
            shape: ShapeKind::Triangle,
            n_shapes: 32,
            color_bit_depth: 8,
            target_mode: PixelMode::Rgb,
            draw_mode: PixelMode::Rgba,
            symmetry: String::new(),
        }
    }
}

impl CodecConfig {
    pub fn symmetry_elements(&self) -> Result<Vec<Symmetry>> {
        Symmetry::parse_elements(&self.symmetry)
    }

    pub fn build_codec(&self, image_size: (u32, u32)) -> Result<ShapeCodec> {
        ShapeCodec::new(
            image_size,
            self.shape,
            self.n_shapes,
            self.color_bit_depth,
            self.draw_mode,
            self.symmetry_elements()?,
        )
    }
}

impl ConfigSection for CodecConfig {
    fn section_name() -> &'static str {
        "codec"
    }

    fn validate(&self) -> Result<()> {
        if self.target.as_os_str().is_empty() {
            return Err(PolyvolveError::Configuration(
                "target image path must be set".to_string(),
            ));
        }
        if self.n_shapes == 0 {
            return Err(PolyvolveError::Configuration(
                "shape count must be at least 1".to_string(),
            ));
        }
        if self.color_bit_depth == 0 || self.color_bit_depth > 8 {
            return Err(PolyvolveError::Configuration(
                "color bit depth must be between 1 and 8".to_string(),
            ));
        }
        self.symmetry_elements()?;
        Ok(())
    }
}
