//! Fitness evaluation against a target image.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::engine::codec::ShapeCodec;
use crate::engine::genome::Genome;
use crate::error::Result;
use crate::render::{expand_symmetry, render, PixelBuffer, PixelMode};

/// One evaluated candidate: the genome, its rendered pixels and the scalar
/// fitness (sum of squared channel differences; lower is better, zero only
/// on an exact match).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Individual {
    pub genome: Genome,
    pub pixels: PixelBuffer,
    pub fitness: f64,
}

/// Render-and-score seam between the search and the image pipeline.
/// Islands and the mating coordinator only see this trait, so tests can
/// substitute scripted evaluators.
pub trait GenomeEvaluator: Send + Sync {
    fn evaluate(&self, codec: &ShapeCodec, genome: &Genome) -> Result<Individual>;
}

impl<E: GenomeEvaluator + ?Sized> GenomeEvaluator for Arc<E> {
    fn evaluate(&self, codec: &ShapeCodec, genome: &Genome) -> Result<Individual> {
        (**self).evaluate(codec, genome)
    }
}

/// Evaluator backed by a preloaded, fixed-size target image.
pub struct ImageEvaluator {
    target: PixelBuffer,
    target_path: PathBuf,
}

impl ImageEvaluator {
    /// Load the target image, convert it to `mode` and downscale it so the
    /// longest side is at most `resize` pixels (aspect ratio preserved;
    /// smaller images are left alone).
    pub fn new<P: AsRef<Path>>(path: P, mode: PixelMode, resize: u32) -> Result<Self> {
        let path = path.as_ref();
        let mut img = image::open(path)?;
        if resize > 0 && (img.width() > resize || img.height() > resize) {
            img = img.resize(resize, resize, FilterType::CatmullRom);
        }

        let (width, height) = (img.width(), img.height());
        let data = match mode {
            PixelMode::L => img.to_luma8().into_raw(),
            PixelMode::La => img.to_luma_alpha8().into_raw(),
            PixelMode::Rgb => img.to_rgb8().into_raw(),
            PixelMode::Rgba => img.to_rgba8().into_raw(),
        };

        Ok(Self {
            target: PixelBuffer {
                width,
                height,
                mode,
                data,
            },
            target_path: path.to_path_buf(),
        })
    }

    /// Build directly from an in-memory buffer.
    pub fn from_buffer(target: PixelBuffer) -> Self {
        Self {
            target,
            target_path: PathBuf::new(),
        }
    }

    pub fn target_size(&self) -> (u32, u32) {
        (self.target.width, self.target.height)
    }

    pub fn target_mode(&self) -> PixelMode {
        self.target.mode
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// Sum of squared per-channel differences against the target.
    pub fn fitness(&self, candidate: &PixelBuffer) -> f64 {
        debug_assert_eq!(candidate.data.len(), self.target.data.len());
        self.target
            .data
            .iter()
            .zip(candidate.data.iter())
            .map(|(&t, &c)| {
                let d = t as i32 - c as i32;
                (d * d) as f64
            })
            .sum()
    }
}

impl GenomeEvaluator for ImageEvaluator {
    fn evaluate(&self, codec: &ShapeCodec, genome: &Genome) -> Result<Individual> {
        let phenotype = codec.decode(genome);
        let shapes = expand_symmetry(codec.image_size(), codec.symmetry(), &phenotype.shapes);
        let pixels = render(
            codec.image_size(),
            &phenotype.background,
            &shapes,
            codec.shape_kind(),
            self.target.mode,
            codec.draw_mode(),
            codec.color_bit_depth(),
        )?;
        let fitness = self.fitness(&pixels);
        Ok(Individual {
            genome: genome.clone(),
            pixels,
            fitness,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_buffers_score_zero() {
        let target = PixelBuffer {
            width: 2,
            height: 1,
            mode: PixelMode::L,
            data: vec![10, 20],
        };
        let evaluator = ImageEvaluator::from_buffer(target.clone());
        assert_eq!(evaluator.fitness(&target), 0.0);
    }

    #[test]
    fn fitness_is_sum_of_squared_differences() {
        let target = PixelBuffer {
            width: 2,
            height: 1,
            mode: PixelMode::L,
            data: vec![10, 20],
        };
        let candidate = PixelBuffer {
            width: 2,
            height: 1,
            mode: PixelMode::L,
            data: vec![13, 16],
        };
        let evaluator = ImageEvaluator::from_buffer(target);
        assert_eq!(evaluator.fitness(&candidate), 9.0 + 16.0);
    }
}
