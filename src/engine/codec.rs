//! Fixed-width binary genome codec.
//!
//! The codec derives a bit layout from the target image configuration and
//! translates between bit strings and drawable recipes. Layout, per genome:
//! background color, then for each shape a visibility flag, an anchor point,
//! `points_per_shape` offset points and a color.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::engine::genome::{random_genome, Genome};
use crate::error::{PolyvolveError, Result};
use crate::render::{Color, DecodedShape, Phenotype, PixelMode, ShapeKind, Symmetry};

/// Field widths in bits. Width/height bits are `ceil(log2(dimension))`;
/// a 1-pixel dimension yields a valid 0-bit field (a single coordinate
/// value), not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitLayout {
    pub x: usize,
    pub y: usize,
    pub channel: usize,
    pub visible: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeCodec {
    image_size: (u32, u32),
    shape: ShapeKind,
    n_shapes: usize,
    color_bit_depth: usize,
    draw_mode: PixelMode,
    symmetry: Vec<Symmetry>,
    bits: BitLayout,
    genome_size: usize,
}

/// `ceil(log2(n))` over the integers: the number of bits needed to index
/// `n` distinct values.
fn bits_for(dimension: u32) -> usize {
    if dimension <= 1 {
        0
    } else {
        (u32::BITS - (dimension - 1).leading_zeros()) as usize
    }
}

impl ShapeCodec {
    pub fn new(
        image_size: (u32, u32),
        shape: ShapeKind,
        n_shapes: usize,
        color_bit_depth: usize,
        draw_mode: PixelMode,
        symmetry: Vec<Symmetry>,
    ) -> Result<Self> {
        let (width, height) = image_size;
        if width == 0 || height == 0 {
            return Err(PolyvolveError::Configuration(format!(
                "degenerate image size {width}x{height}"
            )));
        }
        if n_shapes == 0 {
            return Err(PolyvolveError::Configuration(
                "shape count must be at least 1".to_string(),
            ));
        }
        if color_bit_depth == 0 || color_bit_depth > 8 {
            return Err(PolyvolveError::Configuration(format!(
                "color bit depth must be in 1..=8, got {color_bit_depth}"
            )));
        }

        let bits = BitLayout {
            x: bits_for(width),
            y: bits_for(height),
            channel: color_bit_depth,
            visible: 1,
        };
        let color_bits = color_bit_depth * draw_mode.channels();
        let point_bits = bits.x + bits.y;
        let points_per_shape = shape.points_per_shape();
        let genome_size = color_bits
            + n_shapes * (bits.visible + color_bits + point_bits + points_per_shape * point_bits);

        Ok(Self {
            image_size,
            shape,
            n_shapes,
            color_bit_depth,
            draw_mode,
            symmetry,
            bits,
            genome_size,
        })
    }

    pub fn genome_size(&self) -> usize {
        self.genome_size
    }

    pub fn image_size(&self) -> (u32, u32) {
        self.image_size
    }

    pub fn shape_kind(&self) -> ShapeKind {
        self.shape
    }

    pub fn draw_mode(&self) -> PixelMode {
        self.draw_mode
    }

    pub fn color_bit_depth(&self) -> usize {
        self.color_bit_depth
    }

    pub fn symmetry(&self) -> &[Symmetry] {
        &self.symmetry
    }

    pub fn bits(&self) -> &BitLayout {
        &self.bits
    }

    /// Uniformly random genome of the configured size.
    pub fn generate<R: Rng>(&self, rng: &mut R) -> Genome {
        random_genome(self.genome_size, rng)
    }

    /// Random genome with every shape's visibility bit forced to `visible`.
    /// Two passes: the genome must be decoded first to locate the
    /// visibility-bit offsets.
    pub fn generate_with_visibility<R: Rng>(&self, rng: &mut R, visible: bool) -> Genome {
        let mut genome = self.generate(rng);
        let decoded = self.decode(&genome);
        for offset in decoded.visibility_offsets {
            genome[offset] = visible as u8;
        }
        genome
    }

    /// Translate a genome into a drawable recipe.
    ///
    /// Reads the background color, then shapes until the genome is
    /// exhausted. Running out of bits mid-shape is not an error: decoding
    /// stops and returns the shapes fully read, so truncated and
    /// extra-length genomes are both valid inputs. Shapes with a cleared
    /// visibility bit are skipped.
    pub fn decode(&self, genome: &Genome) -> Phenotype {
        let mut reader = BitReader::new(genome);
        let channels = self.draw_mode.channels();
        let background = self
            .read_color(&mut reader)
            .unwrap_or_else(|| vec![0; channels]);

        let points_per_shape = self.shape.points_per_shape();
        let mut shapes = Vec::new();
        let mut visibility_offsets = Vec::new();

        while reader.position() < genome.len() {
            visibility_offsets.push(reader.position());
            let Some(shape) = self.read_shape(&mut reader, points_per_shape) else {
                break;
            };
            if let Some(shape) = shape {
                shapes.push(shape);
            }
        }

        Phenotype {
            background,
            shapes,
            visibility_offsets,
        }
    }

    /// One shape record. `None` on underrun, `Some(None)` for a fully read
    /// but invisible shape.
    fn read_shape(
        &self,
        reader: &mut BitReader,
        points_per_shape: usize,
    ) -> Option<Option<DecodedShape>> {
        let visible = reader.read(self.bits.visible)?;
        let anchor = self.read_point(reader)?;
        let mut points = Vec::with_capacity(points_per_shape);
        for _ in 0..points_per_shape {
            let (dx, dy) = self.read_point(reader)?;
            points.push((anchor.0 + dx, anchor.1 + dy));
        }
        let color = self.read_color(reader)?;

        if visible == 1 {
            Some(Some(DecodedShape { color, points }))
        } else {
            Some(None)
        }
    }

    fn read_point(&self, reader: &mut BitReader) -> Option<(i32, i32)> {
        let x = reader.read(self.bits.x)?;
        let y = reader.read(self.bits.y)?;
        Some((x as i32, y as i32))
    }

    fn read_color(&self, reader: &mut BitReader) -> Option<Color> {
        (0..self.draw_mode.channels())
            .map(|_| reader.read(self.bits.channel).map(|v| v as u8))
            .collect()
    }
}

/// Cursor over a genome's bases, reading big-endian bit fields.
struct BitReader<'a> {
    genome: &'a [u8],
    index: usize,
}

impl<'a> BitReader<'a> {
    fn new(genome: &'a [u8]) -> Self {
        Self { genome, index: 0 }
    }

    fn position(&self) -> usize {
        self.index
    }

    /// Decode the next `n_bits` bases as an unsigned value, or `None` if
    /// fewer than `n_bits` remain. A 0-bit field always reads as 0.
    fn read(&mut self, n_bits: usize) -> Option<u32> {
        if self.index + n_bits > self.genome.len() {
            return None;
        }
        let mut value = 0u32;
        for &base in &self.genome[self.index..self.index + n_bits] {
            value = (value << 1) | base as u32;
        }
        self.index += n_bits;
        Some(value)
    }
}
