//! Drawable recipe types shared by the codec, the rasterizer and the
//! evaluator: shape kinds, pixel modes, symmetry elements and pixel buffers.

pub mod rasterizer;

use serde::{Deserialize, Serialize};

use crate::error::{PolyvolveError, Result};

pub use rasterizer::render;

/// Closed set of drawable shape kinds. Each kind fixes how many points the
/// codec reads per shape (in addition to the anchor point).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Circle,
    Ellipse,
    Quad,
    Rect,
    Triangle,
}

impl ShapeKind {
    pub fn points_per_shape(self) -> usize {
        match self {
            ShapeKind::Circle => 1,
            ShapeKind::Ellipse => 2,
            ShapeKind::Quad => 4,
            ShapeKind::Rect => 2,
            ShapeKind::Triangle => 3,
        }
    }

}

/// Pixel layout of a buffer: luminance, luminance+alpha, RGB or RGBA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PixelMode {
    L,
    La,
    Rgb,
    Rgba,
}

impl PixelMode {
    pub fn channels(self) -> usize {
        match self {
            PixelMode::L => 1,
            PixelMode::La => 2,
            PixelMode::Rgb => 3,
            PixelMode::Rgba => 4,
        }
    }
}

/// Symmetry elements applied during phenotype preparation. Each element
/// appends a transformed copy of every accumulated shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Symmetry {
    MirrorX,
    MirrorY,
    Point,
    Identity,
}

impl Symmetry {
    /// Parse a compact element string like `"xy"` or `"o."`.
    pub fn parse_elements(elements: &str) -> Result<Vec<Symmetry>> {
        elements.chars()
            .map(|c| match c {
                'x' => Ok(Symmetry::MirrorX),
                'y' => Ok(Symmetry::MirrorY),
                'o' => Ok(Symmetry::Point),
                '.' => Ok(Symmetry::Identity),
                other => Err(PolyvolveError::Configuration(format!(
                    "invalid symmetry element: {other:?}"
                ))),
            })
            .collect()
    }

    fn apply(self, image_size: (u32, u32), points: &[(i32, i32)]) -> Vec<(i32, i32)> {
        let (w, h) = (image_size.0 as i32, image_size.1 as i32);
        points
            .iter()
            .map(|&(x, y)| match self {
                Symmetry::MirrorX => (w - x, y),
                Symmetry::MirrorY => (x, h - y),
                Symmetry::Point => (w - x, h - y),
                Symmetry::Identity => (x, y),
            })
            .collect()
    }
}

/// Color as decoded from the genome: one value per channel, in genome order.
pub type Color = Vec<u8>;

/// One visible shape from a decoded genome.
///
/// Field order matters: the derived `Ord` gives the (color, points) order
/// used to sort the final shape list, which decides paint order for
/// overlapping shapes and must stay stable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DecodedShape {
    pub color: Color,
    pub points: Vec<(i32, i32)>,
}

/// Decoded genome: background color plus visible shapes in genome order.
/// `visibility_offsets` records the bit offset of every shape's visibility
/// flag so generation can force-set them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phenotype {
    pub background: Color,
    pub shapes: Vec<DecodedShape>,
    pub visibility_offsets: Vec<usize>,
}

/// Expand shapes with the configured symmetry elements.
///
/// Each element transforms every shape accumulated so far (so elements
/// compose), then the full list is sorted to fix a deterministic, total
/// paint order.
pub fn expand_symmetry(
    image_size: (u32, u32),
    elements: &[Symmetry],
    shapes: &[DecodedShape],
) -> Vec<DecodedShape> {
    let mut total = shapes.to_vec();
    for &element in elements {
        let snapshot = total.clone();
        for shape in &snapshot {
            total.push(DecodedShape {
                color: shape.color.clone(),
                points: element.apply(image_size, &shape.points),
            });
        }
    }
    total.sort();
    total
}

/// A raw pixel buffer in one of the supported pixel modes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub mode: PixelMode,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, mode: PixelMode) -> Self {
        let len = (width * height) as usize * mode.channels();
        Self {
            width,
            height,
            mode,
            data: vec![0; len],
        }
    }
}
