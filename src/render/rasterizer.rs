//! CPU rasterization of decoded shape recipes via tiny-skia.

use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Rect, Transform};

use crate::error::{PolyvolveError, Result};
use crate::render::{Color, DecodedShape, PixelBuffer, PixelMode, ShapeKind};

/// Paint `shapes` over a `background` fill and return the pixels in
/// `dst_mode`. Shapes are drawn in list order (later entries over earlier
/// ones) with alpha blending per `draw_mode`; colors are decoded channel
/// values of `color_bit_depth` bits each, rescaled to the 0-255 range.
pub fn render(
    image_size: (u32, u32),
    background: &Color,
    shapes: &[DecodedShape],
    kind: ShapeKind,
    dst_mode: PixelMode,
    draw_mode: PixelMode,
    color_bit_depth: usize,
) -> Result<PixelBuffer> {
    let (width, height) = image_size;
    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| PolyvolveError::Render(format!("invalid image size {width}x{height}")))?;

    // The background only uses as many channels as the destination mode has;
    // the extra decoded channels are ignored.
    let bg = &background[..background.len().min(dst_mode.channels())];
    let (r, g, b, _) = to_rgba(bg, color_bit_depth);
    pixmap.fill(tiny_skia::Color::from_rgba8(r, g, b, 255));

    for shape in shapes {
        let Some(path) = build_path(kind, &shape.points) else {
            // Degenerate geometry (zero-area rect/ellipse): nothing to paint.
            continue;
        };
        let channels = &shape.color[..shape.color.len().min(draw_mode.channels())];
        let (r, g, b, a) = to_rgba(channels, color_bit_depth);
        let mut paint = Paint::default();
        paint.set_color_rgba8(r, g, b, a);
        paint.anti_alias = true;
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }

    Ok(pixmap_to_buffer(&pixmap, dst_mode))
}

/// Map a decoded channel tuple onto RGBA bytes: 1 channel = opaque gray,
/// 2 = gray+alpha, 3 = opaque RGB, 4 = RGBA.
fn to_rgba(channels: &[u8], color_bit_depth: usize) -> (u8, u8, u8, u8) {
    let scale = |v: u8| -> u8 {
        if color_bit_depth >= 8 {
            v
        } else {
            let max = (1u16 << color_bit_depth) - 1;
            ((v as u16 * 255) / max.max(1)) as u8
        }
    };
    match channels {
        [l] => (scale(*l), scale(*l), scale(*l), 255),
        [l, a] => (scale(*l), scale(*l), scale(*l), scale(*a)),
        [r, g, b] => (scale(*r), scale(*g), scale(*b), 255),
        [r, g, b, a] => (scale(*r), scale(*g), scale(*b), scale(*a)),
        _ => (0, 0, 0, 255),
    }
}

fn build_path(kind: ShapeKind, points: &[(i32, i32)]) -> Option<tiny_skia::Path> {
    match kind {
        ShapeKind::Triangle | ShapeKind::Quad => polygon_path(points),
        ShapeKind::Rect => {
            let rect = corner_rect(points)?;
            let mut pb = PathBuilder::new();
            pb.push_rect(rect);
            pb.finish()
        }
        ShapeKind::Ellipse => {
            let rect = corner_rect(points)?;
            PathBuilder::from_oval(rect)
        }
        ShapeKind::Circle => {
            // One anchor point plus a fixed 10px bounding box.
            let &(x, y) = points.first()?;
            let rect =
                Rect::from_ltrb(x as f32, y as f32, (x + 10) as f32, (y + 10) as f32)?;
            PathBuilder::from_oval(rect)
        }
    }
}

fn polygon_path(points: &[(i32, i32)]) -> Option<tiny_skia::Path> {
    let (first, rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.0 as f32, first.1 as f32);
    for &(x, y) in rest {
        pb.line_to(x as f32, y as f32);
    }
    pb.close();
    pb.finish()
}

/// Bounding rect from two corner points, normalized so any corner order is
/// accepted. Zero-area boxes are rejected.
fn corner_rect(points: &[(i32, i32)]) -> Option<Rect> {
    if points.len() < 2 {
        return None;
    }
    let (x0, y0) = points[0];
    let (x1, y1) = points[1];
    Rect::from_ltrb(
        x0.min(x1) as f32,
        y0.min(y1) as f32,
        x0.max(x1) as f32,
        y0.max(y1) as f32,
    )
}

/// Convert tiny-skia's premultiplied RGBA pixmap into the destination mode.
fn pixmap_to_buffer(pixmap: &Pixmap, dst_mode: PixelMode) -> PixelBuffer {
    let mut buffer = PixelBuffer::new(pixmap.width(), pixmap.height(), dst_mode);
    buffer.data.clear();

    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        let (r, g, b, a) = (c.red(), c.green(), c.blue(), c.alpha());
        match dst_mode {
            PixelMode::L => buffer.data.push(luma(r, g, b)),
            PixelMode::La => {
                buffer.data.push(luma(r, g, b));
                buffer.data.push(a);
            }
            PixelMode::Rgb => buffer.data.extend_from_slice(&[r, g, b]),
            PixelMode::Rgba => buffer.data.extend_from_slice(&[r, g, b, a]),
        }
    }
    buffer
}

/// ITU-R 601 luma, the conversion used when the target is grayscale.
fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
}
