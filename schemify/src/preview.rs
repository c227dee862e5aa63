//! Flat preview image of a resolved grid.

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use crate::error::{Error, Result};
use crate::matcher::ResolvedCell;

const CHECKER_LIGHT: Rgba<u8> = Rgba([204, 204, 204, 255]);
const CHECKER_DARK: Rgba<u8> = Rgba([153, 153, 153, 255]);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreviewOptions {
    /// Edge of one cell in pixels.
    pub cell_size: u32,
    /// How strongly glass tints its base in the preview.
    pub glass_opacity: f64,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            cell_size: 16,
            glass_opacity: 0.7,
        }
    }
}

/// Draw each cell as a `cell_size` square, row-major. Transparent cells get a checkerboard.
#[tracing::instrument(skip_all, fields(width = width, length = length))]
pub fn render_preview(
    cells: &[ResolvedCell],
    width: usize,
    length: usize,
    options: &PreviewOptions,
) -> Result<RgbaImage> {
    let size = options.cell_size.max(1);
    let image_width = pixel_extent("Width", width, size)?;
    let image_length = pixel_extent("Length", length, size)?;
    let expected = width
        .checked_mul(length)
        .ok_or(Error::DimensionOutOfRange {
            axis: "Length",
            value: length,
        })?;
    if cells.len() != expected {
        return Err(Error::GridSizeMismatch {
            width,
            length,
            expected,
            actual: cells.len(),
        });
    }
    let mut image = RgbaImage::new(image_width, image_length);
    for (i, cell) in cells.iter().enumerate() {
        let x = (i % width) as u32 * size;
        let y = (i / width) as u32 * size;
        let rect = Rect::at(x as i32, y as i32).of_size(size, size);
        match cell {
            ResolvedCell::Air => draw_checker(&mut image, x, y, size),
            ResolvedCell::Block { base, glass } => {
                let color = match glass.as_ref().filter(|g| !g.is_sentinel()) {
                    Some(glass) => base.color.blend(glass.color, options.glass_opacity),
                    None => base.color,
                };
                draw_filled_rect_mut(&mut image, rect, color.to_image_rgba(u8::MAX));
            }
        }
    }
    Ok(image)
}

/// Pixel extent of `cells` cells along one axis. Must stay within `i32` for drawing.
fn pixel_extent(axis: &'static str, cells: usize, size: u32) -> Result<u32> {
    u32::try_from(cells)
        .ok()
        .and_then(|cells| cells.checked_mul(size))
        .filter(|&pixels| pixels <= i32::MAX as u32)
        .ok_or(Error::DimensionOutOfRange { axis, value: cells })
}

fn draw_checker(image: &mut RgbaImage, x: u32, y: u32, size: u32) {
    draw_filled_rect_mut(image, Rect::at(x as i32, y as i32).of_size(size, size), CHECKER_LIGHT);
    let half = size / 2;
    if half == 0 {
        return;
    }
    for (dx, dy) in [(0, 0), (half, half)] {
        let rect = Rect::at((x + dx) as i32, (y + dy) as i32).of_size(half, half);
        draw_filled_rect_mut(image, rect, CHECKER_DARK);
    }
}
