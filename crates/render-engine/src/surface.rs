//! Drawing surfaces.
//!
//! The renderer only needs to clear a surface and draw a scaled image centred
//! on a point. [`RasterSurface`] implements that over an in-memory RGBA
//! buffer and is used both for the live preview and the fixed-resolution
//! recording buffer.

use std::borrow::Cow;
use std::path::Path;

use blaster_common::error::{BlasterError, BlasterResult};
use blaster_media_model::{CanvasSize, Point2D};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

/// Something the renderer can draw onto.
pub trait Surface {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Fill the whole surface with an opaque colour.
    fn clear(&mut self, rgba: [u8; 4]);

    /// Draw `image` scaled to `width` x `height` pixels, centred on `center`.
    /// Parts outside the surface are clipped.
    fn draw_image(&mut self, image: &RgbaImage, center: Point2D, width: f64, height: f64);
}

/// An in-memory RGBA surface.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    pixels: RgbaImage,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
        }
    }

    pub fn for_canvas(canvas: CanvasSize) -> Self {
        let (width, height) = canvas.dimensions();
        Self::new(width, height)
    }

    /// Raw RGBA bytes, row-major, `width * height * 4` long.
    pub fn as_rgba(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Write the current contents as a PNG.
    pub fn save_png(&self, path: &Path) -> BlasterResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.pixels
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| BlasterError::render(format!("Failed to write {}: {e}", path.display())))
    }
}

impl Surface for RasterSurface {
    fn width(&self) -> u32 {
        self.pixels.width()
    }

    fn height(&self) -> u32 {
        self.pixels.height()
    }

    fn clear(&mut self, rgba: [u8; 4]) {
        let color = Rgba(rgba);
        for pixel in self.pixels.pixels_mut() {
            *pixel = color;
        }
    }

    fn draw_image(&mut self, image: &RgbaImage, center: Point2D, width: f64, height: f64) {
        if !(width.is_finite() && height.is_finite()) {
            return;
        }
        let target_w = width.round();
        let target_h = height.round();
        if target_w < 1.0 || target_h < 1.0 || image.width() == 0 || image.height() == 0 {
            return;
        }

        let left = (center.x - target_w / 2.0).round();
        let top = (center.y - target_h / 2.0).round();
        let (surface_w, surface_h) = (f64::from(self.width()), f64::from(self.height()));

        // Visible part of the target rectangle, in surface pixels.
        let x0 = left.max(0.0);
        let y0 = top.max(0.0);
        let x1 = (left + target_w).min(surface_w);
        let y1 = (top + target_h).min(surface_h);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        if target_w <= surface_w && target_h <= surface_h {
            let (target_w, target_h) = (target_w as u32, target_h as u32);
            let scaled: Cow<'_, RgbaImage> = if image.dimensions() == (target_w, target_h) {
                Cow::Borrowed(image)
            } else {
                Cow::Owned(imageops::resize(image, target_w, target_h, FilterType::Triangle))
            };
            imageops::overlay(&mut self.pixels, scaled.as_ref(), left as i64, top as i64);
            return;
        }

        // Larger than the surface: resample only the visible region.
        let (visible_w, visible_h) = ((x1 - x0) as u32, (y1 - y0) as u32);
        let mut visible = RgbaImage::new(visible_w, visible_h);
        for (vx, vy, pixel) in visible.enumerate_pixels_mut() {
            let u = (x0 + f64::from(vx) + 0.5 - left) / target_w;
            let v = (y0 + f64::from(vy) + 0.5 - top) / target_h;
            if let Some(sample) = imageops::sample_bilinear(image, u as f32, v as f32) {
                *pixel = sample;
            }
        }
        imageops::overlay(&mut self.pixels, &visible, x0 as i64, y0 as i64);
    }
}
