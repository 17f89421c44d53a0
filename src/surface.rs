//! Output surfaces the renderer blits composited layers onto.

use glam::{DAffine2, DVec2};
use image::{Rgba, RgbaImage};

use crate::compositor::PixelBuffer;

/// A 2D drawing target with an affine user-to-device transform.
pub trait Surface {
    /// Device size in pixels
    fn size(&self) -> (u32, u32);

    /// Reset every device pixel to transparent black.
    fn clear(&mut self);

    /// Replace the current user-to-device transform.
    fn set_transform(&mut self, transform: DAffine2);

    /// Draw `source` stretched over the user-space rectangle at `offset`
    /// with extent `size`, multiplied by `alpha`.
    fn blit(&mut self, source: &PixelBuffer, offset: DVec2, size: DVec2, alpha: f64);
}

/// Software surface backed by an [`RgbaImage`].
///
/// Blits sample the source with nearest-neighbour lookup and composite
/// source-over.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    image: RgbaImage,
    transform: DAffine2,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
            transform: DAffine2::IDENTITY,
        }
    }

    pub fn transform(&self) -> DAffine2 {
        self.transform
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Device pixel range covered by a user-space rectangle, clipped to the image
    fn device_bounds(&self, offset: DVec2, size: DVec2) -> Option<(u32, u32, u32, u32)> {
        let corners = [
            offset,
            offset + DVec2::new(size.x, 0.0),
            offset + DVec2::new(0.0, size.y),
            offset + size,
        ]
        .map(|corner| self.transform.transform_point2(corner));

        let min = corners.iter().fold(DVec2::INFINITY, |acc, c| acc.min(*c));
        let max = corners.iter().fold(DVec2::NEG_INFINITY, |acc, c| acc.max(*c));
        let (width, height) = self.image.dimensions();

        let x0 = min.x.floor().max(0.0);
        let y0 = min.y.floor().max(0.0);
        let x1 = max.x.ceil().min(width as f64);
        let y1 = max.y.ceil().min(height as f64);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }
}

#[inline]
fn blend(dst: &mut Rgba<u8>, src: [u8; 4], alpha: f64) {
    let a = src[3] as f64 / 255.0 * alpha;
    if a <= 0.0 {
        return;
    }
    let dst_a = dst[3] as f64 / 255.0;
    let out_a = a + dst_a * (1.0 - a);
    for c in 0..3 {
        let value = (src[c] as f64 * a + dst[c] as f64 * dst_a * (1.0 - a)) / out_a;
        dst[c] = value.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

impl Surface for RasterSurface {
    fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn clear(&mut self) {
        self.image.pixels_mut().for_each(|p| *p = Rgba([0, 0, 0, 0]));
    }

    fn set_transform(&mut self, transform: DAffine2) {
        self.transform = transform;
    }

    fn blit(&mut self, source: &PixelBuffer, offset: DVec2, size: DVec2, alpha: f64) {
        if source.width() == 0 || source.height() == 0 || size.x <= 0.0 || size.y <= 0.0 {
            return;
        }
        let alpha = alpha.clamp(0.0, 1.0);
        let Some((x0, y0, x1, y1)) = self.device_bounds(offset, size) else {
            return;
        };

        let inverse = self.transform.inverse();
        let dims = DVec2::new(source.width() as f64, source.height() as f64);
        let pixels = source.pixels();

        for y in y0..y1 {
            for x in x0..x1 {
                let user = inverse.transform_point2(DVec2::new(x as f64 + 0.5, y as f64 + 0.5));
                let local = (user - offset) / size * dims;
                if local.x < 0.0 || local.y < 0.0 || local.x >= dims.x || local.y >= dims.y {
                    continue;
                }
                let index = local.y as usize * source.width() + local.x as usize;
                blend(self.image.get_pixel_mut(x, y), pixels[index], alpha);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn buffer(width: usize, height: usize, colors: &[[u8; 4]]) -> PixelBuffer {
        PixelBuffer::from_pixels(width, height, colors).unwrap()
    }

    #[test]
    fn test_identity_blit_copies_pixels() {
        let mut surface = RasterSurface::new(2, 1);
        let source = buffer(2, 1, &[[10, 20, 30, 255], [40, 50, 60, 255]]);
        surface.blit(&source, DVec2::ZERO, DVec2::new(2.0, 1.0), 1.0);
        assert_eq!(surface.image().get_pixel(0, 0).0, [10, 20, 30, 255]);
        assert_eq!(surface.image().get_pixel(1, 0).0, [40, 50, 60, 255]);
    }

    #[test]
    fn test_scaled_blit_uses_nearest_neighbour() {
        let mut surface = RasterSurface::new(4, 2);
        surface.set_transform(DAffine2::from_scale(DVec2::splat(2.0)));
        let source = buffer(2, 1, &[[255, 0, 0, 255], [0, 0, 255, 255]]);
        surface.blit(&source, DVec2::ZERO, DVec2::new(2.0, 1.0), 1.0);
        assert_eq!(surface.image().get_pixel(1, 1).0, [255, 0, 0, 255]);
        assert_eq!(surface.image().get_pixel(2, 0).0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_rotation_turns_rows_into_columns() {
        let mut surface = RasterSurface::new(1, 2);
        // rotate +90 degrees about the origin, then move back into view
        surface.set_transform(
            DAffine2::from_translation(DVec2::new(1.0, 0.0)) * DAffine2::from_angle(FRAC_PI_2),
        );
        let source = buffer(2, 1, &[[1, 1, 1, 255], [2, 2, 2, 255]]);
        surface.blit(&source, DVec2::ZERO, DVec2::new(2.0, 1.0), 1.0);
        assert_eq!(surface.image().get_pixel(0, 0).0, [1, 1, 1, 255]);
        assert_eq!(surface.image().get_pixel(0, 1).0, [2, 2, 2, 255]);
    }

    #[test]
    fn test_alpha_blends_over_existing_content() {
        let mut surface = RasterSurface::new(1, 1);
        let base = buffer(1, 1, &[[0, 0, 0, 255]]);
        let overlay = buffer(1, 1, &[[200, 100, 0, 255]]);
        surface.blit(&base, DVec2::ZERO, DVec2::ONE, 1.0);
        surface.blit(&overlay, DVec2::ZERO, DVec2::ONE, 0.5);
        assert_eq!(surface.image().get_pixel(0, 0).0, [100, 50, 0, 255]);
    }

    #[test]
    fn test_transparent_source_leaves_destination() {
        let mut surface = RasterSurface::new(1, 1);
        surface.blit(&buffer(1, 1, &[[7, 7, 7, 255]]), DVec2::ZERO, DVec2::ONE, 1.0);
        surface.blit(&buffer(1, 1, &[[0, 0, 0, 0]]), DVec2::ZERO, DVec2::ONE, 1.0);
        assert_eq!(surface.image().get_pixel(0, 0).0, [7, 7, 7, 255]);
        surface.clear();
        assert_eq!(surface.image().get_pixel(0, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_blit_outside_is_clipped() {
        let mut surface = RasterSurface::new(2, 2);
        let source = buffer(1, 1, &[[9, 9, 9, 255]]);
        surface.blit(&source, DVec2::new(-10.0, -10.0), DVec2::ONE, 1.0);
        surface.blit(&source, DVec2::new(1.0, 1.0), DVec2::new(5.0, 5.0), 1.0);
        assert_eq!(surface.image().get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(surface.image().get_pixel(1, 1).0, [9, 9, 9, 255]);
    }
}
