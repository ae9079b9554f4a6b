// Copyright 2026 the Triptych Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A minimal triangle rasterizer.
//!
//! Vertices are in normalized device coordinates (x and y in `-1..=1`, y
//! up), the same space the GPU backends' `vs_main` writes. A pixel is
//! covered when its center lies inside or on the triangle.

use kurbo::Point;
use triptych_core::panel::PixelFormat;

use crate::image::SoftImage;

/// A solid-colored triangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    /// Corners in normalized device coordinates.
    pub vertices: [Point; 3],
    /// Fill color, RGBA.
    pub color: [u8; 4],
}

impl Triangle {
    /// The triangle every backend draws: apex up, half the panel wide.
    #[must_use]
    pub const fn centered(color: [u8; 4]) -> Self {
        Self {
            vertices: [
                Point::new(0.0, 0.5),
                Point::new(0.5, -0.5),
                Point::new(-0.5, -0.5),
            ],
            color,
        }
    }

    /// Whether `p` (in normalized device coordinates) is covered. Either
    /// winding is accepted.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        let [a, b, c] = self.vertices;
        let e0 = (b - a).cross(p - a);
        let e1 = (c - b).cross(p - b);
        let e2 = (a - c).cross(p - c);
        (e0 >= 0.0 && e1 >= 0.0 && e2 >= 0.0) || (e0 <= 0.0 && e1 <= 0.0 && e2 <= 0.0)
    }

    /// Clears `image` to `background` and fills the triangle over it.
    ///
    /// Both colors are RGBA and are swizzled to the image's format.
    pub fn draw(&self, image: &mut SoftImage, background: [u8; 4]) {
        let layout = image.layout();
        let format = layout.format;
        image.clear(encode_color(background, format));
        let fill = encode_color(self.color, format);
        let w = f64::from(layout.extent.width);
        let h = f64::from(layout.extent.height);
        for y in 0..layout.extent.height {
            let ny = 1.0 - (f64::from(y) + 0.5) / h * 2.0;
            for x in 0..layout.extent.width {
                let nx = (f64::from(x) + 0.5) / w * 2.0 - 1.0;
                if self.contains(Point::new(nx, ny)) {
                    image.set_pixel(x, y, fill);
                }
            }
        }
    }
}

/// Converts an RGBA color to `format`'s byte order.
#[must_use]
pub const fn encode_color(rgba: [u8; 4], format: PixelFormat) -> [u8; 4] {
    let [r, g, b, a] = rgba;
    match format {
        PixelFormat::Rgba8Unorm => [r, g, b, a],
        PixelFormat::Bgra8Unorm => [b, g, r, a],
    }
}

#[cfg(test)]
mod tests {
    use triptych_core::panel::Extent;

    use super::*;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const BLACK: [u8; 4] = [0, 0, 0, 255];

    #[test]
    fn center_is_covered_and_corners_are_not() {
        let mut image = SoftImage::tight(Extent::new(32, 48), PixelFormat::Bgra8Unorm);
        Triangle::centered(RED).draw(&mut image, BLACK);
        assert_eq!(image.pixel(16, 24), [0, 0, 255, 255]);
        assert_eq!(image.pixel(0, 0), BLACK);
        assert_eq!(image.pixel(31, 47), BLACK);
    }

    #[test]
    fn winding_does_not_matter() {
        let cw = Triangle::centered(RED);
        let mut ccw = cw;
        ccw.vertices.reverse();
        let p = Point::new(0.1, -0.2);
        assert!(cw.contains(p));
        assert!(ccw.contains(p));
        assert!(!ccw.contains(Point::new(0.9, 0.9)));
    }

    #[test]
    fn rgba_targets_keep_channel_order() {
        assert_eq!(encode_color(RED, PixelFormat::Rgba8Unorm), RED);
        assert_eq!(encode_color(RED, PixelFormat::Bgra8Unorm), [0, 0, 255, 255]);
    }
}
