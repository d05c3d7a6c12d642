// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 GeoTile COCO Contributors. All Rights Reserved.

//! Affine mapping between raster pixel indices and world coordinates.
//!
//! Coefficients follow the `(a, b, c, d, e, f)` convention:
//!
//! ```text
//! x_world = a * col + b * row + c
//! y_world = d * col + e * row + f
//! ```
//!
//! For a north-up raster `b = d = 0`, `a` is the pixel width and `e` is the
//! (negative) pixel height.

use crate::{Error, grid::TileWindow};
use geo::{Coord, Rect};

/// Invertible pixel ↔ world affine transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    forward: [f64; 6],
    inverse: [f64; 6],
}

impl GeoTransform {
    /// Create a transform from its six coefficients.
    ///
    /// Fails with [`Error::InvalidTransform`] when the linear part is singular
    /// or any coefficient is not finite.
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Result<Self, Error> {
        let forward = [a, b, c, d, e, f];
        if forward.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidTransform(format!(
                "non-finite coefficient in {:?}",
                forward
            )));
        }

        let det = a * e - b * d;
        if det == 0.0 {
            return Err(Error::InvalidTransform(format!(
                "singular matrix (determinant 0) in {:?}",
                forward
            )));
        }

        let ia = e / det;
        let ib = -b / det;
        let id = -d / det;
        let ie = a / det;
        let ic = -(ia * c + ib * f);
        let if_ = -(id * c + ie * f);

        Ok(Self {
            forward,
            inverse: [ia, ib, ic, id, ie, if_],
        })
    }

    /// North-up transform from an origin (top-left corner) and pixel size.
    pub fn from_origin(
        west: f64,
        north: f64,
        pixel_width: f64,
        pixel_height: f64,
    ) -> Result<Self, Error> {
        Self::new(pixel_width, 0.0, west, 0.0, -pixel_height, north)
    }

    /// Map a pixel position `(col, row)` to world coordinates.
    pub fn pixel_to_world(&self, col: f64, row: f64) -> (f64, f64) {
        let [a, b, c, d, e, f] = self.forward;
        (a * col + b * row + c, d * col + e * row + f)
    }

    /// Map world coordinates to a fractional pixel position `(col, row)`.
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let [a, b, c, d, e, f] = self.inverse;
        (a * x + b * y + c, d * x + e * y + f)
    }

    /// World-space bounding rectangle covered by a pixel window.
    ///
    /// All four window corners are transformed so rotated rasters still yield
    /// the enclosing axis-aligned rectangle.
    pub fn window_bounds(&self, window: &TileWindow) -> Rect<f64> {
        let x0 = window.x as f64;
        let y0 = window.y as f64;
        let x1 = x0 + window.width as f64;
        let y1 = y0 + window.height as f64;

        let corners = [
            self.pixel_to_world(x0, y0),
            self.pixel_to_world(x1, y0),
            self.pixel_to_world(x1, y1),
            self.pixel_to_world(x0, y1),
        ];

        let (mut min_x, mut min_y) = corners[0];
        let (mut max_x, mut max_y) = corners[0];
        for &(x, y) in &corners[1..] {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        Rect::new(Coord { x: min_x, y: min_y }, Coord { x: max_x, y: max_y })
    }
}
