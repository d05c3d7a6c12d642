// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 GeoTile COCO Contributors. All Rights Reserved.

//! Tile grid scheduling.
//!
//! Windows are emitted row-major with a stride of `tile_size - overlap`.
//! Windows that would extend past the right or bottom raster edge are dropped
//! entirely, so a strip narrower than one full tile beyond the last full step
//! is not covered by the dataset.

use crate::Error;

/// Square pixel window at an integer raster origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileWindow {
    /// Column of the top-left pixel.
    pub x: u32,
    /// Row of the top-left pixel.
    pub y: u32,
    /// Window width in pixels.
    pub width: u32,
    /// Window height in pixels.
    pub height: u32,
}

/// Ordered, deterministic sequence of [`TileWindow`]s covering a raster.
#[derive(Debug, Clone)]
pub struct TileGrid {
    tile_size: u32,
    step: u32,
    columns: u32,
    rows: u32,
    next: u64,
}

impl TileGrid {
    /// Schedule windows over a `width` × `height` raster.
    ///
    /// Fails with [`Error::InvalidConfiguration`] when the raster is empty,
    /// `tile_size` is zero, or `overlap >= tile_size`.
    pub fn new(width: u32, height: u32, tile_size: u32, overlap: u32) -> Result<Self, Error> {
        if tile_size == 0 {
            return Err(Error::InvalidConfiguration(
                "tile size must be positive".to_string(),
            ));
        }
        if overlap >= tile_size {
            return Err(Error::InvalidConfiguration(format!(
                "overlap ({}) must be smaller than tile size ({})",
                overlap, tile_size
            )));
        }
        if width == 0 || height == 0 {
            return Err(Error::InvalidConfiguration(format!(
                "raster dimensions must be positive, got {}x{}",
                width, height
            )));
        }

        let step = tile_size - overlap;
        Ok(Self {
            tile_size,
            step,
            columns: fitting_origins(width, tile_size, step),
            rows: fitting_origins(height, tile_size, step),
            next: 0,
        })
    }

    /// Distance between consecutive window origins.
    pub fn step(&self) -> u32 {
        self.step
    }

    /// Number of windows per row.
    pub fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of window rows.
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Total number of windows the grid emits.
    pub fn total(&self) -> u64 {
        self.columns as u64 * self.rows as u64
    }

    fn window_at(&self, index: u64) -> TileWindow {
        let row = (index / self.columns as u64) as u32;
        let col = (index % self.columns as u64) as u32;
        TileWindow {
            x: col * self.step,
            y: row * self.step,
            width: self.tile_size,
            height: self.tile_size,
        }
    }
}

/// Count of origins `0, step, 2·step, …` with `origin + tile_size <= extent`.
fn fitting_origins(extent: u32, tile_size: u32, step: u32) -> u32 {
    if extent < tile_size {
        0
    } else {
        (extent - tile_size) / step + 1
    }
}

impl Iterator for TileGrid {
    type Item = TileWindow;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.total() {
            return None;
        }
        let window = self.window_at(self.next);
        self.next += 1;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.total() - self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TileGrid {}
