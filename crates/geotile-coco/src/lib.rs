// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 GeoTile COCO Contributors. All Rights Reserved.

//! # GeoTile COCO
//!
//! Converts a large georeferenced raster plus a vector layer of labeled
//! polygons into a tiled object-detection dataset in COCO format.
//!
//! The raster is cut into fixed-size, overlapping pixel windows. Each window
//! is intersected with the polygons in world coordinates, the intersections
//! are mapped into tile-local pixel coordinates, and one COCO annotation with
//! bounding box, bounding-box area and segmentation ring is emitted per
//! surviving polygon.
//!
//! ## Features
//!
//! - **Tile Grid**: row-major windows with configurable size and overlap;
//!   windows that would run past the raster edge are dropped
//! - **Categories**: deterministic ids from the sorted distinct values of a
//!   class attribute
//! - **Geometry**: invalid polygons are repaired, multi-part and degenerate
//!   intersections are skipped
//! - **GeoTIFF / GeoJSON**: 8-bit GeoTIFF decoding with GeoKey CRS detection,
//!   GeoJSON polygons reprojected to the raster CRS
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use geotile_coco::{TilingConfig, convert};
//! use std::path::PathBuf;
//!
//! let config = TilingConfig {
//!     geotiff: Some(PathBuf::from("scene.tif")),
//!     vector: Some(PathBuf::from("labels.geojson")),
//!     class_field: Some("landuse".to_string()),
//!     ..Default::default()
//! };
//!
//! let summary = convert(&config, None)?;
//! println!(
//!     "Wrote {} tiles and {} annotations to {}",
//!     summary.tiles,
//!     summary.annotations,
//!     summary.annotations_path.display()
//! );
//! # Ok::<(), geotile_coco::Error>(())
//! ```
//!
//! ## Optional Features
//!
//! - `profiling`: `tracing` spans around the conversion run and each tile

mod category;
mod config;
mod encode;
mod error;
mod grid;
mod intersect;
mod pipeline;
mod projection;
mod raster;
mod transform;
mod vector;

pub mod coco;

pub use crate::{
    category::{AttributeValue, Category, CategoryIndex, SUPERCATEGORY},
    config::{ENV_PREFIX, TilingConfig},
    encode::{FileImageEncoder, ImageEncoder, ImageFormat},
    error::Error,
    grid::{TileGrid, TileWindow},
    intersect::{MIN_RING_VALUES, PolygonIntersector, TileIntersection, has_min_vertices, repair},
    pipeline::{ConversionSummary, Tiler, convert, tile_file_name},
    projection::{Crs, Reprojector},
    raster::{GeoTiffRaster, MemoryRaster, PixelBuffer, RasterSource},
    transform::GeoTransform,
    vector::{LabeledPolygon, VectorLayer},
};

/// Progress information for long-running operations.
///
/// Sent once per processed tile during a conversion.
///
/// # Examples
///
/// ```rust
/// use geotile_coco::Progress;
///
/// let progress = Progress {
///     current: 25,
///     total: 100,
/// };
/// let percentage = (progress.current as f64 / progress.total as f64) * 100.0;
/// println!(
///     "Progress: {:.1}% ({}/{})",
///     percentage, progress.current, progress.total
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// Current number of completed items.
    pub current: usize,
    /// Total number of items to process.
    pub total: usize,
}
