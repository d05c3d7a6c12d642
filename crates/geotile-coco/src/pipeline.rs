// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 GeoTile COCO Contributors. All Rights Reserved.

//! Raster + vector → tiled COCO dataset conversion.
//!
//! The [`Tiler`] drives the tile grid in row-major order. For every window it
//! writes the tile image, appends an image record, intersects the labeled
//! polygons with the window and appends one annotation per surviving
//! intersection. The finished document is verified before it is written.

use crate::{
    Error, Progress,
    category::CategoryIndex,
    coco::{
        CocoInfo, CocoLicense, CocoWriteOptions, CocoWriter, DatasetAccumulator, build_annotation,
        verify_dataset,
    },
    config::TilingConfig,
    encode::{FileImageEncoder, ImageEncoder, ImageFormat},
    grid::{TileGrid, TileWindow},
    intersect::PolygonIntersector,
    raster::{GeoTiffRaster, RasterSource},
    vector::VectorLayer,
};
use chrono::{Datelike, Local, NaiveDateTime};
use std::{
    path::{Path, PathBuf},
    sync::mpsc::Sender,
};

/// COCO document version.
const DATASET_VERSION: &str = "1.0";

/// Id of the single license every tile is published under.
const LICENSE_ID: u32 = 1;

/// Outcome of a conversion run.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionSummary {
    /// Number of tiles written.
    pub tiles: usize,
    /// Number of annotations written.
    pub annotations: usize,
    /// Number of categories.
    pub categories: usize,
    /// Path of the annotation document.
    pub annotations_path: PathBuf,
    /// Directory holding the tile images.
    pub images_dir: PathBuf,
}

/// File name of the tile image for `image_id`.
pub fn tile_file_name(image_id: u64, format: ImageFormat) -> String {
    format!("tile_{}.{}", image_id, format.extension())
}

/// Per-run state shared by all tiles.
struct TileContext<'a> {
    intersector: PolygonIntersector<'a>,
    categories: &'a CategoryIndex,
    accumulator: DatasetAccumulator,
    images_dir: PathBuf,
    format: ImageFormat,
    tile_size: u32,
    date_captured: String,
}

/// Converts a raster and a labeled polygon layer into a COCO dataset.
///
/// # Example
///
/// ```rust,no_run
/// use geotile_coco::{FileImageEncoder, GeoTiffRaster, Tiler, TilingConfig, VectorLayer};
///
/// let config = TilingConfig {
///     class_field: Some("landuse".to_string()),
///     ..Default::default()
/// };
/// let raster = GeoTiffRaster::open("scene.tif")?;
/// let layer = VectorLayer::from_geojson_path("labels.geojson", None)?;
///
/// let summary = Tiler::new(config).run(&raster, &layer, &FileImageEncoder, None)?;
/// println!("{} tiles, {} annotations", summary.tiles, summary.annotations);
/// # Ok::<(), geotile_coco::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Tiler {
    config: TilingConfig,
    timestamp: NaiveDateTime,
}

impl Tiler {
    /// Create a tiler stamped with the current local time.
    pub fn new(config: TilingConfig) -> Self {
        Self {
            config,
            timestamp: Local::now().naive_local(),
        }
    }

    /// Use a fixed run timestamp for `date_created` and `date_captured`.
    ///
    /// Runs over unchanged inputs with the same timestamp produce identical
    /// documents.
    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn config(&self) -> &TilingConfig {
        &self.config
    }

    /// Run the conversion.
    ///
    /// Fails before touching the raster when the configuration is invalid or
    /// the class field is missing from the layer. Polygons that cannot be
    /// turned into an annotation for a tile are skipped, never fatal.
    #[cfg_attr(
        feature = "profiling",
        tracing::instrument(skip_all, fields(tile_size = self.config.tile_size))
    )]
    pub fn run<R, E>(
        &self,
        raster: &R,
        layer: &VectorLayer,
        encoder: &E,
        progress: Option<Sender<Progress>>,
    ) -> Result<ConversionSummary, Error>
    where
        R: RasterSource + ?Sized,
        E: ImageEncoder + ?Sized,
    {
        self.config.validate()?;
        let class_field = self.config.class_field.as_deref().ok_or_else(|| {
            Error::InvalidConfiguration("class_field is not set".to_string())
        })?;
        let format = self.config.image_format()?;

        let categories = CategoryIndex::from_layer(layer, class_field)?;

        if let Some(raster_crs) = raster.crs()
            && raster_crs != layer.crs()
        {
            log::warn!(
                "Vector layer is in {} but the raster is in {}; annotations may be misplaced",
                layer.crs(),
                raster_crs
            );
        }

        let (width, height) = raster.dimensions();
        let grid = TileGrid::new(width, height, self.config.tile_size, self.config.overlap)?;
        let total = grid.len();
        if total == 0 {
            log::warn!(
                "Raster {}x{} is smaller than one {}px tile; no tiles will be produced",
                width,
                height,
                self.config.tile_size
            );
        }

        let annotations_path = self.config.annotations_path();
        let images_dir = self.config.images_dir();
        std::fs::create_dir_all(&images_dir)?;

        let timestamp = format_timestamp(&self.timestamp);
        let mut context = TileContext {
            intersector: PolygonIntersector::new(layer, class_field, *raster.transform()),
            categories: &categories,
            accumulator: DatasetAccumulator::new(
                self.info(&timestamp),
                self.licenses(),
                categories.to_coco(),
            ),
            images_dir: images_dir.clone(),
            format,
            tile_size: self.config.tile_size,
            date_captured: timestamp,
        };

        log::info!(
            "Tiling {}x{} raster into {} tiles of {}px (step {}px) against {} polygons",
            width,
            height,
            total,
            self.config.tile_size,
            grid.step(),
            context.intersector.len()
        );

        for (index, window) in grid.enumerate() {
            process_tile(raster, encoder, &mut context, window)?;

            if let Some(progress) = &progress {
                let _ = progress.send(Progress {
                    current: index + 1,
                    total,
                });
            }
        }
        drop(progress);

        let dataset = context.accumulator.finalize();
        let report = verify_dataset(&dataset);
        if !report.is_valid() {
            return Err(Error::InvalidDataset(report.summary()));
        }

        let writer = CocoWriter::with_options(CocoWriteOptions {
            pretty: self.config.pretty,
        });
        writer.write_json(&dataset, &annotations_path)?;

        let summary = ConversionSummary {
            tiles: dataset.images.len(),
            annotations: dataset.annotations.len(),
            categories: dataset.categories.len(),
            annotations_path,
            images_dir,
        };
        log::info!(
            "Wrote {} tiles with {} annotations in {} categories to {}",
            summary.tiles,
            summary.annotations,
            summary.categories,
            summary.annotations_path.display()
        );

        Ok(summary)
    }

    fn info(&self, timestamp: &str) -> CocoInfo {
        CocoInfo {
            year: self.timestamp.year().to_string(),
            version: DATASET_VERSION.to_string(),
            description: self.config.description.clone(),
            contributor: self.config.contributor.clone(),
            url: String::new(),
            date_created: timestamp.to_string(),
        }
    }

    fn licenses(&self) -> Vec<CocoLicense> {
        vec![CocoLicense {
            id: LICENSE_ID,
            url: self.config.license_url.clone(),
            name: self.config.license_name.clone(),
        }]
    }
}

#[cfg_attr(
    feature = "profiling",
    tracing::instrument(skip_all, fields(x = window.x, y = window.y))
)]
fn process_tile<R, E>(
    raster: &R,
    encoder: &E,
    context: &mut TileContext<'_>,
    window: TileWindow,
) -> Result<(), Error>
where
    R: RasterSource + ?Sized,
    E: ImageEncoder + ?Sized,
{
    let pixels = raster.read_window(&window)?;

    let image_id = context.accumulator.next_image_id();
    let file_name = tile_file_name(image_id, context.format);
    encoder.write(&context.images_dir.join(&file_name), &pixels, context.format)?;

    let image_id = context.accumulator.add_image(
        &file_name,
        LICENSE_ID,
        context.tile_size,
        context.tile_size,
        &context.date_captured,
    );

    let mut annotations = 0;
    for hit in context.intersector.intersections(window) {
        let shape = build_annotation(hit.ring, hit.value, context.categories)?;
        context.accumulator.add_annotation(image_id, shape)?;
        annotations += 1;
    }

    log::debug!(
        "Tile {} at ({}, {}): {} annotations",
        file_name,
        window.x,
        window.y,
        annotations
    );

    Ok(())
}

fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

/// Convert the GeoTIFF and GeoJSON named in `config`.
///
/// The vector layer is read first so a missing class field is reported before
/// the raster is decoded. Polygons are reprojected to the raster CRS when the
/// raster declares one.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all))]
pub fn convert(
    config: &TilingConfig,
    progress: Option<Sender<Progress>>,
) -> Result<ConversionSummary, Error> {
    config.validate()?;
    let geotiff = required_path(config.geotiff.as_deref(), "geotiff")?;
    let vector = required_path(config.vector.as_deref(), "vector")?;
    let class_field = config.class_field.as_deref().ok_or_else(|| {
        Error::InvalidConfiguration("class_field is not set".to_string())
    })?;

    let layer = VectorLayer::from_geojson_path(vector, None)?;
    if !layer.has_attribute(class_field) {
        return Err(Error::MissingAttribute(class_field.to_string()));
    }

    let raster = GeoTiffRaster::open(geotiff)?;
    let layer = match raster.crs() {
        Some(crs) => layer.reproject(crs)?,
        None => {
            log::warn!(
                "{} declares no CRS; using vector coordinates ({}) as-is",
                geotiff.display(),
                layer.crs()
            );
            layer
        }
    };

    Tiler::new(config.clone()).run(&raster, &layer, &FileImageEncoder, progress)
}

fn required_path<'a>(path: Option<&'a Path>, name: &str) -> Result<&'a Path, Error> {
    path.ok_or_else(|| Error::InvalidConfiguration(format!("{} path is not set", name)))
}
