// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 GeoTile COCO Contributors. All Rights Reserved.

//! Conversion settings.
//!
//! Settings are layered: built-in defaults, then an optional settings file
//! (TOML, JSON or YAML by extension), then `GEOTILE_COCO_*` environment
//! variables. Command line flags are applied on top by the caller.

use crate::{Error, encode::ImageFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix of the environment variables read by [`TilingConfig::load`].
pub const ENV_PREFIX: &str = "GEOTILE_COCO";

/// Settings for one raster → COCO conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TilingConfig {
    /// Input GeoTIFF.
    pub geotiff: Option<PathBuf>,
    /// Input GeoJSON with labeled polygons.
    pub vector: Option<PathBuf>,
    /// Attribute holding the class label of each polygon.
    pub class_field: Option<String>,
    /// Output root; tiles go to `images/` below it.
    pub output_dir: PathBuf,
    /// Tile edge length in pixels.
    pub tile_size: u32,
    /// Overlap between neighbouring tiles in pixels.
    pub overlap: u32,
    /// Tile image format, `jpg` or `png`.
    pub format: String,
    /// Name of the annotation document inside `output_dir`.
    pub annotations_file: String,
    /// Pretty-print the annotation document.
    pub pretty: bool,
    pub description: String,
    pub contributor: String,
    pub license_name: String,
    pub license_url: String,
}

impl Default for TilingConfig {
    fn default() -> Self {
        Self {
            geotiff: None,
            vector: None,
            class_field: None,
            output_dir: PathBuf::from("output_coco"),
            tile_size: 1000,
            overlap: 200,
            format: "jpg".to_string(),
            annotations_file: "annotations_coco.json".to_string(),
            pretty: true,
            description: "Dataset COCO generated from GeoTIFF and GeoJSON".to_string(),
            contributor: String::new(),
            license_name: "CC BY 4.0".to_string(),
            license_url: "https://creativecommons.org/licenses/by/4.0/".to_string(),
        }
    }
}

impl TilingConfig {
    /// Load settings from an optional file and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        Self::load_with(path, config::Environment::with_prefix(ENV_PREFIX))
    }

    /// Load settings from an optional file and an explicit environment
    /// source.
    pub fn load_with(path: Option<&Path>, env: config::Environment) -> Result<Self, Error> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(Error::InvalidConfiguration(format!(
                    "settings file {} does not exist",
                    path.display()
                )));
            }
            log::debug!("Reading settings from {}", path.display());
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder.add_source(env.try_parsing(true)).build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Parsed tile image format.
    pub fn image_format(&self) -> Result<ImageFormat, Error> {
        self.format.parse()
    }

    /// Path of the annotation document.
    pub fn annotations_path(&self) -> PathBuf {
        self.output_dir.join(&self.annotations_file)
    }

    /// Directory receiving the tile images.
    pub fn images_dir(&self) -> PathBuf {
        self.output_dir.join("images")
    }

    /// Check the tiling parameters before any raster or vector I/O.
    pub fn validate(&self) -> Result<(), Error> {
        if self.tile_size == 0 {
            return Err(Error::InvalidConfiguration(
                "tile_size must be positive".to_string(),
            ));
        }
        if self.overlap >= self.tile_size {
            return Err(Error::InvalidConfiguration(format!(
                "overlap ({}) must be smaller than tile_size ({})",
                self.overlap, self.tile_size
            )));
        }
        if self.annotations_file.trim().is_empty() {
            return Err(Error::InvalidConfiguration(
                "annotations_file must not be empty".to_string(),
            ));
        }
        if let Some(field) = &self.class_field
            && field.trim().is_empty()
        {
            return Err(Error::InvalidConfiguration(
                "class_field must not be empty".to_string(),
            ));
        }
        self.image_format()?;

        Ok(())
    }
}
