// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 GeoTile COCO Contributors. All Rights Reserved.

/// Error type for raster tiling and COCO dataset generation.
///
/// Configuration and consistency failures are fatal and abort a run before or
/// during tiling. Per-polygon geometric anomalies never surface here; they are
/// logged and the polygon is skipped for the affected tile.
#[derive(Debug)]
pub enum Error {
    /// An I/O error occurred during file operations.
    IoError(std::io::Error),
    /// Settings file or environment parsing error.
    ConfigError(config::ConfigError),
    /// JSON serialization or deserialization error.
    JsonError(serde_json::Error),
    /// TIFF decoding or encoding error.
    TiffError(tiff::TiffError),
    /// Image encoding error while writing a tile.
    ImageError(image::ImageError),
    /// Tile size, overlap or raster dimensions are inconsistent.
    InvalidConfiguration(String),
    /// The class field is absent from the vector layer attribute schema.
    MissingAttribute(String),
    /// An attribute value was not present in the category index.
    UnknownCategory(String),
    /// The raster could not be read or lacks georeferencing.
    RasterError(String),
    /// The vector layer could not be parsed.
    VectorError(String),
    /// Coordinate reprojection between reference systems failed.
    ProjectionError(String),
    /// The affine transform is not invertible.
    InvalidTransform(String),
    /// Unsupported image format or band layout.
    UnsupportedFormat(String),
    /// A generated dataset violates the COCO record invariants.
    InvalidDataset(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::ConfigError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::JsonError(err)
    }
}

impl From<tiff::TiffError> for Error {
    fn from(err: tiff::TiffError) -> Self {
        Error::TiffError(err)
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageError(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "I/O error: {}", e),
            Error::ConfigError(e) => write!(f, "Configuration error: {}", e),
            Error::JsonError(e) => write!(f, "JSON error: {}", e),
            Error::TiffError(e) => write!(f, "TIFF error: {}", e),
            Error::ImageError(e) => write!(f, "Image error: {}", e),
            Error::InvalidConfiguration(s) => write!(f, "Invalid configuration: {}", s),
            Error::MissingAttribute(s) => write!(
                f,
                "Attribute '{}' not found in the vector layer; check the class field name",
                s
            ),
            Error::UnknownCategory(s) => write!(f, "Unknown category value: {}", s),
            Error::RasterError(s) => write!(f, "Raster error: {}", s),
            Error::VectorError(s) => write!(f, "Vector error: {}", s),
            Error::ProjectionError(s) => write!(f, "Projection error: {}", s),
            Error::InvalidTransform(s) => write!(f, "Invalid affine transform: {}", s),
            Error::UnsupportedFormat(s) => write!(f, "Unsupported format: {}", s),
            Error::InvalidDataset(s) => write!(f, "Invalid dataset: {}", s),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            Error::ConfigError(e) => Some(e),
            Error::JsonError(e) => Some(e),
            Error::TiffError(e) => Some(e),
            Error::ImageError(e) => Some(e),
            _ => None,
        }
    }
}
