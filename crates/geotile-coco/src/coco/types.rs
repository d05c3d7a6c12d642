// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 GeoTile COCO Contributors. All Rights Reserved.

//! COCO JSON data structures for serde serialization/deserialization.
//!
//! Field order matches the generated document layout: `info`, `licenses`,
//! `images`, `annotations`, `categories`. Only bounding boxes with a single
//! polygon ring per instance are produced.

use serde::{Deserialize, Serialize};

/// Top-level COCO dataset structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoDataset {
    /// Dataset metadata.
    #[serde(default)]
    pub info: CocoInfo,
    /// License information for the images.
    #[serde(default)]
    pub licenses: Vec<CocoLicense>,
    /// One record per tile image.
    pub images: Vec<CocoImage>,
    /// One record per object instance.
    #[serde(default)]
    pub annotations: Vec<CocoAnnotation>,
    /// Object classes.
    #[serde(default)]
    pub categories: Vec<CocoCategory>,
}

/// Dataset metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoInfo {
    /// Year the dataset was created, as text.
    #[serde(default)]
    pub year: String,
    /// Version string.
    #[serde(default)]
    pub version: String,
    /// Dataset description.
    #[serde(default)]
    pub description: String,
    /// Dataset contributor.
    #[serde(default)]
    pub contributor: String,
    /// Dataset URL.
    #[serde(default)]
    pub url: String,
    /// ISO 8601 creation timestamp.
    #[serde(default)]
    pub date_created: String,
}

/// License information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoLicense {
    /// Unique license ID.
    pub id: u32,
    /// License URL.
    #[serde(default)]
    pub url: String,
    /// License name.
    pub name: String,
}

/// Tile image metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoImage {
    /// Unique image ID, 1-based.
    pub id: u64,
    /// License ID (references `CocoLicense.id`).
    pub license: u32,
    /// Filename relative to the images folder.
    pub file_name: String,
    /// Image height in pixels.
    pub height: u32,
    /// Image width in pixels.
    pub width: u32,
    /// ISO 8601 capture timestamp.
    #[serde(default)]
    pub date_captured: String,
}

/// Category definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CocoCategory {
    /// Category ID, 0-based and contiguous.
    pub id: u32,
    /// Category name (the attribute value).
    pub name: String,
    /// Parent category name.
    #[serde(default)]
    pub supercategory: String,
}

/// Annotation for one object instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoAnnotation {
    /// Unique annotation ID, 1-based.
    pub id: u64,
    /// ID of the image containing this object.
    pub image_id: u64,
    /// Category ID of this object.
    pub category_id: u32,
    /// Bounding box: `[x, y, width, height]` in tile pixels (top-left corner).
    pub bbox: [f64; 4],
    /// Bounding box area (`width * height`) in pixels².
    pub area: f64,
    /// Polygon rings `[[x1, y1, x2, y2, …]]`; always exactly one ring here.
    pub segmentation: Vec<Vec<f64>>,
    /// Crowd flag (always 0 for generated annotations).
    #[serde(default)]
    pub iscrowd: u8,
}
