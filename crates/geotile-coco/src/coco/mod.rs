// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 GeoTile COCO Contributors. All Rights Reserved.

//! # COCO Dataset Format Support
//!
//! Record types, annotation geometry, accumulation and JSON I/O for the COCO
//! (Common Objects in Context) documents produced by the tiler.
//!
//! ## Scope
//!
//! - Bounding boxes with bounding-box area
//! - One polygon ring per instance
//!
//! Not supported: RLE masks, keypoints, captions, panoptic segmentation.
//!
//! ## Example
//!
//! ```rust,no_run
//! use geotile_coco::coco::{CocoReader, verify_dataset};
//!
//! let reader = CocoReader::new();
//! let dataset = reader.read_json("output_coco/annotations_coco.json")?;
//! println!("Found {} tiles and {} annotations",
//!          dataset.images.len(), dataset.annotations.len());
//!
//! let report = verify_dataset(&dataset);
//! println!("{}", report);
//! # Ok::<(), geotile_coco::Error>(())
//! ```

mod annotation;
mod reader;
mod types;
mod verify;
mod writer;

// Re-export types
pub use types::{CocoAnnotation, CocoCategory, CocoDataset, CocoImage, CocoInfo, CocoLicense};

// Re-export readers/writers
pub use reader::CocoReader;
pub use writer::{CocoWriteOptions, CocoWriter, DatasetAccumulator};

pub use annotation::{AnnotationShape, build_annotation, ring_bbox};
pub use verify::{VerificationReport, verify_dataset};
