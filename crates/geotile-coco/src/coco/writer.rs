// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 GeoTile COCO Contributors. All Rights Reserved.

//! COCO dataset accumulation and JSON writing.

use super::{
    annotation::AnnotationShape,
    types::{CocoAnnotation, CocoCategory, CocoDataset, CocoImage, CocoInfo, CocoLicense},
};
use crate::Error;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// Options for COCO writing.
#[derive(Debug, Clone)]
pub struct CocoWriteOptions {
    /// Pretty-print JSON with two-space indentation.
    pub pretty: bool,
}

impl Default for CocoWriteOptions {
    fn default() -> Self {
        Self { pretty: true }
    }
}

/// COCO writer for generating JSON files.
///
/// # Example
///
/// ```rust,no_run
/// use geotile_coco::coco::{CocoDataset, CocoWriter};
///
/// let writer = CocoWriter::new();
/// let dataset = CocoDataset::default();
/// writer.write_json(&dataset, "annotations_coco.json")?;
/// # Ok::<(), geotile_coco::Error>(())
/// ```
pub struct CocoWriter {
    options: CocoWriteOptions,
}

impl CocoWriter {
    /// Create a new COCO writer with default options.
    pub fn new() -> Self {
        Self {
            options: CocoWriteOptions::default(),
        }
    }

    /// Create a new COCO writer with custom options.
    pub fn with_options(options: CocoWriteOptions) -> Self {
        Self { options }
    }

    /// Write COCO dataset to a JSON file.
    ///
    /// # Arguments
    /// * `dataset` - The COCO dataset to write
    /// * `path` - Output file path
    pub fn write_json<P: AsRef<Path>>(&self, dataset: &CocoDataset, path: P) -> Result<(), Error> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::with_capacity(64 * 1024, file);

        if self.options.pretty {
            serde_json::to_writer_pretty(&mut writer, dataset)?;
        } else {
            serde_json::to_writer(&mut writer, dataset)?;
        }
        writer.flush()?;

        Ok(())
    }
}

impl Default for CocoWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Append-only collector of image and annotation records.
///
/// Image and annotation ids start at 1 and increase by one per record; a
/// record is never modified or removed once added.
#[derive(Debug)]
pub struct DatasetAccumulator {
    dataset: CocoDataset,
    next_image_id: u64,
    next_annotation_id: u64,
}

impl DatasetAccumulator {
    /// Start a dataset with fixed metadata and categories.
    pub fn new(info: CocoInfo, licenses: Vec<CocoLicense>, categories: Vec<CocoCategory>) -> Self {
        Self {
            dataset: CocoDataset {
                info,
                licenses,
                images: Vec::new(),
                annotations: Vec::new(),
                categories,
            },
            next_image_id: 1,
            next_annotation_id: 1,
        }
    }

    /// Id the next added image will receive.
    pub fn next_image_id(&self) -> u64 {
        self.next_image_id
    }

    /// Add an image, returning its ID.
    pub fn add_image(
        &mut self,
        file_name: &str,
        license: u32,
        width: u32,
        height: u32,
        date_captured: &str,
    ) -> u64 {
        let id = self.next_image_id;
        self.next_image_id += 1;

        self.dataset.images.push(CocoImage {
            id,
            license,
            file_name: file_name.to_string(),
            height,
            width,
            date_captured: date_captured.to_string(),
        });

        id
    }

    /// Add an annotation to an existing image, returning its ID.
    pub fn add_annotation(&mut self, image_id: u64, shape: AnnotationShape) -> Result<u64, Error> {
        if image_id == 0 || image_id >= self.next_image_id {
            return Err(Error::InvalidDataset(format!(
                "annotation references unknown image {}",
                image_id
            )));
        }

        let id = self.next_annotation_id;
        self.next_annotation_id += 1;

        self.dataset.annotations.push(CocoAnnotation {
            id,
            image_id,
            category_id: shape.category_id,
            bbox: shape.bbox,
            area: shape.area,
            segmentation: vec![shape.ring],
            iscrowd: 0,
        });

        Ok(id)
    }

    /// Number of images added so far.
    pub fn image_count(&self) -> usize {
        self.dataset.images.len()
    }

    /// Number of annotations added so far.
    pub fn annotation_count(&self) -> usize {
        self.dataset.annotations.len()
    }

    /// Build the final dataset.
    pub fn finalize(self) -> CocoDataset {
        self.dataset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn shape(category_id: u32) -> AnnotationShape {
        AnnotationShape {
            category_id,
            bbox: [1.0, 2.0, 3.0, 4.0],
            area: 12.0,
            ring: vec![1.0, 2.0, 4.0, 2.0, 4.0, 6.0, 1.0, 2.0],
        }
    }

    fn accumulator() -> DatasetAccumulator {
        DatasetAccumulator::new(
            CocoInfo::default(),
            vec![],
            vec![CocoCategory {
                id: 0,
                name: "roof".to_string(),
                supercategory: "objects".to_string(),
            }],
        )
    }

    #[test]
    fn test_writer_default() {
        let writer = CocoWriter::new();
        assert!(writer.options.pretty);
    }

    #[test]
    fn test_ids_are_sequential() {
        let mut acc = accumulator();
        assert_eq!(acc.next_image_id(), 1);

        let img1 = acc.add_image("tile_1.jpg", 1, 500, 500, "t");
        let img2 = acc.add_image("tile_2.jpg", 1, 500, 500, "t");
        let img3 = acc.add_image("tile_3.jpg", 1, 500, 500, "t");
        assert_eq!((img1, img2, img3), (1, 2, 3));

        let ann1 = acc.add_annotation(img1, shape(0)).unwrap();
        let ann2 = acc.add_annotation(img3, shape(0)).unwrap();
        let ann3 = acc.add_annotation(img3, shape(0)).unwrap();
        assert_eq!((ann1, ann2, ann3), (1, 2, 3));

        let dataset = acc.finalize();
        assert_eq!(dataset.images.len(), 3);
        assert_eq!(dataset.annotations.len(), 3);
        assert_eq!(dataset.annotations[1].image_id, 3);
        assert_eq!(dataset.annotations[1].segmentation.len(), 1);
        assert_eq!(dataset.annotations[1].iscrowd, 0);
        assert_eq!(dataset.categories.len(), 1);
    }

    #[test]
    fn test_annotation_needs_existing_image() {
        let mut acc = accumulator();
        assert!(acc.add_annotation(1, shape(0)).is_err());

        acc.add_image("tile_1.jpg", 1, 10, 10, "t");
        assert!(acc.add_annotation(0, shape(0)).is_err());
        assert!(acc.add_annotation(2, shape(0)).is_err());
        assert_eq!(acc.add_annotation(1, shape(0)).unwrap(), 1);
        assert_eq!(acc.annotation_count(), 1);
    }

    #[test]
    fn test_write_json() {
        let temp_dir = TempDir::new().unwrap();
        let output_path = temp_dir.path().join("nested/annotations_coco.json");

        let mut acc = accumulator();
        let image_id = acc.add_image("tile_1.jpg", 1, 640, 640, "2025-09-18T10:00:00");
        acc.add_annotation(image_id, shape(0)).unwrap();
        let dataset = acc.finalize();

        let writer = CocoWriter::new();
        writer.write_json(&dataset, &output_path).unwrap();
        assert!(output_path.exists());

        let contents = std::fs::read_to_string(&output_path).unwrap();
        assert!(contents.contains("\n  \"licenses\""));
        let restored: CocoDataset = serde_json::from_str(&contents).unwrap();
        assert_eq!(restored, dataset);
    }

    #[test]
    fn test_write_json_compact() {
        let temp_dir = TempDir::new().unwrap();
        let output_path = temp_dir.path().join("compact.json");

        let writer = CocoWriter::with_options(CocoWriteOptions { pretty: false });
        writer
            .write_json(&CocoDataset::default(), &output_path)
            .unwrap();

        let contents = std::fs::read_to_string(&output_path).unwrap();
        assert!(!contents.contains('\n'));
    }
}
