// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 GeoTile COCO Contributors. All Rights Reserved.

//! COCO JSON reader.

use super::types::CocoDataset;
use crate::Error;
use std::{fs::File, io::BufReader, path::Path};

/// Reader for COCO annotation documents.
///
/// # Example
///
/// ```rust,no_run
/// use geotile_coco::coco::CocoReader;
///
/// let reader = CocoReader::new();
/// let dataset = reader.read_json("output_coco/annotations_coco.json")?;
/// println!("Loaded {} tiles", dataset.images.len());
/// # Ok::<(), geotile_coco::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct CocoReader;

impl CocoReader {
    /// Create a new COCO reader.
    pub fn new() -> Self {
        Self
    }

    /// Read COCO dataset from a JSON file.
    pub fn read_json<P: AsRef<Path>>(&self, path: P) -> Result<CocoDataset, Error> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::with_capacity(64 * 1024, file);
        let dataset: CocoDataset = serde_json::from_reader(reader)?;
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coco::{CocoAnnotation, CocoImage, CocoWriter};
    use tempfile::TempDir;

    #[test]
    fn test_read_json_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("annotations_coco.json");

        let dataset = CocoDataset {
            images: vec![CocoImage {
                id: 1,
                license: 1,
                file_name: "tile_1.jpg".to_string(),
                height: 256,
                width: 256,
                ..Default::default()
            }],
            ..Default::default()
        };
        CocoWriter::new().write_json(&dataset, &path).unwrap();

        let restored = CocoReader::new().read_json(&path).unwrap();
        assert_eq!(restored, dataset);
    }

    #[test]
    fn test_read_json_is_lenient() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");

        let dataset = CocoDataset {
            annotations: vec![CocoAnnotation {
                id: 1,
                image_id: 7,
                segmentation: vec![vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0]],
                ..Default::default()
            }],
            ..Default::default()
        };
        CocoWriter::new().write_json(&dataset, &path).unwrap();

        // Invariant violations are left to verify_dataset
        let restored = CocoReader::new().read_json(&path).unwrap();
        assert_eq!(restored.annotations[0].image_id, 7);
    }

    #[test]
    fn test_read_missing_file() {
        let result = CocoReader::new().read_json("/nonexistent/annotations.json");
        assert!(matches!(result, Err(Error::IoError(_))));
    }
}
