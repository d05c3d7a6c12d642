// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 GeoTile COCO Contributors. All Rights Reserved.

//! Conversion of tile-local polygon rings into COCO annotation geometry.

use crate::{
    Error,
    category::{AttributeValue, CategoryIndex},
    intersect::has_min_vertices,
};

/// Geometry and class of one annotation, before ids are assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationShape {
    /// Resolved category id.
    pub category_id: u32,
    /// `[x_min, y_min, width, height]`.
    pub bbox: [f64; 4],
    /// Bounding box area, `width * height`.
    pub area: f64,
    /// The ring, unmodified.
    pub ring: Vec<f64>,
}

/// Axis-aligned bounds `[x_min, y_min, width, height]` of a flattened ring.
///
/// Returns `None` for an empty ring.
pub fn ring_bbox(ring: &[f64]) -> Option<[f64; 4]> {
    let mut points = ring.chunks_exact(2);
    let first = points.next()?;
    let (mut min_x, mut min_y) = (first[0], first[1]);
    let (mut max_x, mut max_y) = (first[0], first[1]);

    for point in points {
        min_x = min_x.min(point[0]);
        max_x = max_x.max(point[0]);
        min_y = min_y.min(point[1]);
        max_y = max_y.max(point[1]);
    }

    Some([min_x, min_y, max_x - min_x, max_y - min_y])
}

/// Build the annotation geometry for a ring of class `value`.
///
/// The area is the bounding box area rather than the polygon area.
/// Fails with [`Error::UnknownCategory`] when `value` is not indexed and with
/// [`Error::InvalidDataset`] for a ring with fewer than three points.
pub fn build_annotation(
    ring: Vec<f64>,
    value: &AttributeValue,
    categories: &CategoryIndex,
) -> Result<AnnotationShape, Error> {
    let category_id = categories.id_of(value)?;

    if !has_min_vertices(&ring) || ring.len() % 2 != 0 {
        return Err(Error::InvalidDataset(format!(
            "annotation ring needs at least 3 points, got {} values",
            ring.len()
        )));
    }

    let bbox = ring_bbox(&ring).ok_or_else(|| {
        Error::InvalidDataset("annotation ring is empty".to_string())
    })?;
    let area = bbox[2] * bbox[3];

    Ok(AnnotationShape {
        category_id,
        bbox,
        area,
        ring,
    })
}
