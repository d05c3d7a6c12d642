// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 GeoTile COCO Contributors. All Rights Reserved.

//! Polygon ∩ tile intersection in tile-local pixel coordinates.
//!
//! Geometries are repaired once when the intersector is built. For each tile
//! the world-space tile rectangle is intersected with every candidate polygon
//! and the exterior ring of a single-part result is mapped to pixels relative
//! to the tile origin.
//!
//! Known limitations:
//! - intersections that split into several parts are dropped, and holes are
//!   never emitted (only the exterior ring is used);
//! - coordinates are neither rounded nor clamped, so vertices on the tile
//!   border may sit exactly at `tile_size` or marginally outside it.

use crate::{
    category::AttributeValue,
    grid::TileWindow,
    transform::GeoTransform,
    vector::VectorLayer,
};
use geo::{
    BooleanOps, BoundingRect, HasDimensions, Intersects, MultiPolygon, Polygon, Rect,
    Validation,
};

/// Minimum flattened coordinate count of an annotation ring (three points).
pub const MIN_RING_VALUES: usize = 6;

/// Intersection of one labeled polygon with a tile.
#[derive(Debug, Clone, PartialEq)]
pub struct TileIntersection<'a> {
    /// Index of the source feature in the vector layer.
    pub feature: usize,
    /// Class attribute value of the source feature.
    pub value: &'a AttributeValue,
    /// Exterior ring as `[x0, y0, x1, y1, …]` in tile-local pixels.
    pub ring: Vec<f64>,
}

#[derive(Debug)]
struct PreparedPolygon<'a> {
    feature: usize,
    value: &'a AttributeValue,
    geometry: MultiPolygon<f64>,
    bounds: Rect<f64>,
}

/// Intersects tile windows against a read-only vector layer.
#[derive(Debug)]
pub struct PolygonIntersector<'a> {
    transform: GeoTransform,
    polygons: Vec<PreparedPolygon<'a>>,
}

impl<'a> PolygonIntersector<'a> {
    /// Prepare the polygons of `layer` that carry a `class_field` value.
    ///
    /// Invalid geometries are repaired; polygons that are empty after repair
    /// are logged and excluded.
    pub fn new(layer: &'a VectorLayer, class_field: &str, transform: GeoTransform) -> Self {
        let mut polygons = Vec::with_capacity(layer.len());

        for (feature, labeled) in layer.features().iter().enumerate() {
            let Some(value) = labeled.attribute(class_field) else {
                continue;
            };

            let Some(geometry) = repair(&labeled.geometry) else {
                log::warn!(
                    "Skipping feature {} ({}): geometry is empty or could not be repaired",
                    feature,
                    value
                );
                continue;
            };

            let Some(bounds) = geometry.bounding_rect() else {
                continue;
            };

            polygons.push(PreparedPolygon {
                feature,
                value,
                geometry,
                bounds,
            });
        }

        log::debug!(
            "Prepared {} of {} polygons for intersection",
            polygons.len(),
            layer.len()
        );

        Self {
            transform,
            polygons,
        }
    }

    /// Number of polygons taking part in intersection.
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    /// True when no polygon can produce an annotation.
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Lazily yield the polygons intersecting `window`, in layer order.
    pub fn intersections(
        &self,
        window: TileWindow,
    ) -> impl Iterator<Item = TileIntersection<'a>> + '_ {
        let tile_bounds = self.transform.window_bounds(&window);
        let tile = tile_bounds.to_polygon();

        self.polygons
            .iter()
            .filter(move |p| p.bounds.intersects(&tile_bounds))
            .filter_map(move |p| {
                let clipped = p.geometry.intersection(&tile);
                let polygon = single_part(clipped, p.feature)?;
                let ring = self.tile_local_ring(&polygon, &window);

                if !has_min_vertices(&ring) {
                    log::debug!(
                        "Feature {}: intersection has fewer than 3 vertices, skipped",
                        p.feature
                    );
                    return None;
                }

                Some(TileIntersection {
                    feature: p.feature,
                    value: p.value,
                    ring,
                })
            })
    }

    /// Map the exterior ring of a world-space polygon into tile-local pixels.
    fn tile_local_ring(&self, polygon: &Polygon<f64>, window: &TileWindow) -> Vec<f64> {
        let origin_x = window.x as f64;
        let origin_y = window.y as f64;

        polygon
            .exterior()
            .coords()
            .flat_map(|c| {
                let (px, py) = self.transform.world_to_pixel(c.x, c.y);
                [px - origin_x, py - origin_y]
            })
            .collect()
    }
}

/// Return a valid, non-empty version of `geometry`.
///
/// Valid input is returned unchanged. Invalid input is rebuilt through a
/// polygon union, which nodes self-intersections and resolves overlapping
/// parts.
pub fn repair(geometry: &MultiPolygon<f64>) -> Option<MultiPolygon<f64>> {
    if geometry.is_empty() {
        return None;
    }
    if geometry.is_valid() {
        return Some(geometry.clone());
    }

    let repaired = geometry.union(&MultiPolygon::new(vec![]));
    if repaired.is_empty() {
        return None;
    }

    log::debug!(
        "Repaired invalid geometry: {} part(s) became {}",
        geometry.0.len(),
        repaired.0.len()
    );
    Some(repaired)
}

/// True when a flattened ring holds at least three points.
pub fn has_min_vertices(ring: &[f64]) -> bool {
    ring.len() >= MIN_RING_VALUES
}

fn single_part(clipped: MultiPolygon<f64>, feature: usize) -> Option<Polygon<f64>> {
    let mut parts = clipped.0;
    match parts.len() {
        0 => None,
        1 => parts.pop(),
        n => {
            log::debug!(
                "Feature {}: intersection has {} parts, skipped",
                feature,
                n
            );
            None
        }
    }
}
