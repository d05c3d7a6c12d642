// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 GeoTile COCO Contributors. All Rights Reserved.

//! Labeled polygon layers loaded from GeoJSON.
//!
//! Only areal features are kept: `Polygon` and `MultiPolygon` geometries
//! become [`LabeledPolygon`]s, everything else is skipped with a warning.
//! Attributes of skipped features are retained, so attribute values and the
//! schema still describe every feature of the file.
//! The layer is reprojected into the raster reference system at load time
//! and is read-only afterwards.

use crate::{
    Error,
    category::AttributeValue,
    projection::{Crs, Reprojector},
};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

/// A polygon or multipolygon with its feature attributes.
#[derive(Debug, Clone)]
pub struct LabeledPolygon {
    /// Geometry in the layer reference system.
    pub geometry: MultiPolygon<f64>,
    /// Non-null scalar properties of the feature.
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl LabeledPolygon {
    /// Create a labeled polygon.
    pub fn new(
        geometry: impl Into<MultiPolygon<f64>>,
        attributes: BTreeMap<String, AttributeValue>,
    ) -> Self {
        Self {
            geometry: geometry.into(),
            attributes,
        }
    }

    /// Value of an attribute, if present and non-null.
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }
}

/// Collection of labeled polygons sharing one reference system.
#[derive(Debug, Clone)]
pub struct VectorLayer {
    features: Vec<LabeledPolygon>,
    // Attributes of features without polygonal geometry
    skipped: Vec<BTreeMap<String, AttributeValue>>,
    schema: BTreeSet<String>,
    crs: Crs,
}

impl VectorLayer {
    /// Build a layer from features in the given reference system.
    ///
    /// The attribute schema is the union of the features' attribute names.
    pub fn new(features: Vec<LabeledPolygon>, crs: Crs) -> Self {
        let schema = features
            .iter()
            .flat_map(|f| f.attributes.keys().cloned())
            .collect();
        Self {
            features,
            skipped: Vec::new(),
            schema,
            crs,
        }
    }

    /// Read a GeoJSON file, reprojecting to `target` when given.
    pub fn from_geojson_path<P: AsRef<Path>>(path: P, target: Option<Crs>) -> Result<Self, Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::VectorError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let layer = Self::from_geojson_str(&contents, target)?;
        log::info!(
            "Loaded {} polygon features from {} ({})",
            layer.len(),
            path.display(),
            layer.crs
        );
        Ok(layer)
    }

    /// Parse a GeoJSON `FeatureCollection`, reprojecting to `target` when given.
    pub fn from_geojson_str(contents: &str, target: Option<Crs>) -> Result<Self, Error> {
        let collection: FeatureCollection = serde_json::from_str(contents)
            .map_err(|e| Error::VectorError(format!("invalid GeoJSON: {}", e)))?;

        let source = match &collection.crs {
            Some(named) => Crs::parse(&named.properties.name).ok_or_else(|| {
                Error::VectorError(format!(
                    "unsupported GeoJSON crs '{}'",
                    named.properties.name
                ))
            })?,
            None => Crs::WGS84,
        };

        let mut features = Vec::with_capacity(collection.features.len());
        let mut skipped = Vec::new();
        // Property keys count towards the schema even on skipped features
        let mut schema = BTreeSet::new();
        for (index, feature) in collection.features.into_iter().enumerate() {
            let properties = feature.properties.unwrap_or_default();
            schema.extend(properties.keys().cloned());
            let attributes = scalar_attributes(&properties);

            let geometry = match feature.geometry {
                Some(Geometry::Polygon { coordinates }) => {
                    MultiPolygon::new(vec![polygon_from_rings(&coordinates)?])
                }
                Some(Geometry::MultiPolygon { coordinates }) => MultiPolygon::new(
                    coordinates
                        .iter()
                        .map(|rings| polygon_from_rings(rings))
                        .collect::<Result<_, _>>()?,
                ),
                Some(Geometry::Other) => {
                    log::warn!("Skipping feature {}: geometry is not polygonal", index);
                    skipped.push(attributes);
                    continue;
                }
                None => {
                    log::warn!("Skipping feature {}: no geometry", index);
                    skipped.push(attributes);
                    continue;
                }
            };

            features.push(LabeledPolygon {
                geometry,
                attributes,
            });
        }

        let mut layer = Self {
            features,
            skipped,
            schema,
            crs: source,
        };

        if let Some(target) = target
            && target != source
        {
            layer = layer.reproject(target)?;
        }

        Ok(layer)
    }

    /// Return a copy of the layer with every vertex transformed to `target`.
    pub fn reproject(self, target: Crs) -> Result<Self, Error> {
        if target == self.crs {
            return Ok(self);
        }

        log::info!("Reprojecting vector layer from {} to {}", self.crs, target);
        let reprojector = Reprojector::new(self.crs, target)?;

        let project_ring = |ring: &LineString<f64>| -> Result<LineString<f64>, Error> {
            ring.coords()
                .map(|c| reprojector.project(c.x, c.y).map(|(x, y)| Coord { x, y }))
                .collect::<Result<Vec<_>, _>>()
                .map(LineString::new)
        };

        let mut features = Vec::with_capacity(self.features.len());
        for feature in self.features {
            let polygons = feature
                .geometry
                .iter()
                .map(|polygon| {
                    let exterior = project_ring(polygon.exterior())?;
                    let interiors = polygon
                        .interiors()
                        .iter()
                        .map(&project_ring)
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Polygon::new(exterior, interiors))
                })
                .collect::<Result<Vec<_>, Error>>()?;
            features.push(LabeledPolygon {
                geometry: MultiPolygon::new(polygons),
                attributes: feature.attributes,
            });
        }

        Ok(Self {
            features,
            skipped: self.skipped,
            schema: self.schema,
            crs: target,
        })
    }

    /// Features of the layer.
    pub fn features(&self) -> &[LabeledPolygon] {
        &self.features
    }

    /// Values of `name` across every feature of the source, polygonal or not.
    ///
    /// Yields `None` for features where the attribute is absent or null.
    pub fn attribute_values<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = Option<&'a AttributeValue>> + 'a {
        self.features
            .iter()
            .map(|f| &f.attributes)
            .chain(&self.skipped)
            .map(move |attributes| attributes.get(name))
    }

    /// Attribute names present on any feature.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.schema.iter().map(String::as_str)
    }

    /// True when `name` is part of the attribute schema.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.schema.contains(name)
    }

    /// Reference system of the geometries.
    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Number of polygon features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// True when the layer has no polygon features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

fn scalar_attributes(
    properties: &serde_json::Map<String, serde_json::Value>,
) -> BTreeMap<String, AttributeValue> {
    properties
        .iter()
        .filter_map(|(k, v)| AttributeValue::from_json(v).map(|v| (k.clone(), v)))
        .collect()
}

fn polygon_from_rings(rings: &[Vec<Vec<f64>>]) -> Result<Polygon<f64>, Error> {
    let mut rings = rings.iter().map(|ring| {
        ring.iter()
            .map(|position| match position.as_slice() {
                [x, y, ..] => Ok(Coord { x: *x, y: *y }),
                _ => Err(Error::VectorError(format!(
                    "position needs at least two coordinates, got {:?}",
                    position
                ))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(LineString::new)
    });

    let exterior = rings.next().transpose()?.unwrap_or_else(|| LineString::new(vec![]));
    let interiors = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    crs: Option<NamedCrs>,
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct NamedCrs {
    properties: NamedCrsProperties,
}

#[derive(Debug, Deserialize)]
struct NamedCrsProperties {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    geometry: Option<Geometry>,
    #[serde(default)]
    properties: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon {
        coordinates: Vec<Vec<Vec<f64>>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Vec<f64>>>>,
    },
    #[serde(other)]
    Other,
}
