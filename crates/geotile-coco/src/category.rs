// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 GeoTile COCO Contributors. All Rights Reserved.

//! Category index derived from a vector layer attribute.
//!
//! Distinct attribute values are sorted by their natural order and assigned
//! contiguous ids starting at 0. Values of different kinds sort by kind first
//! (booleans, then numbers, then text) so mixed columns still have a total
//! order.

use crate::{Error, coco::CocoCategory, vector::VectorLayer};
use itertools::Itertools;
use std::{cmp::Ordering, collections::BTreeMap, fmt};

/// Supercategory written for every generated category.
pub const SUPERCATEGORY: &str = "objects";

/// Attribute value of a vector feature.
#[derive(Debug, Clone)]
pub enum AttributeValue {
    /// Boolean property.
    Bool(bool),
    /// Integral number.
    Integer(i64),
    /// Non-integral number.
    Float(f64),
    /// Text property.
    Text(String),
}

impl AttributeValue {
    /// Convert a JSON property, returning `None` for null, arrays and objects.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(AttributeValue::Bool(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(AttributeValue::Integer(i)),
                None => n.as_f64().map(AttributeValue::Float),
            },
            serde_json::Value::String(s) => Some(AttributeValue::Text(s.clone())),
            _ => None,
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            AttributeValue::Bool(_) => 0,
            AttributeValue::Integer(_) | AttributeValue::Float(_) => 1,
            AttributeValue::Text(_) => 2,
        }
    }
}

/// Order floats with `-0.0 == 0.0` and NaN at the ends, as `total_cmp` does.
fn cmp_floats(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b))
}

/// Exact order of an integer against a float, without rounding the integer.
fn cmp_integer_float(i: i64, f: f64) -> Ordering {
    // 2^63 is the first float past i64::MAX
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;

    if f.is_nan() {
        return if f.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if f >= LIMIT {
        return Ordering::Less;
    }
    if f < -LIMIT {
        return Ordering::Greater;
    }

    let whole = f.trunc();
    // In range, so the cast is exact
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => cmp_floats(whole, f),
        other => other,
    }
}

impl Ord for AttributeValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use AttributeValue::*;
        match (self, other) {
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => cmp_floats(*a, *b),
            (Integer(a), Float(b)) => cmp_integer_float(*a, *b),
            (Float(a), Integer(b)) => cmp_integer_float(*b, *a).reverse(),
            (Text(a), Text(b)) => a.cmp(b),
            (a, b) => a.kind_rank().cmp(&b.kind_rank()),
        }
    }
}

impl PartialOrd for AttributeValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AttributeValue {}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Integer(i) => write!(f, "{}", i),
            AttributeValue::Float(v) => write!(f, "{}", v),
            AttributeValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A class label with its assigned id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// 0-based contiguous id.
    pub id: u32,
    /// Attribute value this category stands for.
    pub value: AttributeValue,
}

impl Category {
    /// Display name, the attribute value rendered as text.
    pub fn name(&self) -> String {
        self.value.to_string()
    }
}

/// Immutable mapping from attribute values to category ids.
#[derive(Debug, Clone, Default)]
pub struct CategoryIndex {
    categories: Vec<Category>,
    ids: BTreeMap<AttributeValue, u32>,
}

impl CategoryIndex {
    /// Build the index from any collection of values; duplicates collapse.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = AttributeValue>,
    {
        let categories: Vec<Category> = values
            .into_iter()
            .sorted()
            .dedup()
            .enumerate()
            .map(|(id, value)| Category {
                id: id as u32,
                value,
            })
            .collect();

        let ids = categories
            .iter()
            .map(|c| (c.value.clone(), c.id))
            .collect();

        Self { categories, ids }
    }

    /// Build the index for `class_field` of a vector layer.
    ///
    /// Values of every feature in the source count, including features
    /// without polygonal geometry, so ids do not depend on which geometries
    /// survive loading. Fails with [`Error::MissingAttribute`] when no feature
    /// of the layer carries the field. Null values are not indexed.
    pub fn from_layer(layer: &VectorLayer, class_field: &str) -> Result<Self, Error> {
        if !layer.has_attribute(class_field) {
            return Err(Error::MissingAttribute(class_field.to_string()));
        }

        let mut missing = 0usize;
        let values: Vec<AttributeValue> = layer
            .attribute_values(class_field)
            .filter_map(|value| {
                if value.is_none() {
                    missing += 1;
                }
                value.cloned()
            })
            .collect();

        if missing > 0 {
            log::warn!(
                "{} feature(s) have no value for '{}' and will not be categorized",
                missing,
                class_field
            );
        }

        let index = Self::from_values(values);
        log::info!(
            "Found {} categories in '{}': {}",
            index.len(),
            class_field,
            index.categories.iter().map(|c| c.name()).join(", ")
        );
        Ok(index)
    }

    /// Resolve the category id of a value.
    ///
    /// Fails with [`Error::UnknownCategory`] when the value was not indexed.
    pub fn id_of(&self, value: &AttributeValue) -> Result<u32, Error> {
        self.ids
            .get(value)
            .copied()
            .ok_or_else(|| Error::UnknownCategory(value.to_string()))
    }

    /// Categories in id order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// True when no category was found.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// COCO category records for the dataset.
    pub fn to_coco(&self) -> Vec<CocoCategory> {
        self.categories
            .iter()
            .map(|c| CocoCategory {
                id: c.id,
                name: c.name(),
                supercategory: SUPERCATEGORY.to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> AttributeValue {
        AttributeValue::Text(s.to_string())
    }

    #[test]
    fn test_sorted_distinct_text() {
        let index = CategoryIndex::from_values(vec![text("b"), text("a"), text("a")]);
        let coco = index.to_coco();

        assert_eq!(coco.len(), 2);
        assert_eq!(coco[0].id, 0);
        assert_eq!(coco[0].name, "a");
        assert_eq!(coco[1].id, 1);
        assert_eq!(coco[1].name, "b");
        assert!(coco.iter().all(|c| c.supercategory == "objects"));
    }

    #[test]
    fn test_numeric_natural_order() {
        let index = CategoryIndex::from_values(vec![
            AttributeValue::Integer(10),
            AttributeValue::Integer(9),
            AttributeValue::Float(9.5),
            AttributeValue::Integer(-1),
        ]);
        let names: Vec<String> = index.categories().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["-1", "9", "9.5", "10"]);
    }

    #[test]
    fn test_integer_and_float_equal_values_collapse() {
        let index =
            CategoryIndex::from_values(vec![AttributeValue::Integer(2), AttributeValue::Float(2.0)]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.id_of(&AttributeValue::Float(2.0)).unwrap(), 0);
    }

    #[test]
    fn test_large_integers_order_exactly_against_floats() {
        let two_53 = 1i64 << 53;
        let low = AttributeValue::Integer(two_53);
        let float = AttributeValue::Float(two_53 as f64);
        let high = AttributeValue::Integer(two_53 + 1);

        assert_eq!(low, float);
        assert!(float < high);
        assert!(low < high);
        assert!(AttributeValue::Float(-0.5) < AttributeValue::Integer(0));
        assert_eq!(AttributeValue::Float(-0.0), AttributeValue::Integer(0));
        assert!(AttributeValue::Integer(i64::MAX) < AttributeValue::Float(1e19));

        // Same ids whatever the input order
        let values = [low, float, high];
        for order in [[0, 1, 2], [2, 1, 0], [1, 2, 0], [0, 2, 1], [2, 0, 1]] {
            let index = CategoryIndex::from_values(order.iter().map(|&i| values[i].clone()));
            assert_eq!(index.len(), 2);
            assert_eq!(index.id_of(&values[0]).unwrap(), 0);
            assert_eq!(index.id_of(&values[1]).unwrap(), 0);
            assert_eq!(index.id_of(&values[2]).unwrap(), 1);
        }
    }

    #[test]
    fn test_mixed_kinds_total_order() {
        let index = CategoryIndex::from_values(vec![
            text("house"),
            AttributeValue::Integer(3),
            AttributeValue::Bool(true),
        ]);
        let ids: Vec<u32> = index.categories().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(index.id_of(&AttributeValue::Bool(true)).unwrap(), 0);
        assert_eq!(index.id_of(&AttributeValue::Integer(3)).unwrap(), 1);
        assert_eq!(index.id_of(&text("house")).unwrap(), 2);
    }

    #[test]
    fn test_stable_under_input_permutation() {
        let a = CategoryIndex::from_values(vec![text("roof"), text("pool"), text("tree")]);
        let b = CategoryIndex::from_values(vec![text("tree"), text("roof"), text("pool")]);
        assert_eq!(a.categories(), b.categories());
    }

    #[test]
    fn test_unknown_category() {
        let index = CategoryIndex::from_values(vec![text("a")]);
        assert!(matches!(
            index.id_of(&text("z")),
            Err(Error::UnknownCategory(v)) if v == "z"
        ));
    }

    #[test]
    fn test_from_layer_counts_non_polygon_features() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"c": "aaa"},
                 "geometry": {"type": "Point", "coordinates": [0, 0]}},
                {"type": "Feature", "properties": {"c": "b"},
                 "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}},
                {"type": "Feature", "properties": {"c": "ab"}, "geometry": null},
                {"type": "Feature", "properties": {"c": null},
                 "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]}}
            ]
        }"#;
        let layer = VectorLayer::from_geojson_str(json, None).unwrap();
        assert_eq!(layer.len(), 1);

        let index = CategoryIndex::from_layer(&layer, "c").unwrap();
        let names: Vec<String> = index.categories().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["aaa", "ab", "b"]);
        assert_eq!(index.id_of(&text("b")).unwrap(), 2);
    }

    #[test]
    fn test_missing_attribute() {
        let json = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"c": "a"}, "geometry": null}
        ]}"#;
        let layer = VectorLayer::from_geojson_str(json, None).unwrap();
        assert!(matches!(
            CategoryIndex::from_layer(&layer, "kind"),
            Err(Error::MissingAttribute(f)) if f == "kind"
        ));
    }

    #[test]
    fn test_from_json() {
        assert_eq!(
            AttributeValue::from_json(&serde_json::json!(4)),
            Some(AttributeValue::Integer(4))
        );
        assert_eq!(
            AttributeValue::from_json(&serde_json::json!("x")),
            Some(text("x"))
        );
        assert_eq!(AttributeValue::from_json(&serde_json::Value::Null), None);
    }
}
