// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 GeoTile COCO Contributors. All Rights Reserved.

//! End-to-end conversion tests on a synthetic GeoTIFF and GeoJSON.
//!
//! The raster is a 0.5 m UTM 33N grid with its top-left corner at
//! (500000, 4100000), so pixel (col, row) covers world
//! (500000 + col / 2, 4100000 - row / 2).

use chrono::{NaiveDate, NaiveDateTime};
use geotile_coco::{
    Error, FileImageEncoder, GeoTiffRaster, RasterSource, Tiler, TilingConfig, VectorLayer,
    coco::{CocoDataset, CocoReader, verify_dataset},
    convert,
};
use std::{
    fs::File,
    path::{Path, PathBuf},
};
use tempfile::TempDir;
use tiff::{
    encoder::{TiffEncoder, colortype},
    tags::Tag,
};

const ORIGIN_X: f64 = 500000.0;
const ORIGIN_Y: f64 = 4100000.0;
const PIXEL: f64 = 0.5;

fn write_geotiff(path: &Path, width: u32, height: u32) {
    let data: Vec<u8> = (0..width * height * 3).map(|v| (v % 251) as u8).collect();
    let file = File::create(path).unwrap();
    let mut encoder = TiffEncoder::new(file).unwrap();
    let mut image = encoder.new_image::<colortype::RGB8>(width, height).unwrap();
    image
        .encoder()
        .write_tag(Tag::Unknown(33550), &[PIXEL, PIXEL, 0.0][..])
        .unwrap();
    image
        .encoder()
        .write_tag(
            Tag::Unknown(33922),
            &[0.0, 0.0, 0.0, ORIGIN_X, ORIGIN_Y, 0.0][..],
        )
        .unwrap();
    // GTModelType = projected, ProjectedCSType = 32633
    image
        .encoder()
        .write_tag(
            Tag::Unknown(34735),
            &[1u16, 1, 0, 2, 1024, 0, 1, 1, 3072, 0, 1, 32633][..],
        )
        .unwrap();
    image.write_data(&data).unwrap();
}

/// GeoJSON ring for the pixel rectangle `[col0, col1] × [row0, row1]`.
fn pixel_rect(col0: f64, row0: f64, col1: f64, row1: f64) -> String {
    let x = |col: f64| ORIGIN_X + col * PIXEL;
    let y = |row: f64| ORIGIN_Y - row * PIXEL;
    format!(
        "[[[{}, {}], [{}, {}], [{}, {}], [{}, {}], [{}, {}]]]",
        x(col0),
        y(row0),
        x(col1),
        y(row0),
        x(col1),
        y(row1),
        x(col0),
        y(row1),
        x(col0),
        y(row0)
    )
}

fn feature(class: &str, coordinates: &str) -> String {
    format!(
        r#"{{"type": "Feature", "properties": {{"landuse": "{}", "area_id": 7}},
            "geometry": {{"type": "Polygon", "coordinates": {}}}}}"#,
        class, coordinates
    )
}

fn write_geojson(path: &Path, features: &[String]) {
    let contents = format!(
        r#"{{
            "type": "FeatureCollection",
            "crs": {{"type": "name", "properties": {{"name": "urn:ogc:def:crs:EPSG::32633"}}}},
            "features": [{}]
        }}"#,
        features.join(",")
    );
    std::fs::write(path, contents).unwrap();
}

struct Fixture {
    dir: TempDir,
    geotiff: PathBuf,
    vector: PathBuf,
}

impl Fixture {
    fn new(width: u32, height: u32, features: &[String]) -> Self {
        let dir = TempDir::new().unwrap();
        let geotiff = dir.path().join("scene.tif");
        let vector = dir.path().join("labels.geojson");
        write_geotiff(&geotiff, width, height);
        write_geojson(&vector, features);
        Self {
            dir,
            geotiff,
            vector,
        }
    }

    fn config(&self, output: &str) -> TilingConfig {
        TilingConfig {
            geotiff: Some(self.geotiff.clone()),
            vector: Some(self.vector.clone()),
            class_field: Some("landuse".to_string()),
            output_dir: self.dir.path().join(output),
            tile_size: 1000,
            overlap: 0,
            ..Default::default()
        }
    }
}

fn timestamp() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 9, 18)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
}

fn assert_bbox(actual: [f64; 4], expected: [f64; 4]) {
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-6, "{:?} != {:?}", actual, expected);
    }
}

fn read(path: &Path) -> CocoDataset {
    CocoReader::new().read_json(path).unwrap()
}

#[test]
fn test_convert_geotiff() {
    let fixture = Fixture::new(
        2000,
        1200,
        &[
            feature("forest", &pixel_rect(100.0, 200.0, 300.0, 400.0)),
            feature("water", &pixel_rect(900.0, 500.0, 1100.0, 600.0)),
        ],
    );
    let config = fixture.config("out");

    let summary = convert(&config, None).unwrap();
    assert_eq!(summary.tiles, 2);
    assert_eq!(summary.annotations, 3);
    assert_eq!(summary.categories, 2);

    for name in ["tile_1.jpg", "tile_2.jpg"] {
        let tile = image::open(summary.images_dir.join(name)).unwrap();
        assert_eq!((tile.width(), tile.height()), (1000, 1000));
    }
    assert!(!summary.images_dir.join("tile_3.jpg").exists());

    let dataset = read(&summary.annotations_path);
    assert!(verify_dataset(&dataset).is_valid());
    assert_eq!(dataset.images[0].file_name, "tile_1.jpg");
    assert_eq!(dataset.images[0].license, 1);
    assert_eq!(dataset.categories[0].name, "forest");
    assert_eq!(dataset.categories[1].name, "water");
    assert!(dataset.categories.iter().all(|c| c.supercategory == "objects"));

    let forest = &dataset.annotations[0];
    assert_eq!((forest.image_id, forest.category_id), (1, 0));
    assert_bbox(forest.bbox, [100.0, 200.0, 200.0, 200.0]);
    assert!((forest.area - 40000.0).abs() < 1e-3);

    // The water polygon straddles the vertical tile boundary at col 1000
    let left = &dataset.annotations[1];
    assert_eq!((left.image_id, left.category_id), (1, 1));
    assert_bbox(left.bbox, [900.0, 500.0, 100.0, 100.0]);
    let right = &dataset.annotations[2];
    assert_eq!((right.id, right.image_id), (3, 2));
    assert_bbox(right.bbox, [0.0, 500.0, 100.0, 100.0]);
}

#[test]
fn test_rerun_is_identical() {
    let fixture = Fixture::new(
        2000,
        2000,
        &[
            feature("b", &pixel_rect(100.0, 100.0, 400.0, 300.0)),
            feature("a", &pixel_rect(1200.0, 1200.0, 1300.0, 1900.0)),
            feature("a", &pixel_rect(700.0, 700.0, 1300.0, 1300.0)),
        ],
    );
    let raster = GeoTiffRaster::open(&fixture.geotiff).unwrap();
    let layer = VectorLayer::from_geojson_path(&fixture.vector, raster.crs()).unwrap();

    let first = Tiler::new(fixture.config("first"))
        .with_timestamp(timestamp())
        .run(&raster, &layer, &FileImageEncoder, None)
        .unwrap();
    let second = Tiler::new(fixture.config("second"))
        .with_timestamp(timestamp())
        .run(&raster, &layer, &FileImageEncoder, None)
        .unwrap();

    assert_eq!(first.tiles, 4);
    assert_eq!(first.annotations, second.annotations);
    let first_json = std::fs::read(&first.annotations_path).unwrap();
    let second_json = std::fs::read(&second.annotations_path).unwrap();
    assert_eq!(first_json, second_json);

    let dataset = read(&first.annotations_path);
    let ids: Vec<u64> = dataset.images.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    assert_eq!(dataset.categories[0].name, "a");
    assert!(
        dataset
            .images
            .iter()
            .all(|i| i.date_captured == "2025-09-18T08:00:00")
    );
}

#[test]
fn test_edge_touch_keeps_empty_tile() {
    // Starts exactly on the boundary between tiles 1 and 2
    let fixture = Fixture::new(
        2000,
        1000,
        &[feature("roof", &pixel_rect(1000.0, 100.0, 1200.0, 300.0))],
    );

    let summary = convert(&fixture.config("out"), None).unwrap();
    assert_eq!(summary.tiles, 2);
    assert_eq!(summary.annotations, 1);

    let dataset = read(&summary.annotations_path);
    assert_eq!(dataset.images.len(), 2);
    assert_eq!(dataset.annotations[0].image_id, 2);
    assert_bbox(dataset.annotations[0].bbox, [0.0, 100.0, 200.0, 200.0]);
}

#[test]
fn test_overlap_drops_partial_tiles() {
    let fixture = Fixture::new(
        1500,
        1000,
        &[feature("roof", &pixel_rect(1100.0, 100.0, 1400.0, 300.0))],
    );
    let config = TilingConfig {
        overlap: 200,
        format: "png".to_string(),
        ..fixture.config("out")
    };

    let summary = convert(&config, None).unwrap();
    assert_eq!(summary.tiles, 1);
    assert_eq!(summary.annotations, 0);
    assert!(summary.images_dir.join("tile_1.png").exists());
}

#[test]
fn test_missing_class_field() {
    let fixture = Fixture::new(
        1000,
        1000,
        &[feature("roof", &pixel_rect(0.0, 0.0, 10.0, 10.0))],
    );
    let config = TilingConfig {
        class_field: Some("category".to_string()),
        ..fixture.config("out")
    };

    let err = convert(&config, None).unwrap_err();
    assert!(matches!(err, Error::MissingAttribute(ref field) if field == "category"));
    assert!(err.to_string().contains("category"));
    assert!(!fixture.dir.path().join("out").exists());
}

#[test]
fn test_numeric_class_field() {
    let fixture = Fixture::new(
        1000,
        1000,
        &[
            feature("roof", &pixel_rect(10.0, 10.0, 50.0, 50.0)),
            feature("pool", &pixel_rect(60.0, 60.0, 90.0, 90.0)),
        ],
    );
    let config = TilingConfig {
        class_field: Some("area_id".to_string()),
        ..fixture.config("out")
    };

    let summary = convert(&config, None).unwrap();
    let dataset = read(&summary.annotations_path);
    assert_eq!(summary.categories, 1);
    assert_eq!(dataset.categories[0].name, "7");
    assert_eq!(dataset.annotations.len(), 2);
}

#[test]
fn test_non_polygon_features_keep_category_ids() {
    let marker = format!(
        r#"{{"type": "Feature", "properties": {{"landuse": "antenna"}},
            "geometry": {{"type": "Point", "coordinates": [{}, {}]}}}}"#,
        ORIGIN_X + 10.0,
        ORIGIN_Y - 10.0
    );
    let fixture = Fixture::new(
        1000,
        1000,
        &[marker, feature("roof", &pixel_rect(10.0, 10.0, 50.0, 50.0))],
    );

    let summary = convert(&fixture.config("out"), None).unwrap();
    assert_eq!(summary.categories, 2);
    assert_eq!(summary.annotations, 1);

    let dataset = read(&summary.annotations_path);
    assert_eq!(dataset.categories[0].name, "antenna");
    assert_eq!(dataset.categories[1].name, "roof");
    assert_eq!(dataset.annotations[0].category_id, 1);
}
