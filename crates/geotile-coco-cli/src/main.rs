// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 GeoTile COCO Contributors. All Rights Reserved.

use clap::{Parser, Subcommand};
use geotile_coco::{
    CategoryIndex, Error, Progress, TilingConfig, VectorLayer,
    coco::{CocoReader, verify_dataset},
    convert,
};
use inquire::Select;
use std::{path::PathBuf, sync::mpsc, thread};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Write a Chrome trace of the conversion to this file
    #[cfg(feature = "trace-file")]
    #[clap(long, env = "GEOTILE_COCO_TRACE_FILE")]
    trace_file: Option<PathBuf>,

    /// Command
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Cut a GeoTIFF into tiles and write COCO annotations for the labeled
    /// polygons of a GeoJSON layer.  Settings not given on the command line
    /// are taken from the settings file, then GEOTILE_COCO_* environment
    /// variables, then built-in defaults.
    Convert {
        /// Input GeoTIFF
        #[clap(long)]
        geotiff: Option<PathBuf>,

        /// Input GeoJSON with labeled polygons
        #[clap(long)]
        vector: Option<PathBuf>,

        /// Attribute holding the class label; prompted for when missing
        #[clap(long)]
        class_field: Option<String>,

        /// Output directory [default: output_coco]
        #[clap(long, short)]
        output_dir: Option<PathBuf>,

        /// Tile edge length in pixels [default: 1000]
        #[clap(long)]
        tile_size: Option<u32>,

        /// Overlap between tiles in pixels [default: 200]
        #[clap(long)]
        overlap: Option<u32>,

        /// Tile image format, jpg or png [default: jpg]
        #[clap(long)]
        format: Option<String>,

        /// Settings file (TOML, JSON or YAML)
        #[clap(long)]
        config: Option<PathBuf>,

        /// Write the annotation file without indentation
        #[clap(long)]
        compact: bool,
    },
    /// List the categories a class field yields, in id order.
    Categories {
        /// GeoJSON with labeled polygons
        #[clap(long)]
        vector: PathBuf,

        /// Attribute holding the class label
        #[clap(long)]
        class_field: String,
    },
    /// Check a COCO annotation file for id, reference and geometry errors.
    Verify {
        /// COCO annotation JSON
        annotations: PathBuf,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
struct ConvertOverrides {
    geotiff: Option<PathBuf>,
    vector: Option<PathBuf>,
    class_field: Option<String>,
    output_dir: Option<PathBuf>,
    tile_size: Option<u32>,
    overlap: Option<u32>,
    format: Option<String>,
    compact: bool,
}

impl ConvertOverrides {
    fn apply(self, mut config: TilingConfig) -> TilingConfig {
        if let Some(geotiff) = self.geotiff {
            config.geotiff = Some(geotiff);
        }
        if let Some(vector) = self.vector {
            config.vector = Some(vector);
        }
        if let Some(class_field) = self.class_field {
            config.class_field = Some(class_field);
        }
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(tile_size) = self.tile_size {
            config.tile_size = tile_size;
        }
        if let Some(overlap) = self.overlap {
            config.overlap = overlap;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if self.compact {
            config.pretty = false;
        }
        config
    }
}

fn prompt_class_field(config: &TilingConfig) -> Result<String, Error> {
    let vector = config
        .vector
        .as_ref()
        .ok_or_else(|| Error::InvalidConfiguration("vector path is not set".to_string()))?;
    let layer = VectorLayer::from_geojson_path(vector, None)?;
    let names: Vec<String> = layer.attribute_names().map(str::to_string).collect();
    if names.is_empty() {
        return Err(Error::InvalidConfiguration(format!(
            "{} has no attributes to use as class field",
            vector.display()
        )));
    }

    Select::new("Attribute holding the class label", names)
        .prompt()
        .map_err(|e| Error::InvalidConfiguration(format!("class field not selected: {}", e)))
}

fn handle_convert(settings: Option<PathBuf>, overrides: ConvertOverrides) -> Result<(), Error> {
    use indicatif::{ProgressBar, ProgressStyle};

    let mut config = overrides.apply(TilingConfig::load(settings.as_deref())?);
    config.validate()?;
    log::debug!("Settings: {:?}", config);

    if config.class_field.is_none() {
        config.class_field = Some(prompt_class_field(&config)?);
    }

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise} ETA: {eta}] {msg}: {wide_bar:.yellow} {human_pos}/{human_len}",
        )
        .unwrap()
        .progress_chars("█▇▆▅▄▃▂▁  "),
    );
    bar.set_message("Tiling");

    let (tx, rx) = mpsc::channel::<Progress>();

    let progress_bar = bar.clone();
    let updater = thread::spawn(move || {
        while let Ok(progress) = rx.recv() {
            if progress.total > 0 {
                progress_bar.set_length(progress.total as u64);
                progress_bar.set_position(progress.current as u64);
            }
        }
    });

    let result = convert(&config, Some(tx));
    let _ = updater.join();
    bar.finish_and_clear();

    let summary = result?;
    println!("Tiles: {}", summary.tiles);
    println!("Annotations: {}", summary.annotations);
    println!("Categories: {}", summary.categories);
    println!("Images: {}", summary.images_dir.display());
    println!("COCO annotations: {}", summary.annotations_path.display());
    Ok(())
}

fn handle_categories(vector: PathBuf, class_field: String) -> Result<(), Error> {
    let layer = VectorLayer::from_geojson_path(&vector, None)?;
    let categories = CategoryIndex::from_layer(&layer, &class_field)?;

    for category in categories.categories() {
        println!("[{}] {}", category.id, category.name());
    }
    Ok(())
}

fn handle_verify(annotations: PathBuf) -> Result<(), Error> {
    let dataset = CocoReader::new().read_json(&annotations)?;
    let report = verify_dataset(&dataset);
    println!("{}", report);

    if !report.is_valid() {
        return Err(Error::InvalidDataset(format!(
            "{} has {} issues",
            annotations.display(),
            report.issue_count()
        )));
    }
    Ok(())
}

#[cfg(feature = "trace-file")]
fn init_trace_file(path: &std::path::Path) -> tracing_chrome::FlushGuard {
    use tracing_subscriber::prelude::*;

    let (chrome, guard) = tracing_chrome::ChromeLayerBuilder::new().file(path).build();
    tracing_subscriber::registry().with(chrome).init();
    guard
}

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    #[cfg(feature = "trace-file")]
    let _trace_guard = args.trace_file.as_deref().map(init_trace_file);

    match args.cmd {
        Command::Convert {
            geotiff,
            vector,
            class_field,
            output_dir,
            tile_size,
            overlap,
            format,
            config,
            compact,
        } => handle_convert(
            config,
            ConvertOverrides {
                geotiff,
                vector,
                class_field,
                output_dir,
                tile_size,
                overlap,
                format,
                compact,
            },
        ),
        Command::Categories {
            vector,
            class_field,
        } => handle_categories(vector, class_field),
        Command::Verify { annotations } => handle_verify(annotations),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_take_precedence() {
        let base = TilingConfig {
            tile_size: 512,
            overlap: 64,
            class_field: Some("landuse".to_string()),
            ..Default::default()
        };
        let overrides = ConvertOverrides {
            overlap: Some(32),
            format: Some("png".to_string()),
            compact: true,
            ..Default::default()
        };

        let config = overrides.apply(base);
        assert_eq!(config.tile_size, 512);
        assert_eq!(config.overlap, 32);
        assert_eq!(config.format, "png");
        assert_eq!(config.class_field.as_deref(), Some("landuse"));
        assert!(!config.pretty);
    }

    #[test]
    fn test_parse_convert() {
        let args = Args::try_parse_from([
            "geotile-coco",
            "convert",
            "--geotiff",
            "scene.tif",
            "--vector",
            "labels.geojson",
            "--tile-size",
            "640",
        ])
        .unwrap();

        match args.cmd {
            Command::Convert {
                geotiff,
                tile_size,
                class_field,
                compact,
                ..
            } => {
                assert_eq!(geotiff, Some(PathBuf::from("scene.tif")));
                assert_eq!(tile_size, Some(640));
                assert_eq!(class_field, None);
                assert!(!compact);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
