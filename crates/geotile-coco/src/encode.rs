// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 GeoTile COCO Contributors. All Rights Reserved.

//! Tile image encoding.

use crate::{Error, raster::PixelBuffer};
use image::ExtendedColorType;
use std::{fmt, path::Path, str::FromStr};

/// Output format of the tile images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
}

impl ImageFormat {
    /// File extension used for tile names.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
        }
    }

    fn to_image_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
        }
    }
}

impl FromStr for ImageFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
            "png" => Ok(ImageFormat::Png),
            other => Err(Error::UnsupportedFormat(format!(
                "image format '{}' (expected jpg or png)",
                other
            ))),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Persists tile pixels to a file.
pub trait ImageEncoder {
    fn write(&self, path: &Path, pixels: &PixelBuffer, format: ImageFormat) -> Result<(), Error>;
}

/// Encoder backed by the `image` crate.
///
/// JPEG has no alpha channel, so GrayA and RGBA tiles lose their alpha band
/// when written as JPEG.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileImageEncoder;

impl ImageEncoder for FileImageEncoder {
    fn write(&self, path: &Path, pixels: &PixelBuffer, format: ImageFormat) -> Result<(), Error> {
        let (color, samples) = match (pixels.bands(), format) {
            (1, _) => (ExtendedColorType::L8, None),
            (2, ImageFormat::Png) => (ExtendedColorType::La8, None),
            (3, _) => (ExtendedColorType::Rgb8, None),
            (4, ImageFormat::Png) => (ExtendedColorType::Rgba8, None),
            (2, ImageFormat::Jpeg) => (ExtendedColorType::L8, Some(drop_alpha(pixels))),
            (4, ImageFormat::Jpeg) => (ExtendedColorType::Rgb8, Some(drop_alpha(pixels))),
            (bands, _) => {
                return Err(Error::UnsupportedFormat(format!(
                    "{} bands cannot be encoded as {}",
                    bands, format
                )));
            }
        };

        let data = samples.as_deref().unwrap_or(pixels.data());
        image::save_buffer_with_format(
            path,
            data,
            pixels.width(),
            pixels.height(),
            color,
            format.to_image_format(),
        )?;

        Ok(())
    }
}

/// Interleaved samples without the trailing alpha band.
fn drop_alpha(pixels: &PixelBuffer) -> Vec<u8> {
    let bands = pixels.bands();
    pixels
        .data()
        .chunks_exact(bands)
        .flat_map(|pixel| &pixel[..bands - 1])
        .copied()
        .collect()
}
