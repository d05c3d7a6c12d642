// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 GeoTile COCO Contributors. All Rights Reserved.

//! Georeferenced raster sources.
//!
//! A [`RasterSource`] exposes pixel dimensions, the pixel↔world affine
//! transform, an optional CRS and random window reads returning row-major,
//! band-interleaved 8-bit pixels.
//!
//! [`GeoTiffRaster`] decodes a GeoTIFF with the `tiff` crate and reads the
//! georeferencing from the GeoTIFF tags:
//!
//! | Tag   | Name                   | Use                              |
//! |-------|------------------------|----------------------------------|
//! | 33550 | ModelPixelScaleTag     | pixel size, with the tiepoint    |
//! | 33922 | ModelTiepointTag       | raster origin in world units     |
//! | 34264 | ModelTransformationTag | full affine (takes precedence)   |
//! | 34735 | GeoKeyDirectoryTag     | EPSG code of the CRS             |

use crate::{Error, grid::TileWindow, projection::Crs, transform::GeoTransform};
use std::{fs::File, io::BufReader, path::Path};
use tiff::{
    ColorType,
    decoder::{Decoder, DecodingResult, Limits},
    tags::Tag,
};

const MODEL_PIXEL_SCALE_TAG: u16 = 33550;
const MODEL_TIEPOINT_TAG: u16 = 33922;
const MODEL_TRANSFORMATION_TAG: u16 = 34264;
const GEO_KEY_DIRECTORY_TAG: u16 = 34735;

const GEOGRAPHIC_TYPE_GEO_KEY: u32 = 2048;
const PROJECTED_CS_TYPE_GEO_KEY: u32 = 3072;
const USER_DEFINED: u32 = 32767;

/// Row-major, band-interleaved 8-bit pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    bands: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw pixels, checking that `data` holds `width * height * bands`
    /// samples.
    pub fn new(width: u32, height: u32, bands: usize, data: Vec<u8>) -> Result<Self, Error> {
        let expected = width as usize * height as usize * bands;
        if bands == 0 || data.len() != expected {
            return Err(Error::RasterError(format!(
                "pixel buffer {}x{}x{} needs {} samples, got {}",
                width,
                height,
                bands,
                expected,
                data.len()
            )));
        }

        Ok(Self {
            width,
            height,
            bands,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Copy out the pixels covered by `window`.
    pub fn crop(&self, window: &TileWindow) -> Result<PixelBuffer, Error> {
        let fits_x = window.x.checked_add(window.width).is_some_and(|r| r <= self.width);
        let fits_y = window.y.checked_add(window.height).is_some_and(|b| b <= self.height);
        if !fits_x || !fits_y {
            return Err(Error::RasterError(format!(
                "window {}x{} at ({}, {}) exceeds raster {}x{}",
                window.width, window.height, window.x, window.y, self.width, self.height
            )));
        }

        let row_len = window.width as usize * self.bands;
        let stride = self.width as usize * self.bands;
        let mut data = Vec::with_capacity(row_len * window.height as usize);
        for row in window.y..window.y + window.height {
            let start = row as usize * stride + window.x as usize * self.bands;
            data.extend_from_slice(&self.data[start..start + row_len]);
        }

        PixelBuffer::new(window.width, window.height, self.bands, data)
    }
}

/// Random-access reader over a georeferenced raster.
pub trait RasterSource {
    /// `(width, height)` in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Number of interleaved bands per pixel.
    fn bands(&self) -> usize;

    /// Pixel → world affine transform.
    fn transform(&self) -> &GeoTransform;

    /// Coordinate reference system, if the raster declares one.
    fn crs(&self) -> Option<Crs>;

    /// Read the pixels covered by `window`.
    ///
    /// Fails with [`Error::RasterError`] when the window does not fit inside
    /// the raster.
    fn read_window(&self, window: &TileWindow) -> Result<PixelBuffer, Error>;
}

/// Raster held fully in memory.
#[derive(Debug, Clone)]
pub struct MemoryRaster {
    pixels: PixelBuffer,
    transform: GeoTransform,
    crs: Option<Crs>,
}

impl MemoryRaster {
    pub fn new(pixels: PixelBuffer, transform: GeoTransform, crs: Option<Crs>) -> Self {
        Self {
            pixels,
            transform,
            crs,
        }
    }
}

impl RasterSource for MemoryRaster {
    fn dimensions(&self) -> (u32, u32) {
        (self.pixels.width, self.pixels.height)
    }

    fn bands(&self) -> usize {
        self.pixels.bands
    }

    fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    fn crs(&self) -> Option<Crs> {
        self.crs
    }

    fn read_window(&self, window: &TileWindow) -> Result<PixelBuffer, Error> {
        self.pixels.crop(window)
    }
}

/// 8-bit GeoTIFF decoded into memory on open.
///
/// Supports chunky Gray, GrayA, RGB and RGBA images. The whole image is
/// decoded once; window reads are copies.
#[derive(Debug, Clone)]
pub struct GeoTiffRaster {
    inner: MemoryRaster,
}

impl GeoTiffRaster {
    /// Open and decode a GeoTIFF.
    ///
    /// Fails with [`Error::RasterError`] when the file has no usable
    /// georeferencing or an unsupported sample layout.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::RasterError(format!("cannot open {}: {}", path.display(), e))
        })?;
        let mut decoder = Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited());

        let (width, height) = decoder.dimensions()?;
        let bands = match decoder.colortype()? {
            ColorType::Gray(8) => 1,
            ColorType::GrayA(8) => 2,
            ColorType::RGB(8) => 3,
            ColorType::RGBA(8) => 4,
            other => {
                return Err(Error::RasterError(format!(
                    "{}: unsupported color type {:?}, expected 8-bit Gray/GrayA/RGB/RGBA",
                    path.display(),
                    other
                )));
            }
        };

        let transform = read_geotransform(&mut decoder)?.ok_or_else(|| {
            Error::RasterError(format!(
                "{} has no georeferencing (ModelTransformation or PixelScale+Tiepoint)",
                path.display()
            ))
        })?;
        let crs = read_crs(&mut decoder)?;

        let data = match decoder.read_image()? {
            DecodingResult::U8(data) => data,
            _ => {
                return Err(Error::RasterError(format!(
                    "{}: expected 8-bit samples",
                    path.display()
                )));
            }
        };
        let pixels = PixelBuffer::new(width, height, bands, data)?;

        match crs {
            Some(crs) => log::info!(
                "Opened {} ({}x{}, {} bands, {})",
                path.display(),
                width,
                height,
                bands,
                crs
            ),
            None => log::info!(
                "Opened {} ({}x{}, {} bands, no CRS)",
                path.display(),
                width,
                height,
                bands
            ),
        }

        Ok(Self {
            inner: MemoryRaster::new(pixels, transform, crs),
        })
    }
}

impl RasterSource for GeoTiffRaster {
    fn dimensions(&self) -> (u32, u32) {
        self.inner.dimensions()
    }

    fn bands(&self) -> usize {
        self.inner.bands()
    }

    fn transform(&self) -> &GeoTransform {
        self.inner.transform()
    }

    fn crs(&self) -> Option<Crs> {
        self.inner.crs()
    }

    fn read_window(&self, window: &TileWindow) -> Result<PixelBuffer, Error> {
        self.inner.read_window(window)
    }
}

fn find_f64s<R>(decoder: &mut Decoder<R>, code: u16) -> Result<Option<Vec<f64>>, Error>
where
    R: std::io::Read + std::io::Seek,
{
    match decoder.find_tag(Tag::from_u16_exhaustive(code))? {
        Some(value) => Ok(Some(value.into_f64_vec()?)),
        None => Ok(None),
    }
}

fn read_geotransform<R>(decoder: &mut Decoder<R>) -> Result<Option<GeoTransform>, Error>
where
    R: std::io::Read + std::io::Seek,
{
    if let Some(m) = find_f64s(decoder, MODEL_TRANSFORMATION_TAG)? {
        if m.len() < 8 {
            return Err(Error::RasterError(format!(
                "ModelTransformationTag has {} values, expected 16",
                m.len()
            )));
        }
        return GeoTransform::new(m[0], m[1], m[3], m[4], m[5], m[7]).map(Some);
    }

    let scale = find_f64s(decoder, MODEL_PIXEL_SCALE_TAG)?;
    let tiepoint = find_f64s(decoder, MODEL_TIEPOINT_TAG)?;
    match (scale, tiepoint) {
        (Some(scale), Some(tie)) if scale.len() >= 2 && tie.len() >= 6 => {
            let (sx, sy) = (scale[0], scale[1]);
            let (i, j, x, y) = (tie[0], tie[1], tie[3], tie[4]);
            GeoTransform::new(sx, 0.0, x - i * sx, 0.0, -sy, y + j * sy).map(Some)
        }
        (Some(_), Some(_)) => Err(Error::RasterError(
            "ModelPixelScaleTag or ModelTiepointTag is truncated".to_string(),
        )),
        _ => Ok(None),
    }
}

fn read_crs<R>(decoder: &mut Decoder<R>) -> Result<Option<Crs>, Error>
where
    R: std::io::Read + std::io::Seek,
{
    let keys = match decoder.find_tag(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY_TAG))? {
        Some(value) => value.into_u32_vec()?,
        None => return Ok(None),
    };
    Ok(crs_from_geokeys(&keys))
}

/// EPSG code from a GeoKeyDirectory, preferring the projected CRS.
///
/// Only keys stored inline (location 0) are considered; user-defined codes
/// yield `None`.
fn crs_from_geokeys(keys: &[u32]) -> Option<Crs> {
    let count = *keys.get(3)? as usize;
    let entries: Vec<&[u32]> = keys
        .get(4..)?
        .chunks_exact(4)
        .take(count)
        .filter(|entry| entry[1] == 0)
        .collect();

    let lookup = |key: u32| {
        entries
            .iter()
            .find(|entry| entry[0] == key)
            .map(|entry| entry[3])
            .filter(|&code| code != 0 && code != USER_DEFINED)
    };

    lookup(PROJECTED_CS_TYPE_GEO_KEY)
        .or_else(|| lookup(GEOGRAPHIC_TYPE_GEO_KEY))
        .and_then(|code| u16::try_from(code).ok())
        .map(Crs::from_epsg)
}
