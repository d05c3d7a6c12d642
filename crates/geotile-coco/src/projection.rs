// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 GeoTile COCO Contributors. All Rights Reserved.

//! Coordinate reference systems and point reprojection.
//!
//! Reprojection is pure Rust: EPSG codes resolve to PROJ strings through
//! `crs-definitions` and points are transformed with `proj4rs`.

use crate::Error;
use proj4rs::proj::Proj;
use std::fmt;

/// Coordinate reference system identified by its EPSG code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Crs {
    epsg: u16,
}

impl Crs {
    /// WGS 84 geographic coordinates, the GeoJSON default.
    pub const WGS84: Crs = Crs { epsg: 4326 };

    /// CRS from an EPSG code.
    pub fn from_epsg(epsg: u16) -> Self {
        Self { epsg }
    }

    /// EPSG code.
    pub fn epsg(&self) -> u16 {
        self.epsg
    }

    /// Parse `EPSG:n`, `urn:ogc:def:crs:EPSG::n` or the OGC CRS84 URN.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("urn:ogc:def:crs:OGC:1.3:CRS84")
            || name.eq_ignore_ascii_case("CRS84")
        {
            return Some(Self::WGS84);
        }

        let upper = name.to_ascii_uppercase();
        let code = upper
            .strip_prefix("URN:OGC:DEF:CRS:EPSG::")
            .or_else(|| upper.strip_prefix("URN:OGC:DEF:CRS:EPSG:"))
            .or_else(|| upper.strip_prefix("EPSG:"))?;
        // Versioned URNs place the version between the colons
        let code = code.rsplit(':').next()?;
        code.parse().ok().map(Self::from_epsg)
    }

    /// PROJ string from the bundled EPSG database.
    pub fn proj_string(&self) -> Option<&'static str> {
        crs_definitions::from_code(self.epsg).map(|def| def.proj4)
    }

    /// True for longitude/latitude systems.
    pub fn is_geographic(&self) -> bool {
        match self.proj_string() {
            Some(proj) => proj.contains("+proj=longlat"),
            None => self.epsg == 4326 || (4000..5000).contains(&self.epsg),
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

/// Reusable point transformer between two reference systems.
pub struct Reprojector {
    source: Crs,
    target: Crs,
    source_proj: Proj,
    target_proj: Proj,
    source_geographic: bool,
    target_geographic: bool,
}

impl Reprojector {
    /// Prepare a transformation from `source` to `target`.
    pub fn new(source: Crs, target: Crs) -> Result<Self, Error> {
        let source_proj = load_proj(source)?;
        let target_proj = load_proj(target)?;
        Ok(Self {
            source,
            target,
            source_proj,
            target_proj,
            source_geographic: source.is_geographic(),
            target_geographic: target.is_geographic(),
        })
    }

    /// Transform one point.
    pub fn project(&self, x: f64, y: f64) -> Result<(f64, f64), Error> {
        // proj4rs works in radians for geographic systems
        let mut point = if self.source_geographic {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };

        proj4rs::transform::transform(&self.source_proj, &self.target_proj, &mut point).map_err(
            |e| {
                Error::ProjectionError(format!(
                    "transform from {} to {} failed for ({}, {}): {:?}",
                    self.source, self.target, x, y, e
                ))
            },
        )?;

        if self.target_geographic {
            Ok((point.0.to_degrees(), point.1.to_degrees()))
        } else {
            Ok((point.0, point.1))
        }
    }
}

fn load_proj(crs: Crs) -> Result<Proj, Error> {
    let proj_string = crs.proj_string().ok_or_else(|| {
        Error::ProjectionError(format!("{} is not in the crs-definitions database", crs))
    })?;
    Proj::from_proj_string(proj_string)
        .map_err(|e| Error::ProjectionError(format!("invalid projection {}: {:?}", crs, e)))
}
