// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 GeoTile COCO Contributors. All Rights Reserved.

//! COCO dataset verification utilities.
//!
//! Checks the record invariants every generated document must satisfy:
//! contiguous category ids from 0, strictly increasing image and annotation
//! ids from 1, resolvable references, non-negative boxes whose area is the
//! box area, and segmentation rings of at least three points.

use super::types::CocoDataset;
use crate::intersect::has_min_vertices;
use std::{collections::HashSet, fmt};

/// Tolerance used when comparing `area` against `width * height`.
const AREA_EPSILON: f64 = 1e-6;

/// Maximum number of issues listed per section in the report.
const MAX_LISTED: usize = 5;

/// Result of verifying a COCO document.
#[derive(Debug, Clone, Default)]
pub struct VerificationReport {
    /// Total images in the document.
    pub image_count: usize,
    /// Total annotations in the document.
    pub annotation_count: usize,
    /// Total categories in the document.
    pub category_count: usize,
    /// Category id violations.
    pub category_issues: Vec<String>,
    /// Image id violations.
    pub image_issues: Vec<String>,
    /// Annotation id, reference, bbox, area and segmentation violations.
    pub annotation_issues: Vec<String>,
}

impl VerificationReport {
    /// Returns true if the verification passed all checks.
    pub fn is_valid(&self) -> bool {
        self.category_issues.is_empty()
            && self.image_issues.is_empty()
            && self.annotation_issues.is_empty()
    }

    /// Total number of violations found.
    pub fn issue_count(&self) -> usize {
        self.category_issues.len() + self.image_issues.len() + self.annotation_issues.len()
    }

    /// Returns a summary of the verification.
    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!(
            "Images: {} ({} issues)\n",
            self.image_count,
            self.image_issues.len()
        ));
        s.push_str(&format!(
            "Annotations: {} ({} issues)\n",
            self.annotation_count,
            self.annotation_issues.len()
        ));
        s.push_str(&format!(
            "Categories: {} ({} issues)\n",
            self.category_count,
            self.category_issues.len()
        ));
        for issue in self
            .category_issues
            .iter()
            .chain(&self.image_issues)
            .chain(&self.annotation_issues)
            .take(MAX_LISTED)
        {
            s.push_str(&format!("  - {}\n", issue));
        }
        s
    }
}

fn write_issues(f: &mut fmt::Formatter<'_>, issues: &[String]) -> fmt::Result {
    for issue in issues.iter().take(MAX_LISTED) {
        writeln!(f, "║              - {}", issue)?;
    }
    if issues.len() > MAX_LISTED {
        writeln!(f, "║              ... and {} more", issues.len() - MAX_LISTED)?;
    }
    Ok(())
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "╔══════════════════════════════════════════════════════════════╗"
        )?;
        writeln!(
            f,
            "║                  COCO DATASET VERIFICATION                   ║"
        )?;
        writeln!(
            f,
            "╠══════════════════════════════════════════════════════════════╣"
        )?;
        writeln!(f, "║ Categories:  {}", self.category_count)?;
        write_issues(f, &self.category_issues)?;
        writeln!(f, "║ Images:      {}", self.image_count)?;
        write_issues(f, &self.image_issues)?;
        writeln!(f, "║ Annotations: {}", self.annotation_count)?;
        write_issues(f, &self.annotation_issues)?;
        writeln!(
            f,
            "╠══════════════════════════════════════════════════════════════╣"
        )?;
        let status = if self.is_valid() {
            "✓ PASSED".to_string()
        } else {
            format!("✗ FAILED ({} issues)", self.issue_count())
        };
        writeln!(f, "║ Result:      {}", status)?;
        writeln!(
            f,
            "╚══════════════════════════════════════════════════════════════╝"
        )
    }
}

/// Check a dataset against the COCO record invariants.
///
/// Violations are collected rather than returned as errors so a caller can
/// report all of them at once.
pub fn verify_dataset(dataset: &CocoDataset) -> VerificationReport {
    let mut report = VerificationReport {
        image_count: dataset.images.len(),
        annotation_count: dataset.annotations.len(),
        category_count: dataset.categories.len(),
        ..Default::default()
    };

    let mut category_ids = HashSet::new();
    for (expected, category) in dataset.categories.iter().enumerate() {
        if category.id as usize != expected {
            report.category_issues.push(format!(
                "category '{}' has id {}, expected {}",
                category.name, category.id, expected
            ));
        }
        category_ids.insert(category.id);
    }

    let mut image_ids = HashSet::new();
    for (index, image) in dataset.images.iter().enumerate() {
        let expected = index as u64 + 1;
        if image.id != expected {
            report.image_issues.push(format!(
                "image '{}' has id {}, expected {}",
                image.file_name, image.id, expected
            ));
        }
        image_ids.insert(image.id);
    }

    for (index, ann) in dataset.annotations.iter().enumerate() {
        let expected = index as u64 + 1;
        if ann.id != expected {
            report
                .annotation_issues
                .push(format!("annotation id {}, expected {}", ann.id, expected));
        }

        if !image_ids.contains(&ann.image_id) {
            report.annotation_issues.push(format!(
                "annotation {} references missing image {}",
                ann.id, ann.image_id
            ));
        }
        if !category_ids.contains(&ann.category_id) {
            report.annotation_issues.push(format!(
                "annotation {} references missing category {}",
                ann.id, ann.category_id
            ));
        }

        let [_, _, width, height] = ann.bbox;
        if width < 0.0 || height < 0.0 {
            report.annotation_issues.push(format!(
                "annotation {} has negative bbox size {}x{}",
                ann.id, width, height
            ));
        }
        if (ann.area - width * height).abs() > AREA_EPSILON {
            report.annotation_issues.push(format!(
                "annotation {} area {} differs from bbox area {}",
                ann.id,
                ann.area,
                width * height
            ));
        }

        if ann.segmentation.is_empty() {
            report
                .annotation_issues
                .push(format!("annotation {} has no segmentation", ann.id));
        }
        for ring in &ann.segmentation {
            if !has_min_vertices(ring) || ring.len() % 2 != 0 {
                report.annotation_issues.push(format!(
                    "annotation {} ring has {} values",
                    ann.id,
                    ring.len()
                ));
            }
        }
    }

    report
}
