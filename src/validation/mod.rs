//! Instrument validation.
//!
//! This module checks a finished [`Instrument`] for:
//! - Structural integrity (unique names, resolvable and acyclic `depends_on` chains)
//! - Unit consistency (every transformation and shape passes the unit checks)
//! - Geometric validity (OFF winding orders, pixel grids and mappings)
//!
//! The JSON reader records its load warnings in the same [`ValidationReport`].

pub mod chopper;
mod report;

pub use chopper::{check_chopper, ChopperDetails, ChopperInput, ChopperIssue};
pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::{BTreeSet, HashSet};

use crate::error::NexusError;
use crate::model::{
    Component, Geometry, Instrument, OffGeometry, PixelData, TransformationKind,
};
use crate::units::{validate_units, Dimension};

/// Options for validation behavior.
#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// If true, treat warnings as errors.
    pub strict: bool,
}

/// Validates an instrument and returns a report of all issues found.
///
/// The report depends only on the instrument, so validating the same
/// instrument twice gives identical reports.
pub fn validate_instrument(instrument: &Instrument, _opts: &ValidateOptions) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_component_names(instrument, &mut report);

    for component in instrument.components_iter() {
        validate_transformations(component, &mut report);
        validate_geometry(component, &mut report);
        validate_pixel_data(component, &mut report);
    }

    validate_references(instrument, &mut report);
    validate_cycles(instrument, &mut report);

    report
}

fn validate_component_names(instrument: &Instrument, report: &mut ValidationReport) {
    let mut seen = HashSet::new();
    for component in instrument.components_iter() {
        if !seen.insert(component.name.as_str()) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateComponentName,
                format!("Duplicate component name '{}'", component.name),
                IssueContext::component(&component.name),
            ));
        }
    }
}

fn validate_transformations(component: &Component, report: &mut ValidationReport) {
    let mut seen = HashSet::new();
    for transformation in &component.transforms {
        let context = || IssueContext::transformation(&component.name, &transformation.name);

        if !seen.insert(transformation.name.as_str()) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateTransformationName,
                format!("Duplicate transformation name '{}'", transformation.name),
                context(),
            ));
        }

        let expected = match transformation.kind {
            TransformationKind::Translation => Dimension::Length,
            TransformationKind::Rotation => Dimension::Angle,
        };
        if let Err(failure) = validate_units(&transformation.units, expected) {
            report.add(ValidationIssue::warning(
                IssueCode::InvalidUnits,
                format!("Transformation {}", failure),
                context(),
            ));
        }

        if !transformation.value.is_finite() || !transformation.vector.is_finite() {
            report.add(ValidationIssue::error(
                IssueCode::InvalidTransformation,
                format!(
                    "Non-finite value {} or vector {}",
                    transformation.value, transformation.vector
                ),
                context(),
            ));
        } else if transformation.vector.magnitude() == 0.0 {
            report.add(ValidationIssue::warning(
                IssueCode::InvalidTransformation,
                "Transformation vector has zero length",
                context(),
            ));
        }
    }
}

fn validate_geometry(component: &Component, report: &mut ValidationReport) {
    let Some(geometry) = &component.geometry else {
        return;
    };
    let context = || IssueContext::shape(&component.name);

    if let Err(failure) = validate_units(geometry.units(), Dimension::Length) {
        report.add(ValidationIssue::warning(
            IssueCode::InvalidUnits,
            format!("Vertices {}", failure),
            context(),
        ));
    }

    match geometry {
        Geometry::Off(off) => validate_off(off, &component.name, report),
        Geometry::Cylindrical(cylinder) => {
            if cylinder.radius() == 0.0 || cylinder.height() == 0.0 {
                report.add(ValidationIssue::warning(
                    IssueCode::ShapeIssue,
                    format!(
                        "Cylinder is degenerate (radius {}, height {})",
                        cylinder.radius(),
                        cylinder.height()
                    ),
                    context(),
                ));
            }
        }
    }
}

fn validate_off(off: &OffGeometry, component: &str, report: &mut ValidationReport) {
    let vertex_count = off.vertices.len();
    if let Some(bad) = off.winding_order.iter().find(|&&index| index >= vertex_count) {
        report.add(ValidationIssue::error(
            IssueCode::WindingOrderOutOfRange,
            format!(
                "Winding order refers to vertex {} but there are only {} vertices",
                bad, vertex_count
            ),
            IssueContext::shape(component),
        ));
    }

    let increasing = off.winding_order_indices.windows(2).all(|w| w[0] < w[1]);
    let in_range = match off.winding_order_indices.last() {
        Some(&last) => last < off.winding_order.len(),
        None => true,
    };
    if !increasing || !in_range {
        report.add(ValidationIssue::error(
            IssueCode::FaceOffsetsNotIncreasing,
            format!(
                "Face offsets {:?} must be strictly increasing and within the winding order of length {}",
                off.winding_order_indices,
                off.winding_order.len()
            ),
            IssueContext::shape(component),
        ));
    }
}

fn validate_pixel_data(component: &Component, report: &mut ValidationReport) {
    match &component.pixel_data {
        PixelData::Grid(grid) => {
            if grid.rows == 0 || grid.columns == 0 {
                report.add(ValidationIssue::error(
                    IssueCode::EmptyPixelGrid,
                    format!("Pixel grid is {}x{}", grid.rows, grid.columns),
                    IssueContext::component(&component.name),
                ));
            }
        }
        PixelData::Mapping(mapping) => {
            let faces = component.geometry.as_ref().map_or(0, Geometry::face_count);
            if let Some(face) = mapping.ids.keys().find(|&&face| face >= faces) {
                report.add(ValidationIssue::warning(
                    IssueCode::InvalidPixelData,
                    format!(
                        "Pixel mapping refers to face {} but the shape has {} face(s)",
                        face, faces
                    ),
                    IssueContext::component(&component.name),
                ));
            }
        }
        PixelData::SingleId { .. } | PixelData::None => {}
    }
}

fn validate_references(instrument: &Instrument, report: &mut ValidationReport) {
    for (holder, target) in instrument.dangling_references() {
        report.add(ValidationIssue::warning(
            IssueCode::UnresolvedDependency,
            format!("depends_on '{}' does not resolve to a transformation", target),
            IssueContext::component(holder),
        ));
    }
}

/// Reports each distinct cycle once, however many chains run into it.
fn validate_cycles(instrument: &Instrument, report: &mut ValidationReport) {
    let mut cycles: BTreeSet<Vec<String>> = BTreeSet::new();

    for component in instrument.components_iter() {
        for transformation in &component.transforms {
            let start = component.transform_ref(&transformation.name);
            if let Err(NexusError::DependencyCycle { chain }) = instrument.chain_from(&start) {
                cycles.insert(cycle_members(&chain));
            }
        }
    }

    for cycle in cycles {
        let mut shown = cycle.clone();
        if let Some(first) = cycle.first() {
            shown.push(first.clone());
        }
        report.add(ValidationIssue::error(
            IssueCode::DependencyCycle,
            format!("depends_on chain contains a cycle: {}", shown.join(" -> ")),
            IssueContext::Document,
        ));
    }
}

/// The members of the loop at the end of `chain`, rotated to start at the
/// smallest name so the same cycle always looks the same.
fn cycle_members(chain: &[String]) -> Vec<String> {
    let Some(repeated) = chain.last() else {
        return Vec::new();
    };
    let start = chain.iter().position(|link| link == repeated).unwrap_or(0);
    let mut members = chain[start..chain.len() - 1].to_vec();
    if let Some(min) = members
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(i, _)| i)
    {
        members.rotate_left(min);
    }
    members
}
