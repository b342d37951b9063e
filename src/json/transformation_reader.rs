//! Reads a component's transformations from its JSON children.
//!
//! Candidates are the datasets inside a child group whose `NX_class` is
//! `NXtransformations` (or the singular `NXtransformation`), and datasets
//! directly under the component that carry that class themselves. Each
//! candidate is checked on its own: a bad attribute produces exactly one
//! issue and skips that transformation, leaving its siblings alone.

use serde_json::Value;
use tracing::debug;

use super::node;
use crate::model::{Component, Transformation, TransformationKind, Vector3};
use crate::units::{is_numeric_type, validate_units, Dimension};
use crate::validation::{IssueCode, IssueContext, ValidationIssue, ValidationReport};

/// The `depends_on` value that marks the end of a chain.
pub const DEPENDS_ON_TERMINAL: &str = ".";

/// A `depends_on` path recorded for resolution once every component exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingDependency {
    /// Name of the transformation holding the path.
    pub transformation: String,
    pub path: String,
}

/// Returns true if the node's class marks it as (holding) transformations.
pub fn contains_transformations(node: &Value) -> bool {
    matches!(
        node::nx_class(node),
        Some(node::NX_TRANSFORMATIONS | node::NX_TRANSFORMATION)
    )
}

/// Appends every valid transformation found in `children` to `component`,
/// in document order, and returns the paths still to be resolved.
pub fn read_transformations(
    component: &mut Component,
    children: &[Value],
    report: &mut ValidationReport,
) -> Vec<PendingDependency> {
    let mut pending = Vec::new();

    for candidate in candidates(children) {
        match read_transformation(&component.name, candidate) {
            Ok((transformation, depends_on)) => {
                if component.transformation(&transformation.name).is_some() {
                    report.add(ValidationIssue::error(
                        IssueCode::DuplicateTransformationName,
                        format!(
                            "Transformation {} appears more than once in component {}. Only the first is kept.",
                            transformation.name, component.name
                        ),
                        IssueContext::transformation(&component.name, &transformation.name),
                    ));
                    continue;
                }
                debug!(
                    component = %component.name,
                    transformation = %transformation.name,
                    kind = %transformation.kind,
                    "read transformation"
                );
                if let Some(path) = depends_on {
                    pending.push(PendingDependency {
                        transformation: transformation.name.clone(),
                        path,
                    });
                }
                component.transforms.push(transformation);
            }
            Err(problem) => {
                let context = IssueContext::transformation(
                    &component.name,
                    node::name(candidate).unwrap_or_default(),
                );
                report.add(ValidationIssue::error(problem.code, problem.message, context));
            }
        }
    }

    pending
}

fn candidates(children: &[Value]) -> Vec<&Value> {
    let mut found = Vec::new();
    for child in children {
        if node::is_group(child) && contains_transformations(child) {
            if let Some(grandchildren) = node::children(child) {
                found.extend(grandchildren.iter().filter(|c| node::is_dataset(c)));
            }
        } else if node::is_dataset(child) && contains_transformations(child) {
            found.push(child);
        }
    }
    found
}

struct Problem {
    code: IssueCode,
    message: String,
}

fn invalid(message: String) -> Problem {
    Problem {
        code: IssueCode::InvalidTransformation,
        message,
    }
}

fn read_transformation(
    component: &str,
    dataset: &Value,
) -> Result<(Transformation, Option<String>), Problem> {
    let name = node::name(dataset).ok_or_else(|| {
        invalid(format!(
            "Unable to find name of transformation in component {component}."
        ))
    })?;
    let missing = |attribute: &str| {
        invalid(format!(
            "Unable to find {attribute} attribute in transformation {name} of component {component}."
        ))
    };

    let dtype = node::dataset_type(dataset).ok_or_else(|| missing("dataset type"))?;
    if !is_numeric_type(dtype) {
        return Err(invalid(format!(
            "Invalid dataset type '{dtype}' for transformation {name} of component {component}. Expected a numeric type."
        )));
    }

    let kind_name =
        node::attribute(dataset, "transformation_type").ok_or_else(|| missing("transformation_type"))?;
    let kind = kind_name
        .as_str()
        .and_then(TransformationKind::parse)
        .ok_or_else(|| {
            invalid(format!(
                "Invalid transformation_type {kind_name} for transformation {name} of component {component}. Expected 'translation' or 'rotation'."
            ))
        })?;

    let raw_value = node::values(dataset).ok_or_else(|| missing("values"))?;
    let value = node::scalar_f64(raw_value).ok_or_else(|| {
        invalid(format!(
            "values of transformation {name} of component {component} is not a single number. Found {raw_value}."
        ))
    })?;

    let units = node::attribute_str(dataset, "units").ok_or_else(|| missing("units"))?;
    let expected = match kind {
        TransformationKind::Translation => Dimension::Length,
        TransformationKind::Rotation => Dimension::Angle,
    };
    validate_units(units, expected).map_err(|failure| Problem {
        code: IssueCode::InvalidUnits,
        message: format!("Transformation {name} of component {component}: {failure}"),
    })?;

    let raw_vector = node::attribute(dataset, "vector").ok_or_else(|| missing("vector"))?;
    let vector = match node::flat_f64(raw_vector).as_deref() {
        Some(&[x, y, z]) if raw_vector.is_array() => Vector3::new(x, y, z),
        _ => {
            return Err(invalid(format!(
                "vector attribute of transformation {name} of component {component} must contain exactly 3 numbers. Found {raw_vector}."
            )))
        }
    };

    let depends_on = match node::attribute(dataset, "depends_on") {
        None => None,
        Some(Value::String(path)) if path == DEPENDS_ON_TERMINAL || path.is_empty() => None,
        Some(Value::String(path)) => Some(path.clone()),
        Some(other) => {
            return Err(invalid(format!(
                "depends_on attribute of transformation {name} of component {component} is not a path. Found {other}."
            )))
        }
    };

    let transformation = Transformation::new(name, kind, value, units, vector);
    Ok((transformation, depends_on))
}
