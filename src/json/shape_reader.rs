//! Reads component shapes and their pixel data.
//!
//! A shape group is an `NXoff_geometry` or `NXcylindrical_geometry` group,
//! usually named `shape`, `pixel_shape` or `detector_shape`. The reader never
//! fails: anything it cannot use is recorded in the report, and the
//! component's geometry and pixel data are only set once a shape has been
//! built completely.
//!
//! Issues come in two flavours. An *error* means the shape could not be
//! built and was skipped; an *issue* means something did not add up but the
//! shape was still built.

use serde_json::Value;
use tracing::debug;

use super::node;
use crate::model::{
    Component, CylindricalGeometry, Geometry, OffGeometry, PixelData, Vector3, CYLINDER_INDICES,
};
use crate::pixel_grid::{check_regular_grid, unmap_pixel_ids, PixelGridArrays};
use crate::units::{validate_units, Dimension, FLOAT_TYPES, INT_TYPES};
use crate::validation::{IssueCode, IssueContext, ValidationIssue, ValidationReport};

pub const SHAPE: &str = "shape";
pub const PIXEL_SHAPE: &str = "pixel_shape";
pub const DETECTOR_SHAPE: &str = "detector_shape";

pub const FACES: &str = "faces";
pub const VERTICES: &str = "vertices";
pub const WINDING_ORDER: &str = "winding_order";
pub const CYLINDERS: &str = "cylinders";
pub const DETECTOR_FACES: &str = "detector_faces";
pub const DETECTOR_NUMBER: &str = "detector_number";
pub const X_PIXEL_OFFSET: &str = "x_pixel_offset";
pub const Y_PIXEL_OFFSET: &str = "y_pixel_offset";
pub const Z_PIXEL_OFFSET: &str = "z_pixel_offset";

/// Returns true if a component child is a shape group.
pub fn is_shape_group(child: &Value) -> bool {
    if !node::is_group(child) {
        return false;
    }
    matches!(node::name(child), Some(SHAPE | PIXEL_SHAPE | DETECTOR_SHAPE))
        || matches!(
            node::nx_class(child),
            Some(OffGeometry::NX_CLASS | CylindricalGeometry::NX_CLASS)
        )
}

/// Builds the component's geometry from `shape`, then its pixel data.
///
/// `component_children` are the children of the component group itself,
/// where pixel offset arrays and `detector_number` live.
pub fn read_shape(
    component: &mut Component,
    shape: &Value,
    component_children: &[Value],
    report: &mut ValidationReport,
) {
    let shape_type = node::nx_class(shape).unwrap_or_default();
    let mut reader = ShapeReader {
        component: &component.name,
        shape_type,
        report,
    };

    let geometry = match shape_type {
        OffGeometry::NX_CLASS => reader.read_off(shape).map(Geometry::Off),
        CylindricalGeometry::NX_CLASS => reader.read_cylinder(shape).map(Geometry::Cylindrical),
        _ => {
            reader.report.add(ValidationIssue::error(
                IssueCode::InvalidShape,
                format!(
                    "Unrecognised shape type for component {}. Expected '{}' or '{}' but found '{}'.",
                    component.name,
                    OffGeometry::NX_CLASS,
                    CylindricalGeometry::NX_CLASS,
                    shape_type
                ),
                IssueContext::shape(&component.name),
            ));
            None
        }
    };
    let Some(geometry) = geometry else {
        return;
    };

    let pixel_data = match node::name(shape) {
        Some(PIXEL_SHAPE) => reader.read_pixel_grid(component_children),
        Some(DETECTOR_SHAPE) => reader.read_pixel_mapping(shape),
        _ => None,
    };

    debug!(
        component = %component.name,
        kind = geometry.nx_class(),
        faces = geometry.face_count(),
        "read shape"
    );
    component.geometry = Some(geometry);
    if let Some(pixel_data) = pixel_data {
        component.pixel_data = pixel_data;
    }
}

/// Element kind a values list must hold.
#[derive(Clone, Copy)]
enum Numeric {
    Int,
    Float,
}

impl Numeric {
    fn types(self) -> &'static [&'static str] {
        match self {
            Numeric::Int => INT_TYPES,
            Numeric::Float => FLOAT_TYPES,
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Numeric::Int => node::is_integer(value),
            Numeric::Float => value.is_number(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Numeric::Int => "int",
            Numeric::Float => "float",
        }
    }
}

struct ShapeReader<'a> {
    component: &'a str,
    shape_type: &'a str,
    report: &'a mut ValidationReport,
}

impl ShapeReader<'_> {
    /// The shape could not be built.
    fn error(&mut self, code: IssueCode, detail: impl std::fmt::Display) {
        self.report.add(ValidationIssue::error(
            code,
            format!(
                "Error encountered when constructing {} for component {}: {}",
                self.shape_type, self.component, detail
            ),
            IssueContext::shape(self.component),
        ));
    }

    /// Something did not add up, but the shape can still be built.
    fn issue(&mut self, code: IssueCode, detail: impl std::fmt::Display) {
        self.report.add(ValidationIssue::warning(
            code,
            format!(
                "Issue encountered when constructing {} for component {}: {}",
                self.shape_type, self.component, detail
            ),
            IssueContext::shape(self.component),
        ));
    }

    fn children<'v>(&mut self, shape: &'v Value) -> Option<&'v [Value]> {
        if node::name(shape).is_none() {
            self.issue(IssueCode::ShapeIssue, "Unable to find name of shape. Will use 'shape'.");
        }
        match shape.get("children") {
            Some(Value::Array(children)) => Some(children),
            Some(_) => {
                self.error(IssueCode::InvalidShape, "Children attribute in shape group is not a list.");
                None
            }
            None => {
                self.error(IssueCode::InvalidShape, "Unable to find children list in shape group.");
                None
            }
        }
    }

    fn dataset<'v>(&mut self, children: &'v [Value], name: &str) -> Option<&'v Value> {
        let found = node::find_child(children, name);
        if found.is_none() {
            self.error(IssueCode::InvalidShape, format!("Couldn't find {name} attribute."));
        }
        found
    }

    fn read_off(&mut self, shape: &Value) -> Option<OffGeometry> {
        let children = self.children(shape)?;
        let faces_dataset = self.dataset(children, FACES)?;
        let vertices_dataset = self.dataset(children, VERTICES)?;
        let winding_dataset = self.dataset(children, WINDING_ORDER)?;

        let faces = self.values(faces_dataset, Numeric::Int, FACES)?;
        let units = self.units(vertices_dataset)?;
        let vertices = self.values(vertices_dataset, Numeric::Float, VERTICES)?;
        let winding_order = self.values(winding_dataset, Numeric::Int, WINDING_ORDER)?;

        let vertices = self.points(vertices)?;
        let faces = self.indices(faces, FACES)?;
        let winding_order = self.indices(winding_order, WINDING_ORDER)?;

        if let Some(bad) = winding_order.iter().find(|&&index| index >= vertices.len()) {
            self.error(
                IssueCode::WindingOrderOutOfRange,
                format!(
                    "Winding order refers to vertex {bad} but there are only {} vertices.",
                    vertices.len()
                ),
            );
            return None;
        }
        let increasing = faces.windows(2).all(|pair| pair[0] < pair[1]);
        let in_range = faces.iter().all(|&start| start < winding_order.len());
        if !increasing || !in_range {
            self.error(
                IssueCode::FaceOffsetsNotIncreasing,
                format!(
                    "Face starting indices {faces:?} must be strictly increasing and within the winding order."
                ),
            );
            return None;
        }

        Some(OffGeometry {
            vertices,
            winding_order,
            winding_order_indices: faces,
            units: units.to_string(),
        })
    }

    fn read_cylinder(&mut self, shape: &Value) -> Option<CylindricalGeometry> {
        let children = self.children(shape)?;
        let vertices_dataset = self.dataset(children, VERTICES)?;
        let cylinders_dataset = self.dataset(children, CYLINDERS)?;

        let units = self.units(vertices_dataset)?;
        let cylinders = self.values(cylinders_dataset, Numeric::Int, CYLINDERS)?;
        let vertices = self.values(vertices_dataset, Numeric::Float, VERTICES)?;

        let vertices = self.points(vertices)?;
        if vertices.len() != CYLINDER_INDICES.len() {
            self.error(
                IssueCode::InvalidShape,
                format!(
                    "Expected exactly 3 vertices for a cylinder but found {}.",
                    vertices.len()
                ),
            );
            return None;
        }

        let cylinders = self.indices(cylinders, CYLINDERS)?;
        let [base_center, base_edge, top_center] = match cylinders.as_slice() {
            &[a, b, c] if a < 3 && b < 3 && c < 3 => [vertices[a], vertices[b], vertices[c]],
            _ => {
                self.error(
                    IssueCode::InvalidShape,
                    format!(
                        "Expected a single cylinder {:?} but found {cylinders:?}.",
                        CYLINDER_INDICES
                    ),
                );
                return None;
            }
        };

        Some(CylindricalGeometry::new(
            base_center,
            base_edge,
            top_center,
            units,
        ))
    }

    /// Finds and checks the vertices' units. Any failure skips the shape.
    fn units<'v>(&mut self, vertices: &'v Value) -> Option<&'v str> {
        if vertices.get("attributes").is_none() {
            self.error(
                IssueCode::InvalidShape,
                "Unable to find attributes list in vertices dataset.",
            );
            return None;
        }
        let Some(units) = node::attribute_str(vertices, "units").filter(|u| !u.is_empty()) else {
            self.error(
                IssueCode::InvalidShape,
                "Unable to find units attribute in vertices dataset.",
            );
            return None;
        };
        if let Err(failure) = validate_units(units, Dimension::Length) {
            self.error(IssueCode::InvalidUnits, format!("Vertices {failure}."));
            return None;
        }
        Some(units)
    }

    /// Finds a dataset's values and checks them against `kind`.
    ///
    /// A wrong declared type or a missing or mismatched size is only an
    /// issue. Missing values, a non-list, a ragged array or an element of
    /// the wrong kind skip the shape.
    fn values<'v>(&mut self, dataset: &'v Value, kind: Numeric, name: &str) -> Option<&'v Value> {
        match node::dataset_type(dataset) {
            Some(dtype) if kind.types().iter().any(|t| t.eq_ignore_ascii_case(dtype)) => {}
            Some(_) => self.issue(
                IssueCode::ShapeIssue,
                format!(
                    "Type attribute for {name} does not match expected type(s) {:?}.",
                    kind.types()
                ),
            ),
            None => self.issue(
                IssueCode::ShapeIssue,
                format!("Unable to find type attribute for {name}."),
            ),
        }

        let Some(values) = node::values(dataset) else {
            self.error(
                IssueCode::InvalidShape,
                format!("Unable to find values in {name} dataset."),
            );
            return None;
        };
        if !values.is_array() {
            self.error(
                IssueCode::InvalidShape,
                format!("values attribute in {name} dataset is not a list."),
            );
            return None;
        }

        let Some(shape) = node::array_shape(values) else {
            self.error(
                IssueCode::InvalidShape,
                format!("Incorrect array shape for {name} dataset."),
            );
            return None;
        };
        match node::dataset_size(dataset) {
            Some(size) if size != shape => self.issue(
                IssueCode::ShapeIssue,
                format!(
                    "Mismatch between length of {name} list ({shape:?}) and size attribute from dataset ({size:?})."
                ),
            ),
            Some(_) => {}
            None => self.issue(
                IssueCode::ShapeIssue,
                format!("Unable to find size attribute for {name} dataset."),
            ),
        }

        if !node::leaves(values).into_iter().all(|v| kind.accepts(v)) {
            self.error(
                IssueCode::InvalidShape,
                format!(
                    "Values in {name} list do not all have type {}.",
                    kind.name()
                ),
            );
            return None;
        }
        Some(values)
    }

    fn points(&mut self, values: &Value) -> Option<Vec<Vector3>> {
        let rows = node::rows_f64(values).unwrap_or_default();
        if values.as_array().is_some_and(Vec::is_empty) {
            return Some(Vec::new());
        }
        if rows.iter().any(|row| row.len() != 3) {
            self.error(
                IssueCode::InvalidShape,
                "Vertices must be a list of points with 3 coordinates each.",
            );
            return None;
        }
        Some(rows.into_iter().map(|row| Vector3::new(row[0], row[1], row[2])).collect())
    }

    fn indices(&mut self, values: &Value, name: &str) -> Option<Vec<usize>> {
        let mut indices = Vec::new();
        for value in node::leaves(values) {
            match value.as_u64().and_then(|i| usize::try_from(i).ok()) {
                Some(index) => indices.push(index),
                None => {
                    self.error(
                        IssueCode::InvalidShape,
                        format!("{name} contains an invalid index: {value}."),
                    );
                    return None;
                }
            }
        }
        Some(indices)
    }

    fn required_array<'v>(&mut self, children: &'v [Value], name: &str) -> Option<&'v Value> {
        let found = node::find_child(children, name).and_then(node::values);
        if found.is_none() {
            self.issue(
                IssueCode::InvalidPixelData,
                format!("Unable to find {name} for pixel grid."),
            );
        }
        found
    }

    /// Reads the component-level pixel arrays and decodes them into a grid.
    fn read_pixel_grid(&mut self, component_children: &[Value]) -> Option<PixelData> {
        let ids = self.required_array(component_children, DETECTOR_NUMBER)?;
        let x = self.required_array(component_children, X_PIXEL_OFFSET)?;
        let y = self.required_array(component_children, Y_PIXEL_OFFSET)?;
        let z = node::find_child(component_children, Z_PIXEL_OFFSET).and_then(node::values);

        let (Some(ids), Some(x), Some(y)) = (node::rows_i64(ids), node::rows_f64(x), node::rows_f64(y))
        else {
            self.issue(
                IssueCode::InvalidPixelData,
                "Pixel offsets and detector numbers must be numeric arrays.",
            );
            return None;
        };
        let z = match z {
            Some(values) => match node::rows_f64(values) {
                Some(rows) => rows,
                None => {
                    self.issue(
                        IssueCode::InvalidPixelData,
                        format!("{} must be a numeric array.", Z_PIXEL_OFFSET),
                    );
                    return None;
                }
            },
            None => ids.iter().map(|row| vec![0.0; row.len()]).collect(),
        };

        let arrays = PixelGridArrays {
            x_offsets: x,
            y_offsets: y,
            z_offsets: z,
            detector_ids: ids,
        };
        let grid = match arrays.decode() {
            Ok(grid) => grid,
            Err(err) => {
                self.issue(IssueCode::InvalidPixelData, err);
                return None;
            }
        };
        match check_regular_grid(&grid, &arrays) {
            Ok(()) => Some(PixelData::Grid(grid)),
            Err(detail) => {
                self.issue(
                    IssueCode::InvalidPixelData,
                    format!("pixel arrays do not form a regular grid: {detail}."),
                );
                None
            }
        }
    }

    /// Reads `detector_faces` from the shape group. Absence is not an issue.
    fn read_pixel_mapping(&mut self, shape: &Value) -> Option<PixelData> {
        let children = node::children(shape)?;
        let values = node::find_child(children, DETECTOR_FACES).and_then(node::values)?;

        let pairs: Option<Vec<[i64; 2]>> = node::rows_i64(values).and_then(|rows| {
            rows.into_iter()
                .map(|row| <[i64; 2]>::try_from(row).ok())
                .collect()
        });
        let mapping = match pairs {
            Some(pairs) => unmap_pixel_ids(&pairs),
            None => Err("expected a list of [face, detector id] pairs".to_string()),
        };
        match mapping {
            Ok(mapping) => Some(PixelData::Mapping(mapping)),
            Err(detail) => {
                self.issue(
                    IssueCode::InvalidPixelData,
                    format!("Invalid {}: {detail}.", DETECTOR_FACES),
                );
                None
            }
        }
    }
}
