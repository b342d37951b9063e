//! Converts an [`Instrument`] into a generic NeXus [`Group`] tree.
//!
//! The layout is the one the reader expects back:
//!
//! ```text
//! entry (NXentry)
//! ├── <sample> (NXsample)
//! └── instrument (NXinstrument)
//!     └── <component> (NXdetector, NXmonitor, ...)
//!         ├── description
//!         ├── transformations (NXtransformations)
//!         ├── depends_on
//!         ├── shape | pixel_shape | detector_shape
//!         └── detector_number, x/y/z_pixel_offset, detector_id
//! ```

use serde_json::json;
use tracing::debug;

use super::reader::DETECTOR_ID;
use super::shape_reader::{
    CYLINDERS, DETECTOR_FACES, DETECTOR_NUMBER, FACES, VERTICES, WINDING_ORDER, X_PIXEL_OFFSET,
    Y_PIXEL_OFFSET, Z_PIXEL_OFFSET,
};
use super::transformation_reader::DEPENDS_ON_TERMINAL;
use super::writer::{Attribute, Dataset, Group};
use crate::model::{
    Component, CylindricalGeometry, Geometry, Instrument, OffGeometry, PixelData, PixelGrid,
    TransformRef, Transformation, Vector3, CYLINDER_INDICES,
};
use crate::pixel_grid::{encode_pixel_grid, pixel_mapping_pairs};

pub const TRANSFORMATIONS: &str = "transformations";

const FLOAT: &str = "double";
const INDEX: &str = "int32";
const DETECTOR_ID_TYPE: &str = "int64";
const STRING: &str = "string";
const PIXEL_OFFSET_UNITS: &str = "m";

/// Builds the `entry` group for an instrument.
pub fn instrument_to_tree(instrument: &Instrument) -> Group {
    let mut container = Group::new(&instrument.name, "NXinstrument");
    for component in &instrument.components {
        container.push(component_group(instrument, component));
    }

    Group::new(&instrument.entry_name, "NXentry")
        .with_child(component_group(instrument, &instrument.sample))
        .with_child(container)
}

/// Absolute path of a transformation dataset in the tree built by
/// [`instrument_to_tree`].
pub fn transformation_path(instrument: &Instrument, target: &TransformRef) -> String {
    if target.component == instrument.sample.name {
        format!(
            "/{}/{}/{TRANSFORMATIONS}/{}",
            instrument.entry_name, target.component, target.transformation
        )
    } else {
        format!(
            "/{}/{}/{}/{TRANSFORMATIONS}/{}",
            instrument.entry_name, instrument.name, target.component, target.transformation
        )
    }
}

fn component_group(instrument: &Instrument, component: &Component) -> Group {
    debug!(component = %component.name, "encoding component");
    let mut group = Group::new(&component.name, component.nx_class.nx_class());

    if !component.description.is_empty() {
        group.push(Dataset::new("description", STRING, component.description.as_str()));
    }

    if !component.transforms.is_empty() {
        let mut transformations = Group::new(TRANSFORMATIONS, "NXtransformations");
        for transformation in &component.transforms {
            transformations.push(transformation_dataset(instrument, transformation));
        }
        group.push(transformations);
    }

    if let Some(target) = &component.depends_on {
        group.push(Dataset::new(
            "depends_on",
            STRING,
            transformation_path(instrument, target),
        ));
    }

    if let Some(geometry) = &component.geometry {
        let mut shape = match geometry {
            Geometry::Off(off) => off_group(off),
            Geometry::Cylindrical(cylinder) => cylinder_group(cylinder),
        };
        shape.name = component.pixel_data.shape_group_name().to_string();
        if let PixelData::Mapping(mapping) = &component.pixel_data {
            let pairs = pixel_mapping_pairs(mapping);
            if !pairs.is_empty() {
                shape.push(Dataset::new(DETECTOR_FACES, DETECTOR_ID_TYPE, json!(pairs)));
            }
        }
        group.push(shape);
    }

    match &component.pixel_data {
        PixelData::Grid(grid) => push_pixel_grid(&mut group, grid),
        PixelData::SingleId { id } => {
            group.push(Dataset::new(DETECTOR_ID, DETECTOR_ID_TYPE, *id));
        }
        PixelData::Mapping(_) | PixelData::None => {}
    }

    group
}

fn transformation_dataset(instrument: &Instrument, transformation: &Transformation) -> Dataset {
    let depends_on = transformation
        .depends_on
        .as_ref()
        .map(|target| transformation_path(instrument, target))
        .unwrap_or_else(|| DEPENDS_ON_TERMINAL.to_string());

    Dataset::new(&transformation.name, FLOAT, transformation.value)
        .with_attribute(Attribute::new("units", transformation.units.as_str()))
        .with_attribute(Attribute::new("transformation_type", transformation.kind.as_str()))
        .with_attribute(
            Attribute::new("vector", json!(transformation.vector.to_array())).with_dtype(FLOAT),
        )
        .with_attribute(Attribute::new("depends_on", depends_on))
}

fn vertices_dataset(vertices: &[Vector3], units: &str) -> Dataset {
    let rows: Vec<[f64; 3]> = vertices.iter().map(|v| v.to_array()).collect();
    Dataset::new(VERTICES, FLOAT, json!(rows)).with_attribute(Attribute::new("units", units))
}

fn off_group(off: &OffGeometry) -> Group {
    Group::new("shape", OffGeometry::NX_CLASS)
        .with_child(Dataset::new(FACES, INDEX, json!(off.winding_order_indices)))
        .with_child(vertices_dataset(&off.vertices, &off.units))
        .with_child(Dataset::new(WINDING_ORDER, INDEX, json!(off.winding_order)))
}

fn cylinder_group(cylinder: &CylindricalGeometry) -> Group {
    Group::new("shape", CylindricalGeometry::NX_CLASS)
        .with_child(vertices_dataset(&cylinder.vertices(), &cylinder.units))
        .with_child(Dataset::new(CYLINDERS, INDEX, json!(CYLINDER_INDICES)))
}

fn push_pixel_grid(group: &mut Group, grid: &PixelGrid) {
    let arrays = encode_pixel_grid(grid);
    let offsets = [
        (X_PIXEL_OFFSET, arrays.x_offsets),
        (Y_PIXEL_OFFSET, arrays.y_offsets),
        (Z_PIXEL_OFFSET, arrays.z_offsets),
    ];
    for (name, values) in offsets {
        group.push(
            Dataset::new(name, FLOAT, json!(values))
                .with_attribute(Attribute::new("units", PIXEL_OFFSET_UNITS)),
        );
    }
    group.push(Dataset::new(
        DETECTOR_NUMBER,
        DETECTOR_ID_TYPE,
        json!(arrays.detector_ids),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ComponentClass, CountDirection, Corner, PixelMapping};

    fn instrument() -> Instrument {
        let mut instrument = Instrument::default();
        instrument.sample.transforms.push(Transformation::translation(
            "stage",
            0.1,
            "m",
            Vector3::new(0.0, 0.0, 1.0),
        ));
        let detector = Component::new("detector", ComponentClass::Detector)
            .with_description("Main bank")
            .with_geometry(Geometry::Cylindrical(CylindricalGeometry::from_axis(
                Vector3::new(0.0, 1.0, 0.0),
                2.0,
                0.5,
                "cm",
            )))
            .with_pixel_data(PixelData::Grid(PixelGrid {
                rows: 2,
                columns: 2,
                row_height: 0.5,
                col_width: 0.25,
                first_id: 1,
                count_direction: CountDirection::Row,
                initial_count_corner: Corner::BottomLeft,
            }));
        instrument.add_component(detector).unwrap();
        let detector = instrument.component_mut("detector").unwrap();
        detector.transforms.push(
            Transformation::rotation("tilt", 90.0, "deg", Vector3::new(0.0, 1.0, 0.0))
                .with_depends_on(TransformRef::new("sample", "stage")),
        );
        detector.depends_on = Some(TransformRef::new("detector", "tilt"));
        instrument
    }

    #[test]
    fn paths_distinguish_sample_from_instrument_components() {
        let instrument = Instrument::default();
        assert_eq!(
            transformation_path(&instrument, &TransformRef::new("sample", "stage")),
            "/entry/sample/transformations/stage"
        );
        assert_eq!(
            transformation_path(&instrument, &TransformRef::new("detector", "tilt")),
            "/entry/instrument/detector/transformations/tilt"
        );
    }

    #[test]
    fn tree_layout() {
        let tree = instrument_to_tree(&instrument());
        assert_eq!(tree.name, "entry");
        assert!(tree.group("sample").is_some());

        let detector = tree.group("instrument").and_then(|g| g.group("detector")).unwrap();
        assert_eq!(detector.nx_class.as_deref(), Some("NXdetector"));
        assert_eq!(
            detector.dataset("depends_on").map(|d| &d.values),
            Some(&json!("/entry/instrument/detector/transformations/tilt"))
        );

        let shape = detector.group("pixel_shape").unwrap();
        assert_eq!(shape.nx_class.as_deref(), Some("NXcylindrical_geometry"));
        assert_eq!(shape.dataset(CYLINDERS).map(|d| &d.values), Some(&json!([0, 1, 2])));

        let ids = detector.dataset(DETECTOR_NUMBER).unwrap();
        assert_eq!(ids.values, json!([[1, 2], [3, 4]]));
        assert!(detector.dataset(Z_PIXEL_OFFSET).is_some());
    }

    #[test]
    fn transformation_attributes() {
        let tree = instrument_to_tree(&instrument());
        let tilt = tree
            .group("instrument")
            .and_then(|g| g.group("detector"))
            .and_then(|g| g.group(TRANSFORMATIONS))
            .and_then(|g| g.dataset("tilt"))
            .unwrap();
        let attribute = |name: &str| {
            tilt.attributes
                .iter()
                .find(|a| a.name == name)
                .map(|a| a.values.clone())
        };
        assert_eq!(attribute("transformation_type"), Some(json!("rotation")));
        assert_eq!(attribute("units"), Some(json!("deg")));
        assert_eq!(attribute("vector"), Some(json!([0.0, 1.0, 0.0])));
        assert_eq!(
            attribute("depends_on"),
            Some(json!("/entry/sample/transformations/stage"))
        );

        let stage = tree
            .group("sample")
            .and_then(|g| g.group(TRANSFORMATIONS))
            .and_then(|g| g.dataset("stage"))
            .unwrap();
        assert!(stage
            .attributes
            .iter()
            .any(|a| a.name == "depends_on" && a.values == json!(".")));
    }

    #[test]
    fn mapped_detector_writes_faces_in_its_shape_group() {
        let mut instrument = Instrument::default();
        let off = OffGeometry::from_faces(
            vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
            ],
            &[vec![0, 1, 2]],
            "m",
        );
        let mapping: PixelMapping = [(0, 42)].into_iter().collect();
        instrument
            .add_component(
                Component::new("bank", ComponentClass::Detector)
                    .with_geometry(Geometry::Off(off))
                    .with_pixel_data(PixelData::Mapping(mapping)),
            )
            .unwrap();

        let tree = instrument_to_tree(&instrument);
        let shape = tree
            .group("instrument")
            .and_then(|g| g.group("bank"))
            .and_then(|g| g.group("detector_shape"))
            .unwrap();
        assert_eq!(
            shape.dataset(DETECTOR_FACES).map(|d| &d.values),
            Some(&json!([[0, 42]]))
        );
        assert_eq!(shape.dataset(FACES).map(|d| &d.values), Some(&json!([0])));
    }

    #[test]
    fn single_id_is_a_component_dataset() {
        let mut instrument = Instrument::default();
        instrument
            .add_component(
                Component::new("monitor", ComponentClass::Monitor)
                    .with_pixel_data(PixelData::SingleId { id: 7 }),
            )
            .unwrap();
        let tree = instrument_to_tree(&instrument);
        let monitor = tree.group("instrument").and_then(|g| g.group("monitor")).unwrap();
        assert_eq!(monitor.dataset(DETECTOR_ID).map(|d| &d.values), Some(&json!(7)));
        assert!(monitor.group("detector_shape").is_none());
    }
}
