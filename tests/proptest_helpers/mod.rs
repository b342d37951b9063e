#![allow(dead_code)]

use nxinstrument::model::{
    Component, ComponentClass, CountDirection, Corner, Geometry, Instrument, OffGeometry,
    PixelGrid, TransformRef, Transformation, Vector3,
};
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

pub fn arb_corner() -> impl Strategy<Value = Corner> {
    prop_oneof![
        Just(Corner::BottomLeft),
        Just(Corner::BottomRight),
        Just(Corner::TopLeft),
        Just(Corner::TopRight),
    ]
}

pub fn arb_direction() -> impl Strategy<Value = CountDirection> {
    prop_oneof![Just(CountDirection::Row), Just(CountDirection::Column)]
}

/// Spacings that are exact binary fractions, so offsets subtract back exactly.
pub fn arb_spacing() -> impl Strategy<Value = f64> {
    (1u32..64).prop_map(|n| f64::from(n) / 16.0)
}

/// Grids of at least 2x2: a single row or column cannot tell its corners apart.
pub fn arb_pixel_grid(max_side: usize) -> impl Strategy<Value = PixelGrid> {
    (
        2..=max_side,
        2..=max_side,
        arb_spacing(),
        arb_spacing(),
        -1000i64..100_000,
        arb_direction(),
        arb_corner(),
    )
        .prop_map(
            |(rows, columns, row_height, col_width, first_id, count_direction, corner)| PixelGrid {
                rows,
                columns,
                row_height,
                col_width,
                first_id,
                count_direction,
                initial_count_corner: corner,
            },
        )
}

pub fn arb_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,8}"
}

pub fn arb_vector() -> impl Strategy<Value = Vector3> {
    prop_oneof![
        Just(Vector3::new(1.0, 0.0, 0.0)),
        Just(Vector3::new(0.0, 1.0, 0.0)),
        Just(Vector3::new(0.0, 0.0, 1.0)),
        Just(Vector3::new(0.0, -1.0, 0.0)),
    ]
}

pub fn arb_transformation() -> impl Strategy<Value = Transformation> {
    (
        arb_name(),
        any::<bool>(),
        -1.0e6f64..1.0e6,
        arb_vector(),
    )
        .prop_map(|(name, is_rotation, value, vector)| {
            if is_rotation {
                Transformation::rotation(name, value, "deg", vector)
            } else {
                Transformation::translation(name, value, "m", vector)
            }
        })
}

/// A small mesh whose faces are fans over a polygon.
pub fn arb_off(max_vertices: usize) -> impl Strategy<Value = OffGeometry> {
    (3..=max_vertices).prop_map(|n| {
        let vertices = (0..n)
            .map(|i| {
                let angle = i as f64 * std::f64::consts::TAU / n as f64;
                Vector3::new(angle.cos(), angle.sin(), 0.0)
            })
            .collect();
        let faces: Vec<Vec<usize>> = (1..n - 1).map(|i| vec![0, i, i + 1]).collect();
        OffGeometry::from_faces(vertices, &faces, "m")
    })
}

/// Components with unique names and unique transformation names, each
/// chained to the previous component's last transformation.
pub fn arb_instrument(max_components: usize) -> impl Strategy<Value = Instrument> {
    prop::collection::btree_map(
        arb_name().prop_filter("not the sample", |n| n != "sample"),
        (
            prop::collection::btree_map(arb_name(), arb_transformation(), 0..4),
            prop::option::of(arb_off(6)),
        ),
        0..=max_components,
    )
    .prop_map(|components| {
        let mut instrument = Instrument::default();
        let mut previous: Option<TransformRef> = None;
        for (name, (transforms, geometry)) in components {
            let mut component = Component::new(&name, ComponentClass::Detector);
            let mut link = previous.clone();
            for (transform_name, mut transformation) in transforms {
                transformation.name = transform_name.clone();
                transformation.depends_on = link.take();
                link = Some(TransformRef::new(&name, &transform_name));
                component.transforms.push(transformation);
            }
            if let Some(last) = component.transforms.last() {
                component.depends_on = Some(TransformRef::new(&name, &last.name));
                previous = component.depends_on.clone();
            }
            if let Some(off) = geometry {
                component.geometry = Some(Geometry::Off(off));
            }
            instrument
                .add_component(component)
                .expect("component names are unique");
        }
        instrument
    })
}
