#![allow(dead_code)]

use serde_json::{json, Value};

pub fn entry(children: Vec<Value>) -> Value {
    json!({"nexus_structure": {"children": [{
        "type": "group",
        "name": "entry",
        "children": children,
        "attributes": [{"name": "NX_class", "values": "NXentry"}]
    }]}})
}

pub fn group(name: &str, nx_class: &str, children: Vec<Value>) -> Value {
    json!({
        "type": "group",
        "name": name,
        "children": children,
        "attributes": [{"name": "NX_class", "values": nx_class}]
    })
}

pub fn instrument(children: Vec<Value>) -> Value {
    group("instrument", "NXinstrument", children)
}

/// A dataset whose `size` is derived from `values`.
pub fn dataset(name: &str, dtype: &str, values: Value) -> Value {
    let mut node = json!({
        "type": "dataset",
        "name": name,
        "dataset": {"type": dtype},
        "values": values
    });
    if let Some(size) = shape_of(&node["values"]) {
        node["dataset"]["size"] = json!(size);
    }
    node
}

pub fn with_units(mut node: Value, units: &str) -> Value {
    node["attributes"] = json!([{"name": "units", "values": units}]);
    node
}

fn shape_of(values: &Value) -> Option<Vec<usize>> {
    let outer = values.as_array()?;
    let mut shape = vec![outer.len()];
    if let Some(inner) = outer.first().and_then(Value::as_array) {
        shape.push(inner.len());
    }
    Some(shape)
}

pub fn transformation(
    name: &str,
    kind: &str,
    value: f64,
    units: &str,
    vector: [f64; 3],
    depends_on: &str,
) -> Value {
    json!({
        "type": "dataset",
        "name": name,
        "dataset": {"type": "double"},
        "values": value,
        "attributes": [
            {"name": "units", "values": units},
            {"name": "transformation_type", "values": kind},
            {"name": "vector", "values": vector, "type": "double"},
            {"name": "depends_on", "values": depends_on}
        ]
    })
}

pub fn transformations(children: Vec<Value>) -> Value {
    group("transformations", "NXtransformations", children)
}

pub fn depends_on(path: &str) -> Value {
    json!({"type": "dataset", "name": "depends_on", "dataset": {"type": "string"}, "values": path})
}

pub fn cube_vertices() -> Value {
    json!([
        [-0.5, -0.5, 0.5], [0.5, -0.5, 0.5], [-0.5, 0.5, 0.5], [0.5, 0.5, 0.5],
        [-0.5, 0.5, -0.5], [0.5, 0.5, -0.5], [-0.5, -0.5, -0.5], [0.5, -0.5, -0.5]
    ])
}

pub fn cube_winding_order() -> Value {
    json!([0, 1, 3, 2, 2, 3, 5, 4, 4, 5, 7, 6, 6, 7, 1, 0, 1, 7, 5, 3, 6, 0, 2, 4])
}

/// A unit cube in an `NXoff_geometry` group called `name`.
pub fn cube(name: &str) -> Value {
    group(
        name,
        "NXoff_geometry",
        vec![
            dataset("faces", "int32", json!([0, 4, 8, 12, 16, 20])),
            with_units(dataset("vertices", "double", cube_vertices()), "m"),
            dataset("winding_order", "int32", cube_winding_order()),
        ],
    )
}
