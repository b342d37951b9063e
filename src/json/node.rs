//! Accessors for nodes of the NeXus JSON tree.
//!
//! Documents come from several producers, so attributes may be given either
//! as a list of `{name, values}` objects or as a plain `{name: value}` map.
//! Every lookup here accepts both.

use serde_json::Value;

pub const NX_CLASS: &str = "NX_class";
pub const NX_INSTRUMENT: &str = "NXinstrument";
pub const NX_TRANSFORMATIONS: &str = "NXtransformations";
pub const NX_TRANSFORMATION: &str = "NXtransformation";

pub const GROUP: &str = "group";
pub const DATASET: &str = "dataset";

/// The `name` of a node.
pub fn name(node: &Value) -> Option<&str> {
    node.get("name")?.as_str()
}

/// Returns true if the node's `type` is `group`.
pub fn is_group(node: &Value) -> bool {
    node.get("type").and_then(Value::as_str) == Some(GROUP)
}

/// Returns true if the node's `type` is `dataset`, or it has a `dataset` block.
pub fn is_dataset(node: &Value) -> bool {
    node.get("type").and_then(Value::as_str) == Some(DATASET) || node.get("dataset").is_some()
}

/// The `children` list of a group.
pub fn children(node: &Value) -> Option<&Vec<Value>> {
    node.get("children")?.as_array()
}

/// Finds the first child with the given name.
pub fn find_child<'a>(children: &'a [Value], child_name: &str) -> Option<&'a Value> {
    children.iter().find(|child| name(child) == Some(child_name))
}

/// Looks an attribute up in either the list or the map form.
pub fn find_attribute<'a>(attributes: &'a Value, attribute_name: &str) -> Option<&'a Value> {
    match attributes {
        Value::Array(list) => list
            .iter()
            .find(|attribute| name(attribute) == Some(attribute_name))
            .and_then(|attribute| attribute.get("values")),
        Value::Object(map) => map.get(attribute_name),
        _ => None,
    }
}

/// An attribute of a node.
pub fn attribute<'a>(node: &'a Value, attribute_name: &str) -> Option<&'a Value> {
    find_attribute(node.get("attributes")?, attribute_name)
}

/// A string attribute of a node.
pub fn attribute_str<'a>(node: &'a Value, attribute_name: &str) -> Option<&'a str> {
    attribute(node, attribute_name)?.as_str()
}

/// The node's `NX_class`.
pub fn nx_class(node: &Value) -> Option<&str> {
    attribute_str(node, NX_CLASS)
}

/// Element type declared in the dataset block, e.g. `double`.
pub fn dataset_type(node: &Value) -> Option<&str> {
    node.get("dataset")?.get("type")?.as_str()
}

/// Shape declared in the dataset block, if any.
pub fn dataset_size(node: &Value) -> Option<Vec<usize>> {
    node.get("dataset")?
        .get("size")?
        .as_array()?
        .iter()
        .map(|dim| dim.as_u64().and_then(|d| usize::try_from(d).ok()))
        .collect()
}

/// The `values` payload of a dataset.
pub fn values(node: &Value) -> Option<&Value> {
    node.get("values")
}

/// The string value of the named child dataset, e.g. `depends_on`.
pub fn child_string(children: &[Value], child_name: &str) -> Option<String> {
    let child = find_child(children, child_name)?;
    match values(child)? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) if items.len() == 1 => items[0].as_str().map(str::to_string),
        _ => None,
    }
}

// ============================================================================
// Values
// ============================================================================

/// Shape of a nested array. Scalars have shape `[]`. `None` if ragged.
pub fn array_shape(value: &Value) -> Option<Vec<usize>> {
    match value {
        Value::Array(items) => {
            let mut shape = vec![items.len()];
            if let Some(first) = items.first() {
                let inner = array_shape(first)?;
                for item in &items[1..] {
                    if array_shape(item)? != inner {
                        return None;
                    }
                }
                shape.extend(inner);
            }
            Some(shape)
        }
        _ => Some(Vec::new()),
    }
}

/// Every leaf of a nested array, depth first.
pub fn leaves(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().flat_map(leaves).collect(),
        leaf => vec![leaf],
    }
}

pub fn is_integer(value: &Value) -> bool {
    value.is_i64() || value.is_u64()
}

/// A number, or an array nesting exactly one number.
pub fn scalar_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Array(items) if items.len() == 1 => scalar_f64(&items[0]),
        _ => None,
    }
}

/// An integer, or an array nesting exactly one integer.
pub fn scalar_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::Array(items) if items.len() == 1 => scalar_i64(&items[0]),
        _ => None,
    }
}

/// All leaves as floats, flattened.
pub fn flat_f64(value: &Value) -> Option<Vec<f64>> {
    leaves(value).into_iter().map(Value::as_f64).collect()
}

/// All leaves as integers, flattened.
pub fn flat_i64(value: &Value) -> Option<Vec<i64>> {
    leaves(value).into_iter().map(Value::as_i64).collect()
}

/// A 1D or 2D numeric array as rows. A 1D array is a single row; a scalar
/// is a 1×1 matrix.
pub fn rows_f64(value: &Value) -> Option<Vec<Vec<f64>>> {
    match value {
        Value::Array(items) if items.iter().all(Value::is_array) && !items.is_empty() => {
            items.iter().map(flat_row_f64).collect()
        }
        other => flat_row_f64(other).map(|row| vec![row]),
    }
}

fn flat_row_f64(value: &Value) -> Option<Vec<f64>> {
    match value {
        Value::Array(items) => items.iter().map(Value::as_f64).collect(),
        other => other.as_f64().map(|v| vec![v]),
    }
}

/// Integer counterpart of [`rows_f64`].
pub fn rows_i64(value: &Value) -> Option<Vec<Vec<i64>>> {
    match value {
        Value::Array(items) if items.iter().all(Value::is_array) && !items.is_empty() => {
            items.iter().map(flat_row_i64).collect()
        }
        other => flat_row_i64(other).map(|row| vec![row]),
    }
}

fn flat_row_i64(value: &Value) -> Option<Vec<i64>> {
    match value {
        Value::Array(items) => items.iter().map(Value::as_i64).collect(),
        other => other.as_i64().map(|v| vec![v]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn attributes_in_list_and_map_form() {
        let listed = json!({"attributes": [{"name": "NX_class", "values": "NXdetector"}]});
        let mapped = json!({"attributes": {"NX_class": "NXdetector"}});
        assert_eq!(nx_class(&listed), Some("NXdetector"));
        assert_eq!(nx_class(&mapped), Some("NXdetector"));
        assert_eq!(nx_class(&json!({"name": "x"})), None);
    }

    #[test]
    fn array_shape_detects_ragged_arrays() {
        assert_eq!(array_shape(&json!([[1, 2], [3, 4], [5, 6]])), Some(vec![3, 2]));
        assert_eq!(array_shape(&json!(4.0)), Some(vec![]));
        assert_eq!(array_shape(&json!([[1, 2], [3]])), None);
    }

    #[test]
    fn scalars_accept_single_element_arrays() {
        assert_eq!(scalar_f64(&json!(2.5)), Some(2.5));
        assert_eq!(scalar_f64(&json!([2.5])), Some(2.5));
        assert_eq!(scalar_f64(&json!([1.0, 2.0])), None);
        assert_eq!(scalar_i64(&json!([[7]])), Some(7));
    }

    #[test]
    fn rows_treat_vectors_as_one_row() {
        assert_eq!(rows_i64(&json!([1, 2, 3])), Some(vec![vec![1, 2, 3]]));
        assert_eq!(
            rows_f64(&json!([[0.0, 1.0], [2.0, 3.0]])),
            Some(vec![vec![0.0, 1.0], vec![2.0, 3.0]])
        );
        assert_eq!(rows_i64(&json!([[1, 2], "x"])), None);
    }

    #[test]
    fn child_string_reads_dataset_values() {
        let children = vec![json!({"name": "depends_on", "type": "dataset", "values": "/entry/a/b"})];
        assert_eq!(child_string(&children, "depends_on").as_deref(), Some("/entry/a/b"));
        assert_eq!(child_string(&children, "description"), None);
    }
}
