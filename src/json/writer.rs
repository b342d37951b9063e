//! Generic NeXus tree and its JSON rendering.
//!
//! [`Group`], [`Dataset`] and [`Attribute`] describe a NeXus file without
//! reference to instruments; [`super::encode`] builds one from an
//! [`crate::model::Instrument`]. [`NexusJsonWriter`] then renders the tree in
//! the layout the file-writer consumes, optionally replacing whole groups by
//! stream or link placeholders and truncating large arrays.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use super::node;

/// Array dimensions longer than this are clipped when truncation is on.
pub const DEFAULT_TRUNCATION: usize = 10;

/// Classes that are not written as an `NX_class` attribute.
const IMPLICIT_CLASSES: [&str; 2] = ["NXfield", "NXgroup"];

/// An attribute of a group or dataset.
#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub values: Value,
    /// Element type; omitted when the values speak for themselves.
    pub dtype: Option<String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, values: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            values: values.into(),
            dtype: None,
        }
    }

    pub fn with_dtype(mut self, dtype: impl Into<String>) -> Self {
        self.dtype = Some(dtype.into());
        self
    }
}

/// A dataset: typed values plus attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    pub name: String,
    pub dtype: String,
    pub values: Value,
    pub attributes: Vec<Attribute>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, dtype: impl Into<String>, values: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            dtype: dtype.into(),
            values: values.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// A child of a group.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Group(Group),
    Dataset(Dataset),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Group(group) => &group.name,
            Node::Dataset(dataset) => &dataset.name,
        }
    }
}

impl From<Group> for Node {
    fn from(group: Group) -> Self {
        Node::Group(group)
    }
}

impl From<Dataset> for Node {
    fn from(dataset: Dataset) -> Self {
        Node::Dataset(dataset)
    }
}

/// A group with an optional NeXus class.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Group {
    pub name: String,
    pub nx_class: Option<String>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Group {
    pub fn new(name: impl Into<String>, nx_class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nx_class: Some(nx_class.into()),
            ..Self::default()
        }
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn push(&mut self, child: impl Into<Node>) {
        self.children.push(child.into());
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Finds a direct child group by name.
    pub fn group(&self, name: &str) -> Option<&Group> {
        self.children.iter().find_map(|child| match child {
            Node::Group(group) if group.name == name => Some(group),
            _ => None,
        })
    }

    /// Finds a direct child dataset by name.
    pub fn dataset(&self, name: &str) -> Option<&Dataset> {
        self.children.iter().find_map(|child| match child {
            Node::Dataset(dataset) if dataset.name == name => Some(dataset),
            _ => None,
        })
    }
}

/// Where a link placeholder points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkTarget {
    pub name: String,
    pub target: String,
}

/// Renders a [`Group`] tree as NeXus JSON.
///
/// Streams and links are keyed by the absolute path of the group they
/// replace, e.g. `/entry/instrument/detector`. A replaced group keeps its
/// name and attributes; its children become the single placeholder.
#[derive(Clone, Debug, Default)]
pub struct NexusJsonWriter {
    pub truncate: Option<usize>,
    pub streams: BTreeMap<String, Value>,
    pub links: BTreeMap<String, LinkTarget>,
}

impl NexusJsonWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clips every array dimension to `threshold` elements.
    pub fn with_truncation(mut self, threshold: usize) -> Self {
        self.truncate = Some(threshold);
        self
    }

    pub fn add_stream(&mut self, path: impl Into<String>, stream: Value) {
        self.streams.insert(path.into(), stream);
    }

    pub fn add_link(
        &mut self,
        path: impl Into<String>,
        name: impl Into<String>,
        target: impl Into<String>,
    ) {
        self.links.insert(
            path.into(),
            LinkTarget {
                name: name.into(),
                target: target.into(),
            },
        );
    }

    /// The `nexus_structure` value for a tree rooted at `root`.
    pub fn structure(&self, root: &Group) -> Value {
        json!({ "children": [self.group(root, "")] })
    }

    fn group(&self, group: &Group, parent_path: &str) -> Value {
        let path = format!("{parent_path}/{}", group.name);

        let children: Vec<Value> = if let Some(stream) = self.streams.get(&path) {
            vec![json!({"type": "stream", "stream": stream})]
        } else if let Some(link) = self.links.get(&path) {
            vec![json!({"type": "link", "name": link.name, "target": link.target})]
        } else {
            group
                .children
                .iter()
                .map(|child| match child {
                    Node::Group(child) => self.group(child, &path),
                    Node::Dataset(dataset) => self.dataset(dataset),
                })
                .collect()
        };

        let mut attributes = Vec::with_capacity(group.attributes.len() + 1);
        if let Some(class) = group
            .nx_class
            .as_deref()
            .filter(|class| !IMPLICIT_CLASSES.contains(class))
        {
            attributes.push(json!({"name": node::NX_CLASS, "values": class}));
        }
        attributes.extend(group.attributes.iter().map(|a| self.attribute(a)));

        let mut object = Map::new();
        object.insert("type".into(), json!(node::GROUP));
        object.insert("name".into(), json!(group.name));
        object.insert("children".into(), Value::Array(children));
        if !attributes.is_empty() {
            object.insert("attributes".into(), Value::Array(attributes));
        }
        Value::Object(object)
    }

    fn dataset(&self, dataset: &Dataset) -> Value {
        let values = self.clip(&dataset.values);

        let mut block = Map::new();
        block.insert("type".into(), json!(dataset.dtype));
        if values.is_array() {
            if let Some(size) = node::array_shape(&values) {
                block.insert("size".into(), json!(size));
            }
        }

        let mut object = Map::new();
        object.insert("type".into(), json!(node::DATASET));
        object.insert("name".into(), json!(dataset.name));
        object.insert("dataset".into(), Value::Object(block));
        object.insert("values".into(), values);
        if !dataset.attributes.is_empty() {
            let attributes = dataset.attributes.iter().map(|a| self.attribute(a)).collect();
            object.insert("attributes".into(), Value::Array(attributes));
        }
        Value::Object(object)
    }

    fn attribute(&self, attribute: &Attribute) -> Value {
        let mut object = Map::new();
        object.insert("name".into(), json!(attribute.name));
        object.insert("values".into(), self.clip(&attribute.values));
        if let Some(dtype) = &attribute.dtype {
            object.insert("type".into(), json!(dtype));
        }
        Value::Object(object)
    }

    fn clip(&self, values: &Value) -> Value {
        match self.truncate {
            Some(threshold) => truncate_values(values, threshold),
            None => values.clone(),
        }
    }
}

/// Keeps the first `threshold` elements along every array dimension.
pub fn truncate_values(values: &Value, threshold: usize) -> Value {
    match values {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .take(threshold)
                .map(|item| truncate_values(item, threshold))
                .collect(),
        ),
        other => other.clone(),
    }
}
