//! Coordinate transformations and the references between them.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::vector::Vector3;

/// The two kinds of NeXus transformation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformationKind {
    /// Translation along `vector` by a length.
    Translation,
    /// Rotation about `vector` by an angle.
    Rotation,
}

impl TransformationKind {
    /// The `transformation_type` attribute value for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            TransformationKind::Translation => "translation",
            TransformationKind::Rotation => "rotation",
        }
    }

    /// Parses a `transformation_type` attribute value. Matching is exact.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "translation" => Some(TransformationKind::Translation),
            "rotation" => Some(TransformationKind::Rotation),
            _ => None,
        }
    }
}

impl fmt::Display for TransformationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-owning reference to a transformation, by component and transformation name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransformRef {
    pub component: String,
    pub transformation: String,
}

impl TransformRef {
    pub fn new(component: impl Into<String>, transformation: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            transformation: transformation.into(),
        }
    }
}

impl fmt::Display for TransformRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.component, self.transformation)
    }
}

/// A single translation or rotation in a component's transformation chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transformation {
    /// Name, unique within the owning component.
    pub name: String,

    pub kind: TransformationKind,

    /// Distance for a translation, angle for a rotation.
    pub value: f64,

    /// Physical unit of `value`.
    pub units: String,

    /// Direction of the translation or rotation axis.
    pub vector: Vector3,

    /// The next transformation in the chain; `None` is the terminal `.`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<TransformRef>,
}

impl Transformation {
    /// Creates a new transformation with no dependency.
    pub fn new(
        name: impl Into<String>,
        kind: TransformationKind,
        value: f64,
        units: impl Into<String>,
        vector: Vector3,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            value,
            units: units.into(),
            vector,
            depends_on: None,
        }
    }

    /// Creates a translation.
    pub fn translation(
        name: impl Into<String>,
        distance: f64,
        units: impl Into<String>,
        vector: Vector3,
    ) -> Self {
        Self::new(name, TransformationKind::Translation, distance, units, vector)
    }

    /// Creates a rotation.
    pub fn rotation(
        name: impl Into<String>,
        angle: f64,
        units: impl Into<String>,
        axis: Vector3,
    ) -> Self {
        Self::new(name, TransformationKind::Rotation, angle, units, axis)
    }

    /// Sets the transformation this one depends on.
    pub fn with_depends_on(mut self, target: TransformRef) -> Self {
        self.depends_on = Some(target);
        self
    }
}
