//! Component shapes: OFF meshes and cylinders.

use serde::{Deserialize, Serialize};

use super::vector::Vector3;

/// Vertex indices of the single cylinder in a [`CylindricalGeometry`].
pub const CYLINDER_INDICES: [usize; 3] = [0, 1, 2];

/// The shape of a component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Geometry {
    Off(OffGeometry),
    Cylindrical(CylindricalGeometry),
}

impl Geometry {
    /// The NeXus class of the group this geometry is stored in.
    pub fn nx_class(&self) -> &'static str {
        match self {
            Geometry::Off(_) => OffGeometry::NX_CLASS,
            Geometry::Cylindrical(_) => CylindricalGeometry::NX_CLASS,
        }
    }

    /// Units of the geometry's vertex coordinates.
    pub fn units(&self) -> &str {
        match self {
            Geometry::Off(off) => &off.units,
            Geometry::Cylindrical(cylinder) => &cylinder.units,
        }
    }

    /// Number of faces; a cylinder counts as one.
    pub fn face_count(&self) -> usize {
        match self {
            Geometry::Off(off) => off.face_count(),
            Geometry::Cylindrical(_) => 1,
        }
    }
}

/// A polygon mesh in Object File Format layout.
///
/// Faces are stored flattened: `winding_order` lists vertex indices for all
/// faces back to back, and `winding_order_indices[i]` is where face `i`
/// starts in it. The last face runs to the end of `winding_order`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OffGeometry {
    pub vertices: Vec<Vector3>,
    pub winding_order: Vec<usize>,
    pub winding_order_indices: Vec<usize>,
    pub units: String,
}

impl OffGeometry {
    pub const NX_CLASS: &'static str = "NXoff_geometry";

    /// Builds a mesh from per-face vertex index lists.
    pub fn from_faces(
        vertices: Vec<Vector3>,
        faces: &[Vec<usize>],
        units: impl Into<String>,
    ) -> Self {
        let mut winding_order = Vec::with_capacity(faces.iter().map(Vec::len).sum());
        let mut winding_order_indices = Vec::with_capacity(faces.len());
        for face in faces {
            winding_order_indices.push(winding_order.len());
            winding_order.extend_from_slice(face);
        }
        Self {
            vertices,
            winding_order,
            winding_order_indices,
            units: units.into(),
        }
    }

    /// Returns the vertex index list of each face.
    ///
    /// Offsets past the end of the winding order yield empty faces rather
    /// than panicking; [`crate::validation::validate_instrument`] reports them.
    pub fn faces(&self) -> Vec<Vec<usize>> {
        let len = self.winding_order.len();
        self.winding_order_indices
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let end = self
                    .winding_order_indices
                    .get(i + 1)
                    .copied()
                    .unwrap_or(len)
                    .min(len);
                let start = start.min(end);
                self.winding_order[start..end].to_vec()
            })
            .collect()
    }

    pub fn face_count(&self) -> usize {
        self.winding_order_indices.len()
    }
}

/// A single cylinder described by three points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CylindricalGeometry {
    pub base_center: Vector3,
    pub base_edge: Vector3,
    pub top_center: Vector3,
    pub units: String,
}

impl CylindricalGeometry {
    pub const NX_CLASS: &'static str = "NXcylindrical_geometry";

    pub fn new(
        base_center: Vector3,
        base_edge: Vector3,
        top_center: Vector3,
        units: impl Into<String>,
    ) -> Self {
        Self {
            base_center,
            base_edge,
            top_center,
            units: units.into(),
        }
    }

    /// Builds a cylinder along `axis` with the base centred at the origin.
    pub fn from_axis(axis: Vector3, height: f64, radius: f64, units: impl Into<String>) -> Self {
        let direction = axis.normalized().unwrap_or(Vector3::new(0.0, 0.0, 1.0));
        // Any vector not parallel to the axis gives a perpendicular via cross product.
        let helper = if direction.x.abs() < 0.9 {
            Vector3::new(1.0, 0.0, 0.0)
        } else {
            Vector3::new(0.0, 1.0, 0.0)
        };
        let perpendicular = direction.cross(helper).normalized().unwrap_or(helper);
        Self::new(
            Vector3::default(),
            perpendicular.scaled(radius),
            direction.scaled(height),
            units,
        )
    }

    /// The three vertices in `[base_center, base_edge, top_center]` order.
    pub fn vertices(&self) -> [Vector3; 3] {
        [self.base_center, self.base_edge, self.top_center]
    }

    pub fn radius(&self) -> f64 {
        (self.base_edge - self.base_center).magnitude()
    }

    pub fn height(&self) -> f64 {
        (self.top_center - self.base_center).magnitude()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_pyramid() -> OffGeometry {
        OffGeometry::from_faces(
            vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(1.0, 1.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
                Vector3::new(0.5, 0.5, 1.0),
            ],
            &[
                vec![0, 1, 2, 3],
                vec![0, 1, 4],
                vec![1, 2, 4],
                vec![2, 3, 4],
                vec![3, 0, 4],
            ],
            "m",
        )
    }

    #[test]
    fn from_faces_flattens_winding_order() {
        let pyramid = square_pyramid();
        assert_eq!(pyramid.winding_order_indices, vec![0, 4, 7, 10, 13]);
        assert_eq!(pyramid.winding_order.len(), 16);
        assert_eq!(pyramid.face_count(), 5);
    }

    #[test]
    fn faces_unwinds_mixed_face_sizes() {
        let pyramid = square_pyramid();
        let faces = pyramid.faces();
        assert_eq!(faces[0], vec![0, 1, 2, 3]);
        assert_eq!(faces[4], vec![3, 0, 4]);
    }

    #[test]
    fn faces_tolerates_out_of_range_offsets() {
        let broken = OffGeometry {
            vertices: vec![],
            winding_order: vec![0, 1, 2],
            winding_order_indices: vec![0, 10],
            units: "m".into(),
        };
        assert_eq!(broken.faces(), vec![vec![0, 1, 2], vec![]]);
    }

    #[test]
    fn cylinder_from_axis_has_requested_dimensions() {
        let cylinder = CylindricalGeometry::from_axis(Vector3::new(0.0, 0.0, 2.0), 3.0, 0.5, "m");
        assert!((cylinder.height() - 3.0).abs() < 1e-12);
        assert!((cylinder.radius() - 0.5).abs() < 1e-12);
    }
}
