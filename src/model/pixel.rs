//! Detector pixel addressing schemes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a component's pixels are given detector ids.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PixelData {
    /// A regular rows×columns repetition of the component's shape.
    Grid(PixelGrid),
    /// Detector ids assigned to individual faces of the component's mesh.
    Mapping(PixelMapping),
    /// The whole component is one pixel (monitors).
    SingleId { id: i64 },
    #[default]
    None,
}

impl PixelData {
    pub fn is_none(&self) -> bool {
        matches!(self, PixelData::None)
    }

    /// Name of the group the component's geometry is stored in.
    ///
    /// Detectors with a repeating shape keep it in `pixel_shape`. Mapped
    /// detectors and single-id components such as monitors use
    /// `detector_shape`, the group a single `detector_id` is stored beside.
    /// Everything else uses `shape`, since reading a `pixel_shape` group
    /// expects pixel offset arrays.
    pub fn shape_group_name(&self) -> &'static str {
        match self {
            PixelData::Grid(_) => "pixel_shape",
            PixelData::Mapping(_) | PixelData::SingleId { .. } => "detector_shape",
            PixelData::None => "shape",
        }
    }
}

/// The axis along which consecutive detector ids run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CountDirection {
    Row,
    Column,
}

/// The grid corner holding the first detector id.
///
/// Row 0 of the offset matrices is the bottom row; column 0 is the left column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Corner {
    BottomLeft,
    BottomRight,
    TopLeft,
    TopRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::BottomLeft,
        Corner::BottomRight,
        Corner::TopLeft,
        Corner::TopRight,
    ];

    pub fn is_bottom(self) -> bool {
        matches!(self, Corner::BottomLeft | Corner::BottomRight)
    }

    pub fn is_left(self) -> bool {
        matches!(self, Corner::BottomLeft | Corner::TopLeft)
    }
}

/// A compact description of a regular pixel grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PixelGrid {
    pub rows: usize,
    pub columns: usize,
    pub row_height: f64,
    pub col_width: f64,
    pub first_id: i64,
    pub count_direction: CountDirection,
    pub initial_count_corner: Corner,
}

impl Default for PixelGrid {
    fn default() -> Self {
        Self {
            rows: 1,
            columns: 1,
            row_height: 1.0,
            col_width: 1.0,
            first_id: 0,
            count_direction: CountDirection::Row,
            initial_count_corner: Corner::BottomLeft,
        }
    }
}

/// Sparse face index → detector id assignment. Faces without an entry have no detector.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PixelMapping {
    pub ids: BTreeMap<usize, i64>,
}

impl PixelMapping {
    pub fn new(ids: BTreeMap<usize, i64>) -> Self {
        Self { ids }
    }

    /// The detector id of a face, if it has one.
    pub fn detector_id(&self, face: usize) -> Option<i64> {
        self.ids.get(&face).copied()
    }

    /// Dense per-face listing for a mesh with `faces` faces.
    pub fn to_dense(&self, faces: usize) -> Vec<Option<i64>> {
        (0..faces).map(|face| self.detector_id(face)).collect()
    }
}

impl FromIterator<(usize, i64)> for PixelMapping {
    fn from_iter<I: IntoIterator<Item = (usize, i64)>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_group_name_follows_pixel_kind() {
        assert_eq!(PixelData::None.shape_group_name(), "shape");
        assert_eq!(
            PixelData::Grid(PixelGrid::default()).shape_group_name(),
            "pixel_shape"
        );
        assert_eq!(
            PixelData::SingleId { id: 3 }.shape_group_name(),
            "detector_shape"
        );
    }

    #[test]
    fn dense_mapping_leaves_gaps() {
        let mapping: PixelMapping = [(0, 10), (2, 12)].into_iter().collect();
        assert_eq!(mapping.to_dense(4), vec![Some(10), None, Some(12), None]);
    }
}
