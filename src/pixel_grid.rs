//! Conversion between raw per-pixel arrays and compact pixel descriptions.
//!
//! A detector stored with a `pixel_shape` carries four rows×columns matrices:
//! x/y/z pixel offsets and detector ids. [`decode_pixel_grid`] infers the
//! [`PixelGrid`] parameters from them; [`encode_pixel_grid`] regenerates the
//! matrices from a grid when writing.
//!
//! Matrices are row-major with row 0 at the bottom and column 0 on the left,
//! so `ids[0][0]` is the bottom-left pixel.

use tracing::debug;

use crate::error::NexusError;
use crate::model::{Corner, CountDirection, PixelGrid, PixelMapping};

/// The four matrices describing a pixel grid, as stored in the file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PixelGridArrays {
    pub x_offsets: Vec<Vec<f64>>,
    pub y_offsets: Vec<Vec<f64>>,
    pub z_offsets: Vec<Vec<f64>>,
    pub detector_ids: Vec<Vec<i64>>,
}

impl PixelGridArrays {
    /// Infers the grid these arrays describe.
    pub fn decode(&self) -> Result<PixelGrid, NexusError> {
        decode_pixel_grid(
            &self.x_offsets,
            &self.y_offsets,
            &self.z_offsets,
            &self.detector_ids,
        )
    }
}

fn check_shape<T>(name: &str, matrix: &[Vec<T>], rows: usize, columns: usize) -> Result<(), NexusError> {
    if matrix.len() != rows {
        return Err(NexusError::PixelGridShape(format!(
            "{name} has {} rows, expected {rows}",
            matrix.len()
        )));
    }
    if let Some((index, row)) = matrix.iter().enumerate().find(|(_, row)| row.len() != columns) {
        return Err(NexusError::PixelGridShape(format!(
            "{name} row {index} has {} columns, expected {columns}",
            row.len()
        )));
    }
    Ok(())
}

/// Infers grid parameters from offset and id matrices of identical shape.
///
/// Spacing is taken from the first two rows and columns (1 for a single
/// row or column). The corner with the smallest detector id becomes the
/// initial count corner; when corners share the minimal id, the last of
/// bottom-left, bottom-right, top-left, top-right wins. If the id next to
/// that corner along the column axis is `first_id + 1` counting runs up
/// columns, otherwise along rows.
pub fn decode_pixel_grid(
    x_offsets: &[Vec<f64>],
    y_offsets: &[Vec<f64>],
    z_offsets: &[Vec<f64>],
    detector_ids: &[Vec<i64>],
) -> Result<PixelGrid, NexusError> {
    let rows = detector_ids.len();
    let columns = detector_ids.first().map_or(0, Vec::len);
    if rows == 0 || columns == 0 {
        return Err(NexusError::PixelGridShape(
            "detector_number is empty".to_string(),
        ));
    }
    check_shape("detector_number", detector_ids, rows, columns)?;
    check_shape("x_pixel_offset", x_offsets, rows, columns)?;
    check_shape("y_pixel_offset", y_offsets, rows, columns)?;
    check_shape("z_pixel_offset", z_offsets, rows, columns)?;

    let row_height = if rows > 1 {
        y_offsets[1][0] - y_offsets[0][0]
    } else {
        1.0
    };
    let col_width = if columns > 1 {
        x_offsets[0][1] - x_offsets[0][0]
    } else {
        1.0
    };

    let corner_id = |corner: Corner| {
        let row = if corner.is_bottom() { 0 } else { rows - 1 };
        let column = if corner.is_left() { 0 } else { columns - 1 };
        detector_ids[row][column]
    };

    let mut first_id = corner_id(Corner::BottomLeft);
    let mut initial_count_corner = Corner::BottomLeft;
    for corner in Corner::ALL {
        let id = corner_id(corner);
        if id <= first_id {
            first_id = id;
            initial_count_corner = corner;
        }
    }

    let count_direction = if rows > 1 && columns > 1 {
        let neighbour_row = if initial_count_corner.is_bottom() { 1 } else { rows - 2 };
        let column = if initial_count_corner.is_left() { 0 } else { columns - 1 };
        if first_id.checked_add(1) == Some(detector_ids[neighbour_row][column]) {
            CountDirection::Column
        } else {
            CountDirection::Row
        }
    } else {
        CountDirection::Row
    };

    debug!(
        rows,
        columns,
        first_id,
        ?initial_count_corner,
        ?count_direction,
        "decoded pixel grid"
    );

    Ok(PixelGrid {
        rows,
        columns,
        row_height,
        col_width,
        first_id,
        count_direction,
        initial_count_corner,
    })
}

/// Detector id of the pixel at (`row`, `column`), counting from the bottom left.
///
/// Ids past `i64::MAX` saturate.
pub fn grid_detector_id(grid: &PixelGrid, row: usize, column: usize) -> i64 {
    let corner = grid.initial_count_corner;
    let r = if corner.is_bottom() { row } else { grid.rows - 1 - row };
    let c = if corner.is_left() { column } else { grid.columns - 1 - column };
    let steps = match grid.count_direction {
        CountDirection::Row => r * grid.columns + c,
        CountDirection::Column => c * grid.rows + r,
    };
    i64::try_from(steps).map_or(i64::MAX, |steps| grid.first_id.saturating_add(steps))
}

/// Regenerates the offset and id matrices for a grid.
///
/// Offsets start at zero in the bottom-left pixel; z offsets are all zero.
pub fn encode_pixel_grid(grid: &PixelGrid) -> PixelGridArrays {
    let matrix = |f: &dyn Fn(usize, usize) -> f64| -> Vec<Vec<f64>> {
        (0..grid.rows)
            .map(|row| (0..grid.columns).map(|column| f(row, column)).collect())
            .collect()
    };

    PixelGridArrays {
        x_offsets: matrix(&|_, column| column as f64 * grid.col_width),
        y_offsets: matrix(&|row, _| row as f64 * grid.row_height),
        z_offsets: matrix(&|_, _| 0.0),
        detector_ids: (0..grid.rows)
            .map(|row| {
                (0..grid.columns)
                    .map(|column| grid_detector_id(grid, row, column))
                    .collect()
            })
            .collect(),
    }
}

/// Relative tolerance for offsets compared against a regular grid.
const OFFSET_TOLERANCE: f64 = 1e-9;

fn offsets_match(found: f64, expected: f64) -> bool {
    (found - expected).abs() <= OFFSET_TOLERANCE * found.abs().max(expected.abs()).max(1.0)
}

fn first_offset_mismatch(
    name: &str,
    found: &[Vec<f64>],
    expected: &[Vec<f64>],
) -> Result<(), String> {
    for (row, (found, expected)) in found.iter().zip(expected).enumerate() {
        for (column, (&found, &expected)) in found.iter().zip(expected).enumerate() {
            if !offsets_match(found, expected) {
                return Err(format!(
                    "{name}[{row}][{column}] is {found}, a regular grid has {expected}"
                ));
            }
        }
    }
    Ok(())
}

/// Checks that `arrays` are exactly what `grid` regenerates.
///
/// Decoding only looks at the corners and the first spacing, so arrays
/// with irregular ids or offsets still decode. Such a grid would be
/// written back differently; this reports the first element that differs.
/// Ids must match exactly, offsets within a relative tolerance.
pub fn check_regular_grid(grid: &PixelGrid, arrays: &PixelGridArrays) -> Result<(), String> {
    let expected = encode_pixel_grid(grid);

    for (row, (found, expected)) in arrays
        .detector_ids
        .iter()
        .zip(&expected.detector_ids)
        .enumerate()
    {
        if let Some((column, (found, expected))) = found
            .iter()
            .zip(expected)
            .enumerate()
            .find(|(_, (found, expected))| found != expected)
        {
            return Err(format!(
                "detector_number[{row}][{column}] is {found}, a regular grid has {expected}"
            ));
        }
    }

    first_offset_mismatch("x_pixel_offset", &arrays.x_offsets, &expected.x_offsets)?;
    first_offset_mismatch("y_pixel_offset", &arrays.y_offsets, &expected.y_offsets)?;
    first_offset_mismatch("z_pixel_offset", &arrays.z_offsets, &expected.z_offsets)
}

// ============================================================================
// Pixel mappings
// ============================================================================

/// Builds a mapping from `detector_faces` `[face, detector id]` pairs.
///
/// A face listed twice keeps its last id. Negative face indices are rejected.
pub fn unmap_pixel_ids(pairs: &[[i64; 2]]) -> Result<PixelMapping, String> {
    pairs
        .iter()
        .map(|&[face, id]| {
            usize::try_from(face)
                .map(|face| (face, id))
                .map_err(|_| format!("face index {face} is negative"))
        })
        .collect()
}

/// The `[face, detector id]` pairs written to `detector_faces`, in face order.
pub fn pixel_mapping_pairs(mapping: &PixelMapping) -> Vec<[i64; 2]> {
    mapping
        .ids
        .iter()
        .map(|(&face, &id)| [face as i64, id])
        .collect()
}
