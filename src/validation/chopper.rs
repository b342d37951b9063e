//! Consistency checks for disk chopper fields.
//!
//! A `NXdisk_chopper` group describes its disk with four datasets: `slits`,
//! `slit_edges` (angles of the opening and closing edge of each slit),
//! `radius` and `slit_height`. [`ChopperInput::validate`] checks their units
//! and converts them to radians and metres, then [`check_chopper`] checks
//! the resulting disk makes sense.

use thiserror::Error;

use crate::units::{validate_units, Dimension, UnitCheckFailure};

pub const SLITS_NAME: &str = "slits";
pub const SLIT_EDGES_NAME: &str = "slit_edges";
pub const RADIUS_NAME: &str = "radius";
pub const SLIT_HEIGHT_NAME: &str = "slit_height";

/// Why a set of chopper fields does not describe a usable chopper.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ChopperIssue {
    #[error("Unable to create chopper geometry - Required field(s) missing: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Unable to create chopper geometry - Units are missing from field(s): {}", .0.join(", "))]
    MissingUnits(Vec<&'static str>),

    #[error("Unable to create chopper geometry - Wrong {field} type. Expected {expected}.")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("Unable to create chopper geometry - Units for {field}: {failure}")]
    Units {
        field: &'static str,
        failure: UnitCheckFailure,
    },

    #[error("Unable to create chopper geometry - Expected slit edges array to be 1D but it has shape {rows}x{columns}.")]
    EdgesNotOneDimensional { rows: usize, columns: usize },

    #[error("Unable to create chopper geometry - Size of slit edges array should be twice the number of slits. Instead there are {slits} slits and {edges} slit edges.")]
    EdgeCount { slits: usize, edges: usize },

    #[error("Unable to create chopper geometry - Slit height should be smaller than radius. Instead slit height is {slit_height} metres and radius is {radius} metres.")]
    SlitHeightNotBelowRadius { slit_height: f64, radius: f64 },

    #[error("Unable to create chopper geometry - Slit edges array is not sorted. Found values: {0:?}")]
    EdgesNotSorted(Vec<f64>),

    #[error("Unable to create chopper geometry - Angles in slit edges array should be unique. Found values: {0:?}")]
    RepeatedEdges(Vec<f64>),

    #[error("Unable to create chopper geometry - Slit edges contains overlapping slits. Found values: {0:?}")]
    OverlappingSlits(Vec<f64>),
}

/// Chopper fields as read from a document, before any checking.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChopperInput {
    pub slits: Option<i64>,
    /// Slit edges as rows; a 1D array is a single row.
    pub slit_edges: Option<Vec<Vec<f64>>>,
    pub radius: Option<f64>,
    pub slit_height: Option<f64>,
    pub slit_edges_units: Option<String>,
    pub radius_units: Option<String>,
    pub slit_height_units: Option<String>,
}

/// A checked chopper with edges in radians and lengths in metres.
#[derive(Clone, Debug, PartialEq)]
pub struct ChopperDetails {
    pub slits: usize,
    /// Edge angles in radians, wrapped into `[0, 2π)`.
    pub slit_edges: Vec<f64>,
    pub radius: f64,
    pub slit_height: f64,
}

impl ChopperInput {
    /// Checks presence, types and units of every field, then the disk itself.
    pub fn validate(&self) -> Result<ChopperDetails, ChopperIssue> {
        let (Some(slits), Some(edge_rows), Some(radius), Some(slit_height)) = (
            self.slits,
            self.slit_edges.as_ref(),
            self.radius,
            self.slit_height,
        ) else {
            let missing = [
                (SLITS_NAME, self.slits.is_none()),
                (SLIT_EDGES_NAME, self.slit_edges.is_none()),
                (RADIUS_NAME, self.radius.is_none()),
                (SLIT_HEIGHT_NAME, self.slit_height.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();
            return Err(ChopperIssue::MissingFields(missing));
        };

        let (Some(edges_units), Some(radius_units), Some(height_units)) = (
            self.slit_edges_units.as_deref(),
            self.radius_units.as_deref(),
            self.slit_height_units.as_deref(),
        ) else {
            let missing = [
                (RADIUS_NAME, self.radius_units.is_none()),
                (SLIT_EDGES_NAME, self.slit_edges_units.is_none()),
                (SLIT_HEIGHT_NAME, self.slit_height_units.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();
            return Err(ChopperIssue::MissingUnits(missing));
        };

        let slits = usize::try_from(slits).map_err(|_| ChopperIssue::WrongType {
            field: SLITS_NAME,
            expected: "non-negative int",
        })?;

        let check = |field, units: &str, dimension| {
            validate_units(units, dimension).map_err(|failure| ChopperIssue::Units { field, failure })
        };
        let radius_unit = check(RADIUS_NAME, radius_units, Dimension::Length)?;
        let edges_unit = check(SLIT_EDGES_NAME, edges_units, Dimension::Angle)?;
        let height_unit = check(SLIT_HEIGHT_NAME, height_units, Dimension::Length)?;

        let raw_edges = flatten_edges(edge_rows)?;
        let details = ChopperDetails {
            slits,
            slit_edges: raw_edges
                .iter()
                .map(|&edge| edges_unit.to_si(edge).rem_euclid(std::f64::consts::TAU))
                .collect(),
            radius: radius_unit.to_si(radius),
            slit_height: height_unit.to_si(slit_height),
        };

        check_chopper(&details, &raw_edges)?;
        Ok(details)
    }
}

/// Accepts a single row or a single column.
fn flatten_edges(rows: &[Vec<f64>]) -> Result<Vec<f64>, ChopperIssue> {
    let columns = rows.first().map_or(0, Vec::len);
    if rows.len() <= 1 {
        return Ok(rows.first().cloned().unwrap_or_default());
    }
    if rows.iter().all(|row| row.len() == 1) {
        return Ok(rows.iter().map(|row| row[0]).collect());
    }
    Err(ChopperIssue::EdgesNotOneDimensional {
        rows: rows.len(),
        columns,
    })
}

/// Checks a converted chopper against the edges as they were written.
///
/// In order: twice as many edges as slits, slit height below the radius,
/// raw edges sorted, raw edges unique, and first and last edge not
/// overlapping. The overlap test only compares the first and last converted
/// edge, and only when wrapping into one revolution has unsorted them.
pub fn check_chopper(details: &ChopperDetails, raw_edges: &[f64]) -> Result<(), ChopperIssue> {
    if details.slit_edges.len() != 2 * details.slits {
        return Err(ChopperIssue::EdgeCount {
            slits: details.slits,
            edges: details.slit_edges.len(),
        });
    }

    if details.slit_height >= details.radius {
        return Err(ChopperIssue::SlitHeightNotBelowRadius {
            slit_height: details.slit_height,
            radius: details.radius,
        });
    }

    if raw_edges.windows(2).any(|pair| pair[1] < pair[0]) {
        return Err(ChopperIssue::EdgesNotSorted(raw_edges.to_vec()));
    }

    // Sorted, so repeats are adjacent.
    if raw_edges.windows(2).any(|pair| pair[1] == pair[0]) {
        return Err(ChopperIssue::RepeatedEdges(raw_edges.to_vec()));
    }

    let edges = &details.slit_edges;
    let sorted = edges.windows(2).all(|pair| pair[0] <= pair[1]);
    if let (Some(first), Some(last)) = (edges.first(), edges.last()) {
        if !sorted && last >= first {
            return Err(ChopperIssue::OverlappingSlits(raw_edges.to_vec()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(slits: i64, edges: Vec<f64>) -> ChopperInput {
        ChopperInput {
            slits: Some(slits),
            slit_edges: Some(vec![edges]),
            radius: Some(350.0),
            slit_height: Some(70.0),
            slit_edges_units: Some("deg".into()),
            radius_units: Some("mm".into()),
            slit_height_units: Some("mm".into()),
        }
    }

    #[test]
    fn two_edges_for_one_slit_passes() {
        let details = input(1, vec![0.0, 23.0]).validate().unwrap();
        assert_eq!(details.slits, 1);
        assert!((details.radius - 0.35).abs() < 1e-12);
        assert!((details.slit_edges[1] - 23f64.to_radians()).abs() < 1e-12);
    }

    #[test]
    fn three_edges_for_one_slit_fails_count_check() {
        assert_eq!(
            input(1, vec![0.0, 23.0, 50.0]).validate(),
            Err(ChopperIssue::EdgeCount { slits: 1, edges: 3 })
        );
    }

    #[test]
    fn slit_height_must_be_below_radius() {
        let mut tall = input(1, vec![0.0, 23.0]);
        tall.slit_height = Some(400.0);
        assert!(matches!(
            tall.validate(),
            Err(ChopperIssue::SlitHeightNotBelowRadius { .. })
        ));
    }

    #[test]
    fn unsorted_and_repeated_edges_fail() {
        assert!(matches!(
            input(1, vec![23.0, 0.0]).validate(),
            Err(ChopperIssue::EdgesNotSorted(_))
        ));
        assert!(matches!(
            input(1, vec![23.0, 23.0]).validate(),
            Err(ChopperIssue::RepeatedEdges(_))
        ));
    }

    #[test]
    fn wrapped_last_edge_overlapping_first_fails() {
        // 370 degrees wraps to 10, past the first edge at 5.
        assert!(matches!(
            input(2, vec![5.0, 90.0, 180.0, 370.0]).validate(),
            Err(ChopperIssue::OverlappingSlits(_))
        ));
        // Wrapping to 2 stays short of the first edge.
        assert!(input(2, vec![5.0, 90.0, 180.0, 362.0]).validate().is_ok());
    }

    #[test]
    fn units_are_checked_per_field() {
        let mut bad = input(1, vec![0.0, 23.0]);
        bad.slit_edges_units = Some("mm".into());
        match bad.validate() {
            Err(ChopperIssue::Units { field, .. }) => assert_eq!(field, SLIT_EDGES_NAME),
            other => panic!("expected unit failure, got {other:?}"),
        }
    }

    #[test]
    fn missing_fields_are_listed() {
        let empty = ChopperInput::default();
        assert_eq!(
            empty.validate(),
            Err(ChopperIssue::MissingFields(vec![
                SLITS_NAME,
                SLIT_EDGES_NAME,
                RADIUS_NAME,
                SLIT_HEIGHT_NAME
            ]))
        );
    }

    #[test]
    fn column_vector_edges_are_accepted() {
        let mut column = input(1, vec![]);
        column.slit_edges = Some(vec![vec![0.0], vec![23.0]]);
        assert!(column.validate().is_ok());

        column.slit_edges = Some(vec![vec![0.0, 1.0], vec![23.0, 24.0]]);
        assert!(matches!(
            column.validate(),
            Err(ChopperIssue::EdgesNotOneDimensional { rows: 2, columns: 2 })
        ));
    }
}
