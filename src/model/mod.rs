//! In-memory instrument model.
//!
//! This module defines the format-agnostic description of a scientific
//! instrument: its components, the 3D shapes attached to them, how their
//! pixels are addressed, and the chains of transformations that place each
//! component in space. The NeXus JSON reader builds this model and the
//! writer serializes it back out.
//!
//! # Design Principles
//!
//! 1. **Closed variants**: geometry and pixel data are enums, so every
//!    consumer handles every kind with an exhaustive `match`.
//!
//! 2. **Name-keyed references**: a transformation's `depends_on` is a
//!    [`TransformRef`] naming a component and one of its transformations.
//!    References are non-owning and may cross component boundaries.
//!
//! 3. **Permissive construction**: model types can hold values that break
//!    the NeXus invariants, so that validation reports problems instead of
//!    the constructors panicking.
//!
//! # Example
//!
//! ```
//! use nxinstrument::model::{
//!     Component, ComponentClass, Instrument, Transformation, TransformRef, Vector3,
//! };
//!
//! let mut detector = Component::new("detector", ComponentClass::Detector);
//! detector.transforms.push(Transformation::translation(
//!     "location",
//!     2.5,
//!     "m",
//!     Vector3::new(0.0, 0.0, 1.0),
//! ));
//! detector.depends_on = Some(TransformRef::new("detector", "location"));
//!
//! let mut instrument = Instrument::default();
//! instrument.add_component(detector).unwrap();
//! assert_eq!(instrument.dependency_chain("detector").unwrap().len(), 1);
//! ```

mod component;
mod geometry;
mod instrument;
mod pixel;
mod transformation;
mod vector;

pub use component::{Component, ComponentClass};
pub use geometry::{CylindricalGeometry, Geometry, OffGeometry, CYLINDER_INDICES};
pub use instrument::{Instrument, INSTRUMENT_NAME, SAMPLE_NAME};
pub use pixel::{CountDirection, Corner, PixelData, PixelGrid, PixelMapping};
pub use transformation::{TransformRef, Transformation, TransformationKind};
pub use vector::Vector3;

/// Name of the NeXus entry group that holds the instrument.
pub const ENTRY_NAME: &str = "entry";
