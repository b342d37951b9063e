//! Instrument components.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::geometry::Geometry;
use super::pixel::PixelData;
use super::transformation::{TransformRef, Transformation};

/// The NeXus base classes recognised as instrument components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentClass {
    Sample,
    Detector,
    Monitor,
    Source,
    Slit,
    Moderator,
    Chopper,
    DiskChopper,
    FermiChopper,
    Aperture,
    Attenuator,
    BeamStop,
    Guide,
    Mirror,
    Collimator,
    Crystal,
    Filter,
    Grating,
    Pinhole,
    Polarizer,
    Positioner,
    Sensor,
    VelocitySelector,
    XrayLens,
    BendingMagnet,
    InsertionDevice,
    DetectorModule,
    Capillary,
    Beam,
}

impl ComponentClass {
    pub const ALL: [ComponentClass; 29] = [
        ComponentClass::Sample,
        ComponentClass::Detector,
        ComponentClass::Monitor,
        ComponentClass::Source,
        ComponentClass::Slit,
        ComponentClass::Moderator,
        ComponentClass::Chopper,
        ComponentClass::DiskChopper,
        ComponentClass::FermiChopper,
        ComponentClass::Aperture,
        ComponentClass::Attenuator,
        ComponentClass::BeamStop,
        ComponentClass::Guide,
        ComponentClass::Mirror,
        ComponentClass::Collimator,
        ComponentClass::Crystal,
        ComponentClass::Filter,
        ComponentClass::Grating,
        ComponentClass::Pinhole,
        ComponentClass::Polarizer,
        ComponentClass::Positioner,
        ComponentClass::Sensor,
        ComponentClass::VelocitySelector,
        ComponentClass::XrayLens,
        ComponentClass::BendingMagnet,
        ComponentClass::InsertionDevice,
        ComponentClass::DetectorModule,
        ComponentClass::Capillary,
        ComponentClass::Beam,
    ];

    /// The `NX_class` attribute value.
    pub fn nx_class(self) -> &'static str {
        match self {
            ComponentClass::Sample => "NXsample",
            ComponentClass::Detector => "NXdetector",
            ComponentClass::Monitor => "NXmonitor",
            ComponentClass::Source => "NXsource",
            ComponentClass::Slit => "NXslit",
            ComponentClass::Moderator => "NXmoderator",
            ComponentClass::Chopper => "NXchopper",
            ComponentClass::DiskChopper => "NXdisk_chopper",
            ComponentClass::FermiChopper => "NXfermi_chopper",
            ComponentClass::Aperture => "NXaperture",
            ComponentClass::Attenuator => "NXattenuator",
            ComponentClass::BeamStop => "NXbeam_stop",
            ComponentClass::Guide => "NXguide",
            ComponentClass::Mirror => "NXmirror",
            ComponentClass::Collimator => "NXcollimator",
            ComponentClass::Crystal => "NXcrystal",
            ComponentClass::Filter => "NXfilter",
            ComponentClass::Grating => "NXgrating",
            ComponentClass::Pinhole => "NXpinhole",
            ComponentClass::Polarizer => "NXpolarizer",
            ComponentClass::Positioner => "NXpositioner",
            ComponentClass::Sensor => "NXsensor",
            ComponentClass::VelocitySelector => "NXvelocity_selector",
            ComponentClass::XrayLens => "NXxraylens",
            ComponentClass::BendingMagnet => "NXbending_magnet",
            ComponentClass::InsertionDevice => "NXinsertion_device",
            ComponentClass::DetectorModule => "NXdetector_module",
            ComponentClass::Capillary => "NXcapillary",
            ComponentClass::Beam => "NXbeam",
        }
    }

    /// Looks up a component class by its `NX_class` value.
    pub fn from_nx_class(nx_class: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|class| class.nx_class() == nx_class)
    }
}

impl fmt::Display for ComponentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.nx_class())
    }
}

/// A physical component of the instrument.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Name, unique within the instrument.
    pub name: String,

    pub nx_class: ComponentClass,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Transformations in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transforms: Vec<Transformation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,

    #[serde(default, skip_serializing_if = "PixelData::is_none")]
    pub pixel_data: PixelData,

    /// The first transformation of this component's chain; `None` is the identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<TransformRef>,
}

impl Component {
    /// Creates an empty component.
    pub fn new(name: impl Into<String>, nx_class: ComponentClass) -> Self {
        Self {
            name: name.into(),
            nx_class,
            description: String::new(),
            transforms: Vec::new(),
            geometry: None,
            pixel_data: PixelData::None,
            depends_on: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the geometry.
    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Sets the pixel data.
    pub fn with_pixel_data(mut self, pixel_data: PixelData) -> Self {
        self.pixel_data = pixel_data;
        self
    }

    /// Finds one of this component's transformations by name.
    pub fn transformation(&self, name: &str) -> Option<&Transformation> {
        self.transforms.iter().find(|t| t.name == name)
    }

    pub fn transformation_mut(&mut self, name: &str) -> Option<&mut Transformation> {
        self.transforms.iter_mut().find(|t| t.name == name)
    }

    /// A reference to one of this component's transformations.
    pub fn transform_ref(&self, transformation: impl Into<String>) -> TransformRef {
        TransformRef::new(self.name.clone(), transformation)
    }

    /// Returns true if this component's own chain or any of its transforms
    /// point at a transformation owned by `other`.
    pub fn depends_on_component(&self, other: &str) -> bool {
        let points_at = |target: &Option<TransformRef>| {
            target.as_ref().is_some_and(|t| t.component == other)
        };
        points_at(&self.depends_on) || self.transforms.iter().any(|t| points_at(&t.depends_on))
    }
}
