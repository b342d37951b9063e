//! The instrument graph: the sample plus every other component.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::component::{Component, ComponentClass};
use super::transformation::{TransformRef, Transformation};
use super::ENTRY_NAME;
use crate::error::NexusError;

/// Default name of the sample component.
pub const SAMPLE_NAME: &str = "sample";

/// Default name of the instrument container group.
pub const INSTRUMENT_NAME: &str = "instrument";

/// A complete instrument description.
///
/// Owns every component; components own their transformations, geometry and
/// pixel data. Cross-component `depends_on` links are [`TransformRef`]s
/// resolved through [`Instrument::transformation`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    /// Name of the NeXus entry group holding the instrument.
    pub entry_name: String,

    /// Name of the instrument container group.
    pub name: String,

    /// The sample. Always present.
    pub sample: Component,

    /// Every other component, in insertion order.
    #[serde(default)]
    pub components: Vec<Component>,
}

impl Default for Instrument {
    fn default() -> Self {
        Self {
            entry_name: ENTRY_NAME.to_string(),
            name: INSTRUMENT_NAME.to_string(),
            sample: Component::new(SAMPLE_NAME, ComponentClass::Sample),
            components: Vec::new(),
        }
    }
}

impl Instrument {
    /// Iterates over all components, sample first.
    pub fn components_iter(&self) -> impl Iterator<Item = &Component> {
        std::iter::once(&self.sample).chain(self.components.iter())
    }

    /// Number of components including the sample.
    pub fn component_count(&self) -> usize {
        self.components.len() + 1
    }

    /// Finds a component (or the sample) by name.
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components_iter().find(|c| c.name == name)
    }

    pub fn component_mut(&mut self, name: &str) -> Option<&mut Component> {
        if self.sample.name == name {
            return Some(&mut self.sample);
        }
        self.components.iter_mut().find(|c| c.name == name)
    }

    /// Adds a component. Names must be unique across the instrument.
    pub fn add_component(&mut self, component: Component) -> Result<(), NexusError> {
        if self.component(&component.name).is_some() {
            return Err(NexusError::DuplicateComponent(component.name));
        }
        self.components.push(component);
        Ok(())
    }

    /// Removes a component and returns it.
    ///
    /// Refused while another component's chain still refers to one of its
    /// transformations, so references never dangle silently. The sample
    /// cannot be removed.
    pub fn remove_component(&mut self, name: &str) -> Result<Component, NexusError> {
        let position = self
            .components
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| NexusError::UnknownComponent(name.to_string()))?;

        let dependents = self.dependents_of(name);
        if !dependents.is_empty() {
            return Err(NexusError::ComponentInUse {
                name: name.to_string(),
                dependents,
            });
        }

        Ok(self.components.remove(position))
    }

    /// Names of other components whose chains refer into `name`.
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        self.components_iter()
            .filter(|c| c.name != name && c.depends_on_component(name))
            .map(|c| c.name.clone())
            .collect()
    }

    /// Resolves a reference to the transformation it names.
    pub fn transformation(&self, target: &TransformRef) -> Option<&Transformation> {
        self.component(&target.component)?
            .transformation(&target.transformation)
    }

    /// Every reference in the instrument that does not resolve, with the
    /// name of the component holding it.
    pub fn dangling_references(&self) -> Vec<(String, TransformRef)> {
        let mut dangling = Vec::new();
        for component in self.components_iter() {
            let references = std::iter::once(&component.depends_on)
                .chain(component.transforms.iter().map(|t| &t.depends_on))
                .flatten();
            for target in references {
                if self.transformation(target).is_none() {
                    dangling.push((component.name.clone(), target.clone()));
                }
            }
        }
        dangling
    }

    /// Follows `depends_on` from the transformation `start` to the terminal.
    ///
    /// Returns the references visited in order, starting with `start`.
    pub fn chain_from(&self, start: &TransformRef) -> Result<Vec<TransformRef>, NexusError> {
        let mut chain: Vec<TransformRef> = Vec::new();
        let mut visited: HashSet<&TransformRef> = HashSet::new();
        let mut current = start;

        loop {
            if !visited.insert(current) {
                let mut names: Vec<String> = chain.iter().map(ToString::to_string).collect();
                names.push(current.to_string());
                return Err(NexusError::DependencyCycle { chain: names });
            }
            let transformation =
                self.transformation(current)
                    .ok_or_else(|| NexusError::UnresolvedDependency {
                        component: current.component.clone(),
                        transformation: current.transformation.clone(),
                    })?;
            chain.push(current.clone());
            match &transformation.depends_on {
                Some(next) => current = next,
                None => return Ok(chain),
            }
        }
    }

    /// The full transformation chain placing the named component.
    pub fn dependency_chain(&self, component: &str) -> Result<Vec<TransformRef>, NexusError> {
        let component = self
            .component(component)
            .ok_or_else(|| NexusError::UnknownComponent(component.to_string()))?;
        match &component.depends_on {
            Some(start) => self.chain_from(start),
            None => Ok(Vec::new()),
        }
    }

    /// Walks every chain in the instrument and reports the first cycle found.
    pub fn check_acyclic(&self) -> Result<(), NexusError> {
        for component in self.components_iter() {
            for transformation in &component.transforms {
                match self.chain_from(&component.transform_ref(&transformation.name)) {
                    Err(cycle @ NexusError::DependencyCycle { .. }) => return Err(cycle),
                    _ => continue,
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Vector3;

    fn z_axis() -> Vector3 {
        Vector3::new(0.0, 0.0, 1.0)
    }

    fn chained_instrument() -> Instrument {
        let mut instrument = Instrument::default();
        instrument
            .sample
            .transforms
            .push(Transformation::translation("stage", 1.0, "m", z_axis()));

        let mut detector = Component::new("detector", ComponentClass::Detector);
        detector.transforms.push(
            Transformation::rotation("tilt", 90.0, "deg", z_axis())
                .with_depends_on(TransformRef::new("detector", "offset")),
        );
        detector.transforms.push(
            Transformation::translation("offset", 2.0, "m", z_axis())
                .with_depends_on(TransformRef::new(SAMPLE_NAME, "stage")),
        );
        detector.depends_on = Some(TransformRef::new("detector", "tilt"));
        instrument.add_component(detector).unwrap();
        instrument
    }

    #[test]
    fn chain_crosses_components_in_order() {
        let instrument = chained_instrument();
        let chain = instrument.dependency_chain("detector").unwrap();
        assert_eq!(
            chain,
            vec![
                TransformRef::new("detector", "tilt"),
                TransformRef::new("detector", "offset"),
                TransformRef::new(SAMPLE_NAME, "stage"),
            ]
        );
    }

    #[test]
    fn duplicate_component_names_are_rejected() {
        let mut instrument = chained_instrument();
        let result = instrument.add_component(Component::new("detector", ComponentClass::Monitor));
        assert!(matches!(result, Err(NexusError::DuplicateComponent(_))));
    }

    #[test]
    fn removing_referenced_component_is_refused() {
        let mut instrument = chained_instrument();
        instrument
            .add_component(Component::new("monitor", ComponentClass::Monitor))
            .unwrap();
        instrument.components[0].transforms[1].depends_on =
            Some(TransformRef::new("monitor", "missing"));

        match instrument.remove_component("monitor") {
            Err(NexusError::ComponentInUse { dependents, .. }) => {
                assert_eq!(dependents, vec!["detector".to_string()]);
            }
            other => panic!("expected ComponentInUse, got {other:?}"),
        }
    }

    #[test]
    fn removing_unreferenced_component_succeeds() {
        let mut instrument = chained_instrument();
        let removed = instrument.remove_component("detector").unwrap();
        assert_eq!(removed.name, "detector");
        assert_eq!(instrument.component_count(), 1);
    }

    #[test]
    fn cycle_is_detected() {
        let mut instrument = chained_instrument();
        instrument.sample.transforms[0].depends_on = Some(TransformRef::new("detector", "tilt"));

        assert!(matches!(
            instrument.dependency_chain("detector"),
            Err(NexusError::DependencyCycle { .. })
        ));
        assert!(instrument.check_acyclic().is_err());
    }

    #[test]
    fn dangling_reference_is_listed() {
        let mut instrument = chained_instrument();
        instrument.components[0].depends_on = Some(TransformRef::new("detector", "gone"));
        let dangling = instrument.dangling_references();
        assert_eq!(dangling.len(), 1);
        assert_eq!(dangling[0].0, "detector");
        assert!(matches!(
            instrument.dependency_chain("detector"),
            Err(NexusError::UnresolvedDependency { .. })
        ));
    }
}
