//! Builds an [`Instrument`] from a NeXus JSON document.
//!
//! Reading happens in two passes. The first walks the entry's children,
//! creating a component for every group whose `NX_class` is a component
//! class and collecting `depends_on` paths as strings. The second resolves
//! each path to a [`TransformRef`] once every component exists, so a
//! dependency may point at a component that appears later in the document.
//!
//! Problems with individual nodes are recorded in the returned report and
//! the node is skipped. Only a document without an entry and children list
//! fails outright, as does (by default) one whose dependencies form a cycle.

use serde_json::Value;
use tracing::{debug, info, warn};

use super::node;
use super::shape_reader::{is_shape_group, read_shape};
use super::transformation_reader::{
    read_transformations, PendingDependency, DEPENDS_ON_TERMINAL,
};
use crate::error::NexusError;
use crate::model::{Component, ComponentClass, Instrument, PixelData, TransformRef, ENTRY_NAME};
use crate::validation::chopper::{
    ChopperInput, RADIUS_NAME, SLITS_NAME, SLIT_EDGES_NAME, SLIT_HEIGHT_NAME,
};
use crate::validation::{IssueCode, IssueContext, ValidationIssue, ValidationReport};

/// Name of the dataset giving a single-pixel component its id.
pub const DETECTOR_ID: &str = "detector_id";

/// Options for reading a document.
#[derive(Clone, Debug)]
pub struct ReadOptions {
    /// Fail when `depends_on` chains form a cycle. When false the cycle is
    /// only reported and the instrument is returned as read.
    pub fail_on_cycle: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            fail_on_cycle: true,
        }
    }
}

/// A successfully read instrument and everything that was left out of it.
#[derive(Clone, Debug)]
pub struct ReadOutcome {
    pub instrument: Instrument,
    pub report: ValidationReport,
}

/// Reads an instrument from an already parsed document.
///
/// # Errors
/// Returns [`NexusError::Structural`] if `nexus_structure.children[0].children`
/// is missing or empty, and [`NexusError::DependencyCycle`] if the resolved
/// dependencies loop and `opts.fail_on_cycle` is set.
pub fn read_instrument(document: &Value, opts: &ReadOptions) -> Result<ReadOutcome, NexusError> {
    let entry = document
        .get("nexus_structure")
        .and_then(node::children)
        .and_then(|children| children.first())
        .ok_or_else(|| NexusError::Structural("no entry under nexus_structure".to_string()))?;
    let children = node::children(entry)
        .filter(|children| !children.is_empty())
        .ok_or_else(|| NexusError::Structural("entry has no children".to_string()))?;

    let entry_name = node::name(entry).unwrap_or(ENTRY_NAME);
    info!(entry = entry_name, children = children.len(), "reading instrument");

    let mut loader = Loader::new(entry_name);
    for child in children {
        loader.read_object(child, entry_name);
    }
    loader.resolve_dependencies();

    let Loader {
        instrument,
        mut report,
        ..
    } = loader;

    if let Err(cycle) = instrument.check_acyclic() {
        if opts.fail_on_cycle {
            return Err(cycle);
        }
        warn!(%cycle, "instrument contains a dependency cycle");
        report.add(ValidationIssue::error(
            IssueCode::DependencyCycle,
            cycle.to_string(),
            IssueContext::Document,
        ));
    }

    info!(
        components = instrument.component_count(),
        warnings = report.warning_count(),
        errors = report.error_count(),
        "read instrument"
    );
    Ok(ReadOutcome { instrument, report })
}

/// Where a pending `depends_on` path was found.
#[derive(Debug)]
enum Holder {
    Component(String),
    Transformation(String, PendingDependency),
}

struct Loader {
    instrument: Instrument,
    report: ValidationReport,
    /// Names of `NXinstrument` groups seen, stripped from dependency paths.
    containers: Vec<String>,
    pending: Vec<(Holder, String)>,
    sample_seen: bool,
}

impl Loader {
    fn new(entry_name: &str) -> Self {
        let instrument = Instrument {
            entry_name: entry_name.to_string(),
            ..Instrument::default()
        };
        Self {
            instrument,
            report: ValidationReport::new(),
            containers: Vec::new(),
            pending: Vec::new(),
            sample_seen: false,
        }
    }

    fn record(&mut self, issue: ValidationIssue) {
        warn!(code = ?issue.code, "{}", issue.message);
        self.report.add(issue);
    }

    fn record_all(&mut self, report: ValidationReport) {
        for issue in report.issues {
            self.record(issue);
        }
    }

    fn read_object(&mut self, object: &Value, parent_name: &str) {
        let Some(name) = node::name(object).filter(|n| !n.is_empty()) else {
            self.record(ValidationIssue::warning(
                IssueCode::MissingName,
                format!("Unable to find object name for child of {parent_name}."),
                IssueContext::Document,
            ));
            return;
        };

        let Some(nx_class) = node::nx_class(object) else {
            self.record(ValidationIssue::warning(
                IssueCode::MissingNxClass,
                format!("Unable to determine NXclass of component {name}."),
                IssueContext::component(name),
            ));
            return;
        };

        if nx_class == node::NX_INSTRUMENT {
            self.instrument.name = name.to_string();
            self.containers.push(name.to_string());
            for child in node::children(object).into_iter().flatten() {
                self.read_object(child, name);
            }
            return;
        }

        let Some(class) = ComponentClass::from_nx_class(nx_class) else {
            self.record(ValidationIssue::warning(
                IssueCode::UnknownNxClass,
                format!("Skipping {name}: NXclass {nx_class} is not a component class."),
                IssueContext::component(name),
            ));
            return;
        };

        let is_sample = class == ComponentClass::Sample;
        // Until an NXsample is read the placeholder sample still holds its name.
        let duplicate = self.instrument.components.iter().any(|c| c.name == name)
            || if is_sample {
                self.sample_seen
            } else {
                self.instrument.sample.name == name
            };
        if duplicate {
            self.record(ValidationIssue::error(
                IssueCode::DuplicateComponentName,
                format!("A component named {name} has already been read. Skipping the second one."),
                IssueContext::component(name),
            ));
            return;
        }

        let component = self.read_component(object, name, class);
        if is_sample {
            self.sample_seen = true;
            self.instrument.sample = component;
        } else {
            self.instrument.components.push(component);
        }
    }

    fn read_component(&mut self, object: &Value, name: &str, class: ComponentClass) -> Component {
        debug!(component = name, nx_class = %class, "reading component");
        let mut component = Component::new(name, class);

        if let Some(description) = node::attribute_str(object, "description") {
            component.description = description.to_string();
        }

        let Some(children) = node::children(object) else {
            return component;
        };

        if let Some(description) = node::child_string(children, "description") {
            component.description = description;
        }

        let mut issues = ValidationReport::new();
        for pending in read_transformations(&mut component, children, &mut issues) {
            let path = pending.path.clone();
            self.pending
                .push((Holder::Transformation(name.to_string(), pending), path));
        }

        for shape in children.iter().filter(|child| is_shape_group(child)) {
            read_shape(&mut component, shape, children, &mut issues);
        }
        self.record_all(issues);

        if component.pixel_data.is_none() {
            if let Some(id) = node::find_child(children, DETECTOR_ID)
                .and_then(node::values)
                .and_then(node::scalar_i64)
            {
                component.pixel_data = PixelData::SingleId { id };
            }
        }

        if let Some(path) = node::child_string(children, "depends_on") {
            if path != DEPENDS_ON_TERMINAL && !path.is_empty() {
                self.pending.push((Holder::Component(name.to_string()), path));
            }
        }

        if class == ComponentClass::DiskChopper {
            if let Err(issue) = read_chopper_input(children).validate() {
                self.record(ValidationIssue::warning(
                    IssueCode::InvalidChopper,
                    issue.to_string(),
                    IssueContext::component(name),
                ));
            }
        }

        component
    }

    /// Second pass: turn every recorded path into a reference.
    fn resolve_dependencies(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for (holder, path) in pending {
            let target = resolve_depends_on_path(
                &path,
                &self.instrument.entry_name,
                &self.containers,
            )
            .filter(|target| self.instrument.transformation(target).is_some());

            let Some(target) = target else {
                let (component, context) = match &holder {
                    Holder::Component(component) => {
                        (component.clone(), IssueContext::component(component))
                    }
                    Holder::Transformation(component, pending) => (
                        component.clone(),
                        IssueContext::transformation(component, &pending.transformation),
                    ),
                };
                self.record(ValidationIssue::warning(
                    IssueCode::UnresolvedDependency,
                    format!(
                        "Unable to resolve depends_on path {path} of {component}: no such transformation."
                    ),
                    context,
                ));
                continue;
            };

            match holder {
                Holder::Component(component) => {
                    if let Some(component) = self.instrument.component_mut(&component) {
                        component.depends_on = Some(target);
                    }
                }
                Holder::Transformation(component, pending) => {
                    if let Some(transformation) = self
                        .instrument
                        .component_mut(&component)
                        .and_then(|c| c.transformation_mut(&pending.transformation))
                    {
                        transformation.depends_on = Some(target);
                    }
                }
            }
        }
    }
}

/// Splits an absolute `depends_on` path into component and transformation.
///
/// Empty segments are dropped, then a leading entry segment and an
/// instrument-container segment after it. The first remaining segment names
/// the component and the last names the transformation.
pub fn resolve_depends_on_path(
    path: &str,
    entry_name: &str,
    containers: &[String],
) -> Option<TransformRef> {
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.first() == Some(&entry_name) {
        segments.remove(0);
    }
    if segments
        .first()
        .is_some_and(|first| containers.iter().any(|c| c == first))
        && segments.len() > 2
    {
        segments.remove(0);
    }
    match segments.as_slice() {
        [component, .., transformation] => Some(TransformRef::new(*component, *transformation)),
        _ => None,
    }
}

fn read_chopper_input(children: &[Value]) -> ChopperInput {
    let values = |name: &str| node::find_child(children, name).and_then(node::values);
    let units = |name: &str| {
        node::find_child(children, name)
            .and_then(|dataset| node::attribute_str(dataset, "units"))
            .map(str::to_string)
    };

    ChopperInput {
        slits: values(SLITS_NAME).and_then(node::scalar_i64),
        slit_edges: values(SLIT_EDGES_NAME).and_then(node::rows_f64),
        radius: values(RADIUS_NAME).and_then(node::scalar_f64),
        slit_height: values(SLIT_HEIGHT_NAME).and_then(node::scalar_f64),
        slit_edges_units: units(SLIT_EDGES_NAME),
        radius_units: units(RADIUS_NAME),
        slit_height_units: units(SLIT_HEIGHT_NAME),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(children: Value) -> Value {
        json!({"nexus_structure": {"children": [{
            "type": "group",
            "name": "entry",
            "attributes": [{"name": "NX_class", "values": "NXentry"}],
            "children": children
        }]}})
    }

    #[test]
    fn path_resolution_strips_entry_and_container() {
        let containers = vec!["instrument".to_string()];
        assert_eq!(
            resolve_depends_on_path(
                "/entry/instrument/detector/transformations/offset",
                "entry",
                &containers
            ),
            Some(TransformRef::new("detector", "offset"))
        );
        assert_eq!(
            resolve_depends_on_path("/entry/sample/transformations/stage", "entry", &containers),
            Some(TransformRef::new("sample", "stage"))
        );
        assert_eq!(resolve_depends_on_path("/entry", "entry", &containers), None);
    }

    #[test]
    fn structural_errors_fail_the_load() {
        for doc in [json!({}), json!({"nexus_structure": {"children": []}}), document(json!([]))] {
            assert!(matches!(
                read_instrument(&doc, &ReadOptions::default()),
                Err(NexusError::Structural(_))
            ));
        }
    }

    #[test]
    fn nameless_and_classless_children_are_skipped() {
        let doc = document(json!([
            {"type": "group", "attributes": {"NX_class": "NXdetector"}},
            {"type": "group", "name": "mystery"},
            {"type": "group", "name": "user", "attributes": {"NX_class": "NXuser"}},
            {"type": "group", "name": "monitor", "attributes": {"NX_class": "NXmonitor"}}
        ]));
        let outcome = read_instrument(&doc, &ReadOptions::default()).unwrap();
        assert_eq!(outcome.instrument.component_count(), 2);
        assert_eq!(
            outcome.report.messages(),
            vec![
                "Unable to find object name for child of entry.",
                "Unable to determine NXclass of component mystery.",
                "Skipping user: NXclass NXuser is not a component class.",
            ]
        );
    }

    #[test]
    fn sample_is_populated_and_renamed() {
        let doc = document(json!([
            {"type": "group", "name": "crystal", "attributes": {"NX_class": "NXsample"},
             "children": [{"type": "dataset", "name": "description", "values": "A small crystal"}]}
        ]));
        let outcome = read_instrument(&doc, &ReadOptions::default()).unwrap();
        assert_eq!(outcome.instrument.sample.name, "crystal");
        assert_eq!(outcome.instrument.sample.description, "A small crystal");
    }

    #[test]
    fn component_sharing_the_placeholder_sample_name_is_rejected() {
        let doc = document(json!([
            {"type": "group", "name": "sample", "attributes": {"NX_class": "NXdetector"},
             "children": [
                {"type": "group", "name": "transformations",
                 "attributes": {"NX_class": "NXtransformations"},
                 "children": [{"type": "dataset", "name": "t", "dataset": {"type": "double"}, "values": 1.0,
                   "attributes": {"units": "m", "transformation_type": "translation",
                                  "vector": [0.0, 0.0, 1.0], "depends_on": "."}}]},
                {"type": "dataset", "name": "depends_on", "values": "/entry/instrument/sample/transformations/t"}
             ]}
        ]));
        let outcome = read_instrument(&doc, &ReadOptions::default()).unwrap();
        assert_eq!(outcome.instrument.component_count(), 1);
        assert_eq!(outcome.instrument.sample.nx_class, ComponentClass::Sample);
        assert_eq!(outcome.report.count_code(IssueCode::DuplicateComponentName), 1);
        assert_eq!(outcome.report.count_code(IssueCode::UnresolvedDependency), 0);
        assert_eq!(outcome.report.issues.len(), 1);
    }

    #[test]
    fn sub_reader_issues_reach_the_report() {
        let doc = document(json!([
            {"type": "group", "name": "slit", "attributes": {"NX_class": "NXslit"},
             "children": [
                {"type": "group", "name": "transformations",
                 "attributes": {"NX_class": "NXtransformations"},
                 "children": [{"type": "dataset", "name": "gap", "dataset": {"type": "double"}, "values": 1.0,
                   "attributes": {"units": "deg", "transformation_type": "translation",
                                  "vector": [0.0, 0.0, 1.0]}}]},
                {"type": "group", "name": "shape", "attributes": {"NX_class": "NXbox"}, "children": []}
             ]}
        ]));
        let outcome = read_instrument(&doc, &ReadOptions::default()).unwrap();
        assert_eq!(outcome.report.count_code(IssueCode::InvalidUnits), 1);
        assert_eq!(outcome.report.issues.len(), 2);
        let slit = outcome.instrument.component("slit").unwrap();
        assert!(slit.transforms.is_empty());
        assert!(slit.geometry.is_none());
    }

    #[test]
    fn monitor_detector_id_becomes_single_id() {
        let doc = document(json!([
            {"type": "group", "name": "monitor", "attributes": {"NX_class": "NXmonitor"},
             "children": [{"type": "dataset", "name": "detector_id", "dataset": {"type": "int64"}, "values": 90000}]}
        ]));
        let outcome = read_instrument(&doc, &ReadOptions::default()).unwrap();
        assert_eq!(
            outcome.instrument.component("monitor").unwrap().pixel_data,
            PixelData::SingleId { id: 90000 }
        );
    }

    #[test]
    fn invalid_chopper_is_warned() {
        let doc = document(json!([
            {"type": "group", "name": "chopper", "attributes": {"NX_class": "NXdisk_chopper"},
             "children": [
                {"type": "dataset", "name": "slits", "dataset": {"type": "int32"}, "values": 1},
                {"type": "dataset", "name": "slit_edges", "dataset": {"type": "double"}, "values": [0.0, 20.0, 40.0],
                 "attributes": [{"name": "units", "values": "deg"}]},
                {"type": "dataset", "name": "radius", "dataset": {"type": "double"}, "values": 300.0,
                 "attributes": [{"name": "units", "values": "mm"}]},
                {"type": "dataset", "name": "slit_height", "dataset": {"type": "double"}, "values": 70.0,
                 "attributes": [{"name": "units", "values": "mm"}]}
             ]}
        ]));
        let outcome = read_instrument(&doc, &ReadOptions::default()).unwrap();
        assert_eq!(outcome.report.count_code(IssueCode::InvalidChopper), 1);
        assert!(outcome.report.messages()[0].contains("twice the number of slits"));
    }
}
