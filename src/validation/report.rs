//! Report types for structured issue reporting.
//!
//! The same report accumulates warnings while a document is read and the
//! results of validating a finished instrument, so both can be displayed to
//! users, written as JSON, or processed programmatically.

use serde::Serialize;
use std::fmt;

/// An ordered list of issues found while reading or validating.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    /// All issues, in the order they were found.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Creates a new empty report.
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Adds an issue to the report.
    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Moves every issue from `other` onto the end of this report.
    pub fn extend(&mut self, other: ValidationReport) {
        self.issues.extend(other.issues);
    }

    /// Returns the number of errors in the report.
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    /// Returns the number of warnings in the report.
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// Returns the number of issues carrying `code`.
    pub fn count_code(&self, code: IssueCode) -> usize {
        self.issues.iter().filter(|i| i.code == code).count()
    }

    /// Returns true if there are no errors.
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    /// Returns true if there are no issues at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Returns true if validation passed in strict mode (no errors or warnings).
    pub fn is_ok_strict(&self) -> bool {
        self.issues.is_empty()
    }

    /// The messages alone, in order.
    pub fn messages(&self) -> Vec<&str> {
        self.issues.iter().map(|i| i.message.as_str()).collect()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return writeln!(f, "No issues found");
        }

        writeln!(
            f,
            "Found {} error(s) and {} warning(s):",
            self.error_count(),
            self.warning_count()
        )?;
        writeln!(f)?;

        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }

        Ok(())
    }
}

/// A single issue (error or warning).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValidationIssue {
    /// The severity of the issue.
    pub severity: Severity,

    /// A stable code for the issue type.
    pub code: IssueCode,

    /// A human-readable description of the issue.
    pub message: String,

    /// Where the issue occurred.
    pub context: IssueContext,
}

impl ValidationIssue {
    /// Creates a new issue.
    pub fn new(
        severity: Severity,
        code: IssueCode,
        message: impl Into<String>,
        context: IssueContext,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            context,
        }
    }

    /// Creates a new error.
    pub fn error(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(Severity::Error, code, message, context)
    }

    /// Creates a new warning.
    pub fn warning(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(Severity::Warning, code, message, context)
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN ",
        };
        write!(
            f,
            "[{}] {:?} in {}: {}",
            severity, self.code, self.context, self.message
        )
    }
}

/// The severity of an issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Something was omitted or looks wrong, but the rest is usable.
    Warning,
    /// An entity was invalid and has been skipped or cannot be trusted.
    Error,
}

/// A stable code identifying the type of issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    // Document structure
    /// A child node has no name.
    MissingName,
    /// A child node has no `NX_class`.
    MissingNxClass,
    /// A child node's `NX_class` is not a component class.
    UnknownNxClass,

    // Transformations
    /// A transformation dataset is missing or has an invalid attribute.
    InvalidTransformation,
    /// Two transformations in one component share a name.
    DuplicateTransformationName,

    // Units
    /// A units string failed one of the unit checks.
    InvalidUnits,

    // Shapes
    /// A shape could not be constructed and was skipped.
    InvalidShape,
    /// A shape was constructed, but something in it looks wrong.
    ShapeIssue,
    /// A winding-order entry refers to a vertex that does not exist.
    WindingOrderOutOfRange,
    /// Face start offsets are not strictly increasing.
    FaceOffsetsNotIncreasing,

    // Pixel data
    /// Pixel arrays could not be read or decoded.
    InvalidPixelData,
    /// A pixel grid has no rows or no columns.
    EmptyPixelGrid,

    // Dependencies
    /// A `depends_on` path does not resolve to a transformation.
    UnresolvedDependency,
    /// A `depends_on` chain loops back on itself.
    DependencyCycle,

    // Components
    /// Two components share a name.
    DuplicateComponentName,
    /// A disk chopper's fields do not describe a valid chopper.
    InvalidChopper,
}

/// Where an issue occurred.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueContext {
    /// The document or instrument as a whole.
    Document,
    /// A component.
    Component { name: String },
    /// One of a component's transformations.
    Transformation { component: String, name: String },
    /// A component's shape group.
    Shape { component: String },
}

impl IssueContext {
    pub fn component(name: impl Into<String>) -> Self {
        IssueContext::Component { name: name.into() }
    }

    pub fn transformation(component: impl Into<String>, name: impl Into<String>) -> Self {
        IssueContext::Transformation {
            component: component.into(),
            name: name.into(),
        }
    }

    pub fn shape(component: impl Into<String>) -> Self {
        IssueContext::Shape {
            component: component.into(),
        }
    }
}

impl fmt::Display for IssueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueContext::Document => write!(f, "document"),
            IssueContext::Component { name } => write!(f, "component {}", name),
            IssueContext::Transformation { component, name } => {
                write!(f, "transformation {}/{}", component, name)
            }
            IssueContext::Shape { component } => write!(f, "shape of {}", component),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_severity_and_code() {
        let mut report = ValidationReport::new();
        report.add(ValidationIssue::warning(
            IssueCode::UnresolvedDependency,
            "dangling",
            IssueContext::component("detector"),
        ));
        report.add(ValidationIssue::error(
            IssueCode::InvalidShape,
            "broken",
            IssueContext::shape("detector"),
        ));

        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.count_code(IssueCode::InvalidShape), 1);
        assert!(!report.is_ok());
        assert_eq!(report.messages(), vec!["dangling", "broken"]);
    }

    #[test]
    fn display_lists_every_issue() {
        let mut report = ValidationReport::new();
        assert!(report.to_string().contains("No issues"));

        report.add(ValidationIssue::warning(
            IssueCode::InvalidUnits,
            "units are not recognised",
            IssueContext::transformation("detector", "offset"),
        ));
        let text = report.to_string();
        assert!(text.contains("[WARN ] InvalidUnits in transformation detector/offset"));
    }

    #[test]
    fn serializes_with_snake_case_codes() {
        let issue = ValidationIssue::warning(
            IssueCode::UnresolvedDependency,
            "dangling",
            IssueContext::Document,
        );
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["code"], "unresolved_dependency");
        assert_eq!(json["context"]["kind"], "document");
    }
}
