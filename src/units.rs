//! Dimensional checks for physical unit strings.
//!
//! Every `units` attribute read from or written to a NeXus document passes
//! through [`validate_units`], which runs three checks in order and stops at
//! the first failure:
//!
//! 1. [`UnitCheck::Recognised`]: the string parses as a unit expression.
//! 2. [`UnitCheck::Dimensionality`]: the unit converts to the expected
//!    physical dimension (length for translations and vertices, angle for
//!    rotations).
//! 3. [`UnitCheck::MagnitudeOfOne`]: the expression carries no numeric
//!    factor. `"2 m"` is a valid length but is rejected, because the
//!    magnitude belongs in the dataset value, not in the unit.
//!
//! The grammar accepts an optional leading number followed by a product or
//! quotient of unit symbols, each with an optional integer power:
//! `"mm"`, `"2 m"`, `"m/s^2"`, `"kg*m**2"`, `"degrees"`, `"µm"`.
//!
//! Angles are their own dimension here, so a length unit never satisfies an
//! angle check and vice versa.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit0, digit1, one_of, space0, space1},
    combinator::{all_consuming, map, map_res, opt, recognize, value},
    multi::many0,
    sequence::{pair, preceded, tuple},
    IResult,
};
use std::fmt;

/// Exponents over the base dimensions, in the order of [`BASE_DIMENSIONS`].
type Exponents = [i8; 8];

/// Names of the base dimensions, used when displaying a dimensionality.
const BASE_DIMENSIONS: [&str; 8] = [
    "length",
    "mass",
    "time",
    "current",
    "temperature",
    "substance",
    "luminosity",
    "angle",
];

const LENGTH: Exponents = [1, 0, 0, 0, 0, 0, 0, 0];
const MASS: Exponents = [0, 1, 0, 0, 0, 0, 0, 0];
const TIME: Exponents = [0, 0, 1, 0, 0, 0, 0, 0];
const CURRENT: Exponents = [0, 0, 0, 1, 0, 0, 0, 0];
const TEMPERATURE: Exponents = [0, 0, 0, 0, 1, 0, 0, 0];
const SUBSTANCE: Exponents = [0, 0, 0, 0, 0, 1, 0, 0];
const LUMINOSITY: Exponents = [0, 0, 0, 0, 0, 0, 1, 0];
const ANGLE: Exponents = [0, 0, 0, 0, 0, 0, 0, 1];
const FREQUENCY: Exponents = [0, 0, -1, 0, 0, 0, 0, 0];
const ENERGY: Exponents = [2, 1, -2, 0, 0, 0, 0, 0];
const DIMENSIONLESS: Exponents = [0; 8];

/// A physical dimension a unit can be checked against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dimension {
    Length,
    Angle,
    Time,
    Mass,
    Temperature,
    Frequency,
    Energy,
    Dimensionless,
}

impl Dimension {
    fn exponents(self) -> Exponents {
        match self {
            Dimension::Length => LENGTH,
            Dimension::Angle => ANGLE,
            Dimension::Time => TIME,
            Dimension::Mass => MASS,
            Dimension::Temperature => TEMPERATURE,
            Dimension::Frequency => FREQUENCY,
            Dimension::Energy => ENERGY,
            Dimension::Dimensionless => DIMENSIONLESS,
        }
    }

    /// A unit of this dimension, used in messages.
    pub fn reference_unit(self) -> &'static str {
        match self {
            Dimension::Length => "metres",
            Dimension::Angle => "degrees",
            Dimension::Time => "seconds",
            Dimension::Mass => "kilograms",
            Dimension::Temperature => "kelvin",
            Dimension::Frequency => "hertz",
            Dimension::Energy => "joules",
            Dimension::Dimensionless => "dimensionless",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reference_unit())
    }
}

/// The result of parsing a unit expression.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedUnit {
    /// Leading numeric factor written in the expression (1 when absent).
    pub magnitude: f64,
    /// Factor converting one of this unit (ignoring `magnitude`) to SI.
    pub scale: f64,
    exponents: Exponents,
}

impl ParsedUnit {
    /// Returns true if this unit converts to `dimension`.
    pub fn has_dimension(&self, dimension: Dimension) -> bool {
        self.exponents == dimension.exponents()
    }

    /// Converts a value expressed in this unit to the SI (or radian) base.
    pub fn to_si(&self, value: f64) -> f64 {
        value * self.magnitude * self.scale
    }

    /// Human readable dimensionality, e.g. `[length] / [time]^2`.
    pub fn dimensionality(&self) -> String {
        let mut parts = Vec::new();
        for (name, exponent) in BASE_DIMENSIONS.iter().zip(self.exponents) {
            match exponent {
                0 => {}
                1 => parts.push(format!("[{name}]")),
                n => parts.push(format!("[{name}]^{n}")),
            }
        }
        if parts.is_empty() {
            "dimensionless".to_string()
        } else {
            parts.join(" * ")
        }
    }
}

/// The three unit checks, in evaluation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnitCheck {
    Recognised,
    Dimensionality,
    MagnitudeOfOne,
}

impl fmt::Display for UnitCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnitCheck::Recognised => "recognised",
            UnitCheck::Dimensionality => "expected dimensionality",
            UnitCheck::MagnitudeOfOne => "magnitude of one",
        };
        f.write_str(name)
    }
}

/// The first unit check that failed, with enough context for a warning.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitCheckFailure {
    pub check: UnitCheck,
    pub units: String,
    pub expected: Dimension,
}

impl fmt::Display for UnitCheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.check {
            UnitCheck::Recognised => {
                write!(f, "units are not recognised. Found '{}'", self.units)
            }
            UnitCheck::Dimensionality => write!(
                f,
                "units have wrong dimensionality. Expected something that can be converted to {} but found '{}'",
                self.expected, self.units
            ),
            UnitCheck::MagnitudeOfOne => write!(
                f,
                "units do not have magnitude of one. Found '{}'",
                self.units
            ),
        }
    }
}

/// Parses a unit expression. Returns `None` if it is not recognised.
pub fn parse_units(units: &str) -> Option<ParsedUnit> {
    let trimmed = units.trim();
    if trimmed.is_empty() {
        return None;
    }
    let (_, (magnitude, factors)) = all_consuming(unit_expression)(trimmed).ok()?;

    let mut scale = 1.0;
    let mut exponents = DIMENSIONLESS;
    for (symbol, power) in factors {
        let unit = lookup(symbol)?;
        scale *= unit.scale.powi(i32::from(power));
        for (total, base) in exponents.iter_mut().zip(unit.exponents) {
            *total = total.checked_add(base.checked_mul(power)?)?;
        }
    }

    Some(ParsedUnit {
        magnitude: magnitude.unwrap_or(1.0),
        scale,
        exponents,
    })
}

/// Returns true if the unit string parses.
pub fn units_are_recognised(units: &str) -> bool {
    parse_units(units).is_some()
}

/// Returns true if the unit string parses and converts to `expected`.
pub fn units_have_expected_dimensionality(units: &str, expected: Dimension) -> bool {
    parse_units(units).is_some_and(|parsed| parsed.has_dimension(expected))
}

/// Returns true if the unit string parses and carries no numeric factor.
pub fn units_have_magnitude_of_one(units: &str) -> bool {
    parse_units(units).is_some_and(|parsed| parsed.magnitude == 1.0)
}

/// Runs all three checks in order, stopping at the first failure.
pub fn validate_units(units: &str, expected: Dimension) -> Result<ParsedUnit, UnitCheckFailure> {
    let fail = |check| UnitCheckFailure {
        check,
        units: units.to_string(),
        expected,
    };

    let parsed = parse_units(units).ok_or_else(|| fail(UnitCheck::Recognised))?;
    if !parsed.has_dimension(expected) {
        return Err(fail(UnitCheck::Dimensionality));
    }
    if parsed.magnitude != 1.0 {
        return Err(fail(UnitCheck::MagnitudeOfOne));
    }
    Ok(parsed)
}

/// Fuzz-only entrypoint for unit string parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_validate_units(input: &str) {
    for expected in [Dimension::Length, Dimension::Angle] {
        if let Ok(parsed) = validate_units(input, expected) {
            let _ = parsed.to_si(1.0);
        }
    }
}

// ============================================================================
// Grammar
// ============================================================================

/// `[number] factor (op factor)*`, where a missing operator multiplies.
fn unit_expression(input: &str) -> IResult<&str, (Option<f64>, Vec<(&str, i8)>)> {
    let (input, magnitude) = opt(number)(input)?;
    let (input, _) = space0(input)?;
    let (input, first) = factor(input)?;
    let (input, rest) = many0(pair(operator, factor))(input)?;

    let mut factors = vec![first];
    factors.extend(rest.into_iter().map(|(sign, (symbol, power))| {
        (symbol, power.saturating_mul(sign))
    }));
    Ok((input, (magnitude, factors)))
}

/// `+1` for multiplication, `-1` for division.
fn operator(input: &str) -> IResult<&str, i8> {
    alt((
        value(1, tuple((space0, alt((tag("*"), tag("·"))), space0))),
        value(-1, tuple((space0, char('/'), space0))),
        value(1, space1),
    ))(input)
}

fn factor(input: &str) -> IResult<&str, (&str, i8)> {
    pair(symbol, map(opt(power), |p| p.unwrap_or(1)))(input)
}

fn symbol(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphabetic() || c == '°' || c == '_')(input)
}

/// `^n`, `**n`, or digits written straight after the symbol (`m2`).
fn power(input: &str) -> IResult<&str, i8> {
    alt((
        preceded(alt((tag("**"), tag("^"))), signed_integer),
        signed_integer,
    ))(input)
}

fn signed_integer(input: &str) -> IResult<&str, i8> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), str::parse)(input)
}

fn number(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(tuple((
            opt(one_of("+-")),
            alt((
                recognize(pair(digit1, opt(pair(char('.'), digit0)))),
                recognize(pair(char('.'), digit1)),
            )),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        str::parse,
    )(input)
}

// ============================================================================
// Unit table
// ============================================================================

struct UnitDef {
    scale: f64,
    exponents: Exponents,
}

const fn unit(scale: f64, exponents: Exponents) -> UnitDef {
    UnitDef { scale, exponents }
}

const DEGREE: f64 = std::f64::consts::PI / 180.0;

/// Symbols that take SI prefixes (`mm`, `µs`, `kHz`, ...).
const PREFIXABLE_SYMBOLS: &[(&str, UnitDef)] = &[
    ("m", unit(1.0, LENGTH)),
    ("g", unit(1e-3, MASS)),
    ("s", unit(1.0, TIME)),
    ("A", unit(1.0, CURRENT)),
    ("K", unit(1.0, TEMPERATURE)),
    ("mol", unit(1.0, SUBSTANCE)),
    ("cd", unit(1.0, LUMINOSITY)),
    ("rad", unit(1.0, ANGLE)),
    ("Hz", unit(1.0, FREQUENCY)),
    ("J", unit(1.0, ENERGY)),
    ("eV", unit(1.602_176_634e-19, ENERGY)),
    ("N", unit(1.0, [1, 1, -2, 0, 0, 0, 0, 0])),
    ("Pa", unit(1.0, [-1, 1, -2, 0, 0, 0, 0, 0])),
    ("W", unit(1.0, [2, 1, -3, 0, 0, 0, 0, 0])),
    ("V", unit(1.0, [2, 1, -3, -1, 0, 0, 0, 0])),
    ("T", unit(1.0, [0, 1, -2, -1, 0, 0, 0, 0])),
    ("C", unit(1.0, [0, 0, 1, 1, 0, 0, 0, 0])),
];

/// Symbols that never take prefixes.
const PLAIN_SYMBOLS: &[(&str, UnitDef)] = &[
    ("deg", unit(DEGREE, ANGLE)),
    ("°", unit(DEGREE, ANGLE)),
    ("arcmin", unit(DEGREE / 60.0, ANGLE)),
    ("arcsec", unit(DEGREE / 3600.0, ANGLE)),
    ("rev", unit(2.0 * std::f64::consts::PI, ANGLE)),
    ("in", unit(0.0254, LENGTH)),
    ("ft", unit(0.3048, LENGTH)),
    ("yd", unit(0.9144, LENGTH)),
    ("mi", unit(1609.344, LENGTH)),
    ("Å", unit(1e-10, LENGTH)),
    ("min", unit(60.0, TIME)),
    ("h", unit(3600.0, TIME)),
    ("hr", unit(3600.0, TIME)),
    ("rpm", unit(1.0 / 60.0, FREQUENCY)),
    ("degC", unit(1.0, TEMPERATURE)),
];

/// Long names, matched case-insensitively. Plurals ending in `s` are
/// accepted by stripping the `s`.
const NAMED_UNITS: &[(&str, UnitDef)] = &[
    ("metre", unit(1.0, LENGTH)),
    ("meter", unit(1.0, LENGTH)),
    ("gram", unit(1e-3, MASS)),
    ("second", unit(1.0, TIME)),
    ("ampere", unit(1.0, CURRENT)),
    ("kelvin", unit(1.0, TEMPERATURE)),
    ("mole", unit(1.0, SUBSTANCE)),
    ("candela", unit(1.0, LUMINOSITY)),
    ("radian", unit(1.0, ANGLE)),
    ("hertz", unit(1.0, FREQUENCY)),
    ("joule", unit(1.0, ENERGY)),
    ("electron_volt", unit(1.602_176_634e-19, ENERGY)),
    ("degree", unit(DEGREE, ANGLE)),
    ("arcminute", unit(DEGREE / 60.0, ANGLE)),
    ("arcsecond", unit(DEGREE / 3600.0, ANGLE)),
    ("revolution", unit(2.0 * std::f64::consts::PI, ANGLE)),
    ("turn", unit(2.0 * std::f64::consts::PI, ANGLE)),
    ("inch", unit(0.0254, LENGTH)),
    ("inches", unit(0.0254, LENGTH)),
    ("foot", unit(0.3048, LENGTH)),
    ("feet", unit(0.3048, LENGTH)),
    ("yard", unit(0.9144, LENGTH)),
    ("mile", unit(1609.344, LENGTH)),
    ("angstrom", unit(1e-10, LENGTH)),
    ("minute", unit(60.0, TIME)),
    ("hour", unit(3600.0, TIME)),
];

/// Prefixes whose long names combine only with the long names above that
/// denote SI units.
const PREFIXABLE_NAMES: &[&str] = &[
    "metre", "meter", "gram", "second", "ampere", "kelvin", "mole", "candela", "radian",
    "hertz", "joule", "electron_volt",
];

const PREFIXES: &[(&str, &str, f64)] = &[
    ("Y", "yotta", 1e24),
    ("Z", "zetta", 1e21),
    ("E", "exa", 1e18),
    ("P", "peta", 1e15),
    ("T", "tera", 1e12),
    ("G", "giga", 1e9),
    ("M", "mega", 1e6),
    ("k", "kilo", 1e3),
    ("h", "hecto", 1e2),
    ("da", "deca", 1e1),
    ("d", "deci", 1e-1),
    ("c", "centi", 1e-2),
    ("m", "milli", 1e-3),
    ("u", "micro", 1e-6),
    ("µ", "micro", 1e-6),
    ("μ", "micro", 1e-6),
    ("n", "nano", 1e-9),
    ("p", "pico", 1e-12),
    ("f", "femto", 1e-15),
    ("a", "atto", 1e-18),
    ("z", "zepto", 1e-21),
    ("y", "yocto", 1e-24),
];

fn find<'a>(table: &'a [(&str, UnitDef)], name: &str) -> Option<&'a UnitDef> {
    table.iter().find(|(key, _)| *key == name).map(|(_, def)| def)
}

fn lookup(symbol: &str) -> Option<UnitDef> {
    let copy = |def: &UnitDef| unit(def.scale, def.exponents);

    if let Some(def) = find(PREFIXABLE_SYMBOLS, symbol).or_else(|| find(PLAIN_SYMBOLS, symbol)) {
        return Some(copy(def));
    }

    for (prefix, _, factor) in PREFIXES {
        if let Some(rest) = symbol.strip_prefix(prefix) {
            if let Some(def) = find(PREFIXABLE_SYMBOLS, rest) {
                return Some(unit(def.scale * factor, def.exponents));
            }
        }
    }

    let lower = symbol.to_lowercase();
    lookup_name(&lower).or_else(|| {
        PREFIXES.iter().find_map(|(_, long_prefix, factor)| {
            let rest = lower.strip_prefix(long_prefix)?;
            let singular = rest.strip_suffix('s').unwrap_or(rest);
            if !PREFIXABLE_NAMES.contains(&rest) && !PREFIXABLE_NAMES.contains(&singular) {
                return None;
            }
            let def = lookup_name(rest)?;
            Some(unit(def.scale * factor, def.exponents))
        })
    })
}

fn lookup_name(name: &str) -> Option<UnitDef> {
    find(NAMED_UNITS, name)
        .or_else(|| name.strip_suffix('s').and_then(|singular| find(NAMED_UNITS, singular)))
        .map(|def| unit(def.scale, def.exponents))
}

// ============================================================================
// Data types
// ============================================================================

/// Integer element types accepted in a dataset's `dataset.type`.
pub const INT_TYPES: &[&str] = &[
    "byte", "ubyte", "short", "ushort", "int", "uint", "long", "ulong", "int8", "uint8", "int16",
    "uint16", "int32", "uint32", "int64", "uint64",
];

/// Floating-point element types accepted in a dataset's `dataset.type`.
pub const FLOAT_TYPES: &[&str] = &["float", "double", "float32", "float64"];

/// Every numeric element type, integers first.
pub const NUMERIC_TYPES: &[&[&str]] = &[INT_TYPES, FLOAT_TYPES];

/// Case-insensitive membership test against a dtype table.
pub fn dtype_in(dtype: &str, table: &[&str]) -> bool {
    table.iter().any(|known| known.eq_ignore_ascii_case(dtype))
}

pub fn is_int_type(dtype: &str) -> bool {
    dtype_in(dtype, INT_TYPES)
}

pub fn is_float_type(dtype: &str) -> bool {
    dtype_in(dtype, FLOAT_TYPES)
}

pub fn is_numeric_type(dtype: &str) -> bool {
    NUMERIC_TYPES.iter().any(|table| dtype_in(dtype, table))
}
