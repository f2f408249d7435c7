//!
//! # TechLef Data Model
//!

// Std-Lib
use std::collections::HashMap;
use std::path::Path;

// Crates.io Imports
use derive_more::{Add, Sub};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

///
/// # TechLefDecimal
///
/// Internal type alias for all micron-valued data.
/// Uses [rust_decimal](https://crates.io/crates/rust_decimal) internally.
///
pub type TechLefDecimal = rust_decimal::Decimal;

/// # X-Y Spatial Point, in library microns
#[derive(
    Clone, Copy, Default, Debug, Deserialize, Serialize, PartialEq, Eq, Add, Sub,
)]
pub struct TechLefPoint {
    pub x: TechLefDecimal,
    pub y: TechLefDecimal,
}
impl TechLefPoint {
    /// Create a new [TechLefPoint]
    pub fn new(x: impl Into<TechLefDecimal>, y: impl Into<TechLefDecimal>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
        }
    }
}
impl std::fmt::Display for TechLefPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} {}", self.x, self.y)
    }
}

/// # Axis-Aligned Rectangle, in library microns
#[derive(Clone, Copy, Default, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct TechLefRect {
    /// Lower-Left Corner
    pub ll: TechLefPoint,
    /// Upper-Right Corner
    pub ur: TechLefPoint,
}
impl TechLefRect {
    /// Create a new [TechLefRect]
    pub fn new(ll: TechLefPoint, ur: TechLefPoint) -> Self {
        Self { ll, ur }
    }
    /// Geometric center, the midpoint of the two corners
    pub fn center(&self) -> TechLefPoint {
        TechLefPoint {
            x: (self.ll.x + self.ur.x) / Decimal::TWO,
            y: (self.ll.y + self.ur.y) / Decimal::TWO,
        }
    }
    /// Axis-aligned bounding box of a point list
    pub fn bbox_of(points: &[TechLefPoint]) -> Option<Self> {
        let first = points.first()?;
        let (mut ll, mut ur) = (*first, *first);
        for p in points.iter().skip(1) {
            ll.x = ll.x.min(p.x);
            ll.y = ll.y.min(p.y);
            ur.x = ur.x.max(p.x);
            ur.y = ur.y.max(p.y);
        }
        Some(Self { ll, ur })
    }
}

/// # Library Pin Direction
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum PinDirection {
    Input,
    Output,
    Inout,
    FeedThru,
}
impl PinDirection {
    /// Lef Pin Direction parsing, case-insensitive
    pub fn parse(txt: &str) -> Option<Self> {
        match txt.to_ascii_uppercase().as_str() {
            "INPUT" => Some(Self::Input),
            "OUTPUT" => Some(Self::Output),
            "INOUT" => Some(Self::Inout),
            "FEEDTHRU" => Some(Self::FeedThru),
            _ => None,
        }
    }
    /// Single-character direction code, the first letter of the keyword,
    /// as used by benchmark net records
    pub fn code(&self) -> char {
        match self {
            Self::Input | Self::Inout => 'I',
            Self::Output => 'O',
            Self::FeedThru => 'F',
        }
    }
}
impl std::fmt::Display for PinDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            Self::Input => "INPUT",
            Self::Output => "OUTPUT",
            Self::Inout => "INOUT",
            Self::FeedThru => "FEEDTHRU",
        };
        write!(f, "{}", s)
    }
}

/// # Macro Class
///
/// The subset of LEF macro classes the flow distinguishes: standard
/// cells, big blocks, and pads. Sub-type tags (e.g. `BLOCK SOFT`) are
/// accepted and dropped.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum MacroClass {
    Core,
    Block,
    Pad,
}
impl MacroClass {
    /// Macro-class parsing, from the first CLASS keyword
    pub fn parse(txt: &str) -> Option<Self> {
        let up = txt.to_ascii_uppercase();
        if up.starts_with("BLOCK") {
            return Some(Self::Block);
        }
        match up.as_str() {
            "CORE" => Some(Self::Core),
            "PAD" => Some(Self::Pad),
            _ => None,
        }
    }
}

/// # Library Pin
///
/// A named, directed pin with a single bounding rectangle. When a pin's
/// port declares several geometry statements the last one wins.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct TechLefPin {
    /// Pin Name
    pub name: String,
    /// Direction
    pub direction: PinDirection,
    /// Bounding rectangle, from `RECT` or a `POLYGON`'s bounding box
    pub bbox: TechLefRect,
}
impl TechLefPin {
    /// Pin center, in library microns
    pub fn center(&self) -> TechLefPoint {
        self.bbox.center()
    }
}

/// # Macro Footprint
///
/// Rectangular macros are fully described by their outline size.
/// A macro whose `OBS` block declares two or more rectangles is
/// *rectilinear*: its footprint is the rectangle list instead.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum MacroFootprint {
    Rectangular,
    Rectilinear(Vec<TechLefRect>),
}
impl MacroFootprint {
    /// Classify an obstruction-rectangle list
    pub fn from_obstructions(rects: Vec<TechLefRect>) -> Self {
        if rects.len() >= 2 {
            Self::Rectilinear(rects)
        } else {
            Self::Rectangular
        }
    }
    pub fn is_rectilinear(&self) -> bool {
        matches!(self, Self::Rectilinear(_))
    }
}
impl Default for MacroFootprint {
    fn default() -> Self {
        Self::Rectangular
    }
}

/// # Library Macro
///
/// One cell's physical abstract: outline size, class, ordered pins,
/// and the footprint classification above.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct TechLefMacro {
    /// Macro Name
    pub name: String,
    /// Macro Class
    pub class: MacroClass,
    /// Outline Width, in microns
    pub width: TechLefDecimal,
    /// Outline Height, in microns
    pub height: TechLefDecimal,
    /// Pin List, in declaration order
    pub pins: Vec<TechLefPin>,
    /// Footprint
    pub footprint: MacroFootprint,
}
impl TechLefMacro {
    /// Find pin `name`, if declared
    pub fn pin(&self, name: &str) -> Option<&TechLefPin> {
        self.pins.iter().find(|p| p.name == name)
    }
}

/// # Placement Site
///
/// The row granularity unit. Exactly one site definition is supported
/// per library; a second is a fatal parse error.
#[derive(Clone, Default, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct TechLefSite {
    /// Site Name
    pub name: String,
    /// Site Class (e.g. `core`)
    pub class: String,
    /// Symmetry Keywords, as declared
    pub symmetry: Vec<String>,
    /// Width, in microns
    pub width: TechLefDecimal,
    /// Height, in microns
    pub height: TechLefDecimal,
}

/// # Lef Distance Units per Micron
///
/// A constrained numeric type. Allowed values are
/// [100, 200, 400, 800, 1000, 2000, 4000, 8000, 10_000, 20_000].
/// Adherence to this set is checked at construction time.
#[derive(Clone, Copy, Default, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct TechLefDbuPerMicron(pub u32);
impl TechLefDbuPerMicron {
    /// Create a new [TechLefDbuPerMicron], checking internally required conditions
    pub fn try_new(x: TechLefDecimal) -> TechLefResult<Self> {
        if !x.fract().is_zero() {
            return Err("DBU per Micron must be an integer".into());
        }
        // Normalize so declarations like `2000.0` carry no trailing scale
        let x = x.normalize();
        if ![100, 200, 400, 800, 1000, 2000, 4000, 8000, 10_000, 20_000].contains(&x.mantissa()) {
            return Err("Invalid DBU per Micron value".into());
        }
        // The cast is checked by the list membership above
        Ok(Self(x.mantissa() as u32))
    }
    /// Return `self`'s value as an integer
    pub fn value(&self) -> u32 {
        self.0
    }
}

/// # Cell Library
///
/// The parse product: technology metadata, the layer pitch table,
/// the single placement site, and the macro list.
#[derive(Clone, Default, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct TechLefLibrary {
    /// Lef Spec Version
    pub version: Option<TechLefDecimal>,
    /// Bus-Bit Separator Characters
    pub bus_bit_chars: Option<(char, char)>,
    /// Divider Character
    pub divider_char: Option<char>,
    /// Database Units per Micron
    pub dbu_per_micron: Option<TechLefDbuPerMicron>,
    /// Manufacturing Grid, in microns
    pub manufacturing_grid: Option<TechLefDecimal>,
    /// Routing pitch per layer name
    pub layer_pitches: HashMap<String, TechLefDecimal>,
    /// The Placement Site
    pub site: TechLefSite,
    /// Macro Definitions, in declaration order
    pub macros: Vec<TechLefMacro>,
}
impl TechLefLibrary {
    /// Open a [TechLefLibrary] from file `fname`
    pub fn open(fname: impl AsRef<Path>) -> TechLefResult<TechLefLibrary> {
        super::read::parse_file(fname)
    }
    /// Find macro `name`, if declared
    pub fn find_macro(&self, name: &str) -> Option<&TechLefMacro> {
        self.macros.iter().find(|m| m.name == name)
    }
    /// Routing pitch of layer `name`. Fatal when the layer has no
    /// recorded pitch.
    pub fn pitch(&self, name: &str) -> TechLefResult<TechLefDecimal> {
        match self.layer_pitches.get(name) {
            Some(p) => Ok(*p),
            None => Err(TechLefError::Str(format!(
                "layer {} has no recorded pitch",
                name
            ))),
        }
    }
}

use super::read::{ParserState, TechLefParseErrorType};

/// # TechLef Error Enumeration
#[derive(Debug)]
pub enum TechLefError {
    /// Lexer Errors
    Lex {
        next_char: Option<char>,
        line: usize,
        pos: usize,
    },
    /// Parser Errors
    Parse {
        msg: Option<String>,
        tp: TechLefParseErrorType,
        state: ParserState,
    },
    /// Wrapped errors, generally from other crates
    Boxed(Box<dyn std::error::Error>),
    /// String message-valued errors
    Str(String),
}
impl From<std::io::Error> for TechLefError {
    fn from(e: std::io::Error) -> Self {
        Self::Boxed(Box::new(e))
    }
}
impl From<rust_decimal::Error> for TechLefError {
    fn from(e: rust_decimal::Error) -> Self {
        Self::Boxed(Box::new(e))
    }
}
impl From<String> for TechLefError {
    /// Convert string-based errors by wrapping them
    fn from(e: String) -> Self {
        Self::Str(e)
    }
}
impl From<&str> for TechLefError {
    /// Convert string-based errors by wrapping them
    fn from(e: &str) -> Self {
        Self::Str(e.into())
    }
}
impl std::fmt::Display for TechLefError {
    /// Delegates to the [Debug] implementation
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        std::fmt::Debug::fmt(self, f)
    }
}
impl std::error::Error for TechLefError {}

/// TechLef21 Library-Wide Result Type
pub type TechLefResult<T> = Result<T, TechLefError>;
