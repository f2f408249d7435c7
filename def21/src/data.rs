//!
//! # Def Data Model
//!

// Std-Lib
use std::collections::HashMap;
use std::path::Path;
#[allow(unused_imports)]
use std::str::FromStr;

// Crates.io Imports
use derive_more::{Add, Sub};
use once_cell::sync::Lazy;
#[allow(unused_imports)]
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

///
/// # DefDecimal
///
/// Internal type alias for all DBU-valued data.
/// Uses [rust_decimal](https://crates.io/crates/rust_decimal) internally.
///
pub type DefDecimal = rust_decimal::Decimal;

/// The DEF spec-version written by [super::write]
pub(crate) static V5P7: Lazy<DefDecimal> = Lazy::new(|| DefDecimal::from_str("5.7").unwrap());

/// # X-Y Spatial Point, in database units
#[derive(Clone, Copy, Default, Debug, Deserialize, Serialize, PartialEq, Eq, Add, Sub)]
pub struct DefPoint {
    pub x: DefDecimal,
    pub y: DefDecimal,
}
impl DefPoint {
    /// Create a new [DefPoint]
    pub fn new(x: impl Into<DefDecimal>, y: impl Into<DefDecimal>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
        }
    }
}
impl std::fmt::Display for DefPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "( {} {} )", self.x, self.y)
    }
}

/// # Placement Orientation
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum DefOrient {
    N,
    S,
    E,
    W,
    FN,
    FS,
    FE,
    FW,
}
impl DefOrient {
    /// Orientation parsing, case-sensitive per the DEF convention
    pub fn parse(txt: &str) -> Option<Self> {
        match txt {
            "N" => Some(Self::N),
            "S" => Some(Self::S),
            "E" => Some(Self::E),
            "W" => Some(Self::W),
            "FN" => Some(Self::FN),
            "FS" => Some(Self::FS),
            "FE" => Some(Self::FE),
            "FW" => Some(Self::FW),
            _ => None,
        }
    }
}
impl Default for DefOrient {
    fn default() -> Self {
        Self::N
    }
}
impl std::fmt::Display for DefOrient {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            Self::N => "N",
            Self::S => "S",
            Self::E => "E",
            Self::W => "W",
            Self::FN => "FN",
            Self::FS => "FS",
            Self::FE => "FE",
            Self::FW => "FW",
        };
        write!(f, "{}", s)
    }
}

/// # Placement Row
///
/// `ROW <name> <site> <x> <y> <orient> DO <m> BY <n> STEP <dx> <dy> ;`
#[derive(Clone, Default, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct DefRow {
    /// Row Name
    pub name: String,
    /// Referenced Site Name
    pub site: String,
    /// Origin, in database units
    pub origin: DefPoint,
    /// Orientation
    pub orient: DefOrient,
    /// Repetition count along x (`DO`)
    pub num_x: isize,
    /// Repetition count along y (`BY`)
    pub num_y: isize,
    /// Site step, in database units (`STEP`)
    pub step: DefPoint,
}

/// # Placed Component
#[derive(Clone, Default, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct DefComponent {
    /// Instance Name
    pub name: String,
    /// Gate (Macro) Type Name
    pub macro_name: String,
    /// Fixed-vs-movable flag
    pub fixed: bool,
    /// Location, in database units
    pub location: DefPoint,
    /// Orientation
    pub orient: DefOrient,
}

/// # Placed Top-Level Pin
///
/// I/O pins are always written `FIXED`.
#[derive(Clone, Default, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct DefPin {
    /// Pin Name
    pub name: String,
    /// Connected Net Name
    pub net: String,
    /// Direction keyword (`INPUT` / `OUTPUT`)
    pub direction: String,
    /// Fixed-vs-movable flag
    pub fixed: bool,
    /// Location, in database units
    pub location: DefPoint,
    /// Orientation
    pub orient: DefOrient,
    /// Physical pin geometry: layer name and rectangle corners
    pub layer: Option<DefPinLayer>,
}

/// Pin `LAYER` attribute: the layer name and rectangle corners
#[derive(Clone, Default, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct DefPinLayer {
    pub layer_name: String,
    pub ll: DefPoint,
    pub ur: DefPoint,
}

/// # Def Design
///
/// The parse/emission product: units, rows, placed components, and
/// placed pins.
#[derive(Clone, Default, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct DefDesign {
    /// Design Name
    pub name: String,
    /// Spec Version
    pub version: Option<DefDecimal>,
    /// Divider Character
    pub divider_char: Option<char>,
    /// Bus-Bit Separator Characters
    pub bus_bit_chars: Option<(char, char)>,
    /// Database Units per Micron
    pub dbu_per_micron: u32,
    /// Die-Area corners, in database units
    pub die_area: Option<(DefPoint, DefPoint)>,
    /// Placement Rows
    pub rows: Vec<DefRow>,
    /// Placed Components
    pub components: Vec<DefComponent>,
    /// Placed Pins
    pub pins: Vec<DefPin>,
}
impl DefDesign {
    /// Open a [DefDesign] from file `fname`
    pub fn open(fname: impl AsRef<Path>) -> DefResult<DefDesign> {
        super::read::parse_file(fname)
    }
    /// Write `self` to file `fname`
    pub fn save(&self, fname: impl AsRef<Path>) -> DefResult<()> {
        super::write::save(self, fname)
    }
    /// Write `self` to a DEF-format [String]
    pub fn to_def_string(&self) -> DefResult<String> {
        super::write::to_string(self)
    }
    /// Component lookup table, keyed by instance name
    pub fn components_by_name(&self) -> HashMap<&str, &DefComponent> {
        self.components
            .iter()
            .map(|c| (c.name.as_str(), c))
            .collect()
    }
    /// Pin lookup table, keyed by pin name
    pub fn pins_by_name(&self) -> HashMap<&str, &DefPin> {
        self.pins.iter().map(|p| (p.name.as_str(), p)).collect()
    }
}

use super::read::{DefParseErrorType, ParserState};

/// # Def Error Enumeration
#[derive(Debug)]
pub enum DefError {
    /// Lexer Errors
    Lex {
        next_char: Option<char>,
        line: usize,
        pos: usize,
    },
    /// Parser Errors
    Parse {
        msg: Option<String>,
        tp: DefParseErrorType,
        state: ParserState,
    },
    /// Wrapped errors, generally from other crates
    Boxed(Box<dyn std::error::Error>),
    /// String message-valued errors
    Str(String),
}
impl From<std::io::Error> for DefError {
    fn from(e: std::io::Error) -> Self {
        Self::Boxed(Box::new(e))
    }
}
impl From<rust_decimal::Error> for DefError {
    fn from(e: rust_decimal::Error) -> Self {
        Self::Boxed(Box::new(e))
    }
}
impl From<String> for DefError {
    /// Convert string-based errors by wrapping them
    fn from(e: String) -> Self {
        Self::Str(e)
    }
}
impl From<&str> for DefError {
    /// Convert string-based errors by wrapping them
    fn from(e: &str) -> Self {
        Self::Str(e.into())
    }
}
impl std::fmt::Display for DefError {
    /// Delegates to the [Debug] implementation
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        std::fmt::Debug::fmt(self, f)
    }
}
impl std::error::Error for DefError {}

/// Def21 Library-Wide Result Type
pub type DefResult<T> = Result<T, DefError>;
