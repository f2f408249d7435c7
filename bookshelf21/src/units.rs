//!
//! # Coordinate Transform Module
//!
//! Three unit systems meet here: library microns (as scaled by the
//! library's `DATABASE MICRONS` declaration), the metal-pitch track grid
//! of the benchmark format, and layout database units. [GridScale] is
//! the explicit conversion context threaded through every writer and
//! importer; both translation directions must use the same instance or
//! they will not round-trip.
//!
//! Sizes divide by a pitch and round up; positions divide by
//! pitch-times-DBU and round to nearest; pin offsets stay fractional.
//!

// Crates.io Imports
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// Crate Imports
use crate::{ShelfError, ShelfResult};
use techlef21::TechLefLibrary;

/// Default layer whose pitch scales widths and x-positions
pub const DEFAULT_WIDTH_LAYER: &str = "metal2";
/// Default layer whose pitch scales heights and y-positions
pub const DEFAULT_HEIGHT_LAYER: &str = "metal1";

/// # Pitch-Layer Selection
///
/// Names the two routing layers whose pitches become the horizontal and
/// vertical grid divisors. This is a per-technology convention, not a
/// constant, so it is caller-supplied configuration.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct PitchLayers {
    /// Width / x-position divisor layer
    pub width_layer: String,
    /// Height / y-position divisor layer
    pub height_layer: String,
}
impl PitchLayers {
    /// Create a new [PitchLayers] selection
    pub fn new(width_layer: impl Into<String>, height_layer: impl Into<String>) -> Self {
        Self {
            width_layer: width_layer.into(),
            height_layer: height_layer.into(),
        }
    }
}
impl Default for PitchLayers {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH_LAYER, DEFAULT_HEIGHT_LAYER)
    }
}

/// # Grid Conversion Context
///
/// The two pitch divisors and the database-unit scale, captured once per
/// run from the parsed library.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct GridScale {
    /// Width divisor: the horizontal layer's routing pitch, in microns
    pub width_pitch: Decimal,
    /// Height divisor: the vertical layer's routing pitch, in microns
    pub height_pitch: Decimal,
    /// Database units per micron
    pub dbu_per_micron: u32,
}
impl GridScale {
    /// Capture a [GridScale] from library `lib` using the `layers`
    /// selection. Fatal when a named layer has no recorded pitch or the
    /// library declares no unit scale.
    pub fn from_library(lib: &TechLefLibrary, layers: &PitchLayers) -> ShelfResult<Self> {
        let width_pitch = lib.pitch(&layers.width_layer)?;
        let height_pitch = lib.pitch(&layers.height_layer)?;
        if width_pitch <= Decimal::ZERO || height_pitch <= Decimal::ZERO {
            return Err(ShelfError::Str("non-positive layer pitch".into()));
        }
        let dbu_per_micron = match lib.dbu_per_micron {
            Some(d) => d.value(),
            None => {
                return Err(ShelfError::Str(
                    "library declares no DATABASE MICRONS scale".into(),
                ))
            }
        };
        Ok(Self {
            width_pitch,
            height_pitch,
            dbu_per_micron,
        })
    }
    /// Database units per micron, as a [Decimal]
    fn dbu(&self) -> Decimal {
        Decimal::from(self.dbu_per_micron)
    }
    /// Width in microns to track units, fractional
    pub fn width_tracks(&self, microns: Decimal) -> Decimal {
        microns / self.width_pitch
    }
    /// Height in microns to track units, fractional
    pub fn height_tracks(&self, microns: Decimal) -> Decimal {
        microns / self.height_pitch
    }
    /// Width in microns to grid units, rounded up
    pub fn width_to_grid(&self, microns: Decimal) -> ShelfResult<isize> {
        to_grid_int(self.width_tracks(microns).ceil())
    }
    /// Height in microns to grid units, rounded up
    pub fn height_to_grid(&self, microns: Decimal) -> ShelfResult<isize> {
        to_grid_int(self.height_tracks(microns).ceil())
    }
    /// X-position in database units to grid units, rounded to nearest
    pub fn x_to_grid(&self, dbu: Decimal) -> ShelfResult<isize> {
        to_grid_int((dbu / (self.width_pitch * self.dbu())).round())
    }
    /// Y-position in database units to grid units, rounded to nearest
    pub fn y_to_grid(&self, dbu: Decimal) -> ShelfResult<isize> {
        to_grid_int((dbu / (self.height_pitch * self.dbu())).round())
    }
    /// X-extent in (possibly fractional) grid units back to database units
    pub fn x_to_dbu(&self, tracks: Decimal) -> Decimal {
        tracks * self.width_pitch * self.dbu()
    }
    /// Y-extent in (possibly fractional) grid units back to database units
    pub fn y_to_dbu(&self, tracks: Decimal) -> Decimal {
        tracks * self.height_pitch * self.dbu()
    }
}
/// Convert a rounded [Decimal] into the integer grid domain
fn to_grid_int(d: Decimal) -> ShelfResult<isize> {
    match d.to_i64() {
        Some(v) => Ok(v as isize),
        None => Err(ShelfError::Str(format!(
            "grid value {} exceeds the integer coordinate range",
            d
        ))),
    }
}
