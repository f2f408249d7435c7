//!
//! # Bookshelf21 Placement-Benchmark Translation
//!
//! The central translation layer of the suite. Cross-references a
//! [vlog21::VlogModule] netlist against a [techlef21::TechLefLibrary]
//! and (optionally) a [def21::DefDesign] floorplan, converts between
//! the three coordinate systems involved, emits the row-based placement
//! benchmark file set (`.nodes/.nets/.wts/.pl/.scl/.shapes/.aux`), and
//! regenerates a layout from benchmark placement results.
//!

// Internal modules & re-exports
pub mod def;
pub mod design;
pub mod read;
pub mod units;
pub mod write;

#[cfg(test)]
mod tests;

pub use def::*;
pub use design::*;
pub use read::*;
pub use units::*;
pub use write::*;

// Re-export the format crates
pub use def21;
pub use techlef21;
pub use vlog21;

/// Bookshelf21 Library-Wide Result Type
pub type ShelfResult<T> = Result<T, ShelfError>;

///
/// # Bookshelf Error Enumeration
///
#[derive(Debug)]
pub enum ShelfError {
    /// Cross-document resolution failure: netlist, library, and layout
    /// naming that does not line up
    Linkage { message: String },
    /// Netlist Errors
    Vlog(vlog21::VlogError),
    /// Library Errors
    TechLef(techlef21::TechLefError),
    /// Layout Errors
    Def(def21::DefError),
    /// Boxed External Errors
    Boxed(Box<dyn std::error::Error>),
    /// Uncategorized Error with Message
    Str(String),
}
impl ShelfError {
    /// Create a [ShelfError::Linkage] from anything String-convertible
    pub fn linkage(message: impl Into<String>) -> Self {
        Self::Linkage {
            message: message.into(),
        }
    }
}
impl From<vlog21::VlogError> for ShelfError {
    fn from(e: vlog21::VlogError) -> Self {
        Self::Vlog(e)
    }
}
impl From<techlef21::TechLefError> for ShelfError {
    fn from(e: techlef21::TechLefError) -> Self {
        Self::TechLef(e)
    }
}
impl From<def21::DefError> for ShelfError {
    fn from(e: def21::DefError) -> Self {
        Self::Def(e)
    }
}
impl From<std::io::Error> for ShelfError {
    fn from(e: std::io::Error) -> Self {
        Self::Boxed(Box::new(e))
    }
}
impl From<rust_decimal::Error> for ShelfError {
    fn from(e: rust_decimal::Error) -> Self {
        Self::Boxed(Box::new(e))
    }
}
impl From<String> for ShelfError {
    fn from(e: String) -> Self {
        Self::Str(e)
    }
}
impl From<&str> for ShelfError {
    fn from(e: &str) -> Self {
        Self::Str(e.to_string())
    }
}
impl std::fmt::Display for ShelfError {
    /// Delegates to the [Debug] implementation
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}
impl std::error::Error for ShelfError {}
