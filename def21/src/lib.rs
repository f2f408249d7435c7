//!
//! # Def21 Placement Layout Reader & Writer
//!
//! Reads the contest-style DEF subset (units, rows, placed components,
//! placed pins) into a [DefDesign], and writes designs back out.
//!

pub mod data;
pub mod read;
pub mod write;

#[cfg(test)]
mod tests;

pub use data::*;
