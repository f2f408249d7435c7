//!
//! # TechLef21 Cell-Library Geometry Parser
//!
//! Reads the contest-style LEF subset: one placement site, a layer
//! pitch table, and macro outlines with pin geometry and obstructions.
//!

pub mod data;
pub mod read;

#[cfg(test)]
mod tests;

pub use data::*;
