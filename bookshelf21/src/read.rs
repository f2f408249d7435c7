//!
//! # Bookshelf Reading Module
//!
//! Line-cursor parsers for the benchmark files the reverse translation
//! consumes: the `.aux` manifest, `.nodes` sizes and terminal tags,
//! `.scl` rows, and `.pl` placements. Each section parser takes the
//! cursor, returns its records, and checks declared counts against
//! collected ones.
//!

// Std-Lib
use std::io::Read;
use std::path::{Path, PathBuf};
#[allow(unused_imports)]
use std::str::FromStr;

// Crates.io Imports
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// Crate Imports
use crate::{ShelfError, ShelfResult};

/// # Aux Manifest
///
/// The three member files the layout regeneration needs, resolved
/// against the manifest's own directory.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AuxFiles {
    pub nodes: PathBuf,
    pub pl: PathBuf,
    pub scl: PathBuf,
}

/// One `.nodes` record
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct NodeEntry {
    pub name: String,
    pub width: Decimal,
    pub height: Decimal,
    pub terminal: bool,
}

/// One `.scl` `CoreRow` record, in grid units
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct SclRow {
    pub coordinate: Decimal,
    pub height: Decimal,
    pub site_width: Decimal,
    pub site_spacing: Decimal,
    pub site_orient: String,
    pub site_symmetry: String,
    pub subrow_origin: Decimal,
    pub num_sites: isize,
}

/// One `.pl` record, in (possibly fractional) grid units
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct PlEntry {
    pub name: String,
    pub x: Decimal,
    pub y: Decimal,
    pub orient: String,
    pub fixed: bool,
}

/// Read file `fname` into a string
fn read_file(fname: impl AsRef<Path>) -> ShelfResult<String> {
    let mut file = std::fs::File::open(fname)?;
    let mut src = String::new();
    file.read_to_string(&mut src)?;
    Ok(src)
}

/// Parse the `.aux` manifest at `fname`, resolving the member files it
/// names against the manifest's directory
pub fn parse_aux_file(fname: impl AsRef<Path>) -> ShelfResult<AuxFiles> {
    let fname = fname.as_ref();
    let base_dir = fname.parent().unwrap_or_else(|| Path::new("."));
    let src = read_file(fname)?;
    parse_aux(&src, base_dir)
}
/// Parse `.aux` content `src`, resolving member files against `base_dir`
pub fn parse_aux(src: &str, base_dir: &Path) -> ShelfResult<AuxFiles> {
    let (mut nodes, mut pl, mut scl) = (None, None, None);
    for token in src.split_whitespace() {
        if token.ends_with(".nodes") {
            nodes = Some(base_dir.join(token));
        } else if token.ends_with(".pl") {
            pl = Some(base_dir.join(token));
        } else if token.ends_with(".scl") {
            scl = Some(base_dir.join(token));
        }
    }
    match (nodes, pl, scl) {
        (Some(nodes), Some(pl), Some(scl)) => Ok(AuxFiles { nodes, pl, scl }),
        _ => Err(ShelfError::Str(
            "invalid aux file: missing .nodes, .pl, or .scl member".into(),
        )),
    }
}

/// Content lines of a benchmark file: trimmed, non-blank, non-comment,
/// with the version-header line dropped
fn content_lines(src: &str) -> Vec<&str> {
    src.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .skip(1)
        .collect()
}
/// Parse a [Decimal]-valued field
fn parse_decimal(txt: &str, what: &str) -> ShelfResult<Decimal> {
    Decimal::from_str(txt).map_err(|_| ShelfError::Str(format!("invalid {}: {}", what, txt)))
}
/// Parse an integer-valued field
fn parse_int(txt: &str, what: &str) -> ShelfResult<isize> {
    txt.parse::<isize>()
        .map_err(|_| ShelfError::Str(format!("invalid {}: {}", what, txt)))
}

/// Parse `.nodes` file `fname`
pub fn parse_nodes_file(fname: impl AsRef<Path>) -> ShelfResult<Vec<NodeEntry>> {
    parse_nodes(&read_file(fname)?)
}
/// Parse `.nodes` content `src`.
/// Declared `NumNodes`/`NumTerminals` counts are checked when present.
pub fn parse_nodes(src: &str) -> ShelfResult<Vec<NodeEntry>> {
    let mut entries = Vec::new();
    let (mut num_nodes, mut num_terminals) = (None, None);
    for line in content_lines(src) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            ["NumNodes", ":", n] => num_nodes = Some(parse_int(n, "NumNodes")? as usize),
            ["NumTerminals", ":", n] => {
                num_terminals = Some(parse_int(n, "NumTerminals")? as usize)
            }
            [name, w, h] => entries.push(NodeEntry {
                name: name.to_string(),
                width: parse_decimal(w, "node width")?,
                height: parse_decimal(h, "node height")?,
                terminal: false,
            }),
            [name, w, h, "terminal"] => entries.push(NodeEntry {
                name: name.to_string(),
                width: parse_decimal(w, "node width")?,
                height: parse_decimal(h, "node height")?,
                terminal: true,
            }),
            _ => return Err(ShelfError::Str(format!("invalid nodes record: {}", line))),
        }
    }
    if let Some(n) = num_nodes {
        if n != entries.len() {
            return Err(ShelfError::Str(format!(
                "NumNodes is {} but {} records were found",
                n,
                entries.len()
            )));
        }
    }
    if let Some(n) = num_terminals {
        let terminals = entries.iter().filter(|e| e.terminal).count();
        if n != terminals {
            return Err(ShelfError::Str(format!(
                "NumTerminals is {} but {} terminal records were found",
                n, terminals
            )));
        }
    }
    Ok(entries)
}

/// Parse `.scl` file `fname`
pub fn parse_scl_file(fname: impl AsRef<Path>) -> ShelfResult<Vec<SclRow>> {
    parse_scl(&read_file(fname)?)
}
/// Parse `.scl` content `src`. Only `CoreRow Horizontal` records are
/// supported; the declared `NumRows` count must match.
pub fn parse_scl(src: &str) -> ShelfResult<Vec<SclRow>> {
    let lines = content_lines(src);
    let mut rows = Vec::new();
    let mut declared = None;
    let mut cursor = lines.iter();
    while let Some(line) = cursor.next() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            ["NumRows", ":", n] => declared = Some(parse_int(n, "NumRows")? as usize),
            ["CoreRow", kind] => {
                if *kind != "Horizontal" {
                    return Err(ShelfError::Str(format!(
                        "unsupported scl row direction: {}",
                        kind
                    )));
                }
                rows.push(parse_scl_row(&mut cursor)?);
            }
            _ => return Err(ShelfError::Str(format!("invalid scl record: {}", line))),
        }
    }
    if let Some(n) = declared {
        if n != rows.len() {
            return Err(ShelfError::Str(format!(
                "NumRows is {} but {} rows were found",
                n,
                rows.len()
            )));
        }
    }
    Ok(rows)
}
/// Parse the body of one `CoreRow` block, through its `End` line
fn parse_scl_row<'a>(cursor: &mut std::slice::Iter<'a, &'a str>) -> ShelfResult<SclRow> {
    let mut coordinate = None;
    let mut height = None;
    let mut site_width = None;
    let mut site_spacing = None;
    let mut site_orient = None;
    let mut site_symmetry = None;
    let mut subrow_origin = None;
    let mut num_sites = None;
    for line in cursor {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            ["End"] => break,
            ["Coordinate", ":", v] => coordinate = Some(parse_decimal(v, "Coordinate")?),
            ["Height", ":", v] => height = Some(parse_decimal(v, "Height")?),
            ["Sitewidth", ":", v] => site_width = Some(parse_decimal(v, "Sitewidth")?),
            ["Sitespacing", ":", v] => site_spacing = Some(parse_decimal(v, "Sitespacing")?),
            ["Siteorient", ":", v] => site_orient = Some(v.to_string()),
            ["Sitesymmetry", ":", v] => site_symmetry = Some(v.to_string()),
            ["SubrowOrigin", ":", v, "NumSites", ":", n] => {
                subrow_origin = Some(parse_decimal(v, "SubrowOrigin")?);
                num_sites = Some(parse_int(n, "NumSites")?);
            }
            _ => return Err(ShelfError::Str(format!("invalid scl row field: {}", line))),
        }
    }
    let require = |what: &str| ShelfError::Str(format!("scl row is missing {}", what));
    Ok(SclRow {
        coordinate: coordinate.ok_or_else(|| require("Coordinate"))?,
        height: height.ok_or_else(|| require("Height"))?,
        site_width: site_width.ok_or_else(|| require("Sitewidth"))?,
        site_spacing: site_spacing.ok_or_else(|| require("Sitespacing"))?,
        site_orient: site_orient.ok_or_else(|| require("Siteorient"))?,
        site_symmetry: site_symmetry.ok_or_else(|| require("Sitesymmetry"))?,
        subrow_origin: subrow_origin.ok_or_else(|| require("SubrowOrigin"))?,
        num_sites: num_sites.ok_or_else(|| require("NumSites"))?,
    })
}

/// Parse `.pl` file `fname`
pub fn parse_pl_file(fname: impl AsRef<Path>) -> ShelfResult<Vec<PlEntry>> {
    parse_pl(&read_file(fname)?)
}
/// Parse `.pl` content `src`
pub fn parse_pl(src: &str) -> ShelfResult<Vec<PlEntry>> {
    let mut entries = Vec::new();
    for line in content_lines(src) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 5 || tokens[3] != ":" {
            return Err(ShelfError::Str(format!("invalid pl record: {}", line)));
        }
        entries.push(PlEntry {
            name: tokens[0].to_string(),
            x: parse_decimal(tokens[1], "pl x")?,
            y: parse_decimal(tokens[2], "pl y")?,
            orient: tokens[4].to_string(),
            fixed: tokens.get(5) == Some(&"/FIXED"),
        });
    }
    Ok(entries)
}
