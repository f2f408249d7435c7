//!
//! # Bookshelf Writer Module
//!
//! Emits the seven benchmark files from a linked [ShelfDesign]. With a
//! layout input, rows and coordinates are carried over; without one,
//! rows and perimeter port positions are synthesized from the target
//! utilization. Files are written and closed one at a time, in the
//! fixed order nodes, nets, wts, scl, pl, shapes, aux.
//!

// Std-Lib
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

// Crates.io Imports
use log::info;
use rust_decimal::prelude::ToPrimitive;

// Crate Imports
use crate::design::{perimeter_positions, NetPinRecord, ShelfDesign, ShelfNodeKind};
use crate::{ShelfError, ShelfResult};
use def21::{DefComponent, DefPin};
use techlef21::MacroFootprint;

/// Two comment lines carried in most benchmark file headers
const HEADER_COMMENT: &str = "# File header with version information, etc.\n\
     # Anything following \"#\" is a comment, and should be ignored\n";

/// Write the whole benchmark file set with path and name prefix `dest`:
/// `dest.nodes`, `dest.nets`, and so on, plus the `dest.aux` manifest.
pub fn save_all(design: &ShelfDesign, dest: &str) -> ShelfResult<()> {
    let base = match Path::new(dest).file_name() {
        Some(stem) => stem.to_string_lossy().into_owned(),
        None => return Err(ShelfError::Str(format!("invalid output base {}", dest))),
    };
    info!("writing nodes");
    write_nodes(design, &mut create(dest, "nodes")?)?;
    info!("writing nets");
    write_nets(design, &mut create(dest, "nets")?)?;
    info!("writing wts");
    write_wts(design, &mut create(dest, "wts")?)?;
    info!("writing scl");
    write_scl(design, &mut create(dest, "scl")?)?;
    info!("writing pl");
    write_pl(design, &mut create(dest, "pl")?)?;
    info!("writing shapes");
    write_shapes(design, &mut create(dest, "shapes")?)?;
    info!("writing aux");
    write_aux(&base, &mut create(dest, "aux")?)?;
    Ok(())
}
/// Open `base.ext` for writing
fn create(base: &str, ext: &str) -> ShelfResult<std::fs::File> {
    Ok(std::fs::File::create(format!("{}.{}", base, ext))?)
}

/// Write the `.nodes` file: every instance sized on the grid, every
/// port as a 1x1 terminal.
pub fn write_nodes(design: &ShelfDesign, dest: &mut impl Write) -> ShelfResult<()> {
    writeln!(dest, "UCLA nodes 1.0")?;
    writeln!(dest, "{}", HEADER_COMMENT)?;
    writeln!(dest, "NumNodes\t:\t{}", design.nodes().len())?;
    writeln!(dest, "NumTerminals\t:\t{}\n", design.num_terminals())?;
    for node in design.nodes() {
        match node.kind {
            ShelfNodeKind::Cell => {
                writeln!(
                    dest,
                    "{:<40} {:>15} {:>15}",
                    node.name, node.width, node.height
                )?;
            }
            ShelfNodeKind::Block => {
                if node.fixed {
                    writeln!(
                        dest,
                        "{:<40} {:>15} {:>15} {:>15}",
                        node.name, node.width, node.height, "terminal"
                    )?;
                } else {
                    writeln!(
                        dest,
                        "{:<40} {:>15} {:>15}",
                        node.name, node.width, node.height
                    )?;
                }
            }
            ShelfNodeKind::Terminal => {
                writeln!(
                    dest,
                    "{:<40} {:>15} {:>15} {:>15}",
                    node.name, node.width, node.height, "terminal"
                )?;
            }
        }
    }
    dest.flush()?;
    Ok(())
}

/// Write the `.nets` file. The clock net is excluded entirely.
pub fn write_nets(design: &ShelfDesign, dest: &mut impl Write) -> ShelfResult<()> {
    let records = design.net_records()?;
    let num_pins: usize = records.values().map(Vec::len).sum();
    writeln!(dest, "UCLA nets 1.0")?;
    writeln!(dest, "{}", HEADER_COMMENT)?;
    writeln!(dest, "NumNets\t:\t{}", records.len())?;
    writeln!(dest, "NumPins\t:\t{}", num_pins)?;
    for (net, pins) in records.iter() {
        writeln!(dest, "NetDegree : {}  {}", pins.len(), net)?;
        for NetPinRecord {
            node,
            direction,
            dx,
            dy,
        } in pins.iter()
        {
            writeln!(
                dest,
                "        {}  {} : {:>11.4} {:>11.4}",
                node,
                direction,
                dx.to_f64().unwrap_or_default(),
                dy.to_f64().unwrap_or_default()
            )?;
        }
    }
    dest.flush()?;
    Ok(())
}

/// Write the `.wts` file: uniform weight one per net, ports first,
/// each name group sorted.
pub fn write_wts(design: &ShelfDesign, dest: &mut impl Write) -> ShelfResult<()> {
    writeln!(dest, "UCLA wts 1.0")?;
    writeln!(dest, "{}", HEADER_COMMENT)?;
    let clock = design.clock_net();
    let mut inputs: Vec<&str> = design
        .module
        .inputs()
        .map(|p| p.name.as_str())
        .filter(|n| Some(*n) != clock)
        .collect();
    let mut outputs: Vec<&str> = design.module.outputs().map(|p| p.name.as_str()).collect();
    let mut wires: Vec<&str> = design.module.wires.iter().map(String::as_str).collect();
    inputs.sort_unstable();
    outputs.sort_unstable();
    wires.sort_unstable();
    for net in inputs.into_iter().chain(outputs).chain(wires) {
        writeln!(dest, "{} {}", net, 1)?;
    }
    dest.flush()?;
    Ok(())
}

/// Write the `.scl` file: rows carried over from the layout when one
/// was imported, synthesized from the utilization target otherwise.
pub fn write_scl(design: &ShelfDesign, dest: &mut impl Write) -> ShelfResult<()> {
    writeln!(dest, "UCLA scl 1.0\n")?;
    match design.placement {
        Some(def) => {
            writeln!(dest, "NumRows : {}\n", def.rows.len())?;
            let site_width = design.scale.width_to_grid(design.lib.site.width)?;
            let site_height = design.scale.height_to_grid(design.lib.site.height)?;
            for row in def.rows.iter() {
                let spacing = design.scale.x_to_grid(row.step.x)?;
                if spacing != site_width {
                    return Err(ShelfError::linkage(format!(
                        "row {} site step {} differs from the site width {}",
                        row.name, spacing, site_width
                    )));
                }
                write_row(
                    dest,
                    design.scale.y_to_grid(row.origin.y)?,
                    site_height,
                    site_width,
                    spacing,
                    design.scale.x_to_grid(row.origin.x)?,
                    row.num_x,
                )?;
            }
        }
        None => {
            let die = design.synthesize_die()?;
            writeln!(dest, "NumRows : {}\n", die.num_rows)?;
            for i in 0..die.num_rows {
                write_row(
                    dest,
                    i * die.site_height,
                    die.site_height,
                    die.site_width,
                    die.site_width,
                    0,
                    die.row_length,
                )?;
            }
        }
    }
    dest.flush()?;
    Ok(())
}
/// Write one `CoreRow` record
fn write_row(
    dest: &mut impl Write,
    coordinate: isize,
    height: isize,
    site_width: isize,
    site_spacing: isize,
    subrow_origin: isize,
    num_sites: isize,
) -> ShelfResult<()> {
    writeln!(dest, "CoreRow Horizontal")?;
    writeln!(dest, "    Coordinate     : {}", coordinate)?;
    writeln!(dest, "    Height         : {}", height)?;
    writeln!(dest, "    Sitewidth      : {}", site_width)?;
    writeln!(dest, "    Sitespacing    : {}", site_spacing)?;
    writeln!(dest, "    Siteorient     : N")?;
    writeln!(dest, "    Sitesymmetry   : Y")?;
    writeln!(
        dest,
        "    SubrowOrigin   : {}        NumSites : {}",
        subrow_origin, num_sites
    )?;
    writeln!(dest, "End")?;
    Ok(())
}

/// Write the `.pl` file: imported coordinates when a layout exists,
/// otherwise zeros for movable nodes and synthesized perimeter
/// positions for the port terminals.
pub fn write_pl(design: &ShelfDesign, dest: &mut impl Write) -> ShelfResult<()> {
    writeln!(dest, "UCLA pl 1.0\n")?;
    match design.placement {
        Some(def) => write_pl_imported(design, def, dest),
        None => write_pl_synthesized(design, dest),
    }
}
fn write_pl_imported(
    design: &ShelfDesign,
    def: &def21::DefDesign,
    dest: &mut impl Write,
) -> ShelfResult<()> {
    let components: HashMap<&str, &DefComponent> = def.components_by_name();
    for node in design.nodes() {
        match node.kind {
            ShelfNodeKind::Terminal => continue, // Ports follow, from the layout's pin list
            ShelfNodeKind::Cell | ShelfNodeKind::Block => {
                match components.get(node.name.as_str()) {
                    Some(comp) => {
                        let x = design.scale.x_to_grid(comp.location.x)?;
                        let y = design.scale.y_to_grid(comp.location.y)?;
                        if node.fixed {
                            writeln!(dest, "{}\t{}\t{}\t: N /FIXED", node.name, x, y)?;
                        } else {
                            writeln!(dest, "{}\t{}\t{}\t: N", node.name, x, y)?;
                        }
                    }
                    None => writeln!(dest, "{}\t{}\t{}\t: N", node.name, 0, 0)?,
                }
            }
        }
    }
    // I/O pin placement, always fixed
    let mut pins: Vec<&DefPin> = def.pins.iter().collect();
    pins.sort_by(|a, b| a.name.cmp(&b.name));
    for pin in pins {
        let x = design.scale.x_to_grid(pin.location.x)?;
        let y = design.scale.y_to_grid(pin.location.y)?;
        writeln!(dest, "{}\t{}\t{}\t: N /FIXED", pin.name, x, y)?;
    }
    dest.flush()?;
    Ok(())
}
fn write_pl_synthesized(design: &ShelfDesign, dest: &mut impl Write) -> ShelfResult<()> {
    let die = design.synthesize_die()?;
    let terminals: Vec<&str> = design
        .nodes()
        .iter()
        .filter(|n| n.is_terminal())
        .map(|n| n.name.as_str())
        .collect();
    for node in design.nodes().iter().filter(|n| !n.is_terminal()) {
        writeln!(dest, "{}\t{}\t{}\t: N", node.name, 0, 0)?;
    }
    let coords = perimeter_positions(terminals.len(), die.row_length, die.die_height);
    for (name, (x, y)) in terminals.iter().zip(coords) {
        writeln!(dest, "{}\t{}\t{}\t: N", name, x, y)?;
    }
    dest.flush()?;
    Ok(())
}

/// Write the `.shapes` file: for every placed instance of a rectilinear
/// macro, its obstruction rectangles in grid units, anchored at the
/// instance's placement point. Zero records without a layout input.
pub fn write_shapes(design: &ShelfDesign, dest: &mut impl Write) -> ShelfResult<()> {
    writeln!(dest, "shapes 1.0\n")?;
    let components: HashMap<&str, &DefComponent> = match design.placement {
        Some(def) => def.components_by_name(),
        None => HashMap::new(),
    };
    // Collect (instance, placement, rectangles) for rectilinear macros
    let mut entries = Vec::new();
    for inst in design.module.instances.iter().filter(|i| !i.is_shadow()) {
        let comp = match components.get(inst.name.as_str()) {
            Some(c) => *c,
            None => continue,
        };
        let mac = design.macro_of(inst)?;
        if let MacroFootprint::Rectilinear(rects) = &mac.footprint {
            entries.push((inst, comp, rects));
        }
    }
    writeln!(dest, "NumNonRectangularNodes : {}\n", entries.len())?;
    for (inst, comp, rects) in entries {
        let x_pl = design.scale.x_to_grid(comp.location.x)?;
        let y_pl = design.scale.y_to_grid(comp.location.y)?;
        writeln!(dest, "{} : {}", inst.name, rects.len())?;
        for (i, rect) in rects.iter().enumerate() {
            let x = to_nearest(design.scale.width_tracks(rect.ll.x))? + x_pl;
            let y = to_nearest(design.scale.height_tracks(rect.ll.y))? + y_pl;
            let w = design.scale.width_to_grid(rect.ur.x - rect.ll.x)?;
            let h = design.scale.height_to_grid(rect.ur.y - rect.ll.y)?;
            writeln!(dest, "    Shape_{} {} {} {} {}", i, x, y, w, h)?;
        }
    }
    dest.flush()?;
    Ok(())
}
/// Round a fractional track value to the nearest integer grid unit
fn to_nearest(d: rust_decimal::Decimal) -> ShelfResult<isize> {
    match d.round().to_i64() {
        Some(v) => Ok(v as isize),
        None => Err(ShelfError::Str(format!(
            "grid value {} exceeds the integer coordinate range",
            d
        ))),
    }
}

/// Write the `.aux` manifest naming the six benchmark files
pub fn write_aux(base: &str, dest: &mut impl Write) -> ShelfResult<()> {
    writeln!(
        dest,
        "RowBasedPlacement : {b}.nodes {b}.nets {b}.wts {b}.pl {b}.scl {b}.shapes",
        b = base
    )?;
    dest.flush()?;
    Ok(())
}
