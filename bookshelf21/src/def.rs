//!
//! # Layout Regeneration Module
//!
//! Rebuilds a [DefDesign] from benchmark placement results: rows and the
//! die-area bound from the `.scl` geometry, fixed I/O pins and
//! placed/fixed components from the `.pl` coordinates, cross-referenced
//! against the netlist and library. Every netlist instance and port must
//! have a placement record; a missing one is fatal.
//!

// Std-Lib
use std::collections::HashMap;

// Crates.io Imports
use rust_decimal::Decimal;

// Crate Imports
use crate::read::{NodeEntry, PlEntry, SclRow};
use crate::units::GridScale;
use crate::{ShelfError, ShelfResult};
use def21::{DefComponent, DefDesign, DefOrient, DefPin, DefPinLayer, DefPoint};
use techlef21::TechLefLibrary;
use vlog21::VlogModule;

/// Layer carrying the regenerated pin geometry
const PIN_LAYER_NAME: &str = "metal3";
/// Regenerated pin rectangle extent, in database units
const PIN_RECT_SIZE: i64 = 380;

/// Rebuild a [DefDesign] from benchmark results.
///
/// `nodes` supplies the terminal tags (fixed components), `rows` the row
/// geometry, and `placements` the grid coordinates; `module` and `lib`
/// supply naming, directions, and unit scales. Orientations are
/// normalized to `N`.
pub fn regenerate_def(
    module: &VlogModule,
    lib: &TechLefLibrary,
    scale: &GridScale,
    nodes: &[NodeEntry],
    rows: &[SclRow],
    placements: &[PlEntry],
) -> ShelfResult<DefDesign> {
    let terminal_tags: HashMap<&str, bool> =
        nodes.iter().map(|n| (n.name.as_str(), n.terminal)).collect();
    let placed: HashMap<&str, &PlEntry> =
        placements.iter().map(|p| (p.name.as_str(), p)).collect();
    let locate = |name: &str| -> ShelfResult<DefPoint> {
        let entry = match placed.get(name) {
            Some(e) => *e,
            None => {
                return Err(ShelfError::linkage(format!(
                    "no placement record for {}",
                    name
                )))
            }
        };
        Ok(DefPoint {
            x: dbu_int(scale.x_to_dbu(entry.x)),
            y: dbu_int(scale.y_to_dbu(entry.y)),
        })
    };

    let mut design = DefDesign {
        name: module.name.clone(),
        dbu_per_micron: scale.dbu_per_micron,
        ..Default::default()
    };

    // Rows, and the die area as their maximum extent
    let mut die_ur = DefPoint::default();
    for (i, row) in rows.iter().enumerate() {
        let origin = DefPoint {
            x: dbu_int(scale.x_to_dbu(row.subrow_origin)),
            y: dbu_int(scale.y_to_dbu(row.coordinate)),
        };
        let step_x = dbu_int(scale.x_to_dbu(row.site_spacing));
        let row_extent_x = origin.x
            + dbu_int(scale.x_to_dbu(row.site_width)) * Decimal::from(row.num_sites as i64);
        let row_extent_y = origin.y + dbu_int(scale.y_to_dbu(row.height));
        die_ur.x = die_ur.x.max(row_extent_x);
        die_ur.y = die_ur.y.max(row_extent_y);
        design.rows.push(def21::DefRow {
            name: format!("{}_SITE_ROW_{}", lib.site.name, i),
            site: lib.site.name.clone(),
            origin,
            orient: DefOrient::N,
            num_x: row.num_sites,
            num_y: 1,
            step: DefPoint {
                x: step_x,
                y: Decimal::ZERO,
            },
        });
    }
    design.die_area = Some((DefPoint::default(), die_ur));

    // Fixed I/O pins, sorted by name
    let mut ports: Vec<&vlog21::VlogPort> = module.ports.iter().collect();
    ports.sort_by(|a, b| a.name.cmp(&b.name));
    for port in ports {
        design.pins.push(DefPin {
            name: port.name.clone(),
            net: port.name.clone(),
            direction: port.direction.to_string(),
            fixed: true,
            location: locate(&port.name)?,
            orient: DefOrient::N,
            layer: Some(DefPinLayer {
                layer_name: PIN_LAYER_NAME.to_string(),
                ll: DefPoint::default(),
                ur: DefPoint::new(PIN_RECT_SIZE, PIN_RECT_SIZE),
            }),
        });
    }

    // Placed components, sorted by name
    let mut instances: Vec<&vlog21::VlogInstance> = module
        .instances
        .iter()
        .filter(|i| !i.is_shadow())
        .collect();
    instances.sort_by(|a, b| a.name.cmp(&b.name));
    for inst in instances {
        design.components.push(DefComponent {
            name: inst.name.clone(),
            macro_name: inst.gate_type.clone(),
            fixed: terminal_tags.get(inst.name.as_str()).copied().unwrap_or(false),
            location: locate(&inst.name)?,
            orient: DefOrient::N,
        });
    }
    Ok(design)
}

/// Round a database-unit value to a whole number and strip trailing scale
fn dbu_int(d: Decimal) -> Decimal {
    d.round().normalize()
}
