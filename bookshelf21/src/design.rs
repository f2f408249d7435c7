//!
//! # Cross-Document Linker
//!
//! [ShelfDesign] ties the three parsed inputs together: every netlist
//! instance is resolved against a library macro and sized on the grid,
//! every connection against the macro's pin list, and the optional
//! layout's unit scale is checked against the library's. All of these
//! resolutions are fatal on mismatch; this is where a netlist that does
//! not belong to its library gets caught.
//!

// Std-Lib
use std::collections::{BTreeMap, HashMap};

// Crates.io Imports
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// Crate Imports
use crate::units::GridScale;
use crate::{ShelfError, ShelfResult};
use def21::DefDesign;
use techlef21::{MacroClass, TechLefLibrary, TechLefMacro};
use vlog21::{VlogInstance, VlogModule};

/// # Translation Options
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ShelfOptions {
    /// Emit big-block placements as fixed terminals
    pub fix_big_blocks: bool,
    /// Target utilization for die synthesis, in (0.1, 0.99)
    pub utilization: f64,
}
impl Default for ShelfOptions {
    fn default() -> Self {
        Self {
            fix_big_blocks: false,
            utilization: 0.7,
        }
    }
}

/// Node classification in the emitted benchmark
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum ShelfNodeKind {
    /// Movable standard cell
    Cell,
    /// Big block; a terminal when blocks are fixed
    Block,
    /// Port node, always a terminal
    Terminal,
}

/// # Benchmark Node
///
/// One `.nodes` record: a sized instance, block, or 1x1 port terminal.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ShelfNode {
    pub name: String,
    /// Width in grid units
    pub width: isize,
    /// Height in grid units
    pub height: isize,
    pub kind: ShelfNodeKind,
    /// Fixed flag; set on blocks when blocks are fixed
    pub fixed: bool,
}
impl ShelfNode {
    /// Boolean indication of being emitted with the `terminal` tag
    pub fn is_terminal(&self) -> bool {
        match self.kind {
            ShelfNodeKind::Terminal => true,
            ShelfNodeKind::Block => self.fixed,
            ShelfNodeKind::Cell => false,
        }
    }
}

/// One `.nets` pin record: the owning node, a direction code, and the
/// pin offset from the node's geometric center, in fractional grid units.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct NetPinRecord {
    pub node: String,
    pub direction: char,
    pub dx: Decimal,
    pub dy: Decimal,
}

/// # Synthesized Die Plan
///
/// Produced when no layout input exists: a square placement area scaled
/// by the target utilization, cut into rows of site height.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct DiePlan {
    /// Site width, grid units
    pub site_width: isize,
    /// Site (row) height, grid units
    pub site_height: isize,
    /// Row length and die width, grid units
    pub row_length: isize,
    /// Die height: rows times row height, grid units
    pub die_height: isize,
    /// Number of rows
    pub num_rows: isize,
}

/// # Linked Translation Design
///
/// Owns nothing: borrows the parsed module, library, and optional
/// layout, and holds the node list and totals computed across them.
pub struct ShelfDesign<'d> {
    pub module: &'d VlogModule,
    pub lib: &'d TechLefLibrary,
    pub placement: Option<&'d DefDesign>,
    pub scale: GridScale,
    pub options: ShelfOptions,
    /// Macro lookup, keyed by macro name
    macros: HashMap<&'d str, &'d TechLefMacro>,
    /// The emitted node list: instances first, then port terminals
    nodes: Vec<ShelfNode>,
    /// Total instance area, grid units
    total_area: isize,
}
impl<'d> ShelfDesign<'d> {
    /// Link `module` against `lib` and optional `placement`.
    ///
    /// Fatal when the layout's unit scale disagrees with the library's,
    /// or when any instance gate type has no library macro.
    pub fn new(
        module: &'d VlogModule,
        lib: &'d TechLefLibrary,
        placement: Option<&'d DefDesign>,
        scale: GridScale,
        options: ShelfOptions,
    ) -> ShelfResult<Self> {
        if let Some(def) = placement {
            if def.dbu_per_micron != scale.dbu_per_micron {
                return Err(ShelfError::linkage(format!(
                    "layout units ({}/micron) disagree with library units ({}/micron)",
                    def.dbu_per_micron, scale.dbu_per_micron
                )));
            }
        }
        let macros: HashMap<&str, &TechLefMacro> =
            lib.macros.iter().map(|m| (m.name.as_str(), m)).collect();

        let mut nodes = Vec::new();
        let mut total_area = 0isize;
        for inst in module.instances.iter().filter(|i| !i.is_shadow()) {
            let mac = match macros.get(inst.gate_type.as_str()) {
                Some(m) => *m,
                None => {
                    return Err(ShelfError::linkage(format!(
                        "cannot find macro definition for {} {}",
                        inst.name, inst.gate_type
                    )))
                }
            };
            let width = scale.width_to_grid(mac.width)?;
            let height = scale.height_to_grid(mac.height)?;
            total_area += width * height;
            let kind = match mac.class {
                MacroClass::Block => ShelfNodeKind::Block,
                MacroClass::Core | MacroClass::Pad => ShelfNodeKind::Cell,
            };
            nodes.push(ShelfNode {
                name: inst.name.clone(),
                width,
                height,
                kind,
                fixed: kind == ShelfNodeKind::Block && options.fix_big_blocks,
            });
        }
        // Ports become 1x1 terminals, inputs first
        for port in module.inputs().chain(module.outputs()) {
            nodes.push(ShelfNode {
                name: port.name.clone(),
                width: 1,
                height: 1,
                kind: ShelfNodeKind::Terminal,
                fixed: true,
            });
        }
        Ok(Self {
            module,
            lib,
            placement,
            scale,
            options,
            macros,
            nodes,
            total_area,
        })
    }
    /// The emitted node list
    pub fn nodes(&self) -> &[ShelfNode] {
        &self.nodes
    }
    /// Number of nodes carrying the `terminal` tag
    pub fn num_terminals(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_terminal()).count()
    }
    /// Total instance area, grid units
    pub fn total_area(&self) -> isize {
        self.total_area
    }
    /// The clock net name, when one is designated
    pub fn clock_net(&self) -> Option<&str> {
        self.module.clock_port.as_deref()
    }
    /// Resolve `inst`'s library macro
    pub fn macro_of(&self, inst: &VlogInstance) -> ShelfResult<&'d TechLefMacro> {
        match self.macros.get(inst.gate_type.as_str()) {
            Some(m) => Ok(*m),
            None => Err(ShelfError::linkage(format!(
                "cannot find macro definition for {} {}",
                inst.name, inst.gate_type
            ))),
        }
    }
    /// Build the `.nets` records: per net (clock excluded, sorted by
    /// name), one record per connected pin. Ports contribute a
    /// zero-offset record on their own net; gate pins are resolved
    /// against the macro pin list, fatally on mismatch.
    pub fn net_records(&self) -> ShelfResult<BTreeMap<String, Vec<NetPinRecord>>> {
        let clock = self.clock_net();
        let mut records: BTreeMap<String, Vec<NetPinRecord>> = BTreeMap::new();
        for port in self.module.ports.iter() {
            if Some(port.name.as_str()) == clock {
                continue;
            }
            records.insert(
                port.name.clone(),
                vec![NetPinRecord {
                    node: port.name.clone(),
                    direction: port.direction.code(),
                    dx: Decimal::ZERO,
                    dy: Decimal::ZERO,
                }],
            );
        }
        for wire in self.module.wires.iter() {
            records.insert(wire.clone(), Vec::new());
        }
        for inst in self.module.instances.iter().filter(|i| !i.is_shadow()) {
            let mac = self.macro_of(inst)?;
            let center_x = self.scale.width_tracks(mac.width) / Decimal::TWO;
            let center_y = self.scale.height_tracks(mac.height) / Decimal::TWO;
            for (pin, net) in inst.pins() {
                if Some(net.as_str()) == clock {
                    continue;
                }
                let lef_pin = match mac.pin(pin) {
                    Some(p) => p,
                    None => {
                        return Err(ShelfError::linkage(format!(
                            "netlist and library do not match: pin {} of {} {} \
                             is not on macro {}",
                            pin, inst.name, inst.gate_type, mac.name
                        )))
                    }
                };
                let center = lef_pin.center();
                let record = NetPinRecord {
                    node: inst.name.clone(),
                    direction: lef_pin.direction.code(),
                    dx: self.scale.width_tracks(center.x) - center_x,
                    dy: self.scale.height_tracks(center.y) - center_y,
                };
                match records.get_mut(net) {
                    Some(list) => list.push(record),
                    None => {
                        return Err(ShelfError::linkage(format!(
                            "net {} of {} {} is not declared",
                            net, inst.name, inst.gate_type
                        )))
                    }
                }
            }
        }
        Ok(records)
    }
    /// Synthesize die geometry from total area and target utilization:
    /// a square placement area, its side rounded up to whole rows.
    pub fn synthesize_die(&self) -> ShelfResult<DiePlan> {
        let site_width = self.scale.width_to_grid(self.lib.site.width)?;
        let site_height = self.scale.height_to_grid(self.lib.site.height)?;
        if site_height <= 0 || site_width <= 0 {
            return Err(ShelfError::Str("degenerate site geometry".into()));
        }
        let area = self.total_area as f64 / self.options.utilization;
        let row_length = area.sqrt().ceil() as isize;
        let num_rows = ceil_div(row_length, site_height);
        Ok(DiePlan {
            site_width,
            site_height,
            row_length,
            die_height: num_rows * site_height,
            num_rows,
        })
    }
}

/// Integer ceiling division
pub(crate) fn ceil_div(a: isize, b: isize) -> isize {
    (a + b - 1) / b
}

/// Distribute `count` port positions over the die perimeter, in
/// south, east, north, west order. When `count` does not divide evenly
/// the remainder is subtracted starting from the west edge. The four
/// edge shares always sum to `count` and differ by at most one.
pub fn perimeter_positions(count: usize, width: isize, height: isize) -> Vec<(isize, isize)> {
    let per_edge_max = (count + 3) / 4;
    let mut per_edge = [per_edge_max; 4];
    let diff = per_edge_max * 4 - count;
    for i in 0..diff {
        per_edge[3 - i] -= 1;
    }
    let (w, h) = (width as f64, height as f64);
    let mut coords: Vec<(f64, f64)> = Vec::with_capacity(count);
    // South: left to right along y = 0
    coords.extend((0..per_edge[0]).map(|i| (i as f64 * (w / per_edge[0] as f64), 0.0)));
    // East: bottom to top along x = width
    coords.extend((0..per_edge[1]).map(|i| (w, i as f64 * (h / per_edge[1] as f64))));
    // North: right to left along y = height
    coords.extend((0..per_edge[2]).map(|i| (w - i as f64 * (w / per_edge[2] as f64), h)));
    // West: top to bottom along x = 0
    coords.extend((0..per_edge[3]).map(|i| (0.0, h - i as f64 * (h / per_edge[3] as f64))));
    coords
        .into_iter()
        .map(|(x, y)| (x.round() as isize, y.round() as isize))
        .collect()
}
