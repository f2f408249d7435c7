//!
//! # Def Writer Module
//!

// Standard Lib Imports
use std::io::Write;
use std::ops::{AddAssign, SubAssign};
use std::path::Path;

// Local imports
use super::data::*;

/// Write a [DefDesign] to file `fname`
pub fn save(design: &DefDesign, fname: impl AsRef<Path>) -> DefResult<()> {
    let f = std::fs::File::create(fname)?;
    DefWriter::new(f).write_design(design)
}
/// Write a [DefDesign] to a DEF-format [String]
pub fn to_string(design: &DefDesign) -> DefResult<String> {
    let mut buf = Vec::new();
    DefWriter::new(&mut buf).write_design(design)?;
    let rv = String::from_utf8(buf).map_err(|e| DefError::Boxed(Box::new(e)))?;
    Ok(rv)
}

/// # Def Writing Helper
pub struct DefWriter<'wr> {
    /// Write Destination
    dest: Box<dyn Write + 'wr>,
    /// Indentation Helper
    indent: Indent,
}
impl<'wr> DefWriter<'wr> {
    /// Create a new [DefWriter] to destination `dest`.
    /// Destination is boxed internally.
    fn new(dest: impl Write + 'wr) -> Self {
        Self {
            dest: Box::new(dest),
            indent: Indent::new("  "),
        }
    }
    /// Write a [DefDesign] to the destination:
    /// header, die area, rows, then the PINS and COMPONENTS sections.
    fn write_design(&mut self, design: &DefDesign) -> DefResult<()> {
        writeln!(self.dest, "# Written by def21\n")?;
        let version = design.version.unwrap_or(*V5P7);
        writeln!(self.dest, "VERSION {} ;", version)?;
        writeln!(
            self.dest,
            "DIVIDERCHAR \"{}\" ;",
            design.divider_char.unwrap_or('/')
        )?;
        let bus_bits = design.bus_bit_chars.unwrap_or(('[', ']'));
        writeln!(self.dest, "BUSBITCHARS \"{}{}\" ;", bus_bits.0, bus_bits.1)?;
        writeln!(self.dest, "DESIGN {} ;", design.name)?;
        writeln!(
            self.dest,
            "UNITS DISTANCE MICRONS {} ;\n",
            design.dbu_per_micron
        )?;

        if let Some((ll, ur)) = &design.die_area {
            writeln!(self.dest, "DIEAREA {} {} ;\n", ll, ur)?;
        }

        for row in design.rows.iter() {
            self.write_row(row)?;
        }
        if !design.rows.is_empty() {
            writeln!(self.dest)?;
        }

        writeln!(self.dest, "PINS {} ;", design.pins.len())?;
        for pin in design.pins.iter() {
            self.write_pin(pin)?;
        }
        writeln!(self.dest, "END PINS\n")?;

        writeln!(self.dest, "COMPONENTS {} ;", design.components.len())?;
        for comp in design.components.iter() {
            self.write_component(comp)?;
        }
        writeln!(self.dest, "END COMPONENTS\n")?;

        writeln!(self.dest, "END DESIGN")?;
        self.dest.flush()?;
        Ok(())
    }
    /// Write one `ROW` statement
    fn write_row(&mut self, row: &DefRow) -> DefResult<()> {
        writeln!(
            self.dest,
            "ROW {} {} {} {} {} DO {} BY {} STEP {} {} ;",
            row.name,
            row.site,
            row.origin.x,
            row.origin.y,
            row.orient,
            row.num_x,
            row.num_y,
            row.step.x,
            row.step.y
        )?;
        Ok(())
    }
    /// Write one pin record
    fn write_pin(&mut self, pin: &DefPin) -> DefResult<()> {
        self.indent += 1;
        self.write_line(format_args!("- {} + NET {}", pin.name, pin.net))?;
        self.indent += 1;
        self.write_line(format_args!("+ DIRECTION {}", pin.direction))?;
        let kind = if pin.fixed { "FIXED" } else { "PLACED" };
        self.write_line(format_args!(
            "+ {} ( {} {} ) {}",
            kind, pin.location.x, pin.location.y, pin.orient
        ))?;
        self.indent += 2;
        match &pin.layer {
            Some(layer) => self.write_line(format_args!(
                "+ LAYER {} ( {} {} ) ( {} {} ) ;",
                layer.layer_name, layer.ll.x, layer.ll.y, layer.ur.x, layer.ur.y
            ))?,
            None => self.write_line(format_args!(";"))?,
        }
        self.indent -= 4;
        Ok(())
    }
    /// Write one component record
    fn write_component(&mut self, comp: &DefComponent) -> DefResult<()> {
        self.indent += 1;
        self.write_line(format_args!("- {} {}", comp.name, comp.macro_name))?;
        self.indent += 1;
        let kind = if comp.fixed { "FIXED" } else { "PLACED" };
        self.write_line(format_args!(
            "+ {} ( {} {} ) {} ;",
            kind, comp.location.x, comp.location.y, comp.orient
        ))?;
        self.indent -= 2;
        Ok(())
    }
    /// Helper function writing a single line at the current indentation level.
    fn write_line(&mut self, args: std::fmt::Arguments) -> std::io::Result<()> {
        writeln!(self.dest, "{}{}", self.indent.state, args)
    }
}

/// Indentation Helper
struct Indent {
    unit: String,
    level: usize,
    state: String,
}
impl Indent {
    /// Create a new [Indent], initially at level 0
    fn new(unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            level: 0,
            state: String::new(),
        }
    }
}
impl AddAssign<usize> for Indent {
    fn add_assign(&mut self, rhs: usize) {
        self.level += rhs;
        self.state = self.unit.repeat(self.level);
    }
}
impl SubAssign<usize> for Indent {
    fn sub_assign(&mut self, rhs: usize) {
        if rhs > self.level {
            panic!("Indentation cannot go below 0");
        }
        self.level -= rhs;
        self.state = self.unit.repeat(self.level);
    }
}
