//!
//! # Vlog Writer Module
//!
//! Re-emits a [VlogModule] as gate-level netlist text: sorted port and
//! wire declarations, one gate instantiation per line with output pins
//! listed ahead of input pins.
//!

// Standard Lib Imports
use std::io::Write;
use std::path::Path;

// Local imports
use super::data::*;

/// Write a [VlogModule] to netlist file `fname`
pub fn save(module: &VlogModule, fname: impl AsRef<Path>) -> VlogResult<()> {
    let f = std::fs::File::create(fname)?;
    VlogWriter::new(f).write_module(module)
}
/// Write a [VlogModule] to a netlist-format [String]
pub fn to_string(module: &VlogModule) -> VlogResult<String> {
    let mut buf = Vec::new();
    VlogWriter::new(&mut buf).write_module(module)?;
    let rv = String::from_utf8(buf).map_err(|e| VlogError::Boxed(Box::new(e)))?;
    Ok(rv)
}

/// # Vlog Writing Helper
pub struct VlogWriter<'wr> {
    /// Write Destination
    dest: Box<dyn Write + 'wr>,
}
impl<'wr> VlogWriter<'wr> {
    /// Create a new [VlogWriter] to destination `dest`
    fn new(dest: impl Write + 'wr) -> Self {
        Self {
            dest: Box::new(dest),
        }
    }
    /// Write `module` to the destination
    fn write_module(&mut self, module: &VlogModule) -> VlogResult<()> {
        let mut inputs: Vec<&str> = module.inputs().map(|p| p.name.as_str()).collect();
        let mut outputs: Vec<&str> = module.outputs().map(|p| p.name.as_str()).collect();
        let mut wires: Vec<&str> = module.wires.iter().map(String::as_str).collect();
        inputs.sort_unstable();
        outputs.sort_unstable();
        wires.sort_unstable();

        writeln!(self.dest, "module {} (", module.name)?;
        for name in inputs.iter() {
            writeln!(self.dest, "{},", name)?;
        }
        // The final output closes the header port list
        for (i, name) in outputs.iter().enumerate() {
            if i + 1 == outputs.len() {
                writeln!(self.dest, "{});", name)?;
            } else {
                writeln!(self.dest, "{},", name)?;
            }
        }

        writeln!(self.dest, "\n// Start PIs")?;
        for name in inputs.iter() {
            writeln!(self.dest, "input {};", name)?;
        }
        writeln!(self.dest, "\n// Start POs")?;
        for name in outputs.iter() {
            writeln!(self.dest, "output {};", name)?;
        }
        // Ports double as nets, so they are re-declared as wires
        writeln!(self.dest, "\n// Start wires")?;
        for name in inputs.iter().chain(outputs.iter()).chain(wires.iter()) {
            writeln!(self.dest, "wire {};", name)?;
        }

        writeln!(self.dest, "\n// Start cells")?;
        for inst in module.instances.iter().filter(|i| !i.is_shadow()) {
            writeln!(self.dest, "{}", instance_line(inst))?;
        }
        writeln!(self.dest, "\nendmodule")?;
        self.dest.flush()?;
        Ok(())
    }
}
/// Format one gate instantiation, output pins first, each group sorted
fn instance_line(inst: &VlogInstance) -> String {
    let fmt = |pins: &[(String, String)]| -> Vec<String> {
        let mut conns: Vec<String> = pins
            .iter()
            .map(|(pin, net)| format!(".{}({})", pin, net))
            .collect();
        conns.sort_unstable();
        conns
    };
    let mut conns = fmt(&inst.output_pins);
    conns.extend(fmt(&inst.input_pins));
    format!(
        "{} {} ( {} );",
        inst.gate_type,
        inst.name,
        conns.join(", ")
    )
}
