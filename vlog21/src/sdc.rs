//!
//! # Timing-Constraint (SDC) Support
//!
//! Two narrow services for the surrounding flow: pulling the clock-port
//! name out of an existing constraints file, and emitting a skeleton
//! constraints file for a module with a designated clock port.
//!

// Standard Lib Imports
use std::io::{Read, Write};
use std::path::Path;

// Local imports
use super::data::*;

/// Name given to the generated clock
const CLOCK_NAME: &str = "mclk";
/// Library cell driving every primary input in the generated constraints
const DRIVING_CELL: &str = "in01f80";

/// Extract the clock-port name from SDC text `src`.
///
/// Locates the first `create_clock` line and returns the port named in
/// its `[get_ports <name>]` argument. Fatal when no such line exists.
pub fn find_clock_port(src: &str) -> VlogResult<String> {
    for line in src.lines() {
        if !line.starts_with("create_clock") {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let at = match tokens.iter().position(|t| *t == "[get_ports") {
            Some(at) => at,
            None => break,
        };
        match tokens.get(at + 1) {
            Some(port) => return Ok(port.trim_end_matches(']').to_string()),
            None => break,
        }
    }
    Err(VlogError::Str(
        "cannot find a create_clock port in the SDC".into(),
    ))
}
/// Extract the clock-port name from SDC file `fname`
pub fn load_clock_port(fname: impl AsRef<Path>) -> VlogResult<String> {
    let mut file = std::fs::File::open(fname)?;
    let mut src = String::new();
    file.read_to_string(&mut src)?;
    find_clock_port(&src)
}

/// Write skeleton constraints for `module` to file `fname`.
/// Fatal when the module has no designated clock port.
pub fn save(module: &VlogModule, fname: impl AsRef<Path>, clock_period: f64) -> VlogResult<()> {
    let f = std::fs::File::create(fname)?;
    write_sdc(module, f, clock_period)
}
/// Write skeleton constraints for `module` to an SDC-format [String]
pub fn to_string(module: &VlogModule, clock_period: f64) -> VlogResult<String> {
    let mut buf = Vec::new();
    write_sdc(module, &mut buf, clock_period)?;
    let rv = String::from_utf8(buf).map_err(|e| VlogError::Boxed(Box::new(e)))?;
    Ok(rv)
}

fn write_sdc(module: &VlogModule, mut dest: impl Write, clock_period: f64) -> VlogResult<()> {
    let clock = match module.clock_port.as_deref() {
        Some(c) => c,
        None => return Err(VlogError::Str("no clock port was set".into())),
    };
    let mut inputs: Vec<&str> = module
        .inputs()
        .map(|p| p.name.as_str())
        .filter(|n| *n != clock)
        .collect();
    let mut outputs: Vec<&str> = module.outputs().map(|p| p.name.as_str()).collect();
    inputs.sort_unstable();
    outputs.sort_unstable();

    writeln!(
        dest,
        "# Synopsys Design Constraints Format\n\n# clock definition"
    )?;
    writeln!(
        dest,
        "create_clock -name {} -period {:.2} [get_ports {}]\n",
        CLOCK_NAME, clock_period, clock
    )?;

    writeln!(dest, "# input delays")?;
    for name in inputs.iter() {
        writeln!(
            dest,
            "set_input_delay 0.0 [get_ports {}] -clock {}",
            name, CLOCK_NAME
        )?;
    }
    writeln!(dest, "\n# input drivers")?;
    for name in inputs.iter() {
        writeln!(
            dest,
            "set_driving_cell -lib_cell {} -pin o [get_ports {}] \
             -input_transition_fall 80.0 -input_transition_rise 80.0",
            DRIVING_CELL, name
        )?;
    }
    writeln!(dest, "\n# output delays")?;
    for name in outputs.iter() {
        writeln!(
            dest,
            "set_output_delay 0.0 [get_ports {}] -clock {}",
            name, CLOCK_NAME
        )?;
    }
    writeln!(dest, "\n# output loads")?;
    for name in outputs.iter() {
        writeln!(dest, "set_load -pin_load 4.0 [get_ports {}]", name)?;
    }
    dest.flush()?;
    Ok(())
}
