//! # vlog2bookshelf
//!
//! Netlist + cell library (+ optional floorplan) to Bookshelf
//! benchmark-set converter
//!

use clap::Parser;
use std::error::Error;

use bookshelf21::{
    def21, save_all, techlef21, vlog21, GridScale, PitchLayers, ShelfDesign, ShelfOptions,
};

// => The doc-comment on `ProgramOptions` here is displayed by the `clap`-generated help docs =>

/// Netlist + LEF (+ DEF) to Bookshelf converter
#[derive(Parser)]
struct ProgramOptions {
    /// Gate-Level Netlist Input File
    #[clap(short = 'i', long)]
    netlist: String,
    /// Cell-Library (LEF) Input File
    #[clap(long)]
    lef: String,
    /// Existing Layout (DEF) Input File
    #[clap(long = "def")]
    def: Option<String>,
    /// Emit big-block placements as fixed terminals
    #[clap(long)]
    fix_big_blocks: bool,
    /// Clock-Port Name
    #[clap(long)]
    clock: Option<String>,
    /// Timing-Constraints (SDC) file to extract the clock port from
    #[clap(long)]
    sdc: Option<String>,
    /// Drop the clock port from the emitted nodes and placements
    #[clap(long)]
    remove_clock_port: bool,
    /// Target utilization, in (0.1, 0.99); used when no DEF is given
    #[clap(long, default_value = "0.7")]
    util: f64,
    /// Width-divisor routing layer
    #[clap(long, default_value = "metal2")]
    width_layer: String,
    /// Height-divisor routing layer
    #[clap(long, default_value = "metal1")]
    height_layer: String,
    /// Base name of the output files
    #[clap(short = 'o', long)]
    out: Option<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let options = ProgramOptions::parse();
    _main(&options)
}

fn _main(options: &ProgramOptions) -> Result<(), Box<dyn Error>> {
    if options.util <= 0.1 || options.util >= 0.99 {
        return Err(format!("utilization ({}) not in (0.1, 0.99)", options.util).into());
    }
    // The clock port comes from --clock, or out of the SDC
    let clock_port = match (&options.clock, &options.sdc) {
        (Some(clock), _) => clock.clone(),
        (None, Some(sdc)) => vlog21::sdc::load_clock_port(sdc)?,
        (None, None) => return Err("at least one of --sdc and --clock required".into()),
    };
    // Default the output base to the netlist's file stem
    let dest = match &options.out {
        Some(out) => out.clone(),
        None => match std::path::Path::new(&options.netlist).file_stem() {
            Some(stem) => stem.to_string_lossy().into_owned(),
            None => return Err(format!("cannot name outputs after {}", options.netlist).into()),
        },
    };

    println!("Input netlist     :  {}", options.netlist);
    println!("Input LEF         :  {}", options.lef);
    match &options.def {
        Some(def) => {
            println!("Input DEF         :  {}", def);
            println!("Fix big blocks    :  {}", options.fix_big_blocks);
        }
        None => println!("Utilization       :  {}", options.util),
    }
    println!("Clock port        :  {}", clock_port);
    println!("Output base       :  {}", dest);

    let mut module = vlog21::VlogModule::open(&options.netlist)?;
    module.clock_port = Some(clock_port);
    if options.remove_clock_port {
        module.remove_clock_port()?;
    }
    println!("{}", module.stats());

    let lib = techlef21::TechLefLibrary::open(&options.lef)?;
    let placement = match &options.def {
        Some(def) => Some(def21::DefDesign::open(def)?),
        None => None,
    };

    let layers = PitchLayers::new(&options.width_layer, &options.height_layer);
    let scale = GridScale::from_library(&lib, &layers)?;
    let design = ShelfDesign::new(
        &module,
        &lib,
        placement.as_ref(),
        scale,
        ShelfOptions {
            fix_big_blocks: options.fix_big_blocks,
            utilization: options.util,
        },
    )?;
    save_all(&design, &dest)?;
    println!("Done.");
    Ok(())
}
