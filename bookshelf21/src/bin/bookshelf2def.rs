//! # bookshelf2def
//!
//! Bookshelf placement results + netlist + cell library to layout (DEF)
//! converter
//!

use clap::Parser;
use std::error::Error;

use bookshelf21::{
    parse_aux_file, parse_nodes_file, parse_pl_file, parse_scl_file, regenerate_def, techlef21,
    vlog21, GridScale, PitchLayers,
};

// => The doc-comment on `ProgramOptions` here is displayed by the `clap`-generated help docs =>

/// Bookshelf placement to DEF converter
#[derive(Parser)]
struct ProgramOptions {
    /// Bookshelf Aux Manifest Input File
    #[clap(long)]
    aux: String,
    /// Placement (.pl) file overriding the one in the manifest,
    /// typically a placer's result
    #[clap(long)]
    pl: Option<String>,
    /// Gate-Level Netlist Input File
    #[clap(short = 'i', long)]
    netlist: String,
    /// Cell-Library (LEF) Input File
    #[clap(long)]
    lef: String,
    /// Width-divisor routing layer
    #[clap(long, default_value = "metal2")]
    width_layer: String,
    /// Height-divisor routing layer
    #[clap(long, default_value = "metal1")]
    height_layer: String,
    /// Layout Output File
    #[clap(long = "def-out", default_value = "out.def")]
    def_out: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let options = ProgramOptions::parse();
    _main(&options)
}

fn _main(options: &ProgramOptions) -> Result<(), Box<dyn Error>> {
    println!("Bookshelf   : {}", options.aux);
    if let Some(pl) = &options.pl {
        println!("Using pl    : {}", pl);
    }
    println!("LEF         : {}", options.lef);
    println!("Netlist     : {}", options.netlist);
    println!("Output DEF  : {}", options.def_out);

    let aux = parse_aux_file(&options.aux)?;
    let pl_path = match &options.pl {
        Some(pl) => std::path::PathBuf::from(pl),
        None => aux.pl.clone(),
    };

    let module = vlog21::VlogModule::open(&options.netlist)?;
    println!("{}", module.stats());
    let lib = techlef21::TechLefLibrary::open(&options.lef)?;
    let nodes = parse_nodes_file(&aux.nodes)?;
    let rows = parse_scl_file(&aux.scl)?;
    let placements = parse_pl_file(&pl_path)?;

    let layers = PitchLayers::new(&options.width_layer, &options.height_layer);
    let scale = GridScale::from_library(&lib, &layers)?;
    let design = regenerate_def(&module, &lib, &scale, &nodes, &rows, &placements)?;
    design.save(&options.def_out)?;
    println!("Done.");
    Ok(())
}
