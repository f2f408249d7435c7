use super::*;
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

use def21::DefDesign;
use techlef21::TechLefLibrary;
use vlog21::VlogModule;

/// Decimal-literal helper
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Library fixture: 2000 DBU/micron, both divisor pitches 0.2 microns,
/// a 0.2 x 1.6 site, two standard cells, and a rectilinear block.
const LIB: &str = r#"
VERSION 5.7 ;
BUSBITCHARS "[]" ;
DIVIDERCHAR "/" ;
UNITS
    DATABASE MICRONS 2000 ;
END UNITS
LAYER metal1
    TYPE ROUTING ;
    PITCH 0.2 ;
END metal1
LAYER metal2
    TYPE ROUTING ;
    PITCH 0.2 ;
END metal2
SITE core
    SYMMETRY Y ;
    CLASS core ;
    SIZE 0.2 BY 1.6 ;
END core
MACRO na02s01
    CLASS CORE ;
    SIZE 1.2 BY 1.6 ;
    PIN a
        DIRECTION INPUT ;
        PORT
            LAYER metal1 ;
                RECT 0.2 0.2 0.4 0.4 ;
        END
    END a
    PIN b
        DIRECTION INPUT ;
        PORT
            LAYER metal1 ;
                RECT 0.2 0.8 0.4 1.0 ;
        END
    END b
    PIN o
        DIRECTION OUTPUT ;
        PORT
            LAYER metal1 ;
                RECT 1.0 0.7 1.1 0.9 ;
        END
    END o
END na02s01
MACRO ms00f80
    CLASS CORE ;
    SIZE 2.0 BY 1.6 ;
    PIN d
        DIRECTION INPUT ;
        PORT
            LAYER metal1 ;
                RECT 0.2 0.2 0.6 0.6 ;
        END
    END d
    PIN ck
        DIRECTION INPUT ;
        PORT
            LAYER metal1 ;
                RECT 0.2 1.0 0.4 1.2 ;
        END
    END ck
    PIN o
        DIRECTION OUTPUT ;
        PORT
            LAYER metal1 ;
                RECT 1.6 0.6 1.8 1.0 ;
        END
    END o
END ms00f80
MACRO block_ram
    CLASS BLOCK ;
    SIZE 40.0 BY 40.0 ;
    PIN a
        DIRECTION INPUT ;
        PORT
            LAYER metal1 ;
                RECT 0.0 0.0 0.2 0.2 ;
        END
    END a
    OBS
        LAYER metal1 ;
        RECT 0.0 0.0 40.0 20.0 ;
        RECT 0.0 20.0 20.0 40.0 ;
    END
END block_ram
END LIBRARY
"#;

/// Netlist fixture without any big block
const NET_SMALL: &str = r#"
module top (a, b, clk, y);
input a;
input b;
input clk;
output y;
wire n1;
na02s01 u1 ( .a(a), .b(b), .o(n1) );
ms00f80 r1 ( .d(n1), .ck(clk), .o(y) );
endmodule
"#;

/// Netlist fixture with a big-block instance
const NET_BLOCK: &str = r#"
module top (a, b, clk, y);
input a;
input b;
input clk;
output y;
wire n1;
wire n2;
na02s01 u1 ( .a(a), .b(b), .o(n1) );
ms00f80 r1 ( .d(n1), .ck(clk), .o(y) );
block_ram m1 ( .a(n2) );
endmodule
"#;

/// Floorplan fixture matching [NET_BLOCK] and [LIB]
const DEF_SRC: &str = r#"
VERSION 5.7 ;
DESIGN top ;
UNITS DISTANCE MICRONS 2000 ;
DIEAREA ( 0 0 ) ( 102400 6400 ) ;
ROW core_SITE_ROW_0 core 0 0 N DO 256 BY 1 STEP 400 0 ;
ROW core_SITE_ROW_1 core 0 3200 N DO 256 BY 1 STEP 400 0 ;
COMPONENTS 3 ;
- u1 na02s01
    + PLACED ( 400 0 ) N ;
- r1 ms00f80
    + PLACED ( 4000 3200 ) N ;
- m1 block_ram
    + FIXED ( 40000 40000 ) N ;
END COMPONENTS
PINS 4 ;
- a + NET a
    + DIRECTION INPUT
    + FIXED ( 0 800 ) N
        + LAYER metal3 ( 0 0 ) ( 380 380 ) ;
- b + NET b
    + DIRECTION INPUT
    + FIXED ( 0 2400 ) N
        + LAYER metal3 ( 0 0 ) ( 380 380 ) ;
- clk + NET clk
    + DIRECTION INPUT
    + FIXED ( 0 4000 ) N
        + LAYER metal3 ( 0 0 ) ( 380 380 ) ;
- y + NET y
    + DIRECTION OUTPUT
    + FIXED ( 102400 800 ) N
        + LAYER metal3 ( 0 0 ) ( 380 380 ) ;
END PINS
END DESIGN
"#;

fn lib() -> TechLefLibrary {
    techlef21::read::parse_str(LIB).expect("library fixture must parse")
}
fn module(src: &str) -> VlogModule {
    let mut module = vlog21::read::parse_str(src).expect("netlist fixture must parse");
    module.clock_port = Some("clk".to_string());
    module
}
fn def() -> DefDesign {
    def21::read::parse_str(DEF_SRC).expect("layout fixture must parse")
}
fn scale(lib: &TechLefLibrary) -> GridScale {
    GridScale::from_library(lib, &PitchLayers::default()).expect("scale must build")
}
fn to_text(write: impl FnOnce(&mut Vec<u8>) -> ShelfResult<()>) -> String {
    let mut buf = Vec::new();
    write(&mut buf).expect("writer must succeed");
    String::from_utf8(buf).expect("output must be utf-8")
}

#[test]
fn it_converts_sizes_and_positions() -> ShelfResult<()> {
    // A 4000-unit-wide cell over a 400-unit pitch is ten grid units
    let by_units = GridScale {
        width_pitch: Decimal::from(400),
        height_pitch: Decimal::from(400),
        dbu_per_micron: 1000,
    };
    assert_eq!(by_units.width_to_grid(Decimal::from(4000))?, 10);
    // Sizes round up
    assert_eq!(by_units.width_to_grid(Decimal::from(4001))?, 11);
    // Positions round to nearest
    let s = scale(&lib());
    assert_eq!(s.x_to_grid(dec("400"))?, 1);
    assert_eq!(s.x_to_grid(dec("590"))?, 1);
    assert_eq!(s.x_to_grid(dec("610"))?, 2);
    Ok(())
}

#[test]
fn grid_conversion_roundtrips() -> ShelfResult<()> {
    let s = scale(&lib());
    for g in [0isize, 1, 7, 100, 12345] {
        let dbu = s.x_to_dbu(Decimal::from(g as i64));
        assert_eq!(s.x_to_grid(dbu)?, g);
        let dbu = s.y_to_dbu(Decimal::from(g as i64));
        assert_eq!(s.y_to_grid(dbu)?, g);
    }
    Ok(())
}

#[test]
fn it_rejects_unknown_pitch_layers() {
    let lib = lib();
    let layers = PitchLayers::new("metal9", "metal1");
    assert!(GridScale::from_library(&lib, &layers).is_err());
}

#[test]
fn it_rejects_unknown_gate_types() {
    let lib = lib();
    let src = r#"
    module top (a, y);
    input a;
    output y;
    wire n1;
    mystery_gate u1 ( .a(a), .o(n1) );
    na02s01 u2 ( .a(n1), .b(n1), .o(y) );
    endmodule
    "#;
    let module = vlog21::read::parse_str(src).expect("netlist must parse");
    let scale = scale(&lib);
    let result = ShelfDesign::new(&module, &lib, None, scale, ShelfOptions::default());
    assert!(matches!(result, Err(ShelfError::Linkage { .. })));
}

#[test]
fn it_rejects_unknown_macro_pins() {
    let lib = lib();
    // Pin `c` exists on no na02s01
    let src = r#"
    module top (a, y);
    input a;
    output y;
    wire n1;
    na02s01 u1 ( .a(a), .c(a), .o(n1) );
    na02s01 u2 ( .a(n1), .b(n1), .o(y) );
    endmodule
    "#;
    let module = vlog21::read::parse_str(src).expect("netlist must parse");
    let scale = scale(&lib);
    let design =
        ShelfDesign::new(&module, &lib, None, scale, ShelfOptions::default()).expect("links");
    assert!(matches!(
        design.net_records(),
        Err(ShelfError::Linkage { .. })
    ));
}

#[test]
fn it_rejects_unit_disagreement() {
    let lib = lib();
    let module = module(NET_BLOCK);
    let mut def = def();
    def.dbu_per_micron = 1000;
    let scale = scale(&lib);
    let result = ShelfDesign::new(&module, &lib, Some(&def), scale, ShelfOptions::default());
    assert!(matches!(result, Err(ShelfError::Linkage { .. })));
}

#[test]
fn it_writes_nodes() -> ShelfResult<()> {
    let lib = lib();
    let module = module(NET_SMALL);
    let design = ShelfDesign::new(&module, &lib, None, scale(&lib), ShelfOptions::default())?;
    let text = to_text(|buf| write_nodes(&design, buf));
    assert!(text.starts_with("UCLA nodes 1.0\n"));
    assert!(text.contains("NumNodes\t:\t6"));
    assert!(text.contains("NumTerminals\t:\t4"));
    let u1 = format!("{:<40} {:>15} {:>15}", "u1", 6, 8);
    let r1 = format!("{:<40} {:>15} {:>15}", "r1", 10, 8);
    let clk = format!("{:<40} {:>15} {:>15} {:>15}", "clk", 1, 1, "terminal");
    assert!(text.contains(&u1));
    assert!(text.contains(&r1));
    assert!(text.contains(&clk));
    Ok(())
}

#[test]
fn fixed_blocks_become_terminals() -> ShelfResult<()> {
    let lib = lib();
    let module = module(NET_BLOCK);
    let options = ShelfOptions {
        fix_big_blocks: true,
        ..Default::default()
    };
    let def = def();
    let design = ShelfDesign::new(&module, &lib, Some(&def), scale(&lib), options)?;
    assert_eq!(design.nodes().len(), 7);
    assert_eq!(design.num_terminals(), 5); // four ports plus the block
    let text = to_text(|buf| write_nodes(&design, buf));
    let m1 = format!("{:<40} {:>15} {:>15} {:>15}", "m1", 200, 200, "terminal");
    assert!(text.contains(&m1));
    Ok(())
}

#[test]
fn net_pin_totals_match_degrees() -> ShelfResult<()> {
    let lib = lib();
    let module = module(NET_SMALL);
    let design = ShelfDesign::new(&module, &lib, None, scale(&lib), ShelfOptions::default())?;
    let records = design.net_records()?;
    // The clock net is excluded entirely
    assert!(!records.contains_key("clk"));
    assert_eq!(records.len(), 4); // a, b, y, n1
    let num_pins: usize = records.values().map(Vec::len).sum();
    assert_eq!(num_pins, 8);
    for (net, pins) in records.iter() {
        assert_eq!(pins.len(), 2, "net {} should have degree 2", net);
    }
    Ok(())
}

#[test]
fn it_writes_nets() -> ShelfResult<()> {
    let lib = lib();
    let module = module(NET_SMALL);
    let design = ShelfDesign::new(&module, &lib, None, scale(&lib), ShelfOptions::default())?;
    let text = to_text(|buf| write_nets(&design, buf));
    assert!(text.starts_with("UCLA nets 1.0\n"));
    assert!(text.contains("NumNets\t:\t4"));
    assert!(text.contains("NumPins\t:\t8"));
    assert!(text.contains("NetDegree : 2  a"));
    // Offsets are measured from the node center, in fractional tracks
    assert!(text.contains("u1  I :     -1.5000     -2.5000"));
    assert!(text.contains("u1  O :      2.2500      0.0000"));
    assert!(text.contains("r1  O :      3.5000      0.0000"));
    // The port's own record sits at zero offset
    assert!(text.contains("a  I :      0.0000      0.0000"));
    Ok(())
}

#[test]
fn it_writes_weights() -> ShelfResult<()> {
    let lib = lib();
    let module = module(NET_SMALL);
    let design = ShelfDesign::new(&module, &lib, None, scale(&lib), ShelfOptions::default())?;
    let text = to_text(|buf| write_wts(&design, buf));
    let lines: Vec<&str> = text.lines().filter(|l| l.ends_with(" 1")).collect();
    assert_eq!(lines, vec!["a 1", "b 1", "y 1", "n1 1"]);
    Ok(())
}

#[test]
fn it_synthesizes_rows() -> ShelfResult<()> {
    let lib = lib();
    let module = module(NET_SMALL);
    let design = ShelfDesign::new(&module, &lib, None, scale(&lib), ShelfOptions::default())?;
    // 48 + 80 grid units of cell area at 0.7 utilization
    assert_eq!(design.total_area(), 128);
    let die = design.synthesize_die()?;
    assert_eq!(die.site_width, 1);
    assert_eq!(die.site_height, 8);
    assert_eq!(die.row_length, 14); // ceil(sqrt(128 / 0.7))
    assert_eq!(die.num_rows, 2);
    assert_eq!(die.die_height, 16);
    // Rows cover the row length
    assert!(die.num_rows * die.site_height >= die.row_length);

    let text = to_text(|buf| write_scl(&design, buf));
    assert!(text.starts_with("UCLA scl 1.0\n"));
    assert!(text.contains("NumRows : 2"));
    assert!(text.contains("    Coordinate     : 8"));
    assert!(text.contains("    Height         : 8"));
    assert!(text.contains("    SubrowOrigin   : 0        NumSites : 14"));
    Ok(())
}

#[test]
fn it_synthesizes_perimeter_ports() -> ShelfResult<()> {
    let lib = lib();
    let module = module(NET_SMALL);
    let design = ShelfDesign::new(&module, &lib, None, scale(&lib), ShelfOptions::default())?;
    let text = to_text(|buf| write_pl(&design, buf));
    assert!(text.starts_with("UCLA pl 1.0\n"));
    // Movable nodes start at the origin
    assert!(text.contains("u1\t0\t0\t: N"));
    assert!(text.contains("r1\t0\t0\t: N"));
    // One port per edge, in south, east, north, west order
    assert!(text.contains("a\t0\t0\t: N"));
    assert!(text.contains("b\t14\t0\t: N"));
    assert!(text.contains("clk\t14\t16\t: N"));
    assert!(text.contains("y\t0\t16\t: N"));
    Ok(())
}

#[test]
fn perimeter_shares_are_balanced() {
    for count in 1..=13usize {
        let coords = perimeter_positions(count, 100, 80);
        // The edge shares always sum to the port count
        assert_eq!(coords.len(), count);
        // Every position lies on the die boundary
        for (x, y) in coords.iter() {
            assert!(
                *x == 0 || *x == 100 || *y == 0 || *y == 80,
                "({}, {}) is not on the perimeter",
                x,
                y
            );
        }
    }
    // Remainders come off the west edge first: five ports put the spare
    // on the south edge and leave west with one
    let coords = perimeter_positions(5, 100, 80);
    assert_eq!(coords[0], (0, 0));
    assert_eq!(coords[1], (50, 0)); // second south position
    assert_eq!(coords[4], (0, 80)); // the lone west position
}

#[test]
fn it_copies_imported_rows() -> ShelfResult<()> {
    let lib = lib();
    let module = module(NET_BLOCK);
    let def = def();
    let design = ShelfDesign::new(
        &module,
        &lib,
        Some(&def),
        scale(&lib),
        ShelfOptions::default(),
    )?;
    let text = to_text(|buf| write_scl(&design, buf));
    assert!(text.contains("NumRows : 2"));
    assert!(text.contains("    Coordinate     : 8"));
    assert!(text.contains("    Sitewidth      : 1"));
    assert!(text.contains("    SubrowOrigin   : 0        NumSites : 256"));
    Ok(())
}

#[test]
fn it_copies_imported_placement() -> ShelfResult<()> {
    let lib = lib();
    let module = module(NET_BLOCK);
    let def = def();
    let options = ShelfOptions {
        fix_big_blocks: true,
        ..Default::default()
    };
    let design = ShelfDesign::new(&module, &lib, Some(&def), scale(&lib), options)?;
    let text = to_text(|buf| write_pl(&design, buf));
    // Component coordinates come over in grid units
    assert!(text.contains("u1\t1\t0\t: N"));
    assert!(text.contains("r1\t10\t8\t: N"));
    assert!(text.contains("m1\t100\t100\t: N /FIXED"));
    // I/O pins are always fixed
    assert!(text.contains("a\t0\t2\t: N /FIXED"));
    assert!(text.contains("y\t256\t2\t: N /FIXED"));
    Ok(())
}

#[test]
fn it_writes_shapes_for_rectilinear_macros() -> ShelfResult<()> {
    let lib = lib();
    let module = module(NET_BLOCK);
    let def = def();
    let design = ShelfDesign::new(
        &module,
        &lib,
        Some(&def),
        scale(&lib),
        ShelfOptions::default(),
    )?;
    let text = to_text(|buf| write_shapes(&design, buf));
    assert!(text.starts_with("shapes 1.0\n"));
    assert!(text.contains("NumNonRectangularNodes : 1"));
    assert!(text.contains("m1 : 2"));
    // Obstructions are anchored at the instance placement point
    assert!(text.contains("    Shape_0 100 100 200 100"));
    assert!(text.contains("    Shape_1 100 200 100 100"));
    Ok(())
}

#[test]
fn shapes_are_empty_without_placement() -> ShelfResult<()> {
    let lib = lib();
    let module = module(NET_BLOCK);
    let design = ShelfDesign::new(&module, &lib, None, scale(&lib), ShelfOptions::default())?;
    let text = to_text(|buf| write_shapes(&design, buf));
    assert!(text.contains("NumNonRectangularNodes : 0"));
    Ok(())
}

#[test]
fn it_writes_the_aux_manifest() -> ShelfResult<()> {
    let text = to_text(|buf| write_aux("top", buf));
    assert_eq!(
        text.trim_end(),
        "RowBasedPlacement : top.nodes top.nets top.wts top.pl top.scl top.shapes"
    );
    Ok(())
}

#[test]
fn it_parses_what_it_writes() -> ShelfResult<()> {
    let lib = lib();
    let module = module(NET_BLOCK);
    let def = def();
    let options = ShelfOptions {
        fix_big_blocks: true,
        ..Default::default()
    };
    let design = ShelfDesign::new(&module, &lib, Some(&def), scale(&lib), options)?;

    let nodes = parse_nodes(&to_text(|buf| write_nodes(&design, buf)))?;
    assert_eq!(nodes.len(), 7);
    assert_eq!(nodes.iter().filter(|n| n.terminal).count(), 5);

    let rows = parse_scl(&to_text(|buf| write_scl(&design, buf)))?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].coordinate, dec("8"));
    assert_eq!(rows[1].num_sites, 256);

    let pl = parse_pl(&to_text(|buf| write_pl(&design, buf)))?;
    assert_eq!(pl.len(), 7);
    let m1 = pl.iter().find(|p| p.name == "m1").expect("m1 in pl");
    assert!(m1.fixed);
    assert_eq!(m1.x, dec("100"));
    Ok(())
}

#[test]
fn it_parses_aux_manifests() -> ShelfResult<()> {
    let aux = parse_aux(
        "RowBasedPlacement : top.nodes top.nets top.wts top.pl top.scl top.shapes",
        Path::new("bench"),
    )?;
    assert_eq!(aux.nodes, Path::new("bench/top.nodes"));
    assert_eq!(aux.pl, Path::new("bench/top.pl"));
    assert_eq!(aux.scl, Path::new("bench/top.scl"));
    assert!(parse_aux("RowBasedPlacement : top.nodes", Path::new(".")).is_err());
    Ok(())
}

#[test]
fn it_regenerates_layouts() -> ShelfResult<()> {
    let lib = lib();
    let module = module(NET_BLOCK);
    let def = def();
    let options = ShelfOptions {
        fix_big_blocks: true,
        ..Default::default()
    };
    let s = scale(&lib);
    let design = ShelfDesign::new(&module, &lib, Some(&def), s.clone(), options)?;

    // Forward: emit the benchmark files. Reverse: parse them back and
    // rebuild the layout.
    let nodes = parse_nodes(&to_text(|buf| write_nodes(&design, buf)))?;
    let rows = parse_scl(&to_text(|buf| write_scl(&design, buf)))?;
    let pl = parse_pl(&to_text(|buf| write_pl(&design, buf)))?;
    let out = regenerate_def(&module, &lib, &s, &nodes, &rows, &pl)?;

    assert_eq!(out.name, "top");
    assert_eq!(out.dbu_per_micron, 2000);
    assert_eq!(out.rows.len(), 2);
    assert_eq!(out.rows[0].name, "core_SITE_ROW_0");
    assert_eq!(out.rows[1].origin.y, dec("3200"));
    // The die bound is the maximum row extent
    assert_eq!(
        out.die_area,
        Some((
            def21::DefPoint::default(),
            def21::DefPoint::new(102400, 6400)
        ))
    );
    // Placements round-trip exactly on grid-aligned coordinates
    let components = out.components_by_name();
    assert_eq!(components["u1"].location, def21::DefPoint::new(400, 0));
    assert_eq!(components["r1"].location, def21::DefPoint::new(4000, 3200));
    assert!(components["m1"].fixed);
    assert_eq!(
        components["m1"].location,
        def21::DefPoint::new(40000, 40000)
    );
    let pins = out.pins_by_name();
    assert_eq!(pins["a"].location, def21::DefPoint::new(0, 800));
    assert_eq!(pins["a"].direction, "INPUT");
    assert!(pins["a"].fixed);
    // And the whole thing serializes
    let text = out.to_def_string()?;
    assert!(text.contains("DIEAREA ( 0 0 ) ( 102400 6400 ) ;"));
    assert!(text.contains("ROW core_SITE_ROW_1 core 0 3200 N DO 256 BY 1 STEP 400 0 ;"));
    Ok(())
}

#[test]
fn regeneration_requires_full_placement() -> ShelfResult<()> {
    let lib = lib();
    let module = module(NET_BLOCK);
    let def = def();
    let s = scale(&lib);
    let design = ShelfDesign::new(
        &module,
        &lib,
        Some(&def),
        s.clone(),
        ShelfOptions::default(),
    )?;
    let nodes = parse_nodes(&to_text(|buf| write_nodes(&design, buf)))?;
    let rows = parse_scl(&to_text(|buf| write_scl(&design, buf)))?;
    let mut pl = parse_pl(&to_text(|buf| write_pl(&design, buf)))?;
    pl.retain(|p| p.name != "r1");
    let result = regenerate_def(&module, &lib, &s, &nodes, &rows, &pl);
    assert!(matches!(result, Err(ShelfError::Linkage { .. })));
    Ok(())
}
