use super::read::parse_str;
use super::*;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Decimal-literal helper
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// A small but structurally complete library: units, two routing layers
/// with pitches, one site, one standard cell, and one rectilinear block.
const SMALL_LIB: &str = r#"
VERSION 5.7 ;
NAMESCASESENSITIVE ON ;
BUSBITCHARS "[]" ;
DIVIDERCHAR "/" ;
UNITS
    DATABASE MICRONS 2000 ;
END UNITS
MANUFACTURINGGRID 0.0050 ;
LAYER metal1
    TYPE ROUTING ;
    DIRECTION HORIZONTAL ;
    PITCH 0.2 ;
    WIDTH 0.07 ;
END metal1
LAYER metal2
    TYPE ROUTING ;
    DIRECTION VERTICAL ;
    PITCH 0.2 ;
END metal2
SITE core
    SYMMETRY Y ;
    CLASS core ;
    SIZE 0.2 BY 1.6 ;
END core
MACRO in01f80
    CLASS CORE ;
    FOREIGN in01f80 0.0 0.0 ;
    ORIGIN 0.0 0.0 ;
    SIZE 0.8 BY 1.6 ;
    SYMMETRY X Y ;
    SITE core ;
    PIN o
        DIRECTION OUTPUT ;
        USE SIGNAL ;
        PORT
            LAYER metal1 ;
                RECT 0.6 0.7 0.8 0.9 ;
        END
    END o
    PIN a
        DIRECTION INPUT ;
        PORT
            LAYER metal1 ;
                POLYGON 0.0 0.0 0.0 0.4 0.2 0.4 0.2 0.2 0.4 0.2 0.4 0.0 ;
        END
    END a
END in01f80
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

#[test]
fn it_parses_library_metadata() -> TechLefResult<()> {
    let lib = parse_str(SMALL_LIB)?;
    assert_eq!(lib.version, Some(dec("5.7")));
    assert_eq!(lib.bus_bit_chars, Some(('[', ']')));
    assert_eq!(lib.divider_char, Some('/'));
    assert_eq!(lib.dbu_per_micron, Some(TechLefDbuPerMicron(2000)));
    assert_eq!(lib.manufacturing_grid, Some(dec("0.0050")));
    Ok(())
}

#[test]
fn it_records_layer_pitches() -> TechLefResult<()> {
    let lib = parse_str(SMALL_LIB)?;
    assert_eq!(lib.pitch("metal1")?, dec("0.2"));
    assert_eq!(lib.pitch("metal2")?, dec("0.2"));
    assert!(lib.pitch("metal9").is_err());
    Ok(())
}

#[test]
fn it_parses_the_site() -> TechLefResult<()> {
    let lib = parse_str(SMALL_LIB)?;
    assert_eq!(lib.site.name, "core");
    assert_eq!(lib.site.class, "core");
    assert_eq!(lib.site.symmetry, vec!["Y".to_string()]);
    assert_eq!(lib.site.width, dec("0.2"));
    assert_eq!(lib.site.height, dec("1.6"));
    Ok(())
}

#[test]
fn it_rejects_multiple_sites() {
    let src = r#"
    SITE core
        SIZE 0.2 BY 1.6 ;
    END core
    SITE pad
        SIZE 30.0 BY 30.0 ;
    END pad
    END LIBRARY
    "#;
    assert!(parse_str(src).is_err());
}

#[test]
fn it_rejects_missing_sites() {
    let src = "VERSION 5.7 ;\nEND LIBRARY\n";
    assert!(parse_str(src).is_err());
}

#[test]
fn it_parses_macros() -> TechLefResult<()> {
    let lib = parse_str(SMALL_LIB)?;
    assert_eq!(lib.macros.len(), 2);
    let inv = lib.find_macro("in01f80").expect("missing in01f80");
    assert_eq!(inv.class, MacroClass::Core);
    assert_eq!(inv.width, dec("0.8"));
    assert_eq!(inv.height, dec("1.6"));
    assert_eq!(inv.pins.len(), 2);
    assert!(!inv.footprint.is_rectilinear());
    Ok(())
}

#[test]
fn it_derives_pin_rectangles() -> TechLefResult<()> {
    let lib = parse_str(SMALL_LIB)?;
    let inv = lib.find_macro("in01f80").expect("missing in01f80");

    // Direct RECT geometry
    let o = inv.pin("o").expect("missing pin o");
    assert_eq!(o.direction, PinDirection::Output);
    assert_eq!(o.direction.code(), 'O');
    assert_eq!(o.bbox.ll, TechLefPoint::new(dec("0.6"), dec("0.7")));
    assert_eq!(o.bbox.ur, TechLefPoint::new(dec("0.8"), dec("0.9")));
    assert_eq!(o.center(), TechLefPoint::new(dec("0.7"), dec("0.8")));

    // POLYGON geometry collapses to its bounding box
    let a = inv.pin("a").expect("missing pin a");
    assert_eq!(a.direction.code(), 'I');
    assert_eq!(a.bbox.ll, TechLefPoint::new(dec("0.0"), dec("0.0")));
    assert_eq!(a.bbox.ur, TechLefPoint::new(dec("0.4"), dec("0.4")));
    assert_eq!(a.center(), TechLefPoint::new(dec("0.2"), dec("0.2")));
    Ok(())
}

#[test]
fn it_classifies_rectilinear_macros() -> TechLefResult<()> {
    let lib = parse_str(SMALL_LIB)?;
    let ram = lib.find_macro("block_ram").expect("missing block_ram");
    assert_eq!(ram.class, MacroClass::Block);
    match &ram.footprint {
        MacroFootprint::Rectilinear(rects) => {
            assert_eq!(rects.len(), 2);
            assert_eq!(rects[0].ur, TechLefPoint::new(dec("40.0"), dec("20.0")));
        }
        MacroFootprint::Rectangular => panic!("block_ram should be rectilinear"),
    }
    Ok(())
}

#[test]
fn single_obstruction_stays_rectangular() -> TechLefResult<()> {
    let src = r#"
    SITE core
        SIZE 0.2 BY 1.6 ;
    END core
    MACRO block_one
        CLASS BLOCK ;
        SIZE 10.0 BY 10.0 ;
        OBS
            LAYER metal1 ;
            RECT 0.0 0.0 10.0 10.0 ;
        END
    END block_one
    END LIBRARY
    "#;
    let lib = parse_str(src)?;
    let mac = lib.find_macro("block_one").expect("missing block_one");
    assert!(!mac.footprint.is_rectilinear());
    Ok(())
}

#[test]
fn it_validates_dbu_per_micron() {
    assert!(TechLefDbuPerMicron::try_new(dec("2000")).is_ok());
    assert!(TechLefDbuPerMicron::try_new(dec("2000.0")).is_ok());
    assert!(TechLefDbuPerMicron::try_new(dec("123")).is_err());
    assert!(TechLefDbuPerMicron::try_new(dec("100.5")).is_err());
}

#[test]
fn it_rejects_macros_without_size() {
    let src = r#"
    SITE core
        SIZE 0.2 BY 1.6 ;
    END core
    MACRO broken
        CLASS CORE ;
    END broken
    END LIBRARY
    "#;
    assert!(parse_str(src).is_err());
}
