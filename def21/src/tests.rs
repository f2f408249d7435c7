use super::read::{parse_str, DefParseErrorType};
use super::*;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Decimal-literal helper
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

const SMALL_DEF: &str = r#"
# floorplanned layout
VERSION 5.7 ;
DIVIDERCHAR "/" ;
BUSBITCHARS "[]" ;
DESIGN top ;
UNITS DISTANCE MICRONS 2000 ;

DIEAREA ( 0 0 ) ( 102400 102400 ) ;

ROW core_SITE_ROW_0 core 0 0 N DO 256 BY 1 STEP 400 0 ;
ROW core_SITE_ROW_1 core 0 3200 N DO 256 BY 1 STEP 400 0 ;
TRACKS X 190 DO 269 STEP 380 LAYER metal2 ;
GCELLGRID X 0 DO 26 STEP 4000 ;

COMPONENTS 2 ;
- u1 na02s01
    + PLACED ( 400 0 ) N ;
- m1 block_ram
    + FIXED ( 40000 40000 ) N ;
END COMPONENTS

PINS 2 ;
- a + NET a
    + DIRECTION INPUT
    + FIXED ( 0 800 ) N
        + LAYER metal3 ( 0 0 ) ( 380 380 ) ;
- y + NET y
    + DIRECTION OUTPUT
    + FIXED ( 102400 800 ) N
        + LAYER metal3 ( 0 0 ) ( 380 380 ) ;
END PINS

NETS 1 ;
- a ( PIN a ) ( u1 a ) ;
END NETS

END DESIGN
"#;

#[test]
fn it_parses_header_and_units() -> DefResult<()> {
    let design = parse_str(SMALL_DEF)?;
    assert_eq!(design.name, "top");
    assert_eq!(design.version, Some(dec("5.7")));
    assert_eq!(design.divider_char, Some('/'));
    assert_eq!(design.bus_bit_chars, Some(('[', ']')));
    assert_eq!(design.dbu_per_micron, 2000);
    assert_eq!(
        design.die_area,
        Some((DefPoint::new(0, 0), DefPoint::new(102400, 102400)))
    );
    Ok(())
}

#[test]
fn it_parses_rows() -> DefResult<()> {
    let design = parse_str(SMALL_DEF)?;
    assert_eq!(design.rows.len(), 2);
    let row = &design.rows[1];
    assert_eq!(row.name, "core_SITE_ROW_1");
    assert_eq!(row.site, "core");
    assert_eq!(row.origin, DefPoint::new(0, 3200));
    assert_eq!(row.orient, DefOrient::N);
    assert_eq!(row.num_x, 256);
    assert_eq!(row.num_y, 1);
    assert_eq!(row.step, DefPoint::new(400, 0));
    Ok(())
}

#[test]
fn it_parses_components() -> DefResult<()> {
    let design = parse_str(SMALL_DEF)?;
    assert_eq!(design.components.len(), 2);
    let by_name = design.components_by_name();
    let u1 = by_name["u1"];
    assert_eq!(u1.macro_name, "na02s01");
    assert!(!u1.fixed);
    assert_eq!(u1.location, DefPoint::new(400, 0));
    let m1 = by_name["m1"];
    assert!(m1.fixed);
    assert_eq!(m1.location, DefPoint::new(40000, 40000));
    Ok(())
}

#[test]
fn it_parses_pins() -> DefResult<()> {
    let design = parse_str(SMALL_DEF)?;
    assert_eq!(design.pins.len(), 2);
    let by_name = design.pins_by_name();
    let a = by_name["a"];
    assert_eq!(a.net, "a");
    assert_eq!(a.direction, "INPUT");
    assert!(a.fixed);
    assert_eq!(a.location, DefPoint::new(0, 800));
    let layer = a.layer.as_ref().expect("missing pin layer");
    assert_eq!(layer.layer_name, "metal3");
    assert_eq!(layer.ur, DefPoint::new(380, 380));
    Ok(())
}

#[test]
fn it_rejects_count_mismatches() {
    let src = r#"
    UNITS DISTANCE MICRONS 2000 ;
    COMPONENTS 3 ;
    - u1 na02s01
        + PLACED ( 0 0 ) N ;
    END COMPONENTS
    END DESIGN
    "#;
    match parse_str(src) {
        Err(DefError::Parse {
            tp: DefParseErrorType::CountMismatch {
                declared, actual, ..
            },
            ..
        }) => {
            assert_eq!(declared, 3);
            assert_eq!(actual, 1);
        }
        other => panic!("expected a count mismatch, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn it_roundtrips_through_the_writer() -> DefResult<()> {
    let design = parse_str(SMALL_DEF)?;
    let text = design.to_def_string()?;
    let again = parse_str(&text)?;
    assert_eq!(design.name, again.name);
    assert_eq!(design.dbu_per_micron, again.dbu_per_micron);
    assert_eq!(design.die_area, again.die_area);
    assert_eq!(design.rows, again.rows);
    assert_eq!(design.components, again.components);
    assert_eq!(design.pins, again.pins);
    Ok(())
}

#[test]
fn it_writes_the_expected_shape() -> DefResult<()> {
    let design = parse_str(SMALL_DEF)?;
    let text = design.to_def_string()?;
    assert!(text.contains("VERSION 5.7 ;"));
    assert!(text.contains("UNITS DISTANCE MICRONS 2000 ;"));
    assert!(text.contains("DIEAREA ( 0 0 ) ( 102400 102400 ) ;"));
    assert!(text.contains("ROW core_SITE_ROW_0 core 0 0 N DO 256 BY 1 STEP 400 0 ;"));
    assert!(text.contains("PINS 2 ;"));
    assert!(text.contains("+ FIXED ( 40000 40000 ) N ;"));
    assert!(text.contains("END DESIGN"));
    Ok(())
}
