use super::read::parse_str;
use super::*;

/// A minimal, well-formed netlist used across several tests:
/// two gates, one internal wire, and a clock port that touches nothing
/// but the flip-flop's clock pin.
const SMALL_NETLIST: &str = r#"
// generated netlist
module top (
a,
b,
clk,
y );

input a;
input b;
input clk;
output y;

wire n1;
wire y;

na02s01 u1 ( .a(a), .b(b), .o(n1) );
ms00f80 r1 ( .d(n1), .ck(clk), .o(y) );

endmodule
"#;

#[test]
fn it_parses_a_module() -> VlogResult<()> {
    let module = parse_str(SMALL_NETLIST)?;
    assert_eq!(module.name, "top");
    assert_eq!(module.inputs().count(), 3);
    assert_eq!(module.outputs().count(), 1);
    // `y` is declared both as an output and a wire; the port wins
    assert_eq!(module.wires, vec!["n1".to_string()]);
    assert_eq!(module.instance_count(), 2);
    Ok(())
}

#[test]
fn it_creates_shadow_instances() -> VlogResult<()> {
    let module = parse_str(SMALL_NETLIST)?;
    // One shadow per port, on top of the two real gates
    assert_eq!(module.instances.len(), 2 + 4);
    let pi = module
        .instances
        .iter()
        .find(|i| i.gate_type == PI && i.name == "a")
        .expect("missing PI shadow");
    assert_eq!(pi.output_pins, vec![("o".to_string(), "a".to_string())]);
    let po = module
        .instances
        .iter()
        .find(|i| i.gate_type == PO && i.name == "y")
        .expect("missing PO shadow");
    assert_eq!(po.input_pins, vec![("a".to_string(), "y".to_string())]);
    Ok(())
}

#[test]
fn it_builds_the_graph() -> VlogResult<()> {
    let module = parse_str(SMALL_NETLIST)?;
    assert_eq!(module.nets.len(), 5); // a, b, clk, y, n1
    assert_eq!(module.nets["a"].degree(), 2); // PI shadow + u1
    assert_eq!(module.nets["n1"].degree(), 2); // u1 + r1
    assert_eq!(module.nets["clk"].degree(), 2); // PI shadow + r1
    assert_eq!(module.nets["y"].degree(), 2); // r1 + PO shadow
    Ok(())
}

#[test]
fn it_routes_pins_by_prefix() -> VlogResult<()> {
    let module = parse_str(SMALL_NETLIST)?;
    let u1 = module
        .instances
        .iter()
        .find(|i| i.name == "u1")
        .expect("missing u1");
    assert_eq!(u1.output_pins, vec![("o".to_string(), "n1".to_string())]);
    assert_eq!(
        u1.input_pins,
        vec![
            ("a".to_string(), "a".to_string()),
            ("b".to_string(), "b".to_string())
        ]
    );
    Ok(())
}

#[test]
fn it_fails_on_unresolved_nets() {
    let src = r#"
        module top (a, y);
        input a;
        output y;
        wire n1;
        inv01 u1 ( .a(a), .o(n1) );
        inv01 u2 ( .a(no_such_net), .o(y) );
        endmodule
    "#;
    match parse_str(src) {
        Err(VlogError::Resolve {
            instance,
            gate_type,
            net,
        }) => {
            assert_eq!(instance, "u2");
            assert_eq!(gate_type, "inv01");
            assert_eq!(net, "no_such_net");
        }
        other => panic!("expected a resolution error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn it_fails_on_degenerate_netlists() {
    // No wires at all
    let src = r#"
        module top (a, y);
        input a;
        output y;
        inv01 u1 ( .a(a), .o(y) );
        endmodule
    "#;
    assert!(parse_str(src).is_err());
    // No instances
    let src = r#"
        module top (a, y);
        input a;
        output y;
        wire n1;
        endmodule
    "#;
    assert!(parse_str(src).is_err());
}

#[test]
fn it_finds_floating_nets() -> VlogResult<()> {
    let src = r#"
        module top (a, y);
        input a;
        output y;
        wire n1;
        wire dangling;
        inv01 u1 ( .a(a), .o(n1) );
        inv01 u2 ( .a(n1), .o(y) );
        inv01 u3 ( .a(n1), .o(dangling) );
        endmodule
    "#;
    let module = parse_str(src)?;
    let floats = module.floating_nets();
    assert_eq!(floats.len(), 1);
    assert_eq!(floats[0].net, "dangling");
    assert_eq!(floats[0].instance, "u3");
    assert_eq!(floats[0].pin, "o");
    Ok(())
}

#[test]
fn floating_count_ignores_ports_and_blocks() -> VlogResult<()> {
    // An unconnected input port and a block-only net are both tolerated
    let src = r#"
        module top (a, unused, y);
        input a;
        input unused;
        output y;
        wire n1;
        wire bnet;
        inv01 u1 ( .a(a), .o(n1) );
        inv01 u2 ( .a(n1), .o(y) );
        block_ram m1 ( .a(bnet) );
        endmodule
    "#;
    let module = parse_str(src)?;
    assert_eq!(module.floating_nets().len(), 0);
    Ok(())
}

#[test]
fn floating_count_is_parse_order_invariant() -> VlogResult<()> {
    let forward = r#"
        module top (a, y);
        input a;
        output y;
        wire n1;
        wire dangling;
        inv01 u1 ( .a(a), .o(n1) );
        inv01 u2 ( .a(n1), .o(y) );
        inv01 u3 ( .a(n1), .o(dangling) );
        endmodule
    "#;
    let backward = r#"
        module top (a, y);
        input a;
        output y;
        wire dangling;
        wire n1;
        inv01 u3 ( .a(n1), .o(dangling) );
        inv01 u2 ( .a(n1), .o(y) );
        inv01 u1 ( .a(a), .o(n1) );
        endmodule
    "#;
    let fwd = parse_str(forward)?.floating_nets();
    let bwd = parse_str(backward)?.floating_nets();
    assert_eq!(fwd.len(), bwd.len());
    assert_eq!(fwd[0].net, bwd[0].net);
    Ok(())
}

#[test]
fn it_removes_the_clock_port() -> VlogResult<()> {
    let mut module = parse_str(SMALL_NETLIST)?;
    module.clock_port = Some("clk".to_string());
    let ports_before = module.ports.len();
    let insts_before = module.instances.len();
    module.remove_clock_port()?;
    assert_eq!(module.ports.len(), ports_before - 1);
    // The shadow instance stays; shadows are filtered from every output
    assert_eq!(module.instances.len(), insts_before);
    assert!(!module.nets.contains_key("clk"));
    // The name stays designated so emission can keep excluding the net
    assert_eq!(module.clock_port.as_deref(), Some("clk"));
    // A second removal has nothing left to remove
    assert!(module.remove_clock_port().is_err());
    Ok(())
}

#[test]
fn it_computes_stats() -> VlogResult<()> {
    let mut module = parse_str(SMALL_NETLIST)?;
    module.clock_port = Some("clk".to_string());
    let stats = module.stats();
    assert_eq!(stats.num_inputs, 3);
    assert_eq!(stats.num_outputs, 1);
    assert_eq!(stats.num_wires, 1);
    assert_eq!(stats.num_instances, 2);
    assert_eq!(stats.max_degree.1, 2);
    // Four nets remain once the clock is excluded, each of degree two
    assert!((stats.avg_degree - 2.0).abs() < 1e-9);
    Ok(())
}

#[test]
fn it_roundtrips_through_the_writer() -> VlogResult<()> {
    let module = parse_str(SMALL_NETLIST)?;
    let text = module.to_vlog_string()?;
    let again = parse_str(&text)?;
    assert_eq!(module.inputs().count(), again.inputs().count());
    assert_eq!(module.outputs().count(), again.outputs().count());
    assert_eq!(module.wires.len(), again.wires.len());
    assert_eq!(module.instance_count(), again.instance_count());
    for (name, net) in module.nets.iter() {
        assert_eq!(net.degree(), again.nets[name].degree());
    }
    Ok(())
}

#[test]
fn it_finds_the_sdc_clock_port() -> VlogResult<()> {
    let src = "# constraints\ncreate_clock -name mclk -period 50000.00 [get_ports iccad_clk]\n";
    assert_eq!(sdc::find_clock_port(src)?, "iccad_clk");
    // No create_clock line at all
    assert!(sdc::find_clock_port("set_input_delay 0.0\n").is_err());
    Ok(())
}

#[test]
fn it_writes_sdc() -> VlogResult<()> {
    let mut module = parse_str(SMALL_NETLIST)?;
    module.clock_port = Some("clk".to_string());
    let text = sdc::to_string(&module, 50000.0)?;
    assert!(text.contains("create_clock -name mclk -period 50000.00 [get_ports clk]"));
    // The clock port gets no input delay of its own
    assert!(!text.contains("set_input_delay 0.0 [get_ports clk]"));
    assert!(text.contains("set_input_delay 0.0 [get_ports a] -clock mclk"));
    assert!(text.contains("set_load -pin_load 4.0 [get_ports y]"));
    // Round-trip: the clock we wrote is the clock we find
    assert_eq!(sdc::find_clock_port(&text)?, "clk");
    Ok(())
}
