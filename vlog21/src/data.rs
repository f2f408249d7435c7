//!
//! # Vlog21 Netlist Data Model
//!

// Std-Lib
use std::collections::HashMap;
use std::path::Path;

// Crates.io Imports
use serde::{Deserialize, Serialize};

/// Gate-type prefix identifying big-block (hard macro) instances
pub const BLOCK_PREFIX: &str = "block_";
/// Gate-type names of the power/ground tie cells
pub const TIE_CELLS: [&str; 2] = ["vcc", "vss"];
/// Sentinel gate-type of the shadow instance behind each primary input
pub const PI: &str = "PI";
/// Sentinel gate-type of the shadow instance behind each primary output
pub const PO: &str = "PO";
/// Pins whose names begin with this prefix are treated as output pins.
/// The accompanying cell libraries name their output pins `o`, `o1`, etc;
/// changing this silently flips the direction codes of every net record.
pub const OUTPUT_PIN_PREFIX: char = 'o';

/// # Port Direction
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}
impl PortDirection {
    /// Single-character direction code, as used by net pin records
    pub fn code(&self) -> char {
        match self {
            Self::Input => 'I',
            Self::Output => 'O',
        }
    }
}
impl std::fmt::Display for PortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            Self::Input => "INPUT",
            Self::Output => "OUTPUT",
        };
        write!(f, "{}", s)
    }
}

/// # Top-Level Module Port
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct VlogPort {
    /// Port Name. Also the name of the net it drives or loads.
    pub name: String,
    /// Direction
    pub direction: PortDirection,
}

/// # Gate Instance
///
/// One flat gate instantiation. Pin connections are kept in parse order,
/// split into input and output pins by the [OUTPUT_PIN_PREFIX] convention.
#[derive(Clone, Default, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct VlogInstance {
    /// Gate Type. A library cell name, a big-block type, a tie cell,
    /// or one of the [PI]/[PO] sentinels.
    pub gate_type: String,
    /// Instance Name
    pub name: String,
    /// Input (pin, net) connections, in parse order
    pub input_pins: Vec<(String, String)>,
    /// Output (pin, net) connections, in parse order
    pub output_pins: Vec<(String, String)>,
}
impl VlogInstance {
    /// Create a new, unconnected [VlogInstance]
    pub fn new(gate_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            gate_type: gate_type.into(),
            name: name.into(),
            ..Default::default()
        }
    }
    /// Connect pin `pin` to net `net`, routing on the output-pin naming convention.
    pub fn connect(&mut self, pin: impl Into<String>, net: impl Into<String>) {
        let (pin, net) = (pin.into(), net.into());
        if pin.starts_with(OUTPUT_PIN_PREFIX) {
            self.output_pins.push((pin, net));
        } else {
            self.input_pins.push((pin, net));
        }
    }
    /// Iterate all (pin, net) connections, inputs first
    pub fn pins(&self) -> impl Iterator<Item = &(String, String)> {
        self.input_pins.iter().chain(self.output_pins.iter())
    }
    /// Find the name of a pin connected to net `net`
    pub fn pin_of_net(&self, net: &str) -> Option<&str> {
        self.pins()
            .find(|(_, n)| n == net)
            .map(|(p, _)| p.as_str())
    }
    /// Boolean indication of being a [PI]/[PO] shadow instance
    pub fn is_shadow(&self) -> bool {
        self.gate_type == PI || self.gate_type == PO
    }
    /// Boolean indication of being a big-block instance
    pub fn is_block(&self) -> bool {
        self.gate_type.starts_with(BLOCK_PREFIX)
    }
    /// Boolean indication of being a tie cell
    pub fn is_tie(&self) -> bool {
        TIE_CELLS.contains(&self.gate_type.as_str())
    }
}

/// # Net
///
/// Identity is the net name. Holds the indices (into [VlogModule::instances])
/// of every connected instance, in the order connections were scanned.
#[derive(Clone, Default, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct VlogNet {
    /// Net Name
    pub name: String,
    /// Connected instance indices, in insertion order
    pub nodes: Vec<usize>,
}
impl VlogNet {
    /// Create a new, unconnected [VlogNet] named `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
        }
    }
    /// Number of connected pins
    pub fn degree(&self) -> usize {
        self.nodes.len()
    }
}

/// # Floating-Net Report Entry
///
/// A net of degree one whose sole terminal is a real gate,
/// i.e. not a port shadow and not a big block.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct FloatingNet {
    pub net: String,
    pub instance: String,
    pub gate_type: String,
    pub pin: String,
}

/// # Gate-Level Module
///
/// The netlist's primary content container: ports, internal wires, gate
/// instances, and the net connectivity graph built over them.
#[derive(Clone, Default, Debug, Deserialize, Serialize, PartialEq)]
pub struct VlogModule {
    /// Module Name
    pub name: String,
    /// Top-Level Ports
    pub ports: Vec<VlogPort>,
    /// Internal Wire Names. Disjoint from the port names.
    pub wires: Vec<String>,
    /// Gate Instances, including one shadow instance per port
    pub instances: Vec<VlogInstance>,
    /// Connectivity graph, keyed by net name
    pub nets: HashMap<String, VlogNet>,
    /// Designated clock port, if any
    pub clock_port: Option<String>,
}
impl VlogModule {
    /// Open a [VlogModule] from netlist file `fname`
    pub fn open(fname: impl AsRef<Path>) -> VlogResult<VlogModule> {
        super::read::parse_file(fname)
    }
    /// Write `self` to netlist file `fname`
    pub fn save(&self, fname: impl AsRef<Path>) -> VlogResult<()> {
        super::write::save(self, fname)
    }
    /// Write `self` to a netlist-format [String]
    pub fn to_vlog_string(&self) -> VlogResult<String> {
        super::write::to_string(self)
    }
    /// Iterate the input ports
    pub fn inputs(&self) -> impl Iterator<Item = &VlogPort> {
        self.ports
            .iter()
            .filter(|p| p.direction == PortDirection::Input)
    }
    /// Iterate the output ports
    pub fn outputs(&self) -> impl Iterator<Item = &VlogPort> {
        self.ports
            .iter()
            .filter(|p| p.direction == PortDirection::Output)
    }
    /// Number of gate instances, excluding the [PI]/[PO] shadows
    pub fn instance_count(&self) -> usize {
        self.instances.iter().filter(|i| !i.is_shadow()).count()
    }
    /// (Re-)create the per-port shadow instances.
    /// Any previously created shadows are dropped first.
    /// A [PI] shadow drives its net from single output pin `o`;
    /// a [PO] shadow loads its net on single input pin `a`.
    pub fn create_shadow_instances(&mut self) {
        self.instances.retain(|i| !i.is_shadow());
        for port in self.ports.iter() {
            let mut inst = match port.direction {
                PortDirection::Input => VlogInstance::new(PI, &port.name),
                PortDirection::Output => VlogInstance::new(PO, &port.name),
            };
            match port.direction {
                PortDirection::Input => inst.output_pins.push(("o".into(), port.name.clone())),
                PortDirection::Output => inst.input_pins.push(("a".into(), port.name.clone())),
            }
            self.instances.push(inst);
        }
    }
    /// Build the connectivity graph.
    ///
    /// Seeds a [VlogNet] per port and per wire, then appends every instance
    /// to the net behind each of its pins. A pin naming a net with no
    /// declaration is a fatal resolution error reporting the instance.
    pub fn build_graph(&mut self) -> VlogResult<()> {
        let mut nets: HashMap<String, VlogNet> = HashMap::new();
        for port in self.ports.iter() {
            nets.insert(port.name.clone(), VlogNet::new(&port.name));
        }
        for wire in self.wires.iter() {
            nets.insert(wire.clone(), VlogNet::new(wire));
        }
        for (idx, inst) in self.instances.iter().enumerate() {
            for (_pin, net) in inst.pins() {
                match nets.get_mut(net) {
                    Some(n) => n.nodes.push(idx),
                    None => {
                        return Err(VlogError::Resolve {
                            instance: inst.name.clone(),
                            gate_type: inst.gate_type.clone(),
                            net: net.clone(),
                        })
                    }
                }
            }
        }
        self.nets = nets;
        Ok(())
    }
    /// Scan the graph for floating nets: degree-one nets whose sole
    /// terminal is neither a port shadow nor a big block.
    /// Returned sorted by net name. Diagnostic only, never fatal.
    pub fn floating_nets(&self) -> Vec<FloatingNet> {
        let mut floats = Vec::new();
        for net in self.nets.values() {
            if net.degree() != 1 {
                continue;
            }
            let node = &self.instances[net.nodes[0]];
            if node.is_shadow() || node.is_block() {
                continue;
            }
            let pin = node.pin_of_net(&net.name).unwrap_or_default().to_string();
            floats.push(FloatingNet {
                net: net.name.clone(),
                instance: node.name.clone(),
                gate_type: node.gate_type.clone(),
                pin,
            });
        }
        floats.sort_by(|a, b| a.net.cmp(&b.net));
        floats
    }
    /// Remove the designated clock port and its net, so that neither is
    /// emitted. The `clock_port` name stays set so that emission keeps
    /// excluding the clock net's connections, and the port's shadow
    /// instance stays in place: shadows are filtered from every output,
    /// and removing it would shift the instance indices the net graph
    /// holds. Fatal if no such port exists.
    pub fn remove_clock_port(&mut self) -> VlogResult<()> {
        let clock = match self.clock_port.clone() {
            Some(c) => c,
            None => return Err(VlogError::Str("no clock port was set".into())),
        };
        if !self.ports.iter().any(|p| p.name == clock) {
            return Err(VlogError::Str(format!(
                "clock port {} does not exist, or it is already removed",
                clock
            )));
        }
        self.ports.retain(|p| p.name != clock);
        self.nets.remove(&clock);
        Ok(())
    }
    /// Summarize the module into a [VlogStats]
    pub fn stats(&self) -> VlogStats {
        let num_blocks = self.instances.iter().filter(|i| i.is_block()).count();
        let num_ties = self.instances.iter().filter(|i| i.is_tie()).count();
        let mut max_degree = (String::new(), 0);
        let mut total_degree = 0usize;
        let mut num_nets = 0usize;
        for net in self.nets.values() {
            if Some(&net.name) == self.clock_port.as_ref() {
                continue;
            }
            num_nets += 1;
            total_degree += net.degree();
            if net.degree() > max_degree.1 {
                max_degree = (net.name.clone(), net.degree());
            }
        }
        let avg_degree = if num_nets == 0 {
            0.0
        } else {
            total_degree as f64 / num_nets as f64
        };
        VlogStats {
            name: self.name.clone(),
            clock_port: self.clock_port.clone(),
            num_inputs: self.inputs().count(),
            num_outputs: self.outputs().count(),
            num_wires: self.wires.len(),
            num_instances: self.instance_count(),
            num_blocks,
            num_ties,
            max_degree,
            avg_degree,
        }
    }
}

/// # Module Summary Statistics
///
/// The clock net is excluded from the degree figures.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct VlogStats {
    pub name: String,
    pub clock_port: Option<String>,
    pub num_inputs: usize,
    pub num_outputs: usize,
    pub num_wires: usize,
    pub num_instances: usize,
    pub num_blocks: usize,
    pub num_ties: usize,
    /// Highest net degree, with the net's name
    pub max_degree: (String, usize),
    pub avg_degree: f64,
}
impl std::fmt::Display for VlogStats {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "Name               : {}", self.name)?;
        writeln!(
            f,
            "Name of clock port : {}",
            self.clock_port.as_deref().unwrap_or("(none)")
        )?;
        writeln!(f, "Number of inputs   : {}", self.num_inputs)?;
        writeln!(f, "Number of outputs  : {}", self.num_outputs)?;
        writeln!(f, "Number of wires    : {}", self.num_wires)?;
        writeln!(f, "Number of instances: {}", self.num_instances)?;
        if self.num_blocks != 0 {
            writeln!(f, "Number of macros   : {}", self.num_blocks)?;
        }
        if self.num_ties != 0 {
            writeln!(f, "Number of tie cells: {}", self.num_ties)?;
        }
        writeln!(
            f,
            "Maximum net degree : {} ({})",
            self.max_degree.1, self.max_degree.0
        )?;
        write!(f, "Average net degree : {:.6}", self.avg_degree)
    }
}

use super::read::{ParserState, VlogParseErrorType};

/// # Vlog Error Enumeration
#[derive(Debug)]
pub enum VlogError {
    /// Lexer Errors
    Lex {
        next_char: Option<char>,
        line: usize,
        pos: usize,
    },
    /// Parser Errors
    Parse {
        msg: Option<String>,
        tp: VlogParseErrorType,
        state: ParserState,
    },
    /// Net-resolution failure: an instance pin names an undeclared net
    Resolve {
        instance: String,
        gate_type: String,
        net: String,
    },
    /// Wrapped errors, generally from other crates
    Boxed(Box<dyn std::error::Error>),
    /// String message-valued errors
    Str(String),
}
impl From<std::io::Error> for VlogError {
    fn from(e: std::io::Error) -> Self {
        Self::Boxed(Box::new(e))
    }
}
impl From<String> for VlogError {
    /// Convert string-based errors by wrapping them
    fn from(e: String) -> Self {
        Self::Str(e)
    }
}
impl From<&str> for VlogError {
    /// Convert string-based errors by wrapping them
    fn from(e: &str) -> Self {
        Self::Str(e.into())
    }
}
impl std::fmt::Display for VlogError {
    /// Delegates to the [Debug] implementation
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        std::fmt::Debug::fmt(self, f)
    }
}
impl std::error::Error for VlogError {}

/// Vlog21 Library-Wide Result Type
pub type VlogResult<T> = Result<T, VlogError>;
