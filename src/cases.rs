use crate::network::{LineStdType, Network};
use crate::topology::{GridTopology, RingConfig};

/// Parameters of the two-bus benchmark circuit.
#[derive(Debug, Clone, PartialEq)]
pub struct TwoBusParams {
    /// External grid voltage (p.u.).
    pub v_ext: f64,
    /// Load active power (MW).
    pub p: f64,
    /// Load reactive power (MVAr).
    pub q: f64,
    /// Line conductance parameter; resistance is 1/G ohm/km.
    pub g: f64,
    /// Line susceptance parameter; reactance is 1/B ohm/km.
    pub b: f64,
    /// Stored initial voltage magnitudes (p.u.).
    pub v_init: [f64; 2],
    /// Stored initial voltage angles (degrees).
    pub theta_init: [f64; 2],
}

impl Default for TwoBusParams {
    fn default() -> Self {
        Self {
            v_ext: 1.2,
            p: 0.1,
            q: 0.05,
            g: 100.0,
            b: 0.1,
            v_init: [1.02, 1.0],
            theta_init: [0.0, 0.0],
        }
    }
}

/// Two buses (20 kV and 0.4 kV) joined by a 1 km line, a load on the
/// second bus and an external grid on the first.
pub fn two_bus(params: &TwoBusParams) -> Network {
    let mut net = Network::new("two_bus");

    let bus1 = net.create_bus(20.0, Some("Bus 1"));
    let bus2 = net.create_bus(0.4, Some("Bus 2"));
    net.set_bus_init(bus1, params.v_init[0], params.theta_init[0]);
    net.set_bus_init(bus2, params.v_init[1], params.theta_init[1]);

    net.create_line_from_parameters(
        bus1,
        bus2,
        1.0,
        1.0 / params.g,
        1.0 / params.b,
        0.0,
        0.0,
        100.0,
    );

    net.create_load(bus2, params.p, params.q, Some("Load"));
    net.create_ext_grid(bus1, params.v_ext, 0.0, Some("Grid Connection"));

    net
}

/// Fictional low voltage grid of rings fed from bus 0 through bus 1.
pub fn meshed_grid(config: &RingConfig) -> (Network, GridTopology) {
    let topo = config.build();

    let mut net = Network::new("meshed_grid");
    net.create_bus_with_index(0, 0.4, None);
    net.create_bus_with_index(1, 0.4, None);
    net.create_line_from_parameters(0, 1, 1.0, 0.01, 0.01, 0.01, 0.0, 100.0);
    net.create_ext_grid(0, 1.0, 0.0, None);

    net.create_buses(&topo.buses, 0.4);
    for (from, to) in topo.lines() {
        net.create_std_line(from, to, 1.0, LineStdType::Nayy4x150Se);
    }
    for &bus in topo.buses.iter() {
        net.create_load(bus, 0.001, 0.0, None);
    }

    (net, topo)
}

/// A 10 kV source feeding a single bus with a static generator through
/// a short line.
pub fn high_injection_feeder(p_mw: f64, q_mvar: f64) -> Network {
    let mut net = Network::new("high_injection_feeder");
    let node = net.create_bus(10.0, Some("node_0"));
    let source = net.create_bus(10.0, Some("source"));
    net.create_line_from_parameters(source, node, 1.0, 0.01, 0.01, 0.01, 0.0, 100.0);
    net.create_ext_grid(source, 1.0, 0.0, None);
    net.create_sgen(node, p_mw, q_mvar);
    net
}
