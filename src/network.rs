use serde::{Deserialize, Serialize};

/// Network is a bus-branch model of a distribution grid expressed in
/// physical units. Elements reference buses by their external index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub name: String,

    /// Reference apparent power for per-unit conversion (MVA).
    /// Default value is 1.
    pub sn_mva: f64,

    /// System frequency (Hz). Default value is 50.
    pub f_hz: f64,

    pub bus: Vec<Bus>,
    pub line: Vec<Line>,
    pub load: Vec<Load>,
    pub sgen: Vec<SGen>,
    pub ext_grid: Vec<ExtGrid>,
}

/// Bus is a node of the network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bus {
    /// External bus index.
    pub index: usize,

    pub name: Option<String>,

    /// Nominal voltage (kV).
    pub vn_kv: f64,

    /// Stored initial voltage magnitude (p.u.).
    pub vm_pu: Option<f64>,

    /// Stored initial voltage angle (degrees).
    pub va_degree: Option<f64>,
}

/// Line is a cable or overhead line given by per-km parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Line {
    pub from_bus: usize,
    pub to_bus: usize,

    pub length_km: f64,

    /// Series resistance (ohm/km).
    pub r_ohm_per_km: f64,
    /// Series reactance (ohm/km).
    pub x_ohm_per_km: f64,
    /// Shunt capacitance (nF/km).
    pub c_nf_per_km: f64,
    /// Shunt conductance (uS/km).
    pub g_us_per_km: f64,

    /// Thermal limit (kA).
    pub max_i_ka: f64,

    pub std_type: Option<String>,
    pub in_service: bool,
}

/// Load is a ZIP load. The remainder of the constant impedance and
/// constant current shares is constant power.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Load {
    pub bus: usize,
    pub name: Option<String>,

    /// Active power demand (MW).
    pub p_mw: f64,
    /// Reactive power demand (MVAr).
    pub q_mvar: f64,

    pub const_z_percent: f64,
    pub const_i_percent: f64,

    pub in_service: bool,
}

/// SGen is a static generator injecting constant power.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SGen {
    pub bus: usize,
    pub p_mw: f64,
    pub q_mvar: f64,
    pub in_service: bool,
}

/// ExtGrid is the slack source fixing the voltage at its bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtGrid {
    pub bus: usize,
    pub name: Option<String>,
    pub vm_pu: f64,
    pub va_degree: f64,
    pub in_service: bool,
}

/// Standard line types by catalogue name.
#[derive(Debug, PartialEq, Copy, Clone)]
pub enum LineStdType {
    /// NAYY 4x150 SE low voltage cable.
    Nayy4x150Se,
}

impl LineStdType {
    pub fn name(&self) -> &'static str {
        match self {
            LineStdType::Nayy4x150Se => "NAYY 4x150 SE",
        }
    }

    /// Returns (r ohm/km, x ohm/km, c nF/km, max kA).
    pub fn parameters(&self) -> (f64, f64, f64, f64) {
        match self {
            LineStdType::Nayy4x150Se => (0.208, 0.08, 261.0, 0.27),
        }
    }
}

impl Default for Network {
    fn default() -> Self {
        Self {
            name: String::new(),
            sn_mva: 1.0,
            f_hz: 50.0,
            bus: Vec::new(),
            line: Vec::new(),
            load: Vec::new(),
            sgen: Vec::new(),
            ext_grid: Vec::new(),
        }
    }
}

impl Network {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Next free external bus index.
    fn next_bus_index(&self) -> usize {
        self.bus.iter().map(|b| b.index + 1).max().unwrap_or(0)
    }

    /// Adds a bus and returns its external index.
    pub fn create_bus(&mut self, vn_kv: f64, name: Option<&str>) -> usize {
        let index = self.next_bus_index();
        self.create_bus_with_index(index, vn_kv, name)
    }

    pub fn create_bus_with_index(&mut self, index: usize, vn_kv: f64, name: Option<&str>) -> usize {
        self.bus.push(Bus {
            index,
            name: name.map(String::from),
            vn_kv,
            vm_pu: None,
            va_degree: None,
        });
        index
    }

    /// Adds one bus per index, all at the same nominal voltage.
    pub fn create_buses(&mut self, indexes: &[usize], vn_kv: f64) -> Vec<usize> {
        indexes
            .iter()
            .map(|&i| self.create_bus_with_index(i, vn_kv, None))
            .collect()
    }

    /// Stores an initial voltage on a bus. Returns false if the bus
    /// does not exist.
    pub fn set_bus_init(&mut self, index: usize, vm_pu: f64, va_degree: f64) -> bool {
        match self.bus.iter_mut().find(|b| b.index == index) {
            Some(b) => {
                b.vm_pu = Some(vm_pu);
                b.va_degree = Some(va_degree);
                true
            }
            None => false,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_line_from_parameters(
        &mut self,
        from_bus: usize,
        to_bus: usize,
        length_km: f64,
        r_ohm_per_km: f64,
        x_ohm_per_km: f64,
        c_nf_per_km: f64,
        g_us_per_km: f64,
        max_i_ka: f64,
    ) -> usize {
        self.line.push(Line {
            from_bus,
            to_bus,
            length_km,
            r_ohm_per_km,
            x_ohm_per_km,
            c_nf_per_km,
            g_us_per_km,
            max_i_ka,
            std_type: None,
            in_service: true,
        });
        self.line.len() - 1
    }

    pub fn create_std_line(
        &mut self,
        from_bus: usize,
        to_bus: usize,
        length_km: f64,
        std_type: LineStdType,
    ) -> usize {
        let (r, x, c, max_i) = std_type.parameters();
        let i = self.create_line_from_parameters(from_bus, to_bus, length_km, r, x, c, 0.0, max_i);
        self.line[i].std_type = Some(std_type.name().to_string());
        i
    }

    pub fn create_load(&mut self, bus: usize, p_mw: f64, q_mvar: f64, name: Option<&str>) -> usize {
        self.load.push(Load {
            bus,
            name: name.map(String::from),
            p_mw,
            q_mvar,
            const_z_percent: 0.0,
            const_i_percent: 0.0,
            in_service: true,
        });
        self.load.len() - 1
    }

    pub fn create_sgen(&mut self, bus: usize, p_mw: f64, q_mvar: f64) -> usize {
        self.sgen.push(SGen {
            bus,
            p_mw,
            q_mvar,
            in_service: true,
        });
        self.sgen.len() - 1
    }

    pub fn create_ext_grid(
        &mut self,
        bus: usize,
        vm_pu: f64,
        va_degree: f64,
        name: Option<&str>,
    ) -> usize {
        self.ext_grid.push(ExtGrid {
            bus,
            name: name.map(String::from),
            vm_pu,
            va_degree,
            in_service: true,
        });
        self.ext_grid.len() - 1
    }

    pub fn n_bus(&self) -> usize {
        self.bus.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_indexes_continue_after_explicit_ones() {
        let mut net = Network::new("test");
        net.create_buses(&[10, 11], 0.4);
        assert_eq!(net.create_bus(0.4, Some("next")), 12);
        assert!(net.set_bus_init(11, 1.01, -0.5));
        assert!(!net.set_bus_init(3, 1.0, 0.0));
        assert_eq!(net.bus[1].vm_pu, Some(1.01));
    }

    #[test]
    fn std_line_uses_catalogue_values() {
        let mut net = Network::new("test");
        net.create_buses(&[0, 1], 0.4);
        let i = net.create_std_line(0, 1, 1.0, LineStdType::Nayy4x150Se);
        let line = &net.line[i];
        assert_eq!(line.r_ohm_per_km, 0.208);
        assert_eq!(line.c_nf_per_km, 261.0);
        assert_eq!(line.std_type.as_deref(), Some("NAYY 4x150 SE"));
    }
}
