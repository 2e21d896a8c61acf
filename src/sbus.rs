use crate::error::PowerFlowError;
use crate::network::Network;
use crate::order::BusOrder;
use num_complex::Complex64;

pub trait SBus {
    fn s_bus(&self, v_m: &[f64]) -> Vec<Complex64>;
    /// Diagonal of dSbus/dVm due to voltage dependent loads.
    fn d_sbus_d_vm(&self, v_m: &[f64]) -> Vec<Complex64>;
}

/// Per-bus injection split into constant power, constant current and
/// constant impedance parts, in per unit.
#[derive(Clone, Debug)]
pub struct MakeSBus {
    s_p: Vec<Complex64>,
    sd_i: Vec<Complex64>,
    sd_z: Vec<Complex64>,
}

impl MakeSBus {
    pub fn new(net: &Network, order: &BusOrder) -> Result<Self, PowerFlowError> {
        let nb = order.len();
        let base_mva = Complex64::new(net.sn_mva, 0.0);

        let mut s_p = vec![Complex64::default(); nb];
        let mut sd_i = vec![Complex64::default(); nb];
        let mut sd_z = vec![Complex64::default(); nb];

        for g in net.sgen.iter().filter(|g| g.in_service) {
            let i = order.int("sgen", g.bus)?;
            s_p[i] += Complex64::new(g.p_mw, g.q_mvar) / base_mva;
        }

        for l in net.load.iter().filter(|l| l.in_service) {
            let i = order.int("load", l.bus)?;
            let s = Complex64::new(l.p_mw, l.q_mvar) / base_mva;
            let z = l.const_z_percent / 100.0;
            let c = l.const_i_percent / 100.0;

            s_p[i] -= s * (1.0 - z - c);
            sd_i[i] += s * c;
            sd_z[i] += s * z;
        }

        Ok(Self { s_p, sd_i, sd_z })
    }

    /// Injections at nominal voltage.
    pub fn nominal(&self) -> Vec<Complex64> {
        self.s_bus(&vec![1.0; self.s_p.len()])
    }
}

impl SBus for MakeSBus {
    fn s_bus(&self, v_m: &[f64]) -> Vec<Complex64> {
        (0..self.s_p.len())
            .map(|i| self.s_p[i] - self.sd_i[i] * v_m[i] - self.sd_z[i] * (v_m[i] * v_m[i]))
            .collect()
    }

    fn d_sbus_d_vm(&self, v_m: &[f64]) -> Vec<Complex64> {
        (0..self.s_p.len())
            .map(|i| -(self.sd_i[i] + self.sd_z[i] * (2.0 * v_m[i])))
            .collect()
    }
}
