use crate::error::PowerFlowError;
use crate::network::{Line, Network};
use crate::order::BusOrder;
use nalgebra::DMatrix;
use num_complex::Complex64;
use std::f64::consts::PI;

/// Per-unit series admittance and total shunt admittance of a line.
///
/// The impedance base is taken from the nominal voltage of the
/// "from" bus.
pub fn line_admittance(line: &Line, vn_kv: f64, sn_mva: f64, f_hz: f64) -> (Complex64, Complex64) {
    let z_base = vn_kv * vn_kv / sn_mva;
    let r = line.r_ohm_per_km * line.length_km / z_base;
    let x = line.x_ohm_per_km * line.length_km / z_base;

    let y_s = Complex64::new(1.0, 0.0) / Complex64::new(r, x); // series admittance
    // line charging susceptance
    let b_c = 2.0 * PI * f_hz * line.c_nf_per_km * 1e-9 * line.length_km * z_base;
    let g_c = line.g_us_per_km * 1e-6 * line.length_km * z_base;

    (y_s, Complex64::new(g_c, b_c))
}

/// Builds the bus admittance matrix.
///
/// Rows and columns follow the internal bus order. Out-of-service
/// lines are skipped.
pub fn make_ybus(net: &Network, order: &BusOrder) -> Result<DMatrix<Complex64>, PowerFlowError> {
    let nb = order.len();
    let mut y_bus = DMatrix::<Complex64>::zeros(nb, nb);

    // For each line, compute the elements of the branch admittance matrix where:
    //
    //      | If |   | Yff  Yft |   | Vf |
    //      |    | = |          | * |    |
    //      | It |   | Ytf  Ytt |   | Vt |
    for line in net.line.iter().filter(|l| l.in_service) {
        let f = order.int("line", line.from_bus)?;
        let t = order.int("line", line.to_bus)?;
        let vn_kv = net.bus[f].vn_kv;

        let (y_s, y_c) = line_admittance(line, vn_kv, net.sn_mva, net.f_hz);

        let y_tt = y_s + y_c / 2.0;
        let y_ff = y_tt;
        let y_ft = -y_s;
        let y_tf = -y_s;

        y_bus[(f, f)] += y_ff;
        y_bus[(f, t)] += y_ft;
        y_bus[(t, f)] += y_tf;
        y_bus[(t, t)] += y_tt;
    }

    Ok(y_bus)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_bus_net() -> Network {
        let mut net = Network::new("ybus");
        net.create_bus_with_index(0, 20.0, None);
        net.create_bus_with_index(1, 0.4, None);
        net.create_line_from_parameters(0, 1, 1.0, 0.01, 10.0, 0.0, 0.0, 100.0);
        net
    }

    #[test]
    fn series_line_stamps() {
        let net = two_bus_net();
        let order = BusOrder::new(&net).unwrap();
        let y_bus = make_ybus(&net, &order).unwrap();

        // z_base = 400 ohm
        let y_s = Complex64::new(1.0, 0.0) / Complex64::new(0.01 / 400.0, 10.0 / 400.0);
        assert!((y_bus[(0, 0)] - y_s).norm() < 1e-9);
        assert!((y_bus[(0, 1)] + y_s).norm() < 1e-9);
        assert_eq!(y_bus[(0, 1)], y_bus[(1, 0)]);

        // rows of a shunt-free network sum to zero
        for i in 0..2 {
            let sum: Complex64 = y_bus.row(i).iter().sum();
            assert!(sum.norm() < 1e-9);
        }
    }

    #[test]
    fn charging_splits_between_ends() {
        let mut net = Network::new("ybus");
        net.create_buses(&[0, 1], 0.4);
        net.create_line_from_parameters(0, 1, 1.0, 0.208, 0.08, 261.0, 0.0, 0.27);
        let order = BusOrder::new(&net).unwrap();
        let y_bus = make_ybus(&net, &order).unwrap();

        let b_c = 2.0 * PI * 50.0 * 261e-9 * 0.16;
        let row_sum: Complex64 = y_bus.row(0).iter().sum();
        assert!((row_sum.im - b_c / 2.0).abs() < 1e-12);
    }

    #[test]
    fn skips_out_of_service_lines() {
        let mut net = two_bus_net();
        net.line[0].in_service = false;
        let order = BusOrder::new(&net).unwrap();
        let y_bus = make_ybus(&net, &order).unwrap();
        assert!(y_bus.iter().all(|y| y.norm() == 0.0));
    }

    #[test]
    fn unknown_bus_is_an_error() {
        let mut net = two_bus_net();
        net.create_line_from_parameters(0, 7, 1.0, 0.01, 0.01, 0.0, 0.0, 1.0);
        let order = BusOrder::new(&net).unwrap();
        assert_eq!(
            make_ybus(&net, &order).err(),
            Some(PowerFlowError::UnknownBus {
                element: "line",
                bus: 7
            })
        );
    }
}
