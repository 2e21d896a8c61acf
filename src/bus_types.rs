use crate::error::PowerFlowError;
use crate::network::Network;
use crate::order::BusOrder;
use std::collections::HashSet;

/// Builds index lists for each type of bus (REF, PV, PQ).
///
/// Buses with an in-service external grid are reference buses; every
/// other bus is PQ. The network has no voltage controlled generators so
/// the PV list is always empty.
pub fn bus_types(
    net: &Network,
    order: &BusOrder,
) -> Result<(Vec<usize>, Vec<usize>, Vec<usize>), PowerFlowError> {
    let mut ref_bus = HashSet::new();
    for eg in net.ext_grid.iter().filter(|eg| eg.in_service) {
        ref_bus.insert(order.int("ext_grid", eg.bus)?);
    }

    let refbus = (0..order.len())
        .filter(|i| ref_bus.contains(i))
        .collect::<Vec<usize>>();
    let pv = Vec::new();
    let pq = (0..order.len())
        .filter(|i| !ref_bus.contains(i))
        .collect::<Vec<usize>>();

    Ok((refbus, pv, pq))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ext_grid_buses_are_reference() {
        let mut net = Network::new("types");
        net.create_buses(&[5, 6, 7], 0.4);
        net.create_ext_grid(6, 1.0, 0.0, None);
        let order = BusOrder::new(&net).unwrap();
        let (refbus, pv, pq) = bus_types(&net, &order).unwrap();
        assert_eq!(refbus, vec![1]);
        assert!(pv.is_empty());
        assert_eq!(pq, vec![0, 2]);
    }

    #[test]
    fn out_of_service_ext_grid_is_ignored() {
        let mut net = Network::new("types");
        net.create_buses(&[0, 1], 0.4);
        let eg = net.create_ext_grid(0, 1.0, 0.0, None);
        net.ext_grid[eg].in_service = false;
        let order = BusOrder::new(&net).unwrap();
        let (refbus, _, pq) = bus_types(&net, &order).unwrap();
        assert!(refbus.is_empty());
        assert_eq!(pq.len(), 2);
    }
}
