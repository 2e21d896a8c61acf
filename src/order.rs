use crate::error::PowerFlowError;
use crate::network::Network;
use std::collections::HashMap;

/// Mapping between external bus indexes and consecutive internal
/// positions. Internal order is bus creation order.
#[derive(Clone, Debug)]
pub struct BusOrder {
    pub e2i: HashMap<usize, usize>,
    pub i2e: Vec<usize>,
}

impl BusOrder {
    pub fn new(net: &Network) -> Result<Self, PowerFlowError> {
        let nb = net.bus.len();
        let mut e2i = HashMap::with_capacity(nb);
        let mut i2e = Vec::with_capacity(nb);
        for (i, b) in net.bus.iter().enumerate() {
            if e2i.insert(b.index, i).is_some() {
                return Err(PowerFlowError::DuplicateBus(b.index));
            }
            i2e.push(b.index);
        }
        Ok(Self { e2i, i2e })
    }

    /// Internal position of an external bus index.
    pub fn int(&self, element: &'static str, bus: usize) -> Result<usize, PowerFlowError> {
        self.e2i
            .get(&bus)
            .copied()
            .ok_or(PowerFlowError::UnknownBus { element, bus })
    }

    pub fn len(&self) -> usize {
        self.i2e.len()
    }

    pub fn is_empty(&self) -> bool {
        self.i2e.is_empty()
    }
}
