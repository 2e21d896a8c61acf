use serde::{Deserialize, Serialize};

/// Bus and line lists of a grid made of rings hanging off one medium
/// voltage bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridTopology {
    /// Next unused bus identifier.
    pub id_end: usize,
    pub mv_bus: usize,
    pub line_from: Vec<usize>,
    pub line_to: Vec<usize>,
    pub buses: Vec<usize>,
}

impl GridTopology {
    pub fn new(id_start: usize, mv_bus: usize) -> Self {
        Self {
            id_end: id_start,
            mv_bus,
            line_from: Vec::new(),
            line_to: Vec::new(),
            buses: Vec::new(),
        }
    }

    /// Appends a ring of `n_ring_num` new buses.
    ///
    /// The first ring bus is fed from the MV bus and the ring buses are
    /// chained in order. A meshed ring is closed with an extra line from
    /// its first to its last bus. The counts are not validated.
    pub fn add_ring(&mut self, n_ring_num: usize, is_mesh: bool) {
        let buses: Vec<usize> = (self.id_end..self.id_end + n_ring_num).collect();
        let (first, last) = match (buses.first(), buses.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return,
        };

        self.buses.extend(&buses);
        self.id_end = last + 1;

        self.line_from.push(first);
        self.line_to.push(self.mv_bus);

        self.line_from.extend(&buses[..buses.len() - 1]);
        self.line_to.extend(&buses[1..]);

        if is_mesh {
            self.line_from.push(first);
            self.line_to.push(last);
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.line_from.iter().copied().zip(self.line_to.iter().copied())
    }

    pub fn n_lines(&self) -> usize {
        self.line_from.len()
    }
}

/// Shape of a ring grid. The first `n_meshes` rings are meshed.
#[derive(Debug, Clone, PartialEq)]
pub struct RingConfig {
    pub n_rings: usize,
    pub buses_per_ring: usize,
    pub n_meshes: usize,
    pub id_start: usize,
    pub mv_bus: usize,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            n_rings: 2,
            buses_per_ring: 4,
            n_meshes: 1,
            id_start: 10,
            mv_bus: 0,
        }
    }
}

impl RingConfig {
    pub fn build(&self) -> GridTopology {
        let mut topo = GridTopology::new(self.id_start, self.mv_bus);
        for ring in 0..self.n_rings {
            topo.add_ring(self.buses_per_ring, ring < self.n_meshes);
        }
        topo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rings() {
        let topo = RingConfig::default().build();
        assert_eq!(topo.buses, (10..18).collect::<Vec<_>>());
        assert_eq!(topo.id_end, 18);
        assert_eq!(
            topo.lines().collect::<Vec<_>>(),
            vec![
                (10, 0),
                (10, 11),
                (11, 12),
                (12, 13),
                (10, 13),
                (14, 0),
                (14, 15),
                (15, 16),
                (16, 17),
            ]
        );
    }

    #[test]
    fn line_count_per_ring() {
        for n_rings in 1..4 {
            for buses_per_ring in 1..6 {
                for n_meshes in 0..=n_rings {
                    let topo = RingConfig {
                        n_rings,
                        buses_per_ring,
                        n_meshes,
                        ..Default::default()
                    }
                    .build();
                    // chain + feeder per ring, closing line per mesh
                    let expected = n_rings * buses_per_ring + n_meshes;
                    assert_eq!(topo.n_lines(), expected);
                    assert_eq!(topo.buses.len(), n_rings * buses_per_ring);
                }
            }
        }
    }

    #[test]
    fn empty_ring_adds_nothing() {
        let mut topo = GridTopology::new(5, 0);
        topo.add_ring(0, true);
        assert_eq!(topo, GridTopology::new(5, 0));
    }
}
