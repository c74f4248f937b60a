use serde::{Deserialize, Serialize};

/// Ground position of one antenna in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AntennaPosition {
    pub x: f64,
    pub y: f64,
}

impl AntennaPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Separation of one antenna pair in metres, with the pair it came from when known.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub u: f64,
    pub v: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub antennas: Option<(usize, usize)>,
}

impl Baseline {
    pub fn new(u: f64, v: f64) -> Self {
        Self {
            u,
            v,
            antennas: None,
        }
    }

    pub fn length(&self) -> f64 {
        self.u.hypot(self.v)
    }
}

/// One baseline per unordered antenna pair, in `(i, j), i < j` enumeration order.
///
/// Derived data: rebuild it whenever the antenna layout changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaselineSet {
    baselines: Vec<Baseline>,
}

impl BaselineSet {
    pub fn from_positions(positions: &[AntennaPosition]) -> Self {
        let mut baselines = Vec::with_capacity(positions.len() * positions.len().saturating_sub(1) / 2);
        for (i, first) in positions.iter().enumerate() {
            for (j, second) in positions.iter().enumerate().skip(i + 1) {
                baselines.push(Baseline {
                    u: first.x - second.x,
                    v: first.y - second.y,
                    antennas: Some((i, j)),
                });
            }
        }
        Self { baselines }
    }

    /// Baselines given directly as (u, v) metres, without antenna bookkeeping.
    pub fn from_coordinates(coordinates: &[(f64, f64)]) -> Self {
        Self {
            baselines: coordinates
                .iter()
                .map(|&(u, v)| Baseline::new(u, v))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.baselines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Baseline> {
        self.baselines.iter()
    }

    pub fn as_slice(&self) -> &[Baseline] {
        &self.baselines
    }

    /// Pairwise antenna distances, in baseline order.
    pub fn lengths(&self) -> Vec<f64> {
        self.baselines.iter().map(Baseline::length).collect()
    }

    pub fn max_length(&self) -> Option<f64> {
        self.baselines
            .iter()
            .map(Baseline::length)
            .max_by(|a, b| a.total_cmp(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Vec<AntennaPosition> {
        vec![
            AntennaPosition::new(0.0, 0.0),
            AntennaPosition::new(3.0, 0.0),
            AntennaPosition::new(0.0, 4.0),
        ]
    }

    #[test]
    fn baselines_follow_pair_enumeration() {
        let set = BaselineSet::from_positions(&triangle());
        let pairs: Vec<(f64, f64, Option<(usize, usize)>)> =
            set.iter().map(|b| (b.u, b.v, b.antennas)).collect();
        assert_eq!(
            pairs,
            vec![
                (-3.0, 0.0, Some((0, 1))),
                (0.0, -4.0, Some((0, 2))),
                (3.0, -4.0, Some((1, 2))),
            ]
        );
    }

    #[test]
    fn lengths_are_pairwise_distances() {
        let set = BaselineSet::from_positions(&triangle());
        assert_eq!(set.lengths(), vec![3.0, 4.0, 5.0]);
        assert_eq!(set.max_length(), Some(5.0));
    }

    #[test]
    fn single_antenna_has_no_baselines() {
        let set = BaselineSet::from_positions(&triangle()[..1]);
        assert!(set.is_empty());
        assert_eq!(set.max_length(), None);
    }

    #[test]
    fn baseline_count_is_n_choose_two() {
        let positions: Vec<AntennaPosition> = (0..9)
            .map(|i| AntennaPosition::new(i as f64 * 0.3, (i * i) as f64 * 0.1))
            .collect();
        assert_eq!(BaselineSet::from_positions(&positions).len(), 36);
    }
}
