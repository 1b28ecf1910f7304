//! Maps the filter's typed state quantities onto positions in a flat
//! state vector, replacing index arithmetic scattered through the update
//! code with named accessors computed once per epoch's satellite set.
use crate::config::{EkfConfig, EstimatorMode, TropoModel};
use gnss::prelude::{Constellation, SV};
use std::collections::HashMap;

/// One (satellite, frequency slot) pair carrying its own filter state:
/// slant ionosphere delay and/or a carrier-phase ambiguity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BiasKey {
    pub sv: SV,
    pub freq_slot: usize,
}

/// Index assignment for one epoch's filter state. Rebuilt whenever the
/// tracked satellite/frequency set changes (new rise, a set, slip reset);
/// existing state/covariance entries are carried across rebuilds by the
/// caller using the old and new layout together.
#[derive(Debug, Clone, Default)]
pub struct StateLayout {
    pub position: [usize; 3],
    pub velocity: Option<[usize; 3]>,
    clocks: HashMap<Constellation, usize>,
    pub tropo_ztd: Option<usize>,
    pub tropo_gradients: Option<[usize; 2]>,
    iono: HashMap<SV, usize>,
    ambiguity: HashMap<BiasKey, usize>,
    len: usize,
}

impl StateLayout {
    /// Builds a fresh layout for `mode`, allocating a clock state for
    /// every constellation in `systems`, and iono/ambiguity states for
    /// every `(sv, freq_slot)` pair in `bias_keys` as the mode requires.
    pub fn build(
        cfg: &EkfConfig,
        systems: &[Constellation],
        bias_keys: &[BiasKey],
    ) -> Self {
        let mut len = 0;
        let mut next = |n: usize| {
            let start = len;
            len += n;
            start
        };

        let position = [next(1), next(1), next(1)];
        let velocity = if cfg.mode.is_kinematic() && cfg.dynamics {
            Some([next(1), next(1), next(1)])
        } else {
            None
        };

        let mut clocks = HashMap::new();
        for sys in systems {
            clocks.insert(*sys, next(1));
        }

        let tropo_ztd = if !matches!(cfg.tropo, TropoModel::ModelOnly) {
            Some(next(1))
        } else {
            None
        };
        let tropo_gradients = if matches!(cfg.tropo, TropoModel::ZtdAndGradients) {
            Some([next(1), next(1)])
        } else {
            None
        };

        let mut iono = HashMap::new();
        if cfg.estimate_iono {
            for key in bias_keys {
                iono.entry(key.sv).or_insert_with(|| next(1));
            }
        }

        let mut ambiguity = HashMap::new();
        if cfg.mode.is_rtk() || cfg.mode.is_ppp() {
            for key in bias_keys {
                ambiguity.insert(*key, next(1));
            }
        }

        Self {
            position,
            velocity,
            clocks,
            tropo_ztd,
            tropo_gradients,
            iono,
            ambiguity,
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clock(&self, sys: Constellation) -> Option<usize> {
        self.clocks.get(&sys).copied()
    }
    pub fn iono(&self, sv: SV) -> Option<usize> {
        self.iono.get(&sv).copied()
    }
    pub fn ambiguity(&self, key: BiasKey) -> Option<usize> {
        self.ambiguity.get(&key).copied()
    }
    pub fn ambiguity_keys(&self) -> impl Iterator<Item = &BiasKey> {
        self.ambiguity.keys()
    }
    pub fn clock_systems(&self) -> impl Iterator<Item = &Constellation> {
        self.clocks.keys()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn spp_mode_has_no_iono_or_ambiguity_by_default() {
        let mut cfg = EkfConfig::default();
        cfg.mode = EstimatorMode::Spp;
        cfg.estimate_iono = false;
        let layout = StateLayout::build(&cfg, &[Constellation::GPS], &[]);
        assert!(layout.iono(SV::new(Constellation::GPS, 1)).is_none());
        assert!(layout
            .ambiguity(BiasKey {
                sv: SV::new(Constellation::GPS, 1),
                freq_slot: 0
            })
            .is_none());
    }

    #[test]
    fn rtk_mode_allocates_one_ambiguity_per_bias_key() {
        let mut cfg = EkfConfig::default();
        cfg.mode = EstimatorMode::RtkStatic;
        let key_a = BiasKey {
            sv: SV::new(Constellation::GPS, 1),
            freq_slot: 0,
        };
        let key_b = BiasKey {
            sv: SV::new(Constellation::GPS, 1),
            freq_slot: 1,
        };
        let layout = StateLayout::build(&cfg, &[Constellation::GPS], &[key_a, key_b]);
        assert_ne!(layout.ambiguity(key_a), layout.ambiguity(key_b));
    }

    #[test]
    fn indices_are_disjoint_across_blocks() {
        let mut cfg = EkfConfig::default();
        cfg.mode = EstimatorMode::RtkKinematic;
        cfg.dynamics = true;
        cfg.tropo = TropoModel::ZtdAndGradients;
        let key = BiasKey {
            sv: SV::new(Constellation::GPS, 1),
            freq_slot: 0,
        };
        let layout = StateLayout::build(&cfg, &[Constellation::GPS, Constellation::Glonass], &[key]);
        let mut indices: Vec<usize> = layout.position.to_vec();
        indices.extend(layout.velocity.unwrap());
        indices.push(layout.clock(Constellation::GPS).unwrap());
        indices.push(layout.clock(Constellation::Glonass).unwrap());
        indices.push(layout.tropo_ztd.unwrap());
        indices.extend(layout.tropo_gradients.unwrap());
        indices.push(layout.ambiguity(key).unwrap());
        let mut sorted = indices.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(indices.len(), sorted.len());
        assert_eq!(layout.len(), indices.len());
    }
}
