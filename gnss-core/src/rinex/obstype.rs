//! Per-constellation observation-type table and the sort/filter pass that
//! decides which tracked signals survive into a translated RINEX file.
use crate::observable::Observable;
use gnss::prelude::Constellation;
use std::collections::HashMap;

/// A constellation's discovered observation types, in first-seen order
/// (RINEX requires a stable per-system type list in the header).
#[derive(Debug, Clone, Default)]
pub struct ObsTypeTable {
    by_system: HashMap<Constellation, Vec<Observable>>,
}

impl ObsTypeTable {
    /// Records `obs` as seen for `sys` if it is not already present.
    pub fn record(&mut self, sys: Constellation, obs: Observable) {
        let list = self.by_system.entry(sys).or_default();
        if !list.contains(&obs) {
            list.push(obs);
        }
    }

    pub fn types(&self, sys: Constellation) -> &[Observable] {
        self.by_system.get(&sys).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sorts and filters a system's discovered types for the write pass:
    /// grouped by frequency slot, best [Observable::code_priority] first
    /// within a slot, and (for an output version below 3.00) anything
    /// without a version-2 equivalent attribute dropped rather than
    /// mis-encoded.
    pub fn finalize(&self, sys: Constellation, output_version: f32) -> Vec<Observable> {
        let mut types = self.by_system.get(&sys).cloned().unwrap_or_default();
        if output_version < 3.0 {
            types.retain(|o| matches!(o.attribute(), "C" | "P" | "W" | "Q" | "X" | ""));
        }
        types.sort_by_key(|o| (o.frequency_slot(sys), o.code_priority()));
        types
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn discovery_preserves_first_seen_order_before_finalize() {
        let mut table = ObsTypeTable::default();
        table.record(Constellation::GPS, Observable::from_str("L1C").unwrap());
        table.record(Constellation::GPS, Observable::from_str("C1C").unwrap());
        assert_eq!(table.types(Constellation::GPS).len(), 2);
    }

    #[test]
    fn finalize_groups_by_frequency_slot_then_priority() {
        let mut table = ObsTypeTable::default();
        table.record(Constellation::GPS, Observable::from_str("C5Q").unwrap());
        table.record(Constellation::GPS, Observable::from_str("C1C").unwrap());
        table.record(Constellation::GPS, Observable::from_str("C1W").unwrap());
        let sorted = table.finalize(Constellation::GPS, 3.04);
        assert_eq!(sorted[0].as_str(), "C1W");
        assert_eq!(sorted[1].as_str(), "C1C");
        assert_eq!(sorted[2].as_str(), "C5Q");
    }

    #[test]
    fn duplicate_records_do_not_duplicate_types() {
        let mut table = ObsTypeTable::default();
        table.record(Constellation::GPS, Observable::from_str("C1C").unwrap());
        table.record(Constellation::GPS, Observable::from_str("C1C").unwrap());
        assert_eq!(table.types(Constellation::GPS).len(), 1);
    }
}
