//! Shared ephemeris selection algorithm.
//!
//! Broadcast and SBAS ephemeris sets both need "pick the freshest record
//! within tolerance, exact-IODE if requested, newest insertion wins ties";
//! implemented once here and reused, rather than duplicated per table.
use gnss::prelude::GnssTime;

/// Anything time-tagged the selector can rank: a time of ephemeris, an
/// optional issue-of-data (for exact-match pairing), and an insertion
/// index recording arrival order (tie-break).
pub trait Selectable {
    fn toe(&self) -> GnssTime;
    fn iode(&self) -> Option<u16>;
    fn insertion_index(&self) -> u64;
}

/// Picks the best candidate out of `records` for transmission time `t`,
/// within `tolerance_s` of `Toe`, optionally requiring an exact IODE match
/// (RTK correction pairing). An additional `accept` predicate lets callers
/// fold in constellation-specific gates (Galileo I/NAV vs F/NAV, AOD>0)
/// without this function knowing about them.
pub fn select<'a, T: Selectable>(
    records: impl Iterator<Item = &'a T>,
    t: GnssTime,
    tolerance_s: f64,
    iode: Option<u16>,
    accept: impl Fn(&T) -> bool,
) -> Option<&'a T>
where
    T: 'a,
{
    let mut best: Option<&T> = None;
    let mut best_dt = f64::MAX;
    for r in records {
        if !accept(r) {
            continue;
        }
        if let Some(want) = iode {
            if r.iode() != Some(want) {
                continue;
            }
        }
        let dt = r.toe().seconds_since(&t).abs();
        if dt > tolerance_s {
            continue;
        }
        let better = match best {
            None => true,
            Some(b) => {
                // strictly closer wins; exact ties go to the later
                // insertion.
                if dt < best_dt {
                    true
                } else if (dt - best_dt).abs() < 1e-9 {
                    r.insertion_index() > b.insertion_index()
                } else {
                    false
                }
            },
        };
        if better {
            best = Some(r);
            best_dt = dt;
        }
    }
    best
}

#[cfg(test)]
mod test {
    use super::*;

    struct Rec {
        toe_s: i64,
        iode: u16,
        idx: u64,
    }
    impl Selectable for Rec {
        fn toe(&self) -> GnssTime {
            GnssTime::new(self.toe_s, 0.0)
        }
        fn iode(&self) -> Option<u16> {
            Some(self.iode)
        }
        fn insertion_index(&self) -> u64 {
            self.idx
        }
    }

    #[test]
    fn handover_picks_closest_toe_within_tolerance() {
        // ephemeris A @ t0, B @ t0+2h with different IODE.
        let t0 = 1_000_000_000_i64;
        let a = Rec { toe_s: t0, iode: 1, idx: 0 };
        let b = Rec { toe_s: t0 + 7200, iode: 2, idx: 1 };
        let recs = [a, b];

        // @ t0 + 1h: A is closer (1h away) than B (1h away too) -- use
        // t0+50min so it's unambiguous.
        let t = GnssTime::new(t0 + 3000, 0.0);
        let picked = select(recs.iter(), t, 4.0 * 3600.0, None, |_| true).unwrap();
        assert_eq!(picked.iode, 1);

        // @ t0 + 2h30: B is now closer.
        let t = GnssTime::new(t0 + 9000, 0.0);
        let picked = select(recs.iter(), t, 4.0 * 3600.0, None, |_| true).unwrap();
        assert_eq!(picked.iode, 2);
    }

    #[test]
    fn exact_iode_filters_candidates() {
        let t0 = 1_000_000_000_i64;
        let recs = [
            Rec { toe_s: t0, iode: 5, idx: 0 },
            Rec { toe_s: t0 + 10, iode: 6, idx: 1 },
        ];
        let t = GnssTime::new(t0, 0.0);
        let picked = select(recs.iter(), t, 3600.0, Some(6), |_| true).unwrap();
        assert_eq!(picked.idx, 1);
    }

    #[test]
    fn tie_break_prefers_later_insertion() {
        let t0 = 1_000_000_000_i64;
        let recs = [
            Rec { toe_s: t0, iode: 1, idx: 0 },
            Rec { toe_s: t0, iode: 2, idx: 1 },
        ];
        let t = GnssTime::new(t0, 0.0);
        let picked = select(recs.iter(), t, 3600.0, None, |_| true).unwrap();
        assert_eq!(picked.idx, 1);
    }
}
