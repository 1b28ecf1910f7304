//! Explicit, owned configuration state passed through the pipeline
//! instead of process-wide globals.
use gnss::prelude::Constellation;

/// Which broadcast navigation message a constellation's ephemeris
/// selection should prefer when both are available: LNAV vs CNAV for
/// GPS/QZSS, I/NAV vs F/NAV for Galileo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EphemerisPreference {
    #[default]
    Legacy, // LNAV / I/NAV
    Modernized, // CNAV / F/NAV
}

/// Diagnostic verbosity independent of the `log` crate's own level filter:
/// components consult this to decide whether to compute and attach
/// optional diagnostic strings (e.g. per-satellite RAIM exclusion
/// rationale) that would otherwise be wasted work at low trace levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct TraceLevel(pub u8);

/// Per-constellation ephemeris-selection preference and trace-level,
/// constructed once at pipeline setup and passed by reference through the
/// public API rather than kept as process-wide mutable state.
#[derive(Debug, Clone)]
pub struct Context {
    preference: [EphemerisPreference; 7],
    pub trace_level: TraceLevel,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            preference: [EphemerisPreference::default(); 7],
            trace_level: TraceLevel::default(),
        }
    }
}

fn sys_index(sys: Constellation) -> usize {
    match sys {
        Constellation::GPS => 0,
        Constellation::Glonass => 1,
        Constellation::Galileo => 2,
        Constellation::QZSS => 3,
        Constellation::BeiDou => 4,
        Constellation::IRNSS => 5,
        Constellation::SBAS => 6,
    }
}

impl Context {
    pub fn new(trace_level: TraceLevel) -> Self {
        Self {
            preference: [EphemerisPreference::default(); 7],
            trace_level,
        }
    }
    pub fn set_preference(&mut self, sys: Constellation, pref: EphemerisPreference) {
        self.preference[sys_index(sys)] = pref;
    }
    pub fn preference(&self, sys: Constellation) -> EphemerisPreference {
        self.preference[sys_index(sys)]
    }
}
