//! Real-time stream server: one OS thread per input stream feeding a
//! bounded channel, epoch pairing between rover and base under a shared
//! mutex, and a periodic scheduler for NMEA/solution output. No async
//! runtime is used anywhere in this crate; threads and blocking channels
//! are the concurrency primitive throughout.
pub mod ringbuffer;

use crate::config::ServerConfig;
use crate::error::Error;
use crate::navigation::broadcast::BroadcastEphemeris;
use crate::navigation::{glonass::GlonassEphemeris, sbas::SbasEphemeris, ssr::SsrCorrection, Navigation};
use crate::observation::Observation;
use gnss::prelude::{GnssTime, SV};
use ringbuffer::RingBuffer;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Which role a stream plays in the pairing logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Rover,
    Base,
    Corrections,
}

/// Decoded unit of work handed from a listener thread to the server
/// loop. Wire-format decoding itself (RTCM/UBX/NMEA framing) lives
/// outside this crate; [RawDecoder] is the extension point a caller
/// plugs a real decoder into.
#[derive(Debug, Clone)]
pub enum DecodeEvent {
    Observations(GnssTime, Vec<Observation>),
    Broadcast(BroadcastEphemeris),
    Glonass(GlonassEphemeris),
    Sbas(SbasEphemeris),
    Ssr(SV, SsrCorrection),
}

/// Turns raw bytes accumulated in a [RingBuffer] into zero or more
/// [DecodeEvent]s, consuming whatever it successfully parsed.
pub trait RawDecoder: Send {
    fn decode(&mut self, buf: &mut RingBuffer) -> Vec<DecodeEvent>;
}

struct ListenerHandle {
    thread: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl ListenerHandle {
    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawns a dedicated thread that reads from `read_bytes` in a loop,
/// feeds a [RingBuffer] through `decoder`, and forwards decoded events to
/// `out` with a non-blocking `try_send` — a slow consumer drops events
/// rather than stalling the listener, counted in `outage_counter`.
fn spawn_listener(
    kind: StreamKind,
    mut read_bytes: impl FnMut(&mut [u8]) -> std::io::Result<usize> + Send + 'static,
    mut decoder: Box<dyn RawDecoder>,
    out: SyncSender<(StreamKind, DecodeEvent)>,
    outage_counter: Arc<AtomicU64>,
) -> ListenerHandle {
    let running = Arc::new(AtomicBool::new(true));
    let running_thread = running.clone();
    let thread = std::thread::spawn(move || {
        let mut buf = RingBuffer::with_capacity(8192);
        let mut scratch = [0u8; 1024];
        while running_thread.load(Ordering::Relaxed) {
            match read_bytes(&mut scratch) {
                Ok(0) => break,
                Ok(n) => {
                    buf.push(&scratch[..n]);
                    for event in decoder.decode(&mut buf) {
                        if let Err(TrySendError::Full(_)) = out.try_send((kind, event)) {
                            outage_counter.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                },
                Err(_) => break,
            }
        }
    });
    ListenerHandle {
        thread: Some(thread),
        running,
    }
}

/// Cumulative stream-health counters, snapshot-able for a status report.
#[derive(Debug, Default)]
pub struct StreamStats {
    pub rover_epochs: AtomicU64,
    pub base_epochs: AtomicU64,
    pub paired_epochs: AtomicU64,
    pub unpaired_rover_epochs: AtomicU64,
    pub dropped_events: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub struct StreamStatsSnapshot {
    pub rover_epochs: u64,
    pub base_epochs: u64,
    pub paired_epochs: u64,
    pub unpaired_rover_epochs: u64,
    pub dropped_events: u64,
}

impl StreamStats {
    pub fn snapshot(&self) -> StreamStatsSnapshot {
        StreamStatsSnapshot {
            rover_epochs: self.rover_epochs.load(Ordering::Relaxed),
            base_epochs: self.base_epochs.load(Ordering::Relaxed),
            paired_epochs: self.paired_epochs.load(Ordering::Relaxed),
            unpaired_rover_epochs: self.unpaired_rover_epochs.load(Ordering::Relaxed),
            dropped_events: self.dropped_events.load(Ordering::Relaxed),
        }
    }
}

/// A rover observation epoch paired with the closest base epoch within
/// [crate::config::ServerConfig::max_base_age_s], if one was found in
/// time.
pub struct PairedEpoch {
    pub t: GnssTime,
    pub rover: Vec<Observation>,
    pub base: Option<Vec<Observation>>,
}

struct PendingBase {
    t: GnssTime,
    obs: Vec<Observation>,
}

/// Owns the listener threads and the mutex-guarded pairing state; the
/// server loop itself (calling [Self::poll_paired] on a schedule and
/// driving the estimator) lives with the caller, not in this struct, so
/// the positioning pipeline stays decoupled from I/O.
pub struct StreamServer {
    config: ServerConfig,
    listeners: Vec<ListenerHandle>,
    events: Receiver<(StreamKind, DecodeEvent)>,
    events_tx: SyncSender<(StreamKind, DecodeEvent)>,
    pending_base: Arc<Mutex<Vec<PendingBase>>>,
    pub stats: Arc<StreamStats>,
    /// Ephemeris/SSR aggregate fed by every stream's decoded
    /// [DecodeEvent::Broadcast]/[DecodeEvent::Glonass]/[DecodeEvent::Sbas]
    /// events during [Self::poll_paired]. Shared via `Arc<Mutex<_>>` so a
    /// caller can read it (e.g. to run [crate::spp::SinglePointPositioner])
    /// from another thread between polls.
    pub navigation: Arc<Mutex<Navigation>>,
    outage_counter: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
}

impl StreamServer {
    pub fn new(config: ServerConfig) -> Self {
        let (tx, rx) = sync_channel(256);
        Self {
            config,
            listeners: Vec::new(),
            events: rx,
            events_tx: tx,
            pending_base: Arc::new(Mutex::new(Vec::new())),
            stats: Arc::new(StreamStats::default()),
            navigation: Arc::new(Mutex::new(Navigation::new())),
            outage_counter: Arc::new(AtomicU64::new(0)),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn add_stream(
        &mut self,
        kind: StreamKind,
        read_bytes: impl FnMut(&mut [u8]) -> std::io::Result<usize> + Send + 'static,
        decoder: Box<dyn RawDecoder>,
    ) {
        let handle = spawn_listener(
            kind,
            read_bytes,
            decoder,
            self.events_tx.clone(),
            self.outage_counter.clone(),
        );
        self.listeners.push(handle);
    }

    /// Cooperative shutdown: flips the running flag and joins every
    /// listener thread. Does not panic if a listener already exited.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        for listener in &mut self.listeners {
            listener.stop();
        }
    }

    pub fn dropped_events(&self) -> u64 {
        self.outage_counter.load(Ordering::Relaxed)
    }

    /// Drains whatever events have queued up, buffering base epochs and
    /// returning the rover epochs paired against the freshest base epoch
    /// within [ServerConfig::max_base_age_s] (or unpaired, if none
    /// qualifies). Every decoded ephemeris, SBAS or SSR correction, on
    /// any stream, is dispatched into [Self::navigation] as it is
    /// drained; observation epochs are the only events that flow through
    /// the pairing logic below.
    pub fn poll_paired(&mut self) -> Result<Vec<PairedEpoch>, Error> {
        let mut rover_epochs = Vec::new();

        while let Ok((kind, event)) = self.events.try_recv() {
            match (kind, event) {
                (StreamKind::Base, DecodeEvent::Observations(t, obs)) => {
                    self.stats.base_epochs.fetch_add(1, Ordering::Relaxed);
                    let mut pending = self.pending_base.lock().unwrap();
                    pending.push(PendingBase { t, obs });
                    let max_age = self.config.max_base_age_s;
                    pending.retain(|p| p.t.seconds_since(&t).abs() <= max_age * 4.0);
                },
                (StreamKind::Rover, DecodeEvent::Observations(t, obs)) => {
                    self.stats.rover_epochs.fetch_add(1, Ordering::Relaxed);
                    rover_epochs.push((t, obs));
                },
                (_, DecodeEvent::Broadcast(eph)) => {
                    self.navigation.lock().unwrap().insert_broadcast(eph);
                },
                (_, DecodeEvent::Glonass(eph)) => {
                    self.navigation.lock().unwrap().insert_glonass(eph);
                },
                (_, DecodeEvent::Sbas(eph)) => {
                    self.navigation.lock().unwrap().insert_sbas(eph);
                },
                (_, DecodeEvent::Ssr(sv, correction)) => {
                    self.navigation.lock().unwrap().ssr_mut().update(sv, correction);
                },
                (StreamKind::Corrections, DecodeEvent::Observations(..)) => {},
            }
        }

        let mut out = Vec::with_capacity(rover_epochs.len());
        for (t, rover) in rover_epochs {
            let base = {
                let pending = self.pending_base.lock().unwrap();
                pending
                    .iter()
                    .filter(|p| p.t.seconds_since(&t).abs() <= self.config.max_base_age_s)
                    .min_by(|a, b| {
                        a.t.seconds_since(&t)
                            .abs()
                            .partial_cmp(&b.t.seconds_since(&t).abs())
                            .unwrap()
                    })
                    .map(|p| p.obs.clone())
            };
            if base.is_some() {
                self.stats.paired_epochs.fetch_add(1, Ordering::Relaxed);
            } else {
                self.stats.unpaired_rover_epochs.fetch_add(1, Ordering::Relaxed);
            }
            out.push(PairedEpoch { t, rover, base });
        }

        Ok(out)
    }
}

impl Drop for StreamServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::context::Context;
    use crate::navigation::broadcast::DataSource;
    use crate::navigation::EphOpt;
    use gnss::prelude::{Constellation, SV};

    fn obs(t: GnssTime) -> Vec<Observation> {
        vec![Observation::new(t, SV::new(Constellation::GPS, 1))]
    }

    fn eph(sv: SV, toe: GnssTime) -> BroadcastEphemeris {
        BroadcastEphemeris {
            sv,
            toe,
            toc: toe,
            sqrt_a: 5153.6,
            delta_a: None,
            a_dot: None,
            ecc: 0.001,
            i0: 0.0,
            omega0: 0.0,
            omega: 0.0,
            m0: 0.0,
            delta_n: 0.0,
            delta_n_dot: None,
            omega_dot: 0.0,
            i_dot: 0.0,
            cuc: 0.0,
            cus: 0.0,
            crc: 0.0,
            crs: 0.0,
            cic: 0.0,
            cis: 0.0,
            f0: 0.0,
            f1: 0.0,
            f2: 0.0,
            group_delays: vec![],
            iode: 1,
            iodc: 1,
            sva: 0,
            svh: 0,
            data_source: DataSource::Inav,
            aod: 1,
            insertion_index: 0,
        }
    }

    #[test]
    fn unpaired_rover_epoch_counted_when_no_base_present() {
        let mut server = StreamServer::new(ServerConfig::default());
        let t = GnssTime::new(1_000_000_000, 0.0);
        server
            .events_tx
            .try_send((StreamKind::Rover, DecodeEvent::Observations(t, obs(t))))
            .unwrap();
        let paired = server.poll_paired().unwrap();
        assert_eq!(paired.len(), 1);
        assert!(paired[0].base.is_none());
        assert_eq!(server.stats.snapshot().unpaired_rover_epochs, 1);
    }

    #[test]
    fn rover_pairs_with_close_base_epoch() {
        let mut server = StreamServer::new(ServerConfig::default());
        let t = GnssTime::new(1_000_000_000, 0.0);
        server
            .events_tx
            .try_send((StreamKind::Base, DecodeEvent::Observations(t, obs(t))))
            .unwrap();
        server
            .events_tx
            .try_send((StreamKind::Rover, DecodeEvent::Observations(t, obs(t))))
            .unwrap();
        let paired = server.poll_paired().unwrap();
        assert_eq!(paired.len(), 1);
        assert!(paired[0].base.is_some());
    }

    #[test]
    fn stale_base_epoch_does_not_pair() {
        let mut server = StreamServer::new(ServerConfig {
            max_base_age_s: 1.0,
            ..ServerConfig::default()
        });
        let t0 = GnssTime::new(1_000_000_000, 0.0);
        let t1 = GnssTime::new(1_000_000_100, 0.0);
        server
            .events_tx
            .try_send((StreamKind::Base, DecodeEvent::Observations(t0, obs(t0))))
            .unwrap();
        server
            .events_tx
            .try_send((StreamKind::Rover, DecodeEvent::Observations(t1, obs(t1))))
            .unwrap();
        let paired = server.poll_paired().unwrap();
        assert!(paired[0].base.is_none());
    }

    #[test]
    fn broadcast_ephemeris_is_dispatched_into_the_navigation_aggregate() {
        let mut server = StreamServer::new(ServerConfig::default());
        let sv = SV::new(Constellation::GPS, 5);
        let t = GnssTime::new(1_000_000_000, 0.0);
        server
            .events_tx
            .try_send((StreamKind::Corrections, DecodeEvent::Broadcast(eph(sv, t))))
            .unwrap();

        server.poll_paired().unwrap();

        let ctx = Context::default();
        let nav = server.navigation.lock().unwrap();
        assert!(nav.satellite_state(sv, t, &ctx, EphOpt::Broadcast).is_ok());
    }
}
