//! Cycle orchestrator.
//!
//! `AwaitingTrigger -> DoorCheck -> (settle) -> CrowdCheck -> CommandSent`
//!
//! One blocking loop on one thread. The stop flag is checked between
//! transport polls and between frames, never inside a frame's
//! classification or inference.

use log::{debug, error, info, warn};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::depth::{DepthEngine, DepthError};
use crate::door::DoorClassifier;
use crate::frame::Frame;
use crate::ingest::FrameSource;
use crate::occupancy::OccupancyScorer;
use crate::phase::{CrowdOutcome, CrowdPhase, CrowdPolicy, DoorOutcome, DoorPhase, DoorPolicy};
use crate::protocol::{check_trigger, ControlPacket, HmiLink, TriggerCheck};
use crate::{Decision, Roi};

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(30);
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Per-cycle tuning for the orchestrator.
#[derive(Clone, Debug)]
pub struct GateSettings {
    pub roi: Roi,
    pub door: DoorPolicy,
    pub crowd: CrowdPolicy,
    /// Score at or below which a frame is GO.
    pub decision_threshold: f64,
    /// Pause between door confirmation and the first crowd frame.
    pub settle: Duration,
    /// Only triggers from this address start a cycle.
    pub hmi_ip: IpAddr,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            roi: Roi::door_default(),
            door: DoorPolicy::default(),
            crowd: CrowdPolicy::default(),
            decision_threshold: 0.5,
            settle: Duration::from_millis(500),
            hmi_ip: IpAddr::from([192, 168, 1, 30]),
        }
    }
}

/// What a single cycle ended with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Exactly one command carrying this decision was handed to the link.
    Sent(Decision),
    /// Door never confirmed; nothing was sent.
    DoorNotConfirmed,
    /// Stop requested before a command was due.
    Shutdown,
}

/// Running totals since start.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GateStats {
    pub triggers: u64,
    pub commands_sent: u64,
    pub send_failures: u64,
    pub doors_not_confirmed: u64,
    pub go: u64,
    pub stop: u64,
}

/// The boarding gate: owns the camera, classifiers, depth engine and link.
pub struct BoardingGate<S, C, E, L> {
    source: S,
    classifier: C,
    engine: E,
    link: L,
    scorer: OccupancyScorer,
    settings: GateSettings,
    stats: GateStats,
    last_health_log: Instant,
}

impl<S, C, E, L> BoardingGate<S, C, E, L>
where
    S: FrameSource,
    C: DoorClassifier,
    E: DepthEngine,
    L: HmiLink,
{
    pub fn new(
        source: S,
        classifier: C,
        engine: E,
        link: L,
        scorer: OccupancyScorer,
        settings: GateSettings,
    ) -> Self {
        Self {
            source,
            classifier,
            engine,
            link,
            scorer,
            settings,
            stats: GateStats::default(),
            last_health_log: Instant::now(),
        }
    }

    pub fn settings(&self) -> &GateSettings {
        &self.settings
    }

    pub fn stats(&self) -> GateStats {
        self.stats
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    /// Run cycles until `stop` is set.
    pub fn run(&mut self, stop: &AtomicBool) -> GateStats {
        info!(
            "boarding gate running (depth engine {}, hmi {})",
            self.engine.name(),
            self.settings.hmi_ip
        );
        loop {
            match self.run_cycle(stop) {
                CycleOutcome::Shutdown => break,
                outcome => debug!("cycle finished: {:?}", outcome),
            }
        }
        info!(
            "boarding gate stopped: {} triggers, {} commands ({} GO, {} STOP), {} doors not confirmed, {} send failures",
            self.stats.triggers,
            self.stats.commands_sent,
            self.stats.go,
            self.stats.stop,
            self.stats.doors_not_confirmed,
            self.stats.send_failures
        );
        self.stats
    }

    /// One full cycle: wait for a trigger, confirm the door, judge the
    /// crowd, send one command.
    pub fn run_cycle(&mut self, stop: &AtomicBool) -> CycleOutcome {
        if !self.wait_for_trigger(stop) {
            return CycleOutcome::Shutdown;
        }
        self.stats.triggers += 1;
        info!("trigger received; checking door");

        if self.door_check(stop) == DoorOutcome::NotConfirmed {
            if stop.load(Ordering::SeqCst) {
                return CycleOutcome::Shutdown;
            }
            self.stats.doors_not_confirmed += 1;
            info!("door not confirmed; waiting for next trigger");
            return CycleOutcome::DoorNotConfirmed;
        }

        if !self.settings.settle.is_zero() {
            debug!("door confirmed; settling for {:?}", self.settings.settle);
            std::thread::sleep(self.settings.settle);
        }

        let decision = self.crowd_check(stop).decision();
        self.send_command(decision);
        CycleOutcome::Sent(decision)
    }

    // -------------------- AwaitingTrigger --------------------

    /// Block until a valid trigger arrives. Returns `false` on shutdown.
    fn wait_for_trigger(&mut self, stop: &AtomicBool) -> bool {
        loop {
            if stop.load(Ordering::SeqCst) {
                return false;
            }
            match self.link.poll() {
                Ok(Some(inbound)) => match check_trigger(&inbound, self.settings.hmi_ip) {
                    TriggerCheck::Trigger => return true,
                    TriggerCheck::WrongPeer(ip) => {
                        warn!("ignoring datagram from unexpected peer {}", ip);
                    }
                    TriggerCheck::Malformed(err) => {
                        warn!("ignoring malformed packet from {}: {}", inbound.from, err);
                    }
                    TriggerCheck::NotTrigger(packet) => {
                        warn!(
                            "ignoring non-trigger packet from {}: {:?}",
                            inbound.from,
                            packet.payload()
                        );
                    }
                },
                Ok(None) => self.log_health(),
                Err(err) => {
                    warn!("hmi link receive failed: {:#}", err);
                    std::thread::sleep(RECV_ERROR_BACKOFF);
                }
            }
        }
    }

    fn log_health(&mut self) {
        if self.last_health_log.elapsed() < HEALTH_LOG_INTERVAL {
            return;
        }
        let stats = self.source.stats();
        info!(
            "camera health={} frames={} source={}",
            self.source.is_healthy(),
            stats.frames_captured,
            stats.source
        );
        self.last_health_log = Instant::now();
    }

    // -------------------- DoorCheck --------------------

    fn door_check(&mut self, stop: &AtomicBool) -> DoorOutcome {
        let mut phase = DoorPhase::new(self.settings.door);
        let roi = self.settings.roi;
        let source = &mut self.source;
        let classifier = &self.classifier;

        let observations = std::iter::from_fn(|| {
            if stop.load(Ordering::SeqCst) {
                return None;
            }
            match source.next_frame() {
                Ok(Some(frame)) => {
                    let is_open = classifier.is_open(&frame, &roi);
                    debug!("door frame: open={}", is_open);
                    Some(Some(is_open))
                }
                Ok(None) => {
                    warn!("frame source ended during door check");
                    None
                }
                Err(err) => {
                    warn!("door frame not acquired: {:#}", err);
                    Some(None)
                }
            }
        });

        let outcome = phase.drive(observations);
        debug!(
            "door check: {:?} after {} frames (streak {})",
            outcome,
            phase.iterations(),
            phase.streak()
        );
        outcome
    }

    // -------------------- CrowdCheck --------------------

    fn crowd_check(&mut self, stop: &AtomicBool) -> CrowdOutcome {
        let mut phase = CrowdPhase::new(self.settings.crowd);
        let threshold = self.settings.decision_threshold;
        let source = &mut self.source;
        let engine = &mut self.engine;
        let scorer = &self.scorer;

        let decisions = std::iter::from_fn(|| {
            if stop.load(Ordering::SeqCst) {
                info!("stop requested during crowd check");
                return None;
            }
            match source.next_frame() {
                Ok(Some(frame)) => Some(Some(judge_frame(engine, scorer, &frame, threshold))),
                Ok(None) => {
                    warn!("frame source ended during crowd check");
                    None
                }
                Err(err) => {
                    warn!("crowd frame not acquired: {:#}", err);
                    Some(None)
                }
            }
        });

        let outcome = phase.drive(decisions);
        info!(
            "crowd check: {:?} after {} frames ({} STOP)",
            outcome,
            phase.frames(),
            phase.stops()
        );
        outcome
    }

    // -------------------- CommandSent --------------------

    fn send_command(&mut self, decision: Decision) {
        match decision {
            Decision::Go => self.stats.go += 1,
            Decision::Stop => self.stats.stop += 1,
        }
        let packet = ControlPacket::command(decision);
        match self.link.send(&packet) {
            Ok(()) => {
                self.stats.commands_sent += 1;
                info!("sent {} to hmi", decision);
            }
            Err(err) => {
                self.stats.send_failures += 1;
                error!("failed to send {} to hmi: {:#}", decision, err);
            }
        }
    }
}

/// Per-frame crowd decision. Any depth failure is STOP.
fn judge_frame<E: DepthEngine>(
    engine: &mut E,
    scorer: &OccupancyScorer,
    frame: &Frame,
    threshold: f64,
) -> Decision {
    let depth = if frame.is_empty() {
        Err(DepthError::EmptyFrame)
    } else {
        engine.infer(frame)
    };
    match depth {
        Ok(depth) => {
            let score = scorer.score(&depth, frame.dimensions());
            let decision = Decision::from_score(score, threshold);
            debug!("crowd frame: score={:.3} -> {}", score, decision);
            decision
        }
        Err(err) => {
            warn!("depth inference failed, frame counts as STOP: {}", err);
            Decision::Stop
        }
    }
}
