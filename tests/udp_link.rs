use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use boarding_gate::protocol::{check_trigger, decode, TriggerCheck, PACKET_LEN};
use boarding_gate::{
    BoardingGate, BrightnessDoorClassifier, ControlPacket, CycleOutcome, Decision, DoorPolicy,
    GateSettings, HmiLink, OccupancyScorer, OfflineDepthEngine, Roi, StubDepthEngine,
    SyntheticConfig, SyntheticSource, UdpHmiLink, UdpLinkConfig,
};

fn loopback() -> SocketAddr {
    "127.0.0.1:0".parse().unwrap()
}

/// A fake HMI socket and a gate link pointed at it.
fn pair() -> (UdpSocket, UdpHmiLink) {
    let hmi = UdpSocket::bind(loopback()).expect("bind hmi");
    hmi.set_read_timeout(Some(Duration::from_millis(500)))
        .expect("hmi timeout");
    let link = UdpHmiLink::bind(&UdpLinkConfig {
        listen_addr: loopback(),
        hmi_addr: hmi.local_addr().unwrap(),
        poll_timeout: Duration::from_millis(50),
    })
    .expect("bind link");
    (hmi, link)
}

fn recv_packet(hmi: &UdpSocket) -> Option<ControlPacket> {
    let mut buf = [0u8; 64];
    let (len, _) = hmi.recv_from(&mut buf).ok()?;
    assert_eq!(len, PACKET_LEN);
    decode(&buf[..len]).ok()
}

fn gate_settings() -> GateSettings {
    GateSettings {
        settle: Duration::ZERO,
        hmi_ip: "127.0.0.1".parse().unwrap(),
        ..GateSettings::default()
    }
}

fn synthetic(door_open_after: Option<u64>) -> SyntheticSource {
    SyntheticSource::new(SyntheticConfig {
        uri: "stub://loopback".to_string(),
        width: 64,
        height: 48,
        door_open_after,
        frame_limit: None,
        noise: 4,
        door_roi: Roi::door_default(),
    })
}

#[test]
fn trigger_round_trip_over_loopback() {
    let (hmi, mut link) = pair();
    let gate_addr = link.local_addr().unwrap();

    hmi.send_to(&ControlPacket::trigger().encode(), gate_addr)
        .unwrap();
    let inbound = link.poll().unwrap().expect("trigger datagram");
    assert_eq!(inbound.from, hmi.local_addr().unwrap());
    assert_eq!(
        check_trigger(&inbound, "127.0.0.1".parse().unwrap()),
        TriggerCheck::Trigger
    );

    link.send(&ControlPacket::command(Decision::Stop)).unwrap();
    let packet = recv_packet(&hmi).expect("command");
    assert_eq!(packet.decision(), Some(Decision::Stop));
    assert_eq!(packet.payload().activate, 5);
    assert_eq!(link.counters(), (1, 1));
}

#[test]
fn poll_times_out_with_none() {
    let (_hmi, mut link) = pair();
    let started = Instant::now();
    assert!(link.poll().unwrap().is_none());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn gate_answers_trigger_with_go_over_udp() {
    let (hmi, link) = pair();
    let gate_addr = link.local_addr().unwrap();
    // Queued before the gate starts polling.
    hmi.send_to(&ControlPacket::trigger().encode(), gate_addr)
        .unwrap();

    let mut gate = BoardingGate::new(
        synthetic(Some(0)),
        BrightnessDoorClassifier::default(),
        StubDepthEngine::new(3.0),
        link,
        OccupancyScorer::default(),
        gate_settings(),
    );
    let stop = AtomicBool::new(false);

    assert_eq!(gate.run_cycle(&stop), CycleOutcome::Sent(Decision::Go));
    let packet = recv_packet(&hmi).expect("GO command");
    assert_eq!(packet, ControlPacket::command(Decision::Go));
    // One command per trigger.
    assert!(recv_packet(&hmi).is_none());
}

#[test]
fn offline_depth_engine_answers_stop() {
    let (hmi, link) = pair();
    let gate_addr = link.local_addr().unwrap();
    hmi.send_to(&ControlPacket::trigger().encode(), gate_addr)
        .unwrap();

    let mut gate = BoardingGate::new(
        synthetic(Some(0)),
        BrightnessDoorClassifier::default(),
        OfflineDepthEngine::new("model missing"),
        link,
        OccupancyScorer::default(),
        gate_settings(),
    );
    let stop = AtomicBool::new(false);

    assert_eq!(gate.run_cycle(&stop), CycleOutcome::Sent(Decision::Stop));
    assert_eq!(
        recv_packet(&hmi).and_then(|p| p.decision()),
        Some(Decision::Stop)
    );
}

#[test]
fn closed_door_sends_nothing() {
    let (hmi, link) = pair();
    let gate_addr = link.local_addr().unwrap();
    hmi.send_to(&ControlPacket::trigger().encode(), gate_addr)
        .unwrap();

    let settings = GateSettings {
        door: DoorPolicy {
            open_streak: 5,
            iteration_cap: 12,
        },
        ..gate_settings()
    };
    let mut gate = BoardingGate::new(
        synthetic(None),
        BrightnessDoorClassifier::default(),
        StubDepthEngine::default(),
        link,
        OccupancyScorer::default(),
        settings,
    );
    let stop = AtomicBool::new(false);

    assert_eq!(gate.run_cycle(&stop), CycleOutcome::DoorNotConfirmed);
    assert!(recv_packet(&hmi).is_none());
}
