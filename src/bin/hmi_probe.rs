//! hmi_probe - bench tool that plays the HMI side
//!
//! Sends one trigger packet to the gate and waits for the command reply.
//! The gate answers to its configured HMI address, so run it with
//! `GATE_HMI_ADDR` pointing at this probe's bind address (default
//! 127.0.0.1:5002).
//!
//! Exits non-zero when no reply arrives in time.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use boarding_gate::protocol::decode;
use boarding_gate::{ControlPacket, HmiLink, UdpHmiLink, UdpLinkConfig};

#[derive(Parser, Debug)]
#[command(name = "hmi_probe", version, about = "Trigger the gate and print its verdict")]
struct Args {
    /// Gate address to trigger.
    #[arg(long, env = "GATE_ADDR", default_value = "127.0.0.1:5001")]
    gate: SocketAddr,

    /// Local address to receive the reply on.
    #[arg(long, default_value = "127.0.0.1:5002")]
    bind: SocketAddr,

    /// How long to wait for the reply, in milliseconds.
    #[arg(long, default_value_t = 30_000)]
    timeout_ms: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut link = UdpHmiLink::bind(&UdpLinkConfig {
        listen_addr: args.bind,
        hmi_addr: args.gate,
        poll_timeout: Duration::from_millis(200),
    })?;

    link.send(&ControlPacket::trigger())?;
    log::info!("trigger sent to {}", args.gate);

    let started = Instant::now();
    let deadline = started + Duration::from_millis(args.timeout_ms);
    while Instant::now() < deadline {
        let Some(inbound) = link.poll()? else {
            continue;
        };
        if inbound.from.ip() != args.gate.ip() {
            log::warn!("ignoring datagram from {}", inbound.from);
            continue;
        }
        match decode(&inbound.bytes) {
            Ok(packet) => match packet.decision() {
                Some(decision) => {
                    println!(
                        "{} after {} ms (payload {:?})",
                        decision,
                        started.elapsed().as_millis(),
                        packet.payload()
                    );
                    return Ok(());
                }
                None => log::warn!("reply without a decision: {:?}", packet.payload()),
            },
            Err(err) => log::warn!("malformed reply from {}: {}", inbound.from, err),
        }
    }
    Err(anyhow!(
        "no command from {} within {} ms",
        args.gate,
        args.timeout_ms
    ))
}
