//! boarding_manual - operator-driven gate responder
//!
//! Waits for a trigger from the HMI exactly like boardingd, then asks the
//! operator on stdin for the verdict: `1` = GO, `2` = STOP. One command is
//! sent per trigger. No camera, no depth engine.

use anyhow::Result;
use clap::Parser;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use boarding_gate::config::GateConfig;
use boarding_gate::protocol::{check_trigger, TriggerCheck};
use boarding_gate::{ControlPacket, Decision, HmiLink, UdpHmiLink};

#[derive(Parser, Debug)]
#[command(name = "boarding_manual", version, about = "Manual GO/STOP responder")]
struct Args {
    /// Config file (.json or .toml); only the network section is used.
    #[arg(long, env = "GATE_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = GateConfig::load_from(args.config.as_deref())?;
    let hmi_ip = config.network.hmi_addr.ip();
    let mut link = UdpHmiLink::bind(&config.link_config())?;

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        handler_stop.store(true, Ordering::SeqCst);
    })
    .expect("error setting Ctrl-C handler");

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    log::info!("boarding_manual waiting for triggers from {}", hmi_ip);
    while !stop.load(Ordering::SeqCst) {
        let inbound = match link.poll() {
            Ok(Some(inbound)) => inbound,
            Ok(None) => continue,
            Err(err) => {
                log::warn!("hmi link receive failed: {:#}", err);
                std::thread::sleep(std::time::Duration::from_millis(100));
                continue;
            }
        };
        match check_trigger(&inbound, hmi_ip) {
            TriggerCheck::Trigger => {}
            other => {
                log::warn!("ignoring datagram from {}: {:?}", inbound.from, other);
                continue;
            }
        }

        let Some(decision) = prompt_decision(&mut lines)? else {
            log::info!("stdin closed, exiting");
            break;
        };
        match link.send(&ControlPacket::command(decision)) {
            Ok(()) => println!("sent {}", decision),
            Err(err) => log::error!("failed to send {} to hmi: {:#}", decision, err),
        }
    }
    Ok(())
}

/// Ask until the operator types 1 or 2. `None` when stdin is closed.
fn prompt_decision<I>(lines: &mut I) -> Result<Option<Decision>>
where
    I: Iterator<Item = std::io::Result<String>>,
{
    loop {
        print!("trigger received - enter 1 (GO) or 2 (STOP): ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next() else {
            return Ok(None);
        };
        let line = line?;
        match parse_decision(&line) {
            Some(decision) => return Ok(Some(decision)),
            None => println!("invalid input '{}'", line.trim()),
        }
    }
}

fn parse_decision(input: &str) -> Option<Decision> {
    input
        .trim()
        .parse::<u8>()
        .ok()
        .and_then(Decision::from_wire)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_input_is_parsed_strictly() {
        assert_eq!(parse_decision("1\n"), Some(Decision::Go));
        assert_eq!(parse_decision(" 2 "), Some(Decision::Stop));
        assert_eq!(parse_decision("3"), None);
        assert_eq!(parse_decision("go"), None);
    }

    #[test]
    fn prompt_skips_invalid_lines() -> Result<()> {
        let mut lines = vec![Ok("x".to_string()), Ok("2".to_string())].into_iter();
        assert_eq!(prompt_decision(&mut lines)?, Some(Decision::Stop));
        assert_eq!(prompt_decision(&mut lines)?, None);
        Ok(())
    }
}
