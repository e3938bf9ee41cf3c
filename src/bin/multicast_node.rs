//! multicast-node - console front end for one group member
//!
//! Process `i` of `N` listens on `host:(base_port + i)`; every line typed on stdin is
//! reliably multicast to the other `N - 1` processes.

use std::io::{self, BufRead, Write};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use clap::Parser;
use crossbeam_channel::{unbounded, Receiver};
use reliable_multicast::{
    EventNotifier, MulticastConfig, MulticastEvent, PeerDirectory, ProcessId, ReliableMulticast, UdpTransport,
};

/// Reliable multicast over UDP
#[derive(Parser, Debug)]
#[command(name = "multicast-node")]
#[command(about = "Join a fixed group of processes and reliably multicast stdin lines")]
struct Args {
    /// Id of this process, in [0, total)
    process_id: ProcessId,

    /// Number of processes in the group
    total: u32,

    /// Address every process listens on
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    host: IpAddr,

    /// Port of process 0; process i uses base_port + i
    #[arg(long, default_value = "9000")]
    base_port: u16,

    /// Resend a message when unacknowledged for longer than this
    #[arg(long, default_value = "2000")]
    timeout_ms: u64,

    /// Pause between two retransmission sweeps
    #[arg(long, default_value = "500")]
    interval_ms: u64,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let directory = PeerDirectory::contiguous(args.host, args.base_port, args.total);
    let own_addr = directory
        .lookup(args.process_id)
        .ok_or_else(|| format!("process {} is not part of a group of {}", args.process_id, args.total))?;

    let config = MulticastConfig::new(
        Duration::from_millis(args.timeout_ms),
        Duration::from_millis(args.interval_ms),
    );
    let transport = UdpTransport::bind(own_addr, config.max_datagram_size)?;

    let (event_tx, event_rx) = unbounded();
    let notifier = Arc::new(EventNotifier::new(event_tx));
    let node = ReliableMulticast::new(args.process_id, directory, Arc::new(transport), notifier, config)?;
    let _handles = node.start()?;

    let process_id = args.process_id;
    thread::Builder::new()
        .name("console".to_string())
        .spawn(move || print_events(process_id, &event_rx))?;

    println!("[Process {process_id}] Online (reliable UDP). N={}.", args.total);
    prompt(process_id);

    for line in io::stdin().lock().lines() {
        let payload = line?;
        if !payload.is_empty() {
            node.multicast(&payload);
        }
        prompt(process_id);
    }

    println!("\n[Process {process_id}] Shutting down...");
    Ok(())
}

fn prompt(process_id: ProcessId) {
    print!("[Process {process_id}] Type your message: ");
    if let Err(err) = io::stdout().flush() {
        log::debug!("Cannot flush stdout: {err}");
    }
}

fn print_events(process_id: ProcessId, event_rx: &Receiver<MulticastEvent>) {
    for event in event_rx {
        match event {
            MulticastEvent::Sent { message_id, lamport_clock, payload, .. } => {
                println!("\n--- Sending multicast [LC: {lamport_clock}] ---");
                println!("  Content: '{payload}' | ID: {}...", message_id.short());
                println!("------------------------------------");
            }
            MulticastEvent::Delivered(delivery) => {
                println!("\n--- Message received [LC: {}] ---", delivery.local_clock);
                println!("  From: process {}", delivery.sender_id);
                println!("  Content: '{}'", delivery.payload);
                println!("  ID: {}...", delivery.message_id.short());
                println!("  Sender Lamport timestamp: {}", delivery.sender_clock);
                println!("--------------------------------------");
            }
            MulticastEvent::Retransmitted { message_id, destinations } => {
                println!("\n[RETRANSMISSION] Timeout for msg {}... resending to {destinations:?}", message_id.short());
            }
            MulticastEvent::FullyAcknowledged { message_id } => {
                println!("\n[ACK] Message {}... acknowledged by everyone", message_id.short());
            }
            MulticastEvent::NoPeers { .. } => {
                println!("No other process in the group to send to.");
            }
        }
        prompt(process_id);
    }
}
