//! Three cooperating logical threads: input reads stdin and hands parsed
//! pairs to the request loop; the request loop (run by `main`) drains them
//! and drives each request's retransmission; output is the sole writer to
//! stdout, draining a rendezvous of pre-formatted lines so diagnostics from
//! every path interleave deterministically.

use std::io::{self, BufRead};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::rendezvous::Rendezvous;

pub type InputPair = (Ipv4Addr, u32);

/// Shared rendezvous points between the three threads.
pub struct Channels {
    pub input: Rendezvous<InputPair>,
    pub output: Rendezvous<String>,
}

impl Channels {
    pub fn new() -> Arc<Self> {
        Arc::new(Channels { input: Rendezvous::new(), output: Rendezvous::new() })
    }
}

/// Parses one line into zero or more `(dest_ip, value)` pairs, diagnosing
/// and skipping any unpaired trailing token or unparseable pair.
fn parse_line(line: &str, diagnose: impl Fn(String)) -> Vec<InputPair> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let mut pairs = Vec::new();
    let mut chunks = tokens.chunks_exact(2);
    for chunk in &mut chunks {
        let (ip_str, value_str) = (chunk[0], chunk[1]);
        match (ip_str.parse::<Ipv4Addr>(), value_str.parse::<u32>()) {
            (Ok(ip), Ok(value)) => pairs.push((ip, value)),
            _ => diagnose(format!("skipping unparseable pair: {ip_str:?} {value_str:?}")),
        }
    }
    if !chunks.remainder().is_empty() {
        diagnose(format!("skipping trailing token with no value: {:?}", chunks.remainder()[0]));
    }
    pairs
}

/// Spawns the input thread: reads stdin line by line, hands each valid pair
/// to `channels.input`, and sets `program_exit` on end-of-file.
pub fn spawn_input(channels: Arc<Channels>, program_exit: Arc<AtomicBool>) -> JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();
        let stop = || program_exit.load(Ordering::Relaxed);
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    channels.output.put(format!("stdin read error: {e}"), &stop);
                    break;
                }
            };
            let diag_channel = Arc::clone(&channels);
            for pair in parse_line(&line, |msg| {
                diag_channel.output.put(msg, &|| false);
            }) {
                if !channels.input.put(pair, &stop) {
                    break;
                }
            }
        }
        program_exit.store(true, Ordering::Relaxed);
    })
}

/// Spawns the output thread: the only thread that writes to stdout.
pub fn spawn_output(channels: Arc<Channels>, output_done: Arc<AtomicBool>) -> JoinHandle<()> {
    thread::spawn(move || {
        let stop = || output_done.load(Ordering::Relaxed);
        while let Some(line) = channels.output.take(&stop) {
            println!("{line}");
        }
    })
}
