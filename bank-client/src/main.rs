//! Client binary: discovers the server, then drives the request loop
//! against pairs handed over from the input thread, with the output thread
//! as the sole writer to stdout.

mod discovery;
mod error;
mod io_threads;
mod rendezvous;
mod request;

use std::net::UdpSocket;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bank_proto::ClientId;
use error::BankError;
use request::RequestResult;

fn run() -> Result<(), BankError> {
    let mut args = pico_args::Arguments::from_env();
    let port: u16 = args.free_from_str().map_err(|e| BankError::InvalidPort(e.to_string()))?;

    let socket = UdpSocket::bind(("0.0.0.0", 0)).map_err(BankError::SocketBind)?;
    socket.set_broadcast(true).map_err(BankError::SocketConfig)?;

    let bound_server = discovery::discover(&socket, port)?;

    let channels = io_threads::Channels::new();
    let program_exit = Arc::new(AtomicBool::new(false));
    let output_done = Arc::new(AtomicBool::new(false));

    let input_handle = io_threads::spawn_input(Arc::clone(&channels), Arc::clone(&program_exit));
    let output_handle = io_threads::spawn_output(Arc::clone(&channels), Arc::clone(&output_done));
    channels.output.put(format!("server {bound_server}"), &|| false);

    let stop = || program_exit.load(Ordering::Relaxed);
    let mut seqn_local: u32 = 0;
    while let Some((dest_ip, value)) = channels.input.take(&stop) {
        seqn_local += 1;
        let dest = ClientId::from(dest_ip);
        let result = request::send_request(&socket, bound_server, seqn_local, dest, value);
        let line = match result {
            RequestResult::Acked { new_balance } => {
                format!("server {bound_server} id req {seqn_local} dest {dest_ip} value {value} new_balance {new_balance}")
            }
            RequestResult::Errored => {
                format!("server {bound_server} id req {seqn_local} dest {dest_ip} value {value}: rejected (ERROR_REQ)")
            }
            RequestResult::GaveUp => {
                format!("id req {seqn_local} dest {dest_ip} value {value}: giving up after {} attempts", request::MAX_RETRIES)
            }
        };
        channels.output.put(line, &|| false);
    }

    let _ = input_handle.join();
    output_done.store(true, Ordering::Relaxed);
    let _ = output_handle.join();
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
