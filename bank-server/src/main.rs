//! Server binary: binds a UDP socket, owns the [`BankState`], and drives the
//! concurrency shell and log emitter. `main` covers only startup —
//! argument parsing and socket bind are the sole recoverable-by-exit-code
//! failures; everything past that runs forever.

mod emitter;
mod error;
mod shell;

use std::net::UdpSocket;
use std::process::ExitCode;
use std::sync::{Arc, RwLock};

use bank_core::BankState;
use error::BankError;

fn run() -> Result<(), BankError> {
    let mut args = pico_args::Arguments::from_env();
    let port: u16 = args.free_from_str().map_err(|e| BankError::InvalidPort(e.to_string()))?;

    let socket = UdpSocket::bind(("0.0.0.0", port)).map_err(BankError::SocketBind)?;
    log::info!("bank-server listening on 0.0.0.0:{port}");

    let state = Arc::new(RwLock::new(BankState::new()));
    let emitter = emitter::Emitter::spawn();
    emitter.send(emitter::startup_line());
    let emitter_handle = emitter.handle();

    shell::run(socket, state, emitter_handle);
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
