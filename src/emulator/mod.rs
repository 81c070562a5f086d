//! Emulator protocol engine: process transport, line framing, command/reply correlation and
//! unsolicited event dispatching.

pub mod command;
pub mod correlator;
pub mod dispatch;
pub mod framer;
pub mod process;

use crate::emulator::framer::{Line, LineReader};
use std::io::{BufRead, BufReader, Read};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Log target for the raw protocol traffic.
pub const WIRE_TARGET: &str = "emudbg::wire";

/// Consumer of the classified emulator output.
pub trait LineHandler: Send + Sync + 'static {
    /// Called for each non-empty line read from emulator.
    fn on_line(&self, line: Line);

    /// Called once when emulator output is closed.
    fn on_disconnect(&self);
}

/// Read emulator output until the stream is closed, classify lines and pass them to handler.
pub fn read_loop<R: BufRead>(reader: R, handler: &impl LineHandler) {
    let mut reader = LineReader::new(reader);
    loop {
        let line = match reader.next_line() {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                log::warn!(target: WIRE_TARGET, "read emulator output: {e:#}");
                break;
            }
        };

        log::trace!(target: WIRE_TARGET, "RECV: {line}");
        match Line::classify(&line) {
            Line::Empty => continue,
            Line::Comment(comment) => {
                log::debug!(target: WIRE_TARGET, "emulator: {comment}");
            }
            line => handler.on_line(line),
        }
    }

    handler.on_disconnect();
}

/// Start the single read loop thread of an emulator connection.
pub fn spawn_read_loop<H: LineHandler>(
    output: impl Read + Send + 'static,
    handler: Arc<H>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("emulator-reader".to_string())
        .spawn(move || read_loop(BufReader::new(output), handler.as_ref()))
}
