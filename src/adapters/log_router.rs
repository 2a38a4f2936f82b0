//! Runtime-switchable log output.
//!
//! [`LogRouter`] is the process-wide `log::Log` implementation.  Records
//! go to the serial console (stdout, which ESP-IDF maps to the UART) or
//! to a single telnet client, selected by the `log_destination` command.
//!
//! The telnet side is a non-blocking `TcpListener`.  A pending client is
//! accepted lazily when a record is written; a client whose socket errors
//! is dropped and output continues on serial until the next one connects.

use core::sync::atomic::{AtomicU8, Ordering};
use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::sync::Mutex;

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::app::commands::LogDestination;

pub const TELNET_PORT: u16 = 23;

const DEST_SERIAL: u8 = 0;
const DEST_TELNET: u8 = 1;

#[derive(Default)]
struct Telnet {
    listener: Option<TcpListener>,
    client: Option<TcpStream>,
}

pub struct LogRouter {
    destination: AtomicU8,
    telnet: Mutex<Telnet>,
    port: u16,
}

/// The router installed by [`init`].
pub static ROUTER: LogRouter = LogRouter::new(TELNET_PORT);

/// Install [`ROUTER`] as the global logger.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&ROUTER)?;
    log::set_max_level(level);
    Ok(())
}

impl LogRouter {
    pub const fn new(port: u16) -> Self {
        Self {
            destination: AtomicU8::new(DEST_SERIAL),
            telnet: Mutex::new(Telnet {
                listener: None,
                client: None,
            }),
            port,
        }
    }

    pub fn destination(&self) -> LogDestination {
        match self.destination.load(Ordering::Relaxed) {
            DEST_TELNET => LogDestination::Telnet,
            _ => LogDestination::Serial,
        }
    }

    /// Switch output.  Selecting telnet binds the listener on first use;
    /// if that fails output stays on serial and the error is returned.
    pub fn route(&self, destination: LogDestination) -> std::io::Result<()> {
        match destination {
            LogDestination::Serial => {
                self.destination.store(DEST_SERIAL, Ordering::Relaxed);
                Ok(())
            }
            LogDestination::Telnet => {
                self.ensure_listener()?;
                self.destination.store(DEST_TELNET, Ordering::Relaxed);
                Ok(())
            }
        }
    }

    /// Port the telnet listener is bound to, once bound.
    pub fn telnet_port(&self) -> Option<u16> {
        let guard = self.telnet.lock().ok()?;
        let listener = guard.listener.as_ref()?;
        listener.local_addr().ok().map(|a| a.port())
    }

    fn ensure_listener(&self) -> std::io::Result<()> {
        let mut guard = self
            .telnet
            .lock()
            .map_err(|_| std::io::Error::other("telnet state poisoned"))?;
        if guard.listener.is_none() {
            let listener = TcpListener::bind(("0.0.0.0", self.port))?;
            listener.set_nonblocking(true)?;
            guard.listener = Some(listener);
        }
        Ok(())
    }

    /// Write one line to the telnet client.  `false` when there is no
    /// client to take it.  A client whose send buffer is full is dropped
    /// rather than waited on.
    fn write_telnet(&self, line: &str) -> bool {
        let Ok(mut guard) = self.telnet.lock() else {
            return false;
        };
        if guard.client.is_none() {
            if let Some(listener) = guard.listener.as_ref() {
                if let Ok((stream, _)) = listener.accept() {
                    // A client that stops reading must never stall the caller.
                    if stream.set_nonblocking(true).is_ok() {
                        let _ = stream.set_nodelay(true);
                        guard.client = Some(stream);
                    }
                }
            }
        }
        let Some(client) = guard.client.as_mut() else {
            return false;
        };
        if client.write_all(line.as_bytes()).and_then(|()| client.write_all(b"\r\n")).is_err() {
            guard.client = None;
            return false;
        }
        true
    }

    fn write_serial(line: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{line}");
    }
}

impl Log for LogRouter {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("{} {}: {}", record.level(), record.target(), record.args());
        let delivered = self.destination() == LogDestination::Telnet && self.write_telnet(&line);
        if !delivered {
            Self::write_serial(&line);
        }
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
        if let Ok(mut guard) = self.telnet.lock() {
            if let Some(c) = guard.client.as_mut() {
                let _ = c.flush();
            }
        }
    }
}
