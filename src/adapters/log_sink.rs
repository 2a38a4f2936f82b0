//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured gateway events through
//! the `log` facade, and [`LogControlPort`] by switching the
//! [`LogRouter`](super::log_router::LogRouter) output.

use log::{debug, info, warn};

use crate::app::commands::LogDestination;
use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, LogControlPort};

use super::log_router::{LogRouter, ROUTER};

/// Adapter that logs every [`AppEvent`].
pub struct LogEventSink {
    router: &'static LogRouter,
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogEventSink {
    pub fn new() -> Self {
        Self { router: &ROUTER }
    }

    pub fn with_router(router: &'static LogRouter) -> Self {
        Self { router }
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started => info!("START | last will armed"),
            AppEvent::PacketRejected { packet: p, reason } => {
                warn!(
                    "RX    | {:?} rejected ({}): bits={} data={} t={} pre={} par={} sum={}",
                    p.tap,
                    reason,
                    p.bits_present,
                    p.data,
                    p.start_ms,
                    p.valid_preamble,
                    p.valid_parity,
                    p.valid_checksum,
                );
            }
            AppEvent::HeaterParsed(h) => {
                info!(
                    "HEATER| a={} o={} u={} t={}",
                    h.active_id, h.power_on, h.in_use, h.temperature_celsius
                );
            }
            AppEvent::ControlParsed { slot, status: c } => {
                info!(
                    "PANEL | {:?} i={} o={} p={} td={} tu={}",
                    slot,
                    c.owner_id,
                    c.on_off_pressed,
                    c.priority_pressed,
                    c.temp_down_pressed,
                    c.temp_up_pressed,
                );
            }
            AppEvent::DecoderDiagnostics { tap, diagnostics: d } => {
                info!(
                    "RAW   | {:?} errors: pulse {} bit {} packet {} | queue: waiting {} avail {}",
                    tap, d.pulse_errors, d.bit_errors, d.packet_errors, d.queued, d.free,
                );
            }
            AppEvent::TargetInitialised(t) => info!("TARGET| initialised from heater: {}", t),
            AppEvent::OverrideSent { command, bytes } => {
                info!("TX    | override {:?} armed: {}", command, bytes);
            }
            AppEvent::OverrideFailed { command, error } => {
                warn!("TX    | override {:?} not sent: {}", command, error);
            }
            AppEvent::Connected { discovery } => {
                info!("MQTT  | connected, discovery {} bytes: {}", discovery.len(), discovery);
            }
            AppEvent::Disconnected => warn!("MQTT  | disconnected"),
            AppEvent::StatePublished { topic, payload } => {
                info!("MQTT  | '{}': {} bytes, {}", topic, payload.len(), payload);
            }
            AppEvent::PublishFailed { what, error } => {
                warn!("MQTT  | {:?} publish failed: {}", what, error);
            }
            AppEvent::SubscribeFailed(e) => warn!("MQTT  | subscribe failed: {}", e),
            AppEvent::CommandReceived { topic, payload } => {
                info!("CMD   | {} - {}", topic, payload);
            }
            AppEvent::TargetTemperatureSet(t) => info!("CMD   | target temperature {}", t),
            AppEvent::TemperatureSyncChanged(on) => info!("CMD   | temperature sync {}", on),
            AppEvent::LogLevelChanged(l) => info!("CMD   | log level {:?}", l),
            AppEvent::LogDestinationChanged(d) => info!("CMD   | log destination {:?}", d),
            AppEvent::CommandIgnored { command, reason } => {
                debug!("CMD   | '{}' ignored: {}", command, reason);
            }
            AppEvent::UnknownTopic(t) => warn!("CMD   | unknown topic: {}", t),
        }
    }
}

impl LogControlPort for LogEventSink {
    fn route_logs(&mut self, destination: LogDestination) {
        if let Err(e) = self.router.route(destination) {
            warn!("LOG   | cannot switch to {:?}: {}", destination, e);
        }
    }
}
