//! Port traits: the hexagonal boundary between gateway logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ GatewayService (domain)
//! ```
//!
//! Driven adapters (bus taps, MQTT client, Wi-Fi, GPIO, log output)
//! implement these traits.  The [`GatewayService`](super::service::GatewayService)
//! consumes them via generics, so the domain core never touches hardware
//! or sockets directly.

use std::net::Ipv4Addr;

use crate::error::{CommsError, OverrideError};
use crate::protocol::PacketBytes;
use crate::timing::Millis;

use super::commands::LogDestination;

// ───────────────────────────────────────────────────────────────
// Bus port (driven adapter: signal decoder ↔ domain)
// ───────────────────────────────────────────────────────────────

/// The two points where the gateway listens on the bus wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusTap {
    /// Hears the heater and every panel.
    A,
    /// Hears the local panel side only; overrides are injected here.
    B,
}

impl BusTap {
    pub const ALL: [BusTap; 2] = [BusTap::A, BusTap::B];
}

/// A frame as handed over by the signal decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPacket {
    pub tap: BusTap,
    pub bits_present: u8,
    pub data: PacketBytes,
    /// Timestamp of the frame's first edge.
    pub start_ms: Millis,
    pub valid_preamble: bool,
    pub valid_parity: bool,
    pub valid_checksum: bool,
}

impl RawPacket {
    /// All three decoder validity flags set.
    pub fn is_well_formed(&self) -> bool {
        self.valid_preamble && self.valid_parity && self.valid_checksum
    }
}

/// Decoder health counters, reported at the `raw` log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TapDiagnostics {
    pub pulse_errors: u32,
    pub bit_errors: u32,
    pub packet_errors: u32,
    /// Frames waiting in the packet queue.
    pub queued: usize,
    /// Free slots in the packet queue.
    pub free: usize,
}

pub trait BusPort {
    /// Next pending frame from `tap`, without blocking.
    fn try_receive(&mut self, tap: BusTap) -> Option<RawPacket>;

    /// Arm a one-shot transmission for the next bus cycle.
    /// [`OverrideError::Busy`] while a previous override is still pending.
    fn set_override_packet(&mut self, bytes: PacketBytes) -> Result<(), OverrideError>;

    fn diagnostics(&self, tap: BusTap) -> TapDiagnostics;
}

// ───────────────────────────────────────────────────────────────
// MQTT port (driven adapter: domain ↔ broker)
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QoS {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

/// Something the broker connection reported since the last poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MqttEvent {
    Connected,
    Disconnected,
    Message { topic: String, payload: String },
}

/// Broker connection.  Inbound deliveries are queued by the adapter and
/// drained by the poll loop through [`MqttPort::poll_event`], so the
/// domain state has a single owner.
pub trait MqttPort {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool, qos: QoS)
        -> Result<(), CommsError>;

    fn subscribe(&mut self, topic_filter: &str) -> Result<(), CommsError>;

    fn connected(&self) -> bool;

    /// Register the broker-held last-will message.  Must be called before
    /// the first connection attempt.
    fn set_will(&mut self, topic: &str, payload: &str, retain: bool, qos: QoS);

    fn poll_event(&mut self) -> Option<MqttEvent>;
}

// ───────────────────────────────────────────────────────────────
// Device / clock ports (driven adapter: board → domain)
// ───────────────────────────────────────────────────────────────

pub trait DevicePort {
    /// Station address, `None` while not associated.
    fn local_ip(&self) -> Option<Ipv4Addr>;

    /// Signal strength of the current AP in dBm.
    fn rssi(&self) -> Option<i8>;

    /// State of the active-low test input (true = pulled low).
    fn test_input_active(&mut self) -> bool;
}

pub trait ClockPort {
    /// Monotonic milliseconds since boot, same time base as the decoder.
    fn now_ms(&self) -> Millis;
}

// ───────────────────────────────────────────────────────────────
// Event sink / log control (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

/// Switches where log output is written.
pub trait LogControlPort {
    fn route_logs(&mut self, destination: LogDestination);
}
