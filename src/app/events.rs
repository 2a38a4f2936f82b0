//! Outbound application events.
//!
//! The [`GatewayService`](super::service::GatewayService) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (log to serial, forward over telnet).

use crate::error::{CommsError, OverrideError, PacketError};
use crate::protocol::{ControlStatus, HeaterStatus, PacketBytes};

use super::commands::{LogDestination, LogLevel};
use super::overrides::OverrideCommand;
use super::ports::{BusTap, RawPacket, TapDiagnostics};
use super::state::ControlSlot;

/// Which outbound message a publish failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outbound {
    State,
    Discovery,
    Availability,
}

/// Structured events emitted by the gateway core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Service started; the last will is armed.
    Started,

    /// A frame was dropped by validation or classification.
    PacketRejected { packet: RawPacket, reason: PacketError },

    /// Accepted heater frame (only at [`LogLevel::Parsed`]).
    HeaterParsed(HeaterStatus),

    /// Accepted panel frame (only at [`LogLevel::Parsed`]).
    ControlParsed { slot: ControlSlot, status: ControlStatus },

    /// Decoder counters for one tap (only at [`LogLevel::Raw`]).
    DecoderDiagnostics { tap: BusTap, diagnostics: TapDiagnostics },

    /// The first heater frame set the target temperature.
    TargetInitialised(i32),

    OverrideSent { command: OverrideCommand, bytes: PacketBytes },
    OverrideFailed { command: OverrideCommand, error: OverrideError },

    /// Broker session established and discovery sent.
    Connected { discovery: String },
    Disconnected,

    StatePublished { topic: String, payload: String },
    PublishFailed { what: Outbound, error: CommsError },
    SubscribeFailed(CommsError),

    /// A delivery on a command topic, before it is applied.
    CommandReceived { topic: String, payload: String },
    TargetTemperatureSet(i32),
    TemperatureSyncChanged(bool),
    LogLevelChanged(LogLevel),
    LogDestinationChanged(LogDestination),
    /// A recognised command that had nothing to act on.
    CommandIgnored { command: &'static str, reason: &'static str },
    UnknownTopic(String),
}
