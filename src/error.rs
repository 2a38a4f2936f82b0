//! Unified error types for the gateway.
//!
//! One `Error` enum that every subsystem converts into, so the poll loop
//! and the firmware entry point handle failures uniformly.  All variants
//! are `Copy`; none of them are fatal to the poll loop.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level gateway error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A bus frame was dropped.
    Packet(PacketError),
    /// An override could not be injected.
    Override(OverrideError),
    /// MQTT or Wi-Fi failure.
    Comms(CommsError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Packet(e) => write!(f, "packet: {e}"),
            Self::Override(e) => write!(f, "override: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Packet errors
// ---------------------------------------------------------------------------

/// Why a decoded frame was dropped before touching gateway state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketError {
    /// Preamble, parity or checksum flagged bad by the signal decoder.
    MalformedPacket,
    /// Source tag not recognised.
    DecodeRejected,
    /// Recognised source, but the fields do not decode.
    DecodeFailure,
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedPacket => write!(f, "malformed packet"),
            Self::DecodeRejected => write!(f, "unrecognised packet source"),
            Self::DecodeFailure => write!(f, "packet fields failed to decode"),
        }
    }
}

impl From<PacketError> for Error {
    fn from(e: PacketError) -> Self {
        Self::Packet(e)
    }
}

// ---------------------------------------------------------------------------
// Override errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideError {
    /// No local panel frame has been seen yet.
    NoOriginal,
    /// The last local panel frame is too old to reuse.
    StaleOriginal { age_ms: u32 },
    /// The transmit slot still holds a pending override.
    Busy,
}

impl fmt::Display for OverrideError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOriginal => write!(f, "no local panel frame to base override on"),
            Self::StaleOriginal { age_ms } => {
                write!(f, "local panel frame is {age_ms} ms old")
            }
            Self::Busy => write!(f, "transmit slot busy"),
        }
    }
}

impl From<OverrideError> for Error {
    fn from(e: OverrideError) -> Self {
        Self::Override(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    WifiConnectFailed,
    WifiDisconnected,
    MqttConnectFailed,
    MqttNotConnected,
    MqttPublishFailed,
    MqttSubscribeFailed,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WifiConnectFailed => write!(f, "WiFi connect failed"),
            Self::WifiDisconnected => write!(f, "WiFi disconnected"),
            Self::MqttConnectFailed => write!(f, "MQTT connect failed"),
            Self::MqttNotConnected => write!(f, "MQTT not connected"),
            Self::MqttPublishFailed => write!(f, "MQTT publish failed"),
            Self::MqttSubscribeFailed => write!(f, "MQTT subscribe failed"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, Error>;
