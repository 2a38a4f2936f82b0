//! Packet validation and classification.
//!
//! Turns a [`RawPacket`] from either tap into a [`Classified`] frame, or
//! rejects it.  Pure: nothing here touches [`GatewayState`](super::state::GatewayState).

use crate::error::PacketError;
use crate::protocol::{self, ControlStatus, HeaterStatus, PacketBytes, PacketSource};
use crate::timing::Millis;

use super::ports::{BusTap, RawPacket};
use super::state::ControlSlot;

/// An accepted frame, ready to be recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classified {
    Heater {
        status: HeaterStatus,
        bytes: PacketBytes,
        at_ms: Millis,
    },
    Control {
        slot: ControlSlot,
        status: ControlStatus,
        bytes: PacketBytes,
        at_ms: Millis,
    },
    /// Kept for research; not decoded.
    Unknown { bytes: PacketBytes, at_ms: Millis },
}

/// Validate and classify one frame.
///
/// Heater frames are only trusted from tap A.  Tap B sits on the panel
/// side of the wiring, so a heater-tagged frame there is cross-talk and is
/// filed as unknown without decoding.
pub fn classify(packet: &RawPacket) -> Result<Classified, PacketError> {
    if !packet.is_well_formed() {
        return Err(PacketError::MalformedPacket);
    }

    let bytes = packet.data;
    let at_ms = packet.start_ms;

    match (protocol::classify_source(bytes.as_bytes()), packet.tap) {
        (PacketSource::Invalid, _) => Err(PacketError::DecodeRejected),
        (PacketSource::Heater, BusTap::B) => Ok(Classified::Unknown { bytes, at_ms }),
        (PacketSource::Heater, BusTap::A) => {
            let status = protocol::decode_heater(&bytes).ok_or(PacketError::DecodeFailure)?;
            Ok(Classified::Heater { status, bytes, at_ms })
        }
        (PacketSource::Control, tap) => {
            let status = protocol::decode_control(&bytes).ok_or(PacketError::DecodeFailure)?;
            let slot = match tap {
                BusTap::A => ControlSlot::Remote,
                BusTap::B => ControlSlot::Local,
            };
            Ok(Classified::Control { slot, status, bytes, at_ms })
        }
    }
}
