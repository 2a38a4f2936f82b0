//! Bus protocol codec.
//!
//! Every frame on the heater bus carries a 3-byte payload.  The signal
//! decoder strips preamble, parity and checksum before a payload reaches
//! this module, so everything here works on the bare payload.
//!
//! ```text
//!  byte 0:  [src:2][state:3][id:3]
//!  byte 1:  [temp code:4][tdn][tup][prio][on]     (control: press bits)
//!  byte 2:  opaque status byte, carried through untouched
//! ```
//!
//! Source tag `0b10` is the heater, `0b01` a wall panel.  Anything else is
//! not a frame we understand.

use core::fmt;

use serde::{Serialize, Serializer};

/// Payload width of a single bus frame.
pub const BYTES_IN_PACKET: usize = 3;

/// Lowest temperature the heater accepts (°C).
pub const TEMP_MIN: i32 = 37;
/// Highest temperature the heater accepts (°C).
pub const TEMP_MAX: i32 = 48;

const SOURCE_SHIFT: u8 = 6;
const SOURCE_HEATER: u8 = 0b10;
const SOURCE_CONTROL: u8 = 0b01;

const STATE_MASK: u8 = 0b0011_1000;
const STATE_SHIFT: u8 = 3;
const ID_MASK: u8 = 0b0000_0111;

const BIT_ON: u8 = 1 << 0;
const BIT_IN_USE: u8 = 1 << 1;

const BIT_ON_OFF_PRESSED: u8 = 1 << 0;
const BIT_PRIORITY_PRESSED: u8 = 1 << 1;
const BIT_TEMP_UP_PRESSED: u8 = 1 << 2;
const BIT_TEMP_DOWN_PRESSED: u8 = 1 << 3;

const TEMP_CODE_SHIFT: u8 = 4;
const RESERVED_CONTROL_BITS: u8 = 0b1111_0000;

// ───────────────────────────────────────────────────────────────
// PacketBytes
// ───────────────────────────────────────────────────────────────

/// Owned copy of a frame payload.
///
/// The press setters consume and return a new value, so a stored frame is
/// never edited in place by whoever builds an override from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct PacketBytes([u8; BYTES_IN_PACKET]);

impl PacketBytes {
    pub const fn new(bytes: [u8; BYTES_IN_PACKET]) -> Self {
        Self(bytes)
    }

    /// Copy a payload out of a decoder buffer.  `None` unless the slice is
    /// exactly [`BYTES_IN_PACKET`] long.
    pub fn from_slice(data: &[u8]) -> Option<Self> {
        let bytes: [u8; BYTES_IN_PACKET] = data.try_into().ok()?;
        Some(Self(bytes))
    }

    pub const fn as_bytes(&self) -> &[u8; BYTES_IN_PACKET] {
        &self.0
    }

    /// Lowercase hex, e.g. `"a4251c"`.
    pub fn render(&self) -> heapless::String<{ BYTES_IN_PACKET * 2 }> {
        let mut out = heapless::String::new();
        for b in self.0 {
            // Capacity is exactly two digits per byte.
            let _ = core::fmt::Write::write_fmt(&mut out, format_args!("{:02x}", b));
        }
        out
    }

    #[must_use]
    pub const fn with_power_toggle_pressed(self) -> Self {
        self.with_byte1_bit(BIT_ON_OFF_PRESSED)
    }

    #[must_use]
    pub const fn with_priority_pressed(self) -> Self {
        self.with_byte1_bit(BIT_PRIORITY_PRESSED)
    }

    #[must_use]
    pub const fn with_temp_up_pressed(self) -> Self {
        self.with_byte1_bit(BIT_TEMP_UP_PRESSED)
    }

    #[must_use]
    pub const fn with_temp_down_pressed(self) -> Self {
        self.with_byte1_bit(BIT_TEMP_DOWN_PRESSED)
    }

    const fn with_byte1_bit(self, bit: u8) -> Self {
        let mut b = self.0;
        b[1] |= bit;
        Self(b)
    }
}

impl fmt::Display for PacketBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl Serialize for PacketBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.render())
    }
}

// ───────────────────────────────────────────────────────────────
// Decoded frames
// ───────────────────────────────────────────────────────────────

/// Who sent a frame, judged from its payload alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketSource {
    Heater,
    Control,
    Invalid,
}

/// Status report broadcast by the heater once per bus cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaterStatus {
    /// Id of the panel currently in control.
    pub active_id: u8,
    pub power_on: bool,
    /// Burner running (hot water is being drawn).
    pub in_use: bool,
    pub temperature_celsius: i32,
    pub startup_state: u8,
}

/// Button/state report from a wall panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlStatus {
    pub owner_id: u8,
    pub on_off_pressed: bool,
    pub priority_pressed: bool,
    pub temp_up_pressed: bool,
    pub temp_down_pressed: bool,
}

/// Classify a payload by its source tag.
pub fn classify_source(data: &[u8]) -> PacketSource {
    if data.len() != BYTES_IN_PACKET {
        return PacketSource::Invalid;
    }
    match data[0] >> SOURCE_SHIFT {
        SOURCE_HEATER => PacketSource::Heater,
        SOURCE_CONTROL => PacketSource::Control,
        _ => PacketSource::Invalid,
    }
}

/// Decode a heater frame.  `None` for a wrong source tag or a temperature
/// code outside the heater's range.
pub fn decode_heater(bytes: &PacketBytes) -> Option<HeaterStatus> {
    let b = bytes.as_bytes();
    if classify_source(b) != PacketSource::Heater {
        return None;
    }
    let code = i32::from(b[1] >> TEMP_CODE_SHIFT);
    let temperature_celsius = TEMP_MIN + code;
    if temperature_celsius > TEMP_MAX {
        return None;
    }
    Some(HeaterStatus {
        active_id: b[0] & ID_MASK,
        power_on: b[1] & BIT_ON != 0,
        in_use: b[1] & BIT_IN_USE != 0,
        temperature_celsius,
        startup_state: (b[0] & STATE_MASK) >> STATE_SHIFT,
    })
}

/// Decode a panel frame.  `None` for a wrong source tag or when reserved
/// bits are set.
pub fn decode_control(bytes: &PacketBytes) -> Option<ControlStatus> {
    let b = bytes.as_bytes();
    if classify_source(b) != PacketSource::Control {
        return None;
    }
    if b[0] & STATE_MASK != 0 || b[1] & RESERVED_CONTROL_BITS != 0 {
        return None;
    }
    Some(ControlStatus {
        owner_id: b[0] & ID_MASK,
        on_off_pressed: b[1] & BIT_ON_OFF_PRESSED != 0,
        priority_pressed: b[1] & BIT_PRIORITY_PRESSED != 0,
        temp_up_pressed: b[1] & BIT_TEMP_UP_PRESSED != 0,
        temp_down_pressed: b[1] & BIT_TEMP_DOWN_PRESSED != 0,
    })
}

/// Clamp a requested temperature into the heater's accepted range.
pub fn clamp_temperature(celsius: i32) -> i32 {
    celsius.clamp(TEMP_MIN, TEMP_MAX)
}
