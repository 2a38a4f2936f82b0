//! Fuzz target: `classify`
//!
//! Builds a captured frame from arbitrary bytes and runs it through the
//! classifier and both status decoders.  Nothing may panic, and a frame
//! with any failed validity flag must be rejected.
//!
//! cargo fuzz run fuzz_packet_classifier

#![no_main]

use libfuzzer_sys::fuzz_target;
use rinnai_gateway::app::classifier::classify;
use rinnai_gateway::app::ports::{BusTap, RawPacket};
use rinnai_gateway::protocol::{decode_control, decode_heater, PacketBytes, TEMP_MAX, TEMP_MIN};

fuzz_target!(|data: &[u8]| {
    if data.len() < 6 {
        return;
    }
    let flags = data[0];
    let bytes = PacketBytes::new([data[1], data[2], data[3]]);
    let start_ms = u32::from(data[4]) << 8 | u32::from(data[5]);

    let packet = RawPacket {
        tap: if flags & 0x01 == 0 { BusTap::A } else { BusTap::B },
        bits_present: (flags >> 1) & 0x1F,
        data: bytes,
        start_ms,
        valid_preamble: flags & 0x20 != 0,
        valid_parity: flags & 0x40 != 0,
        valid_checksum: flags & 0x80 != 0,
    };

    let result = classify(&packet);
    if !packet.is_well_formed() {
        assert!(result.is_err(), "malformed frame accepted");
    }

    if let Some(h) = decode_heater(&bytes) {
        assert!((TEMP_MIN..=TEMP_MAX).contains(&h.temperature_celsius));
    }
    let _ = decode_control(&bytes);
    let _ = bytes.render();
});
