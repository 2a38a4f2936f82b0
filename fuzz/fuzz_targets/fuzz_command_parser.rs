//! Fuzz target: `GatewayCommand::parse`
//!
//! Arbitrary topic and payload strings must never panic the parser, and
//! a parsed temperature must always land in the heater's range once
//! clamped.
//!
//! cargo fuzz run fuzz_command_parser

#![no_main]

use libfuzzer_sys::fuzz_target;
use rinnai_gateway::app::commands::GatewayCommand;
use rinnai_gateway::protocol::{clamp_temperature, TEMP_MAX, TEMP_MIN};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let (topic, payload) = text.split_once('\n').unwrap_or((text, ""));
    if let Some(GatewayCommand::SetTargetTemperature(t)) = GatewayCommand::parse(topic, payload) {
        assert!((TEMP_MIN..=TEMP_MAX).contains(&clamp_temperature(t)));
    }
});
