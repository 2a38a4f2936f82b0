//! Topic layout and the Home Assistant climate discovery document.

use serde::Serialize;

use crate::protocol::{TEMP_MAX, TEMP_MIN};

pub const AVAILABILITY_ONLINE: &str = "online";
pub const AVAILABILITY_OFFLINE: &str = "offline";

/// Every topic the gateway uses, derived once from the base topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub base: String,
    pub state: String,
    pub config: String,
    pub availability: String,
    /// Subscription filter covering every command topic.
    pub commands: String,
}

impl Topics {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.into(),
            state: format!("{base}/state"),
            config: format!("{base}/config"),
            availability: format!("{base}/availability"),
            commands: format!("{base}/#"),
        }
    }
}

/// MQTT discovery payload for a climate entity.  Topics are relative to
/// `~`, which Home Assistant expands to the base topic.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryDocument<'a> {
    #[serde(rename = "~")]
    pub base: &'a str,
    pub name: &'a str,
    pub action_topic: &'static str,
    pub action_template: &'static str,
    pub current_temperature_topic: &'static str,
    pub current_temperature_template: &'static str,
    pub max_temp: i32,
    pub min_temp: i32,
    pub initial: i32,
    pub mode_command_topic: &'static str,
    pub mode_state_topic: &'static str,
    pub mode_state_template: &'static str,
    pub modes: [&'static str; 2],
    pub precision: u8,
    pub temperature_command_topic: &'static str,
    pub temperature_unit: &'static str,
    pub temperature_state_topic: &'static str,
    pub temperature_state_template: &'static str,
    pub availability_topic: &'static str,
}

impl<'a> DiscoveryDocument<'a> {
    pub fn new(topics: &'a Topics, device_name: &'a str) -> Self {
        Self {
            base: &topics.base,
            name: device_name,
            action_topic: "~/state",
            action_template: "{{ value_json.action }}",
            current_temperature_topic: "~/state",
            current_temperature_template: "{{ value_json.currentTemperature }}",
            max_temp: TEMP_MAX,
            min_temp: TEMP_MIN,
            initial: TEMP_MIN,
            mode_command_topic: "~/mode",
            mode_state_topic: "~/state",
            mode_state_template: "{{ value_json.mode }}",
            modes: ["off", "heat"],
            precision: 1,
            temperature_command_topic: "~/temp",
            temperature_unit: "C",
            temperature_state_topic: "~/state",
            temperature_state_template: "{{ value_json.targetTemperature }}",
            availability_topic: "~/availability",
        }
    }
}
