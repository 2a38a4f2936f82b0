//! Gateway configuration parameters.
//!
//! Compiled-in defaults, optionally overlaid at build time from
//! `RINNAI_*` environment variables (see [`GatewayConfig::from_build_env`]).
//! Nothing here is persisted at runtime.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Core gateway configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    // --- Identity ---
    /// Friendly name announced in the discovery document.
    pub device_name: String,
    /// Root of every topic this gateway publishes or subscribes to.
    pub base_topic: String,

    // --- MQTT ---
    /// Broker URL, e.g. `mqtt://192.168.1.10:1883`.
    pub mqtt_url: String,
    /// Empty means derive from the MAC (`rinnai-xxyyzz`).
    pub mqtt_client_id: String,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,

    // --- WiFi ---
    pub wifi_ssid: String,
    pub wifi_password: String,

    // --- Reporting ---
    /// Include protocol research fields (raw bytes, ids, timings) in the
    /// state document.
    pub report_research_fields: bool,
    /// Republish an unchanged state document after this long (ms).
    pub forced_flush_interval_ms: u32,

    // --- Override ---
    /// Maximum age (ms) of the last local panel frame for an override.
    pub override_freshness_ms: u32,

    // --- Timing ---
    /// Delay between poll-loop iterations (ms).
    pub poll_interval_ms: u32,
    /// Task watchdog timeout (ms).
    pub watchdog_timeout_ms: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            device_name: "Rinnai".into(),
            base_topic: "homeassistant/climate/rinnai".into(),

            mqtt_url: "mqtt://homeassistant.local:1883".into(),
            mqtt_client_id: String::new(),
            mqtt_username: None,
            mqtt_password: None,

            wifi_ssid: String::new(),
            wifi_password: String::new(),

            report_research_fields: true,
            forced_flush_interval_ms: 20_000,

            override_freshness_ms: 500,

            poll_interval_ms: 10,
            watchdog_timeout_ms: 10_000,
        }
    }
}

impl GatewayConfig {
    /// Defaults overlaid with whatever `RINNAI_*` variables were set when
    /// the firmware image was built.
    pub fn from_build_env() -> Self {
        let mut c = Self::default();
        if let Some(v) = option_env!("RINNAI_DEVICE_NAME") {
            c.device_name = v.into();
        }
        if let Some(v) = option_env!("RINNAI_BASE_TOPIC") {
            c.base_topic = v.into();
        }
        if let Some(v) = option_env!("RINNAI_MQTT_URL") {
            c.mqtt_url = v.into();
        }
        if let Some(v) = option_env!("RINNAI_MQTT_CLIENT_ID") {
            c.mqtt_client_id = v.into();
        }
        c.mqtt_username = option_env!("RINNAI_MQTT_USER").map(Into::into);
        c.mqtt_password = option_env!("RINNAI_MQTT_PASSWORD").map(Into::into);
        if let Some(v) = option_env!("RINNAI_WIFI_SSID") {
            c.wifi_ssid = v.into();
        }
        if let Some(v) = option_env!("RINNAI_WIFI_PASSWORD") {
            c.wifi_password = v.into();
        }
        c
    }

    /// Reject values the gateway cannot run with.
    pub fn validate(&self) -> Result<()> {
        let base = self.base_topic.as_str();
        if base.is_empty() || base.ends_with('/') {
            return Err(Error::Config("base_topic must be non-empty without trailing '/'"));
        }
        if base.contains(|ch: char| ch == '#' || ch == '+') {
            return Err(Error::Config("base_topic must not contain MQTT wildcards"));
        }
        if self.mqtt_url.is_empty() {
            return Err(Error::Config("mqtt_url is empty"));
        }
        if self.forced_flush_interval_ms == 0 {
            return Err(Error::Config("forced_flush_interval_ms must be > 0"));
        }
        if self.override_freshness_ms == 0 {
            return Err(Error::Config("override_freshness_ms must be > 0"));
        }
        if self.poll_interval_ms >= self.watchdog_timeout_ms {
            return Err(Error::Config("poll interval must be shorter than the watchdog timeout"));
        }
        Ok(())
    }
}
