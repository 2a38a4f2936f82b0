//! Device identity derived from the ESP32 factory MAC address.
//!
//! Produces a stable hostname of the form `rinnai-xxyyzz` (last 3 bytes
//! of the 6-byte MAC in lowercase hex).  It is used as the MQTT client id
//! when none is configured, so two gateways on one broker never collide.

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// Format: `rinnai-xxyyzz`.
pub fn hostname(mac: &MacAddress) -> heapless::String<24> {
    let mut name = heapless::String::<24>::new();
    use core::fmt::Write;
    let _ = write!(name, "rinnai-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    name
}

/// The configured client id, or the MAC-derived hostname when empty.
pub fn mqtt_client_id(configured: &str, mac: &MacAddress) -> String {
    if configured.is_empty() {
        hostname(mac).as_str().into()
    } else {
        configured.into()
    }
}
