//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements         | Connects to                   |
//! |--------------|--------------------|-------------------------------|
//! | `bus_tap`    | BusPort            | decoder queues, transmit slot |
//! | `hardware`   | DevicePort         | test input GPIO, WiFi         |
//! |              | ClockPort          | ESP32 system timer            |
//! | `log_sink`   | EventSink          | `log` facade                  |
//! |              | LogControlPort     | `log_router`                  |
//! | `mqtt`       | MqttPort           | ESP-IDF MQTT client           |
//! | `time`       | ClockPort          | ESP32 system timer            |
//! | `wifi`       | (none)             | ESP-IDF WiFi STA              |

pub mod bus_tap;
pub mod device_id;
pub mod hardware;
pub mod log_router;
pub mod log_sink;
pub mod mqtt;
pub mod time;
pub mod wifi;
