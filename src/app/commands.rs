//! Inbound commands to the gateway service.
//!
//! MQTT deliveries on `<base>/<command>` are parsed once into a
//! [`GatewayCommand`], which the [`GatewayService`](super::service::GatewayService)
//! interprets and acts upon.

/// Topic segments the gateway publishes itself.  Deliveries on these are
/// echoes of our own traffic, never commands.
pub const SELF_TOPICS: [&str; 3] = ["state", "config", "availability"];

/// Verbosity of per-packet logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    #[default]
    None,
    /// One line per accepted heater / panel frame.
    Parsed,
    /// Decoder error counters and queue depths every poll.
    Raw,
}

impl LogLevel {
    pub fn parse(payload: &str) -> Option<Self> {
        match payload {
            "none" => Some(Self::None),
            "parsed" => Some(Self::Parsed),
            "raw" => Some(Self::Raw),
            _ => None,
        }
    }
}

/// Where log output is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogDestination {
    #[default]
    Serial,
    Telnet,
}

/// Requested heater power state from the `mode` topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeRequest {
    Off,
    Heat,
}

/// Commands the outside world can send into the gateway core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCommand {
    /// `temp`: new target temperature, not yet clamped.
    SetTargetTemperature(i32),

    /// `temperature_sync`: enable or disable the sync controller.
    SetTemperatureSync(bool),

    /// `mode`: `None` when the payload is neither `off` nor `heat`.
    SetMode(Option<ModeRequest>),

    /// `priority`: press the priority button once.
    PressPriority,

    /// `log_level`: `None` when the payload names no known level.
    SetLogLevel(Option<LogLevel>),

    /// `log_destination`.
    SetLogDestination(LogDestination),

    /// Any other topic segment.
    Unrecognized(String),
}

impl GatewayCommand {
    /// Parse a delivery.  Only the last topic segment matters.  Returns
    /// `None` for the gateway's own topics.
    pub fn parse(topic: &str, payload: &str) -> Option<Self> {
        let segment = command_segment(topic);
        if SELF_TOPICS.contains(&segment) {
            return None;
        }

        let cmd = match segment {
            "temp" => Self::SetTargetTemperature(parse_leading_int(payload)),
            "temperature_sync" => {
                Self::SetTemperatureSync(matches!(payload, "on" | "enable" | "true" | "1"))
            }
            "mode" => Self::SetMode(match payload {
                "off" => Some(ModeRequest::Off),
                "heat" => Some(ModeRequest::Heat),
                _ => None,
            }),
            "priority" => Self::PressPriority,
            "log_level" => Self::SetLogLevel(LogLevel::parse(payload)),
            "log_destination" => Self::SetLogDestination(if payload == "telnet" {
                LogDestination::Telnet
            } else {
                LogDestination::Serial
            }),
            other => Self::Unrecognized(other.into()),
        };
        Some(cmd)
    }
}

/// Final `/`-separated segment of a topic; the whole topic if it has none.
pub fn command_segment(topic: &str) -> &str {
    topic.rsplit('/').next().unwrap_or(topic)
}

/// Leading decimal integer, `atoi` style: leading whitespace skipped, one
/// optional sign, digits up to the first non-digit.  No digits yields 0.
/// Out-of-range values saturate.
pub fn parse_leading_int(s: &str) -> i32 {
    let s = s.trim_start_matches([' ', '\t', '\n', '\r', '\x0b', '\x0c']);
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value * 10 + i64::from(b - b'0');
        if value > i64::from(i32::MAX) + 1 {
            break;
        }
    }
    let value = if negative { -value } else { value };
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
