//! Override frame synthesis.
//!
//! An override is the last genuine local panel frame with exactly one
//! press bit added.  It is only built while that frame is fresh, so the
//! injected copy still matches what the panel is currently saying.

use crate::error::OverrideError;
use crate::protocol::PacketBytes;
use crate::timing::Millis;

use super::state::GatewayState;

/// A single simulated button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideCommand {
    PowerToggle,
    Priority,
    TempUp,
    TempDown,
}

impl OverrideCommand {
    /// Add this command's press bit to `bytes`.
    pub fn press(self, bytes: PacketBytes) -> PacketBytes {
        match self {
            Self::PowerToggle => bytes.with_power_toggle_pressed(),
            Self::Priority => bytes.with_priority_pressed(),
            Self::TempUp => bytes.with_temp_up_pressed(),
            Self::TempDown => bytes.with_temp_down_pressed(),
        }
    }
}

/// Build the override frame for `command`.
///
/// Fails with [`OverrideError::NoOriginal`] before any local panel frame
/// was seen, and [`OverrideError::StaleOriginal`] once the last one is
/// `freshness_ms` or older.
pub fn synthesize(
    command: OverrideCommand,
    state: &GatewayState,
    now: Millis,
    freshness_ms: Millis,
) -> Result<PacketBytes, OverrideError> {
    let original = state.local_control().ok_or(OverrideError::NoOriginal)?;
    let age_ms = crate::timing::age(now, original.at_ms);
    if age_ms >= freshness_ms {
        return Err(OverrideError::StaleOriginal { age_ms });
    }
    Ok(command.press(original.bytes))
}
