//! Temperature synchronisation.
//!
//! The heater only changes its setpoint one step per panel button press, so
//! steering it toward a target means pressing up or down once per cycle
//! until the reported temperature matches.

use crate::timing::Millis;

use super::overrides::OverrideCommand;
use super::state::GatewayState;

/// Decide whether a temperature step is due.
///
/// Requires sync to be enabled, a heater reading, a target, a mismatch
/// between the two, and a local panel frame younger than `freshness_ms`.
pub fn evaluate(state: &GatewayState, now: Millis, freshness_ms: Millis) -> Option<OverrideCommand> {
    if !state.temperature_sync_enabled() {
        return None;
    }
    let reported = state.heater()?.status.temperature_celsius;
    let target = state.target_temperature()?;
    if reported == target {
        return None;
    }
    if state.local_control_age(now)? >= freshness_ms {
        return None;
    }

    Some(if reported < target {
        OverrideCommand::TempUp
    } else {
        OverrideCommand::TempDown
    })
}
