//! Millisecond timestamp arithmetic.
//!
//! Bus timestamps are `u32` milliseconds since boot.  The heater reports on
//! a fixed cycle, and panel frames arrive at some offset into that cycle;
//! these helpers turn two independently stamped events into that offset.

/// Milliseconds since boot.
pub type Millis = u32;

/// Signed `t1 - t2`.  Negative when `t1` is earlier than `t2`, instead of
/// wrapping through unsigned overflow.
pub fn delta(t1: Millis, t2: Millis) -> i64 {
    i64::from(t1) - i64::from(t2)
}

/// Offset of `t1` into the report cycle that starts at `t2`.
///
/// When `t1` precedes `t2` the event belongs to the previous cycle, so one
/// `cycle` length is added.  Timestamps more than one cycle apart are not
/// folded any further.
pub fn positive_delta_in_cycle(t1: Millis, t2: Millis, cycle: Millis) -> i64 {
    let d = delta(t1, t2);
    if d < 0 {
        d + i64::from(cycle)
    } else {
        d
    }
}

/// Age of an event stamped `then`, as seen at `now`.
///
/// Uses wrapping subtraction, so an age stays correct across the `u32`
/// rollover at ~49.7 days.
pub fn age(now: Millis, then: Millis) -> Millis {
    now.wrapping_sub(then)
}
