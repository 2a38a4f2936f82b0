//! Bus tap queues and the one-shot transmit slot.
//!
//! The signal decoder runs in its own tasks and hands finished frames to
//! the poll loop through bounded `embassy-sync` channels, one per tap.
//! The transmit side is a single-slot channel: a full slot means the
//! previous override has not gone out on the wire yet.
//!
//! ```text
//!  decoder A ──▶ packets[A] ──┐
//!                             ├──▶ BusTapAdapter (BusPort) ──▶ GatewayService
//!  decoder B ──▶ packets[B] ──┘            │
//!  transmitter ◀── override slot ◀─────────┘
//! ```

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::app::ports::{BusPort, BusTap, RawPacket, TapDiagnostics};
use crate::error::OverrideError;
use crate::protocol::PacketBytes;

/// Frames buffered per tap between two polls.
pub const PACKET_QUEUE_DEPTH: usize = 16;

/// Decoder error counters for one tap.
pub struct DecoderCounters {
    pulse_errors: AtomicU32,
    bit_errors: AtomicU32,
    packet_errors: AtomicU32,
}

impl DecoderCounters {
    const fn new() -> Self {
        Self {
            pulse_errors: AtomicU32::new(0),
            bit_errors: AtomicU32::new(0),
            packet_errors: AtomicU32::new(0),
        }
    }

    pub fn pulse_error(&self) {
        self.pulse_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bit_error(&self) {
        self.bit_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn packet_error(&self) {
        self.packet_errors.fetch_add(1, Ordering::Relaxed);
    }
}

/// Everything shared between the decoder side and the poll loop.
pub struct BusQueues {
    packets_a: Channel<CriticalSectionRawMutex, RawPacket, PACKET_QUEUE_DEPTH>,
    packets_b: Channel<CriticalSectionRawMutex, RawPacket, PACKET_QUEUE_DEPTH>,
    counters_a: DecoderCounters,
    counters_b: DecoderCounters,
    override_slot: Channel<CriticalSectionRawMutex, PacketBytes, 1>,
}

/// Queues used by the firmware image.
pub static BUS: BusQueues = BusQueues::new();

impl Default for BusQueues {
    fn default() -> Self {
        Self::new()
    }
}

impl BusQueues {
    pub const fn new() -> Self {
        Self {
            packets_a: Channel::new(),
            packets_b: Channel::new(),
            counters_a: DecoderCounters::new(),
            counters_b: DecoderCounters::new(),
            override_slot: Channel::new(),
        }
    }

    fn packets(&self, tap: BusTap) -> &Channel<CriticalSectionRawMutex, RawPacket, PACKET_QUEUE_DEPTH> {
        match tap {
            BusTap::A => &self.packets_a,
            BusTap::B => &self.packets_b,
        }
    }

    pub fn counters(&self, tap: BusTap) -> &DecoderCounters {
        match tap {
            BusTap::A => &self.counters_a,
            BusTap::B => &self.counters_b,
        }
    }

    // ── Decoder side ──────────────────────────────────────────

    /// Queue a decoded frame.  A full queue drops the frame and counts a
    /// packet error on its tap.
    pub fn push_packet(&self, packet: RawPacket) -> bool {
        if self.packets(packet.tap).try_send(packet).is_ok() {
            return true;
        }
        self.counters(packet.tap).packet_error();
        false
    }

    /// Take the armed override, if any, for transmission in the current
    /// bus cycle.
    pub fn take_override(&self) -> Option<PacketBytes> {
        self.override_slot.try_receive().ok()
    }
}

// ───────────────────────────────────────────────────────────────
// BusPort
// ───────────────────────────────────────────────────────────────

/// Poll-loop side of [`BusQueues`].
pub struct BusTapAdapter {
    queues: &'static BusQueues,
}

impl BusTapAdapter {
    pub fn new(queues: &'static BusQueues) -> Self {
        Self { queues }
    }
}

impl BusPort for BusTapAdapter {
    fn try_receive(&mut self, tap: BusTap) -> Option<RawPacket> {
        self.queues.packets(tap).try_receive().ok()
    }

    fn set_override_packet(&mut self, bytes: PacketBytes) -> Result<(), OverrideError> {
        self.queues
            .override_slot
            .try_send(bytes)
            .map_err(|_| OverrideError::Busy)
    }

    fn diagnostics(&self, tap: BusTap) -> TapDiagnostics {
        let c = self.queues.counters(tap);
        let q = self.queues.packets(tap);
        TapDiagnostics {
            pulse_errors: c.pulse_errors.load(Ordering::Relaxed),
            bit_errors: c.bit_errors.load(Ordering::Relaxed),
            packet_errors: c.packet_errors.load(Ordering::Relaxed),
            queued: q.len(),
            free: q.free_capacity(),
        }
    }
}
