//! Poll-loop watchdog.
//!
//! Subscribes the main task to the ESP-IDF Task Watchdog, which panics
//! and reboots the gateway if the loop stops feeding it.  Each feed also
//! measures the gap since the previous one: a slow iteration lets the
//! decoder queues fill and frames get dropped, so long gaps are logged
//! well before the hardware timeout would fire.

use log::warn;

use crate::timing::{age, Millis};

pub struct Watchdog {
    timeout_ms: Millis,
    last_feed_ms: Option<Millis>,
    longest_gap_ms: Millis,
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl Watchdog {
    pub fn new(timeout_ms: Millis) -> Self {
        Self {
            timeout_ms,
            last_feed_ms: None,
            longest_gap_ms: 0,
            #[cfg(target_os = "espidf")]
            subscribed: subscribe(timeout_ms),
        }
    }

    pub fn timeout_ms(&self) -> Millis {
        self.timeout_ms
    }

    /// Longest gap between two feeds so far.
    pub fn longest_gap_ms(&self) -> Millis {
        self.longest_gap_ms
    }

    /// Reset the hardware timer.  Call once per loop iteration.
    pub fn feed(&mut self, now: Millis) {
        if let Some(prev) = self.last_feed_ms {
            let gap = age(now, prev);
            if gap > self.longest_gap_ms {
                self.longest_gap_ms = gap;
            }
            if gap >= self.timeout_ms / 2 {
                warn!("Watchdog: loop stalled {} ms (timeout {} ms)", gap, self.timeout_ms);
            }
        }
        self.last_feed_ms = Some(now);

        #[cfg(target_os = "espidf")]
        {
            if self.subscribed {
                // SAFETY: resets the TWDT entry of the calling task only.
                unsafe {
                    esp_idf_svc::sys::esp_task_wdt_reset();
                }
            }
        }
    }
}

#[cfg(target_os = "espidf")]
fn subscribe(timeout_ms: Millis) -> bool {
    use esp_idf_svc::sys::{esp_task_wdt_add, esp_task_wdt_config_t, esp_task_wdt_reconfigure, ESP_OK};

    let cfg = esp_task_wdt_config_t {
        timeout_ms,
        idle_core_mask: 0,
        trigger_panic: true,
    };
    // SAFETY: plain FFI calls; a null handle means the current task.
    let (reconfigured, added) = unsafe {
        (esp_task_wdt_reconfigure(&cfg), esp_task_wdt_add(core::ptr::null_mut()))
    };
    if reconfigured != ESP_OK {
        warn!("Watchdog: reconfigure returned {} (already configured?)", reconfigured);
    }
    if added != ESP_OK {
        warn!("Watchdog: task subscribe failed ({})", added);
        return false;
    }
    log::info!("Watchdog: armed, {} ms timeout", timeout_ms);
    true
}
