// ── Status poller ──
//
// One task per session. Requests a status, hands it to the controller for
// reconciliation, sleeps, repeats. A loop, never recursion, and never
// more than one status request outstanding.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use duetlink_api::StatusLevel;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::controller::Controller;

// ── Poll cycle ───────────────────────────────────────────────────────

/// Chooses the verbosity of each status request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollCycle {
    extended_counter: u32,
    extended_interval: u32,
}

impl PollCycle {
    pub fn new(extended_interval: u32) -> Self {
        Self {
            extended_counter: 0,
            extended_interval,
        }
    }

    /// Make the next request an extended one.
    pub fn prime(&mut self) {
        self.extended_counter = self.extended_interval;
    }

    pub fn reset(&mut self) {
        self.extended_counter = 0;
    }

    /// Level for the next request.
    ///
    /// Extended once the counter reaches the interval, or when the machine
    /// properties are on screen and either nothing is printing or at least
    /// one regular poll happened since the last extended one.
    pub fn next_level(&mut self, printing: bool, machine_page_visible: bool) -> StatusLevel {
        let due = self.extended_counter >= self.extended_interval;
        let wanted = machine_page_visible && (!printing || self.extended_counter > 1);
        if due || wanted {
            self.extended_counter = 0;
            StatusLevel::Extended
        } else {
            self.extended_counter += 1;
            if printing {
                StatusLevel::Print
            } else {
                StatusLevel::Default
            }
        }
    }
}

// ── Exclusivity gate ─────────────────────────────────────────────────

/// Admits one status poll at a time.
#[derive(Debug, Default)]
pub struct PollGate {
    busy: AtomicBool,
}

impl PollGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a permit, or `None` while another poll holds one.
    pub fn try_acquire(&self) -> Option<PollPermit<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PollPermit { gate: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct PollPermit<'a> {
    gate: &'a PollGate,
}

impl Drop for PollPermit<'_> {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::Release);
    }
}

// ── Poll loop ────────────────────────────────────────────────────────

/// What the loop does after a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PollOutcome {
    /// Sleep, then poll again.
    Continue,
    /// Recovery or a disconnect took over.
    Stop,
    /// Transport failure: the session has to be torn down.
    Failed(String),
}

/// Poll until cancelled or until a cycle says stop.
///
/// The request itself is not raced against `cancel`: a disconnect aborts it
/// through the client's in-flight registry, and recovery may cancel the
/// token from inside a cycle that still has work to finish.
pub(crate) async fn run(controller: Controller, interval: Duration, cancel: CancellationToken) {
    debug!(?interval, "poller started");

    while !cancel.is_cancelled() {
        match controller.poll_once().await {
            PollOutcome::Continue => {}
            PollOutcome::Stop => break,
            PollOutcome::Failed(reason) => {
                if !cancel.is_cancelled() {
                    controller.connection_lost(reason).await;
                }
                break;
            }
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(interval) => trace!("next poll"),
        }
    }

    debug!("poller stopped");
}
