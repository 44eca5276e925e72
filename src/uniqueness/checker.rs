//! Debounced uniqueness checks with per-field generation tokens
//!
//! Every edit of an identity field bumps that field's generation. A check
//! carries the generation it was issued under; when its answer comes back it
//! is only accepted if the field is still at that generation. Answers are
//! never cancelled in flight, they are simply dropped when stale.
//!
//! Timers and network calls run as tokio tasks and report back through a
//! channel. The owning session drains that channel from its event loop
//! ([`UniquenessChecker::drain`]) or waits on it ([`UniquenessChecker::settle`]).
//!
//! An armed window is fired exactly once: the expiring timer and an early
//! [`UniquenessChecker::flush`] or [`UniquenessChecker::fire`] race for the
//! same per-field claim, and only the winner calls the service.

use crate::forms::FieldKey;
use crate::services::{CheckResponse, UniquenessCheckService};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// UI-facing status of one identity field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckStatus {
    /// Generation of the most recent edit
    pub generation: u64,
    /// Debounce window armed, call not yet issued
    pub pending: bool,
    /// A call for the current generation is in flight
    pub checking: bool,
    /// A definitive answer arrived since the last edit
    pub checked: bool,
    pub checked_at: Option<DateTime<Utc>>,
}

impl CheckStatus {
    /// Whether a spinner should be shown
    pub fn is_busy(&self) -> bool {
        self.pending || self.checking
    }
}

/// What the service said about a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Conflict { suggestions: Option<Vec<String>> },
    Available,
    /// Transport failure; never surfaced as a field error
    Unreachable(String),
}

/// Accepted (non-stale) answer for a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub field: FieldKey,
    pub value: String,
    pub generation: u64,
    pub verdict: Verdict,
}

#[derive(Debug)]
enum CheckEvent {
    Started {
        field: FieldKey,
        generation: u64,
    },
    Resolved {
        field: FieldKey,
        generation: u64,
        value: String,
        result: Result<CheckResponse, String>,
    },
}

#[derive(Debug, Default)]
struct FieldSlot {
    status: CheckStatus,
    timer: Option<JoinHandle<()>>,
    pending_value: Option<String>,
    /// Highest generation whose call has been issued
    claimed: Arc<AtomicU64>,
}

/// Take the right to issue the call for `generation`; `false` if someone did
fn claim(claimed: &AtomicU64, generation: u64) -> bool {
    claimed.fetch_max(generation, Ordering::SeqCst) < generation
}

impl FieldSlot {
    /// Status as seen right now, counting a timer that already fired but
    /// whose `Started` event has not been drained yet
    fn view(&self) -> CheckStatus {
        let mut status = self.status.clone();
        if status.pending && self.claimed.load(Ordering::SeqCst) >= status.generation {
            status.pending = false;
            status.checking = true;
        }
        status
    }

    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.pending_value = None;
        self.status.pending = false;
    }
}

/// Coordinates debounced checks for every identity field of one session
pub struct UniquenessChecker {
    runtime: Handle,
    service: Arc<dyn UniquenessCheckService>,
    debounce: Duration,
    slots: HashMap<FieldKey, FieldSlot>,
    events_tx: mpsc::UnboundedSender<CheckEvent>,
    events_rx: mpsc::UnboundedReceiver<CheckEvent>,
}

impl UniquenessChecker {
    /// Timers and calls are spawned on the tokio runtime current at
    /// construction, so later edits may come from any thread.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new(service: Arc<dyn UniquenessCheckService>, debounce: Duration) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            runtime: Handle::current(),
            service,
            debounce,
            slots: HashMap::new(),
            events_tx,
            events_rx,
        }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn status(&self, field: &FieldKey) -> CheckStatus {
        self.slots
            .get(field)
            .map(FieldSlot::view)
            .unwrap_or_default()
    }

    pub fn generation(&self, field: &FieldKey) -> u64 {
        self.slots
            .get(field)
            .map(|slot| slot.status.generation)
            .unwrap_or(0)
    }

    /// True while any field waits on its debounce window or a call
    pub fn is_busy(&self) -> bool {
        self.slots.values().any(|slot| slot.view().is_busy())
    }

    fn bump(&mut self, field: &FieldKey) -> u64 {
        let slot = self.slots.entry(field.clone()).or_default();
        slot.disarm();
        slot.status.generation += 1;
        slot.status.checking = false;
        slot.status.checked = false;
        slot.status.generation
    }

    /// Record an edit that must not be checked (empty or malformed value).
    /// In-flight answers for earlier values become stale.
    pub fn invalidate(&mut self, field: &FieldKey) -> u64 {
        self.bump(field)
    }

    /// Record an edit and (re)arm the trailing debounce window
    pub fn schedule(&mut self, field: &FieldKey, value: &str) -> u64 {
        let generation = self.bump(field);
        let service = Arc::clone(&self.service);
        let tx = self.events_tx.clone();
        let delay = self.debounce;
        let key = field.clone();
        let owned = value.to_string();
        let runtime = self.runtime.clone();

        tracing::debug!(field = %field, generation, "uniqueness check scheduled");

        let Some(slot) = self.slots.get_mut(field) else {
            return generation;
        };
        let claimed = Arc::clone(&slot.claimed);
        let timer = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if !claim(&claimed, generation) {
                return;
            }
            let _ = tx.send(CheckEvent::Started {
                field: key.clone(),
                generation,
            });
            // Detached so a later edit that aborts the timer cannot cancel the call
            runtime.spawn(run_check(service, tx, key, generation, owned));
        });

        slot.timer = Some(timer);
        slot.pending_value = Some(value.to_string());
        slot.status.pending = true;
        generation
    }

    /// Issue a check right away under a fresh generation (blur on a field
    /// with no armed window)
    pub fn check_now(&mut self, field: &FieldKey, value: &str) -> u64 {
        let generation = self.bump(field);
        if let Some(slot) = self.slots.get(field) {
            claim(&slot.claimed, generation);
        }
        self.issue(field, generation, value.to_string());
        generation
    }

    /// Fire the armed debounce window of `field` now. The call keeps the
    /// window's generation; if the timer already fired, nothing new is sent.
    /// Returns `false` when no window was armed.
    pub fn fire(&mut self, field: &FieldKey) -> bool {
        let Some(slot) = self.slots.get_mut(field) else {
            return false;
        };
        let Some(value) = slot.pending_value.clone() else {
            return false;
        };
        let generation = slot.status.generation;
        let won = claim(&slot.claimed, generation);
        slot.disarm();
        slot.status.checking = true;
        if won {
            self.issue(field, generation, value);
        } else {
            tracing::debug!(field = %field, generation, "debounce window already fired");
        }
        true
    }

    /// Fire every armed debounce window immediately
    pub fn flush(&mut self) {
        let armed: Vec<FieldKey> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.pending_value.is_some())
            .map(|(key, _)| key.clone())
            .collect();

        for field in armed {
            self.fire(&field);
        }
    }

    fn issue(&mut self, field: &FieldKey, generation: u64, value: String) {
        if let Some(slot) = self.slots.get_mut(field) {
            slot.status.checking = true;
        }
        tracing::debug!(field = %field, generation, "uniqueness check issued");
        self.runtime.spawn(run_check(
            Arc::clone(&self.service),
            self.events_tx.clone(),
            field.clone(),
            generation,
            value,
        ));
    }

    /// Apply every event already delivered, without waiting
    pub fn drain(&mut self) -> Vec<Resolution> {
        let mut resolutions = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            if let Some(resolution) = self.handle(event) {
                resolutions.push(resolution);
            }
        }
        resolutions
    }

    /// Wait until no field is pending or checking
    pub async fn settle(&mut self) -> Vec<Resolution> {
        let mut resolutions = self.drain();
        while self.is_busy() {
            let Some(event) = self.events_rx.recv().await else {
                break;
            };
            if let Some(resolution) = self.handle(event) {
                resolutions.push(resolution);
            }
        }
        resolutions
    }

    fn handle(&mut self, event: CheckEvent) -> Option<Resolution> {
        match event {
            CheckEvent::Started { field, generation } => {
                if let Some(slot) = self.slots.get_mut(&field) {
                    if slot.status.generation == generation {
                        slot.timer = None;
                        slot.pending_value = None;
                        slot.status.pending = false;
                        slot.status.checking = true;
                    }
                }
                None
            }
            CheckEvent::Resolved {
                field,
                generation,
                value,
                result,
            } => {
                let slot = self.slots.get_mut(&field)?;
                if slot.status.generation != generation {
                    tracing::debug!(
                        field = %field,
                        generation,
                        current = slot.status.generation,
                        "discarding stale uniqueness answer"
                    );
                    return None;
                }
                slot.status.checking = false;
                let verdict = match result {
                    Ok(response) => {
                        slot.status.checked = true;
                        slot.status.checked_at = Some(Utc::now());
                        if response.exists {
                            Verdict::Conflict {
                                suggestions: response.suggestions,
                            }
                        } else {
                            Verdict::Available
                        }
                    }
                    Err(message) => {
                        tracing::warn!(field = %field, error = %message, "uniqueness check failed");
                        Verdict::Unreachable(message)
                    }
                };
                Some(Resolution {
                    field,
                    value,
                    generation,
                    verdict,
                })
            }
        }
    }
}

impl Drop for UniquenessChecker {
    fn drop(&mut self) {
        for slot in self.slots.values_mut() {
            slot.disarm();
        }
    }
}

async fn run_check(
    service: Arc<dyn UniquenessCheckService>,
    tx: mpsc::UnboundedSender<CheckEvent>,
    field: FieldKey,
    generation: u64,
    value: String,
) {
    let result = service
        .check(field.as_str(), &value)
        .await
        .map_err(|e| e.to_string());
    let _ = tx.send(CheckEvent::Resolved {
        field,
        generation,
        value,
        result,
    });
}
