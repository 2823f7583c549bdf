//! Debounced persistence of boundary edits.
//!
//! Dragging a boundary fires many edits in quick succession. Each edit is
//! scheduled under its [`BoundaryKey`]; a newer edit for the same key replaces
//! the pending value and restarts the debounce window. When the window
//! elapses while a previous write for that key is still in flight, the write
//! is deferred by a retry interval instead of being dropped or raced.
//!
//! The scheduler owns no timers. The host passes `now` into every call and
//! uses [`PersistenceScheduler::next_deadline`] to decide when to poll again.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::boundary::BoundaryKey;

/// Configuration for write scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Quiet period after the last edit before a key is written.
    /// Default: 250.
    pub debounce_ms: i64,

    /// Delay applied when a key's debounce elapses while its previous write
    /// is still in flight. Default: 300.
    pub busy_retry_ms: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 250,
            busy_retry_ms: 300,
        }
    }
}

/// Timer state of one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebounceState<V> {
    /// Nothing waiting to be written.
    Idle,
    /// Waiting for the debounce window to close.
    Pending { value: V, due: DateTime<Utc> },
    /// Deferred because a write for the key was in flight.
    Retrying { value: V, due: DateTime<Utc> },
}

#[derive(Debug)]
struct Slot<V> {
    state: DebounceState<V>,
    in_flight: bool,
    /// Order of the most recent schedule call, used to emit writes in the
    /// order they were made.
    seq: u64,
}

/// A write whose debounce has elapsed. The host must perform it and then
/// call [`PersistenceScheduler::complete`] with the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueWrite<V> {
    pub key: BoundaryKey,
    pub value: V,
}

#[derive(Debug)]
pub struct PersistenceScheduler<V> {
    config: SchedulerConfig,
    slots: HashMap<BoundaryKey, Slot<V>>,
    next_seq: u64,
}

impl<V> PersistenceScheduler<V> {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            slots: HashMap::new(),
            next_seq: 0,
        }
    }

    pub const fn config(&self) -> SchedulerConfig {
        self.config
    }

    /// Schedules `value` for `key`, replacing any value still waiting.
    pub fn schedule(&mut self, key: BoundaryKey, value: V, now: DateTime<Utc>) {
        let due = now + Duration::milliseconds(self.config.debounce_ms);
        let seq = self.next_seq;
        self.next_seq += 1;
        let slot = self.slots.entry(key).or_insert_with(|| Slot {
            state: DebounceState::Idle,
            in_flight: false,
            seq,
        });
        slot.state = DebounceState::Pending { value, due };
        slot.seq = seq;
    }

    /// Returns every write whose debounce has elapsed at `now`.
    ///
    /// Keys with a write still in flight are deferred by the retry interval
    /// and not returned.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Vec<DueWrite<V>> {
        let retry = Duration::milliseconds(self.config.busy_retry_ms);
        let mut due_writes = Vec::new();
        for (key, slot) in &mut self.slots {
            let is_due = match &slot.state {
                DebounceState::Idle => false,
                DebounceState::Pending { due, .. } | DebounceState::Retrying { due, .. } => {
                    *due <= now
                }
            };
            if !is_due {
                continue;
            }
            let Some(value) = take_value(&mut slot.state) else {
                continue;
            };
            if slot.in_flight {
                tracing::debug!(%key, "write in flight, deferring");
                slot.state = DebounceState::Retrying {
                    value,
                    due: now + retry,
                };
                continue;
            }
            slot.in_flight = true;
            due_writes.push((slot.seq, DueWrite {
                key: key.clone(),
                value,
            }));
        }
        in_schedule_order(due_writes)
    }

    /// Returns every waiting write immediately, ignoring debounce deadlines.
    ///
    /// Keys with a write still in flight keep their value and are returned
    /// by a later poll.
    pub fn drain(&mut self) -> Vec<DueWrite<V>> {
        self.drain_where(|_| true)
    }

    /// Like [`drain`](Self::drain), but only for waiting values matching `pred`.
    pub fn drain_where(&mut self, pred: impl Fn(&V) -> bool) -> Vec<DueWrite<V>> {
        let mut writes = Vec::new();
        for (key, slot) in &mut self.slots {
            if slot.in_flight || !waiting_value(&slot.state).is_some_and(&pred) {
                continue;
            }
            if let Some(value) = take_value(&mut slot.state) {
                slot.in_flight = true;
                writes.push((slot.seq, DueWrite {
                    key: key.clone(),
                    value,
                }));
            }
        }
        in_schedule_order(writes)
    }

    /// Marks the in-flight write for `key` as finished.
    pub fn complete(&mut self, key: &BoundaryKey) {
        let remove = match self.slots.get_mut(key) {
            Some(slot) => {
                slot.in_flight = false;
                matches!(slot.state, DebounceState::Idle)
            }
            None => false,
        };
        if remove {
            self.slots.remove(key);
        }
    }

    /// Earliest instant at which [`poll`](Self::poll) will return or defer a write.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.slots
            .values()
            .filter_map(|slot| match &slot.state {
                DebounceState::Idle => None,
                DebounceState::Pending { due, .. } | DebounceState::Retrying { due, .. } => {
                    Some(*due)
                }
            })
            .min()
    }

    pub fn state(&self, key: &BoundaryKey) -> Option<&DebounceState<V>> {
        self.slots.get(key).map(|slot| &slot.state)
    }

    /// Whether any write is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.slots.values().any(|slot| slot.in_flight)
    }

    /// Whether any write is waiting for its debounce window.
    pub fn has_pending(&self) -> bool {
        self.slots
            .values()
            .any(|slot| !matches!(slot.state, DebounceState::Idle))
    }

    /// Drops every waiting write. Writes already in flight are forgotten and
    /// allowed to finish on their own.
    pub fn cancel_all(&mut self) {
        self.slots.clear();
    }
}

const fn waiting_value<V>(state: &DebounceState<V>) -> Option<&V> {
    match state {
        DebounceState::Pending { value, .. } | DebounceState::Retrying { value, .. } => Some(value),
        DebounceState::Idle => None,
    }
}

fn take_value<V>(state: &mut DebounceState<V>) -> Option<V> {
    match std::mem::replace(state, DebounceState::Idle) {
        DebounceState::Pending { value, .. } | DebounceState::Retrying { value, .. } => Some(value),
        DebounceState::Idle => None,
    }
}

fn in_schedule_order<V>(mut writes: Vec<(u64, DueWrite<V>)>) -> Vec<DueWrite<V>> {
    writes.sort_by_key(|(seq, _)| *seq);
    writes.into_iter().map(|(_, write)| write).collect()
}
