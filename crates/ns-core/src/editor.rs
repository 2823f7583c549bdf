//! Editing session for a single night.
//!
//! The editor holds the night currently shown to the user. Accepted edits are
//! applied immediately as an optimistic overlay on top of the last
//! authoritative group from the store. Boundary edits are persisted through
//! the debounced [`PersistenceScheduler`] and handed to the store in batches,
//! one batch per flush, that land or fail as a whole. Splits, merges and
//! deletions are written straight away and rolled back if the store refuses
//! them. Once the
//! host reloads the night from the store, [`NightEditor::replace_authoritative`]
//! discards the overlay.

use chrono::{DateTime, TimeZone, Utc};

use crate::anomaly::{self, AnomalyFix};
use crate::boundary::{self, BoundaryEdit, BoundaryKey, BoundaryRefs, BoundaryWrite, RejectReason};
use crate::entry::SleepEntry;
use crate::error::{EditError, StoreError};
use crate::night::NightGroup;
use crate::scheduler::{DueWrite, PersistenceScheduler, SchedulerConfig};
use crate::split_merge::{plan_merge, plan_split};
use crate::store::SleepStore;
use crate::types::EntryId;
use crate::wake::{self, WakePhase};

/// What the editor is currently showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntriesView {
    /// Exactly what the store last returned.
    Authoritative(NightGroup),
    /// Local changes not yet confirmed by a reload, on top of `baseline`.
    Optimistic {
        overlay: NightGroup,
        baseline: NightGroup,
    },
}

impl EntriesView {
    /// The group to render.
    pub const fn current(&self) -> &NightGroup {
        match self {
            Self::Authoritative(group) | Self::Optimistic { overlay: group, .. } => group,
        }
    }

    /// The last group the store confirmed.
    pub const fn baseline(&self) -> &NightGroup {
        match self {
            Self::Authoritative(group) | Self::Optimistic { baseline: group, .. } => group,
        }
    }

    pub const fn is_optimistic(&self) -> bool {
        matches!(self, Self::Optimistic { .. })
    }
}

/// Result of a boundary edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Accepted,
    Rejected(RejectReason),
}

impl EditOutcome {
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Outcome of performing scheduled boundary writes.
#[derive(Debug, Default)]
pub struct FlushReport {
    pub written: Vec<BoundaryKey>,
    /// Keys of a batch the store refused. None of them were kept.
    pub failed: Vec<BoundaryKey>,
    pub error: Option<StoreError>,
}

impl FlushReport {
    pub fn is_empty(&self) -> bool {
        self.written.is_empty() && self.failed.is_empty()
    }

    pub const fn has_failures(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug)]
pub struct NightEditor {
    view: EntriesView,
    refs: BoundaryRefs,
    scheduler: PersistenceScheduler<BoundaryWrite>,
}

impl NightEditor {
    pub fn new(group: NightGroup, config: SchedulerConfig) -> Self {
        Self {
            view: EntriesView::Authoritative(group),
            refs: BoundaryRefs::default(),
            scheduler: PersistenceScheduler::new(config),
        }
    }

    pub const fn view(&self) -> &EntriesView {
        &self.view
    }

    /// The night as currently shown, overlay included.
    pub const fn group(&self) -> &NightGroup {
        self.view.current()
    }

    pub fn entries(&self) -> &[SleepEntry] {
        self.group().entries()
    }

    pub fn wake_phases(&self) -> Vec<WakePhase> {
        wake::wake_phases(self.entries())
    }

    pub fn total_wake_seconds(&self) -> i64 {
        wake::total_wake_seconds(&self.wake_phases())
    }

    pub fn is_anomalous(&self) -> bool {
        anomaly::is_anomalous(self.group().start(), self.group().end())
    }

    /// A proposed end correction when the night is anomalous.
    pub fn anomaly_fix<Tz: TimeZone>(&self, tz: &Tz) -> Option<AnomalyFix> {
        anomaly::detect(self.group(), tz)
    }

    /// Whether a boundary write is in flight or waiting to be sent.
    ///
    /// Hosts should disable destructive actions while this is true.
    pub fn is_saving(&self) -> bool {
        self.scheduler.is_busy() || self.scheduler.has_pending()
    }

    /// Earliest instant at which [`flush`](Self::flush) has work to do.
    pub fn next_flush_at(&self) -> Option<DateTime<Utc>> {
        self.scheduler.next_deadline()
    }

    pub const fn refs(&self) -> &BoundaryRefs {
        &self.refs
    }

    /// Replaces the shown night with freshly loaded store data.
    ///
    /// Drops any optimistic overlay and every cached boundary reference.
    /// Scheduled writes are kept so the user's last value still lands.
    pub fn replace_authoritative(&mut self, group: NightGroup) {
        self.view = EntriesView::Authoritative(group);
        self.refs.clear();
    }

    fn show_overlay(&mut self, entries: Vec<SleepEntry>, now: DateTime<Utc>) {
        let baseline = self.view.baseline().clone();
        // An empty list never reaches here: every edit keeps at least one entry.
        if let Some(overlay) = baseline.with_entries(entries, now) {
            self.view = EntriesView::Optimistic { overlay, baseline };
        }
    }

    fn apply(&mut self, result: Result<BoundaryEdit, RejectReason>, now: DateTime<Utc>) -> EditOutcome {
        match result {
            Ok(edit) => {
                for write in edit.writes {
                    tracing::debug!(key = %write.key, at = %write.at, "boundary edit accepted");
                    self.refs.record(write.key.clone(), write.at);
                    self.scheduler.schedule(write.key.clone(), write, now);
                }
                self.show_overlay(edit.entries, now);
                EditOutcome::Accepted
            }
            Err(reason) => {
                tracing::debug!(%reason, "boundary edit rejected");
                EditOutcome::Rejected(reason)
            }
        }
    }

    pub fn move_night_start(&mut self, candidate: DateTime<Utc>, now: DateTime<Utc>) -> EditOutcome {
        let result = boundary::move_night_start(self.entries(), &self.refs, candidate, now);
        self.apply(result, now)
    }

    pub fn move_night_end(&mut self, candidate: DateTime<Utc>, now: DateTime<Utc>) -> EditOutcome {
        let result = boundary::move_night_end(self.entries(), &self.refs, candidate);
        self.apply(result, now)
    }

    pub fn move_wake_start(
        &mut self,
        phase: &WakePhase,
        candidate: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> EditOutcome {
        let result = boundary::move_wake_start(self.entries(), &self.refs, phase, candidate);
        self.apply(result, now)
    }

    pub fn move_wake_end(
        &mut self,
        phase: &WakePhase,
        candidate: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> EditOutcome {
        let result = boundary::move_wake_end(self.entries(), &self.refs, phase, candidate);
        self.apply(result, now)
    }

    /// Applies a user-confirmed anomaly fix through the night-end path.
    pub fn confirm_anomaly_fix(&mut self, fix: &AnomalyFix, now: DateTime<Utc>) -> EditOutcome {
        tracing::info!(proposed_end = %fix.proposed_end, "applying anomaly fix");
        self.move_night_end(fix.proposed_end, now)
    }

    /// Performs every scheduled write whose debounce has elapsed.
    pub fn flush<S: SleepStore>(&mut self, now: DateTime<Utc>, store: &mut S) -> FlushReport {
        let due = self.scheduler.poll(now);
        self.perform(due, store)
    }

    /// Performs every scheduled write immediately. Used by hosts that exit
    /// right after an edit.
    pub fn commit_pending<S: SleepStore>(&mut self, store: &mut S) -> FlushReport {
        let due = self.scheduler.drain();
        self.perform(due, store)
    }

    fn perform<S: SleepStore>(&mut self, mut due: Vec<DueWrite<BoundaryWrite>>, store: &mut S) -> FlushReport {
        if due.is_empty() {
            return FlushReport::default();
        }
        // An entry's writes travel together so the store only sees its final interval.
        let entry_ids: Vec<EntryId> = due.iter().map(|write| write.value.entry_id.clone()).collect();
        due.extend(
            self.scheduler
                .drain_where(|write| entry_ids.contains(&write.entry_id)),
        );

        let (keys, writes): (Vec<BoundaryKey>, Vec<BoundaryWrite>) = due
            .into_iter()
            .map(|DueWrite { key, value }| (key, value))
            .unzip();
        let result = store.adjust_boundaries(&writes);
        for key in &keys {
            self.scheduler.complete(key);
        }
        match result {
            Ok(()) => {
                tracing::debug!(count = keys.len(), "boundary writes stored");
                FlushReport {
                    written: keys,
                    ..FlushReport::default()
                }
            }
            Err(err) => {
                tracing::warn!(count = keys.len(), error = %err, "boundary writes failed, rolling back");
                self.rollback();
                FlushReport {
                    written: Vec::new(),
                    failed: keys,
                    error: Some(Box::new(err)),
                }
            }
        }
    }

    /// Returns to the last confirmed group and forgets local edits.
    fn rollback(&mut self) {
        self.view = EntriesView::Authoritative(self.view.baseline().clone());
        self.refs.clear();
        self.scheduler.cancel_all();
    }

    /// Writes every pending boundary edit so a structural edit starts from
    /// what the store holds.
    fn settle<S: SleepStore>(&mut self, store: &mut S) -> Result<(), EditError> {
        match self.commit_pending(store).error {
            Some(err) => Err(EditError::Store(err)),
            None => Ok(()),
        }
    }

    /// Makes the shown night the rollback target once the store confirmed it.
    fn confirm_overlay(&mut self) {
        let confirmed = self.view.current().clone();
        self.view = EntriesView::Optimistic {
            overlay: confirmed.clone(),
            baseline: confirmed,
        };
    }

    /// Inserts a wake phase of `wake_minutes` at `at`.
    ///
    /// Pending boundary writes go out first. The split is shown immediately
    /// and rolled back if the store fails.
    pub fn split<S: SleepStore>(
        &mut self,
        at: DateTime<Utc>,
        wake_minutes: u32,
        now: DateTime<Utc>,
        store: &mut S,
    ) -> Result<(), EditError> {
        self.settle(store)?;
        let plan = plan_split(self.entries(), at, wake_minutes)?;
        let before = self.view.clone();
        self.show_overlay(plan.entries, now);

        if let Err(err) = store.split_entry(&plan.target, at, wake_minutes) {
            tracing::warn!(error = %err, "split failed, rolling back");
            self.view = before;
            return Err(EditError::Store(Box::new(err)));
        }
        self.confirm_overlay();
        tracing::info!(%at, wake_minutes, "split entry");
        Ok(())
    }

    /// Removes `phase` by merging the entries around it.
    pub fn merge<S: SleepStore>(
        &mut self,
        phase: &WakePhase,
        now: DateTime<Utc>,
        store: &mut S,
    ) -> Result<(), EditError> {
        self.settle(store)?;
        let plan = plan_merge(self.entries(), phase)?;
        let before = self.view.clone();
        self.show_overlay(plan.entries, now);

        if let Err(err) = store.merge_entries(&plan.prev, &plan.next) {
            tracing::warn!(error = %err, "merge failed, rolling back");
            self.view = before;
            return Err(EditError::Store(Box::new(err)));
        }
        self.confirm_overlay();
        tracing::info!(start = %phase.start, end = %phase.end, "merged entries");
        Ok(())
    }

    /// Deletes every saved entry of the night.
    ///
    /// Unsaved optimistic entries are skipped. Returns the number of entries
    /// deleted. On success the session is torn down and should be dropped.
    pub fn delete_night<S: SleepStore>(&mut self, store: &mut S) -> Result<usize, EditError> {
        let ids: Vec<EntryId> = self
            .entries()
            .iter()
            .filter_map(|entry| entry.id.clone())
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }
        store
            .delete_entries(&ids)
            .map_err(|err| EditError::Store(Box::new(err)))?;
        tracing::info!(count = ids.len(), "deleted night");
        self.teardown();
        Ok(ids.len())
    }

    fn teardown(&mut self) {
        self.scheduler.cancel_all();
        self.refs.clear();
    }

    /// Ends the session. Pending timers are dropped; writes already handed to
    /// the store are not awaited.
    pub fn close(mut self) {
        self.teardown();
    }
}
