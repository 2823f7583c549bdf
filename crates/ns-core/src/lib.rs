//! Core domain logic for the night sleep tracker.
//!
//! This crate contains the in-memory model behind the night editor:
//! - Night classification: bucketing sleep entries into nights anchored at 17:30
//! - Wake phases: gaps between consecutive entries of a night
//! - Boundary reconciliation: validating and applying edge drags
//! - Split/merge: inserting and removing wake phases
//! - Anomaly detection: spotting nights left open for days and proposing a fix
//! - Persistence scheduling: debouncing writes per edited edge

mod anomaly;
mod boundary;
mod editor;
mod entry;
mod error;
mod night;
mod scheduler;
mod split_merge;
mod store;
pub mod types;
mod wake;

pub use anomaly::{ANOMALY_THRESHOLD_MINUTES, AnomalyFix, detect, is_anomalous, propose_end_fix};
pub use boundary::{
    BoundaryEdit, BoundaryKey, BoundaryRefs, BoundaryWrite, RejectReason, move_night_end,
    move_night_start, move_wake_end, move_wake_start,
};
pub use editor::{EditOutcome, EntriesView, FlushReport, NightEditor};
pub use entry::{SleepEntry, locate_entry, truncate_to_minute};
pub use error::{EditError, StoreError};
pub use night::{
    NIGHT_ANCHOR_HOUR, NIGHT_ANCHOR_MINUTE, NIGHT_WINDOW_MINUTES, NightGroup, anchor_for_date,
    group_nights, minutes_from_anchor, night_anchor, night_window,
};
pub use scheduler::{DebounceState, DueWrite, PersistenceScheduler, SchedulerConfig};
pub use split_merge::{MergePlan, SplitPlan, plan_merge, plan_split};
pub use store::SleepStore;
pub use types::{BoundaryField, EntryId, ValidationError};
pub use wake::{WakePhase, total_wake_seconds, wake_phases};
