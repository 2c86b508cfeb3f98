//! # Ordered stop history.
//!
//! Every stop of a role process is appended here by the shutdown cascade,
//! across runs. The history is append-only; `seq` is the position in it.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::roles::Role;

/// One entry of the stop history.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StopRecord {
    /// Run the stopped process belonged to (1-based, +1 per restart).
    pub generation: u64,
    /// Stopped role.
    pub role: Role,
    /// Position in the history (0-based, strictly increasing).
    pub seq: u64,
}

/// Append-only, mutex-guarded stop history.
#[derive(Default)]
pub(crate) struct OrderedStops {
    records: Mutex<Vec<StopRecord>>,
}

impl OrderedStops {
    fn records(&self) -> MutexGuard<'_, Vec<StopRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn record(&self, generation: u64, role: Role) -> StopRecord {
        let mut records = self.records();
        let record = StopRecord {
            generation,
            role,
            seq: records.len() as u64,
        };
        records.push(record);
        record
    }

    pub(crate) fn snapshot(&self) -> Vec<StopRecord> {
        self.records().clone()
    }

    pub(crate) fn roles(&self) -> Vec<Role> {
        self.records().iter().map(|r| r.role).collect()
    }
}
