use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::error::PitrResult;
use crate::schema::SchemaState;
use crate::types::{SchemaEvent, TimeWindow, Tso};

/// Replays schema events against the merged change stream.
///
/// Events completing before the window start form the base schema and are
/// applied at construction. The rest wait, keyed by completion timestamp,
/// until [`SchemaReplayer::advance_to`] is called with a commit timestamp
/// at or past them. Applying a DDL late relative to a row that depends on
/// the new schema would be a correctness bug; the advance-before-interpret
/// contract exists to prevent exactly that.
#[derive(Debug)]
pub struct SchemaReplayer {
    state: SchemaState,
    pending: BTreeMap<Tso, SchemaEvent>,
    applied_in_window: u64,
}

impl SchemaReplayer {
    /// Builds a replayer from an ordered event history.
    ///
    /// `events` must be in authoritative history order (ascending version).
    /// Everything finishing before `window.start_ts` is applied immediately
    /// as the base schema.
    pub fn from_events(events: Vec<SchemaEvent>, window: TimeWindow) -> PitrResult<Self> {
        let mut replayer = Self {
            state: SchemaState::new(),
            pending: BTreeMap::new(),
            applied_in_window: 0,
        };

        let mut base_applied = 0u64;
        for event in events {
            if event.finished_ts < window.start_ts {
                replayer.state.apply(&event)?;
                base_applied += 1;
            } else {
                replayer.pending.entry(event.finished_ts).or_insert(event);
            }
        }

        info!(
            base_applied,
            pending = replayer.pending.len(),
            base_version = replayer.state.current_version(),
            "schema replayer initialized"
        );

        Ok(replayer)
    }

    /// Enqueues a schema event discovered in the binlog stream itself.
    ///
    /// History events loaded at construction win over binlog copies of the
    /// same completion timestamp; duplicates are dropped here.
    pub fn enqueue(&mut self, event: SchemaEvent) {
        self.pending.entry(event.finished_ts).or_insert(event);
    }

    /// Applies every pending event with `finished_ts <= commit_ts`, in
    /// ascending completion order, before a change at `commit_ts` is
    /// interpreted.
    pub fn advance_to(&mut self, commit_ts: Tso) -> PitrResult<()> {
        while let Some(entry) = self.pending.first_entry() {
            if *entry.key() > commit_ts {
                break;
            }
            let mut event = entry.remove();
            if event.version == 0 {
                // Binlog-sourced events carry no version of their own.
                event.version = self.state.current_version() + 1;
            }

            debug!(
                version = event.version,
                finished_ts = event.finished_ts,
                ddl = %event.ddl,
                "applying schema event"
            );
            self.state.apply(&event)?;
            self.applied_in_window += 1;
        }

        Ok(())
    }

    /// The current schema catalog.
    pub fn state(&self) -> &SchemaState {
        &self.state
    }

    /// Number of events applied inside the window so far.
    pub fn applied_in_window(&self) -> u64 {
        self.applied_in_window
    }
}
