//! Drag session state machine: `Idle -> Dragging -> Idle`.
//!
//! `over` events rewrite the store continuously as speculative feedback.
//! Only `end` produces a remote effect, and only when the resolved status
//! differs from the one captured at `start`.
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::model::{JobId, JobStatus};
use crate::store::JobStore;

/// What the pointer is over: a whole column or another card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    Column(JobStatus),
    Job(JobId),
}

impl FromStr for DropTarget {
    type Err = String;

    /// Column identifiers are status names; anything numeric is a job id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(status) = s.parse::<JobStatus>() {
            return Ok(DropTarget::Column(status));
        }
        s.trim()
            .parse::<JobId>()
            .map(DropTarget::Job)
            .map_err(|_| format!("not a column or job id: {s}"))
    }
}

impl fmt::Display for DropTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropTarget::Column(status) => write!(f, "{status}"),
            DropTarget::Job(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragEvent {
    Start { active: JobId },
    Over { active: JobId, over: Option<DropTarget> },
    End { active: JobId, over: Option<DropTarget> },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging { active: JobId, origin: JobStatus },
}

/// Status change to hand to the mutation coordinator when a drop lands in
/// a different column than the one the drag started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub id: JobId,
    pub status: JobStatus,
}

#[derive(Debug, Default)]
pub struct DragSession {
    state: DragState,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn start(&mut self, store: &JobStore, active: JobId) {
        match store.get(active) {
            Some(job) => {
                debug!(id = active, origin = %job.status, "drag started");
                self.state = DragState::Dragging {
                    active,
                    origin: job.status,
                };
            }
            None => debug!(id = active, "drag start on unknown job ignored"),
        }
    }

    /// Apply speculative feedback for the pointer hovering `over`.
    /// Returns true if the store changed.
    pub fn over(&mut self, store: &mut JobStore, active: JobId, over: Option<DropTarget>) -> bool {
        let Some(target) = over else {
            return false;
        };
        if target == DropTarget::Job(active) {
            return false;
        }
        let Some(current) = store.get(active).map(|job| job.status) else {
            return false;
        };

        match target {
            DropTarget::Column(status) => {
                if current == status {
                    return false;
                }
                store.set_status(active, status)
            }
            DropTarget::Job(over_id) => {
                let Some(over_status) = store.get(over_id).map(|job| job.status) else {
                    return false;
                };
                let (Some(from), Some(to)) = (store.position(active), store.position(over_id))
                else {
                    return false;
                };
                if current != over_status {
                    store.set_status(active, over_status);
                }
                store.move_item(from, to);
                true
            }
        }
    }

    /// Finish the gesture. Session memory is cleared whatever happens.
    pub fn end(
        &mut self,
        store: &JobStore,
        active: JobId,
        over: Option<DropTarget>,
    ) -> Option<StatusChange> {
        let state = std::mem::take(&mut self.state);
        let target = over?;

        let resolved = match target {
            DropTarget::Column(status) => status,
            DropTarget::Job(over_id) => store.get(over_id)?.status,
        };

        match state {
            DragState::Dragging {
                active: dragged,
                origin,
            } if dragged == active => {
                if resolved == origin {
                    debug!(id = active, status = %resolved, "dropped back in origin column");
                    None
                } else {
                    Some(StatusChange {
                        id: active,
                        status: resolved,
                    })
                }
            }
            _ => {
                debug!(id = active, "drag end without a matching start ignored");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::job;
    use JobStatus::*;

    fn store_of(jobs: &[(JobId, JobStatus)]) -> JobStore {
        let mut store = JobStore::new();
        store.replace_all(jobs.iter().map(|&(id, status)| job(id, status)).collect());
        store
    }

    fn layout(store: &JobStore) -> Vec<(JobId, JobStatus)> {
        store.jobs().iter().map(|j| (j.id, j.status)).collect()
    }

    #[test]
    fn drop_target_parses_columns_and_ids() {
        assert_eq!("OFFER".parse::<DropTarget>(), Ok(DropTarget::Column(Offer)));
        assert_eq!("12".parse::<DropTarget>(), Ok(DropTarget::Job(12)));
        assert!("nowhere".parse::<DropTarget>().is_err());
    }

    #[test]
    fn over_column_rewrites_status_in_place() {
        let mut store = store_of(&[(1, Applied), (2, Interviewing)]);
        let mut drag = DragSession::new();
        drag.start(&store, 1);

        assert!(drag.over(&mut store, 1, Some(DropTarget::Column(Interviewing))));
        assert_eq!(layout(&store), vec![(1, Interviewing), (2, Interviewing)]);

        // already there
        assert!(!drag.over(&mut store, 1, Some(DropTarget::Column(Interviewing))));
    }

    #[test]
    fn over_card_in_other_column_adopts_status_and_position() {
        let mut store = store_of(&[(1, Applied), (2, Applied), (3, Offer), (4, Offer)]);
        let mut drag = DragSession::new();
        drag.start(&store, 1);

        assert!(drag.over(&mut store, 1, Some(DropTarget::Job(4))));
        assert_eq!(
            layout(&store),
            vec![(2, Applied), (3, Offer), (4, Offer), (1, Offer)]
        );
    }

    #[test]
    fn over_card_in_same_column_is_pure_reorder() {
        let mut store = store_of(&[(1, Applied), (2, Offer), (3, Applied), (4, Applied)]);
        let mut drag = DragSession::new();
        drag.start(&store, 4);

        assert!(drag.over(&mut store, 4, Some(DropTarget::Job(1))));
        assert_eq!(
            layout(&store),
            vec![(4, Applied), (1, Applied), (2, Offer), (3, Applied)]
        );
    }

    #[test]
    fn over_ignores_self_unknown_and_missing_targets() {
        let mut store = store_of(&[(1, Applied), (2, Offer)]);
        let mut drag = DragSession::new();
        let before = layout(&store);

        assert!(!drag.over(&mut store, 1, Some(DropTarget::Job(1))));
        assert!(!drag.over(&mut store, 9, Some(DropTarget::Column(Offer))));
        assert!(!drag.over(&mut store, 1, Some(DropTarget::Job(9))));
        assert!(!drag.over(&mut store, 1, None));
        assert_eq!(layout(&store), before);
    }

    #[test]
    fn end_reports_change_only_when_status_differs_from_origin() {
        let mut store = store_of(&[(1, Applied), (2, Interviewing)]);
        let mut drag = DragSession::new();

        drag.start(&store, 1);
        drag.over(&mut store, 1, Some(DropTarget::Column(Interviewing)));
        assert_eq!(
            drag.end(&store, 1, Some(DropTarget::Column(Interviewing))),
            Some(StatusChange {
                id: 1,
                status: Interviewing
            })
        );
        assert_eq!(drag.state(), DragState::Idle);
    }

    #[test]
    fn dragging_out_and_back_reports_nothing() {
        let mut store = store_of(&[(1, Applied), (2, Interviewing), (3, Applied)]);
        let mut drag = DragSession::new();

        drag.start(&store, 1);
        drag.over(&mut store, 1, Some(DropTarget::Job(2)));
        assert_eq!(store.get(1).unwrap().status, Interviewing);
        drag.over(&mut store, 1, Some(DropTarget::Job(3)));
        assert_eq!(store.get(1).unwrap().status, Applied);

        assert_eq!(drag.end(&store, 1, Some(DropTarget::Job(3))), None);
        assert_eq!(drag.state(), DragState::Idle);
    }

    #[test]
    fn end_without_target_or_start_clears_session() {
        let store = store_of(&[(1, Applied)]);
        let mut drag = DragSession::new();

        drag.start(&store, 1);
        assert_eq!(drag.end(&store, 1, None), None);
        assert_eq!(drag.state(), DragState::Idle);

        // start on an unknown job leaves the machine idle
        drag.start(&store, 42);
        assert_eq!(drag.state(), DragState::Idle);
        assert_eq!(drag.end(&store, 1, Some(DropTarget::Column(Offer))), None);
    }
}
