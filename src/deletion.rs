//! Deferred deletes: a job leaves the store immediately, but the remote
//! delete is only issued once the grace period passes without an undo.
use std::collections::HashMap;
use std::time::Duration;

use crate::model::{Job, JobId};
use crate::timer::ScheduledTask;

/// Window during which a delete can still be undone.
pub const DELETE_GRACE: Duration = Duration::from_millis(3500);

/// Identifies one delete request. A timer only commits the request it was
/// armed for, never a later request for the same job.
pub type DeleteTicket = u64;

#[derive(Debug)]
pub struct PendingDeletion {
    pub job_id: JobId,
    pub ticket: DeleteTicket,
    pub snapshot: Job,
    timer: ScheduledTask,
}

#[derive(Debug, Default)]
pub struct DeleteScheduler {
    pending: HashMap<JobId, PendingDeletion>,
    next_ticket: DeleteTicket,
}

impl DeleteScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `snapshot` until its timer fires or it is cancelled. `arm`
    /// receives the ticket the timer must report back with. A second request
    /// for the same id replaces the first and cancels its timer.
    pub fn schedule<F>(&mut self, snapshot: Job, arm: F) -> DeleteTicket
    where
        F: FnOnce(DeleteTicket) -> ScheduledTask,
    {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let job_id = snapshot.id;
        let pending = PendingDeletion {
            job_id,
            ticket,
            snapshot,
            timer: arm(ticket),
        };
        if let Some(previous) = self.pending.insert(job_id, pending) {
            previous.timer.cancel();
        }
        ticket
    }

    /// Undo: stop the timer and hand back the removed job.
    pub fn cancel(&mut self, id: JobId) -> Option<Job> {
        let pending = self.pending.remove(&id)?;
        pending.timer.cancel();
        Some(pending.snapshot)
    }

    /// Timer fired: the deletion is due for commit. None if it was
    /// cancelled in the meantime, or if `ticket` belongs to an earlier
    /// request for the same job.
    pub fn take_due(&mut self, id: JobId, ticket: DeleteTicket) -> Option<PendingDeletion> {
        match self.pending.get(&id) {
            Some(pending) if pending.ticket == ticket => self.pending.remove(&id),
            _ => None,
        }
    }

    pub fn is_pending(&self, id: JobId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
