//! Mutation coordinator: turns intents into local changes plus remote calls,
//! and reconciles when the remote side answers.
//!
//! Each mutation kind carries one explicit reconciliation policy:
//!
//! | kind           | local change                  | on remote failure                 |
//! |----------------|-------------------------------|-----------------------------------|
//! | create         | after success only            | error notification, nothing else  |
//! | update         | immediately                   | error notification + full resync  |
//! | update status  | immediately                   | error notification + full resync  |
//! | delete         | immediately, grace period     | error notification, not restored  |
//!
//! Concurrent mutations of the same job are not arbitrated: whichever
//! response or resync lands last decides what the store shows.
use anyhow::Error;
use tracing::{debug, info, instrument, warn};

use crate::deletion::{DeleteTicket, DELETE_GRACE};
use crate::engine::{Engine, Event};
use crate::model::{Job, JobId, JobPatch, JobStatus, NewJob};
use crate::notify::{NotificationAction, NotificationKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update,
    UpdateStatus,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Touch the store only with the server's canonical answer.
    Pessimistic,
    /// Apply now; on failure reload everything from the remote.
    OptimisticWithResync,
    /// Remove now; commit remotely after a cancellable delay. Failures are
    /// reported but never rolled back.
    OptimisticWithGracePeriod,
}

impl MutationKind {
    pub const fn policy(self) -> Reconciliation {
        match self {
            MutationKind::Create => Reconciliation::Pessimistic,
            MutationKind::Update | MutationKind::UpdateStatus => {
                Reconciliation::OptimisticWithResync
            }
            MutationKind::Delete => Reconciliation::OptimisticWithGracePeriod,
        }
    }

    fn success_message(self, patch: &JobPatch) -> Option<String> {
        match self {
            MutationKind::Create => Some("Job added successfully".to_string()),
            MutationKind::Update => Some("Job updated successfully".to_string()),
            MutationKind::UpdateStatus => patch.status.map(|s| format!("Job moved to {s}")),
            // Commit of a delete is silent: the job is already gone from view.
            MutationKind::Delete => None,
        }
    }

    fn failure_message(self) -> &'static str {
        match self {
            MutationKind::Create => "Failed to add job",
            MutationKind::Update => "Failed to update job",
            MutationKind::UpdateStatus => "Failed to move job",
            MutationKind::Delete => "Failed to delete job",
        }
    }
}

/// Something the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Initial load or explicit refresh.
    Reload,
    Create(NewJob),
    Update { id: JobId, patch: JobPatch },
    UpdateStatus { id: JobId, status: JobStatus },
    Delete(JobId),
}

/// A remote call's result, delivered back onto the engine loop.
#[derive(Debug)]
pub enum RemoteOutcome {
    Loaded(Result<Vec<Job>, Error>),
    Created(Result<Job, Error>),
    Updated {
        kind: MutationKind,
        id: JobId,
        patch: JobPatch,
        result: Result<Job, Error>,
    },
    Deleted {
        id: JobId,
        result: Result<(), Error>,
    },
}

impl Engine {
    pub(crate) fn apply_intent(&mut self, intent: Intent) {
        match intent {
            Intent::Reload => self.reload(),
            Intent::Create(fields) => self.create(fields),
            Intent::Update { id, patch } => self.update(id, patch),
            Intent::UpdateStatus { id, status } => self.update_status(id, status),
            Intent::Delete(id) => self.request_delete(id),
        }
    }

    /// Full fetch; used for the initial load and for resync.
    pub fn reload(&mut self) {
        let api = self.api.clone();
        self.spawn_remote(async move { RemoteOutcome::Loaded(api.list_jobs().await) });
    }

    #[instrument(skip_all)]
    pub fn create(&mut self, fields: NewJob) {
        let api = self.api.clone();
        self.spawn_remote(async move { RemoteOutcome::Created(api.create_job(&fields).await) });
    }

    pub fn update(&mut self, id: JobId, patch: JobPatch) {
        self.optimistic_update(MutationKind::Update, id, patch);
    }

    pub fn update_status(&mut self, id: JobId, status: JobStatus) {
        self.optimistic_update(MutationKind::UpdateStatus, id, JobPatch::status(status));
    }

    #[instrument(skip(self, patch))]
    fn optimistic_update(&mut self, kind: MutationKind, id: JobId, patch: JobPatch) {
        debug_assert_eq!(kind.policy(), Reconciliation::OptimisticWithResync);
        if !self.store.apply(id, &patch) {
            // Unknown here, including jobs in their delete grace period.
            warn!(id, "update for a job not in the store ignored");
            return;
        }
        let api = self.api.clone();
        self.spawn_remote(async move {
            let result = api.update_job(id, &patch).await;
            RemoteOutcome::Updated {
                kind,
                id,
                patch,
                result,
            }
        });
    }

    /// Remove now, commit after [`DELETE_GRACE`] unless undone.
    #[instrument(skip(self))]
    pub fn request_delete(&mut self, id: JobId) {
        let Some(snapshot) = self.store.remove(id) else {
            debug!(id, "delete for a job not in the store ignored");
            return;
        };
        let timers = &self.timers;
        self.deletes.schedule(snapshot, |ticket| {
            timers.after(DELETE_GRACE, Event::DeleteGraceElapsed { id, ticket })
        });
        self.notify(
            "Job deleted",
            NotificationKind::Success,
            Some(NotificationAction::undo_delete(id)),
        );
    }

    /// Put the snapshot back (at the tail) and make sure the remote delete
    /// never happens.
    pub(crate) fn undo_delete(&mut self, id: JobId) {
        let Some(snapshot) = self.deletes.cancel(id) else {
            debug!(id, "undo after the delete was committed ignored");
            return;
        };
        if let Err(err) = self.store.insert(snapshot) {
            warn!(%err, "undo skipped; job already back in the store");
        }
    }

    pub(crate) fn commit_delete(&mut self, id: JobId, ticket: DeleteTicket) {
        let Some(pending) = self.deletes.take_due(id, ticket) else {
            // Undone between the timer firing and this event, or the timer
            // belongs to an earlier request for the same job.
            debug!(id, ticket, "stale delete timer ignored");
            return;
        };
        let api = self.api.clone();
        let id = pending.job_id;
        self.spawn_remote(async move {
            RemoteOutcome::Deleted {
                id,
                result: api.delete_job(id).await,
            }
        });
    }

    pub(crate) fn reconcile(&mut self, outcome: RemoteOutcome) {
        match outcome {
            RemoteOutcome::Loaded(Ok(jobs)) => {
                let total = jobs.len();
                let visible: Vec<Job> = jobs
                    .into_iter()
                    .filter(|job| !self.deletes.is_pending(job.id))
                    .collect();
                info!(total, visible = visible.len(), "jobs loaded");
                self.store.replace_all(visible);
            }
            RemoteOutcome::Loaded(Err(err)) => {
                warn!(?err, "failed to load jobs");
                self.notify("Failed to load jobs", NotificationKind::Error, None);
            }
            RemoteOutcome::Created(Ok(job)) => {
                let id = job.id;
                if let Err(err) = self.store.insert(job) {
                    // Already present through a resync that raced the create.
                    debug!(%err, "created job already in store");
                }
                info!(id, "job created");
                self.succeed(MutationKind::Create, &JobPatch::default());
            }
            RemoteOutcome::Created(Err(err)) => self.fail(MutationKind::Create, None, err),
            RemoteOutcome::Updated {
                kind,
                id,
                patch,
                result,
            } => match result {
                Ok(_) => {
                    info!(id, ?kind, "job updated");
                    self.succeed(kind, &patch);
                }
                Err(err) => self.fail(kind, Some(id), err),
            },
            RemoteOutcome::Deleted { id, result: Ok(()) } => {
                info!(id, "job deleted remotely");
            }
            RemoteOutcome::Deleted { id, result: Err(err) } => {
                self.fail(MutationKind::Delete, Some(id), err)
            }
        }
    }

    fn succeed(&mut self, kind: MutationKind, patch: &JobPatch) {
        if let Some(message) = kind.success_message(patch) {
            self.notify(message, NotificationKind::Success, None);
        }
    }

    fn fail(&mut self, kind: MutationKind, id: Option<JobId>, err: Error) {
        warn!(?err, ?kind, ?id, "remote mutation failed");
        self.notify(kind.failure_message(), NotificationKind::Error, None);
        match kind.policy() {
            Reconciliation::OptimisticWithResync => self.reload(),
            // Nothing was applied locally.
            Reconciliation::Pessimistic => {}
            // The job stays gone locally whatever the remote holds.
            Reconciliation::OptimisticWithGracePeriod => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_table() {
        assert_eq!(MutationKind::Create.policy(), Reconciliation::Pessimistic);
        assert_eq!(
            MutationKind::Update.policy(),
            Reconciliation::OptimisticWithResync
        );
        assert_eq!(
            MutationKind::UpdateStatus.policy(),
            Reconciliation::OptimisticWithResync
        );
        assert_eq!(
            MutationKind::Delete.policy(),
            Reconciliation::OptimisticWithGracePeriod
        );
    }

    #[test]
    fn messages_follow_kind() {
        let moved = JobPatch::status(JobStatus::Offer);
        assert_eq!(
            MutationKind::UpdateStatus.success_message(&moved).as_deref(),
            Some("Job moved to OFFER")
        );
        assert_eq!(
            MutationKind::Update.success_message(&moved).as_deref(),
            Some("Job updated successfully")
        );
        assert_eq!(MutationKind::Delete.success_message(&moved), None);
        assert_eq!(MutationKind::Create.failure_message(), "Failed to add job");
        assert_eq!(MutationKind::UpdateStatus.failure_message(), "Failed to move job");
    }
}
