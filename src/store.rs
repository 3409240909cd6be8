//! In-memory ordered collection of jobs. Single writer (the engine); views
//! observe it through [`JobStore::subscribe`].
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::warn;

use crate::board::{Board, JobFilter};
use crate::model::{Job, JobId, JobPatch, JobStatus};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("job {0} is already in the store")]
    DuplicateId(JobId),
}

/// What subscribers see after every mutation.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub revision: u64,
    pub jobs: Arc<Vec<Job>>,
}

#[derive(Debug)]
pub struct JobStore {
    jobs: Vec<Job>,
    revision: u64,
    tx: watch::Sender<StoreSnapshot>,
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(StoreSnapshot::default());
        Self {
            jobs: Vec::new(),
            revision: 0,
            tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.tx.subscribe()
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|job| job.id == id)
    }

    pub fn contains(&self, id: JobId) -> bool {
        self.get(id).is_some()
    }

    pub fn position(&self, id: JobId) -> Option<usize> {
        self.jobs.iter().position(|job| job.id == id)
    }

    pub fn board(&self, filter: &JobFilter) -> Board {
        Board::from_jobs(&self.jobs, filter)
    }

    /// Append a job at the tail.
    pub fn insert(&mut self, job: Job) -> Result<(), StoreError> {
        if self.contains(job.id) {
            return Err(StoreError::DuplicateId(job.id));
        }
        self.jobs.push(job);
        self.publish();
        Ok(())
    }

    pub fn remove(&mut self, id: JobId) -> Option<Job> {
        let index = self.position(id)?;
        let job = self.jobs.remove(index);
        self.publish();
        Some(job)
    }

    /// Apply `patch` in place. Returns false if the job is unknown.
    pub fn apply(&mut self, id: JobId, patch: &JobPatch) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        patch.apply_to(&mut self.jobs[index]);
        self.publish();
        true
    }

    /// Rewrite the status in place without moving the job.
    pub fn set_status(&mut self, id: JobId, status: JobStatus) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        if self.jobs[index].status == status {
            return true;
        }
        self.jobs[index].status = status;
        self.publish();
        true
    }

    /// Remove the job at `from` and reinsert it at `to`. Every other job
    /// keeps its relative order.
    pub fn move_item(&mut self, from: usize, to: usize) {
        if from == to || from >= self.jobs.len() || to >= self.jobs.len() {
            return;
        }
        let job = self.jobs.remove(from);
        self.jobs.insert(to, job);
        self.publish();
    }

    /// Discard local contents and take `jobs` as the new state. Later
    /// duplicates of an id are dropped.
    pub fn replace_all(&mut self, jobs: Vec<Job>) {
        let mut unique: Vec<Job> = Vec::with_capacity(jobs.len());
        for job in jobs {
            if unique.iter().any(|kept| kept.id == job.id) {
                warn!(id = job.id, "dropping duplicate job from remote list");
                continue;
            }
            unique.push(job);
        }
        self.jobs = unique;
        self.publish();
    }

    fn publish(&mut self) {
        self.revision += 1;
        self.tx.send_replace(StoreSnapshot {
            revision: self.revision,
            jobs: Arc::new(self.jobs.clone()),
        });
    }
}
