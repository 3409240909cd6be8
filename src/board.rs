//! The board is never stored: it is derived from the store on demand by
//! partitioning jobs into one ordered column per status.
use chrono::{NaiveDateTime, Utc};

use crate::model::{Job, JobStatus};

/// How far back `date_applied` may be for a job to stay visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateWindow {
    #[default]
    Any,
    LastDays(u32),
}

/// View-only filter. Never mutates the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    pub query: String,
    pub window: DateWindow,
}

impl JobFilter {
    pub fn is_empty(&self) -> bool {
        self.query.trim().is_empty() && self.window == DateWindow::Any
    }

    pub fn matches(&self, job: &Job) -> bool {
        self.matches_at(job, Utc::now().naive_utc())
    }

    pub fn matches_at(&self, job: &Job, now: NaiveDateTime) -> bool {
        let query = self.query.trim().to_lowercase();
        if !query.is_empty() {
            let hit = job.company_name.to_lowercase().contains(&query)
                || job.job_title.to_lowercase().contains(&query)
                || job
                    .notes
                    .as_deref()
                    .is_some_and(|notes| notes.to_lowercase().contains(&query));
            if !hit {
                return false;
            }
        }

        match self.window {
            DateWindow::Any => true,
            DateWindow::LastDays(days) => elapsed_days(job.date_applied, now) <= i64::from(days),
        }
    }
}

/// Whole days between two instants, rounded up, in either direction.
fn elapsed_days(then: NaiveDateTime, now: NaiveDateTime) -> i64 {
    let millis = (now - then).num_milliseconds().abs();
    let day = 24 * 60 * 60 * 1000;
    (millis + day - 1) / day
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    columns: [Vec<Job>; 4],
}

impl Board {
    /// Partition `jobs` by status, keeping store order within each column.
    pub fn from_jobs(jobs: &[Job], filter: &JobFilter) -> Self {
        let now = Utc::now().naive_utc();
        let mut board = Board::default();
        for job in jobs.iter().filter(|job| filter.matches_at(job, now)) {
            board.columns[job.status.column_index()].push(job.clone());
        }
        board
    }

    pub fn column(&self, status: JobStatus) -> &[Job] {
        &self.columns[status.column_index()]
    }

    pub fn total(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    pub fn counts(&self) -> [(JobStatus, usize); 4] {
        JobStatus::ALL.map(|status| (status, self.column(status).len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::parse_date_applied;
    use crate::store::tests::job;

    #[test]
    fn partitions_by_status_in_store_order() {
        let jobs = vec![
            job(1, JobStatus::Applied),
            job(2, JobStatus::Offer),
            job(3, JobStatus::Applied),
            job(4, JobStatus::Rejected),
        ];
        let board = Board::from_jobs(&jobs, &JobFilter::default());

        let applied: Vec<_> = board.column(JobStatus::Applied).iter().map(|j| j.id).collect();
        assert_eq!(applied, vec![1, 3]);
        assert!(board.column(JobStatus::Interviewing).is_empty());
        assert_eq!(board.total(), 4);
        assert_eq!(
            board.counts(),
            [
                (JobStatus::Applied, 2),
                (JobStatus::Interviewing, 0),
                (JobStatus::Rejected, 1),
                (JobStatus::Offer, 1),
            ]
        );
    }

    #[test]
    fn search_covers_company_title_and_notes() {
        let mut a = job(1, JobStatus::Applied);
        a.company_name = "Globex".into();
        let mut b = job(2, JobStatus::Applied);
        b.job_title = "Rust Developer".into();
        let mut c = job(3, JobStatus::Applied);
        c.notes = Some("Referred by GLOBEX alum".into());
        let d = job(4, JobStatus::Applied);

        let filter = JobFilter {
            query: "globex".into(),
            ..Default::default()
        };
        let board = Board::from_jobs(&[a.clone(), b.clone(), c, d], &filter);
        let ids: Vec<_> = board.column(JobStatus::Applied).iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![1, 3]);

        let filter = JobFilter {
            query: "rust".into(),
            ..Default::default()
        };
        assert!(filter.matches(&b));
        assert!(!filter.matches(&a));
    }

    #[test]
    fn date_window_rounds_days_up() {
        let now = parse_date_applied("2024-03-31T12:00:00").unwrap();
        let filter = JobFilter {
            window: DateWindow::LastDays(7),
            ..Default::default()
        };

        let mut recent = job(1, JobStatus::Applied);
        recent.date_applied = parse_date_applied("2024-03-24T12:00:00").unwrap();
        assert!(filter.matches_at(&recent, now));

        let mut stale = job(2, JobStatus::Applied);
        stale.date_applied = parse_date_applied("2024-03-24T11:00:00").unwrap();
        assert!(!filter.matches_at(&stale, now));

        assert!(JobFilter::default().matches_at(&stale, now));
    }
}
