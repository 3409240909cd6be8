use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub type JobId = i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Applied,
    Interviewing,
    Rejected,
    Offer,
}

impl JobStatus {
    /// Board column order.
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Applied,
        JobStatus::Interviewing,
        JobStatus::Rejected,
        JobStatus::Offer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Applied => "APPLIED",
            JobStatus::Interviewing => "INTERVIEWING",
            JobStatus::Rejected => "REJECTED",
            JobStatus::Offer => "OFFER",
        }
    }

    pub(crate) fn column_index(&self) -> usize {
        match self {
            JobStatus::Applied => 0,
            JobStatus::Interviewing => 1,
            JobStatus::Rejected => 2,
            JobStatus::Offer => 3,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown job status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// A tracked job application as held by the remote service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub company_name: String,
    pub job_title: String,
    pub status: JobStatus,
    #[serde(deserialize_with = "lenient_datetime")]
    pub date_applied: NaiveDateTime,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub email_thread_link: Option<String>,
}

/// Fields for a create call. The server assigns `id` and defaults
/// `date_applied` to now when it is absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewJob {
    pub company_name: String,
    pub job_title: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_thread_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_applied: Option<NaiveDateTime>,
}

impl NewJob {
    pub fn new(company_name: impl Into<String>, job_title: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
            job_title: job_title.into(),
            status: JobStatus::Applied,
            notes: None,
            email_thread_link: None,
            date_applied: None,
        }
    }
}

/// Partial update. Absent fields are left untouched both locally and in the
/// `PUT` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_applied: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_thread_link: Option<String>,
}

impl JobPatch {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == JobPatch::default()
    }

    pub fn apply_to(&self, job: &mut Job) {
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(company) = &self.company_name {
            job.company_name = company.clone();
        }
        if let Some(title) = &self.job_title {
            job.job_title = title.clone();
        }
        if let Some(date) = self.date_applied {
            job.date_applied = date;
        }
        if let Some(notes) = &self.notes {
            job.notes = Some(notes.clone());
        }
        if let Some(link) = &self.email_thread_link {
            job.email_thread_link = Some(link.clone());
        }
    }
}

/// Parse the date formats the service and the entry form produce:
/// naive or offset ISO datetimes, with or without fractional seconds, and
/// bare `YYYY-MM-DD` dates (taken as midnight).
pub fn parse_date_applied(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn lenient_datetime<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date_applied(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date_applied: {raw}")))
}
