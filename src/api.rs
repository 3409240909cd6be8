use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::model::{Job, JobId, JobPatch, NewJob};

/// Remote source of truth for jobs.
#[async_trait]
pub trait JobsApi: Send + Sync {
    /// `GET /jobs/`
    async fn list_jobs(&self) -> Result<Vec<Job>>;

    /// `POST /jobs/`, returning the canonical entity.
    async fn create_job(&self, job: &NewJob) -> Result<Job>;

    /// `PUT /jobs/{id}` with only the fields present in `patch`.
    async fn update_job(&self, id: JobId, patch: &JobPatch) -> Result<Job>;

    /// `DELETE /jobs/{id}`
    async fn delete_job(&self, id: JobId) -> Result<()>;
}

#[derive(Clone)]
pub struct HttpJobsApi {
    http: Client,
    base_url: Url,
}

impl fmt::Debug for HttpJobsApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpJobsApi")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpJobsApi {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent("next-steps/0.1")
            .timeout(timeout)
            .no_proxy()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, base_url })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let base_url = cfg.base_url()?;
        Self::new(base_url, cfg.timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, id: Option<JobId>) -> Result<Url> {
        let path = match id {
            Some(id) => format!("jobs/{id}"),
            None => "jobs/".to_string(),
        };
        self.base_url
            .join(&path)
            .context("invalid jobs API base URL")
    }

    pub fn build_request(
        &self,
        method: Method,
        id: Option<JobId>,
        body: Option<&Value>,
    ) -> Result<reqwest::Request> {
        let endpoint = self.endpoint(id)?;
        let mut builder = self
            .http
            .request(method, endpoint)
            .header("Accept", "application/json");
        if let Some(body) = body {
            builder = builder
                .header("Content-Type", "application/json")
                .json(body);
        }
        builder.build().context("failed to build jobs API request")
    }

    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        debug!(method = %request.method(), url = %request.url(), "sending jobs API request");
        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach jobs API")?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            let detail = error_detail(&body);
            warn!(%status, detail = %detail, "jobs API error");
            if status == StatusCode::NOT_FOUND {
                return Err(anyhow!("job not found: {}", detail));
            }
            return Err(anyhow!("jobs api error {}: {}", status, detail));
        }
        Ok(res)
    }
}

#[async_trait]
impl JobsApi for HttpJobsApi {
    #[instrument(skip_all)]
    async fn list_jobs(&self) -> Result<Vec<Job>> {
        let request = self.build_request(Method::GET, None, None)?;
        let res = self.execute(request).await?;
        let jobs: Vec<Job> = res.json().await.context("invalid job list response")?;
        debug!(count = jobs.len(), "fetched jobs");
        Ok(jobs)
    }

    #[instrument(skip_all)]
    async fn create_job(&self, job: &NewJob) -> Result<Job> {
        let body = serde_json::to_value(job).context("failed to encode job")?;
        let request = self.build_request(Method::POST, None, Some(&body))?;
        let res = self.execute(request).await?;
        res.json().await.context("invalid create job response")
    }

    #[instrument(skip_all, fields(id = id))]
    async fn update_job(&self, id: JobId, patch: &JobPatch) -> Result<Job> {
        let body = serde_json::to_value(patch).context("failed to encode job patch")?;
        let request = self.build_request(Method::PUT, Some(id), Some(&body))?;
        let res = self.execute(request).await?;
        res.json().await.context("invalid update job response")
    }

    #[instrument(skip_all, fields(id = id))]
    async fn delete_job(&self, id: JobId) -> Result<()> {
        let request = self.build_request(Method::DELETE, Some(id), None)?;
        self.execute(request).await?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    detail: Value,
}

/// Pull the `detail` field out of an error body, falling back to the raw text.
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse {
            detail: Value::String(detail),
        }) => detail,
        Ok(ErrorResponse { detail }) => detail.to_string(),
        Err(_) => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JobStatus;
    use serde_json::json;

    fn client() -> HttpJobsApi {
        let base = Url::parse("http://localhost:8000/").unwrap();
        HttpJobsApi::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn build_request_for_list() {
        let request = client().build_request(Method::GET, None, None).unwrap();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.url().as_str(), "http://localhost:8000/jobs/");
        assert!(request.body().is_none());
        assert!(request.headers().get("Content-Type").is_none());
    }

    #[test]
    fn build_request_for_status_update() {
        let body = serde_json::to_value(JobPatch::status(JobStatus::Interviewing)).unwrap();
        let request = client()
            .build_request(Method::PUT, Some(1), Some(&body))
            .unwrap();
        assert_eq!(request.method(), Method::PUT);
        assert_eq!(request.url().path(), "/jobs/1");
        assert_eq!(
            request
                .headers()
                .get("Content-Type")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "application/json"
        );
        let sent: Value =
            serde_json::from_slice(request.body().and_then(|b| b.as_bytes()).unwrap()).unwrap();
        assert_eq!(sent, json!({ "status": "INTERVIEWING" }));
    }

    #[test]
    fn build_request_for_delete_keeps_base_path() {
        let base = Url::parse("https://example.com/api/").unwrap();
        let api = HttpJobsApi::new(base, Duration::from_secs(5)).unwrap();
        let request = api.build_request(Method::DELETE, Some(7), None).unwrap();
        assert_eq!(request.url().as_str(), "https://example.com/api/jobs/7");
    }

    #[test]
    fn error_detail_prefers_detail_field() {
        assert_eq!(
            error_detail(r#"{"detail":"Job application for this company and title already exists."}"#),
            "Job application for this company and title already exists."
        );
        assert_eq!(error_detail("Internal Server Error"), "Internal Server Error");
        assert_eq!(error_detail(r#"{"detail":[{"loc":["body"]}]}"#), r#"[{"loc":["body"]}]"#);
    }
}
