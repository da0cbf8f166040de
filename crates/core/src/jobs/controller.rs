//! Job controller
//!
//! Submits jobs under client-generated identifiers, polls their status,
//! requests cancellation and waits for completion within a bounded time.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tabula_domain::constants::{MIN_POLL_INTERVAL_MS, POLL_INTERVAL_DIVISOR};
use tabula_domain::{Job, JobConfiguration, JobReference, ListJobsOptions, Page, Result, TabulaError};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument};

use crate::classifier::classify_job_error;
use crate::executor::{decode, ApiExecutor};
use crate::pagination::Paginator;
use crate::routes::ApiRoutes;
use crate::transport_ports::{HttpMethod, TransportRequest};

#[derive(Debug, Deserialize)]
struct CancelResponse {
    job: Job,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobList {
    #[serde(default)]
    jobs: Vec<Job>,
    next_page_token: Option<String>,
}

/// Turn a finished job into its outcome: the job itself, or the classified
/// error result.
pub fn job_outcome(job: Job) -> Result<Job> {
    match job.error_result() {
        Some(error) => Err(classify_job_error(&job.job_reference, error).into()),
        None => Ok(job),
    }
}

/// Poll interval used for a wait of `timeout`.
///
/// The configured interval is shortened so that at least ten polls fit in
/// the wait, and never drops below one millisecond.
pub fn effective_poll_interval(configured: Duration, timeout: Duration) -> Duration {
    configured
        .min(timeout / POLL_INTERVAL_DIVISOR)
        .max(Duration::from_millis(MIN_POLL_INTERVAL_MS))
}

/// Drives the lifecycle of asynchronous jobs.
#[derive(Debug, Clone)]
pub struct JobController {
    executor: ApiExecutor,
    routes: ApiRoutes,
    poll_interval: Duration,
}

impl JobController {
    pub fn new(executor: ApiExecutor, routes: ApiRoutes, poll_interval: Duration) -> Self {
        Self { executor, routes, poll_interval }
    }

    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Insert request for a job. The identifier is generated client-side when
    /// `job_id` is `None`, so the reference is known before the service
    /// answers.
    pub fn insert_request(
        &self,
        project_id: &str,
        configuration: &JobConfiguration,
        job_id: Option<String>,
    ) -> Result<(JobReference, TransportRequest)> {
        let reference = match job_id {
            Some(job_id) if !job_id.is_empty() => JobReference::new(project_id, job_id),
            Some(_) => return Err(TabulaError::InvalidInput("job id must not be empty".to_string())),
            None => JobReference::generate(project_id),
        };
        let body = json!({
            "jobReference": reference,
            "configuration": configuration,
        });
        let request = TransportRequest::post(self.routes.jobs(project_id), body);
        Ok((reference, request))
    }

    /// Insert a job and return the service's view of it.
    #[instrument(skip(self, configuration), fields(kind = ?configuration.kind()))]
    pub async fn insert(
        &self,
        project_id: &str,
        configuration: &JobConfiguration,
        job_id: Option<String>,
    ) -> Result<Job> {
        let (reference, request) = self.insert_request(project_id, configuration, job_id)?;
        let job: Job = self.executor.call_as(request).await?;
        info!(job = %reference, state = %job.state(), "job inserted");
        Ok(job)
    }

    /// Insert a job and return only its reference.
    pub async fn submit(
        &self,
        project_id: &str,
        configuration: &JobConfiguration,
        job_id: Option<String>,
    ) -> Result<JobReference> {
        Ok(self.insert(project_id, configuration, job_id).await?.job_reference)
    }

    pub fn poll_request(&self, reference: &JobReference) -> TransportRequest {
        TransportRequest::get(self.routes.job(reference))
            .with_optional_query("location", reference.location.as_deref())
    }

    /// Fetch the current state of a job.
    pub async fn poll(&self, reference: &JobReference) -> Result<Job> {
        self.executor.call_as(self.poll_request(reference)).await
    }

    pub fn cancel_request(&self, reference: &JobReference) -> TransportRequest {
        TransportRequest::new(HttpMethod::Post, self.routes.cancel_job(reference))
            .with_optional_query("location", reference.location.as_deref())
    }

    /// Extract the job from a cancel response.
    pub fn decode_cancel(&self, reference: &JobReference, value: Value) -> Result<Job> {
        let response: CancelResponse = decode(value, &self.routes.cancel_job(reference))?;
        Ok(response.job)
    }

    /// Request cancellation. The returned job usually still shows `RUNNING`;
    /// cancellation completes asynchronously and the job then finishes with
    /// reason `stopped`.
    #[instrument(skip(self), fields(job = %reference))]
    pub async fn cancel(&self, reference: &JobReference) -> Result<Job> {
        let value = self.executor.call(self.cancel_request(reference)).await?;
        let job = self.decode_cancel(reference, value)?;
        info!(state = %job.state(), "cancel requested");
        Ok(job)
    }

    /// Poll until the job is `DONE` or `timeout` has elapsed.
    ///
    /// A finished job with an error result yields that error, reason intact.
    /// Running out of time yields [`TabulaError::Timeout`]; the job itself is
    /// left running on the service.
    #[instrument(skip(self), fields(job = %reference))]
    pub async fn wait_until_done(&self, reference: &JobReference, timeout: Duration) -> Result<Job> {
        let interval = effective_poll_interval(self.poll_interval, timeout);
        let started = Instant::now();

        loop {
            let job = self.poll(reference).await?;
            if job.is_done() {
                debug!(elapsed = ?started.elapsed(), "job finished");
                return job_outcome(job);
            }

            let waited = started.elapsed();
            if waited >= timeout {
                info!(?waited, state = %job.state(), "gave up waiting for job");
                return Err(TabulaError::Timeout { job: reference.clone(), waited });
            }

            debug!(state = %job.state(), ?interval, "job not done yet");
            sleep(interval.min(timeout - waited)).await;
        }
    }

    pub fn list_request(
        &self,
        project_id: &str,
        options: &ListJobsOptions,
        page_token: Option<String>,
    ) -> TransportRequest {
        let mut request = TransportRequest::get(self.routes.jobs(project_id))
            .with_optional_query("projection", options.projection.as_deref())
            .with_optional_query("maxResults", options.max_results)
            .with_optional_query(tabula_domain::constants::PAGE_TOKEN_PARAM, page_token);
        if options.all_users {
            request = request.with_query("allUsers", true);
        }
        for state in &options.state_filter {
            request = request.with_query("stateFilter", state.as_str().to_ascii_lowercase());
        }
        request
    }

    /// Decode one page of a job listing.
    pub fn decode_list(&self, project_id: &str, value: Value) -> Result<Page<Job>> {
        let list: JobList = if value.is_null() {
            JobList::default()
        } else {
            decode(value, &self.routes.jobs(project_id))?
        };
        Ok(Page::new(list.jobs, list.next_page_token))
    }

    /// List jobs across all pages.
    pub async fn list(
        &self,
        paginator: &Paginator,
        project_id: &str,
        options: &ListJobsOptions,
    ) -> Result<Vec<Job>> {
        paginator
            .list_all(move |token| async move {
                let value = self.executor.call(self.list_request(project_id, options, token)).await?;
                self.decode_list(project_id, value)
            })
            .await
    }
}
