//! Job operations: query, load, extract, copy, and lifecycle

use std::time::Duration;

use tabula_core::job_outcome;
use tabula_domain::{
    CopyOptions, ExtractOptions, Job, JobConfiguration, JobReference, ListJobsOptions, LoadOptions,
    Page, QueryOptions, Result,
};
use tracing::{debug, info, instrument};

use super::call::PreparedCall;
use super::target::{IntoJob, IntoTable};
use super::WarehouseClient;

impl WarehouseClient {
    pub(crate) fn job_reference(&self, job: impl IntoJob) -> JobReference {
        job.into_job(&self.config.project_id)
    }

    pub(crate) fn insert_job_call(
        &self,
        configuration: &JobConfiguration,
        job_id: Option<String>,
    ) -> Result<PreparedCall<Job>> {
        let (_, request) = self.jobs.insert_request(&self.config.project_id, configuration, job_id)?;
        Ok(PreparedCall::decoded(request))
    }

    pub(crate) fn job_call(&self, reference: &JobReference) -> PreparedCall<Job> {
        PreparedCall::decoded(self.jobs.poll_request(reference))
    }

    pub(crate) fn cancel_job_call(&self, reference: &JobReference) -> PreparedCall<Job> {
        let jobs = self.jobs.clone();
        let reference = reference.clone();
        let request = jobs.cancel_request(&reference);
        PreparedCall::new(request, move |result| {
            jobs.decode_cancel(&reference, result?)
        })
    }

    pub(crate) fn jobs_page_call(
        &self,
        options: &ListJobsOptions,
        page_token: Option<String>,
    ) -> PreparedCall<Page<Job>> {
        let project_id = options.project_id.as_deref().unwrap_or(&self.config.project_id);
        PreparedCall::listing(self.jobs.list_request(project_id, options, page_token), "jobs")
    }

    /// Insert a job, then wait for it when `wait` is set.
    ///
    /// Without `wait` the inserted job is returned as reported, typically
    /// still `PENDING` or `RUNNING`. With `wait` a failed job yields its
    /// error.
    async fn run_job(
        &self,
        configuration: &JobConfiguration,
        job_id: Option<String>,
        wait: Option<Duration>,
    ) -> Result<Job> {
        let job = self.jobs.insert(&self.config.project_id, configuration, job_id).await?;
        match wait {
            None => Ok(job),
            Some(_) if job.is_done() => job_outcome(job),
            Some(timeout) => self.jobs.wait_until_done(&job.job_reference, timeout).await,
        }
    }

    /// Run a query job.
    #[instrument(skip_all, fields(dry_run = options.dry_run))]
    pub async fn query(&self, sql: &str, options: &QueryOptions) -> Result<Job> {
        let configuration = options.to_configuration(sql);
        self.run_job(&configuration, options.job_id.clone(), options.wait).await
    }

    /// Load files from cloud storage into a table.
    #[instrument(skip_all, fields(sources = options.source_uris.len()))]
    pub async fn load(&self, table: impl IntoTable, options: &LoadOptions) -> Result<Job> {
        let configuration = options.to_configuration(self.table_reference(table));
        self.run_job(&configuration, options.job_id.clone(), options.wait).await
    }

    /// Export a table to cloud storage.
    #[instrument(skip_all)]
    pub async fn extract<U: Into<String>>(
        &self,
        table: impl IntoTable,
        destination_uris: impl IntoIterator<Item = U>,
        options: &ExtractOptions,
    ) -> Result<Job> {
        let uris = destination_uris.into_iter().map(Into::into).collect();
        let configuration = options.to_configuration(self.table_reference(table), uris);
        self.run_job(&configuration, options.job_id.clone(), options.wait).await
    }

    /// Copy one table to another.
    #[instrument(skip_all)]
    pub async fn copy(
        &self,
        source: impl IntoTable,
        destination: impl IntoTable,
        options: &CopyOptions,
    ) -> Result<Job> {
        let configuration = options
            .to_configuration(vec![self.table_reference(source)], self.table_reference(destination));
        self.run_job(&configuration, options.job_id.clone(), options.wait).await
    }

    /// Current state of a job.
    pub async fn job(&self, job: impl IntoJob) -> Result<Job> {
        self.jobs.poll(&self.job_reference(job)).await
    }

    /// Every job matching `options`, in the project it names or the default
    /// project.
    pub async fn jobs(&self, options: &ListJobsOptions) -> Result<Vec<Job>> {
        let project_id = options.project_id.as_deref().unwrap_or(&self.config.project_id);
        let jobs = self.jobs.list(&self.paginator, project_id, options).await?;
        debug!(project = project_id, count = jobs.len(), "jobs listed");
        Ok(jobs)
    }

    /// Request cancellation. The job finishes asynchronously with reason
    /// `stopped`.
    pub async fn cancel_job(&self, job: impl IntoJob) -> Result<Job> {
        self.jobs.cancel(&self.job_reference(job)).await
    }

    /// Wait for a job to finish. `None` uses the configured default wait.
    pub async fn wait_job(&self, job: impl IntoJob, timeout: Option<Duration>) -> Result<Job> {
        let reference = self.job_reference(job);
        let timeout = timeout.unwrap_or_else(|| self.config.jobs.default_wait());
        let job = self.jobs.wait_until_done(&reference, timeout).await?;
        info!(job = %reference, "job done");
        Ok(job)
    }
}
