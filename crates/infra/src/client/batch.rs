//! Batched facade operations
//!
//! A [`WarehouseBatch`] queues facade calls and sends them as one composite
//! request on [`WarehouseBatch::flush`]. Each call delivers its result to a
//! callback; the result is the same one the direct method would return, so
//! a missing table still arrives as `Ok(None)`.
//!
//! Listings deliver their first page only. Job operations never wait; the
//! `wait` option is ignored. Reading table data in a batch needs the schema
//! in the options, since the table cannot be fetched mid-batch.
//!
//! ```no_run
//! # async fn demo(client: &tabula_infra::WarehouseClient) -> tabula_domain::Result<()> {
//! use tabula_infra::Deferred;
//!
//! let (on_table, table) = Deferred::channel();
//! client
//!     .with_batch(|batch| {
//!         batch.table(("samples", "shakespeare"), on_table)?;
//!         batch.delete_table(("scratch", "old"), |result| {
//!             tracing::info!(?result, "scratch table delete");
//!         })
//!     })
//!     .await?;
//! let table = table.wait().await?;
//! # let _ = table;
//! # Ok(())
//! # }
//! ```

use serde::Serialize;
use tabula_core::{BatchScope, BatchSummary};
use tabula_domain::{
    CopyOptions, Dataset, DatasetPatch, ExtractOptions, InsertOptions, Job, ListJobsOptions,
    LoadOptions, Page, QueryOptions, Result, Table, TableData, TableDataOptions, TableDefinition,
    TablePatch, TabulaError,
};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use super::call::PreparedCall;
use super::target::{IntoDataset, IntoJob, IntoTable};
use super::WarehouseClient;

impl WarehouseClient {
    /// Open a batch. Fails with [`TabulaError::BatchAlreadyActive`] while
    /// another batch of this client is open.
    pub fn batch(&self) -> Result<WarehouseBatch<'_>> {
        Ok(WarehouseBatch { client: self, scope: self.multiplexer.begin()? })
    }

    /// Run `body` against a new batch and flush it.
    ///
    /// When `body` fails nothing is sent, queued callbacks receive
    /// [`TabulaError::BatchAborted`], and the body's error is returned.
    pub async fn with_batch<F>(&self, body: F) -> Result<BatchSummary>
    where
        F: FnOnce(&mut WarehouseBatch<'_>) -> Result<()>,
    {
        let mut batch = self.batch()?;
        if let Err(err) = body(&mut batch) {
            batch.abort();
            return Err(err);
        }
        batch.flush().await
    }
}

/// Facade calls queued for one composite request.
pub struct WarehouseBatch<'a> {
    client: &'a WarehouseClient,
    scope: BatchScope<'a>,
}

impl WarehouseBatch<'_> {
    fn enqueue<T: 'static>(
        &mut self,
        call: PreparedCall<T>,
        callback: impl FnOnce(Result<T>) + Send + 'static,
    ) -> Result<()> {
        let (request, outcome) = call.into_parts();
        self.scope.submit(request, move |result| callback(outcome(result)));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.scope.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scope.is_empty()
    }

    /// Send the queued calls and close the batch.
    pub async fn flush(self) -> Result<BatchSummary> {
        self.scope.flush().await
    }

    /// Close the batch without sending.
    pub fn abort(self) {
        self.scope.abort();
    }

    /// First page of datasets.
    pub fn datasets(
        &mut self,
        project: Option<&str>,
        all: bool,
        callback: impl FnOnce(Result<Page<Dataset>>) + Send + 'static,
    ) -> Result<()> {
        let project_id = project.unwrap_or(self.client.project_id());
        let call = self.client.datasets_page_call(project_id, all, None);
        self.enqueue(call, callback)
    }

    pub fn dataset(
        &mut self,
        dataset: impl IntoDataset,
        callback: impl FnOnce(Result<Option<Dataset>>) + Send + 'static,
    ) -> Result<()> {
        let reference = self.client.dataset_reference(dataset);
        let call = self.client.dataset_call(&reference);
        self.enqueue(call, callback)
    }

    pub fn insert_dataset(
        &mut self,
        dataset: impl IntoDataset,
        callback: impl FnOnce(Result<Dataset>) + Send + 'static,
    ) -> Result<()> {
        let reference = self.client.dataset_reference(dataset);
        let call = self.client.insert_dataset_call(&reference);
        self.enqueue(call, callback)
    }

    pub fn patch_dataset(
        &mut self,
        dataset: impl IntoDataset,
        patch: &DatasetPatch,
        callback: impl FnOnce(Result<Dataset>) + Send + 'static,
    ) -> Result<()> {
        let reference = self.client.dataset_reference(dataset);
        let call = self.client.patch_dataset_call(&reference, patch)?;
        self.enqueue(call, callback)
    }

    pub fn delete_dataset(
        &mut self,
        dataset: impl IntoDataset,
        delete_contents: bool,
        callback: impl FnOnce(Result<bool>) + Send + 'static,
    ) -> Result<()> {
        let reference = self.client.dataset_reference(dataset);
        let call = self.client.delete_dataset_call(&reference, delete_contents);
        self.enqueue(call, callback)
    }

    /// First page of tables.
    pub fn tables(
        &mut self,
        dataset: impl IntoDataset,
        callback: impl FnOnce(Result<Page<Table>>) + Send + 'static,
    ) -> Result<()> {
        let reference = self.client.dataset_reference(dataset);
        let call = self.client.tables_page_call(&reference, None);
        self.enqueue(call, callback)
    }

    pub fn table(
        &mut self,
        table: impl IntoTable,
        callback: impl FnOnce(Result<Option<Table>>) + Send + 'static,
    ) -> Result<()> {
        let reference = self.client.table_reference(table);
        let call = self.client.table_call(&reference);
        self.enqueue(call, callback)
    }

    pub fn insert_table(
        &mut self,
        table: impl IntoTable,
        definition: &TableDefinition,
        callback: impl FnOnce(Result<Table>) + Send + 'static,
    ) -> Result<()> {
        let reference = self.client.table_reference(table);
        let call = self.client.insert_table_call(&reference, definition)?;
        self.enqueue(call, callback)
    }

    pub fn patch_table(
        &mut self,
        table: impl IntoTable,
        patch: &TablePatch,
        callback: impl FnOnce(Result<Table>) + Send + 'static,
    ) -> Result<()> {
        let reference = self.client.table_reference(table);
        let call = self.client.patch_table_call(&reference, patch)?;
        self.enqueue(call, callback)
    }

    pub fn delete_table(
        &mut self,
        table: impl IntoTable,
        callback: impl FnOnce(Result<bool>) + Send + 'static,
    ) -> Result<()> {
        let reference = self.client.table_reference(table);
        let call = self.client.delete_table_call(&reference);
        self.enqueue(call, callback)
    }

    /// One page of rows. `options.schema` is required.
    pub fn list_tabledata(
        &mut self,
        table: impl IntoTable,
        options: &TableDataOptions,
        callback: impl FnOnce(Result<TableData>) + Send + 'static,
    ) -> Result<()> {
        let schema = options.schema.clone().ok_or_else(|| {
            TabulaError::InvalidInput("reading table data in a batch needs a schema".to_string())
        })?;
        let reference = self.client.table_reference(table);
        let call = self.client.tabledata_call(&reference, options, schema);
        self.enqueue(call, callback)
    }

    pub fn insert_tabledata<R: Serialize>(
        &mut self,
        table: impl IntoTable,
        rows: &[R],
        options: &InsertOptions,
        callback: impl FnOnce(Result<()>) + Send + 'static,
    ) -> Result<()> {
        let reference = self.client.table_reference(table);
        let call = self.client.insert_tabledata_call(&reference, rows, options)?;
        self.enqueue(call, callback)
    }

    pub fn query(
        &mut self,
        sql: &str,
        options: &QueryOptions,
        callback: impl FnOnce(Result<Job>) + Send + 'static,
    ) -> Result<()> {
        let call = self.client.insert_job_call(&options.to_configuration(sql), options.job_id.clone())?;
        self.enqueue(call, callback)
    }

    pub fn load(
        &mut self,
        table: impl IntoTable,
        options: &LoadOptions,
        callback: impl FnOnce(Result<Job>) + Send + 'static,
    ) -> Result<()> {
        let configuration = options.to_configuration(self.client.table_reference(table));
        let call = self.client.insert_job_call(&configuration, options.job_id.clone())?;
        self.enqueue(call, callback)
    }

    pub fn extract<U: Into<String>>(
        &mut self,
        table: impl IntoTable,
        destination_uris: impl IntoIterator<Item = U>,
        options: &ExtractOptions,
        callback: impl FnOnce(Result<Job>) + Send + 'static,
    ) -> Result<()> {
        let uris = destination_uris.into_iter().map(Into::into).collect();
        let configuration = options.to_configuration(self.client.table_reference(table), uris);
        let call = self.client.insert_job_call(&configuration, options.job_id.clone())?;
        self.enqueue(call, callback)
    }

    pub fn copy(
        &mut self,
        source: impl IntoTable,
        destination: impl IntoTable,
        options: &CopyOptions,
        callback: impl FnOnce(Result<Job>) + Send + 'static,
    ) -> Result<()> {
        let configuration = options.to_configuration(
            vec![self.client.table_reference(source)],
            self.client.table_reference(destination),
        );
        let call = self.client.insert_job_call(&configuration, options.job_id.clone())?;
        self.enqueue(call, callback)
    }

    pub fn job(
        &mut self,
        job: impl IntoJob,
        callback: impl FnOnce(Result<Job>) + Send + 'static,
    ) -> Result<()> {
        let reference = self.client.job_reference(job);
        let call = self.client.job_call(&reference);
        self.enqueue(call, callback)
    }

    /// First page of jobs.
    pub fn jobs(
        &mut self,
        options: &ListJobsOptions,
        callback: impl FnOnce(Result<Page<Job>>) + Send + 'static,
    ) -> Result<()> {
        let call = self.client.jobs_page_call(options, None);
        self.enqueue(call, callback)
    }

    pub fn cancel_job(
        &mut self,
        job: impl IntoJob,
        callback: impl FnOnce(Result<Job>) + Send + 'static,
    ) -> Result<()> {
        let reference = self.client.job_reference(job);
        let call = self.client.cancel_job_call(&reference);
        self.enqueue(call, callback)
    }
}

impl std::fmt::Debug for WarehouseBatch<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarehouseBatch")
            .field("project_id", &self.client.project_id())
            .field("queued", &self.scope.len())
            .finish()
    }
}

/// Result of a batched call, available once the batch is flushed.
///
/// Pairs a callback (from [`Deferred::channel`]) with the receiving end. If
/// the callback is dropped without running, the result is
/// [`TabulaError::BatchAborted`].
#[derive(Debug)]
pub struct Deferred<T> {
    receiver: oneshot::Receiver<Result<T>>,
}

impl<T: Send + 'static> Deferred<T> {
    pub fn channel() -> (impl FnOnce(Result<T>) + Send + 'static, Self) {
        let (sender, receiver) = oneshot::channel();
        let callback = move |result: Result<T>| {
            // The receiver may already be gone; the result is then unwanted.
            let _ = sender.send(result);
        };
        (callback, Self { receiver })
    }

    /// The result if it has been delivered.
    pub fn try_take(&mut self) -> Option<Result<T>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(TabulaError::BatchAborted)),
        }
    }

    /// Wait for the result.
    pub async fn wait(self) -> Result<T> {
        self.receiver.await.unwrap_or(Err(TabulaError::BatchAborted))
    }
}
