//! Warehouse client facade
//!
//! [`WarehouseClient`] is the project-scoped entry point: resource CRUD,
//! table data, jobs, and batching. Each operation is defined once as a
//! [`PreparedCall`] builder so the direct methods and the batch methods share
//! request shape and result mapping.
//!
//! ```no_run
//! # async fn demo() -> tabula_domain::Result<()> {
//! use tabula_infra::WarehouseClient;
//!
//! let client = WarehouseClient::from_env()?;
//! let table = client.table(("samples", "shakespeare")).await?;
//! # let _ = table;
//! # Ok(())
//! # }
//! ```

mod batch;
mod call;
mod datasets;
mod jobs;
mod rows;
mod tabledata;
mod tables;
mod target;

use std::sync::Arc;

use tabula_core::{
    AccessTokenProvider, ApiExecutor, ApiRoutes, JobController, Multiplexer, Paginator, Transport,
};
use tabula_domain::{Config, Result};
use tracing::debug;

pub use batch::{Deferred, WarehouseBatch};
pub use call::PreparedCall;
pub use rows::decode_table_data;
pub use target::{IntoDataset, IntoJob, IntoTable};

use crate::auth::EnvTokenProvider;
use crate::http::HttpTransport;

/// Client for one default project.
///
/// Cheap to share behind an `Arc`; all methods take `&self`. At most one
/// batch may be open at a time.
pub struct WarehouseClient {
    config: Config,
    executor: ApiExecutor,
    routes: ApiRoutes,
    paginator: Paginator,
    jobs: JobController,
    multiplexer: Multiplexer,
}

impl WarehouseClient {
    /// Build a client over any transport (a test double, a custom stack).
    pub fn new(config: Config, transport: Arc<dyn Transport>) -> Self {
        let executor = ApiExecutor::new(Arc::clone(&transport));
        let routes = ApiRoutes::new(config.api.api_prefix.clone());
        let paginator = Paginator::new(config.pagination.max_pages);
        let jobs = JobController::new(executor.clone(), routes.clone(), config.jobs.poll_interval());
        let multiplexer = Multiplexer::new(transport, config.api.batch_path.clone());

        debug!(project = %config.project_id, base_url = %config.api.base_url, "warehouse client created");
        Self { config, executor, routes, paginator, jobs, multiplexer }
    }

    /// Build a client that talks HTTP to `config.api.base_url`.
    pub fn from_config(config: Config, auth: Arc<dyn AccessTokenProvider>) -> Result<Self> {
        let transport = HttpTransport::from_config(&config.api, auth)?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    /// Load configuration with [`crate::config::load`] and read the token
    /// from `TABULA_ACCESS_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let config = crate::config::load()?;
        Self::from_config(config, Arc::new(EnvTokenProvider::default()))
    }

    pub fn project_id(&self) -> &str {
        &self.config.project_id
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Whether a batch scope is currently open.
    pub fn is_batching(&self) -> bool {
        self.multiplexer.is_active()
    }

    async fn run<T: 'static>(&self, call: PreparedCall<T>) -> Result<T> {
        let (request, outcome) = call.into_parts();
        outcome(self.executor.call(request).await)
    }
}

impl std::fmt::Debug for WarehouseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarehouseClient")
            .field("project_id", &self.config.project_id)
            .field("base_url", &self.config.api.base_url)
            .field("batching", &self.multiplexer.is_active())
            .finish_non_exhaustive()
    }
}
