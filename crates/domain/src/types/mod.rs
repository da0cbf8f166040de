//! Domain types and models

pub mod job;
pub mod options;
pub mod page;
pub mod reference;
pub mod resource;

pub use job::{
    CopyConfiguration, CreateDisposition, DataFormat, ErrorProto, ExtractConfiguration, Job,
    JobConfiguration, JobKind, JobState, JobStatistics, JobStatus, LoadConfiguration, Priority,
    QueryConfiguration, QueryStatistics, UserDefinedFunctionResource, WriteDisposition,
};
pub use options::{
    CopyOptions, DatasetPatch, ExtractOptions, InsertOptions, ListJobsOptions, LoadOptions,
    Patch, QueryOptions, TableDataOptions, TableDefinition, TablePatch,
};
pub use page::Page;
pub use reference::{DatasetReference, JobReference, TableReference};
pub use resource::{Dataset, Table, TableData, TableFieldSchema, TableSchema, ViewDefinition};
