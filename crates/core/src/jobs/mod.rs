//! Job lifecycle: submit, poll, cancel, wait, list.

pub mod controller;

pub use controller::{effective_poll_interval, job_outcome, JobController};
