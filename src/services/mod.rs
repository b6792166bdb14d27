//! Service modules for the upload pipeline
//!
//! `upload_manager` owns submission and queries; the services here do the
//! work that happens after a job has been handed off.

pub mod upload_executor;

pub use upload_executor::UploadExecutor;
