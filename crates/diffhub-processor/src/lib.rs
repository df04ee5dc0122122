//! Asynchronous comparison processing for diffhub.
//!
//! Requests are accepted synchronously by [`ComparisonService::submit`],
//! stored as `Pending`, and queued. Worker tasks claim each request
//! atomically, run the diff, store the outcome, and publish a completion
//! event on the request's channel.
//!
//! # Key Types
//!
//! - [`ComparisonService`] -- submit, poll, and list requests
//! - [`ComparisonProcessor`] / [`ProcessorHandle`] -- worker pool lifecycle
//! - [`WorkQueue`] -- FIFO of request ids, unbounded or bounded
//! - [`CompletionEvent`] -- payload published when a request finishes

pub mod config;
pub mod error;
pub mod event;
pub mod processor;
pub mod queue;
pub mod service;

pub use config::ProcessorConfig;
pub use error::{ProcessorError, ProcessorResult};
pub use event::CompletionEvent;
pub use processor::{ComparisonProcessor, ProcessorHandle};
pub use queue::WorkQueue;
pub use service::{ComparisonService, ComparisonView, SubmitRequest, SubmitResponse};
