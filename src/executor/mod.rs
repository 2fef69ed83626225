mod backend;
mod client;

pub use backend::{BackendError, ExecutionBackend, HttpExecutionBackend};
pub use client::{ExecutionClient, PollPolicy};
