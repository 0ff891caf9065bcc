//! Background re-validation of listed PWAs.

mod queue;
mod worker;

pub use queue::TaskQueue;
pub use worker::TaskWorkerHandle;
