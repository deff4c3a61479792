//! Supervised lint worker process.
//!
//! [`WorkerSupervisor`] keeps one worker process alive, restarts it after a
//! cooldown when it dies, and correlates concurrent requests with the
//! worker's out-of-order replies.

pub mod codec;
pub mod protocol;
pub mod types;

mod error;
mod job;
pub(crate) mod process;
mod supervisor;

pub use error::JobError;
pub use job::RequestJob;
pub use supervisor::WorkerSupervisor;
pub use types::{ExitReason, SupervisorEvent, SupervisorState, WorkerConfig};
