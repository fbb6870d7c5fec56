//! Fire-and-forget job subsystem.
//!
//! # Data Flow
//! ```text
//! POST /api/chat/polling
//!     → machine.rs (record job, drive it in the background)
//!     → store.rs / rest.rs (best-effort persistence)
//!
//! GET /api/jobs/{id}
//!     → store.rs (read the record back)
//! ```
//!
//! # Design Decisions
//! - The store is a trait object so tests and deployments pick a backend
//! - The machine only writes; reads serve the polling endpoint alone
//! - Status moves forward only: processing → complete | error

pub mod machine;
pub mod rest;
pub mod store;
pub mod types;

pub use machine::{JobStateMachine, JobTicket};
pub use rest::RestJobStore;
pub use store::{build_store, JobStore, MemoryJobStore};
pub use types::{
    Job, JobError, JobId, JobRecord, JobResult, JobStatus, JobStoreError, JobStoreResult, JobUpdate, NewJob,
};
