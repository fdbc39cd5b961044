//! Runtime core: registry, synchronization and worker lifecycle.
//!
//! The public API from this module is [`Scheduler`] (with its builder), the
//! admission acknowledgement [`Ack`] and the [`Snapshot`] views.
//!
//! Internal modules:
//! - [`registry`]: ordered alarm registry (insert / find_by / remove_by);
//! - [`sync`]: reader/writer access to the registry plus wake signals;
//! - [`admission`]: validated insertion of requests;
//! - [`workers`]: worker handle table keyed by type, orphan list;
//! - [`dispatcher`]: processes fresh entries, spawns and retires workers;
//! - [`display`]: per-type display worker protocol;
//! - [`scheduler`]: facade, shutdown;
//! - [`shutdown`]: cross-platform termination signals.

mod admission;
mod builder;
mod dispatcher;
mod display;
mod registry;
mod scheduler;
mod shared;
mod shutdown;
mod snapshot;
mod sync;
mod workers;

#[cfg(test)]
mod tests;

pub use admission::Ack;
pub use builder::SchedulerBuilder;
pub use scheduler::Scheduler;
pub use snapshot::{EntryView, Snapshot, WorkerView};
pub use workers::WorkerState;
