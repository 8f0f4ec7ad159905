// TabSync sync core
// The debounced snapshot writer, the command queue protocol, the device
// registry and the engine that ties them to one device identity.

pub mod commands;
pub mod debounce;
pub mod engine;
pub mod registry;
pub mod snapshot;

pub use commands::{enqueue_command, CommandListener, CommandOutcome};
pub use engine::SyncEngine;
pub use snapshot::SnapshotOutcome;
