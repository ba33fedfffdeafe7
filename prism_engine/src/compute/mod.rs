/// Async compute: queue ownership transfer and dispatch recording

pub mod queue_transfer;

pub use queue_transfer::*;
