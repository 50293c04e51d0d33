mod runner;

pub use runner::{ConsumerError, ConsumerRunner, RunSummary, StopReason};
