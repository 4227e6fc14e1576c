//! Infrastructure adapters: counter cache, message queue, persistence.

pub mod cache;
pub mod persistence;
pub mod queue;
