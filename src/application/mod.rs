//! Business logic orchestrating repositories, cache and queue.

pub mod services;
