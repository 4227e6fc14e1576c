pub mod redis_queue;
pub mod service;

pub use redis_queue::{QueueConfig, RedisStreamQueue};
pub use service::{Delivery, QueueError, VISITS_QUEUE, VisitQueue};

#[cfg(test)]
pub use service::MockVisitQueue;
