pub mod redis_cache;
pub mod service;

pub use redis_cache::{CacheConfig, RedisCache};
pub use service::{
    CacheError, CounterCache, DEFAULT_LOOKUP_TTL_SECS, counter_key, counter_key_pattern,
    lookup_key, short_code_from_counter_key,
};

#[cfg(test)]
pub use service::MockCounterCache;
