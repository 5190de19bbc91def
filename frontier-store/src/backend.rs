pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use memory::InMemoryStore;
#[cfg(feature = "redis")]
pub use redis::RedisStore;
