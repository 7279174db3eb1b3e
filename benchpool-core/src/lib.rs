//! benchpool core - the shared submission store and the job bus
//!
//! Both concerns are traits so the dispatcher and worker can be handed a
//! Redis-backed implementation in production and an in-memory one in tests.

pub mod bus;
pub mod error;
pub mod memory;
pub mod redis_backend;
pub mod store;

pub use bus::{publish_message, run_consumer, JobBus, Subscription};
pub use error::{BusError, StoreError};
pub use memory::{MemoryBus, MemoryStore};
pub use redis_backend::{RedisBus, RedisConnection, RedisStore};
pub use store::SubmissionStore;
