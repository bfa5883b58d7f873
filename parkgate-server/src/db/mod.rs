//! Database layer - connection pool and boot-time schema sync

pub mod pool;
pub mod sync;

pub use pool::create_pool;
pub use sync::{load_migrator, synchronize, DbError, SyncReport};
