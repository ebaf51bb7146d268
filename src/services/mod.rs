pub mod classifier;
pub mod notifier;
pub mod storage;
pub mod worker_pool;
