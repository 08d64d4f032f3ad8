mod pools;
mod task;

pub use pools::{FetchPools, Pool, PoolBudgets, PoolPermit, PoolSnapshot};
pub use task::spawn_logged;
