//! Query cache: coalesced fetches, stale-while-revalidate, retry and
//! idle eviction for keyed remote resources

mod events;
mod options;
mod query_cache;

pub use events::{CacheEvent, CacheEvents};
pub use options::{QueryOptions, MAX_RETRY_DELAY};
pub use query_cache::{Fetcher, QueryCache, QueryObserver, QueryState, QueryStatus};
