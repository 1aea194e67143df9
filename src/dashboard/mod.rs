//! Cached access to the dashboard's financial resources
//!
//! Every resource goes through one [`QueryCache`], keyed by [`QueryKey`]
//! with the windows from [`CachePolicies`]. The cache belongs to one
//! session: when the session's credentials change (sign-in, sign-out,
//! forced expiry) it is emptied before the next read.

mod keys;

pub use keys::{CachePolicies, QueryKey, Resource, DEFAULT_RECENT_LIMIT};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::debug;

use crate::api::types::{FinancialSummary, ScheduledTransfer, Transaction, WalletCard, WorkingCapital};
use crate::api::ApiGateway;
use crate::auth::SessionEvent;
use crate::cache::{QueryCache, QueryObserver, QueryState};
use crate::core::error::FetchError;

#[derive(Clone)]
pub struct Dashboard {
    api: ApiGateway,
    cache: QueryCache<QueryKey, Resource>,
    policies: CachePolicies,
    /// Session epoch the cached entries belong to
    epoch: Arc<AtomicU64>,
}

impl Dashboard {
    pub fn new(api: ApiGateway, policies: CachePolicies) -> Self {
        let epoch = api.session().epoch();
        Self {
            api,
            cache: QueryCache::new(),
            policies,
            epoch: Arc::new(AtomicU64::new(epoch)),
        }
    }

    pub fn cache(&self) -> &QueryCache<QueryKey, Resource> {
        &self.cache
    }

    pub fn policies(&self) -> &CachePolicies {
        &self.policies
    }

    pub async fn summary(&self) -> QueryState<Arc<FinancialSummary>> {
        self.load(QueryKey::Summary)
            .await
            .map(Resource::into_summary)
    }

    pub async fn recent_transactions(&self, limit: usize) -> QueryState<Arc<Vec<Transaction>>> {
        self.load(QueryKey::RecentTransactions { limit })
            .await
            .map(Resource::into_transactions)
    }

    pub async fn working_capital(&self) -> QueryState<Arc<WorkingCapital>> {
        self.load(QueryKey::WorkingCapital)
            .await
            .map(Resource::into_working_capital)
    }

    pub async fn wallet_cards(&self) -> QueryState<Arc<Vec<WalletCard>>> {
        self.load(QueryKey::Wallet)
            .await
            .map(Resource::into_wallet)
    }

    pub async fn scheduled_transfers(&self) -> QueryState<Arc<Vec<ScheduledTransfer>>> {
        self.load(QueryKey::ScheduledTransfers)
            .await
            .map(Resource::into_transfers)
    }

    /// Keep `key` alive and receive its change notifications
    pub fn observe(&self, key: QueryKey) -> QueryObserver<QueryKey, Resource> {
        self.sync_session();
        self.cache.subscribe(key)
    }

    pub fn invalidate(&self, key: &QueryKey) -> bool {
        self.cache.invalidate(key)
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Drop everything cached for the current session
    pub fn reset(&self) {
        self.epoch
            .store(self.api.session().epoch(), Ordering::SeqCst);
        self.cache.clear();
    }

    /// Clear the cache as soon as the session signs out or expires, instead
    /// of waiting for the next read. Runs until the session is dropped.
    pub fn watch_session(&self) -> JoinHandle<()> {
        let dashboard = self.clone();
        let mut events = BroadcastStream::new(self.api.session().subscribe());

        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                match event {
                    Ok(SessionEvent::SignedOut)
                    | Ok(SessionEvent::Expired)
                    | Ok(SessionEvent::SignedIn { .. }) => {
                        debug!("Session changed, clearing dashboard cache");
                        dashboard.reset();
                    }
                    Ok(_) => {}
                    // Missed events: assume the worst
                    Err(_) => dashboard.sync_session(),
                }
            }
        })
    }

    async fn load(&self, key: QueryKey) -> QueryState<Resource> {
        self.sync_session();
        if !self.api.session().is_authenticated() {
            debug!(%key, "Not signed in, skipping fetch");
            return QueryState::failed(FetchError::Unauthorized { message: None });
        }

        let options = self.policies.for_key(&key);
        let api = self.api.clone();
        let fetch_key = key.clone();
        let fetcher = move || {
            let api = api.clone();
            let key = fetch_key.clone();
            async move { fetch_resource(&api, &key).await }
        };
        self.cache.get(key, fetcher, options).await
    }

    /// Entries cached under other credentials are never served
    fn sync_session(&self) {
        let current = self.api.session().epoch();
        let seen = self.epoch.swap(current, Ordering::SeqCst);
        if seen != current {
            debug!(seen, current, "Session epoch changed, clearing dashboard cache");
            self.cache.clear();
        }
    }
}

async fn fetch_resource(api: &ApiGateway, key: &QueryKey) -> Result<Resource, FetchError> {
    Ok(match key {
        QueryKey::Summary => Resource::Summary(Arc::new(api.summary().await?)),
        QueryKey::RecentTransactions { limit } => {
            Resource::Transactions(Arc::new(api.recent_transactions(*limit).await?))
        }
        QueryKey::WorkingCapital => Resource::WorkingCapital(Arc::new(api.working_capital().await?)),
        QueryKey::Wallet => Resource::Wallet(Arc::new(api.wallet_cards().await?)),
        QueryKey::ScheduledTransfers => {
            Resource::Transfers(Arc::new(api.scheduled_transfers().await?))
        }
    })
}
