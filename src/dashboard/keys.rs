//! Cache keys, payloads and per-resource policies for the dashboard

use std::fmt;
use std::sync::Arc;

use crate::api::types::{FinancialSummary, ScheduledTransfer, Transaction, WalletCard, WorkingCapital};
use crate::cache::QueryOptions;
use crate::core::config::CacheConfig;

pub const DEFAULT_RECENT_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Summary,
    RecentTransactions { limit: usize },
    WorkingCapital,
    Wallet,
    ScheduledTransfers,
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::Summary => write!(f, "summary"),
            QueryKey::RecentTransactions { limit } => write!(f, "transactions/recent?limit={}", limit),
            QueryKey::WorkingCapital => write!(f, "working-capital"),
            QueryKey::Wallet => write!(f, "wallet"),
            QueryKey::ScheduledTransfers => write!(f, "transfers/scheduled"),
        }
    }
}

/// Cached payload. Wrapped in `Arc` so every reader shares one allocation.
#[derive(Debug, Clone)]
pub enum Resource {
    Summary(Arc<FinancialSummary>),
    Transactions(Arc<Vec<Transaction>>),
    WorkingCapital(Arc<WorkingCapital>),
    Wallet(Arc<Vec<WalletCard>>),
    Transfers(Arc<Vec<ScheduledTransfer>>),
}

impl Resource {
    pub fn into_summary(self) -> Option<Arc<FinancialSummary>> {
        match self {
            Resource::Summary(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_transactions(self) -> Option<Arc<Vec<Transaction>>> {
        match self {
            Resource::Transactions(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_working_capital(self) -> Option<Arc<WorkingCapital>> {
        match self {
            Resource::WorkingCapital(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_wallet(self) -> Option<Arc<Vec<WalletCard>>> {
        match self {
            Resource::Wallet(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_transfers(self) -> Option<Arc<Vec<ScheduledTransfer>>> {
        match self {
            Resource::Transfers(v) => Some(v),
            _ => None,
        }
    }
}

/// Stale/evict/retry windows per resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicies {
    pub summary: QueryOptions,
    pub recent_transactions: QueryOptions,
    pub working_capital: QueryOptions,
    pub wallet: QueryOptions,
    pub scheduled_transfers: QueryOptions,
}

impl CachePolicies {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            summary: config.summary.to_options(),
            recent_transactions: config.recent_transactions.to_options(),
            working_capital: config.working_capital.to_options(),
            wallet: config.wallet.to_options(),
            scheduled_transfers: config.scheduled_transfers.to_options(),
        }
    }

    pub fn for_key(&self, key: &QueryKey) -> QueryOptions {
        match key {
            QueryKey::Summary => self.summary,
            QueryKey::RecentTransactions { .. } => self.recent_transactions,
            QueryKey::WorkingCapital => self.working_capital,
            QueryKey::Wallet => self.wallet,
            QueryKey::ScheduledTransfers => self.scheduled_transfers,
        }
    }
}

impl Default for CachePolicies {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
