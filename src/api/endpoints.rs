//! Typed calls for each REST endpoint the dashboard consumes

use crate::api::gateway::{ApiGateway, LOGIN_PATH, LOGOUT_PATH, REGISTER_PATH};
use crate::api::types::{
    AuthResponse, Envelope, FinancialSummary, LoginRequest, RegisterRequest, ScheduledTransfer,
    Transaction, TransactionList, TransferList, WalletCard, WalletList, WorkingCapital,
};
use crate::core::error::FetchError;

pub const SUMMARY_PATH: &str = "/financial/summary";
pub const RECENT_TRANSACTIONS_PATH: &str = "/financial/transactions/recent";
pub const WORKING_CAPITAL_PATH: &str = "/financial/working-capital";
pub const WALLET_PATH: &str = "/financial/wallet";
pub const SCHEDULED_TRANSFERS_PATH: &str = "/financial/transfers/scheduled";

type FetchResult<T> = Result<T, FetchError>;

impl ApiGateway {
    // =========================================================================
    // AUTH
    // =========================================================================

    pub async fn login(&self, email: &str, password: &str) -> FetchResult<AuthResponse> {
        self.post(LOGIN_PATH, &LoginRequest { email, password }).await
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> FetchResult<()> {
        let body = RegisterRequest {
            full_name: name,
            email,
            password,
        };
        self.post_unit(REGISTER_PATH, &body).await
    }

    pub async fn logout(&self, token: Option<String>) -> FetchResult<()> {
        self.post_with_token(LOGOUT_PATH, token).await
    }

    // =========================================================================
    // FINANCIAL DATA
    // =========================================================================

    pub async fn summary(&self) -> FetchResult<FinancialSummary> {
        let envelope: Envelope<FinancialSummary> = self.get(SUMMARY_PATH, &[]).await?;
        Ok(envelope.data)
    }

    /// Most recent first
    pub async fn recent_transactions(&self, limit: usize) -> FetchResult<Vec<Transaction>> {
        let envelope: Envelope<TransactionList> = self
            .get(RECENT_TRANSACTIONS_PATH, &[("limit", limit.to_string())])
            .await?;
        Ok(envelope.data.transactions)
    }

    pub async fn working_capital(&self) -> FetchResult<WorkingCapital> {
        let envelope: Envelope<WorkingCapital> = self.get(WORKING_CAPITAL_PATH, &[]).await?;
        let mut capital = envelope.data;
        for point in &mut capital.data {
            point.sanitize();
        }
        Ok(capital)
    }

    pub async fn wallet_cards(&self) -> FetchResult<Vec<WalletCard>> {
        let envelope: Envelope<Option<WalletList>> = self.get(WALLET_PATH, &[]).await?;
        Ok(envelope.data.map(|w| w.cards).unwrap_or_default())
    }

    pub async fn scheduled_transfers(&self) -> FetchResult<Vec<ScheduledTransfer>> {
        let envelope: Envelope<TransferList> = self.get(SCHEDULED_TRANSFERS_PATH, &[]).await?;
        Ok(envelope.data.transfers)
    }
}
