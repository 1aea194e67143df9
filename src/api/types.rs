//! Wire types for the finboard REST API
//!
//! The backend wraps payloads in `{ "data": ... }`; the login response may or
//! may not be wrapped. Field names are camelCase on the wire.

use crate::chart::ChartDataPoint;
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// AUTH
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest<'a> {
    pub full_name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthPayload {
    user: Option<User>,
    access_token: Option<String>,
}

/// Login response, either `{user, accessToken}` or `{data: {user, accessToken}}`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(default)]
    data: Option<AuthPayload>,
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    access_token: Option<String>,
}

impl AuthResponse {
    /// Resolve the nested envelope first, then the flat fields
    pub fn into_parts(self) -> (Option<User>, Option<String>) {
        let nested = self.data.unwrap_or_default();
        let user = nested.user.or(self.user);
        let token = nested
            .access_token
            .or(self.access_token)
            .filter(|t| !t.is_empty());
        (user, token)
    }
}

/// Error body shape: `{ "message": "..." }`
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// FINANCIAL DATA
// =============================================================================

/// `{ "data": T }`
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub percentage: f64,
    pub trend: Trend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    #[serde(default)]
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub change: Option<Change>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSummary {
    pub total_balance: Balance,
    pub total_expense: Balance,
    pub total_savings: Balance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub business: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub date: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransactionList {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTransfer {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    pub date: String,
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransferList {
    #[serde(default)]
    pub transfers: Vec<ScheduledTransfer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletCard {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub card_number: String,
    pub bank: String,
    pub network: String,
    pub expiry_month: u32,
    pub expiry_year: u32,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct WalletList {
    #[serde(default)]
    pub cards: Vec<WalletCard>,
}

/// Working-capital time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingCapital {
    #[serde(default)]
    pub data: Vec<ChartDataPoint>,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Ids arrive as either strings or integers depending on the backend
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_response_nested_under_data() {
        let body = r#"{"data":{"user":{"id":7,"fullName":"A","email":"a@x.com"},"accessToken":"tok"}}"#;
        let (user, token) = serde_json::from_str::<AuthResponse>(body)
            .unwrap()
            .into_parts();
        assert_eq!(user.unwrap().id, "7");
        assert_eq!(token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_auth_response_flat() {
        let body = r#"{"user":{"fullName":"A"},"accessToken":"tok"}"#;
        let (user, token) = serde_json::from_str::<AuthResponse>(body)
            .unwrap()
            .into_parts();
        assert_eq!(user.unwrap().full_name, "A");
        assert_eq!(token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_auth_response_empty_token_is_absent() {
        let body = r#"{"user":{"fullName":"A"},"accessToken":""}"#;
        let (_, token) = serde_json::from_str::<AuthResponse>(body)
            .unwrap()
            .into_parts();
        assert!(token.is_none());
    }

    #[test]
    fn test_wallet_envelope_without_cards() {
        let list: Envelope<WalletList> = serde_json::from_str(r#"{"data":{}}"#).unwrap();
        assert!(list.data.cards.is_empty());
    }

    #[test]
    fn test_working_capital_defaults_currency() {
        let wc: Envelope<WorkingCapital> = serde_json::from_str(
            r#"{"data":{"data":[{"month":"Jan","income":1200,"expense":800}]}}"#,
        )
        .unwrap();
        assert_eq!(wc.data.currency, "USD");
        assert_eq!(wc.data.data[0].period_label, "Jan");
    }
}
