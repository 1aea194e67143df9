//! REST access for the dashboard backend
//!
//! `ApiGateway` is the only path to the network. It attaches the session's
//! bearer token and turns unauthorized responses into forced expiry.

mod endpoints;
mod gateway;
mod navigator;
pub mod types;

pub use endpoints::{
    RECENT_TRANSACTIONS_PATH, SCHEDULED_TRANSFERS_PATH, SUMMARY_PATH, WALLET_PATH,
    WORKING_CAPITAL_PATH,
};
pub use gateway::{is_auth_endpoint, ApiGateway, LOGIN_PATH, LOGOUT_PATH, REGISTER_PATH};
pub use navigator::{HistoryNavigator, Navigator};
