//! finboard - client core for a financial dashboard
//!
//! Session lifecycle, authenticated REST access, a query cache with
//! request coalescing and stale-while-revalidate, and the chart
//! interaction logic the dashboard views are built on.

pub mod api;
pub mod auth;
pub mod cache;
pub mod chart;
pub mod cli;
pub mod core;
pub mod dashboard;
pub mod format;
pub mod output;

pub use api::ApiGateway;
pub use auth::{SessionState, SessionStore};
pub use cache::{QueryCache, QueryOptions, QueryState, QueryStatus};
pub use core::config::Config;
pub use core::error::{Error, Result};
pub use dashboard::Dashboard;
