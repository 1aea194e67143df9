//! Wiring shared by every command

use std::path::PathBuf;
use std::sync::Arc;

use crate::api::{ApiGateway, HistoryNavigator};
use crate::auth::{FileCredentialStore, SessionState, SessionStore};
use crate::cache::QueryState;
use crate::core::config::Config;
use crate::core::error::{AuthError, Result};
use crate::dashboard::{CachePolicies, Dashboard};

/// Session, gateway and dashboard built from the on-disk config
pub struct AppContext {
    pub config: Config,
    pub session: SessionStore,
    pub dashboard: Dashboard,
    navigator: Arc<HistoryNavigator>,
}

impl AppContext {
    pub fn load() -> Result<Self> {
        let config = Config::load()?;
        Config::ensure_home()?;
        Self::with_config(config, Config::credentials_path()?)
    }

    pub fn with_config(config: Config, credentials_path: PathBuf) -> Result<Self> {
        let storage = Arc::new(FileCredentialStore::new(credentials_path));
        let state = Arc::new(SessionState::new(storage));
        state.restore_from_storage();

        let navigator = Arc::new(HistoryNavigator::new());
        let api = ApiGateway::new(&config.api, state, navigator.clone())?;
        let session = SessionStore::new(api.clone());
        let dashboard = Dashboard::new(api, CachePolicies::from_config(&config.cache));

        Ok(Self {
            config,
            session,
            dashboard,
            navigator,
        })
    }

    /// Turn a query result into its value. A redirect to sign-in during the
    /// request, or reading while signed out, becomes `SessionExpired`.
    pub fn resolve<T>(&self, state: QueryState<T>) -> Result<T> {
        if !self.navigator.take().is_empty() || !self.session.state().is_authenticated() {
            return Err(AuthError::SessionExpired.into());
        }
        Ok(state.into_result()?)
    }
}
