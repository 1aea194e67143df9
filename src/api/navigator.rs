//! Redirect hook for the presentation layer
//!
//! The gateway does not know how views are rendered; it only asks the active
//! navigator to show a route (the sign-in entry point after forced expiry).

use parking_lot::Mutex;
use tracing::info;

pub trait Navigator: Send + Sync {
    fn redirect(&self, route: &str);
}

/// Records every redirect so a caller can react after the fact
#[derive(Debug, Default)]
pub struct HistoryNavigator {
    routes: Mutex<Vec<String>>,
}

impl HistoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes requested so far, oldest first
    pub fn history(&self) -> Vec<String> {
        self.routes.lock().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.routes.lock().last().cloned()
    }

    /// Drain the recorded routes
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.routes.lock())
    }
}

impl Navigator for HistoryNavigator {
    fn redirect(&self, route: &str) {
        info!(route, "Redirect requested");
        self.routes.lock().push(route.to_string());
    }
}
