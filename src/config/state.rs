// Application state module
// Immutable per-worker state shared by every connection

use super::types::{Config, EnvironmentProfile};
use crate::handler::Router;

/// Application state
///
/// Built once at worker startup and shared by reference; nothing in it
/// changes while requests are being served.
pub struct AppState {
    pub config: Config,
    pub profile: EnvironmentProfile,
    pub router: Router,
}

impl AppState {
    pub fn new(config: &Config, router: Router) -> Self {
        Self {
            profile: config.profile(),
            config: config.clone(),
            router,
        }
    }
}
