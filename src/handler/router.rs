//! Static route table
//!
//! Exact-match lookup from a normalized path to its handler. The table is
//! built once at startup and never modified afterwards.

use std::collections::HashMap;

use super::hello::{hello, not_found};
use super::Handler;

pub struct Router {
    routes: HashMap<&'static str, Handler>,
    fallback: Handler,
}

impl Router {
    /// Route table served by every worker
    pub fn new() -> Self {
        Self::with_routes([("hello", hello as Handler)])
    }

    /// Build a table from `(path, handler)` pairs, with `not_found` as fallback
    pub fn with_routes(routes: impl IntoIterator<Item = (&'static str, Handler)>) -> Self {
        Self {
            routes: routes.into_iter().collect(),
            fallback: not_found,
        }
    }

    /// Handler for `path`, or the not-found handler when nothing matches
    pub fn lookup(&self, path: &str) -> Handler {
        self.routes.get(path).copied().unwrap_or(self.fallback)
    }

    /// Registered paths, sorted
    pub fn paths(&self) -> Vec<&'static str> {
        let mut paths: Vec<_> = self.routes.keys().copied().collect();
        paths.sort_unstable();
        paths
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
