// SPDX-License-Identifier: GPL-3.0-or-later

//! Runs resolve commands concurrently and routes each command's events back
//! to the caller that submitted the query.

pub mod error;
pub mod pending;
mod routes;

use cadence_application::Resolver;
use cadence_domain::Query;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, warn};

use routes::{RouteGuard, RouteTable};

pub use error::PipelineError;
pub use pending::{PendingQuery, Resolution};

/// Bounded executor for resolve commands.
pub struct ResolvePipeline {
    resolver: Arc<Resolver>,
    semaphore: Arc<Semaphore>,
    routes: Arc<RouteTable>,
    max_concurrent: usize,
}

impl ResolvePipeline {
    pub fn new(resolver: Arc<Resolver>, max_concurrent_commands: usize) -> Self {
        let max_concurrent = max_concurrent_commands.max(1);
        info!(target: "pipeline", max_concurrent, "starting resolve pipeline");
        Self {
            resolver,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            routes: Arc::new(RouteTable::default()),
            max_concurrent,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Queries whose commands have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.routes.len()
    }

    /// Spawn a resolve command for `query`. Must be called from inside a
    /// tokio runtime.
    ///
    /// Fails with [`PipelineError::AlreadyInFlight`] while an earlier
    /// submission of the same query is still running.
    pub fn submit(&self, query: Query) -> Result<PendingQuery, PipelineError> {
        let query_id = query.id();
        let (tx, rx) = mpsc::unbounded_channel();
        let Some(guard) = RouteGuard::register(Arc::clone(&self.routes), query_id, tx) else {
            warn!(target: "pipeline", %query_id, "query is already being resolved");
            return Err(PipelineError::AlreadyInFlight(query_id));
        };

        let resolver = Arc::clone(&self.resolver);
        let semaphore = Arc::clone(&self.semaphore);
        let routes = Arc::clone(&self.routes);

        let handle = tokio::spawn(async move {
            // Unregistering closes the caller's channel, even if the command panics.
            let _guard = guard;
            // The semaphore is never closed, so acquiring cannot fail.
            let _permit = semaphore.acquire_owned().await;

            debug!(target: "pipeline", %query_id, full_text = query.is_full_text(), "executing resolve command");
            match resolver.resolve(&query, routes.as_ref()).await {
                Ok(()) => {
                    debug!(target: "pipeline", %query_id, "resolve command completed");
                    Ok(())
                }
                Err(err) => {
                    error!(target: "pipeline", %query_id, error = %err, "resolve command failed");
                    Err(PipelineError::from(err))
                }
            }
        });

        Ok(PendingQuery::new(query_id, rx, handle))
    }

    /// Submit `query` and wait for everything it produces.
    pub async fn resolve(&self, query: Query) -> Result<Resolution, PipelineError> {
        self.submit(query)?.finish().await
    }
}
