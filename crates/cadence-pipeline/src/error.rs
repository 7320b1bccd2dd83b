// SPDX-License-Identifier: GPL-3.0-or-later
use cadence_application::ResolveError;
use cadence_domain::QueryId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("query {0} is already being resolved")]
    AlreadyInFlight(QueryId),

    #[error("resolve task did not complete: {0}")]
    Join(#[from] tokio::task::JoinError),
}
