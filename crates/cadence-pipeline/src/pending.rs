// SPDX-License-Identifier: GPL-3.0-or-later
use cadence_application::ResolveEvent;
use cadence_domain::{Album, Artist, QueryId, TrackResult};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use crate::error::PipelineError;

/// Everything one query produced, gathered from its events.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub results: Vec<TrackResult>,
    pub artists: Vec<Arc<Artist>>,
    pub albums: Vec<Arc<Album>>,
}

impl Resolution {
    pub fn absorb(&mut self, event: ResolveEvent) {
        match event {
            ResolveEvent::Results { results, .. } => self.results.extend(results),
            ResolveEvent::Artists { artists, .. } => self.artists.extend(artists),
            ResolveEvent::Albums { albums, .. } => self.albums.extend(albums),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty() && self.artists.is_empty() && self.albums.is_empty()
    }
}

/// A submitted query whose command may still be running.
#[derive(Debug)]
pub struct PendingQuery {
    query_id: QueryId,
    events: UnboundedReceiver<ResolveEvent>,
    handle: JoinHandle<Result<(), PipelineError>>,
}

impl PendingQuery {
    pub(crate) fn new(
        query_id: QueryId,
        events: UnboundedReceiver<ResolveEvent>,
        handle: JoinHandle<Result<(), PipelineError>>,
    ) -> Self {
        Self {
            query_id,
            events,
            handle,
        }
    }

    pub fn query_id(&self) -> QueryId {
        self.query_id
    }

    /// Next event for this query, or `None` once the command has finished.
    pub async fn recv(&mut self) -> Option<ResolveEvent> {
        self.events.recv().await
    }

    /// Wait for the command and collect whatever events were not received yet.
    pub async fn finish(mut self) -> Result<Resolution, PipelineError> {
        let mut resolution = Resolution::default();
        while let Some(event) = self.events.recv().await {
            resolution.absorb(event);
        }
        self.handle.await??;
        Ok(resolution)
    }
}
