// SPDX-License-Identifier: GPL-3.0-or-later

//! Two-stage track resolution.
//!
//! Stage 1 asks the catalog's scored search for artist, track and album
//! candidates. Stage 2 joins the candidates against the file catalog and
//! assembles playable results. A query carrying a result hint skips both
//! stages when the hinted file is still reachable.

use cadence_config::ResolverConfig;
use cadence_domain::{EntityKind, Locator, Query, QueryTerms, TrackResult};
use cadence_infrastructure::{CatalogStore, FileFilter};
use std::sync::Arc;
use tracing::{debug, info};

use crate::assembler::ResultAssembler;
use crate::error::ResolveResult;
use crate::events::{ResolveEvent, ResolveEventSink};
use crate::join::JoinStage;
use crate::registry::IdentityRegistry;
use crate::sources::SourceRegistry;

/// Resolves queries against one catalog.
pub struct Resolver {
    store: Arc<dyn CatalogStore>,
    sources: Arc<dyn SourceRegistry>,
    registry: Arc<IdentityRegistry>,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        sources: Arc<dyn SourceRegistry>,
        registry: Arc<IdentityRegistry>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            store,
            sources,
            registry,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<IdentityRegistry> {
        &self.registry
    }

    pub fn sources(&self) -> &Arc<dyn SourceRegistry> {
        &self.sources
    }

    /// Resolve `query` and publish its events to `sink`.
    ///
    /// Events are only published once the whole command has succeeded; on a
    /// storage failure nothing reaches the sink.
    pub async fn resolve(&self, query: &Query, sink: &dyn ResolveEventSink) -> ResolveResult<()> {
        let events = self.run(query).await?;
        for event in events {
            sink.publish(event);
        }
        Ok(())
    }

    /// Resolve `query`, returning its events in emission order.
    pub async fn run(&self, query: &Query) -> ResolveResult<Vec<ResolveEvent>> {
        if let Some(hint) = query.result_hint() {
            debug!(target: "resolver", query_id = %query.id(), hint, "using result hint to speed up resolving");
            if let Some(result) = self.result_from_hint(hint).await? {
                if is_reachable(&result) {
                    return Ok(vec![ResolveEvent::Results {
                        query_id: query.id(),
                        results: vec![result],
                    }]);
                }
                debug!(target: "resolver", query_id = %query.id(), "hinted source is offline, resolving normally");
            }
        }

        match query.terms() {
            QueryTerms::Fields { .. } => self.resolve_fields(query).await,
            QueryTerms::FullText(text) => self.resolve_full_text(query, text).await,
        }
    }

    /// Look up the file a hint points at, whether or not its source is online.
    pub async fn result_from_hint(&self, hint: &str) -> ResolveResult<Option<TrackResult>> {
        let locator: Locator = match hint.parse() {
            Ok(locator) => locator,
            Err(err) => {
                debug!(target: "resolver", hint, error = %err, "ignoring malformed result hint");
                return Ok(None);
            }
        };

        let source = match &locator {
            Locator::Local(_) => Some(self.sources.local()),
            Locator::Remote { user_name, .. } => self.sources.get_by_user_name(user_name),
        };
        let Some(source) = source else {
            return Ok(None);
        };

        let rows = self
            .store
            .files_matching(&FileFilter::Location {
                source: source.id(),
                url: locator.path().to_string(),
            })
            .await?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };

        self.assembler().assemble(row).await
    }

    async fn resolve_fields(&self, query: &Query) -> ResolveResult<Vec<ResolveEvent>> {
        let limit = self.config.exact_candidate_limit;

        // STEP 1
        let artists = self
            .store
            .search_table(EntityKind::Artist, query.artist(), limit)
            .await?;
        let tracks = self
            .store
            .search_table(EntityKind::Track, query.track(), limit)
            .await?;
        let albums = self
            .store
            .search_table(EntityKind::Album, query.album(), limit)
            .await?;
        debug!(
            target: "resolver",
            query_id = %query.id(),
            artists = artists.len(),
            tracks = tracks.len(),
            albums = albums.len(),
            "first pass complete"
        );

        // STEP 2
        let Some(rows) = self.join_stage().exact(&artists, &tracks).await? else {
            debug!(
                target: "resolver",
                query_id = %query.id(),
                artist = query.artist(),
                track = query.track(),
                "no candidates found in first pass, aborting resolve"
            );
            return Ok(vec![ResolveEvent::Results {
                query_id: query.id(),
                results: Vec::new(),
            }]);
        };

        let results = self.assembler().assemble_all(rows).await?;
        info!(target: "resolver", query_id = %query.id(), results = results.len(), "resolved field query");
        Ok(vec![ResolveEvent::Results {
            query_id: query.id(),
            results,
        }])
    }

    async fn resolve_full_text(
        &self,
        query: &Query,
        text: &str,
    ) -> ResolveResult<Vec<ResolveEvent>> {
        let limit = Some(self.config.full_text_candidate_limit);
        let mut events = Vec::new();

        // STEP 1
        let artists = self
            .store
            .search_table(EntityKind::Artist, text, limit)
            .await?;
        let tracks = self
            .store
            .search_table(EntityKind::Track, text, limit)
            .await?;
        let albums = self
            .store
            .search_table(EntityKind::Album, text, limit)
            .await?;

        let join = self.join_stage();
        if !artists.is_empty() {
            events.push(ResolveEvent::Artists {
                query_id: query.id(),
                artists: join.artist_suggestions(&artists).await?,
            });
        }
        if !albums.is_empty() {
            events.push(ResolveEvent::Albums {
                query_id: query.id(),
                albums: join.album_suggestions(&albums).await?,
            });
        }

        if artists.is_empty() && tracks.is_empty() && albums.is_empty() {
            debug!(target: "resolver", query_id = %query.id(), text, "no candidates found in first pass, aborting resolve");
            events.push(ResolveEvent::Results {
                query_id: query.id(),
                results: Vec::new(),
            });
            return Ok(events);
        }

        // STEP 2
        let rows = join.full_text(&tracks).await?;
        let mut results = self.assembler().assemble_all(rows).await?;
        for result in &mut results {
            // First match wins if the search ever repeats a track id.
            if let Some(candidate) = tracks.iter().find(|c| c.id == result.track_id.0) {
                result.set_score(candidate.score);
            }
        }

        info!(target: "resolver", query_id = %query.id(), results = results.len(), "resolved full-text query");
        events.push(ResolveEvent::Results {
            query_id: query.id(),
            results,
        });
        Ok(events)
    }

    fn join_stage(&self) -> JoinStage<'_> {
        JoinStage::new(self.store.as_ref(), self.registry.as_ref())
    }

    fn assembler(&self) -> ResultAssembler<'_> {
        ResultAssembler::new(
            self.store.as_ref(),
            self.sources.as_ref(),
            self.registry.as_ref(),
        )
    }
}

/// A hinted result is trusted only while its source is alive and online.
fn is_reachable(result: &TrackResult) -> bool {
    result.source().is_some_and(|source| source.is_online())
}
