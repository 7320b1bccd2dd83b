// SPDX-License-Identifier: GPL-3.0-or-later

//! Second resolution stage: turn candidate ids into catalog file rows.

use cadence_domain::{Album, AlbumId, Artist, ArtistId, Candidate};
use cadence_infrastructure::{CatalogStore, FileFilter, FileRow};
use std::sync::Arc;
use tracing::debug;

use crate::error::ResolveResult;
use crate::registry::IdentityRegistry;

pub struct JoinStage<'a> {
    store: &'a dyn CatalogStore,
    registry: &'a IdentityRegistry,
}

impl<'a> JoinStage<'a> {
    pub fn new(store: &'a dyn CatalogStore, registry: &'a IdentityRegistry) -> Self {
        Self { store, registry }
    }

    /// Files whose artist and track are both among the candidates.
    ///
    /// Returns `None` without touching the store when either candidate set
    /// is empty.
    pub async fn exact(
        &self,
        artists: &[Candidate],
        tracks: &[Candidate],
    ) -> ResolveResult<Option<Vec<FileRow>>> {
        if artists.is_empty() || tracks.is_empty() {
            return Ok(None);
        }

        let filter = FileFilter::ArtistsAndTracks {
            artists: candidate_ids(artists),
            tracks: candidate_ids(tracks),
        };
        let rows = self.store.files_matching(&filter).await?;
        debug!(target: "resolver", rows = rows.len(), "exact join complete");
        Ok(Some(rows))
    }

    /// Files whose track is among the candidates. No track candidates means
    /// no rows, whatever artist or album hits there were.
    pub async fn full_text(&self, tracks: &[Candidate]) -> ResolveResult<Vec<FileRow>> {
        let rows = self
            .store
            .files_matching(&FileFilter::Tracks(candidate_ids(tracks)))
            .await?;
        debug!(target: "resolver", rows = rows.len(), "full-text join complete");
        Ok(rows)
    }

    /// Resolve artist candidates to shared artist objects, in candidate order.
    /// Ids that no longer exist in the catalog are skipped.
    pub async fn artist_suggestions(
        &self,
        candidates: &[Candidate],
    ) -> ResolveResult<Vec<Arc<Artist>>> {
        let mut artists = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let id = ArtistId(candidate.id);
            if let Some(name) = self.store.artist_name(id).await? {
                artists.push(self.registry.artist(id, &name));
            }
        }
        Ok(artists)
    }

    pub async fn album_suggestions(
        &self,
        candidates: &[Candidate],
    ) -> ResolveResult<Vec<Arc<Album>>> {
        let mut albums = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let id = AlbumId(candidate.id);
            if let Some(row) = self.store.album_with_artist(id).await? {
                let artist = self
                    .registry
                    .artist(ArtistId(row.artist_id), &row.artist_name);
                albums.push(self.registry.album(id, &row.album_name, artist));
            }
        }
        Ok(albums)
    }
}

/// Candidate ids in order, without repeats.
fn candidate_ids(candidates: &[Candidate]) -> Vec<u32> {
    let mut ids: Vec<u32> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !ids.contains(&candidate.id) {
            ids.push(candidate.id);
        }
    }
    ids
}
