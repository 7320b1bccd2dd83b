// SPDX-License-Identifier: GPL-3.0-or-later
use cadence_domain::{AlbumId, ArtistId, Locator, TrackId, TrackResult};
use cadence_infrastructure::{CatalogStore, FileRow};
use chrono::DateTime;
use std::sync::Arc;
use tracing::warn;

use crate::error::ResolveResult;
use crate::registry::IdentityRegistry;
use crate::sources::SourceRegistry;

/// Builds playable results from joined catalog rows.
pub struct ResultAssembler<'a> {
    store: &'a dyn CatalogStore,
    sources: &'a dyn SourceRegistry,
    registry: &'a IdentityRegistry,
}

impl<'a> ResultAssembler<'a> {
    pub fn new(
        store: &'a dyn CatalogStore,
        sources: &'a dyn SourceRegistry,
        registry: &'a IdentityRegistry,
    ) -> Self {
        Self {
            store,
            sources,
            registry,
        }
    }

    /// Assemble one row. `Ok(None)` when the row's source is unknown.
    pub async fn assemble(&self, row: FileRow) -> ResolveResult<Option<TrackResult>> {
        let source_id = row.source();
        let source = if source_id.is_local() {
            self.sources.local()
        } else {
            match self.sources.get(source_id) {
                Some(source) => source,
                None => {
                    warn!(target: "resolver", %source_id, url = %row.url, "could not find source, skipping row");
                    return Ok(None);
                }
            }
        };

        let locator = if source.is_local() {
            Locator::Local(row.url)
        } else {
            Locator::remote(source.user_name(), row.url)
        };

        let artist = self
            .registry
            .artist(ArtistId(row.artist_id), &row.artist_name);
        let album = row.album_id.map(|id| {
            self.registry.album(
                AlbumId(id),
                row.album_name.as_deref().unwrap_or_default(),
                Arc::clone(&artist),
            )
        });
        let composer = row.composer_id.map(|id| {
            self.registry
                .artist(ArtistId(id), row.composer_name.as_deref().unwrap_or_default())
        });

        let track_id = TrackId(row.track_id);
        let mut result = TrackResult::new(
            locator,
            track_id,
            row.track_name,
            artist,
            Arc::clone(source.collection()),
        );
        result.modification_time = DateTime::from_timestamp(row.mtime, 0);
        result.size = u64::try_from(row.size).unwrap_or_default();
        result.mimetype = row.mimetype.unwrap_or_default();
        result.duration = to_u32(row.duration);
        result.bitrate = to_u32(row.bitrate);
        result.disc_number = row.disc_number.map(to_u32).unwrap_or_default();
        result.album_position = row.album_position.map(to_u32).unwrap_or_default();
        result.album = album;
        result.composer = composer;
        result.attributes = self.store.track_attributes(track_id).await?;

        Ok(Some(result))
    }

    /// Assemble every row, dropping rows whose source cannot be resolved.
    pub async fn assemble_all(&self, rows: Vec<FileRow>) -> ResolveResult<Vec<TrackResult>> {
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(result) = self.assemble(row).await? {
                results.push(result);
            }
        }
        Ok(results)
    }
}

fn to_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}
