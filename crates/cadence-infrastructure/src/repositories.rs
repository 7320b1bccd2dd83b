// SPDX-License-Identifier: GPL-3.0-or-later
use anyhow::Result;
use cadence_domain::{AlbumId, ArtistId, Candidate, EntityKind, SourceId, TrackId};
use std::collections::BTreeMap;

// ============================================================================
// Rows
// ============================================================================

/// One catalog file joined with its artist, track, album and composer.
///
/// Album and composer come from outer joins and are absent when the file has
/// neither.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct FileRow {
    pub url: String,
    pub mtime: i64,
    pub size: i64,
    pub md5: Option<String>,
    pub mimetype: Option<String>,
    pub duration: i64,
    pub bitrate: i64,
    pub artist_id: u32,
    pub artist_name: String,
    pub album_id: Option<u32>,
    pub album_name: Option<String>,
    pub track_id: u32,
    pub track_name: String,
    pub composer_id: Option<u32>,
    pub composer_name: Option<String>,
    pub disc_number: Option<i64>,
    pub album_position: Option<i64>,
    /// NULL for files owned by the local collection.
    pub source_id: Option<u32>,
}

impl FileRow {
    pub fn source(&self) -> SourceId {
        SourceId(self.source_id.unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct AlbumRow {
    pub album_name: String,
    pub artist_id: u32,
    pub artist_name: String,
}

/// Restriction applied to the joined file query.
#[derive(Debug, Clone, PartialEq)]
pub enum FileFilter {
    /// Files whose artist and track are both in the given sets.
    ArtistsAndTracks { artists: Vec<u32>, tracks: Vec<u32> },
    /// Files whose track is in the given set. An empty set matches nothing.
    Tracks(Vec<u32>),
    /// The file a source serves under `url`.
    Location { source: SourceId, url: String },
}

/// A file to add to the catalog, with its names resolved or created on insert.
#[derive(Debug, Clone, Default)]
pub struct NewCatalogFile {
    pub source: SourceId,
    pub url: String,
    pub size: i64,
    pub mtime: i64,
    pub md5: Option<String>,
    pub mimetype: Option<String>,
    pub duration: i64,
    pub bitrate: i64,
    pub artist: String,
    pub track: String,
    pub album: Option<String>,
    pub composer: Option<String>,
    pub album_position: Option<i64>,
    pub disc_number: Option<i64>,
    pub attributes: BTreeMap<String, String>,
}

// ============================================================================
// Catalog Store
// ============================================================================

/// Storage capabilities the resolver depends on.
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    /// Scored search over one entity table, best match first.
    ///
    /// Blank text yields no candidates. `limit` of `None` is unbounded.
    async fn search_table(
        &self,
        kind: EntityKind,
        text: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Candidate>>;

    /// Joined file rows matching `filter`.
    async fn files_matching(&self, filter: &FileFilter) -> Result<Vec<FileRow>>;

    /// Key/value attributes recorded for a track.
    async fn track_attributes(&self, track_id: TrackId) -> Result<BTreeMap<String, String>>;

    async fn artist_name(&self, id: ArtistId) -> Result<Option<String>>;

    async fn album_with_artist(&self, id: AlbumId) -> Result<Option<AlbumRow>>;

    /// Look up an artist by name, inserting a row when `auto_create` is set.
    async fn artist_id(&self, name: &str, auto_create: bool) -> Result<Option<ArtistId>>;

    async fn album_id(
        &self,
        artist: ArtistId,
        name: &str,
        auto_create: bool,
    ) -> Result<Option<AlbumId>>;
}
