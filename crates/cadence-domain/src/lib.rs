// SPDX-License-Identifier: GPL-3.0-or-later
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

mod locator;

pub use locator::{Locator, LocatorError, SERVENT_SCHEME};

// ============================================================================
// Value Objects & IDs
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ArtistId(pub u32);

impl ArtistId {
    /// Transient artists have not been persisted and are never cached.
    pub fn is_transient(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for ArtistId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct AlbumId(pub u32);

impl AlbumId {
    pub fn is_transient(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for AlbumId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct TrackId(pub u32);

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct SourceId(pub u32);

impl SourceId {
    /// Source id 0 always denotes the local machine.
    pub const LOCAL: SourceId = SourceId(0);

    pub fn is_local(&self) -> bool {
        *self == Self::LOCAL
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryId(pub Uuid);

impl QueryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for QueryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for QueryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Enums
// ============================================================================

/// Catalog tables that carry a scored search index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Artist,
    Track,
    Album,
}

impl EntityKind {
    pub fn table(&self) -> &'static str {
        match self {
            Self::Artist => "artist",
            Self::Track => "track",
            Self::Album => "album",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

/// An (identifier, similarity) pair produced by the search stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: u32,
    pub score: f32,
}

impl Candidate {
    pub fn new(id: u32, score: f32) -> Self {
        Self { id, score }
    }
}

// ============================================================================
// Sort names
// ============================================================================

/// Normalise a display name into the key used for sorting and fuzzy lookup.
///
/// Applies NFKC folding, lowercases, trims and collapses runs of whitespace.
/// With `strip_article`, a leading "the " is removed.
pub fn sortname(name: &str, strip_article: bool) -> String {
    let folded = name.nfkc().collect::<String>().to_lowercase();
    let collapsed = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    if strip_article {
        if let Some(rest) = collapsed.strip_prefix("the ") {
            return rest.to_string();
        }
    }
    collapsed
}

// ============================================================================
// Playlist interfaces
// ============================================================================

/// Track list attached to an artist or album. The variant is fixed by the
/// owning entity's kind when the interface is first requested.
#[derive(Debug)]
pub enum PlaylistInterface {
    Artist(ArtistPlaylist),
    Album(AlbumPlaylist),
}

impl PlaylistInterface {
    pub fn as_artist(&self) -> Option<&ArtistPlaylist> {
        match self {
            Self::Artist(playlist) => Some(playlist),
            Self::Album(_) => None,
        }
    }

    pub fn as_album(&self) -> Option<&AlbumPlaylist> {
        match self {
            Self::Album(playlist) => Some(playlist),
            Self::Artist(_) => None,
        }
    }

    pub fn queries(&self) -> Vec<Arc<Query>> {
        match self {
            Self::Artist(playlist) => playlist.tracks.snapshot(),
            Self::Album(playlist) => playlist.tracks.snapshot(),
        }
    }
}

#[derive(Debug, Default)]
struct TrackQueue {
    queries: Mutex<Vec<Arc<Query>>>,
}

impl TrackQueue {
    fn extend(&self, queries: &[Arc<Query>]) -> usize {
        let mut guard = self.queries.lock().expect("Failed to acquire lock");
        let mut added = 0;
        for query in queries {
            if guard.iter().any(|existing| existing.id() == query.id()) {
                continue;
            }
            guard.push(Arc::clone(query));
            added += 1;
        }
        added
    }

    fn snapshot(&self) -> Vec<Arc<Query>> {
        self.queries.lock().expect("Failed to acquire lock").clone()
    }
}

#[derive(Debug)]
pub struct ArtistPlaylist {
    artist_id: ArtistId,
    tracks: TrackQueue,
}

impl ArtistPlaylist {
    pub fn artist_id(&self) -> ArtistId {
        self.artist_id
    }

    /// Append queries not already present. Returns how many were added.
    pub fn add_queries(&self, queries: &[Arc<Query>]) -> usize {
        self.tracks.extend(queries)
    }
}

#[derive(Debug)]
pub struct AlbumPlaylist {
    album_id: AlbumId,
    tracks: TrackQueue,
}

impl AlbumPlaylist {
    pub fn album_id(&self) -> AlbumId {
        self.album_id
    }

    pub fn add_queries(&self, queries: &[Arc<Query>]) -> usize {
        self.tracks.extend(queries)
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A performing or composing artist. Composers are artists too.
#[derive(Debug)]
pub struct Artist {
    id: ArtistId,
    name: String,
    sortname: String,
    playlist: OnceLock<PlaylistInterface>,
}

impl Artist {
    pub fn new(id: ArtistId, name: impl Into<String>) -> Self {
        let name = name.into();
        let sortname = sortname(&name, true);
        Self {
            id,
            name,
            sortname,
            playlist: OnceLock::new(),
        }
    }

    pub fn id(&self) -> ArtistId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sortname(&self) -> &str {
        &self.sortname
    }

    pub fn playlist_interface(&self) -> &PlaylistInterface {
        self.playlist.get_or_init(|| {
            PlaylistInterface::Artist(ArtistPlaylist {
                artist_id: self.id,
                tracks: TrackQueue::default(),
            })
        })
    }

    /// Record newly discovered tracks by this artist.
    pub fn on_tracks_added(&self, queries: &[Arc<Query>]) -> usize {
        self.playlist_interface()
            .as_artist()
            .map_or(0, |playlist| playlist.add_queries(queries))
    }
}

#[derive(Debug)]
pub struct Album {
    id: AlbumId,
    name: String,
    sortname: String,
    artist: Arc<Artist>,
    playlist: OnceLock<PlaylistInterface>,
}

impl Album {
    pub fn new(id: AlbumId, name: impl Into<String>, artist: Arc<Artist>) -> Self {
        let name = name.into();
        let sortname = sortname(&name, false);
        Self {
            id,
            name,
            sortname,
            artist,
            playlist: OnceLock::new(),
        }
    }

    pub fn id(&self) -> AlbumId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sortname(&self) -> &str {
        &self.sortname
    }

    pub fn artist(&self) -> &Arc<Artist> {
        &self.artist
    }

    pub fn playlist_interface(&self) -> &PlaylistInterface {
        self.playlist.get_or_init(|| {
            PlaylistInterface::Album(AlbumPlaylist {
                album_id: self.id,
                tracks: TrackQueue::default(),
            })
        })
    }

    pub fn on_tracks_added(&self, queries: &[Arc<Query>]) -> usize {
        self.playlist_interface()
            .as_album()
            .map_or(0, |playlist| playlist.add_queries(queries))
    }
}

// ============================================================================
// Sources & Collections
// ============================================================================

/// The local machine or a remote peer serving files.
#[derive(Debug)]
pub struct Source {
    id: SourceId,
    user_name: String,
    friendly_name: String,
    online: AtomicBool,
    collection: Arc<Collection>,
}

impl Source {
    pub fn local(friendly_name: impl Into<String>) -> Arc<Self> {
        Self::build(SourceId::LOCAL, String::new(), friendly_name.into(), true)
    }

    /// Remote peers start offline until the transport reports them online.
    pub fn remote(
        id: SourceId,
        user_name: impl Into<String>,
        friendly_name: impl Into<String>,
    ) -> Arc<Self> {
        Self::build(id, user_name.into(), friendly_name.into(), false)
    }

    fn build(id: SourceId, user_name: String, friendly_name: String, online: bool) -> Arc<Self> {
        Arc::new_cyclic(|weak| {
            let collection = Arc::new(Collection {
                name: format!("dbcollection:{}", id),
                source_id: id,
                source: weak.clone(),
            });
            Source {
                id,
                user_name,
                friendly_name,
                online: AtomicBool::new(online),
                collection,
            }
        })
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn is_local(&self) -> bool {
        self.id.is_local()
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    pub fn is_online(&self) -> bool {
        self.is_local() || self.online.load(Ordering::Acquire)
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Release);
    }

    pub fn collection(&self) -> &Arc<Collection> {
        &self.collection
    }
}

/// Files owned and served by one source.
#[derive(Debug)]
pub struct Collection {
    name: String,
    source_id: SourceId,
    source: Weak<Source>,
}

impl Collection {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_id(&self) -> SourceId {
        self.source_id
    }

    /// The owning source, if it is still alive.
    pub fn source(&self) -> Option<Arc<Source>> {
        self.source.upgrade()
    }
}

// ============================================================================
// Queries
// ============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("query has no artist, track or album")]
    EmptyFields,
    #[error("full-text query is blank")]
    EmptyText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryTerms {
    Fields {
        artist: String,
        track: String,
        album: String,
    },
    FullText(String),
}

/// An immutable resolution request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    id: QueryId,
    terms: QueryTerms,
    result_hint: Option<String>,
}

impl Query {
    pub fn fields(
        artist: impl Into<String>,
        track: impl Into<String>,
        album: impl Into<String>,
    ) -> Result<Self, QueryError> {
        let artist = artist.into().trim().to_string();
        let track = track.into().trim().to_string();
        let album = album.into().trim().to_string();
        if artist.is_empty() && track.is_empty() && album.is_empty() {
            return Err(QueryError::EmptyFields);
        }
        Ok(Self {
            id: QueryId::new(),
            terms: QueryTerms::Fields {
                artist,
                track,
                album,
            },
            result_hint: None,
        })
    }

    pub fn full_text(text: impl Into<String>) -> Result<Self, QueryError> {
        let text = text.into().trim().to_string();
        if text.is_empty() {
            return Err(QueryError::EmptyText);
        }
        Ok(Self {
            id: QueryId::new(),
            terms: QueryTerms::FullText(text),
            result_hint: None,
        })
    }

    /// Attach a previously known locator. Blank hints are ignored.
    pub fn with_result_hint(mut self, hint: impl Into<String>) -> Self {
        let hint = hint.into();
        self.result_hint = if hint.trim().is_empty() {
            None
        } else {
            Some(hint)
        };
        self
    }

    pub fn id(&self) -> QueryId {
        self.id
    }

    pub fn terms(&self) -> &QueryTerms {
        &self.terms
    }

    pub fn is_full_text(&self) -> bool {
        matches!(self.terms, QueryTerms::FullText(_))
    }

    pub fn full_text_query(&self) -> Option<&str> {
        match &self.terms {
            QueryTerms::FullText(text) => Some(text),
            QueryTerms::Fields { .. } => None,
        }
    }

    pub fn artist(&self) -> &str {
        match &self.terms {
            QueryTerms::Fields { artist, .. } => artist,
            QueryTerms::FullText(_) => "",
        }
    }

    pub fn track(&self) -> &str {
        match &self.terms {
            QueryTerms::Fields { track, .. } => track,
            QueryTerms::FullText(_) => "",
        }
    }

    pub fn album(&self) -> &str {
        match &self.terms {
            QueryTerms::Fields { album, .. } => album,
            QueryTerms::FullText(_) => "",
        }
    }

    pub fn result_hint(&self) -> Option<&str> {
        self.result_hint.as_deref()
    }
}

// ============================================================================
// Results
// ============================================================================

/// Score carried by results that were not ranked by the search stage.
pub const DEFAULT_SCORE: f32 = 1.0;

/// One playable match for a query.
#[derive(Debug, Clone)]
pub struct TrackResult {
    /// Fresh on every assembly, even for the same underlying file.
    pub rid: Uuid,
    pub locator: Locator,
    pub modification_time: Option<DateTime<Utc>>,
    pub size: u64,
    pub mimetype: String,
    /// Seconds.
    pub duration: u32,
    /// kbps.
    pub bitrate: u32,
    pub disc_number: u32,
    pub album_position: u32,
    pub track_id: TrackId,
    pub track: String,
    pub attributes: BTreeMap<String, String>,
    pub artist: Arc<Artist>,
    pub album: Option<Arc<Album>>,
    pub composer: Option<Arc<Artist>>,
    pub collection: Arc<Collection>,
    score: f32,
}

impl TrackResult {
    pub fn new(
        locator: Locator,
        track_id: TrackId,
        track: impl Into<String>,
        artist: Arc<Artist>,
        collection: Arc<Collection>,
    ) -> Self {
        Self {
            rid: Uuid::new_v4(),
            locator,
            modification_time: None,
            size: 0,
            mimetype: String::new(),
            duration: 0,
            bitrate: 0,
            disc_number: 0,
            album_position: 0,
            track_id,
            track: track.into(),
            attributes: BTreeMap::new(),
            artist,
            album: None,
            composer: None,
            collection,
            score: DEFAULT_SCORE,
        }
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    /// Set the score, clamped to `[0, 1]`. NaN becomes 0.
    pub fn set_score(&mut self, score: f32) {
        self.score = if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, 1.0)
        };
    }

    pub fn url(&self) -> String {
        self.locator.to_string()
    }

    pub fn source(&self) -> Option<Arc<Source>> {
        self.collection.source()
    }
}
