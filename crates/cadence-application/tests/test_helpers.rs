// SPDX-License-Identifier: GPL-3.0-or-later
//! Catalog fixtures for the resolver integration tests.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use cadence_application::{IdentityRegistry, Resolver, SourceList};
use cadence_config::ResolverConfig;
use cadence_domain::{AlbumId, ArtistId, Candidate, EntityKind, Source, SourceId, TrackId};
use cadence_infrastructure::{
    open_in_memory, AlbumRow, CatalogStore, FileFilter, FileRow, NewCatalogFile,
    SqliteCatalogStore,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const LOCAL_ONE_MORE_TIME: &str = "/music/daft punk/01 one more time.mp3";
pub const ALICE_ONE_MORE_TIME: &str = "Daft Punk/Discovery/01.mp3";

fn catalog_file(source: SourceId, url: &str, artist: &str, track: &str) -> NewCatalogFile {
    NewCatalogFile {
        source,
        url: url.to_string(),
        size: 8_000_000,
        mtime: 1_700_000_000,
        mimetype: Some("audio/mpeg".to_string()),
        duration: 320,
        bitrate: 320,
        artist: artist.to_string(),
        track: track.to_string(),
        album_position: Some(1),
        disc_number: Some(1),
        ..Default::default()
    }
}

/// Local and remote copies of "One More Time", a row from the unregistered
/// source 7, a second Discovery track and an Air track with a composer.
pub async fn seeded_store() -> SqliteCatalogStore {
    let store = SqliteCatalogStore::new(open_in_memory().await.expect("open catalog"));

    let mut local = catalog_file(SourceId::LOCAL, LOCAL_ONE_MORE_TIME, "Daft Punk", "One More Time");
    local.album = Some("Discovery".to_string());
    local
        .attributes
        .insert("releaseyear".to_string(), "2001".to_string());

    let mut aerodynamic = catalog_file(
        SourceId::LOCAL,
        "/music/daft punk/02 aerodynamic.mp3",
        "Daft Punk",
        "Aerodynamic",
    );
    aerodynamic.album = Some("Discovery".to_string());
    aerodynamic.album_position = Some(2);

    let mut alice = catalog_file(SourceId(2), ALICE_ONE_MORE_TIME, "Daft Punk", "One More Time");
    alice.album = Some("Discovery".to_string());

    let ghost = catalog_file(SourceId(7), "ghost.mp3", "Daft Punk", "One More Time");

    let mut air = catalog_file(
        SourceId::LOCAL,
        "/music/air/la femme d'argent.mp3",
        "Air",
        "La Femme d'Argent",
    );
    air.album = Some("Moon Safari".to_string());
    air.composer = Some("Nicolas Godin".to_string());

    for file in [local, aerodynamic, alice, ghost, air] {
        store.index_file(&file).await.expect("index file");
    }
    store
}

/// Local source plus alice (source 2).
pub fn source_list(alice_online: bool) -> Arc<SourceList> {
    let list = SourceList::new(Source::local("My Collection"));
    let alice = Source::remote(SourceId(2), "alice", "Alice");
    alice.set_online(alice_online);
    list.add(alice);
    Arc::new(list)
}

pub fn resolver_over(store: Arc<dyn CatalogStore>, sources: Arc<SourceList>) -> Resolver {
    resolver_with(store, sources, ResolverConfig::default())
}

pub fn resolver_with(
    store: Arc<dyn CatalogStore>,
    sources: Arc<SourceList>,
    config: ResolverConfig,
) -> Resolver {
    Resolver::new(store, sources, Arc::new(IdentityRegistry::new()), config)
}

/// Wraps a store, recording search limits, counting join queries and
/// optionally failing them.
pub struct InstrumentedStore {
    inner: SqliteCatalogStore,
    joins: AtomicUsize,
    searches: Mutex<Vec<(EntityKind, Option<usize>)>>,
    fail_joins: bool,
}

impl InstrumentedStore {
    pub fn counting(inner: SqliteCatalogStore) -> Self {
        Self {
            inner,
            joins: AtomicUsize::new(0),
            searches: Mutex::new(Vec::new()),
            fail_joins: false,
        }
    }

    pub fn failing(inner: SqliteCatalogStore) -> Self {
        Self {
            fail_joins: true,
            ..Self::counting(inner)
        }
    }

    pub fn join_calls(&self) -> usize {
        self.joins.load(Ordering::SeqCst)
    }

    /// Every `search_table` call so far, as (kind, limit).
    pub fn searches(&self) -> Vec<(EntityKind, Option<usize>)> {
        self.searches.lock().expect("Failed to acquire lock").clone()
    }

    /// Search the wrapped catalog without recording the call.
    pub async fn candidates(&self, kind: EntityKind, text: &str) -> Vec<Candidate> {
        self.inner
            .search_table(kind, text, None)
            .await
            .expect("search")
    }
}

#[async_trait::async_trait]
impl CatalogStore for InstrumentedStore {
    async fn search_table(
        &self,
        kind: EntityKind,
        text: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Candidate>> {
        self.searches
            .lock()
            .expect("Failed to acquire lock")
            .push((kind, limit));
        self.inner.search_table(kind, text, limit).await
    }

    async fn files_matching(&self, filter: &FileFilter) -> Result<Vec<FileRow>> {
        self.joins.fetch_add(1, Ordering::SeqCst);
        if self.fail_joins {
            return Err(anyhow!("database is locked"));
        }
        self.inner.files_matching(filter).await
    }

    async fn track_attributes(&self, track_id: TrackId) -> Result<BTreeMap<String, String>> {
        self.inner.track_attributes(track_id).await
    }

    async fn artist_name(&self, id: ArtistId) -> Result<Option<String>> {
        self.inner.artist_name(id).await
    }

    async fn album_with_artist(&self, id: AlbumId) -> Result<Option<AlbumRow>> {
        self.inner.album_with_artist(id).await
    }

    async fn artist_id(&self, name: &str, auto_create: bool) -> Result<Option<ArtistId>> {
        self.inner.artist_id(name, auto_create).await
    }

    async fn album_id(
        &self,
        artist: ArtistId,
        name: &str,
        auto_create: bool,
    ) -> Result<Option<AlbumId>> {
        self.inner.album_id(artist, name, auto_create).await
    }
}
