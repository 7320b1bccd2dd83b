// SPDX-License-Identifier: GPL-3.0-or-later

//! Shared artist and album identities.
//!
//! Every persisted artist or album is represented by exactly one `Arc` for the
//! lifetime of the registry, so results from different queries point at the
//! same object. Transient entities (id 0) are handed out but never cached.

use cadence_domain::{Album, AlbumId, Artist, ArtistId};
use cadence_infrastructure::CatalogStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::trace;

use crate::error::ResolveResult;

#[derive(Debug, Default)]
pub struct IdentityRegistry {
    artists: Mutex<HashMap<ArtistId, Arc<Artist>>>,
    albums: Mutex<HashMap<AlbumId, Arc<Album>>>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached artist for `id`, or a new one built from `name`.
    ///
    /// The lock is held across construction so two callers racing on the same
    /// new id end up sharing one object.
    pub fn artist(&self, id: ArtistId, name: &str) -> Arc<Artist> {
        let mut artists = self.artists.lock().expect("Failed to acquire lock");
        if let Some(existing) = artists.get(&id) {
            return Arc::clone(existing);
        }

        let artist = Arc::new(Artist::new(id, name));
        if !id.is_transient() {
            trace!(target: "registry", %id, name, "caching artist");
            artists.insert(id, Arc::clone(&artist));
        }
        artist
    }

    pub fn album(&self, id: AlbumId, name: &str, artist: Arc<Artist>) -> Arc<Album> {
        let mut albums = self.albums.lock().expect("Failed to acquire lock");
        if let Some(existing) = albums.get(&id) {
            return Arc::clone(existing);
        }

        let album = Arc::new(Album::new(id, name, artist));
        if !id.is_transient() {
            trace!(target: "registry", %id, name, "caching album");
            albums.insert(id, Arc::clone(&album));
        }
        album
    }

    /// Resolve an artist by name through the catalog.
    ///
    /// With `auto_create`, a missing artist row is inserted; `None` means that
    /// insert did not produce an id. Without it, an unknown name yields a
    /// transient artist.
    pub async fn artist_by_name(
        &self,
        store: &dyn CatalogStore,
        name: &str,
        auto_create: bool,
    ) -> ResolveResult<Option<Arc<Artist>>> {
        let id = store.artist_id(name, auto_create).await?;
        match id {
            None if auto_create => Ok(None),
            id => Ok(Some(self.artist(id.unwrap_or_default(), name))),
        }
    }

    /// Album counterpart of [`IdentityRegistry::artist_by_name`], scoped to `artist`.
    pub async fn album_by_name(
        &self,
        store: &dyn CatalogStore,
        artist: Arc<Artist>,
        name: &str,
        auto_create: bool,
    ) -> ResolveResult<Option<Arc<Album>>> {
        let id = if artist.id().is_transient() {
            None
        } else {
            store.album_id(artist.id(), name, auto_create).await?
        };
        match id {
            None if auto_create => Ok(None),
            id => Ok(Some(self.album(id.unwrap_or_default(), name, artist))),
        }
    }

    pub fn artist_count(&self) -> usize {
        self.artists.lock().expect("Failed to acquire lock").len()
    }

    pub fn album_count(&self) -> usize {
        self.albums.lock().expect("Failed to acquire lock").len()
    }
}
